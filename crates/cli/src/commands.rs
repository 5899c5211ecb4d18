//! CLI commands

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use keystone_admin_client::freshness::token_expiry;
use keystone_admin_client::{
    AdminClient, ApiRequest, InvitationCode, LoginRedirect, MirrorCookie, Tier, TokenStore,
    is_token_expired,
};
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in to the admin API
    Login {
        /// Staff email address
        #[arg(long)]
        email: String,

        /// Account password
        #[arg(long, env = "KEYSTONE_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,

        /// Keep the session across invocations (stored in the data directory)
        #[arg(long)]
        remember: bool,
    },

    /// Sign out and drop local credentials
    Logout {
        /// Revoke every session of this account, not just this one
        #[arg(long)]
        all_devices: bool,
    },

    /// Show the local session state
    Status,

    /// Send an authenticated request and print the response
    Call {
        /// HTTP method
        method: String,

        /// Path under the API base URL, or an absolute URL
        path: String,

        /// JSON request body
        #[arg(long)]
        data: Option<String>,
    },

    /// Invitation code management
    Codes {
        #[command(subcommand)]
        command: CodesCommands,
    },
}

#[derive(Subcommand)]
pub enum CodesCommands {
    /// List invitation codes
    List {
        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: u32,

        /// Codes per page
        #[arg(long, default_value = "10")]
        limit: u32,
    },

    /// Issue a new invitation code
    Generate,
}

/// Redirect hook for a terminal session
struct SignInNotice;

impl LoginRedirect for SignInNotice {
    fn redirect_to_login(&self, _login_path: &str) {
        eprintln!("Session ended. Run `keystone-admin login` to sign in again.");
    }
}

impl Commands {
    pub async fn execute(self, data_dir: PathBuf, config_file: Option<PathBuf>) -> Result<()> {
        let store = config::token_store(&data_dir);

        if matches!(self, Self::Status) {
            print_status(&store);
            return Ok(());
        }

        let client_config = config::load_client_config(config_file.as_deref())?;
        let client = AdminClient::builder()
            .config(client_config)
            .token_store(store)
            .redirect(Arc::new(SignInNotice))
            .build()?;

        match self {
            Self::Login {
                email,
                password,
                remember,
            } => login(&client, &email, &password, remember).await,
            Self::Logout { all_devices } => {
                client.logout(all_devices).await;
                println!("Signed out");
                Ok(())
            }
            Self::Status => Ok(()),
            Self::Call { method, path, data } => call(&client, &method, path, data).await,
            Self::Codes { command } => command.execute(&client).await,
        }
    }
}

impl CodesCommands {
    pub async fn execute(self, client: &AdminClient) -> Result<()> {
        match self {
            Self::List { page, limit } => {
                let page_result = client.list_invitation_codes(page, limit).await?;
                let now = Utc::now();

                if page_result.codes.is_empty() {
                    println!("No invitation codes");
                }
                for code in &page_result.codes {
                    println!("{}", describe_code(code, now));
                }
                if let Some(meta) = &page_result.meta {
                    println!(
                        "Page {} of {} ({} codes)",
                        meta.page,
                        meta.total_pages.max(1),
                        meta.total
                    );
                }
                Ok(())
            }
            Self::Generate => {
                client.generate_invitation_code().await?;
                println!("Generated a new invitation code");
                Ok(())
            }
        }
    }
}

async fn login(client: &AdminClient, email: &str, password: &str, remember: bool) -> Result<()> {
    client.login(email, password, remember).await?;
    info!(email, "Login succeeded");

    println!("Signed in as {email}");
    if remember {
        println!("Session remembered for later invocations");
    } else {
        println!("Session kept for this invocation only; pass --remember to stay signed in");
    }
    if let Some(cookie) = client.token_store().cookie().current() {
        println!("{}", cookie_line(&cookie));
    }
    Ok(())
}

async fn call(client: &AdminClient, method: &str, path: String, data: Option<String>) -> Result<()> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {method}"))?;

    let mut request = ApiRequest::new(method, path);
    if let Some(data) = data {
        serde_json::from_str::<serde_json::Value>(&data).context("--data is not valid JSON")?;
        request = request
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(data);
    }

    let response = client.request(request).await?;
    let status = response.status();
    let body = response.text().await?;

    println!("{status}");
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) if body.is_empty() => {}
        Err(_) => println!("{body}"),
    }

    if status.is_success() {
        Ok(())
    } else {
        anyhow::bail!("Request failed with {status}")
    }
}

/// Mirrored cookie as shown to the user, token value masked
fn cookie_line(cookie: &MirrorCookie) -> String {
    format!("Set-Cookie: {}", cookie.redacted())
}

fn print_status(store: &TokenStore) {
    let Some(access_token) = store.access_token() else {
        println!("Not signed in");
        return;
    };

    let tier = match store.active_tier() {
        Some(Tier::Durable) => "remembered",
        _ => "session",
    };
    println!("Signed in ({tier})");

    #[allow(clippy::cast_possible_truncation)]
    let expiry = token_expiry(&access_token)
        .and_then(|exp| DateTime::<Utc>::from_timestamp(exp.floor() as i64, 0));
    match expiry {
        Some(at) if is_token_expired(&access_token) => {
            println!("Access token expired at {at}; it will be refreshed on the next call");
        }
        Some(at) => println!("Access token valid until {at}"),
        None => println!("Access token expiry unreadable; it will be refreshed on the next call"),
    }
}

fn describe_code(code: &InvitationCode, now: DateTime<Utc>) -> String {
    let state = if code.is_used {
        match &code.owner {
            Some(owner) => format!(
                "used by {} {} <{}>",
                owner.first_name, owner.last_name, owner.email
            ),
            None => "used".to_string(),
        }
    } else {
        match code.days_until_expiry(now) {
            Some(days) if days <= 0 => "expired".to_string(),
            Some(1) => "available, expires in 1 day".to_string(),
            Some(days) => format!("available, expires in {days} days"),
            None => "available".to_string(),
        }
    };

    format!("{:<16} {state}", code.code)
}
