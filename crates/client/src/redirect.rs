//! Login redirect hook
//!
//! When the session ends involuntarily (no refresh token, refresh rejected)
//! or through logout, the host is told to send the user back to the login
//! entry point. In a browser that is a full-page navigation; a console host
//! prints a notice instead.

use tracing::warn;

/// Receiver of "go back to login" navigations
pub trait LoginRedirect: Send + Sync {
    fn redirect_to_login(&self, login_path: &str);
}

impl<F> LoginRedirect for F
where
    F: Fn(&str) + Send + Sync,
{
    fn redirect_to_login(&self, login_path: &str) {
        self(login_path);
    }
}

/// Default redirect that only records the navigation
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRedirect;

impl LoginRedirect for LogRedirect {
    fn redirect_to_login(&self, login_path: &str) {
        warn!(login_path, "Session ended, redirecting to login");
    }
}
