//! Authenticated API access for the Keystone admin dashboard
//!
//! The crate owns the token lifecycle for staff sessions: the two-tier
//! [`TokenStore`], the local expiry check, single-flight token refresh and the
//! retry-once-on-401 contract of [`AdminClient::request`]. Typed helpers for
//! login/logout and the invitation-code endpoints sit on top.

mod auth;
pub mod client;
pub mod config;
pub mod cookie;
pub mod error;
pub mod freshness;
pub mod invitation;
pub mod redirect;
mod refresh;
pub mod storage;
pub mod token_store;
pub mod types;

pub use client::{AdminClient, AdminClientBuilder, ApiRequest};
pub use config::ClientConfig;
pub use cookie::{CookieMirror, MirrorCookie};
pub use error::{ClientError, StorageError};
pub use freshness::{is_token_expired, is_token_expired_at};
pub use invitation::{CodeOwner, InvitationCode, InvitationCodePage};
pub use redirect::{LogRedirect, LoginRedirect};
pub use storage::{FileStorage, MemoryStorage, StorageTier, Tier};
pub use token_store::TokenStore;
pub use types::{ApiEnvelope, PageMeta, TokenPair};
