//! Persisted credentials
//!
//! [`TokenStore`] is the only reader and writer of the token pair. Both tokens
//! of a pair always live in the same tier; reads consult the durable tier
//! first and fall back to the session tier.

use crate::cookie::CookieMirror;
use crate::error::StorageError;
use crate::storage::{MemoryStorage, StorageTier, Tier};
use crate::types::TokenPair;
use std::sync::Arc;
use tracing::warn;

/// Storage key of the access token
pub const ACCESS_TOKEN_KEY: &str = "admin_access_token";
/// Storage key of the refresh token
pub const REFRESH_TOKEN_KEY: &str = "admin_refresh_token";

/// Two-tier credential store with a cookie mirror
pub struct TokenStore {
    durable: Arc<dyn StorageTier>,
    session: Arc<dyn StorageTier>,
    cookie: CookieMirror,
}

impl TokenStore {
    pub fn new(durable: Arc<dyn StorageTier>, session: Arc<dyn StorageTier>) -> Self {
        Self {
            durable,
            session,
            cookie: CookieMirror::new(),
        }
    }

    /// Store backed purely by memory in both tiers
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryStorage::new()))
    }

    fn tier(&self, tier: Tier) -> &dyn StorageTier {
        match tier {
            Tier::Durable => self.durable.as_ref(),
            Tier::Session => self.session.as_ref(),
        }
    }

    fn read(&self, tier: Tier, key: &str) -> Option<String> {
        match self.tier(tier).get_item(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(?tier, key, error = %e, "Failed to read credential storage");
                None
            }
        }
    }

    fn read_either(&self, key: &str) -> Option<String> {
        self.read(Tier::Durable, key)
            .or_else(|| self.read(Tier::Session, key))
    }

    /// Current access token, durable tier first
    pub fn access_token(&self) -> Option<String> {
        self.read_either(ACCESS_TOKEN_KEY)
    }

    /// Current refresh token, durable tier first
    pub fn refresh_token(&self) -> Option<String> {
        self.read_either(REFRESH_TOKEN_KEY)
    }

    /// Tier currently holding the refresh token
    pub fn active_tier(&self) -> Option<Tier> {
        if self.read(Tier::Durable, REFRESH_TOKEN_KEY).is_some() {
            Some(Tier::Durable)
        } else if self.read(Tier::Session, REFRESH_TOKEN_KEY).is_some() {
            Some(Tier::Session)
        } else {
            None
        }
    }

    /// Whether the current pair was saved with "remember me"
    pub fn is_remembered(&self) -> bool {
        self.active_tier() == Some(Tier::Durable)
    }

    /// Persist a token pair in the tier chosen by `remember`.
    ///
    /// Both keys are removed from the other tier so a later read can never
    /// pick up a pair from a previous login. The cookie mirror is overwritten.
    ///
    /// On error nothing of the pair is left in the selected tier and the
    /// cookie is untouched.
    pub fn save_tokens(&self, tokens: &TokenPair, remember: bool) -> Result<(), StorageError> {
        let selected = Tier::from_remember(remember);
        let other = match selected {
            Tier::Durable => Tier::Session,
            Tier::Session => Tier::Durable,
        };

        if let Err(e) = self.write_pair(tokens, selected, other) {
            let target = self.tier(selected);
            for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
                if let Err(cleanup) = target.remove_item(key) {
                    warn!(
                        tier = ?selected,
                        key,
                        error = %cleanup,
                        "Failed to roll back credential storage"
                    );
                }
            }
            return Err(e);
        }

        self.cookie.set(&tokens.access_token, remember);
        Ok(())
    }

    fn write_pair(
        &self,
        tokens: &TokenPair,
        selected: Tier,
        other: Tier,
    ) -> Result<(), StorageError> {
        let target = self.tier(selected);
        target.set_item(ACCESS_TOKEN_KEY, &tokens.access_token)?;
        target.set_item(REFRESH_TOKEN_KEY, &tokens.refresh_token)?;

        let stale = self.tier(other);
        stale.remove_item(ACCESS_TOKEN_KEY)?;
        stale.remove_item(REFRESH_TOKEN_KEY)
    }

    /// Wipe both tiers and expire the cookie mirror
    pub fn clear_tokens(&self) {
        for tier in [Tier::Durable, Tier::Session] {
            if let Err(e) = self.tier(tier).clear() {
                warn!(?tier, error = %e, "Failed to clear credential storage");
            }
        }
        self.cookie.expire();
    }

    /// Cookie mirror for server-side route checks
    pub const fn cookie(&self) -> &CookieMirror {
        &self.cookie
    }
}
