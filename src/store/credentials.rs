// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential store with expiry-aware reads.

use std::sync::Arc;

use super::{keys, KeyValueStorage};
use crate::error::AppError;
use crate::models::Credential;
use crate::time_utils::Clock;

/// Persistence for the single Spotify credential.
pub trait CredentialStore: Send + Sync {
    /// Persist a freshly issued token pair expiring `expires_in_secs` from now.
    fn save(
        &self,
        access_token: &str,
        refresh_token: &str,
        expires_in_secs: i64,
    ) -> Result<(), AppError>;

    /// Return the stored credential, or `None` if it is missing or expired.
    /// An expired credential is purged as a side effect.
    fn read(&self) -> Option<Credential>;

    /// Remove every stored field. Idempotent.
    fn clear(&self) -> Result<(), AppError>;

    fn is_connected(&self) -> bool {
        self.read().is_some()
    }
}

/// `CredentialStore` over any string key/value backend.
pub struct StorageCredentialStore<S> {
    storage: S,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStorage> StorageCredentialStore<S> {
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn get_logged(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, key, "Failed to read credential field");
                None
            }
        }
    }

    fn purge_logged(&self) {
        if let Err(e) = self.clear() {
            tracing::warn!(error = %e, "Failed to purge expired credential");
        }
    }
}

impl<S: KeyValueStorage> CredentialStore for StorageCredentialStore<S> {
    fn save(
        &self,
        access_token: &str,
        refresh_token: &str,
        expires_in_secs: i64,
    ) -> Result<(), AppError> {
        let expires_at = self
            .clock
            .now_epoch_ms()
            .saturating_add(expires_in_secs.saturating_mul(1000));

        self.storage.set(keys::ACCESS_TOKEN, access_token)?;
        self.storage.set(keys::REFRESH_TOKEN, refresh_token)?;
        self.storage
            .set(keys::TOKEN_EXPIRY, &expires_at.to_string())?;

        tracing::debug!(expires_at, "Stored Spotify credential");
        Ok(())
    }

    fn read(&self) -> Option<Credential> {
        let access_token = self.get_logged(keys::ACCESS_TOKEN)?;
        let refresh_token = self.get_logged(keys::REFRESH_TOKEN)?;

        // A missing or unparsable expiry cannot be trusted
        let expires_at_epoch_ms = self
            .get_logged(keys::TOKEN_EXPIRY)
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .unwrap_or(i64::MIN);

        let credential = Credential {
            access_token,
            refresh_token,
            expires_at_epoch_ms,
        };

        if !credential.is_valid_at(self.clock.now_epoch_ms()) {
            tracing::info!("Spotify credential expired, clearing");
            self.purge_logged();
            return None;
        }

        Some(credential)
    }

    fn clear(&self) -> Result<(), AppError> {
        // Attempt every key even if one fails
        let mut first_err = None;
        for key in keys::ALL {
            if let Err(e) = self.storage.remove(key) {
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
