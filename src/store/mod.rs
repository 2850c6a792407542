// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage layer: string key/value backends and the credential store on top.

pub mod credentials;
pub mod file;
pub mod memory;

pub use credentials::{CredentialStore, StorageCredentialStore};
pub use file::JsonFileStorage;
pub use memory::MemoryStorage;

use crate::error::AppError;

/// Key names as constants.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "spotify_access_token";
    pub const REFRESH_TOKEN: &str = "spotify_refresh_token";
    /// Epoch milliseconds as a decimal string
    pub const TOKEN_EXPIRY: &str = "spotify_token_expiry";

    pub const ALL: [&str; 3] = [ACCESS_TOKEN, REFRESH_TOKEN, TOKEN_EXPIRY];
}

/// Durable string key/value storage scoped to one origin.
pub trait KeyValueStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), AppError>;
}
