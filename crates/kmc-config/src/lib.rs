// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Settings port for the KMC matcher.
//!
//! A [`SettingsStore`] keeps opaque documents by key; [`SettingsService`]
//! turns the document under one key into a validated [`MatcherConfig`] and
//! back. Documents are JSON. Fields missing from a stored document take
//! their default values, and a missing document means "all defaults".
//! Filesystem or embedded stores live with the driver, not here.

use kmc_core::{MatchError, MatcherConfig};
use thiserror::Error;
use tracing::debug;

/// Key the matcher settings live under unless [`SettingsService::with_key`]
/// picks another.
pub const MATCHER_CONFIG_KEY: &str = "matcher";

/// Keyed document storage.
pub trait SettingsStore {
    /// Document under `key`, or `None` when nothing was ever written there.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, SettingsError>;
    /// Replaces the document under `key`.
    fn write(&self, key: &str, document: &[u8]) -> Result<(), SettingsError>;
}

/// Failures while reading or writing matcher settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The backing store hit an I/O failure.
    #[error("settings i/o: {0}")]
    Io(#[from] std::io::Error),
    /// The document under `key` is not valid settings JSON.
    #[error("settings under {key:?} do not decode: {source}")]
    Decode {
        /// Key whose document failed to decode.
        key: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// Settings could not be encoded.
    #[error("settings do not encode: {0}")]
    Encode(#[source] serde_json::Error),
    /// Decoded or outgoing settings failed validation.
    #[error("invalid settings: {0}")]
    Invalid(#[from] MatchError),
    /// Store-specific failure that is not an I/O error.
    #[error("settings store: {0}")]
    Backend(String),
}

/// Loads and saves [`MatcherConfig`] through a [`SettingsStore`].
pub struct SettingsService<S> {
    store: S,
    key: String,
}

impl<S> SettingsService<S> {
    /// Service reading and writing under [`MATCHER_CONFIG_KEY`].
    pub fn new(store: S) -> Self {
        Self::with_key(store, MATCHER_CONFIG_KEY)
    }

    /// Service reading and writing under `key`.
    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Key this service uses.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Gives the store back.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: SettingsStore> SettingsService<S> {
    /// Reads and validates the matcher settings.
    ///
    /// An absent or empty document yields [`MatcherConfig::default`].
    ///
    /// # Errors
    /// [`SettingsError::Decode`] for a malformed document,
    /// [`SettingsError::Invalid`] when the values fail
    /// [`MatcherConfig::validate`], and any store error as is.
    pub fn load_matcher_config(&self) -> Result<MatcherConfig, SettingsError> {
        let config = match self.store.read(&self.key)? {
            Some(doc) if !doc.is_empty() => {
                serde_json::from_slice::<MatcherConfig>(&doc).map_err(|source| {
                    SettingsError::Decode {
                        key: self.key.clone(),
                        source,
                    }
                })?
            }
            _ => {
                debug!(key = %self.key, "no stored matcher settings; using defaults");
                MatcherConfig::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates `config` and writes it as pretty JSON.
    ///
    /// # Errors
    /// [`SettingsError::Invalid`] before anything is written when `config`
    /// fails validation; encode and store errors otherwise.
    pub fn save_matcher_config(&self, config: &MatcherConfig) -> Result<(), SettingsError> {
        config.validate()?;
        let doc = serde_json::to_vec_pretty(config).map_err(SettingsError::Encode)?;
        self.store.write(&self.key, &doc)
    }
}
