//! Runtime configuration and persisted operator preferences.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::{ConfigError, StoreError};
use crate::persistence::{read_json, write_json};

// =====================================================================
// Sync policy
// =====================================================================

/// When a sync session is merged into the ledger.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeTrigger {
    /// Merge everything once the overall timeout elapses, whatever the item states.
    #[default]
    Timeout,
    /// Merge as soon as every item reached `synchronized`.
    AllSynchronized,
}

/// What closing the sync view does to a live session.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DismissBehavior {
    /// Timers keep running and the merge still happens.
    #[default]
    Continue,
    /// Drop the session unmerged; the next sync picks the items up again.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Item `i` enters `syncing` at `syncing_stagger * (i + 1)`.
    pub syncing_stagger: Duration,
    /// Item `i` enters `synchronized` at `confirm_stagger * (i + 1)`.
    pub confirm_stagger: Duration,
    pub merge_timeout: Duration,
    pub merge_trigger: MergeTrigger,
    pub on_dismiss: DismissBehavior,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            syncing_stagger: Duration::from_millis(1000),
            confirm_stagger: Duration::from_millis(4000),
            merge_timeout: Duration::from_millis(5000),
            merge_trigger: MergeTrigger::Timeout,
            on_dismiss: DismissBehavior::Continue,
        }
    }
}

impl SyncPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.confirm_stagger <= self.syncing_stagger {
            return Err(ConfigError::StaggerOrder {
                syncing_ms: self.syncing_stagger.as_millis(),
                confirm_ms: self.confirm_stagger.as_millis(),
            });
        }
        if self.merge_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

// =====================================================================
// Preferences
// =====================================================================

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceValues {
    pub language: Language,
    pub theme: Theme,
    pub connected: bool,
    pub account: Option<String>,
}

/// Operator preferences with a change channel for the language.
///
/// Replaces ad-hoc global flags: components read through accessors and
/// subscribe to `language_changes()` instead of polling shared storage.
#[derive(Debug)]
pub struct Preferences {
    values: PreferenceValues,
    path: Option<PathBuf>,
    language_tx: watch::Sender<Language>,
}

impl Preferences {
    /// Unpersisted preferences.
    pub fn in_memory(values: PreferenceValues) -> Self {
        let (language_tx, _) = watch::channel(values.language);
        Self {
            values,
            path: None,
            language_tx,
        }
    }

    /// Loads from `path`, falling back to defaults when missing or unreadable.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match read_json::<PreferenceValues>(&path) {
            Ok(Some(v)) => v,
            Ok(None) => PreferenceValues::default(),
            Err(e) => {
                log::warn!("[SETTINGS] {} unreadable, using defaults: {}", path.display(), e);
                PreferenceValues::default()
            }
        };

        let mut prefs = Self::in_memory(values);
        prefs.path = Some(path);
        prefs
    }

    pub fn values(&self) -> &PreferenceValues {
        &self.values
    }

    pub fn language(&self) -> Language {
        self.values.language
    }

    pub fn language_changes(&self) -> watch::Receiver<Language> {
        self.language_tx.subscribe()
    }

    pub fn set_language(&mut self, language: Language) -> Result<(), StoreError> {
        self.values.language = language;
        self.language_tx.send_replace(language);
        self.save()
    }

    pub fn theme(&self) -> Theme {
        self.values.theme
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), StoreError> {
        self.values.theme = theme;
        self.save()
    }

    pub fn account(&self) -> Option<&str> {
        self.values.account.as_deref()
    }

    pub fn set_connected(&mut self, account: Option<String>) -> Result<(), StoreError> {
        self.values.connected = account.is_some();
        self.values.account = account;
        self.save()
    }

    fn save(&self) -> Result<(), StoreError> {
        match &self.path {
            Some(p) => write_json(p, &self.values),
            None => Ok(()),
        }
    }
}
