//! Transport mode (normal / cautious) and the operator toggle around it.
//!
//! The toggle is gated by a feature flag read at startup:
//!
//! | flag               | toggle visible | default mode |
//! |--------------------|----------------|--------------|
//! | `hidden`           | no             | normal       |
//! | `active-default`   | yes            | cautious     |
//! | `disabled-default` | yes            | normal       |
//!
//! When the toggle is visible the last chosen mode is persisted under a single
//! key; when hidden, any stored value is cleared.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::error::ModeStoreError;

/// Storage key for the persisted mode.
pub const MODE_STORAGE_KEY: &str = "megaTip.transportMode";

/// How aggressively the engine uses the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Normal,
    /// Push disabled, slower polling, one cursor page per tick.
    Cautious,
}

impl TransportMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(Self::Normal),
            "cautious" => Some(Self::Cautious),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Cautious => "cautious",
        }
    }
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature flag controlling the mode toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SliderFlag {
    #[default]
    Hidden,
    ActiveDefault,
    DisabledDefault,
}

impl SliderFlag {
    /// Lenient parse: unknown or empty values mean `Hidden`.
    pub fn parse(value: Option<&str>) -> Self {
        match value.unwrap_or_default().trim().to_ascii_lowercase().as_str() {
            "active-default" => Self::ActiveDefault,
            "disabled-default" => Self::DisabledDefault,
            _ => Self::Hidden,
        }
    }

    pub fn toggle_visible(&self) -> bool {
        !matches!(self, Self::Hidden)
    }

    pub fn default_mode(&self) -> TransportMode {
        match self {
            Self::ActiveDefault => TransportMode::Cautious,
            _ => TransportMode::Normal,
        }
    }
}

// ─── Persistence ──────────────────────────────────────────────────────────────

/// Persists the last chosen mode.
pub trait ModeStore: Send + Sync {
    fn load(&self) -> Result<Option<TransportMode>, ModeStoreError>;
    fn save(&self, mode: TransportMode) -> Result<(), ModeStoreError>;
    fn clear(&self) -> Result<(), ModeStoreError>;
}

/// In-memory store (tests, embedding).
#[derive(Debug, Default)]
pub struct MemoryModeStore {
    value: Mutex<Option<TransportMode>>,
}

impl MemoryModeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mode: TransportMode) -> Self {
        Self {
            value: Mutex::new(Some(mode)),
        }
    }
}

impl ModeStore for MemoryModeStore {
    fn load(&self) -> Result<Option<TransportMode>, ModeStoreError> {
        Ok(*self.value.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn save(&self, mode: TransportMode) -> Result<(), ModeStoreError> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(mode);
        Ok(())
    }

    fn clear(&self) -> Result<(), ModeStoreError> {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}

/// Key/value JSON file, e.g. `~/.config/tipstream/state.json`:
/// `{ "megaTip.transportMode": "cautious" }`.
///
/// Other keys in the file are preserved.
#[derive(Debug, Clone)]
pub struct FileModeStore {
    path: PathBuf,
}

impl FileModeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, serde_json::Value>, ModeStoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, serde_json::Value>) -> Result<(), ModeStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_vec_pretty(map)?)?;
        Ok(())
    }
}

impl ModeStore for FileModeStore {
    fn load(&self) -> Result<Option<TransportMode>, ModeStoreError> {
        let map = self.read_map()?;
        Ok(map
            .get(MODE_STORAGE_KEY)
            .and_then(|v| v.as_str())
            .and_then(TransportMode::parse))
    }

    fn save(&self, mode: TransportMode) -> Result<(), ModeStoreError> {
        let mut map = self.read_map()?;
        map.insert(MODE_STORAGE_KEY.into(), mode.as_str().into());
        self.write_map(&map)
    }

    fn clear(&self) -> Result<(), ModeStoreError> {
        let mut map = self.read_map()?;
        if map.remove(MODE_STORAGE_KEY).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

// ─── Controls ─────────────────────────────────────────────────────────────────

/// Owns the current transport mode and broadcasts changes to engines.
pub struct TransportControls {
    flag: SliderFlag,
    store: Arc<dyn ModeStore>,
    tx: watch::Sender<TransportMode>,
}

impl TransportControls {
    /// Resolve the starting mode from the flag and the store.
    pub fn new(flag: SliderFlag, store: Arc<dyn ModeStore>) -> Self {
        let default_mode = flag.default_mode();
        let mode = if flag.toggle_visible() {
            match store.load() {
                Ok(stored) => stored.unwrap_or(default_mode),
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read stored transport mode");
                    default_mode
                }
            }
        } else {
            if let Err(e) = store.clear() {
                tracing::warn!(error = %e, "failed to clear stored transport mode");
            }
            default_mode
        };
        tracing::debug!(?flag, %mode, "transport controls initialised");
        let (tx, _rx) = watch::channel(mode);
        Self { flag, store, tx }
    }

    pub fn flag(&self) -> SliderFlag {
        self.flag
    }

    pub fn toggle_visible(&self) -> bool {
        self.flag.toggle_visible()
    }

    pub fn default_mode(&self) -> TransportMode {
        self.flag.default_mode()
    }

    /// The effective mode.
    pub fn mode(&self) -> TransportMode {
        *self.tx.borrow()
    }

    /// Persist and apply a new mode.
    ///
    /// Returns `Ok(false)` and does nothing when the toggle is hidden. A store
    /// failure leaves the current mode in place.
    pub fn set_mode(&self, mode: TransportMode) -> Result<bool, ModeStoreError> {
        if !self.toggle_visible() {
            return Ok(false);
        }
        self.store.save(mode).map_err(|e| {
            tracing::warn!(error = %e, %mode, "failed to persist transport mode");
            e
        })?;
        self.tx.send_if_modified(|current| {
            let changed = *current != mode;
            *current = mode;
            changed
        });
        Ok(true)
    }

    /// Receiver that observes every mode change.
    pub fn subscribe(&self) -> watch::Receiver<TransportMode> {
        self.tx.subscribe()
    }
}
