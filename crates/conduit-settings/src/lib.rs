//! # conduit-settings
//!
//! Configuration for the conduit bridge.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`ConduitSettings::default()`]
//! 2. **Settings file**: `conduit.json` or `$CONDUIT_CONFIG` (deep-merged over defaults)
//! 3. **Environment variables**: `CONDUIT_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::{CommandSettings, ConduitSettings, ConnectionSettings, LoggingSettings};
