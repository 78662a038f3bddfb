//! # shifts-settings
//!
//! Configuration with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`ShiftsSettings::default()`]
//! 2. **User file**: `~/.optimized-shifts/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `SHIFTS_*` overrides (highest priority)
//!
//! The binary's CLI flags are applied on top by the caller.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
