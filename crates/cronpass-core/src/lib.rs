//! `cronpass-core` — configuration and shared helpers for cronpass.
//!
//! Holds the pieces every other crate needs: the TOML + env configuration
//! layer, the shared error type, and small formatting helpers. No scheduling
//! logic lives here.

pub mod config;
pub mod duration;
pub mod error;

pub use config::CronpassConfig;
pub use error::{CronpassError, Result};
