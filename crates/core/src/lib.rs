//! askboard core library
//!
//! Foundations shared by every askboard crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging setup
//! - Configuration loading

pub mod config;
pub mod error;
pub mod logging;

pub use config::{AppConfig, GateSettings, ProviderConfig};
pub use error::{AppError, AppResult};
