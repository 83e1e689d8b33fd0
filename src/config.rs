//! Session configuration
//!
//! Layered configuration: built-in defaults, theme, caller overrides, and
//! per-field overrides are merged once into an immutable [`SessionConfig`].

mod resolve;
mod source;
mod types;

pub use resolve::{merge_json, resolve};
pub use source::ConfigError;
pub use types::*;
