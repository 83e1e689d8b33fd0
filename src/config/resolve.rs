//! Config merge
//!
//! Precedence, lowest to highest: built-in defaults, theme, `typingStatus`,
//! `network`, `menu`, `avatar`. Every layer overrides only the fields it
//! sets; siblings keep the value from the layer below.

use super::{PartialSessionConfig, SessionConfig};
use serde_json::Value;

/// Merge caller overrides over the defaults
///
/// Pure: no I/O, no validation beyond what the types already enforce.
pub fn resolve(overrides: &PartialSessionConfig) -> SessionConfig {
    let mut config = SessionConfig::default();

    if let Some(url) = &overrides.url {
        config.url.clone_from(url);
    }
    if let Some(theme) = &overrides.theme {
        config.theme = config.theme.merged(theme);
    }
    if let Some(typing_status) = &overrides.typing_status {
        config.typing_status = config.typing_status.merged(typing_status);
    }
    if let Some(network) = &overrides.network {
        config.network = config.network.merged(network);
    }
    if let Some(menu) = &overrides.menu {
        merge_json(&mut config.menu, menu);
    }
    // An empty avatar falls back to the default one
    if let Some(avatar) = overrides.avatar.as_deref().filter(|a| !a.is_empty()) {
        config.avatar = avatar.to_string();
    }

    config
}

/// Deep-merge `overlay` into `base`
///
/// Objects merge key by key; any other value replaces what was there.
pub fn merge_json(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}
