//! Layer compositor
//!
//! Merges a mode's base visibility map with a submode's sparse overrides.
//! Pure: identical inputs always produce identical maps.

use tracing::{debug, warn};

use crate::errors::{NavError, Result};
use crate::rules::{LayerMap, RuleTable};

/// Compose the visibility map for `mode`/`submode`
///
/// An unknown mode yields an empty map (hide nothing) and a `rule not found`
/// warning. A submode that is not a legal child of the mode is ignored and
/// only the base map is returned.
pub fn compose_layers(rules: &RuleTable, mode: &str, submode: Option<&str>) -> LayerMap {
    match try_compose_layers(rules, mode, submode) {
        Ok(map) => map,
        Err(err) => {
            warn!(mode, submode, error = %err, "rule not found, composing empty layer map");
            LayerMap::new()
        }
    }
}

/// Like `compose_layers` but surfaces an unknown mode as an error
///
/// # Errors
/// Returns `NavError::UnknownMode` if `mode` is not declared.
pub fn try_compose_layers(rules: &RuleTable, mode: &str, submode: Option<&str>) -> Result<LayerMap> {
    let rule = rules.mode(mode).ok_or_else(|| NavError::UnknownMode {
        mode: mode.to_string(),
    })?;

    let mut layers = rule.layers.clone();

    if let Some(sub_key) = submode {
        match rule.submode(sub_key) {
            Some(sub) => {
                for (layer, visible) in &sub.layers {
                    layers.insert(layer.clone(), *visible);
                }
            }
            None => {
                debug!(mode, submode = sub_key, "submode is not a child of mode, using base layers");
            }
        }
    }

    Ok(layers)
}
