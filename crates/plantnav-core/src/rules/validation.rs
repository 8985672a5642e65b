use std::collections::HashSet;

use crate::errors::{NavError, Result};

use super::model::{LayerDescriptor, LayerPresentation, ModeRule};
use super::panel::{DomCloseAction, PanelCloseMethod, PanelRule, WILDCARD};
use super::table::{RuleDocument, SUPPORTED_SCHEMA_VERSION};

fn invalid(reason: impl Into<String>) -> NavError {
    NavError::InvalidRules {
        reason: reason.into(),
    }
}

/// Whether `name` is usable as a hook, service, view, handler or event name
pub fn is_well_formed_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-'))
}

fn check_name(kind: &str, owner: &str, name: &str) -> Result<()> {
    if is_well_formed_name(name) {
        Ok(())
    } else {
        Err(invalid(format!("{} {:?} of {} is malformed", kind, name, owner)))
    }
}

/// Validate a parsed rule document
///
/// Checks run in a fixed order and the first violation is returned:
///
/// 1. Schema version
/// 2. Layer catalogue (unique keys, locators, presentation names)
/// 3. Modes (unique keys, complete base maps, submodes, hooks, services, views, options)
/// 4. Panels (unique keys, allowed lists resolve, close methods are complete)
///
/// # Errors
/// Returns `NavError::InvalidRules` describing the first violation.
pub fn validate_document(doc: &RuleDocument) -> Result<()> {
    if doc.schema_version != SUPPORTED_SCHEMA_VERSION {
        return Err(invalid(format!(
            "Unsupported schema_version: {}. Expected {}",
            doc.schema_version, SUPPORTED_SCHEMA_VERSION
        )));
    }

    let layer_keys = validate_layers(&doc.layers)?;
    validate_modes(&doc.modes, &layer_keys)?;
    validate_panels(&doc.panels, &doc.modes)?;
    Ok(())
}

fn validate_layers(layers: &[LayerDescriptor]) -> Result<HashSet<&str>> {
    let mut keys = HashSet::new();
    for layer in layers {
        if layer.key.trim().is_empty() {
            return Err(invalid("Layer key cannot be empty"));
        }
        if !keys.insert(layer.key.as_str()) {
            return Err(invalid(format!("Duplicate layer key {}", layer.key)));
        }
        if layer.element.trim().is_empty() {
            return Err(invalid(format!("Layer {} has an empty element locator", layer.key)));
        }
        match &layer.presentation {
            LayerPresentation::Class {
                shown_class,
                hidden_class,
            } => {
                if shown_class.is_none() && hidden_class.is_none() {
                    return Err(invalid(format!(
                        "Layer {} uses class presentation without shown_class or hidden_class",
                        layer.key
                    )));
                }
            }
            LayerPresentation::Style { property, .. } => {
                if property.trim().is_empty() {
                    return Err(invalid(format!("Layer {} has an empty style property", layer.key)));
                }
            }
            LayerPresentation::Custom { handler } => {
                check_name("handler", &layer.key, handler)?;
            }
        }
    }
    Ok(keys)
}

fn validate_modes(modes: &[ModeRule], layer_keys: &HashSet<&str>) -> Result<()> {
    if modes.is_empty() {
        return Err(invalid("Rule table declares no modes"));
    }

    let mut mode_keys = HashSet::new();
    for mode in modes {
        if mode.key.trim().is_empty() {
            return Err(invalid("Mode key cannot be empty"));
        }
        if !mode_keys.insert(mode.key.as_str()) {
            return Err(invalid(format!("Duplicate mode key {}", mode.key)));
        }
        check_name("authority_mode", &mode.key, &mode.authority_mode)?;

        // Base map must name every layer exactly once
        for key in mode.layers.keys() {
            if !layer_keys.contains(key.as_str()) {
                return Err(invalid(format!(
                    "Mode {} references undeclared layer {}",
                    mode.key, key
                )));
            }
        }
        for key in layer_keys {
            if !mode.layers.contains_key(*key) {
                return Err(invalid(format!(
                    "Mode {} does not set a base visibility for layer {}",
                    mode.key, key
                )));
            }
        }

        for hook in mode.on_enter.iter().chain(mode.on_exit.iter()) {
            check_name("hook", &mode.key, hook)?;
        }

        let mut submode_keys = HashSet::new();
        for submode in &mode.submodes {
            let owner = format!("{}/{}", mode.key, submode.key);
            if submode.key.trim().is_empty() {
                return Err(invalid(format!("Mode {} has a submode with an empty key", mode.key)));
            }
            if !submode_keys.insert(submode.key.as_str()) {
                return Err(invalid(format!(
                    "Duplicate submode key {} in mode {}",
                    submode.key, mode.key
                )));
            }
            for key in submode.layers.keys() {
                if !layer_keys.contains(key.as_str()) {
                    return Err(invalid(format!(
                        "Submode {} overrides undeclared layer {}",
                        owner, key
                    )));
                }
            }
            if let Some(view) = &submode.view {
                check_name("view", &owner, view)?;
            }
            for service in &submode.services {
                check_name("service", &owner, service)?;
            }
            if submode.options.start_animation && submode.options.stop_animation {
                return Err(invalid(format!(
                    "Submode {} sets both start_animation and stop_animation",
                    owner
                )));
            }
        }

        if let Some(default) = &mode.default_submode {
            if !submode_keys.contains(default.as_str()) {
                return Err(invalid(format!(
                    "Mode {} has default submode {} which it does not declare",
                    mode.key, default
                )));
            }
        }
    }
    Ok(())
}

fn validate_panels(panels: &[PanelRule], modes: &[ModeRule]) -> Result<()> {
    let mut panel_keys = HashSet::new();
    for panel in panels {
        if panel.key.trim().is_empty() {
            return Err(invalid("Panel key cannot be empty"));
        }
        if !panel_keys.insert(panel.key.as_str()) {
            return Err(invalid(format!("Duplicate panel key {}", panel.key)));
        }
        if panel.allowed_modes.is_empty() {
            return Err(invalid(format!("Panel {} has no allowed modes", panel.key)));
        }
        if panel.allowed_submodes.is_empty() {
            return Err(invalid(format!("Panel {} has no allowed submodes", panel.key)));
        }

        let candidate_modes: Vec<&ModeRule> = if panel.allows_any_mode() {
            modes.iter().collect()
        } else {
            let mut resolved = Vec::new();
            for key in &panel.allowed_modes {
                match modes.iter().find(|m| &m.key == key) {
                    Some(mode) => resolved.push(mode),
                    None => {
                        return Err(invalid(format!(
                            "Panel {} allows undeclared mode {}",
                            panel.key, key
                        )))
                    }
                }
            }
            resolved
        };

        for sub in &panel.allowed_submodes {
            if sub == WILDCARD {
                continue;
            }
            if !candidate_modes.iter().any(|m| m.has_submode(sub)) {
                return Err(invalid(format!(
                    "Panel {} allows submode {} which none of its modes declare",
                    panel.key, sub
                )));
            }
        }

        match &panel.close {
            PanelCloseMethod::Instance { target } => {
                if target.trim().is_empty() {
                    return Err(invalid(format!("Panel {} has an empty instance target", panel.key)));
                }
            }
            PanelCloseMethod::Dom {
                selector,
                action,
                class,
            } => {
                if selector.trim().is_empty() {
                    return Err(invalid(format!("Panel {} has an empty selector", panel.key)));
                }
                let needs_class = matches!(
                    action,
                    DomCloseAction::AddClass | DomCloseAction::RemoveClass
                );
                if needs_class && class.as_deref().map_or(true, |c| c.trim().is_empty()) {
                    return Err(invalid(format!(
                        "Panel {} closes by class but declares no class",
                        panel.key
                    )));
                }
            }
        }

        if let Some(event) = &panel.close_event {
            check_name("close_event", &panel.key, event)?;
        }
    }
    Ok(())
}
