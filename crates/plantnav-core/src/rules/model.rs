//! Mode, submode and layer rule types
//!
//! These are the deserialized shapes of the rule table. They carry no
//! behaviour beyond lookups; validation lives in `rules::validation` and
//! composition in `layers::compose`.

use std::collections::BTreeMap;

use plantnav_core_types::schema::{
    TOPIC_EDITOR_INIT, TOPIC_RENDER_INIT, TOPIC_RENDER_START, TOPIC_RENDER_STOP,
};
use serde::{Deserialize, Serialize};

/// Layer key to visibility.
///
/// Ordered so that composition output and logs are deterministic.
pub type LayerMap = BTreeMap<String, bool>;

/// How a layer's DOM element is shown or hidden
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerPresentation {
    /// Toggle CSS classes: `shown_class` is present while visible,
    /// `hidden_class` is present while hidden.
    Class {
        #[serde(default)]
        shown_class: Option<String>,
        #[serde(default)]
        hidden_class: Option<String>,
    },
    /// Write an inline style property
    Style {
        #[serde(default = "default_style_property")]
        property: String,
        shown: String,
        hidden: String,
    },
    /// Delegate to a handler registered under `handler`
    Custom { handler: String },
}

fn default_style_property() -> String {
    "display".to_string()
}

/// A named DOM region whose visibility is governed by the rule table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDescriptor {
    /// Layer key used in visibility maps
    pub key: String,
    /// DOM locator of the element backing the layer
    pub element: String,
    pub presentation: LayerPresentation,
}

/// Flags a submode can raise when it becomes active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionFlag {
    Init3d,
    StartAnimation,
    StopAnimation,
    InitSecondaryEditor,
}

impl OptionFlag {
    /// Bus topic published when the flag is set on the incoming submode
    pub fn topic(&self) -> &'static str {
        match self {
            OptionFlag::Init3d => TOPIC_RENDER_INIT,
            OptionFlag::StartAnimation => TOPIC_RENDER_START,
            OptionFlag::StopAnimation => TOPIC_RENDER_STOP,
            OptionFlag::InitSecondaryEditor => TOPIC_EDITOR_INIT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionFlag::Init3d => "init_3d",
            OptionFlag::StartAnimation => "start_animation",
            OptionFlag::StopAnimation => "stop_animation",
            OptionFlag::InitSecondaryEditor => "init_secondary_editor",
        }
    }
}

/// Named boolean options of a submode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SubmodeOptions {
    /// The submode hosts the realtime 3D render loop; leaving it stops the loop
    pub realtime_render: bool,
    pub init_3d: bool,
    pub start_animation: bool,
    pub stop_animation: bool,
    pub init_secondary_editor: bool,
}

impl SubmodeOptions {
    /// Flags set on this submode, in publication order
    pub fn active_flags(&self) -> Vec<OptionFlag> {
        [
            (self.init_3d, OptionFlag::Init3d),
            (self.start_animation, OptionFlag::StartAnimation),
            (self.stop_animation, OptionFlag::StopAnimation),
            (self.init_secondary_editor, OptionFlag::InitSecondaryEditor),
        ]
        .into_iter()
        .filter_map(|(set, flag)| set.then_some(flag))
        .collect()
    }
}

/// A named variant within a mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmodeRule {
    pub key: String,
    /// Sparse overrides applied on top of the parent mode's base map
    #[serde(default)]
    pub layers: LayerMap,
    /// View activated through the view subsystem; `None` means the submode
    /// manages its own presentation
    #[serde(default)]
    pub view: Option<String>,
    /// Services notified on activation, in order
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub options: SubmodeOptions,
}

/// A top-level navigational destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeRule {
    pub key: String,
    /// Identifier of this mode in the external mode authority
    pub authority_mode: String,
    #[serde(default)]
    pub default_submode: Option<String>,
    #[serde(default)]
    pub requires_connection: bool,
    /// Base visibility for every declared layer
    pub layers: LayerMap,
    #[serde(default)]
    pub on_enter: Option<String>,
    #[serde(default)]
    pub on_exit: Option<String>,
    #[serde(default)]
    pub submodes: Vec<SubmodeRule>,
}

impl ModeRule {
    /// Look up a submode by key
    pub fn submode(&self, key: &str) -> Option<&SubmodeRule> {
        self.submodes.iter().find(|s| s.key == key)
    }

    /// Whether `key` is a legal child of this mode
    pub fn has_submode(&self, key: &str) -> bool {
        self.submode(key).is_some()
    }

    /// The configured default submode rule, if any
    pub fn default_submode_rule(&self) -> Option<&SubmodeRule> {
        self.default_submode
            .as_deref()
            .and_then(|key| self.submode(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_mode() -> ModeRule {
        ModeRule {
            key: "monitoring".to_string(),
            authority_mode: "MONITORING".to_string(),
            default_submode: Some("3d-view".to_string()),
            requires_connection: true,
            layers: LayerMap::new(),
            on_enter: None,
            on_exit: None,
            submodes: vec![
                SubmodeRule {
                    key: "3d-view".to_string(),
                    layers: LayerMap::new(),
                    view: None,
                    services: vec![],
                    options: SubmodeOptions::default(),
                },
                SubmodeRule {
                    key: "ranking-view".to_string(),
                    layers: LayerMap::new(),
                    view: Some("ranking-view".to_string()),
                    services: vec!["MonitoringService".to_string()],
                    options: SubmodeOptions {
                        stop_animation: true,
                        ..Default::default()
                    },
                },
            ],
        }
    }

    #[test]
    fn test_submode_lookup() {
        let mode = sample_mode();
        assert!(mode.has_submode("ranking-view"));
        assert!(!mode.has_submode("mapping"));
        assert_eq!(
            mode.default_submode_rule().map(|s| s.key.as_str()),
            Some("3d-view")
        );
    }

    #[test]
    fn test_active_flags_order() {
        let options = SubmodeOptions {
            init_secondary_editor: true,
            init_3d: true,
            stop_animation: true,
            ..Default::default()
        };
        assert_eq!(
            options.active_flags(),
            vec![
                OptionFlag::Init3d,
                OptionFlag::StopAnimation,
                OptionFlag::InitSecondaryEditor
            ]
        );
        assert!(SubmodeOptions::default().active_flags().is_empty());
    }

    #[test]
    fn test_realtime_render_is_not_a_published_flag() {
        let options = SubmodeOptions {
            realtime_render: true,
            ..Default::default()
        };
        assert!(options.active_flags().is_empty());
    }

    #[test]
    fn test_option_flag_topics() {
        assert_eq!(OptionFlag::StopAnimation.topic(), TOPIC_RENDER_STOP);
        assert_eq!(OptionFlag::InitSecondaryEditor.topic(), TOPIC_EDITOR_INIT);
    }

    #[test]
    fn test_unknown_option_is_rejected() {
        let yaml = "stop_animation: true\nwarp_speed: true\n";
        let parsed: Result<SubmodeOptions, _> = serde_yaml::from_str(yaml);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_style_presentation_defaults_to_display() {
        let yaml = "kind: style\nshown: block\nhidden: none\n";
        let parsed: LayerPresentation = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            parsed,
            LayerPresentation::Style {
                property: "display".to_string(),
                shown: "block".to_string(),
                hidden: "none".to_string(),
            }
        );
    }
}
