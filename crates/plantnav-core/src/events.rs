//! Events published on the navigation bus
//!
//! Every event knows its topic. Hook topics and panel close notifications
//! come from the rule table; the rest are fixed schema topics.

use plantnav_core_types::schema::{
    TOPIC_NAVIGATION_BLOCKED, TOPIC_NAVIGATION_COMPLETE, TOPIC_NAVIGATION_ERROR,
    TOPIC_NAVIGATION_START, TOPIC_PANEL_ALL_CLOSED, TOPIC_PANEL_CLOSED,
    TOPIC_PANEL_MODE_CHANGE_PROCESSED, TOPIC_PANEL_OPENED, TOPIC_RENDER_LOOP_STOP,
    TOPIC_SERVICE_ACTIVATE,
};
use plantnav_core_types::TransitionId;
use serde::Serialize;
use serde_json::Value;

use crate::rules::OptionFlag;
use crate::state::NavigationState;

/// Why a panel was closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Closed by reconciliation after a navigation
    ModeChange,
    /// Closed by the user
    User,
    /// Closed by application code
    Programmatic,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloseReason::ModeChange => "mode_change",
            CloseReason::User => "user",
            CloseReason::Programmatic => "programmatic",
        }
    }
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Enter or exit side of a mode hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HookPhase {
    Enter,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavEvent {
    NavigationStart {
        transition_id: TransitionId,
        from: String,
        mode: String,
        submode: Option<String>,
        data: Option<Value>,
    },
    NavigationComplete {
        transition_id: TransitionId,
        state: NavigationState,
        previous: Option<NavigationState>,
        data: Option<Value>,
    },
    NavigationError {
        transition_id: Option<TransitionId>,
        mode: String,
        submode: Option<String>,
        code: String,
        message: String,
    },
    NavigationBlocked {
        mode: String,
        submode: Option<String>,
        reason: String,
    },
    /// Mode enter/exit hook; the topic is the hook name
    Hook {
        name: String,
        phase: HookPhase,
        mode: String,
        submode: Option<String>,
        data: Option<Value>,
    },
    ServiceActivation {
        service: String,
        mode: String,
        submode: Option<String>,
    },
    OptionRequested {
        flag: OptionFlag,
        mode: String,
        submode: Option<String>,
    },
    /// The outgoing realtime view must stop its render loop
    RenderLoopStop {
        mode: String,
        submode: Option<String>,
    },
    PanelOpened {
        panel: String,
    },
    PanelClosed {
        panel: String,
        reason: CloseReason,
    },
    /// Panel-specific close event declared in the rule table
    PanelCloseNotification {
        event: String,
        panel: String,
        reason: CloseReason,
    },
    AllPanelsClosed {
        reason: CloseReason,
        closed: Vec<String>,
    },
    ModeChangeProcessed {
        from_mode: Option<String>,
        from_submode: Option<String>,
        to_mode: String,
        to_submode: Option<String>,
        closed: Vec<String>,
    },
}

impl NavEvent {
    /// Bus topic this event is published under
    pub fn topic(&self) -> &str {
        match self {
            NavEvent::NavigationStart { .. } => TOPIC_NAVIGATION_START,
            NavEvent::NavigationComplete { .. } => TOPIC_NAVIGATION_COMPLETE,
            NavEvent::NavigationError { .. } => TOPIC_NAVIGATION_ERROR,
            NavEvent::NavigationBlocked { .. } => TOPIC_NAVIGATION_BLOCKED,
            NavEvent::Hook { name, .. } => name,
            NavEvent::ServiceActivation { .. } => TOPIC_SERVICE_ACTIVATE,
            NavEvent::OptionRequested { flag, .. } => flag.topic(),
            NavEvent::RenderLoopStop { .. } => TOPIC_RENDER_LOOP_STOP,
            NavEvent::PanelOpened { .. } => TOPIC_PANEL_OPENED,
            NavEvent::PanelClosed { .. } => TOPIC_PANEL_CLOSED,
            NavEvent::PanelCloseNotification { event, .. } => event,
            NavEvent::AllPanelsClosed { .. } => TOPIC_PANEL_ALL_CLOSED,
            NavEvent::ModeChangeProcessed { .. } => TOPIC_PANEL_MODE_CHANGE_PROCESSED,
        }
    }

    /// Whether the event belongs to the `navigation:*` family
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            NavEvent::NavigationStart { .. }
                | NavEvent::NavigationComplete { .. }
                | NavEvent::NavigationError { .. }
                | NavEvent::NavigationBlocked { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plantnav_core_types::schema::{TOPIC_RENDER_STOP, REASON_CONNECTION_REQUIRED};

    #[test]
    fn test_dynamic_topics() {
        let hook = NavEvent::Hook {
            name: "mode:analysis:enter".to_string(),
            phase: HookPhase::Enter,
            mode: "analysis".to_string(),
            submode: None,
            data: None,
        };
        assert_eq!(hook.topic(), "mode:analysis:enter");

        let notify = NavEvent::PanelCloseNotification {
            event: "panel:equipment-edit-modal:closed".to_string(),
            panel: "equipment-edit-modal".to_string(),
            reason: CloseReason::ModeChange,
        };
        assert_eq!(notify.topic(), "panel:equipment-edit-modal:closed");
    }

    #[test]
    fn test_option_topic_follows_flag() {
        let event = NavEvent::OptionRequested {
            flag: OptionFlag::StopAnimation,
            mode: "monitoring".to_string(),
            submode: Some("ranking-view".to_string()),
        };
        assert_eq!(event.topic(), TOPIC_RENDER_STOP);
        assert!(!event.is_navigation());
    }

    #[test]
    fn test_serializes_with_type_tag() {
        let event = NavEvent::NavigationBlocked {
            mode: "monitoring".to_string(),
            submode: None,
            reason: REASON_CONNECTION_REQUIRED.to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "navigation_blocked");
        assert_eq!(json["reason"], "connection_required");
        assert!(event.is_navigation());
    }

    #[test]
    fn test_close_reason_wire_names() {
        assert_eq!(CloseReason::ModeChange.as_str(), "mode_change");
        assert_eq!(
            serde_json::to_value(CloseReason::ModeChange).unwrap(),
            serde_json::json!("mode_change")
        );
    }
}
