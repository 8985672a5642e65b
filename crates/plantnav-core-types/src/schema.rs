//! Canonical schema constants for structured logging and bus events
//!
//! These constants ensure consistency across logging, error reporting and
//! the topics published on the event bus.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_TRANSITION_ID: &str = "transition_id";

// Navigation identifiers
pub const FIELD_MODE: &str = "mode";
pub const FIELD_SUBMODE: &str = "submode";
pub const FIELD_PANEL: &str = "panel";
pub const FIELD_LAYER: &str = "layer";
pub const FIELD_STEP: &str = "step";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical log event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Navigation lifecycle topics
pub const TOPIC_NAVIGATION_START: &str = "navigation:start";
pub const TOPIC_NAVIGATION_COMPLETE: &str = "navigation:complete";
pub const TOPIC_NAVIGATION_ERROR: &str = "navigation:error";
pub const TOPIC_NAVIGATION_BLOCKED: &str = "navigation:blocked";

// Pipeline request topics
pub const TOPIC_SERVICE_ACTIVATE: &str = "service:activate";
pub const TOPIC_RENDER_INIT: &str = "render:init-requested";
pub const TOPIC_RENDER_START: &str = "render:start-requested";
pub const TOPIC_RENDER_STOP: &str = "render:stop-requested";
pub const TOPIC_RENDER_LOOP_STOP: &str = "render:loop-stop-requested";
pub const TOPIC_EDITOR_INIT: &str = "editor:init-requested";

// Panel lifecycle topics
pub const TOPIC_PANEL_OPENED: &str = "panel:opened";
pub const TOPIC_PANEL_CLOSED: &str = "panel:closed";
pub const TOPIC_PANEL_ALL_CLOSED: &str = "panel:all-closed";
pub const TOPIC_PANEL_MODE_CHANGE_PROCESSED: &str = "panel:mode-change-processed";

/// Subscribe-to-everything topic accepted by the local event bus
pub const TOPIC_WILDCARD: &str = "*";

/// Reason code published with a blocked navigation when the connection gate fails
pub const REASON_CONNECTION_REQUIRED: &str = "connection_required";
