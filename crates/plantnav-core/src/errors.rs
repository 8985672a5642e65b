use plantnav_core_types::TransitionId;
use thiserror::Error;

/// Result type alias using NavError
pub type Result<T> = std::result::Result<T, NavError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// This taxonomy provides a stable, structured classification of all errors
/// raised by the navigation core. Each kind maps to a stable error code that
/// can be used for programmatic error handling, testing and published
/// `navigation:error` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Programmer errors
    InvalidInput,
    InvalidRules,
    UnknownMode,
    UnknownSubmode,
    UnknownPanel,
    UnknownLayer,

    // Gated preconditions
    PanelNotAllowed,
    TransitionInProgress,
    ConnectionRequired,
    HistoryOutOfRange,

    // Collaborators
    CollaboratorFailed,
    CollaboratorMissing,
    ElementNotFound,
    MissingLayerHandler,

    // Integration/IO
    Io,
    Serialization,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidRules => "ERR_INVALID_RULES",
            ExErrorKind::UnknownMode => "ERR_UNKNOWN_MODE",
            ExErrorKind::UnknownSubmode => "ERR_UNKNOWN_SUBMODE",
            ExErrorKind::UnknownPanel => "ERR_UNKNOWN_PANEL",
            ExErrorKind::UnknownLayer => "ERR_UNKNOWN_LAYER",
            ExErrorKind::PanelNotAllowed => "ERR_PANEL_NOT_ALLOWED",
            ExErrorKind::TransitionInProgress => "ERR_TRANSITION_IN_PROGRESS",
            ExErrorKind::ConnectionRequired => "ERR_CONNECTION_REQUIRED",
            ExErrorKind::HistoryOutOfRange => "ERR_HISTORY_OUT_OF_RANGE",
            ExErrorKind::CollaboratorFailed => "ERR_COLLABORATOR_FAILED",
            ExErrorKind::CollaboratorMissing => "ERR_COLLABORATOR_MISSING",
            ExErrorKind::ElementNotFound => "ERR_ELEMENT_NOT_FOUND",
            ExErrorKind::MissingLayerHandler => "ERR_MISSING_LAYER_HANDLER",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// This error type provides a structured representation of errors with
/// classification fields for programmatic handling and rich context for debugging.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    mode: Option<String>,
    submode: Option<String>,
    transition_id: Option<TransitionId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            mode: None,
            submode: None,
            transition_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context (panel key, layer key, view id, ...)
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add mode context
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Add submode context
    pub fn with_submode(mut self, submode: impl Into<String>) -> Self {
        self.submode = Some(submode.into());
        self
    }

    /// Add transition ID context
    pub fn with_transition_id(mut self, transition_id: TransitionId) -> Self {
        self.transition_id = Some(transition_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the entity ID context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the mode context, if any
    pub fn mode(&self) -> Option<&str> {
        self.mode.as_deref()
    }

    /// Get the submode context, if any
    pub fn submode(&self) -> Option<&str> {
        self.submode.as_deref()
    }

    /// Get the transition ID context, if any
    pub fn transition_id(&self) -> Option<&TransitionId> {
        self.transition_id.as_ref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the source error, if any
    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(mode) = &self.mode {
            write!(f, " (mode: {})", mode)?;
        }
        if let Some(submode) = &self.submode {
            write!(f, " (submode: {})", submode)?;
        }
        if let Some(source) = &self.source {
            write!(f, " caused by {}", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain error taxonomy for navigation and panel operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NavError {
    // ===== Programmer Errors =====
    /// Mode key is not declared in the rule table
    #[error("Unknown mode: {mode}")]
    UnknownMode { mode: String },

    /// Submode key is not a legal child of the mode
    #[error("Unknown submode {submode} for mode {mode}")]
    UnknownSubmode { mode: String, submode: String },

    /// Submode key is not declared under any mode
    #[error("Submode {submode} is not declared under any mode")]
    OrphanSubmode { submode: String },

    /// Panel key is not declared in the panel rule table
    #[error("Unknown panel: {panel}")]
    UnknownPanel { panel: String },

    /// Layer key is not declared in the layer catalogue
    #[error("Unknown layer: {layer}")]
    UnknownLayer { layer: String },

    /// Rule table failed load-time validation
    #[error("Invalid rule table: {reason}")]
    InvalidRules { reason: String },

    /// Navigator configuration is inconsistent with the rule table
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // ===== Gated Preconditions =====
    /// Panel is not legal in the tracked mode/submode
    #[error("Panel {panel} is not allowed in mode {mode}")]
    PanelNotAllowed { panel: String, mode: String },

    /// Another transition is in flight and force was not requested
    #[error("Navigation to {mode} rejected: a transition is already in progress")]
    TransitionInProgress { mode: String },

    /// Mode requires a live connection that is not available
    #[error("Mode {mode} requires a connection")]
    ConnectionRequired { mode: String },

    /// History index does not address a stored entry
    #[error("History index {index} out of range (len {len})")]
    HistoryIndexOutOfRange { index: usize, len: usize },

    // ===== Collaborator Failures =====
    /// DOM element for a layer or panel could not be located
    #[error("Element not found: {locator}")]
    ElementNotFound { locator: String },

    /// Layer uses a custom presentation whose handler was never registered
    #[error("No handler registered for custom layer presentation {handler}")]
    MissingLayerHandler { handler: String },

    /// Panel close dispatch found no live instance
    #[error("No live instance registered for panel {panel} (target {target})")]
    PanelInstanceMissing { panel: String, target: String },

    /// Optional collaborator was not provided
    #[error("Collaborator unavailable: {collaborator}")]
    CollaboratorMissing { collaborator: String },

    /// Downstream collaborator call failed
    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: String,
        message: String,
    },

    // ===== Generic Errors =====
    /// Rule or config file parse error
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File could not be read
    #[error("IO error: {message}")]
    Io { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Conversion from NavError to ExError
impl From<NavError> for ExError {
    fn from(err: NavError) -> Self {
        let message = err.to_string();
        match err {
            NavError::UnknownMode { mode } => ExError::new(ExErrorKind::UnknownMode)
                .with_mode(mode)
                .with_message(message),

            NavError::UnknownSubmode { mode, submode } => {
                ExError::new(ExErrorKind::UnknownSubmode)
                    .with_mode(mode)
                    .with_submode(submode)
                    .with_message(message)
            }

            NavError::OrphanSubmode { submode } => ExError::new(ExErrorKind::UnknownSubmode)
                .with_submode(submode)
                .with_message(message),

            NavError::UnknownPanel { panel } => ExError::new(ExErrorKind::UnknownPanel)
                .with_entity_id(panel)
                .with_message(message),

            NavError::UnknownLayer { layer } => ExError::new(ExErrorKind::UnknownLayer)
                .with_entity_id(layer)
                .with_message(message),

            NavError::InvalidRules { .. } => ExError::new(ExErrorKind::InvalidRules)
                .with_op("load_rules")
                .with_message(message),

            NavError::InvalidConfig { .. } => ExError::new(ExErrorKind::InvalidInput)
                .with_op("load_config")
                .with_message(message),

            NavError::PanelNotAllowed { panel, mode } => {
                ExError::new(ExErrorKind::PanelNotAllowed)
                    .with_entity_id(panel)
                    .with_mode(mode)
                    .with_message(message)
            }

            NavError::TransitionInProgress { mode } => {
                ExError::new(ExErrorKind::TransitionInProgress)
                    .with_op("navigate")
                    .with_mode(mode)
                    .with_message(message)
            }

            NavError::ConnectionRequired { mode } => {
                ExError::new(ExErrorKind::ConnectionRequired)
                    .with_op("navigate")
                    .with_mode(mode)
                    .with_message(message)
            }

            NavError::HistoryIndexOutOfRange { .. } => {
                ExError::new(ExErrorKind::HistoryOutOfRange)
                    .with_op("go_to_history")
                    .with_message(message)
            }

            NavError::ElementNotFound { locator } => {
                ExError::new(ExErrorKind::ElementNotFound)
                    .with_entity_id(locator)
                    .with_message(message)
            }

            NavError::MissingLayerHandler { handler } => {
                ExError::new(ExErrorKind::MissingLayerHandler)
                    .with_entity_id(handler)
                    .with_message(message)
            }

            NavError::PanelInstanceMissing { panel, .. } => {
                ExError::new(ExErrorKind::CollaboratorMissing)
                    .with_op("close_panel")
                    .with_entity_id(panel)
                    .with_message(message)
            }

            NavError::CollaboratorMissing { collaborator } => {
                ExError::new(ExErrorKind::CollaboratorMissing)
                    .with_entity_id(collaborator)
                    .with_message(message)
            }

            NavError::Collaborator { collaborator, .. } => {
                ExError::new(ExErrorKind::CollaboratorFailed)
                    .with_entity_id(collaborator)
                    .with_message(message)
            }

            NavError::Serialization { .. } => {
                ExError::new(ExErrorKind::Serialization).with_message(message)
            }

            NavError::Io { .. } => ExError::new(ExErrorKind::Io).with_message(message),

            NavError::Internal { .. } => ExError::new(ExErrorKind::Internal).with_message(message),
        }
    }
}

/// Shorthand for the error a collaborator returns when a downstream call fails
pub fn collaborator_failed(collaborator: &str, message: impl Into<String>) -> ExError {
    NavError::Collaborator {
        collaborator: collaborator.to_string(),
        message: message.into(),
    }
    .into()
}
