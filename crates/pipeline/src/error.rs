//! Resolution errors and non-fatal render warnings.
//!
//! Errors abort the scene they occur in, and with it the whole batch.
//! Warnings are collected alongside the output and never stop rendering.

use serde::Serialize;
use tableau_core::error::CoreError;
use tableau_core::reference::Slot;
use tableau_core::types::EntityId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a single scene could not be resolved.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("Role '{role_id}' has no assigned actor")]
    UnassignedRole { role_id: EntityId },

    #[error("Role '{role_id}' has no {slot}: no scene candidates, no override and no actor base")]
    UnresolvedSlot { role_id: EntityId, slot: Slot },

    #[error("{count} prompt combinations exceed the limit of {limit}")]
    ExcessiveCombinations { count: u64, limit: u64 },

    #[error("Missing reference: {entity} '{id}'")]
    MissingReference { entity: &'static str, id: EntityId },

    #[error("Cut '{cut_id}' declares role token for '{role_id}' more than once")]
    DuplicateRole { cut_id: EntityId, role_id: EntityId },

    #[error("Invalid reference data: {0}")]
    Invalid(String),
}

impl From<CoreError> for ResolveError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => Self::MissingReference { entity, id },
            CoreError::Validation(msg) => Self::Invalid(msg),
        }
    }
}

/// A [`ResolveError`] tagged with the scene it occurred in.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Scene '{scene_name}' ({scene_id}): {source}")]
pub struct SceneError {
    pub scene_id: EntityId,
    pub scene_name: String,
    #[source]
    pub source: ResolveError,
}

/// Failure of a whole batch run. No tasks are emitted when this is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BatchError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("Queue item '{queue_item_id}' references missing sequence '{sequence_id}'")]
    MissingSequence {
        queue_item_id: EntityId,
        sequence_id: EntityId,
    },

    #[error("Sequence '{sequence_id}' references missing scene '{scene_id}'")]
    MissingScene {
        sequence_id: EntityId,
        scene_id: EntityId,
    },

    #[error("Scene '{scene_id}' not found")]
    UnknownScene { scene_id: EntityId },

    #[error("Batch exceeds the maximum number of tasks ({max})")]
    OrdinalOverflow { max: u32 },
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Which of a cut's two templates a warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Positive,
    Negative,
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        })
    }
}

/// Non-fatal problems found while rendering a scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderWarning {
    /// A role's token does not occur in the positive template, or the
    /// template holds a bracket token no role fills. The text is left as is.
    TemplatePlaceholderMissing {
        scene_id: EntityId,
        template: TemplateKind,
        token: String,
        role_id: Option<EntityId>,
    },

    /// The scene has no usable parameter set; the default set was used.
    MissingParameterSet {
        scene_id: EntityId,
        sd_param_id: Option<EntityId>,
        reason: String,
    },
}

impl std::fmt::Display for RenderWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TemplatePlaceholderMissing {
                scene_id,
                template,
                token,
                role_id: Some(role_id),
            } => write!(
                f,
                "Scene '{scene_id}': {template} template has no {token} for role '{role_id}'"
            ),
            Self::TemplatePlaceholderMissing {
                scene_id,
                template,
                token,
                role_id: None,
            } => write!(
                f,
                "Scene '{scene_id}': {template} template token {token} matches no role"
            ),
            Self::MissingParameterSet {
                scene_id, reason, ..
            } => write!(f, "Scene '{scene_id}': using default parameters ({reason})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
