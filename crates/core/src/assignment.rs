//! Caller-supplied casting for one resolution pass: which actor plays
//! each role, and optional per-role appearance overrides.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::reference::Slot;
use crate::types::EntityId;

/// Role id -> actor id.
pub type ActorAssignments = BTreeMap<EntityId, EntityId>;

/// Role id -> appearance override.
pub type AppearanceOverrides = BTreeMap<EntityId, RoleOverride>;

/// Legacy literal meaning "no override" in stored override maps.
const LEGACY_DEFAULT_SENTINEL: &str = "default";

// ---------------------------------------------------------------------------
// Slot override
// ---------------------------------------------------------------------------

/// Override for a single appearance slot.
///
/// Serialized as `null` or an id string. On input, a missing field, an
/// empty string and the legacy `"default"` literal all mean
/// [`SlotOverride::UseDefault`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SlotOverride {
    #[default]
    UseDefault,
    Override(EntityId),
}

impl SlotOverride {
    pub fn from_raw(raw: Option<String>) -> Self {
        match raw {
            Some(id) if !id.is_empty() && id != LEGACY_DEFAULT_SENTINEL => Self::Override(id),
            _ => Self::UseDefault,
        }
    }

    pub fn as_override(&self) -> Option<&EntityId> {
        match self {
            Self::UseDefault => None,
            Self::Override(id) => Some(id),
        }
    }
}

impl Serialize for SlotOverride {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::UseDefault => serializer.serialize_none(),
            Self::Override(id) => serializer.serialize_some(id),
        }
    }
}

impl<'de> Deserialize<'de> for SlotOverride {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<String>::deserialize(deserializer).map(Self::from_raw)
    }
}

/// Appearance overrides for one role.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleOverride {
    #[serde(default, rename = "costume_id")]
    pub costume: SlotOverride,
    #[serde(default, rename = "pose_id")]
    pub pose: SlotOverride,
    #[serde(default, rename = "expression_id")]
    pub expression: SlotOverride,
}

impl RoleOverride {
    pub fn for_slot(&self, slot: Slot) -> &SlotOverride {
        match slot {
            Slot::Costume => &self.costume,
            Slot::Pose => &self.pose,
            Slot::Expression => &self.expression,
        }
    }
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// One scheduled run of a sequence with its casting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: EntityId,
    pub sequence_id: EntityId,
    #[serde(default)]
    pub actor_assignments: ActorAssignments,
    #[serde(default)]
    pub appearance_overrides: AppearanceOverrides,
    #[serde(default)]
    pub order: i64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
