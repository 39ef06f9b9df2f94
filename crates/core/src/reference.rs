//! Reference library entities: works, characters, actors and the
//! reusable prompt parts they are dressed in.
//!
//! All types are plain data owned by the reference store. Links between
//! them (`Costume::state_ids`, `Actor::character_id`, ...) are IDs that
//! are resolved through [`crate::store::ReferenceStore`] at read time.

use serde::{Deserialize, Serialize};

use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Prompt parts
// ---------------------------------------------------------------------------

/// A named, tagged pair of positive/negative prompt fragments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferencePart {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: String,
}

pub type Pose = ReferencePart;
pub type Expression = ReferencePart;
pub type Background = ReferencePart;
pub type Lighting = ReferencePart;
pub type Composition = ReferencePart;
pub type Style = ReferencePart;
pub type AdditionalPrompt = ReferencePart;

/// Which character color a costume placeholder is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorRef {
    PersonalColor,
    UnderwearColor,
}

/// One `placeholder -> character color` binding on a costume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorPaletteItem {
    /// Literal token searched for in the costume text, e.g. `[C1]`.
    pub placeholder: String,
    pub color_ref: ColorRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Costume {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: String,
    /// Applied in list order; for a repeated placeholder the last entry wins.
    #[serde(default)]
    pub color_palette: Vec<ColorPaletteItem>,
    /// States this costume can be shown in, in author order.
    #[serde(default)]
    pub state_ids: Vec<EntityId>,
}

/// A costume condition (`wet`, `torn`, ...) grouped by category.
///
/// Scenes opt into states by category; see `Scene::state_categories`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub id: EntityId,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: String,
}

// ---------------------------------------------------------------------------
// Works, characters, actors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
    pub id: EntityId,
    #[serde(default)]
    pub title_jp: String,
    #[serde(default)]
    pub title_en: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub sns_tags: String,
}

impl Work {
    /// Title used in task metadata: Japanese title, then English, then the id.
    pub fn display_title(&self) -> &str {
        [self.title_jp.as_str(), self.title_en.as_str()]
            .into_iter()
            .map(str::trim)
            .find(|t| !t.is_empty())
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: EntityId,
    pub name: String,
    pub work_id: EntityId,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub personal_color: String,
    #[serde(default)]
    pub underwear_color: String,
}

impl Character {
    /// The free-text color token a palette entry substitutes.
    pub fn color(&self, color_ref: ColorRef) -> &str {
        match color_ref {
            ColorRef::PersonalColor => &self.personal_color,
            ColorRef::UnderwearColor => &self.underwear_color,
        }
    }
}

/// A character cast in a particular base look.
///
/// The base references are the last link of the appearance fallback chain
/// and may individually be absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    pub character_id: EntityId,
    #[serde(default)]
    pub base_costume_id: Option<EntityId>,
    #[serde(default)]
    pub base_pose_id: Option<EntityId>,
    #[serde(default)]
    pub base_expression_id: Option<EntityId>,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub negative_prompt: String,
}

impl Actor {
    pub fn base_for(&self, slot: Slot) -> Option<&EntityId> {
        match slot {
            Slot::Costume => self.base_costume_id.as_ref(),
            Slot::Pose => self.base_pose_id.as_ref(),
            Slot::Expression => self.base_expression_id.as_ref(),
        }
        .filter(|id| !id.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Appearance slots
// ---------------------------------------------------------------------------

/// One of the three per-role appearance axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Costume,
    Pose,
    Expression,
}

impl Slot {
    /// All slots in combination order (outermost first).
    pub const ALL: [Slot; 3] = [Slot::Costume, Slot::Pose, Slot::Expression];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Costume => "costume",
            Self::Pose => "pose",
            Self::Expression => "expression",
        }
    }
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
