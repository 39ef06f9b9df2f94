//! Cuts, scenes and sequences.
//!
//! A [`Cut`] is a prompt template with bracketed role tokens; a [`Scene`]
//! dresses a cut with background/lighting/style parts and per-role
//! appearance candidates; a [`Sequence`] orders scenes for batch runs.

use serde::{Deserialize, Serialize};

use crate::reference::Slot;
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Image mode
// ---------------------------------------------------------------------------

/// Generation mode requested by a cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageMode {
    /// Single-image (text-to-image) mode. No reference image is used.
    #[default]
    #[serde(rename = "txt2img")]
    Txt2Img,
    #[serde(rename = "img2img")]
    Img2Img,
    #[serde(rename = "img2img_polish")]
    Img2ImgPolish,
}

impl ImageMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Txt2Img => "txt2img",
            Self::Img2Img => "img2img",
            Self::Img2ImgPolish => "img2img_polish",
        }
    }

    /// Whether this mode consumes a reference image.
    pub fn uses_reference_image(self) -> bool {
        !matches!(self, Self::Txt2Img)
    }
}

// ---------------------------------------------------------------------------
// Cut
// ---------------------------------------------------------------------------

/// A named slot in a cut template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutRole {
    pub id: EntityId,
    #[serde(default)]
    pub name_in_scene: String,
}

impl CutRole {
    /// The literal template token for this role: id `r1` becomes `[R1]`.
    pub fn token(&self) -> String {
        format!("[{}]", self.id.to_uppercase())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cut {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub prompt_template: String,
    #[serde(default)]
    pub negative_template: String,
    /// Declared role order drives combination order.
    #[serde(default)]
    pub roles: Vec<CutRole>,
    #[serde(default)]
    pub reference_image_path: String,
    #[serde(default)]
    pub image_mode: ImageMode,
}

impl Cut {
    /// Mode actually used for generation.
    ///
    /// Any image-to-image mode needs a reference image, so an empty
    /// `reference_image_path` forces [`ImageMode::Txt2Img`].
    pub fn effective_mode(&self) -> ImageMode {
        if self.reference_image_path.trim().is_empty() {
            ImageMode::Txt2Img
        } else {
            self.image_mode
        }
    }

    /// First role whose template token collides with an earlier role's.
    ///
    /// Tokens are upper-cased, so `r1` and `R1` collide.
    pub fn duplicate_role_id(&self) -> Option<&str> {
        self.roles.iter().enumerate().find_map(|(i, role)| {
            let token = role.token();
            self.roles[..i]
                .iter()
                .any(|earlier| earlier.token() == token)
                .then_some(role.id.as_str())
        })
    }
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

/// Per-role candidate lists declared by a scene.
///
/// An empty list means the scene has no opinion for that slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoleAppearanceAssignment {
    pub role_id: EntityId,
    #[serde(default)]
    pub costume_ids: Vec<EntityId>,
    #[serde(default)]
    pub pose_ids: Vec<EntityId>,
    #[serde(default)]
    pub expression_ids: Vec<EntityId>,
}

impl RoleAppearanceAssignment {
    pub fn candidates(&self, slot: Slot) -> &[EntityId] {
        match slot {
            Slot::Costume => &self.costume_ids,
            Slot::Pose => &self.pose_ids,
            Slot::Expression => &self.expression_ids,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    pub cut_id: EntityId,
    #[serde(default)]
    pub background_id: Option<EntityId>,
    #[serde(default)]
    pub lighting_id: Option<EntityId>,
    #[serde(default)]
    pub composition_ids: Vec<EntityId>,
    #[serde(default)]
    pub style_id: Option<EntityId>,
    #[serde(default)]
    pub sd_param_id: Option<EntityId>,
    #[serde(default)]
    pub role_assignments: Vec<RoleAppearanceAssignment>,
    #[serde(default)]
    pub state_categories: Vec<String>,
    #[serde(default)]
    pub additional_prompt_ids: Vec<EntityId>,
}

impl Scene {
    pub fn role_assignment(&self, role_id: &str) -> Option<&RoleAppearanceAssignment> {
        self.role_assignments.iter().find(|ra| ra.role_id == role_id)
    }

    /// Scene name for display and file naming, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

// ---------------------------------------------------------------------------
// Sequence
// ---------------------------------------------------------------------------

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceEntry {
    pub scene_id: EntityId,
    #[serde(default = "enabled_by_default")]
    pub is_enabled: bool,
}

/// Ordered list of scenes run together as one queue item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub scene_entries: Vec<SequenceEntry>,
}

impl Sequence {
    /// Scene ids of enabled entries, in stored order.
    pub fn enabled_scene_ids(&self) -> impl Iterator<Item = &EntityId> {
        self.scene_entries
            .iter()
            .filter(|e| e.is_enabled)
            .map(|e| &e.scene_id)
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn cut(mode: ImageMode, reference: &str) -> Cut {
        Cut {
            id: "cut_1".into(),
            name: String::new(),
            prompt_template: "[R1]".into(),
            negative_template: String::new(),
            roles: vec![CutRole {
                id: "r1".into(),
                name_in_scene: "Lead".into(),
            }],
            reference_image_path: reference.into(),
            image_mode: mode,
        }
    }

    // -- image mode --

    #[test]
    fn image_mode_serializes_as_backend_strings() {
        assert_eq!(serde_json::to_value(ImageMode::Txt2Img).unwrap(), "txt2img");
        assert_eq!(
            serde_json::to_value(ImageMode::Img2ImgPolish).unwrap(),
            "img2img_polish"
        );
        let mode: ImageMode = serde_json::from_value(serde_json::json!("img2img")).unwrap();
        assert_eq!(mode, ImageMode::Img2Img);
    }

    #[test]
    fn empty_reference_forces_single_image_mode() {
        assert_eq!(cut(ImageMode::Img2Img, "").effective_mode(), ImageMode::Txt2Img);
        assert_eq!(cut(ImageMode::Img2Img, "   ").effective_mode(), ImageMode::Txt2Img);
    }

    #[test]
    fn reference_image_keeps_stored_mode() {
        assert_eq!(
            cut(ImageMode::Img2ImgPolish, "refs/pose.png").effective_mode(),
            ImageMode::Img2ImgPolish
        );
    }

    // -- roles --

    #[test]
    fn role_token_is_upper_cased_in_brackets() {
        let role = CutRole {
            id: "r1".into(),
            name_in_scene: String::new(),
        };
        assert_eq!(role.token(), "[R1]");
    }

    #[test]
    fn duplicate_role_detected() {
        let mut c = cut(ImageMode::Txt2Img, "");
        assert_eq!(c.duplicate_role_id(), None);
        c.roles.push(CutRole {
            id: "r1".into(),
            name_in_scene: "Again".into(),
        });
        assert_eq!(c.duplicate_role_id(), Some("r1"));
    }

    #[test]
    fn case_only_difference_is_duplicate() {
        let mut c = cut(ImageMode::Txt2Img, "");
        c.roles.push(CutRole {
            id: "R1".into(),
            name_in_scene: String::new(),
        });
        assert_eq!(c.duplicate_role_id(), Some("R1"));
    }

    // -- sequence --

    #[test]
    fn enabled_scene_ids_skip_disabled_entries() {
        let seq: Sequence = serde_json::from_value(serde_json::json!({
            "id": "seq_1",
            "scene_entries": [
                {"scene_id": "a"},
                {"scene_id": "b", "is_enabled": false},
                {"scene_id": "c", "is_enabled": true}
            ]
        }))
        .unwrap();
        let ids: Vec<&str> = seq.enabled_scene_ids().map(String::as_str).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(seq.display_name(), "seq_1");
    }
}
