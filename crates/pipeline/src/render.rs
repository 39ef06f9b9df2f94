//! Template rendering.
//!
//! Each role's composed text replaces its `[ROLE]` token in the cut's
//! templates, then scene-level fragments are appended in fixed order:
//! template, background, lighting, compositions, style, additional
//! prompts. Negative text mirrors the same layout over the negative
//! fields.

use serde::Serialize;
use tableau_core::reference::{Actor, Character, Costume, ReferencePart, State, Work};
use tableau_core::scene::{Cut, Scene};
use tableau_core::store::{require, ReferenceStore};

use crate::error::{RenderWarning, ResolveError, TemplateKind};
use crate::expander::RoleChoice;
use crate::palette::substitute_colors;
use crate::tokens::{bracket_tokens, join_fragments, replace_tokens};

/// Work and character of a combination's first role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeadActorInfo {
    pub work_title: String,
    pub character_name: String,
}

/// Output of rendering one combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedPrompt {
    pub name: String,
    pub positive: String,
    pub negative: String,
    pub lead_actor_info: Option<LeadActorInfo>,
    /// Distinct, in role order.
    pub character_names: Vec<String>,
    /// Distinct, in role order.
    pub work_titles: Vec<String>,
}

// ---------------------------------------------------------------------------
// Scene-level parts
// ---------------------------------------------------------------------------

/// Scene-level reference parts, looked up once per scene.
#[derive(Debug, Clone)]
pub struct SceneParts<'a> {
    pub background: Option<&'a ReferencePart>,
    pub lighting: Option<&'a ReferencePart>,
    pub compositions: Vec<&'a ReferencePart>,
    pub style: Option<&'a ReferencePart>,
    pub additional: Vec<&'a ReferencePart>,
}

impl<'a> SceneParts<'a> {
    /// Resolve every part id stored on `scene`. Empty ids mean "none";
    /// any other id that does not resolve fails the scene.
    pub fn resolve<S: ReferenceStore + ?Sized>(
        store: &'a S,
        scene: &Scene,
    ) -> Result<Self, ResolveError> {
        let background = optional(scene.background_id.as_deref(), "background", |id| {
            store.background(id)
        })?;
        let lighting = optional(scene.lighting_id.as_deref(), "lighting", |id| store.lighting(id))?;
        let style = optional(scene.style_id.as_deref(), "style", |id| store.style(id))?;

        let compositions = scene
            .composition_ids
            .iter()
            .filter(|id| !id.is_empty())
            .map(|id| require(store.composition(id), "composition", id))
            .collect::<Result<Vec<_>, _>>()?;
        let additional = scene
            .additional_prompt_ids
            .iter()
            .filter(|id| !id.is_empty())
            .map(|id| require(store.additional_prompt(id), "additional prompt", id))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            background,
            lighting,
            compositions,
            style,
            additional,
        })
    }

    fn in_order(&self) -> Vec<&'a ReferencePart> {
        self.background
            .into_iter()
            .chain(self.lighting)
            .chain(self.compositions.iter().copied())
            .chain(self.style)
            .chain(self.additional.iter().copied())
            .collect()
    }

    fn positive(&self) -> Vec<&'a str> {
        self.in_order().into_iter().map(|p| p.prompt.as_str()).collect()
    }

    fn negative(&self) -> Vec<&'a str> {
        self.in_order()
            .into_iter()
            .map(|p| p.negative_prompt.as_str())
            .collect()
    }
}

fn optional<'a, T: 'a>(
    id: Option<&str>,
    entity: &'static str,
    lookup: impl FnOnce(&str) -> Option<&'a T>,
) -> Result<Option<&'a T>, ResolveError> {
    match id.filter(|id| !id.is_empty()) {
        Some(id) => Ok(Some(require(lookup(id), entity, id)?)),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Role text
// ---------------------------------------------------------------------------

/// Everything one role contributes to a rendered prompt.
#[derive(Debug, Clone)]
struct CastRole<'a> {
    actor: &'a Actor,
    character: &'a Character,
    work: Option<&'a Work>,
    costume: &'a Costume,
    pose: &'a ReferencePart,
    expression: &'a ReferencePart,
    states: Vec<&'a State>,
}

impl<'a> CastRole<'a> {
    /// Composed positive text: actor, colored costume, colored states,
    /// pose, expression.
    fn positive(&self) -> String {
        self.compose(false)
    }

    fn negative(&self) -> String {
        self.compose(true)
    }

    fn compose(&self, negative: bool) -> String {
        let pick = |prompt: &'a str, negative_prompt: &'a str| {
            if negative {
                negative_prompt
            } else {
                prompt
            }
        };

        let costume = substitute_colors(
            pick(&self.costume.prompt, &self.costume.negative_prompt),
            self.costume,
            self.character,
        );
        let states: Vec<String> = self
            .states
            .iter()
            .map(|s| substitute_colors(pick(&s.prompt, &s.negative_prompt), self.costume, self.character))
            .collect();

        join_fragments(
            std::iter::once(pick(&self.actor.prompt, &self.actor.negative_prompt))
                .chain(std::iter::once(costume.as_str()))
                .chain(states.iter().map(String::as_str))
                .chain([
                    pick(&self.pose.prompt, &self.pose.negative_prompt),
                    pick(&self.expression.prompt, &self.expression.negative_prompt),
                ]),
        )
    }

    /// `Character (Costume / Pose / Expression)`
    fn label(&self) -> String {
        format!(
            "{} ({} / {} / {})",
            self.character.name, self.costume.name, self.pose.name, self.expression.name
        )
    }

    fn work_title(&self) -> String {
        self.work
            .map(|w| w.display_title().to_string())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Scene renderer
// ---------------------------------------------------------------------------

/// Renders combinations of one scene. Scene parts are looked up once.
pub struct SceneRenderer<'a, S: ReferenceStore + ?Sized> {
    store: &'a S,
    scene: &'a Scene,
    cut: &'a Cut,
    parts: SceneParts<'a>,
}

impl<S: ReferenceStore + ?Sized> std::fmt::Debug for SceneRenderer<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneRenderer")
            .field("scene_id", &self.scene.id)
            .field("cut_id", &self.cut.id)
            .finish_non_exhaustive()
    }
}

impl<'a, S: ReferenceStore + ?Sized> SceneRenderer<'a, S> {
    pub fn new(store: &'a S, scene: &'a Scene, cut: &'a Cut) -> Result<Self, ResolveError> {
        let parts = SceneParts::resolve(store, scene)?;
        Ok(Self {
            store,
            scene,
            cut,
            parts,
        })
    }

    /// Template problems that hold for every combination of the scene.
    ///
    /// A role whose token is missing from the positive template is
    /// reported once per role; bracket tokens that no role fills are
    /// reported once per template.
    pub fn warnings(&self) -> Vec<RenderWarning> {
        let mut warnings = Vec::new();
        let role_tokens: Vec<String> = self.cut.roles.iter().map(|r| r.token()).collect();

        // An empty negative template carries no role mirrors at all.
        let role_templates = [
            (TemplateKind::Positive, &self.cut.prompt_template),
            (TemplateKind::Negative, &self.cut.negative_template),
        ];
        for (kind, template) in role_templates {
            if kind == TemplateKind::Negative && template.trim().is_empty() {
                continue;
            }
            for (role, token) in self.cut.roles.iter().zip(&role_tokens) {
                if !template.contains(token.as_str()) {
                    warnings.push(RenderWarning::TemplatePlaceholderMissing {
                        scene_id: self.scene.id.clone(),
                        template: kind,
                        token: token.clone(),
                        role_id: Some(role.id.clone()),
                    });
                }
            }
        }

        for (kind, template) in [
            (TemplateKind::Positive, &self.cut.prompt_template),
            (TemplateKind::Negative, &self.cut.negative_template),
        ] {
            for token in bracket_tokens(template) {
                if !role_tokens.iter().any(|t| t == token) {
                    warnings.push(RenderWarning::TemplatePlaceholderMissing {
                        scene_id: self.scene.id.clone(),
                        template: kind,
                        token: token.to_string(),
                        role_id: None,
                    });
                }
            }
        }

        for warning in &warnings {
            tracing::warn!(scene_id = %self.scene.id, "{warning}");
        }
        warnings
    }

    /// Render one combination into final positive/negative text.
    pub fn render(&self, combination: &[RoleChoice]) -> Result<RenderedPrompt, ResolveError> {
        let cast = combination
            .iter()
            .map(|choice| self.cast(choice))
            .collect::<Result<Vec<_>, _>>()?;

        let tokens: Vec<String> = combination
            .iter()
            .map(|choice| format!("[{}]", choice.role_id.to_uppercase()))
            .collect();
        let positives: Vec<String> = cast.iter().map(CastRole::positive).collect();
        let negatives: Vec<String> = cast.iter().map(CastRole::negative).collect();

        let positive_template =
            replace_tokens(&self.cut.prompt_template, &bindings(&tokens, &positives));
        let negative_template =
            replace_tokens(&self.cut.negative_template, &bindings(&tokens, &negatives));

        let mut positive_fragments = vec![positive_template.as_str()];
        positive_fragments.extend(self.parts.positive());
        let mut negative_fragments = vec![negative_template.as_str()];
        negative_fragments.extend(self.parts.negative());

        let positive = join_fragments(positive_fragments);
        let negative = join_fragments(negative_fragments);

        let name = if cast.is_empty() {
            self.scene.display_name().to_string()
        } else {
            cast.iter()
                .map(CastRole::label)
                .collect::<Vec<_>>()
                .join(" & ")
        };

        let lead_actor_info = cast.first().map(|lead| LeadActorInfo {
            work_title: lead.work_title(),
            character_name: lead.character.name.clone(),
        });

        let mut character_names: Vec<String> = Vec::new();
        let mut work_titles: Vec<String> = Vec::new();
        for role in &cast {
            push_distinct(&mut character_names, &role.character.name);
            push_distinct(&mut work_titles, &role.work_title());
        }

        Ok(RenderedPrompt {
            name,
            positive,
            negative,
            lead_actor_info,
            character_names,
            work_titles,
        })
    }

    fn cast(&self, choice: &RoleChoice) -> Result<CastRole<'a>, ResolveError> {
        let store = self.store;
        let actor = require(store.actor(&choice.actor_id), "actor", &choice.actor_id)?;
        let character = require(
            store.character(&actor.character_id),
            "character",
            &actor.character_id,
        )?;
        let work = optional(Some(character.work_id.as_str()), "work", |id| store.work(id))?;
        let costume = require(store.costume(&choice.costume_id), "costume", &choice.costume_id)?;
        let pose = require(store.pose(&choice.pose_id), "pose", &choice.pose_id)?;
        let expression = require(
            store.expression(&choice.expression_id),
            "expression",
            &choice.expression_id,
        )?;
        let states = self.states_for(costume)?;

        Ok(CastRole {
            actor,
            character,
            work,
            costume,
            pose,
            expression,
            states,
        })
    }

    /// States linked from `costume` whose category the scene selects, in
    /// the costume's link order.
    fn states_for(&self, costume: &'a Costume) -> Result<Vec<&'a State>, ResolveError> {
        if self.scene.state_categories.is_empty() {
            return Ok(Vec::new());
        }
        let mut states = Vec::new();
        for id in costume.state_ids.iter().filter(|id| !id.is_empty()) {
            let state = require(self.store.state(id), "state", id)?;
            if self.scene.state_categories.contains(&state.category) {
                states.push(state);
            }
        }
        Ok(states)
    }
}

fn bindings<'t>(tokens: &'t [String], texts: &'t [String]) -> Vec<(&'t str, &'t str)> {
    tokens
        .iter()
        .map(String::as_str)
        .zip(texts.iter().map(String::as_str))
        .collect()
}

fn push_distinct(list: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tableau_core::store::Library;

    fn library() -> Library {
        Library::from_json_str(
            r#"{
            "works": {"work_1": {"id": "work_1", "title_jp": "", "title_en": "Summer"}},
            "characters": {
                "char_a": {"id": "char_a", "name": "Aoi", "work_id": "work_1",
                           "personal_color": "blue", "underwear_color": "white"}
            },
            "actors": {
                "actor_a": {"id": "actor_a", "character_id": "char_a",
                            "prompt": "1girl, aoi", "negative_prompt": "bad hands"}
            },
            "costumes": {
                "costume_dress": {"id": "costume_dress", "name": "Dress",
                                  "prompt": "wearing a [C1] dress",
                                  "negative_prompt": "torn [C1] dress",
                                  "color_palette": [{"placeholder": "[C1]", "color_ref": "personal_color"}],
                                  "state_ids": ["state_wet", "state_open"]}
            },
            "states": {
                "state_wet": {"id": "state_wet", "name": "Wet", "category": "weather",
                              "prompt": "wet [C1] fabric"},
                "state_open": {"id": "state_open", "name": "Open", "category": "exposure",
                               "prompt": "open jacket"}
            },
            "poses": {"pose_stand": {"id": "pose_stand", "name": "Stand", "prompt": "standing"}},
            "expressions": {"expr_smile": {"id": "expr_smile", "name": "Smile", "prompt": "smile"}},
            "backgrounds": {"bg_beach": {"id": "bg_beach", "name": "Beach", "prompt": "beach",
                                         "negative_prompt": "crowd"}},
            "lighting": {"light_sunset": {"id": "light_sunset", "name": "Sunset", "prompt": "sunset"}},
            "compositions": {
                "comp_wide": {"id": "comp_wide", "name": "Wide", "prompt": "wide shot"},
                "comp_low": {"id": "comp_low", "name": "Low", "prompt": "from below"}
            },
            "styles": {"style_anime": {"id": "style_anime", "name": "Anime", "prompt": "anime style",
                                       "negative_prompt": "photo"}},
            "additional_prompts": {"add_q": {"id": "add_q", "name": "Quality", "prompt": "masterpiece"}}
        }"#,
        )
        .unwrap()
    }

    fn cut(template: &str, negative: &str) -> Cut {
        serde_json::from_value(serde_json::json!({
            "id": "cut_1",
            "prompt_template": template,
            "negative_template": negative,
            "roles": [{"id": "r1", "name_in_scene": "Lead"}]
        }))
        .unwrap()
    }

    fn scene() -> Scene {
        serde_json::from_value(serde_json::json!({
            "id": "scene_1",
            "name": "Beach",
            "cut_id": "cut_1",
            "background_id": "bg_beach",
            "lighting_id": "light_sunset",
            "composition_ids": ["comp_wide", "comp_low"],
            "style_id": "style_anime",
            "additional_prompt_ids": ["add_q"]
        }))
        .unwrap()
    }

    fn choice() -> RoleChoice {
        RoleChoice {
            role_id: "r1".into(),
            actor_id: "actor_a".into(),
            costume_id: "costume_dress".into(),
            pose_id: "pose_stand".into(),
            expression_id: "expr_smile".into(),
        }
    }

    // -- composition --

    #[test]
    fn fragments_in_fixed_order() {
        let lib = library();
        let (scene, cut) = (scene(), cut("solo, [R1]", "[R1], lowres"));
        let renderer = SceneRenderer::new(&lib, &scene, &cut).unwrap();
        let out = renderer.render(&[choice()]).unwrap();
        assert_eq!(
            out.positive,
            "solo, 1girl, aoi, wearing a blue dress, standing, smile, beach, sunset, \
             wide shot, from below, anime style, masterpiece"
        );
        assert_eq!(
            out.negative,
            "bad hands, torn blue dress, lowres, crowd, photo"
        );
    }

    #[test]
    fn metadata_from_cast() {
        let lib = library();
        let (scene, cut) = (scene(), cut("[R1]", ""));
        let out = SceneRenderer::new(&lib, &scene, &cut)
            .unwrap()
            .render(&[choice()])
            .unwrap();
        assert_eq!(out.name, "Aoi (Dress / Stand / Smile)");
        assert_eq!(
            out.lead_actor_info,
            Some(LeadActorInfo {
                work_title: "Summer".into(),
                character_name: "Aoi".into(),
            })
        );
        assert_eq!(out.character_names, vec!["Aoi"]);
        assert_eq!(out.work_titles, vec!["Summer"]);
    }

    #[test]
    fn selected_state_categories_are_colored_and_inserted() {
        let lib = library();
        let mut scene = scene();
        scene.state_categories = vec!["weather".into()];
        let cut = cut("[R1]", "");
        let out = SceneRenderer::new(&lib, &scene, &cut)
            .unwrap()
            .render(&[choice()])
            .unwrap();
        assert!(out
            .positive
            .starts_with("1girl, aoi, wearing a blue dress, wet blue fabric, standing"));
        assert!(!out.positive.contains("open jacket"));
    }

    #[test]
    fn roleless_cut_uses_scene_name() {
        let lib = library();
        let scene = scene();
        let mut cut = cut("scenery", "");
        cut.roles.clear();
        let out = SceneRenderer::new(&lib, &scene, &cut).unwrap().render(&[]).unwrap();
        assert_eq!(out.name, "Beach");
        assert!(out.lead_actor_info.is_none());
        assert!(out.positive.starts_with("scenery, beach"));
    }

    // -- warnings --

    #[test]
    fn missing_role_token_warns_and_text_is_kept() {
        let lib = library();
        let (scene, cut) = (scene(), cut("solo, [R2]", ""));
        let renderer = SceneRenderer::new(&lib, &scene, &cut).unwrap();
        let warnings = renderer.warnings();
        assert_eq!(warnings.len(), 2);
        assert_matches!(
            &warnings[0],
            RenderWarning::TemplatePlaceholderMissing { token, role_id: Some(r), .. }
                if token == "[R1]" && r == "r1"
        );
        assert_matches!(
            &warnings[1],
            RenderWarning::TemplatePlaceholderMissing { token, role_id: None, .. }
                if token == "[R2]"
        );
        let out = renderer.render(&[choice()]).unwrap();
        assert!(out.positive.starts_with("solo, [R2], beach"));
    }

    #[test]
    fn missing_role_token_in_negative_warns() {
        let lib = library();
        let (scene, cut) = (scene(), cut("solo, [R1]", "lowres"));
        let warnings = SceneRenderer::new(&lib, &scene, &cut).unwrap().warnings();
        assert_eq!(warnings.len(), 1);
        assert_matches!(
            &warnings[0],
            RenderWarning::TemplatePlaceholderMissing {
                template: TemplateKind::Negative,
                token,
                role_id: Some(r),
                ..
            } if token == "[R1]" && r == "r1"
        );
    }

    #[test]
    fn clean_template_has_no_warnings() {
        let lib = library();
        let (scene, cut) = (scene(), cut("[R1]", "[R1]"));
        assert!(SceneRenderer::new(&lib, &scene, &cut).unwrap().warnings().is_empty());
    }

    // -- missing references --

    #[test]
    fn dangling_scene_part_fails() {
        let lib = library();
        let mut scene = scene();
        scene.style_id = Some("style_gone".into());
        let cut = cut("[R1]", "");
        assert_matches!(
            SceneRenderer::new(&lib, &scene, &cut),
            Err(ResolveError::MissingReference { entity: "style", id }) if id == "style_gone"
        );
    }

    #[test]
    fn empty_part_ids_are_skipped() {
        let lib = library();
        let mut scene = scene();
        scene.background_id = Some(String::new());
        scene.composition_ids = vec![String::new()];
        let parts = SceneParts::resolve(&lib, &scene).unwrap();
        assert!(parts.background.is_none());
        assert!(parts.compositions.is_empty());
    }

    #[test]
    fn dangling_character_fails() {
        let mut lib = library();
        lib.characters.clear();
        let (scene, cut) = (scene(), cut("[R1]", ""));
        let renderer = SceneRenderer::new(&lib, &scene, &cut).unwrap();
        assert_matches!(
            renderer.render(&[choice()]),
            Err(ResolveError::MissingReference { entity: "character", .. })
        );
    }
}
