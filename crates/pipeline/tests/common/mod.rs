//! Shared reference library fixture for pipeline integration tests.

#![allow(dead_code)]

use serde_json::json;
use tableau_core::assignment::{
    ActorAssignments, AppearanceOverrides, QueueItem, RoleOverride, SlotOverride,
};
use tableau_core::store::Library;

/// A small library covering every reference kind.
///
/// Scenes and their combination counts with `actor_a` on `r1`:
///
/// - `scene_six`: 2 costumes x 1 pose x 3 expressions = 6
/// - `scene_three`: 1 costume x base pose x 3 expressions = 3
/// - `scene_two`: 2 costumes x base pose x base expression = 2
/// - `scene_base`: no scene candidates, everything from the actor = 1
/// - `scene_img2img`: img2img cut without a reference image = 1
/// - `scene_duo`: two roles, 2 x 2 costumes = 4
pub fn library() -> Library {
    let snapshot = json!({
        "works": {
            "work_1": {"id": "work_1", "title_jp": "夏の日", "title_en": "Summer Day"}
        },
        "characters": {
            "char_a": {"id": "char_a", "name": "Aoi", "work_id": "work_1",
                       "personal_color": "blue", "underwear_color": "white"},
            "char_b": {"id": "char_b", "name": "Ren", "work_id": "work_1",
                       "personal_color": "red", "underwear_color": "black"}
        },
        "actors": {
            "actor_a": {"id": "actor_a", "name": "Aoi (base)", "character_id": "char_a",
                        "base_costume_id": "costume_uniform", "base_pose_id": "pose_stand",
                        "base_expression_id": "expr_neutral", "prompt": "1girl, aoi"},
            "actor_b": {"id": "actor_b", "character_id": "char_b",
                        "base_costume_id": "costume_uniform", "base_pose_id": "pose_sit",
                        "base_expression_id": "expr_smile", "prompt": "1girl, ren"},
            "actor_bare": {"id": "actor_bare", "character_id": "char_a", "prompt": "1girl"}
        },
        "costumes": {
            "costume_A": {"id": "costume_A", "name": "Dress", "prompt": "wearing a [C1] dress",
                          "color_palette": [{"placeholder": "[C1]", "color_ref": "personal_color"}]},
            "costume_B": {"id": "costume_B", "name": "Swimsuit", "prompt": "[C2] swimsuit",
                          "color_palette": [{"placeholder": "[C2]", "color_ref": "underwear_color"}]},
            "costume_uniform": {"id": "costume_uniform", "name": "Uniform",
                                "prompt": "school uniform"}
        },
        "poses": {
            "pose_stand": {"id": "pose_stand", "name": "Stand", "prompt": "standing"},
            "pose_sit": {"id": "pose_sit", "name": "Sit", "prompt": "sitting"}
        },
        "expressions": {
            "expr_neutral": {"id": "expr_neutral", "name": "Neutral", "prompt": "neutral"},
            "expr_smile": {"id": "expr_smile", "name": "Smile", "prompt": "smile"},
            "expr_angry": {"id": "expr_angry", "name": "Angry", "prompt": "angry",
                           "negative_prompt": "smile"}
        },
        "backgrounds": {
            "bg_park": {"id": "bg_park", "name": "Park", "prompt": "park",
                        "negative_prompt": "indoors"}
        },
        "styles": {
            "style_anime": {"id": "style_anime", "name": "Anime", "prompt": "anime style"}
        },
        "cuts": {
            "cut_solo": {"id": "cut_solo", "name": "Solo", "prompt_template": "solo, [R1]",
                         "negative_template": "lowres, [R1]",
                         "roles": [{"id": "r1", "name_in_scene": "Lead"}]},
            "cut_duo": {"id": "cut_duo", "name": "Duo", "prompt_template": "2girls, [R1], [R2]",
                        "roles": [{"id": "r1", "name_in_scene": "Left"},
                                  {"id": "r2", "name_in_scene": "Right"}]},
            "cut_img2img": {"id": "cut_img2img", "prompt_template": "[R1]",
                            "roles": [{"id": "r1"}],
                            "image_mode": "img2img", "reference_image_path": ""},
            "cut_ref": {"id": "cut_ref", "prompt_template": "[R1]",
                        "roles": [{"id": "r1"}],
                        "image_mode": "img2img", "reference_image_path": "refs/pose.png"}
        },
        "sdParams": {
            "sdp_fast": {"id": "sdp_fast", "name": "Fast", "steps": 10, "sampler_name": "DPM++ 2M",
                         "cfg_scale": 5.5, "seed": 42, "width": 90, "height": 512,
                         "denoising_strength": 0.45}
        },
        "scenes": {
            "scene_six": {
                "id": "scene_six", "name": "Six", "cut_id": "cut_solo",
                "background_id": "bg_park", "style_id": "style_anime", "sd_param_id": "sdp_fast",
                "role_assignments": [{"role_id": "r1",
                                      "costume_ids": ["costume_A", "costume_B"],
                                      "pose_ids": ["pose_stand"],
                                      "expression_ids": ["expr_neutral", "expr_smile", "expr_angry"]}]
            },
            "scene_three": {
                "id": "scene_three", "name": "Three", "cut_id": "cut_solo", "sd_param_id": "sdp_fast",
                "role_assignments": [{"role_id": "r1",
                                      "costume_ids": ["costume_A"],
                                      "expression_ids": ["expr_neutral", "expr_smile", "expr_angry"]}]
            },
            "scene_two": {
                "id": "scene_two", "name": "Two", "cut_id": "cut_solo", "sd_param_id": "sdp_fast",
                "role_assignments": [{"role_id": "r1",
                                      "costume_ids": ["costume_A", "costume_B"]}]
            },
            "scene_base": {"id": "scene_base", "name": "Base", "cut_id": "cut_solo",
                           "sd_param_id": "sdp_fast"},
            "scene_img2img": {"id": "scene_img2img", "name": "Img", "cut_id": "cut_img2img",
                              "sd_param_id": "sdp_fast"},
            "scene_ref": {"id": "scene_ref", "name": "Ref", "cut_id": "cut_ref",
                          "sd_param_id": "sdp_fast"},
            "scene_duo": {
                "id": "scene_duo", "name": "Duo", "cut_id": "cut_duo",
                "role_assignments": [
                    {"role_id": "r1", "costume_ids": ["costume_A", "costume_B"]},
                    {"role_id": "r2", "costume_ids": ["costume_A", "costume_uniform"]}
                ]
            },
            "scene_broken": {"id": "scene_broken", "name": "Broken", "cut_id": "cut_solo",
                             "background_id": "bg_gone"}
        },
        "sequences": {
            "seq_main": {"id": "seq_main", "name": "Main", "scene_entries": [
                {"scene_id": "scene_three"},
                {"scene_id": "scene_six", "is_enabled": false},
                {"scene_id": "scene_two"}
            ]},
            "seq_broken": {"id": "seq_broken", "name": "Broken", "scene_entries": [
                {"scene_id": "scene_two"},
                {"scene_id": "scene_broken"}
            ]},
            "seq_dangling": {"id": "seq_dangling", "scene_entries": [
                {"scene_id": "scene_missing"}
            ]}
        }
    });
    Library::from_json_str(&snapshot.to_string()).expect("fixture library should parse")
}

pub fn assign(pairs: &[(&str, &str)]) -> ActorAssignments {
    pairs
        .iter()
        .map(|(role, actor)| (role.to_string(), actor.to_string()))
        .collect()
}

pub fn no_overrides() -> AppearanceOverrides {
    AppearanceOverrides::new()
}

pub fn costume_override(role: &str, costume_id: &str) -> AppearanceOverrides {
    let mut overrides = AppearanceOverrides::new();
    overrides.insert(
        role.to_string(),
        RoleOverride {
            costume: SlotOverride::Override(costume_id.to_string()),
            ..RoleOverride::default()
        },
    );
    overrides
}

pub fn queue_item(id: &str, sequence_id: &str, order: i64) -> QueueItem {
    QueueItem {
        id: id.to_string(),
        sequence_id: sequence_id.to_string(),
        actor_assignments: assign(&[("r1", "actor_a")]),
        appearance_overrides: no_overrides(),
        order,
    }
}
