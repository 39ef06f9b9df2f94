//! Generation task construction.

use serde::Serialize;
use tableau_core::naming::filename_prefix;
use tableau_core::params::{debug_scale, GenerationParameters, DEBUG_MIN_DIMENSION, DEBUG_MIN_STEPS};
use tableau_core::scene::{Cut, ImageMode, Scene};
use tableau_core::store::ReferenceStore;

use crate::error::RenderWarning;
use crate::render::{LeadActorInfo, RenderedPrompt};

/// One fully rendered prompt with its batch-wide position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedPrompt {
    /// 1-based, unique within a batch run.
    pub ordinal: u32,
    pub name: String,
    pub positive: String,
    pub negative: String,
    pub lead_actor_info: Option<LeadActorInfo>,
}

impl GeneratedPrompt {
    pub fn from_rendered(ordinal: u32, rendered: &RenderedPrompt) -> Self {
        Self {
            ordinal,
            name: rendered.name.clone(),
            positive: rendered.positive.clone(),
            negative: rendered.negative.clone(),
            lead_actor_info: rendered.lead_actor_info.clone(),
        }
    }
}

/// Bookkeeping the backend uses to organize output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskMetadata {
    /// `None` for single-scene previews.
    pub sequence_name: Option<String>,
    pub scene_name: String,
    pub character_names: Vec<String>,
    pub work_titles: Vec<String>,
}

/// The unit handed to the generation backend.
///
/// Field names and order are the handoff format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationTask {
    pub prompt: String,
    pub negative_prompt: String,
    pub steps: u32,
    pub sampler_name: String,
    pub cfg_scale: f64,
    pub seed: i64,
    pub width: u32,
    pub height: u32,
    pub mode: ImageMode,
    pub filename_prefix: String,
    pub source_image_path: String,
    /// Only set for image-to-image modes; serialized as `null` otherwise.
    pub denoising_strength: Option<f64>,
    pub metadata: TaskMetadata,
}

/// Build the task for one prompt.
///
/// The mode comes from [`Cut::effective_mode`], so a cut without a
/// reference image always yields a text-to-image task with an empty
/// source path and no denoising strength.
pub fn build_task(
    prompt: &GeneratedPrompt,
    cut: &Cut,
    params: &GenerationParameters,
    metadata: TaskMetadata,
) -> GenerationTask {
    let mode = cut.effective_mode();
    let (source_image_path, denoising_strength) = if mode.uses_reference_image() {
        (
            cut.reference_image_path.trim().to_string(),
            Some(params.denoising_strength),
        )
    } else {
        (String::new(), None)
    };

    GenerationTask {
        prompt: prompt.positive.clone(),
        negative_prompt: prompt.negative.clone(),
        steps: params.steps,
        sampler_name: params.sampler_name.clone(),
        cfg_scale: params.cfg_scale,
        seed: params.seed,
        width: params.width,
        height: params.height,
        mode,
        filename_prefix: filename_prefix(
            metadata.sequence_name.as_deref(),
            &metadata.scene_name,
            prompt.ordinal,
        ),
        source_image_path,
        denoising_strength,
        metadata,
    }
}

/// Shrink steps and image size for quick debug runs.
pub fn apply_debug_scaling(task: &mut GenerationTask) {
    task.steps = debug_scale(task.steps, DEBUG_MIN_STEPS);
    task.width = debug_scale(task.width, DEBUG_MIN_DIMENSION);
    task.height = debug_scale(task.height, DEBUG_MIN_DIMENSION);
}

/// Parameters for every task of `scene`.
///
/// A missing, dangling or unusable parameter set falls back to
/// [`GenerationParameters::default`] and yields a warning instead of an
/// error.
pub fn resolve_parameters<S: ReferenceStore + ?Sized>(
    store: &S,
    scene: &Scene,
) -> (GenerationParameters, Option<RenderWarning>) {
    let sd_param_id = scene.sd_param_id.as_deref().filter(|id| !id.is_empty());

    let reason = match sd_param_id {
        None => "no parameter set assigned".to_string(),
        Some(id) => match store.parameter_set(id) {
            None => format!("parameter set '{id}' not found"),
            Some(set) => match set.params.validate() {
                Ok(()) => return (set.params.clone(), None),
                Err(e) => format!("parameter set '{id}' is unusable: {e}"),
            },
        },
    };

    let warning = RenderWarning::MissingParameterSet {
        scene_id: scene.id.clone(),
        sd_param_id: sd_param_id.map(str::to_string),
        reason,
    };
    tracing::warn!(scene_id = %scene.id, "{warning}");
    (GenerationParameters::default(), Some(warning))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
