//! Batch orchestration.
//!
//! A batch walks the queue in `order`, each queue item's sequence in
//! stored order (disabled entries skipped), and each scene's combinations
//! in expansion order. Ordinals run from 1 across the whole batch and are
//! never reset at scene or sequence boundaries.
//!
//! A batch is all-or-nothing: the first scene error aborts it and no
//! tasks are returned.

use serde::Serialize;
use tableau_core::assignment::{ActorAssignments, AppearanceOverrides, QueueItem};
use tableau_core::params::GenerationParameters;
use tableau_core::run_state::RunState;
use tableau_core::scene::{Cut, Scene};
use tableau_core::store::{require, ReferenceStore};

use crate::error::{BatchError, RenderWarning, ResolveError, SceneError};
use crate::expander::{expand, Combination, DEFAULT_MAX_COMBINATIONS};
use crate::render::SceneRenderer;
use crate::resolver::resolve_cut;
use crate::task::{
    apply_debug_scaling, build_task, resolve_parameters, GeneratedPrompt, GenerationTask,
    TaskMetadata,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Scale steps and image size down for quick runs.
    pub debug_scaling: bool,
    /// Per-scene ceiling on combinations.
    pub max_combinations: u64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            debug_scaling: false,
            max_combinations: DEFAULT_MAX_COMBINATIONS,
        }
    }
}

/// Everything a batch run produced, in ordinal order.
///
/// `prompts[i]` and `tasks[i]` describe the same ordinal.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchPlan {
    pub prompts: Vec<GeneratedPrompt>,
    pub tasks: Vec<GenerationTask>,
    pub warnings: Vec<RenderWarning>,
}

// ---------------------------------------------------------------------------
// Single scene
// ---------------------------------------------------------------------------

/// A scene whose combinations are known and within the limit, ready to
/// render.
pub struct ResolvedScene<'a, S: ReferenceStore + ?Sized> {
    pub scene: &'a Scene,
    pub cut: &'a Cut,
    pub combinations: Vec<Combination>,
    pub params: GenerationParameters,
    pub warnings: Vec<RenderWarning>,
    renderer: SceneRenderer<'a, S>,
}

/// Resolve roles, count and expand combinations for one scene.
///
/// The combination guard runs here, before any prompt text is built.
pub fn resolve_scene<'a, S: ReferenceStore + ?Sized>(
    store: &'a S,
    scene: &'a Scene,
    assignments: &ActorAssignments,
    overrides: &AppearanceOverrides,
    max_combinations: u64,
) -> Result<ResolvedScene<'a, S>, ResolveError> {
    let cut = require(store.cut(&scene.cut_id), "cut", &scene.cut_id)?;
    let candidates = resolve_cut(store, scene, cut, assignments, overrides)?;
    let combinations = expand(cut, &candidates, max_combinations)?;

    let renderer = SceneRenderer::new(store, scene, cut)?;
    let mut warnings = renderer.warnings();
    let (params, params_warning) = resolve_parameters(store, scene);
    warnings.extend(params_warning);

    Ok(ResolvedScene {
        scene,
        cut,
        combinations,
        params,
        warnings,
        renderer,
    })
}

impl<S: ReferenceStore + ?Sized> ResolvedScene<'_, S> {
    /// Render every combination, numbering from `first_ordinal`.
    pub fn render(
        &self,
        first_ordinal: u32,
        sequence_name: Option<&str>,
    ) -> Result<Vec<(GeneratedPrompt, GenerationTask)>, BatchError> {
        let mut out = Vec::with_capacity(self.combinations.len());
        let mut ordinal = first_ordinal;

        for (i, combination) in self.combinations.iter().enumerate() {
            if i > 0 {
                ordinal = ordinal
                    .checked_add(1)
                    .ok_or(BatchError::OrdinalOverflow { max: u32::MAX })?;
            }
            let rendered = self
                .renderer
                .render(combination)
                .map_err(|source| scene_error(self.scene, source))?;
            let prompt = GeneratedPrompt::from_rendered(ordinal, &rendered);
            let metadata = TaskMetadata {
                sequence_name: sequence_name.map(str::to_string),
                scene_name: self.scene.display_name().to_string(),
                character_names: rendered.character_names,
                work_titles: rendered.work_titles,
            };
            let task = build_task(&prompt, self.cut, &self.params, metadata);
            out.push((prompt, task));
        }

        Ok(out)
    }
}

fn scene_error(scene: &Scene, source: ResolveError) -> SceneError {
    SceneError {
        scene_id: scene.id.clone(),
        scene_name: scene.display_name().to_string(),
        source,
    }
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Accumulates scenes into one plan with a shared ordinal counter.
struct PlanBuilder<'a, S: ReferenceStore + ?Sized, F: FnMut(RunState)> {
    store: &'a S,
    options: BatchOptions,
    plan: BatchPlan,
    next_ordinal: u32,
    scene_index: usize,
    observe: F,
}

impl<'a, S: ReferenceStore + ?Sized, F: FnMut(RunState)> PlanBuilder<'a, S, F> {
    fn new(store: &'a S, options: BatchOptions, observe: F) -> Self {
        Self {
            store,
            options,
            plan: BatchPlan::default(),
            next_ordinal: 1,
            scene_index: 0,
            observe,
        }
    }

    fn add_scene(
        &mut self,
        scene: &'a Scene,
        assignments: &ActorAssignments,
        overrides: &AppearanceOverrides,
        sequence_name: Option<&str>,
    ) -> Result<(), BatchError> {
        (self.observe)(RunState::Resolving {
            scene_index: self.scene_index,
        });
        let resolved = resolve_scene(
            self.store,
            scene,
            assignments,
            overrides,
            self.options.max_combinations,
        )
        .map_err(|source| scene_error(scene, source))?;

        (self.observe)(RunState::Rendering {
            scene_index: self.scene_index,
        });
        let rendered = resolved.render(self.next_ordinal, sequence_name)?;

        let count = u32::try_from(rendered.len())
            .map_err(|_| BatchError::OrdinalOverflow { max: u32::MAX })?;
        self.next_ordinal = self
            .next_ordinal
            .checked_add(count)
            .ok_or(BatchError::OrdinalOverflow { max: u32::MAX })?;

        tracing::info!(
            scene_id = %scene.id,
            scene_index = self.scene_index,
            combinations = rendered.len(),
            "Scene rendered",
        );

        self.plan.warnings.extend(resolved.warnings);
        for (prompt, task) in rendered {
            self.plan.prompts.push(prompt);
            self.plan.tasks.push(task);
        }
        self.scene_index += 1;
        Ok(())
    }

    fn finish(mut self) -> BatchPlan {
        if self.options.debug_scaling {
            self.plan.tasks.iter_mut().for_each(apply_debug_scaling);
        }
        (self.observe)(RunState::TasksReady);
        self.plan
    }

    fn fail(mut self) {
        (self.observe)(RunState::Failed);
    }
}

/// Expand a whole queue into one ordered task list.
pub fn run_batch<S: ReferenceStore + ?Sized>(
    store: &S,
    queue: &[QueueItem],
    options: BatchOptions,
) -> Result<BatchPlan, BatchError> {
    run_batch_observed(store, queue, options, |_| {})
}

/// [`run_batch`], reporting each state transition to `observe`.
///
/// On error the last state reported is [`RunState::Failed`].
pub fn run_batch_observed<S: ReferenceStore + ?Sized>(
    store: &S,
    queue: &[QueueItem],
    options: BatchOptions,
    observe: impl FnMut(RunState),
) -> Result<BatchPlan, BatchError> {
    let mut builder = PlanBuilder::new(store, options, observe);
    match plan_queue(&mut builder, queue) {
        Ok(()) => {
            let plan = builder.finish();
            tracing::info!(
                queue_items = queue.len(),
                tasks = plan.tasks.len(),
                warnings = plan.warnings.len(),
                "Batch planned",
            );
            Ok(plan)
        }
        Err(e) => {
            tracing::error!(error = %e, "Batch planning failed");
            builder.fail();
            Err(e)
        }
    }
}

fn plan_queue<'a, S: ReferenceStore + ?Sized, F: FnMut(RunState)>(
    builder: &mut PlanBuilder<'a, S, F>,
    queue: &[QueueItem],
) -> Result<(), BatchError> {
    let store = builder.store;
    let mut items: Vec<&QueueItem> = queue.iter().collect();
    items.sort_by_key(|item| item.order);

    for item in items {
        let sequence = store.sequence(&item.sequence_id).ok_or_else(|| {
            BatchError::MissingSequence {
                queue_item_id: item.id.clone(),
                sequence_id: item.sequence_id.clone(),
            }
        })?;

        for scene_id in sequence.enabled_scene_ids() {
            let scene = store
                .scene(scene_id)
                .ok_or_else(|| BatchError::MissingScene {
                    sequence_id: sequence.id.clone(),
                    scene_id: scene_id.clone(),
                })?;
            builder.add_scene(
                scene,
                &item.actor_assignments,
                &item.appearance_overrides,
                Some(sequence.display_name()),
            )?;
        }
    }
    Ok(())
}

/// Render a single scene outside of any queue.
///
/// Ordinals start at 1 and filenames carry no sequence component.
pub fn preview_scene<S: ReferenceStore + ?Sized>(
    store: &S,
    scene_id: &str,
    assignments: &ActorAssignments,
    overrides: &AppearanceOverrides,
    options: BatchOptions,
) -> Result<BatchPlan, BatchError> {
    let scene = store.scene(scene_id).ok_or_else(|| BatchError::UnknownScene {
        scene_id: scene_id.to_string(),
    })?;
    let mut builder = PlanBuilder::new(store, options, |_| {});
    builder.add_scene(scene, assignments, overrides, None)?;
    Ok(builder.finish())
}
