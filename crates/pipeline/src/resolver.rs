//! Role appearance resolution.
//!
//! For each role and each slot the candidate list comes from the first
//! source that has one:
//!
//! 1. the scene's candidate list for that role and slot (stored order kept),
//! 2. the caller's override for that role and slot,
//! 3. the assigned actor's base reference.
//!
//! A slot with no source is an error; a partially resolved role is never
//! rendered.

use serde::Serialize;
use tableau_core::assignment::{ActorAssignments, AppearanceOverrides, RoleOverride};
use tableau_core::reference::{Actor, Slot};
use tableau_core::scene::{Cut, RoleAppearanceAssignment, Scene};
use tableau_core::store::{require, ReferenceStore};
use tableau_core::types::EntityId;

use crate::error::ResolveError;

/// Where a slot's candidate list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Scene,
    Override,
    ActorBase,
}

/// Ordered candidate lists for one role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleCandidates {
    pub role_id: EntityId,
    pub actor_id: EntityId,
    pub costumes: Vec<EntityId>,
    pub poses: Vec<EntityId>,
    pub expressions: Vec<EntityId>,
}

impl RoleCandidates {
    pub fn slot(&self, slot: Slot) -> &[EntityId] {
        match slot {
            Slot::Costume => &self.costumes,
            Slot::Pose => &self.poses,
            Slot::Expression => &self.expressions,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Vec<EntityId> {
        match slot {
            Slot::Costume => &mut self.costumes,
            Slot::Pose => &mut self.poses,
            Slot::Expression => &mut self.expressions,
        }
    }
}

/// Pick the candidate list for one slot, without touching the store.
///
/// Empty ids in a scene list are ignored; a list of only empty ids counts
/// as no scene candidates.
pub fn slot_candidates(
    scene_assignment: Option<&RoleAppearanceAssignment>,
    role_override: Option<&RoleOverride>,
    actor: &Actor,
    slot: Slot,
) -> Option<(Vec<EntityId>, CandidateSource)> {
    let from_scene: Vec<EntityId> = scene_assignment
        .map(|ra| {
            ra.candidates(slot)
                .iter()
                .filter(|id| !id.is_empty())
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    if !from_scene.is_empty() {
        return Some((from_scene, CandidateSource::Scene));
    }

    if let Some(id) = role_override.and_then(|ov| ov.for_slot(slot).as_override()) {
        return Some((vec![id.clone()], CandidateSource::Override));
    }

    actor
        .base_for(slot)
        .map(|id| (vec![id.clone()], CandidateSource::ActorBase))
}

/// Resolve the candidate lists for `role_id` in `scene`.
///
/// Every candidate is checked against the store so that later stages
/// only see ids that resolve.
pub fn resolve<S: ReferenceStore + ?Sized>(
    store: &S,
    role_id: &str,
    scene: &Scene,
    assignments: &ActorAssignments,
    overrides: &AppearanceOverrides,
) -> Result<RoleCandidates, ResolveError> {
    let actor_id = assignments
        .get(role_id)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ResolveError::UnassignedRole {
            role_id: role_id.to_string(),
        })?;
    let actor = require(store.actor(actor_id), "actor", actor_id)?;

    let scene_assignment = scene.role_assignment(role_id);
    let role_override = overrides.get(role_id);

    let mut resolved = RoleCandidates {
        role_id: role_id.to_string(),
        actor_id: actor_id.clone(),
        costumes: Vec::new(),
        poses: Vec::new(),
        expressions: Vec::new(),
    };

    for slot in Slot::ALL {
        let (ids, source) = slot_candidates(scene_assignment, role_override, actor, slot)
            .ok_or_else(|| ResolveError::UnresolvedSlot {
                role_id: role_id.to_string(),
                slot,
            })?;

        for id in &ids {
            ensure_part_exists(store, slot, id)?;
        }

        tracing::debug!(
            scene_id = %scene.id,
            role_id,
            %slot,
            ?source,
            candidates = ids.len(),
            "Resolved slot candidates",
        );
        *resolved.slot_mut(slot) = ids;
    }

    Ok(resolved)
}

/// Resolve every role of `cut`, in declared role order.
pub fn resolve_cut<S: ReferenceStore + ?Sized>(
    store: &S,
    scene: &Scene,
    cut: &Cut,
    assignments: &ActorAssignments,
    overrides: &AppearanceOverrides,
) -> Result<Vec<RoleCandidates>, ResolveError> {
    if let Some(role_id) = cut.duplicate_role_id() {
        return Err(ResolveError::DuplicateRole {
            cut_id: cut.id.clone(),
            role_id: role_id.to_string(),
        });
    }

    cut.roles
        .iter()
        .map(|role| resolve(store, &role.id, scene, assignments, overrides))
        .collect()
}

fn ensure_part_exists<S: ReferenceStore + ?Sized>(
    store: &S,
    slot: Slot,
    id: &str,
) -> Result<(), ResolveError> {
    let found = match slot {
        Slot::Costume => store.costume(id).is_some(),
        Slot::Pose => store.pose(id).is_some(),
        Slot::Expression => store.expression(id).is_some(),
    };
    if found {
        Ok(())
    } else {
        Err(ResolveError::MissingReference {
            entity: slot.as_str(),
            id: id.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
