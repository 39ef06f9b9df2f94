//! Read-only reference store contract and an in-memory snapshot.
//!
//! The engine only ever looks entities up by id. A lookup returns the
//! entity or `None`; there are no default-constructed stand-ins.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::assignment::QueueItem;
use crate::error::CoreError;
use crate::params::ParameterSet;
use crate::reference::{
    Actor, AdditionalPrompt, Background, Character, Composition, Costume, Expression, Lighting,
    Pose, State, Style, Work,
};
use crate::scene::{Cut, Scene, Sequence};
use crate::types::EntityId;

/// Lookup-by-id for every reference kind.
pub trait ReferenceStore {
    fn work(&self, id: &str) -> Option<&Work>;
    fn character(&self, id: &str) -> Option<&Character>;
    fn actor(&self, id: &str) -> Option<&Actor>;
    fn costume(&self, id: &str) -> Option<&Costume>;
    fn pose(&self, id: &str) -> Option<&Pose>;
    fn expression(&self, id: &str) -> Option<&Expression>;
    fn background(&self, id: &str) -> Option<&Background>;
    fn lighting(&self, id: &str) -> Option<&Lighting>;
    fn composition(&self, id: &str) -> Option<&Composition>;
    fn style(&self, id: &str) -> Option<&Style>;
    fn state(&self, id: &str) -> Option<&State>;
    fn additional_prompt(&self, id: &str) -> Option<&AdditionalPrompt>;
    fn cut(&self, id: &str) -> Option<&Cut>;
    fn parameter_set(&self, id: &str) -> Option<&ParameterSet>;
    fn scene(&self, id: &str) -> Option<&Scene>;
    fn sequence(&self, id: &str) -> Option<&Sequence>;
}

/// Turn a lookup result into a [`CoreError::NotFound`] naming the kind.
pub fn require<'a, T>(found: Option<&'a T>, entity: &'static str, id: &str) -> Result<&'a T, CoreError> {
    found.ok_or_else(|| CoreError::NotFound {
        entity,
        id: id.to_string(),
    })
}

// ---------------------------------------------------------------------------
// In-memory snapshot
// ---------------------------------------------------------------------------

/// A full reference library snapshot, keyed by entity id.
///
/// The JSON layout is one object per kind mapping id to entity, e.g.
/// `{"costumes": {"costume_A": {...}}}`. Missing kinds are empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Library {
    pub works: HashMap<EntityId, Work>,
    pub characters: HashMap<EntityId, Character>,
    pub actors: HashMap<EntityId, Actor>,
    pub costumes: HashMap<EntityId, Costume>,
    pub poses: HashMap<EntityId, Pose>,
    pub expressions: HashMap<EntityId, Expression>,
    pub backgrounds: HashMap<EntityId, Background>,
    pub lighting: HashMap<EntityId, Lighting>,
    pub compositions: HashMap<EntityId, Composition>,
    pub styles: HashMap<EntityId, Style>,
    pub states: HashMap<EntityId, State>,
    pub additional_prompts: HashMap<EntityId, AdditionalPrompt>,
    pub cuts: HashMap<EntityId, Cut>,
    #[serde(alias = "sd_params", alias = "sdParams")]
    pub parameter_sets: HashMap<EntityId, ParameterSet>,
    pub scenes: HashMap<EntityId, Scene>,
    pub sequences: HashMap<EntityId, Sequence>,
}

impl Library {
    /// Parse a snapshot from its JSON form.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json)
            .map_err(|e| CoreError::Validation(format!("Invalid library snapshot: {e}")))
    }
}

impl ReferenceStore for Library {
    fn work(&self, id: &str) -> Option<&Work> {
        self.works.get(id)
    }

    fn character(&self, id: &str) -> Option<&Character> {
        self.characters.get(id)
    }

    fn actor(&self, id: &str) -> Option<&Actor> {
        self.actors.get(id)
    }

    fn costume(&self, id: &str) -> Option<&Costume> {
        self.costumes.get(id)
    }

    fn pose(&self, id: &str) -> Option<&Pose> {
        self.poses.get(id)
    }

    fn expression(&self, id: &str) -> Option<&Expression> {
        self.expressions.get(id)
    }

    fn background(&self, id: &str) -> Option<&Background> {
        self.backgrounds.get(id)
    }

    fn lighting(&self, id: &str) -> Option<&Lighting> {
        self.lighting.get(id)
    }

    fn composition(&self, id: &str) -> Option<&Composition> {
        self.compositions.get(id)
    }

    fn style(&self, id: &str) -> Option<&Style> {
        self.styles.get(id)
    }

    fn state(&self, id: &str) -> Option<&State> {
        self.states.get(id)
    }

    fn additional_prompt(&self, id: &str) -> Option<&AdditionalPrompt> {
        self.additional_prompts.get(id)
    }

    fn cut(&self, id: &str) -> Option<&Cut> {
        self.cuts.get(id)
    }

    fn parameter_set(&self, id: &str) -> Option<&ParameterSet> {
        self.parameter_sets.get(id)
    }

    fn scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.get(id)
    }

    fn sequence(&self, id: &str) -> Option<&Sequence> {
        self.sequences.get(id)
    }
}

/// Parse a queue file: a JSON array of [`QueueItem`]s.
pub fn queue_from_json_str(json: &str) -> Result<Vec<QueueItem>, CoreError> {
    serde_json::from_str(json).map_err(|e| CoreError::Validation(format!("Invalid queue: {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
