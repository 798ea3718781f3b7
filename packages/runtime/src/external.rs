//! External child placement.
//!
//! Some content is rendered outside the slot it logically belongs to, tagged
//! with an external-child id. Once every node listed in a registration's
//! condition is visible, the tagged nodes are moved under the slot. Placement
//! is monotonic: the first satisfied slot wins and a placed object is never
//! re-evaluated for its instance.

use crate::node_key::{InstanceId, NodeKey};
use crate::surface::RenderSurface;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Candidate slot for one external object, as shipped by page bootstrap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotCandidate {
    #[serde(default)]
    pub condition: Vec<String>,
    pub set_at: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalChildRegistration {
    pub object_id: String,
    pub slot_id: String,
    /// Element ids that must all be visible
    pub condition: Vec<String>,
}

impl ExternalChildRegistration {
    pub fn new(object_id: impl Into<String>, slot_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            slot_id: slot_id.into(),
            condition: Vec::new(),
        }
    }

    pub fn when_visible(mut self, element: impl Into<String>) -> Self {
        self.condition.push(element.into());
        self
    }
}

/// Pending and placed external children of one instance
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "IndexMap<String, Vec<SlotCandidate>>")]
pub struct ExternalChildren {
    registrations: Vec<ExternalChildRegistration>,
    placed: HashSet<String>,
}

impl From<IndexMap<String, Vec<SlotCandidate>>> for ExternalChildren {
    fn from(objects: IndexMap<String, Vec<SlotCandidate>>) -> Self {
        let mut children = ExternalChildren::new();
        for (object_id, candidates) in objects {
            for candidate in candidates {
                children.register(ExternalChildRegistration {
                    object_id: object_id.clone(),
                    slot_id: candidate.set_at,
                    condition: candidate.condition,
                });
            }
        }
        children
    }
}

impl ExternalChildren {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn register(&mut self, registration: ExternalChildRegistration) {
        self.registrations.push(registration);
    }

    pub fn with_registration(mut self, registration: ExternalChildRegistration) -> Self {
        self.register(registration);
        self
    }

    pub fn is_placed(&self, object_id: &str) -> bool {
        self.placed.contains(object_id)
    }

    pub fn registrations(&self) -> &[ExternalChildRegistration] {
        &self.registrations
    }

    pub fn pending(&self) -> impl Iterator<Item = &ExternalChildRegistration> {
        self.registrations
            .iter()
            .filter(|r| !self.placed.contains(&r.object_id))
    }

    /// Place every pending object whose condition now holds; returns the
    /// newly placed object ids.
    pub fn place_pending<S: RenderSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        instance: &InstanceId,
    ) -> Vec<String> {
        let mut newly_placed = Vec::new();

        for registration in &self.registrations {
            if self.placed.contains(&registration.object_id) {
                continue;
            }
            if !condition_holds(surface, instance, &registration.condition) {
                continue;
            }

            let slot_key = NodeKey::new(&registration.slot_id, instance);
            let Some(slot) = surface.locate(&slot_key) else {
                warn!(slot = %slot_key, object = %registration.object_id, "External child slot not found");
                continue;
            };

            let objects = surface.locate_external(&NodeKey::new(&registration.object_id, instance));
            for object in &objects {
                if surface.parent(object).as_ref() != Some(&slot) {
                    surface.append_child(&slot, object);
                }
            }

            debug!(
                object = %registration.object_id,
                slot = %slot_key,
                nodes = objects.len(),
                "Placed external child"
            );
            self.placed.insert(registration.object_id.clone());
            newly_placed.push(registration.object_id.clone());
        }

        newly_placed
    }
}

fn condition_holds<S: RenderSurface + ?Sized>(surface: &S, instance: &InstanceId, condition: &[String]) -> bool {
    condition.iter().all(|element| {
        let key = NodeKey::new(element, instance);
        match surface.locate(&key) {
            Some(node) => surface.is_visible(&node),
            None => {
                debug!(node = %key, "Condition node missing, treating as hidden");
                false
            }
        }
    })
}
