//! Routing of external change signals to the resolutions they invalidate.
//!
//! The host application owns the push channel. It registers the inspections
//! it is displaying, and after every resolution the engine records which
//! chain and which templates that view was built from. When the channel
//! reports "tasks changed for inspection X" or "template items changed",
//! [`ResolutionTracker::affected`] names the watched inspections whose
//! checklist must be resolved again. Nothing here polls.

use crate::engine::Lineage;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// A change reported by the external push channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChangeSignal {
    /// Task rows owned by this inspection were written.
    TasksChanged(String),
    /// Items of this template were edited.
    TemplateItemsChanged(String),
}

/// Inputs of the last resolution of one watched inspection.
#[derive(Debug, Clone, Default)]
struct Footprint {
    chain: HashSet<String>,
    templates: HashSet<String>,
}

#[derive(Debug, Clone, Default)]
struct Watch {
    /// `None` until the first resolution is recorded.
    footprint: Option<Footprint>,
}

impl Watch {
    fn is_affected_by(&self, signal: &ChangeSignal, inspection_id: &str) -> bool {
        let Some(ref footprint) = self.footprint else {
            return true;
        };
        match signal {
            ChangeSignal::TasksChanged(id) => id == inspection_id || footprint.chain.contains(id),
            ChangeSignal::TemplateItemsChanged(template) => footprint.templates.contains(template),
        }
    }
}

/// Tracks watched inspections and the inputs their checklists came from.
///
/// Shared across async tasks through an internal `Mutex`.
#[derive(Debug, Default)]
pub struct ResolutionTracker {
    watched: Mutex<HashMap<String, Watch>>,
}

impl ResolutionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Watch>> {
        // The map stays consistent even if a holder panicked.
        self.watched.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start watching an inspection. Returns `true` if newly added.
    pub fn watch(&self, inspection_id: &str) -> bool {
        let mut watched = self.lock();
        if watched.contains_key(inspection_id) {
            return false;
        }
        watched.insert(inspection_id.to_string(), Watch::default());
        true
    }

    /// Stop watching. Returns `true` if it was watched.
    pub fn unwatch(&self, inspection_id: &str) -> bool {
        self.lock().remove(inspection_id).is_some()
    }

    pub fn is_watching(&self, inspection_id: &str) -> bool {
        self.lock().contains_key(inspection_id)
    }

    /// Record what a fresh resolution of the lineage's leaf was built from.
    /// Ignored unless the leaf is watched.
    pub fn record(&self, lineage: &Lineage) {
        let leaf = &lineage.leaf().inspection.id;
        if let Some(watch) = self.lock().get_mut(leaf) {
            watch.footprint = Some(Footprint {
                chain: lineage.chain_ids().into_iter().collect(),
                templates: lineage.template_ids(),
            });
        }
    }

    /// Watched inspections to resolve again after `signals`, sorted.
    ///
    /// A watched inspection without a recorded resolution is always
    /// included.
    pub fn affected(&self, signals: &[ChangeSignal]) -> Vec<String> {
        let watched = self.lock();
        let mut result = BTreeSet::new();
        for (id, watch) in watched.iter() {
            if signals.iter().any(|s| watch.is_affected_by(s, id)) {
                result.insert(id.clone());
            }
        }
        result.into_iter().collect()
    }
}
