//! Ancestor chain walking.
//!
//! Follows `parent_inspection_id` from a leaf inspection up to the root and
//! loads each link's tasks, rooms and runs. The walk is an explicit loop with
//! a visited set and a depth cap, so malformed data (a self-parented
//! inspection, a cycle, a runaway chain) fails loudly instead of looping.
//! Any unreadable link fails the whole walk: a partial chain is never returned.

use super::fetch::fetch_all_tasks;
use crate::error::{EngineError, EngineResult};
use crate::store::RecordStore;
use crate::types::{Inspection, Room, Run, Task};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// One inspection of a chain with the rows it owns.
#[derive(Debug, Clone)]
pub struct LineageLink {
    pub inspection: Inspection,
    pub tasks: Vec<Task>,
    pub rooms: Vec<Room>,
    pub runs: Vec<Run>,
}

/// A fully loaded chain, leaf first.
#[derive(Debug, Clone)]
pub struct Lineage {
    links: Vec<LineageLink>,
}

impl Lineage {
    /// Build from links ordered leaf first. Fails on an empty list.
    pub fn from_links(links: Vec<LineageLink>) -> EngineResult<Self> {
        if links.is_empty() {
            return Err(EngineError::internal("lineage needs at least one inspection"));
        }
        Ok(Self { links })
    }

    pub fn links(&self) -> &[LineageLink] {
        &self.links
    }

    /// The inspection the walk started from.
    pub fn leaf(&self) -> &LineageLink {
        &self.links[0]
    }

    pub fn root(&self) -> &LineageLink {
        &self.links[self.links.len() - 1]
    }

    pub fn depth(&self) -> usize {
        self.links.len()
    }

    /// Inspection ids from leaf to root.
    pub fn chain_ids(&self) -> Vec<String> {
        self.links.iter().map(|l| l.inspection.id.clone()).collect()
    }

    /// `(owning inspection id, tasks)` per link, leaf first.
    pub fn segments(&self) -> impl Iterator<Item = (&str, &[Task])> {
        self.links
            .iter()
            .map(|l| (l.inspection.id.as_str(), l.tasks.as_slice()))
    }

    /// Every room row owned anywhere in the chain, by id.
    pub fn room_directory(&self) -> HashMap<&str, &Room> {
        self.links
            .iter()
            .flat_map(|l| l.rooms.iter())
            .map(|r| (r.id.as_str(), r))
            .collect()
    }

    /// Every run row owned anywhere in the chain, by id.
    pub fn run_directory(&self) -> HashMap<&str, &Run> {
        self.links
            .iter()
            .flat_map(|l| l.runs.iter())
            .map(|r| (r.id.as_str(), r))
            .collect()
    }

    /// Templates referenced anywhere in the chain, by inspection or by run.
    pub fn template_ids(&self) -> HashSet<String> {
        let mut templates = HashSet::new();
        for link in &self.links {
            if let Some(ref t) = link.inspection.template_id {
                templates.insert(t.clone());
            }
            for run in &link.runs {
                templates.insert(run.template_id.clone());
            }
        }
        templates
    }

    /// Total task rows across all segments, before deduplication.
    pub fn row_count(&self) -> usize {
        self.links.iter().map(|l| l.tasks.len()).sum()
    }
}

/// Walk from `leaf_id` to the root of its chain.
pub async fn walk_lineage<S>(
    store: &S,
    leaf_id: &str,
    page_size: usize,
    max_depth: usize,
) -> EngineResult<Lineage>
where
    S: RecordStore + ?Sized,
{
    let mut links: Vec<LineageLink> = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut next = Some(leaf_id.to_string());

    while let Some(id) = next.take() {
        if !visited.insert(id.clone()) {
            warn!(leaf = %leaf_id, repeated = %id, "Cycle in inspection chain");
            return Err(EngineError::lineage_cycle(&id));
        }
        if links.len() >= max_depth {
            warn!(leaf = %leaf_id, max_depth, "Inspection chain exceeds depth cap");
            return Err(EngineError::lineage_too_deep(leaf_id, max_depth));
        }

        let inspection = match store.get_inspection(&id).await? {
            Some(inspection) => inspection,
            None => {
                warn!(leaf = %leaf_id, missing = %id, "Inspection chain references a missing inspection");
                let err = EngineError::inspection_not_found(&id);
                return Err(if id == leaf_id {
                    err
                } else {
                    err.with_details(format!("ancestor of {}", leaf_id))
                });
            }
        };

        let tasks = fetch_all_tasks(store, &id, page_size).await?;
        let rooms = store.list_rooms(&id).await?;
        let runs = store.list_runs(&id).await?;

        next = inspection.parent_inspection_id.clone();
        links.push(LineageLink {
            inspection,
            tasks,
            rooms,
            runs,
        });
    }

    let lineage = Lineage::from_links(links)?;
    debug!(
        leaf = %leaf_id,
        depth = lineage.depth(),
        rows = lineage.row_count(),
        "Walked inspection chain"
    );
    Ok(lineage)
}
