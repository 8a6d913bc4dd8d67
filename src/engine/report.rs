//! Aggregates over a resolved checklist. Everything here is a pure function
//! of its input.

use crate::types::{ResolvedChecklist, ResolvedTask, RunKey, TaskStatus};
use serde::Serialize;
use std::collections::HashMap;

/// Inventory needed for one inventory type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryTotal {
    pub inventory_type_id: String,
    pub quantity: i64,
}

/// Failed tasks needing one vendor type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VendorCount {
    pub vendor_type_id: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateReport {
    pub inspection_id: String,
    pub inventory: Vec<InventoryTotal>,
    pub vendors: Vec<VendorCount>,
}

/// Tasks of a checklist sharing one run. `run_key: None` collects the
/// tasks that belong to no run.
#[derive(Debug, Clone, Serialize)]
pub struct RunGroup<'a> {
    pub run_key: Option<RunKey>,
    pub tasks: Vec<&'a ResolvedTask>,
}

fn failed<'a>(tasks: &'a [ResolvedTask]) -> impl Iterator<Item = &'a ResolvedTask> {
    tasks.iter().filter(|t| t.task.status == TaskStatus::Fail)
}

/// Sum `(key, amount)` pairs per key, keeping first-seen order, then order
/// by descending amount. The sort is stable, so equal amounts stay in
/// first-seen order. Sums saturate at `i64::MAX`.
fn tally<'a>(pairs: impl Iterator<Item = (&'a str, i64)>) -> Vec<(String, i64)> {
    let mut order: Vec<(String, i64)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (key, amount) in pairs {
        match index.get(key) {
            Some(&i) => order[i].1 = order[i].1.saturating_add(amount),
            None => {
                index.insert(key, order.len());
                order.push((key.to_string(), amount));
            }
        }
    }
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order
}

/// Quantity needed per inventory type over failed tasks with a positive
/// quantity.
pub fn inventory_totals(tasks: &[ResolvedTask]) -> Vec<InventoryTotal> {
    let pairs = failed(tasks).filter_map(|t| {
        let kind = t.task.inventory_type_id.as_deref()?;
        let quantity = t.task.positive_quantity()?;
        Some((kind, quantity))
    });
    tally(pairs)
        .into_iter()
        .map(|(inventory_type_id, quantity)| InventoryTotal {
            inventory_type_id,
            quantity,
        })
        .collect()
}

/// Failed task count per vendor type.
pub fn vendor_counts(tasks: &[ResolvedTask]) -> Vec<VendorCount> {
    let pairs = failed(tasks).filter_map(|t| t.task.vendor_type_id.as_deref().map(|v| (v, 1)));
    tally(pairs)
        .into_iter()
        .map(|(vendor_type_id, count)| VendorCount {
            vendor_type_id,
            count: count as usize,
        })
        .collect()
}

pub fn aggregate(checklist: &ResolvedChecklist) -> AggregateReport {
    AggregateReport {
        inspection_id: checklist.inspection_id.clone(),
        inventory: inventory_totals(&checklist.tasks),
        vendors: vendor_counts(&checklist.tasks),
    }
}

/// Group tasks by run in order of first appearance; unassigned tasks last.
pub fn group_by_run(tasks: &[ResolvedTask]) -> Vec<RunGroup<'_>> {
    let mut groups: Vec<RunGroup<'_>> = Vec::new();
    let mut index: HashMap<&RunKey, usize> = HashMap::new();
    let mut unassigned = Vec::new();

    for task in tasks {
        match task.run_key {
            Some(ref key) => match index.get(key) {
                Some(&i) => groups[i].tasks.push(task),
                None => {
                    index.insert(key, groups.len());
                    groups.push(RunGroup {
                        run_key: Some(key.clone()),
                        tasks: vec![task],
                    });
                }
            },
            None => unassigned.push(task),
        }
    }

    if !unassigned.is_empty() {
        groups.push(RunGroup {
            run_key: None,
            tasks: unassigned,
        });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RoomIdentity, Task, TaskIdentity};
    use std::collections::BTreeSet;

    fn item(
        desc: &str,
        status: TaskStatus,
        inventory: Option<(&str, i64)>,
        vendor: Option<&str>,
    ) -> ResolvedTask {
        let task = Task {
            id: desc.into(),
            inspection_id: "F".into(),
            original_inspection_id: "F".into(),
            room_id: None,
            origin_room_id: None,
            room_name: None,
            run_id: None,
            description: desc.into(),
            status,
            completed: false,
            completed_by: None,
            completed_at: None,
            inventory_type_id: inventory.map(|(k, _)| k.to_string()),
            quantity: inventory.map(|(_, q)| q),
            vendor_type_id: vendor.map(String::from),
            assigned_user_ids: BTreeSet::new(),
            status_changed_by: None,
            status_changed_at: None,
            fail_attachment_id: None,
            created_at: 0,
            updated_at: 0,
        };
        ResolvedTask {
            identity: TaskIdentity {
                original_inspection_id: "F".into(),
                room: RoomIdentity::NoRoom,
                description: desc.into(),
            },
            task,
            source_inspection_id: "F".into(),
            room_name: None,
            run_key: None,
            inherited: false,
        }
    }

    #[test]
    fn test_inventory_sums_failed_only() {
        let tasks = [
            item("a", TaskStatus::Fail, Some(("A", 2)), None),
            item("b", TaskStatus::Fail, Some(("A", 3)), None),
            item("c", TaskStatus::Pass, Some(("B", 1)), None),
        ];
        assert_eq!(
            inventory_totals(&tasks),
            vec![InventoryTotal {
                inventory_type_id: "A".into(),
                quantity: 5
            }]
        );
    }

    #[test]
    fn test_inventory_skips_non_positive_quantity() {
        let tasks = [
            item("a", TaskStatus::Fail, Some(("A", 0)), None),
            item("b", TaskStatus::Fail, Some(("B", -1)), None),
        ];
        assert!(inventory_totals(&tasks).is_empty());
    }

    #[test]
    fn test_huge_quantities_saturate() {
        let tasks = [
            item("a", TaskStatus::Fail, Some(("A", i64::MAX)), None),
            item("b", TaskStatus::Fail, Some(("A", 7)), None),
        ];
        assert_eq!(inventory_totals(&tasks)[0].quantity, i64::MAX);
    }

    #[test]
    fn test_descending_with_stable_ties() {
        let tasks = [
            item("a", TaskStatus::Fail, None, Some("painter")),
            item("b", TaskStatus::Fail, None, Some("plumber")),
            item("c", TaskStatus::Fail, None, Some("electrician")),
            item("d", TaskStatus::Fail, None, Some("electrician")),
            item("e", TaskStatus::Pending, None, Some("roofer")),
        ];
        let counts = vendor_counts(&tasks);
        let names: Vec<&str> = counts.iter().map(|v| v.vendor_type_id.as_str()).collect();
        assert_eq!(names, vec!["electrician", "painter", "plumber"]);
        assert_eq!(counts[0].count, 2);
    }

    #[test]
    fn test_group_by_run_puts_unassigned_last() {
        let key = |t: &str| RunKey {
            template_id: t.into(),
            unit_id: None,
        };
        let mut a = item("a", TaskStatus::Pending, None, None);
        let b = item("b", TaskStatus::Pending, None, None);
        let mut c = item("c", TaskStatus::Pending, None, None);
        let mut d = item("d", TaskStatus::Pending, None, None);
        a.run_key = Some(key("x"));
        c.run_key = Some(key("y"));
        d.run_key = Some(key("x"));
        let tasks = [a, b, c, d];

        let groups = group_by_run(&tasks);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].run_key, Some(key("x")));
        assert_eq!(groups[0].tasks.len(), 2);
        assert_eq!(groups[1].run_key, Some(key("y")));
        assert!(groups[2].run_key.is_none());
        assert_eq!(groups[2].tasks[0].task.id, "b");
    }
}
