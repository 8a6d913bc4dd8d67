//! Output formatting utilities for markdown and JSON.

use crate::engine::{AggregateReport, FollowUp, group_by_run};
use crate::types::{Activity, ResolvedChecklist, ResolvedTask, Task, TaskStatus};
use chrono::{TimeZone, Utc};
use clap::ValueEnum;
use serde::Serialize;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Markdown,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "markdown" | "md" => Some(OutputFormat::Markdown),
            _ => None,
        }
    }
}

/// Render `value` as pretty JSON, or through `markdown` otherwise.
pub fn render<T, F>(value: &T, format: OutputFormat, markdown: F) -> serde_json::Result<String>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value),
        OutputFormat::Markdown => Ok(markdown(value)),
    }
}

fn short_id(id: &str) -> &str {
    &id[..8.min(id.len())]
}

fn format_timestamp(ms: i64) -> String {
    match Utc.timestamp_millis_opt(ms).single() {
        Some(at) => at.format("%Y-%m-%d %H:%M UTC").to_string(),
        None => ms.to_string(),
    }
}

fn status_marker(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "[ ]",
        TaskStatus::Pass => "[pass]",
        TaskStatus::Fail => "[FAIL]",
    }
}

/// One checklist line.
fn format_resolved_short(item: &ResolvedTask) -> String {
    let task = &item.task;
    let room = item
        .room_name
        .as_ref()
        .map(|r| format!(" ({})", r))
        .unwrap_or_default();
    let done = if task.completed { " done" } else { "" };
    let inherited = if item.inherited { " _inherited_" } else { "" };
    let quantity = match (&task.inventory_type_id, task.quantity) {
        (Some(kind), Some(q)) => format!(" x{} {}", q, kind),
        _ => String::new(),
    };

    format!(
        "- {} {}{}{} `{}`{}{}\n",
        status_marker(task.status),
        task.description,
        room,
        quantity,
        short_id(&task.id),
        done,
        inherited,
    )
}

/// Format a resolved checklist as markdown, grouped by run.
pub fn format_checklist_markdown(checklist: &ResolvedChecklist) -> String {
    let mut md = String::new();

    md.push_str(&format!(
        "# Checklist `{}` ({} tasks)\n",
        checklist.inspection_id,
        checklist.len()
    ));
    if checklist.chain.len() > 1 {
        let chain: Vec<String> = checklist.chain.iter().map(|id| format!("`{}`", id)).collect();
        md.push_str(&format!("- **chain**: {}\n", chain.join(" → ")));
    }
    md.push('\n');

    let groups = group_by_run(&checklist.tasks);
    let single_group = groups.len() == 1;
    for group in groups {
        if !single_group {
            match group.run_key {
                Some(ref key) => md.push_str(&format!("## Run {}\n\n", key)),
                None => md.push_str("## Unassigned\n\n"),
            }
        }
        for item in group.tasks {
            md.push_str(&format_resolved_short(item));
        }
        md.push('\n');
    }

    md
}

/// Format a single task as markdown.
pub fn format_task_markdown(task: &Task) -> String {
    let mut md = String::new();

    md.push_str(&format!("## Task: {}\n", task.description));
    md.push_str(&format!("- **id**: `{}`\n", task.id));
    md.push_str(&format!("- **status**: {}\n", task.status));
    md.push_str(&format!("- **inspection**: `{}`\n", task.inspection_id));
    if task.original_inspection_id != task.inspection_id {
        md.push_str(&format!("- **from**: `{}`\n", task.original_inspection_id));
    }
    if let Some(ref by) = task.status_changed_by {
        md.push_str(&format!("- **status set by**: {}\n", by));
    }
    if task.completed {
        let by = task.completed_by.as_deref().unwrap_or("unknown");
        md.push_str(&format!("- **completed by**: {}\n", by));
    }
    if !task.assigned_user_ids.is_empty() {
        let users: Vec<&str> = task.assigned_user_ids.iter().map(String::as_str).collect();
        md.push_str(&format!("- **assigned**: {}\n", users.join(", ")));
    }
    if let Some(ref kind) = task.inventory_type_id {
        let quantity = task.quantity.map(|q| q.to_string()).unwrap_or_else(|| "?".into());
        md.push_str(&format!("- **inventory**: {} x{}\n", kind, quantity));
    }
    if let Some(ref vendor) = task.vendor_type_id {
        md.push_str(&format!("- **vendor**: {}\n", vendor));
    }
    if let Some(ref attachment) = task.fail_attachment_id {
        md.push_str(&format!("- **attachment**: `{}`\n", attachment));
    }

    md
}

pub fn format_follow_up_markdown(follow_up: &FollowUp) -> String {
    let mut md = String::new();
    let inspection = &follow_up.inspection;

    md.push_str(&format!("# Follow-up `{}`\n", inspection.id));
    if let Some(ref parent) = inspection.parent_inspection_id {
        md.push_str(&format!("- **parent**: `{}`\n", parent));
    }
    md.push_str(&format!(
        "- **scheduled**: {}\n",
        format_timestamp(inspection.scheduled_at)
    ));
    md.push_str(&format!("- **rooms**: {}\n", follow_up.rooms.len()));
    md.push_str(&format!("- **runs**: {}\n", follow_up.runs.len()));
    md.push_str(&format!("- **tasks**: {}\n", follow_up.tasks.len()));
    if follow_up.dropped_room_refs > 0 {
        md.push_str(&format!(
            "- **dropped room references**: {}\n",
            follow_up.dropped_room_refs
        ));
    }
    if follow_up.unassigned_run_refs > 0 {
        md.push_str(&format!(
            "- **tasks without a run**: {}\n",
            follow_up.unassigned_run_refs
        ));
    }

    md
}

pub fn format_report_markdown(report: &AggregateReport) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Report `{}`\n\n", report.inspection_id));

    md.push_str("## Inventory\n\n");
    if report.inventory.is_empty() {
        md.push_str("_none needed_\n");
    }
    for total in &report.inventory {
        md.push_str(&format!("- {}: {}\n", total.inventory_type_id, total.quantity));
    }

    md.push_str("\n## Vendors\n\n");
    if report.vendors.is_empty() {
        md.push_str("_none needed_\n");
    }
    for vendor in &report.vendors {
        md.push_str(&format!("- {}: {}\n", vendor.vendor_type_id, vendor.count));
    }

    md
}

pub fn format_history_markdown(task_id: &str, activities: &[Activity]) -> String {
    let mut md = String::new();

    md.push_str(&format!("# History `{}` ({})\n\n", task_id, activities.len()));
    for activity in activities {
        md.push_str(&format!(
            "- {} **{}** {}: {}\n",
            format_timestamp(activity.created_at),
            activity.actor,
            activity.kind.as_str(),
            activity.note,
        ));
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{InventoryTotal, VendorCount};
    use crate::types::{ActivityKind, RoomIdentity, RunKey, TaskIdentity};
    use std::collections::BTreeSet;

    fn resolved(desc: &str, status: TaskStatus, run: Option<&str>) -> ResolvedTask {
        let task = Task {
            id: format!("{desc}-0000000000"),
            inspection_id: "F".into(),
            original_inspection_id: "R".into(),
            room_id: None,
            origin_room_id: None,
            room_name: None,
            run_id: None,
            description: desc.into(),
            status,
            completed: false,
            completed_by: None,
            completed_at: None,
            inventory_type_id: None,
            quantity: None,
            vendor_type_id: None,
            assigned_user_ids: BTreeSet::new(),
            status_changed_by: None,
            status_changed_at: None,
            fail_attachment_id: None,
            created_at: 0,
            updated_at: 0,
        };
        ResolvedTask {
            identity: TaskIdentity {
                original_inspection_id: "R".into(),
                room: RoomIdentity::NoRoom,
                description: desc.into(),
            },
            task,
            source_inspection_id: "F".into(),
            room_name: Some("Kitchen".into()),
            run_key: run.map(|t| RunKey {
                template_id: t.into(),
                unit_id: None,
            }),
            inherited: true,
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("MD"), Some(OutputFormat::Markdown));
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("yaml"), None);
    }

    #[test]
    fn test_checklist_groups_runs_when_several() {
        let checklist = ResolvedChecklist {
            inspection_id: "F".into(),
            chain: vec!["F".into(), "R".into()],
            tasks: vec![
                resolved("Fix faucet", TaskStatus::Fail, Some("tpl-a")),
                resolved("Patch wall", TaskStatus::Pending, None),
            ],
        };
        let md = format_checklist_markdown(&checklist);
        assert!(md.contains("# Checklist `F` (2 tasks)"));
        assert!(md.contains("`F` → `R`"));
        assert!(md.contains("## Run tpl-a"));
        assert!(md.contains("## Unassigned"));
        assert!(md.contains("- [FAIL] Fix faucet (Kitchen) `Fix fauc` _inherited_"));
    }

    #[test]
    fn test_single_group_has_no_heading() {
        let checklist = ResolvedChecklist {
            inspection_id: "R".into(),
            chain: vec!["R".into()],
            tasks: vec![resolved("Patch wall", TaskStatus::Pending, None)],
        };
        let md = format_checklist_markdown(&checklist);
        assert!(!md.contains("## "));
        assert!(!md.contains("chain"));
    }

    #[test]
    fn test_report_markdown() {
        let report = AggregateReport {
            inspection_id: "F".into(),
            inventory: vec![InventoryTotal {
                inventory_type_id: "Faucet Kit".into(),
                quantity: 2,
            }],
            vendors: vec![VendorCount {
                vendor_type_id: "plumber".into(),
                count: 1,
            }],
        };
        let md = format_report_markdown(&report);
        assert!(md.contains("- Faucet Kit: 2"));
        assert!(md.contains("- plumber: 1"));
    }

    #[test]
    fn test_history_markdown() {
        let activities = vec![Activity {
            id: "a1".into(),
            task_id: "t1".into(),
            kind: ActivityKind::NoteAdded,
            note: "still leaking".into(),
            actor: "u1".into(),
            created_at: 0,
        }];
        let md = format_history_markdown("t1", &activities);
        assert!(md.contains("# History `t1` (1)"));
        assert!(md.contains("1970-01-01 00:00 UTC **u1** note-added: still leaking"));
    }

    #[test]
    fn test_render_json() {
        let out = render(&vec![1, 2], OutputFormat::Json, |_| String::new()).unwrap();
        assert!(out.contains('1'));
        let out = render(&vec![1, 2], OutputFormat::Markdown, |v| format!("{} items", v.len())).unwrap();
        assert_eq!(out, "2 items");
    }
}
