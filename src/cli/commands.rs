//! Subcommand execution against an engine.

use super::{Command, FollowUpArgs, MarkArgs};
use crate::db::now_ms;
use crate::engine::{Engine, FollowUpRequest, TransitionRequest};
use crate::format::{
    OutputFormat, format_checklist_markdown, format_follow_up_markdown, format_history_markdown,
    format_report_markdown, format_task_markdown, render,
};
use crate::store::RecordStore;
use anyhow::{Context, Result};
use chrono::DateTime;

/// Parse an RFC 3339 timestamp into epoch milliseconds.
pub fn parse_scheduled_at(value: &str) -> Result<i64> {
    let at = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("Invalid --scheduled-at (expected RFC 3339): {}", value))?;
    Ok(at.timestamp_millis())
}

fn transition_request(args: &MarkArgs) -> TransitionRequest {
    TransitionRequest {
        target: args.status.into(),
        note: args.note.clone(),
        assignee: args.assignee.clone(),
        quantity: args.quantity,
        attachment_id: args.attachment.clone(),
    }
}

async fn follow_up<S: RecordStore>(engine: &Engine<S>, args: &FollowUpArgs, format: OutputFormat) -> Result<String> {
    let scheduled_at = match args.scheduled_at {
        Some(ref value) => parse_scheduled_at(value)?,
        None => now_ms(),
    };
    let created = engine
        .create_follow_up(&args.inspection, FollowUpRequest::new(scheduled_at))
        .await?;
    Ok(render(&created, format, format_follow_up_markdown)?)
}

/// Run one subcommand and return its rendered output.
pub async fn execute<S: RecordStore>(engine: &Engine<S>, command: &Command, format: OutputFormat) -> Result<String> {
    match command {
        Command::Resolve { inspection } => {
            let checklist = engine.resolve(inspection).await?;
            Ok(render(&checklist, format, format_checklist_markdown)?)
        }
        Command::FollowUp(args) => follow_up(engine, args, format).await,
        Command::Mark(args) => {
            let task = engine.transition(&args.task, transition_request(args)).await?;
            Ok(render(&task, format, format_task_markdown)?)
        }
        Command::Complete { task, undo } => {
            let task = engine.set_completed(task, !undo).await?;
            Ok(render(&task, format, format_task_markdown)?)
        }
        Command::Note { task, text } => {
            let activity = engine.add_note(task, text).await?;
            Ok(render(&activity, format, |a| {
                format_history_markdown(&a.task_id, std::slice::from_ref(a))
            })?)
        }
        Command::History { task } => {
            let activities = engine.history(task).await?;
            Ok(render(&activities, format, |a| format_history_markdown(task, a))?)
        }
        Command::Report { inspection } => {
            let report = engine.report(inspection).await?;
            Ok(render(&report, format, format_report_markdown)?)
        }
    }
}
