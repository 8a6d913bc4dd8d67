//! Integration tests for task status transitions, completion, notes and
//! reports against the SQLite store.

use inspection_lineage::config::EngineConfig;
use inspection_lineage::db::Database;
use inspection_lineage::engine::{Engine, Reconciled, TransitionRequest, VendorCount};
use inspection_lineage::error::ErrorCode;
use inspection_lineage::store::{SqliteStore, StaticIdentity};
use inspection_lineage::types::{ActivityKind, InspectionType, NewInspection, NewTask, Task, TaskStatus};
use std::sync::Arc;

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Arc<Database> {
    Arc::new(Database::open_in_memory().expect("Failed to create in-memory database"))
}

fn engine_as(db: &Arc<Database>, user: Option<&str>) -> Engine<SqliteStore> {
    let identity = match user {
        Some(u) => StaticIdentity::new(u),
        None => StaticIdentity::anonymous(),
    };
    Engine::new(
        Arc::new(SqliteStore::new(Arc::clone(db))),
        Arc::new(identity),
        EngineConfig::default(),
    )
}

fn engine(db: &Arc<Database>) -> Engine<SqliteStore> {
    engine_as(db, Some("inspector-1"))
}

fn inspection(db: &Database) -> String {
    db.insert_inspection(&NewInspection {
        inspection_type: InspectionType::Routine,
        scheduled_at: 0,
        property_id: "prop-1".into(),
        unit_id: None,
        parent_inspection_id: None,
        template_id: None,
        created_by: None,
    })
    .unwrap()
    .id
}

fn seed(db: &Database, new: NewTask) -> Task {
    db.insert_tasks(&[new]).unwrap().remove(0)
}

fn plain_task(db: &Database) -> Task {
    let insp = inspection(db);
    seed(
        db,
        NewTask {
            inspection_id: insp,
            description: "Fix faucet".into(),
            ..Default::default()
        },
    )
}

fn inventory_task(db: &Database) -> Task {
    let insp = inspection(db);
    seed(
        db,
        NewTask {
            inspection_id: insp,
            description: "Replace bulbs".into(),
            inventory_type_id: Some("bulb".into()),
            ..Default::default()
        },
    )
}

mod fail_gate_tests {
    use super::*;

    #[tokio::test]
    async fn empty_note_leaves_task_untouched() {
        let db = setup_db();
        let engine = engine(&db);
        let t = plain_task(&db);

        let err = engine
            .transition(
                &t.id,
                TransitionRequest::new(TaskStatus::Fail)
                    .with_note("")
                    .with_assignee("U1"),
            )
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.field.as_deref(), Some("note"));
        let stored = db.get_task(&t.id).unwrap().unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);
        assert!(stored.assigned_user_ids.is_empty());
        assert!(db.list_activities(&t.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_assignee_leaves_task_untouched() {
        let db = setup_db();
        let engine = engine(&db);
        let t = plain_task(&db);

        let err = engine
            .transition(&t.id, TransitionRequest::new(TaskStatus::Fail).with_note("cracked"))
            .await
            .unwrap_err();

        assert_eq!(err.field.as_deref(), Some("assignee"));
        assert_eq!(db.get_task(&t.id).unwrap().unwrap().status, TaskStatus::Pending);
        assert!(db.list_activities(&t.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn complete_fail_commits_three_effects() {
        let db = setup_db();
        let engine = engine(&db);
        let t = plain_task(&db);

        let failed = engine
            .transition(
                &t.id,
                TransitionRequest::new(TaskStatus::Fail)
                    .with_note("still leaking")
                    .with_assignee("U1")
                    .with_attachment("photo-9"),
            )
            .await
            .unwrap();

        assert_eq!(failed.status, TaskStatus::Fail);
        assert_eq!(failed.status_changed_by.as_deref(), Some("inspector-1"));
        assert!(failed.status_changed_at.is_some());
        assert_eq!(failed.assigned_user_ids.len(), 1);
        assert!(failed.assigned_user_ids.contains("U1"));
        assert_eq!(failed.fail_attachment_id.as_deref(), Some("photo-9"));

        let history = db.list_activities(&t.id).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, ActivityKind::NoteAdded);
        assert_eq!(history[0].actor, "inspector-1");
    }

    #[tokio::test]
    async fn inventory_fail_writes_quantity() {
        let db = setup_db();
        let engine = engine(&db);
        let t = inventory_task(&db);
        let request = TransitionRequest::new(TaskStatus::Fail)
            .with_note("burnt out")
            .with_assignee("U1");

        let err = engine.transition(&t.id, request.clone()).await.unwrap_err();
        assert_eq!(err.field.as_deref(), Some("quantity"));

        let failed = engine.transition(&t.id, request.with_quantity(6)).await.unwrap();
        assert_eq!(failed.quantity, Some(6));
    }

    #[tokio::test]
    async fn anonymous_user_cannot_transition() {
        let db = setup_db();
        let t = plain_task(&db);

        let err = engine_as(&db, None)
            .transition(&t.id, TransitionRequest::new(TaskStatus::Pass))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::NotAuthenticated);
        assert_eq!(db.get_task(&t.id).unwrap().unwrap().status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let db = setup_db();
        let err = engine(&db)
            .transition("ghost", TransitionRequest::new(TaskStatus::Pass))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::TaskNotFound);
    }
}

mod toggle_tests {
    use super::*;

    #[tokio::test]
    async fn pass_twice_returns_to_pending() {
        let db = setup_db();
        let engine = engine(&db);
        let t = plain_task(&db);

        let passed = engine
            .transition(&t.id, TransitionRequest::new(TaskStatus::Pass))
            .await
            .unwrap();
        assert_eq!(passed.status, TaskStatus::Pass);

        let reverted = engine
            .transition(&t.id, TransitionRequest::new(TaskStatus::Pass))
            .await
            .unwrap();
        assert_eq!(reverted.status, TaskStatus::Pending);
        assert!(reverted.status_changed_by.is_none());

        let notes: Vec<String> = db
            .list_activities(&t.id)
            .unwrap()
            .into_iter()
            .map(|a| a.note)
            .collect();
        assert_eq!(notes, vec!["pending → pass", "pass → pending"]);
    }

    #[tokio::test]
    async fn fail_twice_returns_to_pending_and_clears_attachment() {
        let db = setup_db();
        let engine = engine(&db);
        let t = plain_task(&db);
        let fail = TransitionRequest::new(TaskStatus::Fail)
            .with_note("cracked tile")
            .with_assignee("U1")
            .with_attachment("photo-1");

        engine.transition(&t.id, fail.clone()).await.unwrap();
        let reverted = engine.transition(&t.id, fail).await.unwrap();

        assert_eq!(reverted.status, TaskStatus::Pending);
        assert!(reverted.fail_attachment_id.is_none());
        // The assignee added by the fail stays.
        assert!(reverted.assigned_user_ids.contains("U1"));
    }

    #[tokio::test]
    async fn plan_then_commit_reconciles() {
        let db = setup_db();
        let engine = engine(&db);
        let t = plain_task(&db);

        let pending = engine
            .plan_transition(&t.id, &TransitionRequest::new(TaskStatus::Pass))
            .await
            .unwrap();
        assert_eq!(pending.optimistic.status, TaskStatus::Pass);
        // Nothing written yet.
        assert_eq!(db.get_task(&t.id).unwrap().unwrap().status, TaskStatus::Pending);

        match engine.commit(pending).await {
            Reconciled::Committed(task) => assert_eq!(task.status, TaskStatus::Pass),
            Reconciled::Reverted { error, .. } => panic!("unexpected revert: {}", error),
        }
    }

    #[tokio::test]
    async fn commit_against_deleted_row_reverts() {
        let db = setup_db();
        let engine = engine(&db);
        let t = plain_task(&db);

        let pending = engine
            .plan_transition(&t.id, &TransitionRequest::new(TaskStatus::Pass))
            .await
            .unwrap();
        db.delete_task(&t.id).unwrap();

        let settled = engine.commit(pending).await;
        assert_eq!(settled.task().status, TaskStatus::Pending);
        assert_eq!(
            settled.into_result().unwrap_err().code,
            ErrorCode::StoreWriteFailed
        );
        // The failed transaction wrote no activity.
        assert!(db.list_activities(&t.id).unwrap().is_empty());
    }
}

mod completion_tests {
    use super::*;

    #[tokio::test]
    async fn completing_failed_task_relabels_pass() {
        let db = setup_db();
        let engine = engine(&db);
        let t = plain_task(&db);
        engine
            .transition(
                &t.id,
                TransitionRequest::new(TaskStatus::Fail)
                    .with_note("loose handle")
                    .with_assignee("U2")
                    .with_attachment("photo-3"),
            )
            .await
            .unwrap();

        let done = engine.set_completed(&t.id, true).await.unwrap();

        assert!(done.completed);
        assert_eq!(done.status, TaskStatus::Pass);
        assert_eq!(done.completed_by.as_deref(), Some("inspector-1"));
        assert!(done.completed_at.is_some());
        assert!(done.fail_attachment_id.is_none());

        let kinds: Vec<ActivityKind> = db
            .list_activities(&t.id)
            .unwrap()
            .into_iter()
            .map(|a| a.kind)
            .collect();
        assert_eq!(kinds, vec![ActivityKind::NoteAdded, ActivityKind::StatusChange]);
    }

    #[tokio::test]
    async fn uncompleting_clears_stamp() {
        let db = setup_db();
        let engine = engine(&db);
        let t = plain_task(&db);

        engine.set_completed(&t.id, true).await.unwrap();
        let undone = engine.set_completed(&t.id, false).await.unwrap();

        assert!(!undone.completed);
        assert!(undone.completed_by.is_none());
        assert!(undone.completed_at.is_none());
    }
}

mod note_tests {
    use super::*;

    #[tokio::test]
    async fn notes_append_in_order() {
        let db = setup_db();
        let engine = engine(&db);
        let t = plain_task(&db);

        engine.add_note(&t.id, "called plumber").await.unwrap();
        engine.add_note(&t.id, "  parts ordered  ").await.unwrap();

        let history = engine.history(&t.id).await.unwrap();
        let notes: Vec<&str> = history.iter().map(|a| a.note.as_str()).collect();
        assert_eq!(notes, vec!["called plumber", "parts ordered"]);
    }

    #[tokio::test]
    async fn blank_note_is_rejected() {
        let db = setup_db();
        let t = plain_task(&db);
        let err = engine(&db).add_note(&t.id, "   ").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[tokio::test]
    async fn anonymous_note_is_rejected() {
        let db = setup_db();
        let t = plain_task(&db);
        let err = engine_as(&db, None).add_note(&t.id, "hello").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);
    }
}

mod report_tests {
    use super::*;

    #[tokio::test]
    async fn report_counts_failed_vendors_only() {
        let db = setup_db();
        let engine = engine(&db);
        let insp = inspection(&db);
        let make = |desc: &str, vendor: &str, status: TaskStatus| NewTask {
            inspection_id: insp.clone(),
            description: desc.into(),
            vendor_type_id: Some(vendor.into()),
            status,
            ..Default::default()
        };
        db.insert_tasks(&[
            make("Fix faucet", "plumber", TaskStatus::Fail),
            make("Unclog drain", "plumber", TaskStatus::Fail),
            make("Paint wall", "painter", TaskStatus::Fail),
            make("Fix outlet", "electrician", TaskStatus::Pass),
        ])
        .unwrap();

        let report = engine.report(&insp).await.unwrap();

        assert_eq!(
            report.vendors,
            vec![
                VendorCount {
                    vendor_type_id: "plumber".into(),
                    count: 2
                },
                VendorCount {
                    vendor_type_id: "painter".into(),
                    count: 1
                },
            ]
        );
        assert!(report.inventory.is_empty());
    }
}
