use common::{PushJob, PushOrigin, PushOutcome, PushResult, RecomputeJob, SyncStatus};
use sea_orm::EntityTrait;
use serde_json::json;

use vidscribe_server::consumers::push_result::process_push_result;
use vidscribe_server::consumers::recompute::{RecomputeAction, process_recompute_job};
use vidscribe_server::engine::ledger::HistoryLedger;
use vidscribe_server::entity::video;

use crate::common::{TestApp, routes};

async fn load_video(app: &TestApp, id: i32) -> video::Model {
    video::Entity::find_by_id(id)
        .one(&app.db)
        .await
        .unwrap()
        .expect("video exists")
}

/// An attached video whose variable `name` is set to `Sam`.
async fn attached_video(app: &TestApp) -> i32 {
    let token = app.token_for(1, "alice");
    let a = app.create_template(&token, "A", "Hello {{name}}").await;
    let b = app.create_template(&token, "B", "Bye {{name}}").await;
    let c = app.create_container(&token, "Box", " | ", &[a, b]).await;
    let v = app.insert_video(1, "stale").await;
    app.attach(&token, v, c).await;
    app.patch_with_token(
        &routes::video_variables(v),
        &json!({ "variables": [
            { "template_id": a, "name": "name", "value": "Sam" },
            { "template_id": b, "name": "name", "value": "Sam" }
        ] }),
        &token,
    )
    .await;
    v
}

mod recompute {
    use super::*;

    #[tokio::test]
    async fn changed_render_is_pushed_and_marked_pending() {
        let app = TestApp::spawn().await;
        let v = attached_video(&app).await;

        let action = process_recompute_job(&app.db, app.dispatcher.as_ref(), RecomputeJob::new(v, "alice"))
            .await
            .unwrap();

        let RecomputeAction::Pushed { job_id } = action else {
            panic!("expected a push, got {action:?}");
        };
        let pushed = app.dispatcher.pushed();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].job_id, job_id);
        assert_eq!(pushed[0].description, "Hello Sam | Bye Sam");
        assert_eq!(pushed[0].origin, PushOrigin::Recompute);
        assert_eq!(load_video(&app, v).await.sync_status, SyncStatus::Pending);
    }

    #[tokio::test]
    async fn synced_identical_render_is_not_pushed() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let a = app.create_template(&token, "A", "Static text").await;
        let c = app.create_container(&token, "Box", "\n", &[a]).await;
        let v = app.insert_video(1, "Static text").await;
        app.attach(&token, v, c).await;

        let action = process_recompute_job(&app.db, app.dispatcher.as_ref(), RecomputeJob::new(v, "alice"))
            .await
            .unwrap();

        assert_eq!(action, RecomputeAction::Unchanged);
        assert!(app.dispatcher.pushed().is_empty());
    }

    #[tokio::test]
    async fn detached_or_missing_video_is_skipped() {
        let app = TestApp::spawn().await;
        let v = app.insert_video(1, "manual").await;

        let detached = process_recompute_job(&app.db, app.dispatcher.as_ref(), RecomputeJob::new(v, "alice"))
            .await
            .unwrap();
        let missing =
            process_recompute_job(&app.db, app.dispatcher.as_ref(), RecomputeJob::new(999_999, "alice"))
                .await
                .unwrap();

        assert_eq!(detached, RecomputeAction::Skipped);
        assert_eq!(missing, RecomputeAction::Skipped);
        assert_eq!(load_video(&app, v).await.current_description, "manual");
    }
}

mod push_results {
    use super::*;

    fn result_for(job: &PushJob, outcome: PushOutcome) -> PushResult {
        PushResult::from_job(job, outcome)
    }

    #[tokio::test]
    async fn confirmed_recompute_push_appends_history_once() {
        let app = TestApp::spawn().await;
        let v = attached_video(&app).await;
        let job = PushJob::new(v, "ext", "Hello Sam | Bye Sam", "alice", PushOrigin::Recompute);

        process_push_result(&app.db, result_for(&job, PushOutcome::Pushed))
            .await
            .unwrap();
        process_push_result(&app.db, result_for(&job, PushOutcome::Pushed))
            .await
            .unwrap();

        let entries = HistoryLedger::new(&app.db).list(v).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].version_number, 1);
        assert_eq!(entries[0].push_job_id.as_deref(), Some(job.job_id.as_str()));

        let video = load_video(&app, v).await;
        assert_eq!(video.current_description, "Hello Sam | Bye Sam");
        assert_eq!(video.sync_status, SyncStatus::Synced);
    }

    #[tokio::test]
    async fn failed_push_marks_video_failed_without_history() {
        let app = TestApp::spawn().await;
        let v = attached_video(&app).await;
        let job = PushJob::new(v, "ext", "Hello Sam | Bye Sam", "alice", PushOrigin::Recompute);

        process_push_result(
            &app.db,
            result_for(
                &job,
                PushOutcome::Failed {
                    error: "quotaExceeded".into(),
                    attempts: 4,
                },
            ),
        )
        .await
        .unwrap();

        let video = load_video(&app, v).await;
        assert_eq!(video.sync_status, SyncStatus::Failed);
        assert_eq!(video.last_push_error.as_deref(), Some("quotaExceeded"));
        assert_eq!(video.current_description, "stale");
        assert!(HistoryLedger::new(&app.db).list(v).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn confirmed_restore_push_only_marks_synced() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let v = app.insert_video(1, "manual").await;

        app.post_with_token(&routes::video_sync(v), &json!({}), &token)
            .await;
        let job = app.dispatcher.pushed().remove(0);
        assert_eq!(load_video(&app, v).await.sync_status, SyncStatus::Pending);

        process_push_result(&app.db, result_for(&job, PushOutcome::Pushed))
            .await
            .unwrap();

        assert_eq!(load_video(&app, v).await.sync_status, SyncStatus::Synced);
        assert!(HistoryLedger::new(&app.db).list(v).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn result_for_deleted_video_is_ignored() {
        let app = TestApp::spawn().await;
        let job = PushJob::new(999_999, "ext", "text", "alice", PushOrigin::Recompute);

        process_push_result(&app.db, result_for(&job, PushOutcome::Pushed))
            .await
            .unwrap();
    }
}
