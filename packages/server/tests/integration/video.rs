use std::time::Duration;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait, sea_query::LockType,
};
use serde_json::json;

use vidscribe_server::entity::{template, variable};

use crate::common::{TestApp, routes};

async fn variable_count(app: &TestApp, video_id: i32) -> u64 {
    variable::Entity::find()
        .filter(variable::Column::VideoId.eq(video_id))
        .count(&app.db)
        .await
        .expect("count variables")
}

mod attach {
    use super::*;

    #[tokio::test]
    async fn attach_seeds_one_empty_variable_per_placeholder() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let a = app.create_template(&token, "A", "Hello {{name}} {{name}}").await;
        let b = app.create_template(&token, "B", "Bye {{name}}, use {{coupon}}").await;
        let c = app.create_container(&token, "Box", "\n", &[a, b]).await;
        let v = app.insert_video(1, "manual text").await;

        let res = app.attach(&token, v, c).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["container_id"], c);
        assert_eq!(res.body["variables_seeded"], 3);

        let res = app.get_with_token(&routes::video_variables(v), &token).await;
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 3);
        assert!(data.iter().all(|row| row["value"] == "" && row["kind"] == "text"));

        // Attaching alone pushes nothing.
        assert!(app.dispatcher.pushed().is_empty());
        assert!(app.dispatcher.recomputed_ids().is_empty());
    }

    #[tokio::test]
    async fn second_attach_is_precondition_failed_and_keeps_variables() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let a = app.create_template(&token, "A", "Hello {{name}}").await;
        let c1 = app.create_container(&token, "One", "\n", &[a]).await;
        let c2 = app.create_container(&token, "Two", "\n", &[a]).await;
        let v = app.insert_video(1, "").await;

        assert_eq!(app.attach(&token, v, c1).await.status, 200);

        let res = app.attach(&token, v, c1).await;
        assert_eq!(res.status, 412);
        assert_eq!(res.body["code"], "PRECONDITION_FAILED");

        let res = app.attach(&token, v, c2).await;
        assert_eq!(res.status, 412);

        assert_eq!(variable_count(&app, v).await, 1);
        let res = app.get_with_token(&routes::video(v), &token).await;
        assert_eq!(res.body["container_id"], c1);
    }

    #[tokio::test]
    async fn concurrent_attaches_let_exactly_one_win() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let a = app.create_template(&token, "A", "Hello {{name}}").await;
        let c1 = app.create_container(&token, "One", "\n", &[a]).await;
        let c2 = app.create_container(&token, "Two", "\n", &[a]).await;
        let v = app.insert_video(1, "").await;

        let (r1, r2) = tokio::join!(app.attach(&token, v, c1), app.attach(&token, v, c2));
        let mut statuses = [r1.status, r2.status];
        statuses.sort();
        assert_eq!(statuses, [200, 412]);
        assert_eq!(variable_count(&app, v).await, 1);
    }

    #[tokio::test]
    async fn attach_waits_for_an_uncommitted_template_edit() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let a = app.create_template(&token, "A", "Hello {{name}}").await;
        let c = app.create_container(&token, "Box", "\n", &[a]).await;
        let v = app.insert_video(1, "").await;

        // An edit in flight holds the template row until it commits.
        let txn = app.db.begin().await.unwrap();
        let locked = template::Entity::find_by_id(a)
            .lock(LockType::Update)
            .one(&txn)
            .await
            .unwrap()
            .unwrap();
        let mut edit: template::ActiveModel = locked.into();
        edit.content = Set("Hello {{name}}, see {{extra}}".into());
        edit.update(&txn).await.unwrap();

        let (res, ()) = tokio::join!(app.attach(&token, v, c), async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            txn.commit().await.unwrap();
        });

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["variables_seeded"], 2);

        let res = app.get_with_token(&routes::video_variables(v), &token).await;
        let mut names: Vec<&str> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["name"].as_str().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["extra", "name"]);
    }

    #[tokio::test]
    async fn attach_to_missing_or_foreign_container_is_not_found() {
        let app = TestApp::spawn().await;
        let alice = app.token_for(1, "alice");
        let bob = app.token_for(2, "bob");
        let foreign = app.create_container(&bob, "Bob's", "\n", &[]).await;
        let v = app.insert_video(1, "").await;

        assert_eq!(app.attach(&alice, v, 999_999).await.status, 404);
        assert_eq!(app.attach(&alice, v, foreign).await.status, 404);
    }

    #[tokio::test]
    async fn other_owners_video_is_not_found() {
        let app = TestApp::spawn().await;
        let bob = app.token_for(2, "bob");
        let c = app.create_container(&bob, "Bob's", "\n", &[]).await;
        let v = app.insert_video(1, "").await;

        assert_eq!(app.get_with_token(&routes::video(v), &bob).await.status, 404);
        assert_eq!(app.attach(&bob, v, c).await.status, 404);
    }
}

mod detach {
    use super::*;

    #[tokio::test]
    async fn detach_clears_container_and_variables() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let a = app.create_template(&token, "A", "Hello {{name}}").await;
        let c = app.create_container(&token, "Box", "\n", &[a]).await;
        let v = app.insert_video(1, "keep me").await;
        app.attach(&token, v, c).await;

        let res = app
            .post_with_token(&routes::video_detach(v), &json!({}), &token)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["container_id"], c);
        assert_eq!(res.body["variables_cleared"], 1);

        let res = app.get_with_token(&routes::video(v), &token).await;
        assert!(res.body["container_id"].is_null());
        assert_eq!(res.body["current_description"], "keep me");
        assert_eq!(variable_count(&app, v).await, 0);

        // A detached video may be attached again, to any container.
        assert_eq!(app.attach(&token, v, c).await.status, 200);
    }

    #[tokio::test]
    async fn detach_unattached_video_is_precondition_failed() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let v = app.insert_video(1, "").await;

        let res = app
            .post_with_token(&routes::video_detach(v), &json!({}), &token)
            .await;
        assert_eq!(res.status, 412);
    }
}

mod variables {
    use super::*;

    #[tokio::test]
    async fn value_change_recomputes_only_that_video() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let a = app.create_template(&token, "A", "Hello {{name}}").await;
        let c = app.create_container(&token, "Box", "\n", &[a]).await;
        let v1 = app.insert_video(1, "").await;
        let v2 = app.insert_video(1, "").await;
        app.attach(&token, v1, c).await;
        app.attach(&token, v2, c).await;

        let res = app.get_with_token(&routes::video_variables(v1), &token).await;
        assert_eq!(res.body["data"][0]["resolved"], false);

        let res = app
            .patch_with_token(
                &routes::video_variables(v1),
                &json!({ "variables": [{ "template_id": a, "name": "name", "value": "Sam" }] }),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["data"][0]["value"], "Sam");
        assert_eq!(res.body["data"][0]["resolved"], true);
        assert_eq!(res.cascade_ids("cascade"), vec![v1]);
        assert_eq!(res.body["cascade"]["dispatched"], true);
        assert_eq!(res.body["cascade"]["queued"], 1);
        assert_eq!(app.dispatcher.recomputed_ids(), vec![vec![v1]]);
    }

    #[tokio::test]
    async fn kind_change_does_not_recompute() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let a = app.create_template(&token, "A", "Visit {{link}}").await;
        let c = app.create_container(&token, "Box", "\n", &[a]).await;
        let v = app.insert_video(1, "").await;
        app.attach(&token, v, c).await;

        let res = app
            .patch_with_token(
                &routes::video_variables(v),
                &json!({ "variables": [{ "template_id": a, "name": "link", "kind": "url" }] }),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["data"][0]["kind"], "url");
        assert_eq!(res.cascade_ids("cascade"), Vec::<i32>::new());
        assert!(app.dispatcher.recomputed_ids().is_empty());
    }

    #[tokio::test]
    async fn unknown_variable_is_not_found() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let a = app.create_template(&token, "A", "Hello {{name}}").await;
        let c = app.create_container(&token, "Box", "\n", &[a]).await;
        let v = app.insert_video(1, "").await;
        app.attach(&token, v, c).await;

        let res = app
            .patch_with_token(
                &routes::video_variables(v),
                &json!({ "variables": [{ "template_id": a, "name": "nope", "value": "x" }] }),
                &token,
            )
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn detached_video_has_no_variables_to_edit() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let v = app.insert_video(1, "").await;

        let res = app
            .patch_with_token(
                &routes::video_variables(v),
                &json!({ "variables": [{ "template_id": 1, "name": "x", "value": "y" }] }),
                &token,
            )
            .await;
        assert_eq!(res.status, 412);
    }

    #[tokio::test]
    async fn dispatch_failure_still_commits_the_value() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let a = app.create_template(&token, "A", "Hello {{name}}").await;
        let c = app.create_container(&token, "Box", "\n", &[a]).await;
        let v = app.insert_video(1, "").await;
        app.attach(&token, v, c).await;
        app.dispatcher.fail(true);

        let res = app
            .patch_with_token(
                &routes::video_variables(v),
                &json!({ "variables": [{ "template_id": a, "name": "name", "value": "Sam" }] }),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["cascade"]["dispatched"], false);
        assert_eq!(res.body["data"][0]["value"], "Sam");
    }
}

mod preview {
    use super::*;

    #[tokio::test]
    async fn preview_renders_stored_values_and_keeps_empty_markers() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let a = app.create_template(&token, "A", "Hello {{name}}").await;
        let b = app.create_template(&token, "B", "Bye {{name}} {{coupon}}").await;
        let c = app.create_container(&token, "Box", " | ", &[a, b]).await;
        let v = app.insert_video(1, "old").await;
        app.attach(&token, v, c).await;

        // Same name in two templates: two independent rows.
        app.patch_with_token(
            &routes::video_variables(v),
            &json!({ "variables": [
                { "template_id": a, "name": "name", "value": "Sam" },
                { "template_id": b, "name": "name", "value": "Alex" }
            ] }),
            &token,
        )
        .await;

        let res = app.get_with_token(&routes::video_preview(v), &token).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["description"], "Hello Sam | Bye Alex {{coupon}}");
        assert_eq!(res.body["attached"], true);
        assert_eq!(res.body["changed"], true);
    }

    #[tokio::test]
    async fn detached_preview_is_stored_description() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let v = app.insert_video(1, "manual").await;

        let res = app.get_with_token(&routes::video_preview(v), &token).await;
        assert_eq!(res.body["description"], "manual");
        assert_eq!(res.body["attached"], false);
    }
}

mod sync {
    use super::*;

    #[tokio::test]
    async fn attached_video_sync_requests_recompute() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let c = app.create_container(&token, "Box", "\n", &[]).await;
        let v = app.insert_video(1, "").await;
        app.attach(&token, v, c).await;

        let res = app
            .post_with_token(&routes::video_sync(v), &json!({}), &token)
            .await;
        assert_eq!(res.status, 202, "{}", res.text);
        assert_eq!(res.body["mode"], "recompute");
        assert_eq!(app.dispatcher.recomputed_ids(), vec![vec![v]]);
    }

    #[tokio::test]
    async fn detached_video_sync_pushes_stored_description() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let v = app.insert_video(1, "manual").await;

        let res = app
            .post_with_token(&routes::video_sync(v), &json!({}), &token)
            .await;
        assert_eq!(res.status, 202, "{}", res.text);
        assert_eq!(res.body["mode"], "restore");

        let pushed = app.dispatcher.pushed();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].description, "manual");
        assert_eq!(pushed[0].origin, common::PushOrigin::Restore);

        let res = app.get_with_token(&routes::video(v), &token).await;
        assert_eq!(res.body["sync_status"], "Pending");
    }

    #[tokio::test]
    async fn sync_with_queue_down_is_bad_gateway() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let v = app.insert_video(1, "manual").await;
        app.dispatcher.fail(true);

        let res = app
            .post_with_token(&routes::video_sync(v), &json!({}), &token)
            .await;
        assert_eq!(res.status, 502);
        assert_eq!(res.body["code"], "PUSH_DISPATCH_FAILED");
    }
}
