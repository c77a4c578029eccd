use std::time::Duration;

use sea_orm::TransactionTrait;
use serde_json::json;

use vidscribe_server::engine::attach::clear_variables;
use vidscribe_server::engine::link::{ContainerLink, store_link};
use vidscribe_server::engine::lookup::lock_video;

use crate::common::{TestApp, routes};

struct Fixture {
    token: String,
    shared: i32,
    only_a: i32,
    container_a: i32,
    container_b: i32,
    videos_a: [i32; 2],
    video_b: i32,
}

/// Template `shared` sits in containers A and B; two videos are attached to A
/// and one to B.
async fn two_containers_sharing_a_template(app: &TestApp) -> Fixture {
    let token = app.token_for(1, "alice");
    let shared = app.create_template(&token, "Shared", "Hello {{name}}").await;
    let only_a = app.create_template(&token, "OnlyA", "Bye {{name}}").await;
    let container_a = app
        .create_container(&token, "A", "\n", &[shared, only_a])
        .await;
    let container_b = app.create_container(&token, "B", "\n", &[shared]).await;

    let v1 = app.insert_video(1, "").await;
    let v2 = app.insert_video(1, "").await;
    let v3 = app.insert_video(1, "").await;
    app.attach(&token, v1, container_a).await;
    app.attach(&token, v2, container_a).await;
    app.attach(&token, v3, container_b).await;

    // An unattached video never shows up in a cascade.
    app.insert_video(1, "").await;

    Fixture {
        token,
        shared,
        only_a,
        container_a,
        container_b,
        videos_a: [v1, v2],
        video_b: v3,
    }
}

mod template_cascade {
    use super::*;

    #[tokio::test]
    async fn content_edit_reaches_every_video_of_every_container() {
        let app = TestApp::spawn().await;
        let f = two_containers_sharing_a_template(&app).await;

        let res = app
            .patch_with_token(
                &routes::template(f.shared),
                &json!({ "content": "Hi {{name}}" }),
                &f.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let mut expected = vec![f.videos_a[0], f.videos_a[1], f.video_b];
        expected.sort();
        assert_eq!(res.cascade_ids("cascade"), expected);
        assert_eq!(
            res.body["cascade"]["affected_containers"],
            json!([f.container_a, f.container_b])
        );
        assert_eq!(res.body["cascade"]["dispatched"], true);
        assert_eq!(res.body["cascade"]["queued"], 3);
        assert_eq!(app.dispatcher.recomputed_ids(), vec![expected]);
    }

    #[tokio::test]
    async fn template_in_one_container_cascades_to_that_container_only() {
        let app = TestApp::spawn().await;
        let f = two_containers_sharing_a_template(&app).await;

        let res = app
            .patch_with_token(
                &routes::template(f.only_a),
                &json!({ "content": "See you {{name}}" }),
                &f.token,
            )
            .await;

        assert_eq!(res.cascade_ids("cascade"), f.videos_a.to_vec());
    }

    #[tokio::test]
    async fn rename_or_identical_content_does_not_cascade() {
        let app = TestApp::spawn().await;
        let f = two_containers_sharing_a_template(&app).await;

        let res = app
            .patch_with_token(
                &routes::template(f.shared),
                &json!({ "name": "Greeting", "content": "Hello {{name}}" }),
                &f.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["template"]["name"], "Greeting");
        assert_eq!(res.cascade_ids("cascade"), Vec::<i32>::new());
        assert!(app.dispatcher.recomputed_ids().is_empty());
    }

    #[tokio::test]
    async fn new_placeholder_is_seeded_for_attached_videos() {
        let app = TestApp::spawn().await;
        let f = two_containers_sharing_a_template(&app).await;

        app.patch_with_token(
            &routes::template(f.shared),
            &json!({ "content": "Hello {{name}}, try {{coupon}}" }),
            &f.token,
        )
        .await;

        let res = app
            .get_with_token(&routes::video_variables(f.video_b), &f.token)
            .await;
        let names: Vec<&str> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["coupon", "name"]);
    }

    #[tokio::test]
    async fn detach_racing_a_content_edit_leaves_no_variables() {
        let app = TestApp::spawn().await;
        let f = two_containers_sharing_a_template(&app).await;
        let v = f.video_b;

        // A detach in flight holds the video row until it commits.
        let txn = app.db.begin().await.unwrap();
        lock_video(&txn, v).await.unwrap();

        let path = routes::template(f.shared);
        let body = json!({ "content": "Hello {{name}}, try {{coupon}}" });
        let (res, ()) = tokio::join!(
            app.patch_with_token(&path, &body, &f.token),
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                store_link(&txn, v, ContainerLink::Unassigned).await.unwrap();
                clear_variables(&txn, v).await.unwrap();
                txn.commit().await.unwrap();
            }
        );
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.get_with_token(&routes::video(v), &f.token).await;
        assert!(res.body["container_id"].is_null());
        let res = app
            .get_with_token(&routes::video_variables(v), &f.token)
            .await;
        assert_eq!(res.body["data"].as_array().unwrap().len(), 0);

        // Videos still attached got the new placeholder.
        let res = app
            .get_with_token(&routes::video_variables(f.videos_a[0]), &f.token)
            .await;
        assert_eq!(res.body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn dispatch_failure_keeps_the_edit_and_reports_it() {
        let app = TestApp::spawn().await;
        let f = two_containers_sharing_a_template(&app).await;
        app.dispatcher.fail(true);

        let res = app
            .patch_with_token(
                &routes::template(f.shared),
                &json!({ "content": "Hi {{name}}" }),
                &f.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["cascade"]["dispatched"], false);
        assert_eq!(res.body["cascade"]["queued"], 0);
        assert_eq!(res.cascade_ids("cascade").len(), 3);

        let res = app
            .get_with_token(&routes::template(f.shared), &f.token)
            .await;
        assert_eq!(res.body["content"], "Hi {{name}}");
    }
}

mod container_cascade {
    use super::*;

    #[tokio::test]
    async fn separator_change_reaches_attached_videos() {
        let app = TestApp::spawn().await;
        let f = two_containers_sharing_a_template(&app).await;

        let res = app
            .patch_with_token(
                &routes::container(f.container_a),
                &json!({ "separator": " -- " }),
                &f.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["container"]["separator"], " -- ");
        assert_eq!(res.cascade_ids("cascade"), f.videos_a.to_vec());
    }

    #[tokio::test]
    async fn rename_does_not_cascade() {
        let app = TestApp::spawn().await;
        let f = two_containers_sharing_a_template(&app).await;

        let res = app
            .patch_with_token(
                &routes::container(f.container_a),
                &json!({ "name": "Renamed" }),
                &f.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.cascade_ids("cascade"), Vec::<i32>::new());
    }

    #[tokio::test]
    async fn replacing_templates_resyncs_variables() {
        let app = TestApp::spawn().await;
        let f = two_containers_sharing_a_template(&app).await;
        let extra = app
            .create_template(&f.token, "Extra", "Code {{coupon}}")
            .await;

        let res = app
            .put_with_token(
                &routes::container_templates(f.container_a),
                &json!({ "template_ids": [extra, f.shared] }),
                &f.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.cascade_ids("cascade"), f.videos_a.to_vec());

        let res = app
            .get_with_token(&routes::video_variables(f.videos_a[0]), &f.token)
            .await;
        let mut keys: Vec<(i64, String)> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| {
                (
                    row["template_id"].as_i64().unwrap(),
                    row["name"].as_str().unwrap().to_string(),
                )
            })
            .collect();
        keys.sort();
        let mut expected = vec![
            (f.shared as i64, "name".to_string()),
            (extra as i64, "coupon".to_string()),
        ];
        expected.sort();
        assert_eq!(keys, expected);
    }

    #[tokio::test]
    async fn same_order_does_not_cascade() {
        let app = TestApp::spawn().await;
        let f = two_containers_sharing_a_template(&app).await;

        let res = app
            .put_with_token(
                &routes::container_templates(f.container_a),
                &json!({ "template_ids": [f.shared, f.only_a] }),
                &f.token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.cascade_ids("cascade"), Vec::<i32>::new());
        assert!(app.dispatcher.recomputed_ids().is_empty());
    }
}
