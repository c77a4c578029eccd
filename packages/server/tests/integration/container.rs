use serde_json::json;

use crate::common::{TestApp, routes};

mod container_crud {
    use super::*;

    #[tokio::test]
    async fn create_keeps_template_order() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let a = app.create_template(&token, "A", "Hello").await;
        let b = app.create_template(&token, "B", "Bye").await;

        let res = app
            .post_with_token(
                routes::CONTAINERS,
                &json!({ "name": "Box", "separator": " | ", "template_ids": [b, a] }),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let templates = res.body["templates"].as_array().unwrap();
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0]["template_id"], b);
        assert_eq!(templates[0]["position"], 0);
        assert_eq!(templates[1]["template_id"], a);
        assert_eq!(templates[1]["position"], 1);
        assert_eq!(res.body["separator"], " | ");
    }

    #[tokio::test]
    async fn create_defaults_separator() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");

        let res = app
            .post_with_token(routes::CONTAINERS, &json!({ "name": "Empty" }), &token)
            .await;

        assert_eq!(res.status, 201);
        assert_eq!(res.body["separator"], "\n\n");
        assert_eq!(res.body["templates"], json!([]));
    }

    #[tokio::test]
    async fn create_rejects_duplicate_templates() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let a = app.create_template(&token, "A", "Hello").await;

        let res = app
            .post_with_token(
                routes::CONTAINERS,
                &json!({ "name": "Box", "template_ids": [a, a] }),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn create_rejects_other_owners_template() {
        let app = TestApp::spawn().await;
        let alice = app.token_for(1, "alice");
        let bob = app.token_for(2, "bob");
        let foreign = app.create_template(&bob, "B", "Bob's").await;

        let res = app
            .post_with_token(
                routes::CONTAINERS,
                &json!({ "name": "Box", "template_ids": [foreign] }),
                &alice,
            )
            .await;

        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn replace_templates_changes_order() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let a = app.create_template(&token, "A", "Hello").await;
        let b = app.create_template(&token, "B", "Bye").await;
        let c = app.create_container(&token, "Box", "\n", &[a, b]).await;

        let res = app
            .put_with_token(
                &routes::container_templates(c),
                &json!({ "template_ids": [b] }),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        let templates = res.body["container"]["templates"].as_array().unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0]["template_id"], b);
    }

    #[tokio::test]
    async fn list_variables_in_segment_order() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let a = app.create_template(&token, "A", "Hello {{name}}").await;
        let b = app.create_template(&token, "B", "Bye {{name}}, {{coupon}}").await;
        let c = app.create_container(&token, "Box", "\n", &[a, b]).await;

        let res = app.get_with_token(&routes::container_variables(c), &token).await;
        assert_eq!(res.status, 200);
        let data = res.body["data"].as_array().unwrap();
        let pairs: Vec<(i64, &str)> = data
            .iter()
            .map(|v| (v["template_id"].as_i64().unwrap(), v["name"].as_str().unwrap()))
            .collect();
        assert_eq!(
            pairs,
            vec![(a as i64, "name"), (b as i64, "name"), (b as i64, "coupon")]
        );
    }

    #[tokio::test]
    async fn preview_uses_separator_and_shared_values() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let a = app.create_template(&token, "A", "Hello {{name}}").await;
        let b = app.create_template(&token, "B", "Bye {{name}} {{coupon}}").await;
        let c = app.create_container(&token, "Box", " | ", &[a, b]).await;

        let res = app
            .post_with_token(
                &routes::container_preview(c),
                &json!({ "values": { "name": "Sam" } }),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["description"], "Hello Sam | Bye Sam {{coupon}}");
    }

    #[tokio::test]
    async fn delete_with_attached_video_conflicts() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let c = app.create_container(&token, "Box", "\n", &[]).await;
        let v = app.insert_video(1, "").await;
        assert_eq!(app.attach(&token, v, c).await.status, 200);

        let res = app.delete_with_token(&routes::container(c), &token).await;
        assert_eq!(res.status, 409);

        app.post_with_token(&routes::video_detach(v), &json!({}), &token)
            .await;
        let res = app.delete_with_token(&routes::container(c), &token).await;
        assert_eq!(res.status, 204);
    }
}
