use serde_json::json;

use crate::common::{TestApp, routes};

mod template_crud {
    use super::*;

    #[tokio::test]
    async fn create_returns_derived_variables() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");

        let res = app
            .post_with_token(
                routes::TEMPLATES,
                &json!({
                    "name": "Sponsor",
                    "content": "Use {{ coupon }} for {{discount}}. Again: {{coupon}}"
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["name"], "Sponsor");
        assert_eq!(res.body["variables"], json!(["coupon", "discount"]));
    }

    #[tokio::test]
    async fn create_rejects_blank_name() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");

        let res = app
            .post_with_token(
                routes::TEMPLATES,
                &json!({ "name": "   ", "content": "x" }),
                &token,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn malformed_json_is_a_validation_error() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");

        let res = app
            .post_with_token(routes::TEMPLATES, &json!({ "name": "no content" }), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn requests_without_token_are_rejected() {
        let app = TestApp::spawn().await;

        let res = app.get_without_token(routes::TEMPLATES).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_MISSING");
    }

    #[tokio::test]
    async fn tokens_signed_with_another_secret_are_rejected() {
        let app = TestApp::spawn().await;
        let token = vidscribe_server::utils::jwt::sign("wrong-secret", 1, "alice").unwrap();

        let res = app.get_with_token(routes::TEMPLATES, &token).await;
        assert_eq!(res.status, 401);
        assert_eq!(res.body["code"], "TOKEN_INVALID");
    }

    #[tokio::test]
    async fn list_is_scoped_to_owner_and_searchable() {
        let app = TestApp::spawn().await;
        let alice = app.token_for(1, "alice");
        let bob = app.token_for(2, "bob");

        app.create_template(&alice, "Intro", "Hi").await;
        app.create_template(&alice, "Outro", "Bye").await;
        app.create_template(&bob, "Bob intro", "Yo").await;

        let res = app.get_with_token(routes::TEMPLATES, &alice).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 2);
        assert_eq!(res.body["pagination"]["total"], 2);

        let res = app
            .get_with_token(&format!("{}?search=OUT", routes::TEMPLATES), &alice)
            .await;
        let data = res.body["data"].as_array().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0]["name"], "Outro");
    }

    #[tokio::test]
    async fn other_owners_template_is_not_found() {
        let app = TestApp::spawn().await;
        let alice = app.token_for(1, "alice");
        let bob = app.token_for(2, "bob");

        let id = app.create_template(&alice, "Intro", "Hi").await;

        let res = app.get_with_token(&routes::template(id), &bob).await;
        assert_eq!(res.status, 404);
        assert_eq!(res.body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn patch_updates_content_and_variables() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let id = app.create_template(&token, "Intro", "Hi").await;

        let res = app
            .patch_with_token(
                &routes::template(id),
                &json!({ "content": "Hi {{name}}" }),
                &token,
            )
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["template"]["content"], "Hi {{name}}");
        assert_eq!(res.body["template"]["variables"], json!(["name"]));
        assert_eq!(res.body["cascade"]["video_ids"], json!([]));
    }

    #[tokio::test]
    async fn empty_patch_returns_current_template() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let id = app.create_template(&token, "Intro", "Hi").await;

        let res = app.patch_with_token(&routes::template(id), &json!({}), &token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["template"]["name"], "Intro");
    }

    #[tokio::test]
    async fn delete_unused_template() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let id = app.create_template(&token, "Intro", "Hi").await;

        let res = app.delete_with_token(&routes::template(id), &token).await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(&routes::template(id), &token).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn delete_template_used_by_container_conflicts() {
        let app = TestApp::spawn().await;
        let token = app.token_for(1, "alice");
        let id = app.create_template(&token, "Intro", "Hi").await;
        app.create_container(&token, "Box", "\n", &[id]).await;

        let res = app.delete_with_token(&routes::template(id), &token).await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");
    }
}
