//! The moderation workflow over HTTP: filing, dispatching, settlement,
//! and the console routes, with the gateway identity headers.

use std::sync::Arc;

use api_adapters::principal::{
    ACCOUNT_TYPE_HEADER, STATUS_HEADER, USERNAME_HEADER, USER_ID_HEADER,
};
use api_adapters::{router, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use domains::{AccountStatus, ContentStore, StoreSession, User};
use integration_tests::{account, seeded, Seeded};
use tower::ServiceExt;
use uuid::Uuid;

fn app_for(fixture: &Seeded) -> Router {
    router(AppState::new(Arc::new(fixture.store.clone())))
}

fn request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder().method(method).uri(uri)
}

trait WithIdentity {
    fn as_user(self, user: &User) -> Self;
    fn as_staff(self, username: &str, account_type: &str) -> Self;
}

impl WithIdentity for axum::http::request::Builder {
    fn as_user(self, user: &User) -> Self {
        self.header(USER_ID_HEADER, user.id.to_string())
            .header(USERNAME_HEADER, user.username.clone())
            .header(ACCOUNT_TYPE_HEADER, format!("{:?}", user.account_type))
            .header(STATUS_HEADER, format!("{:?}", user.status))
    }

    fn as_staff(self, username: &str, account_type: &str) -> Self {
        self.header(USER_ID_HEADER, Uuid::now_v7().to_string())
            .header(USERNAME_HEADER, username)
            .header(ACCOUNT_TYPE_HEADER, account_type)
            .header(STATUS_HEADER, "Good")
    }
}

fn json_body(value: serde_json::Value) -> Body {
    Body::from(value.to_string())
}

async fn json_of(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn file_report(app: &Router, fixture: &Seeded) -> Uuid {
    let response = app
        .clone()
        .oneshot(
            request("POST", "/api/reports")
                .as_user(&fixture.bob)
                .header("content-type", "application/json")
                .body(json_body(serde_json::json!({
                    "contentType": "Comment",
                    "contentId": fixture.alice_comment.id,
                    "reportedUser": "alice",
                    "reason": "abusive",
                })))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    json_of(response).await["reportId"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap()
}

#[tokio::test]
async fn ban_round_trip_over_http() {
    let fixture = seeded().await;
    let app = app_for(&fixture);

    let report_id = file_report(&app, &fixture).await;

    // Open when fetched by staff.
    let response = app
        .clone()
        .oneshot(
            request("GET", &format!("/api/reports/{report_id}"))
                .as_staff("mallory", "Moderator")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(json_of(response).await.get("actionTaken").is_none());

    // Dispatch the ban.
    let response = app
        .clone()
        .oneshot(
            request("POST", "/api/moderation/content")
                .as_staff("mallory", "Moderator")
                .header("content-type", "application/json")
                .body(json_body(serde_json::json!({
                    "reportId": report_id,
                    "action": "ban",
                })))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Settled with the full resolution on the wire.
    let response = app
        .clone()
        .oneshot(
            request("GET", &format!("/api/reports/{report_id}"))
                .as_staff("mallory", "Moderator")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let report = json_of(response).await;
    assert_eq!(report["actionTaken"], "Banned");
    assert_eq!(report["respondingModerator"], "mallory");

    // The account and its content really changed.
    let alice = fixture.store.get_user(fixture.alice.id).await.unwrap().unwrap();
    assert_eq!(alice.status, AccountStatus::Banned);

    // Public feed no longer surfaces the banned author.
    let response = app
        .clone()
        .oneshot(request("GET", "/api/posts/recent").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(json_of(response).await.as_array().unwrap().len(), 0);

    // A second dispatch conflicts.
    let response = app
        .oneshot(
            request("POST", "/api/moderation/content")
                .as_staff("mallory", "Moderator")
                .header("content-type", "application/json")
                .body(json_body(serde_json::json!({
                    "reportId": report_id,
                    "action": "delete",
                })))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn account_deletion_requires_admin() {
    let fixture = seeded().await;
    let app = app_for(&fixture);
    let uri = format!("/api/moderation/users/{}", fixture.bob.id);
    let body = serde_json::json!({ "deleteAccount": true });

    let response = app
        .clone()
        .oneshot(
            request("POST", &uri)
                .as_staff("mallory", "Moderator")
                .header("content-type", "application/json")
                .body(json_body(body.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(fixture.store.get_user(fixture.bob.id).await.unwrap().is_some());

    let response = app
        .oneshot(
            request("POST", &uri)
                .as_staff("root", "Admin")
                .header("content-type", "application/json")
                .body(json_body(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(fixture.store.get_user(fixture.bob.id).await.unwrap().is_none());
}

#[tokio::test]
async fn user_listing_redacts_private_profiles_for_non_admins() {
    let fixture = seeded().await;
    let app = app_for(&fixture);

    let mut carol = account("carol", domains::AccountType::Commenter);
    carol.public = false;
    let mut session = fixture.store.begin().await.unwrap();
    session.put_user(&carol).await.unwrap();
    session.commit().await.unwrap();

    let uri = "/api/moderation/users?username=carol";
    let response = app
        .clone()
        .oneshot(
            request("GET", uri)
                .as_staff("mallory", "Moderator")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let listed = json_of(response).await;
    let entry = &listed.as_array().unwrap()[0];
    assert_eq!(entry["username"], "carol");
    assert!(entry.get("email").is_none());
    assert!(entry.get("firstName").is_none());

    let response = app
        .oneshot(
            request("GET", uri)
                .as_staff("root", "Admin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let listed = json_of(response).await;
    let entry = &listed.as_array().unwrap()[0];
    assert_eq!(entry["email"], "carol@example.com");
}

#[tokio::test]
async fn orphaned_comments_stay_listable_after_a_post_delete() {
    let fixture = seeded().await;
    let app = app_for(&fixture);

    // Report and delete the post itself.
    let response = app
        .clone()
        .oneshot(
            request("POST", "/api/reports")
                .as_user(&fixture.bob)
                .header("content-type", "application/json")
                .body(json_body(serde_json::json!({
                    "contentType": "BlogPost",
                    "contentId": fixture.post.id,
                    "reportedUser": "alice",
                    "reason": "abusive",
                })))
                .unwrap(),
        )
        .await
        .unwrap();
    let report_id = json_of(response).await["reportId"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(
            request("POST", "/api/moderation/content")
                .as_staff("mallory", "Moderator")
                .header("content-type", "application/json")
                .body(json_body(serde_json::json!({
                    "reportId": report_id,
                    "action": "delete",
                })))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Navigating to the post 404s...
    let response = app
        .clone()
        .oneshot(
            request("GET", &format!("/api/posts/{}", fixture.post.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // ...but its comments are still served.
    let response = app
        .oneshot(
            request("GET", &format!("/api/posts/{}/comments", fixture.post.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_of(response).await.as_array().unwrap().len(), 2);
}
