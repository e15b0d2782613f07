//! # Handlers
//!
//! Thin translation between HTTP and the services: extract the principal,
//! deserialize the body or query, call the use case, map the result. No
//! business rules live here.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use domains::{
    AccountChanges, AccountStatus, AccountType, ContentStore, ContentType, Error,
    ModerationAction, Principal, ReportQuery, User, UserQuery,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use services::{BlogService, ModerationService, NewReport, ReportService};
use uuid::Uuid;

use crate::error::ApiError;
use crate::principal::{Authenticated, Staff};

/// How many posts the public landing feed returns.
const RECENT_POSTS_LIMIT: u32 = 10;

/// State shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub reports: ReportService,
    pub moderation: ModerationService,
    pub blogs: BlogService,
}

impl AppState {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            reports: ReportService::new(Arc::clone(&store)),
            moderation: ModerationService::new(Arc::clone(&store)),
            blogs: BlogService::new(Arc::clone(&store)),
            store,
        }
    }
}

pub async fn file_report(
    State(state): State<AppState>,
    Authenticated(principal): Authenticated,
    Json(mut new_report): Json<NewReport>,
) -> Result<impl IntoResponse, ApiError> {
    // The reporter is whoever authenticated, never a body field.
    new_report.reporting_user = principal.id;
    let report_id = state.reports.file_report(new_report).await?;
    Ok((StatusCode::CREATED, Json(json!({ "reportId": report_id }))))
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportListParams {
    #[serde(default)]
    pub page: u32,
    pub settled: Option<bool>,
    pub content_type: Option<ContentType>,
    pub reported_user: Option<String>,
    pub reporting_user: Option<Uuid>,
    pub responding_moderator: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub action_after: Option<DateTime<Utc>>,
    pub action_before: Option<DateTime<Utc>>,
}

impl From<&ReportListParams> for ReportQuery {
    fn from(params: &ReportListParams) -> Self {
        ReportQuery {
            settled: params.settled,
            content_type: params.content_type,
            reported_user: params.reported_user.clone(),
            reporting_user: params.reporting_user,
            responding_moderator: params.responding_moderator.clone(),
            created_after: params.created_after,
            created_before: params.created_before,
            action_after: params.action_after,
            action_before: params.action_before,
        }
    }
}

pub async fn list_reports(
    State(state): State<AppState>,
    Staff(_): Staff,
    Query(params): Query<ReportListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let reports = state
        .reports
        .list_reports(&ReportQuery::from(&params), params.page)
        .await?;
    Ok(Json(reports))
}

pub async fn get_report(
    State(state): State<AppState>,
    Staff(_): Staff,
    Path(report_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.reports.get_report(report_id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerateContentBody {
    pub report_id: Uuid,
    pub action: ModerationAction,
}

pub async fn moderate_content(
    State(state): State<AppState>,
    Staff(moderator): Staff,
    Json(body): Json<ModerateContentBody>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .moderation
        .moderate_content(body.report_id, body.action, &moderator)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn moderate_user(
    State(state): State<AppState>,
    Staff(moderator): Staff,
    Path(user_id): Path<Uuid>,
    Json(changes): Json<AccountChanges>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .moderation
        .moderate_user(user_id, &changes, &moderator)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reported_content(
    State(state): State<AppState>,
    Staff(_): Staff,
    Path((content_type, content_id)): Path<(ContentType, Uuid)>,
) -> Result<impl IntoResponse, ApiError> {
    let content = state
        .store
        .get_content(content_type, content_id)
        .await?
        .ok_or_else(|| Error::not_found("content", content_id))?;
    Ok(Json(content))
}

#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    #[serde(default)]
    pub page: u32,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub status: Option<AccountStatus>,
    pub account_type: Option<AccountType>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl From<&UserListParams> for UserQuery {
    fn from(params: &UserListParams) -> Self {
        UserQuery {
            username: params.username.clone(),
            first_name: params.first_name.clone(),
            last_name: params.last_name.clone(),
            email: params.email.clone(),
            status: params.status,
            account_type: params.account_type,
            created_after: params.created_after,
            created_before: params.created_before,
        }
    }
}

/// A user as shown to moderation staff. Private profile fields are blanked
/// unless the profile is public or the viewer is an admin.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub status: AccountStatus,
    pub account_type: AccountType,
    pub public: bool,
    pub account_created: DateTime<Utc>,
}

impl UserView {
    fn for_viewer(user: User, viewer: &Principal) -> Self {
        let visible = user.public || viewer.is_admin();
        Self {
            id: user.id,
            username: user.username,
            first_name: visible.then_some(user.first_name),
            last_name: visible.then_some(user.last_name),
            email: visible.then_some(user.email),
            status: user.status,
            account_type: user.account_type,
            public: user.public,
            account_created: user.account_created,
        }
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    Staff(viewer): Staff,
    Query(params): Query<UserListParams>,
) -> Result<impl IntoResponse, ApiError> {
    let users = state
        .store
        .list_users(&UserQuery::from(&params), params.page)
        .await?;
    let views: Vec<UserView> = users
        .into_iter()
        .map(|user| UserView::for_viewer(user, &viewer))
        .collect();
    Ok(Json(views))
}

#[derive(Debug, Deserialize)]
pub struct BlogPrivacyBody {
    pub private: bool,
}

pub async fn set_blog_privacy(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    Path(blog_id): Path<Uuid>,
    Json(body): Json<BlogPrivacyBody>,
) -> Result<impl IntoResponse, ApiError> {
    state.blogs.set_blog_privacy(blog_id, body.private).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn recent_posts(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.recent_posts(RECENT_POSTS_LIMIT).await?))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .store
        .visible_post(post_id)
        .await?
        .ok_or_else(|| Error::not_found("blog post", post_id))?;
    Ok(Json(post))
}

/// Comments are listed even when the parent post is gone: a moderation
/// delete orphans them rather than cascading.
pub async fn post_comments(
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.store.comments_for_post(post_id).await?))
}
