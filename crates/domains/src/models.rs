//! # Domain Models
//!
//! The five persisted collections of Quillpress (users, blogs, blog posts,
//! comments, reports) plus the request/query types that travel between
//! the API surface and the services. UUID v7 is used for time-ordered,
//! globally unique identification.
//!
//! Blogs, posts, and comments carry *denormalized* copies of fields whose
//! source of truth lives elsewhere (`User.status`, `Blog.private`). The
//! copies let every read path decide visibility without a join; the status
//! propagator and the blog-privacy path are their only legitimate writers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed page size for moderation-console listings.
pub const PAGE_SIZE: usize = 20;

/// Account standing. The `User` record is the source of truth; all other
/// occurrences are copies maintained by the status propagator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountStatus {
    Good,
    Restricted,
    Banned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountType {
    Admin,
    Moderator,
    Commenter,
    Blogger,
}

/// The unit a report targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Comment,
    BlogPost,
}

/// Denormalized link to a user: the reference plus a copy of their status
/// at last sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub doc: Uuid,
    pub status: AccountStatus,
}

/// Denormalized link to a blog: the reference plus a copy of its private
/// flag, so post listings can skip private blogs without loading them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlogRef {
    pub doc: Uuid,
    pub private: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub status: AccountStatus,
    pub account_type: AccountType,
    /// Whether the profile's personal fields may be shown to non-admins.
    pub public: bool,
    pub account_created: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blog {
    pub id: Uuid,
    pub owner: UserRef,
    /// URL-name of the blog (e.g. "cooking-with-rust").
    pub name: String,
    pub title: String,
    pub description: String,
    pub created: DateTime<Utc>,
    pub private: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub id: Uuid,
    pub blog: BlogRef,
    pub author: UserRef,
    pub title: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub private: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Uuid,
    pub blog_post: Uuid,
    pub author: UserRef,
    pub created: DateTime<Utc>,
    pub content: String,
}

/// A piece of reported content, as stored. Serialized with an explicit
/// `contentType` tag for the moderation console.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "contentType", content = "content")]
pub enum Content {
    Comment(Comment),
    BlogPost(BlogPost),
}

/// What a moderator did about a report. The wire strings match the values
/// recorded in report documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionTaken {
    Banned,
    Restricted,
    #[serde(rename = "Delete Content")]
    DeleteContent,
}

/// The terminal state of a report. All three fields are bound together in
/// one value, so a half-settled report cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub action_taken: ActionTaken,
    pub date_of_action: DateTime<Utc>,
    pub responding_moderator: String,
}

/// An accusation filed against a comment or blog post.
///
/// `reporting_user` is the id of the account that filed; `reported_user` is
/// the accused account's username, a stable external reference that the
/// dispatcher resolves at action time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub content_type: ContentType,
    pub content_id: Uuid,
    pub reporting_user: Uuid,
    pub reported_user: String,
    pub reason: String,
    pub report_created: DateTime<Utc>,
    /// `None` while the report is open.
    #[serde(flatten)]
    pub resolution: Option<Resolution>,
}

impl Report {
    pub fn is_settled(&self) -> bool {
        self.resolution.is_some()
    }
}

/// A moderator's requested action against a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationAction {
    Ban,
    Restrict,
    Delete,
}

/// Changes requested through the account-moderation console. At most one
/// clause is applied per call; see `ModerationService::moderate_user`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountChanges {
    pub account_status: Option<AccountStatus>,
    pub account_type: Option<AccountType>,
    #[serde(default)]
    pub delete_account: bool,
}

/// The acting principal, as resolved by the upstream authentication
/// gateway. The core trusts these fields without re-verifying credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub account_type: AccountType,
    pub status: AccountStatus,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.account_type == AccountType::Admin
    }

    /// Admins and moderators may act on reports and accounts.
    pub fn is_staff(&self) -> bool {
        matches!(
            self.account_type,
            AccountType::Admin | AccountType::Moderator
        )
    }
}

/// Conjunctive filters for the report listing. `None` matches everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
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

impl ReportQuery {
    /// In-memory form of the filter; the SQL adapter renders the same
    /// conditions as WHERE clauses.
    pub fn matches(&self, report: &Report) -> bool {
        if let Some(settled) = self.settled {
            if report.is_settled() != settled {
                return false;
            }
        }
        if let Some(content_type) = self.content_type {
            if report.content_type != content_type {
                return false;
            }
        }
        if let Some(reported) = &self.reported_user {
            if &report.reported_user != reported {
                return false;
            }
        }
        if let Some(reporting) = self.reporting_user {
            if report.reporting_user != reporting {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if report.report_created < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if report.report_created > before {
                return false;
            }
        }
        // Resolution-scoped filters never match an open report.
        if self.responding_moderator.is_some()
            || self.action_after.is_some()
            || self.action_before.is_some()
        {
            let Some(resolution) = &report.resolution else {
                return false;
            };
            if let Some(moderator) = &self.responding_moderator {
                if &resolution.responding_moderator != moderator {
                    return false;
                }
            }
            if let Some(after) = self.action_after {
                if resolution.date_of_action < after {
                    return false;
                }
            }
            if let Some(before) = self.action_before {
                if resolution.date_of_action > before {
                    return false;
                }
            }
        }
        true
    }
}

/// Conjunctive filters for the moderation console's user listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub status: Option<AccountStatus>,
    pub account_type: Option<AccountType>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

impl UserQuery {
    pub fn matches(&self, user: &User) -> bool {
        if let Some(username) = &self.username {
            if &user.username != username {
                return false;
            }
        }
        if let Some(first) = &self.first_name {
            if &user.first_name != first {
                return false;
            }
        }
        if let Some(last) = &self.last_name {
            if &user.last_name != last {
                return false;
            }
        }
        if let Some(email) = &self.email {
            if &user.email != email {
                return false;
            }
        }
        if let Some(status) = self.status {
            if user.status != status {
                return false;
            }
        }
        if let Some(account_type) = self.account_type {
            if user.account_type != account_type {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if user.account_created < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if user.account_created > before {
                return false;
            }
        }
        true
    }
}
