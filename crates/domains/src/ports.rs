//! # Content Store Ports
//!
//! The persistence contract the services depend on. A `ContentStore` hands
//! out `StoreSession`s; every causally-related group of reads and writes
//! (status propagation across four collections, report settlement) happens
//! inside one session and becomes visible to other sessions atomically at
//! commit, or not at all.
//!
//! Reads that need no transactional grouping (single-document fetches and
//! listings) live directly on `ContentStore`.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Blog, BlogPost, Comment, Content, ContentType, Report, ReportQuery, User,
    UserQuery,
};

/// A handle to the five collections.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Opens a session whose writes are staged until `commit`.
    async fn begin(&self) -> Result<Box<dyn StoreSession>>;

    // User reads
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn list_users(&self, query: &UserQuery, page: u32) -> Result<Vec<User>>;

    // Report reads, plus the one sessionless write: filing
    async fn get_report(&self, id: Uuid) -> Result<Option<Report>>;
    async fn list_reports(&self, query: &ReportQuery, page: u32) -> Result<Vec<Report>>;
    /// Any prior report by `reporting_user` against `content_id`, settled
    /// or not. Backs the duplicate-filing check.
    async fn report_for(&self, content_id: Uuid, reporting_user: Uuid) -> Result<Option<Report>>;
    async fn insert_report(&self, report: &Report) -> Result<()>;

    /// Reported content as stored, without visibility filtering; the
    /// moderation console must see what was reported even when hidden.
    async fn get_content(&self, content_type: ContentType, id: Uuid) -> Result<Option<Content>>;

    // Public read paths. These filter on the denormalized copies: a post
    // is surfaced only if neither it nor its blog is private and its
    // author's status copy is not Banned.
    async fn recent_posts(&self, limit: u32) -> Result<Vec<BlogPost>>;
    async fn visible_post(&self, id: Uuid) -> Result<Option<BlogPost>>;
    /// Comments on a post, hiding banned authors. Does not check that the
    /// post still exists: comments orphaned by a moderation delete remain
    /// listable by id.
    async fn comments_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>>;
}

/// One session-scoped transaction over the five collections.
///
/// Writes (`put_*`, `delete_*`) are staged and become observable only after
/// `commit` succeeds. Dropping a session without committing discards every
/// staged write. After `commit` returns the session must not be used again.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait StoreSession: Send {
    // User operations
    async fn user_by_id(&mut self, id: Uuid) -> Result<Option<User>>;
    async fn user_by_username(&mut self, username: &str) -> Result<Option<User>>;
    async fn put_user(&mut self, user: &User) -> Result<()>;
    async fn delete_user(&mut self, id: Uuid) -> Result<()>;

    // Blog operations
    async fn blog_by_id(&mut self, id: Uuid) -> Result<Option<Blog>>;
    async fn blogs_by_owner(&mut self, owner: Uuid) -> Result<Vec<Blog>>;
    async fn put_blog(&mut self, blog: &Blog) -> Result<()>;
    async fn delete_blogs_by_owner(&mut self, owner: Uuid) -> Result<u64>;

    // Post operations
    async fn post_by_id(&mut self, id: Uuid) -> Result<Option<BlogPost>>;
    async fn posts_by_author(&mut self, author: Uuid) -> Result<Vec<BlogPost>>;
    async fn posts_by_blog(&mut self, blog: Uuid) -> Result<Vec<BlogPost>>;
    async fn put_post(&mut self, post: &BlogPost) -> Result<()>;
    async fn delete_post(&mut self, id: Uuid) -> Result<()>;
    async fn delete_posts_by_author(&mut self, author: Uuid) -> Result<u64>;

    // Comment operations
    async fn comment_by_id(&mut self, id: Uuid) -> Result<Option<Comment>>;
    async fn comments_by_author(&mut self, author: Uuid) -> Result<Vec<Comment>>;
    async fn put_comment(&mut self, comment: &Comment) -> Result<()>;
    async fn delete_comment(&mut self, id: Uuid) -> Result<()>;
    async fn delete_comments_by_author(&mut self, author: Uuid) -> Result<u64>;

    // Report operations
    async fn report_by_id(&mut self, id: Uuid) -> Result<Option<Report>>;
    async fn put_report(&mut self, report: &Report) -> Result<()>;

    /// Atomically applies every staged write. Fails with
    /// `Error::Transaction` on write conflict; in that case nothing was
    /// applied.
    async fn commit(&mut self) -> Result<()>;
}
