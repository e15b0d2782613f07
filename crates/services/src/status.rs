//! # Status Propagator
//!
//! `User.status` is copy-denormalized onto every blog, post, and comment
//! the user owns, so read paths can decide visibility without joins. This
//! module is the single consistency boundary for that field: any write
//! path that changes an account's status goes through here, and every copy
//! is rewritten inside the same store transaction as the source of truth.
//!
//! Without the shared transaction, a crash mid-update could leave some
//! posts still visible while the author is already banned. That is a
//! visibility hole, not a cosmetic bug.

use domains::{AccountStatus, ContentStore, Error, Result, StoreSession, User};
use uuid::Uuid;

/// Documents rewritten by one propagation, per collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PropagationCounts {
    pub blogs: usize,
    pub posts: usize,
    pub comments: usize,
}

pub struct StatusPropagator;

impl StatusPropagator {
    /// Rewrites the user record and every denormalized status copy inside
    /// an already-open session, without committing. The caller owns the
    /// transaction boundary, which is what lets the moderation dispatcher
    /// settle a report in the same commit as the propagation.
    pub async fn apply(
        session: &mut dyn StoreSession,
        user: &mut User,
        new_status: AccountStatus,
    ) -> Result<PropagationCounts> {
        let blogs = session.blogs_by_owner(user.id).await?;
        let posts = session.posts_by_author(user.id).await?;
        let comments = session.comments_by_author(user.id).await?;

        let counts = PropagationCounts {
            blogs: blogs.len(),
            posts: posts.len(),
            comments: comments.len(),
        };

        for mut blog in blogs {
            blog.owner.status = new_status;
            session.put_blog(&blog).await?;
        }
        for mut post in posts {
            post.author.status = new_status;
            session.put_post(&post).await?;
        }
        for mut comment in comments {
            comment.author.status = new_status;
            session.put_comment(&comment).await?;
        }

        user.status = new_status;
        session.put_user(user).await?;

        Ok(counts)
    }

    /// Standalone propagation: one transaction around the whole rewrite.
    ///
    /// Fails with `NotFound` if the user does not exist and `Transaction`
    /// if the commit aborts; in either case no write is observable.
    pub async fn propagate(
        store: &dyn ContentStore,
        user_id: Uuid,
        new_status: AccountStatus,
    ) -> Result<PropagationCounts> {
        let mut session = store.begin().await?;
        let mut user = session
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| Error::not_found("user", user_id))?;
        let counts = Self::apply(session.as_mut(), &mut user, new_status).await?;
        session.commit().await?;

        tracing::info!(
            user = %user.username,
            status = ?new_status,
            blogs = counts.blogs,
            posts = counts.posts,
            comments = counts.comments,
            "account status propagated"
        );
        Ok(counts)
    }
}
