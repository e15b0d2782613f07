//! # Blog Privacy Propagation
//!
//! `Blog.private` is the second denormalized field: each post carries a
//! `blog.private` copy so post listings can skip private blogs without a
//! lookup. The blog-edit path is the only writer of those copies, and it
//! rewrites flag and copies in one transaction, same discipline as the
//! status propagator.

use std::sync::Arc;

use domains::{ContentStore, Error, Result, StoreSession};
use uuid::Uuid;

#[derive(Clone)]
pub struct BlogService {
    store: Arc<dyn ContentStore>,
}

impl BlogService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Sets a blog's private flag and rewrites the copy on every post of
    /// that blog. A no-op when the flag already has the requested value.
    pub async fn set_blog_privacy(&self, blog_id: Uuid, private: bool) -> Result<()> {
        let mut session = self.store.begin().await?;
        let mut blog = session
            .blog_by_id(blog_id)
            .await?
            .ok_or_else(|| Error::not_found("blog", blog_id))?;

        if blog.private == private {
            return Ok(());
        }

        blog.private = private;
        session.put_blog(&blog).await?;

        let posts = session.posts_by_blog(blog_id).await?;
        let post_count = posts.len();
        for mut post in posts {
            post.blog.private = private;
            session.put_post(&post).await?;
        }
        session.commit().await?;

        tracing::info!(
            blog = %blog.name,
            private,
            posts = post_count,
            "blog privacy propagated"
        );
        Ok(())
    }
}
