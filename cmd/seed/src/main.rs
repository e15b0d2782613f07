//! # Seed
//!
//! Populates a development database with a handful of accounts, a blog
//! with posts and comments, and one open report, so the moderation
//! console has something to act on.

use anyhow::Context;
use chrono::Utc;
use configs::AppConfig;
use domains::{
    AccountStatus, AccountType, Blog, BlogPost, BlogRef, Comment, ContentStore, ContentType,
    Report, StoreSession, User, UserRef,
};
use secrecy::ExposeSecret;
use storage_adapters::PgContentStore;
use uuid::Uuid;

fn account(username: &str, account_type: AccountType) -> User {
    User {
        id: Uuid::now_v7(),
        username: username.into(),
        first_name: username.into(),
        last_name: "Example".into(),
        email: format!("{username}@example.com"),
        status: AccountStatus::Good,
        account_type,
        public: true,
        account_created: Utc::now(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().init();

    let config = AppConfig::load().context("loading configuration")?;
    let store = PgContentStore::connect(
        config.database.url.expose_secret(),
        config.database.max_connections,
    )
    .await
    .context("connecting to postgres")?;
    store.init_schema().await.context("initializing schema")?;

    let admin = account("admin", AccountType::Admin);
    let moderator = account("mallory", AccountType::Moderator);
    let blogger = account("alice", AccountType::Blogger);
    let commenter = account("bob", AccountType::Commenter);

    let blog = Blog {
        id: Uuid::now_v7(),
        owner: UserRef {
            doc: blogger.id,
            status: blogger.status,
        },
        name: "alices-notebook".into(),
        title: "Alice's Notebook".into(),
        description: "Occasional notes on everything.".into(),
        created: Utc::now(),
        private: false,
    };

    let post = BlogPost {
        id: Uuid::now_v7(),
        blog: BlogRef {
            doc: blog.id,
            private: blog.private,
        },
        author: UserRef {
            doc: blogger.id,
            status: blogger.status,
        },
        title: "First post".into(),
        content: "Hello from the seed data.".into(),
        created: Utc::now(),
        private: false,
    };

    let comment = Comment {
        id: Uuid::now_v7(),
        blog_post: post.id,
        author: UserRef {
            doc: commenter.id,
            status: commenter.status,
        },
        created: Utc::now(),
        content: "Nice first post.".into(),
    };

    let report = Report {
        id: Uuid::now_v7(),
        content_type: ContentType::Comment,
        content_id: comment.id,
        reporting_user: blogger.id,
        reported_user: commenter.username.clone(),
        reason: "Testing the moderation queue.".into(),
        report_created: Utc::now(),
        resolution: None,
    };

    let mut session = store.begin().await?;
    for user in [&admin, &moderator, &blogger, &commenter] {
        session.put_user(user).await?;
    }
    session.put_blog(&blog).await?;
    session.put_post(&post).await?;
    session.put_comment(&comment).await?;
    session.put_report(&report).await?;
    session.commit().await?;

    tracing::info!(
        users = 4,
        report = %report.id,
        "seeded development data"
    );
    Ok(())
}
