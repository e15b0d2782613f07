//! # Postgres Content Store
//!
//! The production adapter: each collection is one table of JSONB documents
//! keyed by UUID, and a `StoreSession` is an SQL transaction at REPEATABLE
//! READ. Serialization failures surface as the retryable transaction
//! error, everything else as a store error.
//!
//! Queries address denormalized fields through JSON paths
//! (`doc #>> '{owner,doc}'` and friends), so the document shape on disk is
//! exactly the serde shape of the domain models.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, QueryBuilder, Row, Transaction};
use uuid::Uuid;

use domains::{
    Blog, BlogPost, Comment, Content, ContentStore, ContentType, Error, Report,
    ReportQuery, Result, StoreSession, User, UserQuery, PAGE_SIZE,
};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (id UUID PRIMARY KEY, doc JSONB NOT NULL)",
    "CREATE TABLE IF NOT EXISTS blogs (id UUID PRIMARY KEY, doc JSONB NOT NULL)",
    "CREATE TABLE IF NOT EXISTS blog_posts (id UUID PRIMARY KEY, doc JSONB NOT NULL)",
    "CREATE TABLE IF NOT EXISTS comments (id UUID PRIMARY KEY, doc JSONB NOT NULL)",
    "CREATE TABLE IF NOT EXISTS reports (id UUID PRIMARY KEY, doc JSONB NOT NULL)",
    "CREATE INDEX IF NOT EXISTS users_username ON users ((doc ->> 'username'))",
    "CREATE INDEX IF NOT EXISTS blogs_owner ON blogs ((doc #>> '{owner,doc}'))",
    "CREATE INDEX IF NOT EXISTS blog_posts_author ON blog_posts ((doc #>> '{author,doc}'))",
    "CREATE INDEX IF NOT EXISTS blog_posts_blog ON blog_posts ((doc #>> '{blog,doc}'))",
    "CREATE INDEX IF NOT EXISTS comments_author ON comments ((doc #>> '{author,doc}'))",
    "CREATE INDEX IF NOT EXISTS comments_post ON comments ((doc ->> 'blogPost'))",
    "CREATE INDEX IF NOT EXISTS reports_content_reporter ON reports ((doc ->> 'contentId'), (doc ->> 'reportingUser'))",
];

fn store_err(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db) = &err {
        // 40001 serialization_failure, 40P01 deadlock_detected
        if matches!(db.code().as_deref(), Some("40001") | Some("40P01")) {
            return Error::Transaction(db.to_string());
        }
    }
    Error::Store(err.to_string())
}

fn decode<T: DeserializeOwned>(row: &PgRow) -> Result<T> {
    let doc: serde_json::Value = row.try_get("doc").map_err(store_err)?;
    serde_json::from_value(doc).map_err(|e| Error::Store(format!("corrupt document: {e}")))
}

fn decode_all<T: DeserializeOwned>(rows: Vec<PgRow>) -> Result<Vec<T>> {
    rows.iter().map(decode).collect()
}

fn encode<T: Serialize>(doc: &T) -> Result<serde_json::Value> {
    serde_json::to_value(doc).map_err(|e| Error::Store(e.to_string()))
}

fn content_table(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Comment => "comments",
        ContentType::BlogPost => "blog_posts",
    }
}

#[derive(Clone)]
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(store_err)?;
        Ok(Self { pool })
    }

    pub fn with_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the five collection tables and their JSON-path indexes.
    pub async fn init_schema(&self) -> Result<()> {
        for stmt in SCHEMA {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(store_err)?;
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn begin(&self) -> Result<Box<dyn StoreSession>> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        // Concurrent moderation of overlapping documents must abort with a
        // serialization failure rather than silently interleave.
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        Ok(Box::new(PgSession { tx: Some(tx) }))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query("SELECT doc FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.as_ref().map(decode).transpose()
    }

    async fn list_users(&self, query: &UserQuery, page: u32) -> Result<Vec<User>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT doc FROM users WHERE TRUE");
        if let Some(username) = &query.username {
            qb.push(" AND doc ->> 'username' = ").push_bind(username);
        }
        if let Some(first) = &query.first_name {
            qb.push(" AND doc ->> 'firstName' = ").push_bind(first);
        }
        if let Some(last) = &query.last_name {
            qb.push(" AND doc ->> 'lastName' = ").push_bind(last);
        }
        if let Some(email) = &query.email {
            qb.push(" AND doc ->> 'email' = ").push_bind(email);
        }
        if let Some(status) = query.status {
            qb.push(" AND doc ->> 'status' = ")
                .push_bind(format!("{status:?}"));
        }
        if let Some(account_type) = query.account_type {
            qb.push(" AND doc ->> 'accountType' = ")
                .push_bind(format!("{account_type:?}"));
        }
        if let Some(after) = query.created_after {
            qb.push(" AND (doc ->> 'accountCreated')::timestamptz >= ")
                .push_bind(after);
        }
        if let Some(before) = query.created_before {
            qb.push(" AND (doc ->> 'accountCreated')::timestamptz <= ")
                .push_bind(before);
        }
        qb.push(" ORDER BY (doc ->> 'accountCreated')::timestamptz DESC LIMIT ")
            .push_bind(PAGE_SIZE as i64)
            .push(" OFFSET ")
            .push_bind(page as i64 * PAGE_SIZE as i64);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(store_err)?;
        decode_all(rows)
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<Report>> {
        let row = sqlx::query("SELECT doc FROM reports WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.as_ref().map(decode).transpose()
    }

    async fn list_reports(&self, query: &ReportQuery, page: u32) -> Result<Vec<Report>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT doc FROM reports WHERE TRUE");
        if let Some(settled) = query.settled {
            qb.push(" AND (doc ->> 'actionTaken' IS NOT NULL) = ")
                .push_bind(settled);
        }
        if let Some(content_type) = query.content_type {
            qb.push(" AND doc ->> 'contentType' = ")
                .push_bind(format!("{content_type:?}"));
        }
        if let Some(reported) = &query.reported_user {
            qb.push(" AND doc ->> 'reportedUser' = ").push_bind(reported);
        }
        if let Some(reporting) = query.reporting_user {
            qb.push(" AND doc ->> 'reportingUser' = ")
                .push_bind(reporting.to_string());
        }
        if let Some(moderator) = &query.responding_moderator {
            qb.push(" AND doc ->> 'respondingModerator' = ")
                .push_bind(moderator);
        }
        if let Some(after) = query.created_after {
            qb.push(" AND (doc ->> 'reportCreated')::timestamptz >= ")
                .push_bind(after);
        }
        if let Some(before) = query.created_before {
            qb.push(" AND (doc ->> 'reportCreated')::timestamptz <= ")
                .push_bind(before);
        }
        if let Some(after) = query.action_after {
            qb.push(" AND (doc ->> 'dateOfAction')::timestamptz >= ")
                .push_bind(after);
        }
        if let Some(before) = query.action_before {
            qb.push(" AND (doc ->> 'dateOfAction')::timestamptz <= ")
                .push_bind(before);
        }
        qb.push(" ORDER BY (doc ->> 'reportCreated')::timestamptz DESC LIMIT ")
            .push_bind(PAGE_SIZE as i64)
            .push(" OFFSET ")
            .push_bind(page as i64 * PAGE_SIZE as i64);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(store_err)?;
        decode_all(rows)
    }

    async fn report_for(&self, content_id: Uuid, reporting_user: Uuid) -> Result<Option<Report>> {
        let row = sqlx::query(
            "SELECT doc FROM reports \
             WHERE doc ->> 'contentId' = $1 AND doc ->> 'reportingUser' = $2 \
             LIMIT 1",
        )
        .bind(content_id.to_string())
        .bind(reporting_user.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.as_ref().map(decode).transpose()
    }

    async fn insert_report(&self, report: &Report) -> Result<()> {
        sqlx::query("INSERT INTO reports (id, doc) VALUES ($1, $2)")
            .bind(report.id)
            .bind(encode(report)?)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn get_content(&self, content_type: ContentType, id: Uuid) -> Result<Option<Content>> {
        let sql = format!(
            "SELECT doc FROM {} WHERE id = $1",
            content_table(content_type)
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        let Some(row) = row else { return Ok(None) };
        Ok(Some(match content_type {
            ContentType::Comment => Content::Comment(decode(&row)?),
            ContentType::BlogPost => Content::BlogPost(decode(&row)?),
        }))
    }

    async fn recent_posts(&self, limit: u32) -> Result<Vec<BlogPost>> {
        let rows = sqlx::query(
            "SELECT doc FROM blog_posts \
             WHERE (doc ->> 'private')::boolean = FALSE \
               AND (doc #>> '{blog,private}')::boolean = FALSE \
               AND doc #>> '{author,status}' <> 'Banned' \
             ORDER BY (doc ->> 'created')::timestamptz DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        decode_all(rows)
    }

    async fn visible_post(&self, id: Uuid) -> Result<Option<BlogPost>> {
        let row = sqlx::query(
            "SELECT doc FROM blog_posts \
             WHERE id = $1 \
               AND (doc ->> 'private')::boolean = FALSE \
               AND (doc #>> '{blog,private}')::boolean = FALSE \
               AND doc #>> '{author,status}' <> 'Banned'",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;
        row.as_ref().map(decode).transpose()
    }

    async fn comments_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let rows = sqlx::query(
            "SELECT doc FROM comments \
             WHERE doc ->> 'blogPost' = $1 \
               AND doc #>> '{author,status}' <> 'Banned' \
             ORDER BY (doc ->> 'created')::timestamptz ASC",
        )
        .bind(post_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        decode_all(rows)
    }
}

struct PgSession {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgSession {
    fn tx(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| Error::Store("session already committed".into()))
    }

    async fn fetch_doc<T: DeserializeOwned>(&mut self, sql: &str, id: Uuid) -> Result<Option<T>> {
        let tx = self.tx()?;
        let row = sqlx::query(sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(store_err)?;
        row.as_ref().map(decode).transpose()
    }

    async fn fetch_docs_by_ref<T: DeserializeOwned>(
        &mut self,
        sql: &str,
        reference: Uuid,
    ) -> Result<Vec<T>> {
        let tx = self.tx()?;
        let rows = sqlx::query(sql)
            .bind(reference.to_string())
            .fetch_all(&mut **tx)
            .await
            .map_err(store_err)?;
        decode_all(rows)
    }

    async fn upsert_doc<T: Serialize>(&mut self, sql: &str, id: Uuid, doc: &T) -> Result<()> {
        let doc = encode(doc)?;
        let tx = self.tx()?;
        sqlx::query(sql)
            .bind(id)
            .bind(doc)
            .execute(&mut **tx)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn delete_by_id(&mut self, sql: &str, id: Uuid) -> Result<()> {
        let tx = self.tx()?;
        sqlx::query(sql)
            .bind(id)
            .execute(&mut **tx)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    async fn delete_by_ref(&mut self, sql: &str, reference: Uuid) -> Result<u64> {
        let tx = self.tx()?;
        let result = sqlx::query(sql)
            .bind(reference.to_string())
            .execute(&mut **tx)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl StoreSession for PgSession {
    async fn user_by_id(&mut self, id: Uuid) -> Result<Option<User>> {
        self.fetch_doc("SELECT doc FROM users WHERE id = $1", id).await
    }

    async fn user_by_username(&mut self, username: &str) -> Result<Option<User>> {
        let tx = self.tx()?;
        let row = sqlx::query("SELECT doc FROM users WHERE doc ->> 'username' = $1 LIMIT 1")
            .bind(username)
            .fetch_optional(&mut **tx)
            .await
            .map_err(store_err)?;
        row.as_ref().map(decode).transpose()
    }

    async fn put_user(&mut self, user: &User) -> Result<()> {
        self.upsert_doc(
            "INSERT INTO users (id, doc) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc",
            user.id,
            user,
        )
        .await
    }

    async fn delete_user(&mut self, id: Uuid) -> Result<()> {
        self.delete_by_id("DELETE FROM users WHERE id = $1", id).await
    }

    async fn blog_by_id(&mut self, id: Uuid) -> Result<Option<Blog>> {
        self.fetch_doc("SELECT doc FROM blogs WHERE id = $1", id).await
    }

    async fn blogs_by_owner(&mut self, owner: Uuid) -> Result<Vec<Blog>> {
        self.fetch_docs_by_ref(
            "SELECT doc FROM blogs WHERE doc #>> '{owner,doc}' = $1",
            owner,
        )
        .await
    }

    async fn put_blog(&mut self, blog: &Blog) -> Result<()> {
        self.upsert_doc(
            "INSERT INTO blogs (id, doc) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc",
            blog.id,
            blog,
        )
        .await
    }

    async fn delete_blogs_by_owner(&mut self, owner: Uuid) -> Result<u64> {
        self.delete_by_ref("DELETE FROM blogs WHERE doc #>> '{owner,doc}' = $1", owner)
            .await
    }

    async fn post_by_id(&mut self, id: Uuid) -> Result<Option<BlogPost>> {
        self.fetch_doc("SELECT doc FROM blog_posts WHERE id = $1", id).await
    }

    async fn posts_by_author(&mut self, author: Uuid) -> Result<Vec<BlogPost>> {
        self.fetch_docs_by_ref(
            "SELECT doc FROM blog_posts WHERE doc #>> '{author,doc}' = $1",
            author,
        )
        .await
    }

    async fn posts_by_blog(&mut self, blog: Uuid) -> Result<Vec<BlogPost>> {
        self.fetch_docs_by_ref(
            "SELECT doc FROM blog_posts WHERE doc #>> '{blog,doc}' = $1",
            blog,
        )
        .await
    }

    async fn put_post(&mut self, post: &BlogPost) -> Result<()> {
        self.upsert_doc(
            "INSERT INTO blog_posts (id, doc) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc",
            post.id,
            post,
        )
        .await
    }

    async fn delete_post(&mut self, id: Uuid) -> Result<()> {
        self.delete_by_id("DELETE FROM blog_posts WHERE id = $1", id).await
    }

    async fn delete_posts_by_author(&mut self, author: Uuid) -> Result<u64> {
        self.delete_by_ref(
            "DELETE FROM blog_posts WHERE doc #>> '{author,doc}' = $1",
            author,
        )
        .await
    }

    async fn comment_by_id(&mut self, id: Uuid) -> Result<Option<Comment>> {
        self.fetch_doc("SELECT doc FROM comments WHERE id = $1", id).await
    }

    async fn comments_by_author(&mut self, author: Uuid) -> Result<Vec<Comment>> {
        self.fetch_docs_by_ref(
            "SELECT doc FROM comments WHERE doc #>> '{author,doc}' = $1",
            author,
        )
        .await
    }

    async fn put_comment(&mut self, comment: &Comment) -> Result<()> {
        self.upsert_doc(
            "INSERT INTO comments (id, doc) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc",
            comment.id,
            comment,
        )
        .await
    }

    async fn delete_comment(&mut self, id: Uuid) -> Result<()> {
        self.delete_by_id("DELETE FROM comments WHERE id = $1", id).await
    }

    async fn delete_comments_by_author(&mut self, author: Uuid) -> Result<u64> {
        self.delete_by_ref(
            "DELETE FROM comments WHERE doc #>> '{author,doc}' = $1",
            author,
        )
        .await
    }

    async fn report_by_id(&mut self, id: Uuid) -> Result<Option<Report>> {
        self.fetch_doc("SELECT doc FROM reports WHERE id = $1", id).await
    }

    async fn put_report(&mut self, report: &Report) -> Result<()> {
        self.upsert_doc(
            "INSERT INTO reports (id, doc) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc",
            report.id,
            report,
        )
        .await
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| Error::Store("session already committed".into()))?;
        tx.commit().await.map_err(store_err)
    }
}
