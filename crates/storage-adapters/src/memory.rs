//! # In-Memory Content Store
//!
//! Five collections behind one lock, with snapshot sessions and optimistic
//! commit-time conflict detection. This is the store the test suite runs
//! against and the fallback for local development, so its transaction
//! semantics mirror the production adapter's: staged writes are invisible
//! until commit, commits are all-or-nothing across collections, and a
//! write conflict aborts the whole session with a retryable error.
//!
//! `inject_commit_failures` makes the next N commits fail after staging,
//! which is the hook the rollback tests use to prove nothing leaks out of
//! an aborted transaction.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use domains::{
    AccountStatus, Blog, BlogPost, Comment, Content, ContentStore, ContentType, Error,
    Report, ReportQuery, Result, StoreSession, User, UserQuery, PAGE_SIZE,
};
use uuid::Uuid;

type Rev = u64;

/// One collection: documents keyed by id, each with a revision counter
/// bumped on every committed write.
#[derive(Debug, Clone)]
struct Shelf<T> {
    docs: HashMap<Uuid, (Rev, T)>,
}

impl<T> Default for Shelf<T> {
    fn default() -> Self {
        Shelf {
            docs: HashMap::new(),
        }
    }
}

impl<T: Clone> Shelf<T> {
    fn get(&self, id: &Uuid) -> Option<T> {
        self.docs.get(id).map(|(_, doc)| doc.clone())
    }

    fn rev(&self, id: &Uuid) -> Option<Rev> {
        self.docs.get(id).map(|(rev, _)| *rev)
    }

    fn put(&mut self, id: Uuid, doc: T) {
        let rev = self.rev(&id).unwrap_or(0) + 1;
        self.docs.insert(id, (rev, doc));
    }

    fn scan<'a, F>(&'a self, pred: F) -> impl Iterator<Item = &'a T>
    where
        F: Fn(&T) -> bool + 'a,
    {
        self.docs.values().filter_map(move |(_, doc)| pred(doc).then_some(doc))
    }
}

#[derive(Debug, Clone, Default)]
struct Collections {
    users: Shelf<User>,
    blogs: Shelf<Blog>,
    posts: Shelf<BlogPost>,
    comments: Shelf<Comment>,
    reports: Shelf<Report>,
}

#[derive(Debug, Default)]
struct Touched {
    users: HashSet<Uuid>,
    blogs: HashSet<Uuid>,
    posts: HashSet<Uuid>,
    comments: HashSet<Uuid>,
    reports: HashSet<Uuid>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Collections>>,
    failing_commits: Arc<AtomicU32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` commits fail after staging, as if the store had
    /// aborted the transaction.
    pub fn inject_commit_failures(&self, n: u32) {
        self.failing_commits.fetch_add(n, Ordering::SeqCst);
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Collections>> {
        self.inner
            .lock()
            .map_err(|_| Error::Store("store lock poisoned".into()))
    }
}

fn post_visible(post: &BlogPost) -> bool {
    !post.private && !post.blog.private && post.author.status != AccountStatus::Banned
}

fn page_of<T>(mut items: Vec<T>, page: u32) -> Vec<T> {
    let skip = page as usize * PAGE_SIZE;
    if skip >= items.len() {
        return Vec::new();
    }
    items.drain(..skip);
    items.truncate(PAGE_SIZE);
    items
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreSession>> {
        let snapshot = self.lock()?.clone();
        Ok(Box::new(MemorySession {
            store: Arc::clone(&self.inner),
            failing_commits: Arc::clone(&self.failing_commits),
            origin: snapshot.clone(),
            working: snapshot,
            touched: Touched::default(),
            finished: false,
        }))
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.lock()?.users.get(&id))
    }

    async fn list_users(&self, query: &UserQuery, page: u32) -> Result<Vec<User>> {
        let mut users: Vec<User> = self
            .lock()?
            .users
            .scan(|u| query.matches(u))
            .cloned()
            .collect();
        users.sort_by(|a, b| b.account_created.cmp(&a.account_created));
        Ok(page_of(users, page))
    }

    async fn get_report(&self, id: Uuid) -> Result<Option<Report>> {
        Ok(self.lock()?.reports.get(&id))
    }

    async fn list_reports(&self, query: &ReportQuery, page: u32) -> Result<Vec<Report>> {
        let mut reports: Vec<Report> = self
            .lock()?
            .reports
            .scan(|r| query.matches(r))
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.report_created.cmp(&a.report_created));
        Ok(page_of(reports, page))
    }

    async fn report_for(&self, content_id: Uuid, reporting_user: Uuid) -> Result<Option<Report>> {
        Ok(self
            .lock()?
            .reports
            .scan(|r| r.content_id == content_id && r.reporting_user == reporting_user)
            .next()
            .cloned())
    }

    async fn insert_report(&self, report: &Report) -> Result<()> {
        self.lock()?.reports.put(report.id, report.clone());
        Ok(())
    }

    async fn get_content(&self, content_type: ContentType, id: Uuid) -> Result<Option<Content>> {
        let inner = self.lock()?;
        Ok(match content_type {
            ContentType::Comment => inner.comments.get(&id).map(Content::Comment),
            ContentType::BlogPost => inner.posts.get(&id).map(Content::BlogPost),
        })
    }

    async fn recent_posts(&self, limit: u32) -> Result<Vec<BlogPost>> {
        let mut posts: Vec<BlogPost> = self.lock()?.posts.scan(post_visible).cloned().collect();
        posts.sort_by(|a, b| b.created.cmp(&a.created));
        posts.truncate(limit as usize);
        Ok(posts)
    }

    async fn visible_post(&self, id: Uuid) -> Result<Option<BlogPost>> {
        Ok(self.lock()?.posts.get(&id).filter(post_visible))
    }

    async fn comments_for_post(&self, post_id: Uuid) -> Result<Vec<Comment>> {
        let mut comments: Vec<Comment> = self
            .lock()?
            .comments
            .scan(|c| c.blog_post == post_id && c.author.status != AccountStatus::Banned)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created.cmp(&b.created));
        Ok(comments)
    }
}

/// A snapshot transaction. Reads see the snapshot plus this session's own
/// staged writes; nothing reaches the shared collections until `commit`.
struct MemorySession {
    store: Arc<Mutex<Collections>>,
    failing_commits: Arc<AtomicU32>,
    /// Untouched snapshot, kept for revision comparison at commit.
    origin: Collections,
    /// Snapshot absorbing staged writes.
    working: Collections,
    touched: Touched,
    finished: bool,
}

fn check_conflicts<T>(
    what: &'static str,
    touched: &HashSet<Uuid>,
    origin: &Shelf<T>,
    live: &Shelf<T>,
) -> Result<()>
where
    T: Clone,
{
    for id in touched {
        if live.rev(id) != origin.rev(id) {
            return Err(Error::Transaction(format!("write conflict on {what} {id}")));
        }
    }
    Ok(())
}

fn apply_staged<T: Clone>(touched: &HashSet<Uuid>, working: &Shelf<T>, live: &mut Shelf<T>) {
    for id in touched {
        match working.get(id) {
            Some(doc) => live.put(*id, doc),
            None => {
                live.docs.remove(id);
            }
        }
    }
}

#[async_trait]
impl StoreSession for MemorySession {
    async fn user_by_id(&mut self, id: Uuid) -> Result<Option<User>> {
        Ok(self.working.users.get(&id))
    }

    async fn user_by_username(&mut self, username: &str) -> Result<Option<User>> {
        Ok(self
            .working
            .users
            .scan(|u| u.username == username)
            .next()
            .cloned())
    }

    async fn put_user(&mut self, user: &User) -> Result<()> {
        self.working.users.put(user.id, user.clone());
        self.touched.users.insert(user.id);
        Ok(())
    }

    async fn delete_user(&mut self, id: Uuid) -> Result<()> {
        self.working.users.docs.remove(&id);
        self.touched.users.insert(id);
        Ok(())
    }

    async fn blog_by_id(&mut self, id: Uuid) -> Result<Option<Blog>> {
        Ok(self.working.blogs.get(&id))
    }

    async fn blogs_by_owner(&mut self, owner: Uuid) -> Result<Vec<Blog>> {
        Ok(self
            .working
            .blogs
            .scan(|b| b.owner.doc == owner)
            .cloned()
            .collect())
    }

    async fn put_blog(&mut self, blog: &Blog) -> Result<()> {
        self.working.blogs.put(blog.id, blog.clone());
        self.touched.blogs.insert(blog.id);
        Ok(())
    }

    async fn delete_blogs_by_owner(&mut self, owner: Uuid) -> Result<u64> {
        let ids: Vec<Uuid> = self
            .working
            .blogs
            .scan(|b| b.owner.doc == owner)
            .map(|b| b.id)
            .collect();
        for id in &ids {
            self.working.blogs.docs.remove(id);
            self.touched.blogs.insert(*id);
        }
        Ok(ids.len() as u64)
    }

    async fn post_by_id(&mut self, id: Uuid) -> Result<Option<BlogPost>> {
        Ok(self.working.posts.get(&id))
    }

    async fn posts_by_author(&mut self, author: Uuid) -> Result<Vec<BlogPost>> {
        Ok(self
            .working
            .posts
            .scan(|p| p.author.doc == author)
            .cloned()
            .collect())
    }

    async fn posts_by_blog(&mut self, blog: Uuid) -> Result<Vec<BlogPost>> {
        Ok(self
            .working
            .posts
            .scan(|p| p.blog.doc == blog)
            .cloned()
            .collect())
    }

    async fn put_post(&mut self, post: &BlogPost) -> Result<()> {
        self.working.posts.put(post.id, post.clone());
        self.touched.posts.insert(post.id);
        Ok(())
    }

    async fn delete_post(&mut self, id: Uuid) -> Result<()> {
        self.working.posts.docs.remove(&id);
        self.touched.posts.insert(id);
        Ok(())
    }

    async fn delete_posts_by_author(&mut self, author: Uuid) -> Result<u64> {
        let ids: Vec<Uuid> = self
            .working
            .posts
            .scan(|p| p.author.doc == author)
            .map(|p| p.id)
            .collect();
        for id in &ids {
            self.working.posts.docs.remove(id);
            self.touched.posts.insert(*id);
        }
        Ok(ids.len() as u64)
    }

    async fn comment_by_id(&mut self, id: Uuid) -> Result<Option<Comment>> {
        Ok(self.working.comments.get(&id))
    }

    async fn comments_by_author(&mut self, author: Uuid) -> Result<Vec<Comment>> {
        Ok(self
            .working
            .comments
            .scan(|c| c.author.doc == author)
            .cloned()
            .collect())
    }

    async fn put_comment(&mut self, comment: &Comment) -> Result<()> {
        self.working.comments.put(comment.id, comment.clone());
        self.touched.comments.insert(comment.id);
        Ok(())
    }

    async fn delete_comment(&mut self, id: Uuid) -> Result<()> {
        self.working.comments.docs.remove(&id);
        self.touched.comments.insert(id);
        Ok(())
    }

    async fn delete_comments_by_author(&mut self, author: Uuid) -> Result<u64> {
        let ids: Vec<Uuid> = self
            .working
            .comments
            .scan(|c| c.author.doc == author)
            .map(|c| c.id)
            .collect();
        for id in &ids {
            self.working.comments.docs.remove(id);
            self.touched.comments.insert(*id);
        }
        Ok(ids.len() as u64)
    }

    async fn report_by_id(&mut self, id: Uuid) -> Result<Option<Report>> {
        Ok(self.working.reports.get(&id))
    }

    async fn put_report(&mut self, report: &Report) -> Result<()> {
        self.working.reports.put(report.id, report.clone());
        self.touched.reports.insert(report.id);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        if self.finished {
            return Err(Error::Store("session already committed".into()));
        }
        self.finished = true;

        let injected = self
            .failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(Error::Transaction("injected commit failure".into()));
        }

        let mut live = self
            .store
            .lock()
            .map_err(|_| Error::Store("store lock poisoned".into()))?;

        // Optimistic check: every document this session wrote must be at
        // the revision it was snapshotted at, else another commit got
        // there first and the whole session aborts.
        let conflict = check_conflicts("user", &self.touched.users, &self.origin.users, &live.users)
            .and_then(|()| {
                check_conflicts("blog", &self.touched.blogs, &self.origin.blogs, &live.blogs)
            })
            .and_then(|()| {
                check_conflicts("post", &self.touched.posts, &self.origin.posts, &live.posts)
            })
            .and_then(|()| {
                check_conflicts(
                    "comment",
                    &self.touched.comments,
                    &self.origin.comments,
                    &live.comments,
                )
            })
            .and_then(|()| {
                check_conflicts(
                    "report",
                    &self.touched.reports,
                    &self.origin.reports,
                    &live.reports,
                )
            });
        if let Err(err) = conflict {
            tracing::warn!(error = %err, "commit aborted");
            return Err(err);
        }

        apply_staged(&self.touched.users, &self.working.users, &mut live.users);
        apply_staged(&self.touched.blogs, &self.working.blogs, &mut live.blogs);
        apply_staged(&self.touched.posts, &self.working.posts, &mut live.posts);
        apply_staged(
            &self.touched.comments,
            &self.working.comments,
            &mut live.comments,
        );
        apply_staged(
            &self.touched.reports,
            &self.working.reports,
            &mut live.reports,
        );
        Ok(())
    }
}
