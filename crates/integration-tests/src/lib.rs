//! quillpress/crates/integration-tests/src/lib.rs
//!
//! Shared fixtures: a seeded in-memory store with a blogger (alice) who
//! owns a blog, two posts, and a comment, plus a commenter (bob) with a
//! comment on alice's first post.

use chrono::Utc;
use domains::{
    AccountStatus, AccountType, Blog, BlogPost, BlogRef, Comment, ContentStore, Principal,
    StoreSession, User, UserRef,
};
use storage_adapters::MemoryStore;
use uuid::Uuid;

pub fn account(username: &str, account_type: AccountType) -> User {
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

pub fn principal_of(user: &User) -> Principal {
    Principal {
        id: user.id,
        username: user.username.clone(),
        account_type: user.account_type,
        status: user.status,
    }
}

pub fn moderator() -> Principal {
    Principal {
        id: Uuid::now_v7(),
        username: "mallory".into(),
        account_type: AccountType::Moderator,
        status: AccountStatus::Good,
    }
}

pub fn admin() -> Principal {
    Principal {
        id: Uuid::now_v7(),
        username: "root".into(),
        account_type: AccountType::Admin,
        status: AccountStatus::Good,
    }
}

pub struct Seeded {
    pub store: MemoryStore,
    pub alice: User,
    pub bob: User,
    pub blog: Blog,
    pub post: BlogPost,
    pub second_post: BlogPost,
    /// Alice's comment on her own first post.
    pub alice_comment: Comment,
    /// Bob's comment on alice's first post.
    pub bob_comment: Comment,
}

pub async fn seeded() -> Seeded {
    let store = MemoryStore::new();
    let alice = account("alice", AccountType::Blogger);
    let bob = account("bob", AccountType::Commenter);

    let blog = Blog {
        id: Uuid::now_v7(),
        owner: UserRef {
            doc: alice.id,
            status: alice.status,
        },
        name: "alices-notebook".into(),
        title: "Alice's Notebook".into(),
        description: "Occasional notes.".into(),
        created: Utc::now(),
        private: false,
    };

    let make_post = |title: &str| BlogPost {
        id: Uuid::now_v7(),
        blog: BlogRef {
            doc: blog.id,
            private: blog.private,
        },
        author: UserRef {
            doc: alice.id,
            status: alice.status,
        },
        title: title.into(),
        content: "words".into(),
        created: Utc::now(),
        private: false,
    };
    let post = make_post("first");
    let second_post = make_post("second");

    let make_comment = |author: &User, text: &str| Comment {
        id: Uuid::now_v7(),
        blog_post: post.id,
        author: UserRef {
            doc: author.id,
            status: author.status,
        },
        created: Utc::now(),
        content: text.into(),
    };
    let alice_comment = make_comment(&alice, "thanks for reading");
    let bob_comment = make_comment(&bob, "nice post");

    let mut session = store.begin().await.unwrap();
    session.put_user(&alice).await.unwrap();
    session.put_user(&bob).await.unwrap();
    session.put_blog(&blog).await.unwrap();
    session.put_post(&post).await.unwrap();
    session.put_post(&second_post).await.unwrap();
    session.put_comment(&alice_comment).await.unwrap();
    session.put_comment(&bob_comment).await.unwrap();
    session.commit().await.unwrap();

    Seeded {
        store,
        alice,
        bob,
        blog,
        post,
        second_post,
        alice_comment,
        bob_comment,
    }
}
