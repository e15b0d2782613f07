//! Propagation atomicity: after a status change commits, the user record
//! and every denormalized copy agree; after an aborted commit, nothing
//! changed anywhere.

use domains::{AccountStatus, ContentStore, Error, StoreSession};
use integration_tests::seeded;
use services::{PropagationCounts, StatusPropagator};
use uuid::Uuid;

/// Reads every status copy belonging to the user straight from the store.
async fn statuses_of(
    store: &storage_adapters::MemoryStore,
    user_id: Uuid,
) -> Vec<AccountStatus> {
    let mut session = store.begin().await.unwrap();
    let mut statuses = vec![session.user_by_id(user_id).await.unwrap().unwrap().status];
    for blog in session.blogs_by_owner(user_id).await.unwrap() {
        statuses.push(blog.owner.status);
    }
    for post in session.posts_by_author(user_id).await.unwrap() {
        statuses.push(post.author.status);
    }
    for comment in session.comments_by_author(user_id).await.unwrap() {
        statuses.push(comment.author.status);
    }
    statuses
}

#[tokio::test]
async fn ban_rewrites_the_user_and_every_copy() {
    let fixture = seeded().await;

    let counts = StatusPropagator::propagate(&fixture.store, fixture.alice.id, AccountStatus::Banned)
        .await
        .unwrap();
    assert_eq!(
        counts,
        PropagationCounts {
            blogs: 1,
            posts: 2,
            comments: 1
        }
    );

    let statuses = statuses_of(&fixture.store, fixture.alice.id).await;
    assert_eq!(statuses.len(), 5); // user + blog + 2 posts + comment
    assert!(statuses.iter().all(|s| *s == AccountStatus::Banned));

    // Bob's comment was not alice's and must be untouched.
    let mut session = fixture.store.begin().await.unwrap();
    let bob_comment = session
        .comment_by_id(fixture.bob_comment.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(bob_comment.author.status, AccountStatus::Good);
}

#[tokio::test]
async fn unknown_user_fails_without_mutation() {
    let fixture = seeded().await;

    let err = StatusPropagator::propagate(&fixture.store, Uuid::now_v7(), AccountStatus::Banned)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound("user", _)));

    let statuses = statuses_of(&fixture.store, fixture.alice.id).await;
    assert!(statuses.iter().all(|s| *s == AccountStatus::Good));
}

#[tokio::test]
async fn aborted_commit_leaves_no_trace() {
    let fixture = seeded().await;

    fixture.store.inject_commit_failures(1);
    let err = StatusPropagator::propagate(&fixture.store, fixture.alice.id, AccountStatus::Banned)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transaction(_)));

    // Full rollback: every document still reads Good.
    let statuses = statuses_of(&fixture.store, fixture.alice.id).await;
    assert_eq!(statuses.len(), 5);
    assert!(statuses.iter().all(|s| *s == AccountStatus::Good));
}

#[tokio::test]
async fn copies_do_not_flap_between_propagations() {
    let fixture = seeded().await;

    StatusPropagator::propagate(&fixture.store, fixture.alice.id, AccountStatus::Restricted)
        .await
        .unwrap();

    let first = statuses_of(&fixture.store, fixture.alice.id).await;
    let second = statuses_of(&fixture.store, fixture.alice.id).await;
    assert_eq!(first, second);
    assert!(first.iter().all(|s| *s == AccountStatus::Restricted));

    StatusPropagator::propagate(&fixture.store, fixture.alice.id, AccountStatus::Good)
        .await
        .unwrap();
    let third = statuses_of(&fixture.store, fixture.alice.id).await;
    assert!(third.iter().all(|s| *s == AccountStatus::Good));
}
