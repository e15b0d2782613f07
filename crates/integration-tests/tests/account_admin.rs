//! The account-moderation console: standalone status changes, account-type
//! changes, and full account deletion.

use std::sync::Arc;

use domains::{
    AccountChanges, AccountStatus, AccountType, ContentStore, ContentType, Error, StoreSession,
};
use integration_tests::{admin, moderator, seeded};
use services::ModerationService;
use uuid::Uuid;

#[tokio::test]
async fn status_change_propagates_to_owned_content() {
    let fixture = seeded().await;
    let service = ModerationService::new(Arc::new(fixture.store.clone()));

    let changes = AccountChanges {
        account_status: Some(AccountStatus::Restricted),
        ..Default::default()
    };
    service
        .moderate_user(fixture.alice.id, &changes, &moderator())
        .await
        .unwrap();

    let alice = fixture.store.get_user(fixture.alice.id).await.unwrap().unwrap();
    assert_eq!(alice.status, AccountStatus::Restricted);

    let mut session = fixture.store.begin().await.unwrap();
    for post in session.posts_by_author(alice.id).await.unwrap() {
        assert_eq!(post.author.status, AccountStatus::Restricted);
    }
}

#[tokio::test]
async fn account_type_change_is_admin_only_and_direct() {
    let fixture = seeded().await;
    let service = ModerationService::new(Arc::new(fixture.store.clone()));
    let changes = AccountChanges {
        account_type: Some(AccountType::Moderator),
        ..Default::default()
    };

    let err = service
        .moderate_user(fixture.bob.id, &changes, &moderator())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden(_)));

    service
        .moderate_user(fixture.bob.id, &changes, &admin())
        .await
        .unwrap();
    let bob = fixture.store.get_user(fixture.bob.id).await.unwrap().unwrap();
    assert_eq!(bob.account_type, AccountType::Moderator);
}

#[tokio::test]
async fn deleting_an_account_removes_its_content_but_not_other_users() {
    let fixture = seeded().await;
    let service = ModerationService::new(Arc::new(fixture.store.clone()));

    let changes = AccountChanges {
        delete_account: true,
        ..Default::default()
    };
    service
        .moderate_user(fixture.alice.id, &changes, &admin())
        .await
        .unwrap();

    assert!(fixture.store.get_user(fixture.alice.id).await.unwrap().is_none());

    let mut session = fixture.store.begin().await.unwrap();
    assert!(session
        .blogs_by_owner(fixture.alice.id)
        .await
        .unwrap()
        .is_empty());
    assert!(session
        .posts_by_author(fixture.alice.id)
        .await
        .unwrap()
        .is_empty());
    assert!(session
        .comments_by_author(fixture.alice.id)
        .await
        .unwrap()
        .is_empty());

    // Bob's comment on alice's (now deleted) post is orphaned, not gone.
    assert!(fixture
        .store
        .get_content(ContentType::Comment, fixture.bob_comment.id)
        .await
        .unwrap()
        .is_some());
    assert!(fixture.store.get_user(fixture.bob.id).await.unwrap().is_some());
}

#[tokio::test]
async fn deleting_an_unknown_account_is_not_found() {
    let fixture = seeded().await;
    let service = ModerationService::new(Arc::new(fixture.store.clone()));

    let changes = AccountChanges {
        delete_account: true,
        ..Default::default()
    };
    let err = service
        .moderate_user(Uuid::now_v7(), &changes, &admin())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound("user", _)));
}
