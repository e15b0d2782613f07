//! # Moderation Action Dispatcher
//!
//! Interprets a moderator's requested action against a report and carries
//! it out as one all-or-nothing store transaction: status propagation or
//! content deletion, plus report settlement, commit together or not at
//! all. A failed action leaves the report open and every entity untouched,
//! ready for re-attempt.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    AccountChanges, AccountStatus, ActionTaken, ContentStore, ContentType, Error,
    ModerationAction, Principal, Report, Resolution, Result, StoreSession,
};
use uuid::Uuid;

use crate::status::StatusPropagator;

#[derive(Clone)]
pub struct ModerationService {
    store: Arc<dyn ContentStore>,
}

impl ModerationService {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Resolves a report. The caller is already authorized as staff; role
    /// checks beyond that (none for content moderation) stay out of here.
    pub async fn moderate_content(
        &self,
        report_id: Uuid,
        action: ModerationAction,
        moderator: &Principal,
    ) -> Result<()> {
        let mut session = self.store.begin().await?;
        let mut report = session
            .report_by_id(report_id)
            .await?
            .ok_or_else(|| Error::not_found("report", report_id))?;

        // Re-checked inside the transaction: a resolution that committed
        // concurrently must not be applied a second time.
        if report.is_settled() {
            return Err(Error::AlreadySettled(report_id));
        }

        let action_taken = match action {
            ModerationAction::Ban | ModerationAction::Restrict => {
                let (new_status, taken) = if action == ModerationAction::Ban {
                    (AccountStatus::Banned, ActionTaken::Banned)
                } else {
                    (AccountStatus::Restricted, ActionTaken::Restricted)
                };
                let mut user = session
                    .user_by_username(&report.reported_user)
                    .await?
                    .ok_or_else(|| Error::not_found("user", &report.reported_user))?;
                StatusPropagator::apply(session.as_mut(), &mut user, new_status).await?;
                taken
            }
            ModerationAction::Delete => {
                delete_reported_content(session.as_mut(), &report).await?;
                ActionTaken::DeleteContent
            }
        };

        report.resolution = Some(Resolution {
            action_taken,
            date_of_action: Utc::now(),
            responding_moderator: moderator.username.clone(),
        });
        session.put_report(&report).await?;
        session.commit().await?;

        tracing::info!(
            report = %report_id,
            action = ?action,
            moderator = %moderator.username,
            "report settled"
        );
        Ok(())
    }

    /// Account-console moderation. Exactly the first applicable clause
    /// runs: account deletion, then status change, then type change.
    pub async fn moderate_user(
        &self,
        user_id: Uuid,
        changes: &AccountChanges,
        moderator: &Principal,
    ) -> Result<()> {
        if changes.delete_account {
            if !moderator.is_admin() {
                return Err(Error::Forbidden("only admins may delete accounts".into()));
            }
            return self.delete_account(user_id, moderator).await;
        }

        if let Some(status) = changes.account_status {
            StatusPropagator::propagate(self.store.as_ref(), user_id, status).await?;
            return Ok(());
        }

        if let Some(account_type) = changes.account_type {
            if !moderator.is_admin() {
                return Err(Error::Forbidden(
                    "only admins may change account types".into(),
                ));
            }
            let mut session = self.store.begin().await?;
            let mut user = session
                .user_by_id(user_id)
                .await?
                .ok_or_else(|| Error::not_found("user", user_id))?;
            // Account type is not denormalized; a direct update suffices.
            user.account_type = account_type;
            session.put_user(&user).await?;
            return session.commit().await;
        }

        Err(Error::Validation("no account changes requested".into()))
    }

    /// Removes the account and everything it owns in one transaction.
    /// Comments by other users on the deleted author's posts are left
    /// alone; they become orphans, same as a moderation delete.
    async fn delete_account(&self, user_id: Uuid, moderator: &Principal) -> Result<()> {
        let mut session = self.store.begin().await?;
        session
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| Error::not_found("user", user_id))?;

        let comments = session.delete_comments_by_author(user_id).await?;
        let posts = session.delete_posts_by_author(user_id).await?;
        let blogs = session.delete_blogs_by_owner(user_id).await?;
        session.delete_user(user_id).await?;
        session.commit().await?;

        tracing::info!(
            user = %user_id,
            moderator = %moderator.username,
            blogs,
            posts,
            comments,
            "account deleted"
        );
        Ok(())
    }
}

async fn delete_reported_content(
    session: &mut dyn StoreSession,
    report: &Report,
) -> Result<()> {
    match report.content_type {
        ContentType::Comment => {
            session
                .comment_by_id(report.content_id)
                .await?
                .ok_or_else(|| Error::not_found("comment", report.content_id))?;
            session.delete_comment(report.content_id).await
        }
        ContentType::BlogPost => {
            session
                .post_by_id(report.content_id)
                .await?
                .ok_or_else(|| Error::not_found("blog post", report.content_id))?;
            // Comments under the post stay put: they remain reachable by
            // direct id lookup and 404 when navigated through the post.
            session.delete_post(report.content_id).await
        }
    }
}
