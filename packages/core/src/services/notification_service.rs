//! Notification Service
//!
//! Notifications belong to one owner. Listing and counting always work on the
//! current user's notifications; touching another owner's notification is
//! unauthorized unless the session runs elevated.

use crate::db::Sequence;
use crate::models::{CreateNotificationStruct, Notification, NotificationList};
use crate::services::repository::UnitOfWork;
use crate::services::{RepositoryError, Session};

pub struct NotificationService<'a> {
    session: &'a Session,
}

impl<'a> NotificationService<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub async fn create_notification(
        &self,
        create: CreateNotificationStruct,
    ) -> Result<Notification, RepositoryError> {
        self.session
            .write(|uow| {
                if create.notification_type.trim().is_empty() {
                    return Err(RepositoryError::invalid_argument(
                        "type",
                        "notification type must not be empty",
                    ));
                }
                let id = uow.state.next_id(Sequence::Notification);
                let notification = Notification {
                    id,
                    owner_id: create.owner_id,
                    is_pending: true,
                    notification_type: create.notification_type,
                    data: create.data,
                    created_at: uow.now,
                };
                uow.state.notifications.insert(id, notification.clone());
                tracing::debug!("Created notification {} for user {}", id, notification.owner_id);
                Ok(notification)
            })
            .await
    }

    /// Current user's notifications, newest first
    pub async fn load_notifications(
        &self,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<NotificationList, RepositoryError> {
        self.session
            .read(|ctx| {
                let mut items: Vec<&Notification> = ctx
                    .state
                    .notifications
                    .values()
                    .filter(|n| n.owner_id == ctx.user.user_id)
                    .collect();
                items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
                let total_count = items.len();
                let items = items
                    .into_iter()
                    .skip(offset)
                    .take(limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect();
                Ok(NotificationList { total_count, items })
            })
            .await
    }

    pub async fn get_notification(&self, id: u64) -> Result<Notification, RepositoryError> {
        self.session
            .read(|ctx| {
                let notification = ctx
                    .state
                    .notifications
                    .get(&id)
                    .ok_or_else(|| RepositoryError::not_found("Notification", id))?;
                if notification.owner_id != ctx.user.user_id && !ctx.elevated {
                    return Err(RepositoryError::unauthorized("notification", "read"));
                }
                Ok(notification.clone())
            })
            .await
    }

    pub async fn mark_notification_as_read(
        &self,
        notification: &Notification,
    ) -> Result<Notification, RepositoryError> {
        self.set_pending(notification.id, false).await
    }

    pub async fn mark_notification_as_unread(
        &self,
        notification: &Notification,
    ) -> Result<Notification, RepositoryError> {
        self.set_pending(notification.id, true).await
    }

    pub async fn get_pending_notification_count(&self) -> Result<usize, RepositoryError> {
        self.session
            .read(|ctx| {
                Ok(ctx
                    .state
                    .notifications
                    .values()
                    .filter(|n| n.owner_id == ctx.user.user_id && n.is_pending)
                    .count())
            })
            .await
    }

    pub async fn get_notification_count(&self) -> Result<usize, RepositoryError> {
        self.session
            .read(|ctx| {
                Ok(ctx
                    .state
                    .notifications
                    .values()
                    .filter(|n| n.owner_id == ctx.user.user_id)
                    .count())
            })
            .await
    }

    pub async fn delete_notification(&self, notification: &Notification) -> Result<(), RepositoryError> {
        let id = notification.id;
        self.session
            .write(|uow| {
                owned_notification(uow, id, "delete")?;
                uow.state.notifications.remove(&id);
                Ok(())
            })
            .await
    }

    async fn set_pending(&self, id: u64, pending: bool) -> Result<Notification, RepositoryError> {
        self.session
            .write(|uow| {
                owned_notification(uow, id, "update")?;
                let notification = uow
                    .state
                    .notifications
                    .get_mut(&id)
                    .ok_or_else(|| RepositoryError::not_found("Notification", id))?;
                notification.is_pending = pending;
                Ok(notification.clone())
            })
            .await
    }
}

fn owned_notification(uow: &UnitOfWork<'_>, id: u64, function: &str) -> Result<(), RepositoryError> {
    let notification = uow
        .state
        .notifications
        .get(&id)
        .ok_or_else(|| RepositoryError::not_found("Notification", id))?;
    if notification.owner_id != uow.user.user_id && !uow.elevated {
        return Err(RepositoryError::unauthorized("notification", function));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::RepositoryConfig;
    use crate::models::{CreateNotificationStruct, UserReference};
    use crate::services::Repository;
    use serde_json::json;

    #[tokio::test]
    async fn test_notifications_are_scoped_to_their_owner() {
        let repository = Repository::new(RepositoryConfig::default()).await.unwrap();
        let alice = repository.session(UserReference::new(30));
        let bob = repository.session(UserReference::new(31));

        let first = alice
            .notification_service()
            .create_notification(
                CreateNotificationStruct::new(30, "Workflow:Review").with_data(json!({"contentId": 1})),
            )
            .await
            .unwrap();
        alice
            .notification_service()
            .create_notification(CreateNotificationStruct::new(30, "Workflow:Approved"))
            .await
            .unwrap();

        let list = alice.notification_service().load_notifications(0, None).await.unwrap();
        assert_eq!(list.total_count, 2);
        assert_eq!(list.items[0].notification_type, "Workflow:Approved");
        assert_eq!(bob.notification_service().get_notification_count().await.unwrap(), 0);
        assert!(bob
            .notification_service()
            .get_notification(first.id)
            .await
            .unwrap_err()
            .is_unauthorized());
        assert!(bob
            .notification_service()
            .delete_notification(&first)
            .await
            .unwrap_err()
            .is_unauthorized());
    }

    #[tokio::test]
    async fn test_pending_count_follows_read_state() {
        let repository = Repository::new(RepositoryConfig::default()).await.unwrap();
        let session = repository.session(UserReference::new(40));
        let notifications = session.notification_service();
        let notification = notifications
            .create_notification(CreateNotificationStruct::new(40, "Info"))
            .await
            .unwrap();
        assert_eq!(notifications.get_pending_notification_count().await.unwrap(), 1);

        let read = notifications.mark_notification_as_read(&notification).await.unwrap();
        assert!(!read.is_pending);
        assert_eq!(notifications.get_pending_notification_count().await.unwrap(), 0);

        notifications.mark_notification_as_unread(&notification).await.unwrap();
        assert_eq!(notifications.get_pending_notification_count().await.unwrap(), 1);

        notifications.delete_notification(&notification).await.unwrap();
        assert_eq!(notifications.get_notification_count().await.unwrap(), 0);
        assert!(notifications
            .get_notification(notification.id)
            .await
            .unwrap_err()
            .is_not_found());
    }
}
