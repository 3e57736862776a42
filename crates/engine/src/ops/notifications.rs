use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::Expr, prelude::*,
};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, notifications, notifications::NotificationKind};

use super::Engine;

const MAX_NOTIFICATIONS: u64 = 100;

impl Engine {
    pub(super) async fn notify(
        &self,
        db: &DatabaseTransaction,
        user_id: &str,
        kind: NotificationKind,
        title: &str,
        body: &str,
        link: Option<&str>,
    ) -> ResultEngine<()> {
        notifications::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            user_id: ActiveValue::Set(user_id.to_string()),
            kind: ActiveValue::Set(kind.as_str().to_string()),
            title: ActiveValue::Set(title.to_string()),
            body: ActiveValue::Set(body.to_string()),
            link: ActiveValue::Set(link.map(ToString::to_string)),
            read: ActiveValue::Set(false),
            created_at: ActiveValue::Set(Utc::now()),
        }
        .insert(db)
        .await?;
        Ok(())
    }

    /// Newest first, capped at 100.
    pub async fn notifications(
        &self,
        user_id: &str,
        unread_only: bool,
    ) -> ResultEngine<Vec<notifications::Model>> {
        let mut query =
            notifications::Entity::find().filter(notifications::Column::UserId.eq(user_id.to_string()));
        if unread_only {
            query = query.filter(notifications::Column::Read.eq(false));
        }
        query
            .order_by_desc(notifications::Column::CreatedAt)
            .limit(MAX_NOTIFICATIONS)
            .all(&self.database)
            .await
            .map_err(Into::into)
    }

    pub async fn unread_count(&self, user_id: &str) -> ResultEngine<u64> {
        notifications::Entity::find()
            .filter(notifications::Column::UserId.eq(user_id.to_string()))
            .filter(notifications::Column::Read.eq(false))
            .count(&self.database)
            .await
            .map_err(Into::into)
    }

    /// Marks one notification read. Other users' notifications look missing.
    pub async fn mark_notification_read(
        &self,
        user_id: &str,
        notification_id: &str,
    ) -> ResultEngine<()> {
        let notification = notifications::Entity::find_by_id(notification_id.to_string())
            .one(&self.database)
            .await?
            .filter(|n| n.user_id == user_id)
            .ok_or_else(|| EngineError::KeyNotFound("notification not exists".to_string()))?;
        if notification.read {
            return Ok(());
        }
        let active = notifications::ActiveModel {
            id: ActiveValue::Set(notification.id),
            read: ActiveValue::Set(true),
            ..Default::default()
        };
        active.update(&self.database).await?;
        Ok(())
    }

    /// Returns how many notifications changed.
    pub async fn mark_all_notifications_read(&self, user_id: &str) -> ResultEngine<u64> {
        let result = notifications::Entity::update_many()
            .col_expr(notifications::Column::Read, Expr::value(true))
            .filter(notifications::Column::UserId.eq(user_id.to_string()))
            .filter(notifications::Column::Read.eq(false))
            .exec(&self.database)
            .await?;
        Ok(result.rows_affected)
    }
}
