//! Notification feed and read-state transitions.

use chrono::Utc;
use service_core::error::AppError;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{CreateNotification, Notification};
use crate::services::cache::StatsCache;
use crate::services::metrics::NOTIFICATIONS_MARKED_READ;
use crate::services::stats::stats_tag;
use crate::services::store::RentalStore;

pub const DEFAULT_LIST_LIMIT: i64 = 20;
pub const MAX_LIST_LIMIT: i64 = 50;

/// Which of the caller's notifications to mark as read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkReadTarget {
    All,
    /// Never empty; ids the caller does not own are ignored.
    Ids(Vec<Uuid>),
}

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT)
}

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn RentalStore>,
    cache: StatsCache,
}

impl NotificationService {
    pub fn new(store: Arc<dyn RentalStore>, cache: StatsCache) -> Self {
        Self { store, cache }
    }

    /// Newest-first page of the caller's notifications plus their unread total.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: Option<i64>,
    ) -> Result<(Vec<Notification>, i64), AppError> {
        let limit = clamp_limit(limit);
        tokio::try_join!(
            self.store.list_notifications(user_id, unread_only, limit),
            self.store.count_unread_notifications(user_id),
        )
    }

    #[instrument(skip(self, input), fields(user_id = %input.user_id))]
    pub async fn create(&self, input: CreateNotification) -> Result<Notification, AppError> {
        let notification = self.store.create_notification(&input).await?;
        self.cache.invalidate(&stats_tag(input.user_id)).await;

        info!(
            notification_id = %notification.notification_id,
            notification_type = %notification.notification_type,
            "Notification created"
        );

        Ok(notification)
    }

    /// Move the targeted unread notifications to read and return how many
    /// changed. Repeating the call changes nothing and is not an error.
    #[instrument(skip(self, target), fields(user_id = %user_id))]
    pub async fn mark_read(&self, user_id: Uuid, target: MarkReadTarget) -> Result<u64, AppError> {
        let now = Utc::now();
        let (mode, updated) = match &target {
            MarkReadTarget::All => (
                "all",
                self.store.mark_all_notifications_read(user_id, now).await?,
            ),
            MarkReadTarget::Ids(ids) => (
                "selected",
                self.store.mark_notifications_read(user_id, ids, now).await?,
            ),
        };

        NOTIFICATIONS_MARKED_READ
            .with_label_values(&[mode])
            .inc_by(updated as f64);
        self.cache.invalidate(&stats_tag(user_id)).await;

        info!(mode, updated, "Notifications marked as read");

        Ok(updated)
    }
}
