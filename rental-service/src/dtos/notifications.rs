use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::models::{CreateNotification, Notification};
use crate::services::MarkReadTarget;

pub const MARK_READ_TARGET_MESSAGE: &str =
    "Provide either a non-empty notificationIds array or markAll: true";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListResponse {
    pub success: bool,
    pub data: Vec<Notification>,
    pub unread_count: i64,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    pub notification_ids: Option<Vec<Uuid>>,
    pub mark_all: Option<bool>,
}

impl TryFrom<MarkReadRequest> for MarkReadTarget {
    type Error = AppError;

    /// Exactly one of `markAll: true` or a non-empty id list.
    fn try_from(request: MarkReadRequest) -> Result<Self, Self::Error> {
        let ids = request.notification_ids.unwrap_or_default();
        match (request.mark_all.unwrap_or(false), ids.is_empty()) {
            (true, true) => Ok(MarkReadTarget::All),
            (false, false) => Ok(MarkReadTarget::Ids(ids)),
            _ => Err(AppError::bad_request(MARK_READ_TARGET_MESSAGE)),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResult {
    pub updated_count: u64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub user_id: Uuid,
    pub rental_request_id: Option<Uuid>,

    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50, message = "type must be 1-50 characters"))]
    pub notification_type: String,

    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 2000, message = "message must be 1-2000 characters"))]
    pub message: String,

    pub data: Option<serde_json::Value>,
}

impl From<CreateNotificationRequest> for CreateNotification {
    fn from(request: CreateNotificationRequest) -> Self {
        Self {
            user_id: request.user_id,
            rental_request_id: request.rental_request_id,
            notification_type: request.notification_type,
            title: request.title,
            message: request.message,
            data: request.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<MarkReadTarget, AppError> {
        serde_json::from_str::<MarkReadRequest>(body)
            .unwrap()
            .try_into()
    }

    #[test]
    fn mark_all_or_ids() {
        assert_eq!(parse(r#"{"markAll":true}"#).unwrap(), MarkReadTarget::All);

        let id = Uuid::new_v4();
        assert_eq!(
            parse(&format!(r#"{{"notificationIds":["{}"]}}"#, id)).unwrap(),
            MarkReadTarget::Ids(vec![id])
        );
    }

    #[test]
    fn rejects_missing_empty_or_ambiguous_targets() {
        let id = Uuid::new_v4();
        for body in [
            "{}".to_string(),
            r#"{"notificationIds":[]}"#.to_string(),
            r#"{"markAll":false}"#.to_string(),
            format!(r#"{{"markAll":true,"notificationIds":["{}"]}}"#, id),
        ] {
            let err = parse(&body).unwrap_err();
            assert_eq!(err.to_string(), format!("Bad request: {}", MARK_READ_TARGET_MESSAGE));
        }
    }

    #[test]
    fn create_request_enforces_lengths() {
        let request: CreateNotificationRequest = serde_json::from_str(&format!(
            r#"{{"userId":"{}","type":"system","title":"","message":"hi"}}"#,
            Uuid::new_v4()
        ))
        .unwrap();

        assert!(request.validate().is_err());
    }
}
