use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::shared::validate_title;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateSubmissionRequest {
    pub title: String,
    /// Reference to the uploaded mix artifact in external storage.
    pub audio_ref: Uuid,
}

pub fn validate_create_submission(req: &CreateSubmissionRequest) -> Result<(), AppError> {
    validate_title(&req.title)
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    pub id: i32,
    pub competition_id: i32,
    pub user_id: i32,
    pub title: String,
    pub audio_ref: Uuid,
    pub is_disqualified: bool,
    pub round1_score: Option<i32>,
    pub advanced_to_round2: bool,
    pub final_score: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<crate::entity::submission::Model> for SubmissionResponse {
    fn from(m: crate::entity::submission::Model) -> Self {
        Self {
            id: m.id,
            competition_id: m.competition_id,
            user_id: m.user_id,
            title: m.title,
            audio_ref: m.audio_ref,
            is_disqualified: m.is_disqualified,
            round1_score: m.round1_score,
            advanced_to_round2: m.advanced_to_round2,
            final_score: m.final_score,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, FromQueryResult, utoipa::ToSchema)]
pub struct SubmissionListItem {
    pub id: i32,
    pub user_id: i32,
    pub username: String,
    pub title: String,
    pub audio_ref: Uuid,
    pub is_disqualified: bool,
    pub advanced_to_round2: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionListResponse {
    pub data: Vec<SubmissionListItem>,
}
