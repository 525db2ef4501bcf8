use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

use super::shared::{Pagination, validate_description, validate_title};
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCompetitionRequest {
    pub title: String,
    /// Markdown body describing the source song and the rules.
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Deserialize, Default, PartialEq, utoipa::ToSchema)]
pub struct UpdateCompetitionRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize, utoipa::IntoParams)]
pub struct CompetitionListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Case-insensitive substring match on the title.
    pub search: Option<String>,
    /// Exact lifecycle status filter, e.g. `voting_round1_open`.
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Request body for advancing a competition one lifecycle step.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct AdvanceStatusRequest {
    /// Optional assertion of the status the caller expects to land on.
    /// Rejected with `INVALID_TRANSITION` if it is not the next status.
    #[schema(example = "voting_round1_open")]
    pub to_status: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AdvanceStatusResponse {
    #[schema(example = "voting_round1_setup")]
    pub previous_status: String,
    #[schema(example = "voting_round1_open")]
    pub new_status: String,
}

/// Request body for the administrative status override.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct ForceStatusRequest {
    #[schema(example = "voting_round2_tallying")]
    pub status: String,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize, utoipa::ToSchema)]
pub struct CompetitionResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[schema(example = "open_for_submissions")]
    pub status: String,
    pub organizer_id: i32,
    pub winner_submission_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, FromQueryResult, utoipa::ToSchema)]
pub struct CompetitionListItem {
    pub id: i32,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub organizer_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CompetitionListResponse {
    pub data: Vec<CompetitionListItem>,
    pub pagination: Pagination,
}

impl From<crate::entity::competition::Model> for CompetitionResponse {
    fn from(m: crate::entity::competition::Model) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            start_time: m.start_time,
            end_time: m.end_time,
            status: m.status,
            organizer_id: m.organizer_id,
            winner_submission_id: m.winner_submission_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

pub fn validate_create_competition(req: &CreateCompetitionRequest) -> Result<(), AppError> {
    validate_title(&req.title)?;
    validate_description(&req.description)?;
    if req.end_time <= req.start_time {
        return Err(AppError::Validation(
            "end_time must be after start_time".into(),
        ));
    }
    Ok(())
}

pub fn validate_update_competition(req: &UpdateCompetitionRequest) -> Result<(), AppError> {
    if let Some(ref title) = req.title {
        validate_title(title)?;
    }
    if let Some(ref description) = req.description {
        validate_description(description)?;
    }
    if let (Some(start), Some(end)) = (req.start_time, req.end_time)
        && end <= start
    {
        return Err(AppError::Validation(
            "end_time must be after start_time".into(),
        ));
    }
    Ok(())
}
