use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use crate::engine::status::CompetitionStatus;
use crate::entity::{submission, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::submission::*;
use crate::state::AppState;
use crate::utils::competition::{find_competition, require_status};

#[utoipa::path(
    post,
    path = "/",
    tag = "Submissions",
    operation_id = "createSubmission",
    summary = "Enter a mix in a competition",
    description = "Creates the caller's entry. Allowed only while the competition is `open_for_submissions`; one entry per user per competition.",
    params(("id" = i32, Path, description = "Competition ID")),
    request_body = CreateSubmissionRequest,
    responses(
        (status = 201, description = "Entry created", body = SubmissionResponse),
        (status = 400, description = "Validation error or wrong phase (VALIDATION_ERROR, INVALID_STATE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already entered (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<CreateSubmissionRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_submission(&payload)?;

    let competition = find_competition(&state.db, id).await?;
    require_status(&competition, CompetitionStatus::OpenForSubmissions)?;

    let new_submission = submission::ActiveModel {
        competition_id: Set(id),
        user_id: Set(auth_user.user_id),
        title: Set(payload.title.trim().to_string()),
        audio_ref: Set(payload.audio_ref),
        is_disqualified: Set(false),
        round1_score: Set(None),
        advanced_to_round2: Set(false),
        final_score: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    // The unique (competition_id, user_id) index is the authoritative
    // one-entry-per-user guard.
    let model = new_submission
        .insert(&state.db)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(
                "You have already entered this competition".into(),
            ),
            _ => AppError::from(e),
        })?;

    Ok((StatusCode::CREATED, Json(SubmissionResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Submissions",
    operation_id = "listSubmissions",
    summary = "List a competition's entries",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Entries", body = SubmissionListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn list_submissions(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SubmissionListResponse>, AppError> {
    find_competition(&state.db, id).await?;

    let data = submission::Entity::find()
        .filter(submission::Column::CompetitionId.eq(id))
        .inner_join(user::Entity)
        .select_only()
        .columns([
            submission::Column::Id,
            submission::Column::UserId,
            submission::Column::Title,
            submission::Column::AudioRef,
            submission::Column::IsDisqualified,
            submission::Column::AdvancedToRound2,
            submission::Column::CreatedAt,
        ])
        .column(user::Column::Username)
        .order_by_asc(submission::Column::Id)
        .into_model::<SubmissionListItem>()
        .all(&state.db)
        .await?;

    Ok(Json(SubmissionListResponse { data }))
}
