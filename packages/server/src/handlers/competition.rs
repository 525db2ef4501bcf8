use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, LikeExpr};
use sea_orm::*;
use tracing::instrument;

use crate::engine::status::{self, CompetitionStatus};
use crate::entity::{competition, round_assignment, song_creator_pick, submission, submission_group, vote};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::competition::*;
use crate::models::shared::{Pagination, escape_like};
use crate::state::AppState;
use crate::utils::competition::{find_competition, parse_status};

/// Management guard: the `competition:manage` permission or being the
/// competition's organizer.
pub(crate) fn require_manage(
    auth_user: &AuthUser,
    competition: &competition::Model,
) -> Result<(), AppError> {
    if auth_user.has_permission("competition:manage")
        || competition.organizer_id == auth_user.user_id
    {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}

fn parse_requested_status(s: &str) -> Result<CompetitionStatus, AppError> {
    CompetitionStatus::parse(s)
        .ok_or_else(|| AppError::Validation(format!("Unknown competition status '{s}'")))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Competitions",
    operation_id = "createCompetition",
    summary = "Create a new competition",
    description = "Creates a competition in the `upcoming` status with the caller as organizer. Requires `competition:create` permission.",
    request_body = CreateCompetitionRequest,
    responses(
        (status = 201, description = "Competition created", body = CompetitionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(title = %payload.title))]
pub async fn create_competition(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateCompetitionRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("competition:create")?;
    validate_create_competition(&payload)?;

    let now = chrono::Utc::now();
    let new_competition = competition::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description),
        start_time: Set(payload.start_time),
        end_time: Set(payload.end_time),
        status: Set(CompetitionStatus::Upcoming.as_str().to_string()),
        organizer_id: Set(auth_user.user_id),
        winner_submission_id: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = new_competition.insert(&state.db).await?;

    Ok((StatusCode::CREATED, Json(CompetitionResponse::from(model))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Competitions",
    operation_id = "listCompetitions",
    summary = "List competitions with pagination, search, and status filter",
    params(CompetitionListQuery),
    responses(
        (status = 200, description = "List of competitions", body = CompetitionListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user, query))]
pub async fn list_competitions(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<CompetitionListQuery>,
) -> Result<Json<CompetitionListResponse>, AppError> {
    let page = Ord::max(query.page.unwrap_or(1), 1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let mut select = competition::Entity::find();

    if let Some(ref status) = query.status {
        let status = parse_requested_status(status)?;
        select = select.filter(competition::Column::Status.eq(status.as_str()));
    }

    if let Some(ref search) = query.search {
        let term = escape_like(search.trim());
        if !term.is_empty() {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(competition::Column::Title)))
                    .like(LikeExpr::new(format!("%{}%", term.to_lowercase())).escape('\\')),
            );
        }
    }

    let sort_by = query.sort_by.as_deref().unwrap_or("created_at");
    let sort_order = if query.sort_order.as_deref() == Some("asc") {
        Order::Asc
    } else {
        Order::Desc
    };
    let sort_column = match sort_by {
        "updated_at" => competition::Column::UpdatedAt,
        "start_time" => competition::Column::StartTime,
        "title" => competition::Column::Title,
        _ => competition::Column::CreatedAt,
    };

    let paginator = select
        .order_by(sort_column, sort_order)
        .into_model::<CompetitionListItem>()
        .paginate(&state.db, per_page);

    let total = paginator.num_items().await?;
    let data = paginator.fetch_page(page - 1).await?;

    Ok(Json(CompetitionListResponse {
        data,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages: total.div_ceil(per_page),
        },
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Competitions",
    operation_id = "getCompetition",
    summary = "Get a competition by ID",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Competition", body = CompetitionResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_competition(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<CompetitionResponse>, AppError> {
    let competition = find_competition(&state.db, id).await?;
    Ok(Json(CompetitionResponse::from(competition)))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Competitions",
    operation_id = "updateCompetition",
    summary = "Update competition metadata",
    description = "Partial update of title, description, and schedule. Requires `competition:manage` or being the organizer. The lifecycle status is never changed here.",
    params(("id" = i32, Path, description = "Competition ID")),
    request_body = UpdateCompetitionRequest,
    responses(
        (status = 200, description = "Updated competition", body = CompetitionResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn update_competition(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateCompetitionRequest>,
) -> Result<Json<CompetitionResponse>, AppError> {
    validate_update_competition(&payload)?;

    let competition = find_competition(&state.db, id).await?;
    require_manage(&auth_user, &competition)?;

    if payload == UpdateCompetitionRequest::default() {
        return Ok(Json(CompetitionResponse::from(competition)));
    }

    // Cross-check schedule bounds against stored values for partial updates.
    let start = payload.start_time.unwrap_or(competition.start_time);
    let end = payload.end_time.unwrap_or(competition.end_time);
    if end <= start {
        return Err(AppError::Validation(
            "end_time must be after start_time".into(),
        ));
    }

    let mut active: competition::ActiveModel = competition.into();
    if let Some(title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(start_time) = payload.start_time {
        active.start_time = Set(start_time);
    }
    if let Some(end_time) = payload.end_time {
        active.end_time = Set(end_time);
    }
    active.updated_at = Set(chrono::Utc::now());

    let model = active.update(&state.db).await?;
    Ok(Json(CompetitionResponse::from(model)))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Competitions",
    operation_id = "deleteCompetition",
    summary = "Delete a competition",
    description = "Deletes a competition and its submissions. Refused once voting has started. Requires `competition:delete` permission.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Voting already started (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_competition(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("competition:delete")?;

    let txn = state.db.begin().await?;
    let competition =
        crate::utils::competition::find_competition_for_update(&txn, id).await?;

    let current = parse_status(&competition)?;
    if !matches!(
        current,
        CompetitionStatus::Upcoming | CompetitionStatus::OpenForSubmissions
    ) {
        return Err(AppError::Conflict(
            "Competitions cannot be deleted once voting has started".into(),
        ));
    }

    vote::Entity::delete_many()
        .filter(vote::Column::CompetitionId.eq(id))
        .exec(&txn)
        .await?;
    song_creator_pick::Entity::delete_many()
        .filter(song_creator_pick::Column::CompetitionId.eq(id))
        .exec(&txn)
        .await?;
    round_assignment::Entity::delete_many()
        .filter(round_assignment::Column::CompetitionId.eq(id))
        .exec(&txn)
        .await?;
    submission_group::Entity::delete_many()
        .filter(submission_group::Column::CompetitionId.eq(id))
        .exec(&txn)
        .await?;
    submission::Entity::delete_many()
        .filter(submission::Column::CompetitionId.eq(id))
        .exec(&txn)
        .await?;
    competition::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/{id}/advance",
    tag = "Lifecycle",
    operation_id = "advanceCompetitionStatus",
    summary = "Advance a competition to its next lifecycle status",
    description = "Moves the competition one step along the lifecycle, running the bound engine work (group assignment, tallies) in the same transaction. Requires `competition:manage` or being the organizer.",
    params(("id" = i32, Path, description = "Competition ID")),
    request_body = AdvanceStatusRequest,
    responses(
        (status = 200, description = "Advanced", body = AdvanceStatusResponse),
        (status = 400, description = "Invalid state or transition (INVALID_STATE, INVALID_TRANSITION)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn advance_status(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<AdvanceStatusRequest>,
) -> Result<Json<AdvanceStatusResponse>, AppError> {
    let competition = find_competition(&state.db, id).await?;
    require_manage(&auth_user, &competition)?;

    let requested = payload
        .to_status
        .as_deref()
        .map(parse_requested_status)
        .transpose()?;

    let (previous, new) =
        status::advance_competition(&state.db, &state.config.voting, id, requested).await?;

    Ok(Json(AdvanceStatusResponse {
        previous_status: previous.to_string(),
        new_status: new.to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/{id}/force-status",
    tag = "Lifecycle",
    operation_id = "forceCompetitionStatus",
    summary = "Override a competition's status",
    description = "Sets any status directly, bypassing transition validation and engine work. Requires `competition:force_status` permission. The override is audited in the server log.",
    params(("id" = i32, Path, description = "Competition ID")),
    request_body = ForceStatusRequest,
    responses(
        (status = 200, description = "Status overridden", body = AdvanceStatusResponse),
        (status = 400, description = "Unknown status (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn force_competition_status(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<ForceStatusRequest>,
) -> Result<Json<AdvanceStatusResponse>, AppError> {
    auth_user.require_permission("competition:force_status")?;

    let target = parse_requested_status(&payload.status)?;
    let (previous, new) =
        status::force_status(&state.db, id, target, auth_user.user_id).await?;

    Ok(Json(AdvanceStatusResponse {
        previous_status: previous.to_string(),
        new_status: new.to_string(),
    }))
}
