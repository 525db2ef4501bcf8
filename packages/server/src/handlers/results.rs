use axum::Json;
use axum::extract::{Path, State};
use tracing::instrument;

use crate::engine::results;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::results::{DashboardResponse, ResultsResponse};
use crate::state::AppState;
use crate::utils::competition::find_competition;

#[utoipa::path(
    get,
    path = "/dashboard",
    tag = "Results",
    operation_id = "getCompetitionDashboard",
    summary = "Live voting-progress dashboard",
    description = "Submission, group, and voter-completion counts with a per-group breakdown and the most recent completed voters. Counts degrade to zeros for phases whose data does not exist yet.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn dashboard(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DashboardResponse>, AppError> {
    let competition = find_competition(&state.db, id).await?;
    let dashboard = results::competition_dashboard(&state.db, &competition).await?;
    Ok(Json(dashboard))
}

#[utoipa::path(
    get,
    path = "/results",
    tag = "Results",
    operation_id = "getCompetitionResults",
    summary = "Group standings, finalists, winner, and advisory picks",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Results", body = ResultsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn competition_results(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ResultsResponse>, AppError> {
    let competition = find_competition(&state.db, id).await?;
    let results = results::competition_results(&state.db, &competition).await?;
    Ok(Json(results))
}
