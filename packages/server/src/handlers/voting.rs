use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::instrument;

use super::competition::require_manage;
use crate::engine::status::CompetitionStatus;
use crate::engine::{grouping, round1, round2};
use crate::entity::{round_assignment, song_creator_pick, submission, submission_group, user};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::voting::*;
use crate::state::AppState;
use crate::utils::competition::{
    find_competition, find_competition_for_update, parse_status, require_status,
};

fn vote_reply(outcome: crate::engine::scoring::VoteOutcome) -> impl IntoResponse {
    let status = if outcome.is_accepted() {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(VoteResponse::from(outcome)))
}

#[utoipa::path(
    post,
    path = "/groups",
    tag = "Round 1",
    operation_id = "createJudgingGroups",
    summary = "Partition entries into judging groups and assign voters",
    description = "Creates the Round-1 groups with an optional custom target size. Allowed while the competition is `open_for_submissions` or `voting_round1_setup`; advancing past `open_for_submissions` creates groups automatically if this was not called. Requires `competition:manage` or being the organizer.",
    params(("id" = i32, Path, description = "Competition ID")),
    request_body = CreateGroupsRequest,
    responses(
        (status = 201, description = "Groups created", body = CreateGroupsResponse),
        (status = 400, description = "No submissions or wrong phase (VALIDATION_ERROR, INVALID_STATE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Groups already exist (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn create_groups(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<CreateGroupsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let txn = state.db.begin().await?;
    let competition = find_competition_for_update(&txn, id).await?;
    require_manage(&auth_user, &competition)?;

    let current = parse_status(&competition)?;
    if !matches!(
        current,
        CompetitionStatus::OpenForSubmissions | CompetitionStatus::VotingRound1Setup
    ) {
        return Err(AppError::InvalidState(format!(
            "Competition is '{current}'; groups can only be created during submission intake or Round-1 setup"
        )));
    }

    let target = payload
        .target_group_size
        .unwrap_or(state.config.voting.target_group_size);
    if target == 0 {
        return Err(AppError::Validation(
            "target_group_size must be at least 1".into(),
        ));
    }

    let group_count = grouping::create_groups_and_assign_voters(&txn, id, target as usize).await?;
    txn.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateGroupsResponse {
            group_count: group_count as u32,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/assignment",
    tag = "Round 1",
    operation_id = "getMyAssignment",
    summary = "Get the caller's judging assignment and slate",
    description = "Returns the caller's Round-1 assignment and the non-disqualified entries of the group they must judge.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Assignment and slate", body = AssignmentResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "No assignment for the caller (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn my_assignment(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AssignmentResponse>, AppError> {
    find_competition(&state.db, id).await?;

    let assignment = round_assignment::Entity::find()
        .filter(round_assignment::Column::CompetitionId.eq(id))
        .filter(round_assignment::Column::VoterUserId.eq(auth_user.user_id))
        .one(&state.db)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("You have no judging assignment in this competition".into())
        })?;

    let slate = submission_group::Entity::find()
        .filter(submission_group::Column::CompetitionId.eq(id))
        .filter(submission_group::Column::GroupNumber.eq(assignment.assigned_group_number))
        .find_also_related(submission::Entity)
        .all(&state.db)
        .await?;

    let mut submissions = Vec::with_capacity(slate.len());
    for (_, entry) in slate {
        let Some(entry) = entry else { continue };
        if entry.is_disqualified {
            continue;
        }
        let author = user::Entity::find_by_id(entry.user_id)
            .one(&state.db)
            .await?;
        submissions.push(BallotEntry {
            submission_id: entry.id,
            title: entry.title,
            audio_ref: entry.audio_ref,
            username: author.map(|u| u.username).unwrap_or_default(),
        });
    }
    submissions.sort_by_key(|b| b.submission_id);

    Ok(Json(AssignmentResponse {
        voter_group_number: assignment.voter_group_number,
        assigned_group_number: assignment.assigned_group_number,
        has_voted: assignment.has_voted,
        voting_completed_at: assignment.voting_completed_at,
        submissions,
    }))
}

#[utoipa::path(
    post,
    path = "/round1/votes",
    tag = "Round 1",
    operation_id = "castRound1Vote",
    summary = "Cast the caller's complete Round-1 ballot",
    description = "Records 1st (3 pts), 2nd (2 pts), and 3rd (1 pt) over three distinct entries in the caller's assigned group. A voter votes exactly once; rejected ballots return 422 with the reason.",
    params(("id" = i32, Path, description = "Competition ID")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Ballot accepted", body = VoteResponse),
        (status = 400, description = "Wrong phase (INVALID_STATE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 422, description = "Ballot rejected", body = VoteResponse),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn cast_round1_vote(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<VoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = round1::process_voter_submission(
        &state.db,
        id,
        auth_user.user_id,
        payload.first_place_submission_id,
        payload.second_place_submission_id,
        payload.third_place_submission_id,
    )
    .await?;

    Ok(vote_reply(outcome))
}

#[utoipa::path(
    post,
    path = "/round1/disqualify-non-voters",
    tag = "Round 1",
    operation_id = "disqualifyNonVoters",
    summary = "Disqualify entries of voters who did not vote",
    description = "Soft-disqualifies the entry of every assigned voter who failed to complete their Round-1 ballot. Run during `voting_round1_tallying`, before the tally. Requires `competition:manage` or being the organizer.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Disqualification applied", body = DisqualifyNonVotersResponse),
        (status = 400, description = "Wrong phase (INVALID_STATE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn disqualify_non_voters(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DisqualifyNonVotersResponse>, AppError> {
    let txn = state.db.begin().await?;
    let competition = find_competition_for_update(&txn, id).await?;
    require_manage(&auth_user, &competition)?;
    require_status(&competition, CompetitionStatus::VotingRound1Tallying)?;

    let disqualified = round1::disqualify_non_voters(&txn, id).await?;
    txn.commit().await?;

    Ok(Json(DisqualifyNonVotersResponse { disqualified }))
}

#[utoipa::path(
    post,
    path = "/round1/tally",
    tag = "Round 1",
    operation_id = "tallyRound1",
    summary = "Tally Round 1 and mark advancers",
    description = "Derives group standings from the raw votes, ranks each group, and marks the configured top entries per group as advancing. Idempotent. Requires `competition:manage` or being the organizer.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Tally complete", body = TallyRound1Response),
        (status = 400, description = "Wrong phase or no groups (INVALID_STATE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn tally_round1(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TallyRound1Response>, AppError> {
    let txn = state.db.begin().await?;
    let competition = find_competition_for_update(&txn, id).await?;
    require_manage(&auth_user, &competition)?;
    require_status(&competition, CompetitionStatus::VotingRound1Tallying)?;

    let advanced = round1::tally_round1(
        &txn,
        id,
        state.config.voting.round1_advancers_per_group as usize,
    )
    .await?;
    txn.commit().await?;

    Ok(Json(TallyRound1Response { advanced }))
}

#[utoipa::path(
    post,
    path = "/round2/setup",
    tag = "Round 2",
    operation_id = "setupRound2",
    summary = "Verify the finalist pool before the final round opens",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Finalist pool ready", body = SetupRound2Response),
        (status = 400, description = "Wrong phase or empty pool (INVALID_STATE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn setup_round2(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SetupRound2Response>, AppError> {
    let txn = state.db.begin().await?;
    let competition = find_competition_for_update(&txn, id).await?;
    require_manage(&auth_user, &competition)?;
    require_status(&competition, CompetitionStatus::VotingRound2Setup)?;

    let finalists = round2::setup_round2(&txn, id).await?;
    txn.commit().await?;

    Ok(Json(SetupRound2Response { finalists }))
}

#[utoipa::path(
    get,
    path = "/round2/eligibility",
    tag = "Round 2",
    operation_id = "getRound2Eligibility",
    summary = "Check whether the caller may vote in the final round",
    description = "Applies the configured electorate policy: every non-disqualified entrant, or finalists only.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Eligibility", body = Round2EligibilityResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn round2_eligibility(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Round2EligibilityResponse>, AppError> {
    find_competition(&state.db, id).await?;

    let eligible = round2::is_user_eligible_for_round2_voting(
        &state.db,
        id,
        auth_user.user_id,
        state.config.voting.round2_voter_policy,
    )
    .await?;

    Ok(Json(Round2EligibilityResponse { eligible }))
}

#[utoipa::path(
    post,
    path = "/round2/votes",
    tag = "Round 2",
    operation_id = "castRound2Vote",
    summary = "Cast the caller's complete Round-2 ballot",
    description = "Records 1st/2nd/3rd over three distinct finalists. Eligibility follows the configured electorate policy; rejected ballots return 422 with the reason.",
    params(("id" = i32, Path, description = "Competition ID")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Ballot accepted", body = VoteResponse),
        (status = 400, description = "Wrong phase (INVALID_STATE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 422, description = "Ballot rejected", body = VoteResponse),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn cast_round2_vote(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<VoteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = round2::process_round2_votes(
        &state.db,
        id,
        auth_user.user_id,
        payload.first_place_submission_id,
        payload.second_place_submission_id,
        payload.third_place_submission_id,
        state.config.voting.round2_voter_policy,
    )
    .await?;

    Ok(vote_reply(outcome))
}

#[utoipa::path(
    post,
    path = "/round2/tally",
    tag = "Round 2",
    operation_id = "tallyRound2",
    summary = "Tally the final round and resolve the outcome",
    description = "Derives finalist scores from the raw votes. A unique leader completes the competition with a winner; a true tie (shared top score and shared first-place count) moves it to `requires_manual_winner_selection`. Requires `competition:manage` or being the organizer.",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Tally complete", body = TallyRound2Response),
        (status = 400, description = "Wrong phase or no finalists (INVALID_STATE)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn tally_round2(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<TallyRound2Response>, AppError> {
    let txn = state.db.begin().await?;
    let competition = find_competition_for_update(&txn, id).await?;
    require_manage(&auth_user, &competition)?;
    require_status(&competition, CompetitionStatus::VotingRound2Tallying)?;

    let (winner_id, is_tie) = round2::tally_round2(&txn, id).await?;
    let resulting = if is_tie {
        CompetitionStatus::RequiresManualWinnerSelection
    } else {
        CompetitionStatus::Completed
    };

    let mut active: crate::entity::competition::ActiveModel = competition.into();
    active.status = Set(resulting.as_str().to_string());
    active.updated_at = Set(chrono::Utc::now());
    active.update(&txn).await?;
    txn.commit().await?;

    Ok(Json(TallyRound2Response {
        winner_submission_id: (!is_tie).then_some(winner_id),
        is_tie,
        status: resulting.to_string(),
    }))
}

#[utoipa::path(
    post,
    path = "/winner",
    tag = "Round 2",
    operation_id = "selectWinner",
    summary = "Manually select the winner after a true tie",
    description = "Resolves `requires_manual_winner_selection` by naming one finalist the winner and completing the competition. Requires `competition:manage` or being the organizer.",
    params(("id" = i32, Path, description = "Competition ID")),
    request_body = SelectWinnerRequest,
    responses(
        (status = 200, description = "Winner set", body = crate::models::competition::CompetitionResponse),
        (status = 400, description = "Wrong phase or not a finalist (INVALID_STATE, VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn select_winner(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<SelectWinnerRequest>,
) -> Result<Json<crate::models::competition::CompetitionResponse>, AppError> {
    let txn = state.db.begin().await?;
    let competition = find_competition_for_update(&txn, id).await?;
    require_manage(&auth_user, &competition)?;
    require_status(&competition, CompetitionStatus::RequiresManualWinnerSelection)?;

    round2::set_competition_winner(&txn, competition, payload.submission_id).await?;
    txn.commit().await?;

    let updated = find_competition(&state.db, id).await?;
    Ok(Json(crate::models::competition::CompetitionResponse::from(
        updated,
    )))
}

#[utoipa::path(
    get,
    path = "/song-creator-picks",
    tag = "Round 2",
    operation_id = "getSongCreatorPicks",
    summary = "Get the organizer's advisory picks",
    params(("id" = i32, Path, description = "Competition ID")),
    responses(
        (status = 200, description = "Picks in rank order", body = SongCreatorPicksResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, _auth_user))]
pub async fn get_song_creator_picks(
    _auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SongCreatorPicksResponse>, AppError> {
    find_competition(&state.db, id).await?;

    let picks = song_creator_pick::Entity::find()
        .filter(song_creator_pick::Column::CompetitionId.eq(id))
        .order_by_asc(song_creator_pick::Column::Rank)
        .find_also_related(submission::Entity)
        .all(&state.db)
        .await?;

    let picks = picks
        .into_iter()
        .map(|(pick, entry)| SongCreatorPickResponse {
            rank: pick.rank,
            submission_id: pick.submission_id,
            title: entry.map(|e| e.title).unwrap_or_default(),
            comment: pick.comment,
        })
        .collect();

    Ok(Json(SongCreatorPicksResponse { picks }))
}

#[utoipa::path(
    put,
    path = "/song-creator-picks",
    tag = "Round 2",
    operation_id = "putSongCreatorPicks",
    summary = "Replace the organizer's advisory picks",
    description = "Replaces the advisory 1st/2nd/3rd picks over the finalist pool. Purely informational; never feeds the automatic tally. Requires `competition:manage` or being the organizer.",
    params(("id" = i32, Path, description = "Competition ID")),
    request_body = SongCreatorPicksRequest,
    responses(
        (status = 200, description = "Picks replaced", body = SongCreatorPicksResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload))]
pub async fn put_song_creator_picks(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<SongCreatorPicksRequest>,
) -> Result<Json<SongCreatorPicksResponse>, AppError> {
    validate_song_creator_picks(&payload)?;

    let txn = state.db.begin().await?;
    let competition = find_competition_for_update(&txn, id).await?;
    require_manage(&auth_user, &competition)?;

    let ranked: Vec<(i32, Option<String>)> = payload
        .picks
        .into_iter()
        .map(|p| (p.submission_id, p.comment))
        .collect();
    round2::record_song_creator_picks(&txn, id, &ranked).await?;
    txn.commit().await?;

    get_song_creator_picks(auth_user, State(state), Path(id)).await
}
