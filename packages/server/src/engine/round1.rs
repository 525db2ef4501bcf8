use std::collections::{BTreeMap, HashMap, HashSet};

use sea_orm::prelude::Expr;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait,
};
use tracing::info;

use crate::engine::scoring::{RANK_POINTS, ScoreRow, VoteOutcome, aggregate_votes, rank_score_rows};
use crate::engine::status::CompetitionStatus;
use crate::entity::{round_assignment, submission, submission_group, vote};
use crate::error::AppError;
use crate::utils::competition::{find_competition, require_status};

/// Record a voter's complete Round-1 ballot: 1st/2nd/3rd over three distinct
/// submissions in the voter's assigned group.
///
/// Runs in its own transaction with a `FOR UPDATE` lock on the voter's
/// assignment row, so a double-submit race can never record two vote sets.
/// Ordinary validation failures come back as `VoteOutcome::Rejected`; only a
/// missing competition is a hard error.
pub async fn process_voter_submission(
    db: &DatabaseConnection,
    competition_id: i32,
    voter_id: i32,
    first_id: i32,
    second_id: i32,
    third_id: i32,
) -> Result<VoteOutcome, AppError> {
    let txn = db.begin().await?;

    let competition = find_competition(&txn, competition_id).await?;
    require_status(&competition, CompetitionStatus::VotingRound1Open)?;

    // The lock is the exactly-once guard: a concurrent submit for the same
    // voter blocks here and then fails the has_voted check.
    let Some(assignment) = round_assignment::Entity::find()
        .filter(round_assignment::Column::CompetitionId.eq(competition_id))
        .filter(round_assignment::Column::VoterUserId.eq(voter_id))
        .lock(LockType::Update)
        .one(&txn)
        .await?
    else {
        return Ok(VoteOutcome::rejected(
            "You have no judging assignment in this competition",
        ));
    };

    if assignment.has_voted {
        return Ok(VoteOutcome::rejected(
            "You have already voted in this round",
        ));
    }

    let ranked_ids = [first_id, second_id, third_id];
    if ranked_ids.iter().collect::<HashSet<_>>().len() != 3 {
        return Ok(VoteOutcome::rejected(
            "1st, 2nd, and 3rd place must be three different submissions",
        ));
    }

    for (&submission_id, &points) in ranked_ids.iter().zip(RANK_POINTS.iter()) {
        let Some(entry) = submission::Entity::find_by_id(submission_id).one(&txn).await? else {
            return Ok(VoteOutcome::rejected(format!(
                "Submission {submission_id} does not exist"
            )));
        };
        if entry.competition_id != competition_id {
            return Ok(VoteOutcome::rejected(format!(
                "Submission {submission_id} is not part of this competition"
            )));
        }
        if entry.user_id == voter_id {
            return Ok(VoteOutcome::rejected(
                "You may not vote for your own submission",
            ));
        }
        if entry.is_disqualified {
            return Ok(VoteOutcome::rejected(format!(
                "Submission {submission_id} has been disqualified"
            )));
        }

        let group = submission_group::Entity::find()
            .filter(submission_group::Column::CompetitionId.eq(competition_id))
            .filter(submission_group::Column::SubmissionId.eq(submission_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "Submission {submission_id} has no group row in competition {competition_id}"
                ))
            })?;
        if group.group_number != assignment.assigned_group_number {
            return Ok(VoteOutcome::rejected(format!(
                "Submission {submission_id} is outside your assigned group"
            )));
        }

        vote::ActiveModel {
            competition_id: Set(competition_id),
            voter_user_id: Set(voter_id),
            round: Set(1),
            submission_id: Set(submission_id),
            points: Set(points),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    let mut active: round_assignment::ActiveModel = assignment.into();
    active.has_voted = Set(true);
    active.voting_completed_at = Set(Some(chrono::Utc::now()));
    active.update(&txn).await?;

    txn.commit().await?;

    info!(competition_id, voter_id, "Recorded Round-1 vote set");
    Ok(VoteOutcome::Accepted)
}

/// Disqualify the entries of every voter who failed to complete their
/// judging duty. The penalty targets the non-voter's own submission, never
/// the group they neglected. Returns how many entries were disqualified.
///
/// Idempotent: already-disqualified entries are not counted again.
pub async fn disqualify_non_voters(
    txn: &DatabaseTransaction,
    competition_id: i32,
) -> Result<u64, AppError> {
    let non_voters: Vec<i32> = round_assignment::Entity::find()
        .filter(round_assignment::Column::CompetitionId.eq(competition_id))
        .filter(round_assignment::Column::HasVoted.eq(false))
        .select_only()
        .column(round_assignment::Column::VoterUserId)
        .into_tuple()
        .all(txn)
        .await?;

    if non_voters.is_empty() {
        return Ok(0);
    }

    let result = submission::Entity::update_many()
        .filter(submission::Column::CompetitionId.eq(competition_id))
        .filter(submission::Column::UserId.is_in(non_voters))
        .filter(submission::Column::IsDisqualified.eq(false))
        .col_expr(submission::Column::IsDisqualified, Expr::value(true))
        .exec(txn)
        .await?;

    info!(
        competition_id,
        disqualified = result.rows_affected,
        "Disqualified non-voters' entries"
    );

    Ok(result.rows_affected)
}

/// Tally Round 1 from the raw vote rows, write the per-group cache, rank
/// each group, and mark the configured top-K per group as advancing.
/// Returns the total number of advancing submissions.
///
/// Derivation from raw votes makes this idempotent: re-running it (for
/// example after a further disqualification) recomputes every rank and
/// advancement flag from scratch.
pub async fn tally_round1(
    txn: &DatabaseTransaction,
    competition_id: i32,
    advancers_per_group: usize,
) -> Result<u64, AppError> {
    let group_rows = submission_group::Entity::find()
        .filter(submission_group::Column::CompetitionId.eq(competition_id))
        .all(txn)
        .await?;
    if group_rows.is_empty() {
        return Err(AppError::InvalidState(
            "Round-1 groups have not been created for this competition".into(),
        ));
    }

    let submissions = submission::Entity::find()
        .filter(submission::Column::CompetitionId.eq(competition_id))
        .all(txn)
        .await?;
    let disqualified: HashSet<i32> = submissions
        .iter()
        .filter(|s| s.is_disqualified)
        .map(|s| s.id)
        .collect();

    let votes = vote::Entity::find()
        .filter(vote::Column::CompetitionId.eq(competition_id))
        .filter(vote::Column::Round.eq(1))
        .all(txn)
        .await?;
    let mut aggregates = aggregate_votes(votes.iter().map(|v| (v.submission_id, v.points)));

    // Rankable rows per group; disqualified entries keep their cached
    // aggregates but are excluded from ranking and advancement.
    let mut rankable: BTreeMap<i32, Vec<ScoreRow>> = BTreeMap::new();
    for group_row in &group_rows {
        let score = aggregates
            .remove(&group_row.submission_id)
            .unwrap_or_else(|| ScoreRow::new(group_row.submission_id));
        if !disqualified.contains(&group_row.submission_id) {
            rankable
                .entry(group_row.group_number)
                .or_default()
                .push(score.clone());
        }
        let mut active: submission_group::ActiveModel = group_row.clone().into();
        active.first_place_votes = Set(score.first_place_votes);
        active.second_place_votes = Set(score.second_place_votes);
        active.third_place_votes = Set(score.third_place_votes);
        active.total_points = Set(score.total_points);
        active.rank_in_group = Set(None);
        active.update(txn).await?;
    }

    let mut advanced: HashMap<i32, i32> = HashMap::new(); // submission_id -> total
    let mut ranked_totals: HashMap<i32, i32> = HashMap::new();
    for rows in rankable.values_mut() {
        rank_score_rows(rows);
        for (index, row) in rows.iter().enumerate() {
            submission_group::Entity::update_many()
                .filter(submission_group::Column::CompetitionId.eq(competition_id))
                .filter(submission_group::Column::SubmissionId.eq(row.submission_id))
                .col_expr(
                    submission_group::Column::RankInGroup,
                    Expr::value(Some(index as i32 + 1)),
                )
                .exec(txn)
                .await?;
            ranked_totals.insert(row.submission_id, row.total_points);
            if index < advancers_per_group {
                advanced.insert(row.submission_id, row.total_points);
            }
        }
    }

    for entry in &submissions {
        let mut active: submission::ActiveModel = entry.clone().into();
        active.advanced_to_round2 = Set(advanced.contains_key(&entry.id));
        active.round1_score = Set(ranked_totals.get(&entry.id).copied());
        active.update(txn).await?;
    }

    info!(
        competition_id,
        groups = rankable.len(),
        advanced = advanced.len(),
        "Tallied Round 1 and marked advancers"
    );

    Ok(advanced.len() as u64)
}
