use std::collections::HashSet;

use sea_orm::prelude::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, Set, TransactionTrait,
};
use tracing::info;

use crate::config::Round2VoterPolicy;
use crate::engine::scoring::{
    FinalOutcome, RANK_POINTS, VoteOutcome, aggregate_votes, final_outcome, rank_score_rows,
};
use crate::engine::status::CompetitionStatus;
use crate::entity::{competition, song_creator_pick, submission, vote};
use crate::error::AppError;
use crate::utils::competition::{find_competition_for_update, require_status};

/// Verify the Round-2 finalist pool before voting opens. All Round-1
/// advancers form a single competition-wide group; no further partitioning
/// happens. Returns the finalist count.
pub async fn setup_round2(
    txn: &DatabaseTransaction,
    competition_id: i32,
) -> Result<u64, AppError> {
    let finalists = submission::Entity::find()
        .filter(submission::Column::CompetitionId.eq(competition_id))
        .filter(submission::Column::AdvancedToRound2.eq(true))
        .filter(submission::Column::IsDisqualified.eq(false))
        .count(txn)
        .await?;

    if finalists == 0 {
        return Err(AppError::InvalidState(
            "No submissions advanced to Round 2; run the Round-1 tally first".into(),
        ));
    }

    info!(competition_id, finalists, "Round-2 finalist pool ready");
    Ok(finalists)
}

/// The named Round-2 eligibility predicate. A user may vote in the final if
/// they hold a non-disqualified entry in the competition and, under the
/// `finalists_only` policy, that entry advanced. Voting for one's own entry
/// is rejected separately at ballot validation.
pub async fn is_user_eligible_for_round2_voting<C: ConnectionTrait>(
    db: &C,
    competition_id: i32,
    user_id: i32,
    policy: Round2VoterPolicy,
) -> Result<bool, AppError> {
    let entry = submission::Entity::find()
        .filter(submission::Column::CompetitionId.eq(competition_id))
        .filter(submission::Column::UserId.eq(user_id))
        .filter(submission::Column::IsDisqualified.eq(false))
        .one(db)
        .await?;

    Ok(match entry {
        None => false,
        Some(entry) => match policy {
            Round2VoterPolicy::FinalistsOnly => entry.advanced_to_round2,
            Round2VoterPolicy::AllEntrants => true,
        },
    })
}

/// Record a voter's complete Round-2 ballot over the finalist pool, with the
/// same 3/2/1 weighting and exactly-once discipline as Round 1. The
/// competition row lock serializes concurrent submits for the same voter.
pub async fn process_round2_votes(
    db: &DatabaseConnection,
    competition_id: i32,
    voter_id: i32,
    first_id: i32,
    second_id: i32,
    third_id: i32,
    policy: Round2VoterPolicy,
) -> Result<VoteOutcome, AppError> {
    let txn = db.begin().await?;

    let competition = find_competition_for_update(&txn, competition_id).await?;
    require_status(&competition, CompetitionStatus::VotingRound2Open)?;

    if !is_user_eligible_for_round2_voting(&txn, competition_id, voter_id, policy).await? {
        return Ok(VoteOutcome::rejected(
            "You are not eligible to vote in the final round",
        ));
    }

    let already = vote::Entity::find()
        .filter(vote::Column::CompetitionId.eq(competition_id))
        .filter(vote::Column::Round.eq(2))
        .filter(vote::Column::VoterUserId.eq(voter_id))
        .count(&txn)
        .await?;
    if already > 0 {
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
        if entry.competition_id != competition_id
            || !entry.advanced_to_round2
            || entry.is_disqualified
        {
            return Ok(VoteOutcome::rejected(format!(
                "Submission {submission_id} is not in the finalist pool"
            )));
        }
        if entry.user_id == voter_id {
            return Ok(VoteOutcome::rejected(
                "You may not vote for your own submission",
            ));
        }

        vote::ActiveModel {
            competition_id: Set(competition_id),
            voter_user_id: Set(voter_id),
            round: Set(2),
            submission_id: Set(submission_id),
            points: Set(points),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    info!(competition_id, voter_id, "Recorded Round-2 vote set");
    Ok(VoteOutcome::Accepted)
}

/// Tally Round 2 from the raw vote rows, write each finalist's
/// `final_score`, and determine the outcome.
///
/// Returns `(winning_submission_id, is_tie)`. A true tie — two or more
/// finalists sharing the maximum total with equal first-place-vote counts —
/// yields `(0, true)` and clears any previously set winner; the caller
/// routes the competition to manual winner selection. Re-derivation from
/// votes keeps repeated invocations byte-identical.
pub async fn tally_round2(
    txn: &DatabaseTransaction,
    competition_id: i32,
) -> Result<(i32, bool), AppError> {
    let finalists = submission::Entity::find()
        .filter(submission::Column::CompetitionId.eq(competition_id))
        .filter(submission::Column::AdvancedToRound2.eq(true))
        .filter(submission::Column::IsDisqualified.eq(false))
        .all(txn)
        .await?;
    if finalists.is_empty() {
        return Err(AppError::InvalidState(
            "No finalists to tally; run the Round-1 tally first".into(),
        ));
    }

    let votes = vote::Entity::find()
        .filter(vote::Column::CompetitionId.eq(competition_id))
        .filter(vote::Column::Round.eq(2))
        .all(txn)
        .await?;
    let mut aggregates = aggregate_votes(votes.iter().map(|v| (v.submission_id, v.points)));

    let mut rows = Vec::with_capacity(finalists.len());
    for finalist in &finalists {
        let score = aggregates
            .remove(&finalist.id)
            .unwrap_or_else(|| crate::engine::scoring::ScoreRow::new(finalist.id));
        let mut active: submission::ActiveModel = finalist.clone().into();
        active.final_score = Set(Some(score.total_points));
        active.update(txn).await?;
        rows.push(score);
    }

    rank_score_rows(&mut rows);
    let outcome = final_outcome(&rows).ok_or_else(|| {
        AppError::Internal(format!(
            "Round-2 tally produced no outcome for competition {competition_id}"
        ))
    })?;

    let (winner_id, is_tie) = match outcome {
        FinalOutcome::Winner(id) => (id, false),
        FinalOutcome::TrueTie => (0, true),
    };

    let winner_value: Option<i32> = (!is_tie).then_some(winner_id);
    competition::Entity::update_many()
        .filter(competition::Column::Id.eq(competition_id))
        .col_expr(
            competition::Column::WinnerSubmissionId,
            Expr::value(winner_value),
        )
        .exec(txn)
        .await?;

    info!(
        competition_id,
        winner_id, is_tie, "Tallied Round 2"
    );

    Ok((winner_id, is_tie))
}

/// Assign the competition winner, manually (after a true tie) or as part of
/// the automatic path. Validates that the submission belongs to the
/// competition's finalist pool, then marks the competition completed.
pub async fn set_competition_winner(
    txn: &DatabaseTransaction,
    competition: competition::Model,
    submission_id: i32,
) -> Result<(), AppError> {
    let finalist = submission::Entity::find_by_id(submission_id)
        .one(txn)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))?;

    if finalist.competition_id != competition.id
        || !finalist.advanced_to_round2
        || finalist.is_disqualified
    {
        return Err(AppError::Validation(
            "The chosen submission is not in this competition's finalist pool".into(),
        ));
    }

    let competition_id = competition.id;
    let mut active: competition::ActiveModel = competition.into();
    active.winner_submission_id = Set(Some(submission_id));
    active.status = Set(CompetitionStatus::Completed.as_str().to_string());
    active.updated_at = Set(chrono::Utc::now());
    active.update(txn).await?;

    info!(competition_id, submission_id, "Competition winner set");
    Ok(())
}

/// Replace the organizer's advisory pick list for Round 2. Ranks follow the
/// order of `ranked`: first element is the 1st pick. The picks never feed
/// the automatic tally. Returns the number of picks recorded.
pub async fn record_song_creator_picks(
    txn: &DatabaseTransaction,
    competition_id: i32,
    ranked: &[(i32, Option<String>)],
) -> Result<usize, AppError> {
    if ranked.is_empty() || ranked.len() > 3 {
        return Err(AppError::Validation(
            "Song creator picks must rank between 1 and 3 submissions".into(),
        ));
    }
    let distinct: HashSet<i32> = ranked.iter().map(|(id, _)| *id).collect();
    if distinct.len() != ranked.len() {
        return Err(AppError::Validation(
            "Song creator picks must be distinct submissions".into(),
        ));
    }

    for &(submission_id, _) in ranked {
        let entry = submission::Entity::find_by_id(submission_id)
            .one(txn)
            .await?
            .ok_or_else(|| AppError::NotFound("Submission not found".into()))?;
        if entry.competition_id != competition_id
            || !entry.advanced_to_round2
            || entry.is_disqualified
        {
            return Err(AppError::Validation(format!(
                "Submission {submission_id} is not in the finalist pool"
            )));
        }
    }

    song_creator_pick::Entity::delete_many()
        .filter(song_creator_pick::Column::CompetitionId.eq(competition_id))
        .exec(txn)
        .await?;

    for (index, (submission_id, comment)) in ranked.iter().enumerate() {
        song_creator_pick::ActiveModel {
            competition_id: Set(competition_id),
            submission_id: Set(*submission_id),
            rank: Set(index as i32 + 1),
            comment: Set(comment.clone()),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(txn)
        .await?;
    }

    info!(
        competition_id,
        picks = ranked.len(),
        "Recorded song creator picks"
    );
    Ok(ranked.len())
}
