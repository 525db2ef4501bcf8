use std::collections::{BTreeMap, HashMap, HashSet};

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::engine::scoring::completion_percent;
use crate::entity::{competition, round_assignment, song_creator_pick, submission, submission_group, user};
use crate::error::AppError;
use crate::models::results::{
    DashboardResponse, FinalistEntry, GroupProgress, GroupStanding, PickInfo, RecentVoter,
    ResultsResponse, StandingEntry, WinnerInfo,
};

async fn usernames_for<C: ConnectionTrait>(
    db: &C,
    user_ids: impl IntoIterator<Item = i32>,
) -> Result<HashMap<i32, String>, AppError> {
    let ids: HashSet<i32> = user_ids.into_iter().collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = user::Entity::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(users.into_iter().map(|u| (u.id, u.username)).collect())
}

/// Live progress view. Safe to call in any phase: counts for data that does
/// not exist yet come back as zeros and empty lists.
pub async fn competition_dashboard<C: ConnectionTrait>(
    db: &C,
    competition: &competition::Model,
) -> Result<DashboardResponse, AppError> {
    let submissions = submission::Entity::find()
        .filter(submission::Column::CompetitionId.eq(competition.id))
        .all(db)
        .await?;
    let disqualified = submissions.iter().filter(|s| s.is_disqualified).count() as u64;

    let group_rows = submission_group::Entity::find()
        .filter(submission_group::Column::CompetitionId.eq(competition.id))
        .all(db)
        .await?;
    let assignments = round_assignment::Entity::find()
        .filter(round_assignment::Column::CompetitionId.eq(competition.id))
        .all(db)
        .await?;

    let mut progress: BTreeMap<i32, GroupProgress> = BTreeMap::new();
    for row in &group_rows {
        progress
            .entry(row.group_number)
            .or_insert_with(|| GroupProgress {
                group_number: row.group_number,
                submissions: 0,
                voters_assigned: 0,
                voters_completed: 0,
            })
            .submissions += 1;
    }
    for assignment in &assignments {
        let entry = progress
            .entry(assignment.assigned_group_number)
            .or_insert_with(|| GroupProgress {
                group_number: assignment.assigned_group_number,
                submissions: 0,
                voters_assigned: 0,
                voters_completed: 0,
            });
        entry.voters_assigned += 1;
        if assignment.has_voted {
            entry.voters_completed += 1;
        }
    }

    let voters_total = assignments.len() as u64;
    let voters_completed = assignments.iter().filter(|a| a.has_voted).count() as u64;

    let mut completed: Vec<&round_assignment::Model> = assignments
        .iter()
        .filter(|a| a.voting_completed_at.is_some())
        .collect();
    completed.sort_by(|a, b| b.voting_completed_at.cmp(&a.voting_completed_at));
    completed.truncate(10);

    let usernames = usernames_for(db, completed.iter().map(|a| a.voter_user_id)).await?;
    let recent_voters = completed
        .into_iter()
        .filter_map(|a| {
            let at = a.voting_completed_at?;
            Some(RecentVoter {
                username: usernames
                    .get(&a.voter_user_id)
                    .cloned()
                    .unwrap_or_default(),
                voting_completed_at: at,
            })
        })
        .collect();

    Ok(DashboardResponse {
        competition_id: competition.id,
        status: competition.status.clone(),
        submissions: submissions.len() as u64,
        disqualified,
        group_count: progress.len() as u64,
        voters_total,
        voters_completed,
        completion_percent: completion_percent(voters_completed, voters_total),
        groups: progress.into_values().collect(),
        recent_voters,
    })
}

/// Standings and outcome view, assembled from the cached group tallies, the
/// finalist scores, the winner, and the organizer's advisory picks.
pub async fn competition_results<C: ConnectionTrait>(
    db: &C,
    competition: &competition::Model,
) -> Result<ResultsResponse, AppError> {
    let submissions = submission::Entity::find()
        .filter(submission::Column::CompetitionId.eq(competition.id))
        .all(db)
        .await?;
    let by_id: HashMap<i32, &submission::Model> =
        submissions.iter().map(|s| (s.id, s)).collect();
    let usernames = usernames_for(db, submissions.iter().map(|s| s.user_id)).await?;
    let username_of = |user_id: i32| usernames.get(&user_id).cloned().unwrap_or_default();

    let group_rows = submission_group::Entity::find()
        .filter(submission_group::Column::CompetitionId.eq(competition.id))
        .all(db)
        .await?;

    let mut standings: BTreeMap<i32, Vec<StandingEntry>> = BTreeMap::new();
    for row in &group_rows {
        let Some(entry) = by_id.get(&row.submission_id) else {
            continue;
        };
        standings
            .entry(row.group_number)
            .or_default()
            .push(StandingEntry {
                submission_id: entry.id,
                title: entry.title.clone(),
                username: username_of(entry.user_id),
                first_place_votes: row.first_place_votes,
                second_place_votes: row.second_place_votes,
                third_place_votes: row.third_place_votes,
                total_points: row.total_points,
                rank_in_group: row.rank_in_group,
                is_disqualified: entry.is_disqualified,
                advanced_to_round2: entry.advanced_to_round2,
            });
    }
    for entries in standings.values_mut() {
        // Ranked entries first in rank order; unranked (untallied or
        // disqualified) after, by points then id.
        entries.sort_by(|a, b| match (a.rank_in_group, b.rank_in_group) {
            (Some(ra), Some(rb)) => ra.cmp(&rb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => b
                .total_points
                .cmp(&a.total_points)
                .then(a.submission_id.cmp(&b.submission_id)),
        });
    }
    let group_standings = standings
        .into_iter()
        .map(|(group_number, entries)| GroupStanding {
            group_number,
            entries,
        })
        .collect();

    let mut finalists: Vec<&submission::Model> = submissions
        .iter()
        .filter(|s| s.advanced_to_round2 && !s.is_disqualified)
        .collect();
    // Highest final score first; unscored finalists last, by id.
    finalists.sort_by(|a, b| match (a.final_score, b.final_score) {
        (Some(sa), Some(sb)) => sb.cmp(&sa).then(a.id.cmp(&b.id)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });
    let finalists = finalists
        .into_iter()
        .map(|s| FinalistEntry {
            submission_id: s.id,
            title: s.title.clone(),
            username: username_of(s.user_id),
            final_score: s.final_score,
        })
        .collect();

    let winner = competition
        .winner_submission_id
        .and_then(|id| by_id.get(&id))
        .map(|s| WinnerInfo {
            submission_id: s.id,
            title: s.title.clone(),
            username: username_of(s.user_id),
        });

    let picks = song_creator_pick::Entity::find()
        .filter(song_creator_pick::Column::CompetitionId.eq(competition.id))
        .order_by_asc(song_creator_pick::Column::Rank)
        .all(db)
        .await?;
    let song_creator_picks = picks
        .into_iter()
        .filter_map(|p| {
            let entry = by_id.get(&p.submission_id)?;
            Some(PickInfo {
                rank: p.rank,
                submission_id: p.submission_id,
                title: entry.title.clone(),
                comment: p.comment,
            })
        })
        .collect();

    Ok(ResultsResponse {
        competition_id: competition.id,
        status: competition.status.clone(),
        group_standings,
        finalists,
        winner,
        song_creator_picks,
    })
}
