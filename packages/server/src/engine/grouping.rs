use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::info;

use crate::entity::{round_assignment, submission, submission_group};
use crate::error::AppError;

/// Balanced partition: `ceil(total / target)` groups whose sizes differ by at
/// most one. 42 submissions at target 20 become three groups of 14.
pub fn partition_sizes(total: usize, target_group_size: usize) -> Vec<usize> {
    if total == 0 {
        return Vec::new();
    }
    let target = target_group_size.max(1);
    let group_count = total.div_ceil(target);
    let base = total / group_count;
    let remainder = total % group_count;
    (0..group_count)
        .map(|i| base + usize::from(i < remainder))
        .collect()
}

/// The group a voter judges: the cyclically-next group after their own.
/// Never the voter's own group when at least two groups exist, and each
/// group receives exactly one neighboring group's worth of voters.
///
/// In the single-group case this degenerates to the voter's own group;
/// self-votes are then rejected at vote validation instead.
pub fn assigned_group_for(voter_group_number: i32, group_count: i32) -> i32 {
    voter_group_number % group_count + 1
}

/// Partition all non-disqualified submissions into judging groups and assign
/// every submitter a group to judge. Returns the group count.
///
/// One `submission_group` row per submission and one `round_assignment` row
/// per submitter are created in the caller's transaction. Calling this a
/// second time for the same competition is a conflict.
pub async fn create_groups_and_assign_voters(
    txn: &DatabaseTransaction,
    competition_id: i32,
    target_group_size: usize,
) -> Result<usize, AppError> {
    let existing = submission_group::Entity::find()
        .filter(submission_group::Column::CompetitionId.eq(competition_id))
        .count(txn)
        .await?;
    if existing > 0 {
        return Err(AppError::Conflict(
            "Judging groups have already been created for this competition".into(),
        ));
    }

    // Stable order so reruns on identical data produce identical groups.
    let submissions = submission::Entity::find()
        .filter(submission::Column::CompetitionId.eq(competition_id))
        .filter(submission::Column::IsDisqualified.eq(false))
        .order_by_asc(submission::Column::Id)
        .all(txn)
        .await?;

    if submissions.is_empty() {
        return Err(AppError::Validation(
            "Cannot create judging groups: the competition has no submissions".into(),
        ));
    }

    let sizes = partition_sizes(submissions.len(), target_group_size);
    let group_count = sizes.len() as i32;

    let mut entries = submissions.iter();
    for (index, &size) in sizes.iter().enumerate() {
        let group_number = index as i32 + 1;
        for entry in entries.by_ref().take(size) {
            submission_group::ActiveModel {
                competition_id: Set(competition_id),
                submission_id: Set(entry.id),
                group_number: Set(group_number),
                first_place_votes: Set(0),
                second_place_votes: Set(0),
                third_place_votes: Set(0),
                total_points: Set(0),
                rank_in_group: Set(None),
                ..Default::default()
            }
            .insert(txn)
            .await?;

            round_assignment::ActiveModel {
                competition_id: Set(competition_id),
                voter_user_id: Set(entry.user_id),
                voter_group_number: Set(group_number),
                assigned_group_number: Set(assigned_group_for(group_number, group_count)),
                has_voted: Set(false),
                voting_completed_at: Set(None),
                ..Default::default()
            }
            .insert(txn)
            .await?;
        }
    }

    info!(
        competition_id,
        submissions = submissions.len(),
        groups = group_count,
        "Created judging groups and voter assignments"
    );

    Ok(group_count as usize)
}
