use std::fmt;

use sea_orm::{DatabaseConnection, PaginatorTrait, Set, TransactionTrait};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter};
use tracing::{info, warn};

use crate::config::VotingConfig;
use crate::engine::{grouping, round1, round2};
use crate::entity::{competition, submission_group};
use crate::error::AppError;
use crate::utils::competition::{find_competition_for_update, parse_status};

/// Competition lifecycle status. Stored as its snake_case string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompetitionStatus {
    Upcoming,
    OpenForSubmissions,
    VotingRound1Setup,
    VotingRound1Open,
    VotingRound1Tallying,
    VotingRound2Setup,
    VotingRound2Open,
    VotingRound2Tallying,
    Completed,
    RequiresManualWinnerSelection,
    Archived,
}

impl CompetitionStatus {
    pub const ALL: [CompetitionStatus; 11] = [
        CompetitionStatus::Upcoming,
        CompetitionStatus::OpenForSubmissions,
        CompetitionStatus::VotingRound1Setup,
        CompetitionStatus::VotingRound1Open,
        CompetitionStatus::VotingRound1Tallying,
        CompetitionStatus::VotingRound2Setup,
        CompetitionStatus::VotingRound2Open,
        CompetitionStatus::VotingRound2Tallying,
        CompetitionStatus::Completed,
        CompetitionStatus::RequiresManualWinnerSelection,
        CompetitionStatus::Archived,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CompetitionStatus::Upcoming => "upcoming",
            CompetitionStatus::OpenForSubmissions => "open_for_submissions",
            CompetitionStatus::VotingRound1Setup => "voting_round1_setup",
            CompetitionStatus::VotingRound1Open => "voting_round1_open",
            CompetitionStatus::VotingRound1Tallying => "voting_round1_tallying",
            CompetitionStatus::VotingRound2Setup => "voting_round2_setup",
            CompetitionStatus::VotingRound2Open => "voting_round2_open",
            CompetitionStatus::VotingRound2Tallying => "voting_round2_tallying",
            CompetitionStatus::Completed => "completed",
            CompetitionStatus::RequiresManualWinnerSelection => "requires_manual_winner_selection",
            CompetitionStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl fmt::Display for CompetitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine work bound to a status transition. Executed inside the same
/// transaction that persists the new status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
    None,
    /// Partition submissions into groups and assign judging duties.
    AssignRound1Groups,
    /// Disqualify non-voters, then tally Round 1 and mark advancers.
    TallyRound1,
    /// Verify the finalist pool is non-empty before opening Round 2.
    SetupRound2,
    /// Tally Round 2. The resulting status is `Completed` or
    /// `RequiresManualWinnerSelection`, never `VotingRound2Tallying`.
    TallyRound2,
}

/// The transition table: the unique next status for each current status and
/// the engine work that transition requires.
///
/// `RequiresManualWinnerSelection` and `Archived` have no automatic next hop;
/// the former is resolved only by the manual select-winner operation.
pub fn next_transition(
    current: CompetitionStatus,
) -> Option<(CompetitionStatus, TransitionEffect)> {
    use CompetitionStatus::*;
    match current {
        Upcoming => Some((OpenForSubmissions, TransitionEffect::None)),
        OpenForSubmissions => Some((VotingRound1Setup, TransitionEffect::AssignRound1Groups)),
        VotingRound1Setup => Some((VotingRound1Open, TransitionEffect::None)),
        VotingRound1Open => Some((VotingRound1Tallying, TransitionEffect::TallyRound1)),
        VotingRound1Tallying => Some((VotingRound2Setup, TransitionEffect::None)),
        VotingRound2Setup => Some((VotingRound2Open, TransitionEffect::SetupRound2)),
        VotingRound2Open => Some((VotingRound2Tallying, TransitionEffect::TallyRound2)),
        VotingRound2Tallying => Some((Completed, TransitionEffect::None)),
        Completed => Some((Archived, TransitionEffect::None)),
        RequiresManualWinnerSelection | Archived => None,
    }
}

/// Advance a competition to its next status, running the transition's engine
/// work in the same transaction. Returns `(previous, new)`.
///
/// The `FOR UPDATE` lock on the competition row serializes concurrent
/// advance requests, so group assignment and tallies never run twice
/// concurrently for the same competition.
///
/// `requested` lets callers assert which status they expect to land on;
/// a mismatch (phase skipping) is rejected without side effects.
pub async fn advance_competition(
    db: &DatabaseConnection,
    voting: &VotingConfig,
    competition_id: i32,
    requested: Option<CompetitionStatus>,
) -> Result<(CompetitionStatus, CompetitionStatus), AppError> {
    let txn = db.begin().await?;
    let competition = find_competition_for_update(&txn, competition_id).await?;
    let current = parse_status(&competition)?;

    if current == CompetitionStatus::RequiresManualWinnerSelection {
        return Err(AppError::InvalidState(
            "Manual winner selection is required before this competition can advance".into(),
        ));
    }

    let Some((next, effect)) = next_transition(current) else {
        return Err(AppError::InvalidState(format!(
            "Competition is '{current}' and cannot advance further"
        )));
    };

    if let Some(requested) = requested
        && requested != next
    {
        return Err(AppError::InvalidTransition {
            from: current.to_string(),
            to: requested.to_string(),
        });
    }

    let mut resulting = next;
    match effect {
        TransitionEffect::None => {}
        TransitionEffect::AssignRound1Groups => {
            // Groups may have been pre-created via the explicit endpoint
            // with a custom target size; don't create them twice.
            let existing = submission_group::Entity::find()
                .filter(submission_group::Column::CompetitionId.eq(competition_id))
                .count(&txn)
                .await?;
            if existing == 0 {
                grouping::create_groups_and_assign_voters(
                    &txn,
                    competition_id,
                    voting.target_group_size as usize,
                )
                .await?;
            }
        }
        TransitionEffect::TallyRound1 => {
            round1::disqualify_non_voters(&txn, competition_id).await?;
            round1::tally_round1(
                &txn,
                competition_id,
                voting.round1_advancers_per_group as usize,
            )
            .await?;
        }
        TransitionEffect::SetupRound2 => {
            round2::setup_round2(&txn, competition_id).await?;
        }
        TransitionEffect::TallyRound2 => {
            let (_, is_tie) = round2::tally_round2(&txn, competition_id).await?;
            resulting = if is_tie {
                CompetitionStatus::RequiresManualWinnerSelection
            } else {
                CompetitionStatus::Completed
            };
        }
    }

    let mut active: competition::ActiveModel = competition.into();
    active.status = Set(resulting.as_str().to_string());
    active.updated_at = Set(chrono::Utc::now());
    active.update(&txn).await?;
    txn.commit().await?;

    info!(
        competition_id,
        from = %current,
        to = %resulting,
        "Advanced competition status"
    );

    Ok((current, resulting))
}

/// Administrative escape hatch: set any status, bypassing the transition
/// table. Audited via the warn-level log line.
pub async fn force_status(
    db: &DatabaseConnection,
    competition_id: i32,
    target: CompetitionStatus,
    actor_user_id: i32,
) -> Result<(CompetitionStatus, CompetitionStatus), AppError> {
    let txn = db.begin().await?;
    let competition = find_competition_for_update(&txn, competition_id).await?;
    let current = parse_status(&competition)?;

    let mut active: competition::ActiveModel = competition.into();
    active.status = Set(target.as_str().to_string());
    active.updated_at = Set(chrono::Utc::now());
    active.update(&txn).await?;
    txn.commit().await?;

    warn!(
        competition_id,
        actor_user_id,
        from = %current,
        to = %target,
        "Status override applied, bypassing transition validation"
    );

    Ok((current, target))
}
