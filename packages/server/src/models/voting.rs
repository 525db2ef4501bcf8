use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::scoring::VoteOutcome;
use crate::error::AppError;

/// Request body for explicit judging-group creation.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct CreateGroupsRequest {
    /// Overrides the configured target group size for this competition.
    #[schema(example = 20)]
    pub target_group_size: Option<u32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CreateGroupsResponse {
    #[schema(example = 3)]
    pub group_count: u32,
}

/// One entry on a voter's judging slate.
#[derive(Serialize, utoipa::ToSchema)]
pub struct BallotEntry {
    pub submission_id: i32,
    pub title: String,
    pub audio_ref: Uuid,
    pub username: String,
}

/// The caller's Round-1 judging assignment and the slate to rate.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AssignmentResponse {
    /// Group containing the caller's own entry.
    pub voter_group_number: i32,
    /// Group the caller must judge.
    pub assigned_group_number: i32,
    pub has_voted: bool,
    pub voting_completed_at: Option<DateTime<Utc>>,
    pub submissions: Vec<BallotEntry>,
}

/// A complete ranked ballot: three distinct submissions.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct VoteRequest {
    pub first_place_submission_id: i32,
    pub second_place_submission_id: i32,
    pub third_place_submission_id: i32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct VoteResponse {
    pub accepted: bool,
    /// Rejection reason when `accepted` is false.
    pub message: Option<String>,
}

impl From<VoteOutcome> for VoteResponse {
    fn from(outcome: VoteOutcome) -> Self {
        match outcome {
            VoteOutcome::Accepted => VoteResponse {
                accepted: true,
                message: None,
            },
            VoteOutcome::Rejected(reason) => VoteResponse {
                accepted: false,
                message: Some(reason),
            },
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct DisqualifyNonVotersResponse {
    /// Number of entries newly disqualified.
    pub disqualified: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TallyRound1Response {
    /// Number of submissions marked as advancing to Round 2.
    pub advanced: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SetupRound2Response {
    /// Size of the finalist pool.
    pub finalists: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct Round2EligibilityResponse {
    pub eligible: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct TallyRound2Response {
    /// Set unless the tally ended in a true tie.
    pub winner_submission_id: Option<i32>,
    pub is_tie: bool,
    /// Resulting competition status: `completed` or
    /// `requires_manual_winner_selection`.
    pub status: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SelectWinnerRequest {
    pub submission_id: i32,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SongCreatorPickEntry {
    pub submission_id: i32,
    pub comment: Option<String>,
}

/// Replaces the organizer's advisory picks. Order is rank order: the first
/// element becomes the 1st pick.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct SongCreatorPicksRequest {
    pub picks: Vec<SongCreatorPickEntry>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SongCreatorPickResponse {
    pub rank: i32,
    pub submission_id: i32,
    pub title: String,
    pub comment: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SongCreatorPicksResponse {
    pub picks: Vec<SongCreatorPickResponse>,
}

pub fn validate_song_creator_picks(req: &SongCreatorPicksRequest) -> Result<(), AppError> {
    if req.picks.is_empty() || req.picks.len() > 3 {
        return Err(AppError::Validation(
            "Song creator picks must rank between 1 and 3 submissions".into(),
        ));
    }
    for pick in &req.picks {
        if let Some(ref comment) = pick.comment
            && comment.chars().count() > 2000
        {
            return Err(AppError::Validation(
                "Pick comments must be at most 2000 characters".into(),
            ));
        }
    }
    Ok(())
}
