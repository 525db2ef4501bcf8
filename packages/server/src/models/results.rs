use chrono::{DateTime, Utc};
use serde::Serialize;

/// Per-group voting progress on the dashboard.
#[derive(Serialize, utoipa::ToSchema)]
pub struct GroupProgress {
    pub group_number: i32,
    /// Entries in this group.
    pub submissions: u64,
    /// Voters assigned to judge this group.
    pub voters_assigned: u64,
    /// Of those, how many have completed their ballot.
    pub voters_completed: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RecentVoter {
    pub username: String,
    pub voting_completed_at: DateTime<Utc>,
}

/// Live progress view of a competition. Counts degrade to zeros for phases
/// whose data does not exist yet.
#[derive(Serialize, utoipa::ToSchema)]
pub struct DashboardResponse {
    pub competition_id: i32,
    #[schema(example = "voting_round1_open")]
    pub status: String,
    pub submissions: u64,
    pub disqualified: u64,
    pub group_count: u64,
    pub voters_total: u64,
    pub voters_completed: u64,
    /// Percentage of voters who have completed their ballot, 2 decimals.
    #[schema(example = 66.67)]
    pub completion_percent: f64,
    pub groups: Vec<GroupProgress>,
    /// Most recent completed voters, newest first, at most 10.
    pub recent_voters: Vec<RecentVoter>,
}

/// One submission's line in a group standings table.
#[derive(Serialize, utoipa::ToSchema)]
pub struct StandingEntry {
    pub submission_id: i32,
    pub title: String,
    pub username: String,
    pub first_place_votes: i32,
    pub second_place_votes: i32,
    pub third_place_votes: i32,
    pub total_points: i32,
    /// `null` until tallied, and for disqualified entries.
    pub rank_in_group: Option<i32>,
    pub is_disqualified: bool,
    pub advanced_to_round2: bool,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct GroupStanding {
    pub group_number: i32,
    pub entries: Vec<StandingEntry>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct FinalistEntry {
    pub submission_id: i32,
    pub title: String,
    pub username: String,
    pub final_score: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct WinnerInfo {
    pub submission_id: i32,
    pub title: String,
    pub username: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PickInfo {
    pub rank: i32,
    pub submission_id: i32,
    pub title: String,
    pub comment: Option<String>,
}

/// Standings and outcome view. Group standings appear once Round-1 groups
/// exist; finalists, winner, and picks appear as the later phases produce
/// them.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ResultsResponse {
    pub competition_id: i32,
    #[schema(example = "completed")]
    pub status: String,
    pub group_standings: Vec<GroupStanding>,
    pub finalists: Vec<FinalistEntry>,
    pub winner: Option<WinnerInfo>,
    pub song_creator_picks: Vec<PickInfo>,
}
