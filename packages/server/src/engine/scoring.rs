use std::collections::HashMap;

/// Points awarded per rank: 1st = 3, 2nd = 2, 3rd = 1.
pub const RANK_POINTS: [i32; 3] = [3, 2, 1];

/// Outcome of a vote submission. Ordinary validation failures are a value,
/// not an error, so callers can surface the reason to the voter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    Accepted,
    Rejected(String),
}

impl VoteOutcome {
    pub fn rejected(reason: impl Into<String>) -> Self {
        VoteOutcome::Rejected(reason.into())
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, VoteOutcome::Accepted)
    }
}

/// Per-submission aggregate derived from raw vote rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreRow {
    pub submission_id: i32,
    pub first_place_votes: i32,
    pub second_place_votes: i32,
    pub third_place_votes: i32,
    pub total_points: i32,
}

impl ScoreRow {
    pub fn new(submission_id: i32) -> Self {
        ScoreRow {
            submission_id,
            ..Default::default()
        }
    }

    fn add(&mut self, points: i32) {
        match points {
            3 => self.first_place_votes += 1,
            2 => self.second_place_votes += 1,
            1 => self.third_place_votes += 1,
            _ => {}
        }
        self.total_points += points;
    }
}

/// Fold `(submission_id, points)` pairs into per-submission aggregates.
pub fn aggregate_votes(votes: impl IntoIterator<Item = (i32, i32)>) -> HashMap<i32, ScoreRow> {
    let mut rows: HashMap<i32, ScoreRow> = HashMap::new();
    for (submission_id, points) in votes {
        rows.entry(submission_id)
            .or_insert_with(|| ScoreRow::new(submission_id))
            .add(points);
    }
    rows
}

/// Sort score rows into ranking order: total points descending, then
/// first-place votes, then second-place votes, with submission id as the
/// stable final key. Deterministic for any input order.
pub fn rank_score_rows(rows: &mut [ScoreRow]) {
    rows.sort_by(|a, b| {
        b.total_points
            .cmp(&a.total_points)
            .then(b.first_place_votes.cmp(&a.first_place_votes))
            .then(b.second_place_votes.cmp(&a.second_place_votes))
            .then(a.submission_id.cmp(&b.submission_id))
    });
}

/// Result of ranking the Round-2 finalists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalOutcome {
    Winner(i32),
    /// Two or more finalists share the maximum total AND the maximum
    /// first-place-vote count; no deterministic winner exists.
    TrueTie,
}

/// Determine the final outcome from rows already sorted by `rank_score_rows`.
///
/// The submission-id fallback in the sort keeps rankings stable for display,
/// but it is not a legitimate tie-breaker for the title: a shared maximum
/// total with a shared first-place count is a true tie.
pub fn final_outcome(ranked: &[ScoreRow]) -> Option<FinalOutcome> {
    let leader = ranked.first()?;
    let tied = ranked.iter().skip(1).any(|row| {
        row.total_points == leader.total_points
            && row.first_place_votes == leader.first_place_votes
    });
    Some(if tied {
        FinalOutcome::TrueTie
    } else {
        FinalOutcome::Winner(leader.submission_id)
    })
}

/// Voting completion percentage, rounded to 2 decimal places for display.
/// Stored counts stay exact integers; only this derived figure is rounded.
pub fn completion_percent(completed: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = completed as f64 / total as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}
