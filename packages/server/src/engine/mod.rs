//! Competition Voting & Advancement Engine.
//!
//! The modules here own every `submission_group`, `round_assignment`, `vote`,
//! and `song_creator_pick` row for the lifetime of a competition. All tallies
//! are derived from raw `vote` rows and written back as a cache, so re-running
//! any tally reproduces the same result instead of double-counting.

pub mod grouping;
pub mod results;
pub mod round1;
pub mod round2;
pub mod scoring;
pub mod status;
