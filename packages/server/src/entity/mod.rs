pub mod competition;
pub mod role;
pub mod role_permission;
pub mod round_assignment;
pub mod song_creator_pick;
pub mod submission;
pub mod submission_group;
pub mod user;
pub mod vote;
