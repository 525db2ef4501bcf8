pub mod auth;
pub mod competition;
pub mod results;
pub mod submission;
pub mod voting;
