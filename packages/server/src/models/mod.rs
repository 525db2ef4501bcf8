pub mod auth;
pub mod competition;
pub mod results;
pub mod shared;
pub mod submission;
pub mod voting;
