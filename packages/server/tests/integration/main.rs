mod common;

mod auth;
mod competition;
mod results;
mod round1;
