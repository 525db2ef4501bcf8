pub mod competition;
pub mod hash;
pub mod jwt;
