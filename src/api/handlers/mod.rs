pub mod attendance;
pub mod auth;
pub mod cohort;
pub mod filter;
pub mod health;
pub mod me;
pub mod student;
