pub mod account;
pub mod attendance;
pub mod auth;
pub mod cohort;
pub mod filter;
pub mod student;
pub mod verification;
