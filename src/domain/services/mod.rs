pub mod attendance_workflow;
pub mod auth_service;
pub mod password;
pub mod registration;
pub mod summary;
pub mod verification_service;
