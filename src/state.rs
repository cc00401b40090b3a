use std::sync::Arc;
use crate::domain::ports::{
    AccountRepository, AttendanceRepository, CohortRepository,
    EmailService, FilterRepository, StudentRepository, VerificationRepository,
};
use crate::domain::services::{
    attendance_workflow::AttendanceWorkflow,
    auth_service::AuthService,
    registration::RegistrationService,
    summary::SummaryService,
    verification_service::VerificationService,
};
use crate::config::Config;
use tera::Tera;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub account_repo: Arc<dyn AccountRepository>,
    pub cohort_repo: Arc<dyn CohortRepository>,
    pub student_repo: Arc<dyn StudentRepository>,
    pub attendance_repo: Arc<dyn AttendanceRepository>,
    pub verification_repo: Arc<dyn VerificationRepository>,
    pub filter_repo: Arc<dyn FilterRepository>,
    pub auth_service: Arc<AuthService>,
    pub email_service: Arc<dyn EmailService>,
    pub templates: Arc<Tera>,
}

impl AppState {
    pub fn workflow(&self) -> AttendanceWorkflow {
        AttendanceWorkflow::new(self.attendance_repo.clone())
    }

    pub fn summary(&self) -> SummaryService {
        SummaryService::new(self.cohort_repo.clone(), self.student_repo.clone(), self.attendance_repo.clone())
    }

    pub fn registration(&self) -> RegistrationService {
        RegistrationService::new(self.account_repo.clone(), self.student_repo.clone())
    }

    pub fn verification(&self) -> VerificationService {
        VerificationService::new(self.verification_repo.clone(), self.email_service.clone(), self.templates.clone())
    }
}
