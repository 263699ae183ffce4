pub mod user_repo;
pub use user_repo::UserRepository;
pub mod custom_field_repo;
pub use custom_field_repo::CustomFieldRepository;
pub mod field_value_repo;
pub use field_value_repo::FieldValueRepository;
pub mod crm_repo;
pub use crm_repo::{CrmRecord, CrmRepository};
pub mod pipeline_repo;
pub use pipeline_repo::PipelineRepository;
pub mod audit_repo;
pub use audit_repo::AuditRepository;
