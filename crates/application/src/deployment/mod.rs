pub mod binder;
pub mod deploy;
pub mod templates;

pub use binder::{BoundVolumes, DeploymentBinder, collect_claim_references};
pub use deploy::{DeployConfigUseCase, DeployRequest, filter_by_submit_type};
pub use templates::{
    TemplateValues, apply_job_deadline, default_queue_for_resources, enforce_read_only,
    inject_job_labels, render_placeholders,
};
