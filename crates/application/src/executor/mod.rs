pub mod scheduler;

pub use scheduler::{ResourcePayload, SchedulerExecutor, SubmitRequest, SubmitResponse};
