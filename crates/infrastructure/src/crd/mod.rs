pub mod flash_job;

pub use flash_job::{FlashJob, FlashJobCondition, FlashJobSpec, FlashJobStatus};
