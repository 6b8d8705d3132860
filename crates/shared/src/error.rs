#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Invalid job status: {value}")]
    InvalidJobStatus { value: String },

    #[error("Invalid submit type: {value}")]
    InvalidSubmitType { value: String },
}
