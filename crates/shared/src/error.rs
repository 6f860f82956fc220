#[derive(thiserror::Error, Debug)]
pub enum SharedError {
    #[error("Invalid worker name '{name}': {reason}")]
    InvalidWorkerName { name: String, reason: String },
}
