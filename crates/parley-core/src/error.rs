use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// Actor missing, not a member, or lacking the required role.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Already a member of this workspace")]
    AlreadyMember,

    #[error("Invalid join code")]
    InvalidCode,

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
