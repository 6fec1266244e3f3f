use oascheck_core::ContractError;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Spec source [{0}] is not configured")]
    UnknownSource(String),
    #[error(transparent)]
    Contract(#[from] ContractError),
}
