use thiserror::Error;

/// Failure surface shared by the external repository collaborators. The
/// storage technology behind them is deliberately out of scope; everything
/// the core needs to know is that a call did not complete.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
