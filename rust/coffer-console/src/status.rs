use serde::{Deserialize, Serialize};

/// Progress of one user-triggered operation.
///
/// Every operation starts [`Idle`](Self::Idle), moves to
/// [`Loading`](Self::Loading) when triggered and settles in
/// [`Succeeded`](Self::Succeeded) or [`Failed`](Self::Failed). The next
/// trigger moves it back to `Loading`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus<T> {
    Idle,
    Loading,
    Succeeded(T),
    Failed(String),
}

impl<T> Default for OperationStatus<T> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T> OperationStatus<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// The value of a successful operation.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Succeeded(value) => Some(value),
            _ => None,
        }
    }

    /// The message of a failed operation.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

impl<T, E> From<Result<T, E>> for OperationStatus<T>
where
    E: std::fmt::Display,
{
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Succeeded(value),
            Err(error) => Self::Failed(error.to_string()),
        }
    }
}
