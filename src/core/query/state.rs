use crate::error::{HerdbookError, Result};

/// Outcome of a query as seen by its consumer.
///
/// `NotStarted` means a precondition blocked the query (disabled, or no
/// identity) and no request was issued. `Loading` is only observed through
/// [`QueryClient::status`](super::QueryClient::status) while a fetch is in flight.
#[derive(Debug)]
pub enum QueryState<T> {
    NotStarted,
    Loading,
    Ready(T),
    Failed(HerdbookError),
}

impl<T> QueryState<T> {
    pub fn is_not_started(&self) -> bool {
        matches!(self, QueryState::NotStarted)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, QueryState::Ready(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, QueryState::Failed(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&HerdbookError> {
        match self {
            QueryState::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryState<U> {
        match self {
            QueryState::NotStarted => QueryState::NotStarted,
            QueryState::Loading => QueryState::Loading,
            QueryState::Ready(data) => QueryState::Ready(f(data)),
            QueryState::Failed(err) => QueryState::Failed(err),
        }
    }

    /// `Ok(None)` for the states that carry no data yet.
    pub fn into_result(self) -> Result<Option<T>> {
        match self {
            QueryState::Ready(data) => Ok(Some(data)),
            QueryState::Failed(err) => Err(err),
            QueryState::NotStarted | QueryState::Loading => Ok(None),
        }
    }

    /// Data, or `T::default()` when the query never started.
    pub fn into_data_or_default(self) -> Result<T>
    where
        T: Default,
    {
        self.into_result().map(Option::unwrap_or_default)
    }
}

impl<T> From<Result<T>> for QueryState<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => QueryState::Ready(data),
            Err(err) => QueryState::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_started_is_distinct_from_loading() {
        let blocked: QueryState<Vec<u32>> = QueryState::NotStarted;
        assert!(blocked.is_not_started());
        assert!(!blocked.is_loading());
        assert_eq!(blocked.into_data_or_default().unwrap(), Vec::<u32>::new());
    }

    #[test]
    fn test_failed_into_result() {
        let failed: QueryState<u32> = QueryState::Failed(HerdbookError::Cancelled);
        assert!(failed.is_failed());
        assert!(matches!(failed.into_result(), Err(HerdbookError::Cancelled)));
    }

    #[test]
    fn test_map_ready() {
        let ready = QueryState::Ready(2).map(|n| n * 21);
        assert_eq!(ready.data(), Some(&42));
    }
}
