/// Failure talking to the evaluation store.
///
/// Connection problems, credential errors, schema mismatches and statement
/// timeouts all surface here. Nothing is retried; callers show the error and
/// let the user run the command again.
#[derive(Debug, thiserror::Error)]
pub enum DataAccessError {
    #[error("failed to connect to the evaluation store: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("{operation} query failed: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
}

impl DataAccessError {
    pub(crate) fn query(operation: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| DataAccessError::Query { operation, source }
    }
}
