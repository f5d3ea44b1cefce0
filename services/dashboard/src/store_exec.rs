use std::sync::Arc;

use kvstore::Storage;

/// Runs `f` against the store on the blocking pool; storage backends may do
/// file IO.
pub async fn with_store_blocking<R, F>(
    store: Arc<dyn Storage>,
    f: F,
) -> Result<R, tokio::task::JoinError>
where
    R: Send + 'static,
    F: FnOnce(&dyn Storage) -> R + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(store.as_ref())).await
}
