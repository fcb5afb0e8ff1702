pub mod error;
pub mod runs;
pub mod schedules;
pub mod strategies;
pub mod windows;

use crate::abort::AbortHandle;
use crate::scheduler::RunError;
use error::{ApiError, ApiResult};

/// Raises the flag when the request future is dropped, so a client that
/// goes away stops the computation it started.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run a CPU-bound job off the async runtime.
pub(crate) async fn run_blocking<T, F>(job: F) -> ApiResult<T>
where
    F: FnOnce(&AbortHandle) -> Result<T, RunError> + Send + 'static,
    T: Send + 'static,
{
    let abort = AbortHandle::new();
    let _guard = AbortOnDrop(abort.clone());
    tokio::task::spawn_blocking(move || job(&abort))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}
