//! Timeout enforcement.
//!
//! Every backend call carries a hard deadline. A call that misses it is
//! abandoned and reported as a timeout; nothing cancels the remote work.

use std::future::Future;
use std::time::Duration;

/// Marker error for an elapsed deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline of {0:?} elapsed")]
pub struct Elapsed(pub Duration);

/// Run `fut` with a hard deadline.
pub async fn with_deadline<T>(limit: Duration, fut: impl Future<Output = T>) -> Result<T, Elapsed> {
    tokio::time::timeout(limit, fut).await.map_err(|_| Elapsed(limit))
}
