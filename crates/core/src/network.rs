//! The network seam.

use async_trait::async_trait;

use crate::Error;
use crate::http::{Request, Response};

/// Something that can send a request to the origin.
///
/// Non-2xx answers are `Ok`: the page gets them as-is. `Err` means the
/// transport failed (offline, refused, timed out) and triggers the
/// strategy's fallback branch.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}
