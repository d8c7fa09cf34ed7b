//! The time budget of a single request.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::Error;

/// Far enough away to never fire in practice.
const DISTANT_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// Bounds every suspension point of a request to one instant.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    timeout: Duration,
    expires_at: Instant,
}

impl Deadline {
    pub fn after(timeout: Duration) -> Self {
        let now = Instant::now();
        let expires_at = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + DISTANT_FUTURE);
        Self {
            timeout,
            expires_at,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    pub fn has_passed(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// The expiry as a wall-clock instant, for checks made off the runtime.
    pub fn expires_at(&self) -> std::time::Instant {
        self.expires_at.into_std()
    }

    /// Label a database failure with its phase, unless the failure is the statement being
    /// interrupted because the deadline passed.
    pub fn label(&self, err: sqlx::Error, phase: impl FnOnce(sqlx::Error) -> Error) -> Error {
        if self.has_passed() {
            Error::DeadlineExceeded(self.timeout)
        } else {
            phase(err)
        }
    }

    /// Run `future` to completion unless the deadline passes first, in which case the future is
    /// dropped.
    pub async fn bound<F: Future>(&self, future: F) -> Result<F::Output, Error> {
        tokio::time::timeout_at(self.expires_at, future)
            .await
            .map_err(|_| Error::DeadlineExceeded(self.timeout))
    }
}
