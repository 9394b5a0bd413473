//! Best-effort cancellation of long slices.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Result, SliceError};

/// Shared flag checked between block reads. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fail with [`SliceError::Cancelled`] once cancelled.
    pub fn check(&self, variable: &str) -> Result<()> {
        if self.is_cancelled() {
            Err(SliceError::Cancelled(variable.to_string()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = CancellationFlag::new();
        let observer = flag.clone();
        assert!(observer.check("tmax").is_ok());
        flag.cancel();
        assert!(matches!(observer.check("tmax"), Err(SliceError::Cancelled(v)) if v == "tmax"));
    }
}
