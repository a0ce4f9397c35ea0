use tokio::sync::watch;

/// One-shot latch: starts held, released at most once, never re-armed
#[derive(Debug)]
pub struct Latch {
    state: watch::Sender<bool>,
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

impl Latch {
    pub fn new() -> Self {
        let (state, _) = watch::channel(false);
        Self { state }
    }

    /// Open the latch; returns `true` only for the call that opened it
    pub fn release(&self) -> bool {
        self.state.send_if_modified(|released| {
            if *released {
                false
            } else {
                *released = true;
                true
            }
        })
    }

    pub fn is_released(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolve once the latch is open (immediately if it already is)
    pub async fn wait(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = rx.wait_for(|released| *released).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_release_is_one_shot() {
        let latch = Latch::new();
        assert!(!latch.is_released());
        assert!(latch.release());
        assert!(!latch.release());
        assert!(latch.is_released());
    }

    #[tokio::test]
    async fn test_wait_after_release() {
        let latch = Latch::new();
        latch.release();
        tokio::time::timeout(Duration::from_millis(100), latch.wait())
            .await
            .expect("released latch must not block");
    }

    #[tokio::test]
    async fn test_wait_before_release() {
        let latch = Arc::new(Latch::new());
        let waiter = {
            let latch = latch.clone();
            tokio::spawn(async move { latch.wait().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        latch.release();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter must wake")
            .unwrap();
    }
}
