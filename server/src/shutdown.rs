//! Cooperative cancellation for the background tasks of one game.

use std::time::Duration;
use tokio::sync::watch;

/// Creates a linked signal / listener pair.
pub fn channel() -> (ShutdownSignal, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownSignal(tx), Shutdown(rx))
}

/// Owner side. Firing it, or dropping it, stops every listener.
#[derive(Debug)]
pub struct ShutdownSignal(watch::Sender<bool>);

impl ShutdownSignal {
    pub fn fire(&self) {
        self.0.send_replace(true);
    }
}

#[derive(Debug, Clone)]
pub struct Shutdown(watch::Receiver<bool>);

impl Shutdown {
    pub fn is_fired(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once the signal fires or its owner is gone.
    pub async fn recv(&mut self) {
        let _ = self.0.wait_for(|fired| *fired).await;
    }

    /// Sleeps for `duration` unless shut down first.
    ///
    /// Returns false if the task should stop.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => !self.is_fired(),
            _ = self.recv() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sleep_completes_without_signal() {
        let (_signal, mut shutdown) = channel();
        assert!(shutdown.sleep(Duration::from_millis(5)).await);
        assert!(!shutdown.is_fired());
    }

    #[tokio::test]
    async fn test_fire_interrupts_sleep() {
        let (signal, mut shutdown) = channel();
        let sleeper = tokio::spawn(async move { shutdown.sleep(Duration::from_secs(60)).await });

        signal.fire();
        let keep_going = tokio::time::timeout(Duration::from_secs(1), sleeper)
            .await
            .expect("sleep was not interrupted")
            .unwrap();
        assert!(!keep_going);
    }

    #[tokio::test]
    async fn test_dropped_signal_counts_as_fired() {
        let (signal, mut shutdown) = channel();
        drop(signal);
        tokio::time::timeout(Duration::from_secs(1), shutdown.recv())
            .await
            .expect("recv should resolve once the owner is gone");
        assert!(!shutdown.sleep(Duration::from_secs(60)).await);
    }

    #[tokio::test]
    async fn test_clones_all_observe_fire() {
        let (signal, first) = channel();
        let second = first.clone();
        signal.fire();
        assert!(first.is_fired());
        assert!(second.is_fired());
    }
}
