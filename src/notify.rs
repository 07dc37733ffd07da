use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};

/// Periodic background task tied to its owner's lifetime. Runs the task once
/// immediately, then on every tick, until stopped; dropping the poller stops
/// the worker rather than leaving a free-running interval behind.
pub struct Poller {
    stop_tx: Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Poller {
    pub fn start<F>(interval: Duration, mut task: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let handle = thread::spawn(move || {
            let ticker = tick(interval.max(Duration::from_millis(1)));
            task();
            loop {
                select! {
                    recv(ticker) -> _ => task(),
                    recv(stop_rx) -> _ => return,
                }
            }
        });
        Self {
            stop_tx,
            handle: Some(handle),
        }
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.stop_tx.send(());
            let _ = handle.join();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn runs_immediately_and_then_on_ticks() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        let poller = Poller::start(Duration::from_millis(10), move || {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });
        thread::sleep(Duration::from_millis(60));
        poller.stop();
        let seen = hits.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected several runs, saw {seen}");
    }

    #[test]
    fn drop_cancels_the_task() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        {
            let _poller = Poller::start(Duration::from_millis(5), move || {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            });
            thread::sleep(Duration::from_millis(20));
        }
        let after_drop = hits.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(hits.load(Ordering::SeqCst), after_drop);
    }
}
