//! Rate Monitor Implementation

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

/// Default sampling period
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

type RateCallback = Box<dyn Fn(u64) + Send + Sync>;

struct Shared {
    /// Events since the last tick
    count: AtomicU64,
    /// Count reported by the most recent tick
    last_rate: AtomicU64,
    running: AtomicBool,
    /// Bumped on every start/stop; a timer thread exits once its epoch is stale
    epoch: Mutex<u64>,
    wake: Condvar,
    period: Duration,
    callback: RateCallback,
}

/// Periodic event-rate sampler
pub struct RateMonitor {
    shared: Arc<Shared>,
}

impl RateMonitor {
    /// Create a stopped monitor reporting to `callback` every `period`
    pub fn new<F>(period: Duration, callback: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                count: AtomicU64::new(0),
                last_rate: AtomicU64::new(0),
                running: AtomicBool::new(false),
                epoch: Mutex::new(0),
                wake: Condvar::new(),
                period,
                callback: Box::new(callback),
            }),
        }
    }

    /// Create a monitor with the default 1 second period
    pub fn with_default_period<F>(callback: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        Self::new(DEFAULT_PERIOD, callback)
    }

    /// Count one event (lock-free, callable from any thread)
    pub fn on_event(&self) {
        self.shared.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Start the timer thread. Returns false if already running.
    pub fn start(&self) -> bool {
        let epoch = {
            let mut epoch = self.shared.epoch.lock();
            if self.shared.running.swap(true, Ordering::SeqCst) {
                return false;
            }
            *epoch += 1;
            *epoch
        };

        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name("rate-monitor".to_string())
            .spawn(move || run_timer(shared, epoch));

        if let Err(e) = spawned {
            warn!("Failed to spawn rate monitor thread: {}", e);
            self.stop();
            return false;
        }

        info!("Rate monitor started with period {:?}", self.shared.period);
        true
    }

    /// Stop the timer. Returns false if not running.
    ///
    /// A callback already in progress may still complete after this returns.
    pub fn stop(&self) -> bool {
        {
            let mut epoch = self.shared.epoch.lock();
            if !self.shared.running.swap(false, Ordering::SeqCst) {
                return false;
            }
            *epoch += 1;
        }
        self.shared.wake.notify_all();
        info!("Rate monitor stopped");
        true
    }

    /// Whether the timer is running
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Count reported by the most recent tick
    pub fn last_rate(&self) -> u64 {
        self.shared.last_rate.load(Ordering::Relaxed)
    }

    /// Events counted since the last tick
    pub fn pending(&self) -> u64 {
        self.shared.count.load(Ordering::Relaxed)
    }

    /// Sampling period
    pub fn period(&self) -> Duration {
        self.shared.period
    }
}

impl Drop for RateMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_timer(shared: Arc<Shared>, epoch: u64) {
    loop {
        let deadline = Instant::now() + shared.period;
        {
            let mut current = shared.epoch.lock();
            while *current == epoch {
                if shared.wake.wait_until(&mut current, deadline).timed_out() {
                    break;
                }
            }
            if *current != epoch {
                debug!("Rate monitor timer (epoch {}) exiting", epoch);
                return;
            }
        }

        let count = shared.count.swap(0, Ordering::AcqRel);
        shared.last_rate.store(count, Ordering::Relaxed);
        (shared.callback)(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_monitor(period: Duration) -> (RateMonitor, Arc<Mutex<Vec<u64>>>) {
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        let monitor = RateMonitor::new(period, move |count| sink.lock().push(count));
        (monitor, reports)
    }

    #[test]
    fn test_reports_counted_events() {
        let (monitor, reports) = recording_monitor(Duration::from_millis(50));
        assert!(monitor.start());

        for _ in 0..10 {
            monitor.on_event();
        }
        thread::sleep(Duration::from_millis(180));
        monitor.stop();

        let reports = reports.lock();
        assert!(reports.len() >= 2);
        assert_eq!(reports.iter().sum::<u64>(), 10);
        assert_eq!(monitor.last_rate(), *reports.last().unwrap());
    }

    #[test]
    fn test_no_callbacks_after_stop() {
        let (monitor, reports) = recording_monitor(Duration::from_millis(20));
        monitor.start();
        thread::sleep(Duration::from_millis(70));
        monitor.stop();

        thread::sleep(Duration::from_millis(30));
        let settled = reports.lock().len();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(reports.lock().len(), settled);
    }

    #[test]
    fn test_start_stop_idempotent() {
        let (monitor, _reports) = recording_monitor(Duration::from_secs(3600));

        assert!(monitor.start());
        assert!(!monitor.start());
        assert!(monitor.is_running());

        assert!(monitor.stop());
        assert!(!monitor.stop());
        assert!(!monitor.is_running());

        assert!(monitor.start());
        assert!(monitor.stop());
    }

    #[test]
    fn test_concurrent_events() {
        let (monitor, _reports) = recording_monitor(Duration::from_secs(3600));
        let monitor = Arc::new(monitor);

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let monitor = monitor.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        monitor.on_event();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(monitor.pending(), 4000);
    }

    #[test]
    fn test_stop_from_callback_thread() {
        let monitor = Arc::new(Mutex::new(None::<Arc<RateMonitor>>));
        let handle = monitor.clone();
        let rate = Arc::new(RateMonitor::new(Duration::from_millis(10), move |_| {
            if let Some(m) = handle.lock().as_ref() {
                m.stop();
            }
        }));
        *monitor.lock() = Some(rate.clone());

        rate.start();
        thread::sleep(Duration::from_millis(60));
        assert!(!rate.is_running());

        // break the reference cycle
        monitor.lock().take();
    }
}
