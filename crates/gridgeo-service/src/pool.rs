//! Bounded worker pool for whole requests.
//!
//! Requests beyond the worker count wait in the rayon queue; nothing is
//! rejected. [`PoolGauge`] reports how many requests are running and how many
//! are waiting.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};

use anyhow::Context;
use gridgeo_core::{GeoError, GeoResult};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

/// Occupancy counters shared with telemetry readers.
#[derive(Debug, Default)]
pub struct PoolGauge {
    active: AtomicUsize,
    pending: AtomicUsize,
}

impl PoolGauge {
    /// Requests currently executing
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Requests submitted but not started
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

/// Moves a request from pending to active, and back out when dropped.
struct ActiveGuard<'a>(&'a PoolGauge);

impl<'a> ActiveGuard<'a> {
    fn start(gauge: &'a PoolGauge) -> Self {
        gauge.pending.fetch_sub(1, Ordering::SeqCst);
        gauge.active.fetch_add(1, Ordering::SeqCst);
        Self(gauge)
    }
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Result of a request submitted with [`RequestPool::submit`].
pub struct RequestHandle<T> {
    receiver: mpsc::Receiver<T>,
}

impl<T> RequestHandle<T> {
    /// Block until the request finishes.
    pub fn wait(self) -> GeoResult<T> {
        self.receiver
            .recv()
            .map_err(|_| GeoError::Other("request worker stopped before replying".to_string()))
    }
}

pub struct RequestPool {
    pool: ThreadPool,
    workers: usize,
    gauge: Arc<PoolGauge>,
}

impl RequestPool {
    /// Build a pool running at most `workers` requests at once (0 = number of CPUs).
    pub fn new(workers: usize) -> GeoResult<Self> {
        let workers = if workers == 0 { num_cpus::get() } else { workers };
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|idx| format!("gridgeo-request-{idx}"))
            .build()
            .context("building Rayon thread pool for geo-data requests")?;
        debug!(workers, "request pool ready");
        Ok(Self {
            pool,
            workers,
            gauge: Arc::new(PoolGauge::default()),
        })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn gauge(&self) -> Arc<PoolGauge> {
        Arc::clone(&self.gauge)
    }

    /// Run `request` on the pool and wait for it.
    pub fn execute<F, R>(&self, request: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.gauge.pending.fetch_add(1, Ordering::SeqCst);
        let gauge = &self.gauge;
        self.pool.install(move || {
            let _active = ActiveGuard::start(gauge);
            request()
        })
    }

    /// Queue `request` and return immediately.
    pub fn submit<F, R>(&self, request: F) -> RequestHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let gauge = Arc::clone(&self.gauge);
        gauge.pending.fetch_add(1, Ordering::SeqCst);
        self.pool.spawn(move || {
            let _active = ActiveGuard::start(&gauge);
            // the caller may have dropped its handle
            let _ = sender.send(request());
        });
        RequestHandle { receiver }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait_for(condition: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn execute_returns_the_request_result() {
        let pool = RequestPool::new(2).unwrap();
        assert_eq!(pool.execute(|| 40 + 2), 42);
        assert_eq!(pool.gauge().active(), 0);
        assert_eq!(pool.gauge().pending(), 0);
    }

    #[test]
    fn zero_workers_means_cpu_count() {
        let pool = RequestPool::new(0).unwrap();
        assert_eq!(pool.workers(), num_cpus::get());
    }

    #[test]
    fn extra_requests_wait_in_queue() {
        let pool = RequestPool::new(1).unwrap();
        let gauge = pool.gauge();
        let (release, gate) = mpsc::channel::<()>();

        let first = pool.submit(move || {
            gate.recv().ok();
            1
        });
        assert!(wait_for(|| gauge.active() == 1));

        let second = pool.submit(|| 2);
        let third = pool.submit(|| 3);
        assert_eq!(gauge.pending(), 2);

        release.send(()).unwrap();
        assert_eq!(first.wait().unwrap(), 1);
        assert_eq!(second.wait().unwrap(), 2);
        assert_eq!(third.wait().unwrap(), 3);
        assert!(wait_for(|| gauge.active() == 0 && gauge.pending() == 0));
    }
}
