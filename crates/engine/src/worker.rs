use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::metrics::{Metrics, MetricsSnapshot};
use crate::service::{Service, ServiceContext};

pub const DEFAULT_SERVICE_PERIOD_MS: u64 = 10;
pub const DEFAULT_TICK_PERIOD_MS: u64 = 50;
pub const DEFAULT_ERROR_THRESHOLD: u64 = 3;

struct Assignment {
    name: String,
    period_ms: u64,
    service: Mutex<Box<dyn Service>>,
    ctx: ServiceContext,
    metrics: Arc<Metrics>,
    last_step_nanos: AtomicU64,
    setup_done: AtomicBool,
}

/// A dedicated OS thread that drives a fixed set of assigned services on a polling tick.
///
/// Blocking inside a user callback stalls only this worker and whatever else is pinned to
/// it; it never affects other workers.
pub struct Worker {
    id: usize,
    epoch: Instant,
    assignments: Mutex<Vec<Arc<Assignment>>>,
    tick_period_ms: AtomicU64,
    error_threshold: AtomicU64,
    running: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    pub fn new(id: usize) -> Arc<Self> {
        Arc::new(Self {
            id,
            epoch: Instant::now(),
            assignments: Mutex::new(Vec::new()),
            tick_period_ms: AtomicU64::new(DEFAULT_TICK_PERIOD_MS),
            error_threshold: AtomicU64::new(DEFAULT_ERROR_THRESHOLD),
            running: AtomicBool::new(false),
            handle: Mutex::new(None),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn len(&self) -> usize {
        self.assignments.lock().len()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn set_tick_period_ms(&self, ms: u64) {
        if ms > 0 {
            self.tick_period_ms.store(ms, Ordering::Relaxed);
        } else {
            warn!(worker = self.id, ms, "ignoring non-positive tick period");
        }
    }

    pub fn set_error_threshold(&self, n: u64) {
        if n > 0 {
            self.error_threshold.store(n, Ordering::Relaxed);
        } else {
            warn!(worker = self.id, n, "ignoring non-positive error threshold");
        }
    }

    pub(crate) fn add_service(
        &self,
        name: String,
        service: Box<dyn Service>,
        period_ms: u64,
        ctx: ServiceContext,
        metrics: Arc<Metrics>,
    ) {
        let assignment = Arc::new(Assignment {
            name,
            period_ms,
            service: Mutex::new(service),
            ctx,
            metrics,
            last_step_nanos: AtomicU64::new(0),
            setup_done: AtomicBool::new(false),
        });
        self.assignments.lock().push(assignment);
    }

    /// Stops and cleans up a service, removing it from this worker. A no-op if `name` is not
    /// assigned here.
    pub fn remove_service(&self, name: &str) -> bool {
        let removed = {
            let mut assignments = self.assignments.lock();
            let pos = assignments.iter().position(|a| a.name == name);
            pos.map(|idx| assignments.remove(idx))
        };

        let Some(assignment) = removed else {
            debug!(worker = self.id, service = name, "remove_service: not assigned here");
            return false;
        };

        assignment.ctx.stop();
        let mut service = assignment.service.lock();
        let result = catch_unwind(AssertUnwindSafe(|| service.cleanup(&assignment.ctx)));
        if result.is_err() {
            warn!(worker = self.id, service = name, "cleanup panicked");
        }
        true
    }

    pub fn snapshot_services(&self) -> Vec<String> {
        self.assignments.lock().iter().map(|a| a.name.clone()).collect()
    }

    pub fn snapshot_metrics(&self) -> HashMap<String, MetricsSnapshot> {
        self.assignments
            .lock()
            .iter()
            .map(|a| (a.name.clone(), a.metrics.snapshot()))
            .collect()
    }

    pub fn completed_services(&self) -> Vec<String> {
        self.assignments
            .lock()
            .iter()
            .filter(|a| a.service.lock().is_complete(&a.ctx))
            .map(|a| a.name.clone())
            .collect()
    }

    fn now_nanos(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Spawns the worker's tick-loop thread. A no-op if already running.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::AcqRel) {
            warn!(worker = self.id, "start requested on an already-running worker");
            return;
        }
        let worker = Arc::clone(self);
        let handle = thread::Builder::new()
            .name(format!("svcrun-worker-{}", self.id))
            .spawn(move || worker.run())
            .expect("failed to spawn worker thread");
        *self.handle.lock() = Some(handle);
    }

    pub fn stop_worker(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn join(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    fn run(self: Arc<Self>) {
        debug!(worker = self.id, "worker started");
        while self.running.load(Ordering::Acquire) {
            let snapshot: Vec<Arc<Assignment>> = self.assignments.lock().clone();
            let now = self.now_nanos();
            let threshold = self.error_threshold.load(Ordering::Relaxed);

            for assignment in &snapshot {
                self.run_one(assignment, now, threshold);
            }

            let tick_ms = self.tick_period_ms.load(Ordering::Relaxed);
            thread::sleep(Duration::from_millis(tick_ms));
        }
        debug!(worker = self.id, "worker stopped");
    }

    fn run_one(&self, assignment: &Arc<Assignment>, now: u64, threshold: u64) {
        if !assignment.ctx.is_running() {
            return;
        }

        if !assignment.setup_done.swap(true, Ordering::AcqRel) {
            let mut service = assignment.service.lock();
            let result = catch_unwind(AssertUnwindSafe(|| service.setup(&assignment.ctx)));
            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(worker = self.id, service = %assignment.name, %err, "setup failed");
                    drop(service);
                    assignment.ctx.stop();
                    return;
                }
                Err(_) => {
                    error!(worker = self.id, service = %assignment.name, "setup panicked");
                    drop(service);
                    assignment.ctx.stop();
                    return;
                }
            }
        }

        if !assignment.ctx.is_running() {
            return;
        }

        let due_nanos = assignment.period_ms.saturating_mul(1_000_000);
        let last = assignment.last_step_nanos.load(Ordering::Relaxed);
        if now.saturating_sub(last) < due_nanos {
            return;
        }
        assignment.last_step_nanos.store(now, Ordering::Relaxed);

        let t0 = Instant::now();
        let result = {
            let mut service = assignment.service.lock();
            catch_unwind(AssertUnwindSafe(|| service.work_step(&assignment.ctx)))
        };
        let elapsed_nanos = t0.elapsed().as_nanos() as u64;

        match result {
            Ok(Ok(())) => {
                assignment.metrics.record_step(elapsed_nanos);
            }
            Ok(Err(err)) => {
                let consecutive = assignment.metrics.record_error();
                warn!(worker = self.id, service = %assignment.name, %err, consecutive, "work_step failed");
                self.maybe_quarantine(assignment, consecutive, threshold);
            }
            Err(_) => {
                let consecutive = assignment.metrics.record_error();
                error!(worker = self.id, service = %assignment.name, consecutive, "work_step panicked");
                self.maybe_quarantine(assignment, consecutive, threshold);
            }
        }
    }

    fn maybe_quarantine(&self, assignment: &Arc<Assignment>, consecutive: u64, threshold: u64) {
        if consecutive >= threshold {
            error!(
                worker = self.id,
                service = %assignment.name,
                consecutive,
                threshold,
                "auto-quarantine: consecutive error threshold reached"
            );
            assignment.ctx.stop();
        }
    }
}
