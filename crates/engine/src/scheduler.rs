use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use svcrun_core::{Message, Placement};
use tracing::warn;

use crate::inbox::Inbox;
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::service::{MessageSender, SchedulerHandle, Service, ServiceContext};
use crate::worker::{Worker, DEFAULT_SERVICE_PERIOD_MS};

struct ServiceRecord {
    worker_id: usize,
    inbox: Arc<Inbox>,
    running: Arc<AtomicBool>,
    metrics: Arc<Metrics>,
}

/// A read-only lookup result for a registered service.
#[derive(Clone)]
pub struct ServiceHandle {
    name: String,
    running: Arc<AtomicBool>,
    metrics: Arc<Metrics>,
}

impl ServiceHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

struct Inner {
    workers: Vec<Arc<Worker>>,
    directory: RwLock<HashMap<String, ServiceRecord>>,
    status_log: RwLock<HashMap<String, String>>,
}

impl MessageSender for Inner {
    fn send(&self, target: &str, message: Box<dyn Message>) -> bool {
        if target.is_empty() {
            warn!("send: empty target name");
            return false;
        }
        let directory = self.directory.read();
        let Some(record) = directory.get(target) else {
            warn!(target, "send: unknown target");
            return false;
        };
        let delivered = record.inbox.offer(message);
        if !delivered {
            warn!(target, "send: inbox full, message dropped");
        }
        delivered
    }
}

/// Owns the worker pool, places services, routes messages between them by logical name, and
/// reclaims completed services.
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    /// Creates `max_workers` idle workers. A non-positive count is clamped to 1.
    pub fn new(max_workers: usize) -> Self {
        let max_workers = if max_workers >= 1 {
            max_workers
        } else {
            warn!(max_workers, "non-positive worker count; clamping to 1");
            1
        };

        let workers = (0..max_workers).map(Worker::new).collect();
        Scheduler {
            inner: Arc::new(Inner {
                workers,
                directory: RwLock::new(HashMap::new()),
                status_log: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.inner.workers.len()
    }

    /// Applies a tick quantum to every worker. Non-positive values are rejected per-worker.
    pub fn set_tick_period_ms(&self, ms: u64) {
        for worker in &self.inner.workers {
            worker.set_tick_period_ms(ms);
        }
    }

    /// Applies a consecutive-error auto-quarantine threshold to every worker.
    pub fn set_error_threshold(&self, n: u64) {
        for worker in &self.inner.workers {
            worker.set_error_threshold(n);
        }
    }

    /// Registers a service under `name`, placed per `placement`. A duplicate `name` replaces
    /// the prior registration: its `stop`/`cleanup` run and it is removed before the new
    /// service takes the name.
    pub fn register(&self, name: impl Into<String>, service: Box<dyn Service>, placement: Placement) {
        let name = name.into();
        let period_ms = {
            let requested = service.period_ms();
            if requested > 0 {
                requested
            } else {
                DEFAULT_SERVICE_PERIOD_MS
            }
        };

        if let Some(prior) = self.inner.directory.write().remove(&name) {
            warn!(service = %name, "duplicate registration; replacing prior service");
            self.inner.workers[prior.worker_id].remove_service(&name);
        }

        let worker_id = self.choose_worker(placement);
        let inbox = Arc::new(Inbox::new(service.inbox_capacity()));
        let running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(Metrics::new());
        let handle = SchedulerHandle(Arc::clone(&self.inner) as Arc<dyn MessageSender>);
        let ctx = ServiceContext::new(
            name.clone(),
            Arc::clone(&inbox),
            Arc::clone(&running),
            handle,
        );

        self.inner.workers[worker_id].add_service(
            name.clone(),
            service,
            period_ms,
            ctx,
            Arc::clone(&metrics),
        );

        self.inner.directory.write().insert(
            name.clone(),
            ServiceRecord {
                worker_id,
                inbox,
                running,
                metrics,
            },
        );
        self.rebuild_status_log();
    }

    fn choose_worker(&self, placement: Placement) -> usize {
        match placement {
            Placement::Pinned(idx) if idx < self.inner.workers.len() => idx,
            Placement::Pinned(idx) => {
                warn!(idx, "preferred worker out of range; falling back to least-loaded");
                self.least_loaded()
            }
            Placement::Balanced => self.least_loaded(),
        }
    }

    fn least_loaded(&self) -> usize {
        self.inner
            .workers
            .iter()
            .enumerate()
            .min_by_key(|(_, w)| w.len())
            .map(|(i, _)| i)
            .expect("scheduler always has at least one worker")
    }

    /// Starts every worker that is not already running.
    pub fn start_all(&self) {
        for worker in &self.inner.workers {
            if worker.is_running() {
                warn!(worker = worker.id(), "start_all: worker already running");
                continue;
            }
            worker.start();
        }
    }

    /// Routes `message` to the service registered under `target`. Returns `false` if `target`
    /// is empty, unknown, or its inbox is full.
    pub fn send(&self, target: &str, message: Box<dyn Message>) -> bool {
        self.inner.send(target, message)
    }

    pub fn get(&self, name: &str) -> Option<ServiceHandle> {
        self.inner.directory.read().get(name).map(|record| ServiceHandle {
            name: name.to_string(),
            running: Arc::clone(&record.running),
            metrics: Arc::clone(&record.metrics),
        })
    }

    /// Removes every service for which `is_complete()` returns true.
    pub fn reap_completed(&self) {
        let mut removed_any = false;
        for worker in &self.inner.workers {
            for name in worker.completed_services() {
                worker.remove_service(&name);
                self.inner.directory.write().remove(&name);
                removed_any = true;
            }
        }
        if removed_any {
            self.rebuild_status_log();
        }
    }

    pub fn all_metrics(&self) -> HashMap<String, MetricsSnapshot> {
        self.inner
            .workers
            .iter()
            .flat_map(|w| w.snapshot_metrics())
            .collect()
    }

    pub fn status_log(&self) -> HashMap<String, String> {
        self.inner.status_log.read().clone()
    }

    fn rebuild_status_log(&self) {
        let mut log = HashMap::new();
        for worker in &self.inner.workers {
            let services = worker.snapshot_services();
            if services.is_empty() {
                continue;
            }
            log.insert(
                format!("worker-{}", worker.id()),
                format!(
                    "worker-{} manages {} services: [{}]",
                    worker.id(),
                    services.len(),
                    services.join(", ")
                ),
            );
        }
        *self.inner.status_log.write() = log;
    }

    /// Requests every worker to stop and joins their threads.
    pub fn stop_all(&self) {
        for worker in &self.inner.workers {
            worker.stop_worker();
        }
        for worker in &self.inner.workers {
            worker.join();
        }
    }
}
