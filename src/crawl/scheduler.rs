// src/crawl/scheduler.rs
// =============================================================================
// The crawl loop.
//
// How it works:
// 1. The seed URL is marked visited and handed to its own task right away
// 2. Every task fetches one page, scans it, prints its findings immediately
//    and pushes the same-site links it found onto a shared work queue
// 3. The scheduler is the only reader of that queue. For each link it asks
//    the visited registry "is this new?" and spawns a task if it is
// 4. When no task is left running, no more links can ever arrive: done
//
// One task per admitted URL, spawned immediately. Two knobs make this safer on
// very large sites:
// - max_concurrency: tasks wait for a semaphore permit before fetching
// - queue_capacity: a bounded queue makes tasks wait while it is full
//
// Termination:
// - OutstandingTasks (default) keeps every task in a JoinSet and stops when
//   the set is empty. A task has sent all of its links before it finishes,
//   so the queue is drained after each join; a task that panics counts as a
//   failed page.
// - IdleIntervals stops after two poll intervals in a row with no link
//   arriving. It may stop while slow fetches are still running; those are
//   reported as abandoned.
// =============================================================================

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};
use url::Url;

use super::fetch::Fetch;
use super::registry::VisitedRegistry;
use crate::report::Finding;
use crate::scanner::{normalize, scan_body};

/// Where tasks send their findings. Fire-and-forget: a task never waits on it.
pub type FindingSink = mpsc::UnboundedSender<Finding>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Termination {
    /// Stop when every dispatched task has finished
    #[default]
    OutstandingTasks,
    /// Stop after two consecutive poll intervals without new links
    IdleIntervals,
}

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum fetches in flight (None = one task per URL, unbounded)
    pub max_concurrency: Option<NonZeroUsize>,
    /// Work queue capacity (None = unbounded)
    pub queue_capacity: Option<NonZeroUsize>,
    pub poll_interval: Duration,
    pub termination: Termination,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_concurrency: None,
            queue_capacity: None,
            poll_interval: Duration::from_millis(2000),
            termination: Termination::OutstandingTasks,
        }
    }
}

/// Result of a finished crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    /// Every URL admitted for fetching, sorted
    pub visited: Vec<String>,
    pub pages_fetched: usize,
    pub pages_failed: usize,
    /// Tasks still running when the crawl stopped (IdleIntervals only)
    pub abandoned: usize,
}

/// Scheduler state as seen by the idle-interval policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Running,
    QuiescentCandidate,
    Terminated,
}

// Tracks link arrivals between poll ticks. A tick only counts as silent if
// nothing arrived since the previous tick.
#[derive(Debug)]
struct Quiescence {
    state: CrawlState,
    arrived_since_tick: bool,
}

impl Default for Quiescence {
    fn default() -> Self {
        Self {
            state: CrawlState::Running,
            arrived_since_tick: false,
        }
    }
}

impl Quiescence {
    fn record_arrival(&mut self) {
        self.arrived_since_tick = true;
        self.state = CrawlState::Running;
    }

    fn tick(&mut self) -> CrawlState {
        self.state = if std::mem::take(&mut self.arrived_since_tick) {
            CrawlState::Running
        } else {
            match self.state {
                CrawlState::Running => CrawlState::QuiescentCandidate,
                CrawlState::QuiescentCandidate | CrawlState::Terminated => CrawlState::Terminated,
            }
        };
        self.state
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskOutcome {
    Fetched,
    Failed,
}

// The work queue is either bounded or unbounded depending on config. Both
// sides get a thin wrapper so the rest of the code does not care which.
#[derive(Debug, Clone)]
enum QueueSender {
    Bounded(mpsc::Sender<String>),
    Unbounded(mpsc::UnboundedSender<String>),
}

impl QueueSender {
    /// Returns false once the scheduler has stopped listening.
    async fn send(&self, link: String) -> bool {
        match self {
            QueueSender::Bounded(tx) => tx.send(link).await.is_ok(),
            QueueSender::Unbounded(tx) => tx.send(link).is_ok(),
        }
    }
}

#[derive(Debug)]
enum QueueReceiver {
    Bounded(mpsc::Receiver<String>),
    Unbounded(mpsc::UnboundedReceiver<String>),
}

impl QueueReceiver {
    async fn recv(&mut self) -> Option<String> {
        match self {
            QueueReceiver::Bounded(rx) => rx.recv().await,
            QueueReceiver::Unbounded(rx) => rx.recv().await,
        }
    }

    fn try_recv(&mut self) -> Option<String> {
        match self {
            QueueReceiver::Bounded(rx) => rx.try_recv().ok(),
            QueueReceiver::Unbounded(rx) => rx.try_recv().ok(),
        }
    }
}

fn work_queue(capacity: Option<NonZeroUsize>) -> (QueueSender, QueueReceiver) {
    match capacity {
        Some(capacity) => {
            let (tx, rx) = mpsc::channel(capacity.get());
            (QueueSender::Bounded(tx), QueueReceiver::Bounded(rx))
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (QueueSender::Unbounded(tx), QueueReceiver::Unbounded(rx))
        }
    }
}

// Everything a spawned task needs, cloned once per dispatch.
struct TaskContext {
    queue: QueueSender,
    findings: FindingSink,
    permits: Option<Arc<Semaphore>>,
}

pub struct Crawler<F> {
    fetcher: Arc<F>,
    config: CrawlConfig,
}

impl<F: Fetch> Crawler<F> {
    pub fn new(fetcher: F, config: CrawlConfig) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            config,
        }
    }

    /// Crawls from `seed` until no more work can arrive.
    pub async fn crawl(&self, seed: &Url, findings: FindingSink) -> CrawlReport {
        let registry = VisitedRegistry::new();
        let (queue_tx, mut queue_rx) = work_queue(self.config.queue_capacity);
        let context = TaskContext {
            queue: queue_tx,
            findings,
            permits: self
                .config
                .max_concurrency
                .map(|limit| Arc::new(Semaphore::new(limit.get()))),
        };

        let mut report = CrawlReport::default();
        let mut tasks: JoinSet<TaskOutcome> = JoinSet::new();

        // The seed skips the queue
        let seed = normalize(seed);
        registry.mark_visited(&seed);
        info!(url = %seed, "crawl started");
        self.dispatch(&mut tasks, seed, &context);

        let mut quiescence = Quiescence::default();
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                Some(url) = queue_rx.recv() => {
                    quiescence.record_arrival();
                    self.admit(&registry, &mut tasks, url, &context);
                }
                Some(joined) = tasks.join_next() => {
                    registry.mark_completed();
                    match joined {
                        Ok(TaskOutcome::Fetched) => report.pages_fetched += 1,
                        Ok(TaskOutcome::Failed) => report.pages_failed += 1,
                        Err(e) => {
                            warn!(error = %e, "crawl task did not finish");
                            report.pages_failed += 1;
                        }
                    }

                    // A finished task has already queued all of its links
                    while let Some(url) = queue_rx.try_recv() {
                        quiescence.record_arrival();
                        self.admit(&registry, &mut tasks, url, &context);
                    }

                    if self.config.termination == Termination::OutstandingTasks && tasks.is_empty() {
                        break;
                    }
                }
                _ = ticker.tick() => match self.config.termination {
                    Termination::OutstandingTasks => {
                        debug!(
                            in_flight = tasks.len(),
                            admitted = registry.admitted(),
                            completed = registry.completed(),
                            "crawl in progress"
                        );
                    }
                    Termination::IdleIntervals => {
                        let state = quiescence.tick();
                        debug!(?state, in_flight = tasks.len(), "poll interval elapsed");
                        if state == CrawlState::Terminated {
                            break;
                        }
                    }
                },
            }
        }

        report.abandoned = tasks.len();
        // Dropping a JoinSet aborts its tasks; leftovers run to completion instead
        tasks.detach_all();
        report.visited = registry.snapshot();
        info!(
            visited = report.visited.len(),
            fetched = report.pages_fetched,
            failed = report.pages_failed,
            abandoned = report.abandoned,
            "crawl finished"
        );

        report
    }

    fn admit(
        &self,
        registry: &VisitedRegistry,
        tasks: &mut JoinSet<TaskOutcome>,
        url: String,
        context: &TaskContext,
    ) {
        if registry.mark_visited(&url) {
            self.dispatch(tasks, url, context);
        } else {
            trace!(url = %url, "already visited");
        }
    }

    fn dispatch(&self, tasks: &mut JoinSet<TaskOutcome>, url: String, context: &TaskContext) {
        let fetcher = Arc::clone(&self.fetcher);
        let queue = context.queue.clone();
        let findings = context.findings.clone();
        let permits = context.permits.clone();

        tasks.spawn(async move {
            // Held until the page is fully processed
            let _permit = match permits {
                Some(permits) => permits.acquire_owned().await.ok(),
                None => None,
            };

            visit_page(fetcher.as_ref(), &url, &queue, &findings).await
        });
    }
}

// Fetch + scan for one URL. Failures are logged and produce nothing.
async fn visit_page<F: Fetch>(
    fetcher: &F,
    url: &str,
    queue: &QueueSender,
    findings: &FindingSink,
) -> TaskOutcome {
    let base = match Url::parse(url) {
        Ok(base) => base,
        Err(e) => {
            warn!(url, error = %e, "cannot parse admitted URL");
            return TaskOutcome::Failed;
        }
    };

    debug!(url, "fetching");
    let body = match fetcher.fetch(url).await {
        Ok(body) => body,
        Err(e) => {
            warn!(url, error = %e, "fetch failed");
            return TaskOutcome::Failed;
        }
    };

    let scan = scan_body(&base, body).await;
    debug!(
        url,
        resources = scan.resources.len(),
        links = scan.links.len(),
        "page scanned"
    );

    for resource in scan.resources {
        // Nobody listening is fine; the crawl continues regardless
        let _ = findings.send(Finding {
            page: url.to_string(),
            resource,
        });
    }

    for link in scan.links {
        if !queue.send(link).await {
            break;
        }
    }

    TaskOutcome::Fetched
}
