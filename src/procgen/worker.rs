//! Background tree generation
//!
//! Generation is pure CPU work, so large trees can be built off the render
//! thread. The worker only produces `GeneratedTree`s; installing one into a
//! `TreeNode` (the buffer swap) stays on the thread that owns the node.

use std::collections::{HashSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};

use tokio::runtime::Runtime;
use tokio::sync::mpsc;

use crate::core::error::Error;
use crate::core::types::Result;

use super::config::TreeConfig;
use super::{generate_tree, GeneratedTree};

/// Handle for one queued generation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

#[derive(Debug)]
struct GenerationRequest {
    id: RequestId,
    config: TreeConfig,
}

/// Outcome of a background generation
#[derive(Debug)]
pub struct GenerationResult {
    pub id: RequestId,
    pub result: Result<GeneratedTree>,
}

/// Tokio-backed pool that generates trees on blocking threads
pub struct GenerationWorker {
    request_tx: mpsc::UnboundedSender<GenerationRequest>,
    result_rx: mpsc::UnboundedReceiver<GenerationResult>,
    /// Requests sent but not yet returned by `poll_results`
    pending: HashSet<RequestId>,
    next_id: u64,
    // Keeps the dedicated runtime alive; None when running on the caller's runtime
    #[allow(dead_code)]
    runtime: Option<Runtime>,
}

impl GenerationWorker {
    /// Create a worker with its own runtime
    ///
    /// The worker owns that runtime, so it must also be dropped outside an
    /// async context; dropping it inside one panics. Use
    /// `new_with_current_runtime` from async code.
    ///
    /// # Arguments
    /// * `max_concurrent` - Maximum number of trees generated at once
    pub fn new(max_concurrent: usize) -> Result<Self> {
        let runtime = Runtime::new()?;
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<GenerationRequest>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<GenerationResult>();

        runtime.spawn(async move {
            Self::worker_loop(max_concurrent.max(1), &mut request_rx, result_tx).await;
        });

        Ok(Self {
            request_tx,
            result_rx,
            pending: HashSet::new(),
            next_id: 0,
            runtime: Some(runtime),
        })
    }

    /// Create a worker on the current tokio runtime
    ///
    /// Panics if called outside a tokio runtime context.
    pub fn new_with_current_runtime(max_concurrent: usize) -> Self {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<GenerationRequest>();
        let (result_tx, result_rx) = mpsc::unbounded_channel::<GenerationResult>();

        tokio::spawn(async move {
            Self::worker_loop(max_concurrent.max(1), &mut request_rx, result_tx).await;
        });

        Self {
            request_tx,
            result_rx,
            pending: HashSet::new(),
            next_id: 0,
            runtime: None,
        }
    }

    async fn worker_loop(
        max_concurrent: usize,
        request_rx: &mut mpsc::UnboundedReceiver<GenerationRequest>,
        result_tx: mpsc::UnboundedSender<GenerationResult>,
    ) {
        use tokio::task::JoinSet;

        let mut active_tasks = JoinSet::new();
        let mut queued: VecDeque<GenerationRequest> = VecDeque::new();
        let mut closed = false;

        loop {
            tokio::select! {
                request = request_rx.recv(), if !closed => {
                    match request {
                        Some(request) => queued.push_back(request),
                        None => closed = true,
                    }
                }

                Some(joined) = active_tasks.join_next(), if !active_tasks.is_empty() => {
                    match joined {
                        Ok(result) => {
                            // Receiver gone means the worker was dropped
                            let _ = result_tx.send(result);
                        }
                        Err(e) => log::error!("Tree generation task failed: {}", e),
                    }
                }

                else => break,
            }

            while active_tasks.len() < max_concurrent {
                let Some(request) = queued.pop_front() else { break };
                active_tasks.spawn_blocking(move || Self::generate(request));
            }

            if closed && queued.is_empty() && active_tasks.is_empty() {
                break;
            }
        }
    }

    /// Run one request; a panic inside generation becomes an error result.
    fn generate(request: GenerationRequest) -> GenerationResult {
        let GenerationRequest { id, config } = request;
        let result = catch_unwind(AssertUnwindSafe(|| generate_tree(&config))).unwrap_or_else(|_| {
            log::error!("Tree generation panicked for request {:?} (seed {})", id, config.seed);
            Err(Error::Worker(format!("generation panicked (seed {})", config.seed)))
        });
        GenerationResult { id, result }
    }

    /// Queue a config for generation
    pub fn request(&mut self, config: TreeConfig) -> Result<RequestId> {
        let id = RequestId(self.next_id);
        self.next_id += 1;

        self.request_tx
            .send(GenerationRequest { id, config })
            .map_err(|_| Error::Worker("generation worker stopped".to_string()))?;
        self.pending.insert(id);
        Ok(id)
    }

    /// Poll for finished trees (non-blocking)
    pub fn poll_results(&mut self) -> Vec<GenerationResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.result_rx.try_recv() {
            self.pending.remove(&result.id);
            results.push(result);
        }
        results
    }

    /// Block until the next result arrives. Returns None when nothing is pending.
    ///
    /// Must not be called from inside an async context.
    pub fn wait_next(&mut self) -> Option<GenerationResult> {
        if self.pending.is_empty() {
            return None;
        }
        let result = self.result_rx.blocking_recv()?;
        self.pending.remove(&result.id);
        Some(result)
    }

    /// Number of requests not yet collected
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.pending.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_generates_requested_trees() {
        let mut worker = GenerationWorker::new(2).unwrap();
        let ids: Vec<_> = (0..4)
            .map(|seed| worker.request(TreeConfig::sparse().with_seed(seed)).unwrap())
            .collect();
        assert_eq!(worker.pending_count(), 4);

        let mut seen = Vec::new();
        while let Some(result) = worker.wait_next() {
            let tree = result.result.unwrap();
            assert_eq!(tree.config.seed, result.id.0);
            seen.push(result.id);
        }
        seen.sort();
        assert_eq!(seen, ids);
        assert_eq!(worker.pending_count(), 0);
    }

    #[test]
    fn test_worker_matches_synchronous_generation() {
        let mut worker = GenerationWorker::new(1).unwrap();
        let config = TreeConfig::windswept();
        let id = worker.request(config.clone()).unwrap();
        assert!(worker.is_pending(id));

        let result = worker.wait_next().unwrap();
        assert_eq!(result.id, id);
        let background = result.result.unwrap();
        let direct = generate_tree(&config).unwrap();
        assert_eq!(background.geometry.content_hash(), direct.geometry.content_hash());
    }

    #[test]
    fn test_worker_reports_invalid_config() {
        let mut worker = GenerationWorker::new(1).unwrap();
        worker.request(TreeConfig { min_radius: 0.0, ..TreeConfig::default() }).unwrap();
        let result = worker.wait_next().unwrap();
        assert!(matches!(result.result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_current_runtime_worker_lives_in_async_code() {
        let mut worker = GenerationWorker::new_with_current_runtime(1);
        let id = worker.request(TreeConfig::sparse()).unwrap();

        let result = worker.result_rx.recv().await.unwrap();
        assert_eq!(result.id, id);
        assert!(result.result.is_ok());
        drop(worker);
    }

    #[test]
    fn test_wait_with_nothing_pending() {
        let mut worker = GenerationWorker::new(1).unwrap();
        assert!(worker.wait_next().is_none());
        assert!(worker.poll_results().is_empty());
    }
}
