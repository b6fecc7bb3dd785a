//! Bounded worker pool with ordered, chunked, lazy mapping.

use std::collections::{BTreeMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use emdcal_core::{CalibrationError, Result, CHUNKS_PER_WORKER};

use crate::config::physical_cores;

/// Chunks a pool keeps queued or running per worker.
const IN_FLIGHT_PER_WORKER: usize = 2;

/// Number of workers for a run with `pending` pairs left.
///
/// Bounded by the physical core count and `max_cores`; `pending` is `None`
/// for unbounded distributions. A result of 1 or less means "run
/// sequentially".
#[must_use]
pub fn worker_count(pending: Option<usize>, max_cores: usize) -> usize {
    physical_cores()
        .min(pending.unwrap_or(usize::MAX))
        .min(max_cores)
}

/// Items per dispatched chunk: `ceil(n_models / (workers * 6))`.
///
/// Uses the model count rather than the pair count. Falls back to 1 when the
/// count is unknown and never returns 0.
#[must_use]
pub fn chunk_size(n_models: Option<usize>, workers: usize) -> usize {
    let Some(n) = n_models else {
        return 1;
    };
    n.div_ceil(workers.max(1) * CHUNKS_PER_WORKER).max(1)
}

/// A fixed-size pool of worker threads.
pub struct OrderedPool {
    pool: ThreadPool,
    workers: usize,
}

impl OrderedPool {
    /// Create a pool with `workers` threads.
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("emdcal-worker-{i}"))
            .build()
            .map_err(|e| CalibrationError::Worker(format!("failed to create thread pool: {e}")))?;
        Ok(Self { pool, workers })
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Lazily map `f` over `inputs`, yielding results in input order.
    ///
    /// Inputs are pulled only as workers free up, in chunks of `chunk_size`.
    /// The first failing chunk (error or panic) is yielded as an error, after
    /// which the iterator ends and queued chunks are skipped.
    pub fn imap<I, O, F, It>(&self, inputs: It, chunk_size: usize, f: F) -> OrderedMap<'_, It, O, F>
    where
        It: Iterator<Item = I>,
        I: Send + 'static,
        O: Send + 'static,
        F: Fn(I) -> Result<O> + Send + Sync + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded();
        OrderedMap {
            pool: &self.pool,
            inputs,
            inputs_done: false,
            f: Arc::new(f),
            chunk_size: chunk_size.max(1),
            max_in_flight: self.workers * IN_FLIGHT_PER_WORKER,
            tx,
            rx,
            next_submit: 0,
            next_emit: 0,
            buffered: BTreeMap::new(),
            ready: VecDeque::new(),
            abort: Arc::new(AtomicBool::new(false)),
            failed: false,
        }
    }
}

type ChunkResult<O> = (usize, Result<Vec<O>>);

/// Iterator returned by [`OrderedPool::imap`].
pub struct OrderedMap<'p, It, O, F> {
    pool: &'p ThreadPool,
    inputs: It,
    inputs_done: bool,
    f: Arc<F>,
    chunk_size: usize,
    max_in_flight: usize,
    tx: Sender<ChunkResult<O>>,
    rx: Receiver<ChunkResult<O>>,
    next_submit: usize,
    next_emit: usize,
    // Chunks that finished ahead of `next_emit`
    buffered: BTreeMap<usize, Vec<O>>,
    ready: VecDeque<O>,
    abort: Arc<AtomicBool>,
    failed: bool,
}

impl<It, I, O, F> OrderedMap<'_, It, O, F>
where
    It: Iterator<Item = I>,
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Result<O> + Send + Sync + 'static,
{
    fn submit_chunks(&mut self) {
        while !self.inputs_done && self.next_submit - self.next_emit < self.max_in_flight {
            let chunk: Vec<I> = self.inputs.by_ref().take(self.chunk_size).collect();
            if chunk.len() < self.chunk_size {
                self.inputs_done = true;
            }
            if chunk.is_empty() {
                break;
            }

            let seq = self.next_submit;
            self.next_submit += 1;
            let f = Arc::clone(&self.f);
            let tx = self.tx.clone();
            let abort = Arc::clone(&self.abort);
            self.pool.spawn(move || {
                if abort.load(Ordering::Relaxed) {
                    return;
                }
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    chunk.into_iter().map(|item| f(item)).collect::<Result<Vec<O>>>()
                }))
                .unwrap_or_else(|payload| {
                    Err(CalibrationError::Worker(format!(
                        "worker panicked: {}",
                        panic_message(payload.as_ref())
                    )))
                });
                if result.is_err() {
                    abort.store(true, Ordering::Relaxed);
                }
                // The receiver is gone once the caller stopped iterating
                let _ = tx.send((seq, result));
            });
        }
    }
}

impl<It, I, O, F> Iterator for OrderedMap<'_, It, O, F>
where
    It: Iterator<Item = I>,
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Result<O> + Send + Sync + 'static,
{
    type Item = Result<O>;

    fn next(&mut self) -> Option<Result<O>> {
        loop {
            if let Some(out) = self.ready.pop_front() {
                return Some(Ok(out));
            }
            if self.failed {
                return None;
            }
            if let Some(chunk) = self.buffered.remove(&self.next_emit) {
                self.next_emit += 1;
                self.ready = chunk.into();
                continue;
            }

            self.submit_chunks();
            if self.next_emit == self.next_submit {
                return None;
            }

            match self.rx.recv() {
                Ok((seq, Ok(chunk))) => {
                    self.buffered.insert(seq, chunk);
                }
                Ok((seq, Err(e))) => {
                    debug!(chunk = seq, error = %e, "Worker chunk failed, aborting dispatch");
                    self.failed = true;
                    self.abort.store(true, Ordering::Relaxed);
                    return Some(Err(e));
                }
                Err(_) => {
                    self.failed = true;
                    return Some(Err(CalibrationError::Worker(
                        "result channel closed unexpectedly".into(),
                    )));
                }
            }
        }
    }
}

impl<It, O, F> Drop for OrderedMap<'_, It, O, F> {
    fn drop(&mut self) {
        self.abort.store(true, Ordering::Relaxed);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
