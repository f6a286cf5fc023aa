//! Bounded-concurrency worker pool with in-flight-counter-based quiescence.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    future::Future,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use tokio::{
    sync::{Notify, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

type WorkerFn<I> =
    Arc<dyn Fn(I, PoolHandle<I>) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// A cloneable submission handle passed into every worker invocation so that
/// a running task can feed new work back into its own pool (this is how the
/// crawl orchestrator re-injects discovered hosts and how the connector
/// could, in principle, requeue an address for a later pass).
pub struct PoolHandle<I> {
    tx: mpsc::UnboundedSender<I>,
    in_flight: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl<I> Clone for PoolHandle<I> {
    fn clone(&self) -> Self {
        PoolHandle {
            tx: self.tx.clone(),
            in_flight: self.in_flight.clone(),
            notify: self.notify.clone(),
        }
    }
}

impl<I> PoolHandle<I> {
    /// Enqueues one item. Never blocks: the backing queue is unbounded.
    pub fn submit(&self, item: I) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        // The receiver only disappears once every worker has exited, which
        // only happens after `cancel_and_join`; submitting past that point
        // indicates a logic error in the caller, not a condition to recover
        // from silently.
        if self.tx.send(item).is_err() {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// A bounded-concurrency executor: `workers` tasks pull items from a shared
/// unbounded queue and run `worker_fn` on each. Quiescence is defined as the
/// in-flight counter reaching zero, which remains correct even when workers
/// resubmit items to their own pool while running (see crawl orchestrator).
pub struct WorkerPool<I> {
    handle: PoolHandle<I>,
    cancel: CancellationToken,
    joins: Vec<JoinHandle<()>>,
}

impl<I: Send + 'static> WorkerPool<I> {
    pub fn new<F, Fut>(workers: usize, worker_fn: F) -> Self
    where
        F: Fn(I, PoolHandle<I>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let worker_fn: WorkerFn<I> = Arc::new(move |item, handle| Box::pin(worker_fn(item, handle)));
        let (tx, rx) = mpsc::unbounded_channel::<I>();
        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let notify = Arc::new(Notify::new());
        let cancel = CancellationToken::new();

        let handle = PoolHandle {
            tx,
            in_flight: in_flight.clone(),
            notify: notify.clone(),
        };

        let mut joins = Vec::with_capacity(workers);
        for _ in 0..workers {
            let rx = rx.clone();
            let worker_fn = worker_fn.clone();
            let handle = handle.clone();
            let cancel = cancel.clone();
            let in_flight = in_flight.clone();
            let notify = notify.clone();
            joins.push(tokio::spawn(async move {
                loop {
                    let item = {
                        let mut rx = rx.lock().await;
                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => None,
                            item = rx.recv() => item,
                        }
                    };
                    let Some(item) = item else { break };
                    worker_fn(item, handle.clone()).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    notify.notify_waiters();
                }
            }));
        }

        WorkerPool {
            handle,
            cancel,
            joins,
        }
    }

    pub fn handle(&self) -> PoolHandle<I> {
        self.handle.clone()
    }

    pub fn submit(&self, item: I) {
        self.handle.submit(item);
    }

    /// Suspends until the queue is empty and every worker is idle. If `kill`
    /// is true, workers are then signalled to terminate and joined before
    /// this returns; otherwise they remain alive for later submissions.
    ///
    /// A Ctrl-C during the wait unblocks immediately; if `kill` was
    /// requested it escalates to cancelling in-flight workers rather than
    /// waiting for them to drain.
    pub async fn block(&mut self, kill: bool) {
        loop {
            let notified = self.notify.notified();
            if self.handle.in_flight() == 0 {
                break;
            }
            tokio::select! {
                _ = notified => {},
                _ = tokio::signal::ctrl_c() => break,
            }
        }

        if kill {
            self.cancel_and_join().await;
        }
    }

    pub async fn cancel_and_join(&mut self) {
        self.cancel.cancel();
        for j in self.joins.drain(..) {
            let _ = j.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize as StdAtomicUsize;

    use super::*;

    #[tokio::test]
    async fn quiesces_after_all_items_processed() {
        let counter = Arc::new(StdAtomicUsize::new(0));
        let counter2 = counter.clone();
        let mut pool = WorkerPool::new(4, move |item: u32, _handle| {
            let counter = counter2.clone();
            async move {
                counter.fetch_add(item as usize, Ordering::SeqCst);
            }
        });

        for i in 0..10 {
            pool.submit(i);
        }
        pool.block(false).await;

        assert_eq!(counter.load(Ordering::SeqCst), (0..10).sum::<u32>() as usize);
        assert_eq!(pool.handle.in_flight(), 0);
        pool.cancel_and_join().await;
    }

    #[tokio::test]
    async fn worker_can_resubmit_without_breaking_quiescence() {
        let seen = Arc::new(StdAtomicUsize::new(0));
        let seen2 = seen.clone();
        let mut pool = WorkerPool::new(2, move |item: u32, handle| {
            let seen = seen2.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
                if item < 3 {
                    handle.submit(item + 1);
                }
            }
        });

        pool.submit(0);
        pool.block(true).await;

        assert_eq!(seen.load(Ordering::SeqCst), 4);
    }
}
