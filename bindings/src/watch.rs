//! Live event delivery.
//!
//! A watch is a spawned task that pulls logs off a [`LogSubscription`],
//! decodes them and pushes the records into a caller-owned channel. It ends
//! for exactly one reason, reported by [`EventWatch::join`]:
//! - the caller cancelled it (or dropped the handle),
//! - the receiving end of the channel was closed,
//! - a log failed to decode,
//! - the subscription failed or ended,
//! - the consumer fell more than [`MAX_PENDING_EVENTS`] records behind.
//!
//! The subscription is released once, whichever of these happens.

use std::collections::VecDeque;

use futures::StreamExt as _;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::LogSubscription;
use crate::error::{Error, Result};
use crate::events::{ContractEvent, EventRecord};

/// Decoded records held back while the sink is full. One more ends the watch
/// with [`Error::SubscriptionDropped`].
pub const MAX_PENDING_EVENTS: usize = 1024;

/// Why a watch stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEnd {
    Cancelled,
    SinkClosed,
}

/// Handle of a running watch. Dropping it cancels the watch.
#[derive(Debug)]
pub struct EventWatch {
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<WatchEnd>>,
}

impl EventWatch {
    /// Starts delivering the events of `subscription` into `sink`.
    pub fn spawn<E: ContractEvent>(
        subscription: LogSubscription,
        sink: mpsc::Sender<EventRecord<E>>,
    ) -> Self {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        info!(
            "watching {} events on subscription {}",
            E::NAME,
            subscription.id()
        );
        let task = tokio::spawn(run(subscription, sink, cancel_rx));
        Self {
            cancel: Some(cancel_tx),
            task,
        }
    }

    /// Asks the watch to stop. Events not yet handed to the sink are
    /// discarded.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the watch to end and reports why.
    pub async fn join(mut self) -> Result<WatchEnd> {
        let task = &mut self.task;
        match task.await {
            Ok(res) => res,
            Err(e) => Err(Error::SubscriptionDropped(format!("watch task failed: {e}"))),
        }
    }

    /// Cancels the watch and waits for it to wind down.
    pub async fn stop(mut self) -> Result<WatchEnd> {
        self.cancel();
        self.join().await
    }
}

impl Drop for EventWatch {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run<E: ContractEvent>(
    mut subscription: LogSubscription,
    sink: mpsc::Sender<EventRecord<E>>,
    mut cancel: oneshot::Receiver<()>,
) -> Result<WatchEnd> {
    let res = deliver(&mut subscription, &sink, &mut cancel).await;
    subscription.unsubscribe();

    match &res {
        Ok(end) => info!("{} watch ended: {end:?}", E::NAME),
        Err(e) => info!("{} watch failed: {e}", E::NAME),
    }
    res
}

async fn deliver<E: ContractEvent>(
    logs: &mut LogSubscription,
    sink: &mpsc::Sender<EventRecord<E>>,
    cancel: &mut oneshot::Receiver<()>,
) -> Result<WatchEnd> {
    // Records decoded while the sink is full. The feed is always read so that
    // its failure is noticed while delivery is blocked.
    let mut pending = VecDeque::new();
    loop {
        tokio::select! {
            biased;
            // A dropped handle counts as cancellation.
            _ = &mut *cancel => return Ok(WatchEnd::Cancelled),
            permit = sink.reserve(), if !pending.is_empty() => {
                let Ok(permit) = permit else {
                    return Ok(WatchEnd::SinkClosed);
                };
                if let Some(record) = pending.pop_front() {
                    permit.send(record);
                }
            }
            _ = sink.closed(), if pending.is_empty() => return Ok(WatchEnd::SinkClosed),
            next = logs.next() => {
                let log = match next {
                    Some(Ok(log)) => log,
                    Some(Err(e)) => return Err(e),
                    None => {
                        return Err(Error::SubscriptionDropped(
                            "log feed closed by the node".to_string(),
                        ))
                    }
                };
                if pending.len() == MAX_PENDING_EVENTS {
                    warn!(
                        "{} consumer lagged, dropping block {:?} log {:?}",
                        E::NAME,
                        log.block_number,
                        log.log_index
                    );
                    return Err(Error::SubscriptionDropped(format!(
                        "consumer lagged more than {MAX_PENDING_EVENTS} events behind"
                    )));
                }
                let event = E::parse(&log)?;
                debug!(
                    "received {} from block {:?} log {:?}",
                    E::NAME,
                    log.block_number,
                    log.log_index
                );
                pending.push_back(EventRecord { event, log });
            }
        }
    }
}
