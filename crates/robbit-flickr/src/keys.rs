//! Token pool enforcing the per-key request rate
//!
//! A background task refills a bounded channel with one token per key. A key
//! gets a new token only once its previous token was consumed and a full
//! interval has elapsed since that use, so no key is used twice within one
//! interval. Callers block on the channel instead of sleeping.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{FlickrError, Result};

const NEVER_USED: u64 = u64::MAX;

#[derive(Debug)]
struct KeySlot {
    key: String,
    /// A token for this key sits in the channel
    outstanding: AtomicBool,
    /// Nanoseconds since the pool epoch of the last use
    last_used: AtomicU64,
}

impl KeySlot {
    fn rested(&self, now: Duration, interval: Duration) -> bool {
        match self.last_used.load(Ordering::Acquire) {
            NEVER_USED => true,
            last => now.saturating_sub(Duration::from_nanos(last)) >= interval,
        }
    }
}

/// Rotating pool of API keys with a per-key rate limit
#[derive(Debug)]
pub struct KeyPool {
    slots: Arc<[KeySlot]>,
    interval: Duration,
    epoch: Instant,
    receiver: Mutex<mpsc::Receiver<usize>>,
    sender: Mutex<Option<mpsc::Sender<usize>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
    cancel: CancellationToken,
}

impl KeyPool {
    /// Create a stopped pool; at least one key is required
    pub fn new(keys: Vec<String>, interval: Duration) -> Result<Self> {
        if keys.is_empty() {
            return Err(FlickrError::NoCredentials);
        }

        let (sender, receiver) = mpsc::channel(keys.len());
        let slots: Arc<[KeySlot]> = keys
            .into_iter()
            .map(|key| KeySlot {
                key,
                outstanding: AtomicBool::new(false),
                last_used: AtomicU64::new(NEVER_USED),
            })
            .collect();

        Ok(Self {
            slots,
            interval,
            epoch: Instant::now(),
            receiver: Mutex::new(receiver),
            sender: Mutex::new(Some(sender)),
            task: Mutex::new(None),
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Spawn the replenisher. Must run inside a Tokio runtime.
    pub async fn start(&self) -> Result<()> {
        let sender = self.sender.lock().await.take().ok_or(FlickrError::AlreadyStarted)?;

        let slots = Arc::clone(&self.slots);
        let cancel = self.cancel.clone();
        let (interval, epoch) = (self.interval, self.epoch);

        // Check ten times per interval so a rested key waits at most a tenth extra
        let period = (interval / 10).max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => refill(&slots, &sender, epoch, interval),
                }
            }
            tracing::debug!("Key replenisher stopped");
        });

        *self.task.lock().await = Some(handle);
        self.started.store(true, Ordering::Release);
        tracing::debug!(keys = self.slots.len(), interval_ms = interval.as_millis() as u64, "Key replenisher started");
        Ok(())
    }

    /// Stop the replenisher; current and future waiters get [`FlickrError::Stopped`]
    pub async fn stop(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.task.lock().await.take() {
            if let Err(e) = handle.await {
                tracing::warn!("Key replenisher ended abnormally: {}", e);
            }
        }
    }

    /// Wait for a token and return the key it grants one request for
    pub async fn acquire(&self) -> Result<&str> {
        if !self.started.load(Ordering::Acquire) {
            return Err(FlickrError::NotStarted);
        }

        let index = {
            let mut receiver = self.receiver.lock().await;
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(FlickrError::Stopped),
                index = receiver.recv() => index.ok_or(FlickrError::Stopped)?,
            }
        };

        let slot = &self.slots[index];
        let now = self.epoch.elapsed().as_nanos() as u64;
        // Record the use before releasing the slot so the replenisher sees it
        slot.last_used.store(now, Ordering::Release);
        slot.outstanding.store(false, Ordering::Release);

        Ok(&slot.key)
    }
}

impl Drop for KeyPool {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn refill(slots: &[KeySlot], sender: &mpsc::Sender<usize>, epoch: Instant, interval: Duration) {
    let now = epoch.elapsed();
    for (index, slot) in slots.iter().enumerate() {
        if slot.outstanding.load(Ordering::Acquire) || !slot.rested(now, interval) {
            continue;
        }
        slot.outstanding.store(true, Ordering::Release);
        // Capacity equals the key count and each key has at most one token queued
        if sender.try_send(index).is_err() {
            slot.outstanding.store(false, Ordering::Release);
        }
    }
}
