//! Panel Driver
//!
//! Owns the synchronizer and consumes one event channel, so handlers never
//! interleave. Auto-toggle clicks go through a single-slot debouncer; the
//! loop wakes at its deadline with `timeout_at` while waiting for the next
//! event. Queued refresh notifications are collapsed to the latest one.
//!
//! After every handled event the driver publishes the panel state on a
//! `watch` channel and forwards raised notices to the notice listener, so
//! the UI sees updates while the session runs.

use log::{debug, warn};
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::Result;
use crate::host::Host;
use crate::panel::debounce::Debouncer;
use crate::panel::event::{coalesce_refreshes, Notice, PanelEvent};
use crate::panel::state::PanelState;
use crate::panel::sync::WhiteBalanceSync;

/// Default capacity of the panel event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Capacity of the notice channel
pub const NOTICE_CHANNEL_CAPACITY: usize = 64;

/// UI-side sender for panel events
#[derive(Debug, Clone)]
pub struct PanelHandle {
    tx: Sender<PanelEvent>,
}

impl PanelHandle {
    /// Queue an event without blocking.
    ///
    /// Returns false if the channel is full or the driver has stopped.
    pub fn send(&self, event: PanelEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                warn!("[DRIVER] Event channel full, dropping {:?}", event);
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!("[DRIVER] Attempted to send to a stopped panel");
                false
            }
        }
    }

    /// Queue an event, waiting for channel capacity
    pub async fn send_async(&self, event: PanelEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    /// Wait until the driver has taken every queued event, or has stopped.
    ///
    /// The driver handles a taken batch without yielding to other tasks
    /// unless a host call suspends.
    pub async fn drained(&self) {
        while !self.tx.is_closed() && self.tx.capacity() < self.tx.max_capacity() {
            tokio::task::yield_now().await;
        }
    }
}

/// Create a connected handle and receiver
pub fn channel() -> (PanelHandle, Receiver<PanelEvent>) {
    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    (PanelHandle { tx }, rx)
}

/// Serializes all panel handling
pub struct PanelDriver<H: Host> {
    sync: WhiteBalanceSync<H>,
    debouncer: Debouncer<bool>,
    state_tx: watch::Sender<PanelState>,
    notice_tx: Option<Sender<Notice>>,
}

impl<H: Host> PanelDriver<H> {
    pub fn new(sync: WhiteBalanceSync<H>) -> Self {
        let debouncer = Debouncer::new(sync.config().debounce());
        let (state_tx, _) = watch::channel(sync.state().clone());
        Self {
            sync,
            debouncer,
            state_tx,
            notice_tx: None,
        }
    }

    pub fn sync(&self) -> &WhiteBalanceSync<H> {
        &self.sync
    }

    /// Live view of the panel state, updated after every handled event
    pub fn subscribe(&self) -> watch::Receiver<PanelState> {
        self.state_tx.subscribe()
    }

    /// Receive notices as they are raised.
    ///
    /// Replaces any earlier listener. Without a listener notices are logged
    /// and dropped. The receiver ends once the driver stops.
    pub fn notices(&mut self) -> Receiver<Notice> {
        let (tx, rx) = mpsc::channel(NOTICE_CHANNEL_CAPACITY);
        self.notice_tx = Some(tx);
        rx
    }

    pub fn has_pending_toggle(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Process events until every handle is dropped, then fire any pending
    /// toggle and hand the synchronizer back.
    ///
    /// Stops early on a fatal transaction error.
    pub async fn run(mut self, mut rx: Receiver<PanelEvent>) -> Result<WhiteBalanceSync<H>> {
        loop {
            if let Some(checked) = self.debouncer.poll(Instant::now()) {
                self.fire_toggle(checked).await?;
            }

            let event = match self.debouncer.deadline() {
                Some(deadline) => match tokio::time::timeout_at(deadline, rx.recv()).await {
                    Ok(event) => event,
                    Err(_) => continue,
                },
                None => rx.recv().await,
            };
            let Some(event) = event else {
                break;
            };

            let mut batch = vec![event];
            while let Ok(next) = rx.try_recv() {
                batch.push(next);
            }
            let queued = batch.len();
            let batch = coalesce_refreshes(batch);
            if batch.len() < queued {
                debug!(
                    "[DRIVER] Collapsed {} queued refreshes",
                    queued - batch.len()
                );
            }
            for event in batch {
                self.dispatch(event).await?;
            }
        }

        if let Some(checked) = self.debouncer.flush() {
            self.fire_toggle(checked).await?;
        }
        debug!("[DRIVER] Channel closed, driver stopped");
        Ok(self.sync)
    }

    /// Handle one event now, routing toggles through the debouncer
    pub async fn dispatch(&mut self, event: PanelEvent) -> Result<()> {
        match event {
            PanelEvent::AutoToggled { checked } => {
                self.sync.preview_auto_toggle(checked);
                let replaced = self.debouncer.cancel();
                self.debouncer.schedule(checked, Instant::now());
                debug!(
                    "[DRIVER] Auto toggle {} scheduled{} in {:?}",
                    if checked { "on" } else { "off" },
                    if replaced { " (replacing pending)" } else { "" },
                    self.debouncer.window()
                );
                self.publish();
                Ok(())
            }
            other => {
                let result = self.sync.handle(other).await;
                self.publish();
                result
            }
        }
    }

    async fn fire_toggle(&mut self, checked: bool) -> Result<()> {
        debug!("[DRIVER] Debounce elapsed, auto toggle {}", checked);
        let result = self.sync.handle(PanelEvent::AutoToggled { checked }).await;
        self.publish();
        result
    }

    /// Push the current state to watchers and hand off pending notices
    fn publish(&mut self) {
        for notice in self.sync.take_notices() {
            let Some(tx) = &self.notice_tx else {
                debug!("[DRIVER] No notice listener, dropping: {}", notice.message);
                continue;
            };
            match tx.try_send(notice) {
                Ok(()) => {}
                Err(TrySendError::Full(notice)) => {
                    warn!("[DRIVER] Notice channel full, dropping: {}", notice.message);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("[DRIVER] Notice listener gone");
                    self.notice_tx = None;
                }
            }
        }

        let next = self.sync.state();
        self.state_tx.send_if_modified(|current| {
            if *current == *next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
    }
}
