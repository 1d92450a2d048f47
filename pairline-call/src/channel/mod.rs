use crate::error::CallError;
use async_trait::async_trait;
use pairline_core::{CallId, Signal, SignalDraft, SignalKind, UserId};
use pairline_relay::{SignalStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Fixed poll interval; no backoff at two-party scale.
    pub poll_interval: Duration,
    /// Consecutive failed reads before the consumer is told the relay is
    /// in trouble. Never fatal; the counter resets on the next success.
    pub trouble_threshold: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            trouble_threshold: 5,
        }
    }
}

/// Receives the signals a [`SignalChannel`] drains from the store.
///
/// `apply` must be idempotent against redelivery: a crash (or failed
/// delete) between delivery and deletion means the same signal arrives
/// again on a later tick.
#[async_trait]
pub trait SignalConsumer: Send + Sync {
    /// Apply one incoming signal. Returning an error leaves the signal in
    /// the store to be redelivered.
    async fn apply(&self, signal: &Signal) -> Result<(), CallError>;

    /// The store has failed several reads in a row. Informational only.
    async fn on_relay_trouble(&self) {}

    /// A read succeeded after [`on_relay_trouble`](Self::on_relay_trouble)
    /// fired.
    async fn on_relay_recovered(&self) {}
}

/// Client-side transport over the signal store: polls the local party's
/// mailbox for one call at a fixed interval and submits outgoing signals.
///
/// Delivery is consume-then-delete. Each drained signal is handed to the
/// consumer first and deleted only after `apply` returns `Ok`, so a crash
/// in between re-delivers rather than loses it.
pub struct SignalChannel {
    store: Arc<dyn SignalStore>,
    local: UserId,
    peer: UserId,
    call_id: CallId,
    config: ChannelConfig,
    active: watch::Sender<bool>,
}

impl SignalChannel {
    pub fn new(
        store: Arc<dyn SignalStore>,
        local: UserId,
        peer: UserId,
        call_id: CallId,
        config: ChannelConfig,
    ) -> Self {
        let (active, _) = watch::channel(true);
        Self {
            store,
            local,
            peer,
            call_id,
            config,
            active,
        }
    }

    pub fn call_id(&self) -> &CallId {
        &self.call_id
    }

    pub fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    /// Write an outgoing signal addressed to the peer. Independent store
    /// write; safe to call while a poll tick is in flight.
    pub async fn submit(&self, kind: SignalKind, payload: String) -> Result<Signal, StoreError> {
        let signal = self
            .store
            .write(SignalDraft {
                from: self.local.clone(),
                to: self.peer.clone(),
                call_id: self.call_id.clone(),
                kind,
                payload,
            })
            .await?;
        debug!(kind = %signal.kind, call_id = %signal.call_id, "signal submitted");
        Ok(signal)
    }

    /// Spawn the polling loop. Runs until [`stop`](Self::stop).
    pub fn start(self: &Arc<Self>, consumer: Arc<dyn SignalConsumer>) -> JoinHandle<()> {
        let channel = self.clone();
        tokio::spawn(async move { channel.run(consumer).await })
    }

    /// Stop polling. A tick already in flight finishes, but it re-checks
    /// the active flag before applying each further signal, so a straggler
    /// cannot resurrect an ended call.
    pub fn stop(&self) {
        // send_replace, not send: the flag must flip even when no polling
        // task is subscribed, e.g. teardown after a failed setup.
        self.active.send_replace(false);
    }

    async fn run(&self, consumer: Arc<dyn SignalConsumer>) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown = self.active.subscribe();
        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !self.is_active() {
                        break;
                    }
                    match self.poll_once(consumer.as_ref()).await {
                        Ok(_) => {
                            if consecutive_failures >= self.config.trouble_threshold {
                                consumer.on_relay_recovered().await;
                            }
                            consecutive_failures = 0;
                        }
                        Err(e) => {
                            consecutive_failures += 1;
                            warn!(
                                call_id = %self.call_id,
                                failures = consecutive_failures,
                                "signal poll failed, retrying next tick: {}", e
                            );
                            if consecutive_failures == self.config.trouble_threshold {
                                consumer.on_relay_trouble().await;
                            }
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || !*shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        debug!(call_id = %self.call_id, "polling loop stopped");
    }

    /// Drain and apply one batch of pending signals, in store order.
    /// Returns how many were applied. The run loop calls this every tick;
    /// tests call it directly for deterministic delivery.
    pub async fn poll_once(&self, consumer: &dyn SignalConsumer) -> Result<usize, StoreError> {
        let pending = self.store.read_pending(&self.local, &self.call_id).await?;
        let mut applied = 0;

        for signal in pending {
            if !self.is_active() {
                break;
            }
            match consumer.apply(&signal).await {
                Ok(()) => {
                    applied += 1;
                    if let Err(e) = self.store.delete(&signal.id).await {
                        // The signal will be redelivered next tick; the
                        // consumer's idempotence absorbs that.
                        warn!(id = %signal.id, "failed to delete consumed signal: {}", e);
                    }
                }
                Err(e) => {
                    warn!(
                        id = %signal.id,
                        kind = %signal.kind,
                        "signal left pending after failed apply: {}", e
                    );
                }
            }
        }

        Ok(applied)
    }
}
