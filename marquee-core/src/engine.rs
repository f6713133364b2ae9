use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::info;
use uuid::Uuid;
use marquee_shared::HoldEvent;
use crate::expiry::{ExpiryWorker, Hold};
use crate::intake::{spawn_consumer, IntakeQueue};
use crate::metrics::HoldMetrics;
use crate::registry::ReservationRegistry;
use crate::repository::SeatStore;
use crate::{CoreError, CoreResult};

#[derive(Debug, Clone)]
pub struct HoldSettings {
    /// How long an unpaid hold survives
    pub grace: Duration,
    /// Wait used when a hold is already overdue by the time its worker starts
    pub min_wait: Duration,
    pub intake_capacity: usize,
}

impl Default for HoldSettings {
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(10),
            min_wait: Duration::from_secs(1),
            intake_capacity: 1024,
        }
    }
}

/// The running hold engine: intake queue, its consumer, and the registry.
///
/// Clones share the same engine.
#[derive(Clone)]
pub struct HoldEngine {
    registry: Arc<ReservationRegistry>,
    intake: IntakeQueue,
    metrics: HoldMetrics,
    events: broadcast::Sender<HoldEvent>,
    shutdown: Arc<watch::Sender<bool>>,
    consumer: Arc<Mutex<Option<JoinHandle<()>>>>,
    settings: HoldSettings,
}

impl HoldEngine {
    /// Start the intake consumer. Must be called inside a tokio runtime.
    pub fn start(store: Arc<dyn SeatStore>, settings: HoldSettings) -> CoreResult<Self> {
        let metrics = HoldMetrics::new().map_err(|e| CoreError::InternalError(e.to_string()))?;
        let registry = Arc::new(ReservationRegistry::new());
        let (events, _) = broadcast::channel(256);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (intake, rx) = IntakeQueue::new(settings.intake_capacity);

        let worker = ExpiryWorker::new(
            store,
            registry.clone(),
            metrics.clone(),
            events.clone(),
            settings.grace,
            settings.min_wait,
        );
        let consumer = spawn_consumer(rx, registry.clone(), worker, shutdown_rx);

        info!("Hold engine started with a grace period of {:?}", settings.grace);

        Ok(Self {
            registry,
            intake,
            metrics,
            events,
            shutdown: Arc::new(shutdown_tx),
            consumer: Arc::new(Mutex::new(Some(consumer))),
            settings,
        })
    }

    pub async fn submit(&self, hold: Hold) -> CoreResult<()> {
        self.intake.submit(hold).await
    }

    /// Payment-path cancellation. False means the hold had already resolved.
    pub fn cancel(&self, seat_id: Uuid) -> bool {
        self.registry.cancel(seat_id)
    }

    pub fn registry(&self) -> &Arc<ReservationRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> &HoldMetrics {
        &self.metrics
    }

    pub fn settings(&self) -> &HoldSettings {
        &self.settings
    }

    /// Lifecycle events for every hold handled by this engine
    pub fn subscribe(&self) -> broadcast::Receiver<HoldEvent> {
        self.events.subscribe()
    }

    /// Stop taking new holds, then tear the registry down. Outstanding
    /// workers exit without rolling back. Returns how many holds were live.
    pub async fn shutdown(&self) -> usize {
        let _ = self.shutdown.send(true);

        let consumer = self
            .consumer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(consumer) = consumer {
            let _ = consumer.await;
        }

        let live = self.registry.drain();
        info!("Hold engine stopped, {} live holds abandoned", live);
        live
    }
}
