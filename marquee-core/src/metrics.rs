use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use marquee_shared::HoldEventKind;

/// Prometheus instruments for the hold lifecycle.
///
/// Each engine owns its own `Registry` so several engines (tests, mostly)
/// can live in one process.
#[derive(Clone)]
pub struct HoldMetrics {
    registry: Registry,
    pub holds_started: IntCounter,
    pub holds_cancelled: IntCounter,
    pub holds_released: IntCounter,
    pub holds_already_paid: IntCounter,
    pub rollbacks_failed: IntCounter,
    pub holds_shut_down: IntCounter,
    pub active_holds: IntGauge,
}

impl HoldMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let holds_started = IntCounter::new("marquee_holds_started_total", "Holds handed to an expiry worker")?;
        let holds_cancelled = IntCounter::new("marquee_holds_cancelled_total", "Holds ended by payment before expiry")?;
        let holds_released = IntCounter::new("marquee_holds_released_total", "Unpaid holds rolled back on expiry")?;
        let holds_already_paid = IntCounter::new("marquee_holds_already_paid_total", "Expired holds found paid on re-read")?;
        let rollbacks_failed = IntCounter::new("marquee_rollbacks_failed_total", "Expired holds whose rollback failed")?;
        let holds_shut_down = IntCounter::new("marquee_holds_shut_down_total", "Holds abandoned at registry teardown")?;
        let active_holds = IntGauge::new("marquee_active_holds", "Holds currently waiting on their grace timer")?;

        registry.register(Box::new(holds_started.clone()))?;
        registry.register(Box::new(holds_cancelled.clone()))?;
        registry.register(Box::new(holds_released.clone()))?;
        registry.register(Box::new(holds_already_paid.clone()))?;
        registry.register(Box::new(rollbacks_failed.clone()))?;
        registry.register(Box::new(holds_shut_down.clone()))?;
        registry.register(Box::new(active_holds.clone()))?;

        Ok(Self {
            registry,
            holds_started,
            holds_cancelled,
            holds_released,
            holds_already_paid,
            rollbacks_failed,
            holds_shut_down,
            active_holds,
        })
    }

    pub fn record(&self, kind: HoldEventKind) {
        match kind {
            HoldEventKind::Started => {
                self.holds_started.inc();
                self.active_holds.inc();
                return;
            }
            HoldEventKind::Cancelled => self.holds_cancelled.inc(),
            HoldEventKind::Released => self.holds_released.inc(),
            HoldEventKind::AlreadyPaid => self.holds_already_paid.inc(),
            HoldEventKind::RollbackFailed => self.rollbacks_failed.inc(),
            HoldEventKind::ShutDown => self.holds_shut_down.inc(),
        }
        self.active_holds.dec();
    }

    /// Prometheus text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
