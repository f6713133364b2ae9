use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::info;
use marquee_shared::HoldEventKind;
use crate::expiry::{ExpiryWorker, Hold};
use crate::registry::ReservationRegistry;
use crate::{CoreError, CoreResult};

/// A queued hold plus the ack sent back once it is registered
pub struct Intake {
    hold: Hold,
    registered: oneshot::Sender<()>,
}

/// Producer side of the booking intake queue
#[derive(Clone)]
pub struct IntakeQueue {
    tx: mpsc::Sender<Intake>,
}

impl IntakeQueue {
    /// Create the queue and its receiving end. Exactly one consumer should
    /// ever drain the receiver.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Intake>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Hand a hold over to the consumer and wait until it is registered, so a
    /// payment arriving after this returns always finds the hold's handle.
    /// On error the hold is dropped and never gets a timer.
    pub async fn submit(&self, hold: Hold) -> CoreResult<()> {
        let (registered, ack) = oneshot::channel();
        self.tx
            .send(Intake { hold, registered })
            .await
            .map_err(|_| CoreError::QueueClosed)?;

        // Consumer stopped before reaching this hold
        ack.await.map_err(|_| CoreError::QueueClosed)
    }
}

/// Drain the queue: register each hold, then spawn its worker.
///
/// Stops when every producer is gone or `shutdown` flips to true.
pub fn spawn_consumer(
    mut rx: mpsc::Receiver<Intake>,
    registry: Arc<ReservationRegistry>,
    worker: ExpiryWorker,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Booking intake consumer started");

        loop {
            let Intake { hold, registered } = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                intake = rx.recv() => match intake {
                    Some(intake) => intake,
                    None => break,
                },
            };

            // Registration happens-before the worker starts
            registry.register(hold.seat_id, hold.hold_id, hold.handle.clone());
            worker.publish(hold.seat_id, hold.hold_id, HoldEventKind::Started);

            tokio::spawn(worker.clone().run(hold));
            // Submitter may have given up waiting
            let _ = registered.send(());
        }

        info!("Booking intake consumer stopped");
    })
}
