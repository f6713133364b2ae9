use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Reason a pending expiry was interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Payment arrived; the hold must not be rolled back
    Cancel,
    /// The registry is being torn down
    Teardown,
}

/// Sending half of a hold's cancellation channel.
///
/// The channel buffers exactly one interrupt. Sends never block: if the slot
/// is taken or the worker has already exited, the send is dropped and
/// reported as `false`.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: mpsc::Sender<Interrupt>,
}

/// Receiving half, owned by the expiry worker
#[derive(Debug)]
pub struct CancelSignal {
    rx: mpsc::Receiver<Interrupt>,
}

/// One fresh channel per hold. Handles are never reused across holds.
pub fn cancel_channel() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = mpsc::channel(1);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelHandle {
    pub fn cancel(&self) -> bool {
        self.send(Interrupt::Cancel)
    }

    pub(crate) fn teardown(&self) -> bool {
        self.send(Interrupt::Teardown)
    }

    /// True once the worker has dropped its signal
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, interrupt: Interrupt) -> bool {
        match self.tx.try_send(interrupt) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!("Cancel slot already occupied, dropping {:?}", interrupt);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

impl CancelSignal {
    /// Resolves to `None` only when every handle has been dropped
    pub async fn recv(&mut self) -> Option<Interrupt> {
        self.rx.recv().await
    }

    /// Refuse further interrupts. Later sends report `false`.
    pub fn close(&mut self) {
        self.rx.close();
    }
}
