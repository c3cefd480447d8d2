use crate::engine::TransferEngine;
use crate::ring::LogRing;

/// Observable side effect of a finished transfer, typically an activity LED.
pub trait StatusIndicator {
    fn toggle(&mut self);
}

impl StatusIndicator for () {
    fn toggle(&mut self) {}
}

/// What [`TransmitPump::ensure_running`] did.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Arm {
    /// A transfer of this many bytes was started.
    Started(usize),
    /// A transfer is already in flight; its completion will pick up anything new.
    Busy,
    /// The engine turned the request down. Queue state is unchanged and the next producer or
    /// completion will try again.
    Rejected,
    /// Nothing is queued.
    Empty,
}

impl Arm {
    /// Bytes handed to the engine, zero unless a transfer was started.
    pub fn armed(self) -> usize {
        match self {
            Arm::Started(n) => n,
            _ => 0,
        }
    }
}

/// Keeps the transfer engine fed from a [`LogRing`].
///
/// The completion signal does not say how many bytes went out, so the pump remembers the length
/// of the transfer it armed and releases exactly that much from the ring when the completion
/// arrives. A nonzero `last_request_length` means a transfer is outstanding.
#[derive(Debug, Default)]
pub struct TransmitPump {
    last_request_length: usize,
}

impl TransmitPump {
    pub const fn new() -> Self {
        Self {
            last_request_length: 0,
        }
    }

    pub fn reset(&mut self) {
        self.last_request_length = 0;
    }

    pub fn last_request_length(&self) -> usize {
        self.last_request_length
    }

    pub fn in_flight(&self) -> bool {
        self.last_request_length != 0
    }

    /// Start a transfer of the longest contiguous run at the head of the queue, unless one is
    /// already going.
    pub fn ensure_running<const C: usize, E: TransferEngine>(
        &mut self,
        ring: &LogRing<C>,
        engine: &mut E,
    ) -> Arm {
        // the engine can report ready before its completion has been handled; the head has not
        // moved yet, so arming now would send the same bytes twice
        if self.in_flight() || !engine.is_ready() {
            return Arm::Busy;
        }

        let runnable = ring.runnable();
        if runnable == 0 {
            return Arm::Empty;
        }

        let window = ring.window_at_head(runnable);
        // SAFETY: producers only write outside [head, tail), head does not move past this window
        // until `on_transfer_complete` runs for it, and the owning logger refuses to reset while
        // it is armed.
        if unsafe { engine.start_transfer(window) } {
            self.last_request_length = runnable;
            Arm::Started(runnable)
        } else {
            Arm::Rejected
        }
    }

    /// Completion path: release the bytes of the finished transfer and chain the next one.
    pub fn on_transfer_complete<const C: usize, E: TransferEngine, I: StatusIndicator>(
        &mut self,
        ring: &mut LogRing<C>,
        engine: &mut E,
        indicator: &mut I,
    ) -> Arm {
        if ring.is_empty() {
            self.last_request_length = 0;
            return Arm::Empty;
        }

        ring.consume(self.last_request_length);
        self.last_request_length = 0;

        let arm = self.ensure_running(ring, engine);
        indicator.toggle();
        arm
    }
}
