/// A region of queue storage handed to the engine for one transfer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TransferWindow {
    base: *const u8,
    offset: usize,
    len: usize,
}

impl TransferWindow {
    pub(crate) fn new(base: *const u8, offset: usize, len: usize) -> Self {
        Self { base, offset, len }
    }

    /// Start of the queue storage the window lies in.
    pub fn base(&self) -> *const u8 {
        self.base
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Address of the first byte to transmit, e.g. for a DMA source address register.
    pub fn start(&self) -> *const u8 {
        self.base.wrapping_add(self.offset)
    }

    /// # Safety
    ///
    /// The queue storage the window was taken from must still be alive, and the window must not
    /// have been released by a completion yet.
    pub unsafe fn as_slice<'a>(&self) -> &'a [u8] {
        unsafe { core::slice::from_raw_parts(self.start(), self.len) }
    }
}

/// One-shot, non-blocking byte transmitter, e.g. a UART TX DMA channel.
///
/// The engine accepts one transfer at a time. Once a transfer is accepted, the platform must
/// arrange for the logger's `on_transfer_complete` to run exactly once when it finishes; the
/// completion carries no length.
pub trait TransferEngine {
    /// `false` while a transfer is in progress.
    fn is_ready(&self) -> bool;

    /// Begin transmitting `window`. Returns `false` if the engine refused, in which case nothing
    /// was started and no completion will follow.
    ///
    /// # Safety
    ///
    /// The engine may read the window's memory until the completion is signalled. The caller
    /// guarantees that memory stays alive and unmodified for that long.
    unsafe fn start_transfer(&mut self, window: TransferWindow) -> bool;
}
