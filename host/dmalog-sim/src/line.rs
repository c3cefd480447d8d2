//! A stand-in for a UART TX DMA channel: transfers are "clocked out" to stdout on a separate
//! thread at the configured baud rate, and the completion is delivered by calling back into the
//! logger from that thread, the way the DMA interrupt would preempt a producer.

use crossbeam_channel::{Receiver, Sender};
use dmalog::{MillisClock, StatusIndicator, TransferEngine, TransferWindow};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// 8N1: start bit, eight data bits, stop bit.
const BITS_PER_BYTE: u32 = 10;

#[derive(Debug)]
pub struct SimEngine {
    busy: Arc<AtomicBool>,
    line: Sender<Vec<u8>>,
}

impl TransferEngine for SimEngine {
    fn is_ready(&self) -> bool {
        !self.busy.load(Ordering::Acquire)
    }

    unsafe fn start_transfer(&mut self, window: TransferWindow) -> bool {
        if self.busy.swap(true, Ordering::AcqRel) {
            return false;
        }
        // the bytes are latched up front; the wire delay happens on the line thread
        let bytes = unsafe { window.as_slice() }.to_vec();
        tracing::trace!(offset = window.offset(), len = window.len(), "arm");
        if self.line.send(bytes).is_err() {
            self.busy.store(false, Ordering::Release);
            return false;
        }
        true
    }
}

/// Spawn the line thread. `on_complete` plays the part of the completion interrupt.
pub fn spawn_line<F>(baud: u32, on_complete: F) -> std::io::Result<(SimEngine, JoinHandle<()>)>
where
    F: Fn() + Send + 'static,
{
    let (tx, rx) = crossbeam_channel::unbounded();
    let busy = Arc::new(AtomicBool::new(false));
    let engine = SimEngine {
        busy: Arc::clone(&busy),
        line: tx,
    };
    let handle = std::thread::Builder::new()
        .name("tx-dma".into())
        .spawn(move || run_line(rx, busy, baud, on_complete))?;
    Ok((engine, handle))
}

fn run_line<F: Fn()>(rx: Receiver<Vec<u8>>, busy: Arc<AtomicBool>, baud: u32, on_complete: F) {
    let micros_per_byte = 1_000_000.0 * f64::from(BITS_PER_BYTE) / f64::from(baud);
    let stdout = std::io::stdout();
    for chunk in rx {
        std::thread::sleep(Duration::from_micros(
            (micros_per_byte * chunk.len() as f64) as u64,
        ));
        {
            let mut out = stdout.lock();
            if let Err(e) = out.write_all(&chunk).and_then(|()| out.flush()) {
                tracing::error!("failed to write to stdout: {e}");
            }
        }
        busy.store(false, Ordering::Release);
        on_complete();
    }
    tracing::debug!("line closed");
}

/// Milliseconds since the simulation started.
#[derive(Debug, Copy, Clone)]
pub struct SimClock {
    genesis: Instant,
}

impl SimClock {
    pub fn start() -> Self {
        Self {
            genesis: Instant::now(),
        }
    }
}

impl MillisClock for SimClock {
    fn millis(&self) -> u32 {
        self.genesis.elapsed().as_millis() as u32
    }
}

/// Counts completions; the firmware toggles an LED here.
#[derive(Debug, Clone, Default)]
pub struct TxLed {
    toggles: Arc<AtomicU32>,
}

impl TxLed {
    pub fn toggles(&self) -> u32 {
        self.toggles.load(Ordering::Relaxed)
    }
}

impl StatusIndicator for TxLed {
    fn toggle(&mut self) {
        self.toggles.fetch_add(1, Ordering::Relaxed);
    }
}
