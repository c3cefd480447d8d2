use crate::engine::TransferEngine;
use crate::error::Error;
use crate::hexdump;
use crate::pump::{Arm, StatusIndicator, TransmitPump};
use crate::render::{ComposeBuffer, MillisClock, Rendered};
use crate::ring::LogRing;
use crate::{LOG_DMA_BUFFER_SIZE, LOG_ITEM_MAX_SIZE};
use core::cell::RefCell;
use core::fmt;
use critical_section::Mutex;

/// The logging subsystem: queue, pump, compose buffer, and the hardware it drives.
///
/// Every method takes `&mut self`; when producers and the completion interrupt share one logger,
/// put it behind a [`SharedLogger`].
///
/// An armed engine holds a pointer into the queue storage, which lives inline in this struct. Once
/// a transfer has been started the logger must stay where it is until the engine is idle again;
/// give it a `'static` home (a [`SharedLogger`] in a `static` does this) rather than moving it
/// around.
#[derive(Debug)]
pub struct DmaLogger<
    E,
    K,
    I = (),
    const C: usize = LOG_DMA_BUFFER_SIZE,
    const M: usize = LOG_ITEM_MAX_SIZE,
> {
    ring: LogRing<C>,
    pump: TransmitPump,
    compose: ComposeBuffer<M>,
    engine: E,
    clock: K,
    indicator: I,
    /// Messages turned away for lack of space.
    dropped: u32,
}

impl<E, K, I, const C: usize, const M: usize> DmaLogger<E, K, I, C, M>
where
    E: TransferEngine,
    K: MillisClock,
    I: StatusIndicator,
{
    pub fn new(engine: E, clock: K, indicator: I) -> Self {
        Self {
            ring: LogRing::new(),
            pump: TransmitPump::new(),
            compose: ComposeBuffer::new(),
            engine,
            clock,
            indicator,
            dropped: 0,
        }
    }

    /// Empty the queue and clear the dropped counter.
    ///
    /// Refused with [`Error::TransferInFlight`] while the engine may still be reading queue
    /// storage; nothing is cleared in that case.
    pub fn reset(&mut self) -> Result<(), Error> {
        if self.pump.in_flight() || !self.engine.is_ready() {
            return Err(Error::TransferInFlight);
        }
        self.ring.reset();
        self.pump.reset();
        self.dropped = 0;
        Ok(())
    }

    pub fn ring(&self) -> &LogRing<C> {
        &self.ring
    }
    pub fn pump(&self) -> &TransmitPump {
        &self.pump
    }
    pub fn engine(&self) -> &E {
        &self.engine
    }
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
    pub fn indicator(&self) -> &I {
        &self.indicator
    }
    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    /// Render a timestamped line and queue it for transmission.
    ///
    /// Returns the number of bytes queued (timestamp and line feed included). Text longer than
    /// the compose buffer is truncated and still queued; a line that doesn't fit in the free part
    /// of the queue is dropped whole.
    pub fn log_message(&mut self, args: fmt::Arguments) -> Result<usize, Error> {
        let rendered = self.compose.render(self.clock.millis(), args);
        Self::commit(
            &mut self.ring,
            &mut self.pump,
            &mut self.engine,
            &mut self.dropped,
            self.compose.rendered(rendered),
        )
    }

    /// Like [`log_message`](Self::log_message), but also reports whether the text was truncated.
    pub fn log_rendered(&mut self, args: fmt::Arguments) -> Result<Rendered, Error> {
        let rendered = self.compose.render(self.clock.millis(), args);
        Self::commit(
            &mut self.ring,
            &mut self.pump,
            &mut self.engine,
            &mut self.dropped,
            self.compose.rendered(rendered),
        )
        .map(|_| rendered)
    }

    /// Queue bytes as they are, without timestamp or line feed.
    pub fn enqueue(&mut self, bytes: &[u8]) -> Result<usize, Error> {
        Self::commit(
            &mut self.ring,
            &mut self.pump,
            &mut self.engine,
            &mut self.dropped,
            bytes,
        )
    }

    /// Log a hex dump of `bytes`, one message per row. Stops at the first row that doesn't fit
    /// (counting it as dropped) and returns the total bytes queued before it.
    pub fn log_hexdump(&mut self, bytes: &[u8]) -> usize {
        let mut total = 0;
        for line in hexdump::lines(bytes, 0) {
            match self.log_message(format_args!("{line}")) {
                Ok(n) => total += n,
                Err(_) => break,
            }
        }
        total
    }

    pub fn ensure_running(&mut self) -> Arm {
        self.pump.ensure_running(&self.ring, &mut self.engine)
    }

    /// To be called from the engine's completion interrupt, once per finished transfer.
    pub fn on_transfer_complete(&mut self) -> Arm {
        self.pump
            .on_transfer_complete(&mut self.ring, &mut self.engine, &mut self.indicator)
    }

    fn commit(
        ring: &mut LogRing<C>,
        pump: &mut TransmitPump,
        engine: &mut E,
        dropped: &mut u32,
        bytes: &[u8],
    ) -> Result<usize, Error> {
        match ring.enqueue(bytes) {
            Ok(n) => {
                pump.ensure_running(ring, engine);
                Ok(n)
            }
            Err(e) => {
                *dropped = dropped.wrapping_add(1);
                Err(e)
            }
        }
    }
}

/// A [`DmaLogger`] shared between any number of producers and the completion interrupt.
///
/// Each call runs as one critical section, so a producer's space check, copy and `tail` update
/// cannot interleave with another producer or with the completion handler.
pub struct SharedLogger<
    E,
    K,
    I = (),
    const C: usize = LOG_DMA_BUFFER_SIZE,
    const M: usize = LOG_ITEM_MAX_SIZE,
> {
    inner: Mutex<RefCell<Option<DmaLogger<E, K, I, C, M>>>>,
}

impl<E, K, I, const C: usize, const M: usize> Default for SharedLogger<E, K, I, C, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, K, I, const C: usize, const M: usize> SharedLogger<E, K, I, C, M> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }
}

impl<E, K, I, const C: usize, const M: usize> SharedLogger<E, K, I, C, M>
where
    E: TransferEngine,
    K: MillisClock,
    I: StatusIndicator,
{
    /// Bring the logger up with an empty queue. Must happen once, before any message is logged.
    pub fn log_init(&self, engine: E, clock: K, indicator: I) -> Result<(), Error> {
        critical_section::with(|cs| {
            let mut slot = self
                .inner
                .borrow(cs)
                .try_borrow_mut()
                .map_err(|_| Error::Reentrant)?;
            if slot.is_some() {
                return Err(Error::AlreadyInitialized);
            }
            *slot = Some(DmaLogger::new(engine, clock, indicator));
            Ok(())
        })
    }

    pub fn is_initialized(&self) -> bool {
        // a borrow can only be held by a call on a live logger
        critical_section::with(|cs| {
            self.inner
                .borrow(cs)
                .try_borrow()
                .map_or(true, |slot| slot.is_some())
        })
    }

    /// Run `f` on the logger inside a critical section.
    ///
    /// Fails with [`Error::Reentrant`] instead of panicking when called from inside another call
    /// on the same logger.
    pub fn with<R>(&self, f: impl FnOnce(&mut DmaLogger<E, K, I, C, M>) -> R) -> Result<R, Error> {
        critical_section::with(|cs| {
            let mut slot = self
                .inner
                .borrow(cs)
                .try_borrow_mut()
                .map_err(|_| Error::Reentrant)?;
            let logger = slot.as_mut().ok_or(Error::Uninitialized)?;
            Ok(f(logger))
        })
    }

    pub fn log_message(&self, args: fmt::Arguments) -> Result<usize, Error> {
        self.with(|logger| logger.log_message(args))?
    }

    pub fn log_hexdump(&self, bytes: &[u8]) -> Result<usize, Error> {
        self.with(|logger| logger.log_hexdump(bytes))
    }

    /// Completion interrupt entry point.
    pub fn on_transfer_complete(&self) -> Result<Arm, Error> {
        self.with(DmaLogger::on_transfer_complete)
    }

    pub fn dropped(&self) -> u32 {
        self.with(|logger| logger.dropped()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{LazyEngine, MockEngine};
    use crate::logmsg;
    use crate::render::NoClock;
    use core::cell::Cell;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    type SmallLogger = DmaLogger<MockEngine, NoClock, (), 64, 32>;

    fn drain<K: MillisClock, I: StatusIndicator, const C: usize, const M: usize>(
        logger: &mut DmaLogger<MockEngine, K, I, C, M>,
    ) {
        while logger.engine_mut().finish() {
            logger.on_transfer_complete();
        }
    }

    #[test]
    fn message_reaches_the_wire() {
        let clock = || 123456u32;
        let mut logger: DmaLogger<_, _, (), 256, 128> = DmaLogger::new(MockEngine::new(), clock, ());

        assert_eq!(logmsg!(logger, "hello {}", "world"), Ok(21));
        assert_eq!(logger.engine().wire, b"(123456) hello world\n");
        assert_eq!(logger.pump().last_request_length(), 21);

        drain(&mut logger);
        assert!(logger.ring().is_empty());
    }

    #[test]
    fn messages_queued_while_busy_go_out_in_order() {
        let mut logger = SmallLogger::new(MockEngine::new(), NoClock, ());
        logmsg!(logger, "one").unwrap();
        logmsg!(logger, "two").unwrap();
        logmsg!(logger, "three").unwrap();
        assert_eq!(logger.engine().armed.len(), 1);

        drain(&mut logger);
        assert_eq!(logger.engine().wire, b"(0) one\n(0) two\n(0) three\n");
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let mut logger = DmaLogger::<_, _, (), 16, 16>::new(
            MockEngine {
                busy: true,
                ..MockEngine::new()
            },
            NoClock,
            (),
        );
        // "(0) " + 10 + "\n" fills all 15 usable bytes
        assert_eq!(logmsg!(logger, "AAAAAAAAAA"), Ok(15));
        assert_eq!(logger.ring().space_available(), 0);

        assert_eq!(
            logmsg!(logger, ""),
            Err(Error::InsufficientSpace {
                needed: 5,
                available: 0
            })
        );
        assert_eq!(logger.dropped(), 1);
        assert_eq!((logger.ring().head(), logger.ring().tail()), (0, 15));
    }

    #[test]
    fn truncated_text_is_still_queued() {
        let mut logger = SmallLogger::new(MockEngine::new(), NoClock, ());
        let r = logger
            .log_rendered(format_args!("{:>100}", "x"))
            .unwrap();
        assert!(r.truncated);
        assert_eq!(r.len, 32);
        assert_eq!(logger.engine().wire.len(), 32);
        assert_eq!(logger.engine().wire.last(), Some(&b'\n'));
    }

    #[test]
    fn wraparound_is_invisible_on_the_wire() {
        let mut logger = DmaLogger::<_, _, (), 16, 16>::new(MockEngine::new(), NoClock, ());
        logger.enqueue(b"0123456789").unwrap();
        drain(&mut logger);
        assert_eq!(logger.ring().head(), 10);

        logger.enqueue(b"abcdefgh").unwrap();
        assert_eq!(logger.ring().tail(), 2);
        drain(&mut logger);

        assert_eq!(logger.engine().armed, [(0, 10), (10, 6), (0, 2)]);
        assert_eq!(logger.engine().wire, b"0123456789abcdefgh");
    }

    #[test]
    fn hexdump_rows_are_separate_messages() {
        let mut logger: DmaLogger<_, _, (), 1024, 128> =
            DmaLogger::new(MockEngine::new(), NoClock, ());
        let data: Vec<u8> = (0..20).collect();
        let n = logger.log_hexdump(&data);
        drain(&mut logger);

        let wire = String::from_utf8(logger.engine().wire.clone()).unwrap();
        assert_eq!(wire.len(), n);
        let rows: Vec<&str> = wire.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("(0) 00000000  00 01 02"));
        assert!(rows[1].starts_with("(0) 00000010  10 11 12 13"));
    }

    #[test]
    fn hexdump_stops_at_first_row_that_does_not_fit() {
        let mut logger = DmaLogger::<_, _, (), 128, 128>::new(
            MockEngine {
                busy: true,
                ..MockEngine::new()
            },
            NoClock,
            (),
        );
        let data: Vec<u8> = (0..40).collect();
        // "(0) " + 79-column row + "\n"; a second row doesn't fit in the 127 usable bytes
        assert_eq!(logger.log_hexdump(&data), 84);
        assert_eq!(logger.ring().pending(), 84);
        assert_eq!(logger.dropped(), 1);
    }

    #[test]
    fn reset_waits_for_the_engine_to_let_go() {
        let mut logger = DmaLogger::<_, _, (), 64, 32>::new(LazyEngine::new(), NoClock, ());
        logger.enqueue(b"hello\n").unwrap();
        assert_eq!(logger.reset(), Err(Error::TransferInFlight));
        logger.enqueue(b"XXXXXX").unwrap();

        assert!(logger.engine_mut().finish());
        assert_eq!(logger.engine().wire, b"hello\n");
        // hardware done, completion not yet handled
        assert_eq!(logger.reset(), Err(Error::TransferInFlight));

        logger.on_transfer_complete();
        assert!(logger.engine_mut().finish());
        logger.on_transfer_complete();
        assert_eq!(logger.engine().wire, b"hello\nXXXXXX");

        assert_eq!(logger.reset(), Ok(()));
        assert_eq!((logger.ring().head(), logger.ring().tail()), (0, 0));
    }

    #[test]
    fn random_interleaving_loses_and_duplicates_nothing() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut logger = SmallLogger::new(MockEngine::new(), NoClock, ());
        let mut expected = Vec::new();
        let mut rejected = 0;

        for i in 0..5_000u32 {
            if rng.gen_bool(0.6) {
                let len = rng.gen_range(0..20);
                let line: Vec<u8> = (0..len)
                    .map(|k| b'a' + ((i as usize + k) % 26) as u8)
                    .chain(core::iter::once(b'\n'))
                    .collect();
                match logger.enqueue(&line) {
                    Ok(n) => {
                        assert_eq!(n, line.len());
                        expected.extend_from_slice(&line);
                    }
                    Err(Error::InsufficientSpace { needed, available }) => {
                        assert!(needed > available);
                        rejected += 1;
                    }
                    Err(e) => panic!("unexpected error: {e}"),
                }
            } else if logger.engine_mut().finish() {
                logger.on_transfer_complete();
            }
            let ring = logger.ring();
            assert!(ring.space_available() <= 63);
            assert!(ring.runnable() <= 64 - ring.head());
        }
        drain(&mut logger);

        assert!(rejected > 0, "test never exercised a full queue");
        assert_eq!(logger.dropped(), rejected);
        assert_eq!(logger.engine().wire, expected);
        for &(offset, len) in &logger.engine().armed {
            assert!(len > 0 && offset + len <= 64);
        }
    }

    #[test]
    fn shared_logger_lifecycle() {
        let shared: SharedLogger<MockEngine, NoClock, (), 64, 32> = SharedLogger::new();
        assert_eq!(logmsg!(shared, "early"), Err(Error::Uninitialized));
        assert_eq!(shared.on_transfer_complete(), Err(Error::Uninitialized));
        assert!(!shared.is_initialized());

        shared.log_init(MockEngine::new(), NoClock, ()).unwrap();
        assert_eq!(
            shared.log_init(MockEngine::new(), NoClock, ()),
            Err(Error::AlreadyInitialized)
        );

        assert_eq!(logmsg!(shared, "a"), Ok(6));
        assert_eq!(logmsg!(shared, "b"), Ok(6));
        shared.with(|l| l.engine_mut().finish()).unwrap();
        assert_eq!(shared.on_transfer_complete(), Ok(Arm::Started(6)));
        shared.with(|l| l.engine_mut().finish()).unwrap();
        assert_eq!(shared.on_transfer_complete(), Ok(Arm::Empty));

        let wire = shared.with(|l| l.engine().wire.clone()).unwrap();
        assert_eq!(wire, b"(0) a\n(0) b\n");
        assert_eq!(shared.dropped(), 0);
    }

    /// Logs through the same handle while being formatted.
    struct Nested<'a> {
        logger: &'a SharedLogger<MockEngine, NoClock, (), 64, 32>,
        inner: Cell<Option<Result<usize, Error>>>,
    }

    impl fmt::Display for Nested<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            self.inner.set(Some(logmsg!(self.logger, "inner")));
            f.write_str("outer")
        }
    }

    #[test]
    fn nested_call_is_refused_without_panicking() {
        let shared: SharedLogger<MockEngine, NoClock, (), 64, 32> = SharedLogger::new();
        shared.log_init(MockEngine::new(), NoClock, ()).unwrap();
        let nested = Nested {
            logger: &shared,
            inner: Cell::new(None),
        };

        assert_eq!(logmsg!(shared, "{nested}"), Ok(10));
        assert_eq!(nested.inner.get(), Some(Err(Error::Reentrant)));

        let wire = shared.with(|l| l.engine().wire.clone()).unwrap();
        assert_eq!(wire, b"(0) outer\n");
        assert!(shared.is_initialized());
        assert_eq!(shared.with(|_| shared.is_initialized()), Ok(true));
    }

    #[test]
    fn shared_logger_from_many_threads() {
        static SHARED: SharedLogger<MockEngine, NoClock, (), 4096, 64> = SharedLogger::new();
        SHARED.log_init(MockEngine::new(), NoClock, ()).unwrap();

        std::thread::scope(|s| {
            for t in 0..4 {
                s.spawn(move || {
                    for i in 0..50 {
                        logmsg!(SHARED, "t{t} m{i:02}").unwrap();
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..1000 {
                    let _ = SHARED.with(|l| {
                        if l.engine_mut().finish() {
                            l.on_transfer_complete();
                        }
                    });
                    std::thread::yield_now();
                }
            });
        });
        SHARED.with(|l| drain(l)).unwrap();

        let wire = SHARED.with(|l| l.engine().wire.clone()).unwrap();
        let wire = String::from_utf8(wire).unwrap();
        assert_eq!(wire.lines().count(), 200);
        for t in 0..4 {
            let mine: Vec<&str> = wire
                .lines()
                .filter(|l| l.starts_with(&format!("(0) t{t} ")))
                .collect();
            let want: Vec<String> = (0..50).map(|i| format!("(0) t{t} m{i:02}")).collect();
            assert_eq!(mine, want);
        }
    }
}
