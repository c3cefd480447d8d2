use crate::engine::TransferEngine;
use crate::logger::SharedLogger;
use crate::pump::StatusIndicator;
use crate::render::MillisClock;
use log::{LevelFilter, Log, Metadata, Record};

/// Verbosity levels, most quiet first.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum DbgLevel {
    /// No log output.
    None,
    /// Critical errors; the module cannot recover on its own.
    Error,
    /// Error conditions from which recovery measures have been taken.
    Warn,
    /// Normal flow of events.
    Info,
    /// Values, pointers, sizes and similar, not needed in normal use.
    Debug,
    /// Large chunks of debugging information, or messages frequent enough to flood the output.
    Verbose,
}

impl DbgLevel {
    pub const fn to_level_filter(self) -> LevelFilter {
        match self {
            DbgLevel::None => LevelFilter::Off,
            DbgLevel::Error => LevelFilter::Error,
            DbgLevel::Warn => LevelFilter::Warn,
            DbgLevel::Info => LevelFilter::Info,
            DbgLevel::Debug => LevelFilter::Debug,
            DbgLevel::Verbose => LevelFilter::Trace,
        }
    }
}

impl From<DbgLevel> for LevelFilter {
    fn from(level: DbgLevel) -> Self {
        level.to_level_filter()
    }
}

/// Routes `log` records into a [`SharedLogger`] as `"<LEVEL>: <message>"` lines.
///
/// Records that don't fit in the queue are dropped like any other message.
pub struct DmaLogFacade<E: 'static, K: 'static, I: 'static, const C: usize, const M: usize> {
    logger: &'static SharedLogger<E, K, I, C, M>,
    max_level: LevelFilter,
}

impl<E: 'static, K: 'static, I: 'static, const C: usize, const M: usize>
    DmaLogFacade<E, K, I, C, M>
{
    pub const fn new(logger: &'static SharedLogger<E, K, I, C, M>, max_level: DbgLevel) -> Self {
        Self {
            logger,
            max_level: max_level.to_level_filter(),
        }
    }

    pub fn max_level(&self) -> LevelFilter {
        self.max_level
    }
}

impl<E: 'static, K: 'static, I: 'static, const C: usize, const M: usize>
    DmaLogFacade<E, K, I, C, M>
where
    Self: Log,
{
    /// Make this the global `log` logger.
    #[cfg(target_has_atomic = "ptr")]
    pub fn install(&'static self) -> Result<(), log::SetLoggerError> {
        log::set_logger(self).map(|()| log::set_max_level(self.max_level))
    }
}

impl<E, K, I, const C: usize, const M: usize> Log for DmaLogFacade<E, K, I, C, M>
where
    E: TransferEngine + Send + 'static,
    K: MillisClock + Send + 'static,
    I: StatusIndicator + Send + 'static,
{
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let _ = self
                .logger
                .log_message(format_args!("{}: {}", record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}
