mod line;

use clap::Parser;
use dmalog::{
    DbgLevel, DefaultSharedLogger, DmaLogFacade, LOG_DMA_BUFFER_SIZE, LOG_ITEM_MAX_SIZE, color,
    logmsg,
};
use line::{SimClock, SimEngine, TxLed};
use rand::Rng;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

static LOGGER: DefaultSharedLogger<SimEngine, SimClock, TxLed> = DefaultSharedLogger::new();
static FACADE: DmaLogFacade<SimEngine, SimClock, TxLed, LOG_DMA_BUFFER_SIZE, LOG_ITEM_MAX_SIZE> =
    DmaLogFacade::new(&LOGGER, DbgLevel::Info);

const PALETTE: [&str; 4] = [color::GREEN, color::YELLOW, color::VIOLET, color::RED];

/// Drive the DMA logger against a simulated serial line; the line's output goes to stdout.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct CmdArgs {
    /// Simulated line rate, 8N1.
    #[arg(short = 'b', long = "baud", default_value_t = 115_200)]
    baud: u32,
    /// Number of concurrent producer threads.
    #[arg(short = 'p', long = "producers", default_value_t = 4)]
    producers: usize,
    /// Messages logged by each producer.
    #[arg(short = 'n', long = "messages", default_value_t = 50)]
    messages: usize,
    /// Upper bound on the random pause between a producer's messages, in microseconds.
    #[arg(short = 'j', long = "jitter-us", default_value_t = 500)]
    jitter_us: u64,
    /// Log a hex dump of a sample buffer once the producers are done.
    #[arg(long)]
    hexdump: bool,
    /// Color each producer's messages.
    #[arg(long)]
    color: bool,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = CmdArgs::parse();
    if args.baud == 0 {
        eyre::bail!("baud rate must be nonzero");
    }

    let led = TxLed::default();
    let (engine, _line) = line::spawn_line(args.baud, || {
        match LOGGER.on_transfer_complete() {
            Ok(arm) => tracing::trace!(next = arm.armed(), "transfer complete"),
            Err(e) => tracing::error!("completion not handled: {e}"),
        }
    })?;
    LOGGER.log_init(engine, SimClock::start(), led.clone())?;
    FACADE
        .install()
        .map_err(|e| eyre::eyre!("failed to install log facade: {e}"))?;

    log::info!(
        "{} producers x {} messages at {} baud",
        args.producers,
        args.messages,
        args.baud
    );

    let started = Instant::now();
    let args = &args;
    let (accepted, rejected) = std::thread::scope(|s| {
        let producers: Vec<_> = (0..args.producers)
            .map(|id| s.spawn(move || produce(id, args)))
            .collect();
        producers
            .into_iter()
            .filter_map(|h| h.join().ok())
            .fold((0, 0), |(a, r), (x, y)| (a + x, r + y))
    });

    if args.hexdump {
        let sample: Vec<u8> = [0x02, 0x03, 0x1f, 0x00, 0x0d]
            .into_iter()
            .chain(b"dmalog hexdump sample\r\n".iter().copied())
            .collect();
        let queued = LOGGER.log_hexdump(&sample)?;
        tracing::debug!(bytes = sample.len(), queued, "hex dump logged");
    }

    while !LOGGER.with(|l| l.ring().is_empty() && !l.pump().in_flight())? {
        std::thread::sleep(Duration::from_millis(1));
    }

    tracing::info!(
        accepted,
        rejected,
        dropped = LOGGER.dropped(),
        transfers = led.toggles(),
        elapsed = ?started.elapsed(),
        "line drained"
    );
    Ok(())
}

fn produce(id: usize, args: &CmdArgs) -> (usize, usize) {
    let mut rng = rand::thread_rng();
    let (mut accepted, mut rejected) = (0, 0);
    for i in 0..args.messages {
        let result = if args.color {
            let c = PALETTE[id % PALETTE.len()];
            logmsg!(LOGGER, "{c}producer {id}{} message {i}", color::RESET)
        } else {
            logmsg!(LOGGER, "producer {id} message {i}")
        };
        match result {
            Ok(_) => accepted += 1,
            Err(dmalog::Error::InsufficientSpace { needed, available }) => {
                tracing::debug!(id, i, needed, available, "dropped");
                rejected += 1;
            }
            Err(e) => {
                tracing::error!(id, "producer stopping: {e}");
                break;
            }
        }
        if args.jitter_us > 0 {
            std::thread::sleep(Duration::from_micros(rng.gen_range(0..=args.jitter_us)));
        }
    }
    (accepted, rejected)
}
