use ansi_term::Color::{Blue, Cyan, Green, Red, Yellow};
use log::{Level, LevelFilter, Log, Metadata, Record};

/// Colourised stderr logger; stdout stays free for tuner output.
pub struct TerminalLogger;

impl Log for TerminalLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            fn colored_level(level: Level) -> ansi_term::Colour {
                match level {
                    Level::Error => Red,
                    Level::Warn => Yellow,
                    Level::Info => Green,
                    Level::Debug => Blue,
                    Level::Trace => Cyan,
                }
            }

            eprintln!(
                "[{:>21}][{:>14}]: {} [{}:{}]",
                Yellow
                    .paint(std::thread::current().name().unwrap_or("main"))
                    .to_string(),
                colored_level(record.level())
                    .paint(record.level().to_string())
                    .to_string(),
                record.args(),
                Green.paint(record.file().unwrap_or("unknown")),
                Green.paint(record.line().unwrap_or(0).to_string())
            );
        }
    }

    fn flush(&self) {}
}

/// Installs the logger. `verbosity` counts `-v` flags: 0 = warnings,
/// 1 = info, 2 = debug, 3+ = trace.
pub fn init(verbosity: u8) -> anyhow::Result<()> {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    static LOGGER: TerminalLogger = TerminalLogger;
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(level))
        .map_err(|e| anyhow::anyhow!("installing logger: {e}"))
}
