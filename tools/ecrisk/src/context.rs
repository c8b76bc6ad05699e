use std::io::Write;

use log::LevelFilter;

/// User-facing console output, separate from diagnostic logging.
#[derive(Debug, Clone, Copy, Default)]
pub struct Context {
    pub verbose: bool,
    pub quiet: bool,
}

impl Context {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{msg}");
        }
    }

    pub fn verbose(&self, msg: &str) {
        if self.verbose && !self.quiet {
            println!("  {msg}");
        }
    }

    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("✓ {msg}");
        }
    }
}

/// Install the global logger. `-v` raises the level, `RUST_LOG` overrides it.
pub fn init_logging(verbosity: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init();
}
