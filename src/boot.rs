use chrono::Local;
use log::LevelFilter;
use std::io::{self, Write};

use env_logger::{Builder, Target};

/// Environment variable naming a file that mirrors the terminal log
pub const LOG_FILE_ENV: &str = "BLACKBOX_LOG_FILE";

/// Multi-writer for logging to both file and stderr
struct DualWriter {
    file: std::fs::File,
    stderr: io::Stderr,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        self.stderr.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.stderr.flush()?;
        Ok(())
    }
}

fn builder(level: LevelFilter) -> Builder {
    let mut builder = Builder::new();
    builder
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .filter_level(level)
        .parse_default_env();
    builder
}

/// Initialize the process logger
///
/// `RUST_LOG` overrides `level`. When [`LOG_FILE_ENV`] is set, every line is
/// also appended to that file.
pub fn init_logger(level: LevelFilter) {
    let Some(path) = std::env::var(LOG_FILE_ENV).ok() else {
        builder(level).init();
        return;
    };

    match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => {
            let dual_writer = DualWriter {
                file,
                stderr: io::stderr(),
            };
            builder(level)
                .target(Target::Pipe(Box::new(dual_writer)))
                .init();
            log::info!("Logging to terminal and {path}");
        }
        Err(err) => {
            builder(level).init();
            log::warn!("Failed to open log file '{path}': {err}");
        }
    }
}
