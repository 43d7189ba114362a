use env_logger::{Builder, Target};
use log::LevelFilter;
use std::io::Write;

/// Installs the process-wide logger.
///
/// `verbose` lowers the default level to `debug`; `RUST_LOG` still wins when set.
pub fn setup_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let mut builder = Builder::new();
    builder
        .target(Target::Stderr)
        .filter_level(default_level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] [{}:{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        });

    // A second call (e.g. from tests) keeps the first logger.
    let _ = builder.try_init();
}
