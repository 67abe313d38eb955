use std::path::Path;

use anyhow::Result;
use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};

/// Logs to stderr, and also to a rotating `geotrack.log` in `log_dir` when
/// one is given.
pub fn init(level: LevelFilter, log_dir: Option<&Path>) -> Result<()> {
    let config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let Some(log_dir) = log_dir {
        let log = FileRotate::new(
            log_dir.join("geotrack.log"),
            AppendTimestamp::default(FileLimit::MaxFiles(3)),
            ContentLimit::Lines(1000),
            Compression::None,
            #[cfg(unix)]
            None,
        );
        loggers.push(WriteLogger::new(level, config, log));
    }
    CombinedLogger::init(loggers)?;
    Ok(())
}
