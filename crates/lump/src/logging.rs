use crate::config::{LogFormat, LogLevel};

/// Install a global `tracing` subscriber writing to stderr.
///
/// A subscriber installed earlier wins; later calls are no-ops.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level.as_filter())
        .with_ansi(false)
        .with_target(false);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(LogFormat::Json, LogLevel::Debug);
        init_logging(LogFormat::Text, LogLevel::Warn);
        tracing::debug!("logging initialised");
    }
}
