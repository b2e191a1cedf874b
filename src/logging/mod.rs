use std::time::Instant;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 日志环境配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingEnvironment {
    Development,
    Testing,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// 人类可读格式
    Pretty,
    Compact,
}

/// 日志配置
///
/// Logs always go to stderr; stdout carries only the rendered report.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub environment: LoggingEnvironment,
    /// Default level; `RUST_LOG` takes precedence when set.
    pub level: Level,
    pub format: LogFormat,
    pub show_target: bool,
    pub show_thread_ids: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            environment: LoggingEnvironment::Production,
            level: Level::WARN,
            format: LogFormat::Compact,
            show_target: false,
            show_thread_ids: false,
        }
    }
}

impl LoggingConfig {
    pub fn development() -> Self {
        Self {
            environment: LoggingEnvironment::Development,
            level: Level::DEBUG,
            format: LogFormat::Pretty,
            show_target: true,
            show_thread_ids: true,
        }
    }

    pub fn production() -> Self {
        Self::default()
    }

    pub fn testing() -> Self {
        Self {
            environment: LoggingEnvironment::Testing,
            level: Level::ERROR,
            format: LogFormat::Compact,
            show_target: false,
            show_thread_ids: false,
        }
    }

    /// Preset picked from the CLI's `-v` count.
    pub fn for_verbosity(count: u8) -> Self {
        match count {
            0 => Self::production(),
            1 => Self {
                level: Level::INFO,
                ..Self::production()
            },
            _ => Self::development(),
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str().to_ascii_lowercase()))
    }
}

/// 初始化日志系统
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ansi = config.environment != LoggingEnvironment::Production;
    match config.format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids)
                .with_ansi(ansi);
            tracing_subscriber::registry()
                .with(config.filter())
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(config.show_target)
                .with_thread_ids(config.show_thread_ids)
                .with_ansi(ansi);
            tracing_subscriber::registry()
                .with(config.filter())
                .with(fmt_layer)
                .try_init()?;
        }
    }

    tracing::debug!(
        environment = ?config.environment,
        level = ?config.level,
        format = ?config.format,
        "Logging system initialized"
    );
    Ok(())
}

/// 操作性能计时器
pub struct OperationTimer {
    start: Instant,
    operation: String,
    metadata: Vec<(String, String)>,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        Self {
            start: Instant::now(),
            operation: operation.to_string(),
            metadata: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.push((key.to_string(), value.to_string()));
        self
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start.elapsed()
    }

    /// 完成计时并记录日志
    pub fn finish(self) {
        tracing::info!(
            operation = %self.operation,
            duration_ms = self.start.elapsed().as_millis() as u64,
            metadata = ?self.metadata,
            "Operation completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_logging_presets() {
        let dev = LoggingConfig::development();
        assert_eq!(dev.environment, LoggingEnvironment::Development);
        assert_eq!(dev.level, Level::DEBUG);
        assert_eq!(dev.format, LogFormat::Pretty);

        let prod = LoggingConfig::production();
        assert_eq!(prod.environment, LoggingEnvironment::Production);
        assert_eq!(prod.level, Level::WARN);

        let test = LoggingConfig::testing();
        assert_eq!(test.level, Level::ERROR);
        assert_eq!(test.format, LogFormat::Compact);
    }

    #[test]
    fn test_verbosity_count_selects_preset() {
        assert_eq!(LoggingConfig::for_verbosity(0).level, Level::WARN);
        assert_eq!(LoggingConfig::for_verbosity(1).level, Level::INFO);
        assert_eq!(LoggingConfig::for_verbosity(3).level, Level::DEBUG);
    }

    #[test]
    fn test_operation_timer() {
        let timer = OperationTimer::new("analyze")
            .with_metadata("mode", "EXECUTE")
            .with_metadata("files", 3);
        assert_eq!(timer.operation, "analyze");
        assert_eq!(timer.metadata[1], ("files".to_string(), "3".to_string()));

        std::thread::sleep(Duration::from_millis(1));
        assert!(timer.elapsed().as_nanos() > 0);
        timer.finish();
    }
}
