use serde::{Deserialize, Serialize};
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::fmt;
use tracing_subscriber::Registry;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFilterLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogFilterLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFilterLevel::Trace => f.write_str("trace"),
            LogFilterLevel::Debug => f.write_str("debug"),
            LogFilterLevel::Info => f.write_str("info"),
            LogFilterLevel::Warn => f.write_str("warn"),
            LogFilterLevel::Error => f.write_str("error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    pub crate_name: String,
    pub filter_level: LogFilterLevel,
}

// Underscored because that is how crate names appear as tracing targets.
const DEFAULT_CRATE_NAMES: &[&str] = &["hashvec", "hashvec_cli", "hashvec_error", "hashvec_tracing"];

fn global_filter_directives(custom_filters: &[LogFilter]) -> String {
    let mut directives = vec!["error".to_string()];
    directives.extend(
        DEFAULT_CRATE_NAMES
            .iter()
            .map(|crate_name| format!("{crate_name}=info")),
    );
    directives.extend(
        custom_filters
            .iter()
            .map(|custom_filter| format!("{}={}", custom_filter.crate_name, custom_filter.filter_level)),
    );
    directives.join(",")
}

/// `RUST_LOG` wins over the default directives when it is set.
pub fn init_global_filter_layer(
    custom_filters: &[LogFilter],
) -> Box<dyn Layer<Registry> + Send + Sync> {
    let global_filter = global_filter_directives(custom_filters);
    EnvFilter::new(std::env::var("RUST_LOG").unwrap_or(global_filter)).boxed()
}

/// Logs go to stderr; stdout is left to program output.
pub fn init_stderr_layer() -> Box<dyn Layer<Registry> + Send + Sync> {
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .boxed()
}

pub fn init_tracing(
    layers: Vec<Box<dyn Layer<Registry> + Send + Sync>>,
) -> Result<(), SetGlobalDefaultError> {
    let subscriber = tracing_subscriber::registry().with(layers);
    tracing::subscriber::set_global_default(subscriber)?;
    tracing::debug!("Global tracing subscriber set");
    Ok(())
}

pub fn init_panic_tracing_hook() {
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let payload = panic_info.payload();

        let payload = if let Some(s) = payload.downcast_ref::<&str>() {
            Some(&**s)
        } else {
            payload.downcast_ref::<String>().map(|s| s.as_str())
        };

        tracing::error!(
            panic.payload = payload,
            panic.location = panic_info.location().map(|l| l.to_string()),
            panic.backtrace = tracing::field::display(std::backtrace::Backtrace::capture()),
            "A panic occurred"
        );

        prev_hook(panic_info);
    }));
}

pub fn init_stderr_tracing(custom_filters: &[LogFilter]) -> Result<(), SetGlobalDefaultError> {
    let layers = vec![
        // The global filter applies to all subsequent layers
        init_global_filter_layer(custom_filters),
        init_stderr_layer(),
    ];
    init_tracing(layers)?;
    init_panic_tracing_hook();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(
            global_filter_directives(&[]),
            "error,hashvec=info,hashvec_cli=info,hashvec_error=info,hashvec_tracing=info"
        );
    }

    #[test]
    fn test_custom_filters_come_last() {
        let directives = global_filter_directives(&[LogFilter {
            crate_name: "hashvec".to_string(),
            filter_level: LogFilterLevel::Trace,
        }]);
        assert!(directives.ends_with(",hashvec=trace"));
    }

    #[test]
    fn test_layers_compose_into_subscriber() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let layers = vec![init_global_filter_layer(&[]), init_stderr_layer()];
        let subscriber = tracing_subscriber::registry().with(layers);
        tracing::subscriber::with_default(subscriber, || {
            assert!(tracing::enabled!(target: "hashvec", tracing::Level::INFO));
            assert!(!tracing::enabled!(target: "hashvec", tracing::Level::TRACE));
        });
    }

    #[test]
    fn test_filter_from_json() {
        let filter: LogFilter =
            serde_json::from_str(r#"{"crate_name": "hashvec", "filter_level": "debug"}"#).unwrap();
        assert_eq!(filter.filter_level, LogFilterLevel::Debug);
        assert_eq!(filter.filter_level.to_string(), "debug");
    }
}
