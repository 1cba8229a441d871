use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::Subscriber;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, reload};

use crate::utils;

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// Per-target log levels, e.g. `{ "portal": "debug", "reqwest": "warn" }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>")]
pub struct LoggerTargets {
    directives: Vec<Directive>,
}

impl TryFrom<BTreeMap<String, String>> for LoggerTargets {
    type Error = String;

    fn try_from(targets: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let directives = targets
            .iter()
            .map(|(target, level)| {
                format!("{target}={level}")
                    .parse::<Directive>()
                    .map_err(|e| format!("invalid level for `{target}`: {e}"))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self { directives })
    }
}

impl LoggerTargets {
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        utils::serde::load_json_from_file(path)
    }

    pub fn build_filter(&self) -> EnvFilter {
        self.directives
            .iter()
            .cloned()
            .fold(EnvFilter::default(), EnvFilter::add_directive)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub outputs: Vec<LoggerOutput>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            outputs: vec![LoggerOutput::Stderr {
                format: LogFormat::Auto,
            }],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable on stderr, JSON in files.
    #[default]
    Auto,
    Human,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogRotation {
    Minutely,
    #[default]
    Hourly,
    Daily,
    Never,
}

impl From<LogRotation> for Rotation {
    fn from(value: LogRotation) -> Self {
        match value {
            LogRotation::Minutely => Rotation::MINUTELY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LoggerOutput {
    Stderr {
        #[serde(default)]
        format: LogFormat,
    },
    File(LoggerFileOutput),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerFileOutput {
    pub dir: PathBuf,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "log_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "max_log_files")]
    pub max_files: NonZeroUsize,
    #[serde(default)]
    pub rotation: LogRotation,
}

impl LoggerOutput {
    pub fn build_layer<S>(&self) -> Result<BoxedLayer<S>>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
    {
        Ok(match self {
            Self::Stderr {
                format: LogFormat::Json,
            } => tracing_stackdriver::layer()
                .with_writer(std::io::stderr)
                .boxed(),
            Self::Stderr { .. } => {
                let layer = fmt::layer().with_writer(std::io::stderr);
                if is_systemd_child() {
                    layer.without_time().with_ansi(false).boxed()
                } else {
                    layer.with_ansi(std::io::stderr().is_terminal()).boxed()
                }
            }
            Self::File(file) => {
                let writer = tracing_appender::rolling::Builder::new()
                    .rotation(file.rotation.into())
                    .filename_prefix(&file.file_prefix)
                    .max_log_files(file.max_files.get())
                    .build(&file.dir)
                    .with_context(|| format!("failed to open log dir {}", file.dir.display()))?;

                match file.format {
                    LogFormat::Human => fmt::layer()
                        .without_time()
                        .with_ansi(false)
                        .with_writer(writer)
                        .boxed(),
                    LogFormat::Json | LogFormat::Auto => {
                        tracing_stackdriver::layer().with_writer(writer).boxed()
                    }
                }
            }
        })
    }
}

fn log_file_prefix() -> String {
    "portal.log".to_owned()
}

fn max_log_files() -> NonZeroUsize {
    NonZeroUsize::new(25).unwrap_or(NonZeroUsize::MIN)
}

pub fn is_systemd_child() -> bool {
    #[cfg(target_os = "linux")]
    {
        // SAFETY: `getppid` has no preconditions.
        let parent = unsafe { libc::getppid() };
        parent == 1 || std::env::var_os("SYSTEMD_EXEC_PID").is_some()
    }

    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

/// Installs the global subscriber. Only the first call can succeed.
///
/// Without `targets_path` the filter comes from `RUST_LOG` (default `info`).
/// Otherwise the targets file is used and re-read whenever it changes.
pub fn init_logger(config: &LoggerConfig, targets_path: Option<PathBuf>) -> Result<()> {
    use tracing_subscriber::layer::SubscriberExt;

    static INITIALIZED: AtomicBool = AtomicBool::new(false);
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        anyhow::bail!("logger was already initialized");
    }

    let filter = make_filter(targets_path.as_deref())?;
    let (filter, handle) = reload::Layer::new(filter);

    let outputs = config
        .outputs
        .iter()
        .map(LoggerOutput::build_layer)
        .collect::<Result<Vec<_>>>()?;

    let subscriber = tracing_subscriber::registry().with(filter).with(outputs);
    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(path) = targets_path {
        watch_targets(path, handle)?;
    }

    Ok(())
}

fn make_filter(targets_path: Option<&Path>) -> Result<EnvFilter> {
    Ok(match targets_path {
        None => EnvFilter::builder()
            .with_default_directive(tracing::Level::INFO.into())
            .from_env_lossy(),
        Some(path) => LoggerTargets::load_from(path)
            .context("failed to load logger targets")?
            .build_filter(),
    })
}

fn watch_targets(path: PathBuf, handle: reload::Handle<EnvFilter, Registry>) -> Result<()> {
    const INTERVAL: Duration = Duration::from_secs(10);

    let modified_at = |path: &Path| -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    };

    std::thread::Builder::new()
        .name("watch_logger_targets".to_owned())
        .spawn(move || {
            tracing::info!(path = %path.display(), "watching logger targets");

            let mut last_modified = modified_at(&path);
            loop {
                std::thread::sleep(INTERVAL);

                let modified = modified_at(&path);
                if modified == last_modified {
                    continue;
                }
                last_modified = modified;

                match make_filter(Some(&path)) {
                    Ok(filter) => {
                        if handle.reload(filter).is_err() {
                            break;
                        }
                        tracing::info!("reloaded logger targets");
                    }
                    Err(e) => tracing::error!("failed to reload logger targets: {e:#}"),
                }
            }
        })
        .context("failed to spawn logger targets watcher")?;

    Ok(())
}

/// Logs panics through `tracing` and exits the process.
pub fn set_abort_with_tracing() {
    std::panic::set_hook(Box::new(|info| {
        use std::io::Write;

        let backtrace = std::backtrace::Backtrace::force_capture();
        tracing::error!("panic: {info}\n{backtrace}");

        std::io::stderr().flush().ok();
        std::io::stdout().flush().ok();

        #[allow(clippy::exit)]
        std::process::exit(1);
    }));
}
