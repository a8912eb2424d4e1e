use crate::config::{LoggingConfig, Section};
use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};
use parking_lot::Mutex;
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Keeps the non-blocking console worker alive for the whole process.
static CONSOLE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

const DEFAULT_SECTION: &str = "default";

/// `None` means the sink is switched off; unknown strings fall back to INFO.
fn parse_level(s: &str) -> Option<LevelFilter> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" => Some(LevelFilter::WARN),
        "error" => Some(LevelFilter::ERROR),
        "off" | "none" => None,
        _ => Some(LevelFilter::INFO),
    }
}

/// `target == prefix` or `target` starts with `prefix::`.
fn matches_prefix(target: &str, prefix: &str) -> bool {
    target
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

// ================= rotating file sinks =================

#[derive(Clone)]
struct RotatingFile(Arc<Mutex<FileRotate<AppendTimestamp>>>);

impl RotatingFile {
    fn open(section: &Section, base_dir: &Path) -> std::io::Result<Self> {
        let path = resolve_log_path(&section.file, base_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // MaxFiles wins over age-based retention when both are set.
        let limit = match section.max_backups {
            Some(n) => FileLimit::MaxFiles(n),
            None => FileLimit::Age(chrono::Duration::days(
                i64::from(section.max_age_days.unwrap_or(1)),
            )),
        };
        let max_bytes = section.max_size_mb.unwrap_or(100) as usize * 1024 * 1024;

        let rot = FileRotate::new(
            &path,
            AppendTimestamp::default(limit),
            ContentLimit::BytesSurpassed(max_bytes),
            Compression::None,
            None,
        );
        Ok(Self(Arc::new(Mutex::new(rot))))
    }
}

/// A routed write target; `None` silently drops the record.
struct SinkHandle(Option<RotatingFile>);

impl Write for SinkHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &self.0 {
            Some(f) => f.0.lock().write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &self.0 {
            Some(f) => f.0.lock().flush(),
            None => Ok(()),
        }
    }
}

/// Routes records to per-subsystem files by target prefix, falling back to
/// the default file. The longest matching prefix wins.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<RotatingFile>,
    by_prefix: Vec<(String, RotatingFile)>,
}

impl FileRouter {
    fn build(cfg: &LoggingConfig, base_dir: &Path) -> Self {
        let mut router = Self::default();
        for (name, section) in cfg {
            if section.file.trim().is_empty() {
                continue;
            }
            let file = match RotatingFile::open(section, base_dir) {
                Ok(f) => f,
                Err(e) => {
                    // No subscriber is installed yet, so stderr is the only channel.
                    eprintln!(
                        "Failed to open log file '{}' for '{name}': {e}",
                        resolve_log_path(&section.file, base_dir).display()
                    );
                    continue;
                }
            };
            if name == DEFAULT_SECTION {
                router.default = Some(file);
            } else {
                router.by_prefix.push((name.clone(), file));
            }
        }
        router
            .by_prefix
            .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
        router
    }

    fn resolve(&self, target: &str) -> Option<RotatingFile> {
        self.by_prefix
            .iter()
            .find(|(prefix, _)| matches_prefix(target, prefix))
            .map(|(_, f)| f.clone())
            .or_else(|| self.default.clone())
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = SinkHandle;

    fn make_writer(&'a self) -> Self::Writer {
        SinkHandle(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        SinkHandle(self.resolve(meta.target()))
    }
}

// ================= per-sink level targets =================

#[derive(Clone, Copy)]
enum Sink {
    Console,
    File { has_default_file: bool },
}

fn build_targets(cfg: &LoggingConfig, sink: Sink) -> Targets {
    let level_of = |s: &Section| match sink {
        Sink::Console => parse_level(&s.console_level),
        Sink::File { .. } => parse_level(&s.file_level),
    };

    let fallback = match sink {
        Sink::Console | Sink::File { has_default_file: true } => LevelFilter::INFO,
        Sink::File { has_default_file: false } => LevelFilter::OFF,
    };
    let default_level = cfg
        .get(DEFAULT_SECTION)
        .map(|s| level_of(s).unwrap_or(LevelFilter::OFF))
        .unwrap_or(fallback);

    let mut targets = Targets::new().with_default(default_level);
    for (name, section) in cfg.iter().filter(|(k, _)| k.as_str() != DEFAULT_SECTION) {
        // A subsystem without a file of its own has no file-level rule.
        if matches!(sink, Sink::File { .. }) && section.file.trim().is_empty() {
            continue;
        }
        if let Some(level) = level_of(section) {
            targets = targets.with_target(name.clone(), level);
        }
    }
    targets
}

// ================= public init =================

/// Install the global subscriber: human-readable console output on stderr plus
/// JSON lines into rotating files. `RUST_LOG`, when set, caps both sinks.
/// Relative file paths are resolved against `base_dir`.
pub fn init_logging_unified(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` → `tracing` before installing the subscriber.
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("LogTracer init skipped: {e}");
    }

    let env = EnvFilter::try_from_default_env().ok();

    if cfg.is_empty() {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339());
        let _ = tracing_subscriber::registry()
            .with(env)
            .with(fmt_layer)
            .try_init();
        return;
    }

    let router = FileRouter::build(cfg, base_dir);
    let console_targets = build_targets(cfg, Sink::Console);
    let file_targets = build_targets(
        cfg,
        Sink::File {
            has_default_file: router.default.is_some(),
        },
    );

    let (nb_stderr, guard) = tracing_appender::non_blocking(std::io::stderr());
    let _ = CONSOLE_GUARD.set(guard);

    let console_layer = fmt::layer()
        .with_writer(nb_stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(console_targets);

    let file_layer = (!router.is_empty()).then(|| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(router)
            .with_filter(file_targets)
    });

    let _ = tracing_subscriber::registry()
        .with(env)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}
