use crate::config::Config;
use log::{LevelFilter, SetLoggerError};
use simplelog::{self, ConfigBuilder};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Modules to filter out from logging when not in Trace mode.
/// These are typically verbose dependencies that clutter normal log output.
const FILTERED_MODULES: &[&str] = &["reqwest", "hyper", "hyper_util", "rustls", "h2", "mio"];

/// Upper bound on log output kept in memory before `process.log` is attached.
const MAX_BUFFERED_BYTES: usize = 1024 * 1024;

enum Sink {
    Buffer(Vec<u8>),
    File(File),
    Closed,
}

/// Per-run log sink backing `process.log`.
///
/// Output written before the target directory exists is buffered and replayed
/// into the file by [`RunLog::attach`]. Clones share the same sink.
#[derive(Clone)]
pub struct RunLog {
    sink: Arc<Mutex<Sink>>,
}

impl Default for RunLog {
    fn default() -> Self {
        Self {
            sink: Arc::new(Mutex::new(Sink::Buffer(Vec::new()))),
        }
    }
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `path` for appending, writes everything buffered so far and sends
    /// all further output there.
    pub fn attach(&self, path: &Path) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut sink = self.lock()?;
        if let Sink::Buffer(buffered) = &*sink {
            file.write_all(buffered)?;
        }
        file.flush()?;
        *sink = Sink::File(file);
        Ok(())
    }

    /// Stops writing to the attached file, e.g. before its directory is removed.
    /// Later output is discarded.
    pub fn close(&self) -> io::Result<()> {
        let mut sink = self.lock()?;
        if let Sink::File(file) = &mut *sink {
            file.flush()?;
        }
        *sink = Sink::Closed;
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        matches!(self.lock().as_deref(), Ok(Sink::File(_)))
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, Sink>> {
        self.sink
            .lock()
            .map_err(|_| io::Error::other("run log lock poisoned"))
    }
}

impl Write for RunLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut sink = self.lock()?;
        match &mut *sink {
            Sink::Buffer(buffered) => {
                let room = MAX_BUFFERED_BYTES.saturating_sub(buffered.len());
                buffered.extend_from_slice(&buf[..buf.len().min(room)]);
                Ok(buf.len())
            }
            Sink::File(file) => file.write(buf),
            Sink::Closed => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut *self.lock()? {
            Sink::File(file) => file.flush(),
            _ => Ok(()),
        }
    }
}

pub struct Logger {}

impl Logger {
    /// Initializes the global logger with configuration based on the provided Config.
    ///
    /// Log lines go to the console and to the returned [`RunLog`], which becomes
    /// `process.log` once attached to the run's target directory.
    /// When the log level is set to Trace, all logs including dependency logs are shown.
    /// For all other log levels, verbose dependency logs are filtered out.
    pub fn init_logger(config: &Config) -> Result<RunLog, SetLoggerError> {
        let level = config.effective_log_level();
        let log_level_filter = Self::convert_level_filter(level);
        let apply_filters = Self::should_filter_dependencies(level);
        let log_config = Self::build_log_config(apply_filters);
        let run_log = RunLog::new();

        simplelog::CombinedLogger::init(vec![
            simplelog::TermLogger::new(
                log_level_filter,
                log_config.clone(),
                simplelog::TerminalMode::Mixed,
                simplelog::ColorChoice::Auto,
            ),
            simplelog::WriteLogger::new(log_level_filter, log_config, run_log.clone()),
        ])?;

        Ok(run_log)
    }

    /// Converts log::LevelFilter to simplelog::LevelFilter.
    fn convert_level_filter(level: LevelFilter) -> simplelog::LevelFilter {
        match level {
            LevelFilter::Off => simplelog::LevelFilter::Off,
            LevelFilter::Error => simplelog::LevelFilter::Error,
            LevelFilter::Warn => simplelog::LevelFilter::Warn,
            LevelFilter::Info => simplelog::LevelFilter::Info,
            LevelFilter::Debug => simplelog::LevelFilter::Debug,
            LevelFilter::Trace => simplelog::LevelFilter::Trace,
        }
    }

    /// Determines whether dependency logging should be filtered.
    ///
    /// Returns `false` for Trace level (show all logs), `true` for all other levels.
    fn should_filter_dependencies(level: LevelFilter) -> bool {
        level != LevelFilter::Trace
    }

    /// Builds a simplelog Config with optional module filtering.
    fn build_log_config(apply_filters: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if apply_filters {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}
