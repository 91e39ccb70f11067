//! Log bridge (C4).
//!
//! A single process-wide sink receives both the wrapper's own log lines and
//! lines forwarded from the SRT library's own logger. Patterned after
//! `utils/src/logger.rs`'s `fern::Dispatch` formatter for the default sink,
//! with a swappable callback slot the way `AndroidLogger` there swaps in a
//! non-default `log::Log` implementation.

use std::ffi::{c_char, c_int, c_void, CStr};
use std::fmt;
use std::sync::{Once, OnceLock};

use fern::Dispatch;
use parking_lot::Mutex;

use crate::ffi::{self, SRT_LOG_LEVEL};

/// The five severities the bridge recognizes, ordered by increasing
/// severity so a minimum level can be compared with `<`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Notice,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Notice => "NOTICE",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

impl From<SRT_LOG_LEVEL> for LogLevel {
    fn from(level: SRT_LOG_LEVEL) -> Self {
        match level {
            SRT_LOG_LEVEL::LOG_DEBUG => LogLevel::Debug,
            SRT_LOG_LEVEL::LOG_NOTICE | SRT_LOG_LEVEL::LOG_INFO => LogLevel::Notice,
            SRT_LOG_LEVEL::LOG_WARNING => LogLevel::Warning,
            SRT_LOG_LEVEL::LOG_ERR => LogLevel::Error,
            SRT_LOG_LEVEL::LOG_CRIT | SRT_LOG_LEVEL::LOG_ALERT | SRT_LOG_LEVEL::LOG_EMERG => {
                LogLevel::Critical
            }
        }
    }
}

/// `(level, area, message, file, function, line)` — `file`/`function`/`line`
/// are empty/0 for lines forwarded from inside the SRT library, which only
/// gives us a file and line, never a function name.
pub type LogCallback =
    Box<dyn Fn(LogLevel, &str, &str, &str, &str, u32) + Send + Sync + 'static>;

struct Sink {
    min_level: LogLevel,
    callback: Option<LogCallback>,
}

fn sink() -> &'static Mutex<Sink> {
    static SINK: OnceLock<Mutex<Sink>> = OnceLock::new();
    SINK.get_or_init(|| {
        Mutex::new(Sink {
            min_level: LogLevel::Notice,
            callback: None,
        })
    })
}

/// Installs a custom sink, replacing either the default stderr formatter or
/// a previously-installed callback. Passing `None` restores the default.
pub fn set_log_callback(callback: Option<LogCallback>) {
    sink().lock().callback = callback;
}

pub fn get_log_level() -> LogLevel {
    sink().lock().min_level
}

pub fn set_log_level(level: LogLevel) {
    sink().lock().min_level = level;
    unsafe { ffi::srt_setloglevel(to_srt_level(level) as c_int) };
}

fn to_srt_level(level: LogLevel) -> SRT_LOG_LEVEL {
    match level {
        LogLevel::Debug => SRT_LOG_LEVEL::LOG_DEBUG,
        LogLevel::Notice => SRT_LOG_LEVEL::LOG_NOTICE,
        LogLevel::Warning => SRT_LOG_LEVEL::LOG_WARNING,
        LogLevel::Error => SRT_LOG_LEVEL::LOG_ERR,
        LogLevel::Critical => SRT_LOG_LEVEL::LOG_CRIT,
    }
}

/// Installs the process-wide `log::Log` backend for the wrapper's own
/// `log::warn!`/`log::error!` call sites sprinkled through the socket and
/// acceptor modules. Distinct from the `emit`/sink machinery above, which is
/// the C4 bridge for SRT's own log lines and isn't routed through the `log`
/// facade at all. Patterned after `utils/src/logger.rs::init_logger`'s
/// `fern::Dispatch`, minus the file-sink half — a library has no business
/// deciding where its host process's logs end up on disk.
///
/// Idempotent: `log::set_boxed_logger` can only succeed once per process, and
/// a second SRT-backed crate instance (or a caller who already installed
/// their own logger) must not panic the second [`crate::bootstrap::get_instance`]
/// call.
pub(crate) fn init_diagnostics() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        #[cfg(debug_assertions)]
        let dispatch = {
            use fern::colors::{Color, ColoredLevelConfig};
            let colors = ColoredLevelConfig::new()
                .info(Color::Blue)
                .warn(Color::Yellow)
                .error(Color::Red);
            Dispatch::new()
                .level(log::LevelFilter::Debug)
                .format(move |out, message, record| {
                    out.finish(format_args!(
                        "[{}] ({}) {}",
                        colors.color(record.level()),
                        record.target(),
                        message
                    ))
                })
                .chain(std::io::stderr())
        };

        #[cfg(not(debug_assertions))]
        let dispatch = Dispatch::new()
            .level(log::LevelFilter::Info)
            .format(|out, message, record| {
                out.finish(format_args!(
                    "{} [{}] ({}) {}",
                    chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .chain(std::io::stderr());

        if dispatch.apply().is_err() {
            // A global logger is already installed — the caller's own, most
            // likely. Nothing to fix; SRT's own lines still reach `emit`.
        }
    });
}

/// Emits a log line through the installed sink, or the default stderr
/// formatter if none is installed. Used both by the wrapper's own
/// `log_line!` call sites and by the SRT trampoline below.
pub(crate) fn emit(level: LogLevel, area: &str, message: &str, file: &str, function: &str, line: u32) {
    let guard = sink().lock();
    if level < guard.min_level {
        return;
    }

    match &guard.callback {
        Some(cb) => cb(level, area, message, file, function, line),
        None => eprintln!("[{level:<8}] [{area}] [{file}:{function}:{line}] {message}"),
    }
}

/// Convenience used by the wrapper's own components; mirrors `log::log!`'s
/// call shape but routes through the same sink SRT's own lines go through,
/// so both sources are interleaved consistently for a caller watching one
/// stream.
macro_rules! log_line {
    ($level:expr, $area:expr, $($arg:tt)*) => {
        $crate::logger::emit($level, $area, &format!($($arg)*), file!(), "", line!())
    };
}
pub(crate) use log_line;

/// Registered with `srt_setloghandler` during bootstrap. SRT only ever gives
/// us file/line, never a function name, so that field is always empty here.
pub(crate) extern "C" fn srt_log_trampoline(
    _opaque: *const c_void,
    level: SRT_LOG_LEVEL,
    file: *const c_char,
    line: c_int,
    area: *const c_char,
    message: *const c_char,
) {
    let file = unsafe { cstr_to_str(file) };
    let area = unsafe { cstr_to_str(area) };
    let message = unsafe { cstr_to_str(message) };

    emit(
        level.into(),
        area.unwrap_or(""),
        message.unwrap_or(""),
        file.unwrap_or(""),
        "",
        line.max(0) as u32,
    );
}

unsafe fn cstr_to_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn respects_minimum_level() {
        let seen = Arc::new(AtomicBool::new(false));
        let seen2 = seen.clone();
        set_log_level(LogLevel::Error);
        set_log_callback(Some(Box::new(move |_, _, _, _, _, _| {
            seen2.store(true, Ordering::SeqCst);
        })));

        emit(LogLevel::Notice, "test", "should be filtered", "", "", 0);
        assert!(!seen.load(Ordering::SeqCst));

        emit(LogLevel::Critical, "test", "should pass", "", "", 0);
        assert!(seen.load(Ordering::SeqCst));

        set_log_callback(None);
        set_log_level(LogLevel::Notice);
    }
}
