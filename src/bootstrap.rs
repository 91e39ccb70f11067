//! Reactor bootstrap (C8): process-wide library init/teardown and the
//! reactor singleton's public surface.
//!
//! Grounded on `srt::startup`/`srt::cleanup`, which both teacher repos
//! define as the pair bracketing any use of the library; here that pair is
//! folded into [`Reactor::get`]/[`Reactor::shutdown`] and this module is
//! just the thin, documented front door onto it plus the log passthroughs.

use crate::logger::{self, LogCallback, LogLevel};
use crate::reactor::Reactor;

/// Lazy, thread-safe access to the process-wide reactor. First call pays
/// for `srt_startup`, SRT epoll creation, and spawning the poll thread.
pub fn get_instance() {
    Reactor::get();
}

pub fn set_log_callback(callback: Option<LogCallback>) {
    logger::set_log_callback(callback);
}

pub fn get_log_level() -> LogLevel {
    logger::get_log_level()
}

pub fn set_log_level(level: LogLevel) {
    logger::set_log_level(level);
}

/// Tears down the reactor: rarely used, since typical usage runs until
/// process exit. A no-op if the reactor was never started. Idempotent.
pub fn shutdown() {
    if let Some(reactor) = Reactor::try_get() {
        reactor.shutdown();
    }
}
