//! Async, cancellable, timeout-aware wrapper around the SRT (Secure
//! Reliable Transport) library.
//!
//! SRT's own API is blocking calls plus a private C-style epoll. This crate
//! adapts that into a `tokio`-native model: [`Socket`] and [`Acceptor`]
//! expose `async fn` connect/read/write/accept, backed by a single
//! [`reactor`] that owns the SRT epoll descriptor and a dedicated poll
//! thread.

mod acceptor;
mod bootstrap;
mod error;
mod ffi;
mod handle;
mod logger;
mod options;
mod reactor;
mod socket;
mod stats;

pub use self::{
    acceptor::{Acceptor, AcceptorState, ListenerCallback},
    bootstrap::{get_instance, get_log_level, set_log_callback, set_log_level, shutdown},
    error::{SrtError, SrtErrorKind},
    logger::{LogCallback, LogLevel},
    options::OptionSet,
    socket::{Socket, SocketState},
    stats::TraceStats,
};
