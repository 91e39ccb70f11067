//! Socket wrapper (C6): state machine for a single SRT connection.
//!
//! Grounded on `srt/src/socket.rs`'s `Socket` (same public shape: `connect`,
//! `read`/`send`, `get_stats`, `Drop` closes the handle) with the teacher's
//! per-call `spawn_blocking` replaced by the reactor's `wait_readable`/
//! `wait_writable`, since a connect/read/write here may need to park rather
//! than block a worker thread outright.

use std::ffi::c_int;
use std::net::SocketAddr;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use libc::c_char;
use os_socketaddr::OsSocketAddr;
use parking_lot::Mutex;
use tokio::net::lookup_host;

use crate::error::{is_would_block, SrtError, SrtErrorKind};
use crate::ffi::{self, SRT_SOCKSTATUS};
use crate::handle::SrtHandle;
use crate::options::OptionSet;
use crate::reactor::Reactor;
use crate::stats::TraceStats;

/// `Fresh -> Connecting -> Connected -> Closing -> Closed`, with the
/// auxiliary terminal `Failed` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Fresh,
    Connecting,
    Connected,
    Closing,
    Closed,
    Failed,
}

type ConnectCallback = Box<dyn Fn(Result<(), SrtError>, &Socket) + Send + Sync>;

/// A single SRT connection. Constructing one only stages options; no SRT
/// handle exists until [`Socket::async_connect`] (or acceptance by
/// [`crate::acceptor::Acceptor`]) creates one.
pub struct Socket {
    handle: Mutex<Option<SrtHandle>>,
    state: Mutex<SocketState>,
    options: Mutex<OptionSet>,
    connect_callback: StdMutex<Option<ConnectCallback>>,
}

impl Socket {
    pub fn new(options: OptionSet) -> Self {
        Self {
            handle: Mutex::new(None),
            state: Mutex::new(SocketState::Fresh),
            options: Mutex::new(options),
            connect_callback: StdMutex::new(None),
        }
    }

    pub(crate) fn from_accepted(raw: ffi::SRTSOCKET, options: OptionSet) -> Self {
        Self {
            handle: Mutex::new(Some(SrtHandle::from_raw(raw))),
            state: Mutex::new(SocketState::Connected),
            options: Mutex::new(options),
            connect_callback: StdMutex::new(None),
        }
    }

    pub fn state(&self) -> SocketState {
        *self.state.lock()
    }

    pub fn set_connect_callback<F>(&self, callback: F)
    where
        F: Fn(Result<(), SrtError>, &Socket) + Send + Sync + 'static,
    {
        *self.connect_callback.lock().unwrap() = Some(Box::new(callback));
    }

    /// Stages `k=v` (or applies immediately as a post-option if the socket
    /// is already connected, logging rather than propagating a failure).
    pub fn set_option(&self, assignment: &str) {
        let mut options = self.options.lock();
        if !options.set(assignment) {
            log::warn!("malformed option assignment '{assignment}'");
            return;
        }
        if *self.state.lock() == SocketState::Connected {
            if let Some(handle) = *self.handle.lock() {
                for name in options.apply_post(handle) {
                    log::warn!("failed to apply post-option '{name}'");
                }
            }
        }
    }

    /// Resolves `host`, then attempts each resolved address in turn (first
    /// success wins) until one connects or all fail.
    pub async fn async_connect(
        &self,
        host: &str,
        port: u16,
        connect_timeout: Option<Duration>,
    ) -> Result<(), SrtError> {
        *self.state.lock() = SocketState::Connecting;

        let addrs: Vec<SocketAddr> = lookup_host((host, port))
            .await
            .map_err(|_| SrtError::new(SrtErrorKind::ConnectionSetup, Some("dns resolution failed".into())))?
            .collect();

        if addrs.is_empty() {
            *self.state.lock() = SocketState::Failed;
            return Err(SrtError::new(
                SrtErrorKind::ConnectionSetup,
                Some(format!("no addresses resolved for {host}")),
            ));
        }

        let mut last_err = None;
        for addr in addrs {
            match self.try_connect_one(addr, connect_timeout).await {
                Ok(()) => {
                    *self.state.lock() = SocketState::Connected;
                    self.apply_post_best_effort();
                    self.notify_connect(Ok(()));
                    return Ok(());
                }
                Err(e) => last_err = Some(e),
            }
        }

        *self.state.lock() = SocketState::Failed;
        let err = last_err.unwrap_or_else(|| SrtError::new(SrtErrorKind::ConnectionSetup, None));
        self.notify_connect(Err(err.clone()));
        Err(err)
    }

    async fn try_connect_one(
        &self,
        addr: SocketAddr,
        connect_timeout: Option<Duration>,
    ) -> Result<(), SrtError> {
        let raw = unsafe { ffi::srt_create_socket() };
        if raw == ffi::SRT_INVALID_SOCK {
            return Err(SrtError::new(SrtErrorKind::ConnectionSetup, Some("srt_create_socket failed".into())));
        }
        let handle = SrtHandle::from_raw(raw);

        for name in self.options.lock().apply_pre(handle) {
            log::warn!("failed to apply pre-option '{name}'");
        }

        let os_addr: OsSocketAddr = addr.into();
        let rc = unsafe { ffi::srt_connect(raw, os_addr.as_ptr() as *const _, os_addr.len() as c_int) };
        if rc == ffi::SRT_ERROR {
            unsafe { ffi::srt_close(raw) };
            return Err(crate::error::map_last_srt_error());
        }

        let result = match connect_timeout {
            Some(d) => Reactor::get().wait_writable_with_timeout(handle, d).await,
            None => Reactor::get().wait_writable(handle).await,
        };

        match result {
            Ok(_flags) => {
                let status = unsafe { ffi::srt_getsockstate(raw) };
                if status == SRT_SOCKSTATUS::SRTS_CONNECTED {
                    *self.handle.lock() = Some(handle);
                    Ok(())
                } else {
                    let err = crate::error::map_last_srt_error();
                    unsafe { ffi::srt_close(raw) };
                    Err(err)
                }
            }
            Err(e) => {
                unsafe { ffi::srt_close(raw) };
                Err(e)
            }
        }
    }

    fn apply_post_best_effort(&self) {
        if let Some(handle) = *self.handle.lock() {
            for name in self.options.lock().apply_post(handle) {
                log::warn!("failed to apply post-option '{name}'");
            }
        }
    }

    fn notify_connect(&self, result: Result<(), SrtError>) {
        let callback = self.connect_callback.lock().unwrap();
        if let Some(cb) = callback.as_ref() {
            let result = result.clone();
            // Caller-supplied; must not be allowed to unwind through FFI-adjacent code.
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb(result, self)));
            if outcome.is_err() {
                log::error!("connect callback panicked");
            }
        }
    }

    /// Single-call send; retries exactly once across a `WouldBlock` after
    /// parking on the reactor for writability, then keeps retrying until
    /// data is accepted or a fatal error is returned.
    pub async fn async_write_packet(&self, buf: &[u8]) -> Result<usize, SrtError> {
        let handle = self.require_handle()?;
        loop {
            let rc = unsafe { ffi::srt_send(handle.as_raw(), buf.as_ptr() as *const c_char, buf.len() as c_int) };
            if rc >= 0 {
                return Ok(rc as usize);
            }
            let err = crate::error::map_last_srt_error();
            if is_would_block(err.kind) {
                Reactor::get().wait_writable(handle).await?;
                continue;
            }
            if err.kind.is_connection_lost() {
                *self.state.lock() = SocketState::Failed;
            }
            return Err(err);
        }
    }

    /// Symmetric to [`Socket::async_write_packet`].
    pub async fn async_read_packet(&self, buf: &mut [u8]) -> Result<usize, SrtError> {
        let handle = self.require_handle()?;
        loop {
            let rc = unsafe { ffi::srt_recv(handle.as_raw(), buf.as_mut_ptr() as *mut c_char, buf.len() as c_int) };
            if rc >= 0 {
                return Ok(rc as usize);
            }
            let err = crate::error::map_last_srt_error();
            if is_would_block(err.kind) {
                Reactor::get().wait_readable(handle).await?;
                continue;
            }
            if err.kind.is_connection_lost() {
                *self.state.lock() = SocketState::Failed;
            }
            return Err(err);
        }
    }

    pub fn local_address(&self) -> Option<SocketAddr> {
        let handle = (*self.handle.lock())?;
        sockname(handle, ffi::srt_getsockname)
    }

    pub fn remote_address(&self) -> Option<SocketAddr> {
        let handle = (*self.handle.lock())?;
        sockname(handle, ffi::srt_getpeername)
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.state.lock(), SocketState::Connected)
    }

    pub(crate) fn native_handle(&self) -> Option<SrtHandle> {
        *self.handle.lock()
    }

    pub fn get_stats(&self) -> Result<TraceStats, SrtError> {
        let handle = self.require_handle()?;
        TraceStats::fetch(handle)
    }

    /// Idempotent. Cancels any outstanding reactor waiters for this handle
    /// before calling `srt_close`, per spec.md §4.6, to avoid racing the
    /// poll thread.
    pub fn close(&self) {
        let mut state = self.state.lock();
        if *state == SocketState::Closed {
            return;
        }
        *state = SocketState::Closing;
        drop(state);

        if let Some(handle) = self.handle.lock().take() {
            Reactor::get().cancel_all(handle);
            unsafe { ffi::srt_close(handle.as_raw()) };
        }

        *self.state.lock() = SocketState::Closed;
    }

    fn require_handle(&self) -> Result<SrtHandle, SrtError> {
        self.handle
            .lock()
            .ok_or_else(|| SrtError::new(SrtErrorKind::InvalidHandle, None))
    }
}

fn sockname(
    handle: SrtHandle,
    getter: unsafe extern "C" fn(ffi::SRTSOCKET, *mut libc::sockaddr, *mut c_int) -> c_int,
) -> Option<SocketAddr> {
    let mut storage = OsSocketAddr::new();
    let mut len = storage.capacity() as c_int;
    let rc = unsafe { getter(handle.as_raw(), storage.as_mut_ptr(), &mut len) };
    if rc == ffi::SRT_ERROR {
        return None;
    }
    storage.into()
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.close();
    }
}
