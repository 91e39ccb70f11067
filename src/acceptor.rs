//! Acceptor wrapper (C7): state machine for a listening SRT handle.
//!
//! Grounded on `srt/src/listener.rs`'s `Listener`: same `bind`/`accept`
//! shape and the same `srt_listen_callback` admission-callback hook, but the
//! teacher's unbounded channel (fed by the callback, drained by `accept`) is
//! replaced by the reactor's `wait_readable` on the listening handle, since
//! this crate's accept path goes through the shared epoll rather than its
//! own private notification channel.

use std::ffi::{c_char, c_int, c_void};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex};

use libc::sockaddr;
use os_socketaddr::OsSocketAddr;
use parking_lot::Mutex;

use crate::error::{SrtError, SrtErrorKind};
use crate::ffi;
use crate::handle::SrtHandle;
use crate::options::OptionSet;
use crate::reactor::Reactor;
use crate::socket::Socket;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptorState {
    Fresh,
    Bound,
    Listening,
    Closed,
}

/// `(candidate, handshake_version, stream_id)`; returning `false` rejects
/// the candidate and the SRT library fails its handshake.
pub type ListenerCallback = Arc<dyn Fn(&Socket, i32, &str) -> bool + Send + Sync>;

/// Shared between the `Acceptor` and the `extern "C"` trampoline SRT calls
/// during the handshake. Kept behind an `Arc` so the trampoline's opaque
/// pointer (registered once, for the handle's lifetime) and the handle a
/// caller uses to change the callback later refer to the same slot.
struct CallbackCtx {
    callback: StdMutex<Option<ListenerCallback>>,
}

pub struct Acceptor {
    handle: Mutex<Option<SrtHandle>>,
    state: Mutex<AcceptorState>,
    options: Mutex<OptionSet>,
    callback_ctx: Arc<CallbackCtx>,
    callback_registered: Mutex<bool>,
}

impl Acceptor {
    pub fn new(options: OptionSet) -> Self {
        Self {
            handle: Mutex::new(None),
            state: Mutex::new(AcceptorState::Fresh),
            options: Mutex::new(options),
            callback_ctx: Arc::new(CallbackCtx { callback: StdMutex::new(None) }),
            callback_registered: Mutex::new(false),
        }
    }

    pub fn state(&self) -> AcceptorState {
        *self.state.lock()
    }

    /// Exactly one callback is active at a time; a second call replaces the
    /// first. May be called before or after [`Acceptor::listen`].
    pub fn set_listener_callback<F>(&self, callback: F)
    where
        F: Fn(&Socket, i32, &str) -> bool + Send + Sync + 'static,
    {
        *self.callback_ctx.callback.lock().unwrap() = Some(Arc::new(callback));
    }

    pub fn set_option(&self, assignment: &str) {
        if !self.options.lock().set(assignment) {
            log::warn!("malformed option assignment '{assignment}'");
        }
    }

    /// Creates the SRT handle, applies pre-options, and binds. Port `0`
    /// requests an ephemeral port; query it back with [`Acceptor::local_address`].
    pub fn bind(&self, host: &str, port: u16) -> Result<(), SrtError> {
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|_| SrtError::new(SrtErrorKind::ConnectionSetup, Some("invalid bind address".into())))?;

        let raw = unsafe { ffi::srt_create_socket() };
        if raw == ffi::SRT_INVALID_SOCK {
            return Err(SrtError::new(SrtErrorKind::ConnectionSetup, Some("srt_create_socket failed".into())));
        }
        let handle = SrtHandle::from_raw(raw);

        for name in self.options.lock().apply_pre(handle) {
            log::warn!("failed to apply pre-option '{name}'");
        }

        let os_addr: OsSocketAddr = addr.into();
        let rc = unsafe { ffi::srt_bind(raw, os_addr.as_ptr() as *const _, os_addr.len() as c_int) };
        if rc == ffi::SRT_ERROR {
            let err = crate::error::map_last_srt_error();
            unsafe { ffi::srt_close(raw) };
            return Err(err);
        }

        *self.handle.lock() = Some(handle);
        *self.state.lock() = AcceptorState::Bound;
        Ok(())
    }

    /// Convenience over `set_option` + `bind` for a combined option map.
    pub fn bind_with_options(&self, host: &str, port: u16, options: OptionSet) -> Result<(), SrtError> {
        *self.options.lock() = options;
        self.bind(host, port)
    }

    pub fn listen(&self, backlog: i32) -> Result<(), SrtError> {
        let handle = self.require_handle()?;

        let rc = unsafe { ffi::srt_listen(handle.as_raw(), backlog as c_int) };
        if rc == ffi::SRT_ERROR {
            return Err(crate::error::map_last_srt_error());
        }

        // One extra strong ref, balanced in `close`, representing the
        // reference SRT itself now holds via the opaque pointer.
        let opaque = Arc::into_raw(self.callback_ctx.clone()) as *mut c_void;
        let rc = unsafe { ffi::srt_listen_callback(handle.as_raw(), listener_trampoline, opaque) };
        if rc == ffi::SRT_ERROR {
            unsafe { drop(Arc::from_raw(opaque as *const CallbackCtx)) };
            return Err(crate::error::map_last_srt_error());
        }

        *self.callback_registered.lock() = true;
        *self.state.lock() = AcceptorState::Listening;
        Ok(())
    }

    /// Awaits readability on the listener, then accepts and wraps the new
    /// handle in a [`Socket`] already in the `Connected` state.
    pub async fn async_accept(&self) -> Result<(Socket, SocketAddr), SrtError> {
        let handle = self.require_handle()?;
        if *self.state.lock() != AcceptorState::Listening {
            return Err(SrtError::new(SrtErrorKind::InvalidHandle, Some("acceptor is not listening".into())));
        }

        Reactor::get().wait_readable(handle).await?;

        let mut storage = OsSocketAddr::new();
        let mut len = storage.capacity() as c_int;
        let accepted = unsafe { ffi::srt_accept(handle.as_raw(), storage.as_mut_ptr(), &mut len) };
        if accepted == ffi::SRT_INVALID_SOCK {
            return Err(crate::error::map_last_srt_error());
        }

        let addr: Option<SocketAddr> = storage.into();
        let addr = addr.ok_or_else(|| {
            SrtError::new(SrtErrorKind::ConnectionSetup, Some("accept returned no peer address".into()))
        })?;

        Ok((Socket::from_accepted(accepted, OptionSet::new()), addr))
    }

    pub fn local_address(&self) -> Option<SocketAddr> {
        let handle = (*self.handle.lock())?;
        let mut storage = OsSocketAddr::new();
        let mut len = storage.capacity() as c_int;
        let rc = unsafe { ffi::srt_getsockname(handle.as_raw(), storage.as_mut_ptr(), &mut len) };
        if rc == ffi::SRT_ERROR {
            return None;
        }
        storage.into()
    }

    pub fn close(&self) {
        let mut state = self.state.lock();
        if *state == AcceptorState::Closed {
            return;
        }
        *state = AcceptorState::Closed;
        drop(state);

        if let Some(handle) = self.handle.lock().take() {
            Reactor::get().cancel_all(handle);
            unsafe { ffi::srt_close(handle.as_raw()) };
        }

        let mut registered = self.callback_registered.lock();
        if *registered {
            // Reclaim the extra strong ref handed to SRT in `listen`.
            unsafe { drop(Arc::from_raw(Arc::as_ptr(&self.callback_ctx))) };
            *registered = false;
        }
    }

    fn require_handle(&self) -> Result<SrtHandle, SrtError> {
        self.handle
            .lock()
            .ok_or_else(|| SrtError::new(SrtErrorKind::InvalidHandle, None))
    }
}

impl Drop for Acceptor {
    fn drop(&mut self) {
        self.close();
    }
}

/// Invoked by the SRT library, on its own thread, during the handshake for
/// each candidate connection. Returning negative rejects the candidate.
extern "C" fn listener_trampoline(
    opaque: *mut c_void,
    s: ffi::SRTSOCKET,
    hs_version: c_int,
    _peeraddr: *const sockaddr,
    stream_id: *const c_char,
) -> c_int {
    let ctx = unsafe { &*(opaque as *const CallbackCtx) };
    let callback = ctx.callback.lock().unwrap().clone();
    let Some(callback) = callback else {
        return 0;
    };

    let stream_id = unsafe {
        if stream_id.is_null() {
            String::new()
        } else {
            std::ffi::CStr::from_ptr(stream_id).to_string_lossy().into_owned()
        }
    };

    let candidate = Socket::from_accepted(s, OptionSet::new());
    let admitted = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        callback(&candidate, hs_version, &stream_id)
    }))
    .unwrap_or(false);

    std::mem::forget(candidate); // ownership stays with the library until srt_accept hands it back
    if admitted {
        0
    } else {
        -1
    }
}
