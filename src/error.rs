//! Error taxonomy & mapper (C1).
//!
//! SRT reports failures through a thread-local "last error" plus a numeric
//! code; this module maps that into a closed, portable set of kinds so that
//! higher layers never have to know SRT's numbering.

use std::ffi::CStr;

use crate::ffi::srt_getlasterror_str;

/// Stable, closed set of logical error conditions.
///
/// `Other` carries the original SRT numeric code for diagnostics; every other
/// variant is a portable condition a caller can match on without knowing
/// anything about SRT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SrtErrorKind {
    ConnectionSetup,
    ConnectionRejected,
    ConnectionLost,
    InvalidHandle,
    WouldBlock,
    Timeout,
    EpollAddFailed,
    EpollUpdateFailed,
    SendFailed,
    ReceiveFailed,
    ResourceExhausted,
    Cancelled,
    Other(u32),
}

impl SrtErrorKind {
    /// True for `ConnectionLost`, used by higher layers that want to match on
    /// the portable "connection reset" condition without caring whether it
    /// came from a read, a write, or an epoll error event.
    pub fn is_connection_lost(self) -> bool {
        matches!(self, SrtErrorKind::ConnectionLost)
    }
}

/// A mapped SRT error: the logical kind plus the verbatim message SRT
/// produced (if any).
#[derive(Debug, Clone, thiserror::Error)]
#[error("srt error: kind={kind:?} message={message:?}")]
pub struct SrtError {
    pub kind: SrtErrorKind,
    pub message: Option<String>,
}

impl SrtError {
    pub fn new(kind: SrtErrorKind, message: Option<String>) -> Self {
        Self { kind, message }
    }

    /// Convenience for call sites that want `Result<T, SrtError>` directly,
    /// mirroring the `SrtError::error(kind)` shorthand the teacher crate used.
    pub fn error<T>(kind: SrtErrorKind) -> Result<T, Self> {
        Err(Self::new(kind, None))
    }
}

/// Reads SRT's thread-local last-error code and message, mapping the numeric
/// code to a logical [`SrtErrorKind`].
///
/// Mapping is total: any code this function doesn't recognize becomes
/// `SrtErrorKind::Other(code)`, preserving the original number for logs.
pub fn map_last_srt_error() -> SrtError {
    let code = unsafe { crate::ffi::srt_getlasterror(std::ptr::null_mut()) };
    let message = unsafe { CStr::from_ptr(srt_getlasterror_str()) }
        .to_str()
        .ok()
        .map(str::to_owned);

    SrtError::new(map_code(code), message)
}

/// Maps a raw `SRT_ERRNO` value (`MJ*1000+MN`, see SRT's `srtcore/srt.h`) to
/// a logical kind.
fn map_code(code: i32) -> SrtErrorKind {
    match code {
        0 => SrtErrorKind::Other(0), // SRT_SUCCESS, shouldn't normally be mapped
        1002 => SrtErrorKind::ConnectionRejected, // ECONNREJ
        1003 => SrtErrorKind::ConnectionSetup,    // ESOCKFAIL
        1004 => SrtErrorKind::ConnectionSetup,    // ESECFAIL
        1005 => SrtErrorKind::ConnectionSetup,    // ECONNSETUP
        2001 => SrtErrorKind::ConnectionLost,     // ECONNLOST
        2002 => SrtErrorKind::ConnectionLost,     // ENOCONN
        5004 => SrtErrorKind::InvalidHandle,      // EINVSOCK
        6001 => SrtErrorKind::WouldBlock,    // EASYNCSND
        6002 => SrtErrorKind::WouldBlock,    // EASYNCRCV
        6003 => SrtErrorKind::Timeout,       // ETIMEOUT
        other if other < 0 => SrtErrorKind::Other(0),
        other => SrtErrorKind::Other(other as u32),
    }
}

/// True when `kind` represents SRT's "would block" condition, the signal
/// wrappers use to decide "park on the reactor and retry" rather than
/// surfacing an error.
pub fn is_would_block(kind: SrtErrorKind) -> bool {
    matches!(kind, SrtErrorKind::WouldBlock)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_unknown_codes_to_other_with_original_number() {
        assert_eq!(map_code(99999), SrtErrorKind::Other(99999));
    }

    #[test]
    fn would_block_matches_only_would_block_kind() {
        assert!(is_would_block(SrtErrorKind::WouldBlock));
        assert!(!is_would_block(SrtErrorKind::Timeout));
        assert!(!is_would_block(SrtErrorKind::ConnectionLost));
    }

    #[test]
    fn connection_lost_family_maps_correctly() {
        assert_eq!(map_code(2001), SrtErrorKind::ConnectionLost); // ECONNLOST
        assert_eq!(map_code(2002), SrtErrorKind::ConnectionLost); // ENOCONN
    }

    #[test]
    fn setup_and_rejection_family_maps_correctly() {
        assert_eq!(map_code(1002), SrtErrorKind::ConnectionRejected); // ECONNREJ
        assert_eq!(map_code(1003), SrtErrorKind::ConnectionSetup); // ESOCKFAIL
        assert_eq!(map_code(1004), SrtErrorKind::ConnectionSetup); // ESECFAIL
        assert_eq!(map_code(1005), SrtErrorKind::ConnectionSetup); // ECONNSETUP
        assert_eq!(map_code(5004), SrtErrorKind::InvalidHandle); // EINVSOCK
    }
}
