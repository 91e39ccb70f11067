//! `SrtHandle` (spec.md §3): an opaque endpoint identifier shared by the
//! socket wrapper, the acceptor wrapper, and the reactor's pending-operation
//! table. Wrapping the raw `SRTSOCKET` in a newtype keeps arithmetic off it
//! while still letting it serve as a `HashMap` key.

use crate::ffi::SRTSOCKET;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SrtHandle(SRTSOCKET);

impl SrtHandle {
    pub(crate) fn from_raw(raw: SRTSOCKET) -> Self {
        Self(raw)
    }

    pub(crate) fn as_raw(self) -> SRTSOCKET {
        self.0
    }
}
