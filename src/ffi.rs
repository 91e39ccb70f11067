//! Raw bindings to the parts of the SRT C API this crate drives.
//!
//! Kept deliberately close to the subset `libsrt`'s `srtcore/srt.h` exposes:
//! socket lifecycle, non-blocking send/recv, the event-granular epoll API
//! (as opposed to the older fd-set flavor — see the reactor module for why),
//! the connect/listener callback hooks, and the log handler hook. Everything
//! here is `pub(crate)`; no raw SRT type crosses the crate boundary.

#![allow(non_camel_case_types, dead_code)]

use std::ffi::{c_char, c_int, c_void};

use libc::sockaddr;

/// SRT socket descriptor. Also used for listener and group IDs; this crate
/// only ever deals in plain sockets and listeners.
pub(crate) type SRTSOCKET = c_int;
pub(crate) const SRT_INVALID_SOCK: SRTSOCKET = -1;
pub(crate) const SRT_ERROR: c_int = -1;

/// SRT's own epoll descriptor, distinct from the OS epoll.
pub(crate) type SRT_EPOLL = c_int;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SRT_SOCKSTATUS {
    SRTS_INIT = 1,
    SRTS_OPENED,
    SRTS_LISTENING,
    SRTS_CONNECTING,
    SRTS_CONNECTED,
    SRTS_BROKEN,
    SRTS_CLOSING,
    SRTS_CLOSED,
    SRTS_NONEXIST,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SRT_TRANSTYPE {
    SRTT_LIVE,
    SRTT_FILE,
    SRTT_INVALID,
}

/// Mirrors `SRT_SOCKOPT` from `srtcore/srt.h`. Values are load-bearing — they
/// are passed straight through to `srt_setsockflag`/`srt_getsockflag`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SRT_SOCKOPT {
    SRTO_MSS = 0,
    SRTO_SNDSYN = 1,
    SRTO_RCVSYN = 2,
    SRTO_ISN = 3,
    SRTO_FC = 4,
    SRTO_SNDBUF = 5,
    SRTO_RCVBUF = 6,
    SRTO_LINGER = 7,
    SRTO_UDP_SNDBUF = 8,
    SRTO_UDP_RCVBUF = 9,
    SRTO_RENDEZVOUS = 12,
    SRTO_SNDTIMEO = 13,
    SRTO_RCVTIMEO = 14,
    SRTO_REUSEADDR = 15,
    SRTO_MAXBW = 16,
    SRTO_STATE = 17,
    SRTO_EVENT = 18,
    SRTO_SNDDATA = 19,
    SRTO_RCVDATA = 20,
    SRTO_SENDER = 21,
    SRTO_TSBPDMODE = 22,
    SRTO_LATENCY = 23,
    SRTO_INPUTBW = 24,
    SRTO_OHEADBW = 25,
    SRTO_PASSPHRASE = 26,
    SRTO_PBKEYLEN = 27,
    SRTO_KMSTATE = 28,
    SRTO_IPTTL = 29,
    SRTO_IPTOS = 30,
    SRTO_TLPKTDROP = 31,
    SRTO_SNDDROPDELAY = 32,
    SRTO_NAKREPORT = 33,
    SRTO_VERSION = 34,
    SRTO_PEERVERSION = 35,
    SRTO_CONNTIMEO = 36,
    SRTO_DRIFTTRACER = 37,
    SRTO_MININPUTBW = 38,
    SRTO_SNDKMSTATE = 40,
    SRTO_RCVKMSTATE = 41,
    SRTO_LOSSMAXTTL = 42,
    SRTO_RCVLATENCY = 43,
    SRTO_PEERLATENCY = 44,
    SRTO_MINVERSION = 45,
    SRTO_STREAMID = 46,
    SRTO_CONGESTION = 47,
    SRTO_MESSAGEAPI = 48,
    SRTO_PAYLOADSIZE = 49,
    SRTO_TRANSTYPE = 50,
    SRTO_KMREFRESHRATE = 51,
    SRTO_KMPREANNOUNCE = 52,
    SRTO_ENFORCEDENCRYPTION = 53,
    SRTO_IPV6ONLY = 54,
    SRTO_PEERIDLETIMEO = 55,
    SRTO_BINDTODEVICE = 56,
    SRTO_GROUPCONNECT = 57,
    SRTO_GROUPMINSTABLETIMEO = 58,
    SRTO_GROUPTYPE = 59,
    SRTO_PACKETFILTER = 60,
    SRTO_RETRANSMITALGO = 61,
}

/// Flags from `SRT_EPOLL_OPT`; `srt_epoll_uwait` hands these back per-socket.
pub(crate) mod epoll_opt {
    use libc::c_int;

    pub(crate) const SRT_EPOLL_IN: c_int = 0x1;
    pub(crate) const SRT_EPOLL_OUT: c_int = 0x4;
    pub(crate) const SRT_EPOLL_ERR: c_int = 0x8;
    pub(crate) const SRT_EPOLL_UPDATE: c_int = 0x10;
}

/// One entry returned by `srt_epoll_uwait` — a socket plus the event flags
/// armed on it. This is the "event-granular" shape spec.md's design notes
/// insist on: it keeps the error bit fused with (not separate from)
/// readable/writable, per-socket.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct SRT_EPOLL_EVENT {
    pub(crate) fd: SRTSOCKET,
    pub(crate) events: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SRT_LOG_LEVEL {
    LOG_EMERG = 0,
    LOG_ALERT = 1,
    LOG_CRIT = 2,
    LOG_ERR = 3,
    LOG_WARNING = 4,
    LOG_NOTICE = 5,
    LOG_INFO = 6,
    LOG_DEBUG = 7,
}

#[repr(C)]
#[derive(Default, Debug, Clone, Copy)]
pub(crate) struct SRT_TRACEBSTATS {
    pub ms_time_stamp: i64,
    pub pkt_sent_total: i64,
    pub pkt_recv_total: i64,
    pub pkt_snd_loss_total: c_int,
    pub pkt_rcv_loss_total: c_int,
    pub pkt_retrans_total: c_int,
    pub pkt_sent_ack_total: c_int,
    pub pkt_recv_ack_total: c_int,
    pub pkt_sent_nak_total: c_int,
    pub pkt_recv_nak_total: c_int,
    pub us_snd_duration_total: i64,
    pub pkt_snd_drop_total: c_int,
    pub pkt_rcv_drop_total: c_int,
    pub pkt_rcv_undecrypt_total: c_int,
    pub byte_sent_total: u64,
    pub byte_recv_total: u64,
    pub byte_rcv_loss_total: u64,
    pub byte_retrans_total: u64,
    pub byte_snd_drop_total: u64,
    pub byte_rcv_drop_total: u64,
    pub byte_rcv_undecrypt_total: u64,
    pub pkt_sent: i64,
    pub pkt_recv: i64,
    pub pkt_snd_loss: c_int,
    pub pkt_rcv_loss: c_int,
    pub pkt_retrans: c_int,
    pub pkt_rcv_retrans: c_int,
    pub pkt_sent_ack: c_int,
    pub pkt_recv_ack: c_int,
    pub pkt_sent_nak: c_int,
    pub pkt_recv_nak: c_int,
    pub mbps_send_rate: f64,
    pub mbps_recv_rate: f64,
    pub us_snd_duration: i64,
    pub pkt_reorder_distance: c_int,
    pub pkt_rcv_avg_belated_time: f64,
    pub pkt_rcv_belated: i64,
    pub pkt_snd_drop: c_int,
    pub pkt_rcv_drop: c_int,
    pub pkt_rcv_undecrypt: c_int,
    pub byte_sent: u64,
    pub byte_recv: u64,
    pub byte_rcv_loss: u64,
    pub byte_retrans: u64,
    pub byte_snd_drop: u64,
    pub byte_rcv_drop: u64,
    pub byte_rcv_undecrypt: u64,
    pub us_pkt_snd_period: f64,
    pub pkt_flow_window: c_int,
    pub pkt_congestion_window: c_int,
    pub pkt_flight_size: c_int,
    pub ms_rtt: f64,
    pub mbps_bandwidth: f64,
    pub byte_avail_snd_buf: c_int,
    pub byte_avail_rcv_buf: c_int,
    pub mbps_max_bw: f64,
    pub byte_mss: c_int,
    pub pkt_snd_buf: c_int,
    pub byte_snd_buf: c_int,
    pub ms_snd_buf: c_int,
    pub ms_snd_tsb_pd_delay: c_int,
    pub pkt_rcv_buf: c_int,
    pub byte_rcv_buf: c_int,
    pub ms_rcv_buf: c_int,
    pub ms_rcv_tsb_pd_delay: c_int,
    pub pkt_reorder_tolerance: c_int,
}

pub(crate) type ListenCallback = extern "C" fn(
    opaque: *mut c_void,
    socket: SRTSOCKET,
    hs_version: c_int,
    peer: *const sockaddr,
    stream_id: *const c_char,
) -> c_int;

pub(crate) type LogHandler = extern "C" fn(
    opaque: *const c_void,
    level: SRT_LOG_LEVEL,
    file: *const c_char,
    line: c_int,
    area: *const c_char,
    message: *const c_char,
);

extern "C" {
    pub(crate) fn srt_startup() -> c_int;
    pub(crate) fn srt_cleanup() -> c_int;

    pub(crate) fn srt_create_socket() -> SRTSOCKET;
    pub(crate) fn srt_close(s: SRTSOCKET) -> c_int;
    pub(crate) fn srt_bind(s: SRTSOCKET, name: *const sockaddr, namelen: c_int) -> c_int;
    pub(crate) fn srt_listen(s: SRTSOCKET, backlog: c_int) -> c_int;
    pub(crate) fn srt_accept(
        s: SRTSOCKET,
        addr: *mut sockaddr,
        addrlen: *mut c_int,
    ) -> SRTSOCKET;
    pub(crate) fn srt_connect(s: SRTSOCKET, name: *const sockaddr, namelen: c_int) -> c_int;

    pub(crate) fn srt_recv(s: SRTSOCKET, buf: *mut c_char, len: c_int) -> c_int;
    pub(crate) fn srt_send(s: SRTSOCKET, buf: *const c_char, len: c_int) -> c_int;

    pub(crate) fn srt_getsockname(s: SRTSOCKET, addr: *mut sockaddr, addrlen: *mut c_int)
        -> c_int;
    pub(crate) fn srt_getpeername(s: SRTSOCKET, addr: *mut sockaddr, addrlen: *mut c_int)
        -> c_int;
    pub(crate) fn srt_getsockstate(s: SRTSOCKET) -> SRT_SOCKSTATUS;

    pub(crate) fn srt_setsockflag(
        s: SRTSOCKET,
        opt: SRT_SOCKOPT,
        optval: *const c_void,
        optlen: c_int,
    ) -> c_int;
    pub(crate) fn srt_getsockflag(
        s: SRTSOCKET,
        opt: SRT_SOCKOPT,
        optval: *mut c_void,
        optlen: *mut c_int,
    ) -> c_int;

    pub(crate) fn srt_bstats(s: SRTSOCKET, stats: *mut SRT_TRACEBSTATS, clear: c_int) -> c_int;

    pub(crate) fn srt_listen_callback(
        s: SRTSOCKET,
        callback: ListenCallback,
        opaque: *mut c_void,
    ) -> c_int;

    pub(crate) fn srt_getlasterror_str() -> *const c_char;
    pub(crate) fn srt_getlasterror(errno_loc: *mut c_int) -> c_int;

    pub(crate) fn srt_setloglevel(level: c_int);
    pub(crate) fn srt_setloghandler(opaque: *const c_void, handler: LogHandler);

    // Event-granular epoll API (srtcore/srt.h). Deliberately not the older
    // fd-set flavor (`srt_epoll_wait`) — see reactor::mod docs for why.
    pub(crate) fn srt_epoll_create() -> SRT_EPOLL;
    pub(crate) fn srt_epoll_release(eid: SRT_EPOLL) -> c_int;
    pub(crate) fn srt_epoll_add_usock(eid: SRT_EPOLL, s: SRTSOCKET, events: *const c_int)
        -> c_int;
    pub(crate) fn srt_epoll_update_usock(
        eid: SRT_EPOLL,
        s: SRTSOCKET,
        events: *const c_int,
    ) -> c_int;
    pub(crate) fn srt_epoll_remove_usock(eid: SRT_EPOLL, s: SRTSOCKET) -> c_int;
    pub(crate) fn srt_epoll_uwait(
        eid: SRT_EPOLL,
        fdsset: *mut SRT_EPOLL_EVENT,
        fdsize: c_int,
        ms_timeout: i64,
    ) -> c_int;
}
