//! Statistics passthrough **(NEW supplemental)**.
//!
//! spec.md's C6 doesn't mention statistics, but every wrapper in the corpus
//! (`srt/src/socket.rs::get_stats`, `srt/src/listener.rs::get_stats`)
//! exposes `srt_bstats` one-call-through; dropping it would make this crate
//! a worse citizen of the ecosystem than any of its teachers, and it's
//! additive — it doesn't touch any Non-goal.

use crate::error::SrtError;
use crate::ffi::{self, SRT_TRACEBSTATS};
use crate::handle::SrtHandle;

/// A snapshot of `SRT_TRACEBSTATS`, cleared on read (matches the teacher's
/// `srt_bstats(fd, &mut stats, true)` call).
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceStats {
    pub pkt_sent_total: i64,
    pub pkt_recv_total: i64,
    pub pkt_snd_loss_total: i32,
    pub pkt_rcv_loss_total: i32,
    pub pkt_retrans_total: i32,
    pub byte_sent_total: u64,
    pub byte_recv_total: u64,
    pub mbps_send_rate: f64,
    pub mbps_recv_rate: f64,
    pub ms_rtt: f64,
    pub pkt_flight_size: i32,
    pub byte_avail_snd_buf: i32,
    pub byte_avail_rcv_buf: i32,
}

impl From<SRT_TRACEBSTATS> for TraceStats {
    fn from(raw: SRT_TRACEBSTATS) -> Self {
        Self {
            pkt_sent_total: raw.pkt_sent_total,
            pkt_recv_total: raw.pkt_recv_total,
            pkt_snd_loss_total: raw.pkt_snd_loss_total,
            pkt_rcv_loss_total: raw.pkt_rcv_loss_total,
            pkt_retrans_total: raw.pkt_retrans_total,
            byte_sent_total: raw.byte_sent_total,
            byte_recv_total: raw.byte_recv_total,
            mbps_send_rate: raw.mbps_send_rate,
            mbps_recv_rate: raw.mbps_recv_rate,
            ms_rtt: raw.ms_rtt,
            pkt_flight_size: raw.pkt_flight_size,
            byte_avail_snd_buf: raw.byte_avail_snd_buf,
            byte_avail_rcv_buf: raw.byte_avail_rcv_buf,
        }
    }
}

impl TraceStats {
    pub(crate) fn fetch(handle: SrtHandle) -> Result<Self, SrtError> {
        let mut raw = SRT_TRACEBSTATS::default();
        let rc = unsafe { ffi::srt_bstats(handle.as_raw(), &mut raw, true as i32) };
        if rc == ffi::SRT_ERROR {
            return Err(crate::error::map_last_srt_error());
        }
        Ok(raw.into())
    }
}
