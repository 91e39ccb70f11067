//! The static option table (C2): name → `OptionSpec`, plus the two
//! phase-ordered sequences the driver walks.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::ffi::SRT_SOCKOPT;

/// When an option may be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Must be set before bind/connect/listen.
    Pre,
    /// May be set anytime, including after connection.
    Post,
}

/// How a raw string value is parsed and what binary representation SRT
/// expects it marshalled as.
#[derive(Debug, Clone, Copy)]
pub enum OptionType {
    Bool,
    Int32,
    Int64,
    String,
    /// `&'static [(name, value)]`; unrecognized strings fall back to a
    /// decimal/hex integer parse per spec.md §4.2.
    Enum(&'static [(&'static str, i32)]),
}

#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub name: &'static str,
    pub symbol: SRT_SOCKOPT,
    pub phase: Phase,
    pub ty: OptionType,
}

const TRANSTYPE_ENUM: &[(&str, i32)] = &[("live", 0), ("file", 1)];

/// Pre-bind/connect/listen options, in the order `apply_pre` walks them.
/// Required coverage per spec.md §4.2's table.
const PRE_OPTIONS: &[OptionSpec] = &[
    spec("transtype", SRT_SOCKOPT::SRTO_TRANSTYPE, Phase::Pre, OptionType::Enum(TRANSTYPE_ENUM)),
    spec("messageapi", SRT_SOCKOPT::SRTO_MESSAGEAPI, Phase::Pre, OptionType::Bool),
    spec("tsbpdmode", SRT_SOCKOPT::SRTO_TSBPDMODE, Phase::Pre, OptionType::Bool),
    spec("tlpktdrop", SRT_SOCKOPT::SRTO_TLPKTDROP, Phase::Pre, OptionType::Bool),
    spec("nakreport", SRT_SOCKOPT::SRTO_NAKREPORT, Phase::Pre, OptionType::Bool),
    spec("mss", SRT_SOCKOPT::SRTO_MSS, Phase::Pre, OptionType::Int32),
    spec("fc", SRT_SOCKOPT::SRTO_FC, Phase::Pre, OptionType::Int32),
    spec("sndbuf", SRT_SOCKOPT::SRTO_SNDBUF, Phase::Pre, OptionType::Int32),
    spec("rcvbuf", SRT_SOCKOPT::SRTO_RCVBUF, Phase::Pre, OptionType::Int32),
    spec("latency", SRT_SOCKOPT::SRTO_LATENCY, Phase::Pre, OptionType::Int32),
    spec("rcvlatency", SRT_SOCKOPT::SRTO_RCVLATENCY, Phase::Pre, OptionType::Int32),
    spec("peerlatency", SRT_SOCKOPT::SRTO_PEERLATENCY, Phase::Pre, OptionType::Int32),
    spec("conntimeo", SRT_SOCKOPT::SRTO_CONNTIMEO, Phase::Pre, OptionType::Int32),
    spec("peeridletimeo", SRT_SOCKOPT::SRTO_PEERIDLETIMEO, Phase::Pre, OptionType::Int32),
    spec("pbkeylen", SRT_SOCKOPT::SRTO_PBKEYLEN, Phase::Pre, OptionType::Int32),
    spec("passphrase", SRT_SOCKOPT::SRTO_PASSPHRASE, Phase::Pre, OptionType::String),
    spec("kmrefreshrate", SRT_SOCKOPT::SRTO_KMREFRESHRATE, Phase::Pre, OptionType::Int32),
    spec("kmpreannounce", SRT_SOCKOPT::SRTO_KMPREANNOUNCE, Phase::Pre, OptionType::Int32),
    spec("enforcedencryption", SRT_SOCKOPT::SRTO_ENFORCEDENCRYPTION, Phase::Pre, OptionType::Bool),
    spec("ipttl", SRT_SOCKOPT::SRTO_IPTTL, Phase::Pre, OptionType::Int32),
    spec("iptos", SRT_SOCKOPT::SRTO_IPTOS, Phase::Pre, OptionType::Int32),
    spec("ipv6only", SRT_SOCKOPT::SRTO_IPV6ONLY, Phase::Pre, OptionType::Int32),
    spec("minversion", SRT_SOCKOPT::SRTO_MINVERSION, Phase::Pre, OptionType::Int32),
    spec("streamid", SRT_SOCKOPT::SRTO_STREAMID, Phase::Pre, OptionType::String),
    // SRTO_CONGESTION takes the controller name itself ("live" or "file"),
    // not a numeric code like SRTO_TRANSTYPE does.
    spec("congestion", SRT_SOCKOPT::SRTO_CONGESTION, Phase::Pre, OptionType::String),
    spec("payloadsize", SRT_SOCKOPT::SRTO_PAYLOADSIZE, Phase::Pre, OptionType::Int32),
    spec("packetfilter", SRT_SOCKOPT::SRTO_PACKETFILTER, Phase::Pre, OptionType::String),
    spec("retransmitalgo", SRT_SOCKOPT::SRTO_RETRANSMITALGO, Phase::Pre, OptionType::Int32),
];

/// Post-connect/listen options plus the always-legal runtime toggles,
/// in the order `apply_post` walks them. `linger` is excluded here because
/// it needs a struct value, not a scalar — the driver special-cases it.
const POST_OPTIONS: &[OptionSpec] = &[
    spec("maxbw", SRT_SOCKOPT::SRTO_MAXBW, Phase::Post, OptionType::Int64),
    spec("inputbw", SRT_SOCKOPT::SRTO_INPUTBW, Phase::Post, OptionType::Int64),
    spec("mininputbw", SRT_SOCKOPT::SRTO_MININPUTBW, Phase::Post, OptionType::Int64),
    spec("oheadbw", SRT_SOCKOPT::SRTO_OHEADBW, Phase::Post, OptionType::Int32),
    spec("snddropdelay", SRT_SOCKOPT::SRTO_SNDDROPDELAY, Phase::Post, OptionType::Int32),
    spec("drifttracer", SRT_SOCKOPT::SRTO_DRIFTTRACER, Phase::Post, OptionType::Bool),
    spec("lossmaxttl", SRT_SOCKOPT::SRTO_LOSSMAXTTL, Phase::Post, OptionType::Int32),
    spec("rcvsyn", SRT_SOCKOPT::SRTO_RCVSYN, Phase::Post, OptionType::Bool),
    spec("sndsyn", SRT_SOCKOPT::SRTO_SNDSYN, Phase::Post, OptionType::Bool),
    spec("rcvtimeo", SRT_SOCKOPT::SRTO_RCVTIMEO, Phase::Post, OptionType::Int32),
    spec("sndtimeo", SRT_SOCKOPT::SRTO_SNDTIMEO, Phase::Post, OptionType::Int32),
];

/// The name `apply_post` recognizes specially: it takes `l_onoff`/`l_linger`
/// rather than a scalar. Kept out of `POST_OPTIONS` so the generic driver
/// never tries to marshal it as an int.
pub(crate) const LINGER_NAME: &str = "linger";

const fn spec(name: &'static str, symbol: SRT_SOCKOPT, phase: Phase, ty: OptionType) -> OptionSpec {
    OptionSpec { name, symbol, phase, ty }
}

pub(crate) fn pre_options() -> &'static [OptionSpec] {
    PRE_OPTIONS
}

pub(crate) fn post_options() -> &'static [OptionSpec] {
    POST_OPTIONS
}

/// Flat name → spec lookup, built once. Unknown names simply aren't present
/// here; callers are responsible for warning-and-skipping per spec.md §4.2.
pub(crate) fn lookup(name: &str) -> Option<&'static OptionSpec> {
    static MAP: OnceLock<HashMap<&'static str, &'static OptionSpec>> = OnceLock::new();
    MAP.get_or_init(|| {
        let mut map = HashMap::new();
        for spec in PRE_OPTIONS.iter().chain(POST_OPTIONS.iter()) {
            map.insert(spec.name, spec);
        }
        map
    })
    .get(name)
    .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_required_pre_option_is_registered() {
        for name in [
            "transtype", "messageapi", "tsbpdmode", "tlpktdrop", "nakreport", "mss", "fc",
            "sndbuf", "rcvbuf", "latency", "rcvlatency", "peerlatency", "conntimeo",
            "peeridletimeo", "pbkeylen", "passphrase", "kmrefreshrate", "kmpreannounce",
            "enforcedencryption", "ipttl", "iptos", "ipv6only", "minversion", "streamid",
            "congestion", "payloadsize", "packetfilter", "retransmitalgo",
        ] {
            let found = lookup(name).unwrap_or_else(|| panic!("missing pre option {name}"));
            assert_eq!(found.phase, Phase::Pre);
        }
    }

    #[test]
    fn every_required_post_option_is_registered() {
        for name in [
            "maxbw", "inputbw", "mininputbw", "oheadbw", "snddropdelay", "drifttracer",
            "lossmaxttl", "rcvsyn", "sndsyn", "rcvtimeo", "sndtimeo",
        ] {
            let found = lookup(name).unwrap_or_else(|| panic!("missing post option {name}"));
            assert_eq!(found.phase, Phase::Post);
        }
    }

    #[test]
    fn unknown_name_is_absent_not_an_error() {
        assert!(lookup("not-a-real-option").is_none());
    }
}
