//! Option set & driver (C3): an insertion-ordered staging area plus the
//! `apply_pre`/`apply_post` drivers that push staged values into SRT.

use std::ffi::c_void;
use std::mem::size_of;

use indexmap::IndexMap;
use log::warn;

use super::registry::{self, LINGER_NAME, OptionType};
use crate::ffi::{self, SRT_SOCKOPT};
use crate::handle::SrtHandle;

/// `struct linger` as SRT's `SRTO_LINGER` expects it (mirrors POSIX
/// `linger`): `l_onoff` nonzero enables, `l_linger` is the timeout, seconds.
#[repr(C)]
struct Linger {
    l_onoff: i32,
    l_linger: i32,
}

/// Staged `(name, raw_string_value)` pairs. Retains insertion order only for
/// error reporting, per spec.md §3.
#[derive(Debug, Clone, Default)]
pub struct OptionSet {
    values: IndexMap<String, String>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts either a `"key=value"` string or call `set_kv` directly.
    /// Returns `false` on a malformed `k=v` string (no `=`); this is a parse
    /// error at staging time, not an apply-time failure.
    pub fn set(&mut self, assignment: &str) -> bool {
        match assignment.split_once('=') {
            Some((k, v)) => {
                self.set_kv(k, v);
                true
            }
            None => false,
        }
    }

    pub fn set_kv(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Applies every staged pre-phase option, in registry order, to `handle`.
    /// Never short-circuits; returns the names that failed to apply.
    pub(crate) fn apply_pre(&self, handle: SrtHandle) -> Vec<String> {
        self.warn_unknown();
        self.apply_phase(registry::pre_options(), handle)
    }

    /// Applies every staged post-phase option and the always-legal runtime
    /// toggles, in registry order, plus the special-cased `linger`.
    pub(crate) fn apply_post(&self, handle: SrtHandle) -> Vec<String> {
        let mut failed = self.apply_phase(registry::post_options(), handle);
        if let Some(raw) = self.get(LINGER_NAME) {
            if apply_linger(handle, raw).is_err() {
                failed.push(LINGER_NAME.to_string());
            }
        }
        failed
    }

    fn apply_phase(&self, specs: &[registry::OptionSpec], handle: SrtHandle) -> Vec<String> {
        let mut failed = Vec::new();
        for spec in specs {
            let Some(raw) = self.get(spec.name) else {
                continue;
            };
            if apply_one(handle, spec, raw).is_err() {
                failed.push(spec.name.to_string());
            }
        }
        failed
    }

    /// Warns about staged names the registry doesn't recognize; called
    /// before `apply_pre` so unknown options (forward-compat with newer SRT
    /// releases) are surfaced even though they're silently skipped by apply.
    pub fn warn_unknown(&self) {
        for name in self.values.keys() {
            if name == LINGER_NAME {
                continue;
            }
            if registry::lookup(name).is_none() {
                warn!("unknown SRT option '{name}' staged; skipped during apply");
            }
        }
    }
}

fn apply_one(handle: SrtHandle, spec: &registry::OptionSpec, raw: &str) -> Result<(), ()> {
    match spec.ty {
        OptionType::Bool => {
            let value = parse_bool(raw)?;
            set_flag(handle, spec.symbol, &(value as i32))
        }
        OptionType::Int32 => {
            let value = parse_int::<i32>(raw)?;
            set_flag(handle, spec.symbol, &value)
        }
        OptionType::Int64 => {
            let value = parse_int::<i64>(raw)?;
            set_flag(handle, spec.symbol, &value)
        }
        OptionType::String => set_flag_str(handle, spec.symbol, raw),
        OptionType::Enum(map) => {
            let value = parse_enum(raw, map)?;
            set_flag(handle, spec.symbol, &value)
        }
    }
}

fn apply_linger(handle: SrtHandle, raw: &str) -> Result<(), ()> {
    let seconds = parse_int::<i32>(raw)?;
    let linger = Linger {
        l_onoff: (seconds > 0) as i32,
        l_linger: seconds.max(0),
    };
    set_flag(handle, SRT_SOCKOPT::SRTO_LINGER, &linger)
}

fn set_flag<T>(handle: SrtHandle, symbol: SRT_SOCKOPT, value: &T) -> Result<(), ()> {
    let rc = unsafe {
        ffi::srt_setsockflag(
            handle.as_raw(),
            symbol,
            value as *const T as *const c_void,
            size_of::<T>() as i32,
        )
    };
    if rc == ffi::SRT_ERROR {
        Err(())
    } else {
        Ok(())
    }
}

fn set_flag_str(handle: SrtHandle, symbol: SRT_SOCKOPT, value: &str) -> Result<(), ()> {
    let rc = unsafe {
        ffi::srt_setsockflag(
            handle.as_raw(),
            symbol,
            value.as_ptr() as *const c_void,
            value.len() as i32,
        )
    };
    if rc == ffi::SRT_ERROR {
        Err(())
    } else {
        Ok(())
    }
}

/// Bool rule from spec.md §4.2: case-sensitive lower-case tokens only.
fn parse_bool(raw: &str) -> Result<bool, ()> {
    match raw {
        "1" | "yes" | "on" | "true" => Ok(true),
        "0" | "no" | "off" | "false" => Ok(false),
        _ => Err(()),
    }
}

/// Decimal, `0x…` hex, or `0…` octal, per spec.md §4.2.
fn parse_int<T>(raw: &str) -> Result<T, ()>
where
    T: TryFrom<i64>,
{
    let value = if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).map_err(|_| ())?
    } else if raw.len() > 1 && raw.starts_with('0') && raw.bytes().all(|b| b.is_ascii_digit()) {
        i64::from_str_radix(&raw[1..], 8).map_err(|_| ())?
    } else {
        raw.parse::<i64>().map_err(|_| ())?
    };
    T::try_from(value).map_err(|_| ())
}

/// Enum rule from spec.md §4.2: string map first, integer fallback second.
fn parse_enum(raw: &str, map: &[(&str, i32)]) -> Result<i32, ()> {
    if let Some((_, value)) = map.iter().find(|(name, _)| *name == raw) {
        return Ok(*value);
    }
    parse_int::<i32>(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kv_string() {
        let mut set = OptionSet::new();
        assert!(set.set("latency=200"));
        assert_eq!(set.get("latency"), Some("200"));
        assert!(!set.set("no-equals-sign"));
    }

    #[test]
    fn bool_rule_accepts_only_exact_tokens() {
        assert_eq!(parse_bool("yes"), Ok(true));
        assert_eq!(parse_bool("off"), Ok(false));
        assert!(parse_bool("Yes").is_err());
        assert!(parse_bool("2").is_err());
    }

    #[test]
    fn int_rule_supports_hex_and_octal() {
        assert_eq!(parse_int::<i32>("0x10"), Ok(16));
        assert_eq!(parse_int::<i32>("010"), Ok(8));
        assert_eq!(parse_int::<i32>("10"), Ok(10));
    }

    #[test]
    fn enum_rule_falls_back_to_integer() {
        assert_eq!(parse_enum("live", &[("live", 0), ("file", 1)]), Ok(0));
        assert_eq!(parse_enum("1", &[("live", 0), ("file", 1)]), Ok(1));
        assert!(parse_enum("bogus", &[("live", 0), ("file", 1)]).is_err());
    }
}
