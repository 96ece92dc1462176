//! The event-ingest consumer contract: what the core expects from a
//! transport it does not own, plus perf-scope reconstruction.

use scopewatch_core::LineMeta;

/// One `(meta, message)` pair handed to the core by the transport.
/// `LineMeta` from `scopewatch-core` already carries the fields a line
/// needs: message type, time, process id, thread id.
#[derive(Debug, Clone)]
pub struct IngestEvent {
    pub meta: LineMeta,
    pub message: String,
}

/// Trims a single trailing `\r\n`, `\n`, or `\r` — the UI does this
/// before enqueuing, not the transport.
pub fn trim_trailing_newline(s: &str) -> &str {
    s.strip_suffix("\r\n")
        .or_else(|| s.strip_suffix('\n'))
        .or_else(|| s.strip_suffix('\r'))
        .unwrap_or(s)
}

/// Fields the transport surfaces for a "perf scope" event, which the
/// ingest layer (not the viewer core) reconstructs into a `Debug` line.
#[derive(Debug, Clone)]
pub struct PerfScopeFields {
    pub scope_name: String,
    pub detail: String,
    pub duration_microseconds: u64,
    pub value0: i64,
    pub value1: i64,
    pub hresult: i32,
}

const WARNING_THRESHOLD_US: u64 = 500_000;
const ERROR_THRESHOLD_US: u64 = 1_000_000;

/// Formats a perf-scope event's message body:
/// `[perf] {emoji}{scope_name} ({detail}) {duration} v0={v0} v1={v1} hr=0x{hr:08X}`.
/// The classification is always `Debug`, regardless of the emoji chosen
/// from the duration.
pub fn format_perf_scope_message(fields: &PerfScopeFields) -> String {
    let emoji = if fields.duration_microseconds >= ERROR_THRESHOLD_US {
        "\u{274C} "
    } else if fields.duration_microseconds >= WARNING_THRESHOLD_US {
        "\u{26A0}\u{FE0F} "
    } else {
        ""
    };
    let duration_ms = fields.duration_microseconds as f64 / 1000.0;
    format!(
        "[perf] {emoji}{} ({}) {duration_ms:.3}ms v0={} v1={} hr=0x{:08X}",
        fields.scope_name, fields.detail, fields.value0, fields.value1, fields.hresult
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_crlf_then_lf_then_cr() {
        assert_eq!(trim_trailing_newline("abc\r\n"), "abc");
        assert_eq!(trim_trailing_newline("abc\n"), "abc");
        assert_eq!(trim_trailing_newline("abc\r"), "abc");
        assert_eq!(trim_trailing_newline("abc"), "abc");
    }

    #[test]
    fn perf_scope_emoji_thresholds() {
        let fast = PerfScopeFields {
            scope_name: "load".into(),
            detail: "cache".into(),
            duration_microseconds: 1_000,
            value0: 1,
            value1: 2,
            hresult: 0,
        };
        assert!(format_perf_scope_message(&fast).starts_with("[perf] load"));

        let slow = PerfScopeFields {
            duration_microseconds: 600_000,
            ..fast.clone()
        };
        assert!(format_perf_scope_message(&slow).starts_with("[perf] \u{26A0}\u{FE0F} load"));

        let very_slow = PerfScopeFields {
            duration_microseconds: 1_500_000,
            ..fast
        };
        assert!(format_perf_scope_message(&very_slow).starts_with("[perf] \u{274C} load"));
    }
}
