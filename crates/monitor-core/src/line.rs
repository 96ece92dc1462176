//! The per-line data owned by [`crate::Document`].

use chrono::{DateTime, Local, Timelike};

use crate::filter::MessageType;

/// A color run within a line's *text*, in text-only coordinates (the
/// prefix is excluded). Ranges are clipped to `[0, text.len())` at
/// insertion time by [`crate::Document::add_color_range`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSpan {
    pub start: u32,
    pub length: u32,
    /// Packed 0xAARRGGBB, left to the renderer to interpret.
    pub color: u32,
}

/// Metadata attached to an ingested line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMeta {
    pub msg_type: MessageType,
    pub time: DateTime<Local>,
    pub process_id: u32,
    pub thread_id: u32,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct LineCache {
    pub prefix: Option<String>,
    pub display: Option<String>,
}

/// A single logical line in the append-only log.
///
/// `text` never contains `\r`; it may contain embedded `\n` (see
/// `newline_count`). Cached fields are lazily recomputed after
/// invalidation and are private — callers go through `Document`.
#[derive(Debug, Clone)]
pub struct Line {
    pub text: String,
    pub meta: Option<LineMeta>,
    pub spans: Vec<ColorSpan>,
    pub newline_count: u32,
    pub(crate) cache: LineCache,
}

impl Line {
    pub fn new(text: String) -> Self {
        let newline_count = text.bytes().filter(|&b| b == b'\n').count() as u32;
        Line {
            text,
            meta: None,
            spans: Vec::new(),
            newline_count,
            cache: LineCache::default(),
        }
    }

    pub fn with_meta(text: String, meta: LineMeta) -> Self {
        let mut line = Line::new(text);
        line.meta = Some(meta);
        line
    }

    pub fn has_meta(&self) -> bool {
        self.meta.is_some()
    }

    /// Number of display rows this line occupies.
    pub fn display_row_count(&self) -> u32 {
        self.newline_count + 1
    }

    pub(crate) fn recount_newlines(&mut self) {
        self.newline_count = self.text.bytes().filter(|&b| b == b'\n').count() as u32;
    }

    pub(crate) fn invalidate_display(&mut self) {
        self.cache.display = None;
    }

    pub(crate) fn invalidate_prefix(&mut self) {
        self.cache.prefix = None;
        self.cache.display = None;
    }
}

/// Derived index entry: a source line currently passing the filter.
/// Sorted strictly by `source_index`; `display_row_start` accumulates
/// `newline_count + 1` of preceding visible lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleLine {
    pub source_index: usize,
    pub display_row_start: u32,
}

fn emoji_for_type(ty: MessageType) -> &'static str {
    match ty {
        MessageType::Error => "\u{1F6D1} ",
        MessageType::Warning => "\u{26A0}\u{FE0F} ",
        MessageType::Info => "\u{2139}\u{FE0F} ",
        MessageType::Debug => "\u{1F41E} ",
        MessageType::Text => "\u{1F4DD} ",
        MessageType::All => "",
    }
}

fn format_time_hms_millis(time: &DateTime<Local>) -> String {
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        time.hour(),
        time.minute(),
        time.second(),
        time.timestamp_subsec_millis()
    )
}

/// Builds (and caches) the prefix for `line` — emoji + `HH:MM:SS.mmm` +
/// optional `PID:TID` + trailing space — or an empty string if the line
/// carries no metadata. Mirrors `Document::BuildPrefix`.
pub(crate) fn ensure_prefix<'a>(line: &'a mut Line, show_ids: bool) -> &'a str {
    if line.meta.is_none() {
        return "";
    }
    if line.cache.prefix.is_none() {
        let meta = line.meta.unwrap();
        let mut prefix = String::with_capacity(32);
        prefix.push_str(emoji_for_type(meta.msg_type));
        prefix.push_str(&format_time_hms_millis(&meta.time));
        if show_ids && (meta.process_id != 0 || meta.thread_id != 0) {
            prefix.push(' ');
            prefix.push_str(&meta.process_id.to_string());
            prefix.push(':');
            prefix.push_str(&meta.thread_id.to_string());
        }
        prefix.push(' ');
        line.cache.prefix = Some(prefix);
        line.cache.display = None;
    }
    line.cache.prefix.as_deref().unwrap()
}

/// Builds (and caches) the full display string: prefix + text, with any
/// `\r` stripped (defense in depth — ingest should already have stripped
/// them). Mirrors `Document::GetDisplayTextRef`.
pub(crate) fn ensure_display<'a>(line: &'a mut Line, show_ids: bool) -> &'a str {
    if line.cache.display.is_none() {
        let prefix_len = ensure_prefix(line, show_ids).len();
        let mut display = String::with_capacity(prefix_len + line.text.len());
        if let Some(p) = line.cache.prefix.as_ref() {
            display.push_str(p);
        }
        display.push_str(&line.text);
        if display.contains('\r') {
            display.retain(|c| c != '\r');
        }
        line.cache.display = Some(display);
    }
    line.cache.display.as_deref().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newline_count_tracks_text() {
        let line = Line::new("a\nb\nc".to_string());
        assert_eq!(line.newline_count, 2);
        assert_eq!(line.display_row_count(), 3);
    }

    #[test]
    fn no_meta_has_empty_prefix() {
        let mut line = Line::new("hello".to_string());
        assert_eq!(ensure_prefix(&mut line, true), "");
    }
}
