//! The append-only line store: source lines, the derived visibility
//! index, and character/display-row coordinate mappings.
//!
//! All mutable state lives behind a single [`parking_lot::RwLock`].
//! Pure reads take a shared lock; anything that can touch the
//! lazily-computed caches (prefixes, offsets, max line width) takes the
//! write lock, since filling a cache is itself a mutation. This is a
//! slightly coarser but memory-safe stand-in for a "mutable members
//! under a shared lock" scheme, which Rust's aliasing rules don't allow
//! without extra interior-mutability machinery; see DESIGN.md.

use parking_lot::RwLock;

use crate::filter::{FilterMask, MessageType};
use crate::line::{ensure_display, ensure_prefix, ColorSpan, Line, LineMeta, VisibleLine};

/// One row of [`Document::build_filtered_tail_text`]'s per-line output.
#[derive(Debug, Clone, Copy)]
pub struct TailLineInfo {
    pub source_index: usize,
    pub prefix_length: u32,
    pub text_length: u32,
    pub has_meta: bool,
    pub msg_type: Option<MessageType>,
}

/// Result of [`Document::build_filtered_tail_text`].
#[derive(Debug, Clone, Default)]
pub struct FilteredTailText {
    pub text: String,
    pub lines: Vec<TailLineInfo>,
    pub visible_count: usize,
}

struct DocumentInner {
    lines: Vec<Line>,
    visible_lines: Vec<VisibleLine>,
    filter_mask: FilterMask,
    show_ids: bool,

    total_length: Option<u32>,
    line_offsets: Option<Vec<u32>>,
    max_line: Option<(u32, usize)>,

    dirty_first: Option<usize>,
    dirty_last: Option<usize>,
}

impl DocumentInner {
    fn new() -> Self {
        DocumentInner {
            lines: Vec::new(),
            visible_lines: Vec::new(),
            filter_mask: FilterMask::ALL,
            show_ids: true,
            total_length: None,
            line_offsets: None,
            max_line: None,
            dirty_first: None,
            dirty_last: None,
        }
    }

    fn prefix_len(&mut self, idx: usize) -> u32 {
        let show_ids = self.show_ids;
        ensure_prefix(&mut self.lines[idx], show_ids).len() as u32
    }

    fn line_total_len(&mut self, idx: usize) -> u32 {
        let p = self.prefix_len(idx);
        p + self.lines[idx].text.len() as u32
    }

    fn is_line_visible(&self, idx: usize) -> bool {
        match self.lines.get(idx).and_then(|l| l.meta.as_ref()) {
            None => true,
            Some(meta) => self.filter_mask.admits(Some(meta.msg_type)),
        }
    }

    fn rebuild_visible_lines(&mut self) {
        self.visible_lines.clear();
        self.visible_lines.reserve(self.lines.len());
        let mut row = 0u32;
        for i in 0..self.lines.len() {
            if self.is_line_visible(i) {
                self.visible_lines.push(VisibleLine {
                    source_index: i,
                    display_row_start: row,
                });
                row += self.lines[i].display_row_count();
            }
        }
    }

    fn mark_all_dirty(&mut self) {
        if self.lines.is_empty() {
            self.dirty_first = None;
            self.dirty_last = None;
        } else {
            self.dirty_first = Some(0);
            self.dirty_last = Some(self.lines.len() - 1);
        }
    }

    fn update_dirty_range(&mut self, first: usize, last: usize) {
        if self.lines.is_empty() {
            self.dirty_first = None;
            self.dirty_last = None;
            return;
        }
        let (first, last) = (first.min(last), first.max(last));
        self.dirty_first = Some(self.dirty_first.map_or(first, |f| f.min(first)));
        self.dirty_last = Some(self.dirty_last.map_or(last, |l| l.max(last)));
    }

    fn on_line_length_changed(&mut self, index: usize, new_len: u32) {
        match self.max_line {
            None => self.max_line = Some((new_len, index)),
            Some((max_len, max_idx)) => {
                if new_len >= max_len {
                    self.max_line = Some((new_len, index));
                } else if index == max_idx {
                    // the previous max line shrank: force a full re-scan
                    self.max_line = None;
                }
            }
        }
    }

    fn invalidate_full(&mut self) {
        self.total_length = None;
        self.line_offsets = None;
        self.max_line = None;
        for line in &mut self.lines {
            line.invalidate_prefix();
        }
        self.mark_all_dirty();
    }

    fn invalidate_show_ids(&mut self) {
        self.total_length = None;
        self.line_offsets = None;
        self.max_line = None;
        for line in &mut self.lines {
            line.invalidate_prefix();
        }
    }

    fn ensure_offsets_valid(&mut self) {
        if self.line_offsets.is_some() {
            return;
        }
        let mut offsets = Vec::with_capacity(self.lines.len());
        let mut offset = 0u32;
        for i in 0..self.lines.len() {
            offsets.push(offset);
            offset += self.line_total_len(i) + 1; // '\n' separator between adjacent lines
        }
        self.line_offsets = Some(offsets);
    }

    fn ensure_total_length_valid(&mut self) -> u32 {
        if let Some(total) = self.total_length {
            return total;
        }
        let n = self.lines.len();
        let mut total = 0u32;
        for i in 0..n {
            total += self.line_total_len(i);
            if i + 1 < n {
                total += 1;
            }
        }
        self.total_length = Some(total);
        total
    }

    fn total_display_rows(&self) -> u32 {
        match self.visible_lines.last() {
            None => 0,
            Some(vl) => vl.display_row_start + self.lines[vl.source_index].display_row_count(),
        }
    }

    fn get_line_and_offset(&mut self, position: u32) -> (usize, u32) {
        if self.lines.is_empty() {
            return (0, 0);
        }
        let last_idx = self.lines.len() - 1;
        self.ensure_offsets_valid();
        let offsets = self.line_offsets.clone().unwrap();
        let last_start = offsets[last_idx];
        let last_len = self.line_total_len(last_idx);
        let total_len = last_start + last_len;

        if position >= total_len {
            return (last_idx, last_len);
        }

        let idx = match offsets.binary_search(&position) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };
        let line_start = offsets[idx];
        let off = position - line_start;
        let line_len = self.line_total_len(idx);
        (idx, off.min(line_len))
    }

    fn build_prefix_owned(&mut self, idx: usize) -> String {
        let show_ids = self.show_ids;
        ensure_prefix(&mut self.lines[idx], show_ids).to_string()
    }

    fn display_text(&mut self, idx: usize) -> String {
        let show_ids = self.show_ids;
        ensure_display(&mut self.lines[idx], show_ids).to_string()
    }
}

/// The append-only line store. See the module docs for locking discipline.
pub struct Document {
    inner: RwLock<DocumentInner>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Document {
            inner: RwLock::new(DocumentInner::new()),
        }
    }

    /// Replaces all content; fully invalidates derived state.
    pub fn set_text(&self, text: &str) {
        let mut inner = self.inner.write();
        inner.lines.clear();
        inner.visible_lines.clear();
        for segment in text.split('\n') {
            let cleaned: String = segment.chars().filter(|&c| c != '\r').collect();
            inner.lines.push(Line::new(cleaned));
        }
        inner.invalidate_full();
        inner.rebuild_visible_lines();
    }

    /// Empties the document; all derived state invalidated.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.lines.clear();
        inner.visible_lines.clear();
        inner.invalidate_full();
    }

    /// Splits `more` on `\n` (stripping `\r`), appending into the last
    /// line and creating new lines for each subsequent segment.
    pub fn append_text(&self, more: &str) {
        if more.is_empty() {
            return;
        }
        let mut inner = self.inner.write();
        if inner.lines.is_empty() {
            inner.lines.push(Line::new(String::new()));
        }
        let prev_line_count = inner.lines.len();

        let mut chars_appended: u32 = 0;
        let mut new_lines_added: u32 = 0;

        let mut parts = more.split('\n');
        if let Some(first) = parts.next() {
            let cleaned: String = first.chars().filter(|&c| c != '\r').collect();
            if !cleaned.is_empty() {
                let idx = inner.lines.len() - 1;
                inner.lines[idx].text.push_str(&cleaned);
                inner.lines[idx].invalidate_display();
                chars_appended += cleaned.len() as u32;
                let new_len = inner.line_total_len(idx);
                inner.on_line_length_changed(idx, new_len);
            }
        }
        for part in parts {
            let cleaned: String = part.chars().filter(|&c| c != '\r').collect();
            new_lines_added += 1;
            chars_appended += cleaned.len() as u32;
            inner.lines.push(Line::new(cleaned));
            let idx = inner.lines.len() - 1;
            let new_len = inner.line_total_len(idx);
            inner.on_line_length_changed(idx, new_len);
        }

        if let Some(total) = inner.total_length {
            inner.total_length = Some(total + chars_appended + new_lines_added);
        }

        if let Some(mut offsets) = inner.line_offsets.take() {
            if offsets.len() != prev_line_count {
                inner.line_offsets = None;
            } else {
                let mut offset = if prev_line_count > 0 {
                    let tail = prev_line_count - 1;
                    offsets[tail] + inner.line_total_len(tail) + 1
                } else {
                    0
                };
                for idx in prev_line_count..inner.lines.len() {
                    offsets.push(offset);
                    offset += inner.line_total_len(idx) + 1;
                }
                inner.line_offsets = Some(offsets);
            }
        }

        if !inner.lines.is_empty() {
            let last_index = inner.lines.len() - 1;
            let first_dirty = prev_line_count.saturating_sub(1);
            inner.update_dirty_range(first_dirty, last_index);
        }

        inner.rebuild_visible_lines();
    }

    /// Appends a single line with metadata. O(1) amortized: the
    /// visibility index gets one push (iff the new line is visible)
    /// rather than a full rebuild.
    pub fn append_info_line(&self, text: &str, meta: LineMeta) {
        let mut inner = self.inner.write();
        let cleaned: String = text.chars().filter(|&c| c != '\r').collect();
        let line = Line::with_meta(cleaned, meta);
        inner.lines.push(line);
        let new_index = inner.lines.len() - 1;

        let new_len = inner.line_total_len(new_index);
        inner.on_line_length_changed(new_index, new_len);

        if let Some(total) = inner.total_length {
            let mut delta = new_len;
            if inner.lines.len() > 1 {
                delta += 1;
            }
            inner.total_length = Some(total + delta);
        }

        if let Some(mut offsets) = inner.line_offsets.take() {
            if offsets.len() != new_index {
                inner.line_offsets = None;
            } else {
                let offset = if let Some(&last) = offsets.last() {
                    let prev = new_index - 1;
                    last + inner.line_total_len(prev) + 1
                } else {
                    0
                };
                offsets.push(offset);
                inner.line_offsets = Some(offsets);
            }
        }

        if inner.is_line_visible(new_index) {
            let display_row = match inner.visible_lines.last() {
                Some(last) => last.display_row_start + inner.lines[last.source_index].display_row_count(),
                None => 0,
            };
            inner.visible_lines.push(VisibleLine {
                source_index: new_index,
                display_row_start: display_row,
            });
        }

        inner.update_dirty_range(new_index, new_index);
    }

    /// Rebuilds the visibility index from scratch (O(n), acceptable: a
    /// rare user-triggered action) and marks the whole document dirty
    /// for width re-measurement.
    pub fn set_filter_mask(&self, mask: FilterMask) {
        let mut inner = self.inner.write();
        if inner.filter_mask == mask {
            return;
        }
        inner.filter_mask = mask;
        inner.rebuild_visible_lines();
        inner.mark_all_dirty();
    }

    pub fn filter_mask(&self) -> FilterMask {
        self.inner.read().filter_mask
    }

    /// Invalidates every line's cached prefix/display string, the cached
    /// total length, offsets, and max-line-width; marks all dirty.
    pub fn enable_show_ids(&self, enable: bool) {
        let mut inner = self.inner.write();
        inner.show_ids = enable;
        inner.invalidate_show_ids();
        inner.mark_all_dirty();
    }

    pub fn show_ids(&self) -> bool {
        self.inner.read().show_ids
    }

    pub fn total_line_count(&self) -> usize {
        self.inner.read().lines.len()
    }

    pub fn visible_line_count(&self) -> usize {
        self.inner.read().visible_lines.len()
    }

    pub fn total_length(&self) -> u32 {
        self.inner.write().ensure_total_length_valid()
    }

    pub fn longest_line_chars(&self) -> usize {
        let mut inner = self.inner.write();
        if let Some((len, _)) = inner.max_line {
            return len as usize;
        }
        let mut max_len = 0u32;
        let mut max_idx = 0usize;
        for i in 0..inner.lines.len() {
            let len = inner.line_total_len(i);
            if len > max_len {
                max_len = len;
                max_idx = i;
            }
        }
        inner.max_line = Some((max_len, max_idx));
        max_len as usize
    }

    pub fn is_line_visible(&self, source_index: usize) -> bool {
        self.inner.read().is_line_visible(source_index)
    }

    pub fn visible_source_index(&self, visible_index: usize) -> Option<usize> {
        self.inner
            .read()
            .visible_lines
            .get(visible_index)
            .map(|vl| vl.source_index)
    }

    pub fn visible_line_count_snapshot(&self) -> Vec<VisibleLine> {
        self.inner.read().visible_lines.clone()
    }

    /// First display row of `source_index`. For a filtered-out line,
    /// returns the next visible line's start, or total display rows if
    /// there is none.
    pub fn display_row_for_source(&self, source_index: usize) -> u32 {
        let inner = self.inner.read();
        if source_index >= inner.lines.len() {
            return inner.total_display_rows();
        }
        if inner.visible_lines.is_empty() {
            return 0;
        }
        match inner
            .visible_lines
            .binary_search_by(|vl| vl.source_index.cmp(&source_index))
        {
            Ok(i) => inner.visible_lines[i].display_row_start,
            Err(i) if i < inner.visible_lines.len() => inner.visible_lines[i].display_row_start,
            Err(_) => inner.total_display_rows(),
        }
    }

    /// Index into `visible_lines` whose `display_row_start <= row < next`.
    pub fn visible_index_from_display_row(&self, display_row: u32) -> usize {
        let inner = self.inner.read();
        if inner.visible_lines.is_empty() {
            return 0;
        }
        match inner
            .visible_lines
            .binary_search_by(|vl| vl.display_row_start.cmp(&display_row))
        {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        }
    }

    pub fn total_display_rows(&self) -> u32 {
        self.inner.read().total_display_rows()
    }

    pub fn get_line_start_offset(&self, source_index: usize) -> u32 {
        let mut inner = self.inner.write();
        if source_index >= inner.lines.len() {
            return 0;
        }
        inner.ensure_offsets_valid();
        inner.line_offsets.as_ref().unwrap()[source_index]
    }

    pub fn get_line_and_offset(&self, position: u32) -> (usize, u32) {
        self.inner.write().get_line_and_offset(position)
    }

    /// Returns contiguous text; a single `\n` separates adjacent source
    /// lines. Never produces `\r`.
    pub fn get_text_range(&self, start: u32, length: u32) -> String {
        if length == 0 {
            return String::new();
        }
        let mut inner = self.inner.write();
        if inner.lines.is_empty() {
            return String::new();
        }
        let (start_line, start_offset) = inner.get_line_and_offset(start);
        let (end_line, end_offset) = inner.get_line_and_offset(start + length - 1);

        let mut result = String::with_capacity(length as usize);
        let append_slice = |inner: &mut DocumentInner, result: &mut String, idx: usize, from: u32, count: u32| {
            if count == 0 {
                return;
            }
            let plen = inner.prefix_len(idx);
            if from < plen {
                let prefix = inner.build_prefix_owned(idx);
                let first_part = count.min(plen - from);
                push_byte_range(result, &prefix, from, first_part);
                if count > first_part {
                    let rem = count - first_part;
                    let tcopy = rem.min(inner.lines[idx].text.len() as u32);
                    push_byte_range(result, &inner.lines[idx].text, 0, tcopy);
                }
            } else {
                let off = from - plen;
                let text_len = inner.lines[idx].text.len() as u32;
                let avail = text_len.saturating_sub(off.min(text_len));
                let tcopy = count.min(avail);
                if off < text_len && tcopy > 0 {
                    push_byte_range(result, &inner.lines[idx].text, off, tcopy);
                }
            }
        };

        if start_line == end_line {
            if start_line < inner.lines.len() {
                append_slice(&mut *inner, &mut result, start_line, start_offset, length);
            }
            return result;
        }

        if start_line < inner.lines.len() {
            let fl_total = inner.line_total_len(start_line);
            if start_offset < fl_total {
                append_slice(&mut *inner, &mut result, start_line, start_offset, fl_total - start_offset);
            }
            result.push('\n');
        }
        for idx in (start_line + 1)..end_line {
            if idx >= inner.lines.len() {
                break;
            }
            let prefix = inner.build_prefix_owned(idx);
            result.push_str(&prefix);
            result.push_str(&inner.lines[idx].text);
            result.push('\n');
        }
        if end_line < inner.lines.len() {
            let upto = (end_offset + 1).min(inner.line_total_len(end_line));
            append_slice(&mut *inner, &mut result, end_line, 0, upto);
        }
        result
    }

    /// Stable (cloned) display string for the line at `visible_index`.
    pub fn get_display_text(&self, visible_index: usize) -> Option<String> {
        let mut inner = self.inner.write();
        let source = inner.visible_lines.get(visible_index)?.source_index;
        Some(inner.display_text(source))
    }

    pub fn get_display_text_all(&self, source_index: usize) -> Option<String> {
        let mut inner = self.inner.write();
        if source_index >= inner.lines.len() {
            return None;
        }
        Some(inner.display_text(source_index))
    }

    /// Single shared-lock-scope read of a contiguous visible-line range:
    /// joins visible display strings in `[first, last]` with `\n`, no
    /// trailing newline.
    pub fn build_filtered_tail_text(&self, first: usize, last: usize) -> FilteredTailText {
        let mut result = FilteredTailText::default();
        let mut inner = self.inner.write();
        if first >= inner.lines.len() {
            return result;
        }
        let last = last.min(inner.lines.len() - 1);
        result.lines.reserve(last - first + 1);

        for i in first..=last {
            if !inner.is_line_visible(i) {
                continue;
            }
            result.visible_count += 1;
            let prefix_len = inner.prefix_len(i);
            let text_len = inner.lines[i].text.len() as u32;
            let has_meta = inner.lines[i].has_meta();
            let msg_type = inner.lines[i].meta.map(|m| m.msg_type);
            result.lines.push(TailLineInfo {
                source_index: i,
                prefix_length: prefix_len,
                text_length: text_len,
                has_meta,
                msg_type,
            });
            let display = inner.display_text(i);
            result.text.push_str(&display);
            result.text.push('\n');
        }
        if !result.text.is_empty() {
            result.text.pop();
        }
        result
    }

    /// Maps a flat range to `[line, text-local]` spans and appends them
    /// to each intersecting line. Empty ranges are ignored; spans are
    /// clipped to each line's text range.
    pub fn add_color_range(&self, start: u32, length: u32, color: u32) {
        if length == 0 {
            return;
        }
        let mut inner = self.inner.write();
        let (start_line, start_offset) = inner.get_line_and_offset(start);
        let (end_line, end_offset) = inner.get_line_and_offset(start + length - 1);

        for idx in start_line..=end_line {
            if idx >= inner.lines.len() {
                break;
            }
            let plen = inner.prefix_len(idx);
            let text_len = inner.lines[idx].text.len() as u32;
            let local_start_full = if idx == start_line { start_offset } else { 0 };
            let local_end_full = if idx == end_line {
                end_offset
            } else {
                plen + text_len.saturating_sub(1)
            };
            let local_start = local_start_full.saturating_sub(plen);
            let local_end = local_end_full.saturating_sub(plen);
            if local_end < local_start {
                continue;
            }
            let mut local_len = local_end - local_start + 1;
            if local_len > 0 && local_start < text_len {
                local_len = local_len.min(text_len - local_start);
                inner.lines[idx].spans.push(ColorSpan {
                    start: local_start,
                    length: local_len,
                    color,
                });
            }
        }
    }

    pub fn clear_coloring(&self) {
        let mut inner = self.inner.write();
        for line in &mut inner.lines {
            line.spans.clear();
        }
    }

    /// The message type of the line at `source_index`, or `None` for a
    /// line with no attached metadata.
    pub fn line_msg_type(&self, source_index: usize) -> Option<MessageType> {
        self.inner.read().lines.get(source_index).and_then(|l| l.meta.map(|m| m.msg_type))
    }

    pub fn color_spans(&self, source_index: usize) -> Vec<ColorSpan> {
        self.inner
            .read()
            .lines
            .get(source_index)
            .map(|l| l.spans.clone())
            .unwrap_or_default()
    }

    /// Returns and resets `[first_dirty, last_dirty]`, if any.
    pub fn extract_dirty_line_range(&self) -> Option<(usize, usize)> {
        let mut inner = self.inner.write();
        let range = match (inner.dirty_first, inner.dirty_last) {
            (Some(f), Some(l)) => Some((f, l)),
            _ => None,
        };
        inner.dirty_first = None;
        inner.dirty_last = None;
        range
    }

    pub fn mark_all_dirty(&self) {
        self.inner.write().mark_all_dirty();
    }
}

fn push_byte_range(out: &mut String, source: &str, from: u32, count: u32) {
    let start = from as usize;
    let end = (from + count) as usize;
    if start >= source.len() {
        return;
    }
    let end = end.min(source.len());
    // Clamp to char boundaries: positions are caller-validated in every
    // call site above (they come from prefix/text lengths), but a clamp
    // here keeps this helper panic-free under arbitrary input.
    let start = floor_char_boundary(source, start);
    let end = floor_char_boundary(source, end.max(start));
    out.push_str(&source[start..end]);
}

fn floor_char_boundary(s: &str, mut idx: usize) -> usize {
    if idx >= s.len() {
        return s.len();
    }
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn meta(ty: MessageType) -> LineMeta {
        LineMeta {
            msg_type: ty,
            time: Local::now(),
            process_id: 1,
            thread_id: 2,
        }
    }

    #[test]
    fn s1_append_then_query() {
        let doc = Document::new();
        doc.append_info_line("hello", meta(MessageType::Info));
        doc.append_info_line("world", meta(MessageType::Error));
        assert_eq!(doc.total_line_count(), 2);
        assert_eq!(doc.visible_line_count(), 2);

        let total = doc.total_length();
        let text = doc.get_text_range(0, total);
        let p0 = doc.get_display_text(0).unwrap();
        let p1 = doc.get_display_text(1).unwrap();
        assert_eq!(text, format!("{p0}\n{p1}"));
    }

    #[test]
    fn s2_filter_errors_only() {
        let doc = Document::new();
        doc.append_info_line("hello", meta(MessageType::Info));
        doc.append_info_line("world", meta(MessageType::Error));
        doc.set_filter_mask(FilterMask::ERRORS_ONLY);
        assert_eq!(doc.visible_line_count(), 1);
        assert_eq!(doc.visible_source_index(0), Some(1));
        assert_eq!(doc.total_display_rows(), 1);
    }

    #[test]
    fn s3_multi_row_lines() {
        let doc = Document::new();
        doc.append_info_line("a\nb\nc", meta(MessageType::Info));
        assert_eq!(doc.total_display_rows(), 3);
        assert_eq!(doc.display_row_for_source(0), 0);
        doc.append_info_line("d", meta(MessageType::Info));
        assert_eq!(doc.display_row_for_source(1), 3);
    }

    #[test]
    fn s5_auto_scroll_style_append_keeps_offsets_consistent() {
        let doc = Document::new();
        for k in 0..100 {
            doc.append_info_line(&format!("k={k}"), meta(MessageType::Info));
        }
        assert_eq!(doc.total_line_count(), 100);
        assert_eq!(doc.visible_line_count(), 100);
        assert_eq!(doc.total_display_rows(), 100);
    }

    #[test]
    fn empty_document_queries_are_consistent() {
        let doc = Document::new();
        assert_eq!(doc.total_length(), 0);
        assert_eq!(doc.total_display_rows(), 0);
        assert_eq!(doc.get_text_range(0, 0), "");
        assert_eq!(doc.get_line_and_offset(0), (0, 0));
    }

    #[test]
    fn filter_hides_all_metadata_lines() {
        let doc = Document::new();
        doc.append_text("no meta 1\nno meta 2");
        doc.append_info_line("has meta", meta(MessageType::Debug));
        doc.set_filter_mask(FilterMask::from_bits(0));
        // lines without metadata are always visible regardless of mask.
        assert_eq!(doc.visible_line_count(), 2);
    }

    #[test]
    fn get_line_and_offset_roundtrips_line_starts() {
        let doc = Document::new();
        doc.append_info_line("hello", meta(MessageType::Info));
        doc.append_info_line("world", meta(MessageType::Error));
        for i in 0..doc.total_line_count() {
            let start = doc.get_line_start_offset(i);
            assert_eq!(doc.get_line_and_offset(start), (i, 0));
        }
        let total = doc.total_length();
        let last = doc.total_line_count() - 1;
        let last_len = doc.get_display_text(last).unwrap().len() as u32;
        assert_eq!(doc.get_line_and_offset(total), (last, last_len));
    }

    #[test]
    fn show_ids_toggle_changes_prefix_but_not_text() {
        let doc = Document::new();
        doc.append_info_line("hi", meta(MessageType::Info));
        doc.enable_show_ids(false);
        let without_ids = doc.get_display_text(0).unwrap();
        doc.enable_show_ids(true);
        let with_ids = doc.get_display_text(0).unwrap();
        assert_ne!(without_ids, with_ids);
        assert!(with_ids.ends_with("hi"));
        assert!(without_ids.ends_with("hi"));
    }
}
