//! Property-based tests for `Document`'s core invariants: visibility
//! ordering, offset round-tripping, filter semantics, and panic-freedom
//! under arbitrary ranges.

use chrono::Local;
use proptest::prelude::*;
use scopewatch_core::{Document, FilterMask, LineMeta, MessageType};

fn all_types() -> Vec<MessageType> {
    vec![
        MessageType::Text,
        MessageType::Error,
        MessageType::Warning,
        MessageType::Info,
        MessageType::Debug,
    ]
}

fn meta(ty: MessageType) -> LineMeta {
    LineMeta {
        msg_type: ty,
        time: Local::now(),
        process_id: 7,
        thread_id: 9,
    }
}

#[derive(Debug, Clone)]
enum Op {
    AppendInfo(usize, String),
    AppendPlain(String),
    SetFilter(u32),
    Clear,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..5, "[a-z]{0,8}").prop_map(|(t, s)| Op::AppendInfo(t, s)),
        "[a-z\n]{0,12}".prop_map(Op::AppendPlain),
        (0u32..0x20).prop_map(Op::SetFilter),
        Just(Op::Clear),
    ]
}

proptest! {
    /// Invariant 1: visible_lines is strictly increasing in source_index
    /// and display_row_start, with the correct row delta between entries.
    #[test]
    fn visible_lines_strictly_increasing(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let doc = Document::new();
        let types = all_types();
        for op in ops {
            match op {
                Op::AppendInfo(t, text) => doc.append_info_line(&text, meta(types[t % types.len()])),
                Op::AppendPlain(text) => doc.append_text(&text),
                Op::SetFilter(bits) => doc.set_filter_mask(FilterMask::from_bits(bits)),
                Op::Clear => doc.clear(),
            }
        }

        let visible = doc.visible_line_count_snapshot();
        for w in visible.windows(2) {
            prop_assert!(w[1].source_index > w[0].source_index);
            prop_assert!(w[1].display_row_start >= w[0].display_row_start);
        }
        for i in 0..visible.len() {
            let next_start = if i + 1 < visible.len() {
                visible[i + 1].display_row_start
            } else {
                doc.total_display_rows()
            };
            // row delta equals newline_count + 1 of the visible line itself;
            // derive the row count from the display text, which carries no
            // embedded newlines beyond the raw text's own.
            let display_text = doc.get_display_text(i).unwrap();
            let row_count = display_text.matches('\n').count() as u32 + 1;
            prop_assert_eq!(next_start - visible[i].display_row_start, row_count);
        }
    }

    /// Invariant 2: get_line_and_offset(get_line_start_offset(i)) == (i, 0),
    /// and the position at total_length() lands on the last line's end.
    #[test]
    fn line_start_offset_roundtrips(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let doc = Document::new();
        let types = all_types();
        for op in ops {
            match op {
                Op::AppendInfo(t, text) => doc.append_info_line(&text, meta(types[t % types.len()])),
                Op::AppendPlain(text) => doc.append_text(&text),
                Op::SetFilter(bits) => doc.set_filter_mask(FilterMask::from_bits(bits)),
                Op::Clear => doc.clear(),
            }
        }

        for i in 0..doc.total_line_count() {
            let start = doc.get_line_start_offset(i);
            prop_assert_eq!(doc.get_line_and_offset(start), (i, 0));
        }
        if doc.total_line_count() > 0 {
            let last = doc.total_line_count() - 1;
            let total = doc.total_length();
            let (idx, _) = doc.get_line_and_offset(total);
            prop_assert_eq!(idx, last);
        }
    }

    /// Invariant 4: a line is visible iff it has no metadata, or its
    /// type's bit is set in the current filter mask.
    #[test]
    fn visibility_matches_filter_semantics(ops in prop::collection::vec(op_strategy(), 0..40), bits in 0u32..0x20) {
        let doc = Document::new();
        let types = all_types();
        for op in ops {
            match op {
                Op::AppendInfo(t, text) => doc.append_info_line(&text, meta(types[t % types.len()])),
                Op::AppendPlain(text) => doc.append_text(&text),
                Op::SetFilter(bits) => doc.set_filter_mask(FilterMask::from_bits(bits)),
                Op::Clear => doc.clear(),
            }
        }
        doc.set_filter_mask(FilterMask::from_bits(bits));
        let mask = FilterMask::from_bits(bits);
        for i in 0..doc.total_line_count() {
            let expected = mask.admits(doc.line_msg_type(i));
            prop_assert_eq!(expected, doc.is_line_visible(i));
        }
    }

    /// Boundary: get_text_range(0, total_length()) never panics and its
    /// length in bytes never exceeds the requested length.
    #[test]
    fn text_range_never_panics(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let doc = Document::new();
        let types = all_types();
        for op in ops {
            match op {
                Op::AppendInfo(t, text) => doc.append_info_line(&text, meta(types[t % types.len()])),
                Op::AppendPlain(text) => doc.append_text(&text),
                Op::SetFilter(bits) => doc.set_filter_mask(FilterMask::from_bits(bits)),
                Op::Clear => doc.clear(),
            }
        }
        let total = doc.total_length();
        let text = doc.get_text_range(0, total);
        prop_assert!(text.len() as u32 <= total);
        prop_assert!(!text.contains('\r'));
    }
}
