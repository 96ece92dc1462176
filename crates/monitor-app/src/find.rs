//! Find-in-view overlay: query text, toggles, and match-list rebuild,
//! without any reactive-signal wiring — there is no reactive UI layer
//! here, so state is plain fields mutated by explicit calls from the
//! view controller.

use std::time::Duration;

/// Debounce before a query edit triggers a match-list rebuild.
pub const FIND_DEBOUNCE: Duration = Duration::from_millis(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindStartMode {
    CurrentPosition,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FindMatch {
    pub line: usize,
    pub start: u32,
    pub end: u32,
}

/// Find-in-view state: query text, toggles, and the rebuilt match list.
/// Regex search is intentionally left out — the source text here is
/// plain ingest output rather than editable source code, so a literal/
/// whole-word substring search covers the real use cases.
#[derive(Default)]
pub struct FindOverlay {
    visible: bool,
    query: String,
    case_sensitive: bool,
    whole_words: bool,
    matches: Vec<FindMatch>,
    current: Option<usize>,
}

impl FindOverlay {
    pub fn new() -> Self {
        FindOverlay::default()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        if self.case_sensitive != case_sensitive {
            self.case_sensitive = case_sensitive;
            self.invalidate();
        }
    }

    pub fn set_whole_words(&mut self, whole_words: bool) {
        if self.whole_words != whole_words {
            self.whole_words = whole_words;
            self.invalidate();
        }
    }

    /// Sets the query. Returns `true` if it changed (callers should
    /// debounce [`FIND_DEBOUNCE`] before calling [`Self::rebuild_matches`]).
    pub fn set_query(&mut self, query: &str) -> bool {
        if self.query == query {
            return false;
        }
        self.query = query.to_string();
        self.invalidate();
        if !self.query.is_empty() {
            self.visible = true;
        }
        true
    }

    fn invalidate(&mut self) {
        self.matches.clear();
        self.current = None;
    }

    /// Rebuilds the match list against `lines` (source-line index, text
    /// pairs). Called after the debounce elapses or the visible slice
    /// changes.
    pub fn rebuild_matches<'a>(&mut self, lines: impl Iterator<Item = (usize, &'a str)>) {
        self.matches.clear();
        self.current = None;
        if self.query.is_empty() {
            return;
        }
        let needle_owned;
        let needle: &str = if self.case_sensitive {
            &self.query
        } else {
            needle_owned = self.query.to_lowercase();
            &needle_owned
        };
        if needle.is_empty() {
            return;
        }

        for (line_idx, text) in lines {
            let haystack_owned;
            let haystack: &str = if self.case_sensitive {
                text
            } else {
                haystack_owned = text.to_lowercase();
                &haystack_owned
            };

            let mut search_from = 0usize;
            while search_from <= haystack.len() {
                let Some(rel) = haystack[search_from..].find(needle) else { break };
                let match_start = search_from + rel;
                let match_end = match_start + needle.len();
                if !self.whole_words || is_whole_word(text, match_start, match_end) {
                    self.matches.push(FindMatch { line: line_idx, start: match_start as u32, end: match_end as u32 });
                }
                search_from = match_start + needle.len().max(1);
            }
        }
    }

    pub fn matches(&self) -> &[FindMatch] {
        &self.matches
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn current_match_index(&self) -> Option<usize> {
        self.current
    }

    /// Resolves a [`FindStartMode`] into a concrete `(line, column)`
    /// search origin.
    pub fn start_position(&self, mode: FindStartMode, caret: (usize, u32), last_line: usize) -> (usize, u32) {
        match mode {
            FindStartMode::CurrentPosition => caret,
            FindStartMode::Top => (0, 0),
            FindStartMode::Bottom => (last_line, u32::MAX),
        }
    }

    /// Advances to the next (or, if `reverse`, previous) match relative
    /// to `from`, wrapping around the match list.
    pub fn find_next(&mut self, from: (usize, u32), reverse: bool) -> Option<FindMatch> {
        if self.matches.is_empty() {
            return None;
        }
        let idx = if reverse {
            self.matches
                .iter()
                .rposition(|m| (m.line, m.start) < from)
                .or_else(|| self.matches.len().checked_sub(1))
        } else {
            self.matches
                .iter()
                .position(|m| (m.line, m.start) > from)
                .or(Some(0))
        };
        self.current = idx;
        idx.map(|i| self.matches[i])
    }
}

fn is_whole_word(text: &str, start: usize, end: usize) -> bool {
    let is_word_char = |c: char| c.is_alphanumeric() || c == '_';
    let before_ok = text[..start].chars().next_back().map(|c| !is_word_char(c)).unwrap_or(true);
    let after_ok = text[end..].chars().next().map(|c| !is_word_char(c)).unwrap_or(true);
    before_ok && after_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_by_default() {
        let mut find = FindOverlay::new();
        find.set_query("error");
        find.rebuild_matches([(0, "an ERROR occurred"), (1, "all clear")].into_iter());
        assert_eq!(find.match_count(), 1);
        assert_eq!(find.matches()[0], FindMatch { line: 0, start: 3, end: 8 });
    }

    #[test]
    fn case_sensitive_excludes_different_case() {
        let mut find = FindOverlay::new();
        find.set_case_sensitive(true);
        find.set_query("Error");
        find.rebuild_matches([(0, "an ERROR occurred"), (1, "an Error occurred")].into_iter());
        assert_eq!(find.match_count(), 1);
        assert_eq!(find.matches()[0].line, 1);
    }

    #[test]
    fn whole_words_excludes_substring_hits() {
        let mut find = FindOverlay::new();
        find.set_whole_words(true);
        find.set_query("cat");
        find.rebuild_matches([(0, "concatenate"), (1, "the cat sat")].into_iter());
        assert_eq!(find.match_count(), 1);
        assert_eq!(find.matches()[0].line, 1);
    }

    #[test]
    fn find_next_wraps_around() {
        let mut find = FindOverlay::new();
        find.set_query("x");
        find.rebuild_matches([(0, "x"), (1, "x"), (2, "x")].into_iter());
        let first = find.find_next((0, 0), false).unwrap();
        assert_eq!(first.line, 1);
        let last = find.find_next((2, 0), false).unwrap();
        assert_eq!(last.line, 0, "search wraps back to the first match");
    }

    #[test]
    fn reverse_find_wraps_to_the_end() {
        let mut find = FindOverlay::new();
        find.set_query("x");
        find.rebuild_matches([(0, "x"), (1, "x")].into_iter());
        let prev = find.find_next((0, 0), true).unwrap();
        assert_eq!(prev.line, 1, "reverse search from the first match wraps to the last");
    }
}
