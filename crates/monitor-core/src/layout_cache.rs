//! Slice-based LRU cache mapping a contiguous source-line range to a
//! prepared text layout.

use std::collections::VecDeque;

/// A filtered-run mapping entry: connects a position in a filter-built
/// layout back to a position in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilteredRun {
    pub source_line: usize,
    pub layout_start: u32,
    pub length: u32,
    pub source_start: u32,
}

/// Key identifying a slice: the inclusive `[first_source_line,
/// last_source_line]` range a cached layout covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SliceKey {
    pub first_source_line: usize,
    pub last_source_line: usize,
}

/// A cached, prepared slice. `layout_handle` is opaque to this crate —
/// it is whatever the renderer's concrete `TextShaper` produced; the
/// cache only manages its lifetime and LRU ordering.
#[derive(Debug, Clone)]
pub struct CachedSlice<L> {
    pub start_position: u32,
    pub end_position: u32,
    pub first_display_row: u32,
    pub is_filtered: bool,
    pub filtered_runs: Vec<FilteredRun>,
    pub layout_handle: L,
}

/// Bounded LRU of size `<= capacity` (default 8). Promotion on hit,
/// eviction of the least-recently-used entry on
/// overflow. Invalidated wholesale on filter/font/DPI/viewport change,
/// text clear, or show-ids toggle — call [`LayoutCache::clear`].
pub struct LayoutCache<L> {
    capacity: usize,
    // Most-recently-used at the back.
    order: VecDeque<SliceKey>,
    entries: std::collections::HashMap<SliceKey, CachedSlice<L>>,
}

pub const DEFAULT_CAPACITY: usize = 8;

impl<L> LayoutCache<L> {
    pub fn new(capacity: usize) -> Self {
        LayoutCache {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            entries: std::collections::HashMap::new(),
        }
    }

    pub fn get(&mut self, key: &SliceKey) -> Option<&CachedSlice<L>> {
        if self.entries.contains_key(key) {
            self.touch(key);
            self.entries.get(key)
        } else {
            None
        }
    }

    pub fn insert(&mut self, key: SliceKey, slice: CachedSlice<L>) {
        if self.entries.insert(key, slice).is_some() {
            self.touch(&key);
            return;
        }
        self.order.push_back(key);
        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self, key: &SliceKey) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let k = self.order.remove(pos).unwrap();
            self.order.push_back(k);
        }
    }
}

impl<L> Default for LayoutCache<L> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(a: usize, b: usize) -> SliceKey {
        SliceKey {
            first_source_line: a,
            last_source_line: b,
        }
    }

    fn slice(n: u32) -> CachedSlice<u32> {
        CachedSlice {
            start_position: 0,
            end_position: n,
            first_display_row: 0,
            is_filtered: false,
            filtered_runs: Vec::new(),
            layout_handle: n,
        }
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut cache: LayoutCache<u32> = LayoutCache::new(2);
        cache.insert(key(0, 10), slice(1));
        cache.insert(key(11, 20), slice(2));
        cache.insert(key(21, 30), slice(3));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key(0, 10)).is_none());
        assert!(cache.get(&key(21, 30)).is_some());
    }

    #[test]
    fn hit_promotes_entry() {
        let mut cache: LayoutCache<u32> = LayoutCache::new(2);
        cache.insert(key(0, 10), slice(1));
        cache.insert(key(11, 20), slice(2));
        // touch the first entry so it's no longer the LRU victim.
        assert!(cache.get(&key(0, 10)).is_some());
        cache.insert(key(21, 30), slice(3));
        assert!(cache.get(&key(0, 10)).is_some());
        assert!(cache.get(&key(11, 20)).is_none());
    }
}
