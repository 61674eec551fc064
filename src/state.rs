/// Engine-owned mutable state
use std::collections::{HashMap, HashSet};

use crate::tab_data::{BookmarkId, BookmarkNode, TabId};

/// Best-guess opener recorded for a tab whose real opener was unknown
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionalOpener {
    pub opener_id: TabId,
    pub version: u64,
    /// Waiting for a real destination URL
    pub is_new_tab: bool,
    pub opened_with_others: bool,
}

#[derive(Debug, Default)]
pub struct EngineState {
    /// Number of our own bookmark creations whose events may still arrive
    creating_count: usize,
    pending_bookmarks: Vec<BookmarkNode>,
    flush_generation: u64,
    /// Keyed by `Tab::unique_key`
    provisional: HashMap<String, ProvisionalOpener>,
    next_version: u64,
    moving_across_windows: HashSet<TabId>,
    last_bookmark_folder: Option<BookmarkId>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything, e.g. after the host restarted the background page
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn creating_count(&self) -> usize {
        self.creating_count
    }

    pub fn begin_bulk_create(&mut self, count: usize) {
        self.creating_count += count;
    }

    pub fn end_bulk_create(&mut self, count: usize) {
        self.creating_count = self.creating_count.saturating_sub(count);
    }

    /// Queue a bookmark for grouping; returns the generation of the flush it schedules
    pub fn push_pending_bookmark(&mut self, bookmark: BookmarkNode) -> u64 {
        self.pending_bookmarks.push(bookmark);
        self.flush_generation += 1;
        self.flush_generation
    }

    pub fn pending_bookmark_count(&self) -> usize {
        self.pending_bookmarks.len()
    }

    /// Take the batch if `generation` is still the latest scheduled flush
    pub fn take_pending_bookmarks(&mut self, generation: u64) -> Option<Vec<BookmarkNode>> {
        if generation != self.flush_generation {
            return None;
        }
        Some(std::mem::take(&mut self.pending_bookmarks))
    }

    pub fn mark_provisional(
        &mut self,
        key: &str,
        opener_id: TabId,
        is_new_tab: bool,
        opened_with_others: bool,
    ) -> u64 {
        self.next_version += 1;
        let version = self.next_version;
        self.provisional.insert(
            key.to_string(),
            ProvisionalOpener {
                opener_id,
                version,
                is_new_tab,
                opened_with_others,
            },
        );
        version
    }

    pub fn provisional(&self, key: &str) -> Option<&ProvisionalOpener> {
        self.provisional.get(key)
    }

    pub fn take_provisional(&mut self, key: &str) -> Option<ProvisionalOpener> {
        self.provisional.remove(key)
    }

    /// No marker newer than `version` was recorded for `key` since it was taken
    pub fn is_latest_provisional(&self, key: &str, version: u64) -> bool {
        self.provisional
            .get(key)
            .is_none_or(|marker| marker.version <= version)
    }

    pub fn begin_window_move(&mut self, tabs: impl IntoIterator<Item = TabId>) {
        self.moving_across_windows.extend(tabs);
    }

    pub fn end_window_move(&mut self, tabs: &[TabId]) {
        for tab in tabs {
            self.moving_across_windows.remove(tab);
        }
    }

    pub fn is_moving_across_windows(&self, tab: TabId) -> bool {
        self.moving_across_windows.contains(&tab)
    }

    pub fn last_bookmark_folder(&self) -> Option<&BookmarkId> {
        self.last_bookmark_folder.as_ref()
    }

    pub fn set_last_bookmark_folder(&mut self, folder: BookmarkId) {
        self.last_bookmark_folder = Some(folder);
    }
}
