/// Engine configuration, read-only once the engine is built
use serde::{Deserialize, Serialize};

/// Where an auto-attached tab goes relative to its base tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttachBehavior {
    /// Leave the tab alone.
    DoNothing,
    /// Keep it a root and move it to the end of the window.
    Orphan,
    /// Child placed immediately after the parent.
    FirstChild,
    /// Child placed after the parent's last descendant.
    Child,
    /// Sibling of the base tab, placed after the last descendant of their parent.
    Sibling,
    /// Sibling of the base tab, placed right after the base tab's subtree.
    NextSibling,
}

/// Placement of tabs opened from a pinned tab
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PinnedTabInsertion {
    NoControl,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub auto_attach: bool,
    pub auto_attach_on_opened_with_owner: AttachBehavior,
    pub auto_attach_on_new_tab_command: AttachBehavior,
    pub auto_attach_on_duplicated: AttachBehavior,
    pub auto_attach_same_site_orphan: AttachBehavior,
    pub insert_new_tab_from_pinned_tab_at: PinnedTabInsertion,
    pub auto_group_new_tabs_from_pinned: bool,
    pub inherit_contextual_identity_to_new_tab: bool,
    pub inherit_contextual_identity_to_same_site_orphan: bool,
    pub suppress_same_site_for_batch_opened_tabs: bool,
    pub move_descendants_across_windows: bool,
    pub subtree_move_attempts: u32,
    /// Wait before the n-th retry round is n times this
    pub subtree_move_retry_delay_ms: u32,
    pub bookmark_batch_delay_ms: u32,
    pub bulk_create_grace_ms: u32,
    pub bookmark_tree_folder_name: String,
    pub animation_ms: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            auto_attach: true,
            auto_attach_on_opened_with_owner: AttachBehavior::Child,
            auto_attach_on_new_tab_command: AttachBehavior::Child,
            auto_attach_on_duplicated: AttachBehavior::NextSibling,
            auto_attach_same_site_orphan: AttachBehavior::Child,
            insert_new_tab_from_pinned_tab_at: PinnedTabInsertion::End,
            auto_group_new_tabs_from_pinned: false,
            inherit_contextual_identity_to_new_tab: false,
            inherit_contextual_identity_to_same_site_orphan: false,
            suppress_same_site_for_batch_opened_tabs: true,
            move_descendants_across_windows: true,
            subtree_move_attempts: 3,
            subtree_move_retry_delay_ms: 200,
            bookmark_batch_delay_ms: 250,
            bulk_create_grace_ms: 150,
            bookmark_tree_folder_name: "%TITLE%".to_string(),
            animation_ms: 200,
        }
    }
}

impl Config {
    /// Parse a (possibly partial) JSON config, filling in defaults
    pub fn from_json(json: &str) -> Result<Config, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Expand the bookmark folder name template
    pub fn folder_name(&self, title: &str, count: usize) -> String {
        self.bookmark_tree_folder_name
            .replace("%TITLE%", title)
            .replace("%COUNT%", &count.to_string())
    }
}
