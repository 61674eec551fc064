/// Data structures shared between the engine and its host
use serde::{Deserialize, Serialize};

/// Browser tab id. Unique while the tab lives, may be reused afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub i32);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookmarkId(pub String);

impl BookmarkId {
    pub fn new(id: impl Into<String>) -> BookmarkId {
        BookmarkId(id.into())
    }
}

impl std::fmt::Display for BookmarkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tab as mirrored by the tab registry.
///
/// `parent_id` is the logical tree parent and is only ever written by the engine.
/// `unique_key` survives id reuse and keys the engine's side tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    pub id: TabId,
    pub window_id: WindowId,
    pub index: i32,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub opener_id: Option<TabId>,
    #[serde(default)]
    pub parent_id: Option<TabId>,
    pub unique_key: String,
    #[serde(default)]
    pub container_id: Option<String>,
    #[serde(default)]
    pub is_new_tab_placeholder: bool,
    #[serde(default)]
    pub is_group_tab: bool,
}

impl Tab {
    pub fn new(id: i32, window_id: i32, index: i32, url: &str, title: &str) -> Tab {
        Tab {
            id: TabId(id),
            window_id: WindowId(window_id),
            index,
            url: url.to_string(),
            title: title.to_string(),
            pinned: false,
            opener_id: None,
            parent_id: None,
            unique_key: format!("tab-{}", id),
            container_id: None,
            is_new_tab_placeholder: false,
            is_group_tab: false,
        }
    }
}

/// Metadata the host attaches to a tab-creation event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TabCreationInfo {
    /// Tab that was active in the window when this one was created.
    pub active_tab_id: Option<TabId>,
    pub duplicated: bool,
    /// Duplicated by the extension itself (e.g. to reopen in a container).
    pub duplicated_internally: bool,
    pub original_tab_id: Option<TabId>,
    /// The creator already placed the tab where it wants it.
    pub positioned_by_self: bool,
    pub restored: bool,
    pub maybe_orphan: bool,
    pub from_external: bool,
    /// Part of a multi-tab open (e.g. "open all in tabs").
    pub opened_with_others: bool,
}

/// Subset of a tab update the engine reacts to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TabChange {
    pub url: Option<String>,
    pub status: Option<String>,
}

impl TabChange {
    pub fn url(url: &str) -> TabChange {
        TabChange {
            url: Some(url.to_string()),
            status: None,
        }
    }

    /// True once the tab's destination URL is known.
    pub fn navigation_completed(&self) -> bool {
        self.url.is_some() || self.status.as_deref() == Some("complete")
    }
}

/// A tab was attached to a window it did not belong to before
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedInfo {
    pub tab_id: TabId,
    pub new_window_id: WindowId,
    pub old_window_id: WindowId,
}

/// Bookmark or folder in the bookmark store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkNode {
    pub id: BookmarkId,
    #[serde(default)]
    pub parent_id: Option<BookmarkId>,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub index: u32,
}

impl BookmarkNode {
    pub fn is_folder(&self) -> bool {
        self.url.is_none()
    }
}

/// Bookmark-creation request sent to the store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookmark {
    pub parent_id: Option<BookmarkId>,
    pub title: String,
    pub url: Option<String>,
    pub index: Option<u32>,
}

/// What the drag collaborator records when tabs are dragged toward the bookmarks UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastDraggedTabs {
    pub tab_ids: Vec<TabId>,
    pub urls_digest: String,
}
