/// Contracts for the collaborators the engine drives.
///
/// Lookups on the tab registry are synchronous: the registry keeps an
/// in-memory mirror of the browser's tabs. Everything that reaches the
/// browser is async and may interleave with other event handlers, so callers
/// must re-validate what they looked up after every `.await`.
///
/// None of these futures are `Send`; the engine runs on the single
/// background-page thread.

use serde::{Deserialize, Serialize};

use crate::error::HostError;
use crate::tab_data::{
    BookmarkId, BookmarkNode, CreateBookmark, LastDraggedTabs, Tab, TabId, WindowId,
};

/// Request to open a new tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTabRequest {
    pub url: String,
    pub window_id: WindowId,
    pub index: Option<i32>,
    pub container_id: Option<String>,
    pub opener_id: Option<TabId>,
}

pub trait TabRegistry {
    fn tab(&self, id: TabId) -> Option<Tab>;

    /// Tabs of a window in tab-strip order
    fn tabs_in_window(&self, window: WindowId) -> Vec<Tab>;

    /// Write the logical tree parent. Never touches tab order.
    fn set_parent(&self, tab: TabId, parent: Option<TabId>);

    async fn move_tab_after(&self, tab: TabId, anchor: TabId, animation_ms: u32)
    -> Result<(), HostError>;

    async fn move_tab_to_end(&self, tab: TabId, animation_ms: u32) -> Result<(), HostError>;

    async fn move_tab_to_window(
        &self,
        tab: TabId,
        window: WindowId,
        index: i32,
    ) -> Result<(), HostError>;

    async fn open_tab(&self, request: OpenTabRequest) -> Result<TabId, HostError>;

    async fn remove_tab(&self, tab: TabId) -> Result<(), HostError>;
}

pub trait BookmarkStore {
    async fn get_bookmark(&self, id: &BookmarkId) -> Result<Option<BookmarkNode>, HostError>;

    async fn get_children(&self, id: &BookmarkId) -> Result<Vec<BookmarkNode>, HostError>;

    async fn create_bookmark(&self, request: CreateBookmark) -> Result<BookmarkNode, HostError>;

    async fn move_bookmark(
        &self,
        id: &BookmarkId,
        parent: &BookmarkId,
        index: Option<u32>,
    ) -> Result<(), HostError>;

    async fn update_title(&self, id: &BookmarkId, title: &str) -> Result<(), HostError>;

    async fn remove_bookmark(&self, id: &BookmarkId) -> Result<(), HostError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Bookmarks,
}

impl Capability {
    pub fn name(&self) -> &'static str {
        match self {
            Capability::Bookmarks => "bookmarks",
        }
    }
}

pub trait PermissionStore {
    async fn is_granted(&self, capability: Capability) -> bool;
}

/// Holds the single most recent drag toward the bookmarks UI
pub trait DragRecordStore {
    /// Return and clear the record
    fn take_last_dragged_tabs(&self) -> Option<LastDraggedTabs>;
}

pub trait Notifier {
    /// Tell the user a capability is missing and where to grant it
    fn notify_permission_required(&self, capability: Capability);
}

pub trait Timer {
    async fn sleep(&self, ms: u32);
}

/// Input of the folder-picker dialog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderPickerRequest {
    pub title: String,
    pub parent_id: Option<BookmarkId>,
    pub index: Option<u32>,
}

/// Confirmed output of the folder-picker dialog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderChoice {
    pub title: String,
    pub parent_id: Option<BookmarkId>,
    pub index: Option<u32>,
}

pub trait FolderPicker {
    /// `None` when the user cancelled
    async fn pick_folder(&self, request: FolderPickerRequest) -> Option<FolderChoice>;
}

/// Everything the engine needs from its environment
pub trait Host:
    TabRegistry + BookmarkStore + PermissionStore + DragRecordStore + Notifier + Timer + FolderPicker
{
}

impl<T> Host for T where
    T: TabRegistry
        + BookmarkStore
        + PermissionStore
        + DragRecordStore
        + Notifier
        + Timer
        + FolderPicker
{
}
