/// In-memory host used by the unit tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::HostError;
use crate::host::{
    BookmarkStore, Capability, DragRecordStore, FolderChoice, FolderPicker, FolderPickerRequest,
    Notifier, OpenTabRequest, PermissionStore, TabRegistry, Timer,
};
use crate::tab_data::{
    BookmarkId, BookmarkNode, CreateBookmark, LastDraggedTabs, Tab, TabId, WindowId,
};

pub struct FakeHost {
    /// All tabs in strip order; windows are interleaved
    tabs: RefCell<Vec<Tab>>,
    next_tab_id: Cell<i32>,
    move_failures: RefCell<HashMap<TabId, u32>>,
    closes_on_failure: RefCell<HashMap<TabId, TabId>>,
    moves_rejected_until: Cell<Option<Instant>>,
    remove_failures: RefCell<Vec<TabId>>,
    open_delay_ms: Cell<u64>,
    pub opened: RefCell<Vec<OpenTabRequest>>,
    pub removed: RefCell<Vec<TabId>>,
    pub moves: Cell<usize>,

    nodes: RefCell<HashMap<BookmarkId, BookmarkNode>>,
    children: RefCell<HashMap<BookmarkId, Vec<BookmarkId>>>,
    next_bookmark_id: Cell<u32>,
    failing_urls: RefCell<Vec<String>>,
    pub title_updates: RefCell<Vec<(BookmarkId, String)>>,
    pub removed_bookmarks: RefCell<Vec<BookmarkId>>,

    pub granted: Cell<bool>,
    drag_record: RefCell<Option<LastDraggedTabs>>,
    pub notifications: RefCell<Vec<Capability>>,
    folder_choice: RefCell<Option<Option<FolderChoice>>>,
    pub picker_requests: RefCell<Vec<FolderPickerRequest>>,
}

impl FakeHost {
    pub fn new() -> FakeHost {
        FakeHost {
            tabs: RefCell::new(Vec::new()),
            next_tab_id: Cell::new(1000),
            move_failures: RefCell::new(HashMap::new()),
            closes_on_failure: RefCell::new(HashMap::new()),
            moves_rejected_until: Cell::new(None),
            remove_failures: RefCell::new(Vec::new()),
            open_delay_ms: Cell::new(0),
            opened: RefCell::new(Vec::new()),
            removed: RefCell::new(Vec::new()),
            moves: Cell::new(0),
            nodes: RefCell::new(HashMap::new()),
            children: RefCell::new(HashMap::new()),
            next_bookmark_id: Cell::new(1),
            failing_urls: RefCell::new(Vec::new()),
            title_updates: RefCell::new(Vec::new()),
            removed_bookmarks: RefCell::new(Vec::new()),
            granted: Cell::new(true),
            drag_record: RefCell::new(None),
            notifications: RefCell::new(Vec::new()),
            folder_choice: RefCell::new(None),
            picker_requests: RefCell::new(Vec::new()),
        }
    }

    pub fn with_window(window: i32, ids: &[i32]) -> FakeHost {
        let host = FakeHost::new();
        for &id in ids {
            host.add_tab(window, id);
        }
        host
    }

    pub fn add_tab(&self, window: i32, id: i32) {
        let tab = Tab::new(id, window, 0, &format!("https://site{}.example/", id), &format!("Tab {}", id));
        self.tabs.borrow_mut().push(tab);
        self.reindex();
    }

    pub fn get(&self, id: i32) -> Tab {
        self.tab(TabId(id)).unwrap()
    }

    pub fn edit(&self, id: i32, f: impl FnOnce(&mut Tab)) {
        let mut tabs = self.tabs.borrow_mut();
        let tab = tabs.iter_mut().find(|t| t.id == TabId(id)).unwrap();
        f(tab);
    }

    pub fn set_parent_of(&self, child: i32, parent: i32) {
        self.edit(child, |tab| tab.parent_id = Some(TabId(parent)));
    }

    pub fn order(&self, window: i32) -> Vec<i32> {
        self.tabs_in_window(WindowId(window))
            .iter()
            .map(|t| t.id.0)
            .collect()
    }

    pub fn close(&self, id: i32) {
        self.tabs.borrow_mut().retain(|t| t.id != TabId(id));
        self.reindex();
    }

    /// Make the next `times` moves of `id` fail
    pub fn fail_moves(&self, id: i32, times: u32) {
        self.move_failures.borrow_mut().insert(TabId(id), times);
    }

    /// Close `closing` when a move of `failing` is rejected, as a user would mid-drag
    pub fn close_when_move_fails(&self, failing: i32, closing: i32) {
        self.closes_on_failure
            .borrow_mut()
            .insert(TabId(failing), TabId(closing));
    }

    /// Reject every window move for the next `ms` milliseconds
    pub fn reject_moves_for(&self, ms: u64) {
        self.moves_rejected_until
            .set(Some(Instant::now() + Duration::from_millis(ms)));
    }

    /// Opening a tab takes `ms` milliseconds
    pub fn delay_opens(&self, ms: u64) {
        self.open_delay_ms.set(ms);
    }

    pub fn fail_remove(&self, id: i32) {
        self.remove_failures.borrow_mut().push(TabId(id));
    }

    fn take_failure(&self, id: TabId) -> bool {
        let rejected = self
            .moves_rejected_until
            .get()
            .is_some_and(|until| Instant::now() < until);
        let failing = rejected || {
            let mut failures = self.move_failures.borrow_mut();
            match failures.get_mut(&id) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    true
                }
                _ => false,
            }
        };
        if failing {
            if let Some(closing) = self.closes_on_failure.borrow_mut().remove(&id) {
                self.close(closing.0);
            }
        }
        failing
    }

    fn reindex(&self) {
        let mut counters: HashMap<WindowId, i32> = HashMap::new();
        for tab in self.tabs.borrow_mut().iter_mut() {
            let counter = counters.entry(tab.window_id).or_insert(0);
            tab.index = *counter;
            *counter += 1;
        }
    }

    fn detach(&self, id: TabId) -> Result<Tab, HostError> {
        let mut tabs = self.tabs.borrow_mut();
        let pos = tabs
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| HostError::NotFound(format!("tab {}", id.0)))?;
        Ok(tabs.remove(pos))
    }

    fn insert_after_position(&self, tab: Tab, pos: Option<usize>) {
        let mut tabs = self.tabs.borrow_mut();
        match pos {
            Some(pos) => tabs.insert(pos + 1, tab),
            None => tabs.push(tab),
        }
    }

    fn last_position_in(&self, window: WindowId) -> Option<usize> {
        self.tabs.borrow().iter().rposition(|t| t.window_id == window)
    }

    pub fn add_folder(&self, id: &str, parent: Option<&str>) {
        let node = BookmarkNode {
            id: BookmarkId::new(id),
            parent_id: parent.map(BookmarkId::new),
            title: id.to_string(),
            url: None,
            index: 0,
        };
        self.insert_node(node, None);
    }

    pub fn add_bookmark(&self, id: &str, parent: &str, title: &str, url: &str) -> BookmarkNode {
        let node = BookmarkNode {
            id: BookmarkId::new(id),
            parent_id: Some(BookmarkId::new(parent)),
            title: title.to_string(),
            url: Some(url.to_string()),
            index: 0,
        };
        self.insert_node(node, None);
        self.node(id)
    }

    pub fn node(&self, id: &str) -> BookmarkNode {
        self.lookup_node(&BookmarkId::new(id)).unwrap()
    }

    pub fn child_ids(&self, parent: &str) -> Vec<String> {
        self.children
            .borrow()
            .get(&BookmarkId::new(parent))
            .map(|ids| ids.iter().map(|id| id.0.clone()).collect())
            .unwrap_or_default()
    }

    pub fn fail_bookmark_url(&self, url: &str) {
        self.failing_urls.borrow_mut().push(url.to_string());
    }

    pub fn record_drag(&self, record: LastDraggedTabs) {
        *self.drag_record.borrow_mut() = Some(record);
    }

    pub fn has_drag_record(&self) -> bool {
        self.drag_record.borrow().is_some()
    }

    /// `None` simulates the user cancelling the picker
    pub fn answer_picker(&self, choice: Option<FolderChoice>) {
        *self.folder_choice.borrow_mut() = Some(choice);
    }

    fn insert_node(&self, node: BookmarkNode, index: Option<u32>) {
        if let Some(parent) = &node.parent_id {
            let mut children = self.children.borrow_mut();
            let list = children.entry(parent.clone()).or_default();
            let at = index.map(|i| i as usize).unwrap_or(list.len()).min(list.len());
            list.insert(at, node.id.clone());
        }
        self.nodes.borrow_mut().insert(node.id.clone(), node);
    }

    fn unlink_node(&self, id: &BookmarkId) {
        for list in self.children.borrow_mut().values_mut() {
            list.retain(|child| child != id);
        }
    }

    fn lookup_node(&self, id: &BookmarkId) -> Option<BookmarkNode> {
        let mut node = self.nodes.borrow().get(id).cloned()?;
        if let Some(parent) = &node.parent_id {
            if let Some(pos) = self
                .children
                .borrow()
                .get(parent)
                .and_then(|list| list.iter().position(|child| child == id))
            {
                node.index = pos as u32;
            }
        }
        Some(node)
    }
}

impl TabRegistry for FakeHost {
    fn tab(&self, id: TabId) -> Option<Tab> {
        self.tabs.borrow().iter().find(|t| t.id == id).cloned()
    }

    fn tabs_in_window(&self, window: WindowId) -> Vec<Tab> {
        self.tabs
            .borrow()
            .iter()
            .filter(|t| t.window_id == window)
            .cloned()
            .collect()
    }

    fn set_parent(&self, tab: TabId, parent: Option<TabId>) {
        if let Some(t) = self.tabs.borrow_mut().iter_mut().find(|t| t.id == tab) {
            t.parent_id = parent;
        }
    }

    async fn move_tab_after(&self, tab: TabId, anchor: TabId, _animation_ms: u32) -> Result<(), HostError> {
        if self.take_failure(tab) {
            return Err(HostError::Rejected(format!("move of tab {}", tab.0)));
        }
        let anchor_tab = self
            .tab(anchor)
            .ok_or_else(|| HostError::NotFound(format!("tab {}", anchor.0)))?;
        let mut moving = self.detach(tab)?;
        moving.window_id = anchor_tab.window_id;
        let pos = self.tabs.borrow().iter().position(|t| t.id == anchor);
        self.insert_after_position(moving, pos);
        self.reindex();
        self.moves.set(self.moves.get() + 1);
        Ok(())
    }

    async fn move_tab_to_end(&self, tab: TabId, _animation_ms: u32) -> Result<(), HostError> {
        let moving = self.detach(tab)?;
        let pos = self.last_position_in(moving.window_id);
        self.insert_after_position(moving, pos);
        self.reindex();
        self.moves.set(self.moves.get() + 1);
        Ok(())
    }

    async fn move_tab_to_window(&self, tab: TabId, window: WindowId, index: i32) -> Result<(), HostError> {
        if self.take_failure(tab) {
            return Err(HostError::Rejected(format!("move of tab {}", tab.0)));
        }
        let mut moving = self.detach(tab)?;
        self.reindex();
        moving.window_id = window;
        let before = self
            .tabs
            .borrow()
            .iter()
            .position(|t| t.window_id == window && t.index >= index);
        match before {
            Some(pos) => self.tabs.borrow_mut().insert(pos, moving),
            None => {
                let pos = self.last_position_in(window);
                self.insert_after_position(moving, pos);
            }
        }
        self.reindex();
        self.moves.set(self.moves.get() + 1);
        Ok(())
    }

    async fn open_tab(&self, request: OpenTabRequest) -> Result<TabId, HostError> {
        let delay = self.open_delay_ms.get();
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let id = self.next_tab_id.get();
        self.next_tab_id.set(id + 1);
        let mut tab = Tab::new(id, request.window_id.0, 0, &request.url, "");
        tab.container_id = request.container_id.clone();
        tab.opener_id = request.opener_id;
        let before = request.index.and_then(|index| {
            self.tabs
                .borrow()
                .iter()
                .position(|t| t.window_id == request.window_id && t.index >= index)
        });
        match before {
            Some(pos) => self.tabs.borrow_mut().insert(pos, tab),
            None => {
                let pos = self.last_position_in(request.window_id);
                self.insert_after_position(tab, pos);
            }
        }
        self.reindex();
        self.opened.borrow_mut().push(request);
        Ok(TabId(id))
    }

    async fn remove_tab(&self, tab: TabId) -> Result<(), HostError> {
        if self.remove_failures.borrow().contains(&tab) {
            return Err(HostError::Rejected(format!("remove of tab {}", tab.0)));
        }
        self.detach(tab)?;
        self.reindex();
        self.removed.borrow_mut().push(tab);
        Ok(())
    }
}

impl BookmarkStore for FakeHost {
    async fn get_bookmark(&self, id: &BookmarkId) -> Result<Option<BookmarkNode>, HostError> {
        Ok(self.lookup_node(id))
    }

    async fn get_children(&self, id: &BookmarkId) -> Result<Vec<BookmarkNode>, HostError> {
        let ids = self.children.borrow().get(id).cloned().unwrap_or_default();
        Ok(ids.iter().filter_map(|child| self.lookup_node(child)).collect())
    }

    async fn create_bookmark(&self, request: CreateBookmark) -> Result<BookmarkNode, HostError> {
        if let Some(url) = &request.url {
            if self.failing_urls.borrow().contains(url) {
                return Err(HostError::Rejected(format!("create {}", url)));
            }
        }
        let n = self.next_bookmark_id.get();
        self.next_bookmark_id.set(n + 1);
        let node = BookmarkNode {
            id: BookmarkId::new(format!("new-{}", n)),
            parent_id: request.parent_id,
            title: request.title,
            url: request.url,
            index: 0,
        };
        let id = node.id.clone();
        self.insert_node(node, request.index);
        self.lookup_node(&id)
            .ok_or_else(|| HostError::NotFound(id.to_string()))
    }

    async fn move_bookmark(&self, id: &BookmarkId, parent: &BookmarkId, index: Option<u32>) -> Result<(), HostError> {
        let mut node = self
            .lookup_node(id)
            .ok_or_else(|| HostError::NotFound(id.to_string()))?;
        self.unlink_node(id);
        node.parent_id = Some(parent.clone());
        self.insert_node(node, index);
        Ok(())
    }

    async fn update_title(&self, id: &BookmarkId, title: &str) -> Result<(), HostError> {
        let mut nodes = self.nodes.borrow_mut();
        let node = nodes
            .get_mut(id)
            .ok_or_else(|| HostError::NotFound(id.to_string()))?;
        node.title = title.to_string();
        self.title_updates.borrow_mut().push((id.clone(), title.to_string()));
        Ok(())
    }

    async fn remove_bookmark(&self, id: &BookmarkId) -> Result<(), HostError> {
        self.nodes
            .borrow_mut()
            .remove(id)
            .ok_or_else(|| HostError::NotFound(id.to_string()))?;
        self.unlink_node(id);
        self.removed_bookmarks.borrow_mut().push(id.clone());
        Ok(())
    }
}

impl PermissionStore for FakeHost {
    async fn is_granted(&self, _capability: Capability) -> bool {
        self.granted.get()
    }
}

impl DragRecordStore for FakeHost {
    fn take_last_dragged_tabs(&self) -> Option<LastDraggedTabs> {
        self.drag_record.borrow_mut().take()
    }
}

impl Notifier for FakeHost {
    fn notify_permission_required(&self, capability: Capability) {
        self.notifications.borrow_mut().push(capability);
    }
}

impl Timer for FakeHost {
    async fn sleep(&self, ms: u32) {
        tokio::time::sleep(Duration::from_millis(ms as u64)).await;
    }
}

impl FolderPicker for FakeHost {
    async fn pick_folder(&self, request: FolderPickerRequest) -> Option<FolderChoice> {
        self.picker_requests.borrow_mut().push(request.clone());
        match self.folder_choice.borrow().clone() {
            Some(choice) => choice,
            None => Some(FolderChoice {
                title: request.title,
                parent_id: request.parent_id,
                index: request.index,
            }),
        }
    }
}
