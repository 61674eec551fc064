/// Browser side of the engine: JS-backed collaborators and exported entry points

use std::rc::Rc;

use js_sys::Promise;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{JsFuture, future_to_promise};

use crate::bookmarks::BookmarkTabsOptions;
use crate::config::Config;
use crate::engine::TreeEngine;
use crate::error::HostError;
use crate::host::{
    BookmarkStore, Capability, DragRecordStore, FolderChoice, FolderPicker, FolderPickerRequest,
    Notifier, OpenTabRequest, PermissionStore, TabRegistry, Timer,
};
use crate::tab_data::{
    AttachedInfo, BookmarkId, BookmarkNode, CreateBookmark, LastDraggedTabs, Tab, TabChange,
    TabCreationInfo, TabId, WindowId,
};

// Import JS bridge functions
#[wasm_bindgen(module = "/background.js")]
extern "C" {
    fn getTab(tab_id: i32) -> JsValue;

    fn getTabsInWindow(window_id: i32) -> JsValue;

    fn setParent(tab_id: i32, parent_id: Option<i32>);

    #[wasm_bindgen(catch)]
    async fn moveTabAfter(tab_id: i32, anchor_id: i32, animation_ms: u32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn moveTabToEnd(tab_id: i32, animation_ms: u32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn moveTabToWindow(tab_id: i32, window_id: i32, index: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn openTab(request: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeTab(tab_id: i32) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn getBookmark(id: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getBookmarkChildren(id: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn createBookmark(request: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn moveBookmark(id: &str, parent_id: &str, index: Option<u32>) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn updateBookmarkTitle(id: &str, title: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeBookmark(id: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn isPermissionGranted(name: &str) -> Result<JsValue, JsValue>;

    fn takeLastDraggedTabs() -> JsValue;

    fn notifyPermissionRequired(name: &str);

    #[wasm_bindgen(catch)]
    async fn showFolderPicker(request: JsValue) -> Result<JsValue, JsValue>;

    fn installListeners(engine: TreeEngineHandle);
}

fn rejected(err: JsValue) -> HostError {
    HostError::Rejected(format!("{:?}", err))
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, HostError> {
    serde_wasm_bindgen::to_value(value).map_err(|e| HostError::Rejected(e.to_string()))
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, HostError> {
    serde_wasm_bindgen::from_value(value).map_err(|e| HostError::Rejected(e.to_string()))
}

/// Collaborators implemented by `background.js`
pub struct JsHost;

impl TabRegistry for JsHost {
    fn tab(&self, id: TabId) -> Option<Tab> {
        from_js::<Option<Tab>>(getTab(id.0)).ok().flatten()
    }

    fn tabs_in_window(&self, window: WindowId) -> Vec<Tab> {
        from_js(getTabsInWindow(window.0)).unwrap_or_default()
    }

    fn set_parent(&self, tab: TabId, parent: Option<TabId>) {
        setParent(tab.0, parent.map(|p| p.0));
    }

    async fn move_tab_after(&self, tab: TabId, anchor: TabId, animation_ms: u32) -> Result<(), HostError> {
        moveTabAfter(tab.0, anchor.0, animation_ms).await.map_err(rejected)
    }

    async fn move_tab_to_end(&self, tab: TabId, animation_ms: u32) -> Result<(), HostError> {
        moveTabToEnd(tab.0, animation_ms).await.map_err(rejected)
    }

    async fn move_tab_to_window(&self, tab: TabId, window: WindowId, index: i32) -> Result<(), HostError> {
        moveTabToWindow(tab.0, window.0, index).await.map_err(rejected)
    }

    async fn open_tab(&self, request: OpenTabRequest) -> Result<TabId, HostError> {
        let opened = openTab(to_js(&request)?).await.map_err(rejected)?;
        from_js(opened)
    }

    async fn remove_tab(&self, tab: TabId) -> Result<(), HostError> {
        removeTab(tab.0).await.map_err(rejected)
    }
}

impl BookmarkStore for JsHost {
    async fn get_bookmark(&self, id: &BookmarkId) -> Result<Option<BookmarkNode>, HostError> {
        from_js(getBookmark(&id.0).await.map_err(rejected)?)
    }

    async fn get_children(&self, id: &BookmarkId) -> Result<Vec<BookmarkNode>, HostError> {
        from_js(getBookmarkChildren(&id.0).await.map_err(rejected)?)
    }

    async fn create_bookmark(&self, request: CreateBookmark) -> Result<BookmarkNode, HostError> {
        from_js(createBookmark(to_js(&request)?).await.map_err(rejected)?)
    }

    async fn move_bookmark(&self, id: &BookmarkId, parent: &BookmarkId, index: Option<u32>) -> Result<(), HostError> {
        moveBookmark(&id.0, &parent.0, index).await.map_err(rejected)
    }

    async fn update_title(&self, id: &BookmarkId, title: &str) -> Result<(), HostError> {
        updateBookmarkTitle(&id.0, title).await.map_err(rejected)
    }

    async fn remove_bookmark(&self, id: &BookmarkId) -> Result<(), HostError> {
        removeBookmark(&id.0).await.map_err(rejected)
    }
}

impl PermissionStore for JsHost {
    async fn is_granted(&self, capability: Capability) -> bool {
        isPermissionGranted(capability.name())
            .await
            .map(|granted| granted.as_bool().unwrap_or(false))
            .unwrap_or(false)
    }
}

impl DragRecordStore for JsHost {
    fn take_last_dragged_tabs(&self) -> Option<LastDraggedTabs> {
        from_js::<Option<LastDraggedTabs>>(takeLastDraggedTabs()).ok().flatten()
    }
}

impl Notifier for JsHost {
    fn notify_permission_required(&self, capability: Capability) {
        notifyPermissionRequired(capability.name());
    }
}

impl Timer for JsHost {
    async fn sleep(&self, ms: u32) {
        let promise = Promise::new(&mut |resolve, reject| {
            if let Err(err) = set_timeout(&resolve, ms) {
                let _ = reject.call1(&JsValue::NULL, &err);
            }
        });
        if let Err(err) = JsFuture::from(promise).await {
            log::error!("timer of {}ms could not be scheduled: {:?}", ms, err);
        }
    }
}

/// `setTimeout` on the global scope, which is a window or a (service) worker
fn set_timeout(handler: &js_sys::Function, ms: u32) -> Result<i32, JsValue> {
    let global = js_sys::global();
    let timeout = i32::try_from(ms).unwrap_or(i32::MAX);
    if let Some(window) = global.dyn_ref::<web_sys::Window>() {
        window.set_timeout_with_callback_and_timeout_and_arguments_0(handler, timeout)
    } else if let Some(worker) = global.dyn_ref::<web_sys::WorkerGlobalScope>() {
        worker.set_timeout_with_callback_and_timeout_and_arguments_0(handler, timeout)
    } else {
        Err(JsValue::from_str("no timer on the global scope"))
    }
}

impl FolderPicker for JsHost {
    async fn pick_folder(&self, request: FolderPickerRequest) -> Option<FolderChoice> {
        let request = to_js(&request).ok()?;
        let choice = showFolderPicker(request).await.ok()?;
        from_js::<Option<FolderChoice>>(choice).ok().flatten()
    }
}

/// Build the engine and subscribe it to tab and bookmark events
#[wasm_bindgen(js_name = startEngine)]
pub fn start_engine(config: JsValue) -> Result<(), JsValue> {
    let handle = TreeEngineHandle::new(config)?;
    installListeners(handle);
    Ok(())
}

/// Engine handle owned by `background.js`
#[wasm_bindgen]
pub struct TreeEngineHandle {
    engine: Rc<TreeEngine<JsHost>>,
}

#[wasm_bindgen]
impl TreeEngineHandle {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<TreeEngineHandle, JsValue> {
        let config: Config = if config.is_undefined() || config.is_null() {
            Config::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };
        log::info!("tree engine started");
        Ok(TreeEngineHandle {
            engine: Rc::new(TreeEngine::new(JsHost, config)),
        })
    }

    /// Resolves to `true` when default placement must be skipped
    #[wasm_bindgen(js_name = onTabCreating)]
    pub fn on_tab_creating(&self, tab_id: i32, info: JsValue) -> Result<Promise, JsValue> {
        let info: TabCreationInfo = if info.is_undefined() {
            TabCreationInfo::default()
        } else {
            serde_wasm_bindgen::from_value(info)?
        };
        let engine = self.engine.clone();
        Ok(future_to_promise(async move {
            let positioned = engine.on_tab_creating(TabId(tab_id), &info).await;
            Ok(JsValue::from_bool(positioned))
        }))
    }

    #[wasm_bindgen(js_name = onTabCreated)]
    pub fn on_tab_created(&self, tab_id: i32) -> Promise {
        let engine = self.engine.clone();
        future_to_promise(async move {
            engine.on_tab_created(TabId(tab_id)).await;
            Ok(JsValue::UNDEFINED)
        })
    }

    #[wasm_bindgen(js_name = onTabUpdated)]
    pub fn on_tab_updated(&self, tab_id: i32, change: JsValue) -> Result<Promise, JsValue> {
        let change: TabChange = serde_wasm_bindgen::from_value(change)?;
        let engine = self.engine.clone();
        Ok(future_to_promise(async move {
            engine.on_tab_updated(TabId(tab_id), &change).await;
            Ok(JsValue::UNDEFINED)
        }))
    }

    #[wasm_bindgen(js_name = onTabRemoved)]
    pub fn on_tab_removed(&self, unique_key: &str) {
        self.engine.on_tab_removed(unique_key);
    }

    #[wasm_bindgen(js_name = onTabAttached)]
    pub fn on_tab_attached(&self, info: JsValue) -> Result<Promise, JsValue> {
        let info: AttachedInfo = serde_wasm_bindgen::from_value(info)?;
        let engine = self.engine.clone();
        Ok(future_to_promise(async move {
            engine.on_tab_attached(&info).await;
            Ok(JsValue::UNDEFINED)
        }))
    }

    #[wasm_bindgen(js_name = onBookmarkCreated)]
    pub fn on_bookmark_created(&self, bookmark: JsValue) -> Result<Promise, JsValue> {
        let bookmark: BookmarkNode = serde_wasm_bindgen::from_value(bookmark)?;
        let engine = self.engine.clone();
        Ok(future_to_promise(async move {
            engine.on_bookmark_created(bookmark).await;
            Ok(JsValue::UNDEFINED)
        }))
    }

    /// Resolves to the created folder and bookmarks, or `null` if cancelled
    #[wasm_bindgen(js_name = bookmarkTabs)]
    pub fn bookmark_tabs(&self, tab_ids: Vec<i32>, options: JsValue) -> Result<Promise, JsValue> {
        let options: BookmarkTabsOptions = if options.is_undefined() {
            BookmarkTabsOptions::default()
        } else {
            serde_wasm_bindgen::from_value(options)?
        };
        let tab_ids: Vec<TabId> = tab_ids.into_iter().map(TabId).collect();
        let engine = self.engine.clone();
        Ok(future_to_promise(async move {
            match engine.bookmark_tabs(&tab_ids, options).await {
                Ok(Some(created)) => {
                    serde_wasm_bindgen::to_value(&created).map_err(JsValue::from)
                }
                Ok(None) => Ok(JsValue::NULL),
                Err(err) => Err(JsValue::from_str(&err.to_string())),
            }
        }))
    }

    #[wasm_bindgen(js_name = creatingCount)]
    pub fn creating_count(&self) -> usize {
        self.engine.state().creating_count()
    }
}
