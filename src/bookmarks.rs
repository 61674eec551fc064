/// Bookmark side of the tree: grouping dropped tab trees and bookmarking tabs
use std::sync::LazyLock;

use log::{debug, info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::digest::urls_digest;
use crate::engine::TreeEngine;
use crate::error::EngineError;
use crate::host::{Capability, FolderPickerRequest, Host};
use crate::operations::depth;
use crate::tab_data::{BookmarkId, BookmarkNode, CreateBookmark, Tab, TabId};

pub const TREE_MARKER: char = '>';

static MARKER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^>+ ").expect("marker pattern is valid"));

/// Titles that encode tree depth
///
/// Each entry is `(title, depth)`. Depth is taken relative to the shallowest
/// entry; every level beyond it adds one `>` and the markers are separated
/// from the title by a space. Shallowest titles lose any marker-like prefix
/// they already had so they cannot be mistaken for nested ones.
pub fn tree_titles(entries: &[(&str, usize)]) -> Vec<String> {
    let min_depth = entries.iter().map(|(_, depth)| *depth).min().unwrap_or(0);
    entries
        .iter()
        .map(|(title, depth)| match depth - min_depth {
            0 => MARKER_PREFIX.replace(title, "").into_owned(),
            level => format!("{} {}", TREE_MARKER.to_string().repeat(level), title),
        })
        .collect()
}

/// Options for [`TreeEngine::bookmark_tabs`]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BookmarkTabsOptions {
    pub title: Option<String>,
    pub parent_id: Option<BookmarkId>,
    pub index: Option<u32>,
    /// Let the user override the folder through the folder picker
    pub show_dialog: bool,
}

/// Result of a bulk bookmark creation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkedTabs {
    pub folder: BookmarkNode,
    pub bookmarks: Vec<BookmarkNode>,
    pub failed: usize,
}

impl<H: Host> TreeEngine<H> {
    fn tree_titles_of(&self, tabs: &[Tab]) -> Vec<String> {
        let entries: Vec<(&str, usize)> = tabs
            .iter()
            .map(|tab| (tab.title.as_str(), depth(&self.host, tab)))
            .collect();
        tree_titles(&entries)
    }

    /// Bookmark-creation listener
    ///
    /// Creations are collected until the store has been quiet for the batch
    /// delay, then handed to the grouper as one batch.
    pub async fn on_bookmark_created(&self, bookmark: BookmarkNode) {
        if self.state().creating_count() > 0 || bookmark.is_folder() {
            return;
        }
        if !self.host.is_granted(Capability::Bookmarks).await {
            return;
        }
        // A bulk create may have started while we waited
        if self.state().creating_count() > 0 {
            return;
        }

        let generation = self.state_mut().push_pending_bookmark(bookmark);
        self.host.sleep(self.config.bookmark_batch_delay_ms).await;

        let Some(batch) = self.state_mut().take_pending_bookmarks(generation) else {
            return;
        };
        if let Err(err) = self.group_created_bookmarks(batch).await {
            err.log("grouping created bookmarks");
        }
    }

    async fn group_created_bookmarks(&self, batch: Vec<BookmarkNode>) -> Result<(), EngineError> {
        // The record is consumed whatever happens next
        let record = self.host.take_last_dragged_tabs();

        let urls: Vec<&str> = batch
            .iter()
            .map(|bookmark| bookmark.url.as_deref().unwrap_or_default())
            .collect();
        let Some(record) = record.filter(|record| record.urls_digest == urls_digest(&urls)) else {
            return Err(EngineError::DigestMismatch);
        };

        if batch.len() < 2 {
            return Ok(());
        }

        let Some(parent_id) = batch[0].parent_id.clone() else {
            return Ok(());
        };
        if batch.iter().any(|bookmark| bookmark.parent_id.as_ref() != Some(&parent_id)) {
            debug!("created bookmarks span several folders; not grouping");
            return Ok(());
        }

        let siblings = self.host.get_children(&parent_id).await?;
        if siblings.len() == batch.len() {
            debug!("bookmarks were dropped into an otherwise empty folder; not grouping");
            return Ok(());
        }

        let first = self
            .host
            .get_bookmark(&batch[0].id)
            .await?
            .filter(|first| first.parent_id.as_ref() == Some(&parent_id))
            .ok_or_else(|| EngineError::StaleReference(format!("bookmark {}", batch[0].id)))?;

        self.state_mut().begin_bulk_create(1);
        let result = self
            .collapse_into_folder(&parent_id, &first, batch, &record.tab_ids)
            .await;
        self.host.sleep(self.config.bulk_create_grace_ms).await;
        self.state_mut().end_bulk_create(1);
        result
    }

    async fn collapse_into_folder(
        &self,
        parent_id: &BookmarkId,
        first: &BookmarkNode,
        mut bookmarks: Vec<BookmarkNode>,
        tab_ids: &[TabId],
    ) -> Result<(), EngineError> {
        let folder = self
            .host
            .create_bookmark(CreateBookmark {
                parent_id: Some(parent_id.clone()),
                title: first.title.clone(),
                url: None,
                index: Some(first.index),
            })
            .await?;
        info!("grouping {} bookmarks into folder {}", bookmarks.len(), folder.id);

        let mut failed = 0;
        for bookmark in &bookmarks {
            if let Err(err) = self.host.move_bookmark(&bookmark.id, &folder.id, None).await {
                warn!("could not move bookmark {}: {}", bookmark.id, err);
                failed += 1;
            }
        }
        if failed > 0 {
            EngineError::PartialBatchFailure {
                failed,
                total: bookmarks.len(),
            }
            .log("moving bookmarks into group folder");
        }

        let mut tabs: Vec<Tab> = tab_ids.iter().filter_map(|id| self.host.tab(*id)).collect();
        if tabs.len() != bookmarks.len() {
            debug!("dragged tabs changed since the drop; keeping bookmark titles");
            return Ok(());
        }

        let mut titles = self.tree_titles_of(&tabs);
        let roots = titles
            .iter()
            .filter(|title| !title.starts_with(TREE_MARKER))
            .count();
        if tabs[0].is_group_tab && roots == 1 {
            self.host.remove_bookmark(&bookmarks[0].id).await?;
            tabs.remove(0);
            bookmarks.remove(0);
            titles.remove(0);
        }

        for ((tab, bookmark), title) in tabs.iter().zip(&bookmarks).zip(&titles) {
            if *title == tab.title {
                continue;
            }
            if let Err(err) = self.host.update_title(&bookmark.id, title).await {
                warn!("could not retitle bookmark {}: {}", bookmark.id, err);
            }
        }
        Ok(())
    }

    /// Bookmark `tab_ids` into a new folder with tree-structured titles
    ///
    /// Returns `Ok(None)` when the user cancelled the folder picker.
    pub async fn bookmark_tabs(
        &self,
        tab_ids: &[TabId],
        options: BookmarkTabsOptions,
    ) -> Result<Option<BookmarkedTabs>, EngineError> {
        if !self.host.is_granted(Capability::Bookmarks).await {
            self.host.notify_permission_required(Capability::Bookmarks);
            return Err(EngineError::PermissionDenied(
                Capability::Bookmarks.name().to_string(),
            ));
        }

        let tabs: Vec<Tab> = tab_ids.iter().filter_map(|id| self.host.tab(*id)).collect();
        let Some(first) = tabs.first() else {
            return Err(EngineError::StaleReference("no tabs to bookmark".to_string()));
        };

        let mut request = FolderPickerRequest {
            title: options
                .title
                .unwrap_or_else(|| self.config.folder_name(&first.title, tabs.len())),
            parent_id: options
                .parent_id
                .or_else(|| self.state().last_bookmark_folder().cloned()),
            index: options.index,
        };
        if options.show_dialog {
            let Some(choice) = self.host.pick_folder(request).await else {
                debug!("bookmarking cancelled from the folder picker");
                return Ok(None);
            };
            request = FolderPickerRequest {
                title: choice.title,
                parent_id: choice.parent_id,
                index: choice.index,
            };
        }

        let titles = self.tree_titles_of(&tabs);
        let count = tabs.len() + 1;
        self.state_mut().begin_bulk_create(count);
        let result = self.create_tab_bookmarks(&request, &tabs, &titles).await;
        self.host.sleep(self.config.bulk_create_grace_ms).await;
        self.state_mut().end_bulk_create(count);

        let created = result?;
        if let Some(parent) = request.parent_id {
            self.state_mut().set_last_bookmark_folder(parent);
        }
        if created.failed > 0 {
            EngineError::PartialBatchFailure {
                failed: created.failed,
                total: tabs.len(),
            }
            .log("bookmarking tabs");
        }
        Ok(Some(created))
    }

    async fn create_tab_bookmarks(
        &self,
        request: &FolderPickerRequest,
        tabs: &[Tab],
        titles: &[String],
    ) -> Result<BookmarkedTabs, EngineError> {
        let folder = self
            .host
            .create_bookmark(CreateBookmark {
                parent_id: request.parent_id.clone(),
                title: request.title.clone(),
                url: None,
                index: request.index,
            })
            .await?;

        let mut bookmarks = Vec::with_capacity(tabs.len());
        let mut failed = 0;
        for (tab, title) in tabs.iter().zip(titles) {
            let created = self
                .host
                .create_bookmark(CreateBookmark {
                    parent_id: Some(folder.id.clone()),
                    title: title.clone(),
                    url: Some(tab.url.clone()),
                    index: None,
                })
                .await;
            match created {
                Ok(bookmark) => bookmarks.push(bookmark),
                Err(err) => {
                    warn!("could not bookmark tab {}: {}", tab.id.0, err);
                    failed += 1;
                }
            }
        }

        Ok(BookmarkedTabs {
            folder,
            bookmarks,
            failed,
        })
    }
}
