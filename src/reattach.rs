/// Keeps a subtree together when its root is moved to another window
use std::collections::HashSet;

use log::{debug, warn};

use crate::engine::TreeEngine;
use crate::error::EngineError;
use crate::host::Host;
use crate::operations::descendants_in_window;
use crate::tab_data::{AttachedInfo, Tab, TabId, WindowId};

impl<H: Host> TreeEngine<H> {
    /// Listener for a tab attached to a different window
    pub async fn on_tab_attached(&self, info: &AttachedInfo) {
        if info.new_window_id == info.old_window_id || !self.config.move_descendants_across_windows {
            return;
        }
        // Our own descendant moves come back through here
        if self.state().is_moving_across_windows(info.tab_id) {
            return;
        }
        let Some(root) = self.host.tab(info.tab_id) else {
            return;
        };

        let descendants = descendants_in_window(&self.host, root.id, info.old_window_id);
        if descendants.is_empty() {
            self.detach_from_other_window(&root);
            return;
        }

        let ids: Vec<TabId> = descendants.iter().map(|tab| tab.id).collect();
        self.state_mut().begin_window_move(ids.iter().copied());
        let result = self
            .move_subtree(&root, &descendants, info.new_window_id)
            .await;
        self.state_mut().end_window_move(&ids);

        if let Err(err) = result {
            err.log(&format!("moving descendants of tab {}", root.id.0));
        }
    }

    /// A root whose parent stayed behind becomes a root in its new window
    fn detach_from_other_window(&self, root: &Tab) {
        let parent_window = root
            .parent_id
            .and_then(|id| self.host.tab(id))
            .map(|parent| parent.window_id);
        if parent_window.is_some_and(|window| window != root.window_id) {
            self.host.set_parent(root.id, None);
        }
    }

    /// Nearest earlier member already in place, else the root.
    /// Members closed or dragged elsewhere meanwhile are skipped.
    fn move_anchor(
        &self,
        root: &Tab,
        earlier: &[Tab],
        moved: &HashSet<TabId>,
        window: WindowId,
    ) -> Result<Tab, EngineError> {
        let in_window = |id: TabId| self.host.tab(id).filter(|tab| tab.window_id == window);
        if let Some(anchor) = earlier
            .iter()
            .rev()
            .filter(|tab| moved.contains(&tab.id))
            .find_map(|tab| in_window(tab.id))
        {
            return Ok(anchor);
        }
        in_window(root.id).ok_or_else(|| EngineError::StaleReference(format!("tab {}", root.id.0)))
    }

    async fn move_subtree(
        &self,
        root: &Tab,
        descendants: &[Tab],
        window: WindowId,
    ) -> Result<(), EngineError> {
        let attempts = self.config.subtree_move_attempts.max(1);
        let mut moved: HashSet<TabId> = HashSet::new();
        let mut pending: Vec<usize> = (0..descendants.len()).collect();

        for attempt in 1..=attempts {
            if pending.is_empty() {
                break;
            }
            if attempt > 1 {
                let delay = self.config.subtree_move_retry_delay_ms.saturating_mul(attempt - 1);
                self.host.sleep(delay).await;
            }
            let mut failed = Vec::new();

            for position in pending {
                let tab = &descendants[position];
                if self.host.tab(tab.id).is_none() {
                    debug!("descendant {} closed during move", tab.id.0);
                    continue;
                }

                let anchor = self.move_anchor(root, &descendants[..position], &moved, window)?;
                match self
                    .host
                    .move_tab_to_window(tab.id, window, anchor.index + 1)
                    .await
                {
                    Ok(()) => {
                        moved.insert(tab.id);
                    }
                    Err(err) => {
                        warn!(
                            "moving descendant {} (attempt {}/{}) failed: {}",
                            tab.id.0, attempt, attempts, err
                        );
                        failed.push(position);
                    }
                }
            }

            pending = failed;
        }

        for tab in descendants.iter().filter(|tab| moved.contains(&tab.id)) {
            let parent = tab
                .parent_id
                .filter(|parent| *parent == root.id || moved.contains(parent))
                .unwrap_or(root.id);
            self.host.set_parent(tab.id, Some(parent));
        }
        self.detach_from_other_window(root);

        let mut stranded = pending.into_iter().map(|position| &descendants[position]);
        let Some(first) = stranded.next() else {
            return Ok(());
        };
        for tab in std::iter::once(first).chain(stranded) {
            // Left behind: cut it loose rather than point across windows
            self.host.set_parent(tab.id, None);
            if tab.id != first.id {
                EngineError::SubtreeMoveFailure { tab: tab.id, attempts }
                    .log(&format!("moving descendants of tab {}", root.id.0));
            }
        }
        Err(EngineError::SubtreeMoveFailure {
            tab: first.id,
            attempts,
        })
    }
}
