/// Tree operations over the tab registry: reading structure and attaching tabs

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::config::AttachBehavior;
use crate::error::EngineError;
use crate::host::TabRegistry;
use crate::tab_data::{Tab, TabId, WindowId};

/// Ancestors of `tab`, nearest first. Stops at a cycle or a missing parent.
pub fn ancestors<R: TabRegistry + ?Sized>(registry: &R, tab: &Tab) -> Vec<Tab> {
    let mut seen = HashSet::from([tab.id]);
    let mut result = Vec::new();
    let mut next = tab.parent_id;

    while let Some(id) = next {
        if !seen.insert(id) {
            break;
        }
        match registry.tab(id) {
            Some(parent) => {
                next = parent.parent_id;
                result.push(parent);
            }
            None => break,
        }
    }

    result
}

pub fn depth<R: TabRegistry + ?Sized>(registry: &R, tab: &Tab) -> usize {
    ancestors(registry, tab).len()
}

/// Descendants of `root` living in `window`, in tab-strip order
pub fn descendants_in_window<R: TabRegistry + ?Sized>(
    registry: &R,
    root: TabId,
    window: WindowId,
) -> Vec<Tab> {
    let tabs = registry.tabs_in_window(window);
    let parents: HashMap<TabId, Option<TabId>> =
        tabs.iter().map(|tab| (tab.id, tab.parent_id)).collect();

    let descends_from_root = |tab: &Tab| {
        let mut seen = HashSet::from([tab.id]);
        let mut next = tab.parent_id;
        while let Some(id) = next {
            if id == root {
                return true;
            }
            if !seen.insert(id) {
                return false;
            }
            next = parents.get(&id).copied().flatten();
        }
        false
    };

    tabs.iter()
        .filter(|tab| tab.id != root && descends_from_root(*tab))
        .cloned()
        .collect()
}

pub fn descendants<R: TabRegistry + ?Sized>(registry: &R, tab: &Tab) -> Vec<Tab> {
    descendants_in_window(registry, tab.id, tab.window_id)
}

/// Last tab of `tab`'s subtree in tab order, ignoring `exclude`
fn last_descendant_except<R: TabRegistry + ?Sized>(
    registry: &R,
    tab: &Tab,
    exclude: TabId,
) -> Option<Tab> {
    descendants(registry, tab)
        .into_iter()
        .filter(|d| d.id != exclude)
        .last()
}

pub fn last_descendant<R: TabRegistry + ?Sized>(registry: &R, tab: &Tab) -> Option<Tab> {
    last_descendant_except(registry, tab, tab.id)
}

fn lookup<R: TabRegistry + ?Sized>(registry: &R, id: TabId) -> Result<Tab, EngineError> {
    registry
        .tab(id)
        .ok_or_else(|| EngineError::StaleReference(format!("tab {}", id.0)))
}

/// Attach `tab_id` relative to `base_id` according to `behavior`
///
/// Sets the logical parent first, then (unless `dont_move`) repositions the
/// tab next to it. Returns whether the tab was moved, which tells the caller
/// that default placement must not run.
pub async fn attach_with_behavior<R: TabRegistry + ?Sized>(
    registry: &R,
    tab_id: TabId,
    base_id: TabId,
    behavior: AttachBehavior,
    dont_move: bool,
    animation_ms: u32,
) -> Result<bool, EngineError> {
    let tab = lookup(registry, tab_id)?;
    let base = lookup(registry, base_id)?;

    if tab.id == base.id || ancestors(registry, &base).iter().any(|a| a.id == tab.id) {
        debug!("refusing to attach tab {} under its own subtree", tab.id.0);
        return Ok(false);
    }

    let (parent, anchor) = match behavior {
        AttachBehavior::DoNothing => return Ok(false),
        AttachBehavior::Orphan => {
            if tab.parent_id.is_some() {
                registry.set_parent(tab.id, None);
            }
            if dont_move {
                return Ok(false);
            }
            registry.move_tab_to_end(tab.id, animation_ms).await?;
            return Ok(true);
        }
        AttachBehavior::FirstChild => (Some(base.id), base.id),
        AttachBehavior::Child => {
            let anchor = last_descendant_except(registry, &base, tab.id).unwrap_or(base.clone());
            (Some(base.id), anchor.id)
        }
        AttachBehavior::Sibling => match base.parent_id.and_then(|id| registry.tab(id)) {
            Some(parent) => {
                let anchor = last_descendant_except(registry, &parent, tab.id).unwrap_or(parent.clone());
                (Some(parent.id), anchor.id)
            }
            None => {
                let anchor = last_descendant_except(registry, &base, tab.id).unwrap_or(base.clone());
                (None, anchor.id)
            }
        },
        AttachBehavior::NextSibling => {
            let anchor = last_descendant_except(registry, &base, tab.id).unwrap_or(base.clone());
            (base.parent_id, anchor.id)
        }
    };

    registry.set_parent(tab.id, parent);

    if dont_move || anchor == tab.id {
        return Ok(false);
    }

    registry.move_tab_after(tab.id, anchor, animation_ms).await?;

    // The tab may have been closed while the move was in flight
    lookup(registry, tab.id)?;
    Ok(true)
}
