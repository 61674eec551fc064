/// Attachment decisions for newly created tabs
///
/// `decide` is a pure function of the tab, its creation metadata and the
/// registry mirror. `apply` carries out the decision against the host.
use log::{debug, warn};

use crate::config::{AttachBehavior, PinnedTabInsertion};
use crate::engine::TreeEngine;
use crate::error::{EngineError, HostError};
use crate::host::{Host, OpenTabRequest};
use crate::operations::attach_with_behavior;
use crate::tab_data::{Tab, TabCreationInfo, TabId};

/// Why a tab is being attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachSource {
    Opener,
    NewTabCommand,
    Duplicated,
    SameSite,
}

/// What to do with a tab that was just created
#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentIntent {
    /// Opener unknown for now; remember a guess and look again after navigation.
    Defer {
        provisional_opener: TabId,
        is_new_tab: bool,
        opened_with_others: bool,
    },
    AttachAsChild {
        parent: TabId,
        behavior: AttachBehavior,
        dont_move: bool,
        source: AttachSource,
    },
    RepositionAfter { anchor: TabId },
    TreatAsRoot,
}

impl<H: Host> TreeEngine<H> {
    pub fn decide(&self, tab: &Tab, info: &TabCreationInfo) -> AttachmentIntent {
        if info.duplicated_internally {
            return AttachmentIntent::TreatAsRoot;
        }

        if info.duplicated {
            if let Some(original) = info.original_tab_id.and_then(|id| self.host.tab(id)) {
                return AttachmentIntent::AttachAsChild {
                    parent: original.id,
                    behavior: self.config.auto_attach_on_duplicated,
                    dont_move: info.positioned_by_self,
                    source: AttachSource::Duplicated,
                };
            }
        }

        let opener = tab
            .opener_id
            .filter(|id| *id != tab.id)
            .and_then(|id| self.host.tab(id));

        match opener {
            Some(opener) => self.decide_with_opener(tab, &opener, info.positioned_by_self),
            None => self.decide_without_opener(tab, info),
        }
    }

    fn decide_without_opener(&self, tab: &Tab, info: &TabCreationInfo) -> AttachmentIntent {
        if info.maybe_orphan || info.restored {
            return AttachmentIntent::TreatAsRoot;
        }
        let Some(active) = info
            .active_tab_id
            .filter(|id| *id != tab.id)
            .and_then(|id| self.host.tab(id))
        else {
            return AttachmentIntent::TreatAsRoot;
        };

        let has_next_tab = self
            .host
            .tabs_in_window(tab.window_id)
            .iter()
            .any(|t| t.index == tab.index + 1);

        if tab.is_new_tab_placeholder && !has_next_tab {
            if info.positioned_by_self {
                return AttachmentIntent::TreatAsRoot;
            }
            return AttachmentIntent::AttachAsChild {
                parent: active.id,
                behavior: self.config.auto_attach_on_new_tab_command,
                dont_move: false,
                source: AttachSource::NewTabCommand,
            };
        }

        AttachmentIntent::Defer {
            provisional_opener: active.id,
            is_new_tab: !info.from_external,
            opened_with_others: info.opened_with_others,
        }
    }

    pub(crate) fn decide_with_opener(
        &self,
        tab: &Tab,
        opener: &Tab,
        positioned_by_self: bool,
    ) -> AttachmentIntent {
        if opener.pinned && opener.window_id == tab.window_id {
            if self.config.auto_group_new_tabs_from_pinned {
                return AttachmentIntent::TreatAsRoot;
            }
            return match self.config.insert_new_tab_from_pinned_tab_at {
                PinnedTabInsertion::NoControl => AttachmentIntent::TreatAsRoot,
                PinnedTabInsertion::End => self
                    .host
                    .tabs_in_window(tab.window_id)
                    .last()
                    .filter(|last| last.id != tab.id)
                    .map(|last| AttachmentIntent::RepositionAfter { anchor: last.id })
                    .unwrap_or(AttachmentIntent::TreatAsRoot),
            };
        }

        if self.config.auto_attach {
            return AttachmentIntent::AttachAsChild {
                parent: opener.id,
                behavior: self.config.auto_attach_on_opened_with_owner,
                dont_move: positioned_by_self,
                source: AttachSource::Opener,
            };
        }

        AttachmentIntent::TreatAsRoot
    }

    /// Carry out `intent`; returns whether the tab is already positioned
    pub async fn apply(&self, tab: &Tab, intent: AttachmentIntent) -> Result<bool, EngineError> {
        match intent {
            AttachmentIntent::TreatAsRoot => Ok(false),
            AttachmentIntent::Defer {
                provisional_opener,
                is_new_tab,
                opened_with_others,
            } => {
                self.state_mut().mark_provisional(
                    &tab.unique_key,
                    provisional_opener,
                    is_new_tab,
                    opened_with_others,
                );
                Ok(false)
            }
            AttachmentIntent::RepositionAfter { anchor } => {
                self.host
                    .move_tab_after(tab.id, anchor, self.config.animation_ms)
                    .await?;
                Ok(true)
            }
            AttachmentIntent::AttachAsChild {
                parent,
                behavior,
                dont_move,
                source,
            } => {
                self.attach_tab(tab.id, parent, behavior, dont_move, source, None)
                    .await
            }
        }
    }

    /// Attach, reopening the tab in its parent's container first when configured
    ///
    /// `provisional_version` is the version of the marker this attachment
    /// resolves. If a newer marker for the tab shows up while the replacement
    /// is being opened, the attachment is abandoned.
    pub(crate) async fn attach_tab(
        &self,
        tab_id: TabId,
        parent: TabId,
        behavior: AttachBehavior,
        dont_move: bool,
        source: AttachSource,
        provisional_version: Option<u64>,
    ) -> Result<bool, EngineError> {
        let inherit = match source {
            AttachSource::NewTabCommand => self.config.inherit_contextual_identity_to_new_tab,
            AttachSource::SameSite => self.config.inherit_contextual_identity_to_same_site_orphan,
            AttachSource::Opener | AttachSource::Duplicated => false,
        };

        let tab_id = if inherit && behavior != AttachBehavior::DoNothing {
            match self
                .reopen_in_parent_container(tab_id, parent, provisional_version)
                .await?
            {
                Some(tab_id) => tab_id,
                None => return Ok(false),
            }
        } else {
            tab_id
        };

        attach_with_behavior(
            &self.host,
            tab_id,
            parent,
            behavior,
            dont_move,
            self.config.animation_ms,
        )
        .await
    }

    /// Replace `tab_id` with a tab in `parent`'s container
    ///
    /// Returns the tab to attach: the replacement, or the original when it
    /// could not be closed. `None` means the attachment went stale.
    async fn reopen_in_parent_container(
        &self,
        tab_id: TabId,
        parent: TabId,
        provisional_version: Option<u64>,
    ) -> Result<Option<TabId>, EngineError> {
        let (Some(tab), Some(parent_tab)) = (self.host.tab(tab_id), self.host.tab(parent)) else {
            return Err(EngineError::StaleReference(format!("tab {}", tab_id.0)));
        };
        if tab.container_id == parent_tab.container_id {
            return Ok(Some(tab_id));
        }

        debug!(
            "reopening tab {} in container {:?}",
            tab.id.0, parent_tab.container_id
        );
        let replacement = self
            .host
            .open_tab(OpenTabRequest {
                url: tab.url.clone(),
                window_id: tab.window_id,
                index: Some(tab.index),
                container_id: parent_tab.container_id.clone(),
                opener_id: Some(parent_tab.id),
            })
            .await?;

        if provisional_version
            .is_some_and(|version| !self.state().is_latest_provisional(&tab.unique_key, version))
        {
            debug!("provisional opener of tab {} was superseded", tab.id.0);
            self.discard_replacement(replacement).await;
            return Ok(None);
        }

        match self.host.remove_tab(tab.id).await {
            Ok(()) => Ok(Some(replacement)),
            // Closed by the user meanwhile; the replacement stands in for it
            Err(HostError::NotFound(_)) => Ok(Some(replacement)),
            Err(err) => {
                warn!("could not close tab {} after reopening it: {}", tab.id.0, err);
                self.discard_replacement(replacement).await;
                Ok(Some(tab.id))
            }
        }
    }

    async fn discard_replacement(&self, replacement: TabId) {
        if let Err(err) = self.host.remove_tab(replacement).await {
            warn!("could not close replacement tab {}: {}", replacement.0, err);
        }
    }

    /// Tab-creation listener. `true` means default placement must be skipped.
    pub async fn on_tab_creating(&self, tab_id: TabId, info: &TabCreationInfo) -> bool {
        let Some(tab) = self.host.tab(tab_id) else {
            debug!("created tab {} vanished before it was handled", tab_id.0);
            return false;
        };

        let intent = self.decide(&tab, info);
        debug!("tab {} creation intent: {:?}", tab.id.0, intent);

        match self.apply(&tab, intent).await {
            Ok(positioned) => positioned,
            Err(err) => {
                err.log(&format!("attaching new tab {}", tab.id.0));
                false
            }
        }
    }

    /// Tab-creation finalization. Opener metadata may only be known now.
    pub async fn on_tab_created(&self, tab_id: TabId) {
        let Some(tab) = self.host.tab(tab_id) else {
            return;
        };
        if tab.parent_id.is_some() {
            return;
        }
        let Some(opener) = tab
            .opener_id
            .filter(|id| *id != tab.id)
            .and_then(|id| self.host.tab(id))
        else {
            return;
        };
        if self.state_mut().take_provisional(&tab.unique_key).is_none() {
            return;
        }

        let intent = self.decide_with_opener(&tab, &opener, false);
        debug!("tab {} got a late opener {}: {:?}", tab.id.0, opener.id.0, intent);
        if let Err(err) = self.apply(&tab, intent).await {
            err.log(&format!("attaching tab {} to late opener", tab.id.0));
        }
    }
}
