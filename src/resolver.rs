/// Deferred attachment of tabs whose opener was unknown at creation
use log::debug;

use crate::attach::AttachSource;
use crate::domain::is_same_site;
use crate::engine::TreeEngine;
use crate::error::EngineError;
use crate::host::Host;
use crate::state::ProvisionalOpener;
use crate::tab_data::{Tab, TabChange, TabId};

impl<H: Host> TreeEngine<H> {
    /// Tab-update listener
    ///
    /// The provisional marker is consumed on the first update that carries a
    /// destination, whatever the outcome, so later updates can never attach
    /// the tab a second time.
    pub async fn on_tab_updated(&self, tab_id: TabId, change: &TabChange) {
        if !change.navigation_completed() {
            return;
        }
        let Some(tab) = self.host.tab(tab_id) else {
            return;
        };
        let Some(marker) = self.state_mut().take_provisional(&tab.unique_key) else {
            return;
        };

        let url = change.url.as_deref().unwrap_or(&tab.url).to_string();
        if let Err(err) = self.resolve_provisional(&tab, &url, marker).await {
            err.log(&format!("resolving opener of tab {}", tab.id.0));
        }
    }

    /// Tab-removal listener; `unique_key` identifies the closed tab
    pub fn on_tab_removed(&self, unique_key: &str) {
        if self.state_mut().take_provisional(unique_key).is_some() {
            debug!("dropped provisional opener of closed tab {}", unique_key);
        }
    }

    async fn resolve_provisional(
        &self,
        tab: &Tab,
        url: &str,
        marker: ProvisionalOpener,
    ) -> Result<(), EngineError> {
        let Some(opener) = self.host.tab(marker.opener_id) else {
            debug!("possible opener of tab {} is gone", tab.id.0);
            return Ok(());
        };
        if tab.parent_id.is_some() {
            return Ok(());
        }

        let (behavior, source) = if marker.is_new_tab && tab.is_new_tab_placeholder {
            (self.config.auto_attach_on_new_tab_command, AttachSource::NewTabCommand)
        } else if marker.opened_with_others && self.config.suppress_same_site_for_batch_opened_tabs {
            debug!("tab {} was opened with others; skipping same-site check", tab.id.0);
            return Ok(());
        } else if is_same_site(&opener.url, url) {
            (self.config.auto_attach_same_site_orphan, AttachSource::SameSite)
        } else {
            return Ok(());
        };

        debug!(
            "attaching tab {} to possible opener {} ({:?})",
            tab.id.0, opener.id.0, source
        );
        self.attach_tab(tab.id, opener.id, behavior, false, source, Some(marker.version))
            .await?;
        Ok(())
    }
}
