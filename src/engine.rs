/// The tree-inference engine and its event entry points
///
/// Handlers are spread over the modules that implement them:
/// - `attach`: tab creation and creation finalization
/// - `resolver`: tab updates and removal
/// - `reattach`: tabs attached to another window
/// - `bookmarks`: bookmark creation and bulk bookmarking
use std::cell::{Ref, RefCell, RefMut};

use crate::config::Config;
use crate::state::EngineState;

pub struct TreeEngine<H> {
    pub(crate) host: H,
    pub(crate) config: Config,
    state: RefCell<EngineState>,
}

impl<H> TreeEngine<H> {
    pub fn new(host: H, config: Config) -> Self {
        TreeEngine {
            host,
            config,
            state: RefCell::new(EngineState::new()),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read the engine state. Never hold the guard across an `.await`.
    pub fn state(&self) -> Ref<'_, EngineState> {
        self.state.borrow()
    }

    pub(crate) fn state_mut(&self) -> RefMut<'_, EngineState> {
        self.state.borrow_mut()
    }

    pub fn reset(&self) {
        self.state_mut().reset();
    }
}
