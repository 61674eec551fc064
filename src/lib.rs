#![allow(async_fn_in_trait)]

/// Tab Tree - tree inference for a flat browser tab strip
/// Built with Rust + WASM

pub mod attach;
pub mod bookmarks;
pub mod config;
pub mod digest;
pub mod domain;
pub mod engine;
pub mod error;
pub mod host;
pub mod operations;
pub mod reattach;
pub mod resolver;
pub mod state;
pub mod tab_data;

#[cfg(target_arch = "wasm32")]
pub mod bridge;

#[cfg(test)]
mod testing;

pub use attach::{AttachSource, AttachmentIntent};
pub use config::Config;
pub use engine::TreeEngine;
pub use error::{EngineError, HostError};

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Same digest the engine uses, so the drag handler can record it
#[wasm_bindgen(js_name = urlsDigest)]
pub fn urls_digest(urls: Vec<String>) -> String {
    digest::urls_digest(&urls)
}
