//! WASM module: the controller in the browser
//!
//! Architecture:
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        WalletSession (JS API)           │
//! │  connect, disconnect, addToken,         │
//! │  switchNetwork, snapshot, onStatus      │
//! └─────────────────┬───────────────────────┘
//!                   │ ControllerHandle
//! ┌─────────────────▼───────────────────────┐
//! │  ConnectionController (spawn_local)     │
//! └──────────┬─────────────────┬────────────┘
//!            │                 │
//! ┌──────────▼─────────┐ ┌─────▼────────────┐
//! │ InjectedProvider   │ │ BrowserTimer     │
//! │ window.ethereum    │ │ setTimeout       │
//! └────────────────────┘ └──────────────────┘
//! ```

mod provider;
mod session;
mod timer;

pub use provider::{InjectedBridge, InjectedProvider};
pub use session::WalletSession;
pub use timer::BrowserTimer;

use wasm_bindgen::prelude::*;

/// Initialize WASM module (called automatically on load)
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Log to browser console
pub fn console_log(s: &str) {
    web_sys::console::log_1(&JsValue::from_str(s));
}

macro_rules! log {
    ($($t:tt)*) => {
        crate::wasm::console_log(&format!($($t)*))
    }
}

pub(crate) use log;

/// Plain JS objects, not `Map`s, for the JS side.
pub(crate) fn to_js<T: serde::Serialize>(value: &T) -> JsValue {
    let serializer = serde_wasm_bindgen::Serializer::new().serialize_maps_as_objects(true);
    value.serialize(&serializer).unwrap_or(JsValue::NULL)
}
