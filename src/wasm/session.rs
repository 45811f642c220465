//! WalletSession: the controller exposed to JavaScript
//!
//! ```javascript
//! import { WalletSession } from 'assetwatch';
//!
//! const session = new WalletSession();          // origin defaults to the page
//! session.onStatus(snap => render(snap));       // { state, session, status }
//! if (session.available) {
//!     session.connect();
//!     session.addToken();
//! }
//! ```

use super::provider::InjectedBridge;
use super::timer::BrowserTimer;
use super::{log, to_js};
use crate::controller::{ConnectionController, ControllerError, ControllerHandle, SessionConfig};
use futures::StreamExt;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

fn js_error(e: ControllerError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn page_origin() -> Option<String> {
    web_sys::window()?.location().origin().ok()
}

#[wasm_bindgen]
pub struct WalletSession {
    handle: ControllerHandle,
}

#[wasm_bindgen]
impl WalletSession {
    /// Detect the wallet and start the controller. `origin` resolves the
    /// token image; it defaults to the page origin.
    #[wasm_bindgen(constructor)]
    pub fn new(origin: Option<String>) -> Result<WalletSession, JsValue> {
        let mut config = SessionConfig::new();
        if let Some(origin) = origin.or_else(page_origin) {
            config = config.with_origin(origin);
        }

        let (controller, handle) =
            ConnectionController::new(&InjectedBridge, config, Rc::new(BrowserTimer)).map_err(js_error)?;
        log!("[WalletSession] wallet {}", if handle.available() { "detected" } else { "not detected" });
        spawn_local(controller.run());
        Ok(Self { handle })
    }

    #[wasm_bindgen(getter)]
    pub fn available(&self) -> bool {
        self.handle.available()
    }

    pub fn connect(&self) -> Result<(), JsValue> {
        self.handle.connect().map_err(js_error)
    }

    pub fn disconnect(&self) -> Result<(), JsValue> {
        self.handle.disconnect().map_err(js_error)
    }

    #[wasm_bindgen(js_name = "addToken")]
    pub fn add_token(&self) -> Result<(), JsValue> {
        self.handle.add_token().map_err(js_error)
    }

    #[wasm_bindgen(js_name = "switchNetwork")]
    pub fn switch_network(&self) -> Result<(), JsValue> {
        self.handle.switch_network().map_err(js_error)
    }

    /// Latest `{ state, session, status }`
    pub fn snapshot(&self) -> JsValue {
        to_js(&self.handle.snapshot())
    }

    /// Call `callback(snapshot)` after every transition.
    #[wasm_bindgen(js_name = "onStatus")]
    pub fn on_status(&self, callback: js_sys::Function) {
        let mut updates = self.handle.subscribe();
        spawn_local(async move {
            while let Some(snapshot) = updates.next().await {
                if let Err(e) = callback.call1(&JsValue::NULL, &to_js(&snapshot)) {
                    log!("[WalletSession] status callback threw: {:?}", e);
                }
            }
        });
    }

    /// Stop the controller. The session object is inert afterwards.
    pub fn close(&self) {
        self.handle.shutdown();
    }
}
