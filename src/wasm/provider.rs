//! InjectedProvider: `window.ethereum` behind the Provider trait

use super::{log, to_js};
use crate::core::methods::events;
use crate::provider::{EventListener, Provider, ProviderBridge, ProviderError, ProviderEvent};
use async_trait::async_trait;
use js_sys::{Function, Object, Promise, Reflect};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

const INJECTION_KEY: &str = "ethereum";

/// Looks for `window.ethereum` once.
pub struct InjectedBridge;

impl ProviderBridge for InjectedBridge {
    type Provider = InjectedProvider;

    fn detect(&self) -> Option<InjectedProvider> {
        let window = web_sys::window()?;
        let ethereum = Reflect::get(&window, &JsValue::from_str(INJECTION_KEY)).ok()?;
        if ethereum.is_undefined() || ethereum.is_null() {
            return None;
        }
        ethereum.dyn_into::<Object>().ok().map(InjectedProvider::new)
    }
}

pub struct InjectedProvider {
    ethereum: Object,
    // Handlers registered with `ethereum.on`; dropping them would invalidate the callbacks
    handlers: RefCell<Vec<Closure<dyn Fn(JsValue)>>>,
}

impl InjectedProvider {
    pub fn new(ethereum: Object) -> Self {
        Self { ethereum, handlers: RefCell::new(Vec::new()) }
    }

    fn method(&self, name: &str) -> Result<Function, ProviderError> {
        Reflect::get(&self.ethereum, &JsValue::from_str(name))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok())
            .ok_or_else(|| ProviderError::Message(format!("provider has no {}()", name)))
    }

    fn listen(&self, on: &Function, event: &str, handler: Closure<dyn Fn(JsValue)>) {
        if let Err(e) = on.call2(&self.ethereum, &JsValue::from_str(event), handler.as_ref()) {
            log!("[InjectedProvider] could not subscribe to {}: {:?}", event, e);
            return;
        }
        self.handlers.borrow_mut().push(handler);
    }
}

#[async_trait(?Send)]
impl Provider for InjectedProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let args = Object::new();
        Reflect::set(&args, &"method".into(), &JsValue::from_str(method)).map_err(decode_error)?;
        if !params.is_null() {
            Reflect::set(&args, &"params".into(), &to_js(&params)).map_err(decode_error)?;
        }

        let pending = self.method("request")?.call1(&self.ethereum, &args).map_err(decode_error)?;
        let promise = pending
            .dyn_into::<Promise>()
            .map_err(|_| ProviderError::decode(method, "request() did not return a promise"))?;
        let result = JsFuture::from(promise).await.map_err(decode_error)?;
        serde_wasm_bindgen::from_value(result).map_err(|e| ProviderError::decode(method, e.to_string()))
    }

    fn subscribe(&self, listener: EventListener) {
        let on = match self.method("on") {
            Ok(on) => on,
            Err(e) => {
                tracing::warn!(error = %e, "provider does not emit events");
                return;
            }
        };
        let listener = Rc::new(listener);

        let chain_listener = listener.clone();
        let on_chain = Closure::<dyn Fn(JsValue)>::new(move |value: JsValue| {
            let chain_id = value.as_string().or_else(|| value.as_f64().map(|n| format!("{}", n as u64)));
            match chain_id {
                Some(chain_id) => chain_listener(ProviderEvent::ChainChanged(chain_id)),
                None => tracing::warn!("chainChanged without a chain id"),
            }
        });
        let on_accounts = Closure::<dyn Fn(JsValue)>::new(move |value: JsValue| {
            let accounts: Vec<String> = serde_wasm_bindgen::from_value(value).unwrap_or_default();
            listener(ProviderEvent::AccountsChanged(accounts));
        });

        self.listen(&on, events::CHAIN_CHANGED, on_chain);
        self.listen(&on, events::ACCOUNTS_CHANGED, on_accounts);
    }
}

/// Thrown values are EIP-1193 error objects (`code`, `message`, `data`) or,
/// from older wallets, plain strings and `Error`s.
fn decode_error(error: JsValue) -> ProviderError {
    let field = |name: &str| {
        Reflect::get(&error, &JsValue::from_str(name))
            .ok()
            .filter(|v| !v.is_undefined() && !v.is_null())
    };
    let message = field("message")
        .and_then(|v| v.as_string())
        .or_else(|| error.as_string())
        .unwrap_or_else(|| format!("{:?}", error));

    match field("code").and_then(|v| v.as_f64()) {
        Some(code) => ProviderError::Rpc {
            code: code as i64,
            message,
            data: field("data").and_then(|v| serde_wasm_bindgen::from_value(v).ok()),
        },
        None => ProviderError::Message(message),
    }
}
