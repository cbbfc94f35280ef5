//! Toast notifications delivered to JavaScript

use pdfedit_core::{Notifier, Severity};
use std::cell::RefCell;
use wasm_bindgen::prelude::*;

/// Forwards messages to a JS callback `(message, severity) => void`.
/// Without a callback, messages go to the browser console.
#[derive(Default)]
pub struct JsNotifier {
    callback: RefCell<Option<js_sys::Function>>,
}

impl JsNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_callback(&self, callback: js_sys::Function) {
        *self.callback.borrow_mut() = Some(callback);
    }

    pub fn clear_callback(&self) {
        self.callback.borrow_mut().take();
    }

    pub fn has_callback(&self) -> bool {
        self.callback.borrow().is_some()
    }
}

impl Notifier for JsNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        if let Some(callback) = self.callback.borrow().as_ref() {
            let this = JsValue::null();
            let _ = callback.call2(
                &this,
                &JsValue::from_str(message),
                &JsValue::from_str(severity.as_str()),
            );
            return;
        }
        console_fallback(message, severity);
    }
}

#[cfg(target_arch = "wasm32")]
fn console_fallback(message: &str, severity: Severity) {
    let text = JsValue::from_str(message);
    match severity {
        Severity::Error => web_sys::console::error_1(&text),
        Severity::Success | Severity::Info => web_sys::console::log_1(&text),
    }
}

// Native builds (tests) have no console to write to
#[cfg(not(target_arch = "wasm32"))]
fn console_fallback(message: &str, severity: Severity) {
    pdfedit_core::TracingNotifier.notify(message, severity);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_notifier_has_no_callback() {
        let notifier = JsNotifier::new();
        assert!(!notifier.has_callback());
        // falls back without panicking
        notifier.notify("Page added", Severity::Success);
        notifier.notify("No document loaded", Severity::Error);
    }
}

#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_callback_receives_message_and_severity() {
        let notifier = JsNotifier::new();
        let seen = js_sys::Array::new();
        let sink = seen.clone();
        let closure = Closure::<dyn Fn(JsValue, JsValue)>::new(move |message, severity| {
            sink.push(&message);
            sink.push(&severity);
        });
        notifier.set_callback(closure.as_ref().unchecked_ref::<js_sys::Function>().clone());

        notifier.notify("Page deleted", Severity::Success);

        assert_eq!(seen.length(), 2);
        assert_eq!(seen.get(0).as_string().as_deref(), Some("Page deleted"));
        assert_eq!(seen.get(1).as_string().as_deref(), Some("success"));

        notifier.clear_callback();
        assert!(!notifier.has_callback());
    }
}
