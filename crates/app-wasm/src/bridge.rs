//! JavaScript bridge for the avatar UI
//!
//! Messages travel as JSON in the `detail` of CustomEvents dispatched on the
//! window object.

use holoavatar_ipc::{AvatarToUi, UiToAvatar};
use std::cell::RefCell;
use std::collections::VecDeque;
use tracing::warn;
use wasm_bindgen::prelude::*;

/// Event the UI dispatches towards the avatar
pub const UI_TO_AVATAR_EVENT: &str = "holoavatar:ui-to-avatar";
/// Event the avatar dispatches towards the UI
pub const AVATAR_TO_UI_EVENT: &str = "holoavatar:avatar-to-ui";

thread_local! {
    /// Messages received from the UI, oldest first
    static MESSAGE_QUEUE: RefCell<VecDeque<UiToAvatar>> = RefCell::new(VecDeque::new());
}

/// Registered window listener. Dropping it unregisters the listener and
/// discards undelivered messages.
pub struct BridgeListener {
    window: web_sys::Window,
    closure: Closure<dyn FnMut(web_sys::CustomEvent)>,
}

impl Drop for BridgeListener {
    fn drop(&mut self) {
        let removed = self.window.remove_event_listener_with_callback(
            UI_TO_AVATAR_EVENT,
            self.closure.as_ref().unchecked_ref(),
        );
        if let Err(e) = removed {
            warn!("Failed to remove UI listener: {:?}", e);
        }
        MESSAGE_QUEUE.with(|queue| queue.borrow_mut().clear());
    }
}

/// Start queueing UI messages for [`poll_ui_message`]
pub fn listen() -> Result<BridgeListener, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;

    let closure = Closure::wrap(Box::new(move |event: web_sys::CustomEvent| {
        let Some(detail) = event.detail().as_string() else {
            return;
        };
        match UiToAvatar::from_json(&detail) {
            Ok(msg) => enqueue(msg),
            Err(e) => {
                warn!("Failed to parse UI message: {}", e);
                if let Err(e) = send_to_ui(&AvatarToUi::error("invalid-message", e)) {
                    web_sys::console::error_1(&e);
                }
            }
        }
    }) as Box<dyn FnMut(_)>);

    window.add_event_listener_with_callback(UI_TO_AVATAR_EVENT, closure.as_ref().unchecked_ref())?;

    tracing::info!("Holoavatar bridge listening on {}", UI_TO_AVATAR_EVENT);
    Ok(BridgeListener { window, closure })
}

pub(crate) fn enqueue(msg: UiToAvatar) {
    MESSAGE_QUEUE.with(|queue| queue.borrow_mut().push_back(msg));
}

/// Next message from the UI, if any
pub fn poll_ui_message() -> Option<UiToAvatar> {
    MESSAGE_QUEUE.with(|queue| queue.borrow_mut().pop_front())
}

/// Dispatch a message to the UI
pub fn send_to_ui(msg: &AvatarToUi) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;
    let json = msg
        .to_json()
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize avatar message: {}", e)))?;

    let init = web_sys::CustomEventInit::new();
    init.set_detail(&JsValue::from_str(&json));
    let event = web_sys::CustomEvent::new_with_event_init_dict(AVATAR_TO_UI_EVENT, &init)?;
    window.dispatch_event(&event)?;
    Ok(())
}
