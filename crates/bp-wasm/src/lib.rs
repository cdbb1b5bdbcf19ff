//! WASM bridge for the BluePixel plugin: exposes the sync session to the
//! ComfyUI frontend.
//!
//! Compiled via `wasm-pack build --target web`. The JS side owns node hooks
//! and the DOM; it forwards graph events here and applies the returned
//! effects (a JSON array of `{"action": ...}` objects) to its widgets.

use bp_core::endpoints::{client_id, socket_url, workflow_document, workflow_path};
use bp_core::{MessageType, NodeId, NodeMode, SeedState, SeedUpdate, SliderValue, default_label};
use bp_editor::{HostEffect, Session, SessionConfig, SwitcherSnapshot, Transport};
use wasm_bindgen::prelude::*;
use web_sys::WebSocket;

// ─── Transport ───────────────────────────────────────────────────────────

/// The plugin's socket to the relay server, once opened.
#[derive(Default)]
struct SocketTransport(Option<WebSocket>);

impl Transport for SocketTransport {
    fn is_open(&self) -> bool {
        self.0
            .as_ref()
            .is_some_and(|ws| ws.ready_state() == WebSocket::OPEN)
    }

    fn send(&mut self, frame: &str) -> Result<(), String> {
        let Some(ws) = &self.0 else {
            return Err("socket not created".to_string());
        };
        ws.send_with_str(frame).map_err(|e| format!("{e:?}"))
    }
}

// ─── Plugin object ───────────────────────────────────────────────────────

/// The plugin controller. One instance per frontend session.
#[wasm_bindgen]
pub struct BpPlugin {
    session: Session,
    socket: SocketTransport,
    client_id: String,
}

#[wasm_bindgen]
impl BpPlugin {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        init_logging();
        Self {
            session: Session::new(SessionConfig::default()),
            socket: SocketTransport::default(),
            client_id: client_id(js_sys::Math::random),
        }
    }

    pub fn client_id(&self) -> String {
        self.client_id.clone()
    }

    // ─── Channel ─────────────────────────────────────────────────────────

    /// Open the socket. The caller wires `onopen`/`onmessage`/`onclose` of
    /// the returned socket to `on_open`/`on_message`/`on_close`.
    pub fn connect(&mut self, host: &str, port: &str) -> Result<WebSocket, JsValue> {
        let url = socket_url(host, port, &self.session.config().platform, &self.client_id);
        log::debug!("channel: connecting to {url}");
        let ws = WebSocket::new(&url)?;
        self.socket = SocketTransport(Some(ws.clone()));
        Ok(ws)
    }

    pub fn on_open(&mut self) {
        self.session.channel_opened(&mut self.socket);
    }

    /// Inbound frame. Returns effects JSON.
    pub fn on_message(&mut self, text: &str) -> String {
        let effects = self.clock().handle_frame(text);
        effects_json(&effects)
    }

    pub fn on_close(&mut self) {
        self.session.channel_closed(now());
    }

    /// Drive debounce, retry and reconnect timers. Returns effects JSON.
    pub fn tick(&mut self) -> String {
        let effects = self.session.tick(now(), &mut self.socket);
        effects_json(&effects)
    }

    /// Milliseconds until `tick` has work, if any.
    pub fn next_deadline(&self) -> Option<f64> {
        self.session
            .next_deadline()
            .map(|at| (at as f64 - js_sys::Date::now()).max(0.0))
    }

    pub fn workflow_loaded(&mut self) {
        self.clock().workflow_loaded();
    }

    /// The host cleared its graph; every tracked node is forgotten.
    pub fn graph_cleared(&mut self) {
        self.clock().graph_cleared();
    }

    // ─── Float slots ─────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    pub fn add_float(
        &mut self,
        node: i32,
        title: &str,
        mode: i32,
        value: f64,
        min: f64,
        max: f64,
        step: f64,
    ) -> String {
        let slider = SliderValue::new(value, min, max, step);
        let effects = self
            .clock()
            .add_float(id(node), title, NodeMode::from_raw(mode), slider);
        effects_json(&effects)
    }

    pub fn rename_float(&mut self, node: i32, title: &str) -> String {
        effects_json(&self.clock().rename_float(id(node), title))
    }

    pub fn remove_float(&mut self, node: i32) {
        self.clock().remove_float(id(node));
    }

    pub fn float_mode(&mut self, node: i32, mode: i32) {
        self.clock().float_mode(id(node), NodeMode::from_raw(mode));
    }

    pub fn float_input(&mut self, node: i32, value: f64) -> String {
        effects_json(&self.clock().float_input(id(node), value))
    }

    pub fn float_range(&mut self, node: i32, min: f64, max: f64, step: f64) -> String {
        effects_json(&self.clock().float_range(id(node), min, max, step))
    }

    // ─── String slots ────────────────────────────────────────────────────

    pub fn add_string(&mut self, node: i32, title: &str, mode: i32, text: &str) -> String {
        let effects = self
            .clock()
            .add_string(id(node), title, NodeMode::from_raw(mode), text);
        effects_json(&effects)
    }

    pub fn rename_string(&mut self, node: i32, title: &str) -> String {
        effects_json(&self.clock().rename_string(id(node), title))
    }

    pub fn remove_string(&mut self, node: i32) {
        self.clock().remove_string(id(node));
    }

    pub fn string_mode(&mut self, node: i32, mode: i32) {
        self.clock().string_mode(id(node), NodeMode::from_raw(mode));
    }

    pub fn string_input(&mut self, node: i32, text: &str) -> String {
        effects_json(&self.clock().string_input(id(node), text))
    }

    // ─── Image slots ─────────────────────────────────────────────────────

    pub fn add_image(&mut self, node: i32, title: &str, mode: i32) -> String {
        let effects = self
            .clock()
            .add_image(id(node), title, NodeMode::from_raw(mode));
        effects_json(&effects)
    }

    pub fn rename_image(&mut self, node: i32, title: &str) -> String {
        effects_json(&self.clock().rename_image(id(node), title))
    }

    pub fn remove_image(&mut self, node: i32) {
        self.clock().remove_image(id(node));
    }

    pub fn image_mode(&mut self, node: i32, mode: i32) {
        self.clock().image_mode(id(node), NodeMode::from_raw(mode));
    }

    /// Labels for a rename picker, as a JSON array. `kind` is the message
    /// type of the node (`FloatSlots`, `StringSlots`, `ImageSlots`).
    pub fn suggestions(&self, kind: &str) -> String {
        let labels = match MessageType::from_key(kind) {
            Some(MessageType::FloatSlots) => self.session.floats.suggestions(),
            Some(MessageType::StringSlots) => self.session.strings.suggestions(),
            Some(MessageType::ImageSlots) => self.session.images.suggestions(),
            _ => Vec::new(),
        };
        serde_json::to_string(&labels).unwrap_or_else(|_| "[]".to_string())
    }

    // ─── Seeds ───────────────────────────────────────────────────────────

    /// Register a seed node. `saved` is its serialized `{seed, autorandom}`
    /// widget state, if the workflow had one.
    pub fn add_seed(&mut self, node: i32, title: &str, saved: Option<String>) -> String {
        let saved = saved.and_then(|json| match serde_json::from_str::<SeedUpdate>(&json) {
            Ok(update) => Some(SeedState {
                seed: update.seed,
                autorandom: update.autorandom,
            }),
            Err(e) => {
                log::warn!("SeedSlot: unreadable saved state on {node}: {e}");
                None
            }
        });
        effects_json(&self.clock().add_seed(id(node), title, saved))
    }

    pub fn remove_seed(&mut self, node: i32) {
        self.session.remove_seed(id(node));
    }

    pub fn seed_input(&mut self, seed: f64) -> String {
        if !seed.is_finite() || seed < 0.0 {
            return "[]".to_string();
        }
        effects_json(&self.clock().seed_input(seed.floor() as u64))
    }

    pub fn seed_toggle_autorandom(&mut self) -> String {
        effects_json(&self.clock().seed_toggle_autorandom())
    }

    pub fn seed_randomize(&mut self) -> String {
        effects_json(&self.clock().seed_randomize(js_sys::Math::random()))
    }

    /// Rewrite seeds in a prompt about to be queued. Returns
    /// `{"ok":true,"prompt":...,"effects":[...]}`, or `{"ok":false,"error":"..."}`
    /// when the prompt could not be parsed; the host then queues its own
    /// prompt unchanged.
    pub fn prepare_prompt(&mut self, prompt: &str) -> String {
        let unit = js_sys::Math::random();
        rewrite_prompt(self.clock(), prompt, unit)
    }

    // ─── Switchers ───────────────────────────────────────────────────────

    /// Observe a switcher node from its JSON snapshot
    /// (`{id, title, restriction, widgets}`).
    pub fn observe_switcher(&mut self, snapshot: &str) -> bool {
        match serde_json::from_str::<SwitcherSnapshot>(snapshot) {
            Ok(snapshot) => {
                self.clock().observe_switcher(&snapshot);
                true
            }
            Err(e) => {
                log::error!("switchers: bad snapshot: {e}");
                false
            }
        }
    }

    pub fn remove_switcher(&mut self, node: i32) {
        self.clock().remove_switcher(id(node));
    }

    pub fn cycle_restriction(&mut self, node: i32) -> String {
        effects_json(&self.clock().cycle_restriction(id(node)))
    }

    // ─── Execution events ────────────────────────────────────────────────

    /// `execution_start` event. Returns effects JSON (preview reloads).
    pub fn execution_started(&mut self) -> String {
        effects_json(&self.clock().execution_started())
    }

    pub fn executing(&mut self, node: Option<i32>) -> String {
        effects_json(&self.clock().executing(node.map(id)))
    }

    pub fn execution_failed(&mut self) -> String {
        effects_json(&self.clock().execution_failed())
    }

    pub fn progress(&mut self, value: f64, max: f64) {
        self.clock().progress(value, max);
    }
}

impl Default for BpPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl BpPlugin {
    fn clock(&mut self) -> &mut Session {
        self.session.advance(now())
    }
}

fn id(node: i32) -> NodeId {
    NodeId(i64::from(node))
}

fn now() -> u64 {
    js_sys::Date::now() as u64
}

fn rewrite_prompt(session: &mut Session, prompt: &str, unit: f64) -> String {
    let mut value: serde_json::Value = match serde_json::from_str(prompt) {
        Ok(v) => v,
        Err(e) => {
            log::error!("prompt: cannot parse: {e}");
            return serde_json::json!({ "ok": false, "error": e.to_string() }).to_string();
        }
    };
    let effects = session.prepare_prompt(&mut value, unit);
    serde_json::json!({ "ok": true, "prompt": value, "effects": effects }).to_string()
}

fn effects_json(effects: &[HostEffect]) -> String {
    serde_json::to_string(effects).unwrap_or_else(|e| {
        log::error!("effects: cannot serialize: {e}");
        "[]".to_string()
    })
}

// ─── Logging and panic hook ──────────────────────────────────────────────

fn init_logging() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let _ = console_log::init_with_level(log::Level::Debug);
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("BluePixel WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone helpers (no plugin needed) ───────────────────────────────

/// URL of a bundled workflow document, localized when a translation exists.
#[wasm_bindgen]
pub fn workflow_url(name: &str, locale: Option<String>) -> String {
    workflow_path(&workflow_document(name, locale.as_deref()))
}

/// Title a freshly added node should carry. For nodes the plugin does not
/// track itself, such as reroutes.
#[wasm_bindgen]
pub fn default_title(title: &str) -> String {
    default_label(title)
}
