//! Session facade: one owned instance per editor session.
//!
//! Routes host graph events to the per-kind engines, gates and schedules
//! outbound lists, and turns inbound frames into `HostEffect`s the host
//! applies to its widgets. Nothing here fails past the boundary: errors are
//! logged and the affected message is dropped.

use crate::channel::{Outbox, Reconnect, Transport};
use crate::floats::FloatSlots;
use crate::generation::{GenerationTracker, StatusChange};
use crate::images::ImageSlots;
use crate::retry::RetrySchedule;
use crate::seeds::SeedManager;
use crate::slots::WidgetUpdate;
use crate::strings::StringSlots;
use crate::toggles::{ModeChange, SwitcherSnapshot, ToggleTracker};
use bp_core::{
    ImageValue, Inbound, MessageType, NodeId, NodeMode, Restriction, SeedState, SliderValue,
    TextValue, decode_frame, default_label, to_payload,
};
use serde::Serialize;
use serde_json::Value;
use serde_json::value::RawValue;

// ─── Configuration ───────────────────────────────────────────────────────

/// Timing and identity knobs of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Per-type send debounce.
    pub debounce_ms: u64,
    /// Delay before reopening a closed socket.
    pub reconnect_ms: u64,
    /// Delay between re-observations of a half-mounted node.
    pub retry_ms: u64,
    pub max_retries: u32,
    /// `platform` query parameter of the socket URL.
    pub platform: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            reconnect_ms: 5000,
            retry_ms: 200,
            max_retries: 5,
            platform: "cm".to_string(),
        }
    }
}

// ─── Host effects ────────────────────────────────────────────────────────

/// Something the host must do to its own widgets or runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HostEffect {
    /// Retitle a freshly added node to its default label.
    SetTitle {
        node: NodeId,
        title: String,
    },
    /// Write a slider state and its fill percentage into a node.
    Float {
        node: NodeId,
        value: f64,
        min: f64,
        max: f64,
        step: f64,
        fill: f64,
    },
    Text {
        node: NodeId,
        value: String,
    },
    Seed {
        node: NodeId,
        seed: u64,
        autorandom: bool,
    },
    /// Load preview images onto an image slot node.
    Preview {
        node: NodeId,
        image: String,
        selection: Option<String>,
    },
    /// Invoke the switcher node's own mode-change action for one widget.
    ModeChange {
        node: NodeId,
        widget: String,
        enabled: bool,
    },
    SetRestriction {
        node: NodeId,
        restriction: Restriction,
    },
    /// Take a fresh snapshot of a switcher node and observe it again.
    ObserveSwitcher {
        node: NodeId,
    },
    Alert {
        message: String,
    },
    QueuePrompt,
    /// Open a new socket.
    Reconnect,
}

/// Default label of a freshly added node, and the retitle effect when it
/// differs from the host title.
fn initial_title(node: NodeId, title: &str) -> (String, Option<HostEffect>) {
    let label = default_label(title);
    let retitle = (label != title).then(|| HostEffect::SetTitle {
        node,
        title: label.clone(),
    });
    (label, retitle)
}

fn float_effects(updates: Vec<WidgetUpdate<SliderValue>>) -> Vec<HostEffect> {
    updates
        .into_iter()
        .map(|u| HostEffect::Float {
            node: u.node,
            value: u.value.value,
            min: u.value.min,
            max: u.value.max,
            step: u.value.step,
            fill: u.value.fill_percentage(),
        })
        .collect()
}

fn text_effects(updates: Vec<WidgetUpdate<TextValue>>) -> Vec<HostEffect> {
    updates
        .into_iter()
        .map(|u| HostEffect::Text {
            node: u.node,
            value: u.value.value,
        })
        .collect()
}

fn seed_effects(updates: Vec<WidgetUpdate<SeedState>>) -> Vec<HostEffect> {
    updates
        .into_iter()
        .map(|u| HostEffect::Seed {
            node: u.node,
            seed: u.value.seed,
            autorandom: u.value.autorandom,
        })
        .collect()
}

impl From<ModeChange> for HostEffect {
    fn from(change: ModeChange) -> Self {
        HostEffect::ModeChange {
            node: change.node,
            widget: change.widget,
            enabled: change.enabled,
        }
    }
}

// ─── Session ─────────────────────────────────────────────────────────────

pub struct Session {
    config: SessionConfig,
    pub floats: FloatSlots,
    pub strings: StringSlots,
    pub images: ImageSlots,
    pub seeds: SeedManager,
    pub toggles: ToggleTracker,
    pub generation: GenerationTracker,
    outbox: Outbox,
    reconnect: Reconnect,
    retries: RetrySchedule,
    workflow_loaded: bool,
    ps_connected: bool,
    now: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            outbox: Outbox::new(config.debounce_ms),
            reconnect: Reconnect::new(config.reconnect_ms),
            retries: RetrySchedule::new(config.retry_ms, config.max_retries),
            config,
            floats: FloatSlots::new(),
            strings: StringSlots::new(),
            images: ImageSlots::new(),
            seeds: SeedManager::new(),
            toggles: ToggleTracker::new(),
            generation: GenerationTracker::new(),
            workflow_loaded: false,
            ps_connected: false,
            now: 0,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Set the session clock (milliseconds). Sends requested afterwards are
    /// debounced relative to it.
    pub fn advance(&mut self, now: u64) -> &mut Self {
        self.now = self.now.max(now);
        self
    }

    /// Whether any node this plugin provides is in the graph.
    pub fn plugin_present(&self) -> bool {
        !self.floats.is_empty()
            || !self.strings.is_empty()
            || !self.images.is_empty()
            || !self.seeds.is_empty()
            || !self.toggles.is_empty()
    }

    // ─── Send gate ───────────────────────────────────────────────────────

    fn slots_open(&self) -> bool {
        self.workflow_loaded && self.ps_connected
    }

    fn request(&mut self, kind: MessageType, payload: Box<RawValue>) {
        self.outbox.request(kind, payload, self.now);
    }

    pub fn send_floats(&mut self) {
        if !self.slots_open() {
            return;
        }
        if let Some(payload) = self.floats.outbound() {
            self.request(MessageType::FloatSlots, payload);
        }
    }

    pub fn send_strings(&mut self) {
        if !self.slots_open() {
            return;
        }
        if let Some(payload) = self.strings.outbound() {
            self.request(MessageType::StringSlots, payload);
        }
    }

    pub fn send_images(&mut self) {
        if !self.slots_open() {
            return;
        }
        if let Some(payload) = self.images.outbound() {
            self.request(MessageType::ImageSlots, payload);
        }
    }

    pub fn send_seeds(&mut self) {
        let Some(state) = self.seeds.payload() else {
            return;
        };
        match to_payload(&state) {
            Ok(payload) => self.request(MessageType::SeedSlot, payload),
            Err(e) => log::error!("SeedSlot: cannot serialize payload: {e}"),
        }
    }

    pub fn send_switchers(&mut self) {
        if !self.ps_connected {
            return;
        }
        match to_payload(self.toggles.records()) {
            Ok(payload) => self.request(MessageType::Switchers, payload),
            Err(e) => log::error!("switchers: cannot serialize payload: {e}"),
        }
    }

    pub fn send_all(&mut self) {
        self.send_floats();
        self.send_strings();
        self.send_images();
        self.send_seeds();
        self.send_switchers();
    }

    /// The host finished loading a workflow into the graph.
    pub fn workflow_loaded(&mut self) {
        self.workflow_loaded = true;
        self.send_all();
    }

    /// The host cleared its graph (new workflow, or `graph.clear()`). Every
    /// tracked node is forgotten and slot lists stay gated until the next
    /// workflow finishes loading.
    pub fn graph_cleared(&mut self) {
        log::debug!("graph cleared; forgetting all nodes");
        self.floats.clear();
        self.strings.clear();
        self.images.clear();
        self.seeds = SeedManager::new();
        self.toggles = ToggleTracker::new();
        self.retries = RetrySchedule::new(self.config.retry_ms, self.config.max_retries);
        self.workflow_loaded = false;
    }

    /// The external editor announced itself. Caches are dropped so it gets
    /// full state even if nothing changed since the last send.
    pub fn ps_connected(&mut self) {
        log::debug!("psConnected: resending full state");
        self.ps_connected = true;
        self.floats.reset_last_sent();
        self.strings.reset_last_sent();
        self.images.reset_last_sent();
        self.send_all();
    }

    // ─── Float slots ─────────────────────────────────────────────────────

    pub fn add_float(
        &mut self,
        node: NodeId,
        title: &str,
        mode: NodeMode,
        value: SliderValue,
    ) -> Vec<HostEffect> {
        let (label, retitle) = initial_title(node, title);
        let updates = self.floats.add_node(node, &label, mode, value);
        self.send_floats();
        retitle.into_iter().chain(float_effects(updates)).collect()
    }

    pub fn rename_float(&mut self, node: NodeId, title: &str) -> Vec<HostEffect> {
        let updates = self.floats.rename(node, title);
        self.send_floats();
        float_effects(updates)
    }

    pub fn remove_float(&mut self, node: NodeId) {
        if self.floats.remove_node(node) {
            self.send_floats();
        }
    }

    pub fn float_mode(&mut self, node: NodeId, mode: NodeMode) {
        if self.floats.set_mode(node, mode) {
            self.send_floats();
        }
    }

    pub fn float_input(&mut self, node: NodeId, input: f64) -> Vec<HostEffect> {
        let updates = self.floats.set_value(node, input);
        self.send_floats();
        float_effects(updates)
    }

    pub fn float_range(&mut self, node: NodeId, min: f64, max: f64, step: f64) -> Vec<HostEffect> {
        let updates = self.floats.set_range(node, min, max, step);
        self.send_floats();
        float_effects(updates)
    }

    // ─── String slots ────────────────────────────────────────────────────

    pub fn add_string(
        &mut self,
        node: NodeId,
        title: &str,
        mode: NodeMode,
        text: &str,
    ) -> Vec<HostEffect> {
        let value = TextValue {
            value: text.to_string(),
        };
        let (label, retitle) = initial_title(node, title);
        let updates = self.strings.add_node(node, &label, mode, value);
        self.send_strings();
        retitle.into_iter().chain(text_effects(updates)).collect()
    }

    pub fn rename_string(&mut self, node: NodeId, title: &str) -> Vec<HostEffect> {
        let updates = self.strings.rename(node, title);
        self.send_strings();
        text_effects(updates)
    }

    pub fn remove_string(&mut self, node: NodeId) {
        if self.strings.remove_node(node) {
            self.send_strings();
        }
    }

    pub fn string_mode(&mut self, node: NodeId, mode: NodeMode) {
        if self.strings.set_mode(node, mode) {
            self.send_strings();
        }
    }

    pub fn string_input(&mut self, node: NodeId, text: &str) -> Vec<HostEffect> {
        let updates = self.strings.set_text(node, text);
        self.send_strings();
        text_effects(updates)
    }

    // ─── Image slots ─────────────────────────────────────────────────────

    fn preview_effect(&self, node: NodeId) -> Option<HostEffect> {
        let (image, selection) = self.images.previews(node)?;
        Some(HostEffect::Preview {
            node,
            image,
            selection,
        })
    }

    pub fn add_image(&mut self, node: NodeId, title: &str, mode: NodeMode) -> Vec<HostEffect> {
        let (label, retitle) = initial_title(node, title);
        self.images.add_node(node, &label, mode, ImageValue {});
        self.send_images();
        retitle.into_iter().chain(self.preview_effect(node)).collect()
    }

    pub fn rename_image(&mut self, node: NodeId, title: &str) -> Vec<HostEffect> {
        self.images.rename(node, title);
        self.send_images();
        self.preview_effect(node).into_iter().collect()
    }

    pub fn remove_image(&mut self, node: NodeId) {
        if self.images.remove_node(node) {
            self.send_images();
        }
    }

    pub fn image_mode(&mut self, node: NodeId, mode: NodeMode) {
        if self.images.set_mode(node, mode) {
            self.send_images();
        }
    }

    // ─── Seeds ───────────────────────────────────────────────────────────

    pub fn add_seed(
        &mut self,
        node: NodeId,
        title: &str,
        saved: Option<SeedState>,
    ) -> Vec<HostEffect> {
        let (_, retitle) = initial_title(node, title);
        let updates = self.seeds.add_node(node, saved);
        self.send_seeds();
        retitle.into_iter().chain(seed_effects(updates)).collect()
    }

    pub fn remove_seed(&mut self, node: NodeId) {
        self.seeds.remove_node(node);
    }

    pub fn seed_input(&mut self, seed: u64) -> Vec<HostEffect> {
        let updates = self.seeds.set_seed(seed);
        self.send_seeds();
        seed_effects(updates)
    }

    pub fn seed_toggle_autorandom(&mut self) -> Vec<HostEffect> {
        let updates = self.seeds.toggle_autorandom();
        self.send_seeds();
        seed_effects(updates)
    }

    pub fn seed_randomize(&mut self, unit: f64) -> Vec<HostEffect> {
        let updates = self.seeds.randomize(unit);
        self.send_seeds();
        seed_effects(updates)
    }

    /// Rewrite seeds in a prompt about to be queued.
    pub fn prepare_prompt(&mut self, prompt: &mut Value, unit: f64) -> Vec<HostEffect> {
        match self.seeds.prepare_prompt(prompt, unit) {
            Some(updates) => {
                self.send_seeds();
                seed_effects(updates)
            }
            None => Vec::new(),
        }
    }

    // ─── Switchers ───────────────────────────────────────────────────────

    /// Observe a switcher node after a host event that may have changed it.
    pub fn observe_switcher(&mut self, snapshot: &SwitcherSnapshot) {
        let observation = self.toggles.observe(snapshot);
        if observation.incomplete {
            self.retries.schedule(snapshot.id, self.now);
        } else {
            self.retries.succeeded(snapshot.id);
        }
        if observation.changed {
            self.send_switchers();
        }
    }

    pub fn remove_switcher(&mut self, node: NodeId) {
        self.retries.succeeded(node);
        if self.toggles.remove(node) {
            self.send_switchers();
        }
    }

    pub fn cycle_restriction(&mut self, node: NodeId) -> Vec<HostEffect> {
        let Some(restriction) = self.toggles.cycle_restriction(node) else {
            log::warn!("switchers: restriction change on untracked node {node}");
            return Vec::new();
        };
        self.send_switchers();
        vec![HostEffect::SetRestriction { node, restriction }]
    }

    // ─── Execution events ────────────────────────────────────────────────

    fn status(&mut self, change: StatusChange) {
        let (kind, payload) = match change {
            StatusChange::Render(status) => (MessageType::RenderStatus, to_payload(&status)),
            StatusChange::Progress(percent) => (MessageType::Progress, to_payload(&percent)),
        };
        match payload {
            Ok(payload) => self.request(kind, payload),
            Err(e) => log::error!("{kind}: cannot serialize: {e}"),
        }
    }

    /// `execution_start` event. Every image node reloads its previews so
    /// the prompt sees what the editor last pushed.
    pub fn execution_started(&mut self) -> Vec<HostEffect> {
        let change = self.generation.execution_started();
        self.status(change);
        self.images
            .all_previews()
            .into_iter()
            .map(|(node, image, selection)| HostEffect::Preview {
                node,
                image,
                selection,
            })
            .collect()
    }

    /// `executing` event; `None` marks the end of the prompt and releases a
    /// deferred queue request.
    pub fn executing(&mut self, node: Option<NodeId>) -> Vec<HostEffect> {
        if let Some(change) = self.generation.executing(node) {
            self.status(change);
        }
        if self.generation.take_ready() {
            vec![HostEffect::QueuePrompt]
        } else {
            Vec::new()
        }
    }

    pub fn execution_failed(&mut self) -> Vec<HostEffect> {
        let change = self.generation.execution_failed();
        self.status(change);
        if self.generation.take_ready() {
            vec![HostEffect::QueuePrompt]
        } else {
            Vec::new()
        }
    }

    pub fn progress(&mut self, value: f64, max: f64) {
        if let Some(change) = self.generation.progress(value, max) {
            self.status(change);
        }
    }

    // ─── Inbound ─────────────────────────────────────────────────────────

    /// Apply one inbound frame. Malformed frames are logged and dropped.
    pub fn handle_frame(&mut self, text: &str) -> Vec<HostEffect> {
        let messages = match decode_frame(text) {
            Ok(messages) => messages,
            Err(e) => {
                log::error!("channel: {e}");
                return Vec::new();
            }
        };
        let mut effects = Vec::new();
        for message in messages {
            effects.extend(self.handle_message(message));
        }
        effects
    }

    fn handle_message(&mut self, message: Inbound) -> Vec<HostEffect> {
        match message {
            Inbound::FloatSlots(updates) => float_effects(self.floats.apply_inbound(&updates)),
            Inbound::StringSlots(updates) => text_effects(self.strings.apply_inbound(&updates)),
            Inbound::SeedSlot(update) => {
                if self.seeds.is_empty() {
                    log::debug!("SeedSlot: no seed node; ignored");
                    return Vec::new();
                }
                seed_effects(self.seeds.apply_inbound(&update))
            }
            Inbound::Switchers(update) => self
                .toggles
                .apply_inbound(&update)
                .into_iter()
                .map(HostEffect::from)
                .collect(),
            Inbound::Alert(message) => vec![HostEffect::Alert { message }],
            Inbound::Queue => {
                let present = self.plugin_present();
                if self.generation.request_queue(present) {
                    vec![HostEffect::QueuePrompt]
                } else {
                    Vec::new()
                }
            }
            Inbound::PsConnected => {
                self.ps_connected();
                Vec::new()
            }
        }
    }

    // ─── Channel ─────────────────────────────────────────────────────────

    /// Drive timers at `now`: fire due sends, request due re-observations,
    /// and report a due reconnect.
    pub fn tick(&mut self, now: u64, transport: &mut impl Transport) -> Vec<HostEffect> {
        self.advance(now);
        self.outbox.poll(self.now, transport);

        let mut effects: Vec<HostEffect> = self
            .retries
            .take_due(self.now)
            .into_iter()
            .map(|node| HostEffect::ObserveSwitcher { node })
            .collect();
        if self.reconnect.due(self.now) {
            effects.push(HostEffect::Reconnect);
        }
        effects
    }

    /// Earliest time `tick` has work to do.
    pub fn next_deadline(&self) -> Option<u64> {
        [
            self.outbox.next_due(),
            self.retries.next_due(),
            self.reconnect.scheduled(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    pub fn channel_opened(&mut self, transport: &mut impl Transport) {
        self.reconnect.opened();
        let sent = self.outbox.flush(transport);
        log::debug!("channel: open, flushed {sent} queued frames");
    }

    /// Socket closed. The peer must announce itself again before slot lists
    /// flow.
    pub fn channel_closed(&mut self, now: u64) {
        self.advance(now);
        self.ps_connected = false;
        let at = self.reconnect.closed(self.now);
        log::warn!("channel: closed, reconnecting at {at}");
    }

    pub fn queued_frames(&self) -> usize {
        self.outbox.queued()
    }
}
