//! Seed manager nodes (`SeedSlot`).
//!
//! Unlike the titled slots, every seed node in the graph shares one state:
//! there is a single implicit group.

use crate::slots::WidgetUpdate;
use bp_core::labels::SEED_MANAGER_CLASS;
use bp_core::{NodeId, SeedState, SeedUpdate};
use serde_json::Value;

pub const SEED_MIN: u64 = 1;
pub const SEED_MAX: u64 = 999_999;

/// Map a unit random in `[0, 1)` onto `SEED_MIN..=SEED_MAX`.
pub fn random_seed(unit: f64) -> u64 {
    let span = (SEED_MAX - SEED_MIN + 1) as f64;
    let offset = (unit.clamp(0.0, 1.0) * span).floor() as u64;
    (SEED_MIN + offset).min(SEED_MAX)
}

#[derive(Debug, Default)]
pub struct SeedManager {
    nodes: Vec<NodeId>,
    state: SeedState,
}

impl SeedManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new seed node. The first node keeps its saved state (or the
    /// default); later nodes inherit the shared state.
    pub fn add_node(
        &mut self,
        node: NodeId,
        saved: Option<SeedState>,
    ) -> Vec<WidgetUpdate<SeedState>> {
        if self.nodes.contains(&node) {
            return Vec::new();
        }
        if self.nodes.is_empty() {
            self.state = saved.unwrap_or_default();
        }
        self.nodes.push(node);
        self.broadcast()
    }

    pub fn remove_node(&mut self, node: NodeId) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| *n != node);
        self.nodes.len() != before
    }

    pub fn state(&self) -> SeedState {
        self.state
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn set_seed(&mut self, seed: u64) -> Vec<WidgetUpdate<SeedState>> {
        self.state.seed = seed;
        self.broadcast()
    }

    pub fn toggle_autorandom(&mut self) -> Vec<WidgetUpdate<SeedState>> {
        self.state.autorandom = !self.state.autorandom;
        self.broadcast()
    }

    /// "Random" button: draw a fresh seed from `unit`.
    pub fn randomize(&mut self, unit: f64) -> Vec<WidgetUpdate<SeedState>> {
        let seed = random_seed(unit);
        log::debug!("SeedSlot: random seed {seed}");
        self.set_seed(seed)
    }

    pub fn apply_inbound(&mut self, update: &SeedUpdate) -> Vec<WidgetUpdate<SeedState>> {
        self.state = SeedState {
            seed: update.seed,
            autorandom: update.autorandom,
        };
        self.broadcast()
    }

    /// Payload for the channel; `None` when no seed node exists.
    pub fn payload(&self) -> Option<SeedState> {
        (!self.nodes.is_empty()).then_some(self.state)
    }

    /// Called right before a prompt is queued. With autorandom on, draws a new
    /// seed and writes it into every seed manager entry of `prompt.output`.
    pub fn prepare_prompt(
        &mut self,
        prompt: &mut Value,
        unit: f64,
    ) -> Option<Vec<WidgetUpdate<SeedState>>> {
        if self.nodes.is_empty() || !self.state.autorandom {
            return None;
        }
        let seed = random_seed(unit);
        if let Some(outputs) = prompt.get_mut("output").and_then(Value::as_object_mut) {
            for (key, output) in outputs.iter_mut() {
                if output.get("class_type").and_then(Value::as_str) != Some(SEED_MANAGER_CLASS) {
                    continue;
                }
                match output.get_mut("inputs").and_then(Value::as_object_mut) {
                    Some(inputs) => {
                        inputs.insert("manual_seed".to_string(), Value::from(seed));
                    }
                    None => log::warn!("SeedSlot: prompt node {key} has no inputs"),
                }
            }
        }
        Some(self.set_seed(seed))
    }

    fn broadcast(&self) -> Vec<WidgetUpdate<SeedState>> {
        self.nodes
            .iter()
            .map(|&node| WidgetUpdate {
                node,
                value: self.state,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn random_seed_stays_in_range() {
        assert_eq!(random_seed(0.0), 1);
        assert_eq!(random_seed(0.999_999_9), 999_999);
        assert_eq!(random_seed(1.0), 999_999);
    }

    #[test]
    fn later_nodes_inherit_shared_state() {
        let mut seeds = SeedManager::new();
        seeds.add_node(NodeId(1), None);
        seeds.set_seed(77);
        let updates = seeds.add_node(
            NodeId(2),
            Some(SeedState {
                seed: 5,
                autorandom: true,
            }),
        );
        assert_eq!(updates.len(), 2);
        assert!(updates.iter().all(|u| u.value.seed == 77 && !u.value.autorandom));
    }

    #[test]
    fn first_node_defaults() {
        let mut seeds = SeedManager::new();
        seeds.add_node(NodeId(1), None);
        assert_eq!(seeds.payload(), Some(SeedState { seed: 1379, autorandom: false }));
    }

    #[test]
    fn no_payload_without_nodes() {
        let mut seeds = SeedManager::new();
        seeds.add_node(NodeId(1), None);
        seeds.remove_node(NodeId(1));
        assert_eq!(seeds.payload(), None);
    }

    #[test]
    fn prepare_prompt_rewrites_seed_manager_inputs() {
        let mut seeds = SeedManager::new();
        seeds.add_node(NodeId(1), None);
        seeds.toggle_autorandom();
        let mut prompt = json!({
            "output": {
                "3": {"class_type": "🔹SeedManager", "inputs": {"manual_seed": 1}},
                "4": {"class_type": "KSampler", "inputs": {"seed": 1}}
            }
        });

        let updates = seeds.prepare_prompt(&mut prompt, 0.5).unwrap();
        let seed = random_seed(0.5);
        assert_eq!(prompt["output"]["3"]["inputs"]["manual_seed"], json!(seed));
        assert_eq!(prompt["output"]["4"]["inputs"]["seed"], json!(1));
        assert_eq!(updates[0].value.seed, seed);
    }

    #[test]
    fn prepare_prompt_is_noop_when_manual() {
        let mut seeds = SeedManager::new();
        seeds.add_node(NodeId(1), None);
        let mut prompt = json!({"output": {}});
        assert!(seeds.prepare_prompt(&mut prompt, 0.5).is_none());
        assert_eq!(seeds.state().seed, 1379);
    }
}
