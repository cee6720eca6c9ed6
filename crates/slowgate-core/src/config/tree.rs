//! Deployment configuration for a delayed-update tree

use super::traits::{parse_config_file, SlowGateConfig};
use super::validation::ConfigValidator;
use crate::crypto::MAX_MERKLE_DEPTH;
use crate::{Delay, Field, Slot, SlowGateError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default tree depth
pub const DEFAULT_TREE_DEPTH: u8 = 32;
/// Default delay, in host time units
pub const DEFAULT_DELAY: u64 = 100;

/// A leaf populated at deployment; its value is effective immediately
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialLeaf {
    /// Slot to populate
    pub slot: Slot,
    /// Value effective from deployment
    pub value: Field,
}

/// Parameters fixed when a tree is deployed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlowTreeConfig {
    /// Merkle depth; slots must be below `2^depth`
    pub depth: u8,
    /// Time units between staging a value and it becoming effective
    pub delay: u64,
    /// Initial leaf population
    pub initial_leaves: Vec<InitialLeaf>,
}

impl Default for SlowTreeConfig {
    fn default() -> Self {
        Self {
            depth: DEFAULT_TREE_DEPTH,
            delay: DEFAULT_DELAY,
            initial_leaves: Vec::new(),
        }
    }
}

impl SlowTreeConfig {
    /// Config with the given delay and default depth
    pub fn with_delay(delay: u64) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Builder-style depth override
    pub fn depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }

    /// Builder-style initial leaf
    pub fn leaf(mut self, slot: Slot, value: Field) -> Self {
        self.initial_leaves.push(InitialLeaf { slot, value });
        self
    }

    /// The delay as a typed duration
    pub fn delay_period(&self) -> Delay {
        Delay::new(self.delay)
    }

    fn slot_fits(&self, slot: Slot) -> bool {
        self.depth >= 64 || slot.index() < (1u64 << self.depth)
    }
}

impl SlowGateConfig for SlowTreeConfig {
    type Error = SlowGateError;

    fn load_from_file(path: &Path) -> Result<Self, Self::Error> {
        parse_config_file(path)
    }

    fn merge_with_env(&mut self) -> Result<(), Self::Error> {
        if let Ok(depth) = std::env::var("SLOWGATE_TREE_DEPTH") {
            self.set_from_string("depth", &depth)?;
        }
        if let Ok(delay) = std::env::var("SLOWGATE_TREE_DELAY") {
            self.set_from_string("delay", &delay)?;
        }
        Ok(())
    }

    fn merge_with(&mut self, other: &Self) -> Result<(), Self::Error> {
        let defaults = Self::default();
        if other.depth != defaults.depth {
            self.depth = other.depth;
        }
        if other.delay != defaults.delay {
            self.delay = other.delay;
        }
        if !other.initial_leaves.is_empty() {
            self.initial_leaves = other.initial_leaves.clone();
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), Self::Error> {
        let mut validator = ConfigValidator::new();
        validator
            .range("depth", u64::from(self.depth), 1, u64::from(MAX_MERKLE_DEPTH))
            .range("delay", self.delay, 1, u64::MAX);

        let mut leaves = validator.for_field("initial_leaves");
        for (i, leaf) in self.initial_leaves.iter().enumerate() {
            leaves.custom(
                &i.to_string(),
                &leaf.slot,
                |slot| self.slot_fits(*slot),
                "slot outside tree capacity",
            );
        }
        validator.merge(leaves);

        validator.result().map_err(Into::into)
    }

    fn set_from_string(&mut self, key: &str, value: &str) -> Result<(), Self::Error> {
        match key {
            "depth" => {
                self.depth = value
                    .parse()
                    .map_err(|_| SlowGateError::invalid(format!("Invalid tree depth: {value}")))?;
            }
            "delay" => {
                self.delay = value
                    .parse()
                    .map_err(|_| SlowGateError::invalid(format!("Invalid delay: {value}")))?;
            }
            _ => {
                return Err(SlowGateError::invalid(format!(
                    "Unknown configuration key: {key}"
                )))
            }
        }
        Ok(())
    }
}
