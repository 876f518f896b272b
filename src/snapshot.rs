// Decoding and validating full-state snapshots pushed by the server

use crate::models::{Bed, EntityId, Habit, SeedStack, ShopListing, Tag, Task};
use crate::record::{self, Entity};
use eyre::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Why a snapshot was refused. A refused snapshot leaves local state untouched.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Duplicate id {id} in {collection}")]
    DuplicateId { collection: &'static str, id: EntityId },

    #[error("{collection} entry {id} has a target growth of 0")]
    ZeroTargetGrowth { collection: &'static str, id: EntityId },

    #[error("Habit {id} repeats every 0 periods")]
    ZeroEvery { id: EntityId },
}

/// Wire shape. Scalars may be missing or null; collections keep "absent" distinct from "empty".
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSnapshot {
    #[serde(default)]
    current_xp: Option<u64>,
    #[serde(default)]
    coins: Option<u64>,
    #[serde(default, alias = "strick")]
    streak: Option<u32>,
    #[serde(default)]
    did_task_today: Option<bool>,
    #[serde(default)]
    is_drought: Option<bool>,
    #[serde(default)]
    tasks: Option<Vec<Task>>,
    #[serde(default)]
    habits: Option<Vec<Habit>>,
    #[serde(default)]
    tags: Option<Vec<Tag>>,
    #[serde(default)]
    field: Option<Vec<Bed>>,
    #[serde(default)]
    inventory_seeds: Option<Vec<SeedStack>>,
    #[serde(default, alias = "shopItem")]
    shop_items: Option<Vec<ShopListing>>,
}

/// Validated snapshot, ready to be merged into a store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FarmSnapshot {
    pub current_xp: u64,
    pub coins: u64,
    pub streak: u32,
    pub did_task_today: bool,
    pub is_drought: bool,
    pub tasks: Option<Vec<Task>>,
    pub habits: Option<Vec<Habit>>,
    pub tags: Option<Vec<Tag>>,
    pub field: Option<Vec<Bed>>,
    pub inventory_seeds: Option<Vec<SeedStack>>,
    pub shop_items: Option<Vec<ShopListing>>,
}

impl FarmSnapshot {
    /// Decode and validate a snapshot from JSON text
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        let wire: WireSnapshot = serde_json::from_str(json)?;
        Self::validate(wire)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, SnapshotError> {
        let wire: WireSnapshot = serde_json::from_value(value)?;
        Self::validate(wire)
    }

    /// Read a snapshot saved to disk
    pub fn read_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        let snapshot = Self::from_json(&json)
            .with_context(|| format!("Invalid snapshot {}", path.display()))?;

        info!(file = ?path, "Loaded snapshot");
        Ok(snapshot)
    }

    fn validate(wire: WireSnapshot) -> Result<Self, SnapshotError> {
        check_unique(wire.tasks.as_deref())?;
        check_unique(wire.habits.as_deref())?;
        check_unique(wire.tags.as_deref())?;
        check_unique(wire.field.as_deref())?;
        check_unique(wire.inventory_seeds.as_deref())?;

        for habit in wire.habits.iter().flatten() {
            if habit.every == 0 {
                return Err(SnapshotError::ZeroEvery { id: habit.id });
            }
        }

        for plant in wire.field.iter().flatten().filter_map(|bed| bed.plant.as_ref()) {
            if plant.target_growth == 0 {
                return Err(SnapshotError::ZeroTargetGrowth {
                    collection: "plants",
                    id: plant.id,
                });
            }
        }

        let payloads = wire
            .shop_items
            .iter()
            .flatten()
            .filter_map(|listing| listing.seed_payload.as_ref());
        for stack in wire.inventory_seeds.iter().flatten().chain(payloads) {
            if stack.target_growth == 0 {
                return Err(SnapshotError::ZeroTargetGrowth {
                    collection: SeedStack::collection_name(),
                    id: stack.id,
                });
            }
        }

        Ok(Self {
            current_xp: wire.current_xp.unwrap_or(0),
            coins: wire.coins.unwrap_or(0),
            streak: wire.streak.unwrap_or(0),
            did_task_today: wire.did_task_today.unwrap_or(false),
            is_drought: wire.is_drought.unwrap_or(false),
            tasks: wire.tasks,
            habits: wire.habits,
            tags: wire.tags,
            field: wire.field,
            inventory_seeds: wire.inventory_seeds,
            shop_items: wire.shop_items,
        })
    }
}

fn check_unique<T: Entity>(items: Option<&[T]>) -> Result<(), SnapshotError> {
    match items.and_then(record::duplicate_id) {
        Some(id) => Err(SnapshotError::DuplicateId {
            collection: T::collection_name(),
            id,
        }),
        None => Ok(()),
    }
}
