// Data models for the farm

use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Identifier shared by every entity; provisional ids come from the millisecond clock
pub type EntityId = i64;

/// Player totals plus the level fields derived from them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub current_xp: u64,
    pub current_level: u32,
    pub current_level_xp: u64,
    pub xp_to_next_level: u64,
    pub coins: u64,
    pub streak: u32,
    pub did_task_today: bool,
    pub is_drought: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Trifle,
    Easy,
    Normal,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: EntityId,
    pub name: String,
    pub color: String,
}

/// One-off task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: EntityId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub date: Option<DateTime<FixedOffset>>,
    #[serde(default)]
    pub tag: Option<Tag>,
}

/// Recurring habit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: EntityId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub count: u32,
    pub period: Period,
    pub every: u32,
    pub start_date: DateTime<FixedOffset>,
    #[serde(default)]
    pub tag: Option<Tag>,
}

/// Crop growing in a bed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub current_growth: u32,
    pub target_growth: u32,
    #[serde(default, alias = "imgPath")]
    pub image_path_base: String,
}

impl Plant {
    pub fn is_grown(&self) -> bool {
        self.current_growth >= self.target_growth
    }
}

/// Farm cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bed {
    pub id: EntityId,
    #[serde(default)]
    pub plant: Option<Plant>,
    #[serde(default)]
    pub is_lock: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rarity {
    #[serde(rename = "common")]
    Common,
    #[serde(rename = "uncommon")]
    Uncommon,
    #[serde(rename = "rare")]
    Rare,
    #[serde(rename = "legendary")]
    Legendary,
    #[serde(rename = "Unique", alias = "unique")]
    Unique,
}

/// Inventory entry: seeds of one template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedStack {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    pub target_growth: u32,
    pub rarity: Rarity,
    #[serde(alias = "seedId")]
    pub seed_template_id: EntityId,
    #[serde(default)]
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoodKind {
    Seed,
    Bed,
}

/// Item offered by the shop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopListing {
    #[serde(rename = "type")]
    pub kind: GoodKind,
    pub id: EntityId,
    pub quantity: u32,
    pub cost: u64,
    #[serde(default, alias = "item")]
    pub seed_payload: Option<SeedStack>,
}

/// Fields a new task is created from
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub date: Option<DateTime<FixedOffset>>,
    pub tag: Option<Tag>,
}

/// Fields a new habit is created from
#[derive(Debug, Clone, PartialEq)]
pub struct HabitDraft {
    pub title: String,
    pub description: Option<String>,
    pub difficulty: Difficulty,
    pub period: Period,
    pub every: u32,
    pub start_date: DateTime<FixedOffset>,
    pub tag: Option<Tag>,
}

impl TaskDraft {
    pub(crate) fn into_task(self, id: EntityId) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            difficulty: self.difficulty,
            done: false,
            date: self.date,
            tag: self.tag,
        }
    }
}

impl HabitDraft {
    pub(crate) fn into_habit(self, id: EntityId) -> Habit {
        Habit {
            id,
            title: self.title,
            description: self.description,
            difficulty: self.difficulty,
            done: false,
            count: 0,
            period: self.period,
            every: self.every,
            start_date: self.start_date,
            tag: self.tag,
        }
    }
}

/// Issues provisional ids for entities created before the server assigns one
///
/// Ids follow the millisecond clock but are strictly increasing, so two
/// creations within the same millisecond never collide.
#[derive(Debug, Clone, Default)]
pub struct ProvisionalIds {
    last: EntityId,
}

impl ProvisionalIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id, greater than every id in `existing` and every id issued before.
    ///
    /// When that would overflow, the id goes below every known id instead.
    pub fn next_after<I>(&mut self, existing: I) -> EntityId
    where
        I: IntoIterator<Item = EntityId>,
    {
        let ids: Vec<EntityId> = existing.into_iter().collect();
        let highest = ids.iter().copied().max().unwrap_or(0);

        let id = match (highest.checked_add(1), self.last.checked_add(1)) {
            (Some(above), Some(after_last)) => now_ms().max(after_last).max(above),
            _ => {
                let lowest = ids.iter().copied().chain([self.last, 0]).min().unwrap_or(0);
                warn!(highest, lowest, "No ids left above the highest, issuing below");
                lowest.saturating_sub(1)
            }
        };

        self.last = id;
        id
    }
}

/// Helper function to get current timestamp in milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Current local time carrying its UTC offset
pub fn local_now() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}
