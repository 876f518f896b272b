// Remote API contract consumed by the store

use crate::models::{EntityId, Habit, HabitDraft, Plant, ShopListing, Tag, Task, TaskDraft};
use async_trait::async_trait;
use eyre::Result;
use serde::{Deserialize, Serialize};

/// Reward reported when a task or habit is marked done or undone
///
/// Undo responses carry a negative `xp_earned` and no `plants_grown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReward {
    #[serde(default)]
    pub xp_earned: i64,
    #[serde(default)]
    pub plants_grown: u32,
}

/// Reward reported for a harvest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HarvestReward {
    #[serde(default)]
    pub xp_earned: u64,
    #[serde(default)]
    pub gold_earned: u64,
}

/// Server side of the farm. Any `Err` is treated as a rejection of the call.
///
/// Calls are single attempts; implementations must not retry on their own.
#[async_trait(?Send)]
pub trait RemoteApi {
    /// Raw JSON of the full player snapshot
    async fn fetch_snapshot(&self) -> Result<String>;

    async fn create_task(&self, draft: &TaskDraft) -> Result<EntityId>;
    async fn update_task(&self, task: &Task) -> Result<()>;
    async fn delete_task(&self, id: EntityId) -> Result<()>;
    async fn set_task_done(&self, id: EntityId, done: bool) -> Result<CompletionReward>;

    async fn create_habit(&self, draft: &HabitDraft) -> Result<EntityId>;
    async fn update_habit(&self, habit: &Habit) -> Result<()>;
    async fn delete_habit(&self, id: EntityId) -> Result<()>;
    async fn set_habit_done(&self, id: EntityId, done: bool) -> Result<CompletionReward>;

    async fn create_tag(&self, name: &str, color: &str) -> Result<EntityId>;
    async fn update_tag(&self, tag: &Tag) -> Result<()>;
    async fn delete_tag(&self, id: EntityId) -> Result<()>;

    /// Plant a seed of template `seed_id` in bed `bed_id`
    async fn plant_seed(&self, bed_id: EntityId, seed_id: EntityId) -> Result<Plant>;
    async fn harvest(&self, plant_id: EntityId) -> Result<HarvestReward>;

    /// Purchase a shop good; success carries no payload
    async fn buy(&self, good_id: EntityId) -> Result<()>;
}

/// The single remote call a pending mutation stands for
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    CreateTask(TaskDraft),
    UpdateTask(Task),
    DeleteTask(EntityId),
    SetTaskDone { id: EntityId, done: bool },
    CreateHabit(HabitDraft),
    UpdateHabit(Habit),
    DeleteHabit(EntityId),
    SetHabitDone { id: EntityId, done: bool },
    CreateTag { name: String, color: String },
    UpdateTag(Tag),
    DeleteTag(EntityId),
    PlantSeed { bed_id: EntityId, seed_id: EntityId },
    Harvest { plant_id: EntityId },
    Buy { listing: ShopListing },
}

/// What a successful call returned
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteReply {
    Created(EntityId),
    Completion(CompletionReward),
    Planted(Plant),
    Harvested(HarvestReward),
    Ack,
}

impl RemoteCall {
    /// Issue the call against `api`
    pub async fn send<A: RemoteApi + ?Sized>(&self, api: &A) -> Result<RemoteReply> {
        let reply = match self {
            RemoteCall::CreateTask(draft) => RemoteReply::Created(api.create_task(draft).await?),
            RemoteCall::UpdateTask(task) => {
                api.update_task(task).await?;
                RemoteReply::Ack
            }
            RemoteCall::DeleteTask(id) => {
                api.delete_task(*id).await?;
                RemoteReply::Ack
            }
            RemoteCall::SetTaskDone { id, done } => {
                RemoteReply::Completion(api.set_task_done(*id, *done).await?)
            }
            RemoteCall::CreateHabit(draft) => RemoteReply::Created(api.create_habit(draft).await?),
            RemoteCall::UpdateHabit(habit) => {
                api.update_habit(habit).await?;
                RemoteReply::Ack
            }
            RemoteCall::DeleteHabit(id) => {
                api.delete_habit(*id).await?;
                RemoteReply::Ack
            }
            RemoteCall::SetHabitDone { id, done } => {
                RemoteReply::Completion(api.set_habit_done(*id, *done).await?)
            }
            RemoteCall::CreateTag { name, color } => {
                RemoteReply::Created(api.create_tag(name, color).await?)
            }
            RemoteCall::UpdateTag(tag) => {
                api.update_tag(tag).await?;
                RemoteReply::Ack
            }
            RemoteCall::DeleteTag(id) => {
                api.delete_tag(*id).await?;
                RemoteReply::Ack
            }
            RemoteCall::PlantSeed { bed_id, seed_id } => {
                RemoteReply::Planted(api.plant_seed(*bed_id, *seed_id).await?)
            }
            RemoteCall::Harvest { plant_id } => {
                RemoteReply::Harvested(api.harvest(*plant_id).await?)
            }
            RemoteCall::Buy { listing } => {
                api.buy(listing.id).await?;
                RemoteReply::Ack
            }
        };
        Ok(reply)
    }
}
