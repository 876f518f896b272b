// Farm state container and the operations that mutate it

use crate::config::FarmConfig;
use crate::growth;
use crate::models::{
    Bed, EntityId, GoodKind, Habit, HabitDraft, Player, ProvisionalIds, SeedStack, ShopListing, Tag,
    Task, TaskDraft,
};
use crate::mutation::{
    self, ActionKind, ActivityLedger, ActivityMarks, Collection, Notice, Outcome, Pending,
    Rejection, Undo,
};
use crate::record::{self, Entity};
use crate::remote::{CompletionReward, HarvestReward, RemoteCall, RemoteReply};
use crate::snapshot::{FarmSnapshot, SnapshotError};
use eyre::Result;
use tracing::{debug, info, warn};

/// Everything the player sees: stats plus every collection
#[derive(Debug, Clone, PartialEq)]
pub struct FarmState {
    pub player: Player,
    pub rows: usize,
    pub cols: usize,
    pub tasks: Vec<Task>,
    pub habits: Vec<Habit>,
    pub tags: Vec<Tag>,
    pub field: Vec<Bed>,
    pub inventory_seeds: Vec<SeedStack>,
    pub shop_items: Vec<ShopListing>,
}

impl FarmState {
    /// Empty farm with a `rows` x `cols` grid; only the first bed is unlocked
    pub fn new(rows: usize, cols: usize) -> Self {
        let field = (0..rows * cols)
            .map(|i| Bed {
                id: i as EntityId + 1,
                plant: None,
                is_lock: i > 0,
            })
            .collect();

        Self {
            player: Player::new(),
            rows,
            cols,
            tasks: Vec::new(),
            habits: Vec::new(),
            tags: Vec::new(),
            field,
            inventory_seeds: Vec::new(),
            shop_items: Vec::new(),
        }
    }
}

/// Injectable state container. All mutation goes through its operations.
///
/// Operations that talk to the server come in two halves: the synchronous
/// half (`toggle_task`, `harvest_plant`, ...) applies the change and returns a
/// [`Pending`]; [`FarmStore::settle`] takes the remote result and either
/// confirms or rolls back. [`crate::FarmClient`] chains the two.
#[derive(Debug, Clone)]
pub struct FarmStore {
    state: FarmState,
    ids: ProvisionalIds,
    activity: ActivityLedger,
    notices: Vec<Notice>,
}

impl FarmStore {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            state: FarmState::new(rows, cols),
            ids: ProvisionalIds::new(),
            activity: ActivityLedger::default(),
            notices: Vec::new(),
        }
    }

    pub fn from_config(config: &FarmConfig) -> Self {
        Self::new(config.grid.rows, config.grid.cols)
    }

    /// Start from an existing state
    pub fn with_state(state: FarmState) -> Self {
        Self {
            state,
            ids: ProvisionalIds::new(),
            activity: ActivityLedger::default(),
            notices: Vec::new(),
        }
    }

    pub fn state(&self) -> &FarmState {
        &self.state
    }

    pub fn player(&self) -> &Player {
        &self.state.player
    }

    /// Take the notices queued since the last call
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn set_drought(&mut self, is_drought: bool) {
        self.state.player.is_drought = is_drought;
    }

    // ========================================================================
    // Sync
    // ========================================================================

    /// Replace local state with a server snapshot, re-deriving the level fields
    pub fn apply_snapshot(&mut self, snapshot: FarmSnapshot) {
        let state = &mut self.state;

        state.player = Player::from_totals(
            snapshot.current_xp,
            snapshot.coins,
            snapshot.streak,
            snapshot.did_task_today,
            snapshot.is_drought,
        );

        replace_if_present(&mut state.tasks, snapshot.tasks);
        replace_if_present(&mut state.habits, snapshot.habits);
        replace_if_present(&mut state.tags, snapshot.tags);
        replace_if_non_empty(&mut state.field, snapshot.field, Bed::collection_name());
        replace_if_non_empty(
            &mut state.inventory_seeds,
            snapshot.inventory_seeds,
            SeedStack::collection_name(),
        );
        replace_if_non_empty(&mut state.shop_items, snapshot.shop_items, "shop_items");
        self.activity.rebase(activity_marks(&state.player));

        if state.field.len() != state.rows * state.cols {
            warn!(
                beds = state.field.len(),
                rows = state.rows,
                cols = state.cols,
                "Field size does not match the grid"
            );
        }

        info!(
            xp = state.player.current_xp,
            level = state.player.current_level,
            tasks = state.tasks.len(),
            habits = state.habits.len(),
            tags = state.tags.len(),
            beds = state.field.len(),
            seeds = state.inventory_seeds.len(),
            shop_items = state.shop_items.len(),
            "Applied server snapshot"
        );
    }

    /// Decode, validate and apply a snapshot. On error nothing changes.
    pub fn sync_from_json(&mut self, json: &str) -> Result<(), SnapshotError> {
        let snapshot = FarmSnapshot::from_json(json)?;
        self.apply_snapshot(snapshot);
        Ok(())
    }

    // ========================================================================
    // Settling
    // ========================================================================

    /// Finish a pending mutation with the result of its remote call
    pub fn settle(&mut self, pending: Pending, result: Result<RemoteReply>) -> Outcome {
        let Pending {
            action,
            call,
            undo,
            marks,
        } = pending;

        match result {
            Ok(reply) => {
                debug!(%action, ?call, "Remote call confirmed");
                if marks.is_some() {
                    self.activity.settle(true);
                }
                self.confirm(call, undo, reply);
                Outcome::Confirmed
            }
            Err(err) => {
                warn!(%action, ?call, error = %err, "Remote call failed, rolling back");
                let marks = marks.and_then(|_| {
                    let restore = self.activity.settle(false);
                    if restore.is_none() {
                        let in_flight = self.activity.in_flight();
                        debug!(in_flight, "Other toggles in flight, activity kept");
                    }
                    restore
                });
                mutation::rollback(&mut self.state, undo, marks);
                self.notices.push(Notice::Failed(action));
                Outcome::RolledBack(action)
            }
        }
    }

    fn confirm(&mut self, call: RemoteCall, undo: Undo, reply: RemoteReply) {
        match (call, reply) {
            (_, RemoteReply::Created(durable)) => match undo {
                Undo::Discard { collection, id } => self.adopt_id(collection, id, durable),
                other => warn!(?other, "Created reply without a provisional entity"),
            },
            (_, RemoteReply::Completion(reward)) => self.apply_completion(reward),
            (RemoteCall::PlantSeed { bed_id, .. }, RemoteReply::Planted(plant)) => {
                match record::find_mut(&mut self.state.field, bed_id) {
                    Some(bed) if bed.plant.is_none() => bed.plant = Some(plant),
                    Some(_) => warn!(bed_id, "Bed filled meanwhile, planted crop dropped"),
                    None => warn!(bed_id, "Bed gone, planted crop dropped"),
                }
            }
            (_, RemoteReply::Harvested(reward)) => self.apply_harvest(reward),
            (RemoteCall::Buy { listing }, RemoteReply::Ack) => self.complete_purchase(listing),
            _ => {}
        }
    }

    fn adopt_id(&mut self, collection: Collection, provisional: EntityId, durable: EntityId) {
        let found = match collection {
            Collection::Tasks => record::rekey(&mut self.state.tasks, provisional, durable),
            Collection::Habits => record::rekey(&mut self.state.habits, provisional, durable),
            Collection::Tags => {
                let found = record::rekey(&mut self.state.tags, provisional, durable);
                let tag = record::find(&self.state.tags, durable).cloned();
                let tasks = record::tagged_with(&self.state.tasks, provisional);
                let habits = record::tagged_with(&self.state.habits, provisional);
                record::retag(&mut self.state.tasks, &tasks, tag.as_ref());
                record::retag(&mut self.state.habits, &habits, tag.as_ref());
                found
            }
        };

        if !found {
            debug!(?collection, provisional, durable, "Provisional entity gone before id arrived");
        }
    }

    fn apply_completion(&mut self, reward: CompletionReward) {
        self.state.player.apply_xp_delta(reward.xp_earned);
        if reward.xp_earned > 0 {
            self.notices.push(Notice::Reward {
                xp: reward.xp_earned.unsigned_abs(),
                coins: 0,
            });
        }

        if reward.plants_grown > 0 {
            self.advance_growth();
        }
    }

    fn apply_harvest(&mut self, reward: HarvestReward) {
        let player = &mut self.state.player;
        player.grant_xp(reward.xp_earned);
        player.grant_coins(reward.gold_earned);

        if reward.xp_earned > 0 || reward.gold_earned > 0 {
            self.notices.push(Notice::Reward {
                xp: reward.xp_earned,
                coins: reward.gold_earned,
            });
        }
    }

    fn complete_purchase(&mut self, listing: ShopListing) {
        self.state.player.spend_coins(listing.cost);

        match listing.kind {
            GoodKind::Seed => match listing.seed_payload.clone() {
                Some(seed) => self.add_seed_to_inventory(seed),
                None => warn!(id = listing.id, "Seed listing without a seed"),
            },
            GoodKind::Bed => {
                if let Err(rejection) = self.unlock_next_bed() {
                    warn!(%rejection, "Bought a bed with nothing to unlock");
                }
            }
        }

        if let Err(rejection) = self.decrease_shop_item(listing.kind, listing.id) {
            debug!(%rejection, "Listing already gone");
        }
        info!(kind = ?listing.kind, id = listing.id, cost = listing.cost, "Purchase complete");
    }

    /// Record a completion toggle on the player: ends a drought and counts
    /// the streak once per day. Returns the fields as they were.
    fn mark_activity(&mut self) -> ActivityMarks {
        let marks = activity_marks(&self.state.player);
        self.activity.begin(marks);

        let after = marks.after_activity();
        let player = &mut self.state.player;
        player.streak = after.streak;
        player.did_task_today = after.did_task_today;
        player.is_drought = after.is_drought;

        marks
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    pub fn toggle_task(&mut self, id: EntityId) -> Result<Pending, Rejection> {
        let index = record::position(&self.state.tasks, id).ok_or_else(|| not_found::<Task>(id))?;
        let marks = self.mark_activity();

        let task = &mut self.state.tasks[index];
        let before = task.clone();
        task.done = !task.done;
        debug!(id, done = task.done, "Toggled task");

        let call = RemoteCall::SetTaskDone { id, done: task.done };
        Ok(Pending::new(ActionKind::Toggle, call, Undo::Task(before)).with_marks(marks))
    }

    pub fn add_task(&mut self, draft: TaskDraft) -> Pending {
        let id = self.ids.next_after(self.state.tasks.iter().map(Entity::id));
        self.state.tasks.push(draft.clone().into_task(id));
        debug!(id, title = %draft.title, "Added task");

        let undo = Undo::Discard {
            collection: Collection::Tasks,
            id,
        };
        Pending::new(ActionKind::Add, RemoteCall::CreateTask(draft), undo)
    }

    pub fn edit_task(&mut self, id: EntityId, draft: TaskDraft) -> Result<Pending, Rejection> {
        let task = record::find_mut(&mut self.state.tasks, id)
            .ok_or_else(|| not_found::<Task>(id))?;
        let before = task.clone();

        task.title = draft.title;
        task.description = draft.description;
        task.difficulty = draft.difficulty;
        task.date = draft.date;
        task.tag = draft.tag;
        debug!(id, "Edited task");

        let call = RemoteCall::UpdateTask(task.clone());
        Ok(Pending::new(ActionKind::Edit, call, Undo::Task(before)))
    }

    pub fn remove_task(&mut self, id: EntityId) -> Result<Pending, Rejection> {
        let (index, task) = record::remove(&mut self.state.tasks, id)
            .ok_or_else(|| not_found::<Task>(id))?;
        debug!(id, "Removed task");

        let undo = Undo::ReinsertTask { index, task };
        Ok(Pending::new(ActionKind::Delete, RemoteCall::DeleteTask(id), undo))
    }

    // ========================================================================
    // Habits
    // ========================================================================

    /// Completing bumps `count`; undoing lowers it, never below zero
    pub fn toggle_habit(&mut self, id: EntityId) -> Result<Pending, Rejection> {
        let index = record::position(&self.state.habits, id).ok_or_else(|| not_found::<Habit>(id))?;
        let marks = self.mark_activity();

        let habit = &mut self.state.habits[index];
        let before = habit.clone();
        habit.done = !habit.done;
        habit.count = if habit.done {
            habit.count.saturating_add(1)
        } else {
            habit.count.saturating_sub(1)
        };
        debug!(id, done = habit.done, count = habit.count, "Toggled habit");

        let call = RemoteCall::SetHabitDone { id, done: habit.done };
        Ok(Pending::new(ActionKind::Toggle, call, Undo::Habit(before)).with_marks(marks))
    }

    pub fn add_habit(&mut self, draft: HabitDraft) -> Pending {
        let id = self.ids.next_after(self.state.habits.iter().map(Entity::id));
        self.state.habits.push(draft.clone().into_habit(id));
        debug!(id, title = %draft.title, "Added habit");

        let undo = Undo::Discard {
            collection: Collection::Habits,
            id,
        };
        Pending::new(ActionKind::Add, RemoteCall::CreateHabit(draft), undo)
    }

    pub fn edit_habit(&mut self, id: EntityId, draft: HabitDraft) -> Result<Pending, Rejection> {
        let habit = record::find_mut(&mut self.state.habits, id)
            .ok_or_else(|| not_found::<Habit>(id))?;
        let before = habit.clone();

        habit.title = draft.title;
        habit.description = draft.description;
        habit.difficulty = draft.difficulty;
        habit.period = draft.period;
        habit.every = draft.every;
        habit.start_date = draft.start_date;
        habit.tag = draft.tag;
        debug!(id, "Edited habit");

        let call = RemoteCall::UpdateHabit(habit.clone());
        Ok(Pending::new(ActionKind::Edit, call, Undo::Habit(before)))
    }

    pub fn remove_habit(&mut self, id: EntityId) -> Result<Pending, Rejection> {
        let (index, habit) = record::remove(&mut self.state.habits, id)
            .ok_or_else(|| not_found::<Habit>(id))?;
        debug!(id, "Removed habit");

        let undo = Undo::ReinsertHabit { index, habit };
        Ok(Pending::new(ActionKind::Delete, RemoteCall::DeleteHabit(id), undo))
    }

    // ========================================================================
    // Tags
    // ========================================================================

    pub fn create_tag(&mut self, name: &str, color: &str) -> Pending {
        let id = self.ids.next_after(self.state.tags.iter().map(Entity::id));
        self.state.tags.push(Tag {
            id,
            name: name.to_string(),
            color: color.to_string(),
        });
        debug!(id, name, "Created tag");

        let call = RemoteCall::CreateTag {
            name: name.to_string(),
            color: color.to_string(),
        };
        let undo = Undo::Discard {
            collection: Collection::Tags,
            id,
        };
        Pending::new(ActionKind::Add, call, undo)
    }

    /// Rename/recolor a tag, including the copies embedded in tasks and habits
    pub fn update_tag(
        &mut self,
        id: EntityId,
        name: &str,
        color: &str,
    ) -> Result<Pending, Rejection> {
        let before = record::find(&self.state.tags, id)
            .cloned()
            .ok_or_else(|| not_found::<Tag>(id))?;
        let updated = Tag {
            id,
            name: name.to_string(),
            color: color.to_string(),
        };

        let tasks = record::tagged_with(&self.state.tasks, id);
        let habits = record::tagged_with(&self.state.habits, id);
        record::replace(&mut self.state.tags, updated.clone());
        record::retag(&mut self.state.tasks, &tasks, Some(&updated));
        record::retag(&mut self.state.habits, &habits, Some(&updated));
        debug!(id, name, tasks = tasks.len(), habits = habits.len(), "Updated tag");

        let undo = Undo::Tag {
            tag: before,
            index: None,
            tasks,
            habits,
        };
        Ok(Pending::new(ActionKind::Edit, RemoteCall::UpdateTag(updated), undo))
    }

    /// Delete a tag and clear it from every task and habit that carries it
    pub fn delete_tag(&mut self, id: EntityId) -> Result<Pending, Rejection> {
        let (index, tag) = record::remove(&mut self.state.tags, id)
            .ok_or_else(|| not_found::<Tag>(id))?;

        let tasks = record::tagged_with(&self.state.tasks, id);
        let habits = record::tagged_with(&self.state.habits, id);
        record::retag(&mut self.state.tasks, &tasks, None);
        record::retag(&mut self.state.habits, &habits, None);
        debug!(id, tasks = tasks.len(), habits = habits.len(), "Deleted tag");

        let undo = Undo::Tag {
            tag,
            index: Some(index),
            tasks,
            habits,
        };
        Ok(Pending::new(ActionKind::Delete, RemoteCall::DeleteTag(id), undo))
    }

    // ========================================================================
    // Farm
    // ========================================================================

    /// Unlock the first locked bed in grid order
    pub fn unlock_next_bed(&mut self) -> Result<EntityId, Rejection> {
        let bed = self
            .state
            .field
            .iter_mut()
            .find(|bed| bed.is_lock)
            .ok_or(Rejection::NothingToUnlock)?;

        bed.is_lock = false;
        info!(bed_id = bed.id, "Unlocked bed");
        Ok(bed.id)
    }

    /// Take one seed of template `seed_id` from the inventory and plant it in `bed_id`.
    /// The bed is filled once the server returns the plant.
    pub fn plant_seed(
        &mut self,
        bed_id: EntityId,
        seed_id: EntityId,
    ) -> Result<Pending, Rejection> {
        let index = self
            .state
            .inventory_seeds
            .iter()
            .position(|stack| stack.seed_template_id == seed_id && stack.quantity > 0)
            .ok_or(Rejection::NoSeeds { seed_id })?;

        let bed = record::find(&self.state.field, bed_id).ok_or_else(|| not_found::<Bed>(bed_id))?;
        if bed.is_lock {
            return Err(Rejection::BedLocked { bed_id });
        }
        if bed.plant.is_some() {
            return Err(Rejection::BedOccupied { bed_id });
        }

        let stack = self.state.inventory_seeds[index].clone();
        self.state.inventory_seeds[index].quantity -= 1;
        self.state.inventory_seeds.retain(|s| s.quantity > 0);
        debug!(bed_id, seed_id, left = stack.quantity - 1, "Planting seed");

        let undo = Undo::ReturnSeed { index, stack };
        Ok(Pending::new(ActionKind::Plant, RemoteCall::PlantSeed { bed_id, seed_id }, undo))
    }

    /// Clear a fully grown plant; rewards arrive with the server's answer
    pub fn harvest_plant(&mut self, bed_id: EntityId) -> Result<Pending, Rejection> {
        let bed = record::find_mut(&mut self.state.field, bed_id)
            .ok_or_else(|| not_found::<Bed>(bed_id))?;
        let plant = bed.plant.as_ref().ok_or(Rejection::BedEmpty { bed_id })?;
        if !plant.is_grown() {
            return Err(Rejection::PlantNotReady {
                bed_id,
                current: plant.current_growth,
                target: plant.target_growth,
            });
        }

        let plant = bed.plant.take().ok_or(Rejection::BedEmpty { bed_id })?;
        debug!(bed_id, plant_id = plant.id, "Harvesting");

        let call = RemoteCall::Harvest { plant_id: plant.id };
        Ok(Pending::new(ActionKind::Harvest, call, Undo::Plant { bed_id, plant }))
    }

    /// Grow every planted crop by one unit unless there is a drought
    pub fn advance_growth(&mut self) -> usize {
        growth::advance(&mut self.state.field, self.state.player.is_drought)
    }

    /// Add one seed: bumps the stack of the same template or starts a new one
    pub fn add_seed_to_inventory(&mut self, seed: SeedStack) {
        let seeds = &mut self.state.inventory_seeds;
        match seeds.iter_mut().find(|s| s.seed_template_id == seed.seed_template_id) {
            Some(stack) => stack.quantity += 1,
            None => seeds.push(SeedStack { quantity: 1, ..seed }),
        }
    }

    // ========================================================================
    // Shop
    // ========================================================================

    /// Check the player can afford a listing. Nothing changes until the server
    /// confirms the purchase; then coins, inventory or beds, and the listing update.
    pub fn buy_item(&mut self, kind: GoodKind, id: EntityId) -> Result<Pending, Rejection> {
        let listing = self
            .state
            .shop_items
            .iter()
            .find(|item| item.kind == kind && item.id == id)
            .cloned()
            .ok_or(Rejection::ListingNotFound { kind, id })?;

        let have = self.state.player.coins;
        if have < listing.cost {
            return Err(Rejection::InsufficientCoins { have, cost: listing.cost });
        }

        Ok(Pending::new(ActionKind::Buy, RemoteCall::Buy { listing }, Undo::Nothing))
    }

    /// Take one unit off a listing, removing it at zero
    pub fn decrease_shop_item(&mut self, kind: GoodKind, id: EntityId) -> Result<(), Rejection> {
        let index = self
            .state
            .shop_items
            .iter()
            .position(|item| item.kind == kind && item.id == id)
            .ok_or(Rejection::ListingNotFound { kind, id })?;

        let item = &mut self.state.shop_items[index];
        if item.quantity <= 1 {
            self.state.shop_items.remove(index);
        } else {
            item.quantity -= 1;
        }
        Ok(())
    }

    pub fn remove_shop_item(&mut self, kind: GoodKind, id: EntityId) -> Result<(), Rejection> {
        let before = self.state.shop_items.len();
        self.state.shop_items.retain(|item| !(item.kind == kind && item.id == id));

        if self.state.shop_items.len() == before {
            return Err(Rejection::ListingNotFound { kind, id });
        }
        Ok(())
    }
}

fn activity_marks(player: &Player) -> ActivityMarks {
    ActivityMarks {
        streak: player.streak,
        did_task_today: player.did_task_today,
        is_drought: player.is_drought,
    }
}

fn not_found<T: Entity>(id: EntityId) -> Rejection {
    Rejection::NotFound {
        collection: T::collection_name(),
        id,
    }
}

/// Take the server's collection when it sent one, even an empty one
fn replace_if_present<T: Entity>(local: &mut Vec<T>, incoming: Option<Vec<T>>) {
    match incoming {
        Some(items) => *local = items,
        None => {
            let collection = T::collection_name();
            debug!(collection, "Snapshot omitted collection, keeping local");
        }
    }
}

/// Take the server's collection only when it is non-empty
fn replace_if_non_empty<T>(local: &mut Vec<T>, incoming: Option<Vec<T>>, collection: &'static str) {
    match incoming {
        Some(items) if !items.is_empty() => *local = items,
        Some(_) => debug!(collection, "Snapshot collection empty, keeping local"),
        None => debug!(collection, "Snapshot omitted collection, keeping local"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Difficulty, Plant, Rarity};
    use eyre::eyre;

    fn draft(title: &str) -> TaskDraft {
        TaskDraft {
            title: title.to_string(),
            description: None,
            difficulty: Difficulty::Normal,
            date: None,
            tag: None,
        }
    }

    fn task(id: EntityId, tag: Option<Tag>) -> Task {
        TaskDraft {
            tag,
            ..draft(&format!("Task {}", id))
        }
        .into_task(id)
    }

    fn habit(id: EntityId, count: u32) -> Habit {
        Habit {
            id,
            title: format!("Habit {}", id),
            description: None,
            difficulty: Difficulty::Easy,
            done: false,
            count,
            period: crate::models::Period::Day,
            every: 1,
            start_date: crate::models::local_now(),
            tag: None,
        }
    }

    fn home() -> Tag {
        Tag {
            id: 7,
            name: "Home".to_string(),
            color: "#10b981".to_string(),
        }
    }

    fn wheat(current_growth: u32) -> Plant {
        Plant {
            id: 40,
            name: "Wheat".to_string(),
            current_growth,
            target_growth: 4,
            image_path_base: "/assets/plants/wheat".to_string(),
        }
    }

    fn seeds(quantity: u32) -> SeedStack {
        SeedStack {
            id: 5,
            name: "Wheat".to_string(),
            icon: String::new(),
            target_growth: 4,
            rarity: Rarity::Common,
            seed_template_id: 1,
            quantity,
        }
    }

    fn failed() -> Result<RemoteReply> {
        Err(eyre!("server unavailable"))
    }

    fn completion(xp_earned: i64, plants_grown: u32) -> Result<RemoteReply> {
        Ok(RemoteReply::Completion(CompletionReward { xp_earned, plants_grown }))
    }

    #[test]
    fn test_new_farm_unlocks_first_bed() {
        let state = FarmState::new(2, 3);
        assert_eq!(state.field.len(), 6);
        assert_eq!(state.field[0].id, 1);
        assert!(!state.field[0].is_lock);
        assert!(state.field[1..].iter().all(|bed| bed.is_lock));
    }

    #[test]
    fn test_two_completions_level_up() {
        let mut store = FarmStore::new(1, 1);
        store.state.tasks = vec![task(1, None), task(2, None)];

        let pending = store.toggle_task(1).unwrap();
        assert!(store.settle(pending, completion(30, 0)).is_confirmed());
        assert_eq!(store.player().current_level, 1);
        assert_eq!(store.player().current_level_xp, 30);

        let pending = store.toggle_task(2).unwrap();
        store.settle(pending, completion(30, 0));
        assert_eq!(store.player().current_xp, 60);
        assert_eq!(store.player().current_level, 2);
        assert_eq!(store.player().current_level_xp, 10);

        let notices = store.drain_notices();
        assert_eq!(notices, vec![Notice::Reward { xp: 30, coins: 0 }; 2]);
        assert!(store.drain_notices().is_empty());
    }

    #[test]
    fn test_failed_toggle_restores_task_and_marks() {
        let mut store = FarmStore::new(1, 1);
        store.state.tasks = vec![task(1, None)];
        store.state.player.streak = 3;
        store.state.player.is_drought = true;

        let pending = store.toggle_task(1).unwrap();
        assert!(store.state().tasks[0].done);
        assert_eq!(store.player().streak, 4);
        assert!(store.player().did_task_today);
        assert!(!store.player().is_drought);

        let outcome = store.settle(pending, failed());
        assert_eq!(outcome, Outcome::RolledBack(ActionKind::Toggle));
        assert!(!store.state().tasks[0].done);
        assert_eq!(store.player().streak, 3);
        assert!(!store.player().did_task_today);
        assert!(store.player().is_drought);
        assert_eq!(store.drain_notices(), vec![Notice::Failed(ActionKind::Toggle)]);
    }

    #[test]
    fn test_streak_counts_once_per_day() {
        let mut store = FarmStore::new(1, 1);
        store.state.tasks = vec![task(1, None), task(2, None)];

        store.toggle_task(1).unwrap();
        store.toggle_task(2).unwrap();
        store.toggle_task(1).unwrap();
        assert_eq!(store.player().streak, 1);
    }

    fn drought_day(store: &mut FarmStore) {
        store.state.tasks = vec![task(1, None), task(2, None)];
        store.state.player.streak = 3;
        store.state.player.is_drought = true;
    }

    #[test]
    fn test_failed_toggle_keeps_activity_of_confirmed_toggle() {
        let mut store = FarmStore::new(1, 1);
        drought_day(&mut store);

        let first = store.toggle_task(1).unwrap();
        let second = store.toggle_task(2).unwrap();
        store.settle(first, failed());
        store.settle(second, completion(10, 0));

        assert!(!store.state().tasks[0].done);
        assert!(store.state().tasks[1].done);
        assert_eq!(store.player().streak, 4);
        assert!(store.player().did_task_today);
        assert!(!store.player().is_drought);
    }

    #[test]
    fn test_late_failure_keeps_activity_of_earlier_confirmation() {
        let mut store = FarmStore::new(1, 1);
        drought_day(&mut store);

        let first = store.toggle_task(1).unwrap();
        let second = store.toggle_task(2).unwrap();
        store.settle(second, completion(10, 0));
        store.settle(first, failed());

        assert!(!store.state().tasks[0].done);
        assert_eq!(store.player().streak, 4);
        assert!(store.player().did_task_today);
        assert!(!store.player().is_drought);
    }

    #[test]
    fn test_all_toggles_failed_restores_activity() {
        let mut store = FarmStore::new(1, 1);
        drought_day(&mut store);

        let first = store.toggle_task(1).unwrap();
        let second = store.toggle_task(2).unwrap();
        store.settle(first, failed());
        assert!(store.player().did_task_today);

        store.settle(second, failed());
        assert_eq!(store.player().streak, 3);
        assert!(!store.player().did_task_today);
        assert!(store.player().is_drought);
    }

    fn habit_draft(title: &str) -> HabitDraft {
        HabitDraft {
            title: title.to_string(),
            description: Some("Before breakfast".to_string()),
            difficulty: Difficulty::Hard,
            period: crate::models::Period::Week,
            every: 2,
            start_date: crate::models::local_now(),
            tag: None,
        }
    }

    #[test]
    fn test_add_habit_adopts_server_id() {
        let mut store = FarmStore::new(1, 1);
        let pending = store.add_habit(habit_draft("Run"));

        let provisional = store.state().habits[0].clone();
        assert_eq!(provisional.count, 0);
        assert!(!provisional.done);

        assert!(store.settle(pending, Ok(RemoteReply::Created(88))).is_confirmed());
        assert_eq!(store.state().habits[0], Habit { id: 88, ..provisional });
    }

    #[test]
    fn test_failed_add_habit_discards() {
        let mut store = FarmStore::new(1, 1);
        store.state.habits = vec![habit(1, 2)];
        let before = store.state().habits.clone();

        let pending = store.add_habit(habit_draft("Run"));
        assert_eq!(store.state().habits.len(), 2);

        assert_eq!(store.settle(pending, failed()), Outcome::RolledBack(ActionKind::Add));
        assert_eq!(store.state().habits, before);
    }

    #[test]
    fn test_failed_edit_habit_restores() {
        let mut store = FarmStore::new(1, 1);
        store.state.habits = vec![habit(1, 2)];
        let before = store.state().habits[0].clone();

        let pending = store.edit_habit(1, habit_draft("Swim")).unwrap();
        let edited = &store.state().habits[0];
        assert_eq!(edited.title, "Swim");
        assert_eq!(edited.every, 2);
        assert_eq!(edited.count, 2);

        assert_eq!(store.settle(pending, failed()), Outcome::RolledBack(ActionKind::Edit));
        assert_eq!(store.state().habits[0], before);
    }

    #[test]
    fn test_failed_remove_habit_reinserts_at_position() {
        let mut store = FarmStore::new(1, 1);
        store.state.habits = vec![habit(1, 0), habit(2, 5), habit(3, 0)];
        let before = store.state().habits.clone();

        let pending = store.remove_habit(2).unwrap();
        assert_eq!(store.state().habits.len(), 2);

        assert_eq!(store.settle(pending, failed()), Outcome::RolledBack(ActionKind::Delete));
        assert_eq!(store.state().habits, before);
    }

    #[test]
    fn test_habit_completion_advances_growth() {
        let mut store = FarmStore::new(1, 1);
        store.state.field[0].plant = Some(wheat(1));
        store.state.habits = vec![habit(1, 0)];

        let pending = store.toggle_habit(1).unwrap();
        store.settle(pending, completion(15, 1));
        assert_eq!(store.player().current_xp, 15);
        assert_eq!(store.state().field[0].plant.as_ref().unwrap().current_growth, 2);
    }

    #[test]
    fn test_add_task_after_max_server_id() {
        let mut store = FarmStore::new(1, 1);
        store.state.tasks = vec![task(EntityId::MAX, None)];

        store.add_task(draft("Dishes"));
        store.add_task(draft("Laundry"));

        let ids: Vec<EntityId> = store.state().tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids[1] < 0 && ids[2] < 0);
        assert_ne!(ids[1], ids[2]);
    }

    #[test]
    fn test_undo_reward_lowers_xp() {
        let mut store = FarmStore::new(1, 1);
        store.state.player.apply_xp(60);
        store.state.tasks = vec![task(1, None)];
        store.state.tasks[0].done = true;

        let pending = store.toggle_task(1).unwrap();
        store.settle(pending, completion(-30, 0));
        assert_eq!(store.player().current_xp, 30);
        assert_eq!(store.player().current_level, 1);
        assert!(store.drain_notices().is_empty());
    }

    #[test]
    fn test_completion_advances_growth_once() {
        let mut store = FarmStore::new(1, 2);
        store.state.field[1].is_lock = false;
        store.state.field[0].plant = Some(wheat(1));
        store.state.field[1].plant = Some(wheat(2));
        store.state.tasks = vec![task(1, None)];

        let pending = store.toggle_task(1).unwrap();
        store.settle(pending, completion(10, 2));
        assert_eq!(store.state().field[0].plant.as_ref().unwrap().current_growth, 2);
        assert_eq!(store.state().field[1].plant.as_ref().unwrap().current_growth, 3);
    }

    #[test]
    fn test_drought_blocks_growth() {
        let mut store = FarmStore::new(1, 1);
        store.state.field[0].plant = Some(wheat(1));
        store.set_drought(true);

        assert_eq!(store.advance_growth(), 0);
        assert_eq!(store.state().field[0].plant.as_ref().unwrap().current_growth, 1);
    }

    #[test]
    fn test_toggle_missing_task_rejected() {
        let mut store = FarmStore::new(1, 1);
        let err = store.toggle_task(99).unwrap_err();
        assert_eq!(err, Rejection::NotFound { collection: "tasks", id: 99 });
        assert_eq!(store.player().streak, 0);
    }

    #[test]
    fn test_habit_count_follows_toggle() {
        let mut store = FarmStore::new(1, 1);
        store.state.habits = vec![habit(1, 0)];

        store.toggle_habit(1).unwrap();
        assert_eq!(store.state().habits[0].count, 1);
        store.toggle_habit(1).unwrap();
        assert_eq!(store.state().habits[0].count, 0);
    }

    #[test]
    fn test_habit_count_never_below_zero() {
        let mut store = FarmStore::new(1, 1);
        let mut done = habit(1, 0);
        done.done = true;
        store.state.habits = vec![done];

        store.toggle_habit(1).unwrap();
        assert_eq!(store.state().habits[0].count, 0);
        assert!(!store.state().habits[0].done);
    }

    #[test]
    fn test_failed_habit_toggle_restores_count() {
        let mut store = FarmStore::new(1, 1);
        store.state.habits = vec![habit(1, 4)];
        let before = store.state().habits[0].clone();

        let pending = store.toggle_habit(1).unwrap();
        assert_eq!(store.state().habits[0].count, 5);

        store.settle(pending, failed());
        assert_eq!(store.state().habits[0], before);
    }

    #[test]
    fn test_add_task_adopts_server_id() {
        let mut store = FarmStore::new(1, 1);
        let pending = store.add_task(draft("Dishes"));

        let provisional = store.state().tasks[0].id;
        assert!(provisional > 0);
        assert_eq!(pending.call, RemoteCall::CreateTask(draft("Dishes")));

        store.settle(pending, Ok(RemoteReply::Created(501)));
        assert_eq!(store.state().tasks[0].id, 501);
        assert_eq!(store.state().tasks[0].title, "Dishes");
    }

    #[test]
    fn test_failed_add_discards_task() {
        let mut store = FarmStore::new(1, 1);
        store.state.tasks = vec![task(1, None)];

        let pending = store.add_task(draft("Dishes"));
        assert_eq!(store.state().tasks.len(), 2);

        assert_eq!(store.settle(pending, failed()), Outcome::RolledBack(ActionKind::Add));
        assert_eq!(store.state().tasks, vec![task(1, None)]);
        assert_eq!(store.drain_notices(), vec![Notice::Failed(ActionKind::Add)]);
    }

    #[test]
    fn test_provisional_ids_unique() {
        let mut store = FarmStore::new(1, 1);
        store.add_task(draft("a"));
        store.add_task(draft("b"));
        assert_ne!(store.state().tasks[0].id, store.state().tasks[1].id);
    }

    #[test]
    fn test_failed_edit_restores_task() {
        let mut store = FarmStore::new(1, 1);
        store.state.tasks = vec![task(1, None)];

        let pending = store.edit_task(1, draft("Laundry")).unwrap();
        assert_eq!(store.state().tasks[0].title, "Laundry");

        store.settle(pending, failed());
        assert_eq!(store.state().tasks[0], task(1, None));
        assert_eq!(store.drain_notices(), vec![Notice::Failed(ActionKind::Edit)]);
    }

    #[test]
    fn test_failed_remove_reinserts_at_position() {
        let mut store = FarmStore::new(1, 1);
        store.state.tasks = vec![task(1, None), task(2, None), task(3, None)];

        let pending = store.remove_task(2).unwrap();
        assert_eq!(store.state().tasks.len(), 2);

        store.settle(pending, failed());
        let ids: Vec<EntityId> = store.state().tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_remove_habit_confirmed() {
        let mut store = FarmStore::new(1, 1);
        store.state.habits = vec![habit(1, 0)];

        let pending = store.remove_habit(1).unwrap();
        assert!(store.settle(pending, Ok(RemoteReply::Ack)).is_confirmed());
        assert!(store.state().habits.is_empty());
    }

    #[test]
    fn test_delete_tag_clears_references() {
        let mut store = FarmStore::new(1, 1);
        store.state.tags = vec![home()];
        store.state.tasks = vec![task(1, Some(home())), task(2, Some(home())), task(3, None)];

        let pending = store.delete_tag(7).unwrap();
        assert!(store.state().tags.is_empty());
        assert!(store.state().tasks.iter().all(|t| t.tag.is_none()));

        store.settle(pending, failed());
        assert_eq!(store.state().tags, vec![home()]);
        assert_eq!(store.state().tasks[0].tag, Some(home()));
        assert_eq!(store.state().tasks[1].tag, Some(home()));
        assert_eq!(store.state().tasks[2].tag, None);
        assert_eq!(store.drain_notices(), vec![Notice::Failed(ActionKind::Delete)]);
    }

    #[test]
    fn test_update_tag_cascades() {
        let mut store = FarmStore::new(1, 1);
        store.state.tags = vec![home()];
        store.state.tasks = vec![task(1, Some(home()))];
        let mut tagged = habit(2, 0);
        tagged.tag = Some(home());
        store.state.habits = vec![tagged];

        let pending = store.update_tag(7, "House", "#000000").unwrap();
        assert_eq!(store.state().tasks[0].tag.as_ref().unwrap().name, "House");
        assert_eq!(store.state().habits[0].tag.as_ref().unwrap().color, "#000000");

        store.settle(pending, failed());
        assert_eq!(store.state().tags, vec![home()]);
        assert_eq!(store.state().tasks[0].tag, Some(home()));
        assert_eq!(store.state().habits[0].tag, Some(home()));
    }

    #[test]
    fn test_created_tag_rekeys_embedded_copies() {
        let mut store = FarmStore::new(1, 1);
        let pending = store.create_tag("Work", "#3b82f6");
        let provisional = store.state().tags[0].clone();

        store.state.tasks = vec![task(1, Some(provisional))];
        store.settle(pending, Ok(RemoteReply::Created(12)));

        assert_eq!(store.state().tags[0].id, 12);
        assert_eq!(store.state().tasks[0].tag.as_ref().unwrap().id, 12);
    }

    #[test]
    fn test_unlock_next_bed_in_order() {
        let mut store = FarmStore::new(1, 3);
        assert_eq!(store.unlock_next_bed(), Ok(2));
        assert_eq!(store.unlock_next_bed(), Ok(3));
        assert_eq!(store.unlock_next_bed(), Err(Rejection::NothingToUnlock));
    }

    #[test]
    fn test_plant_seed_rejections() {
        let mut store = FarmStore::new(1, 2);
        assert_eq!(store.plant_seed(1, 1), Err(Rejection::NoSeeds { seed_id: 1 }));

        store.state.inventory_seeds = vec![seeds(2)];
        assert_eq!(store.plant_seed(2, 1), Err(Rejection::BedLocked { bed_id: 2 }));
        assert_eq!(
            store.plant_seed(9, 1),
            Err(Rejection::NotFound { collection: "field", id: 9 })
        );

        store.state.field[0].plant = Some(wheat(0));
        assert_eq!(store.plant_seed(1, 1), Err(Rejection::BedOccupied { bed_id: 1 }));
        assert_eq!(store.state().inventory_seeds[0].quantity, 2);
    }

    #[test]
    fn test_plant_seed_confirmed() {
        let mut store = FarmStore::new(1, 1);
        store.state.inventory_seeds = vec![seeds(2)];

        let pending = store.plant_seed(1, 1).unwrap();
        assert_eq!(store.state().inventory_seeds[0].quantity, 1);
        assert!(store.state().field[0].plant.is_none());

        store.settle(pending, Ok(RemoteReply::Planted(wheat(0))));
        assert_eq!(store.state().field[0].plant, Some(wheat(0)));
    }

    #[test]
    fn test_failed_plant_returns_last_seed() {
        let mut store = FarmStore::new(1, 1);
        store.state.inventory_seeds = vec![seeds(1)];

        let pending = store.plant_seed(1, 1).unwrap();
        assert!(store.state().inventory_seeds.is_empty());

        assert_eq!(store.settle(pending, failed()), Outcome::RolledBack(ActionKind::Plant));
        assert_eq!(store.state().inventory_seeds, vec![seeds(1)]);
        assert!(store.state().field[0].plant.is_none());
    }

    #[test]
    fn test_harvest_unripe_rejected_without_change() {
        let mut store = FarmStore::new(1, 1);
        store.state.field[0].plant = Some(wheat(3));
        let before = store.state().clone();

        let err = store.harvest_plant(1).unwrap_err();
        assert_eq!(
            err,
            Rejection::PlantNotReady {
                bed_id: 1,
                current: 3,
                target: 4
            }
        );
        assert_eq!(store.state(), &before);
        assert_eq!(store.harvest_plant(2), Err(Rejection::NotFound { collection: "field", id: 2 }));
    }

    #[test]
    fn test_harvest_empty_bed_rejected() {
        let mut store = FarmStore::new(1, 1);
        assert_eq!(store.harvest_plant(1), Err(Rejection::BedEmpty { bed_id: 1 }));
    }

    #[test]
    fn test_harvest_grants_rewards() {
        let mut store = FarmStore::new(1, 1);
        store.state.field[0].plant = Some(wheat(4));

        let pending = store.harvest_plant(1).unwrap();
        assert_eq!(pending.call, RemoteCall::Harvest { plant_id: 40 });
        assert!(store.state().field[0].plant.is_none());

        let reward = HarvestReward {
            xp_earned: 55,
            gold_earned: 8,
        };
        store.settle(pending, Ok(RemoteReply::Harvested(reward)));
        assert_eq!(store.player().current_xp, 55);
        assert_eq!(store.player().current_level, 2);
        assert_eq!(store.player().coins, 8);
        assert_eq!(store.drain_notices(), vec![Notice::Reward { xp: 55, coins: 8 }]);
    }

    #[test]
    fn test_failed_harvest_restores_plant() {
        let mut store = FarmStore::new(1, 1);
        store.state.field[0].plant = Some(wheat(4));

        let pending = store.harvest_plant(1).unwrap();
        store.settle(pending, failed());
        assert_eq!(store.state().field[0].plant, Some(wheat(4)));
        assert_eq!(store.player().coins, 0);
        assert_eq!(store.drain_notices(), vec![Notice::Failed(ActionKind::Harvest)]);
    }

    fn seed_listing(quantity: u32, cost: u64) -> ShopListing {
        ShopListing {
            kind: GoodKind::Seed,
            id: 3,
            quantity,
            cost,
            seed_payload: Some(seeds(0)),
        }
    }

    #[test]
    fn test_buy_insufficient_coins_rejected() {
        let mut store = FarmStore::new(1, 1);
        store.state.player.coins = 5;
        store.state.shop_items = vec![seed_listing(2, 10)];

        let err = store.buy_item(GoodKind::Seed, 3).unwrap_err();
        assert_eq!(err, Rejection::InsufficientCoins { have: 5, cost: 10 });
        assert_eq!(store.player().coins, 5);
        assert_eq!(store.state().shop_items[0].quantity, 2);
    }

    #[test]
    fn test_buy_unknown_listing_rejected() {
        let mut store = FarmStore::new(1, 1);
        store.state.shop_items = vec![seed_listing(1, 10)];
        assert_eq!(
            store.buy_item(GoodKind::Bed, 3),
            Err(Rejection::ListingNotFound {
                kind: GoodKind::Bed,
                id: 3
            })
        );
    }

    #[test]
    fn test_buy_seed_confirmed() {
        let mut store = FarmStore::new(1, 1);
        store.state.player.coins = 25;
        store.state.shop_items = vec![seed_listing(2, 10)];

        let pending = store.buy_item(GoodKind::Seed, 3).unwrap();
        assert_eq!(store.player().coins, 25);

        store.settle(pending, Ok(RemoteReply::Ack));
        assert_eq!(store.player().coins, 15);
        assert_eq!(store.state().inventory_seeds, vec![seeds(1)]);
        assert_eq!(store.state().shop_items[0].quantity, 1);

        let pending = store.buy_item(GoodKind::Seed, 3).unwrap();
        store.settle(pending, Ok(RemoteReply::Ack));
        assert_eq!(store.state().inventory_seeds[0].quantity, 2);
        assert!(store.state().shop_items.is_empty());
    }

    #[test]
    fn test_buy_bed_unlocks() {
        let mut store = FarmStore::new(1, 2);
        store.state.player.coins = 100;
        store.state.shop_items = vec![ShopListing {
            kind: GoodKind::Bed,
            id: 1,
            quantity: 1,
            cost: 100,
            seed_payload: None,
        }];

        let pending = store.buy_item(GoodKind::Bed, 1).unwrap();
        store.settle(pending, Ok(RemoteReply::Ack));
        assert_eq!(store.player().coins, 0);
        assert!(!store.state().field[1].is_lock);
        assert!(store.state().shop_items.is_empty());
    }

    #[test]
    fn test_failed_buy_changes_nothing() {
        let mut store = FarmStore::new(1, 1);
        store.state.player.coins = 25;
        store.state.shop_items = vec![seed_listing(2, 10)];
        let before = store.state().clone();

        let pending = store.buy_item(GoodKind::Seed, 3).unwrap();
        assert_eq!(store.settle(pending, failed()), Outcome::RolledBack(ActionKind::Buy));
        assert_eq!(store.state(), &before);
        assert_eq!(store.drain_notices()[0].to_string(), "Could not buy the item");
    }

    #[test]
    fn test_remove_shop_item() {
        let mut store = FarmStore::new(1, 1);
        store.state.shop_items = vec![seed_listing(5, 10)];
        assert!(store.remove_shop_item(GoodKind::Seed, 3).is_ok());
        assert!(store.remove_shop_item(GoodKind::Seed, 3).is_err());
    }

    #[test]
    fn test_sync_rebuilds_level_fields() {
        let mut store = FarmStore::new(1, 1);
        store
            .sync_from_json(
                r#"{"currentXp": 103, "coins": 4, "strick": 2, "tasks": [], "field": []}"#,
            )
            .unwrap();

        let player = store.player();
        assert_eq!(player.current_level, 3);
        assert_eq!(player.current_level_xp, 0);
        assert_eq!(player.coins, 4);
        assert_eq!(player.streak, 2);
        assert_eq!(store.state().field.len(), 1);
    }

    #[test]
    fn test_sync_keeps_absent_and_empty_collections() {
        let mut store = FarmStore::new(1, 1);
        store.state.tasks = vec![task(1, None)];
        store.state.habits = vec![habit(2, 0)];
        store.state.inventory_seeds = vec![seeds(3)];

        store
            .sync_from_json(r#"{"tasks": [], "inventorySeeds": []}"#)
            .unwrap();

        assert!(store.state().tasks.is_empty());
        assert_eq!(store.state().habits.len(), 1);
        assert_eq!(store.state().inventory_seeds, vec![seeds(3)]);
    }

    #[test]
    fn test_failed_sync_leaves_state() {
        let mut store = FarmStore::new(1, 1);
        store.state.tasks = vec![task(1, None)];
        store.state.player.apply_xp(60);
        let before = store.state().clone();

        assert!(store.sync_from_json(r#"{"currentXp": "lots"}"#).is_err());
        assert_eq!(store.state(), &before);
    }

    #[test]
    fn test_from_config_uses_grid() {
        let mut config = FarmConfig::default();
        config.grid.rows = 2;
        config.grid.cols = 4;

        let store = FarmStore::from_config(&config);
        assert_eq!(store.state().field.len(), 8);
    }
}
