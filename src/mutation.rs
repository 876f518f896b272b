// Optimistic mutations: capture, apply locally, then confirm or roll back
//
// Every store operation starts synchronously: it validates, captures the
// values it is about to touch into an `Undo`, mutates local state and hands
// back a `Pending`. The caller issues `Pending::call` and passes the result to
// `FarmStore::settle`. Rollback only reads the captured `Undo`, never the
// state as it was when the call started.

use crate::models::{EntityId, GoodKind, Habit, Plant, SeedStack, Tag, Task};
use crate::record;
use crate::remote::RemoteCall;
use crate::store::FarmState;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Category of a player action, used to name failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Add,
    Edit,
    Delete,
    Toggle,
    Buy,
    Plant,
    Harvest,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Add => write!(f, "add"),
            ActionKind::Edit => write!(f, "edit"),
            ActionKind::Delete => write!(f, "delete"),
            ActionKind::Toggle => write!(f, "toggle"),
            ActionKind::Buy => write!(f, "buy"),
            ActionKind::Plant => write!(f, "plant"),
            ActionKind::Harvest => write!(f, "harvest"),
        }
    }
}

/// Operation refused locally before any remote call was made
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("{collection} entry {id} not found")]
    NotFound { collection: &'static str, id: EntityId },

    #[error("Not enough coins: have {have}, need {cost}")]
    InsufficientCoins { have: u64, cost: u64 },

    #[error("No seeds of kind {seed_id} left")]
    NoSeeds { seed_id: EntityId },

    #[error("Bed {bed_id} is occupied")]
    BedOccupied { bed_id: EntityId },

    #[error("Bed {bed_id} is locked")]
    BedLocked { bed_id: EntityId },

    #[error("Bed {bed_id} has nothing to harvest")]
    BedEmpty { bed_id: EntityId },

    #[error("Plant in bed {bed_id} is not fully grown ({current}/{target})")]
    PlantNotReady { bed_id: EntityId, current: u32, target: u32 },

    #[error("Shop has no {kind:?} good {id}")]
    ListingNotFound { kind: GoodKind, id: EntityId },

    #[error("All beds are already unlocked")]
    NothingToUnlock,
}

/// Side-channel message for the player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Reward { xp: u64, coins: u64 },
    Failed(ActionKind),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Reward { xp, coins } => match (*xp > 0, *coins > 0) {
                (true, true) => write!(f, "Received {xp} xp and {coins} coins"),
                (true, false) => write!(f, "Received {xp} xp"),
                _ => write!(f, "Received {coins} coins"),
            },
            Notice::Failed(action) => match action {
                ActionKind::Add => write!(f, "Could not add"),
                ActionKind::Edit => write!(f, "Could not save changes"),
                ActionKind::Delete => write!(f, "Could not delete"),
                ActionKind::Toggle => write!(f, "Could not complete"),
                ActionKind::Buy => write!(f, "Could not buy the item"),
                ActionKind::Plant => write!(f, "Could not plant"),
                ActionKind::Harvest => write!(f, "Could not harvest"),
            },
        }
    }
}

/// Final state of a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Confirmed,
    RolledBack(ActionKind),
    Rejected(Rejection),
}

impl Outcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Outcome::Confirmed)
    }
}

/// Collections that hold provisional entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Tasks,
    Habits,
    Tags,
}

/// Player fields touched by any completion toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityMarks {
    pub streak: u32,
    pub did_task_today: bool,
    pub is_drought: bool,
}

impl ActivityMarks {
    /// Marks after one more completion toggle: drought ends, streak counts once a day
    pub fn after_activity(self) -> Self {
        Self {
            streak: if self.did_task_today {
                self.streak
            } else {
                self.streak.saturating_add(1)
            },
            did_task_today: true,
            is_drought: false,
        }
    }
}

/// Completion toggles still waiting on the server.
///
/// Activity marks are shared by every toggle, so a failed toggle may only
/// restore them once no other toggle is in flight, and then to the marks
/// the confirmed toggles produced.
#[derive(Debug, Clone, Default)]
pub struct ActivityLedger {
    confirmed: Option<ActivityMarks>,
    in_flight: u32,
}

impl ActivityLedger {
    /// Record a toggle about to be applied on top of `current`
    pub fn begin(&mut self, current: ActivityMarks) {
        if self.in_flight == 0 {
            self.confirmed = Some(current);
        }
        self.in_flight += 1;
    }

    /// Record a settled toggle. Returns the marks to restore when this was
    /// the last toggle in flight.
    pub fn settle(&mut self, confirmed: bool) -> Option<ActivityMarks> {
        self.in_flight = self.in_flight.saturating_sub(1);
        if confirmed {
            self.confirmed = self.confirmed.map(ActivityMarks::after_activity);
        }

        if self.in_flight == 0 {
            self.confirmed.take()
        } else {
            None
        }
    }

    /// Server state replaced the player; later restores start from it
    pub fn rebase(&mut self, current: ActivityMarks) {
        if self.in_flight > 0 {
            self.confirmed = Some(current);
        }
    }

    pub fn in_flight(&self) -> u32 {
        self.in_flight
    }
}

/// Pre-mutation values needed to restore state exactly
#[derive(Debug, Clone, PartialEq)]
pub enum Undo {
    /// Drop an entity created under a provisional id
    Discard { collection: Collection, id: EntityId },
    /// Put back the previous value of an edited task
    Task(Task),
    Habit(Habit),
    /// Re-insert a deleted entity at its former position
    ReinsertTask { index: usize, task: Task },
    ReinsertHabit { index: usize, habit: Habit },
    /// Previous tag plus every entity that carried it. `index` is set when the tag was removed.
    Tag {
        tag: Tag,
        index: Option<usize>,
        tasks: Vec<EntityId>,
        habits: Vec<EntityId>,
    },
    /// Give back the seed taken from `stack` (re-creating the stack if it was pruned)
    ReturnSeed { index: usize, stack: SeedStack },
    /// Plant removed from a bed
    Plant { bed_id: EntityId, plant: Plant },
    Nothing,
}

/// A mutation applied locally and awaiting its remote call
#[derive(Debug, Clone, PartialEq)]
pub struct Pending {
    pub action: ActionKind,
    pub call: RemoteCall,
    pub undo: Undo,
    pub marks: Option<ActivityMarks>,
}

impl Pending {
    pub(crate) fn new(action: ActionKind, call: RemoteCall, undo: Undo) -> Self {
        Self {
            action,
            call,
            undo,
            marks: None,
        }
    }

    pub(crate) fn with_marks(mut self, marks: ActivityMarks) -> Self {
        self.marks = Some(marks);
        self
    }
}

/// Restore the captured values into `state`
pub fn rollback(state: &mut FarmState, undo: Undo, marks: Option<ActivityMarks>) {
    if let Some(marks) = marks {
        state.player.streak = marks.streak;
        state.player.did_task_today = marks.did_task_today;
        state.player.is_drought = marks.is_drought;
    }

    match undo {
        Undo::Discard { collection, id } => match collection {
            Collection::Tasks => {
                record::remove(&mut state.tasks, id);
            }
            Collection::Habits => {
                record::remove(&mut state.habits, id);
            }
            Collection::Tags => {
                record::remove(&mut state.tags, id);
                let tasks = record::tagged_with(&state.tasks, id);
                let habits = record::tagged_with(&state.habits, id);
                record::retag(&mut state.tasks, &tasks, None);
                record::retag(&mut state.habits, &habits, None);
            }
        },
        Undo::Task(task) => {
            record::replace(&mut state.tasks, task);
        }
        Undo::Habit(habit) => {
            record::replace(&mut state.habits, habit);
        }
        Undo::ReinsertTask { index, task } => record::reinsert(&mut state.tasks, index, task),
        Undo::ReinsertHabit { index, habit } => record::reinsert(&mut state.habits, index, habit),
        Undo::Tag {
            tag,
            index,
            tasks,
            habits,
        } => {
            match index {
                Some(index) => record::reinsert(&mut state.tags, index, tag.clone()),
                None => {
                    record::replace(&mut state.tags, tag.clone());
                }
            }
            record::retag(&mut state.tasks, &tasks, Some(&tag));
            record::retag(&mut state.habits, &habits, Some(&tag));
        }
        Undo::ReturnSeed { index, stack } => {
            match record::find_mut(&mut state.inventory_seeds, stack.id) {
                Some(current) => current.quantity += 1,
                None => {
                    let returned = SeedStack { quantity: 1, ..stack };
                    record::reinsert(&mut state.inventory_seeds, index, returned);
                }
            }
        }
        Undo::Plant { bed_id, plant } => match record::find_mut(&mut state.field, bed_id) {
            Some(bed) if bed.plant.is_none() => bed.plant = Some(plant),
            Some(_) => debug!(bed_id, "Bed refilled meanwhile, plant not restored"),
            None => debug!(bed_id, "Bed gone, plant not restored"),
        },
        Undo::Nothing => {}
    }
}
