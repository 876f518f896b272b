// Farm client: store plus remote API, running each mutation end to end

use crate::models::{EntityId, GoodKind, HabitDraft, Player, SeedStack, TaskDraft};
use crate::mutation::{Notice, Outcome, Pending, Rejection};
use crate::remote::RemoteApi;
use crate::store::{FarmState, FarmStore};
use eyre::Result;
use std::cell::RefCell;
use tracing::{debug, info};

/// Owns the store and the API it talks to.
///
/// Each mutating method applies its change before returning and hands back a
/// future that performs the single remote call and settles the result. The
/// store is never borrowed across an await, so mutations on different
/// entities can be in flight together.
pub struct FarmClient<A: RemoteApi> {
    store: RefCell<FarmStore>,
    api: A,
}

impl<A: RemoteApi> FarmClient<A> {
    pub fn new(store: FarmStore, api: A) -> Self {
        Self {
            store: RefCell::new(store),
            api,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Read the current state
    pub fn read<R>(&self, f: impl FnOnce(&FarmState) -> R) -> R {
        f(self.store.borrow().state())
    }

    pub fn player(&self) -> Player {
        self.store.borrow().player().clone()
    }

    pub fn drain_notices(&self) -> Vec<Notice> {
        self.store.borrow_mut().drain_notices()
    }

    pub fn into_store(self) -> FarmStore {
        self.store.into_inner()
    }

    /// Fetch the server snapshot and merge it. Local state is untouched on error.
    pub async fn sync(&self) -> Result<()> {
        let json = self.api.fetch_snapshot().await?;
        self.store.borrow_mut().sync_from_json(&json)?;
        info!("Synced with server");
        Ok(())
    }

    fn run(&self, begun: Result<Pending, Rejection>) -> impl Future<Output = Outcome> + '_ {
        async move {
            let pending = match begun {
                Ok(pending) => pending,
                Err(rejection) => {
                    debug!(%rejection, "Rejected locally");
                    return Outcome::Rejected(rejection);
                }
            };

            let result = pending.call.send(&self.api).await;
            self.store.borrow_mut().settle(pending, result)
        }
    }

    pub fn toggle_task(&self, id: EntityId) -> impl Future<Output = Outcome> + '_ {
        let begun = self.store.borrow_mut().toggle_task(id);
        self.run(begun)
    }

    pub fn add_task(&self, draft: TaskDraft) -> impl Future<Output = Outcome> + '_ {
        let begun = self.store.borrow_mut().add_task(draft);
        self.run(Ok(begun))
    }

    pub fn edit_task(&self, id: EntityId, draft: TaskDraft) -> impl Future<Output = Outcome> + '_ {
        let begun = self.store.borrow_mut().edit_task(id, draft);
        self.run(begun)
    }

    pub fn remove_task(&self, id: EntityId) -> impl Future<Output = Outcome> + '_ {
        let begun = self.store.borrow_mut().remove_task(id);
        self.run(begun)
    }

    pub fn toggle_habit(&self, id: EntityId) -> impl Future<Output = Outcome> + '_ {
        let begun = self.store.borrow_mut().toggle_habit(id);
        self.run(begun)
    }

    pub fn add_habit(&self, draft: HabitDraft) -> impl Future<Output = Outcome> + '_ {
        let begun = self.store.borrow_mut().add_habit(draft);
        self.run(Ok(begun))
    }

    pub fn edit_habit(
        &self,
        id: EntityId,
        draft: HabitDraft,
    ) -> impl Future<Output = Outcome> + '_ {
        let begun = self.store.borrow_mut().edit_habit(id, draft);
        self.run(begun)
    }

    pub fn remove_habit(&self, id: EntityId) -> impl Future<Output = Outcome> + '_ {
        let begun = self.store.borrow_mut().remove_habit(id);
        self.run(begun)
    }

    pub fn create_tag(&self, name: &str, color: &str) -> impl Future<Output = Outcome> + '_ {
        let begun = self.store.borrow_mut().create_tag(name, color);
        self.run(Ok(begun))
    }

    pub fn update_tag(
        &self,
        id: EntityId,
        name: &str,
        color: &str,
    ) -> impl Future<Output = Outcome> + '_ {
        let begun = self.store.borrow_mut().update_tag(id, name, color);
        self.run(begun)
    }

    pub fn delete_tag(&self, id: EntityId) -> impl Future<Output = Outcome> + '_ {
        let begun = self.store.borrow_mut().delete_tag(id);
        self.run(begun)
    }

    pub fn plant_seed(
        &self,
        bed_id: EntityId,
        seed_id: EntityId,
    ) -> impl Future<Output = Outcome> + '_ {
        let begun = self.store.borrow_mut().plant_seed(bed_id, seed_id);
        self.run(begun)
    }

    pub fn harvest_plant(&self, bed_id: EntityId) -> impl Future<Output = Outcome> + '_ {
        let begun = self.store.borrow_mut().harvest_plant(bed_id);
        self.run(begun)
    }

    pub fn buy_item(&self, kind: GoodKind, id: EntityId) -> impl Future<Output = Outcome> + '_ {
        let begun = self.store.borrow_mut().buy_item(kind, id);
        self.run(begun)
    }

    pub fn unlock_next_bed(&self) -> Result<EntityId, Rejection> {
        self.store.borrow_mut().unlock_next_bed()
    }

    pub fn advance_growth(&self) -> usize {
        self.store.borrow_mut().advance_growth()
    }

    pub fn add_seed_to_inventory(&self, seed: SeedStack) {
        self.store.borrow_mut().add_seed_to_inventory(seed);
    }

    pub fn set_drought(&self, is_drought: bool) {
        self.store.borrow_mut().set_drought(is_drought);
    }
}
