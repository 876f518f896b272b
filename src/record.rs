// Id-keyed entities and the collection helpers the store mutates them with

use crate::models::{Bed, EntityId, Habit, SeedStack, Tag, Task};

/// Core trait for anything the store keeps in an id-keyed collection
pub trait Entity: Clone {
    /// Unique identifier for this entity
    fn id(&self) -> EntityId;

    /// Replace the identifier (provisional id -> durable id)
    fn set_id(&mut self, id: EntityId);

    /// Collection name used in logs (e.g., "tasks", "tags")
    fn collection_name() -> &'static str
    where
        Self: Sized;
}

/// Entities that may carry an embedded copy of a tag
pub trait Tagged {
    fn tag(&self) -> Option<&Tag>;

    fn set_tag(&mut self, tag: Option<Tag>);

    fn has_tag(&self, tag_id: EntityId) -> bool {
        self.tag().is_some_and(|t| t.id == tag_id)
    }
}

macro_rules! entity {
    ($ty:ty, $name:literal) => {
        impl Entity for $ty {
            fn id(&self) -> EntityId {
                self.id
            }

            fn set_id(&mut self, id: EntityId) {
                self.id = id;
            }

            fn collection_name() -> &'static str {
                $name
            }
        }
    };
}

entity!(Task, "tasks");
entity!(Habit, "habits");
entity!(Tag, "tags");
entity!(Bed, "field");
entity!(SeedStack, "inventory_seeds");

impl Tagged for Task {
    fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    fn set_tag(&mut self, tag: Option<Tag>) {
        self.tag = tag;
    }
}

impl Tagged for Habit {
    fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    fn set_tag(&mut self, tag: Option<Tag>) {
        self.tag = tag;
    }
}

/// Position of the entity with `id`
pub fn position<T: Entity>(items: &[T], id: EntityId) -> Option<usize> {
    items.iter().position(|item| item.id() == id)
}

pub fn find<T: Entity>(items: &[T], id: EntityId) -> Option<&T> {
    items.iter().find(|item| item.id() == id)
}

pub fn find_mut<T: Entity>(items: &mut [T], id: EntityId) -> Option<&mut T> {
    items.iter_mut().find(|item| item.id() == id)
}

/// Replace the entity sharing `value`'s id. Returns false if it is gone.
pub fn replace<T: Entity>(items: &mut [T], value: T) -> bool {
    match find_mut(items, value.id()) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

/// Remove the entity with `id`, returning it with its former position
pub fn remove<T: Entity>(items: &mut Vec<T>, id: EntityId) -> Option<(usize, T)> {
    let index = position(items, id)?;
    Some((index, items.remove(index)))
}

/// Put a removed entity back at (or as close as possible to) its former position.
/// No-op if an entity with the same id is already present.
pub fn reinsert<T: Entity>(items: &mut Vec<T>, index: usize, value: T) {
    if position(items, value.id()).is_some() {
        return;
    }
    let index = index.min(items.len());
    items.insert(index, value);
}

/// Swap a provisional id for the durable one. Returns false if the entity is gone.
pub fn rekey<T: Entity>(items: &mut [T], from: EntityId, to: EntityId) -> bool {
    match find_mut(items, from) {
        Some(item) => {
            item.set_id(to);
            true
        }
        None => false,
    }
}

/// Ids of the entities whose embedded tag is `tag_id`
pub fn tagged_with<T: Entity + Tagged>(items: &[T], tag_id: EntityId) -> Vec<EntityId> {
    items
        .iter()
        .filter(|item| item.has_tag(tag_id))
        .map(|item| item.id())
        .collect()
}

/// Overwrite the embedded tag on every listed entity that still exists
pub fn retag<T: Entity + Tagged>(items: &mut [T], ids: &[EntityId], tag: Option<&Tag>) {
    for item in items.iter_mut().filter(|item| ids.contains(&item.id())) {
        item.set_tag(tag.cloned());
    }
}

/// First id that appears more than once
pub fn duplicate_id<T: Entity>(items: &[T]) -> Option<EntityId> {
    let mut seen = std::collections::HashSet::new();
    items.iter().map(Entity::id).find(|id| !seen.insert(*id))
}
