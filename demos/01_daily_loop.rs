// A day on the farm against an in-memory server
//
// Run with: cargo run --example 01_daily_loop

use async_trait::async_trait;
use eyre::{Result, eyre};
use farmstore::models::{Difficulty, GoodKind, Habit, HabitDraft, Plant, Tag, Task, TaskDraft};
use farmstore::remote::{CompletionReward, HarvestReward};
use farmstore::{EntityId, FarmClient, FarmStore, RemoteApi};
use std::cell::Cell;

const SNAPSHOT: &str = r#"{
    "currentXp": 40,
    "coins": 30,
    "streak": 2,
    "tasks": [
        {"id": 1, "title": "Write report", "difficulty": "hard"},
        {"id": 2, "title": "Water plants", "difficulty": "trifle"}
    ],
    "field": [
        {"id": 1, "isLock": false},
        {"id": 2, "isLock": true},
        {"id": 3, "isLock": true},
        {"id": 4, "isLock": true}
    ],
    "shopItems": [
        {"type": "seed", "id": 8, "quantity": 3, "cost": 10,
         "item": {"id": 8, "name": "Carrot", "targetGrowth": 2, "rarity": "common",
                  "seedTemplateId": 8}}
    ]
}"#;

/// Server that accepts everything except the second task
struct MemoryApi {
    next_id: Cell<EntityId>,
}

#[async_trait(?Send)]
impl RemoteApi for MemoryApi {
    async fn fetch_snapshot(&self) -> Result<String> {
        Ok(SNAPSHOT.to_string())
    }

    async fn create_task(&self, _draft: &TaskDraft) -> Result<EntityId> {
        self.next_id.set(self.next_id.get() + 1);
        Ok(self.next_id.get())
    }

    async fn update_task(&self, _task: &Task) -> Result<()> {
        Ok(())
    }

    async fn delete_task(&self, _id: EntityId) -> Result<()> {
        Ok(())
    }

    async fn set_task_done(&self, id: EntityId, done: bool) -> Result<CompletionReward> {
        if id == 2 {
            return Err(eyre!("503 Service Unavailable"));
        }
        let xp_earned = if done { 30 } else { -30 };
        Ok(CompletionReward {
            xp_earned,
            plants_grown: u32::from(done),
        })
    }

    async fn create_habit(&self, _draft: &HabitDraft) -> Result<EntityId> {
        Err(eyre!("habits are not part of this demo"))
    }

    async fn update_habit(&self, _habit: &Habit) -> Result<()> {
        Ok(())
    }

    async fn delete_habit(&self, _id: EntityId) -> Result<()> {
        Ok(())
    }

    async fn set_habit_done(&self, _id: EntityId, _done: bool) -> Result<CompletionReward> {
        Ok(CompletionReward::default())
    }

    async fn create_tag(&self, _name: &str, _color: &str) -> Result<EntityId> {
        Ok(90)
    }

    async fn update_tag(&self, _tag: &Tag) -> Result<()> {
        Ok(())
    }

    async fn delete_tag(&self, _id: EntityId) -> Result<()> {
        Ok(())
    }

    async fn plant_seed(&self, bed_id: EntityId, seed_id: EntityId) -> Result<Plant> {
        Ok(Plant {
            id: 100 + bed_id,
            name: format!("Seed {}", seed_id),
            current_growth: 0,
            target_growth: 2,
            image_path_base: "/assets/plants/carrot".to_string(),
        })
    }

    async fn harvest(&self, _plant_id: EntityId) -> Result<HarvestReward> {
        Ok(HarvestReward {
            xp_earned: 25,
            gold_earned: 12,
        })
    }

    async fn buy(&self, _good_id: EntityId) -> Result<()> {
        Ok(())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("farmstore=debug").init();

    let client = FarmClient::new(FarmStore::new(2, 2), MemoryApi { next_id: Cell::new(500) });
    client.sync().await?;
    report(&client, "After sync");

    println!("buy carrot seed: {:?}", client.buy_item(GoodKind::Seed, 8).await);
    println!("plant in bed 1:  {:?}", client.plant_seed(1, 8).await);

    let (report_done, water_done) = tokio::join!(client.toggle_task(1), client.toggle_task(2));
    println!("toggle task 1:   {:?}", report_done);
    println!("toggle task 2:   {:?}", water_done);

    let draft = TaskDraft {
        title: "Plan tomorrow".to_string(),
        description: None,
        difficulty: Difficulty::Easy,
        date: Some(farmstore::models::local_now()),
        tag: None,
    };
    println!("add task:        {:?}", client.add_task(draft).await);
    let done = client.toggle_task(501).await;
    println!("toggle task 501: {:?}", done);

    println!("harvest bed 1:   {:?}", client.harvest_plant(1).await);
    report(&client, "End of day");

    for notice in client.drain_notices() {
        println!("notice: {}", notice);
    }
    Ok(())
}

fn report(client: &FarmClient<MemoryApi>, title: &str) {
    let player = client.player();
    println!(
        "{}: level {} ({}/{} xp), {} coins, streak {}",
        title,
        player.current_level,
        player.current_level_xp,
        player.xp_to_next_level,
        player.coins,
        player.streak
    );
}
