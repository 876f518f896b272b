// reqwest implementation of the farm API

use crate::config::FarmConfig;
use crate::models::{Difficulty, EntityId, Habit, HabitDraft, Period, Plant, Tag, Task, TaskDraft};
use crate::remote::{CompletionReward, HarvestReward, RemoteApi};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use eyre::{Context, Result};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::time::Duration;
use tracing::debug;

pub const USER_ID_HEADER: &str = "X-User-ID";

/// Body for creating or replacing a task
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskBody<'a> {
    title: &'a str,
    description: &'a str,
    difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    done: Option<bool>,
    date: Option<String>,
    tag_id: Option<EntityId>,
}

impl<'a> TaskBody<'a> {
    fn from_draft(draft: &'a TaskDraft) -> Self {
        Self {
            title: &draft.title,
            description: draft.description.as_deref().unwrap_or_default(),
            difficulty: draft.difficulty,
            done: None,
            date: draft.date.as_ref().map(wire_date),
            tag_id: draft.tag.as_ref().map(|tag| tag.id),
        }
    }

    fn from_task(task: &'a Task) -> Self {
        Self {
            title: &task.title,
            description: task.description.as_deref().unwrap_or_default(),
            difficulty: task.difficulty,
            done: Some(task.done),
            date: task.date.as_ref().map(wire_date),
            tag_id: task.tag.as_ref().map(|tag| tag.id),
        }
    }
}

/// Body for creating or replacing a habit
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HabitBody<'a> {
    title: &'a str,
    description: &'a str,
    difficulty: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    done: Option<bool>,
    count: u32,
    period: Period,
    every: u32,
    start_date: String,
    tag_id: Option<EntityId>,
}

impl<'a> HabitBody<'a> {
    fn from_draft(draft: &'a HabitDraft) -> Self {
        Self {
            title: &draft.title,
            description: draft.description.as_deref().unwrap_or_default(),
            difficulty: draft.difficulty,
            done: None,
            count: 0,
            period: draft.period,
            every: draft.every,
            start_date: wire_date(&draft.start_date),
            tag_id: draft.tag.as_ref().map(|tag| tag.id),
        }
    }

    fn from_habit(habit: &'a Habit) -> Self {
        Self {
            title: &habit.title,
            description: habit.description.as_deref().unwrap_or_default(),
            difficulty: habit.difficulty,
            done: Some(habit.done),
            count: habit.count,
            period: habit.period,
            every: habit.every,
            start_date: wire_date(&habit.start_date),
            tag_id: habit.tag.as_ref().map(|tag| tag.id),
        }
    }
}

#[derive(Debug, Serialize)]
struct TagBody<'a> {
    name: &'a str,
    color: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlantBody {
    cell_number: EntityId,
    seed_id: EntityId,
}

/// Any created entity; only its id is kept
#[derive(Debug, Deserialize)]
struct Created {
    id: EntityId,
}

/// Dates go out as RFC 3339 with the offset they were captured in
fn wire_date(date: &DateTime<FixedOffset>) -> String {
    date.to_rfc3339()
}

/// Farm API over HTTP
pub struct HttpApi {
    client: Client,
    base_url: String,
    user_id: Cell<Option<i64>>,
}

impl HttpApi {
    pub fn new(config: &FarmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .user_agent(concat!("farmstore/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            user_id: Cell::new(config.user_id),
        })
    }

    /// Set the player the following requests are attributed to
    pub fn set_identity(&self, user_id: Option<i64>) {
        self.user_id.set(user_id);
    }

    pub fn identity(&self) -> Option<i64> {
        self.user_id.get()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match self.user_id.get() {
            Some(id) if id > 0 => builder.header(USER_ID_HEADER, id.to_string()),
            _ => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response> {
        let response = builder
            .send()
            .await
            .with_context(|| format!("Request failed: {}", what))?
            .error_for_status()
            .with_context(|| format!("Server rejected {}", what))?;

        debug!(status = %response.status(), what, "Request succeeded");
        Ok(response)
    }

    async fn send_json<T>(&self, builder: RequestBuilder, what: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self.send(builder, what).await?;
        response
            .json()
            .await
            .with_context(|| format!("Unexpected response body for {}", what))
    }
}

#[async_trait(?Send)]
impl RemoteApi for HttpApi {
    async fn fetch_snapshot(&self) -> Result<String> {
        let response = self.send(self.request(Method::GET, "/sync"), "sync").await?;
        response.text().await.context("Failed to read snapshot body")
    }

    async fn create_task(&self, draft: &TaskDraft) -> Result<EntityId> {
        let builder = self.request(Method::POST, "/tasks").json(&TaskBody::from_draft(draft));
        let created: Created = self.send_json(builder, "create task").await?;
        Ok(created.id)
    }

    async fn update_task(&self, task: &Task) -> Result<()> {
        let builder = self
            .request(Method::PUT, &format!("/tasks/{}", task.id))
            .json(&TaskBody::from_task(task));
        self.send(builder, "update task").await?;
        Ok(())
    }

    async fn delete_task(&self, id: EntityId) -> Result<()> {
        self.send(self.request(Method::DELETE, &format!("/tasks/{}", id)), "delete task")
            .await?;
        Ok(())
    }

    async fn set_task_done(&self, id: EntityId, done: bool) -> Result<CompletionReward> {
        let path = format!("/tasks/{}/{}", id, done_segment(done));
        self.send_json(self.request(Method::PATCH, &path), "toggle task").await
    }

    async fn create_habit(&self, draft: &HabitDraft) -> Result<EntityId> {
        let builder = self.request(Method::POST, "/habits").json(&HabitBody::from_draft(draft));
        let created: Created = self.send_json(builder, "create habit").await?;
        Ok(created.id)
    }

    async fn update_habit(&self, habit: &Habit) -> Result<()> {
        let builder = self
            .request(Method::PUT, &format!("/habits/{}", habit.id))
            .json(&HabitBody::from_habit(habit));
        self.send(builder, "update habit").await?;
        Ok(())
    }

    async fn delete_habit(&self, id: EntityId) -> Result<()> {
        self.send(self.request(Method::DELETE, &format!("/habits/{}", id)), "delete habit")
            .await?;
        Ok(())
    }

    async fn set_habit_done(&self, id: EntityId, done: bool) -> Result<CompletionReward> {
        let path = format!("/habits/{}/{}", id, done_segment(done));
        self.send_json(self.request(Method::PATCH, &path), "toggle habit").await
    }

    async fn create_tag(&self, name: &str, color: &str) -> Result<EntityId> {
        let builder = self.request(Method::POST, "/tags").json(&TagBody { name, color });
        let created: Created = self.send_json(builder, "create tag").await?;
        Ok(created.id)
    }

    async fn update_tag(&self, tag: &Tag) -> Result<()> {
        let body = TagBody {
            name: &tag.name,
            color: &tag.color,
        };
        let builder = self.request(Method::PUT, &format!("/tags/{}", tag.id)).json(&body);
        self.send(builder, "update tag").await?;
        Ok(())
    }

    async fn delete_tag(&self, id: EntityId) -> Result<()> {
        self.send(self.request(Method::DELETE, &format!("/tags/{}", id)), "delete tag")
            .await?;
        Ok(())
    }

    async fn plant_seed(&self, bed_id: EntityId, seed_id: EntityId) -> Result<Plant> {
        let body = PlantBody {
            cell_number: bed_id,
            seed_id,
        };
        let builder = self.request(Method::POST, "/user-plants").json(&body);
        self.send_json(builder, "plant seed").await
    }

    async fn harvest(&self, plant_id: EntityId) -> Result<HarvestReward> {
        let path = format!("/user-plants/{}/harvest", plant_id);
        self.send_json(self.request(Method::POST, &path), "harvest").await
    }

    async fn buy(&self, good_id: EntityId) -> Result<()> {
        let path = format!("/goods/{}/buy", good_id);
        self.send(self.request(Method::POST, &path), "buy").await?;
        Ok(())
    }
}

fn done_segment(done: bool) -> &'static str {
    if done { "done" } else { "undone" }
}
