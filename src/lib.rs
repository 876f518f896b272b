// FarmStore - Progression and optimistic-mutation core for a gamified task farm

pub mod client;
pub mod config;
pub mod filter;
pub mod growth;
pub mod http;
pub mod level;
pub mod models;
pub mod mutation;
pub mod record;
pub mod remote;
pub mod reward;
pub mod snapshot;
pub mod store;

// Re-export main types for convenience
pub use client::FarmClient;
pub use config::FarmConfig;
pub use filter::{Completion, Filter};
pub use http::HttpApi;
pub use level::{calculate_level, experience_for_level, total_xp_for_next_level};
pub use models::{EntityId, Player, now_ms};
pub use mutation::{ActionKind, Notice, Outcome, Pending, Rejection};
pub use record::Entity;
pub use remote::{RemoteApi, RemoteCall, RemoteReply};
pub use snapshot::{FarmSnapshot, SnapshotError};
pub use store::{FarmState, FarmStore};
