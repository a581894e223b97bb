//! # Habitforge - Gamified Habit Progression Service
//!
//! Habitforge is the progression-and-economy backend for a habit-tracking
//! game. Users turn real-world habits into quests, spend stamina to accept
//! them, and earn coin and experience on completion. Experience levels up the
//! user's chosen role track; coin buys cosmetic skins from the shop.
//!
//! ## Features
//!
//! - **Quest State Machine**: Accept, complete, or let expire; one active quest per user, with a fixed deadline window and a periodic expiry sweep.
//! - **Stamina Economy**: Acceptance debits stamina; a lazy time-based refill credits it back, capped at the configured maximum.
//! - **Role Progression**: Five independent role tracks leveled by a fixed experience step function; only the active role earns quest experience.
//! - **Shop & Inventory**: Admin-curated skin catalog, coin purchases, one equipped appearance at a time.
//! - **Leaderboards**: Per-role rankings recomputed on demand, with the caller's own rank included even outside the top page.
//! - **Single-Writer Actor**: All mutations flow through one Tokio task, so every operation sees a consistent store.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use habitforge::config::Config;
//! use habitforge::engine::HabitStore;
//! use habitforge::server::{Service, spawn_sweeper};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let store = HabitStore::open(&config.storage.data_dir)?;
//!     let (handle, join) = Service::spawn(store, config.service_config());
//!     spawn_sweeper(handle.clone(), config.sweep);
//!
//!     handle.register_user("principal-a", "alice").await?;
//!     drop(handle);
//!     join.await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - Core game logic: users, quests, economy, shop, leaderboards, and the sled-backed store
//! - [`server`] - The single-writer actor service and the quest-expiry sweep
//! - [`config`] - Configuration management
//! - [`validation`] - Username and quest-field validation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ ServiceHandle   │ ← Cloneable client API (mpsc + oneshot)
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ Engine Actor    │ ← Single task applies mutations in order
//! └─────────────────┘
//!          │
//! ┌─────────────────┐
//! │ HabitStore      │ ← Sled-backed persistence
//! └─────────────────┘
//! ```

pub mod config;
pub mod engine;
pub mod logutil;
pub mod server;
pub mod validation;
