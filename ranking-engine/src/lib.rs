//! FILENAME: ranking-engine/src/lib.rs
//! Order computation over the ranking data model.
//!
//! Layers:
//! - `table`: the in-memory row source the engine reads from
//! - `engine`: the filter → group → sort → group-sort pass
//! - `view`: the renderable output (ordered groups + ranks)
//!
//! The engine is single-threaded and synchronous; recomputation is not
//! debounced here — callers coalesce dirty notifications and invoke
//! `update_order` when they are ready.

pub mod engine;
pub mod table;
pub mod view;

pub use engine::{compute_order, update_order};
pub use table::LocalTable;
pub use view::RankingView;
