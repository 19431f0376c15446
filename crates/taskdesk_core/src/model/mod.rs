//! Domain model for the workspace/category/task board.
//!
//! # Responsibility
//! - Define the records mirrored from the task store.
//! - Keep the in-memory tree shape (workspace -> category -> task).
//!
//! # Invariants
//! - Every id is the store-assigned rowid; ids are never invented in memory.
//! - A task belongs to exactly one category, a category to exactly one
//!   workspace.

pub mod board;
pub mod task;
