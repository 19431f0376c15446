//! Use-case services over the task store.
//!
//! # Responsibility
//! - Keep the in-memory board and the store in step.
//! - Derive deadline notices from the board.

pub mod board;
pub mod notifications;
