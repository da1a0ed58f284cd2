//! Thornvale library crate: every game module, shared by the binary and
//! the headless integration tests in `tests/`.
//!
//! The binary crate (`main.rs`) adds windowing and runs the app.

pub mod animation;
pub mod audio;
pub mod combat;
pub mod config;
pub mod data;
pub mod dialogue;
pub mod input;
pub mod interact;
pub mod inventory;
pub mod player;
pub mod save;
pub mod shared;
pub mod ui;
pub mod world;
