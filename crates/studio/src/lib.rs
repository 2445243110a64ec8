//! `prodgen-studio` library crate.
//!
//! The stateful side of the product detail screen: the generation job
//! controller, the presentation adapter that maps its state to display
//! data, and the staggered download scheduler. The binary entrypoint lives
//! in `main.rs`.

pub mod controller;
pub mod downloads;
pub mod view;
