//! Domain model and pure lifecycle logic for product image generation.
//!
//! Nothing in this crate performs I/O. The HTTP layer lives in
//! `prodgen-client`; the stateful controller and presentation adapter
//! live in `prodgen-studio`.

pub mod download;
pub mod error;
pub mod job;
pub mod logo;
pub mod product;
pub mod template;
pub mod types;
