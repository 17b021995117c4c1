//! Core business logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage is reached through the traits in [`import_review::store`], implemented
//! by `tally-db`.
//!
//! # Modules
//!
//! - `import_review` - Statement import, duplicate classification and review

pub mod import_review;
