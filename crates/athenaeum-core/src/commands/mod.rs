//! Commands module - library operations as plain async functions
//!
//! Every mutating command runs as a single unit of work and returns a
//! [`crate::Result`]; the CLI turns that into an [`crate::Outcome`].

pub mod catalog;
pub mod circulation;
pub mod donation;
pub mod events;
pub mod fines;
pub mod help_desk;
pub mod members;
pub mod provision;
