//! # carechain-contracts
//!
//! Shared types, records, and error contracts for the carechain clinical
//! workflow.
//!
//! All crates in the workspace import from here. No workflow logic lives in
//! this crate, only data definitions and error types.

pub mod action;
pub mod audit;
pub mod error;
pub mod facility;
pub mod provider;
pub mod record;
pub mod role;
pub mod routing;
