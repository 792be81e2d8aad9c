//! # carechain-core
//!
//! The workflow runtime for carechain agents.
//!
//! This crate provides:
//! - The three collaborator traits (`ComputationProvider`, `AdvisoryProvider`, `AuditSink`)
//! - The `SlotRegistry` holding one record slot per agent role
//! - The `TransitionEngine` that validates every request against the routing
//!   table and is the registry's only writer
//!
//! ## Usage
//!
//! ```rust,ignore
//! use carechain_core::{TransitionEngine, traits::{AdvisoryProvider, AuditSink, ComputationProvider}};
//! ```

pub mod engine;
pub mod registry;
pub mod traits;

pub use engine::TransitionEngine;
pub use registry::{Slot, SlotRegistry};
