//! Arbitration engine for Homewrecker
//!
//! Decides at boot whether the drives in the system slots are this array's
//! own, in order, under the right chassis.
//!
//! - `quorum`: picks the standard descriptor from divergent replicas
//! - `classify`: labels each system slot
//! - `table`: per-pass system disk table
//! - `reconcile`: chassis replacement and operator intent
//! - `arbitration`: full and early-boot state machines
//! - `homewrecker`: the facade owning collaborators and shared state

#![warn(clippy::all)]

pub mod arbitration;
pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod homewrecker;
mod persist;
pub mod published;
pub mod quorum;
pub mod reconcile;
pub mod table;

pub use arbitration::{MiniVerdict, Verdict};
pub use classify::classify;
pub use config::{ConfigError, HomewreckerConfig};
pub use context::Collaborators;
pub use error::{ArbitrationError, Result};
pub use homewrecker::Homewrecker;
pub use published::PublishedDescriptor;
pub use quorum::{resolve, Resolution, StandardDisk, StandardSource};
pub use reconcile::{ReconcileOutcome, Reconciler};
pub use table::{RecordRead, SlotEntry, SystemDiskTable};
