//! Dataflow primitives for reactive state management
//!
//! - **[`Relay`]** - event streaming from UI callbacks into Actors
//! - **[`Actor`]** - single-value reactive state container
//!
//! # Architecture Principles
//!
//! 1. **Event-Source Naming** - Relays follow `{source}_{event}_relay`
//! 2. **No Direct Access** - Actor state is read through signals only
//! 3. **Single Writer** - only the Actor's processor mutates its state

pub mod actor;
pub mod relay;

pub use actor::Actor;
pub use relay::{Relay, relay};
