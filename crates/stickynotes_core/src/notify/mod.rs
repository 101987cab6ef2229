//! Change notification fan-out to connected surfaces.
//!
//! # Responsibility
//! - Deliver one event per successful mutation to every subscriber.
//! - Tell surfaces when their cached state is invalid after a root switch.
//!
//! # Invariants
//! - Publishing never blocks on a slow subscriber.
//! - Events for one note id arrive in the order their mutations completed.
//! - Events are hints; surfaces re-fetch instead of trusting payloads.

pub mod hub;

pub use hub::{ChangeEvent, ChangeHub, ChangeKind, Subscription};
