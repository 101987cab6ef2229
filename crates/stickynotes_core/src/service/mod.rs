//! Store service: the single writer thread and the handles that talk to it.
//!
//! # Responsibility
//! - Serialize every mutation through one worker per store generation.
//! - Give each surface an independent client handle (message passing only).
//! - Serve reads from an atomically swapped snapshot so they never wait on
//!   the writer.
//!
//! # Invariants
//! - A reply is sent only after the durable write succeeded or failed.
//! - Readers observe a whole pre- or post-mutation snapshot, never a mix.

pub mod client;
pub mod worker;

pub use client::NotesClient;
pub use worker::StoreWorker;
