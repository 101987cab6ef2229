//! Interactive note search.
//!
//! # Responsibility
//! - Provide query APIs over an immutable snapshot of the active set.
//! - Keep ranking and excerpt shaping inside core.

pub mod matcher;
