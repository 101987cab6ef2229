//! Process-level store ownership and storage-root relocation.

pub mod root;

pub use root::{RootManager, RootSwitch};
