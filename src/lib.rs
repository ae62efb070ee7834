//! TareBot (workspace facade crate).
//!
//! Re-exports the `tarebot::{adapter,types}` public API; the implementation
//! lives in dedicated crates under `crates/`.

pub use tarebot_adapter as adapter;
pub use tarebot_types as types;
