//! Application layer of the TaskShare client.
//!
//! # Module Structure
//!
//! - `session`: explicit session lifecycle (`SessionContext`)
//! - `reconciler`: commit protocol for local mutations and push events
//! - `ordering`: adjacent-swap reordering
//! - `push_adapter`: push channel to reconciler bridge
//! - `client`: facade wiring the above

pub mod client;
pub mod ordering;
pub mod push_adapter;
pub mod reconciler;
pub mod session;

#[cfg(test)]
mod test_support;

pub use client::TaskShareClient;
pub use ordering::{OrderingCoordinator, OrderingState};
pub use push_adapter::{ChannelStatus, PushChannelAdapter, PushChannelHandle};
pub use reconciler::ChangeReconciler;
pub use session::{SessionContext, SessionState, SessionTicket};
