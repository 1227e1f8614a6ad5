//! Ordering coordinator.
//!
//! Adjacent-swap reordering confirmed by the server:
//!
//! ```text
//! Idle --swap(i)--> SwapPending(i, i+1) --confirmed--> Idle (order swapped)
//!                                       --rejected---> Idle (order unchanged)
//! ```
//!
//! One swap is in flight at a time. A request while another is pending is
//! rejected with `SwapInProgress`.

use crate::session::SessionContext;
use std::sync::{Arc, Mutex};
use taskshare_core::TaskApi;
use taskshare_core::error::{Result, TaskShareError};

/// Coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingState {
    Idle,
    /// Waiting for the server to confirm swapping `index` and `index + 1`.
    SwapPending { index: usize },
}

#[derive(Clone)]
pub struct OrderingCoordinator {
    session: SessionContext,
    api: Arc<dyn TaskApi>,
    state: Arc<Mutex<OrderingState>>,
}

impl OrderingCoordinator {
    pub fn new(session: SessionContext, api: Arc<dyn TaskApi>) -> Self {
        Self {
            session,
            api,
            state: Arc::new(Mutex::new(OrderingState::Idle)),
        }
    }

    pub fn state(&self) -> OrderingState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Swaps the tasks at `index` and `index + 1`.
    ///
    /// # Errors
    ///
    /// - `AuthRequired` without a session
    /// - `SwapInProgress` while another swap awaits confirmation
    /// - `OrderMismatch` if `index + 1` is out of range (no server call)
    /// - the server's error if it rejects the swap; the order is unchanged
    pub async fn swap(&self, index: usize) -> Result<()> {
        let ticket = self.session.ticket().await?;
        let _pending = PendingSwap::begin(&self.state, index)?;

        let pair = self
            .session
            .read(|state| {
                let upper = state.tasks.task_at(index)?.id;
                let lower = state.tasks.task_at(index.checked_add(1)?)?.id;
                Some((upper, lower))
            })
            .await;
        let Some((upper, lower)) = pair else {
            return Err(TaskShareError::order_mismatch(format!(
                "no adjacent pair at index {}",
                index
            )));
        };

        tracing::debug!("[Ordering] Swapping tasks {} and {} (index {})", upper, lower, index);

        if let Err(e) = self.api.swap_order(&ticket.token, upper, lower).await {
            tracing::warn!(
                "[Ordering] Swap of tasks {} and {} rejected, order unchanged: {}",
                upper,
                lower,
                e
            );
            return Err(e);
        }

        // The tasks are located by id again: push events may have moved or
        // removed them while the request was in flight.
        self.session
            .write_current(&ticket, |state| {
                let mut ids = state.tasks.ids();
                let a = ids.iter().position(|id| *id == upper);
                let b = ids.iter().position(|id| *id == lower);
                match (a, b) {
                    (Some(a), Some(b)) => {
                        ids.swap(a, b);
                        state.tasks.reorder(&ids)
                    }
                    _ => Err(TaskShareError::order_mismatch(format!(
                        "task {} or {} disappeared before the swap was confirmed",
                        upper, lower
                    ))),
                }
            })
            .await?
    }
}

/// Holds the coordinator in `SwapPending` and returns it to `Idle` on drop.
struct PendingSwap<'a> {
    state: &'a Mutex<OrderingState>,
}

impl<'a> PendingSwap<'a> {
    fn begin(state: &'a Mutex<OrderingState>, index: usize) -> Result<Self> {
        let mut current = state
            .lock()
            .map_err(|_| TaskShareError::order_mismatch("ordering state poisoned"))?;
        if *current != OrderingState::Idle {
            tracing::debug!("[Ordering] Rejecting swap at {}: {:?}", index, *current);
            return Err(TaskShareError::SwapInProgress);
        }
        *current = OrderingState::SwapPending { index };
        Ok(Self { state })
    }
}

impl Drop for PendingSwap<'_> {
    fn drop(&mut self) {
        match self.state.lock() {
            Ok(mut state) => *state = OrderingState::Idle,
            Err(poisoned) => *poisoned.into_inner() = OrderingState::Idle,
        }
    }
}
