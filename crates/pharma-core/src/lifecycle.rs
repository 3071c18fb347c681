//! # Sale Lifecycle State Machine
//!
//! Legal transitions of a sale between Pending, Completed and Cancelled.
//!
//! ## Transition Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │                 Finalize(payment)                                       │
//! │   ┌─────────┐ ───────────────────► ┌───────────┐                       │
//! │   │ Pending │                      │ Completed │                       │
//! │   └─────────┘ ◄── (created here)   └───────────┘                       │
//! │        │                                 │                             │
//! │        │ Cancel()                        │ Reverse()                   │
//! │        ▼                                 ▼                             │
//! │   ┌───────────────────────────────────────────┐                       │
//! │   │                Cancelled                  │  (terminal)           │
//! │   └───────────────────────────────────────────┘                       │
//! │                                                                         │
//! │   Everything else is rejected:                                          │
//! │     Completed + Finalize  → AlreadyCompleted                           │
//! │     Completed + Cancel    → AlreadyCompleted (use Reverse instead)     │
//! │     Cancelled + anything  → SaleClosed                                 │
//! │     Pending   + Reverse   → SaleClosed (nothing to refund)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why Pure Functions
//! The transition function is deterministic and side-effect free. The storage
//! layer evaluates it on the row it just read, inside the same transaction
//! that writes the new status, so the check-and-write is atomic. Two
//! concurrent Finalize calls therefore resolve to exactly one winner.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::SaleStatus;

// =============================================================================
// Events
// =============================================================================

/// The three operator actions that can move a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaleEvent {
    /// Checkout: commit the sale and decrement stock.
    Finalize,
    /// Close a pending sale without touching stock.
    Cancel,
    /// Refund a completed sale, restoring stock.
    Reverse,
}

// =============================================================================
// Denial
// =============================================================================

/// A rejected transition: the sale's current status forbids the event.
///
/// Carries no sale id on purpose - the caller that knows the id maps this
/// into [`CoreError::AlreadyCompleted`] or [`CoreError::SaleClosed`] via
/// [`TransitionDenied::into_core_error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionDenied {
    pub from: SaleStatus,
    pub event: SaleEvent,
}

impl TransitionDenied {
    /// Attaches a sale id and produces the caller-facing error.
    ///
    /// A Finalize or Cancel against a Completed sale reports
    /// `AlreadyCompleted` (the fix is Reverse, not retry); everything else
    /// is a generic `SaleClosed` naming the blocking status.
    pub fn into_core_error(self, sale_id: &str) -> CoreError {
        match (self.from, self.event) {
            (SaleStatus::Completed, SaleEvent::Finalize)
            | (SaleStatus::Completed, SaleEvent::Cancel) => {
                CoreError::AlreadyCompleted(sale_id.to_string())
            }
            (from, _) => CoreError::SaleClosed {
                sale_id: sale_id.to_string(),
                status: from,
            },
        }
    }
}

// =============================================================================
// Transition Function
// =============================================================================

impl SaleStatus {
    /// Evaluates one lifecycle event against the current status.
    ///
    /// Returns the target status to write, or a denial describing why the
    /// event is illegal. This function is the single source of truth for
    /// the transition table; no other code compares statuses.
    pub fn transition(self, event: SaleEvent) -> Result<SaleStatus, TransitionDenied> {
        match (self, event) {
            (SaleStatus::Pending, SaleEvent::Finalize) => Ok(SaleStatus::Completed),
            (SaleStatus::Pending, SaleEvent::Cancel) => Ok(SaleStatus::Cancelled),
            (SaleStatus::Completed, SaleEvent::Reverse) => Ok(SaleStatus::Cancelled),
            (from, event) => Err(TransitionDenied { from, event }),
        }
    }

    /// True for statuses with no outgoing transitions at all.
    pub fn is_terminal(self) -> bool {
        self == SaleStatus::Cancelled
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        assert_eq!(
            SaleStatus::Pending.transition(SaleEvent::Finalize),
            Ok(SaleStatus::Completed)
        );
        assert_eq!(
            SaleStatus::Pending.transition(SaleEvent::Cancel),
            Ok(SaleStatus::Cancelled)
        );
        assert_eq!(
            SaleStatus::Completed.transition(SaleEvent::Reverse),
            Ok(SaleStatus::Cancelled)
        );
    }

    #[test]
    fn test_illegal_transitions() {
        // Completed cannot be re-finalized or plain-cancelled
        assert!(SaleStatus::Completed.transition(SaleEvent::Finalize).is_err());
        assert!(SaleStatus::Completed.transition(SaleEvent::Cancel).is_err());

        // Cancelled is terminal for every event
        for event in [SaleEvent::Finalize, SaleEvent::Cancel, SaleEvent::Reverse] {
            assert!(SaleStatus::Cancelled.transition(event).is_err());
        }

        // A pending sale has no stock effect to reverse
        assert!(SaleStatus::Pending.transition(SaleEvent::Reverse).is_err());
    }

    #[test]
    fn test_denial_error_mapping() {
        let denied = SaleStatus::Completed
            .transition(SaleEvent::Finalize)
            .unwrap_err();
        assert!(matches!(
            denied.into_core_error("s1"),
            CoreError::AlreadyCompleted(_)
        ));

        let denied = SaleStatus::Cancelled
            .transition(SaleEvent::Reverse)
            .unwrap_err();
        assert!(matches!(
            denied.into_core_error("s1"),
            CoreError::SaleClosed {
                status: SaleStatus::Cancelled,
                ..
            }
        ));
    }

    #[test]
    fn test_terminal() {
        assert!(SaleStatus::Cancelled.is_terminal());
        assert!(!SaleStatus::Pending.is_terminal());
        assert!(!SaleStatus::Completed.is_terminal());
    }
}
