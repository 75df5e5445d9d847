//! Consumed payment-processor interface
//!
//! The engine only ever needs the outcome of an authorization, never the
//! processor wire detail. Authorization happens strictly before the payment
//! transaction; capture and void happen strictly after, so no network call
//! can ever sit inside a storage transaction.

use async_trait::async_trait;
use shared::money::Money;

/// Outcome of an authorization attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Approved { auth_ref: String },
    Declined { reason: String },
}

/// External payment processor
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Authorize `amount` against an order or split check
    async fn authorize(&self, order_id: &str, amount: Money) -> AuthOutcome;

    /// Capture a previously approved authorization
    async fn capture(&self, auth_ref: &str) -> bool;

    /// Void a previously approved authorization
    async fn void(&self, auth_ref: &str) -> bool;
}

/// Processor that approves everything (cash drawers, development, tests)
#[derive(Debug, Clone, Default)]
pub struct AutoApprove;

#[async_trait]
impl PaymentProcessor for AutoApprove {
    async fn authorize(&self, order_id: &str, amount: Money) -> AuthOutcome {
        tracing::debug!(order_id, amount = %amount, "Auto-approving authorization");
        AuthOutcome::Approved {
            auth_ref: uuid::Uuid::new_v4().to_string(),
        }
    }

    async fn capture(&self, _auth_ref: &str) -> bool {
        true
    }

    async fn void(&self, _auth_ref: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_auto_approve_hands_out_refs() {
        let processor = AutoApprove;
        let outcome = processor.authorize("o1", Money(1000)).await;
        let AuthOutcome::Approved { auth_ref } = outcome else {
            panic!("expected approval");
        };
        assert!(!auth_ref.is_empty());
        assert!(processor.capture(&auth_ref).await);
        assert!(processor.void(&auth_ref).await);
    }
}
