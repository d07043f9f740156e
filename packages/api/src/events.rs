//! Outbound events for external collaborators (notifications, analytics).
//!
//! The ledger only guarantees that events follow committed state changes;
//! delivery semantics beyond that belong to whichever publisher backend the
//! binary wires in. The default publisher writes structured log lines,
//! which is also what the tests observe.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::entity::sea_orm_active_enums::WithdrawalStatus;

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PlatformEvent {
    ReferralCreated {
        referral_id: String,
        partner_id: String,
        referred_user_id: String,
        level: i16,
    },
    CommissionConfirmed {
        commission_id: String,
        partner_id: String,
        order_id: String,
        commission_level: i16,
        commission_amount: Decimal,
    },
    WithdrawalResolved {
        request_id: String,
        partner_id: String,
        amount: Decimal,
        status: WithdrawalStatus,
    },
}

impl PlatformEvent {
    /// Stable event name consumed by downstream subscribers.
    pub fn name(&self) -> &'static str {
        match self {
            PlatformEvent::ReferralCreated { .. } => "referral.created",
            PlatformEvent::CommissionConfirmed { .. } => "commission.confirmed",
            PlatformEvent::WithdrawalResolved { .. } => "withdrawal.resolved",
        }
    }
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: PlatformEvent);
}

pub type DynEventPublisher = Arc<dyn EventPublisher>;

/// Default publisher: structured log lines, picked up by whatever ships
/// the service's logs.
#[derive(Debug, Default)]
pub struct TracingPublisher;

#[async_trait]
impl EventPublisher for TracingPublisher {
    async fn publish(&self, event: PlatformEvent) {
        let payload = serde_json::to_string(&event).unwrap_or_default();
        tracing::info!(event = event.name(), payload = %payload, "Platform event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_stable() {
        let event = PlatformEvent::ReferralCreated {
            referral_id: "r1".into(),
            partner_id: "p1".into(),
            referred_user_id: "u1".into(),
            level: 1,
        };
        assert_eq!(event.name(), "referral.created");

        let event = PlatformEvent::WithdrawalResolved {
            request_id: "w1".into(),
            partner_id: "p1".into(),
            amount: Decimal::new(5000, 2),
            status: WithdrawalStatus::Rejected,
        };
        assert_eq!(event.name(), "withdrawal.resolved");
    }

    #[test]
    fn test_event_payload_serializes_flat() {
        let event = PlatformEvent::CommissionConfirmed {
            commission_id: "c1".into(),
            partner_id: "p1".into(),
            order_id: "o1".into(),
            commission_level: 2,
            commission_amount: Decimal::new(3650, 2),
        };
        let value: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["order_id"], "o1");
        assert_eq!(value["commission_amount"], "36.50");
    }
}
