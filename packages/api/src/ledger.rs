//! The partner referral and commission ledger.
//!
//! Dependency order, leaves first: `rate_table` is static configuration;
//! `codes` claims single-use codes; `referrals` builds the two-level graph
//! from claims; `commissions` fans qualifying orders out over the graph;
//! `balance` derives what a partner may withdraw; `withdrawals` consumes it;
//! `funnel` reports over the graph and ledger read-only.

pub mod balance;
pub mod codes;
pub mod commissions;
pub mod error;
pub mod funnel;
pub mod rate_table;
pub mod referrals;
pub mod withdrawals;
