//! `SeaORM` entities for the partner referral and commission ledger.

pub mod commission;
pub mod partner;
pub mod redemption_code;
pub mod referral;
pub mod sea_orm_active_enums;
pub mod withdrawal_request;
