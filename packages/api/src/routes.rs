pub mod admin;
pub mod codes;
pub mod health;
pub mod orders;
pub mod partners;
pub mod referrals;
