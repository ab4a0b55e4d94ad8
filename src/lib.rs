//! Referral Engine - Commission tracking and payout settlement
//!
//! This crate attributes sales to referring accounts, computes tiered
//! commissions into an immutable ledger, promotes referrers across reward
//! tiers, and settles payouts in idempotent batches.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
