//! Referral registry domain - accounts and their codes.

mod account;
mod code;
mod errors;

pub use account::{AccountStatus, ReferralAccount};
pub use code::ReferralCode;
pub use errors::RegistryError;
