/// LoopRewards wallet service
///
/// Accounts verified by one-time code, simulated wallets with an append-only
/// ledger, coupons, tier upgrades, payouts, and reserve disbursements.

pub mod account;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod mailer;
pub mod metrics;
pub mod models;
pub mod naming;
pub mod rate_limit;
pub mod server;
pub mod store;
pub mod wallet;
