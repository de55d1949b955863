//! The dispatch engine: credit ledger, delivery channel routing, campaign
//! batching, and inbound reply handling.
//!
//! This crate composes the pure logic in `shiftline-core` with the
//! repositories in `shiftline-db`. External providers (SMS, push, distance,
//! reply parsing) are trait objects supplied by the binary; nothing here
//! speaks a vendor wire format.

pub mod campaign;
pub mod channel;
pub mod config;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod providers;
pub mod reply;

pub use campaign::{CampaignDispatcher, CancelOutcome, DispatchSummary, MessageSource};
pub use channel::{DeliveryChannelRouter, DeliveryOutcome};
pub use config::DispatchConfig;
pub use error::DispatchError;
pub use ledger::CreditLedger;
pub use reply::ReplyEngine;
