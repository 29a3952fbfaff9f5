//! Trade orchestration: escrow-backed requests, settlement, refunds and disputes.
//!
//! Per (item, buyer) a trade moves through
//!
//! ```text
//! requested -> held -> released
//!                \---> refunded
//!                \---> disputed -> released | refunded
//! ```
//!
//! Each step is one store unit of work; a failure at any point rolls the
//! whole step back and the error names the step that failed.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{TradeError, TradeResult, TradeStep};
pub use manager::TradeManager;
pub use models::{
    Chat, ChatId, ChatOutcome, Escrow, EscrowId, EscrowOutcome, EscrowStatus, EscrowTransition,
    NewEscrow, Resolution, TradeReceipt,
};
