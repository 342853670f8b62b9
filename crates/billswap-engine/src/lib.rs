//! # billswap-engine
//!
//! **Lifecycle plane**: the swap state machine and everything that feeds
//! it — repository stores with optimistic-version commits, terms
//! negotiation, the deadline sweep, dispute arbitration, the trust-delta
//! idempotency guard, the append-only event log, and the outbound ports
//! to excluded collaborators (notification, chat, fee collection).
//!
//! ## Architecture
//!
//! The [`SwapEngine`] orchestrates one transition at a time:
//! 1. Load the records and validate **everything** up front
//! 2. Commit the swap mutation through an optimistic version check
//! 3. Apply paired ledger effects (bills, collateral, trust — guarded)
//! 4. Append audit events; fire secondary effects that never roll back
//!
//! Time never comes from the ambient clock: every operation takes `now`,
//! and the [`scheduler`] sweep is the only source of time-driven
//! transitions.

pub mod arbiter;
pub mod engine;
pub mod events;
pub mod guard;
pub mod negotiator;
pub mod ports;
pub mod scheduler;
pub mod store;

pub use engine::SwapEngine;
pub use events::EventLog;
pub use guard::{DeltaGuard, Outcome};
pub use negotiator::{TermsNegotiator, TermsOffer};
pub use ports::{
    ChatGateway, FeeCollector, LogChatGateway, LogFeeCollector, LogNotifier, Notifier,
};
pub use scheduler::SweepReport;
pub use store::{BillStore, DisputeStore, ExtensionStore, ProofStore, SwapStore, TermsStore};
