//! # billswap-types
//!
//! Shared types, errors, and configuration for the **BillSwap** lifecycle
//! engine.
//!
//! This crate is the leaf dependency of the workspace — every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`UserId`], [`BillId`], [`SwapId`], [`TermsId`], [`ProofId`], [`DisputeId`], [`ExtensionId`], [`EventId`]
//! - **Bill model**: [`Bill`], [`BillCategory`], [`BillStatus`]
//! - **Swap model**: [`Swap`], [`SwapType`], [`SwapStatus`], [`SwapSide`], [`FeeState`]
//! - **Terms model**: [`Terms`], [`TermsStatus`], [`FallbackPenalty`]
//! - **Proof model**: [`Proof`], [`ProofKind`], [`ProofStatus`]
//! - **Dispute model**: [`Dispute`], [`DisputeReason`], [`DisputeStatus`]
//! - **Extension model**: [`ExtensionRequest`], [`ExtensionStatus`]
//! - **Trust model**: [`TrustProfile`], [`TrustTier`], [`TierLimits`], [`VerificationFlags`]
//! - **Collateral model**: [`CollateralEntry`]
//! - **Event model**: [`SwapEvent`], [`EventPayload`], [`Actor`]
//! - **Configuration**: [`EngineConfig`]
//! - **Errors**: [`SwapError`] with `BS_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod bill;
pub mod collateral;
pub mod config;
pub mod constants;
pub mod dispute;
pub mod error;
pub mod event;
pub mod extension;
pub mod ids;
pub mod proof;
pub mod swap;
pub mod terms;
pub mod trust;

// Re-export all primary types at crate root for ergonomic imports:
//   use billswap_types::{Swap, SwapStatus, TrustProfile, ...};

pub use bill::*;
pub use collateral::*;
pub use config::*;
pub use dispute::*;
pub use error::*;
pub use event::*;
pub use extension::*;
pub use ids::*;
pub use proof::*;
pub use swap::*;
pub use terms::*;
pub use trust::*;

// Constants are accessed via `billswap_types::constants::FOO`
// (not re-exported to avoid name collisions).
