//! # Governance (ql-02)
//!
//! Shares-weighted multi-signature governance over the entity store.
//!
//! A [`Request`] proposes a new entity on behalf of a [`User`]. Users of the
//! same [`Wallet`] cast [`Vote`]s weighted by their shares. Once the approved
//! shares reach the wallet's `consensus_needed`, the proposed entity is
//! committed through its registered representation; once the disapproved
//! shares reach it, the request is rejected. Either way every vote and the
//! request itself are purged.
//!
//! ```text
//! Request ──propose──→ [requests]
//!    ↑                     │
//!  Vote ──save──→ [votes] ─┴─ tally ──→ commit + purge | purge | pending
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | one vote per (request, voter) | `VoteService::save` intersects the vote indices |
//! | voter and request share a wallet | `Vote::new` |
//! | positive threshold | `WalletSchema::sync` |
//! | votes only on pending requests | `VoteSchema::sync` |

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod service;

pub use domain::{
    NormalizedRequest, NormalizedUser, NormalizedVote, NormalizedWallet, Request, RequestSchema,
    User, UserSchema, Vote, VoteSchema, Wallet, WalletSchema,
};
pub use errors::{GovernanceError, GovernanceResult};
pub use repositories::{RequestRepository, UserRepository, VoteRepository, WalletRepository};
pub use service::{Tally, VoteOutcome, VoteService};
