//! # Governance Entities
//!
//! | Type | Role |
//! |------|------|
//! | [`Wallet`] | group of users with a shares threshold |
//! | [`User`] | a weighted voter belonging to one wallet |
//! | [`Request`] | a proposed entity awaiting approval |
//! | [`Vote`] | one user's approval or rejection of a request |
//!
//! Each type ships a schema struct implementing both `MetaData` and
//! `Representation`.

pub mod request;
pub mod user;
pub mod vote;
pub mod wallet;

pub use request::{NormalizedRequest, Request, RequestRecord, RequestSchema};
pub use user::{NormalizedUser, User, UserRecord, UserSchema};
pub use vote::{NormalizedVote, Vote, VoteRecord, VoteSchema};
pub use wallet::{NormalizedWallet, Wallet, WalletSchema};
