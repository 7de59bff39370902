//! Votes: one user's weighted approval or rejection of a request.

use super::request::{NormalizedRequest, Request, RequestSchema};
use super::user::{NormalizedUser, User, UserSchema};
use crate::errors::{GovernanceError, GovernanceResult};
use ql_01_entity_store::{
    Entity, EntityError, EntityRepository, EntityResult, EntityService, MetaData, Representation,
};
use serde::{Deserialize, Serialize};
use shared_types::EntityId;

/// Collection of every vote on a pending request.
pub const VOTES: &str = "votes";

/// Index of the votes cast on a request.
pub fn keyname_by_request(request_id: &EntityId) -> String {
    format!("{}:by_request_id:{}", VOTES, request_id)
}

/// Index of the votes cast by a user.
pub fn keyname_by_voter(voter_id: &EntityId) -> String {
    format!("{}:by_voter_id:{}", VOTES, voter_id)
}

/// A vote on a request.
///
/// ## Invariant
///
/// The voter belongs to the wallet the request is pending in. Checked by
/// [`Vote::new`] and again on denormalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Vote {
    id: EntityId,
    request: Request,
    voter: User,
    approved: bool,
}

impl Vote {
    pub fn new(
        id: EntityId,
        request: Request,
        voter: User,
        approved: bool,
    ) -> GovernanceResult<Self> {
        if voter.wallet.id != request.wallet_id() {
            return Err(GovernanceError::WalletMismatch {
                voter_wallet: voter.wallet.id,
                request_wallet: request.wallet_id(),
            });
        }
        Ok(Self {
            id,
            request,
            voter,
            approved,
        })
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn voter(&self) -> &User {
        &self.voter
    }

    pub fn approved(&self) -> bool {
        self.approved
    }
}

impl Entity for Vote {
    fn id(&self) -> EntityId {
        self.id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecord {
    pub id: EntityId,
    pub request_id: EntityId,
    pub voter_id: EntityId,
    pub approved: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedVote {
    pub id: EntityId,
    pub request: NormalizedRequest,
    pub voter: NormalizedUser,
    pub approved: bool,
}

/// Schema of [`Vote`]. Requests are resolved through the embedded
/// [`RequestSchema`].
#[derive(Clone)]
pub struct VoteSchema {
    requests: RequestSchema,
}

impl VoteSchema {
    pub fn new(requests: RequestSchema) -> Self {
        Self { requests }
    }

    pub fn requests(&self) -> &RequestSchema {
        &self.requests
    }

    fn build(&self, id: EntityId, request: Request, voter: User, approved: bool) -> EntityResult<Vote> {
        Vote::new(id, request, voter, approved)
            .map_err(|e| EntityError::validation(self.name(), e.to_string()))
    }
}

impl MetaData for VoteSchema {
    type Entity = Vote;
    type Storable = VoteRecord;
    type Normalized = NormalizedVote;

    fn name(&self) -> &'static str {
        "Vote"
    }

    fn from_storable(&self, repository: &EntityRepository, record: VoteRecord) -> EntityResult<Vote> {
        let request = repository.retrieve_by_id(&self.requests, &record.request_id)?;
        let voter = repository.retrieve_by_id(&UserSchema, &record.voter_id)?;
        self.build(record.id, request, voter, record.approved)
    }

    fn normalize(&self, vote: &Vote) -> EntityResult<NormalizedVote> {
        Ok(NormalizedVote {
            id: vote.id,
            request: self.requests.normalize(&vote.request)?,
            voter: UserSchema.normalize(&vote.voter)?,
            approved: vote.approved,
        })
    }

    fn denormalize(&self, normalized: NormalizedVote) -> EntityResult<Vote> {
        let request = self.requests.denormalize(normalized.request)?;
        let voter = UserSchema.denormalize(normalized.voter)?;
        self.build(normalized.id, request, voter, normalized.approved)
    }
}

impl Representation for VoteSchema {
    type MetaData = Self;

    fn metadata(&self) -> &Self {
        self
    }

    fn to_storable(&self, vote: &Vote) -> EntityResult<VoteRecord> {
        Ok(VoteRecord {
            id: vote.id,
            request_id: vote.request.id,
            voter_id: vote.voter.id,
            approved: vote.approved,
        })
    }

    fn keynames(&self, vote: &Vote) -> EntityResult<Vec<String>> {
        Ok(vec![
            VOTES.to_string(),
            keyname_by_request(&vote.request.id),
            keyname_by_voter(&vote.voter.id),
        ])
    }

    /// A vote is only accepted on a request that is still pending, from a
    /// voter that still exists. Both inlined copies must match the stored
    /// ones, and the stored voter must belong to the stored request's wallet.
    fn sync(&self, service: &EntityService, vote: &Vote) -> EntityResult<()> {
        let repository = service.repository();
        if !repository.exists(&self.requests, &vote.request.id)? {
            return Err(EntityError::conflict(
                self.name(),
                format!("the request {} is already resolved", vote.request.id),
            ));
        }
        if !repository.exists(&UserSchema, &vote.voter.id)? {
            return Err(EntityError::validation(
                self.name(),
                format!("the voter {} does not exist", vote.voter.id),
            ));
        }

        let request = repository.retrieve_by_id(&self.requests, &vote.request.id)?;
        if request != vote.request {
            return Err(EntityError::validation(
                self.name(),
                format!("the request {} differs from the stored one", request.id),
            ));
        }
        let voter = repository.retrieve_by_id(&UserSchema, &vote.voter.id)?;
        if voter != vote.voter {
            return Err(EntityError::validation(
                self.name(),
                format!("the voter {} differs from the stored one", voter.id),
            ));
        }

        self.build(vote.id, request, voter, vote.approved)?;
        Ok(())
    }
}
