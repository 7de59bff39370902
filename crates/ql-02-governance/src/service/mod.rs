//! Vote Service - weighted consensus over pending requests
//!
//! # State machine (per request)
//!
//! ```text
//! Pending ──approved >= threshold──→ Approved (commit new entity, purge)
//!    │
//!    └─────disapproved >= threshold──→ Rejected (purge)
//! ```
//!
//! Both outcomes purge every vote on the request and the request itself.
//! When the commit fails the request stays pending and a later vote retries
//! it.
//!
//! The threshold and the committed entity always come from the stored
//! request; a vote inlining a different copy is rejected.

use crate::domain::vote::{keyname_by_request, keyname_by_voter};
use crate::domain::{Request, RequestSchema, Vote, VoteSchema};
use crate::errors::{GovernanceError, GovernanceResult};
use ql_01_entity_store::{Entity, EntityError, EntityRegistry, EntityService, MetaData};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a successful vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VoteOutcome {
    /// Neither threshold is reached yet.
    Pending { approved: u64, disapproved: u64 },
    /// The proposed entity was committed and the request purged.
    Approved,
    /// The request was purged without committing.
    Rejected,
}

/// Shares cast on one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub approved: u64,
    pub disapproved: u64,
}

/// Vote Service
///
/// Saves requests and votes through the entity service and resolves a
/// request once its wallet threshold is crossed.
pub struct VoteService {
    service: EntityService,
    registry: Arc<EntityRegistry>,
    requests: RequestSchema,
    votes: VoteSchema,
}

impl VoteService {
    pub fn new(service: EntityService, registry: Arc<EntityRegistry>) -> Self {
        let requests = RequestSchema::new(registry.clone());
        let votes = VoteSchema::new(requests.clone());
        Self {
            service,
            registry,
            requests,
            votes,
        }
    }

    pub fn requests(&self) -> &RequestSchema {
        &self.requests
    }

    pub fn votes(&self) -> &VoteSchema {
        &self.votes
    }

    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.registry
    }

    /// Open a new request.
    pub fn propose(&self, request: &Request) -> GovernanceResult<()> {
        self.service.save(request, &self.requests)?;
        info!(
            request_id = %request.id,
            entity = request.new_entity.type_name(),
            "Request proposed"
        );
        Ok(())
    }

    /// Save a vote and resolve its request when a threshold is reached.
    pub fn save(&self, vote: &Vote) -> GovernanceResult<VoteOutcome> {
        let repository = self.service.repository();

        if repository.exists(&self.votes, &vote.id())? {
            return Err(EntityError::AlreadyExists {
                entity: self.votes.name().to_string(),
                id: vote.id(),
            }
            .into());
        }

        let stored = self.pending_request(vote)?;
        let request = &stored;

        let keys = [keyname_by_request(&request.id), keyname_by_voter(&vote.voter().id)];
        let previous = repository.retrieve_set_by_intersect_keynames(&self.votes, &keys, 0, 1)?;
        if previous.total_amount() > 0 {
            return Err(GovernanceError::DuplicateVote {
                request: request.id,
                voter: vote.voter().id,
            });
        }

        self.service.save(vote, &self.votes)?;

        let tally = self.tally(request)?;
        let threshold = request.consensus_needed();
        debug!(
            request_id = %request.id,
            approved = tally.approved,
            disapproved = tally.disapproved,
            threshold,
            "Tallied votes"
        );

        if tally.approved >= threshold {
            self.registry.save(&self.service, &request.new_entity)?;
            self.purge(request);
            info!(request_id = %request.id, "Request approved");
            return Ok(VoteOutcome::Approved);
        }

        if tally.disapproved >= threshold {
            self.purge(request);
            info!(request_id = %request.id, "Request rejected");
            return Ok(VoteOutcome::Rejected);
        }

        Ok(VoteOutcome::Pending {
            approved: tally.approved,
            disapproved: tally.disapproved,
        })
    }

    /// The stored copy of the request `vote` is cast on.
    fn pending_request(&self, vote: &Vote) -> GovernanceResult<Request> {
        let id = vote.request().id;
        let repository = self.service.repository();
        if !repository.exists(&self.requests, &id)? {
            return Err(GovernanceError::RequestResolved { request: id });
        }
        let stored = repository.retrieve_by_id(&self.requests, &id)?;
        if stored != *vote.request() {
            return Err(GovernanceError::RequestMismatch { request: id });
        }
        Ok(stored)
    }

    /// Sum the voter shares of every vote currently attached to `request`.
    pub fn tally(&self, request: &Request) -> GovernanceResult<Tally> {
        let votes = self.service.repository().retrieve_set_by_keyname(
            &self.votes,
            &keyname_by_request(&request.id),
            0,
            usize::MAX,
        )?;
        Ok(votes
            .instances()
            .iter()
            .fold(Tally::default(), |mut tally, vote| {
                if vote.approved() {
                    tally.approved = tally.approved.saturating_add(vote.voter().shares);
                } else {
                    tally.disapproved = tally.disapproved.saturating_add(vote.voter().shares);
                }
                tally
            }))
    }

    /// Delete every vote on `request` and the request itself. Failures are
    /// logged; the outcome is already decided.
    fn purge(&self, request: &Request) {
        let votes = self.service.repository().retrieve_set_by_keyname(
            &self.votes,
            &keyname_by_request(&request.id),
            0,
            usize::MAX,
        );
        match votes {
            Ok(votes) => {
                for vote in votes.instances() {
                    if let Err(e) = self.service.delete(vote, &self.votes) {
                        warn!(request_id = %request.id, vote_id = %vote.id(), error = %e, "Failed to purge vote");
                    }
                }
            }
            Err(e) => {
                warn!(request_id = %request.id, error = %e, "Failed to list votes for purge");
            }
        }

        if let Err(e) = self.service.delete(request, &self.requests) {
            warn!(request_id = %request.id, error = %e, "Failed to purge request");
        }
    }
}

#[cfg(test)]
mod tests;
