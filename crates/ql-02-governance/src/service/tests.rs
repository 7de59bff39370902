use super::*;
use crate::domain::{User, UserSchema, Wallet, WalletSchema};
use ql_01_entity_store::{EntityStore, InMemoryEntityStore};
use shared_types::ErrorKind;
use uuid::Uuid;

struct Fixture {
    store: Arc<InMemoryEntityStore>,
    service: EntityService,
    votes: VoteService,
    wallet: Wallet,
}

fn setup(threshold: u64) -> Fixture {
    let store = Arc::new(InMemoryEntityStore::new());
    let service = EntityService::new(store.clone());
    let registry = Arc::new(
        EntityRegistry::builder()
            .register(WalletSchema)
            .unwrap()
            .register(UserSchema)
            .unwrap()
            .build(),
    );
    let wallet = Wallet {
        id: Uuid::new_v4(),
        creator: [1; 32],
        consensus_needed: threshold,
    };
    service.save(&wallet, &WalletSchema).unwrap();
    Fixture {
        store,
        votes: VoteService::new(service.clone(), registry),
        service,
        wallet,
    }
}

fn make_user(fixture: &Fixture, key: u8, shares: u64) -> User {
    let user = User {
        id: Uuid::new_v4(),
        public_key: [key; 32],
        shares,
        wallet: fixture.wallet.clone(),
    };
    fixture.service.save(&user, &UserSchema).unwrap();
    user
}

fn make_proposal() -> Wallet {
    Wallet {
        id: Uuid::new_v4(),
        creator: [9; 32],
        consensus_needed: 3,
    }
}

fn make_request(fixture: &Fixture, from: &User, proposal: &Wallet) -> Request {
    let request = Request {
        id: Uuid::new_v4(),
        from: from.clone(),
        new_entity: fixture.votes.registry().wrap(proposal.clone()).unwrap(),
    };
    fixture.votes.propose(&request).unwrap();
    request
}

fn cast(fixture: &Fixture, request: &Request, voter: &User, approved: bool) -> GovernanceResult<VoteOutcome> {
    let vote = Vote::new(Uuid::new_v4(), request.clone(), voter.clone(), approved)?;
    fixture.votes.save(&vote)
}

fn pending_requests(fixture: &Fixture) -> usize {
    fixture.store.set_len(crate::domain::request::REQUESTS).unwrap()
}

#[test]
fn test_approval_commits_and_purges() {
    let fixture = setup(10);
    let alice = make_user(&fixture, 2, 6);
    let bob = make_user(&fixture, 3, 5);
    let proposal = make_proposal();
    let request = make_request(&fixture, &alice, &proposal);

    let first = cast(&fixture, &request, &alice, true).unwrap();
    assert_eq!(
        first,
        VoteOutcome::Pending {
            approved: 6,
            disapproved: 0
        }
    );
    assert!(!fixture
        .service
        .repository()
        .exists(&WalletSchema, &proposal.id)
        .unwrap());

    let second = cast(&fixture, &request, &bob, true).unwrap();
    assert_eq!(second, VoteOutcome::Approved);

    let repository = fixture.service.repository();
    assert_eq!(repository.retrieve_by_id(&WalletSchema, &proposal.id).unwrap(), proposal);
    assert!(!repository.exists(fixture.votes.requests(), &request.id).unwrap());
    assert_eq!(pending_requests(&fixture), 0);
    assert_eq!(fixture.store.set_len("votes").unwrap(), 0);
}

#[test]
fn test_rejection_purges_without_commit() {
    let fixture = setup(10);
    let alice = make_user(&fixture, 2, 10);
    let proposal = make_proposal();
    let request = make_request(&fixture, &alice, &proposal);

    assert_eq!(cast(&fixture, &request, &alice, false).unwrap(), VoteOutcome::Rejected);

    let repository = fixture.service.repository();
    assert!(!repository.exists(&WalletSchema, &proposal.id).unwrap());
    assert_eq!(pending_requests(&fixture), 0);
    assert_eq!(fixture.store.set_len("votes").unwrap(), 0);
}

#[test]
fn test_second_vote_by_same_voter_is_rejected() {
    let fixture = setup(10);
    let alice = make_user(&fixture, 2, 3);
    let request = make_request(&fixture, &alice, &make_proposal());
    cast(&fixture, &request, &alice, true).unwrap();

    for approved in [true, false] {
        let err = cast(&fixture, &request, &alice, approved).unwrap_err();
        assert!(matches!(err, GovernanceError::DuplicateVote { .. }));
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }
    assert_eq!(
        fixture.votes.tally(&request).unwrap(),
        Tally {
            approved: 3,
            disapproved: 0
        }
    );
}

#[test]
fn test_same_vote_id_is_rejected() {
    let fixture = setup(10);
    let alice = make_user(&fixture, 2, 3);
    let request = make_request(&fixture, &alice, &make_proposal());
    let vote = Vote::new(Uuid::new_v4(), request, alice, true).unwrap();
    fixture.votes.save(&vote).unwrap();

    let err = fixture.votes.save(&vote).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn test_cross_wallet_vote_is_rejected_at_construction() {
    let fixture = setup(10);
    let alice = make_user(&fixture, 2, 3);
    let request = make_request(&fixture, &alice, &make_proposal());
    let outsider = User {
        id: Uuid::new_v4(),
        public_key: [4; 32],
        shares: 100,
        wallet: make_proposal(),
    };

    let err = Vote::new(Uuid::new_v4(), request, outsider, true).unwrap_err();
    assert!(matches!(err, GovernanceError::WalletMismatch { .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_vote_on_resolved_request_is_rejected() {
    let fixture = setup(5);
    let alice = make_user(&fixture, 2, 5);
    let bob = make_user(&fixture, 3, 5);
    let request = make_request(&fixture, &alice, &make_proposal());
    cast(&fixture, &request, &alice, false).unwrap();

    let err = cast(&fixture, &request, &bob, true).unwrap_err();
    assert!(matches!(err, GovernanceError::RequestResolved { .. }));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn test_forged_request_copy_cannot_lower_threshold_or_swap_payload() {
    let fixture = setup(10);
    let alice = make_user(&fixture, 2, 1);
    let proposal = make_proposal();
    let request = make_request(&fixture, &alice, &proposal);

    let mut forged = request.clone();
    forged.from.wallet.consensus_needed = 1;
    forged.new_entity = fixture.votes.registry().wrap(make_proposal()).unwrap();
    let vote = Vote::new(Uuid::new_v4(), forged.clone(), alice.clone(), true).unwrap();

    let err = fixture.votes.save(&vote).unwrap_err();

    assert!(matches!(err, GovernanceError::RequestMismatch { .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);
    let repository = fixture.service.repository();
    assert!(!repository.exists(&WalletSchema, &forged.new_entity.id()).unwrap());
    assert!(!repository.exists(&WalletSchema, &proposal.id).unwrap());
    assert_eq!(pending_requests(&fixture), 1);
    assert_eq!(fixture.store.set_len("votes").unwrap(), 0);
}

#[test]
fn test_failed_commit_leaves_request_pending() {
    let fixture = setup(5);
    let alice = make_user(&fixture, 2, 5);
    let bob = make_user(&fixture, 3, 5);
    let proposal = make_proposal();
    // The proposed entity already exists, so the commit conflicts.
    fixture.service.save(&proposal, &WalletSchema).unwrap();
    let request = make_request(&fixture, &alice, &proposal);

    let err = cast(&fixture, &request, &alice, true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(pending_requests(&fixture), 1);

    // Once the conflict is gone, the next vote retries the commit.
    fixture.service.delete(&proposal, &WalletSchema).unwrap();
    assert_eq!(cast(&fixture, &request, &bob, false).unwrap(), VoteOutcome::Approved);
    assert!(fixture
        .service
        .repository()
        .exists(&WalletSchema, &proposal.id)
        .unwrap());
    assert_eq!(pending_requests(&fixture), 0);
}

#[test]
fn test_request_requires_existing_proposer() {
    let fixture = setup(5);
    let ghost = User {
        id: Uuid::new_v4(),
        public_key: [8; 32],
        shares: 1,
        wallet: fixture.wallet.clone(),
    };
    let request = Request {
        id: Uuid::new_v4(),
        from: ghost,
        new_entity: fixture.votes.registry().wrap(make_proposal()).unwrap(),
    };
    let err = fixture.votes.propose(&request).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
