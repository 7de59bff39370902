//! Typed query helpers over the governance indices.

use crate::domain::{request, user, vote, wallet};
use crate::domain::{
    Request, RequestSchema, User, UserSchema, Vote, VoteSchema, Wallet, WalletSchema,
};
use ql_01_entity_store::{EntityRepository, EntityResult, PartialSet};
use shared_types::{EntityId, PublicKey};

pub struct WalletRepository {
    repository: EntityRepository,
}

impl WalletRepository {
    pub fn new(repository: EntityRepository) -> Self {
        Self { repository }
    }

    pub fn retrieve_by_id(&self, id: &EntityId) -> EntityResult<Wallet> {
        self.repository.retrieve_by_id(&WalletSchema, id)
    }

    pub fn retrieve_set_by_creator(
        &self,
        creator: &PublicKey,
        index: usize,
        amount: usize,
    ) -> EntityResult<PartialSet<Wallet>> {
        self.repository.retrieve_set_by_keyname(
            &WalletSchema,
            &wallet::keyname_by_creator(creator),
            index,
            amount,
        )
    }
}

pub struct UserRepository {
    repository: EntityRepository,
}

impl UserRepository {
    pub fn new(repository: EntityRepository) -> Self {
        Self { repository }
    }

    pub fn retrieve_by_id(&self, id: &EntityId) -> EntityResult<User> {
        self.repository.retrieve_by_id(&UserSchema, id)
    }

    /// The user holding `public_key` inside `wallet_id`.
    pub fn retrieve_by_public_key_and_wallet(
        &self,
        public_key: &PublicKey,
        wallet_id: &EntityId,
    ) -> EntityResult<User> {
        self.repository.retrieve_by_intersect_keynames(
            &UserSchema,
            &[
                user::keyname_by_public_key(public_key),
                user::keyname_by_wallet(wallet_id),
            ],
        )
    }

    pub fn retrieve_set_by_wallet(
        &self,
        wallet_id: &EntityId,
        index: usize,
        amount: usize,
    ) -> EntityResult<PartialSet<User>> {
        self.repository.retrieve_set_by_keyname(
            &UserSchema,
            &user::keyname_by_wallet(wallet_id),
            index,
            amount,
        )
    }
}

pub struct RequestRepository {
    repository: EntityRepository,
    schema: RequestSchema,
}

impl RequestRepository {
    pub fn new(repository: EntityRepository, schema: RequestSchema) -> Self {
        Self { repository, schema }
    }

    pub fn retrieve_by_id(&self, id: &EntityId) -> EntityResult<Request> {
        self.repository.retrieve_by_id(&self.schema, id)
    }

    /// Every pending request.
    pub fn retrieve_set(&self, index: usize, amount: usize) -> EntityResult<PartialSet<Request>> {
        self.repository
            .retrieve_set_by_keyname(&self.schema, request::REQUESTS, index, amount)
    }

    pub fn retrieve_set_by_from_user(
        &self,
        user_id: &EntityId,
        index: usize,
        amount: usize,
    ) -> EntityResult<PartialSet<Request>> {
        self.repository.retrieve_set_by_keyname(
            &self.schema,
            &request::keyname_by_from_user(user_id),
            index,
            amount,
        )
    }

    pub fn retrieve_set_by_wallet(
        &self,
        wallet_id: &EntityId,
        index: usize,
        amount: usize,
    ) -> EntityResult<PartialSet<Request>> {
        self.repository.retrieve_set_by_keyname(
            &self.schema,
            &request::keyname_by_wallet(wallet_id),
            index,
            amount,
        )
    }
}

pub struct VoteRepository {
    repository: EntityRepository,
    schema: VoteSchema,
}

impl VoteRepository {
    pub fn new(repository: EntityRepository, schema: VoteSchema) -> Self {
        Self { repository, schema }
    }

    pub fn retrieve_by_id(&self, id: &EntityId) -> EntityResult<Vote> {
        self.repository.retrieve_by_id(&self.schema, id)
    }

    /// The votes cast on a request.
    pub fn retrieve_set_by_request(
        &self,
        request_id: &EntityId,
        index: usize,
        amount: usize,
    ) -> EntityResult<PartialSet<Vote>> {
        self.repository.retrieve_set_by_keyname(
            &self.schema,
            &vote::keyname_by_request(request_id),
            index,
            amount,
        )
    }
}
