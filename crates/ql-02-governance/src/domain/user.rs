use super::wallet::{NormalizedWallet, Wallet, WalletSchema};
use super::{request, vote};
use ql_01_entity_store::{
    Entity, EntityError, EntityRepository, EntityResult, EntityService, MetaData, Representation,
};
use serde::{Deserialize, Serialize};
use shared_types::{parse_public_key, public_key_hex, EntityId, PublicKey};

/// Collection of every user.
pub const USERS: &str = "users";

/// Index of the users holding `public_key`, across wallets.
pub fn keyname_by_public_key(public_key: &PublicKey) -> String {
    format!("{}:by_pubkey:{}", USERS, public_key_hex(public_key))
}

/// Index of the users of a wallet.
pub fn keyname_by_wallet(wallet_id: &EntityId) -> String {
    format!("{}:by_wallet_id:{}", USERS, wallet_id)
}

/// A voter of a wallet, weighted by its shares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: EntityId,
    pub public_key: PublicKey,
    pub shares: u64,
    pub wallet: Wallet,
}

impl Entity for User {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// Durable record of a [`User`]; the wallet is referenced by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: EntityId,
    pub public_key: PublicKey,
    pub shares: u64,
    pub wallet_id: EntityId,
}

/// Wire form of a [`User`] with its wallet inlined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedUser {
    pub id: EntityId,
    pub public_key: String,
    pub shares: u64,
    pub wallet: NormalizedWallet,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UserSchema;

impl MetaData for UserSchema {
    type Entity = User;
    type Storable = UserRecord;
    type Normalized = NormalizedUser;

    fn name(&self) -> &'static str {
        "User"
    }

    fn from_storable(&self, repository: &EntityRepository, record: UserRecord) -> EntityResult<User> {
        let wallet = repository.retrieve_by_id(&WalletSchema, &record.wallet_id)?;
        Ok(User {
            id: record.id,
            public_key: record.public_key,
            shares: record.shares,
            wallet,
        })
    }

    fn normalize(&self, user: &User) -> EntityResult<NormalizedUser> {
        Ok(NormalizedUser {
            id: user.id,
            public_key: public_key_hex(&user.public_key),
            shares: user.shares,
            wallet: WalletSchema.normalize(&user.wallet)?,
        })
    }

    fn denormalize(&self, normalized: NormalizedUser) -> EntityResult<User> {
        Ok(User {
            id: normalized.id,
            public_key: parse_public_key(&normalized.public_key)
                .map_err(|e| EntityError::decode(self.name(), e))?,
            shares: normalized.shares,
            wallet: WalletSchema.denormalize(normalized.wallet)?,
        })
    }
}

impl Representation for UserSchema {
    type MetaData = Self;

    fn metadata(&self) -> &Self {
        self
    }

    fn to_storable(&self, user: &User) -> EntityResult<UserRecord> {
        Ok(UserRecord {
            id: user.id,
            public_key: user.public_key,
            shares: user.shares,
            wallet_id: user.wallet.id,
        })
    }

    fn keynames(&self, user: &User) -> EntityResult<Vec<String>> {
        Ok(vec![
            USERS.to_string(),
            keyname_by_public_key(&user.public_key),
            keyname_by_wallet(&user.wallet.id),
        ])
    }

    /// Saves the wallet when it is not stored yet. Otherwise the inlined
    /// wallet must match the stored one, and a second user with the same
    /// public key inside one wallet is rejected.
    fn sync(&self, service: &EntityService, user: &User) -> EntityResult<()> {
        let repository = service.repository();
        if !repository.exists(&WalletSchema, &user.wallet.id)? {
            service.save(&user.wallet, &WalletSchema)?;
            return Ok(());
        }

        let stored = repository.retrieve_by_id(&WalletSchema, &user.wallet.id)?;
        if stored != user.wallet {
            return Err(EntityError::validation(
                self.name(),
                format!("the wallet {} differs from the stored one", stored.id),
            ));
        }

        let keys = [
            keyname_by_public_key(&user.public_key),
            keyname_by_wallet(&user.wallet.id),
        ];
        let existing = repository.retrieve_set_by_intersect_keynames(self, &keys, 0, 1)?;
        if existing.total_amount() > 0 {
            return Err(EntityError::validation(
                self.name(),
                format!(
                    "a user with public key {} already exists in wallet {}",
                    public_key_hex(&user.public_key),
                    user.wallet.id
                ),
            ));
        }
        Ok(())
    }

    /// A user is kept while it has a pending request or a cast vote.
    fn before_delete(&self, service: &EntityService, user: &User) -> EntityResult<()> {
        let store = service.store();
        let requests = store.set_len(&request::keyname_by_from_user(&user.id))?;
        let votes = store.set_len(&vote::keyname_by_voter(&user.id))?;
        if requests + votes > 0 {
            return Err(EntityError::conflict(
                self.name(),
                format!(
                    "user {} still has {} pending requests and {} votes",
                    user.id, requests, votes
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ql_01_entity_store::InMemoryEntityStore;
    use shared_types::ErrorKind;
    use std::sync::Arc;
    use uuid::Uuid;

    fn make_user(wallet: &Wallet, key: u8) -> User {
        User {
            id: Uuid::new_v4(),
            public_key: [key; 32],
            shares: 5,
            wallet: wallet.clone(),
        }
    }

    fn make_wallet() -> Wallet {
        Wallet {
            id: Uuid::new_v4(),
            creator: [1; 32],
            consensus_needed: 10,
        }
    }

    #[test]
    fn test_save_cascades_wallet() {
        let service = EntityService::new(Arc::new(InMemoryEntityStore::new()));
        let wallet = make_wallet();
        let user = make_user(&wallet, 7);

        service.save(&user, &UserSchema).unwrap();

        let repository = service.repository();
        assert_eq!(repository.retrieve_by_id(&WalletSchema, &wallet.id).unwrap(), wallet);
        assert_eq!(repository.retrieve_by_id(&UserSchema, &user.id).unwrap(), user);
    }

    #[test]
    fn test_duplicate_public_key_in_wallet_is_rejected() {
        let service = EntityService::new(Arc::new(InMemoryEntityStore::new()));
        let wallet = make_wallet();
        service.save(&make_user(&wallet, 7), &UserSchema).unwrap();

        let err = service.save(&make_user(&wallet, 7), &UserSchema).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        // Same key in another wallet is fine.
        service.save(&make_user(&make_wallet(), 7), &UserSchema).unwrap();
    }

    #[test]
    fn test_altered_wallet_copy_is_rejected() {
        let service = EntityService::new(Arc::new(InMemoryEntityStore::new()));
        let wallet = make_wallet();
        service.save(&make_user(&wallet, 7), &UserSchema).unwrap();

        let mut altered = wallet.clone();
        altered.creator = [0x66; 32];
        let err = service.save(&make_user(&altered, 8), &UserSchema).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(service.repository().retrieve_by_id(&WalletSchema, &wallet.id).unwrap(), wallet);
    }

    #[test]
    fn test_wallet_with_users_cannot_be_deleted() {
        let service = EntityService::new(Arc::new(InMemoryEntityStore::new()));
        let wallet = make_wallet();
        let user = make_user(&wallet, 7);
        service.save(&user, &UserSchema).unwrap();

        let err = service.delete(&wallet, &WalletSchema).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        service.delete(&user, &UserSchema).unwrap();
        service.delete(&wallet, &WalletSchema).unwrap();
        assert!(!service.repository().exists(&WalletSchema, &wallet.id).unwrap());
    }

    #[test]
    fn test_normalize_round_trip() {
        let user = make_user(&make_wallet(), 9);
        let bytes = UserSchema.encode(&user).unwrap();
        assert_eq!(UserSchema.decode(&bytes).unwrap(), user);
    }
}
