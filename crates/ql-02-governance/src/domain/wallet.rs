use ql_01_entity_store::{
    Entity, EntityError, EntityRepository, EntityResult, EntityService, MetaData, Representation,
};
use serde::{Deserialize, Serialize};
use shared_types::{parse_public_key, public_key_hex, EntityId, PublicKey};

/// Collection of every wallet.
pub const WALLETS: &str = "wallets";

/// Index of the wallets created by `creator`.
pub fn keyname_by_creator(creator: &PublicKey) -> String {
    format!("{}:by_creator:{}", WALLETS, public_key_hex(creator))
}

/// A group of users sharing a consensus threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: EntityId,
    pub creator: PublicKey,
    /// Cumulative shares needed to approve or to reject a request.
    pub consensus_needed: u64,
}

impl Entity for Wallet {
    fn id(&self) -> EntityId {
        self.id
    }
}

/// Wire form of a [`Wallet`]; the creator key is hex encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedWallet {
    pub id: EntityId,
    pub creator: String,
    pub consensus_needed: u64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WalletSchema;

impl MetaData for WalletSchema {
    type Entity = Wallet;
    type Storable = Wallet;
    type Normalized = NormalizedWallet;

    fn name(&self) -> &'static str {
        "Wallet"
    }

    fn from_storable(&self, _: &EntityRepository, storable: Wallet) -> EntityResult<Wallet> {
        Ok(storable)
    }

    fn normalize(&self, wallet: &Wallet) -> EntityResult<NormalizedWallet> {
        Ok(NormalizedWallet {
            id: wallet.id,
            creator: public_key_hex(&wallet.creator),
            consensus_needed: wallet.consensus_needed,
        })
    }

    fn denormalize(&self, normalized: NormalizedWallet) -> EntityResult<Wallet> {
        Ok(Wallet {
            id: normalized.id,
            creator: parse_public_key(&normalized.creator)
                .map_err(|e| EntityError::decode(self.name(), e))?,
            consensus_needed: normalized.consensus_needed,
        })
    }
}

impl Representation for WalletSchema {
    type MetaData = Self;

    fn metadata(&self) -> &Self {
        self
    }

    fn to_storable(&self, wallet: &Wallet) -> EntityResult<Wallet> {
        Ok(wallet.clone())
    }

    fn keynames(&self, wallet: &Wallet) -> EntityResult<Vec<String>> {
        Ok(vec![WALLETS.to_string(), keyname_by_creator(&wallet.creator)])
    }

    fn sync(&self, _: &EntityService, wallet: &Wallet) -> EntityResult<()> {
        if wallet.consensus_needed == 0 {
            return Err(EntityError::validation(
                self.name(),
                "the consensus needed must be strictly positive",
            ));
        }
        Ok(())
    }

    /// A wallet is kept while users still belong to it.
    fn before_delete(&self, service: &EntityService, wallet: &Wallet) -> EntityResult<()> {
        let users = service
            .store()
            .set_len(&super::user::keyname_by_wallet(&wallet.id))?;
        if users > 0 {
            return Err(EntityError::conflict(
                self.name(),
                format!("wallet {} still has {} users", wallet.id, users),
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

    fn make_wallet(consensus_needed: u64) -> Wallet {
        Wallet {
            id: uuid::Uuid::new_v4(),
            creator: [3; 32],
            consensus_needed,
        }
    }

    #[test]
    fn test_normalized_creator_is_hex() {
        let wallet = make_wallet(10);
        let normalized = WalletSchema.normalize(&wallet).unwrap();
        assert_eq!(normalized.creator, "03".repeat(32));
        assert_eq!(WalletSchema.denormalize(normalized).unwrap(), wallet);
    }

    #[test]
    fn test_zero_threshold_is_rejected() {
        let service = EntityService::new(Arc::new(InMemoryEntityStore::new()));
        let err = service.save(&make_wallet(0), &WalletSchema).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_keynames() {
        let wallet = make_wallet(1);
        assert_eq!(
            WalletSchema.keynames(&wallet).unwrap(),
            vec!["wallets".to_string(), format!("wallets:by_creator:{}", "03".repeat(32))]
        );
    }
}
