//! # Partial Sets
//!
//! A paginated, ordered query result with a known total count.

use crate::domain::{EntityError, EntityResult, MetaData};
use serde::{Deserialize, Serialize};

/// A page of entities.
///
/// ## Invariant
///
/// `index + amount <= total_amount`, checked at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialSet<E> {
    instances: Vec<E>,
    index: usize,
    total_amount: usize,
}

impl<E> PartialSet<E> {
    /// Create a partial set, rejecting a total smaller than the page end.
    pub fn new(instances: Vec<E>, index: usize, total_amount: usize) -> EntityResult<Self> {
        let amount = instances.len();
        if index.saturating_add(amount) > total_amount {
            return Err(EntityError::InvalidPartialSet {
                index,
                amount,
                total: total_amount,
            });
        }
        Ok(Self {
            instances,
            index,
            total_amount,
        })
    }

    /// The empty first page of an empty set.
    pub fn empty() -> Self {
        Self {
            instances: Vec::new(),
            index: 0,
            total_amount: 0,
        }
    }

    pub fn instances(&self) -> &[E] {
        &self.instances
    }

    pub fn into_instances(self) -> Vec<E> {
        self.instances
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn amount(&self) -> usize {
        self.instances.len()
    }

    pub fn total_amount(&self) -> usize {
        self.total_amount
    }

    /// True when no element follows this page.
    pub fn is_last(&self) -> bool {
        self.index + self.amount() >= self.total_amount
    }

    /// Convert into the wire form using the type's MetaData.
    pub fn normalize<M>(&self, metadata: &M) -> EntityResult<NormalizedPartialSet<M::Normalized>>
    where
        M: MetaData<Entity = E>,
    {
        let entities = self
            .instances
            .iter()
            .map(|e| metadata.normalize(e))
            .collect::<EntityResult<Vec<_>>>()?;
        Ok(NormalizedPartialSet {
            entities,
            index: self.index,
            total_amount: self.total_amount,
        })
    }

    /// Rebuild a partial set from its wire form.
    pub fn from_normalized<M>(
        normalized: NormalizedPartialSet<M::Normalized>,
        metadata: &M,
    ) -> EntityResult<Self>
    where
        M: MetaData<Entity = E>,
    {
        let instances = normalized
            .entities
            .into_iter()
            .map(|n| metadata.denormalize(n))
            .collect::<EntityResult<Vec<_>>>()?;
        Self::new(instances, normalized.index, normalized.total_amount)
    }
}

/// Wire form of a [`PartialSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPartialSet<N> {
    pub entities: Vec<N>,
    pub index: usize,
    pub total_amount: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_set_accessors() {
        let set = PartialSet::new(vec![1, 2, 3], 10, 20).unwrap();
        assert_eq!(set.amount(), 3);
        assert_eq!(set.index(), 10);
        assert_eq!(set.total_amount(), 20);
        assert!(!set.is_last());
    }

    #[test]
    fn test_is_last_at_exact_end() {
        let set = PartialSet::new(vec!['a', 'b'], 3, 5).unwrap();
        assert!(set.is_last());
    }

    #[test]
    fn test_rejects_total_smaller_than_page_end() {
        let err = PartialSet::new(vec![1, 2], 4, 5).unwrap_err();
        assert!(matches!(
            err,
            EntityError::InvalidPartialSet {
                index: 4,
                amount: 2,
                total: 5
            }
        ));
    }

    #[test]
    fn test_empty_is_last() {
        let set: PartialSet<u8> = PartialSet::empty();
        assert_eq!(set.amount(), 0);
        assert!(set.is_last());
    }

    #[test]
    fn test_page_beyond_total_is_rejected() {
        assert!(PartialSet::<u8>::new(Vec::new(), 6, 5).is_err());
    }
}
