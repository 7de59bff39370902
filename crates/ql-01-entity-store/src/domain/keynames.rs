//! Persisted key conventions.
//!
//! - primary record: `<keyname>:by_id:<uuid>`
//! - transient intersection index: `inter:<k1>|<k2>|...`

use shared_types::EntityId;

/// Key of the primary record of an entity inside its collection.
pub fn keyname_by_id(collection: &str, id: &EntityId) -> String {
    format!("{}:by_id:{}", collection, id)
}

/// Destination key of a transient intersection of `keynames`.
pub fn intersection_keyname(keynames: &[String]) -> String {
    format!("inter:{}", keynames.join("|"))
}

/// Drop repeated keynames while keeping the declared order.
pub(crate) fn dedup_keynames(keynames: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    keynames
        .into_iter()
        .filter(|k| seen.insert(k.clone()))
        .collect()
}
