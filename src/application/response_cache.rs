// Cache collaborator for raw analytics responses
use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;

use serde_json::Value;

use crate::domain::filters::{FilterSet, HISTOGRAM_INTERVAL};

/// Bounded-time cache for raw response bodies. Stored values are immutable
/// snapshots; concurrent writers on one key may race and the last one wins.
pub trait ResponseCache: Send + Sync {
    fn get(&self, key: u64) -> Option<Value>;
    fn put(&self, key: u64, body: Value, ttl: Duration);
}

/// Structural hash of the full request tuple: token, filters and the
/// histogram interval.
pub fn cache_key(token: &str, filters: &FilterSet) -> u64 {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    filters.hash(&mut hasher);
    HISTOGRAM_INTERVAL.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::filters::{FilterSet, RawSelection};

    fn filters(entity_id: &'static str) -> FilterSet {
        FilterSet::resolve(&RawSelection {
            exchange_type: Some("Incoming"),
            programmes: None,
            entity_id: Some(entity_id),
            start_date: Some("2024-01-01"),
            end_date: Some("2024-12-31"),
        })
        .unwrap()
    }

    #[test]
    fn identical_tuples_share_a_key() {
        assert_eq!(
            cache_key("token", &filters("1606")),
            cache_key("token", &filters("1606"))
        );
    }

    #[test]
    fn token_and_filters_are_both_part_of_the_key() {
        assert_ne!(
            cache_key("token-a", &filters("1606")),
            cache_key("token-b", &filters("1606"))
        );
        assert_ne!(
            cache_key("token", &filters("1606")),
            cache_key("token", &filters("77"))
        );
    }
}
