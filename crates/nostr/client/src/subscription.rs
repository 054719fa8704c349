//! Subscription ids and filter construction.

use crate::message::Filter;
use nostr::is_job_request_kind;
use uuid::Uuid;

/// Generate a unique subscription ID.
pub fn generate_subscription_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

/// Builder for creating subscription filters.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionBuilder {
    filters: Vec<Filter>,
}

impl SubscriptionBuilder {
    /// Create a new subscription builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter to the subscription.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Add a filter for DVM job requests (NIP-90 kinds 5000-5999).
    ///
    /// Kinds outside the request range are dropped. `tagged` restricts the
    /// filter to requests that `p`-tag that pubkey.
    pub fn dvm_requests(
        self,
        kinds: Vec<u16>,
        since: i64,
        limit: u64,
        tagged: Option<String>,
    ) -> Self {
        let kinds: Vec<u16> = kinds.into_iter().filter(|k| is_job_request_kind(*k)).collect();
        let mut filter = Filter::new().kinds(kinds).since(since).limit(limit);
        if let Some(pubkey) = tagged {
            filter = filter.pubkey_refs(vec![pubkey]);
        }
        self.filter(filter)
    }

    /// Build the filters.
    pub fn build(self) -> Vec<Filter> {
        self.filters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_subscription_id() {
        let id1 = generate_subscription_id();
        let id2 = generate_subscription_id();

        assert_eq!(id1.len(), 8);
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_dvm_requests_drops_non_request_kinds() {
        let filters = SubscriptionBuilder::new()
            .dvm_requests(vec![1, 5050, 6050, 5100], 1700000000, 50, None)
            .build();

        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].kinds, Some(vec![5050, 5100]));
        assert_eq!(filters[0].since, Some(1700000000));
        assert_eq!(filters[0].limit, Some(50));
        assert!(filters[0].tags.is_empty());
    }

    #[test]
    fn test_dvm_requests_tagged() {
        let filters = SubscriptionBuilder::new()
            .dvm_requests(vec![5050], 0, 10, Some("pk".to_string()))
            .build();
        assert_eq!(filters[0].tags.get("#p"), Some(&vec!["pk".to_string()]));
    }
}
