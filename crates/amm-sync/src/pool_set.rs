use alloy_primitives::Address;
use amm_core::types::{PoolCreatedEvent, PoolId};
use std::collections::HashMap;
use tracing::debug;

/// Pools discovered so far, folded from a creation-event stream.
///
/// Creation events are immutable, so an identity already in the set is
/// never overwritten. Pair lookups resolve to the most recently created
/// pool for that pair (fee tiers can differ).
#[derive(Debug, Clone, Default)]
pub struct PoolSet {
    order: Vec<PoolId>,
    by_id: HashMap<PoolId, PoolCreatedEvent>,
    latest_by_pair: HashMap<(Address, Address), PoolId>,
}

impl PoolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_events<I>(events: I) -> Self
    where
        I: IntoIterator<Item = PoolCreatedEvent>,
    {
        let mut set = Self::new();
        for event in events {
            set.apply(event);
        }
        set
    }

    /// Fold one event in. Returns false if the pool was already known.
    pub fn apply(&mut self, event: PoolCreatedEvent) -> bool {
        if self.by_id.contains_key(&event.pool_id) {
            debug!(pool_id = %event.pool_id, "Pool already known, keeping first sighting");
            return false;
        }

        self.latest_by_pair.insert(event.pair(), event.pool_id);
        self.order.push(event.pool_id);
        self.by_id.insert(event.pool_id, event);
        true
    }

    pub fn get(&self, pool_id: &PoolId) -> Option<&PoolCreatedEvent> {
        self.by_id.get(pool_id)
    }

    /// Most recently created pool for a pair, in either token order
    pub fn latest_for_pair(&self, token_a: Address, token_b: Address) -> Option<&PoolCreatedEvent> {
        let key = if token_a <= token_b {
            (token_a, token_b)
        } else {
            (token_b, token_a)
        };
        self.latest_by_pair
            .get(&key)
            .and_then(|pool_id| self.by_id.get(pool_id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Pools in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &PoolCreatedEvent> + '_ {
        self.order.iter().filter_map(|pool_id| self.by_id.get(pool_id))
    }

    /// Highest block seen, for resuming an incremental scan
    pub fn last_block(&self) -> Option<u64> {
        self.by_id
            .values()
            .map(|event| event.position.block_number)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use amm_core::types::LogPosition;
    use amm_core::Amount;

    fn created(id: u8, a: u8, b: u8, block: u64) -> PoolCreatedEvent {
        PoolCreatedEvent {
            pool_id: B256::repeat_byte(id),
            token0: Address::repeat_byte(a),
            token1: Address::repeat_byte(b),
            fee_bps: 30,
            creator: Address::repeat_byte(0x51),
            amount0: Amount::from(100u64),
            amount1: Amount::from(100u64),
            liquidity: Amount::from(100u64),
            position: LogPosition {
                block_number: block,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_first_sighting_wins() {
        let mut set = PoolSet::new();
        assert!(set.apply(created(1, 1, 2, 10)));
        assert!(!set.apply(created(1, 1, 2, 20)));

        assert_eq!(set.len(), 1);
        assert_eq!(set.get(&B256::repeat_byte(1)).unwrap().position.block_number, 10);
    }

    #[test]
    fn test_latest_for_pair_is_last_write() {
        let set = PoolSet::from_events([
            created(1, 1, 2, 10),
            created(2, 3, 4, 11),
            created(3, 2, 1, 12),
        ]);

        let latest = set.latest_for_pair(Address::repeat_byte(1), Address::repeat_byte(2));
        assert_eq!(latest.unwrap().pool_id, B256::repeat_byte(3));
        assert!(set
            .latest_for_pair(Address::repeat_byte(1), Address::repeat_byte(9))
            .is_none());
    }

    #[test]
    fn test_iter_keeps_discovery_order() {
        let set = PoolSet::from_events([
            created(3, 1, 2, 10),
            created(1, 3, 4, 11),
            created(2, 5, 6, 12),
        ]);

        let ids: Vec<u8> = set.iter().map(|e| e.pool_id[0]).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(set.last_block(), Some(12));
        assert!(PoolSet::new().last_block().is_none());
        assert!(PoolSet::new().is_empty());
    }
}
