use alloy_primitives::{Address, B256};
use amm_core::types::PoolCreatedEvent;
use amm_core::{AmmError, Result, ScanConfig};
use amm_decoder::{EventDecoder, POOL_CREATED};
use amm_rpc::{LogQuery, ReadTransport};
use futures::stream::{self, Stream, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Replays the pool-creation log over a block range.
///
/// Every scan re-issues its range queries; nothing is cached between calls.
/// Callers doing incremental discovery pass the block after the last one
/// they saw. Failed range queries end the scan with the transport error;
/// retrying (possibly with a narrower range) is up to the caller.
pub struct PoolScanner {
    transport: Arc<dyn ReadTransport>,
    decoder: EventDecoder,
    amm: Address,
    signature: B256,
    config: ScanConfig,
}

/// Position of a scan between batches
struct Cursor {
    next: u64,
    end: Option<u64>,
    exhausted: bool,
}

impl PoolScanner {
    pub fn new(
        transport: Arc<dyn ReadTransport>,
        decoder: EventDecoder,
        amm: Address,
        config: ScanConfig,
    ) -> Result<Self> {
        let signature = decoder
            .interface()
            .event(POOL_CREATED)
            .and_then(|events| events.first())
            .map(|event| event.selector())
            .ok_or_else(|| {
                AmmError::InterfaceParse(format!("interface has no {} event", POOL_CREATED))
            })?;

        Ok(Self {
            transport,
            decoder,
            amm,
            signature,
            config,
        })
    }

    /// Lazily stream pool creations from `from_block` to `to_block`
    /// (inclusive; `None` means the head at the time the scan starts), in
    /// ledger order. No deduplication.
    pub fn scan(
        &self,
        from_block: u64,
        to_block: Option<u64>,
    ) -> impl Stream<Item = Result<PoolCreatedEvent>> + '_ {
        let cursor = Cursor {
            next: from_block,
            end: to_block,
            exhausted: false,
        };

        stream::try_unfold(cursor, move |cursor| self.step(cursor))
            .map_ok(|events| stream::iter(events.into_iter().map(Ok::<_, AmmError>)))
            .try_flatten()
    }

    /// Drain a scan into a vector, stopping at the first error
    pub async fn collect(
        &self,
        from_block: u64,
        to_block: Option<u64>,
    ) -> Result<Vec<PoolCreatedEvent>> {
        self.scan(from_block, to_block).try_collect().await
    }

    async fn step(&self, mut cursor: Cursor) -> Result<Option<(Vec<PoolCreatedEvent>, Cursor)>> {
        let end = match cursor.end {
            Some(end) => end,
            None => {
                let head = self.transport.block_number().await?;
                info!(from = cursor.next, to = head, "Scanning pool creations to head");
                cursor.end = Some(head);
                head
            }
        };

        if cursor.exhausted || cursor.next > end {
            return Ok(None);
        }

        let batch_end = cursor
            .next
            .saturating_add(self.config.batch_size.saturating_sub(1))
            .min(end);
        let events = self.fetch_batch(cursor.next, batch_end).await?;

        match batch_end.checked_add(1) {
            Some(next) => cursor.next = next,
            None => cursor.exhausted = true,
        }
        Ok(Some((events, cursor)))
    }

    async fn fetch_batch(&self, from: u64, to: u64) -> Result<Vec<PoolCreatedEvent>> {
        let fetch_start = Instant::now();
        let query = LogQuery {
            address: self.amm,
            event_signature: self.signature,
            from_block: from,
            to_block: to,
        };

        let mut logs = self.transport.get_logs(&query).await?;

        // Stable sort into (block, log index) order
        logs.sort_by_key(|log| {
            (
                log.block_number.unwrap_or_default(),
                log.log_index.unwrap_or_default(),
            )
        });

        let fetched = logs.len();
        let events: Vec<PoolCreatedEvent> = logs
            .iter()
            .filter_map(|log| {
                let event = self.decoder.decode_typed::<PoolCreatedEvent>(log);
                if event.is_none() {
                    warn!(
                        block = ?log.block_number,
                        log_index = ?log.log_index,
                        "Skipping undecodable PoolCreated log"
                    );
                }
                event
            })
            .collect();

        debug!(
            from = from,
            to = to,
            logs = fetched,
            pools = events.len(),
            fetch_ms = fetch_start.elapsed().as_millis(),
            "Fetched batch"
        );

        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use amm_core::interface::amm_interface;
    use amm_rpc::mock::MockLedger;

    fn token(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn scanner(ledger: &Arc<MockLedger>, batch_size: u64) -> PoolScanner {
        PoolScanner::new(
            ledger.clone(),
            EventDecoder::new(Arc::new(amm_interface().unwrap())),
            ledger.amm(),
            ScanConfig { batch_size },
        )
        .unwrap()
    }

    fn seed(ledger: &MockLedger) -> Vec<B256> {
        let creator = ledger.signer();
        let one = U256::from(1_000u64);
        let mut ids = vec![ledger.seed_pool(creator, token(1), token(2), one, one)];
        ledger.advance_blocks(3);
        ids.push(ledger.seed_pool(creator, token(3), token(1), one, one));
        ids.push(ledger.seed_pool(creator, token(4), token(5), one, one));
        ledger.advance_blocks(1);
        ids
    }

    #[tokio::test]
    async fn test_scan_preserves_ledger_order() {
        let ledger = Arc::new(MockLedger::new());
        let ids = seed(&ledger);

        let events = scanner(&ledger, 2).collect(0, None).await.unwrap();
        let seen: Vec<B256> = events.iter().map(|e| e.pool_id).collect();
        assert_eq!(seen, ids);
        assert!(events
            .windows(2)
            .all(|pair| pair[0].position < pair[1].position));
    }

    #[tokio::test]
    async fn test_scan_is_idempotent() {
        let ledger = Arc::new(MockLedger::new());
        seed(&ledger);
        let scanner = scanner(&ledger, 3);

        let first = scanner.collect(0, Some(10)).await.unwrap();
        let second = scanner.collect(0, Some(10)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[tokio::test]
    async fn test_scan_respects_start_block() {
        let ledger = Arc::new(MockLedger::new());
        seed(&ledger);

        // First pool is in block 1, the next two in blocks 5 and 6
        let events = scanner(&ledger, 100).collect(2, None).await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.position.block_number >= 2));
    }

    #[tokio::test]
    async fn test_scan_batches_range_queries() {
        let ledger = Arc::new(MockLedger::new());
        seed(&ledger);
        let head = ledger.block_number().await.unwrap();

        scanner(&ledger, 2).collect(0, Some(head)).await.unwrap();
        assert_eq!(ledger.log_query_count() as u64, head / 2 + 1);
    }

    #[tokio::test]
    async fn test_empty_range_yields_nothing() {
        let ledger = Arc::new(MockLedger::new());
        seed(&ledger);

        let events = scanner(&ledger, 2).collect(50, Some(40)).await.unwrap();
        assert!(events.is_empty());
        assert_eq!(ledger.log_query_count(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_range_fails_without_retry() {
        let ledger = Arc::new(MockLedger::new());
        seed(&ledger);
        ledger.fail_log_queries(true);

        let err = scanner(&ledger, 2).collect(0, None).await.unwrap_err();
        assert!(matches!(err, AmmError::Transport(_)));
        assert!(err.is_retryable());
        assert_eq!(ledger.log_query_count(), 1);
    }
}
