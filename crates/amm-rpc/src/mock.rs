//! In-memory ledger implementing both capability traits. Every transaction
//! lands in its own block.

use alloy::rpc::types::Log;
use alloy_primitives::aliases::U24;
use alloy_primitives::{keccak256, Address, Bytes, LogData, TxHash, B256, U256};
use alloy_sol_types::{SolEvent, SolInterface, SolValue};
use amm_core::contracts::{IAmm, IERC20};
use amm_core::{AmmError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

use crate::classify::classify_send_error;
use crate::transport::{LogQuery, Receipt, ReadTransport, SigningTransport};

/// Fee tier assigned to pools created through the mock, in basis points
pub const MOCK_FEE_BPS: u32 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentTransaction {
    pub to: Address,
    pub selector: [u8; 4],
    pub hash: TxHash,
}

#[derive(Debug, Clone, Default)]
struct TokenState {
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
}

#[derive(Debug, Clone)]
struct PoolState {
    token0: Address,
    token1: Address,
    reserve0: U256,
    reserve1: U256,
    fee: u32,
    total_supply: U256,
    shares: HashMap<Address, U256>,
}

#[derive(Debug, Clone, Default)]
struct Books {
    tokens: HashMap<Address, TokenState>,
    pools: HashMap<B256, PoolState>,
}

#[derive(Default)]
struct State {
    block: u64,
    nonce: u64,
    books: Books,
    logs: Vec<Log>,
    receipts: HashMap<TxHash, Receipt>,
    sent: Vec<SentTransaction>,
    calls: usize,
    log_queries: usize,
    declined: HashSet<Address>,
    reverting: HashSet<[u8; 4]>,
    rejecting: HashSet<[u8; 4]>,
    suppressed: HashSet<B256>,
    unrelated: Vec<(Address, LogData)>,
    fail_log_queries: bool,
    receipt_timeout: bool,
}

type Emitted = Vec<(Address, LogData)>;

pub struct MockLedger {
    amm: Address,
    signer: Address,
    state: Mutex<State>,
}

/// Canonical pool identity: sorted pair and fee, hashed
pub fn mock_pool_id(token_a: Address, token_b: Address, fee: u32) -> B256 {
    let (token0, token1) = sort_pair(token_a, token_b);
    keccak256((token0, token1, U256::from(fee)).abi_encode())
}

fn sort_pair(a: Address, b: Address) -> (Address, Address) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn selector(input: &[u8]) -> Result<[u8; 4]> {
    input
        .get(..4)
        .and_then(|s| <[u8; 4]>::try_from(s).ok())
        .ok_or_else(|| AmmError::Transport("calldata shorter than a selector".to_string()))
}

impl Books {
    fn token(&mut self, token: Address) -> &mut TokenState {
        self.tokens.entry(token).or_default()
    }

    fn balance(&self, token: Address, owner: Address) -> U256 {
        self.tokens
            .get(&token)
            .and_then(|t| t.balances.get(&owner).copied())
            .unwrap_or_default()
    }

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.tokens
            .get(&token)
            .and_then(|t| t.allowances.get(&(owner, spender)).copied())
            .unwrap_or_default()
    }

    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> std::result::Result<(Address, LogData), String> {
        let state = self.token(token);
        let from_balance = state.balances.get(&from).copied().unwrap_or_default();
        if from_balance < amount {
            return Err("ERC20: transfer amount exceeds balance".to_string());
        }
        state.balances.insert(from, from_balance - amount);
        *state.balances.entry(to).or_default() += amount;

        let event = IERC20::Transfer {
            from,
            to,
            value: amount,
        };
        Ok((token, event.encode_log_data()))
    }

    fn transfer_from(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        to: Address,
        amount: U256,
    ) -> std::result::Result<(Address, LogData), String> {
        let allowed = self.allowance(token, owner, spender);
        if allowed < amount {
            return Err("ERC20: insufficient allowance".to_string());
        }
        self.token(token)
            .allowances
            .insert((owner, spender), allowed - amount);
        self.transfer(token, owner, to, amount)
    }
}

impl MockLedger {
    pub fn new() -> Self {
        Self::with_addresses(Address::repeat_byte(0xaa), Address::repeat_byte(0x51))
    }

    pub fn with_addresses(amm: Address, signer: Address) -> Self {
        Self {
            amm,
            signer,
            state: Mutex::new(State::default()),
        }
    }

    pub fn amm(&self) -> Address {
        self.amm
    }

    pub fn signer(&self) -> Address {
        self.signer
    }

    pub fn mint(&self, token: Address, owner: Address, amount: U256) {
        let mut state = self.state.lock();
        *state
            .books
            .token(token)
            .balances
            .entry(owner)
            .or_default() += amount;
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        let mut state = self.state.lock();
        state
            .books
            .token(token)
            .allowances
            .insert((owner, spender), amount);
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state.lock().books.allowance(token, owner, spender)
    }

    pub fn balance(&self, token: Address, owner: Address) -> U256 {
        self.state.lock().books.balance(token, owner)
    }

    /// The signer refuses every transaction addressed to `target`
    pub fn decline_signatures_for(&self, target: Address) {
        self.state.lock().declined.insert(target);
    }

    pub fn accept_signatures_for(&self, target: Address) {
        self.state.lock().declined.remove(&target);
    }

    /// Transactions with this selector fail gas estimation and are never sent
    pub fn reject_submissions(&self, selector: [u8; 4]) {
        self.state.lock().rejecting.insert(selector);
    }

    /// Calls and transactions with this selector revert
    pub fn revert_calls(&self, selector: [u8; 4]) {
        self.state.lock().reverting.insert(selector);
    }

    /// Drop logs with this signature from receipts and history
    pub fn suppress_event(&self, signature: B256) {
        self.state.lock().suppressed.insert(signature);
    }

    /// Logs prepended to every subsequent successful receipt
    pub fn set_unrelated_logs(&self, logs: Vec<(Address, LogData)>) {
        self.state.lock().unrelated = logs;
    }

    pub fn fail_log_queries(&self, fail: bool) {
        self.state.lock().fail_log_queries = fail;
    }

    pub fn time_out_receipts(&self, timeout: bool) {
        self.state.lock().receipt_timeout = timeout;
    }

    pub fn advance_blocks(&self, blocks: u64) {
        self.state.lock().block += blocks;
    }

    pub fn sent_transactions(&self) -> Vec<SentTransaction> {
        self.state.lock().sent.clone()
    }

    pub fn sent_with_selector(&self, selector: [u8; 4]) -> usize {
        self.state
            .lock()
            .sent
            .iter()
            .filter(|tx| tx.selector == selector)
            .count()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls
    }

    pub fn log_query_count(&self) -> usize {
        self.state.lock().log_queries
    }

    /// Create a pool in its own block without moving any tokens
    pub fn seed_pool(
        &self,
        creator: Address,
        token_a: Address,
        token_b: Address,
        amount_a: U256,
        amount_b: U256,
    ) -> B256 {
        let mut state = self.state.lock();
        let (token0, token1) = sort_pair(token_a, token_b);
        let (amount0, amount1) = if token0 == token_a {
            (amount_a, amount_b)
        } else {
            (amount_b, amount_a)
        };
        let pool_id = mock_pool_id(token0, token1, MOCK_FEE_BPS);
        let liquidity = amount0.min(amount1);
        state.books.pools.entry(pool_id).or_insert_with(|| PoolState {
            token0,
            token1,
            reserve0: amount0,
            reserve1: amount1,
            fee: MOCK_FEE_BPS,
            total_supply: liquidity,
            shares: HashMap::from([(creator, liquidity)]),
        });

        let event = IAmm::PoolCreated {
            poolId: pool_id,
            token0,
            token1,
            fee: U24::from(MOCK_FEE_BPS),
            creator,
            amount0,
            amount1,
            liquidity,
        };
        let tx = Self::next_hash(&mut state);
        state.block += 1;
        let block = state.block;
        let logs = Self::materialize(&state, vec![(self.amm, event.encode_log_data())], block, tx);
        state.logs.extend(logs);
        pool_id
    }

    fn next_hash(state: &mut State) -> TxHash {
        state.nonce += 1;
        keccak256(state.nonce.to_be_bytes())
    }

    fn materialize(state: &State, emitted: Emitted, block: u64, tx: TxHash) -> Vec<Log> {
        emitted
            .into_iter()
            .filter(|(_, data)| {
                data.topics()
                    .first()
                    .map_or(true, |topic| !state.suppressed.contains(topic))
            })
            .enumerate()
            .map(|(index, (address, data))| Log {
                inner: alloy_primitives::Log { address, data },
                block_number: Some(block),
                log_index: Some(index as u64),
                transaction_hash: Some(tx),
                ..Default::default()
            })
            .collect()
    }

    fn read(&self, books: &Books, to: Address, input: &[u8]) -> Result<Bytes> {
        if to == self.amm {
            let call = IAmm::IAmmCalls::abi_decode(input)
                .map_err(|e| AmmError::CallReverted(format!("execution reverted: {}", e)))?;
            let encoded = match call {
                IAmm::IAmmCalls::getPoolId(c) => {
                    mock_pool_id(c.tokenA, c.tokenB, c.fee.to::<u32>()).abi_encode()
                }
                IAmm::IAmmCalls::getPool(c) => match books.pools.get(&c.poolId) {
                    Some(pool) => (
                        pool.token0,
                        pool.token1,
                        pool.reserve0,
                        pool.reserve1,
                        U256::from(pool.fee),
                        pool.total_supply,
                    )
                        .abi_encode_params(),
                    None => (
                        Address::ZERO,
                        Address::ZERO,
                        U256::ZERO,
                        U256::ZERO,
                        U256::ZERO,
                        U256::ZERO,
                    )
                        .abi_encode_params(),
                },
                IAmm::IAmmCalls::getUserLiquidity(c) => books
                    .pools
                    .get(&c.poolId)
                    .and_then(|pool| pool.shares.get(&c.user).copied())
                    .unwrap_or_default()
                    .abi_encode(),
                _ => {
                    return Err(AmmError::Transport(
                        "mock ledger does not simulate mutating calls".to_string(),
                    ))
                }
            };
            return Ok(Bytes::from(encoded));
        }

        let call = IERC20::IERC20Calls::abi_decode(input)
            .map_err(|e| AmmError::CallReverted(format!("execution reverted: {}", e)))?;
        let encoded = match call {
            IERC20::IERC20Calls::balanceOf(c) => books.balance(to, c.account).abi_encode(),
            IERC20::IERC20Calls::allowance(c) => {
                books.allowance(to, c.owner, c.spender).abi_encode()
            }
            IERC20::IERC20Calls::approve(_) => {
                return Err(AmmError::Transport(
                    "mock ledger does not simulate mutating calls".to_string(),
                ))
            }
        };
        Ok(Bytes::from(encoded))
    }

    fn apply(
        &self,
        books: &mut Books,
        to: Address,
        input: &[u8],
    ) -> std::result::Result<Emitted, String> {
        let sender = self.signer;
        if to != self.amm {
            let call = IERC20::IERC20Calls::abi_decode(input).map_err(|e| e.to_string())?;
            return match call {
                IERC20::IERC20Calls::approve(c) => {
                    books
                        .token(to)
                        .allowances
                        .insert((sender, c.spender), c.amount);
                    let event = IERC20::Approval {
                        owner: sender,
                        spender: c.spender,
                        value: c.amount,
                    };
                    Ok(vec![(to, event.encode_log_data())])
                }
                _ => Err("view function sent as transaction".to_string()),
            };
        }

        let amm = self.amm;
        let call = IAmm::IAmmCalls::abi_decode(input).map_err(|e| e.to_string())?;
        match call {
            IAmm::IAmmCalls::createPool(c) => {
                let (token0, token1) = sort_pair(c.tokenA, c.tokenB);
                if token0 == token1 {
                    return Err("IDENTICAL_TOKENS".to_string());
                }
                let (amount0, amount1) = if token0 == c.tokenA {
                    (c.amountA, c.amountB)
                } else {
                    (c.amountB, c.amountA)
                };
                let pool_id = mock_pool_id(token0, token1, MOCK_FEE_BPS);
                if books.pools.contains_key(&pool_id) {
                    return Err("POOL_EXISTS".to_string());
                }
                let liquidity = amount0.min(amount1);
                if liquidity.is_zero() {
                    return Err("INSUFFICIENT_LIQUIDITY_MINTED".to_string());
                }
                let mut emitted = vec![
                    books.transfer_from(token0, sender, amm, amm, amount0)?,
                    books.transfer_from(token1, sender, amm, amm, amount1)?,
                ];
                books.pools.insert(
                    pool_id,
                    PoolState {
                        token0,
                        token1,
                        reserve0: amount0,
                        reserve1: amount1,
                        fee: MOCK_FEE_BPS,
                        total_supply: liquidity,
                        shares: HashMap::from([(sender, liquidity)]),
                    },
                );
                let event = IAmm::PoolCreated {
                    poolId: pool_id,
                    token0,
                    token1,
                    fee: U24::from(MOCK_FEE_BPS),
                    creator: sender,
                    amount0,
                    amount1,
                    liquidity,
                };
                emitted.push((amm, event.encode_log_data()));
                Ok(emitted)
            }
            IAmm::IAmmCalls::addLiquidity(c) => {
                let pool = books
                    .pools
                    .get(&c.poolId)
                    .cloned()
                    .ok_or_else(|| "POOL_NOT_FOUND".to_string())?;
                let liquidity = (c.amount0Desired * pool.total_supply / pool.reserve0)
                    .min(c.amount1Desired * pool.total_supply / pool.reserve1);
                if liquidity.is_zero() {
                    return Err("INSUFFICIENT_LIQUIDITY_MINTED".to_string());
                }
                let emitted_in = vec![
                    books.transfer_from(pool.token0, sender, amm, amm, c.amount0Desired)?,
                    books.transfer_from(pool.token1, sender, amm, amm, c.amount1Desired)?,
                ];
                let entry = books
                    .pools
                    .get_mut(&c.poolId)
                    .ok_or_else(|| "POOL_NOT_FOUND".to_string())?;
                entry.reserve0 += c.amount0Desired;
                entry.reserve1 += c.amount1Desired;
                entry.total_supply += liquidity;
                *entry.shares.entry(sender).or_default() += liquidity;

                let event = IAmm::LiquidityAdded {
                    poolId: c.poolId,
                    provider: sender,
                    amount0: c.amount0Desired,
                    amount1: c.amount1Desired,
                    liquidity,
                };
                let mut emitted = emitted_in;
                emitted.push((amm, event.encode_log_data()));
                Ok(emitted)
            }
            IAmm::IAmmCalls::removeLiquidity(c) => {
                let pool = books
                    .pools
                    .get(&c.poolId)
                    .cloned()
                    .ok_or_else(|| "POOL_NOT_FOUND".to_string())?;
                let owned = pool.shares.get(&sender).copied().unwrap_or_default();
                if owned < c.liquidity || c.liquidity.is_zero() {
                    return Err("INSUFFICIENT_LIQUIDITY".to_string());
                }
                let amount0 = c.liquidity * pool.reserve0 / pool.total_supply;
                let amount1 = c.liquidity * pool.reserve1 / pool.total_supply;
                let mut emitted = vec![
                    books.transfer(pool.token0, amm, sender, amount0)?,
                    books.transfer(pool.token1, amm, sender, amount1)?,
                ];
                let entry = books
                    .pools
                    .get_mut(&c.poolId)
                    .ok_or_else(|| "POOL_NOT_FOUND".to_string())?;
                entry.reserve0 -= amount0;
                entry.reserve1 -= amount1;
                entry.total_supply -= c.liquidity;
                entry.shares.insert(sender, owned - c.liquidity);

                let event = IAmm::LiquidityRemoved {
                    poolId: c.poolId,
                    provider: sender,
                    amount0,
                    amount1,
                    liquidity: c.liquidity,
                };
                emitted.push((amm, event.encode_log_data()));
                Ok(emitted)
            }
            IAmm::IAmmCalls::swap(c) => {
                let pool = books
                    .pools
                    .get(&c.poolId)
                    .cloned()
                    .ok_or_else(|| "POOL_NOT_FOUND".to_string())?;
                let (reserve_in, reserve_out, token_out) = if c.tokenIn == pool.token0 {
                    (pool.reserve0, pool.reserve1, pool.token1)
                } else if c.tokenIn == pool.token1 {
                    (pool.reserve1, pool.reserve0, pool.token0)
                } else {
                    return Err("INVALID_TOKEN".to_string());
                };
                let in_after_fee = c.amountIn * U256::from(10_000 - pool.fee);
                let amount_out = in_after_fee * reserve_out
                    / (reserve_in * U256::from(10_000u64) + in_after_fee);
                if amount_out < c.minAmountOut {
                    return Err("INSUFFICIENT_OUTPUT_AMOUNT".to_string());
                }
                let emitted_in = books.transfer_from(c.tokenIn, sender, amm, amm, c.amountIn)?;
                let emitted_out = books.transfer(token_out, amm, c.recipient, amount_out)?;
                let entry = books
                    .pools
                    .get_mut(&c.poolId)
                    .ok_or_else(|| "POOL_NOT_FOUND".to_string())?;
                if c.tokenIn == entry.token0 {
                    entry.reserve0 += c.amountIn;
                    entry.reserve1 -= amount_out;
                } else {
                    entry.reserve1 += c.amountIn;
                    entry.reserve0 -= amount_out;
                }

                let event = IAmm::Swap {
                    poolId: c.poolId,
                    sender,
                    tokenIn: c.tokenIn,
                    amountIn: c.amountIn,
                    amountOut: amount_out,
                    recipient: c.recipient,
                };
                Ok(vec![emitted_in, emitted_out, (amm, event.encode_log_data())])
            }
            _ => Err("view function sent as transaction".to_string()),
        }
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadTransport for MockLedger {
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes> {
        let mut state = self.state.lock();
        state.calls += 1;
        if state.reverting.contains(&selector(&input)?) {
            return Err(AmmError::CallReverted("execution reverted".to_string()));
        }
        self.read(&state.books, to, &input)
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<Log>> {
        let mut state = self.state.lock();
        state.log_queries += 1;
        if state.fail_log_queries {
            return Err(AmmError::Transport(format!(
                "block range {}-{} unavailable",
                query.from_block, query.to_block
            )));
        }
        Ok(state
            .logs
            .iter()
            .filter(|log| {
                let block = log.block_number.unwrap_or_default();
                log.address() == query.address
                    && log.topics().first() == Some(&query.event_signature)
                    && block >= query.from_block
                    && block <= query.to_block
            })
            .cloned()
            .collect())
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.state.lock().block)
    }
}

#[async_trait]
impl SigningTransport for MockLedger {
    fn address(&self) -> Address {
        self.signer
    }

    async fn send_transaction(&self, to: Address, input: Bytes) -> Result<TxHash> {
        let mut state = self.state.lock();
        let selector = selector(&input)?;
        if state.declined.contains(&to) {
            return Err(AmmError::UserDeclined(
                "error code 4001: User rejected the request.".to_string(),
            ));
        }
        if state.rejecting.contains(&selector) {
            return Err(classify_send_error(
                "server returned an error response: error code 3: execution reverted: INSUFFICIENT_OUTPUT_AMOUNT",
            ));
        }

        let hash = Self::next_hash(&mut state);
        state.block += 1;
        let block = state.block;
        state.sent.push(SentTransaction { to, selector, hash });

        let mut books = state.books.clone();
        let outcome = if state.reverting.contains(&selector) {
            Err("execution reverted".to_string())
        } else {
            self.apply(&mut books, to, &input)
        };

        let receipt = match outcome {
            Ok(emitted) => {
                state.books = books;
                let mut all = state.unrelated.clone();
                all.extend(emitted);
                let logs = Self::materialize(&state, all, block, hash);
                state.logs.extend(logs.iter().cloned());
                Receipt {
                    transaction_hash: hash,
                    block_number: Some(block),
                    success: true,
                    logs,
                }
            }
            Err(_) => Receipt {
                transaction_hash: hash,
                block_number: Some(block),
                success: false,
                logs: Vec::new(),
            },
        };
        state.receipts.insert(hash, receipt);
        Ok(hash)
    }

    async fn wait_for_receipt(&self, tx: TxHash) -> Result<Receipt> {
        let state = self.state.lock();
        if state.receipt_timeout {
            return Err(AmmError::Timeout(format!("no receipt for {}", tx)));
        }
        state
            .receipts
            .get(&tx)
            .cloned()
            .ok_or_else(|| AmmError::Transport(format!("unknown transaction {}", tx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::SolCall;

    #[tokio::test]
    async fn test_approve_then_allowance() {
        let ledger = MockLedger::new();
        let token = Address::repeat_byte(0x01);
        let call = IERC20::approveCall {
            spender: ledger.amm(),
            amount: U256::from(7u64),
        };
        let hash = ledger
            .send_transaction(token, Bytes::from(call.abi_encode()))
            .await
            .unwrap();
        let receipt = ledger.wait_for_receipt(hash).await.unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(
            ledger.allowance(token, ledger.signer(), ledger.amm()),
            U256::from(7u64)
        );
    }

    #[tokio::test]
    async fn test_failed_transfer_reverts_without_state_change() {
        let ledger = MockLedger::new();
        let (a, b) = (Address::repeat_byte(0x01), Address::repeat_byte(0x02));
        let call = IAmm::createPoolCall {
            tokenA: a,
            tokenB: b,
            amountA: U256::from(10u64),
            amountB: U256::from(10u64),
        };
        let hash = ledger
            .send_transaction(ledger.amm(), Bytes::from(call.abi_encode()))
            .await
            .unwrap();
        let receipt = ledger.wait_for_receipt(hash).await.unwrap();
        assert!(!receipt.success);
        assert!(receipt.logs.is_empty());
        assert_eq!(ledger.block_number().await.unwrap(), 1);
    }

    #[test]
    fn test_pool_id_ignores_argument_order() {
        let (a, b) = (Address::repeat_byte(0x01), Address::repeat_byte(0x02));
        assert_eq!(mock_pool_id(a, b, 30), mock_pool_id(b, a, 30));
        assert_ne!(mock_pool_id(a, b, 30), mock_pool_id(a, b, 5));
    }
}
