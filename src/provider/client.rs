use std::{collections::BTreeMap, future::Future, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::DateTime;
use cosmos_sdk_proto::cosmos::{
    base::abci::v1beta1::TxResponse, tx::v1beta1::Tx,
};
use prost::Message;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::{
    configuration::Config,
    error::Error,
    helpers::with_retry,
    types::{
        Amount, Block, Delegation, GetAccountBalanceResponse,
        GetAccountDelegationsResponse, GetRewardResponse, HeightAccount,
        UnbondingDelegation, UnbondingEntry,
    },
};

use super::{BlockCache, Grpc, RateLimiter, HTTP};

const TXS_PER_PAGE: u64 = 100;

/// Everything the worker asks of a chain node.
#[async_trait]
pub trait ChainQuery: Send + Sync {
    /// Block at `height`, or the latest block when `height` is zero.
    async fn get_block(&self, height: u64) -> Result<Block, Error>;

    /// All transactions included in `block`, paired with their results.
    async fn search_transactions(
        &self,
        block: &Block,
    ) -> Result<Vec<(Tx, TxResponse)>, Error>;

    async fn get_reward(
        &self,
        query: &HeightAccount,
    ) -> Result<GetRewardResponse, Error>;

    async fn get_account_balance(
        &self,
        query: &HeightAccount,
    ) -> Result<GetAccountBalanceResponse, Error>;

    async fn get_account_delegations(
        &self,
        query: &HeightAccount,
    ) -> Result<GetAccountDelegationsResponse, Error>;
}

/// Node access over gRPC and LCD, sharing one rate limiter per backend
/// and a block cache across every caller.
#[derive(Debug)]
pub struct ChainClient {
    grpc: Grpc,
    http: HTTP,
    grpc_limiter: Arc<RateLimiter>,
    lcd_limiter: Arc<RateLimiter>,
    cache: BlockCache,
    chain_id: String,
    block_timeout: Duration,
    search_timeout: Duration,
}

impl ChainClient {
    pub async fn new(config: &Config) -> Result<Self, Error> {
        let grpc = Grpc::new(config).await?;
        let http = HTTP::new(config)?;

        Ok(Self::with_providers(config, grpc, http))
    }

    pub fn with_providers(config: &Config, grpc: Grpc, http: HTTP) -> Self {
        ChainClient {
            grpc,
            http,
            grpc_limiter: Arc::new(RateLimiter::new(config.requests_per_second)),
            lcd_limiter: Arc::new(RateLimiter::new(config.requests_per_second)),
            cache: BlockCache::new(config.block_cache_capacity),
            chain_id: config.chain_id.to_owned(),
            block_timeout: Duration::from_secs(config.timeout_block_call),
            search_timeout: Duration::from_secs(config.timeout_search_tx_call),
        }
    }

    /// Idempotent gRPC read: every attempt waits for a token and runs under
    /// `limit`; timeouts and unavailable nodes are retried.
    async fn read<T, F, Fut>(
        &self,
        name: &str,
        limit: Duration,
        mut call: F,
    ) -> Result<T, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, Error>>,
    {
        let limiter = &self.grpc_limiter;
        with_retry(name, || {
            let attempt = call();
            async move {
                limiter.wait().await;
                timeout(limit, attempt).await?
            }
        })
        .await
    }

    fn check_chain(&self, block: &Block) -> Result<(), Error> {
        if self.chain_id.is_empty() || block.chain_id == self.chain_id {
            return Ok(());
        }

        Err(Error::ConfigurationError(format!(
            "block {} belongs to chain {}, expected {}",
            block.height, block.chain_id, self.chain_id
        )))
    }
}

#[async_trait]
impl ChainQuery for ChainClient {
    async fn get_block(&self, height: u64) -> Result<Block, Error> {
        if height > 0 {
            if let Some(block) = self.cache.get(height).await {
                return Ok(block);
            }
        }

        let grpc = &self.grpc;
        let block = self
            .read("get block", self.block_timeout, move || grpc.get_block(height))
            .await?;

        self.check_chain(&block)?;
        if height > 0 {
            self.cache.set(block.clone()).await;
        }

        Ok(block)
    }

    async fn search_transactions(
        &self,
        block: &Block,
    ) -> Result<Vec<(Tx, TxResponse)>, Error> {
        let grpc = &self.grpc;
        let height = block.height;
        let mut transactions = Vec::new();
        let mut page = 1;

        loop {
            let response = self
                .read("search transactions", self.search_timeout, move || {
                    grpc.get_txs_event(height, page, TXS_PER_PAGE)
                })
                .await?;

            #[allow(deprecated)]
            let total = response.total.max(
                response
                    .pagination
                    .as_ref()
                    .map(|pagination| pagination.total)
                    .unwrap_or_default(),
            );

            let received = response.tx_responses.len();
            let mut txs = response.txs.into_iter();
            for tx_response in response.tx_responses {
                let tx = match txs.next() {
                    Some(tx) => tx,
                    None => envelope(&tx_response)?,
                };
                transactions.push((tx, tx_response));
            }

            debug!(
                "height {}: page {} returned {} of {} transactions",
                height, page, received, total
            );

            if received == 0 || transactions.len() as u64 >= total {
                break;
            }
            page += 1;
        }

        if transactions.len() as u64 != block.num_txs {
            warn!(
                "height {}: block reports {} transactions, search returned {}",
                height,
                block.num_txs,
                transactions.len()
            );
        }

        Ok(transactions)
    }

    async fn get_reward(
        &self,
        query: &HeightAccount,
    ) -> Result<GetRewardResponse, Error> {
        let grpc = &self.grpc;
        let response = self
            .read("delegation rewards", self.search_timeout, move || {
                grpc.delegation_total_rewards(&query.account, query.height)
            })
            .await?;

        let mut rewards = BTreeMap::new();
        for reward in response.rewards {
            let amounts = reward
                .reward
                .iter()
                .map(|coin| Amount::from_dec(&coin.amount, &coin.denom))
                .collect::<Result<Vec<_>, _>>()?;
            rewards.insert(reward.validator_address, amounts);
        }

        Ok(GetRewardResponse {
            height: query.height,
            rewards,
        })
    }

    async fn get_account_balance(
        &self,
        query: &HeightAccount,
    ) -> Result<GetAccountBalanceResponse, Error> {
        self.lcd_limiter.wait().await;
        let balances = self
            .http
            .get_balances(&query.account, query.height)
            .await?;

        Ok(GetAccountBalanceResponse {
            height: query.height,
            balances,
        })
    }

    async fn get_account_delegations(
        &self,
        query: &HeightAccount,
    ) -> Result<GetAccountDelegationsResponse, Error> {
        let grpc = &self.grpc;
        let mut delegations = vec![];
        let mut key = vec![];
        loop {
            let page_key = &key;
            let response = self
                .read("delegator delegations", self.search_timeout, move || {
                    grpc.delegator_delegations(
                        &query.account,
                        query.height,
                        page_key.clone(),
                    )
                })
                .await?;

            for item in response.delegation_responses {
                let Some(delegation) = item.delegation else {
                    continue;
                };
                let balance = match item.balance {
                    Some(coin) => Amount::from_coin(&coin.amount, &coin.denom)?,
                    None => Amount::from_coin("0", "")?,
                };
                delegations.push(Delegation {
                    delegator: delegation.delegator_address,
                    validator: delegation.validator_address,
                    shares: Amount::from_dec(&delegation.shares, "")?,
                    balance,
                });
            }

            key = next_key(response.pagination.map(|page| page.next_key));
            if key.is_empty() {
                break;
            }
        }

        let mut unbonding = vec![];
        let mut key = vec![];
        loop {
            let page_key = &key;
            let response = self
                .read("unbonding delegations", self.search_timeout, move || {
                    grpc.delegator_unbonding_delegations(
                        &query.account,
                        query.height,
                        page_key.clone(),
                    )
                })
                .await?;

            for item in response.unbonding_responses {
                let entries = item
                    .entries
                    .into_iter()
                    .map(|entry| {
                        Ok(UnbondingEntry {
                            creation_height: entry.creation_height,
                            completion_time: entry.completion_time.and_then(
                                |time| {
                                    DateTime::from_timestamp(
                                        time.seconds,
                                        u32::try_from(time.nanos).ok()?,
                                    )
                                },
                            ),
                            initial_balance: Amount::from_coin(
                                &entry.initial_balance,
                                "",
                            )?,
                            balance: Amount::from_coin(&entry.balance, "")?,
                        })
                    })
                    .collect::<Result<Vec<_>, Error>>()?;

                unbonding.push(UnbondingDelegation {
                    delegator: item.delegator_address,
                    validator: item.validator_address,
                    entries,
                });
            }

            key = next_key(response.pagination.map(|page| page.next_key));
            if key.is_empty() {
                break;
            }
        }

        Ok(GetAccountDelegationsResponse {
            height: query.height,
            delegations,
            unbonding,
        })
    }
}

fn next_key(key: Option<Vec<u8>>) -> Vec<u8> {
    key.unwrap_or_default()
}

/// Nodes that omit the `txs` list still embed each envelope in its response.
fn envelope(response: &TxResponse) -> Result<Tx, Error> {
    const MISSING_TX_ERROR: &str = "Transaction response carries no envelope";

    let any = response.tx.as_ref().ok_or_else(|| {
        Error::FieldNotExist(format!("{}: {}", MISSING_TX_ERROR, response.txhash))
    })?;

    Ok(Tx::decode(any.value.as_slice())?)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use cosmos_sdk_proto::{cosmos::tx::v1beta1::TxBody, Any};
    use tokio::time::{sleep, Instant};
    use tonic::{codegen::http::Uri, transport::Endpoint};
    use tracing::Level;

    use super::*;
    use crate::{
        configuration::Environment,
        helpers::{MAX_RETRIES, RETRY_BACKOFF},
    };

    const UNREACHABLE_NODE: &str = "http://127.0.0.1:9";

    fn client() -> ChainClient {
        let config = Config {
            app_env: Environment::Development,
            server_host: "127.0.0.1".to_owned(),
            port: 0,
            grpc_host: UNREACHABLE_NODE.to_owned(),
            lcd_host: UNREACHABLE_NODE.to_owned(),
            datahub_key: String::new(),
            chain_id: String::new(),
            maximum_heights_to_get: 100,
            requests_per_second: 0,
            workers: 5,
            timeout_block_call: 5,
            timeout_search_tx_call: 5,
            task_timeout: 60,
            block_cache_capacity: 16,
            unbonded_pool_address: String::new(),
            log_level: Level::INFO,
        };
        let channel = Endpoint::from_static(UNREACHABLE_NODE).connect_lazy();
        let grpc = Grpc::with_channel(channel, Uri::from_static(UNREACHABLE_NODE));
        let http = HTTP::new(&config).unwrap();

        ChainClient::with_providers(&config, grpc, http)
    }

    #[tokio::test]
    async fn read_retries_unavailable_node() {
        let client = client();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let value = client
            .read("flaky", Duration::from_secs(1), move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) + 1 < MAX_RETRIES {
                    return Err(Error::Upstream {
                        status: 503,
                        message: "unavailable".to_owned(),
                    });
                }
                Ok(7)
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES);
    }

    #[tokio::test]
    async fn read_retries_calls_past_their_limit() {
        let client = client();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let err = client
            .read("slow", Duration::from_millis(20), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                sleep(Duration::from_millis(200)).await;
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::TokioElapsedError(_)));
        assert_eq!(calls.load(Ordering::SeqCst), MAX_RETRIES);
    }

    #[tokio::test]
    async fn read_does_not_retry_client_errors() {
        let client = client();
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let err = client
            .read("rejected", Duration::from_secs(1), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Error::Upstream {
                    status: 400,
                    message: "bad request".to_owned(),
                })
            })
            .await
            .unwrap_err();

        assert!(!err.is_retryable());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn staking_queries_retry_unreachable_node() {
        let client = client();
        let query = HeightAccount {
            height: 10,
            account: "cosmos1a".to_owned(),
        };
        // attempts 1 and 2 are each followed by a backoff of attempt * RETRY_BACKOFF
        let backoff = RETRY_BACKOFF * 3;

        let started = Instant::now();
        let err = client.get_reward(&query).await.unwrap_err();
        assert!(err.is_retryable(), "{err:?}");
        assert!(started.elapsed() >= backoff);

        let started = Instant::now();
        let err = client.get_account_delegations(&query).await.unwrap_err();
        assert!(err.is_retryable(), "{err:?}");
        assert!(started.elapsed() >= backoff);
    }

    #[test]
    fn recovers_envelope_from_response() {
        let tx = Tx {
            body: Some(TxBody {
                memo: "hello".to_owned(),
                ..Default::default()
            }),
            auth_info: None,
            signatures: vec![],
        };
        let response = TxResponse {
            txhash: "ABC".to_owned(),
            tx: Some(Any {
                type_url: "/cosmos.tx.v1beta1.Tx".to_owned(),
                value: tx.encode_to_vec(),
            }),
            ..Default::default()
        };

        assert_eq!(envelope(&response).unwrap(), tx);
    }

    #[test]
    fn missing_envelope_is_an_error() {
        let response = TxResponse {
            txhash: "ABC".to_owned(),
            ..Default::default()
        };

        let err = envelope(&response).unwrap_err();
        assert!(err.to_string().contains("ABC"));
    }

    #[test]
    fn pagination_stops_without_key() {
        assert!(next_key(None).is_empty());
        assert_eq!(next_key(Some(vec![1, 2])), vec![1, 2]);
    }
}
