use std::str::FromStr;

use anyhow::Context;
use chrono::{DateTime, Utc};
use cosmos_sdk_proto::cosmos::{
    base::query::v1beta1::PageRequest,
    distribution::v1beta1::{
        query_client::QueryClient as DistributionQueryClient,
        QueryDelegationTotalRewardsRequest,
        QueryDelegationTotalRewardsResponse,
    },
    staking::v1beta1::{
        query_client::QueryClient as StakingQueryClient,
        QueryDelegatorDelegationsRequest, QueryDelegatorDelegationsResponse,
        QueryDelegatorUnbondingDelegationsRequest,
        QueryDelegatorUnbondingDelegationsResponse,
    },
    tx::v1beta1::{GetTxsEventRequest, GetTxsEventResponse, OrderBy},
};
use cosmrs::proto::cosmos::{
    base::tendermint::v1beta1::{
        service_client::ServiceClient as TendermintServiceClient,
        GetBlockByHeightRequest, GetBlockByHeightResponse,
        GetLatestBlockRequest,
    },
    tx::v1beta1::service_client::ServiceClient as TxServiceClient,
};
use tonic::codec::CompressionEncoding;
use tonic::codegen::http::Uri;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tonic::Request;
use tracing::warn;

use crate::{configuration::Config, error::Error, types::Block};

const HEIGHT_HEADER: &str = "x-cosmos-block-height";

#[derive(Debug, Clone)]
pub struct Grpc {
    pub tendermint_client: TendermintServiceClient<Channel>,
    pub tx_service_client: TxServiceClient<Channel>,
    pub distribution_query_client: DistributionQueryClient<Channel>,
    pub staking_query_client: StakingQueryClient<Channel>,
}

/// Attaches the historical height selector; zero queries the latest state.
fn at_height<T>(message: T, height: u64) -> Request<T> {
    let mut request = Request::new(message);
    if height > 0 {
        request.metadata_mut().append(HEIGHT_HEADER, height.into());
    }
    request
}

fn block_time(seconds: i64, nanos: i32) -> Result<DateTime<Utc>, Error> {
    let nanos = u32::try_from(nanos)?;
    DateTime::from_timestamp(seconds, nanos).ok_or_else(|| {
        Error::FieldNotExist(format!("invalid block time {}", seconds))
    })
}

fn hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02X}", byte)).collect()
}

fn to_block(response: GetBlockByHeightResponse) -> Result<Block, Error> {
    const MISSING_BLOCK_INFO_ERROR: &str =
        "Query response doesn't contain block information!";

    const MISSING_BLOCK_HEADER_INFO_ERROR: &str =
        "Query response doesn't contain block's header information!";

    const MISSING_BLOCK_TIME_ERROR: &str =
        "Query response doesn't contain block's time!";

    let hash = response
        .block_id
        .as_ref()
        .map(|id| hex_upper(&id.hash))
        .unwrap_or_default();

    let (chain_id, height, time, num_txs) = match (response.sdk_block, response.block) {
        (Some(block), _) => {
            let header = block.header.context(MISSING_BLOCK_HEADER_INFO_ERROR)?;
            let time = header.time.context(MISSING_BLOCK_TIME_ERROR)?;
            let num_txs = block.data.map(|data| data.txs.len()).unwrap_or_default();
            (header.chain_id, header.height, time, num_txs)
        },
        (None, Some(block)) => {
            let header = block.header.context(MISSING_BLOCK_HEADER_INFO_ERROR)?;
            let time = header.time.context(MISSING_BLOCK_TIME_ERROR)?;
            let num_txs = block.data.map(|data| data.txs.len()).unwrap_or_default();
            (header.chain_id, header.height, time, num_txs)
        },
        (None, None) => return Err(anyhow::anyhow!(MISSING_BLOCK_INFO_ERROR).into()),
    };

    Ok(Block {
        hash,
        height: u64::try_from(height)?,
        time: block_time(time.seconds, time.nanos)?,
        chain_id,
        num_txs: u64::try_from(num_txs)?,
    })
}

impl Grpc {
    pub async fn new(config: &Config) -> Result<Grpc, Error> {
        let host = config.grpc_host.to_owned();
        let uri = Uri::from_str(&host).context("Invalid grpc url")?;

        let mut endpoint = Endpoint::from(uri.clone()).keep_alive_while_idle(true);
        if uri.scheme_str() == Some("https") {
            let tls_config = ClientTlsConfig::new().with_native_roots();
            endpoint = endpoint
                .tls_config(tls_config)
                .context("Could not parse tls config")?;
        }

        let channel = endpoint.connect().await.with_context(|| {
            format!(r#"Failed to connect to gRPC URI, "{uri}"!"#)
        })?;

        Ok(Grpc::with_channel(channel, uri))
    }

    /// Query clients sharing one `channel` to `uri`.
    pub fn with_channel(channel: Channel, uri: Uri) -> Grpc {
        let limit = 10 * 1024 * 1024;

        let tendermint_client =
            TendermintServiceClient::with_origin(channel.clone(), uri.clone())
                .accept_compressed(CompressionEncoding::Gzip)
                .max_decoding_message_size(limit);
        let tx_service_client =
            TxServiceClient::with_origin(channel.clone(), uri.clone())
                .accept_compressed(CompressionEncoding::Gzip)
                .max_decoding_message_size(limit);
        let distribution_query_client =
            DistributionQueryClient::with_origin(channel.clone(), uri.clone())
                .accept_compressed(CompressionEncoding::Gzip)
                .max_decoding_message_size(limit);
        let staking_query_client =
            StakingQueryClient::with_origin(channel, uri)
                .accept_compressed(CompressionEncoding::Gzip)
                .max_decoding_message_size(limit);

        Grpc {
            tendermint_client,
            tx_service_client,
            distribution_query_client,
            staking_query_client,
        }
    }

    /// Block at `height`, or the latest block when `height` is zero.
    pub async fn get_block(&self, height: u64) -> Result<Block, Error> {
        const QUERY_NODE_INFO_ERROR: &str = "Failed to query node's block!";

        let mut client = self.tendermint_client.clone();

        if height == 0 {
            let response = client
                .get_latest_block(GetLatestBlockRequest {})
                .await?
                .into_inner();
            return to_block(GetBlockByHeightResponse {
                block_id: response.block_id,
                block: response.block,
                sdk_block: response.sdk_block,
            });
        }

        let response = client
            .get_block_by_height(GetBlockByHeightRequest {
                height: i64::try_from(height)?,
            })
            .await
            .inspect_err(|status| {
                warn!(
                    "{} height {}: {}",
                    QUERY_NODE_INFO_ERROR,
                    height,
                    status.message()
                )
            })?
            .into_inner();

        to_block(response)
    }

    /// One page of the transactions included at `height`; `page` starts at 1.
    pub async fn get_txs_event(
        &self,
        height: u64,
        page: u64,
        per_page: u64,
    ) -> Result<GetTxsEventResponse, Error> {
        let query = format!("tx.height={}", height);

        #[allow(deprecated)]
        let request = GetTxsEventRequest {
            events: vec![query.to_owned()],
            pagination: Some(PageRequest {
                key: vec![],
                offset: (page - 1) * per_page,
                limit: per_page,
                count_total: true,
                reverse: false,
            }),
            order_by: OrderBy::Asc as i32,
            page,
            limit: per_page,
            query,
        };

        let mut client = self.tx_service_client.clone();
        let response = client.get_txs_event(request).await?.into_inner();

        Ok(response)
    }

    pub async fn delegation_total_rewards(
        &self,
        account: &str,
        height: u64,
    ) -> Result<QueryDelegationTotalRewardsResponse, Error> {
        let request = at_height(
            QueryDelegationTotalRewardsRequest {
                delegator_address: account.to_owned(),
            },
            height,
        );

        let mut client = self.distribution_query_client.clone();
        Ok(client.delegation_total_rewards(request).await?.into_inner())
    }

    pub async fn delegator_delegations(
        &self,
        account: &str,
        height: u64,
        key: Vec<u8>,
    ) -> Result<QueryDelegatorDelegationsResponse, Error> {
        let request = at_height(
            QueryDelegatorDelegationsRequest {
                delegator_addr: account.to_owned(),
                pagination: Some(page_request(key)),
            },
            height,
        );

        let mut client = self.staking_query_client.clone();
        Ok(client.delegator_delegations(request).await?.into_inner())
    }

    pub async fn delegator_unbonding_delegations(
        &self,
        account: &str,
        height: u64,
        key: Vec<u8>,
    ) -> Result<QueryDelegatorUnbondingDelegationsResponse, Error> {
        let request = at_height(
            QueryDelegatorUnbondingDelegationsRequest {
                delegator_addr: account.to_owned(),
                pagination: Some(page_request(key)),
            },
            height,
        );

        let mut client = self.staking_query_client.clone();
        Ok(client
            .delegator_unbonding_delegations(request)
            .await?
            .into_inner())
    }
}

fn page_request(key: Vec<u8>) -> PageRequest {
    PageRequest {
        key,
        offset: 0,
        limit: 100,
        count_total: false,
        reverse: false,
    }
}
