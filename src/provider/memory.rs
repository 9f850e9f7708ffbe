use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use cosmos_sdk_proto::{
    cosmos::{
        bank::v1beta1::MsgSend,
        base::{abci::v1beta1::TxResponse, v1beta1::Coin},
        tx::v1beta1::{Tx, TxBody},
    },
    Any,
};
use prost::Message;
use tokio::time::sleep;

use crate::{
    error::Error,
    types::{
        Amount, Block, GetAccountBalanceResponse,
        GetAccountDelegationsResponse, GetRewardResponse, HeightAccount,
    },
};

use super::ChainQuery;

/// In-memory chain used by tests: heights `1..=latest`, optional per-height
/// delays and one height that always fails.
#[derive(Debug, Default)]
pub struct MemoryChain {
    pub latest: u64,
    pub delays: HashMap<u64, Duration>,
    pub failing: Option<u64>,
    pub transactions: HashMap<u64, Vec<(Tx, TxResponse)>>,
}

impl MemoryChain {
    pub fn new(latest: u64) -> Self {
        MemoryChain {
            latest,
            ..Default::default()
        }
    }

    pub fn block(&self, height: u64) -> Block {
        Block {
            hash: format!("HASH{}", height),
            height,
            time: Utc
                .timestamp_opt(1_600_000_000 + height as i64, 0)
                .single()
                .unwrap_or_default(),
            chain_id: String::from("cosmoshub-4"),
            num_txs: self
                .transactions
                .get(&height)
                .map(|txs| txs.len() as u64)
                .unwrap_or_default(),
        }
    }

    /// Adds one bank send at `height`.
    pub fn with_send(mut self, height: u64, from: &str, to: &str) -> Self {
        let message = Any {
            type_url: String::from("/cosmos.bank.v1beta1.MsgSend"),
            value: MsgSend {
                from_address: from.to_owned(),
                to_address: to.to_owned(),
                amount: vec![Coin {
                    denom: String::from("uatom"),
                    amount: String::from("1000000"),
                }],
            }
            .encode_to_vec(),
        };
        let tx = Tx {
            body: Some(TxBody {
                messages: vec![message],
                ..Default::default()
            }),
            auth_info: None,
            signatures: vec![],
        };
        let response = TxResponse {
            height: height as i64,
            txhash: format!("TX{}", height),
            ..Default::default()
        };

        self.transactions
            .entry(height)
            .or_default()
            .push((tx, response));
        self
    }
}

#[async_trait]
impl ChainQuery for MemoryChain {
    async fn get_block(&self, height: u64) -> Result<Block, Error> {
        if let Some(delay) = self.delays.get(&height) {
            sleep(*delay).await;
        }
        if self.failing == Some(height) {
            return Err(Error::Upstream {
                status: 500,
                message: format!("height {} unavailable", height),
            });
        }

        let height = if height == 0 { self.latest } else { height };
        Ok(self.block(height))
    }

    async fn search_transactions(
        &self,
        block: &Block,
    ) -> Result<Vec<(Tx, TxResponse)>, Error> {
        Ok(self
            .transactions
            .get(&block.height)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_reward(
        &self,
        query: &HeightAccount,
    ) -> Result<GetRewardResponse, Error> {
        let mut response = GetRewardResponse {
            height: query.height,
            ..Default::default()
        };
        response.rewards.insert(
            String::from("cosmosvaloper1"),
            vec![Amount::from_dec("1500000000000000000", "uatom")?],
        );
        Ok(response)
    }

    async fn get_account_balance(
        &self,
        query: &HeightAccount,
    ) -> Result<GetAccountBalanceResponse, Error> {
        Ok(GetAccountBalanceResponse {
            height: query.height,
            balances: vec![Amount::from_coin("42", "uatom")?],
        })
    }

    async fn get_account_delegations(
        &self,
        query: &HeightAccount,
    ) -> Result<GetAccountDelegationsResponse, Error> {
        Ok(GetAccountDelegationsResponse {
            height: query.height,
            ..Default::default()
        })
    }
}
