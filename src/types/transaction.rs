use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Amount, SubsetEvent};
use crate::helpers::serde_base64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub id: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub: Vec<SubsetEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub height: u64,
    pub hash: String,
    pub block_hash: String,
    pub chain_id: String,
    pub time: DateTime<Utc>,
    pub gas_wanted: u64,
    pub gas_used: u64,
    pub fee: Vec<Amount>,
    pub memo: String,
    #[serde(with = "serde_base64")]
    pub raw: Vec<u8>,
    #[serde(with = "serde_base64")]
    pub raw_log: Vec<u8>,
    pub events: Vec<TransactionEvent>,
}
