use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Amount;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightAccount {
    #[serde(default)]
    pub height: u64,
    pub account: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRewardResponse {
    pub height: u64,
    /// Rewards keyed by validator address.
    pub rewards: BTreeMap<String, Vec<Amount>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAccountBalanceResponse {
    pub height: u64,
    pub balances: Vec<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegator: String,
    pub validator: String,
    pub shares: Amount,
    pub balance: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingEntry {
    pub creation_height: i64,
    pub completion_time: Option<DateTime<Utc>>,
    pub initial_balance: Amount,
    pub balance: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbondingDelegation {
    pub delegator: String,
    pub validator: String,
    pub entries: Vec<UnbondingEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetAccountDelegationsResponse {
    pub height: u64,
    pub delegations: Vec<Delegation>,
    pub unbonding: Vec<UnbondingDelegation>,
}
