use std::{fmt, io, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    pub msg: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub order: u64,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
    #[serde(rename = "final")]
    pub is_final: bool,
}

pub const END_RESPONSE: &str = "END";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskType {
    GetTransactions,
    GetBlock,
    GetReward,
    GetAccountBalance,
    GetAccountDelegations,
    GetLatestMark,
    GetLatestData,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::GetTransactions => "GetTransactions",
            TaskType::GetBlock => "GetBlock",
            TaskType::GetReward => "GetReward",
            TaskType::GetAccountBalance => "GetAccountBalance",
            TaskType::GetAccountDelegations => "GetAccountDelegations",
            TaskType::GetLatestMark => "GetLatestMark",
            TaskType::GetLatestData => "GetLatestData",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = io::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "GetTransactions" => Ok(TaskType::GetTransactions),
            "GetBlock" => Ok(TaskType::GetBlock),
            "GetReward" => Ok(TaskType::GetReward),
            "GetAccountBalance" => Ok(TaskType::GetAccountBalance),
            "GetAccountDelegations" => Ok(TaskType::GetAccountDelegations),
            "GetLatestMark" => Ok(TaskType::GetLatestMark),
            "GetLatestData" => Ok(TaskType::GetLatestData),
            _ => Err(io::Error::other(format!(
                "There is no such handler {}",
                value
            ))),
        }
    }
}

/// Tags of the responses streamed back for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    Block,
    Transaction,
    Reward,
    AccountBalance,
    Delegations,
    LatestMark,
    Error,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Block => "Block",
            ResponseType::Transaction => "Transaction",
            ResponseType::Reward => "Reward",
            ResponseType::AccountBalance => "AccountBalance",
            ResponseType::Delegations => "Delegations",
            ResponseType::LatestMark => "LatestMark",
            ResponseType::Error => "Error",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
