use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::Amount;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDetails {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub contact: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub website: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<AccountDetails>,
}

impl Account {
    pub fn new(id: &str) -> Self {
        Account {
            id: id.to_owned(),
            details: None,
        }
    }
}

/// An account together with the amounts it sent or received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTransfer {
    pub account: Account,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amounts: Vec<Amount>,
}

impl EventTransfer {
    pub fn new(account: &str, amounts: Vec<Amount>) -> Self {
        EventTransfer {
            account: Account::new(account),
            amounts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsetEventError {
    pub message: String,
}

/// Normalized form of one decoded on-chain message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubsetEvent {
    #[serde(rename = "type")]
    pub kind: Vec<String>,
    pub module: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sender: Vec<EventTransfer>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipient: Vec<EventTransfer>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node: BTreeMap<String, Vec<Account>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub amount: BTreeMap<String, Amount>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub transfers: BTreeMap<String, Vec<EventTransfer>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SubsetEventError>,
}

impl SubsetEvent {
    pub fn new(kind: &str, module: &str) -> Self {
        SubsetEvent {
            kind: vec![kind.to_owned()],
            module: module.to_owned(),
            ..Default::default()
        }
    }

    pub fn failed(kind: &str, module: &str, message: String) -> Self {
        SubsetEvent {
            error: Some(SubsetEventError { message }),
            ..SubsetEvent::new(kind, module)
        }
    }

    /// Primary type tag.
    pub fn primary_kind(&self) -> &str {
        self.kind.first().map(String::as_str).unwrap_or_default()
    }

    pub fn with_node(mut self, role: &str, account: &str) -> Self {
        self.add_node(role, Account::new(account));
        self
    }

    pub fn add_node(&mut self, role: &str, account: Account) {
        self.node.entry(role.to_owned()).or_default().push(account);
    }

    pub fn add_additional(&mut self, key: &str, value: String) {
        self.additional.entry(key.to_owned()).or_default().push(value);
    }
}
