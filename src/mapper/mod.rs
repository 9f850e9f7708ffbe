pub use self::transfers::{produce_transfers, reconcile_transfers};

pub mod bank;
pub mod crisis;
pub mod distribution;
pub mod evidence;
pub mod gov;
pub mod ibc;
pub mod slashing;
pub mod staking;
pub mod transfers;
pub mod vesting;

use cosmos_sdk_proto::cosmos::base::v1beta1::Coin;
use prost::Message;

use crate::{
    error::Error,
    types::{Amount, EventTransfer, MessageLog},
};

pub const TRANSFER_SEND: &str = "send";
pub const TRANSFER_REWARD: &str = "reward";

/// Inputs every mapper gets besides the message payload.
#[derive(Debug, Clone, Copy)]
pub struct MessageContext<'a> {
    pub log: &'a MessageLog,
    pub unbonded_pool: &'a str,
}

pub(crate) fn decode<M>(payload: &[u8], name: &str) -> Result<M, Error>
where
    M: Message + Default,
{
    M::decode(payload)
        .map_err(|err| Error::NotExpectedType(format!("{}: {}", name, err)))
}

pub(crate) fn coin_amounts(coins: &[Coin]) -> Result<Vec<Amount>, Error> {
    coins
        .iter()
        .map(|coin| Amount::from_coin(&coin.amount, &coin.denom))
        .collect()
}

pub(crate) fn coin_transfer(
    account: &str,
    coins: &[Coin],
) -> Result<EventTransfer, Error> {
    Ok(EventTransfer::new(account, coin_amounts(coins)?))
}

/// Labels repeated amounts `label`, `label_1`, `label_2`, ...
pub(crate) fn indexed_label(label: &str, index: usize) -> String {
    if index == 0 {
        return label.to_owned();
    }
    format!("{}_{}", label, index)
}
