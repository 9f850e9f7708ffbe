use cosmos_sdk_proto::cosmos::{
    base::v1beta1::Coin,
    staking::v1beta1::{
        Description, MsgBeginRedelegate, MsgCreateValidator, MsgDelegate,
        MsgEditValidator, MsgUndelegate,
    },
};

use super::{decode, produce_transfers, MessageContext, TRANSFER_REWARD};
use crate::{
    error::Error,
    types::{Account, AccountDetails, Amount, SubsetEvent},
};

const MODULE: &str = "staking";

/// Placeholder an edit message uses for description fields it leaves as is.
const DO_NOT_MODIFY: &str = "[do-not-modify]";

fn insert_coin(
    event: &mut SubsetEvent,
    label: &str,
    coin: Option<&Coin>,
) -> Result<(), Error> {
    if let Some(coin) = coin {
        event
            .amount
            .insert(label.to_owned(), Amount::from_coin(&coin.amount, &coin.denom)?);
    }
    Ok(())
}

fn validator_account(address: &str, description: Option<&Description>) -> Account {
    let field = |value: &str| {
        if value == DO_NOT_MODIFY {
            String::new()
        } else {
            value.to_owned()
        }
    };

    Account {
        id: address.to_owned(),
        details: description.map(|description| AccountDetails {
            name: field(&description.moniker),
            description: field(&description.details),
            contact: field(&description.security_contact),
            website: field(&description.website),
        }),
    }
}

pub fn map_undelegate(
    payload: &[u8],
    ctx: &MessageContext,
) -> Result<SubsetEvent, Error> {
    let msg: MsgUndelegate = decode(payload, "staking.MsgUndelegate")?;

    let mut event = SubsetEvent::new("begin_unbonding", MODULE)
        .with_node("delegator", &msg.delegator_address)
        .with_node("validator", &msg.validator_address);
    insert_coin(&mut event, "undelegate", msg.amount.as_ref())?;

    produce_transfers(&mut event, TRANSFER_REWARD, ctx.log, &[ctx.unbonded_pool])?;
    Ok(event)
}

pub fn map_delegate(
    payload: &[u8],
    ctx: &MessageContext,
) -> Result<SubsetEvent, Error> {
    let msg: MsgDelegate = decode(payload, "staking.MsgDelegate")?;

    let mut event = SubsetEvent::new("delegate", MODULE)
        .with_node("delegator", &msg.delegator_address)
        .with_node("validator", &msg.validator_address);
    insert_coin(&mut event, "delegate", msg.amount.as_ref())?;

    produce_transfers(&mut event, TRANSFER_REWARD, ctx.log, &[])?;
    Ok(event)
}

pub fn map_begin_redelegate(
    payload: &[u8],
    ctx: &MessageContext,
) -> Result<SubsetEvent, Error> {
    let msg: MsgBeginRedelegate = decode(payload, "staking.MsgBeginRedelegate")?;

    let mut event = SubsetEvent::new("begin_redelegate", MODULE)
        .with_node("delegator", &msg.delegator_address)
        .with_node("validator_source", &msg.validator_src_address)
        .with_node("validator_destination", &msg.validator_dst_address);
    insert_coin(&mut event, "delegate", msg.amount.as_ref())?;

    produce_transfers(&mut event, TRANSFER_REWARD, ctx.log, &[])?;
    Ok(event)
}

pub fn map_create_validator(
    payload: &[u8],
    _ctx: &MessageContext,
) -> Result<SubsetEvent, Error> {
    let msg: MsgCreateValidator = decode(payload, "staking.MsgCreateValidator")?;

    let mut event = SubsetEvent::new("create_validator", MODULE);
    if !msg.delegator_address.is_empty() {
        event.add_node("delegator", Account::new(&msg.delegator_address));
    }
    event.add_node(
        "validator",
        validator_account(&msg.validator_address, msg.description.as_ref()),
    );

    insert_coin(&mut event, "self_delegation", msg.value.as_ref())?;
    event.amount.insert(
        String::from("self_delegation_min"),
        Amount::from_coin(&msg.min_self_delegation, "")?,
    );

    if let Some(commission) = &msg.commission {
        event.amount.insert(
            String::from("commission_rate"),
            Amount::from_dec(&commission.rate, "")?,
        );
        event.amount.insert(
            String::from("commission_max_rate"),
            Amount::from_dec(&commission.max_rate, "")?,
        );
        event.amount.insert(
            String::from("commission_max_change_rate"),
            Amount::from_dec(&commission.max_change_rate, "")?,
        );
    }

    Ok(event)
}

pub fn map_edit_validator(
    payload: &[u8],
    _ctx: &MessageContext,
) -> Result<SubsetEvent, Error> {
    let msg: MsgEditValidator = decode(payload, "staking.MsgEditValidator")?;

    let mut event = SubsetEvent::new("edit_validator", MODULE);
    event.add_node(
        "validator",
        validator_account(&msg.validator_address, msg.description.as_ref()),
    );

    if !msg.min_self_delegation.is_empty() {
        event.amount.insert(
            String::from("self_delegation_min"),
            Amount::from_coin(&msg.min_self_delegation, "")?,
        );
    }
    if !msg.commission_rate.is_empty() {
        event.amount.insert(
            String::from("commission_rate"),
            Amount::from_dec(&msg.commission_rate, "")?,
        );
    }

    Ok(event)
}
