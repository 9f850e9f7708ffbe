use cosmos_sdk_proto::cosmos::distribution::v1beta1::{
    MsgFundCommunityPool, MsgSetWithdrawAddress, MsgWithdrawDelegatorReward,
    MsgWithdrawValidatorCommission,
};

use super::{
    coin_transfer, decode, produce_transfers, MessageContext, TRANSFER_REWARD,
    TRANSFER_SEND,
};
use crate::{
    error::Error,
    types::{EventTransfer, SubsetEvent},
};

const MODULE: &str = "distribution";

pub fn map_withdraw_validator_commission(
    payload: &[u8],
    ctx: &MessageContext,
) -> Result<SubsetEvent, Error> {
    let msg: MsgWithdrawValidatorCommission =
        decode(payload, "distribution.MsgWithdrawValidatorCommission")?;

    let mut event =
        SubsetEvent::new("withdraw_validator_commission", MODULE)
            .with_node("validator", &msg.validator_address);
    event
        .recipient
        .push(EventTransfer::new(&msg.validator_address, vec![]));

    produce_transfers(&mut event, TRANSFER_SEND, ctx.log, &[])?;
    Ok(event)
}

pub fn map_set_withdraw_address(
    payload: &[u8],
    _ctx: &MessageContext,
) -> Result<SubsetEvent, Error> {
    let msg: MsgSetWithdrawAddress =
        decode(payload, "distribution.MsgSetWithdrawAddress")?;

    Ok(SubsetEvent::new("set_withdraw_address", MODULE)
        .with_node("delegator", &msg.delegator_address)
        .with_node("withdraw", &msg.withdraw_address))
}

pub fn map_withdraw_delegator_reward(
    payload: &[u8],
    ctx: &MessageContext,
) -> Result<SubsetEvent, Error> {
    let msg: MsgWithdrawDelegatorReward =
        decode(payload, "distribution.MsgWithdrawDelegatorReward")?;

    let mut event = SubsetEvent::new("withdraw_delegator_reward", MODULE)
        .with_node("delegator", &msg.delegator_address)
        .with_node("validator", &msg.validator_address);
    event
        .recipient
        .push(EventTransfer::new(&msg.delegator_address, vec![]));

    produce_transfers(&mut event, TRANSFER_REWARD, ctx.log, &[])?;
    Ok(event)
}

pub fn map_fund_community_pool(
    payload: &[u8],
    ctx: &MessageContext,
) -> Result<SubsetEvent, Error> {
    let msg: MsgFundCommunityPool =
        decode(payload, "distribution.MsgFundCommunityPool")?;

    let mut event = SubsetEvent::new("fund_community_pool", MODULE)
        .with_node("depositor", &msg.depositor);
    event.sender.push(coin_transfer(&msg.depositor, &msg.amount)?);

    produce_transfers(&mut event, TRANSFER_REWARD, ctx.log, &[])?;
    Ok(event)
}
