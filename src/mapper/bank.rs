use cosmos_sdk_proto::cosmos::bank::v1beta1::{MsgMultiSend, MsgSend};

use super::{
    coin_amounts, coin_transfer, decode, produce_transfers, MessageContext,
    TRANSFER_SEND,
};
use crate::{
    error::Error,
    types::{EventTransfer, SubsetEvent},
};

const MODULE: &str = "bank";

pub fn map_send(
    payload: &[u8],
    ctx: &MessageContext,
) -> Result<SubsetEvent, Error> {
    let msg: MsgSend = decode(payload, "bank.MsgSend")?;
    let amounts = coin_amounts(&msg.amount)?;

    let mut event = SubsetEvent::new("send", MODULE);
    event
        .sender
        .push(EventTransfer::new(&msg.from_address, amounts.clone()));
    event
        .recipient
        .push(EventTransfer::new(&msg.to_address, amounts));

    produce_transfers(&mut event, TRANSFER_SEND, ctx.log, &[])?;
    Ok(event)
}

pub fn map_multisend(
    payload: &[u8],
    ctx: &MessageContext,
) -> Result<SubsetEvent, Error> {
    let msg: MsgMultiSend = decode(payload, "bank.MsgMultiSend")?;

    let mut event = SubsetEvent::new("multisend", MODULE);
    for input in &msg.inputs {
        event.sender.push(coin_transfer(&input.address, &input.coins)?);
    }
    for output in &msg.outputs {
        event
            .recipient
            .push(coin_transfer(&output.address, &output.coins)?);
    }

    produce_transfers(&mut event, TRANSFER_SEND, ctx.log, &[])?;
    Ok(event)
}
