use cosmos_sdk_proto::cosmos::vesting::v1beta1::MsgCreateVestingAccount;

use super::{coin_amounts, decode, MessageContext};
use crate::{
    error::Error,
    types::{EventTransfer, SubsetEvent},
};

pub fn map_create_vesting_account(
    payload: &[u8],
    _ctx: &MessageContext,
) -> Result<SubsetEvent, Error> {
    let msg: MsgCreateVestingAccount =
        decode(payload, "vesting.MsgCreateVestingAccount")?;
    let amounts = coin_amounts(&msg.amount)?;

    let mut event = SubsetEvent::new("msg_create_vesting_account", "vesting");
    event
        .sender
        .push(EventTransfer::new(&msg.from_address, amounts.clone()));
    event
        .recipient
        .push(EventTransfer::new(&msg.to_address, amounts));
    event.add_additional("end_time", msg.end_time.to_string());
    event.add_additional("delayed", msg.delayed.to_string());

    Ok(event)
}
