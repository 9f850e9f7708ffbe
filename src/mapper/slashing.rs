use cosmos_sdk_proto::cosmos::slashing::v1beta1::MsgUnjail;

use super::{decode, MessageContext};
use crate::{error::Error, types::SubsetEvent};

pub fn map_unjail(
    payload: &[u8],
    _ctx: &MessageContext,
) -> Result<SubsetEvent, Error> {
    let msg: MsgUnjail = decode(payload, "slashing.MsgUnjail")?;
    Ok(SubsetEvent::new("unjail", "slashing")
        .with_node("validator", &msg.validator_addr))
}
