use cosmos_sdk_proto::cosmos::crisis::v1beta1::MsgVerifyInvariant;

use super::{decode, MessageContext};
use crate::{
    error::Error,
    types::{EventTransfer, SubsetEvent},
};

pub fn map_verify_invariant(
    payload: &[u8],
    _ctx: &MessageContext,
) -> Result<SubsetEvent, Error> {
    let msg: MsgVerifyInvariant =
        decode(payload, "crisis.MsgVerifyInvariant")?;

    let mut event = SubsetEvent::new("verify_invariant", "crisis");
    event.sender.push(EventTransfer::new(&msg.sender, vec![]));
    event.add_additional("invariant_route", msg.invariant_route);
    event.add_additional("invariant_module_name", msg.invariant_module_name);

    Ok(event)
}

#[cfg(test)]
mod tests {
    use prost::Message;

    use super::*;
    use crate::types::MessageLog;

    #[test]
    fn maps_invariant_metadata() {
        let msg = MsgVerifyInvariant {
            sender: String::from("cosmos1sender"),
            invariant_module_name: String::from("bank"),
            invariant_route: String::from("total-supply"),
        };
        let log = MessageLog::default();
        let ctx = MessageContext {
            log: &log,
            unbonded_pool: "",
        };

        let event = map_verify_invariant(&msg.encode_to_vec(), &ctx).unwrap();

        assert_eq!(event.kind, ["verify_invariant"]);
        assert_eq!(event.sender[0].account.id, "cosmos1sender");
        assert_eq!(event.additional["invariant_route"], ["total-supply"]);
        assert_eq!(event.additional["invariant_module_name"], ["bank"]);
    }
}
