use cosmos_sdk_proto::cosmos::evidence::v1beta1::{
    Equivocation, MsgSubmitEvidence,
};

use super::{decode, MessageContext};
use crate::{error::Error, types::SubsetEvent};

const EQUIVOCATION_TYPE_URL: &str = "/cosmos.evidence.v1beta1.Equivocation";

pub fn map_submit_evidence(
    payload: &[u8],
    _ctx: &MessageContext,
) -> Result<SubsetEvent, Error> {
    let msg: MsgSubmitEvidence = decode(payload, "evidence.MsgSubmitEvidence")?;

    let mut event = SubsetEvent::new("submit_evidence", "evidence")
        .with_node("submitter", &msg.submitter);

    let equivocation = match &msg.evidence {
        Some(any) if any.type_url == EQUIVOCATION_TYPE_URL => {
            Some(decode::<Equivocation>(&any.value, "evidence.Equivocation")?)
        },
        _ => None,
    };

    match equivocation {
        Some(evidence) => {
            event.add_additional("evidence_height", evidence.height.to_string());
            event.add_additional(
                "evidence_consensus",
                evidence.consensus_address,
            );
            // Equivocation carries no total power.
            event.add_additional("evidence_total_power", String::from("0"));
            event.add_additional(
                "evidence_validator_power",
                evidence.power.to_string(),
            );
        },
        None => event.add_additional("evidence_height", String::from("0")),
    }

    Ok(event)
}
