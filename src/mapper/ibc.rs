use prost::Message;

use super::{decode, MessageContext};
use crate::{error::Error, types::SubsetEvent};

const MODULE: &str = "ibc";

/// IBC payloads are only checked to decode as `M`; their fields are not
/// extracted.
pub fn map_ibc<M>(
    payload: &[u8],
    _ctx: &MessageContext,
    kind: &str,
) -> Result<SubsetEvent, Error>
where
    M: Message + Default,
{
    decode::<M>(payload, kind)?;
    Ok(SubsetEvent::new(kind, MODULE))
}
