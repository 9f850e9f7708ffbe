use cosmos_sdk_proto::cosmos::gov::v1beta1::{
    MsgDeposit, MsgSubmitProposal, MsgVote, VoteOption,
};
use prost::Message;

use super::{
    coin_amounts, decode, indexed_label, produce_transfers, MessageContext,
    TRANSFER_SEND,
};
use crate::{
    error::Error,
    types::{EventTransfer, SubsetEvent},
};

const MODULE: &str = "gov";

/// Leading fields shared by the legacy proposal contents
/// (`TextProposal`, `CommunityPoolSpendProposal`, ...).
#[derive(Clone, PartialEq, Message)]
struct ProposalHeader {
    #[prost(string, tag = "1")]
    title: String,
    #[prost(string, tag = "2")]
    description: String,
}

pub fn map_deposit(
    payload: &[u8],
    ctx: &MessageContext,
) -> Result<SubsetEvent, Error> {
    let msg: MsgDeposit = decode(payload, "gov.MsgDeposit")?;
    let amounts = coin_amounts(&msg.amount)?;

    let mut event =
        SubsetEvent::new("deposit", MODULE).with_node("depositor", &msg.depositor);
    for (index, amount) in amounts.iter().enumerate() {
        event
            .amount
            .insert(indexed_label("deposit", index), amount.clone());
    }
    event
        .sender
        .push(EventTransfer::new(&msg.depositor, amounts));
    event.add_additional("proposalID", msg.proposal_id.to_string());

    produce_transfers(&mut event, TRANSFER_SEND, ctx.log, &[])?;
    Ok(event)
}

pub fn map_vote(
    payload: &[u8],
    _ctx: &MessageContext,
) -> Result<SubsetEvent, Error> {
    let msg: MsgVote = decode(payload, "gov.MsgVote")?;

    let option = VoteOption::try_from(msg.option)
        .map(|option| option.as_str_name().to_owned())
        .unwrap_or_else(|_| msg.option.to_string());

    let mut event =
        SubsetEvent::new("vote", MODULE).with_node("voter", &msg.voter);
    event.add_additional("proposalID", msg.proposal_id.to_string());
    event.add_additional("option", option);

    Ok(event)
}

pub fn map_submit_proposal(
    payload: &[u8],
    ctx: &MessageContext,
) -> Result<SubsetEvent, Error> {
    let msg: MsgSubmitProposal = decode(payload, "gov.MsgSubmitProposal")?;
    let amounts = coin_amounts(&msg.initial_deposit)?;

    let mut event = SubsetEvent::new("submit_proposal", MODULE)
        .with_node("proposer", &msg.proposer);
    for (index, amount) in amounts.iter().enumerate() {
        event
            .amount
            .insert(indexed_label("initial_deposit", index), amount.clone());
    }
    event
        .sender
        .push(EventTransfer::new(&msg.proposer, amounts));

    if let Some(content) = &msg.content {
        let (route, kind) = proposal_route(&content.type_url);
        event.add_additional("proposal_route", route);
        event.add_additional("proposal_type", kind);
        event.add_additional("content", content.type_url.to_owned());

        if let Ok(header) = ProposalHeader::decode(content.value.as_slice()) {
            if !header.title.is_empty() {
                event.add_additional("title", header.title);
            }
            if !header.description.is_empty() {
                event.add_additional("description", header.description);
            }
        }
    }

    produce_transfers(&mut event, TRANSFER_SEND, ctx.log, &[])?;
    Ok(event)
}

/// Route and type of a legacy proposal content, derived from its type URL:
/// `/cosmos.distribution.v1beta1.CommunityPoolSpendProposal` becomes
/// `("distribution", "CommunityPoolSpend")`.
fn proposal_route(type_url: &str) -> (String, String) {
    let segments: Vec<&str> = type_url.trim_start_matches('/').split('.').collect();
    let name = segments.last().copied().unwrap_or_default();
    let route = match segments.as_slice() {
        [_, module, _, _] => *module,
        _ => MODULE,
    };
    let kind = name.strip_suffix("Proposal").unwrap_or(name);

    (route.to_string(), kind.to_owned())
}
