use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use ibc_proto::ibc::{
    applications::transfer::v1::MsgTransfer,
    core::{
        channel::v1::{
            MsgAcknowledgement, MsgChannelCloseConfirm, MsgChannelCloseInit,
            MsgChannelOpenAck, MsgChannelOpenConfirm, MsgChannelOpenInit,
            MsgChannelOpenTry, MsgRecvPacket, MsgTimeout, MsgTimeoutOnClose,
        },
        client::v1::{
            MsgCreateClient, MsgSubmitMisbehaviour, MsgUpdateClient,
            MsgUpgradeClient,
        },
        connection::v1::{
            MsgConnectionOpenAck, MsgConnectionOpenConfirm,
            MsgConnectionOpenInit, MsgConnectionOpenTry,
        },
    },
};
use serde::Serialize;
use tracing::warn;

use crate::{
    error::Error,
    mapper::{
        bank, crisis, distribution, evidence, gov, ibc::map_ibc, slashing,
        staking, vesting, MessageContext,
    },
    types::{MessageLog, SubsetEvent},
};

/// Every message the worker knows how to map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    BankSend,
    BankMultiSend,
    CrisisVerifyInvariant,
    DistributionWithdrawValidatorCommission,
    DistributionSetWithdrawAddress,
    DistributionWithdrawDelegatorReward,
    DistributionFundCommunityPool,
    EvidenceSubmitEvidence,
    GovDeposit,
    GovVote,
    GovSubmitProposal,
    SlashingUnjail,
    StakingUndelegate,
    StakingDelegate,
    StakingBeginRedelegate,
    StakingCreateValidator,
    StakingEditValidator,
    VestingCreateVestingAccount,
    IbcCreateClient,
    IbcUpdateClient,
    IbcUpgradeClient,
    IbcSubmitMisbehaviour,
    IbcConnectionOpenInit,
    IbcConnectionOpenTry,
    IbcConnectionOpenAck,
    IbcConnectionOpenConfirm,
    IbcChannelOpenInit,
    IbcChannelOpenTry,
    IbcChannelOpenAck,
    IbcChannelOpenConfirm,
    IbcChannelCloseInit,
    IbcChannelCloseConfirm,
    IbcRecvPacket,
    IbcTimeout,
    IbcTimeoutOnClose,
    IbcAcknowledgement,
    IbcTransfer,
}

impl MessageKind {
    pub const ALL: [MessageKind; 37] = [
        MessageKind::BankSend,
        MessageKind::BankMultiSend,
        MessageKind::CrisisVerifyInvariant,
        MessageKind::DistributionWithdrawValidatorCommission,
        MessageKind::DistributionSetWithdrawAddress,
        MessageKind::DistributionWithdrawDelegatorReward,
        MessageKind::DistributionFundCommunityPool,
        MessageKind::EvidenceSubmitEvidence,
        MessageKind::GovDeposit,
        MessageKind::GovVote,
        MessageKind::GovSubmitProposal,
        MessageKind::SlashingUnjail,
        MessageKind::StakingUndelegate,
        MessageKind::StakingDelegate,
        MessageKind::StakingBeginRedelegate,
        MessageKind::StakingCreateValidator,
        MessageKind::StakingEditValidator,
        MessageKind::VestingCreateVestingAccount,
        MessageKind::IbcCreateClient,
        MessageKind::IbcUpdateClient,
        MessageKind::IbcUpgradeClient,
        MessageKind::IbcSubmitMisbehaviour,
        MessageKind::IbcConnectionOpenInit,
        MessageKind::IbcConnectionOpenTry,
        MessageKind::IbcConnectionOpenAck,
        MessageKind::IbcConnectionOpenConfirm,
        MessageKind::IbcChannelOpenInit,
        MessageKind::IbcChannelOpenTry,
        MessageKind::IbcChannelOpenAck,
        MessageKind::IbcChannelOpenConfirm,
        MessageKind::IbcChannelCloseInit,
        MessageKind::IbcChannelCloseConfirm,
        MessageKind::IbcRecvPacket,
        MessageKind::IbcTimeout,
        MessageKind::IbcTimeoutOnClose,
        MessageKind::IbcAcknowledgement,
        MessageKind::IbcTransfer,
    ];

    /// `(module, message type)` pair as found in the type URL.
    pub fn route(&self) -> (&'static str, &'static str) {
        match self {
            MessageKind::BankSend => ("bank", "MsgSend"),
            MessageKind::BankMultiSend => ("bank", "MsgMultiSend"),
            MessageKind::CrisisVerifyInvariant => {
                ("crisis", "MsgVerifyInvariant")
            },
            MessageKind::DistributionWithdrawValidatorCommission => {
                ("distribution", "MsgWithdrawValidatorCommission")
            },
            MessageKind::DistributionSetWithdrawAddress => {
                ("distribution", "MsgSetWithdrawAddress")
            },
            MessageKind::DistributionWithdrawDelegatorReward => {
                ("distribution", "MsgWithdrawDelegatorReward")
            },
            MessageKind::DistributionFundCommunityPool => {
                ("distribution", "MsgFundCommunityPool")
            },
            MessageKind::EvidenceSubmitEvidence => {
                ("evidence", "MsgSubmitEvidence")
            },
            MessageKind::GovDeposit => ("gov", "MsgDeposit"),
            MessageKind::GovVote => ("gov", "MsgVote"),
            MessageKind::GovSubmitProposal => ("gov", "MsgSubmitProposal"),
            MessageKind::SlashingUnjail => ("slashing", "MsgUnjail"),
            MessageKind::StakingUndelegate => ("staking", "MsgUndelegate"),
            MessageKind::StakingDelegate => ("staking", "MsgDelegate"),
            MessageKind::StakingBeginRedelegate => {
                ("staking", "MsgBeginRedelegate")
            },
            MessageKind::StakingCreateValidator => {
                ("staking", "MsgCreateValidator")
            },
            MessageKind::StakingEditValidator => {
                ("staking", "MsgEditValidator")
            },
            MessageKind::VestingCreateVestingAccount => {
                ("vesting", "MsgCreateVestingAccount")
            },
            MessageKind::IbcCreateClient => ("client", "MsgCreateClient"),
            MessageKind::IbcUpdateClient => ("client", "MsgUpdateClient"),
            MessageKind::IbcUpgradeClient => ("client", "MsgUpgradeClient"),
            MessageKind::IbcSubmitMisbehaviour => {
                ("client", "MsgSubmitMisbehaviour")
            },
            MessageKind::IbcConnectionOpenInit => {
                ("connection", "MsgConnectionOpenInit")
            },
            MessageKind::IbcConnectionOpenTry => {
                ("connection", "MsgConnectionOpenTry")
            },
            MessageKind::IbcConnectionOpenAck => {
                ("connection", "MsgConnectionOpenAck")
            },
            MessageKind::IbcConnectionOpenConfirm => {
                ("connection", "MsgConnectionOpenConfirm")
            },
            MessageKind::IbcChannelOpenInit => {
                ("channel", "MsgChannelOpenInit")
            },
            MessageKind::IbcChannelOpenTry => ("channel", "MsgChannelOpenTry"),
            MessageKind::IbcChannelOpenAck => ("channel", "MsgChannelOpenAck"),
            MessageKind::IbcChannelOpenConfirm => {
                ("channel", "MsgChannelOpenConfirm")
            },
            MessageKind::IbcChannelCloseInit => {
                ("channel", "MsgChannelCloseInit")
            },
            MessageKind::IbcChannelCloseConfirm => {
                ("channel", "MsgChannelCloseConfirm")
            },
            MessageKind::IbcRecvPacket => ("channel", "MsgRecvPacket"),
            MessageKind::IbcTimeout => ("channel", "MsgTimeout"),
            MessageKind::IbcTimeoutOnClose => ("channel", "MsgTimeoutOnClose"),
            MessageKind::IbcAcknowledgement => {
                ("channel", "MsgAcknowledgement")
            },
            MessageKind::IbcTransfer => ("transfer", "MsgTransfer"),
        }
    }

    /// Snake case event name, also the primary type tag of the mapped event.
    pub fn tag(&self) -> &'static str {
        match self {
            MessageKind::BankSend => "send",
            MessageKind::BankMultiSend => "multisend",
            MessageKind::CrisisVerifyInvariant => "verify_invariant",
            MessageKind::DistributionWithdrawValidatorCommission => {
                "withdraw_validator_commission"
            },
            MessageKind::DistributionSetWithdrawAddress => {
                "set_withdraw_address"
            },
            MessageKind::DistributionWithdrawDelegatorReward => {
                "withdraw_delegator_reward"
            },
            MessageKind::DistributionFundCommunityPool => "fund_community_pool",
            MessageKind::EvidenceSubmitEvidence => "submit_evidence",
            MessageKind::GovDeposit => "deposit",
            MessageKind::GovVote => "vote",
            MessageKind::GovSubmitProposal => "submit_proposal",
            MessageKind::SlashingUnjail => "unjail",
            MessageKind::StakingUndelegate => "begin_unbonding",
            MessageKind::StakingDelegate => "delegate",
            MessageKind::StakingBeginRedelegate => "begin_redelegate",
            MessageKind::StakingCreateValidator => "create_validator",
            MessageKind::StakingEditValidator => "edit_validator",
            MessageKind::VestingCreateVestingAccount => {
                "msg_create_vesting_account"
            },
            MessageKind::IbcCreateClient => "create_client",
            MessageKind::IbcUpdateClient => "update_client",
            MessageKind::IbcUpgradeClient => "upgrade_client",
            MessageKind::IbcSubmitMisbehaviour => "submit_misbehaviour",
            MessageKind::IbcConnectionOpenInit => "connection_open_init",
            MessageKind::IbcConnectionOpenTry => "connection_open_try",
            MessageKind::IbcConnectionOpenAck => "connection_open_ack",
            MessageKind::IbcConnectionOpenConfirm => "connection_open_confirm",
            MessageKind::IbcChannelOpenInit => "channel_open_init",
            MessageKind::IbcChannelOpenTry => "channel_open_try",
            MessageKind::IbcChannelOpenAck => "channel_open_ack",
            MessageKind::IbcChannelOpenConfirm => "channel_open_confirm",
            MessageKind::IbcChannelCloseInit => "channel_close_init",
            MessageKind::IbcChannelCloseConfirm => "channel_close_confirm",
            MessageKind::IbcRecvPacket => "recv_packet",
            MessageKind::IbcTimeout => "timeout",
            MessageKind::IbcTimeoutOnClose => "timeout_on_close",
            MessageKind::IbcAcknowledgement => "acknowledgement",
            MessageKind::IbcTransfer => "transfer",
        }
    }

    pub fn module(&self) -> &'static str {
        match self.route().0 {
            "client" | "connection" | "channel" | "transfer" => "ibc",
            module => module,
        }
    }

    pub fn from_route(module: &str, msg_type: &str) -> Option<MessageKind> {
        MessageKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.route() == (module, msg_type))
    }

    pub fn map(
        &self,
        payload: &[u8],
        ctx: &MessageContext,
    ) -> Result<SubsetEvent, Error> {
        let tag = self.tag();
        match self {
            MessageKind::BankSend => bank::map_send(payload, ctx),
            MessageKind::BankMultiSend => bank::map_multisend(payload, ctx),
            MessageKind::CrisisVerifyInvariant => {
                crisis::map_verify_invariant(payload, ctx)
            },
            MessageKind::DistributionWithdrawValidatorCommission => {
                distribution::map_withdraw_validator_commission(payload, ctx)
            },
            MessageKind::DistributionSetWithdrawAddress => {
                distribution::map_set_withdraw_address(payload, ctx)
            },
            MessageKind::DistributionWithdrawDelegatorReward => {
                distribution::map_withdraw_delegator_reward(payload, ctx)
            },
            MessageKind::DistributionFundCommunityPool => {
                distribution::map_fund_community_pool(payload, ctx)
            },
            MessageKind::EvidenceSubmitEvidence => {
                evidence::map_submit_evidence(payload, ctx)
            },
            MessageKind::GovDeposit => gov::map_deposit(payload, ctx),
            MessageKind::GovVote => gov::map_vote(payload, ctx),
            MessageKind::GovSubmitProposal => {
                gov::map_submit_proposal(payload, ctx)
            },
            MessageKind::SlashingUnjail => slashing::map_unjail(payload, ctx),
            MessageKind::StakingUndelegate => {
                staking::map_undelegate(payload, ctx)
            },
            MessageKind::StakingDelegate => staking::map_delegate(payload, ctx),
            MessageKind::StakingBeginRedelegate => {
                staking::map_begin_redelegate(payload, ctx)
            },
            MessageKind::StakingCreateValidator => {
                staking::map_create_validator(payload, ctx)
            },
            MessageKind::StakingEditValidator => {
                staking::map_edit_validator(payload, ctx)
            },
            MessageKind::VestingCreateVestingAccount => {
                vesting::map_create_vesting_account(payload, ctx)
            },
            MessageKind::IbcCreateClient => {
                map_ibc::<MsgCreateClient>(payload, ctx, tag)
            },
            MessageKind::IbcUpdateClient => {
                map_ibc::<MsgUpdateClient>(payload, ctx, tag)
            },
            MessageKind::IbcUpgradeClient => {
                map_ibc::<MsgUpgradeClient>(payload, ctx, tag)
            },
            MessageKind::IbcSubmitMisbehaviour => {
                map_ibc::<MsgSubmitMisbehaviour>(payload, ctx, tag)
            },
            MessageKind::IbcConnectionOpenInit => {
                map_ibc::<MsgConnectionOpenInit>(payload, ctx, tag)
            },
            MessageKind::IbcConnectionOpenTry => {
                map_ibc::<MsgConnectionOpenTry>(payload, ctx, tag)
            },
            MessageKind::IbcConnectionOpenAck => {
                map_ibc::<MsgConnectionOpenAck>(payload, ctx, tag)
            },
            MessageKind::IbcConnectionOpenConfirm => {
                map_ibc::<MsgConnectionOpenConfirm>(payload, ctx, tag)
            },
            MessageKind::IbcChannelOpenInit => {
                map_ibc::<MsgChannelOpenInit>(payload, ctx, tag)
            },
            MessageKind::IbcChannelOpenTry => {
                map_ibc::<MsgChannelOpenTry>(payload, ctx, tag)
            },
            MessageKind::IbcChannelOpenAck => {
                map_ibc::<MsgChannelOpenAck>(payload, ctx, tag)
            },
            MessageKind::IbcChannelOpenConfirm => {
                map_ibc::<MsgChannelOpenConfirm>(payload, ctx, tag)
            },
            MessageKind::IbcChannelCloseInit => {
                map_ibc::<MsgChannelCloseInit>(payload, ctx, tag)
            },
            MessageKind::IbcChannelCloseConfirm => {
                map_ibc::<MsgChannelCloseConfirm>(payload, ctx, tag)
            },
            MessageKind::IbcRecvPacket => {
                map_ibc::<MsgRecvPacket>(payload, ctx, tag)
            },
            MessageKind::IbcTimeout => map_ibc::<MsgTimeout>(payload, ctx, tag),
            MessageKind::IbcTimeoutOnClose => {
                map_ibc::<MsgTimeoutOnClose>(payload, ctx, tag)
            },
            MessageKind::IbcAcknowledgement => {
                map_ibc::<MsgAcknowledgement>(payload, ctx, tag)
            },
            MessageKind::IbcTransfer => {
                map_ibc::<MsgTransfer>(payload, ctx, tag)
            },
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (module, msg_type) = self.route();
        write!(f, "{}.{}", module, msg_type)
    }
}

/// Splits a type URL into `(module, message type)`.
///
/// `/cosmos.bank.v1beta1.MsgSend` yields `("bank", "MsgSend")` and
/// `/ibc.core.client.v1.MsgCreateClient` yields `("client", "MsgCreateClient")`.
pub fn parse_type_url(type_url: &str) -> Result<(&str, &str), Error> {
    let segments: Vec<&str> = type_url.split('.').collect();
    match segments.as_slice() {
        ["/cosmos", module, _, msg_type] => Ok((*module, *msg_type)),
        ["/ibc", _, category, _, msg_type] => Ok((*category, *msg_type)),
        _ => Err(Error::TypeUrlFormat(type_url.to_owned())),
    }
}

/// Counters of messages that could not be mapped.
#[derive(Debug, Default)]
pub struct DecodeStats {
    unknown: AtomicU64,
    broken: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DecodeStatsSnapshot {
    pub unknown_messages: u64,
    pub broken_messages: u64,
}

impl DecodeStats {
    pub fn snapshot(&self) -> DecodeStatsSnapshot {
        DecodeStatsSnapshot {
            unknown_messages: self.unknown.load(Ordering::Relaxed),
            broken_messages: self.broken.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug)]
pub enum Routed {
    Event(SubsetEvent),
    /// Well formed type URL without a registered mapper.
    Unknown { module: String, msg_type: String },
    /// Registered mapper that failed to decode the payload.
    Broken { kind: MessageKind, error: Error },
}

impl Routed {
    pub fn kind(&self) -> &str {
        match self {
            Routed::Event(event) => event.primary_kind(),
            Routed::Unknown { .. } => "unknown",
            Routed::Broken { kind, .. } => kind.tag(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Router {
    unbonded_pool: String,
    stats: Arc<DecodeStats>,
}

impl Router {
    pub fn new(unbonded_pool: &str, stats: Arc<DecodeStats>) -> Self {
        Router {
            unbonded_pool: unbonded_pool.to_owned(),
            stats,
        }
    }

    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    /// Maps one message. Only a malformed type URL is an error; unknown and
    /// broken messages are reported through [`Routed`].
    pub fn route(
        &self,
        type_url: &str,
        payload: &[u8],
        log: &MessageLog,
    ) -> Result<Routed, Error> {
        let (module, msg_type) = parse_type_url(type_url)?;

        let kind = match MessageKind::from_route(module, msg_type) {
            Some(kind) => kind,
            None => {
                self.stats.unknown.fetch_add(1, Ordering::Relaxed);
                warn!("unknown message type {}", type_url);
                return Ok(Routed::Unknown {
                    module: module.to_owned(),
                    msg_type: msg_type.to_owned(),
                });
            },
        };

        let ctx = MessageContext {
            log,
            unbonded_pool: &self.unbonded_pool,
        };

        match kind.map(payload, &ctx) {
            Ok(event) => Ok(Routed::Event(event)),
            Err(error) => {
                self.stats.broken.fetch_add(1, Ordering::Relaxed);
                warn!("broken message {}: {}", type_url, error);
                Ok(Routed::Broken { kind, error })
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use cosmos_sdk_proto::cosmos::bank::v1beta1::MsgSend;
    use prost::Message;

    use super::*;

    fn router() -> Router {
        Router::new("pool", Arc::new(DecodeStats::default()))
    }

    fn type_url(kind: MessageKind) -> String {
        let (module, msg_type) = kind.route();
        match kind.module() {
            "ibc" => {
                let prefix = if module == "transfer" {
                    "applications"
                } else {
                    "core"
                };
                format!("/ibc.{}.{}.v1.{}", prefix, module, msg_type)
            },
            _ => format!("/cosmos.{}.v1beta1.{}", module, msg_type),
        }
    }

    #[test]
    fn parses_cosmos_and_ibc_urls() {
        assert_eq!(
            parse_type_url("/cosmos.bank.v1beta1.MsgSend").unwrap(),
            ("bank", "MsgSend")
        );
        assert_eq!(
            parse_type_url("/ibc.core.client.v1.MsgCreateClient").unwrap(),
            ("client", "MsgCreateClient")
        );
        assert_eq!(
            parse_type_url("/ibc.applications.transfer.v1.MsgTransfer").unwrap(),
            ("transfer", "MsgTransfer")
        );
    }

    #[test]
    fn rejects_other_shapes() {
        for url in [
            "/cosmwasm.wasm.v1.MsgExecuteContract",
            "/cosmos.bank.MsgSend",
            "/ibc.core.client.MsgCreateClient",
            "cosmos.bank.v1beta1.MsgSend",
            "",
        ] {
            assert!(
                matches!(parse_type_url(url), Err(Error::TypeUrlFormat(_))),
                "{}",
                url
            );
        }
        assert!(router()
            .route("/cosmwasm.wasm.v1.MsgExecuteContract", &[], &MessageLog::default())
            .is_err());
    }

    #[test]
    fn table_is_unique() {
        let routes: HashSet<_> =
            MessageKind::ALL.iter().map(|kind| kind.route()).collect();
        let tags: HashSet<_> =
            MessageKind::ALL.iter().map(|kind| kind.tag()).collect();
        assert_eq!(routes.len(), MessageKind::ALL.len());
        assert_eq!(tags.len(), MessageKind::ALL.len());
    }

    #[test]
    fn every_registered_route_is_known() {
        let router = router();
        for kind in MessageKind::ALL {
            let url = type_url(kind);
            let routed = router.route(&url, &[], &MessageLog::default()).unwrap();
            assert!(!matches!(routed, Routed::Unknown { .. }), "{}", url);
            if let Routed::Event(event) = &routed {
                assert_eq!(event.primary_kind(), kind.tag());
                assert_eq!(event.module, kind.module());
            }
            assert_eq!(routed.kind(), kind.tag());
        }
        assert_eq!(router.stats().snapshot().unknown_messages, 0);
    }

    #[test]
    fn unknown_and_broken_are_distinct() {
        let router = router();

        let unknown = router
            .route("/cosmos.bank.v1beta1.MsgBurn", &[], &MessageLog::default())
            .unwrap();
        assert!(matches!(
            unknown,
            Routed::Unknown { ref module, ref msg_type }
                if module == "bank" && msg_type == "MsgBurn"
        ));

        let broken = router
            .route(
                "/cosmos.bank.v1beta1.MsgSend",
                &[0xff, 0xff, 0xff],
                &MessageLog::default(),
            )
            .unwrap();
        assert!(matches!(
            broken,
            Routed::Broken {
                kind: MessageKind::BankSend,
                error: Error::NotExpectedType(_)
            }
        ));

        assert_eq!(
            router.stats().snapshot(),
            DecodeStatsSnapshot {
                unknown_messages: 1,
                broken_messages: 1,
            }
        );
    }

    #[test]
    fn routes_valid_send() {
        let msg = MsgSend {
            from_address: String::from("a"),
            to_address: String::from("b"),
            amount: vec![],
        };
        let routed = router()
            .route(
                "/cosmos.bank.v1beta1.MsgSend",
                &msg.encode_to_vec(),
                &MessageLog::default(),
            )
            .unwrap();
        assert_eq!(routed.kind(), "send");
    }
}
