use cosmos_sdk_proto::cosmos::{
    base::abci::v1beta1::TxResponse, tx::v1beta1::Tx,
};
use prost::Message;

use crate::{
    error::Error,
    mapper::coin_amounts,
    router::{Routed, Router},
    types::{
        find_log, Amount, Block, LogAttribute, LogEvent, MessageLog,
        SubsetEvent, Transaction, TransactionEvent,
    },
};

const MSG_INDEX: &str = "msg_index";
const ERROR_KIND: &str = "error";

/// Turns a chain transaction and its response into a [`Transaction`].
#[derive(Debug, Clone)]
pub struct TransactionDecoder {
    router: Router,
}

impl TransactionDecoder {
    pub fn new(router: Router) -> Self {
        TransactionDecoder { router }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Decodes `tx` with its `response`, stamped with the including `block`.
    /// Fails only on a malformed type URL or malformed response metadata;
    /// messages that cannot be mapped become degraded events.
    pub fn decode(
        &self,
        tx: &Tx,
        response: &TxResponse,
        block: &Block,
    ) -> Result<Transaction, Error> {
        let logs = message_logs(response);

        let raw_log = if response.raw_log.is_empty() {
            serde_json::to_vec(&logs)?
        } else {
            response.raw_log.as_bytes().to_vec()
        };

        let mut transaction = Transaction {
            height: u64::try_from(response.height)?,
            hash: response.txhash.to_owned(),
            block_hash: block.hash.to_owned(),
            chain_id: block.chain_id.to_owned(),
            time: block.time,
            gas_wanted: u64::try_from(response.gas_wanted)?,
            gas_used: u64::try_from(response.gas_used)?,
            fee: fee_amounts(tx)?,
            memo: tx
                .body
                .as_ref()
                .map(|body| body.memo.to_owned())
                .unwrap_or_default(),
            raw: tx.encode_to_vec(),
            raw_log,
            events: vec![],
        };

        let empty = MessageLog::default();
        let messages = tx
            .body
            .as_ref()
            .map(|body| body.messages.as_slice())
            .unwrap_or_default();

        for (index, message) in messages.iter().enumerate() {
            let log = find_log(&logs, index).unwrap_or(&empty);
            let routed = self
                .router
                .route(&message.type_url, &message.value, log)?;

            transaction.events.push(transaction_event(
                index,
                &message.type_url,
                routed,
            ));
        }

        if response.code > 0 {
            let message = if response.raw_log.is_empty() {
                response.info.to_owned()
            } else {
                response.raw_log.to_owned()
            };
            transaction.events.push(TransactionEvent {
                id: transaction.events.len().to_string(),
                kind: ERROR_KIND.to_owned(),
                sub: vec![SubsetEvent::failed(
                    ERROR_KIND,
                    &response.codespace,
                    message,
                )],
            });
        }

        Ok(transaction)
    }
}

fn transaction_event(
    index: usize,
    type_url: &str,
    routed: Routed,
) -> TransactionEvent {
    let kind = routed.kind().to_owned();
    let sub = match routed {
        Routed::Event(event) => event,
        Routed::Unknown { module, .. } => SubsetEvent::failed(
            &kind,
            &module,
            Error::UnknownMessageType(type_url.to_owned()).to_string(),
        ),
        Routed::Broken { kind: message, error } => {
            SubsetEvent::failed(&kind, message.module(), error.to_string())
        },
    };

    TransactionEvent {
        id: index.to_string(),
        kind,
        sub: vec![sub],
    }
}

fn fee_amounts(tx: &Tx) -> Result<Vec<Amount>, Error> {
    match tx.auth_info.as_ref().and_then(|info| info.fee.as_ref()) {
        Some(fee) => coin_amounts(&fee.amount),
        None => Ok(vec![]),
    }
}

/// Per-message logs of a response. Nodes that no longer fill `logs` emit
/// flat events tagged with a `msg_index` attribute instead.
pub fn message_logs(response: &TxResponse) -> Vec<MessageLog> {
    if !response.logs.is_empty() {
        return response
            .logs
            .iter()
            .map(|log| MessageLog {
                msg_index: log.msg_index,
                log: log.log.to_owned(),
                events: log
                    .events
                    .iter()
                    .map(|event| LogEvent {
                        kind: event.r#type.to_owned(),
                        attributes: event
                            .attributes
                            .iter()
                            .map(|attribute| LogAttribute {
                                key: attribute.key.to_owned(),
                                value: attribute.value.to_owned(),
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();
    }

    let mut logs: Vec<MessageLog> = vec![];
    for event in &response.events {
        let msg_index = event
            .attributes
            .iter()
            .find(|attribute| attribute.key == MSG_INDEX)
            .and_then(|attribute| attribute.value.parse::<u32>().ok());

        let Some(msg_index) = msg_index else {
            continue;
        };

        let log_event = LogEvent {
            kind: event.r#type.to_owned(),
            attributes: event
                .attributes
                .iter()
                .filter(|attribute| attribute.key != MSG_INDEX)
                .map(|attribute| LogAttribute {
                    key: attribute.key.to_owned(),
                    value: attribute.value.to_owned(),
                })
                .collect(),
        };

        match logs.iter_mut().find(|log| log.msg_index == msg_index) {
            Some(log) => log.events.push(log_event),
            None => logs.push(MessageLog {
                msg_index,
                log: String::new(),
                events: vec![log_event],
            }),
        }
    }

    logs
}
