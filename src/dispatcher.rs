use std::{str::FromStr, sync::Arc, time::Duration};

use serde::{de::DeserializeOwned, Serialize};
use tokio::{sync::mpsc, time::timeout};
use tracing::{debug, error};

use crate::{
    error::Error,
    provider::ChainQuery,
    range::RangeFetcher,
    types::{
        HeightAccount, HeightHash, HeightRange, LatestDataRequest, LatestMark,
        ResponseType, TaskError, TaskRequest, TaskResponse, TaskType,
        END_RESPONSE,
    },
};

const RESPONSE_BUFFER: usize = 64;

/// Runs task requests and streams their numbered responses.
#[derive(Clone)]
pub struct Dispatcher {
    client: Arc<dyn ChainQuery>,
    fetcher: RangeFetcher,
    maximum_heights: u64,
    task_timeout: Duration,
}

/// Numbers responses of one task from zero.
struct Responder {
    id: String,
    order: u64,
    sender: mpsc::Sender<TaskResponse>,
}

impl Responder {
    fn new(id: &str, sender: mpsc::Sender<TaskResponse>) -> Self {
        Responder {
            id: id.to_owned(),
            order: 0,
            sender,
        }
    }

    async fn push(&mut self, response: TaskResponse) -> Result<(), Error> {
        self.order += 1;
        self.sender.send(response).await.map_err(|_| {
            Error::TaskError(format!("response stream of task {} closed", self.id))
        })
    }

    fn response(&self, kind: &str) -> TaskResponse {
        TaskResponse {
            id: self.id.to_owned(),
            kind: kind.to_owned(),
            order: self.order,
            payload: serde_json::Value::Null,
            error: None,
            is_final: false,
        }
    }

    async fn send<T: Serialize>(
        &mut self,
        kind: ResponseType,
        payload: &T,
    ) -> Result<(), Error> {
        let mut response = self.response(kind.as_str());
        response.payload = serde_json::to_value(payload)?;
        self.push(response).await
    }

    async fn fail(&mut self, err: &Error) -> Result<(), Error> {
        let mut response = self.response(ResponseType::Error.as_str());
        response.error = Some(TaskError {
            msg: err.to_string(),
        });
        self.push(response).await
    }

    async fn end(mut self, error: Option<String>) -> Result<(), Error> {
        let mut response = self.response(END_RESPONSE);
        response.error = error.map(|msg| TaskError { msg });
        response.is_final = true;
        self.push(response).await
    }
}

fn payload<T: DeserializeOwned>(request: &TaskRequest) -> Result<T, Error> {
    serde_json::from_value(request.payload.clone()).map_err(|err| {
        Error::TaskError(format!("invalid {} payload: {}", request.kind, err))
    })
}

impl Dispatcher {
    pub fn new(
        client: Arc<dyn ChainQuery>,
        fetcher: RangeFetcher,
        maximum_heights: u64,
        task_timeout: Duration,
    ) -> Self {
        Dispatcher {
            client,
            fetcher,
            maximum_heights,
            task_timeout,
        }
    }

    pub fn fetcher(&self) -> &RangeFetcher {
        &self.fetcher
    }

    /// Spawns `request` and returns its response stream, which always ends
    /// with a final `END` response.
    pub fn dispatch(&self, request: TaskRequest) -> mpsc::Receiver<TaskResponse> {
        let (sender, receiver) = mpsc::channel(RESPONSE_BUFFER);
        let dispatcher = self.clone();
        tokio::spawn(async move {
            if let Err(err) = dispatcher.run(request, sender).await {
                error!("{}", err);
            }
        });
        receiver
    }

    pub async fn run(
        &self,
        request: TaskRequest,
        sender: mpsc::Sender<TaskResponse>,
    ) -> Result<(), Error> {
        debug!("task {} of type {} received", request.id, request.kind);
        let mut responder = Responder::new(&request.id, sender);

        let task_type = match TaskType::from_str(&request.kind) {
            Ok(task_type) => task_type,
            Err(err) => return responder.end(Some(err.to_string())).await,
        };

        let result = match timeout(
            self.task_timeout,
            self.handle(task_type, &request, &mut responder),
        )
        .await
        {
            Ok(result) => result,
            Err(elapsed) => Err(Error::from(elapsed)),
        };

        if let Err(err) = result {
            error!("task {} ({}) failed: {}", request.id, task_type, err);
            responder.fail(&err).await?;
        }

        responder.end(None).await
    }

    async fn handle(
        &self,
        task_type: TaskType,
        request: &TaskRequest,
        responder: &mut Responder,
    ) -> Result<(), Error> {
        match task_type {
            TaskType::GetTransactions => {
                let range: HeightRange = payload(request)?;
                if range.start_height == 0 || range.end_height == 0 {
                    return Err(Error::TaskError(String::from(
                        "start_height and end_height must be greater than zero",
                    )));
                }
                self.stream_range(range, responder).await
            },
            TaskType::GetLatestData => {
                let last: LatestDataRequest = payload(request)?;
                let latest = self.client.get_block(0).await?;
                let start = if last.last_height > 0 {
                    last.last_height + 1
                } else {
                    0
                };
                let range = HeightRange::last_heights(
                    start,
                    self.maximum_heights,
                    latest.height + 1,
                );
                self.stream_range(range, responder).await
            },
            TaskType::GetBlock => {
                let selector: HeightHash = payload(request)?;
                let block = self.client.get_block(selector.height).await?;
                responder.send(ResponseType::Block, &block).await
            },
            TaskType::GetLatestMark => {
                let block = self.client.get_block(0).await?;
                responder
                    .send(ResponseType::LatestMark, &LatestMark::from(&block))
                    .await
            },
            TaskType::GetReward => {
                let query: HeightAccount = payload(request)?;
                let reward = self.client.get_reward(&query).await?;
                responder.send(ResponseType::Reward, &reward).await
            },
            TaskType::GetAccountBalance => {
                let query: HeightAccount = payload(request)?;
                let balance = self.client.get_account_balance(&query).await?;
                responder.send(ResponseType::AccountBalance, &balance).await
            },
            TaskType::GetAccountDelegations => {
                let query: HeightAccount = payload(request)?;
                let delegations =
                    self.client.get_account_delegations(&query).await?;
                responder
                    .send(ResponseType::Delegations, &delegations)
                    .await
            },
        }
    }

    async fn stream_range(
        &self,
        range: HeightRange,
        responder: &mut Responder,
    ) -> Result<(), Error> {
        let mut stream = self.fetcher.fetch(range);
        while let Some(result) = stream.next().await {
            let data = result?;
            responder.send(ResponseType::Block, &data.block).await?;
            for transaction in &data.transactions {
                responder
                    .send(ResponseType::Transaction, transaction)
                    .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        decoder::TransactionDecoder,
        provider::memory::MemoryChain,
        router::{DecodeStats, Router},
    };

    fn dispatcher(chain: MemoryChain, task_timeout: Duration) -> Dispatcher {
        let client: Arc<dyn ChainQuery> = Arc::new(chain);
        let router = Router::new("pool", Arc::new(DecodeStats::default()));
        let fetcher =
            RangeFetcher::new(client.clone(), TransactionDecoder::new(router), 5);
        Dispatcher::new(client, fetcher, 100, task_timeout)
    }

    fn request(kind: &str, payload: serde_json::Value) -> TaskRequest {
        TaskRequest {
            id: String::from("task-1"),
            kind: kind.to_owned(),
            payload,
        }
    }

    async fn responses(
        dispatcher: &Dispatcher,
        request: TaskRequest,
    ) -> Vec<TaskResponse> {
        let mut receiver = dispatcher.dispatch(request);
        let mut responses = vec![];
        while let Some(response) = receiver.recv().await {
            responses.push(response);
        }
        responses
    }

    fn assert_numbered(responses: &[TaskResponse]) {
        for (index, response) in responses.iter().enumerate() {
            assert_eq!(response.order, index as u64);
            assert_eq!(response.id, "task-1");
        }
        let last = responses.last().unwrap();
        assert_eq!(last.kind, END_RESPONSE);
        assert!(last.is_final);
        assert_eq!(responses.iter().filter(|r| r.is_final).count(), 1);
    }

    #[tokio::test]
    async fn unknown_task_type_ends_with_error() {
        let dispatcher = dispatcher(MemoryChain::new(10), Duration::from_secs(5));
        let responses = responses(&dispatcher, request("GetWeather", json!({}))).await;

        assert_eq!(responses.len(), 1);
        assert_numbered(&responses);
        assert_eq!(
            responses[0].error.as_ref().unwrap().msg,
            "There is no such handler GetWeather"
        );
    }

    #[tokio::test]
    async fn streams_blocks_and_transactions_in_order() {
        let chain = MemoryChain::new(100).with_send(21, "cosmos1a", "cosmos1b");
        let dispatcher = dispatcher(chain, Duration::from_secs(5));
        let responses = responses(
            &dispatcher,
            request(
                "GetTransactions",
                json!({"start_height": 20, "end_height": 23}),
            ),
        )
        .await;

        assert_numbered(&responses);
        let kinds: Vec<&str> = responses.iter().map(|r| r.kind.as_str()).collect();
        assert_eq!(
            kinds,
            ["Block", "Block", "Transaction", "Block", END_RESPONSE]
        );
        assert_eq!(responses[0].payload["height"], 20);
        assert_eq!(responses[2].payload["hash"], "TX21");
        assert!(responses.iter().all(|r| r.error.is_none()));
    }

    #[tokio::test]
    async fn zero_end_height_is_rejected() {
        let dispatcher = dispatcher(MemoryChain::new(10), Duration::from_secs(5));
        let responses = responses(
            &dispatcher,
            request("GetTransactions", json!({"start_height": 1, "end_height": 0})),
        )
        .await;

        assert_numbered(&responses);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].kind, "Error");
        assert!(responses[0].error.is_some());
    }

    #[tokio::test]
    async fn zero_start_height_is_rejected() {
        let dispatcher = dispatcher(MemoryChain::new(200), Duration::from_secs(5));
        let responses = responses(
            &dispatcher,
            request("GetTransactions", json!({"start_height": 0, "end_height": 4})),
        )
        .await;

        assert_numbered(&responses);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].kind, "Error");
        assert!(responses
            .iter()
            .all(|r| r.payload.get("height").and_then(|h| h.as_u64()) != Some(200)));
    }

    #[tokio::test]
    async fn latest_data_from_scratch_starts_at_first_height() {
        let dispatcher = dispatcher(MemoryChain::new(4), Duration::from_secs(5));
        let responses = responses(&dispatcher, request("GetLatestData", json!({}))).await;

        assert_numbered(&responses);
        let heights: Vec<u64> = responses
            .iter()
            .filter(|r| r.kind == "Block")
            .filter_map(|r| r.payload["height"].as_u64())
            .collect();
        assert_eq!(heights, [1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn range_failure_keeps_delivered_heights() {
        let mut chain = MemoryChain::new(100);
        chain.failing = Some(12);
        let dispatcher = dispatcher(chain, Duration::from_secs(5));
        let responses = responses(
            &dispatcher,
            request(
                "GetTransactions",
                json!({"start_height": 10, "end_height": 15}),
            ),
        )
        .await;

        assert_numbered(&responses);
        let kinds: Vec<&str> = responses.iter().map(|r| r.kind.as_str()).collect();
        assert_eq!(kinds, ["Block", "Block", "Error", END_RESPONSE]);
        assert!(responses[2]
            .error
            .as_ref()
            .unwrap()
            .msg
            .contains("height 12"));
    }

    #[tokio::test]
    async fn latest_mark_uses_latest_block() {
        let dispatcher = dispatcher(MemoryChain::new(77), Duration::from_secs(5));
        let responses = responses(&dispatcher, request("GetLatestMark", json!({}))).await;

        assert_numbered(&responses);
        assert_eq!(responses[0].kind, "LatestMark");
        assert_eq!(responses[0].payload["last_height"], 77);
        assert_eq!(responses[0].payload["last_hash"], "HASH77");
    }

    #[tokio::test]
    async fn latest_data_continues_after_last_known_height() {
        let dispatcher = dispatcher(MemoryChain::new(30), Duration::from_secs(5));
        let responses = responses(
            &dispatcher,
            request("GetLatestData", json!({"last_height": 27})),
        )
        .await;

        assert_numbered(&responses);
        let heights: Vec<u64> = responses
            .iter()
            .filter(|r| r.kind == "Block")
            .filter_map(|r| r.payload["height"].as_u64())
            .collect();
        assert_eq!(heights, [28, 29, 30]);
    }

    #[tokio::test]
    async fn account_queries_answer_once() {
        let dispatcher = dispatcher(MemoryChain::new(10), Duration::from_secs(5));
        let query = json!({"height": 5, "account": "cosmos1a"});

        let balance =
            responses(&dispatcher, request("GetAccountBalance", query.clone())).await;
        assert_numbered(&balance);
        assert_eq!(balance[0].kind, "AccountBalance");
        assert_eq!(balance[0].payload["balances"][0]["currency"], "uatom");

        let reward = responses(&dispatcher, request("GetReward", query.clone())).await;
        assert_eq!(reward[0].kind, "Reward");
        assert_eq!(reward[0].payload["rewards"]["cosmosvaloper1"][0]["exp"], 18);

        let delegations =
            responses(&dispatcher, request("GetAccountDelegations", query)).await;
        assert_eq!(delegations[0].kind, "Delegations");
        assert_eq!(delegations.len(), 2);
    }

    #[tokio::test]
    async fn task_timeout_reports_error() {
        let mut chain = MemoryChain::new(10);
        chain.delays.insert(3, Duration::from_secs(5));
        let dispatcher = dispatcher(chain, Duration::from_millis(100));
        let responses = responses(
            &dispatcher,
            request("GetBlock", json!({"height": 3})),
        )
        .await;

        assert_numbered(&responses);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].kind, "Error");
    }

    #[tokio::test]
    async fn malformed_payload_is_reported() {
        let dispatcher = dispatcher(MemoryChain::new(10), Duration::from_secs(5));
        let responses = responses(
            &dispatcher,
            request("GetReward", json!({"height": "not a number"})),
        )
        .await;

        assert_numbered(&responses);
        assert!(responses[0]
            .error
            .as_ref()
            .unwrap()
            .msg
            .contains("invalid GetReward payload"));
    }
}
