use std::sync::Arc;

use serde::Serialize;
use tokio::{
    sync::{mpsc, oneshot, Mutex},
    task::{JoinHandle, JoinSet},
};
use tracing::{debug, error};

use crate::{
    decoder::TransactionDecoder,
    error::Error,
    provider::ChainQuery,
    types::{Block, HeightRange, Transaction},
};

pub const MIN_WORKERS: usize = 5;
pub const MAX_WORKERS: usize = 20;

type HeightResult = Result<HeightData, Error>;

/// One fetched height with its decoded transactions.
#[derive(Debug, Clone, Serialize)]
pub struct HeightData {
    pub block: Block,
    pub transactions: Vec<Transaction>,
}

/// Fetches height ranges with a fixed pool of workers and delivers them in
/// ascending height order.
#[derive(Clone)]
pub struct RangeFetcher {
    client: Arc<dyn ChainQuery>,
    decoder: TransactionDecoder,
    workers: usize,
}

impl RangeFetcher {
    pub fn new(
        client: Arc<dyn ChainQuery>,
        decoder: TransactionDecoder,
        workers: usize,
    ) -> Self {
        RangeFetcher {
            client,
            decoder,
            workers: workers.clamp(MIN_WORKERS, MAX_WORKERS),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn decoder(&self) -> &TransactionDecoder {
        &self.decoder
    }

    /// Starts fetching `range` from height 1 at the lowest, as height 0 is
    /// the latest block. The stream yields every height in order and
    /// ends after the first failed height, which is reported as
    /// [`Error::RangeFetch`].
    pub fn fetch(&self, range: HeightRange) -> RangeStream {
        let range = range.chain_heights();
        let (output, results) = mpsc::channel(self.workers);
        let fetcher = self.clone();
        let handle = tokio::spawn(fetcher.supervise(range, output));

        RangeStream { results, handle }
    }

    async fn supervise(self, range: HeightRange, output: mpsc::Sender<HeightResult>) {
        let (work_tx, work_rx) =
            mpsc::channel::<(u64, oneshot::Sender<HeightResult>)>(self.workers);
        let (order_tx, mut order_rx) =
            mpsc::channel::<(u64, oneshot::Receiver<HeightResult>)>(self.workers * 2);

        // Dropping the set aborts every task still running in it.
        let mut tasks = JoinSet::new();

        tasks.spawn(async move {
            for height in range.heights() {
                let (done_tx, done_rx) = oneshot::channel();
                if order_tx.send((height, done_rx)).await.is_err() {
                    break;
                }
                if work_tx.send((height, done_tx)).await.is_err() {
                    break;
                }
            }
        });

        let work_rx = Arc::new(Mutex::new(work_rx));
        for _ in 0..self.workers {
            let work_rx = work_rx.clone();
            let client = self.client.clone();
            let decoder = self.decoder.clone();

            tasks.spawn(async move {
                loop {
                    let job = work_rx.lock().await.recv().await;
                    let Some((height, done)) = job else {
                        break;
                    };
                    let result = fetch_height(client.as_ref(), &decoder, height).await;
                    if done.send(result).is_err() {
                        break;
                    }
                }
            });
        }

        while let Some((height, done)) = order_rx.recv().await {
            let result = match done.await {
                Ok(result) => result,
                Err(_) => Err(Error::Cancelled),
            };

            match result {
                Ok(data) => {
                    if output.send(Ok(data)).await.is_err() {
                        debug!("range consumer gone at height {}", height);
                        break;
                    }
                },
                Err(err) => {
                    error!("range {:?} aborted at height {}: {}", range, height, err);
                    let _ = output
                        .send(Err(Error::RangeFetch {
                            height,
                            source: Box::new(err),
                        }))
                        .await;
                    break;
                },
            }
        }

        tasks.abort_all();
    }
}

/// Block fetch, then transaction search and decode when the block has any.
pub async fn fetch_height(
    client: &dyn ChainQuery,
    decoder: &TransactionDecoder,
    height: u64,
) -> HeightResult {
    debug!("fetching height {}", height);
    let block = client.get_block(height).await?;

    let mut transactions = vec![];
    if block.num_txs > 0 {
        for (tx, response) in client.search_transactions(&block).await? {
            transactions.push(decoder.decode(&tx, &response, &block)?);
        }
    }

    Ok(HeightData {
        block,
        transactions,
    })
}

/// Ordered results of one range fetch. Dropping the stream cancels it.
#[derive(Debug)]
pub struct RangeStream {
    results: mpsc::Receiver<HeightResult>,
    handle: JoinHandle<()>,
}

impl RangeStream {
    pub async fn next(&mut self) -> Option<HeightResult> {
        self.results.recv().await
    }

    /// Stops all workers; results not yet received are discarded.
    pub fn cancel(&mut self) {
        self.handle.abort();
        self.results.close();
        while self.results.try_recv().is_ok() {}
    }

    /// Drains the stream into memory, failing on the first error.
    pub async fn collect(mut self) -> Result<Vec<HeightData>, Error> {
        let mut data = vec![];
        while let Some(result) = self.next().await {
            data.push(result?);
        }
        Ok(data)
    }
}

impl Drop for RangeStream {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
