use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::{
    configuration::Config,
    error::Error,
    helpers::with_retry,
    types::Amount,
};

const HEIGHT_HEADER: &str = "x-cosmos-block-height";

#[derive(Debug, Deserialize)]
struct LcdCoin {
    denom: String,
    amount: String,
}

#[derive(Debug, Deserialize)]
struct BalancesBody {
    #[serde(default)]
    balances: Vec<LcdCoin>,
}

#[derive(Debug, Deserialize)]
struct LcdErrorBody {
    #[serde(default)]
    message: String,
}

/// REST (LCD) access for queries that are cheaper over HTTP.
#[derive(Debug, Clone)]
pub struct HTTP {
    client: Client,
    lcd_host: Url,
    api_key: String,
}

impl HTTP {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_search_tx_call))
            .build()?;

        let mut lcd_host = Url::parse(&config.lcd_host)?;
        if !lcd_host.path().ends_with('/') {
            let path = format!("{}/", lcd_host.path());
            lcd_host.set_path(&path);
        }

        Ok(HTTP {
            client,
            lcd_host,
            api_key: config.datahub_key.to_owned(),
        })
    }

    pub fn balances_url(&self, account: &str) -> Result<Url, Error> {
        Ok(self
            .lcd_host
            .join(&format!("cosmos/bank/v1beta1/balances/{}", account))?)
    }

    /// Account balances at `height`; zero queries the latest state.
    pub async fn get_balances(
        &self,
        account: &str,
        height: u64,
    ) -> Result<Vec<Amount>, Error> {
        let url = &self.balances_url(account)?;
        let http = self;

        let body = with_retry("lcd balances", || async move {
            debug!("GET {} at height {}", url, height);
            let mut request = http.client.get(url.clone());
            if height > 0 {
                request = request.header(HEIGHT_HEADER, height.to_string());
            }
            if !http.api_key.is_empty() {
                request = request.header("Authorization", http.api_key.as_str());
            }

            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;
            check_status(status, &text)?;

            Ok(serde_json::from_str::<BalancesBody>(&text)?)
        })
        .await?;

        body.balances
            .into_iter()
            .map(|coin| Amount::from_coin(&coin.amount, &coin.denom))
            .collect()
    }
}

fn check_status(status: StatusCode, body: &str) -> Result<(), Error> {
    if status.is_success() {
        return Ok(());
    }

    let message = serde_json::from_str::<LcdErrorBody>(body)
        .map(|error| error.message)
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| body.to_owned());

    Err(Error::Upstream {
        status: status.as_u16(),
        message,
    })
}
