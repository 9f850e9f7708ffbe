use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub hash: String,
    pub height: u64,
    pub time: DateTime<Utc>,
    pub chain_id: String,
    pub num_txs: u64,
}

/// Height selector; zero means the latest block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightHash {
    #[serde(default)]
    pub height: u64,
    #[serde(default)]
    pub hash: String,
}

/// Heights `[start_height, end_height)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeightRange {
    pub start_height: u64,
    pub end_height: u64,
}

impl HeightRange {
    pub fn new(start_height: u64, end_height: u64) -> Self {
        HeightRange {
            start_height,
            end_height,
        }
    }

    pub fn heights(&self) -> std::ops::Range<u64> {
        self.start_height..self.end_height
    }

    pub fn len(&self) -> u64 {
        self.end_height.saturating_sub(self.start_height)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Range to catch up on after `last_known`, capped at `maximum` heights
    /// below `latest`. Never starts below height 1, since height 0 selects
    /// the latest block.
    pub fn last_heights(last_known: u64, maximum: u64, latest: u64) -> Self {
        let start = if last_known == 0
            || latest.saturating_sub(last_known) > maximum
        {
            latest.saturating_sub(maximum)
        } else {
            last_known
        };

        HeightRange::new(start.max(1), latest)
    }

    /// Same range with height 0 excluded.
    pub fn chain_heights(&self) -> Self {
        HeightRange::new(self.start_height.max(1), self.end_height)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestDataRequest {
    #[serde(default)]
    pub last_height: u64,
    #[serde(default)]
    pub last_hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestMark {
    pub last_height: u64,
    pub last_hash: String,
    pub last_time: DateTime<Utc>,
}

impl From<&Block> for LatestMark {
    fn from(block: &Block) -> Self {
        LatestMark {
            last_height: block.height,
            last_hash: block.hash.to_owned(),
            last_time: block.time,
        }
    }
}
