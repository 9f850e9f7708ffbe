use std::collections::{HashMap, VecDeque};

use tokio::sync::RwLock;

use crate::types::Block;

struct Entries {
    blocks: HashMap<u64, Block>,
    order: VecDeque<u64>,
}

/// Blocks by height, bounded by capacity; the oldest insertion is evicted
/// first.
pub struct BlockCache {
    entries: RwLock<Entries>,
    capacity: usize,
}

impl BlockCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Entries {
                blocks: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
            }),
            capacity,
        }
    }

    pub async fn get(&self, height: u64) -> Option<Block> {
        let entries = self.entries.read().await;
        entries.blocks.get(&height).cloned()
    }

    pub async fn set(&self, block: Block) {
        if self.capacity == 0 {
            return;
        }

        let mut entries = self.entries.write().await;
        let height = block.height;
        if entries.blocks.insert(height, block).is_some() {
            return;
        }

        entries.order.push_back(height);
        while entries.order.len() > self.capacity {
            if let Some(oldest) = entries.order.pop_front() {
                entries.blocks.remove(&oldest);
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.blocks.len()
    }
}

impl std::fmt::Debug for BlockCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockCache")
            .field("capacity", &self.capacity)
            .finish()
    }
}
