//! In-memory, append-only market data store.
//!
//! The store keeps every collected record in insertion order. Readers work on a
//! snapshot: the vector lives behind an `Arc` so a scan only clones the pointer,
//! and `add` goes through `Arc::make_mut`, which copies the vector only while a
//! snapshot is still alive. A scan therefore never observes records added after it
//! started, and writers never wait for slow scans.
//!
//! Operations:
//! - `MarketDataRepository::add(record)` — append, no validation or deduplication.
//! - `MarketDataRepository::get_one(symbol)` — first record for `symbol`, if any.
//! - `MarketDataRepository::get_all(symbol)` — lazy `MarketDataFeed` over a snapshot.

use std::sync::{Arc, RwLock};

use log::debug;
use market_common::{MarketData, Result};

/// Shared store of collected market data.
#[derive(Debug, Default)]
pub struct MarketDataRepository {
    records: RwLock<Arc<Vec<MarketData>>>,
}

impl MarketDataRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `record` to the store.
    pub fn add(&self, record: MarketData) -> Result<()> {
        let mut records = self.records.write()?;
        debug!("Storing {} at {}", record.symbol, record.price);
        Arc::make_mut(&mut *records).push(record);
        Ok(())
    }

    /// First stored record for `symbol`, or `None` when there is none.
    pub fn get_one(&self, symbol: &str) -> Result<Option<MarketData>> {
        let records = self.snapshot()?;
        Ok(records.iter().find(|r| r.symbol == symbol).cloned())
    }

    /// Every record for `symbol` in insertion order, read lazily from a snapshot
    /// taken now.
    pub fn get_all(&self, symbol: &str) -> Result<MarketDataFeed> {
        Ok(MarketDataFeed {
            records: self.snapshot()?,
            symbol: symbol.to_string(),
            cursor: 0,
        })
    }

    /// Number of stored records.
    pub fn len(&self) -> Result<usize> {
        Ok(self.records.read()?.len())
    }

    /// `true` when nothing has been collected yet.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn snapshot(&self) -> Result<Arc<Vec<MarketData>>> {
        Ok(Arc::clone(&*self.records.read()?))
    }
}

/// Per-call cursor over a repository snapshot.
///
/// Dropping the feed releases the snapshot; nothing else is shared with other
/// calls.
#[derive(Debug)]
pub struct MarketDataFeed {
    records: Arc<Vec<MarketData>>,
    symbol: String,
    cursor: usize,
}

impl Iterator for MarketDataFeed {
    type Item = MarketData;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(record) = self.records.get(self.cursor) {
            self.cursor += 1;
            if record.symbol == self.symbol {
                return Some(record.clone());
            }
        }
        None
    }
}
