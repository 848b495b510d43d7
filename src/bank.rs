//! Generic reader for count-prefixed homogeneous item banks
//!
//! A bank is an ordinary chunk whose decoded body holds a u32 item count
//! followed by that many items. The chunk may be followed in the outer
//! stream by a sentinel chunk whose code is the item kind's end marker.

use std::panic::Location;

use tracing::{debug, error, warn};

use crate::chunks::ChunkSummary;
use crate::cursor::ByteCursor;
use crate::entry::ChunkEntry;
use crate::error::{Error, Result, ResultExt};
use crate::game::Game;
use crate::trace;

/// One record of a bank.
pub trait Item: Default {
    /// Name of the bank holding this kind of item.
    const NAME: &'static str;

    /// Code of the sentinel chunk that may follow the bank.
    const END_MARKER: Option<u16>;

    fn read(&mut self, game: &Game, strm: &mut ByteCursor<'_>) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct Bank<T> {
    pub entry: ChunkEntry,
    /// Items in file order. Slots whose read failed hold `T::default()`.
    pub items: Vec<T>,
    pub end: Option<ChunkEntry>,
    /// Indices of items that failed and were skipped.
    pub failed: Vec<usize>,
    /// Set when the whole bank failed and was downgraded to empty.
    pub error: Option<Error>,
}

impl<T: Item> Bank<T> {
    /// Read the bank chunk, its items and the optional sentinel.
    #[track_caller]
    pub fn read(game: &Game, strm: &mut ByteCursor<'_>) -> Result<Self> {
        let location = Location::caller();

        let mut entry = ChunkEntry::default();
        entry
            .read(game, strm)
            .trace_with(|| format!("Failed To Read {} Entry", T::NAME))?;
        debug!(
            "{}{} 0x{:04X}: {} bytes, {}",
            trace::indent(),
            T::NAME,
            entry.id,
            entry.raw_body.len(),
            entry.mode
        );

        let mut bank = Bank {
            entry,
            items: Vec::new(),
            end: None,
            failed: Vec::new(),
            error: None,
        };

        let result = {
            let _nest = trace::nest();
            bank.read_items(game)
        };
        if let Err(err) = result {
            let err = err.traced(location, format!("Failed To Read {}", T::NAME), None);
            if !game.options().skip_broken_items {
                return Err(err);
            }
            error!("{}Skipping broken {}:\n{}", trace::indent(), T::NAME, err);
            bank.items.clear();
            bank.failed.clear();
            bank.error = Some(err);
        }

        if let Some(marker) = T::END_MARKER {
            if strm.peek_u16().ok() == Some(marker) {
                let mut end = ChunkEntry::default();
                end.read(game, strm)
                    .trace_with(|| format!("Failed To Read {} End", T::NAME))?;
                bank.end = Some(end);
            }
        }

        Ok(bank)
    }

    fn read_items(&mut self, game: &Game) -> Result<()> {
        let decoded = self
            .entry
            .decode_body(game.modes())
            .trace("Failed To Decode Bank Body")?;
        let mut strm = decoded.cursor();

        let count = strm.read_u32().trace("Failed To Read Item Count")? as usize;
        // Every item takes at least one byte.
        self.items = Vec::with_capacity(count.min(strm.remaining()));

        let progress = game.progress();
        let _reset = progress.scoped();
        let mut budget = game.options().max_item_read_fails;

        for i in 0..count {
            let mut item = T::default();
            match item.read(game, &mut strm) {
                Ok(()) => {
                    progress.set(strm.position() as f32 / strm.size().max(1) as f32);
                }
                Err(err) if budget > 0 => {
                    budget -= 1;
                    warn!(
                        "{}Failed to read {} item {} of {} ({} retries left):\n{}",
                        trace::indent(),
                        T::NAME,
                        i,
                        count,
                        budget,
                        err
                    );
                    self.failed.push(i);
                    item = T::default();
                }
                Err(err) => {
                    return Err(err.traced(
                        Location::caller(),
                        format!("Failed To Read Item {} Of {}", i, count),
                        None,
                    ));
                }
            }
            self.items.push(item);
        }

        if !strm.empty() {
            warn!(
                "{}{} has {} leftover bytes after {} items",
                trace::indent(),
                T::NAME,
                strm.remaining(),
                count
            );
        }
        Ok(())
    }

    pub fn summary(&self, name: &'static str) -> ChunkSummary {
        let mut summary = ChunkSummary::of(name, &self.entry);
        summary.items = Some(self.items.len());
        summary.failed = self.failed.clone();
        summary.error = self.error.as_ref().map(|err| err.kind().to_string());
        summary
    }
}
