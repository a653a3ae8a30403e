//! Bar domain - per-token history and the tracked-token catalog

mod bar_store;
mod catalog;
mod merge;

pub use bar_store::{BarStore, MergeResult, SeriesRepository};
pub use catalog::{SeriesHandle, TokenCatalog};
pub use merge::{merge_bars, sort_and_dedup};

#[cfg(test)]
pub(crate) use bar_store::tests::MemoryRepository;
