//! Levels domain - local minima, near-duplicate filtering and clustering into support levels

mod level_detector;

pub use level_detector::{
    filter_near_duplicates, find_local_minima, merge_levels, strength, LevelDetector,
};
