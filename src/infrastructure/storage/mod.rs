//! File-backed persistence under the data root

pub mod alert_history;
pub mod alert_state_file;
pub mod csv_repository;
pub mod json_store;

pub use alert_history::AlertHistoryLog;
pub use alert_state_file::AlertStateFile;
pub use csv_repository::CsvSeriesRepository;
pub use json_store::JsonStore;
