pub mod fpl_api;
pub mod historical;

pub use fpl_api::FplApiClient;
pub use historical::{HistoricalDataClient, SeasonHistory};
