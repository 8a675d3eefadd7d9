pub mod config;
pub mod errors;
pub mod filters;
pub mod metrics;
pub mod request;
pub mod results;
pub mod search;

pub use config::{EncodingMode, ScanConfig, ScanRequest};
pub use errors::{SearchError, SearchResult};
pub use metrics::ScanStats;
pub use request::parse_request_line;
pub use results::{MatchRecord, RunReport};
pub use search::{scan, scan_with_cancel, CancelToken};
