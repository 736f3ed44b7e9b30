//! Server Metrics
//!
//! Scraping and rendering of the server's Prometheus-style `/metrics`
//! endpoint, plus a stub endpoint for tests.

pub mod parse;
pub mod report;
pub mod scrape;
pub mod stub;

pub use parse::{parse, parse_line, Sample};
pub use report::{DatabaseStats, StatsReport};
pub use scrape::MetricsScraper;
pub use stub::MetricsStub;
