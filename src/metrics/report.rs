//! Human-readable stats built from scraped samples.

use super::parse::Sample;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use owo_colors::OwoColorize;
use std::collections::BTreeMap;

pub const DB_INFO: &str = "immudb_db_info";
pub const DB_ENTRIES: &str = "immudb_number_of_stored_entries";
pub const DB_SIZE: &str = "immudb_db_size_bytes";
pub const UPTIME_HOURS: &str = "immudb_uptime_hours";
pub const REQUESTS_HANDLED: &str = "grpc_server_handled_total";
pub const RESIDENT_MEMORY: &str = "process_resident_memory_bytes";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseStats {
    pub name: String,
    pub path: Option<String>,
    pub entries: Option<u64>,
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsReport {
    /// Sorted by name
    pub databases: Vec<DatabaseStats>,
    pub uptime: Option<chrono::Duration>,
    pub requests_handled: Option<u64>,
    pub resident_memory_bytes: Option<u64>,
}

impl StatsReport {
    pub fn from_samples(samples: &[Sample]) -> Self {
        let mut databases: BTreeMap<String, DatabaseStats> = BTreeMap::new();
        let mut report = StatsReport::default();
        let mut requests: Option<f64> = None;

        for sample in samples {
            let db = sample.label("db").map(|name| {
                databases.entry(name.to_string()).or_insert_with(|| DatabaseStats {
                    name: name.to_string(),
                    ..Default::default()
                })
            });
            match (sample.name.as_str(), db) {
                (DB_INFO, Some(db)) => {
                    if let Some(path) = sample.label("path") {
                        db.path = Some(path.to_string());
                    }
                }
                (DB_ENTRIES, Some(db)) => db.entries = as_count(sample.value),
                (DB_SIZE, Some(db)) => db.size_bytes = as_count(sample.value),
                (UPTIME_HOURS, _) if sample.value.is_finite() && sample.value >= 0.0 => {
                    report.uptime = Some(chrono::Duration::seconds((sample.value * 3600.0) as i64));
                }
                (REQUESTS_HANDLED, _) if sample.value.is_finite() => {
                    *requests.get_or_insert(0.0) += sample.value;
                }
                (RESIDENT_MEMORY, _) => report.resident_memory_bytes = as_count(sample.value),
                _ => {}
            }
        }

        report.requests_handled = requests.and_then(as_count);
        report.databases = databases.into_values().collect();
        report
    }

    /// Render as text. Each database gets a table with a `Database path` row;
    /// with no database metrics a single placeholder table is printed.
    pub fn render(&self, color: bool) -> String {
        let mut out = String::new();
        out.push_str(&format!("{}\n", heading("Server", color)));
        out.push_str(&format!("  Uptime: {}\n", or_dash(self.uptime.map(format_duration))));
        out.push_str(&format!(
            "  Requests handled: {}\n",
            or_dash(self.requests_handled.map(|n| n.to_string()))
        ));
        out.push_str(&format!(
            "  Resident memory: {}\n\n",
            or_dash(self.resident_memory_bytes.map(format_bytes))
        ));

        out.push_str(&format!("{}\n", heading("Databases", color)));
        let placeholder = [DatabaseStats::default()];
        let databases = if self.databases.is_empty() {
            &placeholder[..]
        } else {
            &self.databases[..]
        };
        for db in databases {
            let mut table = Table::new();
            table.load_preset(UTF8_BORDERS_ONLY);
            table.set_header(vec!["Field", "Value"]);
            table.add_row(vec!["Database".to_string(), or_dash(non_empty(&db.name))]);
            table.add_row(vec!["Database path".to_string(), or_dash(db.path.clone())]);
            table.add_row(vec![
                "Entries".to_string(),
                or_dash(db.entries.map(|n| n.to_string())),
            ]);
            table.add_row(vec!["Size".to_string(), or_dash(db.size_bytes.map(format_bytes))]);
            out.push_str(&format!("{}\n", table));
        }
        out
    }
}

fn heading(title: &str, color: bool) -> String {
    if color {
        format!("{}", title.bold().underline())
    } else {
        title.to_string()
    }
}

fn as_count(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then(|| value.round() as u64)
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "-".to_string())
}

/// `1536` → `1.5 KiB`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// `93784s` → `1d 2h 3m`.
pub fn format_duration(duration: chrono::Duration) -> String {
    let days = duration.num_days();
    let hours = duration.num_hours() % 24;
    let minutes = duration.num_minutes() % 60;
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}
