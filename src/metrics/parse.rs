//! Text exposition format parser.
//!
//! Only sample lines are read; `# HELP` / `# TYPE` metadata and malformed
//! lines are skipped.

use std::collections::BTreeMap;
use tracing::debug;

/// One sample line: `name{label="value",...} value [timestamp]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

impl Sample {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }
}

/// Parse every well-formed sample in `text`.
pub fn parse(text: &str) -> Vec<Sample> {
    text.lines()
        .filter_map(|line| {
            let sample = parse_line(line);
            if sample.is_none() && is_sample_line(line) {
                debug!(line, "Skipping malformed metrics line");
            }
            sample
        })
        .collect()
}

fn is_sample_line(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && !line.starts_with('#')
}

/// Parse a single line. Comments, blank and malformed lines yield `None`.
pub fn parse_line(line: &str) -> Option<Sample> {
    let line = line.trim();
    if !is_sample_line(line) {
        return None;
    }

    let name_end = line
        .find(|c: char| c == '{' || c.is_whitespace())
        .unwrap_or(line.len());
    let name = &line[..name_end];
    if name.is_empty() || !name.chars().all(is_name_char) {
        return None;
    }

    let mut rest = &line[name_end..];
    let mut labels = BTreeMap::new();
    if let Some(inner) = rest.strip_prefix('{') {
        let (parsed, after) = parse_labels(inner)?;
        labels = parsed;
        rest = after;
    }

    let value = parse_value(rest.split_whitespace().next()?)?;
    Some(Sample {
        name: name.to_string(),
        labels,
        value,
    })
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ':'
}

/// Parse `k="v",...}` and return the labels and the text after `}`.
fn parse_labels(input: &str) -> Option<(BTreeMap<String, String>, &str)> {
    let mut labels = BTreeMap::new();
    let mut chars = input.char_indices().peekable();
    loop {
        while let Some(&(_, c)) = chars.peek() {
            if c == ',' || c.is_whitespace() {
                chars.next();
            } else {
                break;
            }
        }

        let (start, c) = chars.next()?;
        if c == '}' {
            return Some((labels, &input[start + 1..]));
        }
        if !is_name_char(c) {
            return None;
        }
        let mut end = None;
        for (i, c) in chars.by_ref() {
            if c == '=' {
                end = Some(i);
                break;
            }
        }
        let key = input[start..end?].trim();
        if !key.chars().all(is_name_char) {
            return None;
        }

        if chars.next()?.1 != '"' {
            return None;
        }
        let mut value = String::new();
        loop {
            match chars.next()?.1 {
                '\\' => match chars.next()?.1 {
                    'n' => value.push('\n'),
                    other => value.push(other),
                },
                '"' => break,
                other => value.push(other),
            }
        }
        labels.insert(key.to_string(), value);
    }
}

fn parse_value(raw: &str) -> Option<f64> {
    match raw {
        "+Inf" => Some(f64::INFINITY),
        "-Inf" => Some(f64::NEG_INFINITY),
        "NaN" => Some(f64::NAN),
        _ => raw.parse().ok(),
    }
}
