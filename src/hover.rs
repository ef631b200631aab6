//! Hover annotation text.
//!
//! Each text field becomes one line of the form `<b>Name:</b> value`. Lines
//! are wrapped greedily at word boundaries and joined with `<br>`, which is
//! the only line break the renderer understands. Values are normalized first
//! (control whitespace and NBSP to spaces, runs collapsed, trimmed), so the
//! output contains no raw whitespace other than single spaces and
//! re-normalizing it is a no-op.

use crate::config::HoverConfig;
use crate::records::{Edge, Node, TextField};
use std::collections::HashMap;

/// Line separator understood by the renderer.
pub const BREAK: &str = "<br>";

/// Values that mean "no data" upstream.
const PLACEHOLDERS: &[&str] = &["None", "NaN", "nan", "null"];

#[derive(Debug, Clone)]
pub struct HoverTextFormatter {
    default_width: usize,
    header_width: usize,
    headers: Vec<String>,
    /// Keyed by normalized, lowercased field name.
    field_widths: HashMap<String, usize>,
}

impl Default for HoverTextFormatter {
    fn default() -> Self {
        Self::new(&HoverConfig::default())
    }
}

impl HoverTextFormatter {
    pub fn new(config: &HoverConfig) -> Self {
        Self {
            default_width: config.default_width.max(1),
            header_width: config.header_width.max(1),
            headers: config.headers.clone(),
            field_widths: config
                .field_widths
                .iter()
                .map(|(name, width)| (Self::normalize(name).to_lowercase(), *width))
                .collect(),
        }
    }

    /// Turn `\n`, `\r`, `\t` and NBSP into spaces, collapse runs, trim.
    pub fn normalize(text: &str) -> String {
        text.split(|c: char| c.is_whitespace() || c == '\u{a0}')
            .filter(|word| !word.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Format fields into one hover string, one (possibly wrapped) line each.
    pub fn format(&self, fields: &[TextField]) -> String {
        fields
            .iter()
            .filter_map(|field| self.line(&field.name, field.value.as_deref()?))
            .collect::<Vec<_>>()
            .join(BREAK)
    }

    /// Hover text for a render node.
    pub fn node_hover(&self, node: &Node) -> String {
        let mut fields = Vec::with_capacity(node.text_fields.len() + 2);
        fields.push(TextField::new("Topic", Some(node.cluster.clone())));
        fields.extend(node.text_fields.iter().cloned());
        fields.push(TextField::new("Sentiment", Some(two_decimals(node.sentiment))));
        self.format(&fields)
    }

    /// Hover text for a render edge, given the clusters of its endpoints.
    pub fn edge_hover(&self, edge: &Edge, source: Option<&str>, target: Option<&str>) -> String {
        let topics = format!(
            "{} ↔ {}",
            source.unwrap_or(crate::records::UNKNOWN_CLUSTER),
            target.unwrap_or(crate::records::UNKNOWN_CLUSTER)
        );
        let mut fields = Vec::with_capacity(edge.text_fields.len() + 3);
        fields.push(TextField::new("Topics", Some(topics)));
        fields.extend(edge.text_fields.iter().cloned());
        fields.push(TextField::new(
            "Engagement Score",
            Some(format!("{}", edge.weight.trunc() as i64)),
        ));
        fields.push(TextField::new("Sentiment", Some(two_decimals(edge.sentiment))));
        self.format(&fields)
    }

    fn line(&self, name: &str, value: &str) -> Option<String> {
        let value = Self::normalize(value);
        if value.is_empty() || PLACEHOLDERS.contains(&value.as_str()) {
            return None;
        }
        let name = Self::normalize(name);
        let label = format!("{}:", name);
        let plain_len = label.chars().count() + 1 + value.chars().count();
        let plain = format!("{} {}", label, value);

        let wrap_width = self
            .field_widths
            .get(&name.to_lowercase())
            .copied()
            .unwrap_or(self.default_width)
            .max(1);
        let is_header = self.headers.iter().any(|h| plain.starts_with(h.as_str()));
        let width = if is_header && plain_len <= self.header_width {
            usize::MAX
        } else {
            wrap_width
        };

        let mut tokens = vec![label.as_str()];
        tokens.extend(value.split(' '));
        let rows = wrap(&tokens, width);

        let body = rows
            .iter()
            .map(|row| row.join(" "))
            .collect::<Vec<_>>()
            .join(BREAK);
        // The label is always the first token of the first row.
        let rest = &body[label.len()..];
        Some(format!("<b>{}</b>{}", label, rest))
    }
}

/// Greedy word wrap. Never splits a token; an over-long token gets its own row.
fn wrap<'a>(tokens: &[&'a str], width: usize) -> Vec<Vec<&'a str>> {
    let mut rows: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0;
    for &token in tokens {
        let len = token.chars().count();
        if current.is_empty() {
            current.push(token);
            current_len = len;
        } else if current_len + 1 + len <= width {
            current.push(token);
            current_len += 1 + len;
        } else {
            rows.push(std::mem::take(&mut current));
            current.push(token);
            current_len = len;
        }
    }
    if !current.is_empty() {
        rows.push(current);
    }
    rows
}

fn two_decimals(v: f64) -> String {
    // + 0.0 folds -0.0 so it prints as 0.00
    format!("{:.2}", v + 0.0)
}
