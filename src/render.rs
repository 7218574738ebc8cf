//! Human-readable reports over a [`QueueStats`] snapshot.
//!
//! All renderers are pure: the same snapshot always renders to the same bytes.
//! Queues and connections are listed in name order.

use crate::{Result, stats::QueueStats};
use comfy_table::Table;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt::Write as _};

/// Output format for a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Indented plain text
    #[default]
    Text,
    /// A single self-contained HTML table
    Html,
    /// Pretty-printed JSON including derived totals
    Json,
    /// Boxed terminal table
    Table,
}

impl ReportFormat {
    pub fn render(&self, stats: &QueueStats) -> Result<String> {
        match self {
            ReportFormat::Text => Ok(render_text(stats)),
            ReportFormat::Html => Ok(render_html(stats)),
            ReportFormat::Json => render_json(stats),
            ReportFormat::Table => Ok(render_table(stats)),
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::Text | ReportFormat::Table => "text/plain; charset=utf-8",
            ReportFormat::Html => "text/html; charset=utf-8",
            ReportFormat::Json => "application/json",
        }
    }
}

/// One line per queue, followed by one indented line per consuming connection.
///
/// ```text
///     queue:orders ready:3 unacked:5 consumers:2
///         connection:worker-1 unacked:5 consumers:2
/// ```
pub fn render_text(stats: &QueueStats) -> String {
    let mut out = String::new();

    for (queue_name, queue) in stats.iter() {
        let _ = writeln!(
            out,
            "    queue:{} ready:{} unacked:{} consumers:{}",
            queue_name,
            queue.ready_count,
            queue.unacked_count(),
            queue.consumer_count()
        );

        for connection_name in queue.connection_names() {
            let connection = &queue.connection_stats[connection_name];
            let _ = writeln!(
                out,
                "        connection:{} unacked:{} consumers:{}",
                connection_name,
                connection.unacked_count,
                connection.consumer_count()
            );
        }
    }

    out
}

/// A complete HTML document holding one monospace table.
///
/// Connection rows are dimmed and follow the row of the queue they consume.
pub fn render_html(stats: &QueueStats) -> String {
    let mut out = String::from(r#"<html><body><table style="font-family:monospace">"#);

    out.push_str(concat!(
        "<tr><td>queue</td><td></td><td>ready</td><td></td>",
        r#"<td style="color:lightgrey">connection</td><td></td>"#,
        "<td>unacked</td><td></td><td>consumers</td><td></td></tr>",
    ));

    for (queue_name, queue) in stats.iter() {
        let _ = write!(
            out,
            "<tr><td>{}</td><td></td><td>{}</td><td></td><td></td><td></td><td>{}</td><td></td><td>{}</td><td></td></tr>",
            escape_html(queue_name),
            queue.ready_count,
            queue.unacked_count(),
            queue.consumer_count()
        );

        for connection_name in queue.connection_names() {
            let connection = &queue.connection_stats[connection_name];
            let _ = write!(
                out,
                r#"<tr style="color:lightgrey"><td></td><td></td><td></td><td></td><td>{}</td><td></td><td>{}</td><td></td><td>{}</td><td></td></tr>"#,
                escape_html(connection_name),
                connection.unacked_count,
                connection.consumer_count()
            );
        }
    }

    out.push_str("</table></body></html>");
    out
}

#[derive(Serialize)]
struct JsonConnection<'a> {
    unacked_count: u64,
    consumers: &'a [String],
}

#[derive(Serialize)]
struct JsonQueue<'a> {
    ready_count: u64,
    unacked_count: u64,
    consumer_count: usize,
    connections: BTreeMap<&'a str, JsonConnection<'a>>,
}

/// Pretty-printed JSON keyed by queue name, with derived totals spelled out.
pub fn render_json(stats: &QueueStats) -> Result<String> {
    let report: BTreeMap<&str, JsonQueue<'_>> = stats
        .iter()
        .map(|(queue_name, queue)| {
            let connections = queue
                .connection_stats
                .iter()
                .map(|(name, connection)| {
                    (
                        name.as_str(),
                        JsonConnection {
                            unacked_count: connection.unacked_count,
                            consumers: &connection.consumers,
                        },
                    )
                })
                .collect();

            (
                queue_name,
                JsonQueue {
                    ready_count: queue.ready_count,
                    unacked_count: queue.unacked_count(),
                    consumer_count: queue.consumer_count(),
                    connections,
                },
            )
        })
        .collect();

    Ok(serde_json::to_string_pretty(&report)?)
}

/// Boxed table for terminals, grouped like the text report.
pub fn render_table(stats: &QueueStats) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Queue", "Ready", "Connection", "Unacked", "Consumers"]);

    for (queue_name, queue) in stats.iter() {
        table.add_row(vec![
            queue_name.to_string(),
            queue.ready_count.to_string(),
            String::new(),
            queue.unacked_count().to_string(),
            queue.consumer_count().to_string(),
        ]);

        for connection_name in queue.connection_names() {
            let connection = &queue.connection_stats[connection_name];
            table.add_row(vec![
                String::new(),
                String::new(),
                connection_name.to_string(),
                connection.unacked_count.to_string(),
                connection.consumer_count().to_string(),
            ]);
        }
    }

    table.to_string()
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}
