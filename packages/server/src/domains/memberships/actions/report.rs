//! Period reporter - history entries for one calendar month, plus CSV export

use tracing::debug;

use crate::common::{MembershipError, MembershipResult};
use crate::domains::memberships::models::HistoryEntry;
use crate::kernel::ServerDeps;

/// History entries whose timestamp falls in `year`-`month` (UTC).
pub async fn report(
    year: i32,
    month: u32,
    deps: &ServerDeps,
) -> MembershipResult<Vec<HistoryEntry>> {
    if !(1..=12).contains(&month) {
        return Err(MembershipError::invalid(format!(
            "month must be between 1 and 12, got {}",
            month
        )));
    }

    let entries = deps.history.query_by_period(year, month).await?;
    debug!(year, month, entries = entries.len(), "history report generated");
    Ok(entries)
}

/// One line per entry: user id, slug, operation, RFC 3339 timestamp. No header.
pub fn render_csv(entries: &[HistoryEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let fields = [
            entry.user_id.to_string(),
            entry.segment_slug.clone(),
            entry.operation.to_string(),
            entry.timestamp.to_rfc3339(),
        ];
        let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
