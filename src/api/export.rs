use anyhow::{anyhow, Context, Result};
use chrono::SecondsFormat;

use crate::models::SampleResult;

/// One row per round: `timestamp,da_score,blocks_consistent,sample_time_ms`.
pub fn history_csv(history: &[SampleResult]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["timestamp", "da_score", "blocks_consistent", "sample_time_ms"])?;
    for entry in history {
        writer.write_record([
            entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            entry.da_score.to_string(),
            entry.blocks_consistent.to_string(),
            entry.performance.total_sample_time_ms.to_string(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("failed to flush csv export: {}", e.error()))?;
    String::from_utf8(bytes).context("csv export is not utf-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NetworkHealth, RoundPerformance};
    use crate::scorer;
    use chrono::{TimeZone, Utc};

    #[test]
    fn writes_header_and_rows() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let da = scorer::score(&[], &[], &[], &NetworkHealth::default(), now);
        let result = SampleResult {
            timestamp: now,
            da_score: da.total,
            grade: da.grade,
            factors: da.factors,
            breakdown: da.factors.breakdown(),
            blocks: Vec::new(),
            sampled_txs: Vec::new(),
            tx_details: Vec::new(),
            blocks_consistent: false,
            performance: RoundPerformance {
                total_sample_time_ms: 42,
                rpc_metrics: Vec::new(),
            },
            network_health: NetworkHealth::default(),
        };

        let csv = history_csv(&[result]).unwrap();
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines[0], "timestamp,da_score,blocks_consistent,sample_time_ms");
        assert_eq!(lines[1], "2023-11-14T22:13:20.000Z,20,false,42");
        assert_eq!(history_csv(&[]).unwrap().lines().count(), 1);
    }
}
