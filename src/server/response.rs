use crate::error::EnrichmentError;
use crate::models::{RunSummary, TableOutcome, TableResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn table_json(table: &TableResult) -> Value {
    let counts = table.counts();
    let mut body = json!({
        "table": table.table,
        "processed": counts.processed,
        "updated": counts.updated,
        "failed": counts.failed,
        "results": table.results(),
    });

    let outcome = match &table.outcome {
        TableOutcome::NoStaleRows => "no_stale_rows",
        TableOutcome::Processed { .. } => "processed",
        TableOutcome::FetchFailed { error } => {
            body["error"] = json!(error);
            "fetch_failed"
        }
    };
    body["outcome"] = json!(outcome);
    body
}

/// Body for a finished run: the "no data" shape when nothing was processed
pub fn summary_body(summary: &RunSummary) -> Value {
    let tables: Vec<Value> = summary.tables.iter().map(table_json).collect();

    if summary.is_empty() {
        return json!({
            "success": true,
            "noData": true,
            "message": "No stale listings needed enrichment",
            "timestamp": timestamp(summary.started_at),
            "tables": tables,
        });
    }

    let totals = summary.totals;
    let skipped = totals.processed.saturating_sub(totals.updated + totals.failed);
    let results: Vec<_> = summary.results().collect();

    json!({
        "success": true,
        "timestamp": timestamp(summary.started_at),
        "processed": totals.processed,
        "updated": totals.updated,
        "failed": totals.failed,
        "total": totals.processed,
        "tables": tables,
        "results": results,
        "stats": {
            "total": totals.processed,
            "processed": totals.processed,
            "successful": totals.updated,
            "failed": totals.failed,
            "skipped": skipped,
            "duration": summary.duration_ms,
        },
        "message": format!(
            "Enriched {} of {} stale listings across {} tables ({} failed)",
            totals.updated,
            totals.processed,
            summary.tables.len(),
            totals.failed
        ),
    })
}

pub fn error_body(err: &EnrichmentError) -> Value {
    json!({
        "success": false,
        "error": err.to_string(),
        "timestamp": timestamp(Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Counts, EnrichmentResult};
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn normal_body_shape() {
        let summary = RunSummary {
            started_at: at(),
            totals: Counts { processed: 1, updated: 1, failed: 0 },
            tables: vec![
                TableResult {
                    table: "listings".into(),
                    outcome: TableOutcome::Processed {
                        counts: Counts { processed: 1, updated: 1, failed: 0 },
                        results: vec![EnrichmentResult::success("L1", "listings", Some(true))],
                    },
                },
                TableResult {
                    table: "probate_leads".into(),
                    outcome: TableOutcome::FetchFailed {
                        error: "backend error: timeout".into(),
                    },
                },
            ],
            duration_ms: 42,
        };

        let body = summary_body(&summary);

        assert_eq!(body["success"], true);
        assert!(body.get("noData").is_none());
        assert_eq!(body["timestamp"], "2025-06-01T12:00:00.000Z");
        assert_eq!(body["tables"][0]["table"], "listings");
        assert_eq!(body["tables"][0]["outcome"], "processed");
        assert_eq!(body["tables"][0]["updated"], 1);
        assert_eq!(body["tables"][0]["failed"], 0);
        assert_eq!(body["tables"][0]["results"][0]["id"], "L1");
        assert_eq!(body["tables"][0]["results"][0]["expired"], true);
        assert_eq!(body["tables"][1]["outcome"], "fetch_failed");
        assert_eq!(body["tables"][1]["error"], "backend error: timeout");
        assert_eq!(body["stats"]["total"], 1);
        assert_eq!(body["stats"]["successful"], 1);
        assert_eq!(body["stats"]["skipped"], 0);
        assert_eq!(body["stats"]["duration"], 42);
        assert_eq!(body["results"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn empty_run_is_no_data() {
        let summary = RunSummary {
            started_at: at(),
            totals: Counts::default(),
            tables: vec![TableResult {
                table: "listings".into(),
                outcome: TableOutcome::NoStaleRows,
            }],
            duration_ms: 3,
        };

        let body = summary_body(&summary);

        assert_eq!(body["noData"], true);
        assert!(body.get("stats").is_none());
        assert_eq!(body["tables"][0]["outcome"], "no_stale_rows");
    }

    #[test]
    fn error_body_is_structured() {
        let body = error_body(&EnrichmentError::Unauthorized);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "unauthorized");
    }
}
