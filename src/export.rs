/*============================================================
  Synavera Project: Syn-Net
  Module: synnet_core::export
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Plain-text export of recorded network issues for sharing
    with support or pasting into tickets.

  Security / Safety Notes:
    Emits only stored text, which was sanitized on record.

  Dependencies:
    chrono for timestamp formatting.

  Operational Scope:
    Used by the operator binary and any log viewer.

  Revision History:
    2026-10-19 COD  Added text export.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Deterministic output for identical input
============================================================*/

use std::fmt::Write;

use chrono::DateTime;

use crate::store::NetworkErrorLogEntry;

pub const EXPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_time(at_ms: i64) -> String {
    DateTime::from_timestamp_millis(at_ms)
        .map(|ts| ts.format(EXPORT_TIME_FORMAT).to_string())
        .unwrap_or_else(|| at_ms.to_string())
}

fn write_entry_body(out: &mut String, entry: &NetworkErrorLogEntry) {
    let _ = writeln!(out, "{}  x{}", entry.title, entry.occurrence_count);
    let _ = writeln!(out, "first={}", format_time(entry.first_seen_at_ms));
    let _ = writeln!(out, "last={}", format_time(entry.last_seen_at_ms));
    let _ = writeln!(out, "summary={}", entry.summary);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", entry.last_details);
    if let Some(snapshot) = entry
        .last_environment_snapshot
        .as_deref()
        .filter(|text| !text.trim().is_empty())
    {
        let _ = writeln!(out);
        let _ = writeln!(out, "{snapshot}");
    }
    if !entry.recent_samples.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "== recentSamples ==");
        for sample in &entry.recent_samples {
            let _ = writeln!(out, "{sample}");
        }
    }
}

/// Every entry, in the given order.
pub fn export_all_text(entries: &[NetworkErrorLogEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Network Error Logs ===");
    let _ = writeln!(out, "unique={}", entries.len());
    for entry in entries {
        let _ = writeln!(out);
        let _ = writeln!(out, "-----");
        write_entry_body(&mut out, entry);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "=== END ===");
    out.trim_end().to_string()
}

pub fn export_entry_text(entry: &NetworkErrorLogEntry) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Network Error Log ===");
    write_entry_body(&mut out, entry);
    let _ = writeln!(out);
    let _ = writeln!(out, "=== END ===");
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::IssueType;

    fn entry() -> NetworkErrorLogEntry {
        NetworkErrorLogEntry {
            fingerprint: "TIMEOUT|h.example|-|SocketTimeout|read_timeout".into(),
            issue_type: IssueType::Timeout,
            title: "Request timed out".into(),
            summary: "h.example did not answer in time.".into(),
            first_seen_at_ms: 0,
            last_seen_at_ms: 61_000,
            occurrence_count: 3,
            last_details: "== Network Error Diagnosis ==\nissueType=TIMEOUT".into(),
            last_environment_snapshot: Some("== Network Snapshot ==\ntransport=wifi".into()),
            recent_samples: vec!["s1".into(), "s2".into()],
        }
    }

    #[test]
    fn single_entry_layout() {
        let text = export_entry_text(&entry());
        let expected = "=== Network Error Log ===\n\
Request timed out  x3\n\
first=1970-01-01 00:00:00\n\
last=1970-01-01 00:01:01\n\
summary=h.example did not answer in time.\n\
\n\
== Network Error Diagnosis ==\n\
issueType=TIMEOUT\n\
\n\
== Network Snapshot ==\n\
transport=wifi\n\
\n\
== recentSamples ==\n\
s1\n\
s2\n\
\n\
=== END ===";
        assert_eq!(text, expected);
    }

    #[test]
    fn all_entries_layout() {
        let mut bare = entry();
        bare.last_environment_snapshot = Some("  ".into());
        bare.recent_samples.clear();
        let text = export_all_text(&[entry(), bare]);

        assert!(text.starts_with("=== Network Error Logs ===\nunique=2\n\n-----\n"));
        assert!(text.ends_with("\n\n=== END ==="));
        assert_eq!(text.matches("-----").count(), 2);
        assert_eq!(text.matches("== recentSamples ==").count(), 1);
        assert_eq!(text.matches("== Network Snapshot ==").count(), 1);
    }

    #[test]
    fn empty_export() {
        assert_eq!(export_all_text(&[]), "=== Network Error Logs ===\nunique=0\n\n=== END ===");
    }
}
