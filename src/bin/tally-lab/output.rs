//! Output formatting for CLI results.
//!
//! Supports both human-readable and JSON output formats.

use tally::coordination::Category;
use tally::coordination::Event;
use tally::coordination::StressReport;
use tally::coordination::TallySnapshot;
use tally::coordination::VoteOutcome;
use tokio::sync::broadcast;
use tracing::warn;

/// Trait for types that can be output in multiple formats.
pub trait Outputable {
    /// Convert to JSON value for structured output.
    fn to_json(&self) -> serde_json::Value;

    /// Convert to human-readable string.
    fn to_human(&self) -> String;
}

/// Print a value in the appropriate format.
pub fn print_output<T: Outputable>(value: &T, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&value.to_json())
                .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize: {}\"}}", e))
        );
    } else {
        println!("{}", value.to_human());
    }
}

/// Print one activity line.
pub fn print_event(event: &Event, json: bool) {
    if json {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(seq = event.seq, error = %e, "failed to serialize event"),
        }
    } else {
        println!("[{:>4}] {}", event.seq, event.describe());
    }
}

/// Print events until the tally that emits them is dropped.
pub async fn stream_events(mut receiver: broadcast::Receiver<Event>, json: bool) {
    loop {
        match receiver.recv().await {
            Ok(event) => print_event(&event, json),
            Err(broadcast::error::RecvError::Lagged(count)) => {
                warn!(count, "activity stream lagged, missed events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn counts_table(snapshot: &TallySnapshot) -> String {
    let mut lines: Vec<String> = Category::ALL
        .iter()
        .map(|c| {
            format!(
                "{:<10} {:>5}  ({:>3}%)",
                c.as_str(),
                snapshot.counters.get(*c),
                snapshot.counters.share_percent(*c)
            )
        })
        .collect();
    lines.push(format!("{:<10} {:>5}", "total", snapshot.counters.total));
    lines.push(format!("{:<10} {:>5}", "committed", snapshot.committed));
    lines.join("\n")
}

fn mutex_label(enabled: bool) -> &'static str {
    if enabled { "ON (SAFE)" } else { "OFF (DANGEROUS)" }
}

/// Final state of a tally.
pub struct SnapshotOutput<'a>(pub &'a TallySnapshot);

impl Outputable for SnapshotOutput<'_> {
    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.0).unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }))
    }

    fn to_human(&self) -> String {
        let snapshot = self.0;
        format!(
            "Tally\n\
             =====\n\
             Mutex:      {}\n\
             {}\n\
             Lost:       {}\n\
             Consistent: {}",
            mutex_label(snapshot.protection_enabled),
            counts_table(snapshot),
            snapshot.lost_updates(),
            snapshot.is_consistent()
        )
    }
}

/// Summary of a stress run.
pub struct StressOutput<'a>(pub &'a StressReport);

impl Outputable for StressOutput<'_> {
    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.0).unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }))
    }

    fn to_human(&self) -> String {
        let report = self.0;
        let outcomes: Vec<String> = report.outcomes.iter().map(outcome_line).collect();
        let grants: Vec<&str> = report.grant_order.iter().map(|a| a.as_str()).collect();
        format!(
            "Stress run\n\
             ==========\n\
             Mutex:            {}\n\
             Committed:        {}\n\
             Rejected:         {}\n\
             Peak queue depth: {}\n\
             Grant order:      {}\n\
             Served in order:  {}\n\
             {}\n\n\
             {}",
            mutex_label(report.protected),
            report.committed(),
            report.rejected(),
            report.peak_queue_depth,
            if grants.is_empty() { "-".to_string() } else { grants.join(" -> ") },
            report.is_fifo(),
            outcomes.join("\n"),
            SnapshotOutput(&report.snapshot).to_human()
        )
    }
}

/// Result of one sequential vote.
pub fn outcome_line(outcome: &VoteOutcome) -> String {
    match outcome.result {
        Ok(written) => format!("{} -> {}: recorded (count {written})", outcome.actor, outcome.category),
        Err(reason) => format!("{} -> {}: rejected ({reason})", outcome.actor, outcome.category),
    }
}

/// Both halves of the lost-update demonstration.
pub struct LostUpdateOutput<'a> {
    pub category: Category,
    pub unprotected: &'a StressReport,
    pub protected: &'a StressReport,
}

impl Outputable for LostUpdateOutput<'_> {
    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "category": self.category,
            "unprotected": {
                "count": self.unprotected.snapshot.counters.get(self.category),
                "committed": self.unprotected.committed(),
                "lost_updates": self.unprotected.lost_updates(),
            },
            "protected": {
                "count": self.protected.snapshot.counters.get(self.category),
                "committed": self.protected.committed(),
                "lost_updates": self.protected.lost_updates(),
            },
        })
    }

    fn to_human(&self) -> String {
        format!(
            "Lost update ({})\n\
             ================\n\
             Mutex OFF: count {} after {} committed votes ({} lost)\n\
             Mutex ON:  count {} after {} committed votes ({} lost)",
            self.category,
            self.unprotected.snapshot.counters.get(self.category),
            self.unprotected.committed(),
            self.unprotected.lost_updates(),
            self.protected.snapshot.counters.get(self.category),
            self.protected.committed(),
            self.protected.lost_updates()
        )
    }
}
