//! Summary statistics across training sessions.

use serde::{Deserialize, Serialize};

use crate::engine::StepStatus;
use crate::report::SessionRow;

/// Cross-session summary shown above the session listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Number of sessions.
    pub count: usize,
    /// Mean session duration in seconds, truncated.
    pub average_total_secs: i64,
    /// Mean score, truncated.
    pub average_score: u32,
    /// Number of sessions that reached the pass threshold.
    pub passed_count: usize,
    /// Per-step outcome counts, in protocol order.
    pub per_step: Vec<StepStats>,
}

/// Outcome counts for one protocol step across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStats {
    pub name: String,
    pub ok: usize,
    pub too_slow: usize,
    pub missing: usize,
    /// Mean recorded cumulative time, truncated; `None` if never recorded.
    pub average_cumulative_secs: Option<u32>,
}

impl StepStats {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ok: 0,
            too_slow: 0,
            missing: 0,
            average_cumulative_secs: None,
        }
    }
}

/// Summarize evaluated sessions. Averages are 0 for an empty slice.
pub fn summarize(rows: &[SessionRow]) -> SessionSummary {
    if rows.is_empty() {
        return SessionSummary::default();
    }

    let count = rows.len();
    let total_secs: i64 = rows.iter().map(|r| r.total_secs).sum();
    let total_score: u64 = rows.iter().map(|r| u64::from(r.evaluation.score)).sum();
    let passed_count = rows.iter().filter(|r| r.evaluation.passed).count();

    let mut per_step: Vec<StepStats> = Vec::new();
    let mut cumulative_sums: Vec<(u64, u64)> = Vec::new();

    for row in rows {
        for step in &row.evaluation.steps {
            let idx = match per_step.iter().position(|s| s.name == step.name) {
                Some(idx) => idx,
                None => {
                    per_step.push(StepStats::new(&step.name));
                    cumulative_sums.push((0, 0));
                    per_step.len() - 1
                }
            };
            let stats = &mut per_step[idx];
            match step.status {
                StepStatus::Ok => stats.ok += 1,
                StepStatus::TooSlow => stats.too_slow += 1,
                StepStatus::Missing => stats.missing += 1,
            }
            if let Some(secs) = step.cumulative_secs {
                let (sum, n) = &mut cumulative_sums[idx];
                *sum += u64::from(secs);
                *n += 1;
            }
        }
    }

    for (stats, (sum, n)) in per_step.iter_mut().zip(cumulative_sums) {
        if n > 0 {
            stats.average_cumulative_secs = u32::try_from(sum / n).ok();
        }
    }

    SessionSummary {
        count,
        average_total_secs: total_secs / count as i64,
        average_score: u32::try_from(total_score / count as u64).unwrap_or(u32::MAX),
        passed_count,
        per_step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{evaluate, RawStep};
    use crate::model::SessionSource;
    use crate::protocol::Protocol;
    use chrono::Utc;

    fn row(id: u64, total_secs: i64, times: &[Option<u32>]) -> SessionRow {
        let protocol = Protocol::reference();
        let raw: Vec<RawStep> = protocol
            .steps()
            .iter()
            .zip(times)
            .map(|(s, t)| RawStep::new(s.name.clone(), *t))
            .collect();
        SessionRow {
            id,
            trainer: "t".into(),
            disponent: format!("d{id}"),
            start_time: Utc::now(),
            total_secs,
            source: SessionSource::ManualEntry,
            evaluation: evaluate(&protocol, &raw).unwrap(),
            feedback_count: 0,
        }
    }

    fn on_time() -> Vec<Option<u32>> {
        [8, 55, 70, 110, 125, 180, 195, 200, 240, 270]
            .iter()
            .map(|&t| Some(t))
            .collect()
    }

    #[test]
    fn empty_collection_defaults_to_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.average_total_secs, 0);
        assert_eq!(summary.average_score, 0);
        assert!(summary.per_step.is_empty());
    }

    #[test]
    fn averages_are_truncated() {
        let mut missing_most = vec![None; 10];
        missing_most[0] = Some(8);
        let rows = vec![row(1, 100, &on_time()), row(2, 201, &missing_most)];
        let summary = summarize(&rows);
        assert_eq!(summary.count, 2);
        // (100 + 201) / 2 = 150.5
        assert_eq!(summary.average_total_secs, 150);
        // (46 + 2) / 2 = 24
        assert_eq!(summary.average_score, 24);
        assert_eq!(summary.passed_count, 1);
    }

    #[test]
    fn per_step_counts_follow_protocol_order() {
        let mut late_first = on_time();
        late_first[0] = Some(30);
        let rows = vec![row(1, 300, &on_time()), row(2, 300, &late_first), row(3, 0, &[None; 10])];
        let summary = summarize(&rows);
        assert_eq!(summary.per_step.len(), 10);
        let first = &summary.per_step[0];
        assert_eq!(first.name, "Anrufannahme");
        assert_eq!((first.ok, first.too_slow, first.missing), (1, 1, 1));
        // (8 + 30) / 2
        assert_eq!(first.average_cumulative_secs, Some(19));
        assert_eq!(summary.per_step[9].name, "Rückversichern der Geschwindigkeit und Drucktiefe");
    }

    #[test]
    fn never_recorded_step_has_no_average() {
        let summary = summarize(&[row(1, 0, &[None; 10])]);
        assert!(summary.per_step.iter().all(|s| s.average_cumulative_secs.is_none()));
        assert!(summary.per_step.iter().all(|s| s.missing == 1));
    }
}
