use std::collections::HashMap;
use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{
    ActionSummary, AssessmentRecord, AuditLogEntry, SamplingRecord, TrainerSummary,
};

pub fn summarize_by_trainer(records: &[AssessmentRecord]) -> Vec<TrainerSummary> {
    let mut map: HashMap<String, (usize, f64, usize)> = HashMap::new();

    for record in records {
        let trainer = record
            .trainer
            .clone()
            .unwrap_or_else(|| "Unassigned".to_string());
        let entry = map.entry(trainer).or_insert((0, 0.0, 0));
        entry.0 += 1;
        entry.1 += record.pass_rate;
        if record.flagged {
            entry.2 += 1;
        }
    }

    let mut summaries: Vec<TrainerSummary> = map
        .into_iter()
        .map(|(trainer, (count, total_pass_rate, flagged))| TrainerSummary {
            trainer,
            assessments: count,
            avg_pass_rate: if count == 0 {
                0.0
            } else {
                total_pass_rate / count as f64
            },
            flagged,
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.assessments
            .cmp(&a.assessments)
            .then_with(|| a.trainer.cmp(&b.trainer))
    });
    summaries
}

pub fn summarize_actions(entries: &[AuditLogEntry]) -> Vec<ActionSummary> {
    let mut map: HashMap<&'static str, usize> = HashMap::new();
    for entry in entries {
        let key = entry.action_type.map(|a| a.as_str()).unwrap_or("unknown");
        *map.entry(key).or_insert(0) += 1;
    }

    let mut summaries: Vec<ActionSummary> = map
        .into_iter()
        .map(|(action_type, count)| ActionSummary {
            action_type: action_type.to_string(),
            count,
        })
        .collect();
    summaries.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.action_type.cmp(&b.action_type))
    });
    summaries
}

/// Counts records per status, `unknown` for records without one.
pub fn status_mix(records: &[AssessmentRecord]) -> Vec<(String, usize)> {
    let mut map: HashMap<String, usize> = HashMap::new();
    for record in records {
        let status = record
            .status
            .as_deref()
            .map(str::to_lowercase)
            .unwrap_or_else(|| "unknown".to_string());
        *map.entry(status).or_insert(0) += 1;
    }
    let mut mix: Vec<(String, usize)> = map.into_iter().collect();
    mix.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    mix
}

pub const PASS_RATE_BANDS: [(&str, f64, f64); 4] = [
    ("below 50%", 0.0, 50.0),
    ("50-69%", 50.0, 70.0),
    ("70-89%", 70.0, 90.0),
    ("90% and above", 90.0, f64::INFINITY),
];

pub fn pass_rate_bands(records: &[AssessmentRecord]) -> Vec<(&'static str, usize)> {
    PASS_RATE_BANDS
        .iter()
        .map(|(label, low, high)| {
            let count = records
                .iter()
                .filter(|r| r.pass_rate >= *low && r.pass_rate < *high)
                .count();
            (*label, count)
        })
        .collect()
}

/// Share of the planned sample that has been reviewed, in percent.
pub fn sampling_coverage(records: &[AssessmentRecord]) -> f64 {
    let planned: u64 = records.iter().map(|r| u64::from(r.sample_size)).sum();
    let reviewed: u64 = records
        .iter()
        .map(|r| u64::from(r.sampled.min(r.sample_size)))
        .sum();
    if planned == 0 {
        0.0
    } else {
        reviewed as f64 * 100.0 / planned as f64
    }
}

pub fn average_pass_rate(records: &[AssessmentRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    records.iter().map(|r| r.pass_rate).sum::<f64>() / records.len() as f64
}

pub fn build_report(
    scope: Option<&str>,
    generated_on: NaiveDate,
    assessments: &[AssessmentRecord],
    history: &[SamplingRecord],
    audit: &[AuditLogEntry],
) -> String {
    let trainers = summarize_by_trainer(assessments);
    let actions = summarize_actions(audit);
    let flagged = assessments.iter().filter(|r| r.flagged).count();

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all assessments");

    let _ = writeln!(output, "# IQA Sampling Report");
    let _ = writeln!(output, "Generated for {} on {}", scope_label, generated_on);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Assessments: {}", assessments.len());
    let _ = writeln!(output, "- Flagged: {}", flagged);
    let _ = writeln!(
        output,
        "- Average pass rate: {:.1}%",
        average_pass_rate(assessments)
    );
    let _ = writeln!(
        output,
        "- Sampling coverage: {:.1}%",
        sampling_coverage(assessments)
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Trainers");
    if trainers.is_empty() {
        let _ = writeln!(output, "No assessments in scope.");
    } else {
        for summary in &trainers {
            let _ = writeln!(
                output,
                "- {}: {} assessments (avg pass rate {:.1}%, {} flagged)",
                summary.trainer, summary.assessments, summary.avg_pass_rate, summary.flagged
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Status Mix");
    if assessments.is_empty() {
        let _ = writeln!(output, "No assessments in scope.");
    } else {
        for (status, count) in status_mix(assessments) {
            let _ = writeln!(output, "- {}: {}", status, count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Pass Rate Bands");
    for (label, count) in pass_rate_bands(assessments) {
        let _ = writeln!(output, "- {}: {}", label, count);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sampling This Session");
    if history.is_empty() {
        let _ = writeln!(output, "No samples drawn.");
    } else {
        for record in history {
            let passed = record.learners.iter().filter(|l| l.passed).count();
            let _ = writeln!(
                output,
                "- {} ({}) {} of {} at {}% by {}, {} passed",
                record.assessment_id,
                record.course.as_deref().unwrap_or("N/A"),
                record.sampled_count,
                record.sample_size,
                record.sampling_percentage,
                record.sampled_by,
                passed
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Audit Activity");
    if actions.is_empty() {
        let _ = writeln!(output, "No audit events recorded.");
    } else {
        for summary in &actions {
            let _ = writeln!(output, "- {}: {} events", summary.action_type, summary.count);
        }
    }

    let mut recent: Vec<&AuditLogEntry> = audit.iter().filter(|e| e.timestamp.is_some()).collect();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Recent Audit Notes");
    if recent.is_empty() {
        let _ = writeln!(output, "No dated audit events.");
    } else {
        for entry in recent.iter().take(5) {
            let _ = writeln!(
                output,
                "- {} ({}) on {}: {}",
                entry.user.as_deref().unwrap_or("Unknown user"),
                entry.action_type.map(|a| a.as_str()).unwrap_or("unknown"),
                entry
                    .timestamp
                    .map(|ts| ts.date_naive().to_string())
                    .unwrap_or_else(|| "Unknown date".to_string()),
                entry.description.as_deref().unwrap_or("N/A")
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    fn record(
        trainer: Option<&str>,
        pass_rate: f64,
        size: u32,
        sampled: u32,
        flagged: bool,
    ) -> AssessmentRecord {
        AssessmentRecord {
            id: "ASM".to_string(),
            course: Some("Carpentry".to_string()),
            trainer: trainer.map(str::to_string),
            date: None,
            sample_size: size,
            sampled,
            pass_rate,
            status: Some("Completed".to_string()),
            flagged,
            detailed_sub_assessments: Vec::new(),
        }
    }

    #[test]
    fn trainers_are_grouped_and_averaged() {
        let records = vec![
            record(Some("Dana"), 80.0, 4, 0, false),
            record(Some("Dana"), 60.0, 4, 0, true),
            record(None, 90.0, 4, 0, false),
        ];
        let summaries = summarize_by_trainer(&records);
        assert_eq!(summaries[0].trainer, "Dana");
        assert_eq!(summaries[0].assessments, 2);
        assert!((summaries[0].avg_pass_rate - 70.0).abs() < 0.001);
        assert_eq!(summaries[0].flagged, 1);
        assert_eq!(summaries[1].trainer, "Unassigned");
    }

    #[test]
    fn coverage_uses_sampled_over_planned() {
        let records = vec![
            record(Some("A"), 50.0, 4, 1, false),
            record(Some("B"), 50.0, 6, 4, false),
        ];
        assert!((sampling_coverage(&records) - 50.0).abs() < 0.001);
        assert_eq!(sampling_coverage(&[]), 0.0);
    }

    #[test]
    fn bands_cover_every_pass_rate() {
        let records = vec![
            record(None, 10.0, 1, 0, false),
            record(None, 69.9, 1, 0, false),
            record(None, 70.0, 1, 0, false),
            record(None, 100.0, 1, 0, false),
        ];
        let bands = pass_rate_bands(&records);
        assert_eq!(bands.iter().map(|(_, c)| c).sum::<usize>(), 4);
        assert_eq!(bands[3], ("90% and above", 1));
    }

    #[test]
    fn status_mix_normalises_case() {
        let mut other = record(None, 1.0, 1, 0, false);
        other.status = None;
        let mix = status_mix(&[record(None, 1.0, 1, 0, false), other]);
        assert!(mix.contains(&("completed".to_string(), 1)));
        assert!(mix.contains(&("unknown".to_string(), 1)));
    }

    #[test]
    fn report_has_every_section() {
        let assessments = seed::assessments();
        let audit = seed::audit_trail();
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let report = build_report(Some("Dana Kerr"), today, &assessments, &[], &audit);

        assert!(report.starts_with("# IQA Sampling Report"));
        assert!(report.contains("Generated for Dana Kerr on 2025-03-01"));
        for heading in [
            "## Overview",
            "## Trainers",
            "## Status Mix",
            "## Pass Rate Bands",
            "## Sampling This Session",
            "## Audit Activity",
            "## Recent Audit Notes",
        ] {
            assert!(report.contains(heading), "missing {heading}");
        }
        assert!(report.contains("No samples drawn."));
        assert!(report.contains("- Assessments: 5"));
    }

    #[test]
    fn empty_report_degrades_gracefully() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let report = build_report(None, today, &[], &[], &[]);
        assert!(report.contains("all assessments"));
        assert!(report.contains("No audit events recorded."));
        assert!(report.contains("- Sampling coverage: 0.0%"));
    }
}
