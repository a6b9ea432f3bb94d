use chrono::{NaiveDate, TimeZone, Utc};

use crate::models::{ActionType, AssessmentRecord, AuditLogEntry, Portfolio, SubAssessment};

/// Built-in assessment batches used when no input file is given.
pub fn assessments() -> Vec<AssessmentRecord> {
    #[allow(clippy::type_complexity)]
    #[rustfmt::skip]
    let batches: Vec<(&str, &str, &str, (i32, u32, u32), u32, u32, f64, &str, bool)> = vec![
        ("ASM-1001", "Level 2 Electrical Installation", "Dana Kerr",
            (2025, 1, 14), 6, 0, 83.0, "completed", false),
        ("ASM-1002", "Level 3 Plumbing NVQ", "Morgan Hale",
            (2025, 1, 22), 5, 1, 64.0, "completed", true),
        ("ASM-1003", "Level 2 Health and Social Care", "Priya Shah",
            (2025, 2, 3), 8, 0, 91.0, "in_review", false),
        ("ASM-1004", "Level 3 Business Administration", "Dana Kerr",
            (2025, 2, 11), 4, 4, 100.0, "verified", false),
        ("ASM-1005", "Level 2 Carpentry", "Sam Okafor",
            (2025, 2, 19), 7, 0, 57.0, "scheduled", true),
    ];

    let learners = [
        ("LRN-201", "Alex Turner"),
        ("LRN-202", "Bea Lindqvist"),
        ("LRN-203", "Chris Mensah"),
        ("LRN-204", "Dev Patel"),
        ("LRN-205", "Ella Byrne"),
        ("LRN-206", "Femi Adebayo"),
        ("LRN-207", "Grace Liu"),
        ("LRN-208", "Hugo Martins"),
    ];

    batches
        .into_iter()
        .enumerate()
        .map(|(batch, row)| {
            let (id, course, trainer, (y, m, d), sample_size, sampled, pass_rate, status, flagged) =
                row;

            let subs = learners
                .iter()
                .take(sample_size as usize)
                .enumerate()
                .map(|(i, (learner_id, name))| {
                    let score = 40.0 + ((batch * 7 + i * 13) % 60) as f64;
                    SubAssessment {
                        learner_id: learner_id.to_string(),
                        learner_name: Some(name.to_string()),
                        score,
                        passed: score >= 50.0,
                    }
                })
                .collect();

            AssessmentRecord {
                id: id.to_string(),
                course: Some(course.to_string()),
                trainer: Some(trainer.to_string()),
                date: NaiveDate::from_ymd_opt(y, m, d),
                sample_size,
                sampled,
                pass_rate,
                status: Some(status.to_string()),
                flagged,
                detailed_sub_assessments: subs,
            }
        })
        .collect()
}

pub fn audit_trail() -> Vec<AuditLogEntry> {
    #[rustfmt::skip]
    let entries = vec![
        ("Priya Shah", ActionType::Login, "Signed in to IQA dashboard",
            "session", "S-88", (2025, 2, 20, 8, 55)),
        ("Priya Shah", ActionType::Sample, "Sampled 30% of ASM-1002",
            "assessment", "ASM-1002", (2025, 2, 20, 9, 12)),
        ("Jordan Reeve", ActionType::Verify, "Verified portfolio for Dev Patel",
            "portfolio", "PF-3004", (2025, 2, 21, 14, 3)),
        ("Jordan Reeve", ActionType::Comment, "Requested additional evidence",
            "portfolio", "PF-3002", (2025, 2, 21, 14, 40)),
        ("Casey Wong", ActionType::Export, "Exported audit trail CSV",
            "report", "RPT-12", (2025, 2, 24, 16, 20)),
    ];

    let mut trail: Vec<AuditLogEntry> = entries
        .into_iter()
        .map(|(user, action, description, target_type, target_id, stamp)| {
            let (y, mo, d, h, mi) = stamp;
            AuditLogEntry {
                user: Some(user.to_string()),
                action_type: Some(action),
                description: Some(description.to_string()),
                target_type: Some(target_type.to_string()),
                target_id: Some(target_id.to_string()),
                timestamp: Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).single(),
            }
        })
        .collect();

    // System events arrive without a user or timestamp.
    trail.push(AuditLogEntry {
        user: None,
        action_type: Some(ActionType::Update),
        description: Some("Nightly LMS sync".to_string()),
        target_type: Some("system".to_string()),
        target_id: None,
        timestamp: None,
    });

    trail
}

pub fn portfolios() -> Vec<Portfolio> {
    #[rustfmt::skip]
    let rows = vec![
        ("PF-3001", "Alex Turner", "Level 2 Electrical Installation",
            "Dana Kerr", "pending", (2025, 2, 2)),
        ("PF-3002", "Bea Lindqvist", "Level 3 Plumbing NVQ",
            "Morgan Hale", "needs_revision", (2025, 2, 9)),
        ("PF-3004", "Dev Patel", "Level 3 Business Administration",
            "Dana Kerr", "verified", (2025, 2, 15)),
        ("PF-3007", "Grace Liu", "Level 2 Carpentry",
            "Sam Okafor", "pending", (2025, 2, 18)),
    ];

    rows.into_iter()
        .map(|(id, learner, qualification, assessor, status, (y, m, d))| Portfolio {
            id: id.to_string(),
            learner_name: Some(learner.to_string()),
            qualification: Some(qualification.to_string()),
            assessor: Some(assessor.to_string()),
            status: Some(status.to_string()),
            submitted_at: Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).single(),
            feedback: None,
            comments: Vec::new(),
        })
        .collect()
}
