use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::error::{QaError, QaResult};
use crate::models::{AssessmentRecord, SampledLearner, SamplingRecord, SubAssessment};

/// A sampling percentage in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Percentage(u8);

impl Percentage {
    pub fn new(value: u8) -> QaResult<Self> {
        if value > 100 {
            return Err(QaError::Validation(format!(
                "sampling percentage must be between 0 and 100, got {value}"
            )));
        }
        Ok(Percentage(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

/// `ceil(sample_size * percentage / 100)`, computed without floating point.
pub fn sample_count(sample_size: u32, percentage: Percentage) -> usize {
    let scaled = u64::from(sample_size) * u64::from(percentage.value());
    scaled.div_ceil(100) as usize
}

pub struct Sampler<R: Rng> {
    rng: R,
}

impl Sampler<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Sampler::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_os_rng() -> Self {
        Sampler::new(StdRng::from_os_rng())
    }

    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Sampler::seeded(seed),
            None => Sampler::from_os_rng(),
        }
    }
}

impl<R: Rng> Sampler<R> {
    pub fn new(rng: R) -> Self {
        Sampler { rng }
    }

    /// Draws without replacement by shuffling a copy and keeping the head.
    /// Asking for more than is available yields everything.
    pub fn draw(&mut self, pool: &[SubAssessment], count: usize) -> Vec<SubAssessment> {
        let mut shuffled = pool.to_vec();
        shuffled.shuffle(&mut self.rng);
        shuffled.truncate(count);
        shuffled
    }

    pub fn sample(
        &mut self,
        record: &AssessmentRecord,
        percentage: Percentage,
        sampled_by: &str,
        sampled_date: DateTime<Utc>,
    ) -> SamplingRecord {
        let wanted = sample_count(record.sample_size, percentage);
        let drawn = self.draw(&record.detailed_sub_assessments, wanted);

        if drawn.len() < wanted {
            tracing::debug!(
                assessment = %record.id,
                wanted,
                available = drawn.len(),
                "sample larger than available sub-assessments"
            );
        }

        let learners: Vec<SampledLearner> = drawn
            .into_iter()
            .map(|sub| SampledLearner {
                name: sub
                    .learner_name
                    .clone()
                    .unwrap_or_else(|| sub.learner_id.clone()),
                id: sub.learner_id,
                score: sub.score,
                passed: sub.passed,
            })
            .collect();

        SamplingRecord {
            id: Uuid::new_v4(),
            assessment_id: record.id.clone(),
            course: record.course.clone(),
            trainer: record.trainer.clone(),
            sample_size: record.sample_size,
            sampled_count: learners.len(),
            sampling_percentage: percentage.value(),
            learners,
            sampled_date,
            sampled_by: sampled_by.to_string(),
        }
    }
}

/// Sampling state for one desk session. The history lives only as long as the session.
pub struct SamplingSession<R: Rng> {
    sampler: Sampler<R>,
    history: Vec<SamplingRecord>,
}

impl<R: Rng> SamplingSession<R> {
    pub fn new(sampler: Sampler<R>) -> Self {
        SamplingSession {
            sampler,
            history: Vec::new(),
        }
    }

    /// Samples every record in `selected`, bumps each record's reviewed counter and
    /// appends the results to the session history.
    pub fn run(
        &mut self,
        selected: &mut [AssessmentRecord],
        percentage: Percentage,
        sampled_by: &str,
    ) -> Vec<SamplingRecord> {
        let now = Utc::now();
        let mut results = Vec::with_capacity(selected.len());

        for record in selected.iter_mut() {
            let result = self.sampler.sample(record, percentage, sampled_by, now);
            record.record_sampling(result.sampled_count);
            tracing::info!(
                assessment = %record.id,
                sampled = result.sampled_count,
                percentage = percentage.value(),
                "assessment sampled"
            );
            results.push(result);
        }

        self.history.extend(results.iter().cloned());
        results
    }

    pub fn history(&self) -> &[SamplingRecord] {
        &self.history
    }
}

/// Picks the records whose id is listed; an empty id list selects everything.
pub fn select_records(records: Vec<AssessmentRecord>, ids: &[String]) -> Vec<AssessmentRecord> {
    if ids.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|record| ids.iter().any(|id| id.eq_ignore_ascii_case(&record.id)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record(id: &str, sample_size: u32, subs: usize) -> AssessmentRecord {
        AssessmentRecord {
            id: id.to_string(),
            course: Some("Level 3 Electrical".to_string()),
            trainer: Some("Dana Kerr".to_string()),
            date: None,
            sample_size,
            sampled: 0,
            pass_rate: 80.0,
            status: Some("completed".to_string()),
            flagged: false,
            detailed_sub_assessments: (0..subs)
                .map(|i| SubAssessment {
                    learner_id: format!("L{i:03}"),
                    learner_name: if i % 2 == 0 {
                        Some(format!("Learner {i}"))
                    } else {
                        None
                    },
                    score: 50.0 + i as f64,
                    passed: i % 3 != 0,
                })
                .collect(),
        }
    }

    fn pct(value: u8) -> Percentage {
        Percentage::new(value).unwrap()
    }

    #[test]
    fn thirty_percent_of_five_rounds_up_to_two() {
        assert_eq!(sample_count(5, pct(30)), 2);
    }

    #[test]
    fn sample_count_matches_ceiling_and_never_exceeds_size() {
        for n in 0..=40u32 {
            for p in 0..=100u8 {
                let expected = ((n as f64) * (p as f64) / 100.0).ceil() as usize;
                let count = sample_count(n, pct(p));
                assert_eq!(count, expected.min(n as usize), "n={n} p={p}");
                assert!(count <= n as usize);
            }
        }
    }

    #[test]
    fn rejects_percentage_over_100() {
        assert!(matches!(Percentage::new(101), Err(QaError::Validation(_))));
        assert!(Percentage::new(0).is_ok());
    }

    #[test]
    fn draws_distinct_learners() {
        let mut sampler = Sampler::seeded(7);
        let result = sampler.sample(&record("ASM-1", 20, 20), pct(50), "Iris", Utc::now());
        assert_eq!(result.sampled_count, 10);
        let ids: HashSet<_> = result.learners.iter().map(|l| l.id.clone()).collect();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn short_pool_yields_everything() {
        let mut sampler = Sampler::seeded(1);
        let result = sampler.sample(&record("ASM-2", 10, 3), pct(80), "Iris", Utc::now());
        assert_eq!(result.sampled_count, 3);
        assert_eq!(result.learners.len(), 3);
    }

    #[test]
    fn same_seed_reproduces_selection() {
        let source = record("ASM-3", 12, 12);
        let first = Sampler::seeded(99).sample(&source, pct(40), "Iris", Utc::now());
        let second = Sampler::seeded(99).sample(&source, pct(40), "Iris", Utc::now());
        let ids = |r: &SamplingRecord| r.learners.iter().map(|l| l.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn learner_name_falls_back_to_id() {
        let mut sampler = Sampler::seeded(3);
        let result = sampler.sample(&record("ASM-4", 4, 4), pct(100), "Iris", Utc::now());
        for learner in &result.learners {
            assert!(!learner.name.is_empty());
        }
        assert!(result.learners.iter().any(|l| l.name == l.id));
    }

    #[test]
    fn session_appends_history_and_updates_counters() {
        let mut session = SamplingSession::new(Sampler::seeded(5));
        let mut selected = vec![record("ASM-5", 5, 5), record("ASM-6", 8, 8)];

        let first = session.run(&mut selected, pct(30), "Iris");
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].sampled_count, 2);
        assert_eq!(first[1].sampled_count, 3);
        assert_eq!(selected[0].sampled, 2);
        assert_eq!(selected[1].sampled, 3);

        session.run(&mut selected, pct(100), "Iris");
        assert_eq!(session.history().len(), 4);
        assert!(selected.iter().all(|r| r.sampled <= r.sample_size));
        assert_eq!(selected[0].sampled, 5);
    }

    #[test]
    fn select_records_filters_by_id() {
        let records = vec![record("ASM-1", 1, 1), record("ASM-2", 1, 1)];
        let picked = select_records(records.clone(), &["asm-2".to_string()]);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].id, "ASM-2");
        assert_eq!(select_records(records, &[]).len(), 2);
    }
}
