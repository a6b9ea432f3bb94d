use std::future::Future;
use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;

use crate::api;
use crate::error::{QaError, QaResult};
use crate::models::AssessmentRecord;
use crate::seed;

/// Reads a JSON file holding a bare array or a results/data envelope.
pub fn read_json_list<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let body: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let records = api::unwrap_list(body, &path.display().to_string())?;
    tracing::info!(path = %path.display(), count = records.len(), "records loaded from file");
    Ok(records)
}

/// Loads from `input` when given, otherwise calls `fallback`.
pub fn from_file_or<T, F>(input: Option<&Path>, fallback: F) -> anyhow::Result<Vec<T>>
where
    T: DeserializeOwned,
    F: FnOnce() -> Vec<T>,
{
    match input {
        Some(path) => read_json_list(path),
        None => Ok(fallback()),
    }
}

/// Loads assessments from `input` or the demo batches, clamping `sampled` to `sampleSize`.
pub fn load_assessments(input: Option<&Path>) -> anyhow::Result<Vec<AssessmentRecord>> {
    let mut records = from_file_or(input, seed::assessments)?;
    for record in &mut records {
        let reported = record.sampled;
        if record.clamp_sampled() {
            tracing::warn!(
                id = %record.id,
                reported,
                sample_size = record.sample_size,
                "sampled count exceeds sample size, clamped"
            );
        }
    }
    Ok(records)
}

/// Awaits a list fetch; a failure is logged and reported, and the list comes back empty.
pub async fn fetch_or_empty<T, Fut>(what: &str, fetch: Fut) -> Vec<T>
where
    Fut: Future<Output = QaResult<Vec<T>>>,
{
    match fetch.await {
        Ok(records) => {
            tracing::info!(what, count = records.len(), "records fetched");
            records
        }
        Err(err) => {
            tracing::error!(what, "fetch failed: {err}");
            eprintln!("{}", failure_notice(what, &err));
            Vec::new()
        }
    }
}

fn failure_notice(what: &str, err: &QaError) -> String {
    format!("error: could not load {what}: {err}")
}
