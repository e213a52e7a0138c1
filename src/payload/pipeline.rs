//! Analysis pipelines
//!
//! A [`Pipeline`] is an ordered list of [`PayloadTransform`] steps run on
//! every member payload after it is loaded and before it is reduced.
//! Step `k` sees the output of step `k - 1`.
//!
//! With an intermediates directory set, each stage is written out as an
//! ekpy data file named after the payload:
//!
//! ```text
//! trace_0_step0.csv   raw payload
//! trace_0_step1.csv   after the first step
//! trace_0_step2.csv   after the second step
//! ```

use crate::index::MetadataRecord;
use crate::payload::error::{PayloadError, PayloadResult};
use crate::payload::types::Payload;
use crate::storage::write_ekpy_data;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One analysis step applied to a payload
pub trait PayloadTransform: Send + Sync {
    /// Step name, recorded in saved intermediates
    fn name(&self) -> &str;

    /// Transform the payload
    fn apply(&self, payload: Payload) -> PayloadResult<Payload>;
}

/// A named closure as an analysis step
pub struct FnTransform<F> {
    name: String,
    f: F,
}

impl<F> FnTransform<F>
where
    F: Fn(Payload) -> PayloadResult<Payload> + Send + Sync,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

impl<F> PayloadTransform for FnTransform<F>
where
    F: Fn(Payload) -> PayloadResult<Payload> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&self, payload: Payload) -> PayloadResult<Payload> {
        (self.f)(payload)
    }
}

/// Ordered analysis steps
#[derive(Clone, Default)]
pub struct Pipeline {
    steps: Vec<Arc<dyn PayloadTransform>>,
    intermediates: Option<PathBuf>,
}

impl Pipeline {
    /// Empty pipeline; passes payloads through unchanged
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step
    pub fn then(mut self, step: impl PayloadTransform + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Append a closure step
    pub fn then_fn<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Payload) -> PayloadResult<Payload> + Send + Sync + 'static,
    {
        self.then(FnTransform::new(name, f))
    }

    /// Append a shared step
    pub fn push(&mut self, step: Arc<dyn PayloadTransform>) {
        self.steps.push(step);
    }

    /// Save every stage of every payload into `dir`
    pub fn with_intermediates(mut self, dir: impl Into<PathBuf>) -> Self {
        self.intermediates = Some(dir.into());
        self
    }

    pub fn intermediates(&self) -> Option<&Path> {
        self.intermediates.as_deref()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step names in run order
    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step on the payload of `record`
    pub fn run(&self, record: &MetadataRecord, payload: Payload) -> PayloadResult<Payload> {
        let stem = record
            .payload
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| record.label());

        if let Some(dir) = &self.intermediates {
            save_stage(dir, &stem, 0, "raw", &payload)?;
        }

        let mut payload = payload;
        for (k, step) in self.steps.iter().enumerate() {
            payload = step.apply(payload).map_err(|e| match e {
                e @ PayloadError::Transform { .. } => e,
                other => PayloadError::transform(step.name(), other),
            })?;
            if let Some(dir) = &self.intermediates {
                save_stage(dir, &stem, k + 1, step.name(), &payload)?;
            }
        }

        Ok(payload)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.names())
            .field("intermediates", &self.intermediates)
            .finish()
    }
}

fn save_stage(
    dir: &Path,
    stem: &str,
    stage: usize,
    step: &str,
    payload: &Payload,
) -> PayloadResult<()> {
    let path = dir.join(format!("{stem}_step{stage}.csv"));
    let failed = |reason: &dyn std::fmt::Display| PayloadError::Intermediate {
        path: path.clone(),
        reason: reason.to_string(),
    };

    std::fs::create_dir_all(dir).map_err(|e| failed(&e))?;

    let heading = [
        ("stage".to_string(), stage.to_string()),
        ("step".to_string(), step.to_string()),
    ];
    let mut columns: Vec<(&str, &[f64])> = vec![(payload.axis_name(), payload.axis())];
    for (name, values) in payload.channels() {
        columns.push((name.as_str(), values.as_slice()));
    }

    write_ekpy_data(&path, &heading[..], &columns).map_err(|e| failed(&e))?;

    tracing::trace!(path = %path.display(), step, "Saved intermediate");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PayloadRef;
    use crate::storage::read_ekpy_data;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn trace() -> Payload {
        Payload::new(
            "time",
            vec![0.0, 1.0],
            BTreeMap::from([("p1".to_string(), vec![1.0, 2.0])]),
        )
        .unwrap()
    }

    fn map_p1(
        name: &'static str,
        f: fn(f64) -> f64,
    ) -> FnTransform<impl Fn(Payload) -> PayloadResult<Payload> + Send + Sync> {
        FnTransform::new(name, move |payload: Payload| {
            let (axis_name, axis, mut channels) = payload.into_parts();
            if let Some(p1) = channels.get_mut("p1") {
                p1.iter_mut().for_each(|v| *v = f(*v));
            }
            Payload::new(axis_name, axis, channels)
        })
    }

    fn record() -> MetadataRecord {
        MetadataRecord::new(PayloadRef::from_path("trace_0.csv"))
    }

    #[test]
    fn test_steps_run_in_order() {
        let scale_then_offset = Pipeline::new()
            .then(map_p1("scale", |v| v * 10.0))
            .then(map_p1("offset", |v| v + 1.0));
        let offset_then_scale = Pipeline::new()
            .then(map_p1("offset", |v| v + 1.0))
            .then(map_p1("scale", |v| v * 10.0));

        assert_eq!(scale_then_offset.names(), vec!["scale", "offset"]);

        let a = scale_then_offset.run(&record(), trace()).unwrap();
        let b = offset_then_scale.run(&record(), trace()).unwrap();
        assert_eq!(a.channel("p1"), Some(&[11.0, 21.0][..]));
        assert_eq!(b.channel("p1"), Some(&[20.0, 30.0][..]));
    }

    #[test]
    fn test_empty_pipeline_is_identity() {
        let pipeline = Pipeline::new();
        assert!(pipeline.is_empty());
        assert_eq!(pipeline.run(&record(), trace()).unwrap(), trace());
    }

    #[test]
    fn test_intermediates_saved_per_stage() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("stages");
        let pipeline = Pipeline::new()
            .then(map_p1("scale", |v| v * 10.0))
            .then(map_p1("offset", |v| v + 1.0))
            .with_intermediates(&out);

        pipeline.run(&record(), trace()).unwrap();

        let raw = read_ekpy_data(&out.join("trace_0_step0.csv")).unwrap();
        let scaled = read_ekpy_data(&out.join("trace_0_step1.csv")).unwrap();
        let offset = read_ekpy_data(&out.join("trace_0_step2.csv")).unwrap();
        assert!(!out.join("trace_0_step3.csv").exists());

        assert_eq!(raw.column("p1"), Some(&[1.0, 2.0][..]));
        assert_eq!(scaled.column("p1"), Some(&[10.0, 20.0][..]));
        assert_eq!(offset.column("p1"), Some(&[11.0, 21.0][..]));
        assert_eq!(offset.column("time"), Some(&[0.0, 1.0][..]));
        let heading = scaled.heading.unwrap();
        assert!(heading.contains(&("step".to_string(), "scale".to_string())));
    }

    #[test]
    fn test_failing_step_named_in_error() {
        let pipeline = Pipeline::new()
            .then(map_p1("scale", |v| v * 10.0))
            .then_fn("crop", |payload: Payload| {
                let (axis_name, axis, channels) = payload.into_parts();
                Payload::new(axis_name, axis[..1].to_vec(), channels)
            });

        let err = pipeline.run(&record(), trace()).unwrap_err();
        assert!(matches!(err, PayloadError::Transform { ref step, .. } if step == "crop"));
    }
}
