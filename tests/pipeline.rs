//! End-to-end tests over measurement directories on disk

use measureset::group::GroupError;
use measureset::index::SourceKind;
use measureset::query::QueryError;
use measureset::{
    export_ekpy, read_ekpy_data, write_ekpy_data, Alignment, Dataset, FieldValue, GroupKey,
    Payload, Pipeline, Statistic, TrialWriter,
};
use std::collections::BTreeSet;
use std::path::Path;
use tempfile::tempdir;

fn time_axis(len: usize) -> Vec<f64> {
    (0..len).map(|i| i as f64 * 1e-9).collect()
}

/// Four pulses at two voltages on two samples, saved through the trial writer
fn pulse_sweep(dir: &Path) {
    let writer = TrialWriter::new(dir);
    let t = time_axis(5);
    let runs = [("0.5", "D0", 10.0), ("0.5", "D1", 20.0), ("1.0", "D0", 30.0), ("1.0", "D1", 40.0)];

    for (voltage, sample, delay) in runs {
        let p1: Vec<f64> = t.iter().map(|x| x * 1e9 + delay).collect();
        let delay = delay.to_string();
        writer
            .save(
                "pulse",
                &[("voltage", voltage), ("sample", sample), ("delay", delay.as_str())],
                &[("time", &t[..]), ("p1", &p1[..])],
            )
            .unwrap();
    }
}

#[test]
fn test_open_meta_table() {
    let dir = tempdir().unwrap();
    pulse_sweep(dir.path());

    let (dataset, report) = Dataset::open(dir.path()).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.source, SourceKind::MetaTable);
    assert_eq!(report.indexed, 4);

    let fields = dataset.index().fields();
    for name in ["voltage", "sample", "delay", "trial", "filename"] {
        assert!(fields.contains(name), "missing field {name}");
    }
}

#[test]
fn test_group_by_voltage() {
    let dir = tempdir().unwrap();
    pulse_sweep(dir.path());
    let (dataset, _) = Dataset::open(dir.path()).unwrap();

    let grouped = dataset.group(&["voltage"]).unwrap();
    assert_eq!(grouped.len(), 2);
    assert_eq!(grouped.groups()[0].rows, vec![0, 1]);
    assert_eq!(grouped.groups()[1].rows, vec![2, 3]);
    assert_eq!(
        grouped.groups()[0].key,
        GroupKey::new([("voltage".to_string(), FieldValue::number(0.5))])
    );
}

#[test]
fn test_conjunction_matches_chained_queries() {
    let dir = tempdir().unwrap();
    pulse_sweep(dir.path());
    let (dataset, _) = Dataset::open(dir.path()).unwrap();

    let pairs = [
        ("voltage >= 0.5", "sample == 'D0'"),
        ("delay < 35", "voltage != 1"),
        ("sample == 'D1'", "delay > 100"),
    ];
    for (q1, q2) in pairs {
        let combined = dataset.query(&format!("({q1}) and ({q2})")).unwrap();
        let chained = dataset.query(q1).unwrap().query(q2).unwrap();
        assert_eq!(combined.rows(), chained.rows(), "{q1} / {q2}");
    }
}

#[test]
fn test_groups_partition_selection() {
    let dir = tempdir().unwrap();
    pulse_sweep(dir.path());
    let (dataset, _) = Dataset::open(dir.path()).unwrap();

    let selection = dataset.query("delay > 10").unwrap();
    let grouped = selection.group(&["sample", "voltage"]).unwrap();

    let mut seen = BTreeSet::new();
    for group in grouped.groups() {
        for &row in &group.rows {
            assert!(seen.insert(row), "row {row} in two groups");
        }
    }
    let expected: BTreeSet<usize> = selection.rows().iter().copied().collect();
    assert_eq!(seen, expected);

    let again = selection.group(&["voltage", "sample"]).unwrap();
    assert_eq!(grouped.grouped(), again.grouped());
}

#[test]
fn test_unknown_names_rejected() {
    let dir = tempdir().unwrap();
    pulse_sweep(dir.path());
    let (dataset, _) = Dataset::open(dir.path()).unwrap();

    assert!(matches!(
        dataset.query("temperature > 300"),
        Err(QueryError::InvalidExpression { .. })
    ));
    assert!(matches!(
        dataset.query("sample > 3"),
        Err(QueryError::InvalidExpression { .. })
    ));
    assert!(matches!(
        dataset.group(&["temperature"]),
        Err(GroupError::UnknownGroupingField { .. })
    ));
}

#[test]
fn test_deeply_nested_query_fails_cleanly() {
    let dir = tempdir().unwrap();
    pulse_sweep(dir.path());
    let (dataset, _) = Dataset::open(dir.path()).unwrap();

    for depth in [500, 20_000] {
        let text = format!("{}voltage == 0.5{}", "(".repeat(depth), ")".repeat(depth));
        assert!(matches!(
            dataset.query(&text),
            Err(QueryError::InvalidExpression { .. })
        ));
    }
    assert_eq!(dataset.query("((voltage == 0.5))").unwrap().rows(), &[0, 1]);
}

#[test]
fn test_mean_of_three_payloads() {
    let dir = tempdir().unwrap();
    let writer = TrialWriter::new(dir.path());
    let t = time_axis(100);

    for offset in 0..3 {
        let p1: Vec<f64> = (0..100).map(|i| (i + offset) as f64).collect();
        writer
            .save("pulse", &[("voltage", "0.5")], &[("time", &t[..]), ("p1", &p1[..])])
            .unwrap();
    }

    let (dataset, _) = Dataset::open(dir.path()).unwrap();
    let result = dataset
        .group(&["voltage"])
        .unwrap()
        .aggregate(Statistic::Mean)
        .unwrap();

    let aggregate = result.get(0).unwrap();
    assert_eq!(aggregate.members, 3);
    assert_eq!(aggregate.alignment, Alignment::Identical);
    assert_eq!(aggregate.len(), 100);

    let curve = aggregate.channel("p1").unwrap();
    assert!(curve.counts.iter().all(|&c| c == 3));
    for (i, value) in curve.values.iter().enumerate() {
        assert!((value - (i as f64 + 1.0)).abs() < 1e-9);
    }
}

#[test]
fn test_aggregation_is_deterministic() {
    let dir = tempdir().unwrap();
    pulse_sweep(dir.path());
    let (dataset, _) = Dataset::open(dir.path()).unwrap();

    let parallel = dataset
        .clone()
        .with_parallelism(4)
        .group(&["voltage"])
        .unwrap()
        .aggregate(Statistic::Median)
        .unwrap();
    let sequential = dataset
        .with_parallelism(1)
        .group(&["voltage"])
        .unwrap()
        .aggregate(Statistic::Median)
        .unwrap();

    assert_eq!(parallel, sequential);
}

#[test]
fn test_header_scan_fallback() {
    let dir = tempdir().unwrap();
    let t = time_axis(3);
    let p1 = [1.0, 2.0, 3.0];
    write_ekpy_data(
        &dir.path().join("b.csv"),
        &[("voltage", "1.0"), ("sample", "D1")],
        &[("time", &t[..]), ("p1", &p1[..])],
    )
    .unwrap();
    write_ekpy_data(
        &dir.path().join("a.csv"),
        &[("voltage", "0.5")],
        &[("time", &t[..]), ("p1", &p1[..])],
    )
    .unwrap();
    std::fs::write(dir.path().join("notes.csv"), "time,p1\n0,1\n").unwrap();

    let (dataset, report) = Dataset::open(dir.path()).unwrap();
    assert_eq!(report.source, SourceKind::HeaderScan);
    assert_eq!(report.indexed, 2);
    assert_eq!(report.malformed.len(), 1);

    // Files are indexed in name order; missing fields are absent
    let first = dataset.index().record(0).unwrap();
    assert_eq!(first.get("voltage").as_f64(), Some(0.5));
    assert!(first.get("sample").is_absent());

    assert_eq!(dataset.query("sample != 'D1'").unwrap().rows(), &[0]);
}

#[test]
fn test_json_payloads() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("meta_data.csv"),
        "filename,voltage\nrun_0.json,1\nrun_1.json,1\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("run_0.json"),
        r#"{"time": [0, 1, 2], "p1": [1.0, 2.0, null]}"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("run_1.json"),
        r#"{"time": [0, 1, 2], "p1": [3.0, 4.0, 5.0]}"#,
    )
    .unwrap();

    let (dataset, _) = Dataset::open(dir.path()).unwrap();
    let result = dataset
        .group(&["voltage"])
        .unwrap()
        .aggregate(Statistic::Max)
        .unwrap();

    let curve = result.get(0).unwrap().channel("p1").unwrap();
    assert_eq!(curve.values, vec![3.0, 4.0, 5.0]);
    assert_eq!(curve.counts, vec![2, 2, 1]);
}

#[test]
fn test_missing_payload_fails_aggregation_only() {
    let dir = tempdir().unwrap();
    pulse_sweep(dir.path());
    std::fs::remove_file(dir.path().join("pulse_3.csv")).unwrap();

    let (dataset, _) = Dataset::open(dir.path()).unwrap();
    let grouped = dataset.group(&["voltage"]).unwrap();

    assert!(grouped.select(&[0]).unwrap().aggregate(Statistic::Mean).is_ok());
    assert!(grouped.select(&[1]).unwrap().aggregate(Statistic::Mean).is_err());
}

#[test]
fn test_export_selected_groups() {
    let dir = tempdir().unwrap();
    pulse_sweep(dir.path());
    let (dataset, _) = Dataset::open(dir.path()).unwrap();

    let result = dataset
        .group(&["voltage"])
        .unwrap()
        .select(&[1])
        .unwrap()
        .aggregate(Statistic::Mean)
        .unwrap();

    let out = tempdir().unwrap();
    let written = export_ekpy(&result, out.path(), "sweep").unwrap();
    assert_eq!(written, vec![out.path().join("sweep_group1.csv")]);

    let data = read_ekpy_data(&written[0]).unwrap();
    assert_eq!(data.columns, vec!["time", "p1", "p1_count"]);
    assert_eq!(data.column("p1_count").unwrap(), &[2.0; 5][..]);
    // Delays 30 and 40 average to 35 at the first point
    assert_eq!(data.column("p1").unwrap()[0], 35.0);

    let heading = data.heading.unwrap();
    assert!(heading.contains(&("statistic".to_string(), "mean".to_string())));
    assert!(heading.contains(&("voltage".to_string(), "1".to_string())));
}

#[test]
fn test_analysis_steps_before_aggregation() {
    let dir = tempdir().unwrap();
    pulse_sweep(dir.path());
    let stages = tempdir().unwrap();

    let baseline = Pipeline::new()
        .then_fn("baseline", |payload: Payload| {
            let (axis_name, axis, mut channels) = payload.into_parts();
            for values in channels.values_mut() {
                let base = values.first().copied().unwrap_or(0.0);
                values.iter_mut().for_each(|v| *v -= base);
            }
            Payload::new(axis_name, axis, channels)
        })
        .with_intermediates(stages.path());

    let (dataset, _) = Dataset::open(dir.path()).unwrap();
    let result = dataset
        .with_pipeline(baseline)
        .group(&["voltage"])
        .unwrap()
        .select(&[1])
        .unwrap()
        .aggregate(Statistic::Mean)
        .unwrap();

    // Delays 30 and 40 are removed before averaging
    let curve = result.get(1).unwrap().channel("p1").unwrap();
    for (i, value) in curve.values.iter().enumerate() {
        assert!((value - i as f64).abs() < 1e-6, "point {i}: {value}");
    }

    for trial in ["pulse_2", "pulse_3"] {
        let raw = read_ekpy_data(&stages.path().join(format!("{trial}_step0.csv"))).unwrap();
        let done = read_ekpy_data(&stages.path().join(format!("{trial}_step1.csv"))).unwrap();
        assert!(raw.column("p1").unwrap()[0] >= 30.0);
        assert_eq!(done.column("p1").unwrap()[0], 0.0);
    }
    assert!(!stages.path().join("pulse_0_step0.csv").exists());
}
