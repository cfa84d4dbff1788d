use std::fmt::Write as _;

use ooi_explorer::chart::{flagged_variable_figure, variable_figure};
use ooi_explorer::data::export::write_flags_csv;
use ooi_explorer::data::filter::find_samples;
use ooi_explorer::data::loader::{load_bottle_samples, load_file};
use ooi_explorer::data::model::GeoPoint;
use ooi_explorer::data::record::{Instrument, attach_quality_flags};
use ooi_explorer::qc::{QartodFlag, flag_counts};

/// Raw PHSEN light cycle: 23 groups of (ref 434, sig 434, ref 578, sig 578).
fn light(signal: impl Fn(usize) -> f64) -> String {
    (0..23)
        .flat_map(|i| [2000.0, signal(i), 2000.0, signal(i)])
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(";")
}

fn nominal(i: usize) -> f64 {
    if i % 2 == 0 {
        1500.0
    } else {
        2500.0
    }
}

fn phsen_csv() -> String {
    let blanks = vec!["2000"; 16].join(";");
    let rows = [
        ("8.0", light(nominal)),
        ("7.2", light(nominal)),
        ("", light(nominal)),
        ("8.1", light(|_| 2000.0)),
        ("7.9", light(nominal)),
    ];
    let mut csv = String::from(
        "time,deployment,seawater_ph,light_measurements,reference_light_measurements\n",
    );
    for (i, (ph, light)) in rows.iter().enumerate() {
        let deployment = if i < 3 { 1 } else { 2 };
        writeln!(csv, "2022-02-0{}T00:00:00Z,{deployment},{ph},{light},{blanks}", i + 1).unwrap();
    }
    csv
}

#[test]
fn phsen_flags_from_raw_arrays_are_exported() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("phsen.csv");
    std::fs::write(&input, phsen_csv()).unwrap();

    let mut ds = load_file(&input).unwrap();
    assert_eq!(Instrument::detect(&ds), Some(Instrument::Phsen));
    let flags = attach_quality_flags(&mut ds, Instrument::Phsen).unwrap();
    assert_eq!(
        flags,
        vec![
            QartodFlag::Pass,
            QartodFlag::Suspect,
            QartodFlag::Fail,
            QartodFlag::Fail,
            QartodFlag::Pass,
        ]
    );
    assert_eq!(flag_counts(&flags)[&QartodFlag::Fail], 2);
    assert_eq!(
        ds.variable("seawater_ph_quality_flag").unwrap().values,
        vec![1.0, 3.0, 4.0, 4.0, 1.0]
    );

    let output = dir.path().join("flags.csv");
    write_flags_csv(&output, &ds, Instrument::Phsen.flag_variable(), &flags).unwrap();
    let written = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines[0], "time,deployment,seawater_ph_quality_flag");
    assert_eq!(lines[2], "2022-02-02T00:00:00+00:00,1,3");
    assert_eq!(lines.len(), 6);

    let mut fig = flagged_variable_figure(&ds, "seawater_ph", &flags).unwrap();
    // pass in both deployments, suspect in 1, fail in 2
    assert_eq!(fig.series.len(), 4);
    assert_eq!(fig.markers.len(), 2);
    // the NaN sample is flagged but not drawn
    assert_eq!(fig.point_count(), 4);

    fig.retain_deployments(&[2].into_iter().collect());
    assert_eq!(fig.point_count(), 2);
}

#[test]
fn datasets_without_derived_products_are_not_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ctd.csv");
    std::fs::write(
        &input,
        "time,temperature\n2022-01-01T00:00:00Z,10.5\n2022-01-01T01:00:00Z,10.7\n",
    )
    .unwrap();
    let mut ds = load_file(&input).unwrap();
    assert_eq!(Instrument::detect(&ds), None);

    let err = attach_quality_flags(&mut ds, Instrument::Phsen).unwrap_err();
    assert!(err.to_string().contains("seawater_ph"), "{err}");

    let fig = variable_figure(&ds, "temperature", true).unwrap();
    assert_eq!(fig.series.len(), 1);
    assert!(fig.markers.is_empty());
}

#[test]
fn discrete_samples_near_the_buoy() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("discrete.csv");
    std::fs::write(
        &input,
        "Cruise,Start Latitude [degrees],Start Longitude [degrees],CTD Depth [m]\n\
         SKQ202110S,44.6393,-124.304,2.1\n\
         SKQ202110S,44.6393,-124.304,12.0\n\
         SKQ202110S,44.6393,-124.304,25.0\n\
         SKQ202110S,44.7,-124.304,7.0\n\
         SKQ202110S,44.6393,-124.304,\n",
    )
    .unwrap();

    let samples = load_bottle_samples(&input).unwrap();
    let kept = find_samples(&samples, GeoPoint::new(44.6393, -124.304), 7.0, 10.0, 5.0);
    let depths: Vec<f64> = kept.iter().map(|s| s.depth).collect();
    // 44.7N is about 6.7 km north of the buoy
    assert_eq!(depths, vec![2.1, 12.0, 7.0]);
}
