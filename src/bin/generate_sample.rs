//! Writes `sample_phsen.parquet`: a synthetic PHSEN record with three
//! deployments, raw light arrays and a handful of bad samples, for trying
//! out the viewer and `ooi-qc` without downloading data.

use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{Float64Array, Float64Builder, Int32Array, ListBuilder, TimestampNanosecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, TimeZone, Utc};
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Measurements per light cycle on the instrument.
const CYCLE_POINTS: usize = 23;
const BLANKS: usize = 4;

/// One cycle of interleaved (ref 434, sig 434, ref 578, sig 578) counts.
/// The signals dip as the indicator dye passes the optical cell.
fn light_cycle(rng: &mut StdRng, noise: &Normal<f64>, lamp: f64) -> Vec<f64> {
    let mut light = Vec::with_capacity(CYCLE_POINTS * 4);
    for i in 0..CYCLE_POINTS {
        let dip = (-((i as f64 - 8.0) / 4.0).powi(2)).exp();
        light.push(lamp * 2600.0 + noise.sample(rng));
        light.push(lamp * (3000.0 - 1600.0 * dip) + 5.0 * noise.sample(rng));
        light.push(lamp * 2400.0 + noise.sample(rng));
        light.push(lamp * (2900.0 - 1300.0 * dip) + 5.0 * noise.sample(rng));
    }
    light
}

/// One set of DI-water blanks, interleaved the same way.
fn blank_cycle(rng: &mut StdRng, noise: &Normal<f64>, lamp: f64) -> Vec<f64> {
    (0..BLANKS)
        .flat_map(|_| {
            [
                lamp * 2600.0 + noise.sample(rng),
                lamp * 2500.0 + noise.sample(rng),
                lamp * 2400.0 + noise.sample(rng),
                lamp * 2300.0 + noise.sample(rng),
            ]
        })
        .collect()
}

fn list_array(rows: &[Vec<f64>]) -> arrow::array::ListArray {
    let mut builder = ListBuilder::new(Float64Builder::new());
    for row in rows {
        builder.values().append_slice(row);
        builder.append(true);
    }
    builder.finish()
}

fn described(name: &str, data_type: DataType, long_name: &str, units: Option<&str>) -> Field {
    let mut metadata = HashMap::from([("long_name".to_string(), long_name.to_string())]);
    if let Some(units) = units {
        metadata.insert("units".to_string(), units.to_string());
    }
    Field::new(name, data_type, true).with_metadata(metadata)
}

fn main() {
    env_logger::init();
    let mut rng = StdRng::seed_from_u64(42);
    let counts_noise = Normal::new(0.0, 3.0).unwrap();
    let ph_noise = Normal::new(0.0, 0.04).unwrap();

    // Deployment number, first sample, number of hourly samples
    let deployments = [
        (14, Utc.with_ymd_and_hms(2021, 4, 10, 0, 0, 0).unwrap(), 2400),
        (15, Utc.with_ymd_and_hms(2021, 8, 20, 0, 0, 0).unwrap(), 2400),
        (16, Utc.with_ymd_and_hms(2022, 1, 5, 0, 0, 0).unwrap(), 2400),
    ];

    let mut time = Vec::new();
    let mut deployment = Vec::new();
    let mut ph = Vec::new();
    let mut light = Vec::new();
    let mut reference = Vec::new();

    for &(number, start, n) in &deployments {
        for i in 0..n {
            let t = start + Duration::hours(i);
            // the last deployment's lamp fades towards the end
            let lamp = if number == 16 && i > n * 4 / 5 {
                0.2
            } else {
                1.0
            };
            let day = t.timestamp() as f64 / 86_400.0;
            let seasonal = 0.15 * (2.0 * std::f64::consts::PI * day / 365.25).sin();
            let mut value = 7.95 + seasonal + ph_noise.sample(&mut rng);
            match rng.random_range(0..200) {
                0 => value = f64::NAN,
                1 => value = 7.3,
                2 => value = 9.4,
                _ => {}
            }

            time.push(t.timestamp_nanos_opt().unwrap());
            deployment.push(number);
            ph.push(value);
            light.push(light_cycle(&mut rng, &counts_noise, lamp));
            reference.push(blank_cycle(&mut rng, &counts_noise, lamp));
        }
    }

    let list_type = DataType::List(Arc::new(Field::new("item", DataType::Float64, true)));
    let schema = Arc::new(
        Schema::new(vec![
            Field::new(
                "time",
                DataType::Timestamp(TimeUnit::Nanosecond, Some("UTC".into())),
                false,
            ),
            Field::new("deployment", DataType::Int32, false),
            described("seawater_ph", DataType::Float64, "Seawater pH", Some("1")),
            described(
                "light_measurements",
                list_type.clone(),
                "Light Measurements",
                Some("counts"),
            ),
            described(
                "reference_light_measurements",
                list_type,
                "Reference Light Measurements",
                Some("counts"),
            ),
        ])
        .with_metadata(HashMap::from([(
            "id".to_string(),
            "CE02SHSM-RID26-06-PHSEND000-recovered_inst-phsen_abcdef_instrument".to_string(),
        )])),
    );

    let n = time.len();
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(TimestampNanosecondArray::from(time).with_timezone("UTC")),
            Arc::new(Int32Array::from(deployment)),
            Arc::new(Float64Array::from(ph)),
            Arc::new(list_array(&light)),
            Arc::new(list_array(&reference)),
        ],
    )
    .expect("Failed to create RecordBatch");

    // Write Parquet
    let output_path = "sample_phsen.parquet";
    let file = std::fs::File::create(output_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    log::info!("Wrote {n} samples in {} deployments to {output_path}", deployments.len());
    println!("Wrote {n} samples to {output_path}");
}
