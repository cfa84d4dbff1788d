use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use arrow::array::{Array, ArrayRef, AsArray, FixedSizeListArray, LargeListArray, ListArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type, TimeUnit, TimestampNanosecondType};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::model::{BottleSample, GeoPoint, Matrix, OoiDataset, Variable, from_epoch_seconds};
use super::record::FILL_VALUE;

/// Column holding the sample time.
pub const TIME_COLUMN: &str = "time";
/// Column holding the deployment number.
pub const DEPLOYMENT_COLUMN: &str = "deployment";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load an OOI dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one row per sample; list columns become array variables
/// * `.json`    – `{ "id": ..., "attrs": {...}, "records": [ {...}, ... ] }`
///   or a bare array of records
/// * `.csv`     – one row per sample; array cells are semicolon-separated floats
///
/// Every format needs a `time` column; `deployment` is optional.
pub fn load_file(path: &Path) -> Result<OoiDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let mut ds = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => load_csv(path),
        other => bail!("Unsupported file extension: .{other}"),
    }?;

    if ds.id.is_empty() {
        ds.id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
    }
    log::info!(
        "Loaded '{}': {} samples, {} variables, {} array variables",
        ds.id,
        ds.len(),
        ds.variables.len(),
        ds.arrays.len()
    );
    Ok(ds)
}

// ---------------------------------------------------------------------------
// Column accumulation shared by the loaders
// ---------------------------------------------------------------------------

/// Display attributes of a variable, as carried by the source file.
#[derive(Debug, Clone, Default, Deserialize)]
struct VariableAttrs {
    long_name: Option<String>,
    units: Option<String>,
}

/// Columns collected row by row (JSON, CSV) or batch by batch (Parquet).
///
/// Scalar columns first seen after row 0 are back-filled with `NaN`;
/// array columns must be present in every row.
#[derive(Debug, Default)]
struct ColumnSet {
    time: Vec<DateTime<Utc>>,
    deployment: Option<Vec<i64>>,
    scalars: BTreeMap<String, Vec<f64>>,
    arrays: BTreeMap<String, Vec<Vec<f64>>>,
}

impl ColumnSet {
    fn extend_scalar(&mut self, name: &str, offset: usize, values: impl IntoIterator<Item = f64>) {
        let col = self.scalars.entry(name.to_string()).or_default();
        col.resize(offset, f64::NAN);
        col.extend(values);
    }

    fn extend_array(&mut self, name: &str, offset: usize, rows: Vec<Vec<f64>>) -> Result<()> {
        let col = self.arrays.entry(name.to_string()).or_default();
        if col.len() != offset {
            bail!("Row {offset}: array '{name}' is missing from earlier rows");
        }
        col.extend(rows);
        Ok(())
    }

    fn extend_deployment(
        &mut self,
        offset: usize,
        values: impl IntoIterator<Item = i64>,
    ) -> Result<()> {
        let col = self.deployment.get_or_insert_with(Vec::new);
        if col.len() != offset {
            bail!("Row {offset}: '{DEPLOYMENT_COLUMN}' is missing from earlier rows");
        }
        col.extend(values);
        Ok(())
    }

    fn finish(self, id: String, attrs: &BTreeMap<String, VariableAttrs>) -> Result<OoiDataset> {
        let n = self.time.len();
        let mut ds = OoiDataset::new(id, self.time);

        if let Some(deployment) = self.deployment {
            if deployment.len() != n {
                bail!("'{DEPLOYMENT_COLUMN}' has {} values for {n} samples", deployment.len());
            }
            ds.deployment = Some(deployment);
        }

        for (name, mut values) in self.scalars {
            values.resize(n, f64::NAN);
            let mut var = Variable::new(&name, values);
            if let Some(a) = attrs.get(&name) {
                if let Some(long_name) = &a.long_name {
                    var.long_name = long_name.clone();
                }
                var.units = a.units.clone();
            }
            ds.insert_variable(name, var);
        }

        for (name, rows) in self.arrays {
            if rows.len() != n {
                bail!("Array '{name}' has {} rows for {n} samples", rows.len());
            }
            let m = Matrix::from_rows(rows).with_context(|| format!("array variable '{name}'"))?;
            ds.insert_array(name, m);
        }
        Ok(ds)
    }
}

// ---------------------------------------------------------------------------
// Time parsing
// ---------------------------------------------------------------------------

/// Parse an RFC 3339 / ISO 8601 timestamp (naive times are taken as UTC),
/// a bare date, or float epoch seconds.
pub fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(t.and_utc());
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
    }
    s.parse::<f64>().ok().and_then(from_epoch_seconds)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`
/// optionally wrapped with the dataset attributes):
///
/// ```json
/// {
///   "id": "CE01ISSM-RID16-06-PHSEND000-telemetered-phsen_abcdef_dcl_instrument",
///   "attrs": { "seawater_ph": { "long_name": "Seawater pH" } },
///   "records": [
///     { "time": "2022-05-01T00:00:00Z", "deployment": 15,
///       "seawater_ph": 7.95, "signal_434": [1510, 1490, ...] },
///     ...
///   ]
/// }
/// ```
fn load_json(path: &Path) -> Result<OoiDataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let (id, attrs, records) = match &root {
        JsonValue::Array(records) => (String::new(), BTreeMap::new(), records),
        JsonValue::Object(obj) => {
            let id = obj
                .get("id")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let attrs: BTreeMap<String, VariableAttrs> = match obj.get("attrs") {
                Some(a) => serde_json::from_value(a.clone()).context("parsing 'attrs'")?,
                None => BTreeMap::new(),
            };
            let records = obj
                .get("records")
                .and_then(|v| v.as_array())
                .context("Expected a 'records' array")?;
            (id, attrs, records)
        }
        _ => bail!("Expected top-level JSON array or object"),
    };

    let mut cols = ColumnSet::default();

    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let time = match obj.get(TIME_COLUMN) {
            Some(JsonValue::String(s)) => parse_time(s),
            Some(JsonValue::Number(n)) => n.as_f64().and_then(from_epoch_seconds),
            _ => None,
        }
        .with_context(|| format!("Row {i}: missing or invalid '{TIME_COLUMN}'"))?;

        for (key, val) in obj {
            match (key.as_str(), val) {
                (TIME_COLUMN, _) => {}
                (DEPLOYMENT_COLUMN, JsonValue::Number(n)) => {
                    let d = n
                        .as_i64()
                        .with_context(|| format!("Row {i}: deployment {n} is not an integer"))?;
                    cols.extend_deployment(i, [d])?;
                }
                (_, JsonValue::Number(n)) => {
                    cols.extend_scalar(key, i, [n.as_f64().unwrap_or(f64::NAN)]);
                }
                (_, JsonValue::Null) if !cols.arrays.contains_key(key) => {
                    cols.extend_scalar(key, i, [f64::NAN]);
                }
                (_, JsonValue::Array(_)) => {
                    let values = json_array_to_f64(Some(val), i, key)?;
                    cols.extend_array(key, i, vec![values])?;
                }
                _ => log::debug!("Row {i}: skipping non-numeric field '{key}'"),
            }
        }
        cols.time.push(time);
    }

    cols.finish(id, &attrs)
}

fn json_array_to_f64(val: Option<&JsonValue>, row: usize, col: &str) -> Result<Vec<f64>> {
    let arr = val
        .and_then(|v| v.as_array())
        .with_context(|| format!("Row {row}: missing or invalid '{col}' array"))?;

    arr.iter()
        .enumerate()
        .map(|(j, v)| match v {
            JsonValue::Null => Ok(f64::NAN),
            _ => v
                .as_f64()
                .with_context(|| format!("Row {row}, {col}[{j}]: not a number")),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout:  header row with column names, one row per sample.
/// Array variables contain semicolon-separated floats:
///   `"1510;1490;1502"`
/// Empty cells are missing values; columns with text are skipped.
fn load_csv(path: &Path) -> Result<OoiDataset> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let time_idx = headers
        .iter()
        .position(|h| h == TIME_COLUMN)
        .context("CSV missing 'time' column")?;
    let deployment_idx = headers.iter().position(|h| h == DEPLOYMENT_COLUMN);

    let mut cols = ColumnSet::default();
    let mut text_columns: BTreeSet<usize> = BTreeSet::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;

        let time_cell = record.get(time_idx).unwrap_or("");
        let time = parse_time(time_cell)
            .with_context(|| format!("Row {row_no}: '{time_cell}' is not a timestamp"))?;

        for (col_idx, cell) in record.iter().enumerate() {
            if col_idx == time_idx || text_columns.contains(&col_idx) {
                continue;
            }
            let name = &headers[col_idx];
            let cell = cell.trim();

            if Some(col_idx) == deployment_idx {
                let d = cell.parse::<i64>().with_context(|| {
                    format!("Row {row_no}: deployment '{cell}' is not an integer")
                })?;
                cols.extend_deployment(row_no, [d])?;
            } else if cols.arrays.contains_key(name) || cell.contains(';') {
                let values = parse_semicolon_floats(cell, row_no, name)?;
                cols.extend_array(name, row_no, vec![values])?;
            } else if cell.is_empty() {
                cols.extend_scalar(name, row_no, [f64::NAN]);
            } else if let Ok(v) = cell.parse::<f64>() {
                cols.extend_scalar(name, row_no, [v]);
            } else {
                log::debug!("Skipping text column '{name}'");
                cols.scalars.remove(name);
                text_columns.insert(col_idx);
            }
        }
        cols.time.push(time);
    }

    cols.finish(String::new(), &BTreeMap::new())
}

fn parse_semicolon_floats(s: &str, row: usize, col: &str) -> Result<Vec<f64>> {
    s.split(';')
        .enumerate()
        .map(|(j, tok)| {
            let tok = tok.trim();
            if tok.is_empty() || tok.eq_ignore_ascii_case("nan") {
                return Ok(f64::NAN);
            }
            tok.parse::<f64>()
                .with_context(|| format!("Row {row}, {col}[{j}]: '{tok}' is not a number"))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing one row per sample.
///
/// Expected schema:
/// - `time`: Timestamp (any unit / zone), Date, ISO string or float epoch seconds
/// - `deployment`: optional integer column
/// - numeric columns become scalar variables
/// - `List` / `LargeList` / `FixedSizeList` numeric columns become array variables
///
/// Field metadata `long_name` and `units`, and schema metadata `id`, are
/// picked up when present (written by `generate_sample`, or by pandas from
/// xarray attributes).
fn load_parquet(path: &Path) -> Result<OoiDataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let schema = builder.schema().clone();
    let reader = builder.build().context("building parquet reader")?;

    let time_idx = schema
        .index_of(TIME_COLUMN)
        .map_err(|_| anyhow!("Parquet file missing 'time' column"))?;

    let id = schema.metadata().get("id").cloned().unwrap_or_default();
    let attrs: BTreeMap<String, VariableAttrs> = schema
        .fields()
        .iter()
        .map(|f| {
            let md = f.metadata();
            let attrs = VariableAttrs {
                long_name: md.get("long_name").cloned(),
                units: md.get("units").cloned(),
            };
            (f.name().clone(), attrs)
        })
        .collect();

    let mut cols = ColumnSet::default();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let offset = cols.time.len();

        for (col_idx, field) in schema.fields().iter().enumerate() {
            if col_idx == time_idx {
                continue;
            }
            let name = field.name();
            let col = batch.column(col_idx);

            if name == DEPLOYMENT_COLUMN {
                let deployment = integer_column(col).context("reading 'deployment'")?;
                cols.extend_deployment(offset, deployment)?;
            } else if is_numeric(col.data_type()) {
                let values = f64_column(col).with_context(|| format!("reading '{name}'"))?;
                cols.extend_scalar(name, offset, values);
            } else if is_list(col.data_type()) {
                let rows = (0..batch.num_rows())
                    .map(|row| {
                        extract_f64_list(col, row).with_context(|| {
                            format!("Row {}: failed to read '{name}'", offset + row)
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                cols.extend_array(name, offset, rows)?;
            } else {
                log::debug!("Skipping column '{name}' of type {:?}", col.data_type());
            }
        }

        let times = time_column(batch.column(time_idx))
            .with_context(|| format!("reading '{TIME_COLUMN}'"))?;
        cols.time.extend(times);
    }

    cols.finish(id, &attrs)
}

// -- Parquet / Arrow helpers --

fn is_numeric(dt: &DataType) -> bool {
    dt.is_numeric() || matches!(dt, DataType::Boolean)
}

fn is_list(dt: &DataType) -> bool {
    matches!(
        dt,
        DataType::List(_) | DataType::LargeList(_) | DataType::FixedSizeList(_, _)
    )
}

/// Any numeric column as `f64`, nulls as `NaN`.
fn f64_column(col: &ArrayRef) -> Result<Vec<f64>> {
    let values = cast(col, &DataType::Float64)?;
    Ok(values
        .as_primitive::<Float64Type>()
        .iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

fn integer_column(col: &ArrayRef) -> Result<Vec<i64>> {
    let values = cast(col, &DataType::Int64)?;
    values
        .as_primitive::<Int64Type>()
        .iter()
        .enumerate()
        .map(|(i, v)| v.with_context(|| format!("null value in row {i}")))
        .collect()
}

fn time_column(col: &ArrayRef) -> Result<Vec<DateTime<Utc>>> {
    match col.data_type() {
        DataType::Timestamp(_, tz) => {
            // the stored value is always relative to the UTC epoch; only the unit changes
            let ns = cast(col, &DataType::Timestamp(TimeUnit::Nanosecond, tz.clone()))?;
            timestamps_from_nanos(ns.as_primitive::<TimestampNanosecondType>())
        }
        DataType::Date32 | DataType::Date64 => {
            let ns = cast(col, &DataType::Timestamp(TimeUnit::Nanosecond, None))?;
            timestamps_from_nanos(ns.as_primitive::<TimestampNanosecondType>())
        }
        DataType::Utf8 | DataType::LargeUtf8 => {
            let s = cast(col, &DataType::Utf8)?;
            s.as_string::<i32>()
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    v.and_then(parse_time)
                        .with_context(|| format!("row {i}: {v:?} is not a timestamp"))
                })
                .collect()
        }
        _ => f64_column(col)?
            .into_iter()
            .enumerate()
            .map(|(i, secs)| {
                from_epoch_seconds(secs)
                    .with_context(|| format!("row {i}: {secs} is not an epoch time"))
            })
            .collect(),
    }
}

fn timestamps_from_nanos(
    arr: &arrow::array::PrimitiveArray<TimestampNanosecondType>,
) -> Result<Vec<DateTime<Utc>>> {
    arr.iter()
        .enumerate()
        .map(|(i, v)| {
            let ns = v.with_context(|| format!("null time in row {i}"))?;
            DateTime::from_timestamp(
                ns.div_euclid(1_000_000_000),
                ns.rem_euclid(1_000_000_000) as u32,
            )
            .with_context(|| format!("row {i}: time out of range"))
        })
        .collect()
}

/// Extract a `Vec<f64>` from a List, LargeList or FixedSizeList column at the given row.
fn extract_f64_list(col: &ArrayRef, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        DataType::FixedSizeList(_, _) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<FixedSizeListArray>()
                .context("expected FixedSizeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected a list column, got {other:?}"),
    };

    if !values_array.data_type().is_numeric() {
        bail!(
            "List inner type is {:?}, expected a numeric type",
            values_array.data_type()
        );
    }
    f64_column(&values_array)
}

// ---------------------------------------------------------------------------
// Discrete sample sheets
// ---------------------------------------------------------------------------

pub const LATITUDE_COLUMN: &str = "Start Latitude [degrees]";
pub const LONGITUDE_COLUMN: &str = "Start Longitude [degrees]";
pub const DEPTH_COLUMN: &str = "CTD Depth [m]";

/// Load an OOI discrete (bottle) sample summary CSV.
///
/// Latitude and longitude are required on every row; a blank or fill-valued
/// depth becomes `NaN`. The remaining columns are kept as text.
pub fn load_bottle_samples(path: &Path) -> Result<Vec<BottleSample>> {
    let mut reader = csv::Reader::from_path(path).context("opening sample CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("sample CSV missing '{name}' column"))
    };
    let lat_idx = position(LATITUDE_COLUMN)?;
    let lon_idx = position(LONGITUDE_COLUMN)?;
    let depth_idx = position(DEPTH_COLUMN)?;

    let mut samples = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let number = |idx: usize| -> Result<f64> {
            let cell = record.get(idx).unwrap_or("").trim();
            cell.parse::<f64>().with_context(|| {
                format!("Row {row_no}, {}: '{cell}' is not a number", headers[idx])
            })
        };

        let location = GeoPoint::new(number(lat_idx)?, number(lon_idx)?);
        let depth = match record.get(depth_idx).map(str::trim) {
            None | Some("") => f64::NAN,
            Some(_) => match number(depth_idx)? {
                d if d == FILL_VALUE => f64::NAN,
                d => d,
            },
        };

        let metadata = record
            .iter()
            .enumerate()
            .filter(|(i, _)| ![lat_idx, lon_idx, depth_idx].contains(i))
            .map(|(i, v)| (headers[i].clone(), v.to_string()))
            .collect();

        samples.push(BottleSample {
            location,
            depth,
            metadata,
        });
    }

    log::info!("Loaded {} discrete samples from {}", samples.len(), path.display());
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_time_accepts_common_forms() {
        let expected = "2022-05-01T12:30:00Z".parse::<DateTime<Utc>>().unwrap();
        assert_eq!(parse_time("2022-05-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_time("2022-05-01T07:30:00-05:00"), Some(expected));
        assert_eq!(parse_time("2022-05-01 12:30:00"), Some(expected));
        assert_eq!(parse_time("2022-05-01T12:30:00.000"), Some(expected));
        assert_eq!(parse_time("1651408200"), Some(expected));
        assert!(parse_time("yesterday").is_none());
    }

    #[test]
    fn semicolon_floats_allow_missing_entries() {
        let v = parse_semicolon_floats("1.5; ;NaN;3", 0, "signal_434").unwrap();
        assert_eq!(v[0], 1.5);
        assert!(v[1].is_nan() && v[2].is_nan());
        assert_eq!(v[3], 3.0);
        assert!(parse_semicolon_floats("1;x", 0, "signal_434").is_err());
    }

    #[test]
    fn late_scalar_columns_are_back_filled() {
        let mut cols = ColumnSet::default();
        cols.time = vec![DateTime::from_timestamp(0, 0).unwrap(); 3];
        cols.extend_scalar("a", 2, [5.0]);
        let ds = cols.finish("x".into(), &BTreeMap::new()).unwrap();
        let v = &ds.variable("a").unwrap().values;
        assert!(v[0].is_nan() && v[1].is_nan());
        assert_eq!(v[2], 5.0);
    }

    #[test]
    fn array_gaps_are_errors() {
        let mut cols = ColumnSet::default();
        assert!(cols.extend_array("signal_434", 1, vec![vec![1.0]]).is_err());
    }
}
