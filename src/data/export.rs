use std::path::Path;

use anyhow::{Context, Result, bail};

use super::model::OoiDataset;
use crate::qc::QartodFlag;

/// Write `time[,deployment],<flag_column>` rows for a flagged dataset.
pub fn write_flags_csv(
    path: &Path,
    ds: &OoiDataset,
    flag_column: &str,
    flags: &[QartodFlag],
) -> Result<()> {
    if flags.len() != ds.len() {
        bail!("{} flags for {} samples", flags.len(), ds.len());
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    let mut header = vec!["time"];
    if ds.deployment.is_some() {
        header.push("deployment");
    }
    header.push(flag_column);
    writer.write_record(&header).context("writing CSV header")?;

    for (i, (t, flag)) in ds.time.iter().zip(flags).enumerate() {
        let mut row = vec![t.to_rfc3339()];
        if let Some(deployment) = &ds.deployment {
            row.push(deployment[i].to_string());
        }
        row.push(flag.code().to_string());
        writer.write_record(&row).with_context(|| format!("writing row {i}"))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}
