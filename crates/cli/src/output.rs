use crate::input::CenterTable;
use chrono::{DateTime, Local};
use funding_solver::Allocation;
use std::io;
use std::path::{Path, PathBuf};

pub const EFFECTIVE_CAP: &str = "effective_cap";
pub const PER_PERSON_RATE: &str = "per_person_rate";
pub const PER_CENTER_FUNDING: &str = "per_center_funding";

/// Columns appended to (or overwritten in) the input table, in order
pub const OUTPUT_COLUMNS: [&str; 7] = [
    EFFECTIVE_CAP,
    PER_PERSON_RATE,
    PER_CENTER_FUNDING,
    "total_funding",
    "base_funding",
    "unincorporated_funding",
    "global_cap",
];

/// `optimized_<YYYYmmdd_HHMMSS>.csv` inside `dir`
pub fn default_output_path(dir: &Path, now: DateTime<Local>) -> PathBuf {
    dir.join(format!("optimized_{}.csv", now.format("%Y%m%d_%H%M%S")))
}

fn format_amount(value: f64) -> String {
    format!("{value}")
}

/// Header row of the output table and the position of each output column
fn output_layout(headers: &[String]) -> (Vec<String>, [usize; OUTPUT_COLUMNS.len()]) {
    let mut out = headers.to_vec();
    let mut positions = [0usize; OUTPUT_COLUMNS.len()];
    for (slot, name) in positions.iter_mut().zip(OUTPUT_COLUMNS) {
        *slot = match out.iter().position(|h| h == name) {
            Some(existing) => existing,
            None => {
                out.push(name.to_string());
                out.len() - 1
            }
        };
    }
    (out, positions)
}

pub fn write_allocation<W: io::Write>(
    writer: W,
    table: &CenterTable,
    allocation: &Allocation,
) -> csv::Result<()> {
    let (headers, positions) = output_layout(&table.headers);
    let params = &allocation.params;
    let rate = format_amount(allocation.rate);
    let total = format_amount(params.total_funding);
    let base = format_amount(params.base_funding);
    let bonus = format_amount(params.unincorporated_funding);
    let global_cap = format_amount(params.global_cap.limit().unwrap_or(0.0));

    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(&headers)?;
    for (record, row) in table.records.iter().zip(&allocation.rows) {
        let mut fields: Vec<String> = record.iter().map(str::to_string).collect();
        fields.resize(headers.len(), String::new());

        let values = [
            row.effective_cap.limit().map(format_amount).unwrap_or_default(),
            rate.clone(),
            format_amount(row.per_center_funding),
            total.clone(),
            base.clone(),
            bonus.clone(),
            global_cap.clone(),
        ];
        for (position, value) in positions.iter().zip(values) {
            fields[*position] = value;
        }
        writer.write_record(&fields)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_allocation_file(
    path: &Path,
    table: &CenterTable,
    allocation: &Allocation,
) -> csv::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_allocation(file, table, allocation)?;
    log::info!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}
