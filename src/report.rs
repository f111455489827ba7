//! Output stage: CSV files and the printed summary.
//!
//! Values are written in shortest round-trip form so the files read back to
//! the exact in-memory tables. Missing values and NaN are empty fields.

use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::analysis::{BestLag, CorrelationColumn, CorrelationTable, MergedTable, ProtocolColumns};
use crate::domain::Protocol;
use crate::error::{LagError, Result};

pub const SUMMARY_HEADER: &str = "Summary of TVL and Price Relationship Patterns:";

const DATE_FORMAT: &str = "%Y-%m-%d";

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if !v.is_nan() => v.to_string(),
        _ => String::new(),
    }
}

fn parse_value(raw: &str, line: usize) -> Result<Option<f64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|e| LagError::Parse(format!("line {}: invalid number {:?}: {}", line, raw, e)))
}

/// Write the merged table: `date,TVL_<slug>,price_<token>,...`, one row per day
pub fn write_merged_table<W: Write>(out: &mut W, table: &MergedTable) -> Result<()> {
    writeln!(out, "{}", table.header().join(","))?;

    for (row, date) in table.dates.iter().enumerate() {
        let mut fields = Vec::with_capacity(1 + table.columns.len() * 2);
        fields.push(date.format(DATE_FORMAT).to_string());
        for column in &table.columns {
            fields.push(format_value(column.tvl.get(row).copied().flatten()));
            fields.push(format_value(column.price.get(row).copied().flatten()));
        }
        writeln!(out, "{}", fields.join(","))?;
    }

    Ok(())
}

/// Write the correlation table: `lag,<slug>,...`, one row per lag
pub fn write_correlation_table<W: Write>(out: &mut W, table: &CorrelationTable) -> Result<()> {
    let mut header = vec!["lag".to_string()];
    header.extend(table.columns.iter().map(|c| c.slug.clone()));
    writeln!(out, "{}", header.join(","))?;

    for (row, lag) in table.lags.iter().enumerate() {
        let mut fields = Vec::with_capacity(1 + table.columns.len());
        fields.push(lag.to_string());
        for column in &table.columns {
            fields.push(format_value(column.values.get(row).copied()));
        }
        writeln!(out, "{}", fields.join(","))?;
    }

    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(BufWriter::new(File::create(path)?))
}

pub fn save_merged_table(path: &Path, table: &MergedTable) -> Result<()> {
    let mut writer = create(path)?;
    write_merged_table(&mut writer, table)?;
    writer.flush()?;
    info!("Wrote {} rows to {}", table.num_rows(), path.display());
    Ok(())
}

pub fn save_correlation_table(path: &Path, table: &CorrelationTable) -> Result<()> {
    let mut writer = create(path)?;
    write_correlation_table(&mut writer, table)?;
    writer.flush()?;
    info!("Wrote {} lags to {}", table.lags.len(), path.display());
    Ok(())
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(path)?);
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }
    Ok(lines)
}

/// Read a file written by `save_merged_table`.
///
/// Column pairs are matched to `protocols` by their header names.
pub fn read_merged_table(path: &Path, protocols: &[Protocol]) -> Result<MergedTable> {
    let lines = read_lines(path)?;
    let (header, rows) = lines
        .split_first()
        .ok_or_else(|| LagError::Parse(format!("{} is empty", path.display())))?;

    let names: Vec<&str> = header.split(',').collect();
    if names.first() != Some(&"date") || names.len() % 2 != 1 {
        return Err(LagError::Parse(format!("unexpected header: {}", header)));
    }

    let mut columns = Vec::new();
    for pair in names[1..].chunks(2) {
        let protocol = protocols
            .iter()
            .find(|p| p.tvl_column() == pair[0] && p.price_column() == pair[1])
            .ok_or_else(|| {
                LagError::Parse(format!("unknown columns {} / {}", pair[0], pair[1]))
            })?;
        columns.push(ProtocolColumns {
            protocol: protocol.clone(),
            tvl: Vec::with_capacity(rows.len()),
            price: Vec::with_capacity(rows.len()),
        });
    }

    let mut dates = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let line = idx + 2;
        let fields: Vec<&str> = row.split(',').collect();
        if fields.len() != names.len() {
            return Err(LagError::Parse(format!(
                "line {}: expected {} fields, got {}",
                line,
                names.len(),
                fields.len()
            )));
        }

        let date = NaiveDate::parse_from_str(fields[0], DATE_FORMAT)
            .map_err(|e| LagError::Parse(format!("line {}: invalid date: {}", line, e)))?;
        dates.push(date);

        for (column, values) in columns.iter_mut().zip(fields[1..].chunks(2)) {
            column.tvl.push(parse_value(values[0], line)?);
            column.price.push(parse_value(values[1], line)?);
        }
    }

    Ok(MergedTable { dates, columns })
}

/// Read a file written by `save_correlation_table`; empty fields become NaN
pub fn read_correlation_table(path: &Path) -> Result<CorrelationTable> {
    let lines = read_lines(path)?;
    let (header, rows) = lines
        .split_first()
        .ok_or_else(|| LagError::Parse(format!("{} is empty", path.display())))?;

    let names: Vec<&str> = header.split(',').collect();
    if names.first() != Some(&"lag") {
        return Err(LagError::Parse(format!("unexpected header: {}", header)));
    }

    let mut columns: Vec<CorrelationColumn> = names[1..]
        .iter()
        .map(|slug| CorrelationColumn {
            slug: slug.to_string(),
            values: Vec::with_capacity(rows.len()),
        })
        .collect();

    let mut lags = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        let line = idx + 2;
        let fields: Vec<&str> = row.split(',').collect();
        if fields.len() != names.len() {
            return Err(LagError::Parse(format!(
                "line {}: expected {} fields, got {}",
                line,
                names.len(),
                fields.len()
            )));
        }

        let lag = fields[0]
            .trim()
            .parse::<i32>()
            .map_err(|e| LagError::Parse(format!("line {}: invalid lag: {}", line, e)))?;
        lags.push(lag);

        for (column, raw) in columns.iter_mut().zip(&fields[1..]) {
            column.values.push(parse_value(raw, line)?.unwrap_or(f64::NAN));
        }
    }

    Ok(CorrelationTable { lags, columns })
}

/// Interpretation of the sign of the strongest lag
pub fn direction(lag: i32) -> &'static str {
    match lag {
        l if l > 0 => "price changes lead TVL changes",
        l if l < 0 => "TVL changes lead price changes",
        _ => "a contemporaneous relationship",
    }
}

pub fn summary_line(slug: &str, best: &BestLag) -> String {
    format!(
        "- {}: Highest correlation at lag {} (correlation: {:.2}), suggesting {}.",
        slug,
        best.lag,
        best.correlation,
        direction(best.lag)
    )
}

/// Summary lines per protocol, in table order.
///
/// Protocols whose correlations are all undefined are left out.
pub fn summary_lines(table: &CorrelationTable) -> Vec<String> {
    table
        .columns
        .iter()
        .filter_map(|column| match column.best_lag(&table.lags) {
            Some(best) => Some(summary_line(&column.slug, &best)),
            None => {
                warn!(
                    protocol = %column.slug,
                    "No defined correlation at any lag, skipping summary"
                );
                None
            }
        })
        .collect()
}

pub fn write_summary<W: Write>(out: &mut W, table: &CorrelationTable) -> Result<()> {
    writeln!(out, "{}", SUMMARY_HEADER)?;
    for line in summary_lines(table) {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CorrelationTable {
        CorrelationTable {
            lags: vec![-1, 0, 1],
            columns: vec![
                CorrelationColumn {
                    slug: "uniswap".to_string(),
                    values: vec![0.1, -0.456, 0.2],
                },
                CorrelationColumn {
                    slug: "aave".to_string(),
                    values: vec![f64::NAN, f64::NAN, f64::NAN],
                },
            ],
        }
    }

    #[test]
    fn direction_by_sign() {
        assert_eq!(direction(3), "price changes lead TVL changes");
        assert_eq!(direction(-2), "TVL changes lead price changes");
        assert_eq!(direction(0), "a contemporaneous relationship");
    }

    #[test]
    fn summary_line_format() {
        let line = summary_line(
            "aave",
            &BestLag {
                lag: -2,
                correlation: 0.31415,
            },
        );
        assert_eq!(
            line,
            "- aave: Highest correlation at lag -2 (correlation: 0.31), suggesting TVL changes lead price changes."
        );
    }

    #[test]
    fn summary_skips_all_nan_protocol() {
        let mut out = Vec::new();
        write_summary(&mut out, &table()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], SUMMARY_HEADER);
        assert_eq!(
            lines[1],
            "- uniswap: Highest correlation at lag 0 (correlation: -0.46), suggesting a contemporaneous relationship."
        );
    }

    #[test]
    fn correlation_csv_layout() {
        let mut out = Vec::new();
        write_correlation_table(&mut out, &table()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "lag,uniswap,aave\n-1,0.1,\n0,-0.456,\n1,0.2,\n"
        );
    }

    #[test]
    fn merged_csv_layout() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let table = MergedTable {
            dates: start.iter_days().take(3).collect(),
            columns: vec![ProtocolColumns {
                protocol: Protocol::new("uniswap", "UNI", "uniswap"),
                tvl: vec![Some(5_100_000_000.5), None, Some(1.0)],
                price: vec![Some(11.52), Some(11.6), None],
            }],
        };

        let mut out = Vec::new();
        write_merged_table(&mut out, &table).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "date,TVL_uniswap,price_UNI\n\
             2024-02-28,5100000000.5,11.52\n\
             2024-02-29,,11.6\n\
             2024-03-01,1,\n"
        );
    }

    #[test]
    fn parse_value_rejects_garbage() {
        assert_eq!(parse_value("", 2).unwrap(), None);
        assert_eq!(parse_value("-0.5", 2).unwrap(), Some(-0.5));
        assert!(parse_value("abc", 7).unwrap_err().to_string().contains("line 7"));
    }
}
