//! Allocation file: locate, parse, validate, and generate.
//!
//! Two formats share one header layout (`Symbol, Percentage`):
//!
//! - **Spreadsheet** (`.xlsx`): weights are fractions, `0.25` = 25%. A
//!   trailing `Total` row is skipped.
//! - **CSV**: weights are percentages, `25` or `25%` = 25%.

use std::fs;
use std::path::{Path, PathBuf};

use calamine::{Data, Reader, open_workbook_auto};
use log::{info, warn};
use rhfolio::{Symbol, TargetAllocation, compare_symbols};
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook};

use crate::error::{Error, Result};

/// On-disk allocation format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AllocationFormat {
    Csv,
    #[value(name = "excel", alias = "xlsx")]
    Xlsx,
}

impl AllocationFormat {
    /// Configured file name for this format.
    pub fn file_name<'a>(self, csv_file: &'a str, xlsx_file: &'a str) -> &'a str {
        match self {
            AllocationFormat::Csv => csv_file,
            AllocationFormat::Xlsx => xlsx_file,
        }
    }
}

/// A located allocation file.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationFile {
    pub path: PathBuf,
    pub format: AllocationFormat,
}

impl AllocationFile {
    /// Find the allocation file in `dir`. The spreadsheet wins when both exist.
    pub fn locate(dir: &Path, csv_file: &str, xlsx_file: &str) -> Result<Self> {
        let xlsx = dir.join(xlsx_file);
        let csv = dir.join(csv_file);

        match (xlsx.is_file(), csv.is_file()) {
            (true, both) => {
                if both {
                    warn!(
                        "Both {} and {} exist; using the spreadsheet",
                        xlsx.display(),
                        csv.display()
                    );
                }
                Ok(Self {
                    path: xlsx,
                    format: AllocationFormat::Xlsx,
                })
            }
            (false, true) => Ok(Self {
                path: csv,
                format: AllocationFormat::Csv,
            }),
            (false, false) => Err(Error::AllocationMissing {
                dir: dir.to_path_buf(),
                csv: csv_file.to_string(),
                xlsx: xlsx_file.to_string(),
            }),
        }
    }

    /// Parse `(symbol, weight)` rows, weights as fractions, in file order.
    pub fn load_rows(&self) -> Result<Vec<(Symbol, f64)>> {
        match self.format {
            AllocationFormat::Xlsx => read_xlsx(&self.path),
            AllocationFormat::Csv => read_csv(&self.path),
        }
    }

    /// Load and validate against the watchlist.
    ///
    /// Symbol sync is checked before the weight sum, so a file that has
    /// drifted from the watchlist reports the drift rather than a bad total.
    pub fn load(&self, watchlist: &[Symbol]) -> Result<TargetAllocation> {
        let rows = self.load_rows()?;
        let file_symbols: Vec<Symbol> = rows.iter().map(|(s, _)| *s).collect();
        compare_symbols(&file_symbols, watchlist)?;
        let target = TargetAllocation::new(rows)?;
        info!(
            "Loaded {} targets from {}",
            target.len(),
            self.path.display()
        );
        Ok(target)
    }
}

fn parse_symbol(raw: &str, line: usize, path: &Path) -> Result<Symbol> {
    Symbol::try_new(raw).ok_or_else(|| {
        Error::AllocationFile(format!(
            "{} row {line}: invalid symbol {raw:?}",
            path.display()
        ))
    })
}

fn read_xlsx(path: &Path) -> Result<Vec<(Symbol, f64)>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::AllocationFile(format!("{} has no worksheets", path.display())))??;

    let mut rows = Vec::new();
    for (i, row) in range.rows().enumerate().skip(1) {
        let line = i + 1;
        let symbol_cell = row.first().unwrap_or(&Data::Empty);
        let raw = match symbol_cell {
            Data::Empty => continue,
            Data::String(s) if s.trim().is_empty() => continue,
            Data::String(s) => s.trim(),
            other => {
                return Err(Error::AllocationFile(format!(
                    "{} row {line}: expected a symbol, found {other:?}",
                    path.display()
                )));
            }
        };
        if raw.eq_ignore_ascii_case("total") {
            continue;
        }
        let symbol = parse_symbol(raw, line, path)?;

        let weight = match row.get(1).unwrap_or(&Data::Empty) {
            Data::Float(f) => *f,
            Data::Int(n) => *n as f64,
            Data::String(s) => s.trim().parse::<f64>().map_err(|_| {
                Error::AllocationFile(format!(
                    "{} row {line}: invalid weight {s:?} for {symbol}",
                    path.display()
                ))
            })?,
            other => {
                return Err(Error::AllocationFile(format!(
                    "{} row {line}: invalid weight {other:?} for {symbol}",
                    path.display()
                )));
            }
        };
        rows.push((symbol, weight));
    }
    Ok(rows)
}

fn read_csv(path: &Path) -> Result<Vec<(Symbol, f64)>> {
    let content = fs::read_to_string(path).map_err(|e| Error::AllocationRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let line = record.position().map_or(i + 2, |p| p.line() as usize);
        if record.iter().all(str::is_empty) {
            continue;
        }

        let symbol = parse_symbol(record.get(0).unwrap_or(""), line, path)?;
        let raw = record.get(1).unwrap_or("");
        let pct: f64 = raw
            .trim_end_matches('%')
            .trim()
            .parse()
            .map_err(|_| {
                Error::AllocationFile(format!(
                    "{} row {line}: invalid percentage {raw:?} for {symbol}",
                    path.display()
                ))
            })?;
        rows.push((symbol, pct / 100.0));
    }
    Ok(rows)
}

/// Write a starter allocation file listing `watchlist` with zero weights.
///
/// Refuses to overwrite an existing file. Returns the written path.
pub fn generate(
    format: AllocationFormat,
    dir: &Path,
    file_name: &str,
    watchlist: &[Symbol],
) -> Result<PathBuf> {
    let path = dir.join(file_name);
    if path.exists() {
        return Err(Error::AllocationFile(format!(
            "{} already exists; refusing to overwrite",
            path.display()
        )));
    }

    match format {
        AllocationFormat::Csv => write_csv(&path, watchlist)?,
        AllocationFormat::Xlsx => write_xlsx(&path, watchlist)?,
    }
    info!(
        "Wrote {} symbols to {}",
        watchlist.len(),
        path.display()
    );
    Ok(path)
}

fn write_csv(path: &Path, watchlist: &[Symbol]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["Symbol", "Percentage"])?;
    for symbol in watchlist {
        wtr.write_record([symbol.as_str(), "0.00"])?;
    }
    wtr.flush()
        .map_err(|e| Error::AllocationFile(format!("failed to write {}: {e}", path.display())))?;
    Ok(())
}

fn write_xlsx(path: &Path, watchlist: &[Symbol]) -> Result<()> {
    let header = Format::new().set_bold().set_align(FormatAlign::Center);
    let percent = Format::new().set_num_format("0.00%");
    let total_label = Format::new().set_bold();
    let total = Format::new()
        .set_bold()
        .set_num_format("0.00%")
        .set_font_color(Color::RGB(0x006400));

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Portfolio")?;
        sheet.write_string_with_format(0, 0, "Symbol", &header)?;
        sheet.write_string_with_format(0, 1, "Percentage", &header)?;
        sheet.set_column_width(0, 12)?;
        sheet.set_column_width(1, 12)?;

        let mut row: u32 = 1;
        for symbol in watchlist {
            sheet.write_string(row, 0, symbol.as_str())?;
            sheet.write_number_with_format(row, 1, 0.0, &percent)?;
            row += 1;
        }

        sheet.write_string_with_format(row, 0, "Total", &total_label)?;
        let formula = format!("=SUM(B2:B{row})");
        sheet.write_formula_with_format(row, 1, formula.as_str(), &total)?;
    }
    workbook.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhfolio::AllocationError;
    use std::io::Write;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn syms(list: &[&str]) -> Vec<Symbol> {
        list.iter().map(|s| Symbol::new(s)).collect()
    }

    #[test]
    fn locate_prefers_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Robinhood.csv", "Symbol,Percentage\n");
        write(dir.path(), "Robinhood.xlsx", "");
        let file = AllocationFile::locate(dir.path(), "Robinhood.csv", "Robinhood.xlsx").unwrap();
        assert_eq!(file.format, AllocationFormat::Xlsx);
    }

    #[test]
    fn locate_falls_back_to_csv() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Robinhood.csv", "Symbol,Percentage\n");
        let file = AllocationFile::locate(dir.path(), "Robinhood.csv", "Robinhood.xlsx").unwrap();
        assert_eq!(file.format, AllocationFormat::Csv);
        assert_eq!(file.path, dir.path().join("Robinhood.csv"));
    }

    #[test]
    fn locate_missing_is_first_run_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AllocationFile::locate(dir.path(), "Robinhood.csv", "Robinhood.xlsx").unwrap_err();
        assert!(matches!(err, Error::AllocationMissing { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn csv_percentages_become_fractions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "a.csv",
            "Symbol,Percentage\nAAPL,60\n\n msft , 40% \n",
        );
        let file = AllocationFile { path, format: AllocationFormat::Csv };
        let rows = file.load_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, Symbol::new("AAPL"));
        assert!((rows[0].1 - 0.6).abs() < 1e-12);
        assert_eq!(rows[1].0, Symbol::new("MSFT"));
        assert!((rows[1].1 - 0.4).abs() < 1e-12);
    }

    #[test]
    fn csv_bad_weight_names_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.csv", "Symbol,Percentage\nAAPL,sixty\n");
        let file = AllocationFile { path, format: AllocationFormat::Csv };
        let err = file.load_rows().unwrap_err();
        match err {
            Error::AllocationFile(msg) => assert!(msg.contains("row 2"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn csv_bad_symbol_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.csv", "Symbol,Percentage\nNOT A TICKER,10\n");
        let file = AllocationFile { path, format: AllocationFormat::Csv };
        assert!(matches!(file.load_rows(), Err(Error::AllocationFile(_))));
    }

    #[test]
    fn load_checks_sync_before_sum() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.csv", "Symbol,Percentage\nAAPL,50\n");
        let file = AllocationFile { path, format: AllocationFormat::Csv };
        let err = file.load(&syms(&["AAPL", "MSFT"])).unwrap_err();
        match err {
            Error::Allocation(AllocationError::OutOfSync { only_in_file, only_in_watchlist }) => {
                assert!(only_in_file.is_empty());
                assert_eq!(only_in_watchlist, syms(&["MSFT"]));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_rejects_bad_sum() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.csv", "Symbol,Percentage\nAAPL,50\nMSFT,40\n");
        let file = AllocationFile { path, format: AllocationFormat::Csv };
        let err = file.load(&syms(&["MSFT", "AAPL"])).unwrap_err();
        assert!(matches!(err, Error::Allocation(AllocationError::WeightSum { .. })));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn load_accepts_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "a.csv", "Symbol,Percentage\nAAPL,60.0\nMSFT,40.0\n");
        let file = AllocationFile { path, format: AllocationFormat::Csv };
        let target = file.load(&syms(&["MSFT", "AAPL"])).unwrap();
        assert_eq!(target.len(), 2);
        assert_eq!(target.weight(&Symbol::new("AAPL")), Some(0.6));
    }

    #[test]
    fn generate_csv_lists_watchlist() {
        let dir = tempfile::tempdir().unwrap();
        let path = generate(AllocationFormat::Csv, dir.path(), "Robinhood.csv", &syms(&["AAPL", "MSFT"])).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "Symbol,Percentage\nAAPL,0.00\nMSFT,0.00\n");
    }

    #[test]
    fn generate_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Robinhood.csv", "keep me");
        let err = generate(AllocationFormat::Csv, dir.path(), "Robinhood.csv", &syms(&["AAPL"])).unwrap_err();
        assert!(matches!(err, Error::AllocationFile(_)));
        assert_eq!(fs::read_to_string(dir.path().join("Robinhood.csv")).unwrap(), "keep me");
    }

    #[test]
    fn generated_xlsx_reads_back_as_zero_weights() {
        let dir = tempfile::tempdir().unwrap();
        let watchlist = syms(&["AAPL", "BRK.B"]);
        let path = generate(AllocationFormat::Xlsx, dir.path(), "Robinhood.xlsx", &watchlist).unwrap();

        let file = AllocationFile::locate(dir.path(), "Robinhood.csv", "Robinhood.xlsx").unwrap();
        assert_eq!(file.path, path);
        let rows = file.load_rows().unwrap();
        assert_eq!(rows, vec![(watchlist[0], 0.0), (watchlist[1], 0.0)]);
    }

    #[test]
    fn format_file_names() {
        assert_eq!(AllocationFormat::Csv.file_name("a.csv", "a.xlsx"), "a.csv");
        assert_eq!(AllocationFormat::Xlsx.file_name("a.csv", "a.xlsx"), "a.xlsx");
    }
}
