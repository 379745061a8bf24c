use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CarteiraError;
use crate::types::Rate;
use crate::CarteiraResult;

/// Locations of the three tabular inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Expected-returns vector: ticker, annualized return.
    pub returns: PathBuf,
    /// Covariance matrix: square, tickers as both index and header.
    pub covariance: PathBuf,
    /// Ticker-to-sector mapping: columns "Ticker" and "Setor".
    pub sectors: PathBuf,
}

/// Annualized expected return per ticker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedReturns {
    entries: Vec<(String, Rate)>,
}

impl ExpectedReturns {
    pub fn new(entries: Vec<(String, Rate)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, ticker: &str) -> Option<Rate> {
        self.entries
            .iter()
            .find(|(t, _)| t == ticker)
            .map(|(_, r)| *r)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Square covariance matrix with ticker labels on both axes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CovarianceMatrix {
    pub tickers: Vec<String>,
    pub rows: Vec<Vec<Decimal>>,
}

impl CovarianceMatrix {
    /// Square shape and row-label agreement with the header.
    pub fn validate(&self, row_labels: &[String]) -> CarteiraResult<()> {
        let n = self.tickers.len();
        if self.rows.len() != n {
            return Err(CarteiraError::DimensionMismatch(format!(
                "covariance matrix has {} columns but {} rows",
                n,
                self.rows.len()
            )));
        }
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != n {
                return Err(CarteiraError::DimensionMismatch(format!(
                    "covariance row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    n
                )));
            }
        }
        for (i, label) in row_labels.iter().enumerate() {
            if label != &self.tickers[i] {
                return Err(CarteiraError::DimensionMismatch(format!(
                    "covariance row label '{}' does not match column label '{}'",
                    label, self.tickers[i]
                )));
            }
        }
        Ok(())
    }
}

/// One row of the ticker-to-sector mapping file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorEntry {
    pub ticker: String,
    pub sector: String,
}

/// The full ticker-to-sector mapping, unfiltered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorMap {
    pub entries: Vec<SectorEntry>,
}

impl SectorMap {
    /// Sector assigned to a ticker, if the mapping has one.
    pub fn sector_of(&self, ticker: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.ticker == ticker)
            .map(|e| e.sector.as_str())
    }
}

/// The three datasets the model is instantiated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketData {
    pub returns: ExpectedReturns,
    pub covariance: CovarianceMatrix,
    pub sectors: SectorMap,
}

/// Load all three input files, failing fast on the first missing one.
pub fn load_market_data(paths: &DataPaths) -> CarteiraResult<MarketData> {
    let returns = load_returns(&paths.returns)?;
    let covariance = load_covariance(&paths.covariance)?;
    let sectors = load_sector_map(&paths.sectors)?;
    Ok(MarketData {
        returns,
        covariance,
        sectors,
    })
}

/// Expected-returns CSV: first column ticker, second column value.
pub fn load_returns(path: &Path) -> CarteiraResult<ExpectedReturns> {
    let mut reader = open_csv(path)?;
    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| malformed(path, &e.to_string()))?;
        let ticker = field(&record, 0, path)?;
        let value = parse_decimal(&field(&record, 1, path)?, path)?;
        entries.push((ticker, value));
    }
    if entries.is_empty() {
        return Err(malformed(path, "no return entries"));
    }
    Ok(ExpectedReturns::new(entries))
}

/// Covariance CSV: header row carries the tickers, each data row a ticker
/// label followed by one value per ticker.
pub fn load_covariance(path: &Path) -> CarteiraResult<CovarianceMatrix> {
    let mut reader = open_csv(path)?;
    let header = reader
        .headers()
        .map_err(|e| malformed(path, &e.to_string()))?
        .clone();
    let tickers: Vec<String> = header.iter().skip(1).map(|s| s.trim().to_string()).collect();
    if tickers.is_empty() {
        return Err(malformed(path, "covariance header has no ticker columns"));
    }

    let mut row_labels = Vec::new();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| malformed(path, &e.to_string()))?;
        row_labels.push(field(&record, 0, path)?);
        let mut row = Vec::with_capacity(tickers.len());
        for i in 1..record.len() {
            row.push(parse_decimal(&field(&record, i, path)?, path)?);
        }
        rows.push(row);
    }

    let matrix = CovarianceMatrix { tickers, rows };
    matrix.validate(&row_labels)?;
    Ok(matrix)
}

/// Sector mapping CSV with named columns "Ticker" and "Setor".
pub fn load_sector_map(path: &Path) -> CarteiraResult<SectorMap> {
    let mut reader = open_csv(path)?;
    let header = reader
        .headers()
        .map_err(|e| malformed(path, &e.to_string()))?
        .clone();
    let ticker_col = column_index(&header, "Ticker", path)?;
    let sector_col = column_index(&header, "Setor", path)?;

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| malformed(path, &e.to_string()))?;
        entries.push(SectorEntry {
            ticker: field(&record, ticker_col, path)?,
            sector: field(&record, sector_col, path)?,
        });
    }
    Ok(SectorMap { entries })
}

fn open_csv(path: &Path) -> CarteiraResult<csv::Reader<std::fs::File>> {
    if !path.exists() {
        return Err(CarteiraError::DataFileNotFound {
            path: path.display().to_string(),
        });
    }
    csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| malformed(path, &e.to_string()))
}

fn column_index(header: &csv::StringRecord, name: &str, path: &Path) -> CarteiraResult<usize> {
    header
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| malformed(path, &format!("missing column '{}'", name)))
}

fn field(record: &csv::StringRecord, index: usize, path: &Path) -> CarteiraResult<String> {
    record
        .get(index)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| malformed(path, &format!("missing field {}", index)))
}

/// Pandas-written CSVs carry small covariances in scientific notation,
/// which Decimal's FromStr does not accept.
fn parse_decimal(raw: &str, path: &Path) -> CarteiraResult<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| malformed(path, &format!("not a number: '{}'", raw)))
}

fn malformed(path: &Path, reason: &str) -> CarteiraError {
    CarteiraError::MalformedData {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}
