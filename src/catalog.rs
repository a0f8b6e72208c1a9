//! Asset catalog mapping display names to tickers and back.
//!
//! The catalog is an explicit value passed to whichever collaborator
//! resolves names; nothing in the crate holds it as global state.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

use crate::error::PortfolioError;

/// Two-way name/ticker table.
#[derive(Clone, Debug, Default)]
pub struct AssetCatalog {
  name_to_ticker: BTreeMap<String, String>,
  ticker_to_name: BTreeMap<String, String>,
}

impl AssetCatalog {
  /// Build a catalog from `(name, ticker)` pairs.
  pub fn from_pairs<I, S>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (S, S)>,
    S: Into<String>,
  {
    let mut catalog = Self::default();
    for (name, ticker) in pairs {
      let name = name.into();
      let ticker = ticker.into();
      catalog.name_to_ticker.insert(name.clone(), ticker.clone());
      catalog.ticker_to_name.insert(ticker, name);
    }
    catalog
  }

  /// Load a catalog from a two-column `Name,Ticker` CSV file.
  ///
  /// A header row is skipped when present; blank lines are ignored.
  pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, PortfolioError> {
    let path = path.as_ref();
    let file = File::open(path)
      .map_err(|e| PortfolioError::data(format!("cannot open catalog {}: {e}", path.display())))?;
    let reader = BufReader::new(file);

    let mut pairs = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
      let line = line
        .map_err(|e| PortfolioError::data(format!("cannot read catalog {}: {e}", path.display())))?;
      let line = line.trim();
      if line.is_empty() {
        continue;
      }
      let (name, ticker) = line.split_once(',').ok_or_else(|| {
        PortfolioError::data(format!(
          "catalog {} line {}: expected `Name,Ticker`",
          path.display(),
          line_no + 1
        ))
      })?;
      let name = name.trim();
      let ticker = ticker.trim();
      if line_no == 0 && name.eq_ignore_ascii_case("name") && ticker.eq_ignore_ascii_case("ticker")
      {
        continue;
      }
      pairs.push((name.to_string(), ticker.to_string()));
    }

    if pairs.is_empty() {
      return Err(PortfolioError::data(format!(
        "catalog {} contains no entries",
        path.display()
      )));
    }

    Ok(Self::from_pairs(pairs))
  }

  /// Resolve a display name to its ticker.
  pub fn ticker(&self, name: &str) -> Option<&str> {
    self.name_to_ticker.get(name).map(String::as_str)
  }

  /// Resolve a ticker to its display name; falls back to the ticker itself.
  pub fn display_name<'a>(&'a self, ticker: &'a str) -> &'a str {
    self
      .ticker_to_name
      .get(ticker)
      .map(String::as_str)
      .unwrap_or(ticker)
  }

  /// All known display names, ascending.
  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.name_to_ticker.keys().map(String::as_str)
  }

  /// Number of entries.
  pub fn len(&self) -> usize {
    self.name_to_ticker.len()
  }

  /// True when the catalog holds no entries.
  pub fn is_empty(&self) -> bool {
    self.name_to_ticker.is_empty()
  }
}
