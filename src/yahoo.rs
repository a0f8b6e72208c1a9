//! Daily adjusted-close download via Yahoo Finance.
//!
//! Market-data collaborator behind the `yahoo` cargo feature. Every
//! ticker yields its own `Result`, so one failed download never aborts
//! the request; the caller hands the aggregated outcomes to
//! [`crate::market::PriceSeries::from_outcomes`].

use chrono::NaiveDate;
use chrono::NaiveTime;
use indicatif::ProgressBar;
use time::OffsetDateTime;
use yahoo_finance_api::YahooConnector;

use crate::error::FetchError;
use crate::market::FetchOutcome;
use crate::market::RawPriceSeries;

/// Inclusive date range of a fetch request.
#[derive(Clone, Copy, Debug)]
pub struct FetchRange {
  /// First requested date.
  pub start: NaiveDate,
  /// Last requested date.
  pub end: NaiveDate,
}

impl FetchRange {
  /// Range from `start` through today (UTC).
  pub fn from_start(start: NaiveDate) -> Self {
    Self {
      start,
      end: chrono::Utc::now().date_naive(),
    }
  }
}

fn unix_midnight(date: NaiveDate) -> i64 {
  date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

fn range_endpoint(date: NaiveDate, ticker: &str) -> Result<OffsetDateTime, FetchError> {
  OffsetDateTime::from_unix_timestamp(unix_midnight(date)).map_err(|e| FetchError::Provider {
    ticker: ticker.to_string(),
    message: format!("invalid range endpoint {date}: {e}"),
  })
}

fn fetch_one(provider: &YahooConnector, ticker: &str, range: &FetchRange) -> FetchOutcome {
  let start = range_endpoint(range.start, ticker)?;
  let end = range_endpoint(range.end, ticker)?;

  let response = tokio_test::block_on(provider.get_quote_history(ticker, start, end)).map_err(
    |e| FetchError::Provider {
      ticker: ticker.to_string(),
      message: e.to_string(),
    },
  )?;
  let quotes = response.quotes().map_err(|e| FetchError::Provider {
    ticker: ticker.to_string(),
    message: e.to_string(),
  })?;

  if quotes.is_empty() {
    return Err(FetchError::Empty {
      ticker: ticker.to_string(),
    });
  }

  let points = quotes
    .iter()
    .filter_map(|quote| {
      chrono::DateTime::from_timestamp(quote.timestamp as i64, 0)
        .map(|dt| (dt.date_naive(), quote.adjclose))
    })
    .collect();

  Ok(RawPriceSeries::new(ticker, points))
}

/// Download daily adjusted closes for every ticker in `tickers`.
///
/// Outcomes are returned in request order, one per ticker.
pub fn fetch_daily_closes(tickers: &[String], range: &FetchRange) -> Vec<FetchOutcome> {
  let provider = match YahooConnector::new() {
    Ok(provider) => provider,
    Err(e) => {
      return tickers
        .iter()
        .map(|ticker| {
          Err(FetchError::Provider {
            ticker: ticker.clone(),
            message: format!("connector setup failed: {e}"),
          })
        })
        .collect();
    }
  };

  let bar = ProgressBar::new(tickers.len() as u64);
  let outcomes = tickers
    .iter()
    .map(|ticker| {
      let outcome = fetch_one(&provider, ticker, range);
      bar.inc(1);
      outcome
    })
    .collect();
  bar.finish_and_clear();

  outcomes
}
