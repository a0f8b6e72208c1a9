use std::env;
use std::fs;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use chrono::NaiveDate;
use optifolio::catalog::AssetCatalog;
use optifolio::error::FetchError;
use optifolio::market::FetchOutcome;
use optifolio::market::RawPriceSeries;
use optifolio::portfolio::EngineConfig;
use optifolio::portfolio::PortfolioEngine;
use optifolio::report;

const USAGE: &str = "usage: optifolio <prices_dir> <budget> [catalog.csv]\n\
                     \x20      optifolio --fetch <tickers,comma-separated> <start YYYY-MM-DD> <budget> [catalog.csv]  (requires the `yahoo` feature)";

fn main() -> Result<()> {
  let args: Vec<String> = env::args().skip(1).collect();

  #[cfg(feature = "yahoo")]
  {
    if args.first().map(String::as_str) == Some("--fetch") {
      return run_fetch(&args[1..]);
    }
  }

  run_local(&args)
}

fn run_local(args: &[String]) -> Result<()> {
  if args.len() < 2 {
    bail!("{USAGE}");
  }
  let budget: f64 = args[1].parse().context("budget must be a number")?;
  let catalog = load_catalog(args.get(2))?;
  let outcomes = read_price_dir(Path::new(&args[0]))?;

  run_pipeline(outcomes, budget, &catalog)
}

#[cfg(feature = "yahoo")]
fn run_fetch(args: &[String]) -> Result<()> {
  use optifolio::yahoo::fetch_daily_closes;
  use optifolio::yahoo::FetchRange;

  if args.len() < 3 {
    bail!("{USAGE}");
  }
  let tickers: Vec<String> = args[0]
    .split(',')
    .map(|s| s.trim().to_string())
    .filter(|s| !s.is_empty())
    .collect();
  if tickers.is_empty() {
    bail!("no tickers requested");
  }
  let start =
    NaiveDate::parse_from_str(&args[1], "%Y-%m-%d").context("start date must be YYYY-MM-DD")?;
  let budget: f64 = args[2].parse().context("budget must be a number")?;
  let catalog = load_catalog(args.get(3))?;

  let outcomes = fetch_daily_closes(&tickers, &FetchRange::from_start(start));
  run_pipeline(outcomes, budget, &catalog)
}

fn load_catalog(path: Option<&String>) -> Result<AssetCatalog> {
  match path {
    Some(path) => Ok(AssetCatalog::from_csv_path(path)?),
    None => Ok(AssetCatalog::default()),
  }
}

fn read_price_dir(dir: &Path) -> Result<Vec<FetchOutcome>> {
  let mut paths: Vec<_> = fs::read_dir(dir)
    .with_context(|| format!("cannot read price directory {}", dir.display()))?
    .filter_map(|entry| entry.ok().map(|e| e.path()))
    .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
    .collect();
  paths.sort();

  if paths.is_empty() {
    bail!("no .csv price files in {}", dir.display());
  }

  Ok(
    paths
      .iter()
      .filter_map(|path| {
        let ticker = path.file_stem()?.to_str()?.to_string();
        Some(read_price_file(path, &ticker))
      })
      .collect(),
  )
}

fn read_price_file(path: &Path, ticker: &str) -> FetchOutcome {
  let source_err = |message: String| FetchError::Source {
    ticker: ticker.to_string(),
    message,
  };

  let file = File::open(path).map_err(|e| source_err(e.to_string()))?;
  let mut points = Vec::new();
  for line in BufReader::new(file).lines() {
    let line = line.map_err(|e| source_err(e.to_string()))?;
    let line = line.trim();
    if line.is_empty() {
      continue;
    }
    let Some((date, close)) = line.split_once(',') else {
      return Err(source_err(format!("expected `date,close`, got `{line}`")));
    };
    let date = date.trim();
    if date.eq_ignore_ascii_case("date") {
      continue;
    }
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
      .map_err(|e| source_err(format!("bad date `{date}`: {e}")))?;
    let close: f64 = close
      .trim()
      .parse()
      .map_err(|e| source_err(format!("bad close on {date}: {e}")))?;
    points.push((date, close));
  }

  Ok(RawPriceSeries::new(ticker, points))
}

fn run_pipeline(outcomes: Vec<FetchOutcome>, budget: f64, catalog: &AssetCatalog) -> Result<()> {
  let engine = PortfolioEngine::new(EngineConfig::default());

  let (panel, warnings) = match engine.ingest(outcomes) {
    Ok(ingested) => ingested,
    Err(e) => bail!("no valid data: {e}"),
  };
  for message in report::exclusion_messages(&warnings) {
    eprintln!("{message}");
  }

  let (weights, metrics) = match engine.optimize(&panel) {
    Ok(optimized) => optimized,
    Err(e) => bail!("optimization infeasible, try different assets: {e}"),
  };

  println!("Suggested weights:");
  report::weights_table(&weights, catalog).printstd();
  println!("Metrics:");
  report::metrics_table(&metrics).printstd();

  let latest = panel.latest_prices();
  let allocation = engine.allocate(&weights, &latest, budget)?;
  if allocation.is_degenerate() {
    println!("{}", report::degenerate_message(budget));
  } else {
    println!("Suggested allocation:");
    report::allocation_table(&allocation, &latest, catalog).printstd();
    println!("{}", report::leftover_message(allocation.leftover));
  }

  println!("{}", report::DISCLAIMER);
  Ok(())
}
