use anyhow::{Context, Result, anyhow};

use wc_scorers::config::PipelineConfig;
use wc_scorers::fetch::fetcher_for;
use wc_scorers::logging;
use wc_scorers::pipeline;
use wc_scorers::publish::PublishReport;
use wc_scorers::store::{DocumentStore, SqliteDocumentStore};

const USAGE: &str = "\
Usage: scrape [options]

Fetches every season page, extracts the Goleadores table, and publishes
goleadores_mundiales / goles_por_equipo as CSV and into the document store.

The season pages build their tables with JavaScript. Without --browser or
--html-dir the pages are fetched with a plain GET, which runs no scripts,
so live pages usually come back without a table. Run live scrapes with
--browser=<chromium binary>.

Options:
  --years=2002,2006       seasons to fetch
  --browser=<binary>      render pages with a headless Chromium-compatible browser
  --wait=<secs>           browser virtual-time budget before the DOM is dumped
  --html-dir=<dir>        read pre-rendered <year>.html files instead of fetching
  --parallel              fetch seasons in parallel
  --out=<dir>             CSV output directory
  --xlsx                  also write estadisticas_mundial.xlsx
  --db=<path>             SQLite document store
  --no-db                 skip the document store
  --clear                 clear both collections before publishing
  --json                  print the run summary as JSON
  -h, --help              show this help

Every option can also be set through APP_* variables or a .env file.";

fn main() -> Result<()> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{USAGE}");
        return Ok(());
    }
    logging::init_stderr();
    let cfg = PipelineConfig::load(&args);
    if cfg.seasons.is_empty() {
        return Err(anyhow!("no seasons configured"));
    }

    let fetcher = fetcher_for(&cfg)?;
    let mut store = if args.iter().any(|a| a == "--no-db") {
        None
    } else {
        Some(
            SqliteDocumentStore::open(&cfg.db_path, &cfg.database)
                .context("unable to open document store")?,
        )
    };

    let output = pipeline::run(
        &cfg,
        fetcher.as_ref(),
        store.as_mut().map(|s| s as &mut dyn DocumentStore),
    )?;
    let summary = &output.summary;

    if args.iter().any(|a| a == "--json") {
        let json = serde_json::to_string_pretty(summary).context("serialize run summary")?;
        println!("{json}");
        return finish(&output.report);
    }

    println!("Scrape complete");
    println!(
        "Seasons: {}/{}",
        summary.seasons_succeeded, summary.seasons_total
    );
    println!("Player records per year:");
    for (year, count) in &summary.players_per_year {
        println!("  {year}: {count}");
    }
    println!("Total rows in {}: {}", cfg.player_csv_path().display(), summary.player_rows);
    println!("Team records per year:");
    for (year, count) in &summary.teams_per_year {
        println!("  {year}: {count}");
    }
    println!("Total rows in {}: {}", cfg.team_csv_path().display(), summary.team_rows);
    if !summary.errors.is_empty() {
        println!("Fetch errors: {}", summary.errors.len());
        for err in summary.errors.iter().take(8) {
            println!(" - {err}");
        }
    }

    for write in &output.report.writes {
        println!("{} {}: {} rows", write.sink, write.dataset, write.rows);
    }
    finish(&output.report)
}

fn finish(report: &PublishReport) -> Result<()> {
    if report.is_success() {
        return Ok(());
    }
    for failure in &report.failures {
        eprintln!("FAILED {failure}");
    }
    Err(anyhow!("{} dataset write(s) failed", report.failures.len()))
}
