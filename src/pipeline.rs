use std::collections::BTreeMap;

use anyhow::Result;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{Aggregation, aggregate, player_counts_per_year, team_counts_per_year};
use crate::config::PipelineConfig;
use crate::extract::{SeasonTable, TableExtractor};
use crate::fetch::PageFetcher;
use crate::publish::{PublishReport, publish};
use crate::store::DocumentStore;

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub seasons_total: usize,
    pub seasons_succeeded: usize,
    pub players_per_year: BTreeMap<u16, usize>,
    pub teams_per_year: BTreeMap<u16, usize>,
    pub player_rows: usize,
    pub team_rows: usize,
    pub errors: Vec<String>,
}

pub struct RunOutput {
    pub aggregation: Aggregation,
    pub summary: RunSummary,
    pub report: PublishReport,
}

fn fetch_season(
    cfg: &PipelineConfig,
    fetcher: &dyn PageFetcher,
    extractor: &TableExtractor,
    year: u16,
) -> (SeasonTable, Option<String>) {
    let url = cfg.season_url(year);
    info!(year, %url, "fetching season");
    match fetcher.fetch(&url, year) {
        Ok(html) => (extractor.extract(&html, year), None),
        Err(err) => {
            warn!(year, "fetch failed: {err:#}");
            (SeasonTable::empty(year), Some(format!("season {year}: {err:#}")))
        }
    }
}

/// Season tables in ascending year order. Seasons are fetched one at a
/// time unless `parallel_fetch` fans them out on rayon. Any render wait
/// happens inside the fetcher, before the page is handed back for parsing.
pub fn collect_seasons(
    cfg: &PipelineConfig,
    fetcher: &dyn PageFetcher,
) -> (Vec<SeasonTable>, Vec<String>) {
    let extractor = TableExtractor::for_section(&cfg.section_title);

    let mut results: Vec<(SeasonTable, Option<String>)> = if cfg.parallel_fetch {
        cfg.seasons
            .par_iter()
            .map(|year| fetch_season(cfg, fetcher, &extractor, *year))
            .collect()
    } else {
        cfg.seasons
            .iter()
            .map(|year| fetch_season(cfg, fetcher, &extractor, *year))
            .collect()
    };

    results.sort_by_key(|(table, _)| table.year);
    let mut errors = Vec::new();
    let mut tables = Vec::with_capacity(results.len());
    for (table, err) in results {
        if let Some(err) = err {
            errors.push(err);
        }
        tables.push(table);
    }
    (tables, errors)
}

pub fn summarize(tables: &[SeasonTable], agg: &Aggregation, errors: Vec<String>) -> RunSummary {
    RunSummary {
        seasons_total: tables.len(),
        seasons_succeeded: tables.iter().filter(|t| !t.is_empty()).count(),
        players_per_year: player_counts_per_year(&agg.players.records),
        teams_per_year: team_counts_per_year(&agg.teams),
        player_rows: agg.players.records.len(),
        team_rows: agg.teams.len(),
        errors,
    }
}

/// Fetch, extract, aggregate, publish. Fatal aggregation errors return
/// before any sink is touched; sink failures are carried in the report.
pub fn run(
    cfg: &PipelineConfig,
    fetcher: &dyn PageFetcher,
    store: Option<&mut dyn DocumentStore>,
) -> Result<RunOutput> {
    let (tables, errors) = collect_seasons(cfg, fetcher);
    let aggregation = aggregate(&tables)?;
    let summary = summarize(&tables, &aggregation, errors);
    info!(
        seasons = summary.seasons_succeeded,
        of = summary.seasons_total,
        players = summary.player_rows,
        teams = summary.team_rows,
        "aggregation complete"
    );

    let report = publish(cfg, &aggregation, store);
    Ok(RunOutput {
        aggregation,
        summary,
        report,
    })
}
