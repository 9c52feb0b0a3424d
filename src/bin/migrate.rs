use anyhow::{Context, Result};

use wc_scorers::config::PipelineConfig;
use wc_scorers::logging;
use wc_scorers::migrate::{Sheet, migrate_csv};
use wc_scorers::store::{DocumentStore, SqliteDocumentStore};

fn main() -> Result<()> {
    logging::init_stderr();
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let cfg = PipelineConfig::load(&args);

    let mut store = SqliteDocumentStore::open(&cfg.db_path, &cfg.database)
        .context("unable to open document store")?;
    if cfg.clear_before_publish {
        store.clear(&cfg.player_collection)?;
        store.clear(&cfg.team_collection)?;
    }

    let players = migrate_csv(
        &mut store,
        &cfg.player_csv_path(),
        &cfg.player_collection,
        Sheet::Players,
    )?;
    let teams = migrate_csv(
        &mut store,
        &cfg.team_csv_path(),
        &cfg.team_collection,
        Sheet::Teams,
    )?;

    println!("Migration complete into '{}'", store.database());
    println!("DB: {}", cfg.db_path.display());
    println!("{}: {players} documents", cfg.player_collection);
    println!("{}: {teams} documents", cfg.team_collection);
    Ok(())
}
