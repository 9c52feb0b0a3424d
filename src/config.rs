use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SEASONS: &[u16] = &[2002, 2006, 2010, 2014, 2018, 2022];
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://www.espn.com.mx/futbol/estadisticas/_/liga/FIFA.WORLD/temporada/{year}/vista/anotaciones";
pub const DEFAULT_SECTION_TITLE: &str = "Goleadores";
pub const DEFAULT_DATABASE: &str = "LasEstadisticasMundial";
pub const PLAYER_DATASET: &str = "goleadores_mundiales";
pub const TEAM_DATASET: &str = "goles_por_equipo";

const CACHE_DIR: &str = "wc_scorers";
const DEFAULT_RENDER_WAIT_SECS: u64 = 5;

/// How the rendered season page is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderMode {
    /// Plain GET; only works when the table is server-rendered.
    Http,
    /// Headless browser dumping the DOM after its virtual-time budget runs out.
    Browser { binary: String },
    /// Pre-rendered `<year>.html` files.
    Snapshots { dir: PathBuf },
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub seasons: Vec<u16>,
    pub url_template: String,
    pub section_title: String,
    pub render: RenderMode,
    pub render_wait: Duration,
    pub parallel_fetch: bool,
    pub output_dir: PathBuf,
    pub db_path: PathBuf,
    pub database: String,
    pub player_collection: String,
    pub team_collection: String,
    pub clear_before_publish: bool,
    pub write_xlsx: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seasons: DEFAULT_SEASONS.to_vec(),
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            section_title: DEFAULT_SECTION_TITLE.to_string(),
            render: RenderMode::Http,
            render_wait: Duration::from_secs(DEFAULT_RENDER_WAIT_SECS),
            parallel_fetch: false,
            output_dir: PathBuf::from("."),
            db_path: default_db_path().unwrap_or_else(|| PathBuf::from("wc_scorers.sqlite")),
            database: DEFAULT_DATABASE.to_string(),
            player_collection: PLAYER_DATASET.to_string(),
            team_collection: TEAM_DATASET.to_string(),
            clear_before_publish: false,
            write_xlsx: false,
        }
    }
}

impl PipelineConfig {
    /// Defaults, then `.env.local`/`.env`, then `APP_*` variables, then CLI flags.
    pub fn load(args: &[String]) -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");

        let mut cfg = Self::default();
        cfg.apply_env(|key| std::env::var(key).ok());
        cfg.apply_args(args);
        cfg
    }

    pub fn season_url(&self, year: u16) -> String {
        self.url_template.replace("{year}", &year.to_string())
    }

    pub fn player_csv_path(&self) -> PathBuf {
        self.output_dir.join(format!("{PLAYER_DATASET}.csv"))
    }

    pub fn team_csv_path(&self) -> PathBuf {
        self.output_dir.join(format!("{TEAM_DATASET}.csv"))
    }

    pub fn xlsx_path(&self) -> PathBuf {
        self.output_dir.join("estadisticas_mundial.xlsx")
    }

    pub fn apply_env(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(years) = get("APP_SEASONS").map(|raw| parse_years(&raw))
            && !years.is_empty()
        {
            self.seasons = years;
        }
        if let Some(template) = non_empty(get("APP_URL_TEMPLATE")) {
            self.url_template = template;
        }
        if let Some(secs) = get("APP_RENDER_WAIT_SECS").and_then(|v| v.trim().parse::<u64>().ok()) {
            self.render_wait = Duration::from_secs(secs);
        }
        if let Some(binary) = non_empty(get("APP_BROWSER")) {
            self.render = RenderMode::Browser { binary };
        }
        if let Some(dir) = non_empty(get("APP_HTML_DIR")) {
            self.render = RenderMode::Snapshots {
                dir: PathBuf::from(dir),
            };
        }
        if let Some(dir) = non_empty(get("APP_OUTPUT_DIR")) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(path) = non_empty(get("APP_DB_PATH")) {
            self.db_path = PathBuf::from(path);
        }
        if let Some(flag) = get("APP_PARALLEL_FETCH") {
            self.parallel_fetch = parse_bool(&flag);
        }
    }

    pub fn apply_args(&mut self, args: &[String]) {
        if let Some(years) = arg_value(args, "--years").map(|raw| parse_years(&raw))
            && !years.is_empty()
        {
            self.seasons = years;
        }
        if let Some(dir) = arg_value(args, "--out") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(path) = arg_value(args, "--db") {
            self.db_path = PathBuf::from(path);
        }
        if let Some(binary) = arg_value(args, "--browser") {
            self.render = RenderMode::Browser { binary };
        }
        if let Some(dir) = arg_value(args, "--html-dir") {
            self.render = RenderMode::Snapshots {
                dir: PathBuf::from(dir),
            };
        }
        if let Some(secs) = arg_value(args, "--wait").and_then(|v| v.trim().parse::<u64>().ok()) {
            self.render_wait = Duration::from_secs(secs);
        }
        if has_flag(args, "--clear") {
            self.clear_before_publish = true;
        }
        if has_flag(args, "--parallel") {
            self.parallel_fetch = true;
        }
        if has_flag(args, "--xlsx") {
            self.write_xlsx = true;
        }
    }
}

pub fn cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

pub fn default_db_path() -> Option<PathBuf> {
    cache_dir().map(|dir| dir.join(format!("{DEFAULT_DATABASE}.sqlite")))
}

/// Accepts `--key=value` and `--key value`; blank values are ignored.
pub fn arg_value(args: &[String], key: &str) -> Option<String> {
    let prefix = format!("{key}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == key {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() && !next.starts_with("--") {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}

pub fn parse_years(raw: &str) -> Vec<u16> {
    let mut out: Vec<u16> = Vec::new();
    for year in raw
        .split([',', ';', ' '])
        .filter_map(|part| part.trim().parse::<u16>().ok())
        .filter(|year| *year != 0)
    {
        if !out.contains(&year) {
            out.push(year);
        }
    }
    out
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
