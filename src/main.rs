use std::io;
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph};

use wc_scorers::config::{PipelineConfig, cache_dir};
use wc_scorers::dashboard::{
    ChartSpec, PLAYER_PAGE_SIZE, Snapshot, SnapshotSource, TEAM_PAGE_SIZE, TeamViewMode,
    load_snapshot_from_config, paginate,
};
use wc_scorers::logging;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Teams,
    Scorers,
}

struct App {
    snapshot: Snapshot,
    section: Section,
    team_years: Vec<u16>,
    player_years: Vec<u16>,
    team_year: usize,
    player_year: usize,
    view_mode: TeamViewMode,
    goals_min: i64,
    goals_max: i64,
    page: usize,
    show_help: bool,
    should_quit: bool,
}

impl App {
    fn new(snapshot: Snapshot) -> Self {
        let team_years = snapshot.team_years();
        let player_years = snapshot.player_years();
        let extent = snapshot.goals_extent();
        // Latest tournament selected first.
        let team_year = team_years.len().saturating_sub(1);
        let player_year = player_years.len().saturating_sub(1);
        Self {
            snapshot,
            section: Section::Teams,
            team_years,
            player_years,
            team_year,
            player_year,
            view_mode: TeamViewMode::default(),
            goals_min: *extent.start(),
            goals_max: *extent.end(),
            page: 0,
            show_help: false,
            should_quit: false,
        }
    }

    fn selected_team_year(&self) -> Option<u16> {
        self.team_years.get(self.team_year).copied()
    }

    fn selected_player_year(&self) -> Option<u16> {
        self.player_years.get(self.player_year).copied()
    }

    fn goals_range(&self) -> RangeInclusive<i64> {
        self.goals_min..=self.goals_max
    }

    fn on_key(&mut self, key: KeyEvent) {
        let extent = self.snapshot.goals_extent();
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.show_help = !self.show_help,
            KeyCode::Tab => {
                self.section = match self.section {
                    Section::Teams => Section::Scorers,
                    Section::Scorers => Section::Teams,
                };
                self.page = 0;
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.shift_year(false);
                self.page = 0;
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.shift_year(true);
                self.page = 0;
            }
            KeyCode::Char('t') => {
                self.view_mode = self.view_mode.toggle();
                self.page = 0;
            }
            KeyCode::Char('[') => self.goals_min = (self.goals_min - 1).max(*extent.start()),
            KeyCode::Char(']') => self.goals_min = (self.goals_min + 1).min(self.goals_max),
            KeyCode::Char('-') => self.goals_max = (self.goals_max - 1).max(self.goals_min),
            KeyCode::Char('=') => self.goals_max = (self.goals_max + 1).min(*extent.end()),
            KeyCode::Char('j') | KeyCode::Down => {
                self.page = (self.page + 1).min(self.page_count().saturating_sub(1))
            }
            KeyCode::Char('k') | KeyCode::Up => self.page = self.page.saturating_sub(1),
            _ => {}
        }
    }

    fn page_count(&self) -> usize {
        match self.section {
            Section::Teams => self.selected_team_year().map_or(1, |year| {
                let rows = self.snapshot.team_view(year, self.view_mode);
                paginate(&rows, 0, TEAM_PAGE_SIZE).pages
            }),
            Section::Scorers => self.selected_player_year().map_or(1, |year| {
                let rows = self.snapshot.player_view(year, self.goals_range());
                paginate(&rows, 0, PLAYER_PAGE_SIZE).pages
            }),
        }
    }

    fn shift_year(&mut self, forward: bool) {
        let (idx, len) = match self.section {
            Section::Teams => (&mut self.team_year, self.team_years.len()),
            Section::Scorers => (&mut self.player_year, self.player_years.len()),
        };
        if len == 0 {
            return;
        }
        *idx = if forward {
            (*idx + 1).min(len - 1)
        } else {
            idx.saturating_sub(1)
        };
    }
}

fn main() -> anyhow::Result<()> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let cfg = PipelineConfig::load(&args);
    if let Some(dir) = cache_dir() {
        if let Err(err) = logging::init_file(&dir.join("dashboard.log")) {
            eprintln!("logging disabled: {err:#}");
        }
    }
    let snapshot = load_snapshot_from_config(&cfg);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(snapshot);
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let metrics = Paragraph::new(metrics_text(app))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(metrics, chunks[1]);

    match app.section {
        Section::Teams => render_teams(frame, chunks[2], app),
        Section::Scorers => render_scorers(frame, chunks[2], app),
    }

    let footer = Paragraph::new(footer_text(app)).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[3]);

    if app.show_help {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(app: &App) -> String {
    let source = match app.snapshot.source {
        SnapshotSource::Store => "store",
        SnapshotSource::Fallback => "sample data (store unavailable)",
    };
    let section = match app.section {
        Section::Teams => "Equipos",
        Section::Scorers => "Goleadores",
    };
    format!("ESTADÍSTICAS FIFA MUNDIAL | {section}\nsource: {source}")
}

fn metrics_text(app: &App) -> String {
    let year = match app.section {
        Section::Teams => app.selected_team_year(),
        Section::Scorers => app.selected_player_year(),
    };
    let Some(year) = year else {
        return "No data".to_string();
    };
    let m = app.snapshot.metrics(year);
    let top_team = m
        .top_team
        .map(|(team, goals)| format!("{team} ({goals})"))
        .unwrap_or_else(|| "-".to_string());
    let top_scorer = m
        .top_scorer
        .map(|(player, team, goals)| format!("{player}, {team} ({goals})"))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "Mundial {year} | goles {} | equipos {} | goleadores {} | {:.1} goles/equipo\nmejor equipo: {top_team} | máximo goleador: {top_scorer}",
        m.total_goals, m.teams, m.players, m.goals_per_team
    )
}

fn footer_text(app: &App) -> String {
    match app.section {
        Section::Teams => format!(
            "Tab Goleadores | ←/→ Año | t Vista ({}) | j/k Página | ? Ayuda | q Salir",
            app.view_mode.label()
        ),
        Section::Scorers => format!(
            "Tab Equipos | ←/→ Año | [/] mín {} | -/= máx {} | j/k Página | ? Ayuda | q Salir",
            app.goals_min, app.goals_max
        ),
    }
}

fn render_teams(frame: &mut Frame, area: Rect, app: &App) {
    let Some(year) = app.selected_team_year() else {
        render_empty(frame, area, "No team data");
        return;
    };
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(columns[0]);

    let chart = app.snapshot.team_chart(year, app.view_mode);
    frame.render_widget(bar_chart(&chart, Color::Red), left[0]);
    let trend = app.snapshot.goals_trend_chart();
    frame.render_widget(bar_chart(&trend, Color::Cyan), left[1]);

    let rows = app.snapshot.team_view(year, app.view_mode);
    let page = paginate(&rows, app.page, TEAM_PAGE_SIZE);
    let mut lines = vec![format!("{:<24} {:>6} {:>5}", "Equipo", "Año", "G")];
    for row in page.items {
        lines.push(format!(
            "{:<24} {:>6} {:>5}",
            truncate(&row.team, 24),
            row.year,
            format_goals(row.goals)
        ));
    }
    let table = Paragraph::new(lines.join("\n")).block(
        Block::default()
            .title(format!(
                "Datos Detallados ({}/{}, {} filas)",
                page.page + 1,
                page.pages,
                page.total
            ))
            .borders(Borders::ALL),
    );
    frame.render_widget(table, columns[1]);
}

fn render_scorers(frame: &mut Frame, area: Rect, app: &App) {
    let Some(year) = app.selected_player_year() else {
        render_empty(frame, area, "No scorer data");
        return;
    };
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(columns[0]);

    let range = app.goals_range();
    let chart = app.snapshot.scorers_chart(year, range.clone());
    frame.render_widget(bar_chart(&chart, Color::Green), left[0]);
    let by_team = app.snapshot.scorers_by_team_chart(year, range.clone());
    frame.render_widget(bar_chart(&by_team, Color::Magenta), left[1]);

    let rows = app.snapshot.player_view(year, range);
    let page = paginate(&rows, app.page, PLAYER_PAGE_SIZE);
    let mut lines = vec![format!("{:<22} {:<16} {:>4}", "Jugador", "Equipo", "G")];
    for row in page.items {
        lines.push(format!(
            "{:<22} {:<16} {:>4}",
            truncate(&row.player, 22),
            truncate(&row.team, 16),
            format_goals(row.goals)
        ));
    }
    let table = Paragraph::new(lines.join("\n")).block(
        Block::default()
            .title(format!(
                "Goleadores ({}/{}, {} filas)",
                page.page + 1,
                page.pages,
                page.total
            ))
            .borders(Borders::ALL),
    );
    frame.render_widget(table, columns[1]);
}

fn bar_chart(spec: &ChartSpec, color: Color) -> BarChart<'static> {
    let bars: Vec<Bar<'static>> = spec
        .bars
        .iter()
        .map(|(label, value)| {
            Bar::default()
                .label(Line::from(truncate(label, 10)))
                .value(u64::try_from(*value).unwrap_or(0))
                .style(Style::default().fg(color))
                .value_style(
                    Style::default()
                        .fg(Color::Black)
                        .bg(color)
                        .add_modifier(Modifier::BOLD),
                )
        })
        .collect();
    BarChart::default()
        .block(
            Block::default()
                .title(spec.title.clone())
                .borders(Borders::ALL),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(10)
        .bar_gap(1)
}

fn render_empty(frame: &mut Frame, area: Rect, text: &str) {
    let empty = Paragraph::new(text.to_string()).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(empty, area);
}

fn format_goals(goals: Option<i64>) -> String {
    goals.map(|g| g.to_string()).unwrap_or_else(|| "-".to_string())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    text.chars().take(max.saturating_sub(1)).chain(['…']).collect()
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Estadísticas FIFA Mundial - Ayuda",
        "",
        "Global:",
        "  Tab          Equipos / Goleadores",
        "  ←/→ h/l      Mundial anterior / siguiente",
        "  j/k ↑/↓      Página",
        "  ?            Ayuda",
        "  q            Salir",
        "",
        "Equipos:",
        "  t            Top 10 / Todos",
        "",
        "Goleadores:",
        "  [ ]          Goles mínimos",
        "  - =          Goles máximos",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Ayuda").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
