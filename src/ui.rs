use anyhow::Result;
use bi_analytics::{format_value, AnalyticsQueries, AnalyticsQuery, QueryResult};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

/// Rows skipped by PageUp / PageDown
const PAGE_STEP: usize = 20;

/// Widest a column may grow before cells are truncated
const MAX_COLUMN_WIDTH: usize = 24;

/// One tab: a query and what running it produced
pub struct QueryPage {
    pub query: AnalyticsQuery,
    pub result: std::result::Result<QueryResult, String>,
}

impl QueryPage {
    fn row_count(&self) -> usize {
        self.result.as_ref().map(|r| r.len()).unwrap_or(0)
    }
}

pub struct App {
    pub pages: Vec<QueryPage>,
    pub current_page: usize,
    pub state: TableState,
}

impl App {
    /// Run every query once; failures become error pages instead of aborting
    pub fn load(analytics: &AnalyticsQueries) -> Self {
        let pages = AnalyticsQuery::ALL
            .iter()
            .map(|&query| QueryPage {
                query,
                result: analytics.execute(query).map_err(|e| format!("{:#}", e)),
            })
            .collect();

        App::new(pages)
    }

    pub fn new(pages: Vec<QueryPage>) -> Self {
        let mut app = Self {
            pages,
            current_page: 0,
            state: TableState::default(),
        };
        app.reset_selection();
        app
    }

    pub fn page(&self) -> Option<&QueryPage> {
        self.pages.get(self.current_page)
    }

    fn row_count(&self) -> usize {
        self.page().map(|p| p.row_count()).unwrap_or(0)
    }

    fn reset_selection(&mut self) {
        if self.row_count() > 0 {
            self.state.select(Some(0));
        } else {
            self.state.select(None);
        }
    }

    pub fn next_page(&mut self) {
        if self.pages.is_empty() {
            return;
        }
        self.current_page = (self.current_page + 1) % self.pages.len();
        self.reset_selection();
    }

    pub fn previous_page(&mut self) {
        if self.pages.is_empty() {
            return;
        }
        self.current_page = if self.current_page == 0 {
            self.pages.len() - 1
        } else {
            self.current_page - 1
        };
        self.reset_selection();
    }

    pub fn next(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = self.state.selected().map_or(0, |i| (i + PAGE_STEP).min(len - 1));
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.row_count() == 0 {
            return;
        }
        let i = self.state.selected().map_or(0, |i| i.saturating_sub(PAGE_STEP));
        self.state.select(Some(i));
    }

    pub fn first(&mut self) {
        if self.row_count() > 0 {
            self.state.select(Some(0));
        }
    }

    pub fn last(&mut self) {
        let len = self.row_count();
        if len > 0 {
            self.state.select(Some(len - 1));
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(error = %err, "query browser exited with an error");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::Right | KeyCode::Char('l') => app.next_page(),
                KeyCode::Left | KeyCode::Char('h') => app.previous_page(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.first(),
                KeyCode::End => app.last(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Query tabs
            Constraint::Min(0),    // Result table
            Constraint::Length(4), // Purpose / insight
        ])
        .split(f.size());

    render_header(f, chunks[0], app);
    render_result(f, chunks[1], app);
    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, page) in app.pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if i == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(format!("{}. {}", i + 1, short_title(page.query)), style));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" SQL Analytics "),
    );

    f.render_widget(header, area);
}

fn short_title(query: AnalyticsQuery) -> &'static str {
    match query {
        AnalyticsQuery::RevenueDashboard => "Revenue",
        AnalyticsQuery::CustomerSegmentation => "Segments",
        AnalyticsQuery::UsageOptimization => "Usage",
        AnalyticsQuery::ChurnRisk => "Churn Risk",
        AnalyticsQuery::FinancialKpi => "KPIs",
    }
}

fn render_result(f: &mut Frame, area: Rect, app: &mut App) {
    let Some(page) = app.pages.get(app.current_page) else {
        return;
    };
    let title = format!(" {} ", page.query.title());

    let result = match &page.result {
        Ok(result) => result,
        Err(message) => {
            let error = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "  ⚠️  Query failed",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(format!("  {}", message)),
            ])
            .block(Block::default().borders(Borders::ALL).title(title));
            f.render_widget(error, area);
            return;
        }
    };

    if result.is_empty() {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "  ✅ Query executed successfully - no rows returned",
                Style::default().fg(Color::Green),
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(empty, area);
        return;
    }

    let cells: Vec<Vec<String>> = result
        .rows
        .iter()
        .map(|row| row.iter().map(|v| truncate(&format_value(v), MAX_COLUMN_WIDTH)).collect())
        .collect();

    let widths: Vec<Constraint> = result
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let widest = cells
                .iter()
                .map(|row| row[i].chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
                .min(MAX_COLUMN_WIDTH);
            Constraint::Length(widest as u16 + 1)
        })
        .collect();

    let header_cells = result.columns.iter().map(|h| {
        Cell::from(h.clone()).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = cells
        .into_iter()
        .map(|row| Row::new(row.into_iter().map(Cell::from)).height(1));

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(title),
        )
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let Some(page) = app.page() else {
        return;
    };

    let position = match app.state.selected() {
        Some(i) => format!("row {}/{}", i + 1, page.row_count()),
        None => "no rows".to_string(),
    };

    let status = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("Purpose: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(page.query.purpose()),
            Span::raw("  |  "),
            Span::styled(position, Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::styled("Tab", Style::default().fg(Color::Yellow)),
            Span::raw(" switch query  "),
            Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
            Span::raw(" move  "),
            Span::styled("q", Style::default().fg(Color::Yellow)),
            Span::raw(" quit"),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(status, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::types::Value;

    fn page(query: AnalyticsQuery, rows: usize) -> QueryPage {
        QueryPage {
            query,
            result: Ok(QueryResult {
                columns: vec!["n".to_string()],
                rows: (0..rows).map(|i| vec![Value::Integer(i as i64)]).collect(),
            }),
        }
    }

    fn app() -> App {
        App::new(vec![
            page(AnalyticsQuery::RevenueDashboard, 3),
            page(AnalyticsQuery::CustomerSegmentation, 0),
            QueryPage {
                query: AnalyticsQuery::FinancialKpi,
                result: Err("boom".to_string()),
            },
        ])
    }

    #[test]
    fn test_page_navigation_wraps() {
        let mut app = app();
        assert_eq!(app.current_page, 0);
        app.previous_page();
        assert_eq!(app.current_page, 2);
        app.next_page();
        assert_eq!(app.current_page, 0);
    }

    #[test]
    fn test_selection_resets_per_page() {
        let mut app = app();
        assert_eq!(app.state.selected(), Some(0));

        app.next_page();
        assert_eq!(app.state.selected(), None);
        app.next(); // no rows: stays unselected
        assert_eq!(app.state.selected(), None);

        app.next_page();
        assert_eq!(app.state.selected(), None);
    }

    #[test]
    fn test_row_cursor_wraps_and_clamps() {
        let mut app = app();
        app.previous();
        assert_eq!(app.state.selected(), Some(2));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
        app.page_down();
        assert_eq!(app.state.selected(), Some(2));
        app.page_up();
        assert_eq!(app.state.selected(), Some(0));
        app.last();
        assert_eq!(app.state.selected(), Some(2));
    }

    #[test]
    fn test_load_runs_every_query() {
        let analytics = AnalyticsQueries::new().unwrap();
        let app = App::load(&analytics);
        assert_eq!(app.pages.len(), 5);
        assert!(app.pages.iter().all(|p| p.result.is_ok()));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer cell", 10), "a much ...");
    }
}
