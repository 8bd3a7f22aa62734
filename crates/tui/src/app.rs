use std::{io, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame, Terminal,
};
use releaseboard_core::{
    select, AppConfig, FeedEvent, FeedLoader, FreshnessRule, GameRelease, ReleaseFeed,
    ReloadReason, ReloadRequester, WeekRange,
};
use tokio::{spawn, sync::mpsc};
use tracing::{debug, error, info};

use crate::{
    board::{Board, TileKey},
    bubble::{Point, WantBubble, BUBBLE_LABEL},
    launch,
};

const TICK_RATE: Duration = Duration::from_millis(50);
const TILE_HEIGHT: u16 = 4;
const BUBBLE_HEIGHT: u16 = 3;
const BUBBLE_WIDTH: u16 = BUBBLE_LABEL.len() as u16 + 4;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    on_accent: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            on_accent: Color::Black,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Target {
    Trailer,
    StorePage,
}

impl Target {
    fn label(self) -> &'static str {
        match self {
            Target::Trailer => "trailer",
            Target::StorePage => "store page",
        }
    }
}

enum AppEvent {
    Input(Event),
    Tick,
    Launched {
        target: Target,
        url: String,
        result: Result<()>,
    },
}

/// Terminal rendition of the release board.
pub struct ReleaseBoardApp {
    config: AppConfig,
    loader: FeedLoader,
    reload: ReloadRequester,
    board: Board,
    bubble: WantBubble,
    bubble_tile: Option<TileKey>,
    theme: Theme,
    today: NaiveDate,
    status: String,
    loaded: bool,
    should_quit: bool,
    tile_areas: Vec<(TileKey, Rect)>,
    bubble_area: Option<Rect>,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    feed_rx: Option<mpsc::Receiver<FeedEvent>>,
}

impl ReleaseBoardApp {
    pub fn new(config: AppConfig, loader: FeedLoader, reload: ReloadRequester) -> Self {
        let board = Board::new(&config.platforms);
        let bubble = WantBubble::new(config.bubble_step);
        let today = config.today();
        Self {
            config,
            loader,
            reload,
            board,
            bubble,
            bubble_tile: None,
            theme: Theme::default(),
            today,
            status: "Fetching releases…".to_string(),
            loaded: false,
            should_quit: false,
            tile_areas: Vec::new(),
            bubble_area: None,
            event_tx: None,
            feed_rx: None,
        }
    }

    pub fn attach_feed(&mut self, receiver: mpsc::Receiver<FeedEvent>) {
        self.feed_rx = Some(receiver);
    }

    pub async fn run(&mut self) -> Result<()> {
        info!(source = %self.loader.source(), today = %self.today, "Starting release board");

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
            .context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        let mut feed_rx = self.feed_rx.take();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }

            if let Some(rx) = feed_rx.as_mut() {
                let mut feed_closed = false;
                tokio::select! {
                    maybe_event = event_rx.recv() => {
                        if !self.process_app_event(maybe_event) {
                            break;
                        }
                    }
                    maybe_feed = rx.recv() => {
                        match maybe_feed {
                            Some(event) => self.handle_feed_event(event),
                            None => feed_closed = true,
                        }
                    }
                }
                if feed_closed {
                    feed_rx = None;
                }
            } else {
                let maybe_event = event_rx.recv().await;
                if !self.process_app_event(maybe_event) {
                    break;
                }
            }

            if self.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                self.handle_input(event);
                true
            }
            Some(AppEvent::Tick) => {
                self.handle_tick();
                true
            }
            Some(AppEvent::Launched {
                target,
                url,
                result,
            }) => {
                match result {
                    Ok(()) => {
                        info!(%url, target = target.label(), "Opened in browser");
                        self.status = format!("Opened {}: {url}", target.label());
                    }
                    Err(err) => {
                        error!(?err, %url, "Failed to open {}", target.label());
                        self.status = format!("Failed to open {}: {err}", target.label());
                    }
                }
                true
            }
            None => false,
        }
    }

    fn handle_tick(&mut self) {
        self.bubble.step();

        if self.config.today.is_none() {
            let today = Local::now().date_naive();
            if today != self.today {
                self.today = today;
                if let Some(feed) = self.loader.latest() {
                    info!(%today, "Day changed; re-selecting releases");
                    self.apply_feed(&feed);
                }
            }
        }
    }

    fn handle_feed_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Loaded(feed) => self.apply_feed(&feed),
            FeedEvent::Error(err) => {
                error!(%err, "Release feed load failed");
                self.status = format!("Error fetching or processing data: {err}");
            }
        }
    }

    fn apply_feed(&mut self, feed: &ReleaseFeed) {
        let selection = select(&feed.releases, self.today);
        for platform in selection.fallbacks() {
            info!(platform, "No current releases; showing the most recent scrape");
        }
        for platform in self.board.apply_selection(&selection) {
            debug!(%platform, "Container not found for platform");
        }
        debug!(
            platforms = selection.len(),
            releases = selection.release_count(),
            "Grouped releases"
        );

        self.bubble.hide();
        self.bubble_tile = None;
        self.loaded = true;

        let mut status = format!(
            "Showing {} releases across {} platforms",
            self.board.release_count(),
            self.board.columns().len()
        );
        if feed.skipped > 0 {
            status.push_str(&format!(" • {} entries skipped", feed.skipped));
        }
        self.status = status;
    }

    fn handle_input(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Resize(_, _) => {
                if self.bubble.is_visible() {
                    if let Some(playing) = self.board.first_playing() {
                        self.bubble_tile = Some(playing);
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                if self.reload.request(ReloadReason::Manual) {
                    self.status = "Reloading releases…".to_string();
                } else {
                    self.status = "Reload already pending".to_string();
                }
            }
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => self.bubble.hide(),
            KeyCode::Char('h') | KeyCode::Left => self.board.move_column(-1),
            KeyCode::Char('l') | KeyCode::Right => self.board.move_column(1),
            KeyCode::Char('k') | KeyCode::Up => self.board.move_tile(-1),
            KeyCode::Char('j') | KeyCode::Down => self.board.move_tile(1),
            KeyCode::Char('g') | KeyCode::Home => self.board.move_tile_to(0),
            KeyCode::Char('G') | KeyCode::End => self.board.move_tile_to(usize::MAX),
            KeyCode::Enter => {
                if let Some(key) = self.board.cursor() {
                    self.activate_tile(key);
                }
            }
            KeyCode::Char(' ') => {
                if let Some(key) = self.board.cursor() {
                    self.show_bubble(key);
                }
            }
            KeyCode::Char('o') => {
                if let Some(key) = self.board.cursor() {
                    self.open_store_page(key);
                }
            }
            KeyCode::Char('w') => {
                if self.bubble.is_visible() {
                    let link = self.bubble.link().to_string();
                    self.open(Target::StorePage, link);
                }
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let (column, row) = (mouse.column, mouse.row);

        if self.bubble.is_visible()
            && self
                .bubble_area
                .map(|area| contains(area, column, row))
                .unwrap_or(false)
        {
            let link = self.bubble.link().to_string();
            self.open(Target::StorePage, link);
            return;
        }

        let hit = self
            .tile_areas
            .iter()
            .find(|(_, area)| contains(*area, column, row))
            .copied();
        match hit {
            Some((key, area)) => {
                self.board.select_tile(key);
                if row == area.y + 1 {
                    self.bubble.hide();
                    self.open_store_page(key);
                } else {
                    self.activate_tile(key);
                }
            }
            None => self.bubble.hide(),
        }
    }

    /// Play the tile's trailer and point the want bubble at it.
    fn activate_tile(&mut self, key: TileKey) {
        self.play_trailer(key);
        self.show_bubble(key);
    }

    fn play_trailer(&mut self, key: TileKey) {
        if self.board.is_playing(key) {
            debug!(?key, "Video already playing, doing nothing");
            self.status = "Video already playing".to_string();
            return;
        }
        let Some(release) = self.board.release(key) else {
            return;
        };
        let Some(embed) = release.embed_url() else {
            error!(title = %release.title, "No trailer URL found");
            self.status = format!("No trailer URL found for {}", release.title);
            return;
        };
        debug!(trailer = %release.trailer, %embed, "Playing trailer");
        self.board.mark_playing(key);
        self.status = "Loading video…".to_string();
        self.open(Target::Trailer, embed);
    }

    fn show_bubble(&mut self, key: TileKey) {
        let Some(release) = self.board.release(key) else {
            return;
        };
        if release.link.trim().is_empty() {
            self.status = format!("No store link for {}", release.title);
            return;
        }
        let link = release.link.clone();
        let anchor = self
            .tile_area(key)
            .map(bubble_anchor)
            .unwrap_or_else(|| self.bubble.position());
        self.bubble.show(anchor, link);
        self.bubble_tile = Some(key);
    }

    fn open_store_page(&mut self, key: TileKey) {
        let Some(release) = self.board.release(key) else {
            return;
        };
        if release.link.trim().is_empty() {
            self.status = format!("No store link for {}", release.title);
            return;
        }
        let link = release.link.clone();
        self.open(Target::StorePage, link);
    }

    fn open(&self, target: Target, url: String) {
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        spawn(async move {
            let result = launch::open_url(&url).await;
            let _ = tx
                .send(AppEvent::Launched {
                    target,
                    url,
                    result,
                })
                .await;
        });
    }

    fn tile_area(&self, key: TileKey) -> Option<Rect> {
        self.tile_areas
            .iter()
            .find(|(candidate, _)| *candidate == key)
            .map(|(_, area)| *area)
    }

    fn draw(&mut self, frame: &mut Frame) {
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(TILE_HEIGHT + 2),
                Constraint::Length(4),
            ])
            .split(size);

        self.render_header(frame, chunks[0]);
        self.render_board(frame, chunks[1]);
        self.render_status(frame, chunks[2]);
        self.render_bubble(frame, size);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let week = WeekRange::starting(self.today);
        let line = Line::from(vec![
            Span::styled(
                week.label(),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  ·  {}", self.loader.source()),
                Style::default().fg(self.theme.muted),
            ),
        ]);
        let paragraph = Paragraph::new(line)
            .block(Block::default().borders(Borders::ALL).title("Upcoming Releases"))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }

    fn render_board(&mut self, frame: &mut Frame, area: Rect) {
        self.tile_areas.clear();
        let count = self.board.columns().len();
        if count == 0 {
            let paragraph = Paragraph::new("No platforms configured")
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(paragraph, area);
            return;
        }

        let constraints: Vec<Constraint> = (0..count)
            .map(|_| Constraint::Ratio(1, count as u32))
            .collect();
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(area);

        for (idx, column_area) in columns.iter().enumerate() {
            self.render_column(frame, *column_area, idx);
        }
    }

    fn render_column(&mut self, frame: &mut Frame, area: Rect, idx: usize) {
        let focused = self.board.column_cursor() == idx;
        let border_style = if focused {
            Style::default().fg(self.theme.accent)
        } else {
            Style::default()
        };

        let inner_height = area.height.saturating_sub(2);
        let visible = (inner_height / TILE_HEIGHT).max(1) as usize;
        self.board.ensure_visible(idx, visible);

        let Some(column) = self.board.columns().get(idx) else {
            return;
        };
        let mut title = format!(" {} ({}) ", column.platform.to_uppercase(), column.releases.len());
        if column.fell_back && column.rule == Some(FreshnessRule::LatestScrape) {
            title.push_str("· latest ");
        }
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(title);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if column.releases.is_empty() {
            let message = if self.loaded {
                "No releases"
            } else {
                "Waiting for data…"
            };
            let paragraph = Paragraph::new(Span::styled(message, Style::default().fg(self.theme.muted)))
                .alignment(Alignment::Center);
            frame.render_widget(paragraph, inner);
            return;
        }

        let cursor = self.board.cursor();
        let mut placed = Vec::new();
        for (row, (tile, release)) in column
            .releases
            .iter()
            .enumerate()
            .skip(column.offset())
            .take(visible)
            .enumerate()
        {
            let y = inner.y + row as u16 * TILE_HEIGHT;
            let height = TILE_HEIGHT.min(inner.bottom().saturating_sub(y));
            if height == 0 {
                break;
            }
            let rect = Rect::new(inner.x, y, inner.width, height);
            let key = TileKey { column: idx, tile };
            render_tile(
                &self.theme,
                frame,
                rect,
                release,
                cursor == Some(key),
                self.board.is_playing(key),
            );
            placed.push((key, rect));
        }
        self.tile_areas.extend(placed);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let help = "←/→ platform  ↑/↓ tile  Enter play  Space want  o open  w want link  Ctrl-R reload  q quit";
        let paragraph = Paragraph::new(vec![
            Line::from(self.status.clone()),
            Line::from(Span::styled(help, Style::default().fg(self.theme.muted))),
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_bubble(&mut self, frame: &mut Frame, bounds: Rect) {
        self.bubble_area = None;
        if !self.bubble.is_visible() {
            return;
        }
        if let Some(area) = self.bubble_tile.and_then(|key| self.tile_area(key)) {
            self.bubble.retarget(bubble_anchor(area));
        }

        let position = self.bubble.position();
        let width = BUBBLE_WIDTH.min(bounds.width);
        let height = BUBBLE_HEIGHT.min(bounds.height);
        let max_x = bounds.right().saturating_sub(width);
        let max_y = bounds.bottom().saturating_sub(height);
        let x = (position.x - f32::from(width) / 2.0)
            .round()
            .clamp(f32::from(bounds.x), f32::from(max_x)) as u16;
        let y = position
            .y
            .round()
            .clamp(f32::from(bounds.y), f32::from(max_y)) as u16;
        let area = Rect::new(x, y, width, height);

        let paragraph = Paragraph::new(Span::styled(
            BUBBLE_LABEL,
            Style::default()
                .fg(self.theme.on_accent)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        ))
        .alignment(Alignment::Center)
        .style(Style::default().bg(self.theme.accent))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(Clear, area);
        frame.render_widget(paragraph, area);
        self.bubble_area = Some(area);
    }
}

fn render_tile(
    theme: &Theme,
    frame: &mut Frame,
    area: Rect,
    release: &GameRelease,
    selected: bool,
    playing: bool,
) {
    let border_style = if playing {
        Style::default().fg(theme.success)
    } else if selected {
        Style::default().fg(theme.accent)
    } else {
        Style::default().fg(theme.muted)
    };
    let mut block = Block::default().borders(Borders::ALL).border_style(border_style);
    if selected {
        block = block.style(Style::default().bg(theme.selection_bg));
    }

    let trailer = if playing {
        Span::styled("  ▶ playing", Style::default().fg(theme.success))
    } else if release.has_trailer() {
        Span::styled("  ▷ trailer", Style::default().fg(theme.accent))
    } else {
        Span::styled("  no trailer", Style::default().fg(theme.warning))
    };
    let lines = vec![
        Line::from(Span::styled(
            release.title.clone(),
            Style::default()
                .fg(theme.primary_fg)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        )),
        Line::from(vec![
            Span::styled(release.updated_label(), Style::default().fg(theme.muted)),
            trailer,
        ]),
    ];
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Top-left of the bubble box when centred just above `tile`.
fn bubble_anchor(tile: Rect) -> Point {
    Point::new(
        f32::from(tile.x) + f32::from(tile.width) / 2.0,
        f32::from(tile.y) - f32::from(BUBBLE_HEIGHT),
    )
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x && column < area.right() && row >= area.y && row < area.bottom()
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}
