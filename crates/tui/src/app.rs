use std::{io, sync::Arc, thread, time::Duration};

use anyhow::{anyhow, Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use dtop_core::{
    console::{
        CompositorAction, ConsoleCompositor, ConsoleMode, ConsoleSettings, Focus, Operation,
        PaginatedSelection, Pane, PublishWizard, ResourceConsole, TaskReceiver, TaskSender, View,
        WizardStep, MENU_ENTRIES,
    },
    ResourceBackend,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::{
    keymap,
    running::{RunningPane, RunningReceiver},
};

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
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
            danger: Color::Red,
        }
    }
}

impl Theme {
    fn status_color(&self, status: &str) -> Color {
        if status.starts_with("Error") || status.starts_with("Cannot") {
            self.danger
        } else if status.starts_with("Successfully") || status.starts_with("Loaded") {
            self.success
        } else if status.contains("already in progress") || status.starts_with("No ") {
            self.warning
        } else {
            self.primary_fg
        }
    }
}

enum AppEvent {
    Input(Event),
    Tick,
}

const HELP_LINES: [(&str, &str); 12] = [
    ("Tab", "switch pane"),
    ("1 / 2", "focus Running / Manage"),
    ("↑ ↓ / j k", "move cursor"),
    ("PgUp PgDn", "previous / next page"),
    ("Enter", "open menu entry, confirm selection"),
    ("Space", "toggle selection"),
    ("d", "delete selected"),
    ("p", "publish (after confirming)"),
    ("r", "reload"),
    ("q / Esc", "back to menu"),
    ("?", "toggle this help"),
    ("Ctrl-C", "quit"),
];

/// Terminal frontend hosting the management console next to the running pane.
pub struct DtopApp {
    compositor: ConsoleCompositor<ResourceConsole, RunningPane>,
    task_rx: Option<TaskReceiver>,
    running_rx: Option<RunningReceiver>,
    tick_rate: Duration,
    theme: Theme,
    should_quit: bool,
}

impl DtopApp {
    pub fn new(
        backend: Arc<dyn ResourceBackend>,
        settings: ConsoleSettings,
        results: TaskSender,
        tick_rate: Duration,
    ) -> Self {
        let (running_tx, running_rx) = mpsc::unbounded_channel();
        let running = RunningPane::new(Arc::clone(&backend), settings.page_size, running_tx);
        let console = ResourceConsole::new(backend, settings, results);
        Self {
            compositor: ConsoleCompositor::new(console, running),
            task_rx: None,
            running_rx: Some(running_rx),
            tick_rate,
            theme: Theme::default(),
            should_quit: false,
        }
    }

    pub fn attach_tasks(&mut self, receiver: TaskReceiver) {
        self.task_rx = Some(receiver);
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut task_rx = self
            .task_rx
            .take()
            .ok_or_else(|| anyhow!("task receiver not attached"))?;
        let mut running_rx = self
            .running_rx
            .take()
            .ok_or_else(|| anyhow!("running receiver already consumed"))?;

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx, self.tick_rate);
        self.compositor.running_mut().refresh();

        let result = self
            .event_loop(&mut terminal, &mut event_rx, &mut task_rx, &mut running_rx)
            .await;
        restore_terminal(&mut terminal)?;
        info!("dtop exited");
        result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        event_rx: &mut mpsc::Receiver<AppEvent>,
        task_rx: &mut TaskReceiver,
        running_rx: &mut RunningReceiver,
    ) -> Result<()> {
        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                return Ok(());
            }

            tokio::select! {
                maybe_event = event_rx.recv() => {
                    match maybe_event {
                        Some(event) => self.process_app_event(event),
                        None => return Ok(()),
                    }
                }
                Some(result) = task_rx.recv() => {
                    let console = self.compositor.management_mut();
                    console.apply_result(result);
                    console.process_pending(task_rx);
                }
                Some(snapshot) = running_rx.recv() => {
                    self.compositor.running_mut().apply(snapshot);
                }
            }
        }
    }

    fn process_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Input(Event::Key(key_event)) => {
                let Some(key) = keymap::translate(&key_event) else {
                    return;
                };
                match self.compositor.handle_key(key) {
                    CompositorAction::Quit => {
                        info!("quit requested");
                        self.should_quit = true;
                    }
                    CompositorAction::Handled => {}
                    CompositorAction::Ignored => debug!(?key, "key ignored"),
                }
            }
            AppEvent::Input(_) | AppEvent::Tick => {}
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(6), Constraint::Length(4)])
            .split(area);
        let panes = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[0]);

        self.render_running(frame, panes[0]);
        self.render_management(frame, panes[1]);
        self.render_status(frame, chunks[1]);
        if self.compositor.help_visible() {
            self.render_help(frame, area);
        }
    }

    fn pane_block(&self, title: String, focus: Focus) -> Block<'static> {
        let active = self.compositor.focus() == focus;
        let (title, border) = if active {
            (
                format!("{title} [ACTIVE]"),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            (title, Style::default().fg(self.theme.muted))
        };
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(title)
    }

    fn render_running(&self, frame: &mut Frame, area: Rect) {
        let pane = self.compositor.running();
        let title = format!("{} · {}", pane.title(), pane.note());
        let block = self.pane_block(title, Focus::Running);
        self.render_selection(frame, area, block, pane.selection(), false);
    }

    fn render_management(&self, frame: &mut Frame, area: Rect) {
        let console = self.compositor.management();
        match console.mode() {
            ConsoleMode::Menu { selected_entry } => {
                let block = self.pane_block(console.title().to_string(), Focus::Management);
                self.render_menu(frame, area, block, *selected_entry);
            }
            ConsoleMode::ResourceList { kind, selection } => {
                let view = View::List(*kind);
                let mut title = format!("Delete {}", kind.title());
                if console.is_busy(view, Operation::Load) {
                    title.push_str(" · loading…");
                }
                if console.is_busy(view, Operation::Delete) {
                    title.push_str(" · deleting…");
                }
                let block = self.pane_block(title, Focus::Management);
                self.render_selection(frame, area, block, selection, true);
            }
            ConsoleMode::PublishWizard(wizard) => {
                let mut title = "Publisher".to_string();
                if console.is_busy(View::Publisher, Operation::Load) {
                    title.push_str(" · loading…");
                }
                let block = self.pane_block(title, Focus::Management);
                self.render_wizard(frame, area, block, wizard);
            }
        }
    }

    fn render_menu(&self, frame: &mut Frame, area: Rect, block: Block<'static>, cursor: usize) {
        let mut lines: Vec<Line> = MENU_ENTRIES
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                if idx == cursor {
                    Line::from(Span::styled(
                        format!("▶ {}", entry.label()),
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    ))
                } else {
                    Line::from(Span::styled(
                        format!("  {}", entry.label()),
                        Style::default().fg(self.theme.primary_fg),
                    ))
                }
            })
            .collect();
        if let Some(entry) = MENU_ENTRIES.get(cursor) {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                entry.description(),
                Style::default().fg(self.theme.muted),
            )));
        }
        let menu = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
        frame.render_widget(menu, area);
    }

    fn render_wizard(
        &self,
        frame: &mut Frame,
        area: Rect,
        block: Block<'static>,
        wizard: &PublishWizard,
    ) {
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(inner);

        let step = match wizard.step {
            WizardStep::SelectImages => "select images, Enter to continue",
            WizardStep::Confirm => "press 'p' to publish, q to cancel",
            WizardStep::Running => "publishing…",
        };
        let header = vec![
            Line::from(vec![
                Span::styled("Destination: ", Style::default().fg(self.theme.muted)),
                Span::raw(wizard.settings.destination()),
                Span::styled("  Tag: ", Style::default().fg(self.theme.muted)),
                Span::raw(wizard.settings.tag.clone()),
            ]),
            Line::from(Span::styled(
                format!("Step: {step}"),
                Style::default().fg(self.theme.accent),
            )),
        ];
        frame.render_widget(Paragraph::new(header), chunks[0]);

        let list_block = Block::default().borders(Borders::TOP).title("Images");
        self.render_selection(frame, chunks[1], list_block, &wizard.selection, true);
    }

    fn render_selection(
        &self,
        frame: &mut Frame,
        area: Rect,
        block: Block<'static>,
        selection: &PaginatedSelection,
        checkboxes: bool,
    ) {
        let inner = block.inner(area);
        frame.render_widget(block, area);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(inner);

        let items: Vec<ListItem> = selection
            .page_items()
            .iter()
            .map(|record| {
                let title = if checkboxes {
                    record.checkbox_label()
                } else {
                    record.title.clone()
                };
                let title_style = if record.selected {
                    Style::default()
                        .fg(self.theme.accent)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.primary_fg)
                };
                ListItem::new(vec![
                    Line::from(Span::styled(title, title_style)),
                    Line::from(Span::styled(
                        format!("    {}", record.description),
                        Style::default().fg(self.theme.muted),
                    )),
                ])
            })
            .collect();

        if items.is_empty() {
            let empty = Paragraph::new("Nothing to show")
                .style(Style::default().fg(self.theme.muted))
                .alignment(Alignment::Center);
            frame.render_widget(empty, chunks[0]);
        } else {
            let mut list_state = ListState::default();
            list_state.select(Some(selection.cursor()));
            let list = List::new(items)
                .highlight_style(Style::default().bg(self.theme.selection_bg))
                .highlight_symbol("▶ ");
            frame.render_stateful_widget(list, chunks[0], &mut list_state);
        }

        let footer = format!(
            "Page {}/{} · {} items · {} selected",
            selection.current_page() + 1,
            selection.total_pages().max(1),
            selection.total_count(),
            selection.selected_count()
        );
        frame.render_widget(
            Paragraph::new(footer).style(Style::default().fg(self.theme.muted)),
            chunks[1],
        );
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let status = self.compositor.management().status();
        let block = Block::default().borders(Borders::ALL).title("Status");
        let lines = vec![
            Line::from(Span::styled(
                status.to_string(),
                Style::default().fg(self.theme.status_color(status)),
            )),
            Line::from(Span::styled(
                "Tab/1/2: switch pane  ?: help  q: quit",
                Style::default().fg(self.theme.muted),
            )),
        ];
        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_help(&self, frame: &mut Frame, area: Rect) {
        let lines: Vec<Line> = HELP_LINES
            .iter()
            .map(|(keys, action)| {
                Line::from(vec![
                    Span::styled(
                        format!("{keys:>12}  "),
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(*action),
                ])
            })
            .collect();
        let height = (lines.len() as u16).saturating_add(2);
        let popup = centered_rect(52, height, area);
        frame.render_widget(Clear, popup);
        let help = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.accent))
                .title("Keys (Esc to close)"),
        );
        frame.render_widget(help, popup);
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>, tick_rate: Duration) {
    thread::spawn(move || loop {
        match event::poll(tick_rate) {
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

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
