use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{info, warn};

use bankdash_api::{ApiError, BankClient, UnauthorizedGuard};
use bankdash_core::activity::{
    recent_activity_n, EMPTY_RECENT_HINT, EMPTY_RECENT_TITLE, EMPTY_TABLE_HINT, EMPTY_TABLE_TITLE,
    LOAD_FAILED,
};
use bankdash_core::format::description_or_placeholder;
use bankdash_core::{
    counterparty, format_balance, format_relative_date, format_signed_amount, format_timestamp,
    summary, type_label, AccountEvent, AmountAction, AmountForm, Dashboard, EventPublisher,
    MessageKind, SessionHandle, SortField, TableView, Tone, Transaction, TransferField,
    TransferForm,
};

use crate::auth;
use crate::config::Config;
use crate::worker::{self, ApiEvent, ApiRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Home,
    History,
}

/// An open form. `pending` holds the id of the submission it is waiting on;
/// replies carrying any other id are not shown on it.
enum Modal {
    Transfer {
        form: TransferForm,
        focus: TransferField,
        pending: Option<u64>,
    },
    Amount {
        form: AmountForm,
        pending: Option<u64>,
    },
}

impl Modal {
    fn is_submitting(&self) -> bool {
        match self {
            Modal::Transfer { form, .. } => form.is_submitting(),
            Modal::Amount { form, .. } => form.is_submitting(),
        }
    }
}

/// Loaded data for one panel.
#[derive(Debug, Clone)]
enum Load<T> {
    Loading,
    Ready(T),
    Failed(String),
}

struct App {
    dashboard: Dashboard,
    publisher: EventPublisher,
    fetched_for: Option<u64>,
    username: String,
    balance: Load<f64>,
    recent: Load<Vec<Transaction>>,
    history: Load<Vec<Transaction>>,
    view: TableView,
    scroll: usize,
    screen: Screen,
    modal: Option<Modal>,
    recent_limit: usize,
    close_delay: Duration,
    expired: bool,
    next_request_id: u64,
}

impl App {
    fn new(cfg: &Config, session: &SessionHandle) -> Self {
        let dashboard = Dashboard::new();
        let publisher = dashboard.publisher();
        let username = session
            .user()
            .map(|u| u.username)
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            dashboard,
            publisher,
            fetched_for: None,
            username,
            balance: Load::Loading,
            recent: Load::Loading,
            history: Load::Loading,
            view: TableView::default(),
            scroll: 0,
            screen: Screen::Home,
            modal: None,
            recent_limit: cfg.dashboard.recent_limit,
            close_delay: cfg.success_close_delay(),
            expired: false,
            next_request_id: 0,
        }
    }

    /// Apply one worker result. Successful mutations are announced on the
    /// event channel; the refresh counter picks them up on the next tick.
    fn apply(&mut self, ev: ApiEvent, now: Instant) {
        match ev {
            ApiEvent::Balance(r) => {
                self.balance = match r {
                    Ok(b) => Load::Ready(b),
                    Err(e) => self.failed(e, "Failed to load balance"),
                }
            }
            ApiEvent::Activity(r) => {
                self.recent = match r {
                    Ok(all) => Load::Ready(recent_activity_n(&all, self.recent_limit)),
                    Err(e) => self.failed(e, LOAD_FAILED),
                }
            }
            ApiEvent::History(r) => {
                self.history = match r {
                    Ok(all) => Load::Ready(all),
                    Err(e) => self.failed(e, LOAD_FAILED),
                }
            }
            ApiEvent::TransferDone { request_id, result } => {
                if result.is_ok() {
                    self.publisher.publish(AccountEvent::TransferCompleted);
                }
                if let Some(Modal::Transfer { form, pending, .. }) = self.modal.as_mut() {
                    if *pending == Some(request_id) {
                        *pending = None;
                        match &result {
                            Ok(()) => form.finish_ok(now),
                            Err(e) => form.finish_err(e.server_message()),
                        }
                    }
                }
                if let Err(e) = result {
                    self.note_unauthorized(&e);
                }
            }
            ApiEvent::AmountDone {
                request_id,
                action,
                result,
            } => {
                if result.is_ok() {
                    self.publisher.publish(match action {
                        AmountAction::Deposit => AccountEvent::DepositCompleted,
                        AmountAction::Withdrawal => AccountEvent::WithdrawalCompleted,
                    });
                }
                if let Some(Modal::Amount { form, pending }) = self.modal.as_mut() {
                    if *pending == Some(request_id) {
                        *pending = None;
                        match &result {
                            Ok(()) => form.finish_ok(now),
                            Err(e) => form.finish_err(e.server_message()),
                        }
                    }
                }
                if let Err(e) = result {
                    self.note_unauthorized(&e);
                }
            }
        }
    }

    fn failed<T>(&mut self, e: ApiError, fallback: &str) -> Load<T> {
        self.note_unauthorized(&e);
        Load::Failed(e.user_message(fallback))
    }

    fn note_unauthorized(&mut self, e: &ApiError) {
        if e.is_unauthorized() {
            self.expired = true;
        }
    }

    /// Requests due this tick: a refetch whenever the refresh counter moved.
    fn pending_refresh(&mut self) -> Option<ApiRequest> {
        self.dashboard.drain_events();
        let count = self.dashboard.refresh_count();
        if self.fetched_for == Some(count) {
            return None;
        }
        self.fetched_for = Some(count);
        self.balance = Load::Loading;
        self.recent = Load::Loading;
        Some(ApiRequest::Refresh)
    }

    fn close_finished_modal(&mut self, now: Instant) {
        let done = match &self.modal {
            Some(Modal::Transfer { form, .. }) => form.should_close(now),
            Some(Modal::Amount { form, .. }) => form.should_close(now),
            None => false,
        };
        if done {
            self.modal = None;
        }
    }

    fn open_transfer(&mut self) {
        self.modal = Some(Modal::Transfer {
            form: TransferForm::new().with_close_delay(self.close_delay),
            focus: TransferField::Recipient,
            pending: None,
        });
    }

    fn open_amount(&mut self, action: AmountAction) {
        self.modal = Some(Modal::Amount {
            form: AmountForm::new(action).with_close_delay(self.close_delay),
            pending: None,
        });
    }
}

enum Flow {
    Continue,
    Quit,
}

pub async fn run_dashboard(cfg: Config, session: SessionHandle) -> Result<()> {
    let client = Arc::new(BankClient::new(cfg.api.base_url.clone(), session.clone()));
    // The TUI reports expiry itself once the terminal is restored.
    let guard = Arc::new(UnauthorizedGuard::new(session.clone(), || {
        if let Err(e) = auth::clear_session() {
            warn!(error = %e, "could not remove session file");
        }
    }));

    let (req_tx, req_rx) = mpsc::unbounded_channel::<ApiRequest>();
    let (ev_tx, ev_rx) = std::sync::mpsc::channel::<ApiEvent>();
    let worker = tokio::spawn(worker::run_worker(req_rx, ev_tx, client, guard));

    let app = App::new(&cfg, &session);
    let expired = tokio::task::spawn_blocking(move || run_terminal(app, req_tx, ev_rx))
        .await
        .context("dashboard thread panicked")??;
    worker.abort();

    if expired {
        println!("{}", auth::SESSION_EXPIRED);
    }
    Ok(())
}

fn run_terminal(
    app: App,
    req_tx: mpsc::UnboundedSender<ApiRequest>,
    ev_rx: Receiver<ApiEvent>,
) -> Result<bool> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = ui_loop(&mut terminal, app, &req_tx, &ev_rx);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn ui_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut app: App,
    req_tx: &mpsc::UnboundedSender<ApiRequest>,
    ev_rx: &Receiver<ApiEvent>,
) -> Result<bool> {
    info!("dashboard started");
    app.dashboard.request_refresh();

    loop {
        let now = Instant::now();
        while let Ok(ev) = ev_rx.try_recv() {
            app.apply(ev, now);
        }
        if app.expired {
            info!("dashboard closing: session expired");
            return Ok(true);
        }
        if let Some(req) = app.pending_refresh() {
            send(req_tx, req)?;
        }
        app.close_finished_modal(now);

        terminal.draw(|f| draw(f, &app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Flow::Quit = handle_key(&mut app, key, req_tx)? {
                    return Ok(false);
                }
            }
        }
    }
}

fn send(req_tx: &mpsc::UnboundedSender<ApiRequest>, req: ApiRequest) -> Result<()> {
    req_tx.send(req).context("api worker stopped")
}

fn handle_key(
    app: &mut App,
    key: KeyEvent,
    req_tx: &mpsc::UnboundedSender<ApiRequest>,
) -> Result<Flow> {
    if let Some(modal) = app.modal.as_mut() {
        if key.code == KeyCode::Esc {
            // A form stays up until its outstanding submission has answered.
            if !modal.is_submitting() {
                app.modal = None;
            }
        } else if let Some(req) = modal_key(modal, key.code, app.next_request_id) {
            app.next_request_id += 1;
            send(req_tx, req)?;
        }
        return Ok(Flow::Continue);
    }

    match (app.screen, key.code) {
        (_, KeyCode::Char('q')) => return Ok(Flow::Quit),
        (Screen::Home, KeyCode::Char('t')) => app.open_transfer(),
        (Screen::Home, KeyCode::Char('d')) => app.open_amount(AmountAction::Deposit),
        (Screen::Home, KeyCode::Char('w')) => app.open_amount(AmountAction::Withdrawal),
        (Screen::Home, KeyCode::Char('r')) => app.dashboard.request_refresh(),
        (Screen::Home, KeyCode::Char('h')) => {
            app.screen = Screen::History;
            app.history = Load::Loading;
            app.scroll = 0;
            send(req_tx, ApiRequest::History)?;
        }
        (Screen::History, KeyCode::Esc | KeyCode::Char('b')) => app.screen = Screen::Home,
        (Screen::History, KeyCode::Char('r')) => {
            app.history = Load::Loading;
            send(req_tx, ApiRequest::History)?;
        }
        (Screen::History, KeyCode::Char('1')) => app.view.toggle_sort(SortField::Date),
        (Screen::History, KeyCode::Char('2')) => app.view.toggle_sort(SortField::Type),
        (Screen::History, KeyCode::Char('3')) => app.view.toggle_sort(SortField::Amount),
        (Screen::History, KeyCode::Char('f')) => {
            let next = app.view.filter.cycled();
            app.view.set_filter(next);
            app.scroll = 0;
        }
        (Screen::History, KeyCode::Down | KeyCode::Char('j')) => app.scroll += 1,
        (Screen::History, KeyCode::Up | KeyCode::Char('k')) => {
            app.scroll = app.scroll.saturating_sub(1)
        }
        _ => {}
    }
    Ok(Flow::Continue)
}

/// Keys inside a form. Returns the request to send, tagged `request_id`, when
/// Enter passes validation and nothing is outstanding.
fn modal_key(modal: &mut Modal, code: KeyCode, request_id: u64) -> Option<ApiRequest> {
    match modal {
        Modal::Transfer {
            form,
            focus,
            pending,
        } => match code {
            KeyCode::Tab | KeyCode::Down => {
                *focus = focus.next();
                None
            }
            KeyCode::Enter => {
                let body = form.begin_submit().ok()?;
                *pending = Some(request_id);
                Some(ApiRequest::Transfer { request_id, body })
            }
            KeyCode::Backspace => {
                let mut v = form.field(*focus).to_string();
                v.pop();
                form.edit(*focus, v);
                None
            }
            KeyCode::Char(c) => {
                let v = format!("{}{}", form.field(*focus), c);
                form.edit(*focus, v);
                None
            }
            _ => None,
        },
        Modal::Amount { form, pending } => match code {
            KeyCode::Enter => {
                let req = form.begin_submit().ok()?;
                *pending = Some(request_id);
                Some(ApiRequest::Amount {
                    request_id,
                    action: form.action(),
                    amount: req.amount,
                })
            }
            KeyCode::Backspace => {
                let mut v = form.amount().to_string();
                v.pop();
                form.edit(v);
                None
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
                let v = format!("{}{}", form.amount(), c);
                form.edit(v);
                None
            }
            _ => None,
        },
    }
}

// --- drawing ---

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Sent => Color::Red,
        Tone::Received => Color::Green,
        Tone::Deposit => Color::Blue,
        Tone::Withdrawal => Color::Rgb(255, 165, 0),
        Tone::Neutral => Color::Gray,
    }
}

fn message_style(kind: MessageKind) -> Style {
    match kind {
        MessageKind::Error => Style::default().fg(Color::Red),
        MessageKind::Success => Style::default().fg(Color::Green),
    }
}

fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(f.area());

    draw_balance(f, app, chunks[0]);
    match app.screen {
        Screen::Home => draw_recent(f, app, chunks[1]),
        Screen::History => draw_history(f, app, chunks[1]),
    }

    let keys = match app.screen {
        Screen::Home => "d=deposit  t=send money  w=withdraw  h=transactions  r=refresh  q=quit",
        Screen::History => "1=date 2=type 3=amount  f=filter  r=reload  ↑/↓ scroll  b=back  q=quit",
    };
    let footer = Paragraph::new(Span::styled(keys, Style::default().fg(Color::Gray)))
        .block(Block::default().borders(Borders::ALL).title("quick actions"));
    f.render_widget(footer, chunks[2]);

    if let Some(modal) = &app.modal {
        draw_modal(f, modal);
    }
}

fn draw_balance(f: &mut Frame, app: &App, area: Rect) {
    let value = match &app.balance {
        Load::Loading => Span::styled("Loading…", Style::default().fg(Color::Gray)),
        Load::Ready(b) => Span::styled(
            format_balance(Some(*b)),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Load::Failed(msg) => Span::styled(msg.clone(), Style::default().fg(Color::Red)),
    };
    let card = Paragraph::new(Text::from(vec![
        Line::from(Span::styled("Current Balance", Style::default().fg(Color::Cyan))),
        Line::from(value),
        Line::from(Span::styled(
            format!("Account: {}", app.username),
            Style::default().fg(Color::Gray),
        )),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("bankdash"));
    f.render_widget(card, area);
}

fn draw_recent(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Recent Activity");
    let now = chrono::Local::now().naive_local();

    let lines: Vec<Line> = match &app.recent {
        Load::Loading => vec![Line::raw("Loading…")],
        Load::Failed(msg) => vec![
            Line::from(Span::styled(msg.clone(), Style::default().fg(Color::Red))),
            Line::raw("Press r to retry"),
        ],
        Load::Ready(txns) if txns.is_empty() => vec![
            Line::from(Span::styled(EMPTY_RECENT_TITLE, Style::default().add_modifier(Modifier::BOLD))),
            Line::from(Span::styled(EMPTY_RECENT_HINT, Style::default().fg(Color::Gray))),
        ],
        Load::Ready(txns) => txns
            .iter()
            .map(|tx| {
                let color = tone_color(Tone::of(&tx.transaction_type));
                Line::from(vec![
                    Span::styled(
                        format!("{} ", Tone::of(&tx.transaction_type).glyph()),
                        Style::default().fg(color),
                    ),
                    Span::raw(format!("{:<15} ", type_label(&tx.transaction_type))),
                    Span::raw(format!("{:<28} ", description_or_placeholder(tx))),
                    Span::styled(
                        format!("{:<12} ", format_relative_date(tx.transaction_date, now)),
                        Style::default().fg(Color::Gray),
                    ),
                    Span::styled(
                        format_signed_amount(tx.amount, &tx.transaction_type),
                        Style::default().fg(color),
                    ),
                ])
            })
            .collect(),
    };

    let widget = Paragraph::new(Text::from(lines)).block(block).wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}

fn draw_history(f: &mut Frame, app: &App, area: Rect) {
    let source = match &app.history {
        Load::Ready(all) => all,
        Load::Loading => {
            let p = Paragraph::new("Loading…").block(Block::default().borders(Borders::ALL).title("Transactions"));
            f.render_widget(p, area);
            return;
        }
        Load::Failed(msg) => {
            let p = Paragraph::new(Text::from(vec![
                Line::from(Span::styled(msg.clone(), Style::default().fg(Color::Red))),
                Line::raw("Press r to retry"),
            ]))
            .block(Block::default().borders(Borders::ALL).title("Transactions"));
            f.render_widget(p, area);
            return;
        }
    };

    let rows = app.view.rows(source);
    let title = format!("Transactions: {} · {}", app.view.filter.label(), summary(rows.len()));
    let block = Block::default().borders(Borders::ALL).title(title);

    if rows.is_empty() {
        let p = Paragraph::new(Text::from(vec![
            Line::from(Span::styled(EMPTY_TABLE_TITLE, Style::default().add_modifier(Modifier::BOLD))),
            Line::from(Span::styled(EMPTY_TABLE_HINT, Style::default().fg(Color::Gray))),
        ]))
        .block(block);
        f.render_widget(p, area);
        return;
    }

    let header = Row::new(vec![
        Cell::from(format!("Date {}", app.view.indicator(SortField::Date))),
        Cell::from(format!("Type {}", app.view.indicator(SortField::Type))),
        Cell::from("Description"),
        Cell::from("Account"),
        Cell::from(format!("Amount {}", app.view.indicator(SortField::Amount))),
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let skip = app.scroll.min(rows.len().saturating_sub(1));
    let body: Vec<Row> = rows
        .iter()
        .skip(skip)
        .map(|tx| {
            let color = tone_color(Tone::of(&tx.transaction_type));
            Row::new(vec![
                Cell::from(format_timestamp(tx.transaction_date)),
                Cell::from(type_label(&tx.transaction_type).to_string()).style(Style::default().fg(color)),
                Cell::from(description_or_placeholder(tx).to_string()),
                Cell::from(counterparty(tx).to_string()),
                Cell::from(format_signed_amount(tx.amount, &tx.transaction_type))
                    .style(Style::default().fg(color)),
            ])
        })
        .collect();

    let table = Table::new(
        body,
        [
            Constraint::Length(24),
            Constraint::Length(16),
            Constraint::Min(16),
            Constraint::Length(14),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(block);
    f.render_widget(table, area);
}

fn draw_modal(f: &mut Frame, modal: &Modal) {
    let area = centered_rect(60, 12, f.area());
    f.render_widget(Clear, area);

    let (title, mut lines, message, submitting) = match modal {
        Modal::Transfer { form, focus, .. } => {
            let lines: Vec<Line> = TransferField::ALL
                .iter()
                .map(|field| {
                    let marker = if field == focus { "▸ " } else { "  " };
                    Line::from(vec![
                        Span::raw(marker),
                        Span::styled(format!("{}: ", field.label()), Style::default().fg(Color::Cyan)),
                        Span::raw(form.field(*field).to_string()),
                    ])
                })
                .collect();
            ("Send Money", lines, form.message(), form.is_submitting())
        }
        Modal::Amount { form, .. } => {
            let lines = vec![Line::from(vec![
                Span::raw("▸ "),
                Span::styled("Amount ($): ", Style::default().fg(Color::Cyan)),
                Span::raw(form.amount().to_string()),
            ])];
            (form.action().title(), lines, form.message(), form.is_submitting())
        }
    };

    lines.push(Line::raw(""));
    if submitting {
        lines.push(Line::from(Span::styled("Processing…", Style::default().fg(Color::Yellow))));
    } else if let Some((kind, text)) = message {
        lines.push(Line::from(Span::styled(text.to_string(), message_style(kind))));
    }
    lines.push(Line::from(Span::styled(
        "Enter=submit  Tab=next field  Esc=cancel",
        Style::default().fg(Color::Gray),
    )));

    let widget = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(height),
            Constraint::Fill(1),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use bankdash_core::{FormState, TransactionType, UserSummary};
    use chrono::NaiveDate;

    fn app() -> App {
        let session = SessionHandle::default();
        session.establish(
            "t",
            UserSummary {
                username: "alice".into(),
                account_number: None,
            },
        );
        App::new(&Config::default(), &session)
    }

    fn tx(id: &str, t: TransactionType, amount: f64, day: u32) -> Transaction {
        let at = NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        Transaction::new(id, t, amount, at)
    }

    #[test]
    fn test_first_tick_fetches_once() {
        let mut app = app();
        app.dashboard.request_refresh();
        assert!(matches!(app.pending_refresh(), Some(ApiRequest::Refresh)));
        assert!(app.pending_refresh().is_none());
        assert_eq!(app.username, "alice");
    }

    #[test]
    fn test_transfer_success_triggers_refetch() {
        let mut app = app();
        app.dashboard.request_refresh();
        app.pending_refresh();
        let before = app.dashboard.refresh_count();

        app.open_transfer();
        let req = match app.modal.as_mut() {
            Some(modal) => {
                for c in "ACC1002".chars() {
                    modal_key(modal, KeyCode::Char(c), 0);
                }
                modal_key(modal, KeyCode::Tab, 0);
                modal_key(modal, KeyCode::Char('5'), 0);
                modal_key(modal, KeyCode::Enter, 0)
            }
            None => panic!("modal not open"),
        };
        match req {
            Some(ApiRequest::Transfer { request_id, body }) => {
                assert_eq!(request_id, 0);
                assert_eq!(body.recipient_account_number, "ACC1002");
                assert_eq!(body.amount, 5.0);
                assert_eq!(body.description, "Transfer");
            }
            other => panic!("unexpected {other:?}"),
        }

        // second Enter while in flight sends nothing
        if let Some(modal) = app.modal.as_mut() {
            assert!(modal_key(modal, KeyCode::Enter, 1).is_none());
        }

        let now = Instant::now();
        app.apply(
            ApiEvent::TransferDone {
                request_id: 0,
                result: Ok(()),
            },
            now,
        );
        assert!(matches!(app.pending_refresh(), Some(ApiRequest::Refresh)));
        assert_eq!(app.dashboard.refresh_count(), before + 1);

        match &app.modal {
            Some(Modal::Transfer { form, .. }) => {
                assert!(matches!(form.state(), FormState::Succeeded { .. }))
            }
            _ => panic!("modal closed too early"),
        }
        app.close_finished_modal(now + Duration::from_secs(2));
        assert!(app.modal.is_none());
    }

    #[test]
    fn test_failed_transfer_keeps_form_and_counter() {
        let mut app = app();
        app.dashboard.request_refresh();
        app.pending_refresh();
        app.open_transfer();
        if let Some(Modal::Transfer { form, pending, .. }) = app.modal.as_mut() {
            form.edit(TransferField::Recipient, "ACC9");
            form.edit(TransferField::Amount, "20");
            form.begin_submit().unwrap();
            *pending = Some(3);
        }
        app.apply(
            ApiEvent::TransferDone {
                request_id: 3,
                result: Err(ApiError::Server {
                    status: 400,
                    message: Some("Insufficient balance".into()),
                }),
            },
            Instant::now(),
        );
        assert!(app.pending_refresh().is_none());
        match &app.modal {
            Some(Modal::Transfer { form, .. }) => {
                assert_eq!(form.message(), Some((MessageKind::Error, "Insufficient balance")));
                assert_eq!(form.field(TransferField::Recipient), "ACC9");
            }
            _ => panic!("modal should stay open"),
        }
    }

    #[test]
    fn test_recent_feed_limited_and_sorted() {
        let mut app = app();
        let all: Vec<Transaction> = (1..=8)
            .map(|d| tx(&d.to_string(), TransactionType::Deposit, d as f64, d))
            .collect();
        app.apply(ApiEvent::Activity(Ok(all)), Instant::now());
        match &app.recent {
            Load::Ready(recent) => {
                let ids: Vec<&str> = recent.iter().map(|t| t.id.as_str()).collect();
                assert_eq!(ids, vec!["8", "7", "6", "5", "4"]);
            }
            _ => panic!("recent not loaded"),
        }
    }

    #[test]
    fn test_unauthorized_marks_expired() {
        let mut app = app();
        app.apply(ApiEvent::Balance(Err(ApiError::Unauthorized)), Instant::now());
        assert!(app.expired);
    }

    #[test]
    fn test_history_load_failure_message() {
        let mut app = app();
        app.apply(
            ApiEvent::History(Err(ApiError::Network("refused".into()))),
            Instant::now(),
        );
        match &app.history {
            Load::Failed(msg) => assert_eq!(msg, LOAD_FAILED),
            _ => panic!("expected failure"),
        }
    }

    #[test]
    fn test_amount_modal_accepts_digits_only() {
        let mut modal = Modal::Amount {
            form: AmountForm::new(AmountAction::Deposit),
            pending: None,
        };
        for c in "1a2.5x".chars() {
            modal_key(&mut modal, KeyCode::Char(c), 4);
        }
        match modal_key(&mut modal, KeyCode::Enter, 4) {
            Some(ApiRequest::Amount {
                request_id,
                action,
                amount,
            }) => {
                assert_eq!(request_id, 4);
                assert_eq!(action, AmountAction::Deposit);
                assert_eq!(amount, 12.5);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(modal, Modal::Amount { pending: Some(4), .. }));
    }

    fn press(app: &mut App, req_tx: &mpsc::UnboundedSender<ApiRequest>, code: KeyCode) {
        handle_key(app, KeyEvent::from(code), req_tx).unwrap();
    }

    fn fill_transfer(app: &mut App, req_tx: &mpsc::UnboundedSender<ApiRequest>) {
        press(app, req_tx, KeyCode::Char('t'));
        for c in "ACC1002".chars() {
            press(app, req_tx, KeyCode::Char(c));
        }
        press(app, req_tx, KeyCode::Tab);
        press(app, req_tx, KeyCode::Char('5'));
    }

    #[test]
    fn test_esc_cannot_abandon_inflight_transfer() {
        let mut app = app();
        let (req_tx, mut req_rx) = mpsc::unbounded_channel();

        fill_transfer(&mut app, &req_tx);
        press(&mut app, &req_tx, KeyCode::Enter);
        press(&mut app, &req_tx, KeyCode::Esc);
        assert!(app.modal.as_ref().is_some_and(Modal::is_submitting));

        // reopening and resubmitting is not possible while the first is outstanding
        press(&mut app, &req_tx, KeyCode::Char('t'));
        press(&mut app, &req_tx, KeyCode::Enter);

        let mut sent = Vec::new();
        while let Ok(req) = req_rx.try_recv() {
            sent.push(req);
        }
        assert_eq!(sent.len(), 1);
        assert!(matches!(sent[0], ApiRequest::Transfer { request_id: 0, .. }));

        app.apply(
            ApiEvent::TransferDone {
                request_id: 0,
                result: Err(ApiError::Server {
                    status: 400,
                    message: Some("Insufficient balance".into()),
                }),
            },
            Instant::now(),
        );
        press(&mut app, &req_tx, KeyCode::Esc);
        assert!(app.modal.is_none());
    }

    #[test]
    fn test_stale_reply_does_not_settle_new_form() {
        let mut app = app();
        app.dashboard.request_refresh();
        app.pending_refresh();
        let (req_tx, mut req_rx) = mpsc::unbounded_channel();

        fill_transfer(&mut app, &req_tx);
        press(&mut app, &req_tx, KeyCode::Enter);
        let Ok(ApiRequest::Transfer { request_id, .. }) = req_rx.try_recv() else {
            panic!("transfer not sent");
        };

        let now = Instant::now();
        app.apply(
            ApiEvent::TransferDone {
                request_id: request_id + 7,
                result: Ok(()),
            },
            now,
        );
        // the money moved, so the dashboard still refetches
        assert!(matches!(app.pending_refresh(), Some(ApiRequest::Refresh)));
        match &app.modal {
            Some(Modal::Transfer { form, pending, .. }) => {
                assert!(form.is_submitting());
                assert_eq!(*pending, Some(request_id));
            }
            _ => panic!("form should still be waiting"),
        }

        app.apply(
            ApiEvent::TransferDone {
                request_id,
                result: Ok(()),
            },
            now,
        );
        assert!(matches!(
            &app.modal,
            Some(Modal::Transfer { form, pending: None, .. })
                if matches!(form.state(), FormState::Succeeded { .. })
        ));
    }

    #[test]
    fn test_amount_reply_for_other_request_ignored() {
        let mut app = app();
        let (req_tx, mut req_rx) = mpsc::unbounded_channel();
        press(&mut app, &req_tx, KeyCode::Char('d'));
        press(&mut app, &req_tx, KeyCode::Char('9'));
        press(&mut app, &req_tx, KeyCode::Enter);
        let Ok(ApiRequest::Amount { request_id, .. }) = req_rx.try_recv() else {
            panic!("deposit not sent");
        };

        app.apply(
            ApiEvent::AmountDone {
                request_id: request_id + 1,
                action: AmountAction::Deposit,
                result: Err(ApiError::Network("refused".into())),
            },
            Instant::now(),
        );
        assert!(app.modal.as_ref().is_some_and(Modal::is_submitting));
    }
}
