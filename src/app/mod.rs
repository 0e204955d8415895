use std::{sync::Arc, time::Duration};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal,
};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Paragraph, Widget, Wrap},
    DefaultTerminal, Frame,
};
use tokio::{runtime::Handle, sync::mpsc};

use trailhead::{
    client::{HttpFetcher, PageState},
    identity::Identity,
    session::{NavigationError, PendingNavigation, Session},
    store::FileStore,
};

mod content;

pub struct App {
    session: Session<FileStore>,
    fetcher: Arc<HttpFetcher>,
    runtime: Handle,
    identity: Identity,
    loaded_tx: mpsc::UnboundedSender<Loaded>,
    loaded_rx: mpsc::UnboundedReceiver<Loaded>,
    scroll: (u16, u16),
    status: AppStatus,
    message: String,
    /// Shown instead of `message` until the next key press.
    warning: Option<String>,
}

/// A fetch that finished and waits to be applied to the session.
struct Loaded {
    pending: PendingNavigation,
    page: PageState,
}

enum AppStatus {
    Browsing,
    Typing(Prompt, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prompt {
    Address,
    AddBookmark,
    OpenBookmark,
    EditBookmark,
    DeleteBookmark,
    HistoryEntry,
}

impl Prompt {
    pub fn label(&self) -> &'static str {
        match self {
            Prompt::Address => "=>",
            Prompt::AddBookmark => "bookmark as:",
            Prompt::OpenBookmark => "open bookmark:",
            Prompt::EditBookmark => "edit (old|new name|url):",
            Prompt::DeleteBookmark => "delete bookmark:",
            Prompt::HistoryEntry => "history entry:",
        }
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        let layout = Layout::vertical([Constraint::Percentage(100), Constraint::Min(1)]);
        let [browser, command] = layout.areas(area);
        let layout = Layout::horizontal([Constraint::Min(20), Constraint::Length(48)]);
        let [page_area, side] = layout.areas(browser);
        content::page(self.session.current(), self.scroll).render(page_area, buf);

        let layout = Layout::vertical([
            Constraint::Length(7),
            Constraint::Percentage(40),
            Constraint::Percentage(60),
        ]);
        let [links, bookmarks, history] = layout.areas(side);
        content::links(self.session.current()).render(links, buf);
        content::bookmarks(self.session.bookmarks()).render(bookmarks, buf);
        content::history(self.session.history(), self.session.cursor()).render(history, buf);

        let layout = Layout::horizontal([Constraint::Min(2), Constraint::Length(16)]);
        let [left, right] = layout.areas(command);
        let line = match (&self.status, &self.warning) {
            (AppStatus::Typing(prompt, text), _) => {
                Line::from(format!("{} {text}", prompt.label()))
            }
            (AppStatus::Browsing, Some(warning)) => {
                Line::styled(warning.as_str(), Style::new().fg(Color::Red))
            }
            (AppStatus::Browsing, None) => Line::from(self.message.as_str()),
        };
        Paragraph::new(line)
            .block(Block::new())
            .wrap(Wrap { trim: true })
            .render(left, buf);
        Paragraph::new(self.status_label())
            .block(Block::new())
            .render(right, buf);
    }
}

impl App {
    pub(crate) fn new(
        session: Session<FileStore>,
        fetcher: HttpFetcher,
        runtime: Handle,
        identity: Identity,
    ) -> Self {
        let (loaded_tx, loaded_rx) = mpsc::unbounded_channel();
        Self {
            session,
            fetcher: Arc::new(fetcher),
            runtime,
            identity,
            loaded_tx,
            loaded_rx,
            scroll: (0, 0),
            status: AppStatus::Browsing,
            message: String::new(),
            warning: None,
        }
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        tracing::warn!("{warning}");
        self.warning = Some(warning);
    }

    /// Opens `start`, or the home page, then handles keys until Esc.
    pub fn run(mut self, terminal: &mut DefaultTerminal, start: Option<String>) -> Result<()> {
        match start {
            Some(url) => self.start(|session| session.begin_navigate(&url)),
            None => self.start(Session::begin_home),
        }
        loop {
            terminal.draw(|frame: &mut Frame| self.draw(frame))?;
            while let Ok(loaded) = self.loaded_rx.try_recv() {
                self.apply(loaded);
            }
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key_event) = event::read()? {
                    if key_event.kind != KeyEventKind::Press {
                        continue;
                    }
                    if !self.handle_key(key_event)? {
                        break;
                    }
                }
            }
        }
        self.session.cancel();
        self.session.flush()?;
        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        frame.render_widget(self, frame.area());
    }

    fn status_label(&self) -> String {
        let back = if self.session.can_go_back() { '<' } else { ' ' };
        let forward = if self.session.can_go_forward() { '>' } else { ' ' };
        let state = if self.session.is_loading() {
            "Loading"
        } else {
            match self.status {
                AppStatus::Browsing => "Browsing",
                AppStatus::Typing(..) => "Typing",
            }
        };
        format!("{back}{forward} {state}")
    }

    /// Returns false once the user asked to quit.
    fn handle_key(&mut self, key_event: KeyEvent) -> Result<bool> {
        self.warning = None;
        match self.status {
            AppStatus::Browsing => match key_event.code {
                KeyCode::Esc => {
                    if !self.session.cancel() {
                        return Ok(false);
                    }
                    self.notify("Cancelled");
                }
                KeyCode::PageUp => {
                    let step = terminal::size()?.1.saturating_sub(3);
                    self.scroll.0 = self.scroll.0.saturating_sub(step);
                }
                KeyCode::PageDown => {
                    let step = terminal::size()?.1.saturating_sub(3);
                    self.scroll.0 = self.scroll.0.saturating_add(step);
                }
                KeyCode::Up => {
                    self.scroll.0 = self.scroll.0.saturating_sub(1);
                }
                KeyCode::Down => {
                    self.scroll.0 = self.scroll.0.saturating_add(1);
                }
                KeyCode::Char('i') | KeyCode::Char('g') => {
                    self.status = AppStatus::Typing(Prompt::Address, String::new());
                }
                KeyCode::Char('<') | KeyCode::Left => self.start(Session::begin_back),
                KeyCode::Char('>') | KeyCode::Right => self.start(Session::begin_forward),
                KeyCode::Char('r') => self.start(Session::begin_reload),
                KeyCode::Char('h') => self.start(Session::begin_home),
                KeyCode::Char('H') => self.set_home(),
                KeyCode::Char('b') => {
                    let title = self
                        .session
                        .current()
                        .map(|page| page.title.clone())
                        .unwrap_or_default();
                    self.status = AppStatus::Typing(Prompt::AddBookmark, title);
                }
                KeyCode::Char('m') => {
                    self.status = AppStatus::Typing(Prompt::OpenBookmark, String::new());
                }
                KeyCode::Char('e') => {
                    self.status = AppStatus::Typing(Prompt::EditBookmark, String::new());
                }
                KeyCode::Char('d') => {
                    self.status = AppStatus::Typing(Prompt::DeleteBookmark, String::new());
                }
                KeyCode::Char('j') => {
                    self.status = AppStatus::Typing(Prompt::HistoryEntry, String::new());
                }
                _ => {}
            },
            AppStatus::Typing(prompt, ref mut text) => match key_event.code {
                KeyCode::Esc => {
                    self.status = AppStatus::Browsing;
                }
                KeyCode::Char(c) => {
                    text.push(c);
                }
                KeyCode::Backspace => {
                    text.pop();
                }
                KeyCode::Enter => {
                    let text = std::mem::take(text);
                    self.status = AppStatus::Browsing;
                    self.submit(prompt, &text);
                }
                _ => {}
            },
        }
        Ok(true)
    }

    fn submit(&mut self, prompt: Prompt, text: &str) {
        match prompt {
            Prompt::Address => {
                let Ok(n) = text.trim().parse::<usize>() else {
                    self.start(|session| session.begin_navigate(text));
                    return;
                };
                let link = self
                    .session
                    .current()
                    .and_then(|page| page.links.get(n).cloned());
                match link {
                    Some(link) => self.start(|session| session.begin_navigate(&link)),
                    None => self.notify(format!("No link [{n}] on this page")),
                }
            }
            Prompt::AddBookmark => {
                let Some(url) = self.session.current().map(|page| page.url.clone()) else {
                    self.notify("No page to bookmark");
                    return;
                };
                let result = self.session.add_bookmark(text, &url);
                self.report(result, format!("Bookmark added: {}", text.trim()));
            }
            Prompt::OpenBookmark => self.start(|session| session.begin_bookmark(text.trim())),
            Prompt::EditBookmark => {
                let mut fields = text.splitn(3, '|').map(str::trim);
                let (Some(old), Some(name), Some(url)) =
                    (fields.next(), fields.next(), fields.next())
                else {
                    self.notify("Expected old name|new name|url");
                    return;
                };
                let result = self.session.edit_bookmark(old, name, url);
                self.report(result, format!("Bookmark updated: {name}"));
            }
            Prompt::DeleteBookmark => {
                let result = self.session.remove_bookmark(text.trim());
                self.report(result, format!("Bookmark deleted: {}", text.trim()));
            }
            Prompt::HistoryEntry => match text.trim().parse::<usize>() {
                Ok(index) => self.start(|session| session.begin_jump(index)),
                Err(_) => self.notify(format!("Not a history entry: {text}")),
            },
        }
    }

    fn set_home(&mut self) {
        let Some(url) = self.session.current().map(|page| page.url.clone()) else {
            self.notify("No page to use as home");
            return;
        };
        let result = self.session.set_home(&url);
        self.report(result, format!("Home set to {url}"));
    }

    fn report<E: std::fmt::Display>(&mut self, result: Result<(), E>, success: String) {
        match result {
            Ok(()) => self.notify(success),
            Err(err) => self.warn(err.to_string()),
        }
    }

    /// Begins a navigation and fetches its page in the background.
    fn start(
        &mut self,
        begin: impl FnOnce(&mut Session<FileStore>) -> Result<PendingNavigation, NavigationError>,
    ) {
        let pending = match begin(&mut self.session) {
            Ok(pending) => pending,
            Err(NavigationError::InProgress) => {
                self.notify("Still loading, Esc cancels");
                return;
            }
            Err(err) => {
                self.notify(err.to_string());
                return;
            }
        };
        self.notify(format!("Loading {}", pending.url()));
        let fetcher = self.fetcher.clone();
        let loaded_tx = self.loaded_tx.clone();
        self.runtime.spawn(async move {
            let Some(page) = pending.fetch(&*fetcher).await else {
                return;
            };
            let _ = loaded_tx.send(Loaded { pending, page });
        });
    }

    fn apply(&mut self, loaded: Loaded) {
        match self.session.complete(loaded.pending, loaded.page) {
            Ok(navigated) => {
                self.scroll = (0, 0);
                let message = self
                    .session
                    .current()
                    .map(|page| format!("{} {}", page.status_label, self.whose()))
                    .unwrap_or_default();
                self.notify(message);
                if let Some(err) = navigated.save_error {
                    self.warn(format!("History not saved: {err}"));
                }
            }
            Err(err) => tracing::debug!("Ignoring finished fetch: {err}"),
        }
    }

    fn whose(&self) -> String {
        match self.identity.username() {
            Some(name) => format!("[{name}]"),
            None => String::new(),
        }
    }
}
