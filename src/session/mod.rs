//! Navigation state of one profile: the page on display, the history behind
//! it, the home page and bookmarks.
//!
//! Every navigation happens in two steps. A `begin_*` call validates the
//! request and hands out a [`PendingNavigation`]; once its page has been
//! fetched, [`Session::complete`] applies it. Only one navigation may be
//! pending at a time, and a pending navigation that was cancelled is
//! discarded when its page arrives.

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{
    address,
    client::{Fetch, PageState},
    markup,
    store::{Bookmarks, Store, StoreError},
};
pub use history::History;

mod history;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("nothing to navigate to")]
    Blank,
    #[error("already at the oldest page")]
    AtStart,
    #[error("already at the newest page")]
    AtEnd,
    #[error("history entry {index} does not exist, history has {len} entries")]
    OutOfRange { index: usize, len: usize },
    #[error("no page loaded")]
    NothingLoaded,
    #[error("no bookmark named {0:?}")]
    UnknownBookmark(String),
    #[error("a navigation is already in progress")]
    InProgress,
    #[error("navigation cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum EditError {
    #[error("bookmark name is empty")]
    EmptyName,
    #[error("no bookmark named {0:?}")]
    UnknownBookmark(String),
    #[error("change kept but not saved: {0}")]
    Store(#[from] StoreError),
}

/// Whether a navigation extends the history or shows an existing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Record,
    Entry(usize),
}

/// A navigation that was accepted and now waits for its page.
#[derive(Debug)]
pub struct PendingNavigation {
    ticket: u64,
    url: String,
    target: Target,
    cancel: CancellationToken,
}

impl PendingNavigation {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// Fetches the page unless the navigation gets cancelled first.
    pub async fn fetch<F: Fetch>(&self, fetcher: &F) -> Option<PageState> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            page = fetcher.fetch(&self.url) => Some(page),
        }
    }
}

#[derive(Debug)]
pub struct Navigated {
    /// A new history entry was added.
    pub appended: bool,
    /// The history changed but could not be saved.
    pub save_error: Option<StoreError>,
}

struct InFlight {
    ticket: u64,
    cancel: CancellationToken,
}

pub struct Session<S> {
    store: S,
    history: History,
    current: Option<PageState>,
    home: String,
    bookmarks: Bookmarks,
    in_flight: Option<InFlight>,
    next_ticket: u64,
}

impl<S: Store> Session<S> {
    /// An empty session that saves into `store` without reading from it.
    pub fn new(store: S, home: impl Into<String>) -> Self {
        Self {
            store,
            history: History::default(),
            current: None,
            home: home.into(),
            bookmarks: Bookmarks::new(),
            in_flight: None,
            next_ticket: 0,
        }
    }

    /// Restores home, bookmarks and history from `store`. Nothing is on
    /// display yet, the cursor sits on the most recent entry.
    pub fn open(store: S) -> Result<Self, StoreError> {
        let home = store.load_home()?;
        let bookmarks = store.load_bookmarks()?;
        let history = History::from_entries(store.load_history()?);
        tracing::info!(
            "Restored {} history entries and {} bookmarks",
            history.len(),
            bookmarks.len()
        );
        Ok(Self {
            history,
            bookmarks,
            ..Self::new(store, home)
        })
    }

    pub fn begin_navigate(&mut self, input: &str) -> Result<PendingNavigation, NavigationError> {
        if address::is_blank(input) {
            return Err(NavigationError::Blank);
        }
        self.begin(address::normalize(input.trim()), Target::Record)
    }

    pub fn begin_back(&mut self) -> Result<PendingNavigation, NavigationError> {
        let index = self
            .history
            .previous_index()
            .ok_or(NavigationError::AtStart)?;
        self.begin_entry(index)
    }

    pub fn begin_forward(&mut self) -> Result<PendingNavigation, NavigationError> {
        let index = self.history.next_index().ok_or(NavigationError::AtEnd)?;
        self.begin_entry(index)
    }

    pub fn begin_jump(&mut self, index: usize) -> Result<PendingNavigation, NavigationError> {
        if index >= self.history.len() {
            return Err(NavigationError::OutOfRange {
                index,
                len: self.history.len(),
            });
        }
        self.begin_entry(index)
    }

    pub fn begin_reload(&mut self) -> Result<PendingNavigation, NavigationError> {
        let index = self.history.cursor().ok_or(NavigationError::NothingLoaded)?;
        self.begin_entry(index)
    }

    pub fn begin_home(&mut self) -> Result<PendingNavigation, NavigationError> {
        let home = self.home.clone();
        self.begin_navigate(&home)
    }

    pub fn begin_bookmark(&mut self, name: &str) -> Result<PendingNavigation, NavigationError> {
        let url = self
            .bookmarks
            .get(name)
            .cloned()
            .ok_or_else(|| NavigationError::UnknownBookmark(name.to_string()))?;
        self.begin_navigate(&url)
    }

    fn begin_entry(&mut self, index: usize) -> Result<PendingNavigation, NavigationError> {
        let url = self
            .history
            .get(index)
            .ok_or(NavigationError::OutOfRange {
                index,
                len: self.history.len(),
            })?
            .to_string();
        self.begin(url, Target::Entry(index))
    }

    fn begin(&mut self, url: String, target: Target) -> Result<PendingNavigation, NavigationError> {
        if self.in_flight.is_some() {
            return Err(NavigationError::InProgress);
        }
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let cancel = CancellationToken::new();
        self.in_flight = Some(InFlight {
            ticket,
            cancel: cancel.clone(),
        });
        tracing::info!("Navigating to {url} ({target:?})");
        Ok(PendingNavigation {
            ticket,
            url,
            target,
            cancel,
        })
    }

    /// Applies a fetched page. Pages of cancelled navigations are dropped.
    pub fn complete(
        &mut self,
        pending: PendingNavigation,
        mut page: PageState,
    ) -> Result<Navigated, NavigationError> {
        if !self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.ticket == pending.ticket)
        {
            tracing::debug!("Dropping page of cancelled navigation to {}", pending.url);
            return Err(NavigationError::Cancelled);
        }
        self.in_flight = None;

        page.links = markup::extract_links(&page.body, &page.final_url);
        let appended = match pending.target {
            Target::Record => self.history.record(pending.url),
            Target::Entry(index) => {
                self.history.select(index);
                false
            }
        };
        let save_error = if appended {
            self.store.save_history(self.history.entries()).err()
        } else {
            None
        };
        if let Some(err) = &save_error {
            tracing::error!("Failed to save history: {err}");
        }
        self.current = Some(page);
        Ok(Navigated {
            appended,
            save_error,
        })
    }

    /// Abandons the pending navigation, if any.
    pub fn cancel(&mut self) -> bool {
        let Some(in_flight) = self.in_flight.take() else {
            return false;
        };
        in_flight.cancel.cancel();
        tracing::info!("Navigation cancelled");
        true
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub async fn navigate<F: Fetch>(
        &mut self,
        fetcher: &F,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<Navigated, NavigationError> {
        let pending = self.begin_navigate(input)?;
        self.run(fetcher, pending, cancel).await
    }

    pub async fn back<F: Fetch>(
        &mut self,
        fetcher: &F,
        cancel: &CancellationToken,
    ) -> Result<Navigated, NavigationError> {
        let pending = self.begin_back()?;
        self.run(fetcher, pending, cancel).await
    }

    pub async fn forward<F: Fetch>(
        &mut self,
        fetcher: &F,
        cancel: &CancellationToken,
    ) -> Result<Navigated, NavigationError> {
        let pending = self.begin_forward()?;
        self.run(fetcher, pending, cancel).await
    }

    pub async fn jump_to<F: Fetch>(
        &mut self,
        fetcher: &F,
        index: usize,
        cancel: &CancellationToken,
    ) -> Result<Navigated, NavigationError> {
        let pending = self.begin_jump(index)?;
        self.run(fetcher, pending, cancel).await
    }

    async fn run<F: Fetch>(
        &mut self,
        fetcher: &F,
        pending: PendingNavigation,
        cancel: &CancellationToken,
    ) -> Result<Navigated, NavigationError> {
        let page = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            page = pending.fetch(fetcher) => page,
        };
        let Some(page) = page else {
            self.cancel();
            return Err(NavigationError::Cancelled);
        };
        self.complete(pending, page)
    }

    pub fn set_home(&mut self, url: &str) -> Result<(), StoreError> {
        self.home = url.trim().to_string();
        self.store.save_home(&self.home)
    }

    pub fn add_bookmark(&mut self, name: &str, url: &str) -> Result<(), EditError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(EditError::EmptyName);
        }
        self.bookmarks.insert(name.to_string(), url.to_string());
        self.save_bookmarks()
    }

    pub fn edit_bookmark(
        &mut self,
        name: &str,
        new_name: &str,
        new_url: &str,
    ) -> Result<(), EditError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(EditError::EmptyName);
        }
        if self.bookmarks.remove(name).is_none() {
            return Err(EditError::UnknownBookmark(name.to_string()));
        }
        self.bookmarks
            .insert(new_name.to_string(), new_url.to_string());
        self.save_bookmarks()
    }

    pub fn remove_bookmark(&mut self, name: &str) -> Result<(), EditError> {
        if self.bookmarks.remove(name).is_none() {
            return Err(EditError::UnknownBookmark(name.to_string()));
        }
        self.save_bookmarks()
    }

    fn save_bookmarks(&mut self) -> Result<(), EditError> {
        self.store.save_bookmarks(&self.bookmarks)?;
        Ok(())
    }

    /// Saves everything. Every part is attempted, the first failure is
    /// returned.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        let home = self.store.save_home(&self.home);
        let bookmarks = self.store.save_bookmarks(&self.bookmarks);
        let history = self.store.save_history(self.history.entries());
        home.and(bookmarks).and(history)
    }

    pub fn current(&self) -> Option<&PageState> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &[String] {
        self.history.entries()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.history.cursor()
    }

    pub fn can_go_back(&self) -> bool {
        self.history.previous_index().is_some()
    }

    pub fn can_go_forward(&self) -> bool {
        self.history.next_index().is_some()
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    pub fn bookmarks(&self) -> &Bookmarks {
        &self.bookmarks
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
