//! Interactive browse command.
//!
//! One event loop owns the screen state. Input lines, page loads, favorite
//! toggles and imports all arrive as [`BrowseEvent`]s on a single channel;
//! network work runs in spawned tasks so input keeps flowing while a request
//! is outstanding.

use crate::catalog::{CatalogClient, CatalogService, Product, ProductId};
use crate::config::{Config, OutputFormat};
use crate::feed::{
    FavoriteSynchronizer, FeedError, ImportOutcome, ImportTrigger, LoadOutcome,
    PaginationController, ProximityMargin, ScrollTrigger, Viewport, ViewportObserver,
};
use crate::format::Formatter;
use anyhow::{Context, Result};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const HELP: &str = "[n]ext  [p]rev  [f <id>] favorite  [i]mport  [r]eload  [q]uit";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Prev,
    Favorite(ProductId),
    Import,
    Reload,
    Quit,
    Help,
    Unknown(String),
}

/// Parses one line of user input.
pub fn parse_command(line: &str) -> Command {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Command::Next;
    };

    match word.to_lowercase().as_str() {
        "n" | "next" => Command::Next,
        "p" | "prev" => Command::Prev,
        "i" | "import" => Command::Import,
        "r" | "reload" => Command::Reload,
        "q" | "quit" | "exit" => Command::Quit,
        "h" | "help" | "?" => Command::Help,
        "f" | "fav" | "favorite" => match parts.next().map(str::parse::<ProductId>) {
            Some(Ok(id)) => Command::Favorite(id),
            _ => Command::Unknown(line.trim().to_string()),
        },
        _ => Command::Unknown(line.trim().to_string()),
    }
}

/// Everything the browse loop reacts to.
#[derive(Debug)]
pub enum BrowseEvent {
    Input(Command),
    InputClosed,
    Loaded(Result<LoadOutcome, FeedError>),
    Toggled(ProductId, Result<bool, FeedError>),
    Imported(Result<ImportOutcome, FeedError>),
}

/// Whether the loop keeps going after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Screen state of an interactive browse session.
pub struct BrowseSession<C: CatalogService + 'static> {
    feed: Arc<PaginationController<C>>,
    favorites: FavoriteSynchronizer<C>,
    import: ImportTrigger<C>,
    trigger: ScrollTrigger<ViewportObserver>,
    viewport: Viewport,
    formatter: Formatter,
    status: Option<String>,
    events: mpsc::Sender<BrowseEvent>,
}

impl<C: CatalogService + 'static> BrowseSession<C> {
    pub fn new(client: Arc<C>, config: &Config, events: mpsc::Sender<BrowseEvent>) -> Self {
        let feed = Arc::new(PaginationController::new(client, config.page_policy()));
        Self {
            favorites: FavoriteSynchronizer::new(Arc::clone(&feed)),
            import: ImportTrigger::new(Arc::clone(&feed)),
            trigger: ScrollTrigger::new(
                ViewportObserver::new(),
                ProximityMargin(config.prefetch_rows),
            ),
            viewport: Viewport::new(config.viewport_rows),
            formatter: Formatter::new(OutputFormat::Table),
            status: None,
            feed,
            events,
        }
    }

    pub fn feed(&self) -> &Arc<PaginationController<C>> {
        &self.feed
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Requests the first page.
    pub fn start(&mut self) {
        self.spawn_load();
    }

    /// Applies one event to the session.
    pub fn handle(&mut self, event: BrowseEvent) -> Flow {
        match event {
            BrowseEvent::Input(command) => return self.handle_command(command),
            BrowseEvent::InputClosed => return Flow::Quit,
            BrowseEvent::Loaded(result) => match result {
                Ok(outcome) => debug!("Load finished: {:?}", outcome),
                Err(e) => {
                    warn!("{}", e);
                    self.status = Some(e.user_message());
                }
            },
            BrowseEvent::Toggled(product_id, result) => {
                self.status = Some(match result {
                    Ok(true) => format!("★ Product {} added to favorites.", product_id),
                    Ok(false) => format!("☆ Product {} removed from favorites.", product_id),
                    Err(e) => e.user_message(),
                });
            }
            BrowseEvent::Imported(result) => {
                self.status = Some(match result {
                    Ok(ImportOutcome::Completed(report)) => {
                        self.viewport.top = 0;
                        match report.reload {
                            Ok(_) => report.message,
                            Err(e) => format!("{} {}", report.message, e.user_message()),
                        }
                    }
                    Ok(ImportOutcome::AlreadyRunning) => "Import already in progress.".to_string(),
                    Err(e) => e.user_message(),
                });
            }
        }
        self.check_proximity();
        Flow::Continue
    }

    fn handle_command(&mut self, command: Command) -> Flow {
        match command {
            Command::Quit => return Flow::Quit,
            Command::Next => self.viewport.page_down(self.feed.len()),
            Command::Prev => self.viewport.page_up(),
            Command::Favorite(product_id) => self.spawn_toggle(product_id),
            Command::Import => {
                if self.import.is_running() {
                    self.status = Some("Import already in progress.".to_string());
                } else {
                    self.status = Some("Importing products...".to_string());
                    self.spawn_import();
                }
            }
            Command::Reload => {
                self.viewport.top = 0;
                self.status = None;
                self.feed.reset();
                self.spawn_load();
            }
            Command::Help => self.status = Some(HELP.to_string()),
            Command::Unknown(input) => {
                self.status = Some(format!("Unknown command: {}. {}", input, HELP));
            }
        }
        self.check_proximity();
        Flow::Continue
    }

    /// Re-points the scroll trigger at the current sentinel and loads the
    /// next page if it is in proximity.
    fn check_proximity(&mut self) {
        self.trigger.attach(self.feed.sentinel());

        let feed = &self.feed;
        let events = self.trigger.observer_mut().scan(self.viewport, |id| feed.position_of(id));
        for event in events {
            if self.trigger.on_visibility(event, self.feed.is_fetching()) {
                self.spawn_load();
            }
        }
    }

    fn spawn_load(&self) {
        let feed = Arc::clone(&self.feed);
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = feed.load_next().await;
            let _ = events.send(BrowseEvent::Loaded(result)).await;
        });
    }

    fn spawn_toggle(&self, product_id: ProductId) {
        let favorites = self.favorites.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = favorites.toggle(product_id).await;
            let _ = events.send(BrowseEvent::Toggled(product_id, result)).await;
        });
    }

    fn spawn_import(&self) {
        let import = self.import.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = import.run().await;
            let _ = events.send(BrowseEvent::Imported(result)).await;
        });
    }

    /// Renders the visible part of the feed with status lines.
    pub fn render(&self) -> String {
        let len = self.feed.len();
        let visible: Vec<Product> = self.feed.with_products(|products| {
            products.iter().skip(self.viewport.top).take(self.viewport.rows).cloned().collect()
        });

        let mut lines = Vec::new();
        let first = if visible.is_empty() { 0 } else { self.viewport.top + 1 };
        let more = if self.feed.has_more() { "+" } else { "" };
        lines.push(format!(
            "Products {}-{} of {}{}",
            first,
            self.viewport.top + visible.len(),
            len,
            more
        ));

        let fetching = self.feed.is_fetching();
        if !(visible.is_empty() && fetching) {
            lines.push(self.formatter.format_products(&visible));
        }
        if fetching {
            lines.push("Loading products...".to_string());
        }
        if let Some(status) = &self.status {
            lines.push(status.clone());
        }
        lines.push(HELP.to_string());

        lines.join("\n")
    }
}

/// Interactive feed browser.
pub struct BrowseCommand {
    config: Config,
}

impl BrowseCommand {
    /// Creates a new browse command.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs the browser on stdin and stdout until the user quits.
    pub async fn execute(&self) -> Result<()> {
        let client = CatalogClient::new(&self.config).context("Failed to create HTTP client")?;
        let input = BufReader::new(tokio::io::stdin());
        let mut out = std::io::stdout();

        self.execute_with_client(Arc::new(client), input, &mut out).await
    }

    /// Runs the browser with a provided client and streams (for testing).
    pub async fn execute_with_client<C, R, W>(
        &self,
        client: Arc<C>,
        input: R,
        out: &mut W,
    ) -> Result<()>
    where
        C: CatalogService + 'static,
        R: AsyncBufRead + Unpin + Send + 'static,
        W: Write,
    {
        let (tx, mut rx) = mpsc::channel(32);
        spawn_input_reader(input, tx.clone());

        let mut session = BrowseSession::new(client, &self.config, tx);
        session.start();
        writeln!(out, "{}", session.render())?;

        while let Some(event) = rx.recv().await {
            if session.handle(event) == Flow::Quit {
                break;
            }
            writeln!(out, "\n{}", session.render())?;
            out.flush()?;
        }

        Ok(())
    }
}

fn spawn_input_reader<R>(input: R, events: mpsc::Sender<BrowseEvent>)
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = input.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if events.send(BrowseEvent::Input(parse_command(&line))).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    let _ = events.send(BrowseEvent::InputClosed).await;
                    break;
                }
                Err(e) => {
                    warn!("Failed to read input: {}", e);
                    let _ = events.send(BrowseEvent::InputClosed).await;
                    break;
                }
            }
        }
    });
}
