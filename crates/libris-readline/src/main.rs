use std::borrow::Cow::{self, Borrowed, Owned};
use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::watch;

use libris_client::{HttpLendingApi, LendingApi, LibraryService};
use libris_core::LibrisError;
use libris_core::book::BookFilter;
use libris_core::route::{RouteDecision, ViewAccess, authorize};
use libris_core::session::{SessionContext, SessionState, SessionStore};
use libris_infrastructure::{ClientConfig, JsonSessionStore};

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: [
                "/help", "/login", "/register", "/logout", "/books", "/borrows", "/recs",
                "/genre", "/author", "/available", "/apply", "/next", "/prev", "/borrow",
                "/return",
            ]
            .iter()
            .map(|cmd| cmd.to_string())
            .collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// The views of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Login,
    Books,
    Borrows,
    Recommendations,
}

impl View {
    fn access(self) -> ViewAccess {
        match self {
            View::Login => ViewAccess::Public,
            View::Books | View::Borrows | View::Recommendations => ViewAccess::Protected,
        }
    }

    fn name(self) -> &'static str {
        match self {
            View::Login => "login",
            View::Books => "books",
            View::Borrows => "borrows",
            View::Recommendations => "recs",
        }
    }
}

/// REPL state: the current view plus the filter draft/applied pair and
/// page that parameterize the catalog view.
struct App {
    session: Arc<SessionContext>,
    api: Arc<dyn LendingApi>,
    library: LibraryService,
    state_rx: watch::Receiver<SessionState>,
    view: View,
    /// Free-form filter values being edited
    draft: BookFilter,
    /// Committed filter values that parameterize the catalog query
    applied: BookFilter,
    page: u32,
}

impl App {
    fn prompt(&self) -> String {
        format!("libris({})> ", self.view.name())
    }

    /// Applies the route guard and switches views.
    fn navigate(&mut self, target: View) {
        match authorize(&self.session.state(), target.access()) {
            RouteDecision::Render => self.view = target,
            RouteDecision::RedirectToLogin => {
                println!("{}", "Please log in to continue.".yellow());
                self.view = View::Login;
            }
        }
    }

    /// Redirects to the login view when the session ended while a
    /// protected view was showing.
    fn enforce_route(&mut self) {
        if self.state_rx.has_changed().unwrap_or(false) {
            let authenticated = self.state_rx.borrow_and_update().is_authenticated();
            if !authenticated && self.view.access() == ViewAccess::Protected {
                println!("{}", "Session ended. Back to the login view.".yellow());
                self.view = View::Login;
            }
        }
    }

    async fn render(&self) {
        match self.view {
            View::Login => self.render_login(),
            View::Books => self.render_books().await,
            View::Borrows => self.render_borrows().await,
            View::Recommendations => self.render_recommendations().await,
        }
    }

    fn render_login(&self) {
        println!("{}", "Log in with /login <username> <password>".bright_black());
        println!(
            "{}",
            "No account yet? /register <username> <password>".bright_black()
        );
    }

    async fn render_books(&self) {
        let page = match self.library.books(&self.applied, self.page).await {
            Ok(page) => page,
            Err(err) => {
                print_page_error("Error loading books", &err);
                return;
            }
        };

        // Cross-reference the loans so each book offers the right action,
        // as long as the loans themselves load
        let borrowed: HashSet<u64> = self
            .library
            .my_borrows()
            .await
            .map(|records| records.iter().map(|record| record.book.id).collect())
            .unwrap_or_default();

        println!("{}", "All Books".bright_magenta().bold());
        if self.applied != BookFilter::default() {
            println!("{}", format!("  filter: {}", describe_filter(&self.applied)).bright_black());
        }
        if page.results.is_empty() {
            println!("{}", "No books match the applied filter.".bright_black());
        }
        for book in &page.results {
            let action = if borrowed.contains(&book.id) {
                format!("[borrowed: /return {}]", book.id).cyan()
            } else if book.is_available() {
                format!("[/borrow {}]", book.id).green()
            } else {
                "[unavailable]".bright_black()
            };
            println!(
                "  {:>4}  {} by {} ({}) copies: {} {}",
                book.id,
                book.title.bold(),
                book.author,
                book.genre,
                book.available_copies,
                action
            );
        }

        let mut footer = format!("Page {}", self.page);
        if self.page > 1 {
            footer.push_str("  /prev");
        }
        if page.has_next() {
            footer.push_str("  /next");
        }
        println!("{}", footer.bright_black());
    }

    async fn render_borrows(&self) {
        let borrows = match self.library.my_borrows().await {
            Ok(borrows) => borrows,
            Err(err) => {
                print_page_error("Error loading borrowed books", &err);
                return;
            }
        };

        println!("{}", "My Borrowed Books".bright_magenta().bold());
        if borrows.is_empty() {
            println!("{}", "You have no borrowed books currently.".bright_black());
        }
        for record in borrows.iter() {
            println!(
                "  {:>4}  {} (borrowed on {})",
                record.book.id,
                record.book.title.bold(),
                record.borrowed_at.format("%Y-%m-%d")
            );
        }
    }

    async fn render_recommendations(&self) {
        let recommendations = match self.library.recommendations().await {
            Ok(recommendations) => recommendations,
            Err(err) => {
                print_page_error("Error loading recommendations", &err);
                return;
            }
        };

        println!("{}", "Recommended Books".bright_magenta().bold());
        if recommendations.is_empty() {
            println!(
                "{}",
                "No recommendations available at the moment.".bright_black()
            );
        }
        for rec in recommendations.iter() {
            println!(
                "  {:>4}  {} by {} (popularity: {})",
                rec.book.id,
                rec.book.title.bold(),
                rec.book.author,
                rec.read_count
            );
        }
    }

    /// Handles one command line. Returns `false` when the user quits.
    async fn handle_command(&mut self, line: &str) -> bool {
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        match command {
            "quit" | "exit" => return false,
            "/help" => print_help(),
            "/login" => self.login(&args).await,
            "/register" => self.register(&args).await,
            "/logout" => self.logout(),
            "/books" => {
                self.navigate(View::Books);
                self.render().await;
            }
            "/borrows" => {
                self.navigate(View::Borrows);
                self.render().await;
            }
            "/recs" => {
                self.navigate(View::Recommendations);
                self.render().await;
            }
            "/genre" => {
                self.draft.genre = args.join(" ");
                self.show_draft();
            }
            "/author" => {
                self.draft.author = args.join(" ");
                self.show_draft();
            }
            "/available" => {
                match args.first().copied() {
                    Some("true") => self.draft.available = Some(true),
                    Some("false") => self.draft.available = Some(false),
                    Some("any") | None => self.draft.available = None,
                    Some(other) => {
                        println!("{}", format!("Expected true, false or any, got '{other}'").red());
                        return true;
                    }
                }
                self.show_draft();
            }
            "/apply" => {
                // Committing the draft re-keys the catalog query and
                // starts back at the first page
                self.applied = self.draft.clone();
                self.page = 1;
                self.navigate(View::Books);
                self.render().await;
            }
            "/next" => self.next_page().await,
            "/prev" => self.prev_page().await,
            "/borrow" => self.borrow(&args).await,
            "/return" => self.return_book(&args).await,
            _ => println!("{}", "Unknown command. Try /help".bright_black()),
        }
        true
    }

    async fn login(&mut self, args: &[&str]) {
        let [username, password] = args else {
            println!("{}", "Usage: /login <username> <password>".bright_black());
            return;
        };

        match self.api.login(username, password).await {
            Ok(response) => {
                if let Err(err) = self
                    .session
                    .login(response.user, response.access, response.refresh)
                {
                    print_page_error("Failed to persist the session", &err);
                    return;
                }
                println!("{}", format!("Welcome, {username}!").green());
                self.navigate(View::Books);
                self.render().await;
            }
            // Inline, next to the form: the service's own message when it
            // rejected the credentials, a generic one otherwise
            Err(err) if err.is_auth() => println!("{}", err.to_string().red()),
            Err(_) => println!("{}", "Login failed".red()),
        }
    }

    async fn register(&mut self, args: &[&str]) {
        let [username, password] = args else {
            println!("{}", "Usage: /register <username> <password>".bright_black());
            return;
        };

        match self.api.register(username, password).await {
            Ok(()) => {
                println!("{}", "Registered. You can now log in.".green());
                self.navigate(View::Login);
                self.render().await;
            }
            Err(_) => println!("{}", "Error registering user".red()),
        }
    }

    fn logout(&mut self) {
        if !self.session.is_authenticated() {
            println!("{}", "Not logged in.".bright_black());
            return;
        }
        match self.session.logout() {
            Ok(()) => println!("{}", "Logged out.".green()),
            Err(err) => print_page_error("Logout failed", &err),
        }
    }

    async fn next_page(&mut self) {
        if self.view != View::Books {
            println!("{}", "Pagination applies to the books view.".bright_black());
            return;
        }
        let has_next = self
            .library
            .books(&self.applied, self.page)
            .await
            .map(|page| page.has_next())
            .unwrap_or(false);
        if has_next {
            self.page += 1;
            self.render().await;
        } else {
            println!("{}", "Already on the last page.".bright_black());
        }
    }

    async fn prev_page(&mut self) {
        if self.view != View::Books {
            println!("{}", "Pagination applies to the books view.".bright_black());
            return;
        }
        if self.page > 1 {
            self.page -= 1;
            self.render().await;
        } else {
            println!("{}", "Already on the first page.".bright_black());
        }
    }

    async fn borrow(&mut self, args: &[&str]) {
        let Some(book_id) = parse_book_id(args) else {
            println!("{}", "Usage: /borrow <book id>".bright_black());
            return;
        };
        match self.library.borrow(book_id).await {
            Ok(()) => {
                println!("{}", "Borrowed.".green());
                self.render().await;
            }
            Err(err) => print_page_error("Borrow failed", &err),
        }
    }

    async fn return_book(&mut self, args: &[&str]) {
        let Some(book_id) = parse_book_id(args) else {
            println!("{}", "Usage: /return <book id>".bright_black());
            return;
        };
        match self.library.return_book(book_id).await {
            Ok(()) => {
                println!("{}", "Returned.".green());
                self.render().await;
            }
            Err(err) => print_page_error("Return failed", &err),
        }
    }

    fn show_draft(&self) {
        println!(
            "{}",
            format!(
                "Filter draft: {} (apply with /apply)",
                describe_filter(&self.draft)
            )
            .bright_black()
        );
    }
}

fn parse_book_id(args: &[&str]) -> Option<u64> {
    args.first()?.parse().ok()
}

fn describe_filter(filter: &BookFilter) -> String {
    let genre = if filter.genre.is_empty() { "any" } else { &filter.genre };
    let author = if filter.author.is_empty() { "any" } else { &filter.author };
    let available = match filter.available {
        Some(true) => "available",
        Some(false) => "not available",
        None => "any",
    };
    format!("genre={genre} author={author} availability={available}")
}

fn print_page_error(label: &str, err: &LibrisError) {
    println!("{}", label.red());
    tracing::debug!(error = %err, "{label}");
}

fn print_help() {
    let lines = [
        ("/login <user> <pass>", "log in"),
        ("/register <user> <pass>", "create an account"),
        ("/logout", "log out and return to the login view"),
        ("/books", "browse the catalog"),
        ("/borrows", "list your borrowed books"),
        ("/recs", "personalized recommendations"),
        ("/genre <value>", "edit the filter draft (empty clears)"),
        ("/author <value>", "edit the filter draft (empty clears)"),
        ("/available <true|false|any>", "edit the filter draft"),
        ("/apply", "apply the filter draft"),
        ("/next, /prev", "page through the catalog"),
        ("/borrow <id>", "borrow a book"),
        ("/return <id>", "return a book"),
        ("quit", "exit"),
    ];
    for (command, description) in lines {
        println!("  {:<30} {}", command.bright_cyan(), description);
    }
}

/// The main entry point for the Libris readline application.
///
/// Wires the persisted session store, the session context, the HTTP
/// gateway and the library service together, then runs a rustyline REPL
/// whose commands are the application's views.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    // ===== Backend Initialization =====
    let config = ClientConfig::load().context("failed to load configuration")?;
    let store: Arc<dyn SessionStore> =
        Arc::new(JsonSessionStore::default_location().context("failed to open session store")?);
    let session =
        Arc::new(SessionContext::from_store(store).context("failed to restore the session")?);
    let gateway = libris_client::ApiGateway::new(&config, Arc::clone(&session))?;
    let api: Arc<dyn LendingApi> = Arc::new(HttpLendingApi::new(gateway));
    let library = LibraryService::new(Arc::clone(&api));

    let state_rx = session.subscribe();

    // Default route: straight to the catalog when a session survived the
    // restart, otherwise to the login view
    let initial = if session.is_authenticated() {
        View::Books
    } else {
        View::Login
    };

    let mut app = App {
        session,
        api,
        library,
        state_rx,
        view: View::Login,
        draft: BookFilter::default(),
        applied: BookFilter::default(),
        page: 1,
    };
    app.navigate(initial);

    // ===== REPL Setup =====
    let helper = CliHelper::new();
    let mut rl = Editor::new()?;
    rl.set_helper(Some(helper));

    println!("{}", "=== Libris ===".bright_magenta().bold());
    println!(
        "{}",
        "Type '/help' for commands, or 'quit' to exit.".bright_black()
    );
    println!();
    app.render().await;

    // ===== Main REPL Loop =====
    loop {
        let readline = rl.readline(&app.prompt());

        match readline {
            Ok(line) => {
                let trimmed = line.trim();

                if trimmed.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(&line);

                if !app.handle_command(trimmed).await {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }

                // A logout during the command must kick a protected view
                // back to login
                app.enforce_route();
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}
