mod app;
mod form;
mod render;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use stocklist::listing::SortKey;

use app::{App, View};

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let token = std::env::var("STOCKLIST_ID_TOKEN").ok().filter(|t| !t.is_empty());
    let export_dir = std::env::var("EXPORT_DIR").map_or_else(|_| PathBuf::from("."), PathBuf::from);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(io::Error::other)?;

    let mut app = App::new(base_url, token, export_dir);

    // Initial fetch before rendering
    app.refresh(&client).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &client).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    client: &reqwest::Client,
) -> io::Result<()> {
    let tick = Duration::from_millis(250);

    loop {
        app.expire_toast();
        terminal.draw(|f| render::render(f, app))?;

        if event::poll(tick)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !handle_key(app, client, key).await {
                    return Ok(());
                }
            }
        }
    }
}

/// Returns false when the user quits.
async fn handle_key(app: &mut App, client: &reqwest::Client, key: KeyEvent) -> bool {
    if app.confirm_delete {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => app.delete_loaded(client).await,
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.confirm_delete = false,
            _ => {}
        }
        return true;
    }

    match app.view {
        View::Listing => return handle_listing_key(app, client, key).await,
        View::Entry => handle_entry_key(app, client, key).await,
        View::Edit => handle_edit_key(app, client, key).await,
    }
    true
}

async fn handle_listing_key(app: &mut App, client: &reqwest::Client, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => return false,
        KeyCode::Char('r') | KeyCode::Char('R') => app.refresh(client).await,
        KeyCode::Char('1') => app.listing.select_sort(SortKey::Name),
        KeyCode::Char('2') => app.listing.select_sort(SortKey::TotalListedShares),
        KeyCode::Char('3') => app.listing.select_sort(SortKey::PublicShare),
        KeyCode::Char('f') => app.cycle_filter(),
        KeyCode::Char('x') => app.export(false),
        KeyCode::Char('c') => app.export(true),
        KeyCode::Char('a') => app.open(View::Entry),
        KeyCode::Char('e') => app.open(View::Edit),
        KeyCode::Char('o') => app.sign_out(),
        KeyCode::Down | KeyCode::Char('j') => {
            let max = app.tables().len().saturating_sub(1);
            app.scroll = (app.scroll + 1).min(max);
        }
        KeyCode::Up | KeyCode::Char('k') => app.scroll = app.scroll.saturating_sub(1),
        _ => {}
    }
    true
}

async fn handle_entry_key(app: &mut App, client: &reqwest::Client, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.view = View::Listing,
        KeyCode::Enter => app.submit_entry(client).await,
        _ => edit_form(&mut app.entry, &app.rules, key),
    }
}

async fn handle_edit_key(app: &mut App, client: &reqwest::Client, key: KeyEvent) {
    if app.edit.loaded_id.is_none() {
        match key.code {
            KeyCode::Esc => app.view = View::Listing,
            KeyCode::Enter => app.fetch_for_edit(client).await,
            KeyCode::Backspace => {
                app.edit.id_input.pop();
            }
            KeyCode::Char(c) => app.edit.id_input.push(c),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Esc => app.edit.reset(),
        KeyCode::Enter => app.submit_edit(client).await,
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.confirm_delete = true;
        }
        _ => edit_form(&mut app.edit.form, &app.rules, key),
    }
}

fn edit_form(form: &mut form::StockForm, rules: &stocklist::calculator::SectorRules, key: KeyEvent) {
    match key.code {
        KeyCode::Tab | KeyCode::Down => form.focus_next(rules),
        KeyCode::BackTab | KeyCode::Up => form.focus_prev(rules),
        KeyCode::Left if form.focus == form::Field::Sector => form.cycle_sector(false),
        KeyCode::Right if form.focus == form::Field::Sector => form.cycle_sector(true),
        KeyCode::Backspace => form.backspace(),
        KeyCode::Char(c) => form.push_char(c),
        _ => {}
    }
}
