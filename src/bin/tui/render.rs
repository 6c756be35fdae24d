use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use stocklist::calculator::SectorRules;
use stocklist::listing::{SectorTable, SortKey, SortOrder};

use crate::app::{truncate, App, ConnectionStatus, ToastKind, View};
use crate::form::{Field, StockForm};

pub fn render(f: &mut Frame, app: &App) {
    let area = f.area();

    // Outer vertical split: header | body | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    match app.view {
        View::Listing => render_listing(f, app, chunks[1]),
        View::Entry => render_form(f, &app.entry, &app.rules, " ADD STOCK ", chunks[1]),
        View::Edit => render_edit(f, app, chunks[1]),
    }
    render_footer(f, app, chunks[2]);

    if app.confirm_delete {
        render_confirm(f, area);
    }
    if let Some(toast) = &app.toast {
        let (color, text) = match toast.kind {
            ToastKind::Success => (Color::Green, toast.text.as_str()),
            ToastKind::Error => (Color::Red, toast.text.as_str()),
        };
        let width = (text.chars().count() as u16 + 4).min(area.width);
        let rect = Rect::new(area.width.saturating_sub(width), 0, width, 3);
        f.render_widget(Clear, rect);
        f.render_widget(
            Paragraph::new(Span::styled(text, Style::default().fg(color)))
                .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(color))),
            rect,
        );
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };
    let who = match &app.session.identity {
        Some(id) if app.session.operator => format!("operator {}", id.email),
        Some(id) => id.email.clone(),
        None => "signed out".to_string(),
    };

    let title_spans = vec![
        Span::styled(
            " Stock List  ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(format!("{} stocks", app.stocks.len()), Style::default().fg(Color::White)),
        Span::raw("  │  "),
        Span::styled(
            format!("sector: {}", app.listing.filter.label()),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(who, Style::default().fg(Color::White)),
    ];

    let paragraph = Paragraph::new(Line::from(title_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

fn render_listing(f: &mut Frame, app: &App, area: Rect) {
    let tables = app.tables();
    if tables.is_empty() {
        let msg = Paragraph::new("No stocks to show.")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(msg, area);
        return;
    }

    let visible = &tables[app.scroll.min(tables.len() - 1)..];
    // Header row + borders + one line per record.
    let constraints: Vec<Constraint> = visible
        .iter()
        .map(|t| Constraint::Length(t.rows.len() as u16 + 3))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (table, chunk) in visible.iter().zip(chunks.iter()) {
        render_sector_table(f, app, table, *chunk);
    }
}

fn render_sector_table(f: &mut Frame, app: &App, table: &SectorTable, area: Rect) {
    let header_cells = table.columns().into_iter().map(|h| {
        Cell::from(header_label(app, h))
            .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    let header = Row::new(header_cells).height(1);

    let rows: Vec<Row> = table
        .rows
        .iter()
        .map(|r| {
            let ltp_color = match r.ltp.as_str() {
                "N/A" => Color::DarkGray,
                "Error" => Color::Red,
                _ => Color::Green,
            };
            let cells = r.cells(table.show_listed_date);
            let ltp_idx = cells.len() - 2;
            Row::new(cells.into_iter().enumerate().map(|(i, c)| {
                let style = match i {
                    0 => Style::default().fg(Color::DarkGray),
                    i if i == ltp_idx => Style::default().fg(ltp_color),
                    _ => Style::default(),
                };
                Cell::from(c).style(style)
            }))
        })
        .collect();

    let widths: Vec<Constraint> = table
        .columns()
        .iter()
        .map(|c| match *c {
            "Id" => Constraint::Length(20),
            "S.N." => Constraint::Length(4),
            "Name" => Constraint::Min(8),
            "Remarks" => Constraint::Min(6),
            "% of Promoter & Public" => Constraint::Length(16),
            _ => Constraint::Length(12),
        })
        .collect();

    let widget = Table::new(rows, widths).header(header).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                format!(" {} ", table.sector.as_str().to_uppercase()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(widget, area);
}

/// Sortable headers carry the active direction arrow.
fn header_label(app: &App, column: &str) -> String {
    let key = match column {
        "Name" => SortKey::Name,
        "Total Listed Shares" => SortKey::TotalListedShares,
        "Public Share" => SortKey::PublicShare,
        _ => return column.to_string(),
    };
    match app.listing.order_for(key) {
        Some(SortOrder::Asc) => format!("{column} ▲"),
        Some(SortOrder::Desc) => format!("{column} ▼"),
        None => column.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

fn render_form(f: &mut Frame, form: &StockForm, rules: &SectorRules, title: &str, area: Rect) {
    let mut lines: Vec<Line> = form
        .visible_fields(rules)
        .into_iter()
        .map(|field| {
            let focused = field == form.focus;
            let marker = if focused { "▶ " } else { "  " };
            let value_style = if focused {
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            let cursor = if focused && field != Field::Sector { "_" } else { "" };
            Line::from(vec![
                Span::styled(marker, Style::default().fg(Color::Yellow)),
                Span::styled(format!("{:<26}", field.label()), Style::default().fg(Color::Yellow)),
                Span::styled(format!("{}{cursor}", form.value(field)), value_style),
            ])
        })
        .collect();

    lines.push(Line::raw(""));
    match form.preview(rules) {
        Some(p) => {
            lines.push(preview_line("Public Share", &p.public_share));
            lines.push(preview_line("% of Promoter & Public", &p.promoter_public_percent));
            if let Some(lock_in) = &p.lock_in_period {
                lines.push(preview_line("Lock-in Period", lock_in));
            }
        }
        None => lines.push(Line::styled(
            "  Derived fields appear once sector and share counts are filled in.",
            Style::default().fg(Color::DarkGray),
        )),
    }

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(
                title.to_string(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
    );
    f.render_widget(paragraph, area);
}

fn preview_line(label: &str, value: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{label:<26}"), Style::default().fg(Color::DarkGray)),
        Span::styled(value.to_string(), Style::default().fg(Color::Cyan)),
    ])
}

fn render_edit(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let id_style = if app.edit.loaded_id.is_none() {
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let prompt = Paragraph::new(Line::from(vec![
        Span::styled("Stock ID: ", Style::default().fg(Color::Yellow)),
        Span::styled(app.edit.id_input.clone(), id_style),
    ]))
    .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::DarkGray)));
    f.render_widget(prompt, chunks[0]);

    if app.edit.loaded_id.is_some() {
        render_form(f, &app.edit.form, &app.rules, " EDIT STOCK ", chunks[1]);
    }
}

fn render_confirm(f: &mut Frame, area: Rect) {
    let width = 44.min(area.width);
    let rect = Rect::new(
        area.width.saturating_sub(width) / 2,
        area.height.saturating_sub(5) / 2,
        width,
        5.min(area.height),
    );
    let body = Paragraph::new(vec![
        Line::raw("Are you sure you want to delete this stock?"),
        Line::from(vec![
            Span::styled("[y] ", Style::default().fg(Color::Red)),
            Span::raw("delete   "),
            Span::styled("[n] ", Style::default().fg(Color::Yellow)),
            Span::raw("cancel"),
        ]),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" CONFIRM "),
    );
    f.render_widget(Clear, rect);
    f.render_widget(body, rect);
}

fn render_footer(f: &mut Frame, app: &App, area: Rect) {
    let keys: &[(&str, &str)] = match app.view {
        View::Listing => &[
            ("[q] ", "quit  "),
            ("[r] ", "refresh  "),
            ("[1/2/3] ", "sort name/total/public  "),
            ("[f] ", "sector  "),
            ("[x/c] ", "export xlsx/csv  "),
            ("[a] ", "add  "),
            ("[e] ", "edit  "),
            ("[o] ", "sign out  "),
            ("[↑↓] ", "scroll"),
        ],
        View::Entry => &[
            ("[esc] ", "back  "),
            ("[tab] ", "next field  "),
            ("[←→] ", "sector  "),
            ("[enter] ", "save"),
        ],
        View::Edit if app.edit.loaded_id.is_none() => {
            &[("[esc] ", "back  "), ("[enter] ", "fetch stock data")]
        }
        View::Edit => &[
            ("[esc] ", "back  "),
            ("[tab] ", "next field  "),
            ("[←→] ", "sector  "),
            ("[enter] ", "update  "),
            ("[ctrl-d] ", "delete"),
        ],
    };
    let spans: Vec<Span> = keys
        .iter()
        .flat_map(|(k, label)| {
            [
                Span::styled(*k, Style::default().fg(Color::Yellow)),
                Span::raw(*label),
            ]
        })
        .collect();
    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
