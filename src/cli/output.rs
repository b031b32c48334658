// Output formatting utilities

use crate::models::{
    Client, Deal, DealRow, Quote, Specification, StageCode, StagePhase, StageValue, StatusHistoryEntry, Weight,
};
use crate::services::ExchangeRate;
use crate::utils::{format_date, format_jpy, format_timestamp, format_usd, truncate};
use std::collections::BTreeMap;
use std::io::IsTerminal;

// ANSI escape codes for terminal formatting
const ANSI_BOLD: &str = "\x1b[1m";
const ANSI_RESET: &str = "\x1b[0m";

// ANSI foreground colors (standard 16-color palette)
const ANSI_FG_BLACK: &str = "\x1b[30m";
const ANSI_FG_RED: &str = "\x1b[31m";
const ANSI_FG_GREEN: &str = "\x1b[32m";
const ANSI_FG_YELLOW: &str = "\x1b[33m";
const ANSI_FG_BLUE: &str = "\x1b[34m";
const ANSI_FG_MAGENTA: &str = "\x1b[35m";
const ANSI_FG_CYAN: &str = "\x1b[36m";
const ANSI_FG_WHITE: &str = "\x1b[37m";
const ANSI_FG_BRIGHT_BLACK: &str = "\x1b[90m";

/// Map a color name string to its ANSI foreground constant
fn color_name_to_fg(name: &str) -> Option<&'static str> {
    match name {
        "black" => Some(ANSI_FG_BLACK),
        "red" => Some(ANSI_FG_RED),
        "green" => Some(ANSI_FG_GREEN),
        "yellow" => Some(ANSI_FG_YELLOW),
        "blue" => Some(ANSI_FG_BLUE),
        "magenta" => Some(ANSI_FG_MAGENTA),
        "cyan" => Some(ANSI_FG_CYAN),
        "white" => Some(ANSI_FG_WHITE),
        "bright_black" => Some(ANSI_FG_BRIGHT_BLACK),
        _ => None,
    }
}

/// Check if stdout is a terminal (TTY)
pub fn is_tty() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width dynamically
///
/// Uses the `terminal_size` crate for reliable detection, with fallback to
/// COLUMNS environment variable and a sensible default.
pub fn get_terminal_width() -> usize {
    if let Some((terminal_size::Width(w), _)) = terminal_size::terminal_size() {
        if w > 0 {
            return w as usize;
        }
    }

    if let Ok(cols) = std::env::var("COLUMNS") {
        if let Ok(width) = cols.parse::<usize>() {
            if width > 0 && width < 10000 {
                return width;
            }
        }
    }

    120
}

/// Apply bold formatting if in TTY mode
fn bold_if_tty(text: &str, is_tty: bool) -> String {
    if is_tty {
        format!("{}{}{}", ANSI_BOLD, text, ANSI_RESET)
    } else {
        text.to_string()
    }
}

/// Stage label styled with the registry's color and weight (plain when not a TTY).
/// A `width` of 0 leaves the label unpadded.
pub fn styled_stage_label(stage: &StageValue, width: usize, is_tty: bool) -> String {
    let label = if width == 0 {
        stage.label()
    } else {
        format!("{:<width$}", truncate(&stage.label(), width), width = width)
    };
    if !is_tty {
        return label;
    }
    let style = stage.style();
    let mut prefix = String::new();
    if let Some(fg) = color_name_to_fg(style.color) {
        prefix.push_str(fg);
    }
    if style.weight == Weight::Bold {
        prefix.push_str(ANSI_BOLD);
    }
    if prefix.is_empty() {
        label
    } else {
        format!("{}{}{}", prefix, label, ANSI_RESET)
    }
}

/// Code column: "M07", or "-" for legacy values
fn stage_code_cell(stage: &StageValue) -> &str {
    match stage {
        StageValue::Canonical(code) => code.as_str(),
        StageValue::Legacy(_) => "-",
    }
}

/// Column widths for the deal list, fitted to the terminal
struct DealColumns {
    title: usize,
    client: usize,
    product: usize,
    stage: usize,
}

impl DealColumns {
    // ID, code, quantity and quote columns plus separators
    const FIXED: usize = 5 + 4 + 9 + 14 + 6;

    fn fit(total_width: usize) -> Self {
        let flexible = total_width.saturating_sub(Self::FIXED).max(48);
        Self {
            title: flexible * 30 / 100,
            client: flexible * 22 / 100,
            product: flexible * 20 / 100,
            stage: flexible * 28 / 100,
        }
    }
}

/// Format deal rows as a table
pub fn format_deal_table(rows: &[DealRow]) -> String {
    if rows.is_empty() {
        return "No deals found.\n".to_string();
    }
    let tty = is_tty();
    let cols = DealColumns::fit(get_terminal_width());
    let mut output = String::new();

    let header = format!(
        "{:<5} {:<4} {:<stage$} {:<title$} {:<client$} {:<product$} {:>9} {:>14}",
        "ID", "Code", "Stage", "Title", "Client", "Product", "Qty", "Quote (USD)",
        stage = cols.stage, title = cols.title, client = cols.client, product = cols.product,
    );
    output.push_str(&bold_if_tty(header.trim_end(), tty));
    output.push('\n');
    output.push_str(&"-".repeat(header.trim_end().chars().count()));
    output.push('\n');

    for row in rows {
        let deal = &row.deal;
        let line = format!(
            "{:<5} {:<4} {} {:<title$} {:<client$} {:<product$} {:>9} {:>14}",
            deal.id.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string()),
            stage_code_cell(&deal.current_stage),
            styled_stage_label(&deal.current_stage, cols.stage, tty),
            truncate(&deal.title, cols.title),
            truncate(row.client_name.as_deref().unwrap_or("-"), cols.client),
            truncate(row.product.as_deref().unwrap_or("-"), cols.product),
            row.quantity.map(|q| q.to_string()).unwrap_or_else(|| "-".to_string()),
            row.quote_total_usd.map(format_usd).unwrap_or_else(|| "-".to_string()),
            title = cols.title, client = cols.client, product = cols.product,
        );
        output.push_str(line.trim_end());
        output.push('\n');
    }
    output
}

/// JSON value for one deal row
pub fn deal_row_json(row: &DealRow) -> serde_json::Value {
    serde_json::json!({
        "id": row.deal.id,
        "uuid": row.deal.uuid,
        "title": row.deal.title,
        "stage": row.deal.current_stage.as_stored(),
        "stage_label": row.deal.current_stage.label(),
        "phase": row.deal.current_stage.phase().map(|p| p.as_str()),
        "client": row.client_name,
        "product": row.product,
        "quantity": row.quantity,
        "quote_total_usd": row.quote_total_usd,
        "created_ts": row.deal.created_ts,
        "modified_ts": row.deal.modified_ts,
    })
}

/// JSON value for one history entry
pub fn history_entry_json(entry: &StatusHistoryEntry) -> serde_json::Value {
    serde_json::json!({
        "id": entry.id,
        "deal_id": entry.deal_id,
        "previous_stage": entry.previous_stage.as_ref().map(|s| s.as_stored().to_string()),
        "new_stage": entry.new_stage.as_stored(),
        "new_stage_label": entry.new_stage.label(),
        "note": entry.note,
        "actor": entry.actor,
        "created_ts": entry.created_ts,
    })
}

fn history_line(entry: &StatusHistoryEntry, tty: bool) -> String {
    let from = entry
        .previous_stage
        .as_ref()
        .map(|s| s.as_stored().to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}  {:>3} -> {:<3} {}  {}{}",
        format_timestamp(entry.created_ts),
        from,
        entry.new_stage.as_stored(),
        styled_stage_label(&entry.new_stage, 24, tty),
        entry.note,
        entry.actor.as_ref().map(|a| format!("  ({})", a)).unwrap_or_default(),
    )
}

/// Format status history as lines, oldest first
pub fn format_history(entries: &[StatusHistoryEntry]) -> String {
    if entries.is_empty() {
        return "No history.\n".to_string();
    }
    let tty = is_tty();
    let mut output = String::new();
    for entry in entries {
        output.push_str(history_line(entry, tty).trim_end());
        output.push('\n');
    }
    output
}

/// Everything shown by `bao show`
pub struct DealSummary<'a> {
    pub deal: &'a Deal,
    pub client: Option<&'a Client>,
    pub specification: Option<&'a Specification>,
    pub quote: Option<&'a Quote>,
    pub rate: Option<&'a ExchangeRate>,
    pub history: &'a [StatusHistoryEntry],
}

/// Format detailed deal view
pub fn format_deal_summary(summary: &DealSummary) -> String {
    let tty = is_tty();
    let deal = summary.deal;
    let mut output = String::new();

    let header = format!(
        "Deal {}: {}",
        deal.id.map(|id| id.to_string()).unwrap_or_else(|| "?".to_string()),
        deal.title
    );
    output.push_str(&bold_if_tty(&header, tty));
    output.push('\n');
    output.push_str(&"=".repeat(header.chars().count().max(60)));
    output.push_str("\n\n");

    let phase = deal
        .current_stage
        .phase()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "legacy".to_string());
    output.push_str(&format!(
        "Stage:     {} {} ({})\n",
        stage_code_cell(&deal.current_stage),
        styled_stage_label(&deal.current_stage, 0, tty),
        phase
    ));
    match summary.client {
        Some(client) => {
            let mut line = format!("Client:    {}", client.display_name());
            if client.company.is_some() {
                line.push_str(&format!(" ({})", client.name));
            }
            if let Some(ref email) = client.email {
                line.push_str(&format!(" <{}>", email));
            }
            output.push_str(&line);
            output.push('\n');
        }
        None => output.push_str("Client:    (none)\n"),
    }
    output.push_str(&format!("Created:   {}\n", format_timestamp(deal.created_ts)));
    output.push_str(&format!("Modified:  {}\n\n", format_timestamp(deal.modified_ts)));

    output.push_str("Specification:\n");
    match summary.specification.filter(|s| !s.is_empty()) {
        Some(spec) => {
            let field = |v: &Option<String>| v.clone().unwrap_or_else(|| "(none)".to_string());
            output.push_str(&format!("  Product:     {}\n", field(&spec.product)));
            output.push_str(&format!("  Material:    {}\n", field(&spec.material)));
            output.push_str(&format!("  Dimensions:  {}\n", field(&spec.dimensions)));
            output.push_str(&format!(
                "  Quantity:    {}\n",
                spec.quantity.map(|q| q.to_string()).unwrap_or_else(|| "(none)".to_string())
            ));
        }
        None => output.push_str("  (none)\n"),
    }
    output.push('\n');

    output.push_str("Quote:\n");
    match summary.quote {
        Some(quote) => {
            output.push_str(&format!(
                "  {} x {} = {}  ({})\n",
                format_usd(quote.unit_price_usd),
                quote.quantity,
                format_usd(quote.total_usd()),
                format_date(quote.created_ts)
            ));
            if let Some(rate) = summary.rate {
                output.push_str(&format!(
                    "  {} at {:.2} JPY/USD ({})\n",
                    format_jpy(rate.convert(quote.total_usd())),
                    rate.rate,
                    rate.source
                ));
            }
        }
        None => output.push_str("  (none)\n"),
    }
    output.push('\n');

    output.push_str("History:\n");
    if summary.history.is_empty() {
        output.push_str("  (none)\n");
    }
    for entry in summary.history {
        output.push_str("  ");
        output.push_str(history_line(entry, tty).trim_end());
        output.push('\n');
    }
    output
}

/// Registry listing in canonical order
pub fn format_stage_registry() -> String {
    let tty = is_tty();
    let mut output = String::new();
    let mut current_phase: Option<StagePhase> = None;
    for code in StageCode::ALL {
        if current_phase != Some(code.phase()) {
            current_phase = Some(code.phase());
            if !output.is_empty() {
                output.push('\n');
            }
            output.push_str(&bold_if_tty(code.phase().title(), tty));
            output.push('\n');
        }
        output.push_str(&format!(
            "  {}  {}\n",
            code.as_str(),
            styled_stage_label(&StageValue::Canonical(code), 0, tty)
        ));
    }
    output
}

/// Deals grouped by phase; legacy values without a mapped stage go last
pub fn format_board(rows: &[DealRow]) -> String {
    let tty = is_tty();
    let mut groups: BTreeMap<Option<StagePhase>, Vec<&DealRow>> = BTreeMap::new();
    for phase in StagePhase::ALL {
        groups.insert(Some(phase), Vec::new());
    }
    for row in rows {
        groups.entry(row.deal.current_stage.phase()).or_default().push(row);
    }

    let mut output = String::new();
    let ordered = groups
        .iter()
        .filter(|(phase, _)| phase.is_some())
        .chain(groups.iter().filter(|(phase, _)| phase.is_none()));
    for (phase, deals) in ordered {
        let title = phase.map(|p| p.title()).unwrap_or("Unmapped");
        output.push_str(&bold_if_tty(&format!("{} ({})", title.to_uppercase(), deals.len()), tty));
        output.push('\n');
        for row in deals {
            output.push_str(&format!(
                "  #{:<4} {:<4} {}  {}\n",
                row.deal.id.unwrap_or(0),
                stage_code_cell(&row.deal.current_stage),
                styled_stage_label(&row.deal.current_stage, 24, tty),
                row.deal.title
            ));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, title: &str, stage: StageValue) -> DealRow {
        let mut deal = Deal::new(title.to_string(), StageCode::M01);
        deal.id = Some(id);
        deal.current_stage = stage;
        DealRow { deal, client_name: Some("Ito Paper".to_string()), product: None, quantity: Some(1200), quote_total_usd: Some(600.0) }
    }

    #[test]
    fn test_plain_stage_label_has_no_escape_codes() {
        let label = styled_stage_label(&StageValue::Canonical(StageCode::M09), 20, false);
        assert_eq!(label, format!("{:<20}", "Quote accepted"));
    }

    #[test]
    fn test_tty_stage_label_uses_registry_style() {
        let label = styled_stage_label(&StageValue::Canonical(StageCode::M09), 0, true);
        assert!(label.starts_with(ANSI_FG_BLUE));
        assert!(label.contains(ANSI_BOLD));
        assert!(label.ends_with(ANSI_RESET));
    }

    #[test]
    fn test_deal_table_renders_legacy_rows() {
        let rows = vec![
            row(1, "Cartons", StageValue::Canonical(StageCode::M16)),
            row(2, "Old order", StageValue::Legacy("weird-status".to_string())),
        ];
        let table = format_deal_table(&rows);
        assert!(table.contains("In production"));
        assert!(table.contains("weird-status"));
        assert!(table.contains("$600.00"));
    }

    #[test]
    fn test_board_groups_by_phase() {
        let rows = vec![
            row(1, "Cartons", StageValue::Canonical(StageCode::M16)),
            row(2, "Old order", StageValue::Legacy("lost".to_string())),
        ];
        let board = format_board(&rows);
        assert!(board.contains("FACTORY (1)"));
        assert!(board.contains("SALES (0)"));
        assert!(board.contains("UNMAPPED (1)"));
        let factory = board.find("FACTORY").unwrap();
        let unmapped = board.find("UNMAPPED").unwrap();
        assert!(factory < unmapped);
    }

    #[test]
    fn test_stage_registry_lists_all_codes_in_order() {
        let listing = format_stage_registry();
        let positions: Vec<usize> = StageCode::ALL.iter().map(|c| listing.find(c.as_str()).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }
}
