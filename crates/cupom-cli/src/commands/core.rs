//! Shared command utilities
//!
//! This module contains:
//! - `load_config` / `build_tracker` - turn configuration into clients
//! - `resolve_month` / `parse_category` - argument parsing
//! - `format_brl` / `render_bar` / `format_date_time` - terminal output helpers

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use cupom_core::month::parse_iso_datetime;
use cupom_core::{AIClient, Category, Config, MonthKey, PromptLibrary, ReceiptAI, StoreClient, Tracker};
use tracing::debug;

/// Width of the category bars in `cupom insights`
pub const BAR_WIDTH: usize = 30;

/// Load layered configuration (embedded defaults, config file, environment)
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = Config::load(path).context("Falha ao carregar a configuração")?;
    if let Some(ref source) = config.source {
        debug!(path = %source.display(), "Using config file");
    }
    Ok(config)
}

/// Build the model client, if one is configured
pub fn build_ai(config: &Config) -> Result<Option<ReceiptAI>> {
    let Some(client) = AIClient::from_config(&config.ai).context("Falha ao configurar o backend de IA")?
    else {
        return Ok(None);
    };
    let prompts = PromptLibrary::new().context("Falha ao carregar os prompts")?;
    Ok(Some(ReceiptAI::new(client, prompts)))
}

/// Open the configured store and attach the model client
pub fn build_tracker(config: &Config) -> Result<Tracker> {
    let store = StoreClient::from_config(&config.store).with_context(|| {
        format!(
            "Falha ao abrir o armazenamento {}",
            config.store.backend.as_str()
        )
    })?;
    Ok(Tracker::new(store, build_ai(config)?))
}

/// Resolve a month argument against the current month
pub fn resolve_month(arg: Option<&str>) -> Result<MonthKey> {
    resolve_month_at(arg, MonthKey::current())
}

/// Resolve `YYYY-MM`, `current` or `prev`/`previous`; months after `current` are rejected
pub fn resolve_month_at(arg: Option<&str>, current: MonthKey) -> Result<MonthKey> {
    let month = match arg.map(|s| s.trim().to_lowercase()) {
        None => current,
        Some(s) => match s.as_str() {
            "" | "current" => current,
            "prev" | "previous" => current.prev(),
            other => other
                .parse::<MonthKey>()
                .map_err(|e| anyhow!("{}. Use YYYY-MM, current ou prev", e))?,
        },
    };

    if month > current {
        bail!(
            "{} é um mês futuro (o mês mais recente é {})",
            month,
            current
        );
    }
    Ok(month)
}

/// Parse a `--category` filter; `all` means no filter
pub fn parse_category(arg: Option<&str>) -> Result<Option<Category>> {
    match arg.map(str::trim) {
        None | Some("") | Some("all") => Ok(None),
        Some(name) => name.parse::<Category>().map(Some).map_err(|e| {
            let names: Vec<&str> = Category::all().iter().map(|c| c.as_str()).collect();
            anyhow!("{}. Categorias: {}", e, names.join(", "))
        }),
    }
}

/// Format an amount in reais, e.g. `R$ 1.234,50`
pub fn format_brl(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}R$ {},{:02}", sign, grouped, cents % 100)
}

/// Horizontal bar scaled against the largest value; non-zero values get at least one block
pub fn render_bar(value: f64, max: f64, width: usize) -> String {
    if max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let filled = ((value / max) * width as f64).round() as usize;
    "█".repeat(filled.clamp(1, width))
}

/// Show an ISO timestamp in local time, falling back to the raw text
pub fn format_date_time(iso: &str) -> String {
    match parse_iso_datetime(iso) {
        Some(dt) => dt.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string(),
        None => iso.to_string(),
    }
}

/// Convert a core error for display, keeping permission problems distinct
pub fn report_error(err: cupom_core::Error, action: &str) -> anyhow::Error {
    match err {
        cupom_core::Error::PermissionDenied(detail) => {
            anyhow!("Permissão necessária: {}", detail)
        }
        other => anyhow::Error::new(other).context(action.to_string()),
    }
}
