//! Receipts command: one month of records

use anyhow::{Context, Result};
use cupom_core::{Category, MonthKey, Tracker};

use super::{format_brl, format_date_time, truncate};

/// List a month's receipts (optionally one category) with the month total
pub async fn cmd_receipts(
    tracker: &Tracker,
    month: MonthKey,
    category: Option<Category>,
) -> Result<()> {
    let receipts = tracker
        .month_receipts(month, category)
        .await
        .with_context(|| format!("Falha ao listar os registros de {}", month))?;
    let total: f64 = receipts.iter().map(|r| r.total).sum();

    println!();
    println!("🧾 Registros — {}", month.label_pt_br());
    if let Some(category) = category {
        println!("   Categoria: {}", category);
    }
    println!("   Total do mês: {}", format_brl(total));
    println!("   ─────────────────────────────────────────────────────────────");

    if receipts.is_empty() {
        println!("   Sem registros.");
        return Ok(());
    }

    println!(
        "   {:16}  {:28}  {:>12}  {}",
        "Data", "Estabelecimento", "Valor", "Categoria"
    );
    for receipt in &receipts {
        println!(
            "   {:16}  {:28}  {:>12}  {}",
            format_date_time(&receipt.date_time),
            truncate(&receipt.merchant, 28),
            format_brl(receipt.total),
            receipt.category
        );
    }

    println!();
    println!("   {} registro(s)", receipts.len());
    Ok(())
}
