//! Insights command: category bars, generation and history

use anyhow::Result;
use cupom_core::{MonthKey, Tracker};

use super::{format_brl, format_date_time, render_bar, report_error, BAR_WIDTH};

pub async fn cmd_insights(
    tracker: &Tracker,
    month: MonthKey,
    generate: bool,
    history: bool,
) -> Result<()> {
    let report = tracker
        .month_report(month)
        .await
        .map_err(|e| report_error(e, "Falha ao carregar o mês"))?;

    println!();
    println!("📊 Insights — {}", month.label_pt_br());
    println!("   Total do mês: {}", format_brl(report.summary.total));
    println!("   ─────────────────────────────────────────────────────────────");

    let categories = report.categories();
    if categories.is_empty() {
        println!("   Nenhum dado para o mês.");
    } else {
        let max = report.summary.max_category_total();
        for spending in &categories {
            println!(
                "   {:12} {:>14}  {:5.1}%  {}",
                spending.category.as_str(),
                format_brl(spending.amount),
                spending.percentage,
                render_bar(spending.amount, max, BAR_WIDTH)
            );
        }
    }

    if generate {
        println!();
        println!("🤖 Gerando…");
        let insight = tracker
            .generate_insights(month)
            .await
            .map_err(|e| report_error(e, "Falha ao gerar insights"))?;
        println!();
        println!("💡 Insights");
        for line in insight.text.lines() {
            println!("   {}", line);
        }
    }

    if history {
        let insights = tracker
            .insight_history(Some(month))
            .await
            .map_err(|e| report_error(e, "Falha ao carregar o histórico de insights"))?;
        println!();
        println!("🗂  Histórico ({})", insights.len());
        if insights.is_empty() {
            println!("   Nenhum insight salvo para {}. Use --generate para criar um.", month);
        }
        for insight in &insights {
            println!();
            println!("   {}", format_date_time(&insight.created_at));
            for line in insight.text.lines() {
                println!("   {}", line);
            }
        }
    }

    Ok(())
}
