//! Capture command: photo in, structured receipt out

use std::path::Path;

use anyhow::{bail, Result};
use cupom_core::{Receipt, ReceiptInput, Tracker};

use super::{format_brl, format_date_time, report_error};

/// Extract a receipt from an image file, saving it when `save` is set
///
/// Returns the saved receipt, if any.
pub async fn cmd_capture(tracker: &Tracker, image: &Path, save: bool) -> Result<Option<Receipt>> {
    if !image.exists() {
        bail!("Arquivo não encontrado: {}", image.display());
    }

    println!("📷 Processando imagem…");
    let input = tracker
        .capture_file(image)
        .await
        .map_err(|e| report_error(e, "Não foi possível extrair os dados do cupom"))?;

    print_extracted(&input);

    if !save {
        println!();
        println!("   Não salvo. Use --save para registrar este cupom.");
        return Ok(None);
    }

    let saved = tracker
        .save(&input)
        .await
        .map_err(|e| report_error(e, "Falha ao salvar o registro"))?;
    println!();
    println!("✅ Registro salvo ({})", saved.id);
    Ok(Some(saved))
}

fn print_extracted(input: &ReceiptInput) {
    println!();
    println!("🧾 Dados extraídos");
    println!("   ─────────────────────────────────────────────");
    println!("   Estabelecimento: {}", input.merchant);
    println!("   Valor total:     {}", format_brl(input.total));
    println!("   Data/Hora:       {}", format_date_time(&input.date_time));
    println!("   Categoria:       {}", input.category);
}
