//! Prompts-related command implementations

use anyhow::{bail, Result};
use cupom_core::prompts::{default_prompts_dir, PromptId, PromptLibrary};

/// List all available prompts and their override status
pub fn cmd_prompts_list() -> Result<()> {
    let library = PromptLibrary::new()?;
    let prompts = library.list();

    println!("Prompts disponíveis:\n");

    println!(
        "{:<25} {:>7}  {:<10}  {}",
        "ID", "VERSÃO", "RESPOSTA", "ORIGEM"
    );
    println!("{}", "-".repeat(60));

    for info in prompts {
        let override_status = if info.has_override {
            "✓ Personalizado"
        } else {
            "Padrão"
        };

        println!(
            "{:<25} {:>7}  {:<10}  {}",
            info.id,
            info.version,
            info.response_format.as_str(),
            override_status
        );
    }

    println!();
    println!(
        "Diretório de personalização: {}",
        default_prompts_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(indisponível)".to_string())
    );

    println!();
    println!("Para personalizar um prompt:");
    println!("  1. Copie o padrão para o diretório de personalização como <ID>.md");
    println!("  2. Edite o texto (o formato de resposta não pode ser alterado)");
    println!("  3. Execute o cupom novamente; os arquivos são lidos na inicialização");

    Ok(())
}

/// Show the content of a specific prompt
pub fn cmd_prompts_show(prompt_id: &str) -> Result<()> {
    let library = PromptLibrary::new()?;

    let id: PromptId = match prompt_id.parse() {
        Ok(id) => id,
        Err(_) => {
            let known: Vec<&str> = PromptId::all().iter().map(|id| id.as_str()).collect();
            bail!(
                "Prompt desconhecido: {}. Disponíveis: {}",
                prompt_id,
                known.join(", ")
            );
        }
    };

    let prompt = library.get(id)?;

    println!("Prompt: {}", prompt.metadata.id);
    println!("Versão: {}", prompt.metadata.version);
    println!("Resposta: {}", prompt.metadata.response_format.as_str());
    println!(
        "Origem: {}",
        if prompt.is_override {
            "Personalizado"
        } else {
            "Padrão"
        }
    );

    if let Some(ref path) = prompt.override_path {
        println!("Arquivo: {}", path.display());
    }

    println!();
    println!("--- Conteúdo ---");
    println!("{}", prompt.content);

    Ok(())
}

/// Show the path where prompt overrides should be placed
pub fn cmd_prompts_path() -> Result<()> {
    match default_prompts_dir() {
        Some(path) => {
            println!("{}", path.display());

            if !path.exists() {
                eprintln!();
                eprintln!("Obs.: este diretório ainda não existe.");
                eprintln!("Crie-o para adicionar prompts personalizados.");
            }
        }
        None => {
            eprintln!("Não foi possível determinar o diretório de prompts.");
            eprintln!("O diretório de dados não está disponível neste sistema.");
        }
    }

    Ok(())
}
