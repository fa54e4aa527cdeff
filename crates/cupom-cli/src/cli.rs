//! CLI argument definitions using clap
//!
//! This module contains the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Cupom - Fotografe cupons fiscais e acompanhe os gastos do mês
#[derive(Parser)]
#[command(name = "cupom")]
#[command(about = "Captura de cupons e insights de gastos mensais", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Arquivo de configuração (padrão: ~/.config/cupom/config.toml, se existir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Ativa logs detalhados
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extrai os dados de compra da foto de um cupom
    Capture {
        /// Imagem JPEG do cupom
        image: PathBuf,

        /// Salva o registro extraído
        #[arg(short, long)]
        save: bool,
    },

    /// Lista os registros do mês e o total
    Receipts {
        /// Mês: YYYY-MM, current, prev (padrão: current)
        #[arg(short, long)]
        month: Option<String>,

        /// Mostra só uma categoria (alimentacao, transporte, lazer, saude, educacao, mercado, outros)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Gastos por categoria, com insights gerados por IA
    Insights {
        /// Mês: YYYY-MM, current, prev (padrão: current)
        #[arg(short, long)]
        month: Option<String>,

        /// Pede insights ao modelo e os salva
        #[arg(short, long)]
        generate: bool,

        /// Mostra os insights gerados anteriormente
        #[arg(long)]
        history: bool,
    },

    /// Mostra os backends configurados e verifica a IA
    Status,

    /// Prompts de IA (listar, mostrar, personalizar)
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// Lista os prompts e se estão personalizados
    List,

    /// Mostra o conteúdo de um prompt
    Show {
        /// ID do prompt (ex.: extract_receipt, generate_insights)
        prompt_id: String,
    },

    /// Mostra o diretório de prompts personalizados
    Path,
}
