//! Status command: configured backends and AI health

use anyhow::Result;
use cupom_core::config::{default_config_path, StoreConfig};
use cupom_core::{AIBackend, AIClient, Config, StoreKind};

pub async fn cmd_status(config: &Config) -> Result<()> {
    println!();
    println!("📊 Cupom Status");
    println!("   ─────────────────────────────────────────────────────────────");

    match (&config.source, default_config_path()) {
        (Some(source), _) => println!("   Configuração: {}", source.display()),
        (None, Some(default)) => println!(
            "   Configuração: padrão embutido ({} não encontrado)",
            default.display()
        ),
        (None, None) => println!("   Configuração: padrão embutido"),
    }

    // Store
    println!();
    println!("   Armazenamento: {}", config.store.backend.as_str());
    println!("   Local: {}", store_location(&config.store));

    // AI backend
    println!();
    println!("   Backend de IA: {}", config.ai.backend.as_str());
    match AIClient::from_config(&config.ai) {
        Ok(Some(client)) => {
            println!("   Modelo: {}", client.model());
            println!("   Host: {}", client.host());
            if client.health_check().await {
                println!("   ✅ Backend de IA acessível");
            } else {
                println!("   ❌ Backend de IA inacessível");
            }
        }
        Ok(None) => {
            println!("   ⚠️  Não configurado");
            println!("      Defina GEMINI_API_KEY (ou AI_BACKEND=mock) para capturar cupons");
        }
        Err(e) => println!("   ❌ {}", e),
    }

    Ok(())
}

/// Where the configured store lives, without opening it
pub fn store_location(store: &StoreConfig) -> String {
    match store.backend {
        StoreKind::Local => store.local.resolved_path().display().to_string(),
        StoreKind::Firestore => match store.firestore.project_id.as_deref() {
            Some(project) if !project.trim().is_empty() => format!(
                "{} (projects/{}/databases/{}/documents)",
                store.firestore.effective_base_url(),
                project,
                store.firestore.database
            ),
            _ => "⚠️  FIRESTORE_PROJECT_ID não definido".to_string(),
        },
    }
}
