//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;
use std::path::Path;

use clap::Parser;
use cupom_core::test_utils::{MockFirestoreServer, MockGeminiServer};
use cupom_core::{
    AIClient, Category, Config, MockBackend, MonthKey, PromptLibrary, ReceiptAI, StoreClient,
    StoreKind, Tracker,
};

use crate::cli::{Cli, Commands, PromptsAction};
use crate::commands::{self, truncate};

fn mock_tracker(mock: MockBackend) -> Tracker {
    let store = cupom_core::LocalStore::in_memory().unwrap();
    let prompts = PromptLibrary::embedded_only().unwrap();
    Tracker::new(
        StoreClient::Local(store),
        Some(ReceiptAI::new(AIClient::Mock(mock), prompts)),
    )
}

fn write_image(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("cupom.jpg");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(b"\xff\xd8\xff\xe0 fake jpeg").unwrap();
    path
}

fn march() -> MonthKey {
    MonthKey::new(2025, 3).unwrap()
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_capture_with_save() {
    let cli = Cli::try_parse_from(["cupom", "capture", "photo.jpg", "--save"]).unwrap();
    match cli.command {
        Commands::Capture { image, save } => {
            assert_eq!(image, Path::new("photo.jpg"));
            assert!(save);
        }
        _ => panic!("expected capture"),
    }
}

#[test]
fn test_parse_receipts_filters() {
    let cli = Cli::try_parse_from([
        "cupom",
        "receipts",
        "--month",
        "2025-03",
        "--category",
        "mercado",
    ])
    .unwrap();
    match cli.command {
        Commands::Receipts { month, category } => {
            assert_eq!(month.as_deref(), Some("2025-03"));
            assert_eq!(category.as_deref(), Some("mercado"));
        }
        _ => panic!("expected receipts"),
    }
}

#[test]
fn test_parse_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["cupom", "insights", "-g", "--config", "alt.toml", "-v"]).unwrap();
    assert!(cli.verbose);
    assert_eq!(cli.config.as_deref(), Some(Path::new("alt.toml")));
    match cli.command {
        Commands::Insights {
            month,
            generate,
            history,
        } => {
            assert!(month.is_none());
            assert!(generate);
            assert!(!history);
        }
        _ => panic!("expected insights"),
    }
}

#[test]
fn test_parse_prompts_show() {
    let cli = Cli::try_parse_from(["cupom", "prompts", "show", "extract_receipt"]).unwrap();
    match cli.command {
        Commands::Prompts {
            action: Some(PromptsAction::Show { prompt_id }),
        } => assert_eq!(prompt_id, "extract_receipt"),
        _ => panic!("expected prompts show"),
    }
}

#[test]
fn test_capture_requires_image() {
    assert!(Cli::try_parse_from(["cupom", "capture"]).is_err());
}

// ========== Month and Category Tests ==========

#[test]
fn test_resolve_month_keywords() {
    let current = march();
    assert_eq!(commands::resolve_month_at(None, current).unwrap(), current);
    assert_eq!(
        commands::resolve_month_at(Some("current"), current).unwrap(),
        current
    );
    assert_eq!(
        commands::resolve_month_at(Some("prev"), current).unwrap(),
        MonthKey::new(2025, 2).unwrap()
    );
    assert_eq!(
        commands::resolve_month_at(Some("PREVIOUS"), MonthKey::new(2025, 1).unwrap()).unwrap(),
        MonthKey::new(2024, 12).unwrap()
    );
}

#[test]
fn test_resolve_month_explicit() {
    assert_eq!(
        commands::resolve_month_at(Some("2024-11"), march()).unwrap(),
        MonthKey::new(2024, 11).unwrap()
    );
    assert!(commands::resolve_month_at(Some("2025-3"), march()).is_err());
    assert!(commands::resolve_month_at(Some("março"), march()).is_err());
}

#[test]
fn test_resolve_month_rejects_future() {
    let err = commands::resolve_month_at(Some("2025-04"), march()).unwrap_err();
    assert!(err.to_string().contains("futuro"));
}

#[test]
fn test_parse_category() {
    assert_eq!(commands::parse_category(None).unwrap(), None);
    assert_eq!(commands::parse_category(Some("all")).unwrap(), None);
    assert_eq!(
        commands::parse_category(Some("Saude")).unwrap(),
        Some(Category::Saude)
    );

    let err = commands::parse_category(Some("padaria")).unwrap_err();
    assert!(err.to_string().contains("alimentacao"));
}

// ========== Formatting Tests ==========

#[test]
fn test_format_brl() {
    assert_eq!(commands::format_brl(0.0), "R$ 0,00");
    assert_eq!(commands::format_brl(45.9), "R$ 45,90");
    assert_eq!(commands::format_brl(1234.5), "R$ 1.234,50");
    assert_eq!(commands::format_brl(1_000_000.0), "R$ 1.000.000,00");
    assert_eq!(commands::format_brl(-3.456), "-R$ 3,46");
}

#[test]
fn test_render_bar() {
    assert_eq!(commands::render_bar(100.0, 100.0, 10), "██████████");
    assert_eq!(commands::render_bar(50.0, 100.0, 10).chars().count(), 5);
    // Small values stay visible
    assert_eq!(commands::render_bar(0.1, 100.0, 10).chars().count(), 1);
    assert_eq!(commands::render_bar(0.0, 100.0, 10), "");
    assert_eq!(commands::render_bar(10.0, 0.0, 10), "");
}

#[test]
fn test_format_date_time_fallback() {
    assert_eq!(commands::format_date_time("ontem"), "ontem");
    assert_eq!(
        commands::format_date_time("2025-03-14T18:30:00.000Z").len(),
        "14/03/2025 18:30".len()
    );
}

#[test]
fn test_truncate() {
    assert_eq!(truncate("Padaria", 10), "Padaria");
    assert_eq!(truncate("Supermercado São João", 10), "Superme...");
    assert_eq!(truncate("Açaí da Esquina", 7), "Açaí...");
}

#[test]
fn test_report_error_permission() {
    let err = commands::report_error(
        cupom_core::Error::PermissionDenied("cannot read foto.jpg".into()),
        "Capture failed",
    );
    assert!(err.to_string().starts_with("Permissão necessária"));

    let err = commands::report_error(cupom_core::Error::Model("boom".into()), "Capture failed");
    assert_eq!(err.to_string(), "Capture failed");
}

// ========== Capture Command Tests ==========

#[tokio::test]
async fn test_cmd_capture_without_save() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path());
    let tracker = mock_tracker(MockBackend::new());

    let saved = commands::cmd_capture(&tracker, &image, false).await.unwrap();
    assert!(saved.is_none());

    let month = MonthKey::new(2024, 1).unwrap();
    assert!(tracker.month_receipts(month, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_cmd_capture_with_save() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path());
    let mock = MockBackend::new().with_response(
        r#"{"total": "45.90", "merchant": "Padaria X", "dateTime": "2025-03-14T10:00:00Z", "category": "lanchonete"}"#,
    );
    let tracker = mock_tracker(mock.clone());

    let saved = commands::cmd_capture(&tracker, &image, true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.merchant, "Padaria X");
    assert_eq!(saved.total, 45.9);
    assert_eq!(saved.category, Category::Alimentacao);

    let listed = tracker
        .month_receipts(MonthKey::of_iso(&saved.date_time).unwrap(), None)
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);

    // The image travels as inline data
    assert!(mock.requests()[0].has_image());
}

#[tokio::test]
async fn test_cmd_capture_missing_file() {
    let tracker = mock_tracker(MockBackend::new());
    let result = commands::cmd_capture(&tracker, Path::new("/nonexistent/cupom.jpg"), true).await;
    assert!(result.unwrap_err().to_string().contains("Arquivo não encontrado"));
}

#[tokio::test]
async fn test_cmd_capture_without_ai() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path());
    let tracker = Tracker::new(
        StoreClient::Local(cupom_core::LocalStore::in_memory().unwrap()),
        None,
    );

    let err = commands::cmd_capture(&tracker, &image, true)
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("GEMINI_API_KEY"));
}

// ========== Receipts and Insights Command Tests ==========

async fn seed_march(tracker: &Tracker) {
    for (date, merchant, category, total) in [
        ("2025-03-03T12:00:00.000Z", "Padaria", Category::Alimentacao, 18.5),
        ("2025-03-12T12:00:00.000Z", "Carrefour", Category::Mercado, 230.0),
        ("2025-03-20T12:00:00.000Z", "Cinema", Category::Lazer, 60.0),
    ] {
        tracker
            .save(&cupom_core::ReceiptInput {
                total,
                date_time: date.to_string(),
                merchant: merchant.to_string(),
                category,
            })
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_cmd_receipts() {
    let tracker = mock_tracker(MockBackend::new());
    seed_march(&tracker).await;

    assert!(commands::cmd_receipts(&tracker, march(), None).await.is_ok());
    assert!(commands::cmd_receipts(&tracker, march(), Some(Category::Lazer))
        .await
        .is_ok());
    // Empty month
    assert!(commands::cmd_receipts(&tracker, march().prev(), None)
        .await
        .is_ok());
}

#[tokio::test]
async fn test_cmd_insights_generate_saves() {
    let mock = MockBackend::new().with_response("1. Mercado foi o maior gasto.");
    let tracker = mock_tracker(mock.clone());
    seed_march(&tracker).await;

    commands::cmd_insights(&tracker, march(), true, true)
        .await
        .unwrap();

    let history = tracker.insight_history(Some(march())).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].text, "1. Mercado foi o maior gasto.");

    let prompt = mock.requests()[0].parts[1].as_text().unwrap().to_string();
    assert!(prompt.contains(r#""total":308.5"#));
}

#[tokio::test]
async fn test_cmd_insights_view_only_does_not_call_model() {
    let mock = MockBackend::new();
    let tracker = mock_tracker(mock.clone());
    seed_march(&tracker).await;

    commands::cmd_insights(&tracker, march(), false, true)
        .await
        .unwrap();
    assert!(mock.requests().is_empty());
    assert!(tracker.insight_history(None).await.unwrap().is_empty());
}

// ========== Configuration and Status Tests ==========

#[tokio::test]
async fn test_build_tracker_from_mock_config() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("cupom.db");

    let mut config = Config::embedded().unwrap();
    config.ai.backend = "mock".parse().unwrap();
    config.store.backend = StoreKind::Local;
    config.store.local.path = Some(db_path.clone());

    let tracker = commands::build_tracker(&config).unwrap();
    assert!(tracker.ai().is_ok());
    assert_eq!(tracker.store().backend_name(), "local");
    assert!(db_path.exists());

    assert!(commands::cmd_status(&config).await.is_ok());
}

#[test]
fn test_build_tracker_firestore_requires_project() {
    let config = Config::embedded().unwrap();
    let err = commands::build_tracker(&config).unwrap_err();
    assert!(format!("{:#}", err).contains("FIRESTORE_PROJECT_ID"));
}

#[tokio::test]
async fn test_cmd_status_does_not_create_local_store() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("novo").join("cupom.db");

    let mut config = Config::embedded().unwrap();
    config.ai.backend = "mock".parse().unwrap();
    config.store.backend = StoreKind::Local;
    config.store.local.path = Some(db_path.clone());

    assert_eq!(
        commands::store_location(&config.store),
        db_path.display().to_string()
    );
    commands::cmd_status(&config).await.unwrap();
    assert!(!db_path.exists());
    assert!(!dir.path().join("novo").exists());
}

#[test]
fn test_store_location_firestore() {
    let mut config = Config::embedded().unwrap();
    assert!(commands::store_location(&config.store).contains("FIRESTORE_PROJECT_ID"));

    config.store.firestore.project_id = Some("cupom-prod".to_string());
    assert_eq!(
        commands::store_location(&config.store),
        "https://firestore.googleapis.com (projects/cupom-prod/databases/(default)/documents)"
    );
}

#[test]
fn test_load_config_missing_file() {
    let result = commands::load_config(Some(Path::new("/nonexistent/cupom/config.toml")));
    assert!(result.is_err());
}

#[test]
fn test_prompts_commands() {
    assert!(commands::cmd_prompts_list().is_ok());
    assert!(commands::cmd_prompts_show("generate_insights").is_ok());
    let err = commands::cmd_prompts_show("nope").unwrap_err();
    assert!(err.to_string().contains("extract_receipt"));
    assert!(commands::cmd_prompts_path().is_ok());
}

// ========== End-to-end over HTTP ==========

#[tokio::test]
async fn test_capture_against_mock_services() {
    let gemini = MockGeminiServer::start().await;
    let firestore = MockFirestoreServer::start().await;
    gemini.push_reply(
        r#"{"total": 89.9, "merchant": "Drogaria Y", "dateTime": "2025-03-08T15:00:00Z", "category": "farmacia"}"#,
    );

    let mut config = Config::embedded().unwrap();
    config.ai.gemini.api_key = Some("test-key".to_string());
    config.ai.gemini.base_url = gemini.url();
    config.store.firestore.project_id = Some("cupom-test".to_string());
    config.store.firestore.base_url = firestore.url();

    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path());
    let tracker = commands::build_tracker(&config).unwrap();

    let saved = commands::cmd_capture(&tracker, &image, true)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(saved.category, Category::Saude);
    assert_eq!(firestore.documents("receipts").len(), 1);
    assert_eq!(gemini.requests().len(), 1);

    let month = MonthKey::of_iso(&saved.date_time).unwrap();
    commands::cmd_receipts(&tracker, month, None).await.unwrap();
    assert!(!firestore.queries().is_empty());
}
