use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use biblio_loans::infrastructure::AppState;
use biblio_loans::{config, db, seed, services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "biblio_loans=debug,sea_orm=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    // Check for --profile CLI argument
    let args: Vec<String> = std::env::args().collect();
    if let Some(pos) = args.iter().position(|arg| arg == "--profile") {
        if let Some(val) = args.get(pos + 1) {
            // Single-threaded at this point: no other thread reads the environment yet
            unsafe { std::env::set_var("PROFILE", val) };
        }
    }

    let config = config::Config::from_env();

    let db = db::connect(&config)
        .await
        .with_context(|| format!("failed to initialize database at {}", config.database_url))?;
    tracing::info!(profile = %config.profile, "Loan database ready");

    if config.seed_demo {
        tracing::info!("Seeding demo data...");
        seed::seed_demo_data(&db)
            .await
            .context("failed to seed demo data")?;
        tracing::info!("Demo data seeded successfully.");
    }

    let state = AppState::new(db);

    let loans = state.loan_repo.find_all().await?;
    tracing::info!(
        active_loans = loans.len(),
        latest = ?loans.first().map(|l| l.id),
        "Loan ledger loaded"
    );

    let mismatches = services::audit_availability(state.db()).await?;
    if mismatches.is_empty() {
        tracing::info!("Book availability matches the loan ledger");
    }
    for m in &mismatches {
        tracing::warn!(
            book_id = m.book_id,
            available = m.available,
            loan_count = m.loan_count,
            "Book availability disagrees with its loans"
        );
    }

    Ok(())
}
