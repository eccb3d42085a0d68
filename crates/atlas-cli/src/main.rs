use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use atlas_core::{
    BodyweightEntry, CalculatorEntry, CalculatorService, Gender, ReferenceCatalog, UserProfile,
};
use atlas_storage::{
    init_reference_db, init_test_reference_db, init_user_db, SqliteReferenceRepository,
    SqliteUserStateRepository,
};

/// Atlas CLI - Development and testing tool for the strength ranking core
#[derive(Parser)]
#[command(name = "atlas")]
#[command(about = "Atlas CLI tool for testing and development", long_about = None)]
struct Cli {
    /// Path to the reference database
    #[arg(long, default_value = "reference.db")]
    reference_db: String,

    /// Path to the user database
    #[arg(long, default_value = "user.db")]
    user_db: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create both databases and seed the sample reference catalog
    Seed,
    /// Load every reference table into the in-process catalog
    Prewarm,
    /// Create a user profile with a bodyweight measurement
    CreateUser {
        /// User ID
        user_id: Uuid,
        /// Gender (male, female)
        gender: String,
        /// Bodyweight in kilograms
        bodyweight_kg: f64,
        /// Rank calculator credits
        #[arg(long, default_value_t = 3)]
        balance: i64,
        /// Premium users are not metered
        #[arg(long)]
        premium: bool,
    },
    /// Run the manual rank calculator for one entry
    Calculate {
        /// User ID
        user_id: Uuid,
        /// Exercise ID
        exercise_id: Uuid,
        /// Weight in kilograms
        weight_kg: f64,
        /// Repetitions
        reps: i32,
    },
    /// Rank every set of a persisted workout session
    Finalize {
        /// User ID
        user_id: Uuid,
        /// Session ID
        session_id: Uuid,
    },
    /// Fail processing audits older than the stale timeout
    SweepAudits,
    /// Zero the leaderboard channel (epoch boundary)
    ResetLeaderboard,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Seed => {
            init_test_reference_db(&cli.reference_db).await?;
            init_user_db(&cli.user_db).await?;
            println!("Seeded {} and {}", cli.reference_db, cli.user_db);
            Ok(())
        }
        Commands::Prewarm => {
            let catalog = catalog(&cli.reference_db).await?;
            catalog.prewarm().await;
            println!("Reference catalog prewarmed");
            Ok(())
        }
        Commands::CreateUser {
            user_id,
            gender,
            bodyweight_kg,
            balance,
            premium,
        } => {
            let repo = user_repo(&cli.user_db).await?;
            let gender = Gender::parse(&gender).map_err(|e| anyhow::anyhow!(e))?;

            repo.upsert_user_profile(&UserProfile {
                id: user_id,
                gender,
                is_premium: premium,
                rank_calculator_balance: balance,
            })
            .await?;
            repo.insert_bodyweight(&BodyweightEntry {
                user_id,
                weight_kg: bodyweight_kg,
                measured_at: chrono::Utc::now(),
            })
            .await?;

            println!("Created user {}", user_id);
            Ok(())
        }
        Commands::Calculate {
            user_id,
            exercise_id,
            weight_kg,
            reps,
        } => {
            let service = service(&cli).await?;
            let results = service
                .calculate(
                    user_id,
                    CalculatorEntry {
                        exercise_id,
                        weight_kg,
                        reps,
                    },
                )
                .await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        Commands::Finalize {
            user_id,
            session_id,
        } => {
            let service = service(&cli).await?;
            let results = service.finalize_session(user_id, session_id).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        Commands::SweepAudits => {
            let service = service(&cli).await?;
            let swept = service.sweep_stale_audits().await?;
            println!("Swept {} stale audits", swept);
            Ok(())
        }
        Commands::ResetLeaderboard => {
            let service = service(&cli).await?;
            let reset = service.reset_leaderboard_epoch().await?;
            println!("Reset leaderboard on {} rows", reset);
            Ok(())
        }
    }
}

async fn catalog(reference_db: &str) -> Result<Arc<ReferenceCatalog>> {
    let pool = init_reference_db(reference_db).await?;
    Ok(Arc::new(ReferenceCatalog::new(Arc::new(
        SqliteReferenceRepository::new(pool),
    ))))
}

async fn user_repo(user_db: &str) -> Result<SqliteUserStateRepository> {
    let pool = init_user_db(user_db).await?;
    Ok(SqliteUserStateRepository::new(pool))
}

async fn service(cli: &Cli) -> Result<CalculatorService> {
    let catalog = catalog(&cli.reference_db).await?;
    let repo = Arc::new(user_repo(&cli.user_db).await?);
    Ok(CalculatorService::new(catalog, repo))
}
