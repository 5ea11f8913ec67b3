//! Operator CLI for the segment store.
//!
//! Talks to the same database as the server and prints one JSON object per
//! command on stdout.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use segment_core::common::UserId;
use segment_core::config::Config;
use segment_core::domains::memberships::actions::{render_csv, report, user_segment_slugs};
use segment_core::domains::segments::actions::{create_segment, delete_segment};
use segment_core::domains::users::actions::create_user;
use segment_core::kernel::ServerDeps;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

#[derive(Parser)]
#[command(name = "segment_cli")]
#[command(about = "Segment membership administration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate,

    /// Create a user and print its id
    CreateUser,

    /// Create a segment, auto-enrolling users when --auto-pct is given
    CreateSegment {
        slug: String,
        /// Percentage of existing users to enroll (0-100)
        #[arg(long)]
        auto_pct: Option<i32>,
        /// Seed for the enrollment shuffle (random when omitted)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Delete a segment by slug
    DeleteSegment { slug: String },

    /// List the segment slugs a user belongs to
    UserSegments { user_id: String },

    /// Print the membership history for a month
    Report {
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        /// Emit CSV instead of JSON
        #[arg(long)]
        csv: bool,
    },
}

#[derive(Serialize)]
struct Response<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

fn output<T: Serialize>(data: T) -> Result<()> {
    let resp = Response {
        success: true,
        data: Some(data),
        message: None,
    };
    println!("{}", serde_json::to_string(&resp)?);
    Ok(())
}

async fn connect(config: &Config) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(2)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let pool = connect(&config).await?;

    if let Err(e) = run(cli.command, pool).await {
        let resp: Response<()> = Response {
            success: false,
            data: None,
            message: Some(format!("{:#}", e)),
        };
        println!("{}", serde_json::to_string(&resp)?);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Commands, pool: PgPool) -> Result<()> {
    let deps = ServerDeps::postgres(pool.clone());

    match command {
        Commands::Migrate => {
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run migrations")?;
            output("migrations applied")
        }
        Commands::CreateUser => {
            let user = create_user(&deps).await?;
            output(serde_json::json!({ "user_id": user.id }))
        }
        Commands::CreateSegment {
            slug,
            auto_pct,
            seed,
        } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let created = create_segment(
                &slug,
                auto_pct.is_some(),
                auto_pct.unwrap_or(0),
                &deps,
                &mut rng,
            )
            .await?;
            output(serde_json::json!({
                "segment_id": created.segment.id,
                "slug": created.segment.slug,
                "enrolled": created.enrolled,
            }))
        }
        Commands::DeleteSegment { slug } => {
            let removed = delete_segment(&slug, &deps).await?;
            output(serde_json::json!({ "removed": removed }))
        }
        Commands::UserSegments { user_id } => {
            let user_id = UserId::parse(&user_id).context("Invalid user id")?;
            output(user_segment_slugs(user_id, &deps).await?)
        }
        Commands::Report { year, month, csv } => {
            let entries = report(year, month, &deps).await?;
            if csv {
                print!("{}", render_csv(&entries));
                Ok(())
            } else {
                output(entries)
            }
        }
    }
}
