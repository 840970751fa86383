use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

mod db;
mod models;
mod report;
mod scoring;
mod watch;

use models::BonusCategory;
use scoring::ScoringConfig;

#[derive(Parser)]
#[command(name = "fitness-challenge")]
#[command(about = "Team fitness challenge scoring and standings tracker", long_about = None)]
struct Cli {
    /// JSON file overriding the default season scoring rates
    #[arg(long, global = true)]
    scoring: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import members and weekly entries from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Save or update one member's entry for a week
    Submit {
        #[arg(long)]
        email: String,
        #[arg(long)]
        week: i32,
        #[arg(long, default_value_t = 0.0)]
        km: f64,
        #[arg(long, default_value_t = 0.0)]
        calories: f64,
        #[arg(long, default_value_t = 0)]
        workouts: i32,
        #[arg(long, default_value_t = 0)]
        meals: i32,
    },
    /// Show one member's entries across the season
    History {
        #[arg(long)]
        email: String,
    },
    /// Record an admin bonus for a team/week
    GrantBonus {
        #[arg(long)]
        team: String,
        #[arg(long)]
        week: i32,
        #[arg(long, default_value_t = 200.0)]
        points: f64,
        #[arg(long, value_enum, default_value_t = BonusCategory::Manual)]
        category: BonusCategory,
        /// Display label; defaults to the category's canonical wording
        #[arg(long)]
        reason: Option<String>,
    },
    /// Remove a team/week bonus by category
    RevokeBonus {
        #[arg(long)]
        team: String,
        #[arg(long)]
        week: i32,
        #[arg(long, value_enum)]
        category: BonusCategory,
    },
    /// Weekly team standings
    Standings {
        #[arg(long)]
        week: i32,
        #[arg(long)]
        team: Option<String>,
    },
    /// Season-long team standings
    Season {
        #[arg(long)]
        team: Option<String>,
    },
    /// Generate a markdown report for a week plus season totals
    Report {
        #[arg(long)]
        week: i32,
        #[arg(long)]
        team: Option<String>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Reprint weekly standings whenever submissions or bonuses change
    Watch {
        #[arg(long)]
        week: i32,
    },
}

fn load_scoring_config(path: Option<&Path>) -> anyhow::Result<ScoringConfig> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read scoring config {}", path.display()))?;
            let config = serde_json::from_str(&raw)
                .with_context(|| format!("invalid scoring config {}", path.display()))?;
            Ok(config)
        }
        None => Ok(ScoringConfig::default()),
    }
}

fn ensure_week_in_season(week: i32, config: &ScoringConfig) -> anyhow::Result<()> {
    anyhow::ensure!(
        week >= 1 && week <= config.weeks_in_season,
        "week {week} is outside the season range 1..={}",
        config.weeks_in_season
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_scoring_config(cli.scoring.as_deref())?;

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let written = db::import_csv(&pool, &csv).await?;
            println!("Wrote {written} weekly entries from {}.", csv.display());
        }
        Commands::Submit {
            email,
            week,
            km,
            calories,
            workouts,
            meals,
        } => {
            ensure_week_in_season(week, &config)?;
            let member = db::find_member(&pool, &email)
                .await?
                .with_context(|| format!("no member registered with email {email}"))?;
            let entry =
                db::upsert_entry(&pool, &member, week, km, calories, workouts, meals).await?;
            println!(
                "Saved {} for {}: {:.2} points.",
                report::week_label(week),
                member.name,
                scoring::member_points(&entry, &config)
            );
        }
        Commands::History { email } => {
            let member = db::find_member(&pool, &email)
                .await?
                .with_context(|| format!("no member registered with email {email}"))?;
            let entries = db::fetch_member_entries(&pool, member.member_id).await?;

            if entries.is_empty() {
                println!("No entries yet for {}.", member.name);
                return Ok(());
            }

            println!("Entries for {} ({}):", member.name, member.team);
            let mut season_points = 0.0;
            for entry in &entries {
                let points = scoring::member_points(entry, &config);
                season_points += points;
                println!(
                    "- {}: {:.2} km, {:.2} cal, {} workouts, {} meals, {:.2} pts",
                    report::week_label(entry.week),
                    entry.km,
                    entry.calories,
                    entry.workouts,
                    entry.meals,
                    points
                );
            }
            println!("Season base points: {season_points:.2}");
        }
        Commands::GrantBonus {
            team,
            week,
            points,
            category,
            reason,
        } => {
            ensure_week_in_season(week, &config)?;
            let reason = reason.unwrap_or_else(|| category.default_reason().to_string());
            db::grant_bonus(&pool, &team, week, points, category, &reason, None).await?;
            println!("Added {points:+.0} [{category}] \"{reason}\" to {team} week {week}.");
        }
        Commands::RevokeBonus { team, week, category } => {
            ensure_week_in_season(week, &config)?;
            let removed = db::revoke_bonus(&pool, &team, week, category).await?;
            println!("Removed {removed} [{category}] bonus(es) from {team} week {week}.");
        }
        Commands::Standings { week, team } => {
            ensure_week_in_season(week, &config)?;
            let roster = db::fetch_roster(&pool).await?;
            let entries = db::fetch_week_entries(&pool, week, team.as_deref()).await?;
            let bonuses = db::fetch_week_bonuses(&pool, week, team.as_deref()).await?;

            let mut teams = scoring::team_names(&roster);
            if let Some(filter) = team.as_deref() {
                teams.retain(|name| name == filter);
            }
            if teams.is_empty() {
                println!("No teams registered.");
                return Ok(());
            }

            let mut standings: Vec<(String, models::WeeklyTeamTotals)> = teams
                .into_iter()
                .map(|name| {
                    let team_roster: Vec<_> =
                        roster.iter().filter(|m| m.team == name).cloned().collect();
                    let team_entries: Vec<_> =
                        entries.iter().filter(|e| e.team == name).cloned().collect();
                    let team_bonuses: Vec<_> =
                        bonuses.iter().filter(|b| b.team == name).cloned().collect();
                    let totals = scoring::compute_weekly_team_totals(
                        &team_roster,
                        &team_entries,
                        &team_bonuses,
                        &config,
                    );
                    (name, totals)
                })
                .collect();
            standings.sort_by(|a, b| {
                b.1.total_points
                    .partial_cmp(&a.1.total_points)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            println!("{} standings:", report::week_label(week));
            for (name, totals) in &standings {
                println!(
                    "- {name}: {:.2} pts (base {:.2}, auto bonus {}, manual {:.2})",
                    totals.total_points,
                    totals.base_points,
                    if totals.every_member_hit_min_workouts { "yes" } else { "no" },
                    totals.manual_bonus_points
                );
            }
        }
        Commands::Season { team } => {
            let roster = db::fetch_roster(&pool).await?;
            let entries = db::fetch_all_entries(&pool, team.as_deref()).await?;
            let bonuses = db::fetch_all_bonuses(&pool, team.as_deref()).await?;
            let weeks = config.season_weeks();

            let mut teams = scoring::team_names(&roster);
            if let Some(filter) = team.as_deref() {
                teams.retain(|name| name == filter);
            }
            if teams.is_empty() {
                println!("No teams registered.");
                return Ok(());
            }

            let mut standings: Vec<(String, models::SeasonTeamTotals)> = teams
                .into_iter()
                .map(|name| {
                    let team_roster: Vec<_> =
                        roster.iter().filter(|m| m.team == name).cloned().collect();
                    let team_entries: Vec<_> =
                        entries.iter().filter(|e| e.team == name).cloned().collect();
                    let team_bonuses: Vec<_> =
                        bonuses.iter().filter(|b| b.team == name).cloned().collect();
                    let totals = scoring::compute_season_team_totals(
                        &team_roster,
                        &team_entries,
                        &team_bonuses,
                        &weeks,
                        &config,
                    );
                    (name, totals)
                })
                .collect();
            standings.sort_by(|a, b| {
                b.1.total_points
                    .partial_cmp(&a.1.total_points)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            println!("Season standings:");
            for (name, totals) in &standings {
                println!(
                    "- {name}: {:.2} pts (base {:.2}, {} qualifying weeks, manual {:.2})",
                    totals.total_points,
                    totals.base_points,
                    totals.qualifying_weeks,
                    totals.manual_bonus_points
                );
            }
        }
        Commands::Report { week, team, out } => {
            ensure_week_in_season(week, &config)?;
            let roster = db::fetch_roster(&pool).await?;
            let week_entries = db::fetch_week_entries(&pool, week, team.as_deref()).await?;
            let week_bonuses = db::fetch_week_bonuses(&pool, week, team.as_deref()).await?;
            let all_entries = db::fetch_all_entries(&pool, team.as_deref()).await?;
            let all_bonuses = db::fetch_all_bonuses(&pool, team.as_deref()).await?;

            let report = report::build_report(
                week,
                team.as_deref(),
                &roster,
                &week_entries,
                &week_bonuses,
                &all_entries,
                &all_bonuses,
                &config,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Watch { week } => {
            ensure_week_in_season(week, &config)?;
            watch::watch(&pool, week, &config).await?;
        }
    }

    Ok(())
}
