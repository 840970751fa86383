use sqlx::postgres::PgListener;
use sqlx::PgPool;

use crate::db;
use crate::scoring::{self, ScoringConfig};

/// Channel fed by the statement triggers on weekly_entries and team_bonuses.
const CHANNEL: &str = "fitness_challenge_events";

async fn print_standings(pool: &PgPool, week: i32, config: &ScoringConfig) -> anyhow::Result<()> {
    let roster = db::fetch_roster(pool).await?;
    let entries = db::fetch_week_entries(pool, week, None).await?;
    let bonuses = db::fetch_week_bonuses(pool, week, None).await?;

    println!("Week {week} standings:");
    for team in scoring::team_names(&roster) {
        let team_roster: Vec<_> = roster.iter().filter(|m| m.team == team).cloned().collect();
        let team_entries: Vec<_> = entries.iter().filter(|e| e.team == team).cloned().collect();
        let team_bonuses: Vec<_> = bonuses.iter().filter(|b| b.team == team).cloned().collect();
        let weekly =
            scoring::compute_weekly_team_totals(&team_roster, &team_entries, &team_bonuses, config);
        println!(
            "- {team}: {:.2} pts (base {:.2}, auto bonus {}, manual {:.2})",
            weekly.total_points,
            weekly.base_points,
            if weekly.every_member_hit_min_workouts { "yes" } else { "no" },
            weekly.manual_bonus_points
        );
    }
    Ok(())
}

/// Follow submission and bonus changes, reprinting the week's standings on
/// every notification until interrupted.
pub async fn watch(pool: &PgPool, week: i32, config: &ScoringConfig) -> anyhow::Result<()> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(CHANNEL).await?;
    tracing::info!(week, channel = CHANNEL, "watching for changes");

    print_standings(pool, week, config).await?;

    loop {
        let notification = listener.recv().await?;
        tracing::debug!(table = notification.payload(), "change notification");
        print_standings(pool, week, config).await?;
    }
}
