use anyhow::Context;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{BonusCategory, RosterMember, TeamBonus, WeeklyEntry};
use crate::scoring::{coerce_count, coerce_metric};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let members = vec![
        (
            Uuid::parse_str("6d0a4a7e-52c1-4fd0-9d2a-74b6f3f0c1a9")?,
            "Maya Chen",
            "maya.chen@atagfitness.com",
            "Arthur",
        ),
        (
            Uuid::parse_str("9f3b1c22-7a84-4c51-b7de-55e1a0d9f4b3")?,
            "Omar Haddad",
            "omar.haddad@atagfitness.com",
            "Arthur",
        ),
        (
            Uuid::parse_str("c47e9d10-3bb5-4e6a-a2c8-19f07d6a8e52")?,
            "Priya Nair",
            "priya.nair@atagfitness.com",
            "Jimmy",
        ),
        (
            Uuid::parse_str("2b8f6e34-d1c9-47a0-8f5b-c3a92e71d086")?,
            "Tomas Rivera",
            "tomas.rivera@atagfitness.com",
            "Jimmy",
        ),
    ];

    for (id, name, email, team) in members {
        sqlx::query(
            r#"
            INSERT INTO fitness_challenge.members (id, full_name, email, team)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, team = EXCLUDED.team
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(team)
        .execute(pool)
        .await?;
    }

    let entries = vec![
        ("maya.chen@atagfitness.com", 1, 12.4, 1800.0, 3, 5),
        ("omar.haddad@atagfitness.com", 1, 5.0, 900.0, 2, 2),
        ("priya.nair@atagfitness.com", 1, 21.1, 2400.0, 4, 6),
        ("tomas.rivera@atagfitness.com", 1, 0.0, 350.0, 1, 3),
    ];

    for (email, week, km, calories, workouts, meals) in entries {
        let member = find_member(pool, email)
            .await?
            .with_context(|| format!("seed member {email} missing"))?;
        upsert_entry(pool, &member, week, km, calories, workouts, meals).await?;
    }

    grant_bonus(
        pool,
        "Jimmy",
        1,
        200.0,
        BonusCategory::Habits,
        BonusCategory::Habits.default_reason(),
        None,
    )
    .await?;

    Ok(())
}

pub async fn fetch_roster(pool: &PgPool) -> anyhow::Result<Vec<RosterMember>> {
    let rows = sqlx::query(
        "SELECT id, full_name, team FROM fitness_challenge.members ORDER BY full_name",
    )
    .fetch_all(pool)
    .await?;

    let roster = rows
        .into_iter()
        .map(|row| RosterMember {
            member_id: row.get("id"),
            name: row.get("full_name"),
            team: row.get("team"),
        })
        .collect();
    Ok(roster)
}

pub async fn find_member(pool: &PgPool, email: &str) -> anyhow::Result<Option<RosterMember>> {
    let row = sqlx::query(
        "SELECT id, full_name, team FROM fitness_challenge.members WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| RosterMember {
        member_id: row.get("id"),
        name: row.get("full_name"),
        team: row.get("team"),
    }))
}

fn entry_from_row(row: &sqlx::postgres::PgRow) -> WeeklyEntry {
    WeeklyEntry {
        member_id: row.get("member_id"),
        member_name: row.get("full_name"),
        team: row.get("team"),
        week: row.get("week"),
        km: coerce_metric(row.get("km")),
        calories: coerce_metric(row.get("calories")),
        workouts: coerce_count(row.get("workouts")),
        meals: coerce_count(row.get("meals")),
    }
}

pub async fn fetch_week_entries(
    pool: &PgPool,
    week: i32,
    team: Option<&str>,
) -> anyhow::Result<Vec<WeeklyEntry>> {
    let mut query = String::from(
        "SELECT e.member_id, m.full_name, m.team, e.week, e.km, e.calories, e.workouts, e.meals \
         FROM fitness_challenge.weekly_entries e \
         JOIN fitness_challenge.members m ON m.id = e.member_id \
         WHERE e.week = $1",
    );
    if team.is_some() {
        query.push_str(" AND m.team = $2");
    }

    let mut rows = sqlx::query(&query).bind(week);
    if let Some(value) = team {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    tracing::debug!(week, count = records.len(), "fetched weekly entries");
    Ok(records.iter().map(entry_from_row).collect())
}

pub async fn fetch_all_entries(
    pool: &PgPool,
    team: Option<&str>,
) -> anyhow::Result<Vec<WeeklyEntry>> {
    let mut query = String::from(
        "SELECT e.member_id, m.full_name, m.team, e.week, e.km, e.calories, e.workouts, e.meals \
         FROM fitness_challenge.weekly_entries e \
         JOIN fitness_challenge.members m ON m.id = e.member_id",
    );
    if team.is_some() {
        query.push_str(" WHERE m.team = $1");
    }

    let mut rows = sqlx::query(&query);
    if let Some(value) = team {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    tracing::debug!(count = records.len(), "fetched season entries");
    Ok(records.iter().map(entry_from_row).collect())
}

pub async fn fetch_member_entries(
    pool: &PgPool,
    member_id: Uuid,
) -> anyhow::Result<Vec<WeeklyEntry>> {
    let records = sqlx::query(
        "SELECT e.member_id, m.full_name, m.team, e.week, e.km, e.calories, e.workouts, e.meals \
         FROM fitness_challenge.weekly_entries e \
         JOIN fitness_challenge.members m ON m.id = e.member_id \
         WHERE e.member_id = $1 \
         ORDER BY e.week",
    )
    .bind(member_id)
    .fetch_all(pool)
    .await?;
    Ok(records.iter().map(entry_from_row).collect())
}

fn bonus_from_row(row: &sqlx::postgres::PgRow) -> TeamBonus {
    let category: String = row.get("category");
    TeamBonus {
        team: row.get("team"),
        week: row.get("week"),
        points: row.get("points"),
        category: BonusCategory::parse(&category),
        reason: row.get("reason"),
        granted_by: row.get("granted_by"),
    }
}

pub async fn fetch_week_bonuses(
    pool: &PgPool,
    week: i32,
    team: Option<&str>,
) -> anyhow::Result<Vec<TeamBonus>> {
    let mut query = String::from(
        "SELECT team, week, points, category, reason, granted_by \
         FROM fitness_challenge.team_bonuses WHERE week = $1",
    );
    if team.is_some() {
        query.push_str(" AND team = $2");
    }

    let mut rows = sqlx::query(&query).bind(week);
    if let Some(value) = team {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    Ok(records.iter().map(bonus_from_row).collect())
}

pub async fn fetch_all_bonuses(
    pool: &PgPool,
    team: Option<&str>,
) -> anyhow::Result<Vec<TeamBonus>> {
    let mut query = String::from(
        "SELECT team, week, points, category, reason, granted_by \
         FROM fitness_challenge.team_bonuses",
    );
    if team.is_some() {
        query.push_str(" WHERE team = $1");
    }

    let mut rows = sqlx::query(&query);
    if let Some(value) = team {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    Ok(records.iter().map(bonus_from_row).collect())
}

/// Write a member's entry for one week, replacing any previous submission for
/// the same (member, week). Metrics are sanitized before they reach the store.
pub async fn upsert_entry(
    pool: &PgPool,
    member: &RosterMember,
    week: i32,
    km: f64,
    calories: f64,
    workouts: i32,
    meals: i32,
) -> anyhow::Result<WeeklyEntry> {
    sqlx::query(
        r#"
        INSERT INTO fitness_challenge.weekly_entries
        (id, member_id, week, km, calories, workouts, meals, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, now())
        ON CONFLICT (member_id, week) DO UPDATE
        SET km = EXCLUDED.km,
            calories = EXCLUDED.calories,
            workouts = EXCLUDED.workouts,
            meals = EXCLUDED.meals,
            updated_at = now()
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(member.member_id)
    .bind(week)
    .bind(coerce_metric(km))
    .bind(coerce_metric(calories))
    .bind(coerce_count(workouts))
    .bind(coerce_count(meals))
    .execute(pool)
    .await?;

    Ok(WeeklyEntry {
        member_id: member.member_id,
        member_name: member.name.clone(),
        team: member.team.clone(),
        week,
        km: coerce_metric(km),
        calories: coerce_metric(calories),
        workouts: coerce_count(workouts),
        meals: coerce_count(meals),
    })
}

pub async fn grant_bonus(
    pool: &PgPool,
    team: &str,
    week: i32,
    points: f64,
    category: BonusCategory,
    reason: &str,
    granted_by: Option<Uuid>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO fitness_challenge.team_bonuses
        (id, team, week, points, category, reason, granted_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(team)
    .bind(week)
    .bind(points)
    .bind(category.as_str())
    .bind(reason)
    .bind(granted_by)
    .execute(pool)
    .await?;
    Ok(())
}

/// Remove every grant of one category for a team/week. Returns how many rows
/// were deleted.
pub async fn revoke_bonus(
    pool: &PgPool,
    team: &str,
    week: i32,
    category: BonusCategory,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        "DELETE FROM fitness_challenge.team_bonuses \
         WHERE team = $1 AND week = $2 AND category = $3",
    )
    .bind(team)
    .bind(week)
    .bind(category.as_str())
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        team: String,
        week: i32,
        km: f64,
        calories: f64,
        workouts: i32,
        meals: i32,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut written = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let member_id: Uuid = sqlx::query(
            r#"
            INSERT INTO fitness_challenge.members
            (id, full_name, email, team)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, team = EXCLUDED.team
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.full_name)
        .bind(&row.email)
        .bind(&row.team)
        .fetch_one(pool)
        .await?
        .get("id");

        let member = RosterMember {
            member_id,
            name: row.full_name,
            team: row.team,
        };
        upsert_entry(pool, &member, row.week, row.km, row.calories, row.workouts, row.meals)
            .await?;
        written += 1;
    }

    tracing::info!(written, "imported weekly entries from csv");
    Ok(written)
}
