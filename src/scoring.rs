use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    MemberSeasonTotals, MetricTotals, RosterMember, SeasonTeamTotals, TeamBonus, WeeklyEntry,
    WeeklyTeamTotals,
};

/// Season scoring rules. Loaded from a JSON file per season so rates can be
/// retuned without a release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub points_per_km: f64,
    pub points_per_1000_calories: f64,
    pub points_per_workout: f64,
    pub points_per_healthy_meal: f64,
    pub team_bonus_points: f64,
    pub min_weekly_workouts: i32,
    pub weeks_in_season: i32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            points_per_km: 10.0,
            points_per_1000_calories: 100.0,
            points_per_workout: 20.0,
            points_per_healthy_meal: 20.0,
            team_bonus_points: 200.0,
            min_weekly_workouts: 2,
            weeks_in_season: 24,
        }
    }
}

impl ScoringConfig {
    /// The full ordered week range for the season, including weeks with no
    /// submissions yet.
    pub fn season_weeks(&self) -> Vec<i32> {
        (1..=self.weeks_in_season.max(0)).collect()
    }
}

/// Self-reported metrics come from free-form user input; anything that is not
/// a non-negative finite number counts as zero instead of failing.
pub fn coerce_metric(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

pub fn coerce_count(value: i32) -> i32 {
    value.max(0)
}

pub fn member_points(entry: &WeeklyEntry, config: &ScoringConfig) -> f64 {
    let from_km = coerce_metric(entry.km) * config.points_per_km;
    let from_calories = coerce_metric(entry.calories) / 1000.0 * config.points_per_1000_calories;
    let from_workouts = coerce_count(entry.workouts) as f64 * config.points_per_workout;
    let from_meals = coerce_count(entry.meals) as f64 * config.points_per_healthy_meal;
    from_km + from_calories + from_workouts + from_meals
}

/// True only when the roster is non-empty and every roster member logged at
/// least `min_workouts` workouts in the given entries. A member without an
/// entry counts as zero workouts.
pub fn every_member_hit_min_workouts(
    roster: &[RosterMember],
    entries: &[WeeklyEntry],
    min_workouts: i32,
) -> bool {
    if roster.is_empty() {
        return false;
    }
    let by_member: HashMap<Uuid, &WeeklyEntry> =
        entries.iter().map(|entry| (entry.member_id, entry)).collect();
    roster.iter().all(|member| {
        by_member
            .get(&member.member_id)
            .map_or(0, |entry| coerce_count(entry.workouts))
            >= min_workouts
    })
}

fn sum_metrics(entries: &[WeeklyEntry]) -> MetricTotals {
    let mut totals = MetricTotals::default();
    for entry in entries {
        totals.km += coerce_metric(entry.km);
        totals.calories += coerce_metric(entry.calories);
        totals.workouts += coerce_count(entry.workouts) as i64;
        totals.meals += coerce_count(entry.meals) as i64;
    }
    totals
}

fn sum_base_points(entries: &[WeeklyEntry], config: &ScoringConfig) -> f64 {
    entries.iter().map(|entry| member_points(entry, config)).sum()
}

fn sum_bonus_points(bonuses: &[TeamBonus]) -> f64 {
    bonuses
        .iter()
        .map(|bonus| if bonus.points.is_finite() { bonus.points } else { 0.0 })
        .sum()
}

/// One team's totals for a single week. Expects entries and bonuses already
/// filtered to that team and week.
pub fn compute_weekly_team_totals(
    roster: &[RosterMember],
    entries: &[WeeklyEntry],
    bonuses: &[TeamBonus],
    config: &ScoringConfig,
) -> WeeklyTeamTotals {
    let totals = sum_metrics(entries);
    let base_points = sum_base_points(entries, config);
    let every_member_hit_min_workouts =
        every_member_hit_min_workouts(roster, entries, config.min_weekly_workouts);
    let manual_bonus_points = sum_bonus_points(bonuses);

    let auto_bonus = if every_member_hit_min_workouts {
        config.team_bonus_points
    } else {
        0.0
    };
    let total_points = base_points + auto_bonus + manual_bonus_points;

    WeeklyTeamTotals {
        totals,
        base_points,
        every_member_hit_min_workouts,
        manual_bonus_points,
        total_points,
    }
}

/// One team's totals across the whole season. `weeks` must be the full season
/// range: weeks with no submissions still get evaluated (and never qualify),
/// so the result does not depend on data sparsity.
pub fn compute_season_team_totals(
    roster: &[RosterMember],
    entries: &[WeeklyEntry],
    bonuses: &[TeamBonus],
    weeks: &[i32],
    config: &ScoringConfig,
) -> SeasonTeamTotals {
    let totals = sum_metrics(entries);
    let base_points = sum_base_points(entries, config);

    let mut by_week: HashMap<i32, Vec<WeeklyEntry>> = HashMap::new();
    for entry in entries {
        by_week.entry(entry.week).or_default().push(entry.clone());
    }

    let empty: Vec<WeeklyEntry> = Vec::new();
    let mut qualifying_weeks = 0;
    for week in weeks {
        let week_entries = by_week.get(week).unwrap_or(&empty);
        if every_member_hit_min_workouts(roster, week_entries, config.min_weekly_workouts) {
            qualifying_weeks += 1;
        }
    }

    let manual_bonus_points = sum_bonus_points(bonuses);
    let total_points =
        base_points + qualifying_weeks as f64 * config.team_bonus_points + manual_bonus_points;

    SeasonTeamTotals {
        totals,
        base_points,
        qualifying_weeks,
        manual_bonus_points,
        total_points,
    }
}

/// Per-member rollup across all weeks, sorted by display name for the season
/// standings table.
pub fn aggregate_member_season(
    entries: &[WeeklyEntry],
    config: &ScoringConfig,
) -> Vec<MemberSeasonTotals> {
    let mut rollup: HashMap<Uuid, MemberSeasonTotals> = HashMap::new();

    for entry in entries {
        let row = rollup
            .entry(entry.member_id)
            .or_insert_with(|| MemberSeasonTotals {
                member_id: entry.member_id,
                name: entry.member_name.clone(),
                km: 0.0,
                calories: 0.0,
                workouts: 0,
                meals: 0,
                base_points: 0.0,
            });
        row.km += coerce_metric(entry.km);
        row.calories += coerce_metric(entry.calories);
        row.workouts += coerce_count(entry.workouts) as i64;
        row.meals += coerce_count(entry.meals) as i64;
        row.base_points += member_points(entry, config);
    }

    let mut rows: Vec<MemberSeasonTotals> = rollup.into_values().collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name));
    rows
}

/// Distinct team names present in the roster, sorted.
pub fn team_names(roster: &[RosterMember]) -> Vec<String> {
    let mut names: Vec<String> = roster.iter().map(|member| member.team.clone()).collect();
    names.sort();
    names.dedup();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BonusCategory;

    fn member(name: &str, team: &str) -> RosterMember {
        RosterMember {
            member_id: Uuid::new_v4(),
            name: name.to_string(),
            team: team.to_string(),
        }
    }

    fn entry_for(member: &RosterMember, week: i32, km: f64, calories: f64, workouts: i32, meals: i32) -> WeeklyEntry {
        WeeklyEntry {
            member_id: member.member_id,
            member_name: member.name.clone(),
            team: member.team.clone(),
            week,
            km,
            calories,
            workouts,
            meals,
        }
    }

    fn bonus(team: &str, week: i32, points: f64, category: BonusCategory) -> TeamBonus {
        TeamBonus {
            team: team.to_string(),
            week,
            points,
            category,
            reason: category.default_reason().to_string(),
            granted_by: None,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn zero_metrics_score_zero() {
        let alice = member("Alice", "Arthur");
        let entry = entry_for(&alice, 1, 0.0, 0.0, 0, 0);
        assert_eq!(member_points(&entry, &ScoringConfig::default()), 0.0);
    }

    #[test]
    fn formula_matches_published_rates() {
        let alice = member("Alice", "Arthur");
        let entry = entry_for(&alice, 5, 10.0, 1000.0, 2, 3);
        // 10 km * 10 + 1 * 100 + 2 * 20 + 3 * 20
        assert!(close(member_points(&entry, &ScoringConfig::default()), 300.0));
    }

    #[test]
    fn malformed_metrics_count_as_zero() {
        let alice = member("Alice", "Arthur");
        let config = ScoringConfig::default();
        let clean = entry_for(&alice, 1, 0.0, 0.0, 3, 1);
        let dirty = WeeklyEntry {
            km: -4.0,
            calories: f64::NAN,
            ..clean.clone()
        };
        assert!(close(member_points(&dirty, &config), member_points(&clean, &config)));

        let negative_counts = WeeklyEntry {
            workouts: -2,
            meals: -1,
            ..clean
        };
        assert_eq!(member_points(&negative_counts, &config), 0.0);
    }

    #[test]
    fn formula_is_additive_per_metric() {
        let alice = member("Alice", "Arthur");
        let config = ScoringConfig::default();
        let a = entry_for(&alice, 1, 3.5, 0.0, 0, 0);
        let b = entry_for(&alice, 1, 4.25, 0.0, 0, 0);
        let combined = entry_for(&alice, 1, 7.75, 0.0, 0, 0);
        assert!(close(
            member_points(&a, &config) + member_points(&b, &config),
            member_points(&combined, &config)
        ));
    }

    #[test]
    fn custom_rates_override_defaults() {
        let alice = member("Alice", "Arthur");
        let config = ScoringConfig {
            points_per_km: 1.0,
            points_per_1000_calories: 0.0,
            points_per_workout: 5.0,
            points_per_healthy_meal: 0.0,
            ..ScoringConfig::default()
        };
        let entry = entry_for(&alice, 1, 12.0, 9000.0, 2, 7);
        assert!(close(member_points(&entry, &config), 12.0 + 10.0));
    }

    #[test]
    fn empty_roster_never_earns_auto_bonus() {
        let alice = member("Alice", "Arthur");
        let entries = vec![entry_for(&alice, 1, 5.0, 0.0, 10, 0)];
        let weekly =
            compute_weekly_team_totals(&[], &entries, &[], &ScoringConfig::default());
        assert!(!weekly.every_member_hit_min_workouts);
    }

    #[test]
    fn auto_bonus_requires_every_member_at_threshold() {
        let alice = member("Alice", "Arthur");
        let bob = member("Bob", "Arthur");
        let roster = vec![alice.clone(), bob.clone()];
        let config = ScoringConfig::default();

        let qualifying = vec![
            entry_for(&alice, 1, 0.0, 0.0, 2, 0),
            entry_for(&bob, 1, 0.0, 0.0, 3, 0),
        ];
        assert!(every_member_hit_min_workouts(&roster, &qualifying, config.min_weekly_workouts));

        // One member below the threshold.
        let below = vec![
            entry_for(&alice, 1, 0.0, 0.0, 2, 0),
            entry_for(&bob, 1, 0.0, 0.0, 1, 0),
        ];
        assert!(!every_member_hit_min_workouts(&roster, &below, config.min_weekly_workouts));

        // One member with no entry at all.
        let missing = vec![entry_for(&alice, 1, 0.0, 0.0, 2, 0)];
        assert!(!every_member_hit_min_workouts(&roster, &missing, config.min_weekly_workouts));
    }

    #[test]
    fn weekly_totals_match_published_example() {
        let a = member("A", "Arthur");
        let b = member("B", "Arthur");
        let roster = vec![a.clone(), b.clone()];
        let entries = vec![
            entry_for(&a, 5, 10.0, 1000.0, 2, 3),
            entry_for(&b, 5, 0.0, 0.0, 2, 0),
        ];

        let weekly =
            compute_weekly_team_totals(&roster, &entries, &[], &ScoringConfig::default());
        assert!(close(weekly.totals.km, 10.0));
        assert!(close(weekly.totals.calories, 1000.0));
        assert_eq!(weekly.totals.workouts, 4);
        assert_eq!(weekly.totals.meals, 3);
        assert!(close(weekly.base_points, 340.0));
        assert!(weekly.every_member_hit_min_workouts);
        assert!(close(weekly.total_points, 540.0));
    }

    #[test]
    fn week_without_entries_scores_zero() {
        let roster = vec![member("A", "Arthur"), member("B", "Arthur")];
        let weekly = compute_weekly_team_totals(&roster, &[], &[], &ScoringConfig::default());
        assert_eq!(weekly.totals, MetricTotals::default());
        assert_eq!(weekly.base_points, 0.0);
        assert!(!weekly.every_member_hit_min_workouts);
        assert_eq!(weekly.total_points, 0.0);
    }

    #[test]
    fn bonus_only_week_counts_manual_points() {
        let roster = vec![member("A", "Arthur")];
        let bonuses = vec![bonus("Arthur", 3, 200.0, BonusCategory::Habits)];
        let weekly =
            compute_weekly_team_totals(&roster, &[], &bonuses, &ScoringConfig::default());
        assert!(close(weekly.total_points, 200.0));
        assert!(close(weekly.manual_bonus_points, 200.0));
        assert_eq!(weekly.base_points, 0.0);
    }

    #[test]
    fn weekly_total_is_base_plus_auto_plus_manual() {
        let a = member("A", "Arthur");
        let b = member("B", "Arthur");
        let roster = vec![a.clone(), b.clone()];
        let config = ScoringConfig::default();
        let entries = vec![
            entry_for(&a, 2, 4.0, 2500.0, 3, 1),
            entry_for(&b, 2, 1.5, 600.0, 2, 4),
        ];
        let bonuses = vec![
            bonus("Arthur", 2, 200.0, BonusCategory::Exercise),
            bonus("Arthur", 2, 50.0, BonusCategory::Manual),
        ];

        let weekly = compute_weekly_team_totals(&roster, &entries, &bonuses, &config);
        let expected = weekly.base_points
            + if weekly.every_member_hit_min_workouts {
                config.team_bonus_points
            } else {
                0.0
            }
            + 250.0;
        assert!(close(weekly.total_points, expected));
        assert!(weekly.every_member_hit_min_workouts);
    }

    #[test]
    fn season_counts_qualifying_weeks_across_full_range() {
        let a = member("A", "Arthur");
        let b = member("B", "Arthur");
        let roster = vec![a.clone(), b.clone()];
        let config = ScoringConfig::default();

        // Weeks 1 and 3 qualify, week 2 has one member short, the remaining
        // weeks of the range have no data at all.
        let mut entries = vec![
            entry_for(&a, 1, 2.0, 0.0, 2, 0),
            entry_for(&b, 1, 0.0, 0.0, 4, 1),
            entry_for(&a, 2, 0.0, 0.0, 5, 0),
            entry_for(&a, 3, 1.0, 300.0, 2, 2),
            entry_for(&b, 3, 0.0, 0.0, 2, 0),
        ];
        let weeks = config.season_weeks();
        let season = compute_season_team_totals(&roster, &entries, &[], &weeks, &config);
        assert_eq!(season.qualifying_weeks, 2);

        // Cross-check against independent weekly evaluations.
        let mut independent = 0;
        for week in &weeks {
            let week_entries: Vec<WeeklyEntry> = entries
                .iter()
                .filter(|entry| entry.week == *week)
                .cloned()
                .collect();
            if every_member_hit_min_workouts(&roster, &week_entries, config.min_weekly_workouts) {
                independent += 1;
            }
        }
        assert_eq!(season.qualifying_weeks, independent);

        // Dropping one qualifying entry drops the count.
        entries.retain(|entry| !(entry.week == 3 && entry.member_id == b.member_id));
        let season = compute_season_team_totals(&roster, &entries, &[], &weeks, &config);
        assert_eq!(season.qualifying_weeks, 1);
    }

    #[test]
    fn season_total_combines_base_auto_and_manual() {
        let a = member("A", "Arthur");
        let b = member("B", "Arthur");
        let roster = vec![a.clone(), b.clone()];
        let config = ScoringConfig::default();
        let entries = vec![
            entry_for(&a, 1, 10.0, 1000.0, 2, 3),
            entry_for(&b, 1, 0.0, 0.0, 2, 0),
            entry_for(&a, 4, 3.0, 0.0, 1, 1),
        ];
        let bonuses = vec![
            bonus("Arthur", 1, 200.0, BonusCategory::Habits),
            bonus("Arthur", 4, 200.0, BonusCategory::Exercise),
        ];

        let season = compute_season_team_totals(
            &roster,
            &entries,
            &bonuses,
            &config.season_weeks(),
            &config,
        );
        // Week 1 qualifies, week 4 does not.
        assert_eq!(season.qualifying_weeks, 1);
        assert!(close(season.base_points, 340.0 + 70.0));
        assert!(close(season.manual_bonus_points, 400.0));
        assert!(close(season.total_points, 410.0 + 200.0 + 400.0));
        assert!(close(season.totals.km, 13.0));
        assert_eq!(season.totals.workouts, 5);
    }

    #[test]
    fn aggregators_are_idempotent() {
        let a = member("A", "Arthur");
        let b = member("B", "Arthur");
        let roster = vec![a.clone(), b.clone()];
        let config = ScoringConfig::default();
        let entries = vec![
            entry_for(&a, 1, 2.0, 500.0, 2, 1),
            entry_for(&b, 1, 6.0, 0.0, 3, 0),
            entry_for(&a, 2, 1.0, 0.0, 0, 2),
        ];
        let bonuses = vec![bonus("Arthur", 1, 200.0, BonusCategory::Habits)];
        let weeks = config.season_weeks();

        let first = compute_weekly_team_totals(&roster, &entries, &bonuses, &config);
        let second = compute_weekly_team_totals(&roster, &entries, &bonuses, &config);
        assert_eq!(first, second);

        let first = compute_season_team_totals(&roster, &entries, &bonuses, &weeks, &config);
        let second = compute_season_team_totals(&roster, &entries, &bonuses, &weeks, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn member_season_rollup_sums_and_sorts_by_name() {
        let zoe = member("Zoe", "Jimmy");
        let amir = member("Amir", "Jimmy");
        let config = ScoringConfig::default();
        let entries = vec![
            entry_for(&zoe, 1, 2.0, 0.0, 1, 0),
            entry_for(&zoe, 2, 3.0, 1000.0, 2, 1),
            entry_for(&amir, 1, 1.0, 0.0, 0, 4),
        ];

        let rows = aggregate_member_season(&entries, &config);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Amir");
        assert_eq!(rows[1].name, "Zoe");
        assert!(close(rows[1].km, 5.0));
        assert_eq!(rows[1].workouts, 3);
        assert!(close(
            rows[1].base_points,
            (2.0 * 10.0 + 20.0) + (3.0 * 10.0 + 100.0 + 2.0 * 20.0 + 20.0)
        ));
    }

    #[test]
    fn team_names_are_distinct_and_sorted() {
        let roster = vec![
            member("A", "Jimmy"),
            member("B", "Arthur"),
            member("C", "Jimmy"),
        ];
        assert_eq!(team_names(&roster), vec!["Arthur", "Jimmy"]);
    }
}
