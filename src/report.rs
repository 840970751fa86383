use std::fmt::Write;

use chrono::{Duration, NaiveDate};

use crate::models::{RosterMember, TeamBonus, WeeklyEntry};
use crate::scoring::{self, ScoringConfig};

// Week 1 of the observed season opened on this Sunday; later weeks follow in
// seven day steps.
const SEASON_START: (i32, u32, u32) = (2025, 7, 20);

pub fn week_start_date(week: i32) -> Option<NaiveDate> {
    if week < 1 {
        return None;
    }
    let (year, month, day) = SEASON_START;
    let start = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(start + Duration::days(7 * (week as i64 - 1)))
}

pub fn week_label(week: i32) -> String {
    match week_start_date(week) {
        Some(date) => format!("Week {week} ({date})"),
        None => format!("Week {week}"),
    }
}

fn write_weekly_section(
    output: &mut String,
    team: &str,
    week: i32,
    roster: &[RosterMember],
    entries: &[WeeklyEntry],
    bonuses: &[TeamBonus],
    config: &ScoringConfig,
) {
    let team_roster: Vec<RosterMember> =
        roster.iter().filter(|m| m.team == team).cloned().collect();
    let team_entries: Vec<WeeklyEntry> =
        entries.iter().filter(|e| e.team == team).cloned().collect();
    let team_bonuses: Vec<TeamBonus> =
        bonuses.iter().filter(|b| b.team == team).cloned().collect();

    let weekly =
        scoring::compute_weekly_team_totals(&team_roster, &team_entries, &team_bonuses, config);

    let _ = writeln!(output, "### Team {team}");
    let _ = writeln!(
        output,
        "- Totals: {:.2} km, {:.2} calories, {} workouts, {} healthy meals",
        weekly.totals.km, weekly.totals.calories, weekly.totals.workouts, weekly.totals.meals
    );
    let _ = writeln!(output, "- Base points: {:.2}", weekly.base_points);

    if weekly.every_member_hit_min_workouts {
        let _ = writeln!(
            output,
            "- Auto bonus: all members logged >= {} workouts (+{:.0})",
            config.min_weekly_workouts, config.team_bonus_points
        );
    }
    for bonus in &team_bonuses {
        let _ = writeln!(
            output,
            "- Bonus [{}]: {} (+{:.0})",
            bonus.category, bonus.reason, bonus.points
        );
    }
    let _ = writeln!(output, "- Total points for {}: {:.2}", week_label(week), weekly.total_points);
    let _ = writeln!(output);

    if team_entries.is_empty() {
        let _ = writeln!(output, "No entries yet for this week.");
    } else {
        let mut ordered = team_entries.clone();
        ordered.sort_by(|a, b| a.member_name.cmp(&b.member_name));
        for entry in &ordered {
            let _ = writeln!(
                output,
                "- {}: {:.2} km, {:.2} cal, {} workouts, {} meals, {:.2} pts",
                entry.member_name,
                entry.km,
                entry.calories,
                entry.workouts,
                entry.meals,
                scoring::member_points(entry, config)
            );
        }
    }
    let _ = writeln!(output);
}

fn write_season_section(
    output: &mut String,
    team: &str,
    roster: &[RosterMember],
    all_entries: &[WeeklyEntry],
    all_bonuses: &[TeamBonus],
    config: &ScoringConfig,
) {
    let team_roster: Vec<RosterMember> =
        roster.iter().filter(|m| m.team == team).cloned().collect();
    let team_entries: Vec<WeeklyEntry> =
        all_entries.iter().filter(|e| e.team == team).cloned().collect();
    let team_bonuses: Vec<TeamBonus> =
        all_bonuses.iter().filter(|b| b.team == team).cloned().collect();

    let weeks = config.season_weeks();
    let season = scoring::compute_season_team_totals(
        &team_roster,
        &team_entries,
        &team_bonuses,
        &weeks,
        config,
    );

    let _ = writeln!(output, "### Team {team}");
    let _ = writeln!(
        output,
        "- Totals: {:.2} km, {:.2} calories, {} workouts, {} healthy meals",
        season.totals.km, season.totals.calories, season.totals.workouts, season.totals.meals
    );
    let _ = writeln!(
        output,
        "- Weeks with every member at >= {} workouts: {} (+{:.0} each)",
        config.min_weekly_workouts,
        season.qualifying_weeks,
        config.team_bonus_points
    );
    let _ = writeln!(output, "- Manual bonuses: {:.2}", season.manual_bonus_points);
    let _ = writeln!(output, "- Season total points: {:.2}", season.total_points);
    let _ = writeln!(output);

    let rollup = scoring::aggregate_member_season(&team_entries, config);
    if rollup.is_empty() {
        let _ = writeln!(output, "No entries yet this season.");
    } else {
        for row in &rollup {
            let _ = writeln!(
                output,
                "- {}: {:.2} km, {:.2} cal, {} workouts, {} meals, {:.2} pts",
                row.name, row.km, row.calories, row.workouts, row.meals, row.base_points
            );
        }
    }
    let _ = writeln!(output);
}

pub fn build_report(
    week: i32,
    team_filter: Option<&str>,
    roster: &[RosterMember],
    week_entries: &[WeeklyEntry],
    week_bonuses: &[TeamBonus],
    all_entries: &[WeeklyEntry],
    all_bonuses: &[TeamBonus],
    config: &ScoringConfig,
) -> String {
    let mut teams = scoring::team_names(roster);
    if let Some(team) = team_filter {
        teams.retain(|name| name == team);
    }

    let mut output = String::new();
    let _ = writeln!(output, "# Team Fitness Challenge Report");
    let _ = writeln!(output, "Generated for {}", week_label(week));
    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Standings");
    let _ = writeln!(output);

    if teams.is_empty() {
        let _ = writeln!(output, "No teams registered.");
        return output;
    }

    for team in &teams {
        write_weekly_section(
            &mut output,
            team,
            week,
            roster,
            week_entries,
            week_bonuses,
            config,
        );
    }

    let _ = writeln!(output, "## Season Totals (All Weeks)");
    let _ = writeln!(output);
    for team in &teams {
        write_season_section(&mut output, team, roster, all_entries, all_bonuses, config);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BonusCategory;
    use uuid::Uuid;

    fn member(name: &str, team: &str) -> RosterMember {
        RosterMember {
            member_id: Uuid::new_v4(),
            name: name.to_string(),
            team: team.to_string(),
        }
    }

    fn entry_for(member: &RosterMember, week: i32, km: f64, workouts: i32) -> WeeklyEntry {
        WeeklyEntry {
            member_id: member.member_id,
            member_name: member.name.clone(),
            team: member.team.clone(),
            week,
            km,
            calories: 0.0,
            workouts,
            meals: 0,
        }
    }

    #[test]
    fn week_dates_follow_the_season_calendar() {
        assert_eq!(
            week_start_date(1),
            NaiveDate::from_ymd_opt(2025, 7, 20)
        );
        assert_eq!(
            week_start_date(2),
            NaiveDate::from_ymd_opt(2025, 7, 27)
        );
        assert_eq!(
            week_start_date(24),
            NaiveDate::from_ymd_opt(2025, 12, 28)
        );
        assert_eq!(week_start_date(0), None);
    }

    #[test]
    fn report_lists_each_team_and_member() {
        let maya = member("Maya", "Arthur");
        let priya = member("Priya", "Jimmy");
        let roster = vec![maya.clone(), priya.clone()];
        let week_entries = vec![entry_for(&maya, 1, 5.0, 2), entry_for(&priya, 1, 3.0, 1)];
        let bonuses = vec![TeamBonus {
            team: "Jimmy".to_string(),
            week: 1,
            points: 200.0,
            category: BonusCategory::Habits,
            reason: BonusCategory::Habits.default_reason().to_string(),
            granted_by: None,
        }];

        let report = build_report(
            1,
            None,
            &roster,
            &week_entries,
            &bonuses,
            &week_entries,
            &bonuses,
            &ScoringConfig::default(),
        );

        assert!(report.contains("### Team Arthur"));
        assert!(report.contains("### Team Jimmy"));
        assert!(report.contains("- Maya: 5.00 km"));
        assert!(report.contains("Bonus [habits]: Healthy Habits Bonus /week (+200)"));
        assert!(report.contains("## Season Totals (All Weeks)"));
    }

    #[test]
    fn team_filter_narrows_the_report() {
        let maya = member("Maya", "Arthur");
        let priya = member("Priya", "Jimmy");
        let roster = vec![maya, priya];

        let report = build_report(
            2,
            Some("Arthur"),
            &roster,
            &[],
            &[],
            &[],
            &[],
            &ScoringConfig::default(),
        );
        assert!(report.contains("### Team Arthur"));
        assert!(!report.contains("### Team Jimmy"));
        assert!(report.contains("No entries yet for this week."));
        assert!(report.contains("No entries yet this season."));
    }
}
