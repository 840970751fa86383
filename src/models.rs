use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RosterMember {
    pub member_id: Uuid,
    pub name: String,
    pub team: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyEntry {
    pub member_id: Uuid,
    pub member_name: String,
    pub team: String,
    pub week: i32,
    pub km: f64,
    pub calories: f64,
    pub workouts: i32,
    pub meals: i32,
}

/// Closed set of bonus categories. The free-text reason on a grant is a
/// display label only; matching and revocation go through this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BonusCategory {
    Habits,
    Exercise,
    Manual,
}

impl BonusCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BonusCategory::Habits => "habits",
            BonusCategory::Exercise => "exercise",
            BonusCategory::Manual => "manual",
        }
    }

    /// Total parse for category text read back from the store. Anything
    /// unrecognized counts as a plain manual grant.
    pub fn parse(value: &str) -> BonusCategory {
        match value {
            "habits" => BonusCategory::Habits,
            "exercise" => BonusCategory::Exercise,
            _ => BonusCategory::Manual,
        }
    }

    pub fn default_reason(&self) -> &'static str {
        match self {
            BonusCategory::Habits => "Healthy Habits Bonus /week",
            BonusCategory::Exercise => "Full Team Participation in an exercise",
            BonusCategory::Manual => "Admin bonus",
        }
    }
}

impl std::fmt::Display for BonusCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeamBonus {
    pub team: String,
    pub week: i32,
    pub points: f64,
    pub category: BonusCategory,
    pub reason: String,
    pub granted_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricTotals {
    pub km: f64,
    pub calories: f64,
    pub workouts: i64,
    pub meals: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyTeamTotals {
    pub totals: MetricTotals,
    pub base_points: f64,
    pub every_member_hit_min_workouts: bool,
    pub manual_bonus_points: f64,
    pub total_points: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonTeamTotals {
    pub totals: MetricTotals,
    pub base_points: f64,
    pub qualifying_weeks: i32,
    pub manual_bonus_points: f64,
    pub total_points: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberSeasonTotals {
    pub member_id: Uuid,
    pub name: String,
    pub km: f64,
    pub calories: f64,
    pub workouts: i64,
    pub meals: i64,
    pub base_points: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_text_round_trips() {
        for category in [
            BonusCategory::Habits,
            BonusCategory::Exercise,
            BonusCategory::Manual,
        ] {
            assert_eq!(BonusCategory::parse(category.as_str()), category);
        }
    }

    #[test]
    fn unknown_category_text_falls_back_to_manual() {
        assert_eq!(
            BonusCategory::parse("Healthy Habits Bonus /week"),
            BonusCategory::Manual
        );
        assert_eq!(BonusCategory::parse(""), BonusCategory::Manual);
    }
}
