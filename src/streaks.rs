use rand::seq::IndexedRandom;
use serde::Serialize;
use sqlx::{FromRow, MySqlPool};
use time::{Date, PrimitiveDateTime};
use utoipa::ToSchema;

/// Per-user streak counters as stored in `user_streaks`.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct StreakRow {
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_activity_date: Option<Date>,
    pub total_days_active: i32,
}

impl StreakRow {
    /// Applies one qualifying activity dated `today`.
    ///
    /// Returns `None` when the user was already active today (no-op). A first
    /// activity ever starts at 1/1, a consecutive day increments both the
    /// streak and the active-day total, and a gap of more than one day resets
    /// the streak to 1 while still counting the active day. `longest_streak`
    /// is the running maximum.
    pub fn advanced(&self, today: Date) -> Option<StreakRow> {
        let (current_streak, total_days_active) = match self.last_activity_date {
            None => (1, 1),
            Some(last) if last == today => return None,
            Some(last) if (today - last).whole_days() == 1 => {
                (self.current_streak + 1, self.total_days_active + 1)
            }
            Some(_) => (1, self.total_days_active + 1),
        };
        Some(StreakRow {
            current_streak,
            longest_streak: self.longest_streak.max(current_streak),
            last_activity_date: Some(today),
            total_days_active,
        })
    }

    /// True when the last activity was more than one day ago, i.e. the streak
    /// is broken and should be displayed as 0 until the next activity.
    pub fn is_stale(&self, today: Date) -> bool {
        self.last_activity_date
            .is_some_and(|last| (today - last).whole_days() > 1)
    }
}

pub async fn get_or_create_streak(
    database: &MySqlPool,
    user_id: i64,
) -> anyhow::Result<StreakRow> {
    let row = sqlx::query_as::<_, StreakRow>(
        "SELECT current_streak, longest_streak, last_activity_date, total_days_active \
         FROM user_streaks WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(database)
    .await?;
    if let Some(row) = row {
        return Ok(row);
    }
    sqlx::query(
        "INSERT INTO user_streaks (user_id, current_streak, longest_streak, last_activity_date, total_days_active) \
         VALUES (?, 0, 0, NULL, 0)",
    )
    .bind(user_id)
    .execute(database)
    .await?;
    Ok(StreakRow {
        current_streak: 0,
        longest_streak: 0,
        last_activity_date: None,
        total_days_active: 0,
    })
}

/// Read-path reset: a broken streak is zeroed in storage so the widget shows
/// 0, but `last_activity_date` is left alone so the next activity still
/// restarts the streak at 1.
pub async fn zero_stale_streak(
    database: &MySqlPool,
    user_id: i64,
    streak: &mut StreakRow,
    today: Date,
) -> anyhow::Result<()> {
    if !streak.is_stale(today) || streak.current_streak == 0 {
        return Ok(());
    }
    sqlx::query("UPDATE user_streaks SET current_streak = 0 WHERE user_id = ?")
        .bind(user_id)
        .execute(database)
        .await?;
    streak.current_streak = 0;
    Ok(())
}

/// Advances the streak for one qualifying activity and persists the result.
/// Returns the row as it stands after the update.
pub async fn advance_streak(
    database: &MySqlPool,
    user_id: i64,
    today: Date,
) -> anyhow::Result<StreakRow> {
    let streak = get_or_create_streak(database, user_id).await?;
    let Some(updated) = streak.advanced(today) else {
        return Ok(streak);
    };
    sqlx::query(
        "UPDATE user_streaks SET current_streak = ?, longest_streak = ?, last_activity_date = ?, total_days_active = ? \
         WHERE user_id = ?",
    )
    .bind(updated.current_streak)
    .bind(updated.longest_streak)
    .bind(updated.last_activity_date)
    .bind(updated.total_days_active)
    .bind(user_id)
    .execute(database)
    .await?;
    Ok(updated)
}

/// Inserts a daily activity unless the same (type, activity id) pair was
/// already recorded today. Returns false on the duplicate.
pub async fn record_daily_activity(
    database: &MySqlPool,
    user_id: i64,
    today: Date,
    activity_type: &str,
    activity_id: Option<i64>,
    points: i32,
) -> anyhow::Result<bool> {
    // <=> so that activities without an id dedup against each other too
    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM daily_activities \
         WHERE user_id = ? AND activity_date = ? AND activity_type = ? AND activity_id <=> ?",
    )
    .bind(user_id)
    .bind(today)
    .bind(activity_type)
    .bind(activity_id)
    .fetch_optional(database)
    .await?;
    if existing.is_some() {
        return Ok(false);
    }
    sqlx::query(
        "INSERT INTO daily_activities (user_id, activity_date, activity_type, activity_id, points_earned) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(today)
    .bind(activity_type)
    .bind(activity_id)
    .bind(points)
    .execute(database)
    .await?;
    Ok(true)
}

pub async fn today_activity_count(
    database: &MySqlPool,
    user_id: i64,
    today: Date,
) -> anyhow::Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM daily_activities WHERE user_id = ? AND activity_date = ?",
    )
    .bind(user_id)
    .bind(today)
    .fetch_one(database)
    .await?;
    Ok(count)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BadgeMetric {
    CurrentStreak,
    LongestStreak,
    TotalDaysActive,
}

pub struct BadgeSpec {
    pub badge_type: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub metric: BadgeMetric,
    pub threshold: i32,
}

/// Badge catalog. 7/30-day badges watch the live streak, the 100-day badge
/// counts once the longest streak ever reaches it.
pub const BADGES: [BadgeSpec; 5] = [
    BadgeSpec {
        badge_type: "streak_7",
        name: "Week Warrior",
        description: "Maintain a 7-day streak!",
        metric: BadgeMetric::CurrentStreak,
        threshold: 7,
    },
    BadgeSpec {
        badge_type: "streak_30",
        name: "Monthly Master",
        description: "Maintain a 30-day streak!",
        metric: BadgeMetric::CurrentStreak,
        threshold: 30,
    },
    BadgeSpec {
        badge_type: "streak_100",
        name: "Century Champion",
        description: "Achieve a 100-day streak!",
        metric: BadgeMetric::LongestStreak,
        threshold: 100,
    },
    BadgeSpec {
        badge_type: "days_10",
        name: "Getting Started",
        description: "Be active for 10 days!",
        metric: BadgeMetric::TotalDaysActive,
        threshold: 10,
    },
    BadgeSpec {
        badge_type: "days_50",
        name: "Dedicated Learner",
        description: "Be active for 50 days!",
        metric: BadgeMetric::TotalDaysActive,
        threshold: 50,
    },
];

/// Badges whose threshold the given counters meet.
pub fn earned_badges(streak: &StreakRow) -> Vec<&'static BadgeSpec> {
    BADGES
        .iter()
        .filter(|spec| {
            let value = match spec.metric {
                BadgeMetric::CurrentStreak => streak.current_streak,
                BadgeMetric::LongestStreak => streak.longest_streak,
                BadgeMetric::TotalDaysActive => streak.total_days_active,
            };
            value >= spec.threshold
        })
        .collect()
}

/// Awards every earned badge the user does not hold yet. The existence check
/// plus the (user_id, badge_type) unique key keep awards single-shot.
pub async fn award_new_badges(
    database: &MySqlPool,
    user_id: i64,
    streak: &StreakRow,
) -> anyhow::Result<Vec<&'static BadgeSpec>> {
    let mut awarded = Vec::new();
    for spec in earned_badges(streak) {
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM user_badges WHERE user_id = ? AND badge_type = ?")
                .bind(user_id)
                .bind(spec.badge_type)
                .fetch_optional(database)
                .await?;
        if existing.is_some() {
            continue;
        }
        sqlx::query(
            "INSERT INTO user_badges (user_id, badge_type, badge_name, badge_description) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(spec.badge_type)
        .bind(spec.name)
        .bind(spec.description)
        .execute(database)
        .await?;
        tracing::info!(user_id, badge = spec.badge_type, "badge awarded");
        awarded.push(spec);
    }
    Ok(awarded)
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct BadgeRow {
    pub id: i64,
    pub badge_type: String,
    pub badge_name: String,
    pub badge_description: Option<String>,
    pub earned_at: PrimitiveDateTime,
}

pub async fn list_badges(database: &MySqlPool, user_id: i64) -> anyhow::Result<Vec<BadgeRow>> {
    let badges = sqlx::query_as::<_, BadgeRow>(
        "SELECT id, badge_type, badge_name, badge_description, earned_at \
         FROM user_badges WHERE user_id = ? ORDER BY earned_at DESC",
    )
    .bind(user_id)
    .fetch_all(database)
    .await?;
    Ok(badges)
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct ChallengeRow {
    pub id: i64,
    pub challenge_date: Date,
    pub title: String,
    pub description: Option<String>,
    pub challenge_type: String,
    pub target_id: Option<i64>,
    pub points_reward: i32,
    pub difficulty: Option<String>,
}

pub async fn challenge_for_date(
    database: &MySqlPool,
    date: Date,
) -> anyhow::Result<Option<ChallengeRow>> {
    let challenge = sqlx::query_as::<_, ChallengeRow>(
        "SELECT id, challenge_date, title, description, challenge_type, target_id, points_reward, difficulty \
         FROM daily_challenges WHERE challenge_date = ?",
    )
    .bind(date)
    .fetch_optional(database)
    .await?;
    Ok(challenge)
}

pub async fn challenge_by_id(
    database: &MySqlPool,
    challenge_id: i64,
) -> anyhow::Result<Option<ChallengeRow>> {
    let challenge = sqlx::query_as::<_, ChallengeRow>(
        "SELECT id, challenge_date, title, description, challenge_type, target_id, points_reward, difficulty \
         FROM daily_challenges WHERE id = ?",
    )
    .bind(challenge_id)
    .fetch_optional(database)
    .await?;
    Ok(challenge)
}

struct ChallengeTemplate {
    challenge_type: &'static str,
    title: String,
    description: String,
}

fn challenge_templates(lesson_title: &str) -> [ChallengeTemplate; 3] {
    [
        ChallengeTemplate {
            challenge_type: "lesson",
            title: format!("Complete: {lesson_title}"),
            description: format!("Finish the lesson \"{lesson_title}\" to earn bonus points!"),
        },
        ChallengeTemplate {
            challenge_type: "quiz",
            title: "Take a Quiz".into(),
            description: "Complete any quiz to keep your streak alive!".into(),
        },
        ChallengeTemplate {
            challenge_type: "practice",
            title: "Practice Coding".into(),
            description: "Spend 15 minutes coding in the editor today!".into(),
        },
    ]
}

/// Returns today's challenge, minting one from a random lesson and a random
/// template on the first request of the day. `None` only when the lessons
/// table is empty.
pub async fn get_or_create_today_challenge(
    database: &MySqlPool,
    today: Date,
) -> anyhow::Result<Option<ChallengeRow>> {
    if let Some(challenge) = challenge_for_date(database, today).await? {
        return Ok(Some(challenge));
    }
    let lesson: Option<(i64, String)> =
        sqlx::query_as("SELECT id, title FROM lessons ORDER BY RAND() LIMIT 1")
            .fetch_optional(database)
            .await?;
    let Some((lesson_id, lesson_title)) = lesson else {
        return Ok(None);
    };
    let templates = challenge_templates(&lesson_title);
    let template = {
        let mut rng = rand::rng();
        templates.choose(&mut rng).unwrap_or(&templates[0])
    };
    sqlx::query(
        "INSERT INTO daily_challenges (challenge_date, title, description, challenge_type, target_id, points_reward, difficulty) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(today)
    .bind(&template.title)
    .bind(&template.description)
    .bind(template.challenge_type)
    .bind(lesson_id)
    .bind(10)
    .bind("beginner")
    .execute(database)
    .await?;
    challenge_for_date(database, today).await
}

pub async fn is_challenge_completed(
    database: &MySqlPool,
    user_id: i64,
    challenge_id: i64,
) -> anyhow::Result<bool> {
    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM challenge_completions WHERE user_id = ? AND challenge_id = ?",
    )
    .bind(user_id)
    .bind(challenge_id)
    .fetch_optional(database)
    .await?;
    Ok(existing.is_some())
}

pub async fn record_challenge_completion(
    database: &MySqlPool,
    user_id: i64,
    challenge_id: i64,
    points: i32,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO challenge_completions (user_id, challenge_id, points_earned) VALUES (?, ?, ?)",
    )
    .bind(user_id)
    .bind(challenge_id)
    .bind(points)
    .execute(database)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    fn streak(current: i32, longest: i32, total: i32, last: Option<Date>) -> StreakRow {
        StreakRow {
            current_streak: current,
            longest_streak: longest,
            last_activity_date: last,
            total_days_active: total,
        }
    }

    #[test]
    fn first_activity_starts_at_one() {
        let today = date!(2025 - 03 - 10);
        let updated = streak(0, 0, 0, None).advanced(today).unwrap();
        assert_eq!(updated.current_streak, 1);
        assert_eq!(updated.longest_streak, 1);
        assert_eq!(updated.total_days_active, 1);
        assert_eq!(updated.last_activity_date, Some(today));
    }

    #[test]
    fn same_day_activity_is_a_noop() {
        let today = date!(2025 - 03 - 10);
        assert!(streak(3, 5, 8, Some(today)).advanced(today).is_none());
    }

    #[test]
    fn consecutive_day_increments_by_exactly_one() {
        let updated = streak(3, 5, 8, Some(date!(2025 - 03 - 10)))
            .advanced(date!(2025 - 03 - 11))
            .unwrap();
        assert_eq!(updated.current_streak, 4);
        assert_eq!(updated.longest_streak, 5);
        assert_eq!(updated.total_days_active, 9);
    }

    #[test]
    fn gap_resets_streak_but_counts_the_day() {
        let updated = streak(6, 6, 20, Some(date!(2025 - 03 - 10)))
            .advanced(date!(2025 - 03 - 13))
            .unwrap();
        assert_eq!(updated.current_streak, 1);
        assert_eq!(updated.longest_streak, 6);
        assert_eq!(updated.total_days_active, 21);
    }

    #[test]
    fn longest_streak_tracks_the_maximum() {
        let updated = streak(5, 5, 5, Some(date!(2025 - 03 - 10)))
            .advanced(date!(2025 - 03 - 11))
            .unwrap();
        assert_eq!(updated.longest_streak, 6);
    }

    #[test]
    fn advance_works_across_month_boundaries() {
        let updated = streak(2, 2, 2, Some(date!(2025 - 03 - 31)))
            .advanced(date!(2025 - 04 - 01))
            .unwrap();
        assert_eq!(updated.current_streak, 3);
    }

    #[test]
    fn staleness_needs_a_gap_of_more_than_one_day() {
        let today = date!(2025 - 03 - 12);
        assert!(!streak(3, 3, 3, Some(today)).is_stale(today));
        assert!(!streak(3, 3, 3, Some(date!(2025 - 03 - 11))).is_stale(today));
        assert!(streak(3, 3, 3, Some(date!(2025 - 03 - 10))).is_stale(today));
        assert!(!streak(0, 0, 0, None).is_stale(today));
    }

    #[test]
    fn badge_thresholds_are_flat_comparisons() {
        let none = streak(6, 6, 9, None);
        assert!(earned_badges(&none).is_empty());

        let week = streak(7, 7, 7, None);
        let types: Vec<_> = earned_badges(&week).iter().map(|b| b.badge_type).collect();
        assert_eq!(types, vec!["streak_7"]);

        // streak badges need a live streak, not a historical one
        let veteran = streak(1, 30, 50, None);
        let types: Vec<_> = earned_badges(&veteran)
            .iter()
            .map(|b| b.badge_type)
            .collect();
        assert_eq!(types, vec!["days_10", "days_50"]);

        let century = streak(100, 100, 100, None);
        let types: Vec<_> = earned_badges(&century)
            .iter()
            .map(|b| b.badge_type)
            .collect();
        assert_eq!(
            types,
            vec!["streak_7", "streak_30", "streak_100", "days_10", "days_50"]
        );
    }

    #[test]
    fn challenge_templates_cover_three_kinds() {
        let templates = challenge_templates("Flexbox Layout");
        let kinds: Vec<_> = templates.iter().map(|t| t.challenge_type).collect();
        assert_eq!(kinds, vec!["lesson", "quiz", "practice"]);
        assert!(templates[0].title.contains("Flexbox Layout"));
        assert!(templates[0].description.contains("Flexbox Layout"));
    }
}
