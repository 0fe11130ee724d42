//! aggregate.rs
//!
//! Сводная лента событий по командам.
//!
//! Область просмотра - одна команда или виртуальная "все мои команды".
//! Во втором случае события всех команд пользователя сливаются в одну
//! ленту, каждое помечается цветом и именем своей команды. Признак
//! "прошло" считается только для отображения и ничего не меняет в БД.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;
use sqlx::FromRow;

use crate::{
    error::EngineError,
    models::Event,
    services::roster,
    AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamScope {
    Team(i64),
    // Все команды, где состоит вызывающий
    All,
}

impl TeamScope {
    pub fn parse(s: &str) -> Option<Self> {
        if s == "all" {
            return Some(Self::All);
        }
        s.parse::<i64>().ok().map(Self::Team)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: Event,
    pub team_name: String,
    pub team_color: String,
    // Вызывающий может редактировать событие (staff-роль в его команде)
    pub can_manage: bool,
    // Только для приглушения в UI и блокировки кнопок RSVP
    pub is_past: bool,
}

#[derive(Debug, FromRow)]
struct EventTeamRow {
    #[sqlx(flatten)]
    event: Event,
    team_name: String,
    team_color: String,
}

/// События области просмотра за диапазон дат включительно,
/// отсортированные по (дата, события-без-времени раньше, время начала).
pub async fn events_in_range(
    state: &AppState,
    user_id: i64,
    scope: TeamScope,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<EventView>, EngineError> {
    let team_ids: Vec<i64> = match scope {
        TeamScope::Team(id) => vec![id],
        TeamScope::All => roster::teams_of(&state.db.pool, user_id)
            .await?
            .into_iter()
            .map(|m| m.team_id)
            .collect(),
    };

    if team_ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = sqlx::query_as::<_, EventTeamRow>(
        r#"
        SELECT e.*, t.name AS team_name, t.color AS team_color
        FROM events e
        JOIN teams t ON t.id = e.team_id
        WHERE e.team_id = ANY($1) AND e.event_date BETWEEN $2 AND $3
        ORDER BY e.event_date, e.start_time
        "#,
    )
    .bind(&team_ids)
    .bind(from)
    .bind(to)
    .fetch_all(&state.db.pool)
    .await?;

    let staff_ids = roster::staff_team_ids(&state.db.pool, user_id).await?;
    let now = chrono::Local::now().naive_local();

    Ok(build_views(rows, &staff_ids, now))
}

// Чистая сборка ленты из строк запроса
fn build_views(rows: Vec<EventTeamRow>, staff_ids: &[i64], now: NaiveDateTime) -> Vec<EventView> {
    let mut views: Vec<EventView> = rows
        .into_iter()
        .map(|row| EventView {
            can_manage: staff_ids.contains(&row.event.team_id),
            is_past: is_past(&row.event, now),
            team_name: row.team_name,
            team_color: row.team_color,
            event: row.event,
        })
        .collect();

    sort_views(&mut views);
    views
}

// Стабильная сортировка: дата, затем события без времени
// (весь день / время не задано), затем время начала. Равные ключи
// сохраняют исходный порядок.
pub fn sort_views(views: &mut [EventView]) {
    views.sort_by_key(|v| {
        let untimed = v.event.is_all_day || v.event.start_time.is_none();
        (
            v.event.event_date,
            !untimed,
            v.event.start_time.unwrap_or(NaiveTime::MIN),
        )
    });
}

/// Строго в прошлом: дата раньше сегодняшней, либо сегодня и конец
/// (или начало, если конца нет) уже наступил. События на весь день
/// считаются прошедшими только со следующего дня.
pub fn is_past(event: &Event, now: NaiveDateTime) -> bool {
    if event.event_date < now.date() {
        return true;
    }
    if event.event_date > now.date() {
        return false;
    }

    if event.is_all_day {
        return false;
    }
    match event.end_time.or(event.start_time) {
        Some(t) => t < now.time(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: i64, team_id: i64, date: &str, start: Option<(u32, u32)>, all_day: bool) -> Event {
        let ts =
            NaiveDateTime::parse_from_str("2024-06-01 10:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        Event {
            id,
            team_id,
            org_id: None,
            created_by: 1,
            title: format!("event-{}", id),
            event_type: "practice".to_string(),
            event_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            start_time: start.and_then(|(h, m)| NaiveTime::from_hms_opt(h, m, 0)),
            end_time: None,
            is_all_day: all_day,
            arrival_time: None,
            location: None,
            opponent: None,
            home_away: None,
            uniform: None,
            notes: None,
            is_cancelled: false,
            cancelled_reason: None,
            recurrence_group_id: None,
            recurrence_days: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn row(event: Event, team_name: &str, team_color: &str) -> EventTeamRow {
        EventTeamRow {
            event,
            team_name: team_name.to_string(),
            team_color: team_color.to_string(),
        }
    }

    fn noon() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2024-06-10 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn merged_feed_keeps_team_colors_and_date_order() {
        let rows = vec![
            row(event(2, 20, "2024-06-12", Some((18, 0)), false), "Юниоры", "#222"),
            row(event(1, 10, "2024-06-11", Some((19, 30)), false), "Основа", "#111"),
        ];

        let views = build_views(rows, &[], noon());

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].event.id, 1);
        assert_eq!(views[0].team_color, "#111");
        assert_eq!(views[0].team_name, "Основа");
        assert_eq!(views[1].event.id, 2);
        assert_eq!(views[1].team_color, "#222");
    }

    #[test]
    fn untimed_events_sort_before_timed_on_same_date() {
        let rows = vec![
            row(event(1, 1, "2024-06-11", Some((9, 0)), false), "T", "#111"),
            row(event(2, 1, "2024-06-11", None, true), "T", "#111"),
            row(event(3, 1, "2024-06-11", None, false), "T", "#111"),
        ];

        let views = build_views(rows, &[], noon());
        let ids: Vec<i64> = views.iter().map(|v| v.event.id).collect();

        // Сначала "весь день" и без времени (в исходном порядке), потом по времени
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn equal_keys_keep_input_order() {
        let rows = vec![
            row(event(5, 1, "2024-06-11", Some((10, 0)), false), "T", "#111"),
            row(event(6, 1, "2024-06-11", Some((10, 0)), false), "T", "#111"),
        ];
        let views = build_views(rows, &[], noon());
        let ids: Vec<i64> = views.iter().map(|v| v.event.id).collect();
        assert_eq!(ids, vec![5, 6]);
    }

    #[test]
    fn can_manage_follows_staff_teams() {
        let rows = vec![
            row(event(1, 10, "2024-06-11", None, false), "A", "#111"),
            row(event(2, 20, "2024-06-11", None, false), "B", "#222"),
        ];

        let views = build_views(rows, &[10], noon());
        assert!(views[0].can_manage);
        assert!(!views[1].can_manage);
    }

    #[test]
    fn past_by_date() {
        let e = event(1, 1, "2024-06-09", Some((9, 0)), false);
        assert!(is_past(&e, noon()));

        let e = event(2, 1, "2024-06-11", Some((9, 0)), false);
        assert!(!is_past(&e, noon()));
    }

    #[test]
    fn same_day_uses_end_or_start_time() {
        // Кончилось в 11:00 - уже прошло к полудню
        let mut e = event(1, 1, "2024-06-10", Some((9, 0)), false);
        e.end_time = NaiveTime::from_hms_opt(11, 0, 0);
        assert!(is_past(&e, noon()));

        // Конца нет, начало в 13:00 - ещё впереди
        let e = event(2, 1, "2024-06-10", Some((13, 0)), false);
        assert!(!is_past(&e, noon()));

        // Начало в 9:00 без конца - считаем по началу
        let e = event(3, 1, "2024-06-10", Some((9, 0)), false);
        assert!(is_past(&e, noon()));
    }

    #[test]
    fn all_day_today_is_not_past() {
        let e = event(1, 1, "2024-06-10", None, true);
        assert!(!is_past(&e, noon()));
    }

    #[test]
    fn scope_parses_all_and_team_ids() {
        assert_eq!(TeamScope::parse("all"), Some(TeamScope::All));
        assert_eq!(TeamScope::parse("42"), Some(TeamScope::Team(42)));
        assert!(TeamScope::parse("mine").is_none());
    }
}
