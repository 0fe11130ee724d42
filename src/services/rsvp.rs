//! rsvp.rs
//!
//! Журнал ответов на события.
//!
//! Ровно одна строка на пару (событие, пользователь) - upsert через
//! ON CONFLICT, дубликатов не бывает. Статусы pending/yes/no/maybe
//! переключаются свободно в любую сторону, терминального состояния нет.

use crate::{
    error::EngineError,
    models::{Rsvp, RsvpCounts, RsvpStatus},
    realtime,
    AppState,
};

/// Записывает или обновляет ответ пользователя. Причина отказа
/// сохраняется только при статусе "no" (пустая строка допустима -
/// пользователь пропустил необязательное поле), при остальных
/// статусах затирается.
pub async fn respond(
    state: &AppState,
    event_id: i64,
    user_id: i64,
    player_id: Option<i64>,
    status: RsvpStatus,
    decline_reason: Option<String>,
) -> Result<Rsvp, EngineError> {
    // Событие должно существовать - иначе NotFound, а не ошибка FK
    let event = crate::services::events::fetch_event(&state.db.pool, event_id).await?;

    let reason = normalize_decline_reason(status, decline_reason);

    let rsvp = sqlx::query_as::<_, Rsvp>(
        r#"
        INSERT INTO rsvps (event_id, user_id, player_id, status, decline_reason)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (event_id, user_id)
        DO UPDATE SET
            status = EXCLUDED.status,
            player_id = EXCLUDED.player_id,
            decline_reason = EXCLUDED.decline_reason,
            updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(event_id)
    .bind(user_id)
    .bind(player_id)
    .bind(status.as_str())
    .bind(&reason)
    .fetch_one(&state.db.pool)
    .await?;

    realtime::publish_changed(state, event.team_id, "rsvps").await;

    Ok(rsvp)
}

// Чистое правило: причина отказа имеет смысл только при "no".
// None и Some("") различимы - "не спрашивали" против "пропустил".
pub fn normalize_decline_reason(
    status: RsvpStatus,
    decline_reason: Option<String>,
) -> Option<String> {
    match status {
        RsvpStatus::No => decline_reason,
        _ => None,
    }
}

/// Агрегаты по статусам. Событие без единого ответа - все нули,
/// а не ошибка.
pub async fn counts(state: &AppState, event_id: i64) -> Result<RsvpCounts, EngineError> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT status, COUNT(*) FROM rsvps WHERE event_id = $1 GROUP BY status",
    )
    .bind(event_id)
    .fetch_all(&state.db.pool)
    .await?;

    Ok(counts_from_rows(&rows))
}

// Свёртка сгруппированных строк в счётчики. Неизвестные статусы
// в БД появиться не могут, но на всякий случай просто пропускаются.
pub fn counts_from_rows(rows: &[(String, i64)]) -> RsvpCounts {
    let mut counts = RsvpCounts::default();
    for (status, n) in rows {
        match RsvpStatus::parse(status) {
            Some(RsvpStatus::Yes) => counts.yes += n,
            Some(RsvpStatus::No) => counts.no += n,
            Some(RsvpStatus::Maybe) => counts.maybe += n,
            Some(RsvpStatus::Pending) => counts.pending += n,
            None => tracing::warn!("unknown rsvp status in storage: {}", status),
        }
    }
    counts
}

/// Ответ конкретного пользователя на событие, если он есть.
pub async fn mine(
    state: &AppState,
    event_id: i64,
    user_id: i64,
) -> Result<Option<Rsvp>, EngineError> {
    let rsvp = sqlx::query_as::<_, Rsvp>(
        "SELECT * FROM rsvps WHERE event_id = $1 AND user_id = $2",
    )
    .bind(event_id)
    .bind(user_id)
    .fetch_optional(&state.db.pool)
    .await?;

    Ok(rsvp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decline_reason_kept_only_for_no() {
        assert_eq!(
            normalize_decline_reason(RsvpStatus::No, Some("болеет".to_string())),
            Some("болеет".to_string())
        );
        // Пустая строка - "пропустил поле", сохраняется как есть
        assert_eq!(
            normalize_decline_reason(RsvpStatus::No, Some(String::new())),
            Some(String::new())
        );
        assert_eq!(normalize_decline_reason(RsvpStatus::No, None), None);

        assert_eq!(
            normalize_decline_reason(RsvpStatus::Yes, Some("болеет".to_string())),
            None
        );
        assert_eq!(
            normalize_decline_reason(RsvpStatus::Maybe, Some("x".to_string())),
            None
        );
    }

    #[test]
    fn counts_sum_equals_row_total() {
        let rows = vec![
            ("yes".to_string(), 7),
            ("no".to_string(), 2),
            ("maybe".to_string(), 3),
            ("pending".to_string(), 5),
        ];
        let counts = counts_from_rows(&rows);
        assert_eq!(counts.yes, 7);
        assert_eq!(counts.no, 2);
        assert_eq!(counts.maybe, 3);
        assert_eq!(counts.pending, 5);
        assert_eq!(counts.total(), 17);
    }

    #[test]
    fn no_rows_means_all_zero() {
        let counts = counts_from_rows(&[]);
        assert_eq!(counts, RsvpCounts::default());
        assert_eq!(counts.total(), 0);
    }

    #[test]
    fn unknown_status_is_skipped() {
        let rows = vec![("yes".to_string(), 1), ("perhaps".to_string(), 4)];
        let counts = counts_from_rows(&rows);
        assert_eq!(counts.total(), 1);
    }

    #[test]
    fn all_statuses_parse_both_ways() {
        for s in ["yes", "no", "maybe", "pending"] {
            assert_eq!(RsvpStatus::parse(s).unwrap().as_str(), s);
        }
        assert!(RsvpStatus::parse("YES").is_none());
    }
}
