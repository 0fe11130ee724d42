//! events.rs
//!
//! Командная поверхность хранилища событий.
//!
//! Все мутации расписания проходят через этот модуль: одиночное и
//! повторяющееся создание, частичное обновление, отмена/восстановление
//! и удаление (одной строки или "этой и всех будущих" в группе).
//! Каждая успешная команда уведомляет push-шлюз и публикует
//! realtime-сигнал; провал доставки уведомления команду не валит.

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Deserializer};
use std::collections::HashSet;

use crate::{
    error::EngineError,
    models::{Event, EventType, HomeAway},
    realtime,
    services::{
        notifier::NotifyAction,
        recurrence,
    },
    AppState,
};

/* ---------- входные структуры ---------- */

// Черновик события: всё, что клиент присылает при создании.
// Дата для повторяющихся серий берётся из разворачивания, не отсюда.
#[derive(Debug, Clone, Deserialize)]
pub struct EventDraft {
    pub team_id: i64,
    pub org_id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub event_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub is_all_day: bool,
    pub arrival_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub opponent: Option<String>,
    pub home_away: Option<String>,
    pub uniform: Option<String>,
    pub notes: Option<String>,
}

// Для NULL-able колонок различаем "поле не прислали" (None - колонку
// не трогаем) и "прислали null" (Some(None) - очищаем в NULL)
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPatch {
    pub title: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_all_day: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub arrival_time: Option<Option<NaiveTime>>,
    #[serde(default, deserialize_with = "double_option")]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub opponent: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub home_away: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub uniform: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
}

/* ---------- валидация (чистая) ---------- */

// Проверяет черновик до первого обращения к БД и приводит его
// к инвариантному виду: "весь день" исключает время начала/конца.
pub fn validate_draft(draft: &mut EventDraft) -> Result<(), EngineError> {
    let event_type = EventType::parse(&draft.event_type)
        .ok_or_else(|| EngineError::Validation("неизвестный тип события".to_string()))?;

    let has_title = !draft.title.trim().is_empty();
    let has_opponent = draft
        .opponent
        .as_deref()
        .map(|o| !o.trim().is_empty())
        .unwrap_or(false);

    // Для игры/скриммиджа достаточно соперника вместо названия
    if event_type.is_matchup() {
        if !has_title && !has_opponent {
            return Err(EngineError::Validation(
                "укажите соперника или название события".to_string(),
            ));
        }
    } else if !has_title {
        return Err(EngineError::Validation("укажите название события".to_string()));
    }

    if let Some(ha) = draft.home_away.as_deref() {
        if HomeAway::parse(ha).is_none() {
            return Err(EngineError::Validation(
                "home_away: допустимы home | away | neutral".to_string(),
            ));
        }
    }

    if draft.is_all_day {
        draft.start_time = None;
        draft.end_time = None;
    }

    Ok(())
}

fn parse_weekdays(codes: &[String]) -> Result<HashSet<Weekday>, EngineError> {
    if codes.is_empty() {
        return Err(EngineError::Validation(
            "выберите хотя бы один день недели".to_string(),
        ));
    }

    let mut days = HashSet::new();
    for code in codes {
        let day = recurrence::weekday_from_code(code).ok_or_else(|| {
            EngineError::Validation(format!("неизвестный день недели: {}", code))
        })?;
        days.insert(day);
    }
    Ok(days)
}

// Какие значимые поля поменялись - для текста push-уведомления.
// Интересны только дата, время и место.
pub fn changed_fields(old: &Event, new: &Event) -> Vec<String> {
    let mut changed = Vec::new();
    if old.event_date != new.event_date {
        changed.push("date".to_string());
    }
    if old.start_time != new.start_time
        || old.end_time != new.end_time
        || old.is_all_day != new.is_all_day
    {
        changed.push("time".to_string());
    }
    if old.location != new.location {
        changed.push("location".to_string());
    }
    changed
}

/* ---------- вспомогательные запросы ---------- */

pub async fn fetch_event(pool: &sqlx::PgPool, event_id: i64) -> Result<Event, EngineError> {
    sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
        .bind(event_id)
        .fetch_optional(pool)
        .await?
        .ok_or(EngineError::NotFound)
}

const INSERT_EVENT: &str = r#"
    INSERT INTO events (
        team_id, org_id, created_by, title, event_type, event_date,
        start_time, end_time, is_all_day, arrival_time, location,
        opponent, home_away, uniform, notes,
        recurrence_group_id, recurrence_days
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
    RETURNING *
"#;

/* ---------- команды ---------- */

/// Создаёт одно событие. Валидация - до записи, уведомление - после.
pub async fn create_single(
    state: &AppState,
    created_by: i64,
    mut draft: EventDraft,
) -> Result<Event, EngineError> {
    validate_draft(&mut draft)?;

    let event = sqlx::query_as::<_, Event>(INSERT_EVENT)
        .bind(draft.team_id)
        .bind(draft.org_id)
        .bind(created_by)
        .bind(draft.title.trim())
        .bind(&draft.event_type)
        .bind(draft.event_date)
        .bind(draft.start_time)
        .bind(draft.end_time)
        .bind(draft.is_all_day)
        .bind(draft.arrival_time)
        .bind(&draft.location)
        .bind(&draft.opponent)
        .bind(&draft.home_away)
        .bind(&draft.uniform)
        .bind(&draft.notes)
        .bind(None::<uuid::Uuid>)
        .bind(None::<String>)
        .fetch_one(&state.db.pool)
        .await?;

    state.notifier.notify(event.id, NotifyAction::Created, None);
    realtime::publish_changed(state, event.team_id, "events").await;

    Ok(event)
}

/// Разворачивает серию и создаёт по строке на каждую дату. Все строки
/// делят один идентификатор группы и одинаковые не-датные поля.
/// Вставка идёт в транзакции: частичный успех откатывается целиком,
/// вызывающему не приходится чистить хвосты.
pub async fn create_recurring(
    state: &AppState,
    created_by: i64,
    mut draft: EventDraft,
    range_start: NaiveDate,
    range_end: NaiveDate,
    weekday_codes: &[String],
) -> Result<Vec<Event>, EngineError> {
    validate_draft(&mut draft)?;
    let weekdays = parse_weekdays(weekday_codes)?;

    let dates = recurrence::expand(range_start, range_end, &weekdays);
    if dates.is_empty() {
        return Err(EngineError::EmptyRecurrence);
    }

    let group_id = recurrence::new_group_id();
    // Дни храним в каноническом порядке недели, не как прислал клиент
    let days_joined = [
        Weekday::Sun, Weekday::Mon, Weekday::Tue, Weekday::Wed,
        Weekday::Thu, Weekday::Fri, Weekday::Sat,
    ]
    .iter()
    .filter(|d| weekdays.contains(d))
    .map(|d| recurrence::weekday_code(*d))
    .collect::<Vec<_>>()
    .join(",");

    let mut tx = state.db.pool.begin().await?;
    let mut created = Vec::with_capacity(dates.len());

    for date in dates {
        let event = sqlx::query_as::<_, Event>(INSERT_EVENT)
            .bind(draft.team_id)
            .bind(draft.org_id)
            .bind(created_by)
            .bind(draft.title.trim())
            .bind(&draft.event_type)
            .bind(date)
            .bind(draft.start_time)
            .bind(draft.end_time)
            .bind(draft.is_all_day)
            .bind(draft.arrival_time)
            .bind(&draft.location)
            .bind(&draft.opponent)
            .bind(&draft.home_away)
            .bind(&draft.uniform)
            .bind(&draft.notes)
            .bind(group_id)
            .bind(&days_joined)
            .fetch_one(&mut *tx)
            .await?;
        created.push(event);
    }

    tx.commit().await?;

    tracing::info!(
        "created recurring series {}: {} events for team {}",
        group_id,
        created.len(),
        draft.team_id
    );

    // Одно уведомление на всю серию, не по штуке на строку
    if let Some(first) = created.first() {
        state.notifier.notify(first.id, NotifyAction::Created, None);
    }
    realtime::publish_changed(state, draft.team_id, "events").await;

    Ok(created)
}

// Инвариант "весь день исключает время" проверяется по эффективному
// состоянию: что получится из хранимого флага после применения патча.
// Патч {start_time} к событию с is_all_day = TRUE обязан либо снять
// флаг (is_all_day: false), либо быть отвергнут.
pub fn validate_patch_times(stored_all_day: bool, patch: &EventPatch) -> Result<(), EngineError> {
    let all_day = patch.is_all_day.unwrap_or(stored_all_day);
    if all_day && (patch.start_time.is_some() || patch.end_time.is_some()) {
        return Err(EngineError::Validation(
            "событие на весь день не может иметь времени начала/конца".to_string(),
        ));
    }
    Ok(())
}

/// Частичное обновление одной строки. Соседи по группе никогда
/// не трогаются массово. Строку берём у вызывающего: он уже
/// прочитал её для проверки прав, второй раз в БД не ходим.
pub async fn update(
    state: &AppState,
    old: Event,
    patch: EventPatch,
) -> Result<Event, EngineError> {
    if let Some(Some(ha)) = patch.home_away.as_ref() {
        if HomeAway::parse(ha).is_none() {
            return Err(EngineError::Validation(
                "home_away: допустимы home | away | neutral".to_string(),
            ));
        }
    }
    validate_patch_times(old.is_all_day, &patch)?;

    let event_id = old.id;

    // Динамический UPDATE: в SET попадают только присланные поля
    let mut sets: Vec<String> = vec!["updated_at = NOW()".to_string()];
    let mut bind_idx = 2; // $1 занят id

    let mut push = |sets: &mut Vec<String>, column: &str| {
        sets.push(format!("{} = ${}", column, bind_idx));
        bind_idx += 1;
    };

    if patch.title.is_some() { push(&mut sets, "title"); }
    if patch.event_date.is_some() { push(&mut sets, "event_date"); }
    if patch.start_time.is_some() { push(&mut sets, "start_time"); }
    if patch.end_time.is_some() { push(&mut sets, "end_time"); }
    if patch.arrival_time.is_some() { push(&mut sets, "arrival_time"); }
    if patch.location.is_some() { push(&mut sets, "location"); }
    if patch.opponent.is_some() { push(&mut sets, "opponent"); }
    if patch.home_away.is_some() { push(&mut sets, "home_away"); }
    if patch.uniform.is_some() { push(&mut sets, "uniform"); }
    if patch.notes.is_some() { push(&mut sets, "notes"); }

    match patch.is_all_day {
        Some(true) => {
            sets.push("is_all_day = TRUE".to_string());
            sets.push("start_time = NULL".to_string());
            sets.push("end_time = NULL".to_string());
        }
        Some(false) => sets.push("is_all_day = FALSE".to_string()),
        None => {}
    }

    let q = format!(
        "UPDATE events SET {} WHERE id = $1 RETURNING *",
        sets.join(", ")
    );

    let mut dbq = sqlx::query_as::<_, Event>(&q).bind(event_id);
    if let Some(v) = patch.title { dbq = dbq.bind(v); }
    if let Some(v) = patch.event_date { dbq = dbq.bind(v); }
    if let Some(v) = patch.start_time { dbq = dbq.bind(v); }
    if let Some(v) = patch.end_time { dbq = dbq.bind(v); }
    if let Some(v) = patch.arrival_time { dbq = dbq.bind(v); }
    if let Some(v) = patch.location { dbq = dbq.bind(v); }
    if let Some(v) = patch.opponent { dbq = dbq.bind(v); }
    if let Some(v) = patch.home_away { dbq = dbq.bind(v); }
    if let Some(v) = patch.uniform { dbq = dbq.bind(v); }
    if let Some(v) = patch.notes { dbq = dbq.bind(v); }

    let updated = dbq
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or(EngineError::NotFound)?;

    let changed = changed_fields(&old, &updated);
    state.notifier.notify(
        updated.id,
        NotifyAction::Updated,
        if changed.is_empty() { None } else { Some(changed) },
    );
    realtime::publish_changed(state, updated.team_id, "events").await;

    Ok(updated)
}

/// Отмена обратима: флаг + причина, данные и RSVP не трогаем.
pub async fn cancel(
    state: &AppState,
    event_id: i64,
    reason: Option<String>,
) -> Result<Event, EngineError> {
    let event = sqlx::query_as::<_, Event>(
        "UPDATE events
         SET is_cancelled = TRUE, cancelled_reason = $2, updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(event_id)
    .bind(&reason)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or(EngineError::NotFound)?;

    state.notifier.notify(event.id, NotifyAction::Cancelled, None);
    realtime::publish_changed(state, event.team_id, "events").await;

    Ok(event)
}

pub async fn restore(state: &AppState, event_id: i64) -> Result<Event, EngineError> {
    let event = sqlx::query_as::<_, Event>(
        "UPDATE events
         SET is_cancelled = FALSE, cancelled_reason = NULL, updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(event_id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or(EngineError::NotFound)?;

    state.notifier.notify(event.id, NotifyAction::Uncancelled, None);
    realtime::publish_changed(state, event.team_id, "events").await;

    Ok(event)
}

/// Удаляет одну строку. RSVP чистим явно в той же транзакции
/// (FK с каскадом тоже есть, но так видно, что именно происходит).
/// Строка приходит от вызывающего - он уже прочитал её для
/// проверки прав.
pub async fn delete_single(state: &AppState, event: &Event) -> Result<(), EngineError> {
    let mut tx = state.db.pool.begin().await?;

    sqlx::query("DELETE FROM rsvps WHERE event_id = $1")
        .bind(event.id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    realtime::publish_changed(state, event.team_id, "events").await;
    realtime::publish_changed(state, event.team_id, "rsvps").await;

    Ok(())
}

/// "Эту и все будущие": удаляет строки группы с датой >= даты этого
/// события вместе с их RSVP. Без группы вырождается в delete_single.
pub async fn delete_group_from_date(
    state: &AppState,
    event: &Event,
) -> Result<u64, EngineError> {
    let Some(group_id) = event.recurrence_group_id else {
        delete_single(state, event).await?;
        return Ok(1);
    };

    let mut tx = state.db.pool.begin().await?;

    sqlx::query(
        "DELETE FROM rsvps
         WHERE event_id IN (
             SELECT id FROM events
             WHERE recurrence_group_id = $1 AND event_date >= $2
         )",
    )
    .bind(group_id)
    .bind(event.event_date)
    .execute(&mut *tx)
    .await?;

    let deleted = sqlx::query(
        "DELETE FROM events WHERE recurrence_group_id = $1 AND event_date >= $2",
    )
    .bind(group_id)
    .bind(event.event_date)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    tracing::info!(
        "deleted {} events of series {} from {}",
        deleted,
        group_id,
        event.event_date
    );

    realtime::publish_changed(state, event.team_id, "events").await;
    realtime::publish_changed(state, event.team_id, "rsvps").await;

    Ok(deleted)
}
