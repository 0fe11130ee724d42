use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Ответ одного пользователя на одно событие.
// Для пары (event_id, user_id) существует максимум одна строка - upsert.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Rsvp {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    // Родительский аккаунт может отвечать за ребёнка
    pub player_id: Option<i64>,
    pub status: String,
    pub decline_reason: Option<String>,
    pub responded_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsvpStatus {
    Yes,
    No,
    Maybe,
    Pending,
}

impl RsvpStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "yes" => Some(Self::Yes),
            "no" => Some(Self::No),
            "maybe" => Some(Self::Maybe),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
            Self::Maybe => "maybe",
            Self::Pending => "pending",
        }
    }
}

// Агрегаты всегда выводятся группировкой строк по статусу,
// никаких отдельных счётчиков в БД нет.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RsvpCounts {
    pub yes: i64,
    pub no: i64,
    pub maybe: i64,
    pub pending: i64,
}

impl RsvpCounts {
    pub fn total(&self) -> i64 {
        self.yes + self.no + self.maybe + self.pending
    }
}
