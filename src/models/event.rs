use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Одна строка расписания. Тип события и home/away храним строками,
// валидация значений - на границе команды.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub team_id: i64,
    pub org_id: Option<i64>,
    pub created_by: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub event_date: NaiveDate,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub is_all_day: bool,
    pub arrival_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub opponent: Option<String>,
    pub home_away: Option<String>,
    pub uniform: Option<String>,
    pub notes: Option<String>,
    pub is_cancelled: bool,
    pub cancelled_reason: Option<String>,
    pub recurrence_group_id: Option<Uuid>,
    pub recurrence_days: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Game,
    Scrimmage,
    Practice,
    Other,
    ClubWide,
}

impl EventType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "game" => Some(Self::Game),
            "scrimmage" => Some(Self::Scrimmage),
            "practice" => Some(Self::Practice),
            "other" => Some(Self::Other),
            "club_wide" => Some(Self::ClubWide),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Game => "game",
            Self::Scrimmage => "scrimmage",
            Self::Practice => "practice",
            Self::Other => "other",
            Self::ClubWide => "club_wide",
        }
    }

    // Для игр и товарищеских матчей вместо названия достаточно соперника
    pub fn is_matchup(&self) -> bool {
        matches!(self, Self::Game | Self::Scrimmage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomeAway {
    Home,
    Away,
    Neutral,
}

impl HomeAway {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "home" => Some(Self::Home),
            "away" => Some(Self::Away),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::Away => "away",
            Self::Neutral => "neutral",
        }
    }
}
