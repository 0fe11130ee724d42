use serde::Serialize;
use sqlx::FromRow;

// Команда глазами одного пользователя: членство + цвет для календаря.
// role: staff | player | parent
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TeamMembership {
    pub team_id: i64,
    pub name: String,
    // hex вида #1f6f4a
    pub color: String,
    pub role: String,
}
