//! roster.rs
//!
//! Составы команд: кто в какой команде и с какой ролью.
//! Движок расписания сам ролей не выводит - только спрашивает здесь.

use crate::models::TeamMembership;

// Есть ли у пользователя staff-роль в команде (тренер, менеджер).
// Родительские и игровые роли управлять расписанием не могут.
pub async fn is_staff(
    pool: &sqlx::PgPool,
    user_id: i64,
    team_id: i64,
) -> sqlx::Result<bool> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(
            SELECT 1 FROM team_members
            WHERE user_id = $1 AND team_id = $2 AND role = 'staff'
         )",
    )
    .bind(user_id)
    .bind(team_id)
    .fetch_one(pool)
    .await
}

/// Все команды пользователя с цветом и ролью - для выбора области
/// просмотра и раскраски календаря.
pub async fn teams_of(
    pool: &sqlx::PgPool,
    user_id: i64,
) -> sqlx::Result<Vec<TeamMembership>> {
    sqlx::query_as::<_, TeamMembership>(
        r#"
        SELECT t.id AS team_id, t.name, t.color, m.role
        FROM team_members m
        JOIN teams t ON t.id = m.team_id
        WHERE m.user_id = $1
        ORDER BY t.name
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Команды, где пользователь staff, одним запросом - чтобы не ходить
/// в БД по разу на каждое событие агрегатора.
pub async fn staff_team_ids(pool: &sqlx::PgPool, user_id: i64) -> sqlx::Result<Vec<i64>> {
    sqlx::query_scalar::<_, i64>(
        "SELECT team_id FROM team_members WHERE user_id = $1 AND role = 'staff'",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
