use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Единая таксономия ошибок движка. Каждая команда возвращает либо
// значение, либо одну из этих ошибок - ничего не "пролетает" мимо.
#[derive(Debug, Error)]
pub enum EngineError {
    // Не заполнено обязательное поле, неверный формат и т.п.
    // Всегда до первой записи в БД.
    #[error("{0}")]
    Validation(String),

    // Повторяющееся событие не дало ни одной даты в диапазоне
    #[error("в выбранном диапазоне нет ни одной подходящей даты")]
    EmptyRecurrence,

    // Событие/ответ уже не существует
    #[error("запись не найдена")]
    NotFound,

    // Нет staff-роли в команде события
    #[error("недостаточно прав для этого действия")]
    Forbidden,

    // Ошибка удалённого хранилища - отдаем как есть, без ретраев
    #[error("ошибка хранилища")]
    Storage(#[from] sqlx::Error),
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            EngineError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            EngineError::EmptyRecurrence => (StatusCode::BAD_REQUEST, self.to_string()),
            EngineError::NotFound => (StatusCode::NOT_FOUND, self.to_string()),
            EngineError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            EngineError::Storage(e) => {
                tracing::error!("storage error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Не удалось выполнить операцию, попробуйте ещё раз".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_is_preserved() {
        let err = EngineError::Validation("укажите название".to_string());
        assert_eq!(err.to_string(), "укажите название");
    }

    #[test]
    fn storage_wraps_sqlx() {
        let err: EngineError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, EngineError::Storage(_)));
    }
}
