//! realtime.rs
//!
//! Realtime-сигналы "что-то поменялось" поверх Redis pub/sub.
//!
//! Каждая успешная мутация публикует непрозрачный сигнал в канал
//! своей команды (отдельно для таблиц events и rsvps). Подключённые
//! клиенты держат websocket и на любой кадр перечитывают свою
//! рабочую выборку целиком - инкрементальных патчей нет, перечитка
//! только читает и ни с чем не конфликтует.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::AppState;

/// Публикует сигнал изменения. Провал публикации логируется и
/// глотается: команда уже выполнилась, откатывать её из-за Redis нельзя.
pub async fn publish_changed(state: &AppState, team_id: i64, table: &str) {
    let channel = format!("team:{}:{}", team_id, table);
    let payload = json!({ "team_id": team_id, "table": table, "changed": true }).to_string();

    let mut conn = state.redis.conn.clone();
    let result: redis::RedisResult<()> = redis::cmd("PUBLISH")
        .arg(&channel)
        .arg(&payload)
        .query_async(&mut conn)
        .await;

    match result {
        Ok(()) => debug!("published change signal to {}", channel),
        Err(e) => warn!("failed to publish change signal to {}: {:?}", channel, e),
    }
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/events", get(ws_handler))
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    team_id: i64,
}

// GET /ws/events?team_id=N - подписка на сигналы одной команды
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params.team_id))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, team_id: i64) {
    // pubsub требует выделенного соединения, мультиплексное не годится
    let mut pubsub = match state.redis.client.get_async_pubsub().await {
        Ok(p) => p,
        Err(e) => {
            warn!("ws: failed to open pubsub connection: {:?}", e);
            return;
        }
    };

    let channels = vec![
        format!("team:{}:events", team_id),
        format!("team:{}:rsvps", team_id),
    ];
    if let Err(e) = pubsub.subscribe(&channels).await {
        warn!("ws: failed to subscribe to {:?}: {:?}", channels, e);
        return;
    }

    debug!("ws: client subscribed to team {}", team_id);

    let mut messages = pubsub.on_message();
    loop {
        tokio::select! {
            msg = messages.next() => {
                let Some(msg) = msg else { break };
                let payload: String = msg.get_payload().unwrap_or_default();
                if socket.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    // Ping/pong axum отвечает сам, остальное игнорируем
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    debug!("ws: client for team {} disconnected", team_id);
}
