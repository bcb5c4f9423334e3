//! # routes::recipients

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{error::AppError, models::ChatId, state::SharedState};

#[derive(Deserialize)]
pub struct RegisterBody {
    pub chat_id: ChatId,
}

/// GET /api/recipients
pub async fn list_recipients(State(state): State<SharedState>) -> Result<impl IntoResponse, AppError> {
    let ids = state.recipients.list().await?;
    Ok(Json(json!({ "ok": true, "chat_ids": ids })))
}

/// POST /api/recipients — `{ "chat_id": 123456 }`
pub async fn register(
    State(state): State<SharedState>,
    Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, AppError> {
    let registered = state.recipients.register(body.chat_id).await?;
    let status = if registered { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(json!({ "ok": true, "chat_id": body.chat_id, "registered": registered }))))
}

/// DELETE /api/recipients/:chat_id
pub async fn unregister(
    State(state): State<SharedState>,
    Path(chat_id): Path<ChatId>,
) -> Result<impl IntoResponse, AppError> {
    if !state.recipients.unregister(chat_id).await? {
        return Err(AppError::NotFound(format!("chat {chat_id} is not registered")));
    }
    Ok(Json(json!({ "ok": true, "chat_id": chat_id, "removed": true })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::build_router;
    use crate::routes::test_support::call;
    use crate::testutil::{make_state, FakeMessenger, FakeProvider};

    #[tokio::test]
    async fn test_recipients_crud() {
        let t = make_state(FakeProvider::default(), FakeMessenger::default()).await;
        let app = build_router(t.state.clone());

        let (status, body) = call(&app, "POST", "/api/recipients", Some(json!({ "chat_id": -100200 }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["registered"], true);

        let (status, _) = call(&app, "POST", "/api/recipients", Some(json!({ "chat_id": -100200 }))).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, "GET", "/api/recipients", None).await;
        assert_eq!(body["chat_ids"], json!([-100200]));

        let (status, _) = call(&app, "DELETE", "/api/recipients/-100200", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&app, "DELETE", "/api/recipients/-100200", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
