//! # routes::watchlist

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{error::AppError, state::SharedState};

#[derive(Deserialize)]
pub struct AddTickerBody {
    pub ticker: String,
}

/// GET /api/watchlist
pub async fn list_watchlist(State(state): State<SharedState>) -> Result<impl IntoResponse, AppError> {
    let tickers = state.watchlist.load().await?;
    Ok(Json(json!({ "ok": true, "tickers": tickers })))
}

/// POST /api/watchlist — `{ "ticker": "BBRI" }`
pub async fn add_ticker(
    State(state): State<SharedState>,
    Json(body): Json<AddTickerBody>,
) -> Result<impl IntoResponse, AppError> {
    let ticker = state.watchlist.parse(&body.ticker)?;
    let added = state.watchlist.add(&body.ticker).await?;

    let status = if added { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(json!({ "ok": true, "ticker": ticker, "added": added }))))
}

/// DELETE /api/watchlist/:ticker
pub async fn remove_ticker(
    State(state): State<SharedState>,
    Path(raw): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ticker = state.watchlist.parse(&raw)?;
    if !state.watchlist.remove(&raw).await? {
        return Err(AppError::NotFound(format!("{ticker} is not in the watchlist")));
    }
    Ok(Json(json!({ "ok": true, "ticker": ticker, "removed": true })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::routes::build_router;
    use crate::routes::test_support::call;
    use crate::testutil::{make_state, FakeMessenger, FakeProvider};

    #[tokio::test]
    async fn test_watchlist_crud() {
        let t = make_state(FakeProvider::default(), FakeMessenger::default()).await;
        let app = build_router(t.state.clone());

        let (status, body) = call(&app, "GET", "/api/watchlist", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tickers"], json!(["BBRI.JK", "BMRI.JK"]));

        let (status, body) = call(&app, "POST", "/api/watchlist", Some(json!({ "ticker": "tlkm" }))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["ticker"], "TLKM.JK");

        let (status, body) = call(&app, "POST", "/api/watchlist", Some(json!({ "ticker": "TLKM.JK" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["added"], false);

        let (status, _) = call(&app, "DELETE", "/api/watchlist/bmri", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, "DELETE", "/api/watchlist/BMRI", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["ok"], false);

        let (_, body) = call(&app, "GET", "/api/watchlist", None).await;
        assert_eq!(body["tickers"], json!(["BBRI.JK", "TLKM.JK"]));
    }

    #[tokio::test]
    async fn test_invalid_ticker_is_bad_request() {
        let t = make_state(FakeProvider::default(), FakeMessenger::default()).await;
        let app = build_router(t.state.clone());

        let (status, body) = call(&app, "POST", "/api/watchlist", Some(json!({ "ticker": "a b" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Invalid ticker"));
    }
}
