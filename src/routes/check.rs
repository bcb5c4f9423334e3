//! # routes::check
//!
//! `GET /api/check/:ticker?period=3mo` — run the signal pipeline for one
//! ticker and return the latest signal, without alerting anyone.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{error::AppError, provider::Period, state::SharedState};

#[derive(Deserialize)]
pub struct CheckQuery {
    pub period: Option<String>,
}

pub async fn check_ticker(
    State(state): State<SharedState>,
    Path(raw): Path<String>,
    Query(query): Query<CheckQuery>,
) -> Result<impl IntoResponse, AppError> {
    let ticker = state.watchlist.parse(&raw)?;
    let period: Period = match query.period.as_deref() {
        Some(p) => p.parse()?,
        None => Period::default(),
    };

    let result = state.scanner.check(&ticker, period).await?;

    Ok(Json(json!({
        "ok":            true,
        "ticker":        ticker,
        "period":        period,
        "bars":          result.series.len(),
        "latest_signal": result.latest_signal(),
    })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::routes::build_router;
    use crate::routes::test_support::call;
    use crate::testutil::{make_state, signal_bars, FakeMessenger, FakeProvider};

    #[tokio::test]
    async fn test_check_reports_signal_without_alerting() {
        let provider = FakeProvider::default().with_bars("BBRI.JK", signal_bars());
        let t = make_state(provider, FakeMessenger::default()).await;
        t.state.recipients.register(1).await.unwrap();
        let app = build_router(t.state.clone());

        let (status, body) = call(&app, "GET", "/api/check/bbri?period=3mo", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticker"], "BBRI.JK");
        assert_eq!(body["period"], "3mo");
        assert_eq!(body["bars"], 2);
        assert_eq!(body["latest_signal"]["date"], "2024-05-14");
        assert_eq!(body["latest_signal"]["is_signal"], true);
        assert!(t.messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn test_check_errors() {
        let t = make_state(FakeProvider::default(), FakeMessenger::default()).await;
        let app = build_router(t.state.clone());

        let (status, _) = call(&app, "GET", "/api/check/BBRI?period=9y", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(&app, "GET", "/api/check/ZZZZ", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["ok"], false);
    }
}
