use crate::ServerState;
use netmon_core::FeedRecord;
use poem::{
    handler,
    http::StatusCode,
    web::{Data, Json, Query},
    IntoResponse, Response,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub minutes: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// `GET /api/network/current`
#[handler]
pub async fn current(Data(state): Data<&Arc<ServerState>>) -> Response {
    match state.monitor.current_snapshot().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            error!("Error fetching current network stats: {e}");
            let body = ErrorBody {
                error: "Failed to fetch current network stats".to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

/// `GET /api/network/recent?minutes=<n>`
#[handler]
pub async fn recent(
    Query(query): Query<RecentQuery>,
    Data(state): Data<&Arc<ServerState>>,
) -> Json<Vec<FeedRecord>> {
    let minutes = parse_minutes(query.minutes.as_deref());
    Json(state.monitor.recent_window(minutes))
}

/// Read the leading integer of `raw` (optional sign, then digits); trailing
/// text is ignored. A missing, unparsable or zero window means "use the
/// default".
fn parse_minutes(raw: Option<&str>) -> Option<i64> {
    let raw = raw?.trim_start();
    let sign_len = usize::from(raw.starts_with(['+', '-']));
    let digits_len = raw[sign_len..]
        .bytes()
        .take_while(u8::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }
    match raw[..sign_len + digits_len].parse::<i64>() {
        Ok(0) | Err(_) => None,
        Ok(minutes) => Some(minutes),
    }
}
