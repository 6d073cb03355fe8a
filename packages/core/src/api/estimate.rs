//! `GET /estimate?chain=&token=&action=&amount=`

use axum::{
    body::Body,
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Json, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::headers::{cache_control, compute_etag, if_none_match_matches, last_modified};
use super::ApiState;
use crate::chains::Chain;
use crate::error::EstimateError;
use crate::estimator::{Action, InputPayload};

type ApiError = (StatusCode, Json<Value>);

#[derive(Debug, Deserialize)]
pub struct EstimateQuery {
    pub chain: String,
    pub token: String,
    pub action: Option<String>,
    pub amount: f64,
}

impl EstimateQuery {
    /// Missing action defaults to swap; unknown actions map to `other`.
    pub fn into_input(self) -> Result<InputPayload, EstimateError> {
        let chain = self
            .chain
            .parse::<Chain>()
            .map_err(EstimateError::invalid_input)?;
        let action = match self.action.as_deref() {
            Some(raw) => raw.parse::<Action>().unwrap_or(Action::Other),
            None => Action::Swap,
        };
        Ok(InputPayload::new(chain, self.token, action, self.amount))
    }
}

fn bad_request(message: impl std::fmt::Display) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message.to_string() })))
}

/// Invalid input is the caller's fault; everything else is ours.
pub fn error_response(err: &EstimateError) -> ApiError {
    let status = match err {
        EstimateError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        EstimateError::Serialization { .. }
        | EstimateError::Hook { .. }
        | EstimateError::Aborted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": err.to_string() })))
}

pub async fn get_estimate(
    State(state): State<ApiState>,
    request_headers: HeaderMap,
    query: Result<Query<EstimateQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|rejection| bad_request(rejection.body_text()))?;
    let input = query.into_input().map_err(|err| error_response(&err))?;

    let summary = state
        .estimator
        .estimate(&input)
        .await
        .map_err(|err| error_response(&err))?;

    let body = serde_json::to_vec(&summary).map_err(|err| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("Failed to serialize summary: {}", err) })),
        )
    })?;
    let etag = compute_etag(&body);
    let max_age = state.estimator.cache_ttl().await.as_secs();

    let mut response = Response::builder()
        .header(header::CACHE_CONTROL, cache_control(max_age))
        .header(header::ETAG, etag.as_str());
    if let Some(value) = last_modified(summary.timestamp) {
        response = response.header(header::LAST_MODIFIED, value);
    }

    let response = if if_none_match_matches(&request_headers, &etag) {
        response.status(StatusCode::NOT_MODIFIED).body(Body::empty())
    } else {
        response
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
    };

    response.map_err(|err| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("Failed to build response: {}", err) })),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(chain: &str, action: Option<&str>, amount: f64) -> EstimateQuery {
        EstimateQuery {
            chain: chain.to_string(),
            token: "ETH".to_string(),
            action: action.map(str::to_string),
            amount,
        }
    }

    #[test]
    fn missing_action_defaults_to_swap() {
        let input = query("ethereum", None, 1.0).into_input().unwrap();
        assert_eq!(input.action, Action::Swap);
        assert_eq!(input.chain, Chain::Ethereum);
    }

    #[test]
    fn unknown_action_is_costed_as_other() {
        let input = query("arbitrum", Some("lend"), 1.0).into_input().unwrap();
        assert_eq!(input.action, Action::Other);
    }

    #[test]
    fn unknown_chain_is_invalid_input() {
        let err = query("solana", None, 1.0).into_input().unwrap_err();
        assert!(matches!(err, EstimateError::InvalidInput { .. }));
    }

    #[test]
    fn errors_map_to_status_codes() {
        let (status, Json(body)) = error_response(&EstimateError::invalid_input("bad amount"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid input: bad amount");

        let (status, _) = error_response(&EstimateError::hook(0, "down"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, _) = error_response(&EstimateError::aborted("estimate panicked"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
