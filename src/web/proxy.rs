use log::{error, info};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::header::{HeaderMap, HeaderValue};
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::api::{LiFiClient, ProxyError, UpstreamResponse};
use crate::bubbles::BubbleLayoutEngine;
use crate::metrics;
use crate::models::top_cryptocurrencies;
use crate::validation::validate_dimensions;
use crate::web::validation::quote_params;

pub struct AppState {
    pub lifi: LiFiClient,
    pub bubbles: BubbleLayoutEngine,
}

type Query = Vec<(String, String)>;

#[derive(Debug, Deserialize)]
pub struct BubbleQuery {
    pub width: Option<f64>,
    pub height: Option<f64>,
}

pub fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn lifi_path() -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::path("api").and(warp::path("lifi"))
}

/// All HTTP routes. Every response, including rejections, carries the CORS headers.
pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let preflight = lifi_path()
        .and(warp::path::tail())
        .and(warp::options())
        .map(|_| preflight_response());

    let quote = lifi_path()
        .and(warp::path("quote"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<Query>())
        .and(with_state(state.clone()))
        .and_then(handle_quote);

    let tokens = lifi_path()
        .and(warp::path("tokens"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(handle_tokens);

    let forward_get = lifi_path()
        .and(warp::path::tail())
        .and(warp::get())
        .and(warp::query::<Query>())
        .and(with_state(state.clone()))
        .and_then(handle_get);

    let forward_post = lifi_path()
        .and(warp::path::tail())
        .and(warp::post())
        .and(warp::query::<Query>())
        .and(warp::body::bytes())
        .and(with_state(state.clone()))
        .and_then(handle_post);

    let bubbles = warp::path("api")
        .and(warp::path("bubbles"))
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::query::<BubbleQuery>())
        .and(with_state(state))
        .and_then(handle_bubbles);

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| {
            warp::reply::json(&json!({
                "status": "ok",
                "timestamp": chrono::Utc::now().to_rfc3339()
            }))
        });

    let metrics_route = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(handle_metrics);

    preflight
        .or(quote)
        .or(tokens)
        .or(forward_get)
        .or(forward_post)
        .or(bubbles)
        .or(health)
        .or(metrics_route)
        .recover(handle_rejection)
        .with(warp::reply::with::headers(cors_headers()))
}

fn preflight_response() -> Response {
    let mut response =
        warp::reply::with_status(warp::reply(), StatusCode::NO_CONTENT).into_response();
    response
        .headers_mut()
        .insert("Access-Control-Max-Age", HeaderValue::from_static("86400"));
    response
}

fn json_response(body: &Value, status: u16) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

fn error_response(err: &ProxyError) -> Response {
    error!("Proxy request failed ({}): {}", err.status_code(), err);
    json_response(&err.body(), err.status_code())
}

fn upstream_response(result: Result<UpstreamResponse, ProxyError>) -> Response {
    match result {
        Ok(upstream) => json_response(&upstream.body, upstream.status),
        Err(e) => error_response(&e),
    }
}

async fn handle_quote(query: Query, state: Arc<AppState>) -> Result<Response, Rejection> {
    let params = match quote_params(&query) {
        Ok(params) => params,
        Err(e) => {
            metrics::record_proxy_error(e.status_code());
            return Ok(error_response(&e));
        }
    };
    Ok(upstream_response(state.lifi.quote(&params).await))
}

async fn handle_tokens(state: Arc<AppState>) -> Result<Response, Rejection> {
    Ok(upstream_response(state.lifi.tokens().await))
}

async fn handle_get(
    tail: warp::path::Tail,
    query: Query,
    state: Arc<AppState>,
) -> Result<Response, Rejection> {
    let result = state.lifi.forward(Method::GET, tail.as_str(), &query, None).await;
    Ok(upstream_response(result))
}

async fn handle_post(
    tail: warp::path::Tail,
    query: Query,
    body: warp::hyper::body::Bytes,
    state: Arc<AppState>,
) -> Result<Response, Rejection> {
    let body: Value = match serde_json::from_slice(&body) {
        Ok(body) => body,
        Err(e) => {
            let err = ProxyError::BadRequest(format!("Invalid JSON body: {}", e));
            metrics::record_proxy_error(err.status_code());
            return Ok(error_response(&err));
        }
    };
    let result = state.lifi.forward(Method::POST, tail.as_str(), &query, Some(&body)).await;
    Ok(upstream_response(result))
}

async fn handle_bubbles(query: BubbleQuery, state: Arc<AppState>) -> Result<Response, Rejection> {
    let width = query.width.unwrap_or(1200.0);
    let height = query.height.unwrap_or(600.0);

    if let Err(e) = validate_dimensions(width, height) {
        return Ok(json_response(&json!({ "error": e.to_string() }), 400));
    }

    let mut rng = rand::thread_rng();
    match state.bubbles.layout(&top_cryptocurrencies(), width, height, &mut rng) {
        Ok(placements) => Ok(json_response(&json!({
            "width": width,
            "height": height,
            "bubbles": placements
        }), 200)),
        Err(e) => {
            error!("Bubble layout failed: {}", e);
            Ok(json_response(&json!({ "error": e.to_string() }), 500))
        }
    }
}

async fn handle_metrics() -> Result<Response, Rejection> {
    match metrics::gather() {
        Ok(text) => {
            let reply = warp::reply::with_header(text, "Content-Type", "text/plain; version=0.0.4");
            Ok(reply.into_response())
        }
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            Ok(json_response(&json!({ "error": "Failed to gather metrics" }), 500))
        }
    }
}

async fn handle_rejection(rejection: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else if let Some(e) = rejection.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else {
        error!("Unhandled rejection: {:?}", rejection);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };
    info!("Rejected request with {}", status);
    Ok(json_response(&json!({ "error": message }), status.as_u16()))
}
