// src/routes.rs
use log::{error, info};
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::reject::Rejection;
use warp::{Filter, Reply};

use crate::handlers::dashboard::get_dashboard;
use crate::handlers::error::ApiError;
use crate::handlers::forecast::get_forecast;
use crate::handlers::series::{get_raw_data, get_series};
use crate::handlers::stationarity::get_stationarity;
use crate::state::AppState;

async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(api_error) = err.find::<ApiError>() {
        (api_error.status, api_error.message.clone())
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string())
    } else {
        error!("Unhandled rejection: {:?}", err);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": message,
        })),
        code,
    ))
}

pub fn routes(state: Arc<AppState>) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let state_filter = warp::any().map(move || state.clone());

    let series_route = warp::path!("api" / "v1" / "gdp")
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(get_series);

    let raw_route = warp::path!("api" / "v1" / "gdp" / "raw")
        .and(warp::get())
        .and(warp::query())
        .and(state_filter.clone())
        .and_then(get_raw_data);

    let stationarity_route = warp::path!("api" / "v1" / "gdp" / "stationarity")
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(get_stationarity);

    let forecast_route = warp::path!("api" / "v1" / "gdp" / "forecast")
        .and(warp::get())
        .and(warp::query())
        .and(state_filter.clone())
        .and_then(get_forecast);

    let dashboard_route = warp::path!("api" / "v1" / "dashboard")
        .and(warp::get())
        .and(warp::query())
        .and(state_filter.clone())
        .and_then(get_dashboard);

    info!("All routes configured successfully.");

    series_route
        .or(raw_route)
        .or(stationarity_route)
        .or(forecast_route)
        .or(dashboard_route)
        .recover(handle_rejection)
}
