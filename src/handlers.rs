// src/handlers.rs - HTTP handlers for the trade ledger API
use crate::errors::LedgerError;
use crate::ledger::TradeLedger;
use crate::stats::compute_performance_statistics;
use crate::types::TradeSide;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use serde_json::json;

pub struct AppState {
    pub ledger: TradeLedger,
}

#[derive(Debug, Deserialize)]
pub struct NewTradeRequest {
    pub asset: String,
    #[serde(rename = "type")]
    pub side: TradeSide,
    pub entry_price: f64,
    pub position_size: f64,
}

#[derive(Debug, Deserialize)]
pub struct CloseTradeRequest {
    pub exit_price: f64,
    pub duration: String,
}

pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("OK, trade ledger is running")
}

pub async fn get_trades_handler(
    state: web::Data<AppState>,
) -> Result<HttpResponse, LedgerError> {
    let trades = state.ledger.list_trades().await?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "count": trades.len(),
        "trades": trades,
    })))
}

pub async fn create_trade_handler(
    state: web::Data<AppState>,
    body: web::Json<NewTradeRequest>,
) -> Result<HttpResponse, LedgerError> {
    let request = body.into_inner();
    let trade = state
        .ledger
        .create_trade(
            &request.asset,
            request.side,
            request.entry_price,
            request.position_size,
        )
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "status": "success",
        "trade": trade,
    })))
}

pub async fn close_trade_handler(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<CloseTradeRequest>,
) -> Result<HttpResponse, LedgerError> {
    let id = path.into_inner();
    let request = body.into_inner();
    let trade = state
        .ledger
        .close_trade(&id, request.exit_price, &request.duration)
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "trade": trade,
    })))
}

pub async fn delete_trade_handler(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, LedgerError> {
    let id = path.into_inner();
    state.ledger.delete_trade(&id).await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "deleted": id,
    })))
}

pub async fn get_performance_handler(
    state: web::Data<AppState>,
) -> Result<HttpResponse, LedgerError> {
    // Always a fresh fetch; derived views hold no authoritative state.
    let trades = state.ledger.list_trades().await?;
    let statistics = compute_performance_statistics(&trades);

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "statistics": statistics,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}
