// src/main.rs
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;

use trade_ledger::auth::SupabaseAuth;
use trade_ledger::config::Config;
use trade_ledger::handlers::{self, AppState};
use trade_ledger::ledger::TradeLedger;
use trade_ledger::store::{RealtimeListener, SupabaseTradeStore, TradeStore};
use trade_ledger::ws_server::ChangeFeedServer;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("trade_ledger=debug,info"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Missing configuration: {} (SUPABASE_URL / SUPABASE_ANON_KEY)", e);
            std::process::exit(1);
        }
    };

    let store = match SupabaseTradeStore::new(&config) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::error!("❌ Failed to build store client: {}", e);
            std::process::exit(1);
        }
    };

    let auth = match SupabaseAuth::new(&config) {
        Ok(auth) => Arc::new(auth),
        Err(e) => {
            log::error!("❌ Failed to build auth client: {}", e);
            std::process::exit(1);
        }
    };

    // Remote change feed into the shared change channel
    if config.enable_realtime {
        let listener = RealtimeListener::new(&config, store.change_sender());
        tokio::spawn(listener.run_forever());
    } else {
        log::warn!("⚠️  Realtime listener disabled; only local mutations will notify");
    }

    // Push channel for UI clients
    let feed = ChangeFeedServer::new(store.subscribe());
    let ws_addr: SocketAddr = ([0, 0, 0, 0], config.ws_port).into();
    tokio::spawn(async move {
        if let Err(e) = feed.start(ws_addr).await {
            log::error!("❌ Change feed server failed: {}", e);
        }
    });

    let ledger = TradeLedger::new(store, auth);
    let state = web::Data::new(AppState { ledger });

    let host = config.host.clone();
    let port = config.port;
    let allowed_origin = config.allowed_origin.clone();

    log::info!("🚀 Starting trade ledger API on http://{}:{}", host, port);
    println!("Available endpoints:");
    println!("  GET    http://{}:{}/health", host, port);
    println!("  GET    http://{}:{}/trades", host, port);
    println!("  POST   http://{}:{}/trades", host, port);
    println!("  POST   http://{}:{}/trades/{{id}}/close", host, port);
    println!("  DELETE http://{}:{}/trades/{{id}}", host, port);
    println!("  GET    http://{}:{}/performance", host, port);
    println!("  WS     ws://{}:{}/ (change feed)", host, config.ws_port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&allowed_origin)
            .allowed_methods(vec!["GET", "POST", "DELETE"])
            .allowed_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(Logger::default())
            .app_data(state.clone())
            .route("/health", web::get().to(handlers::health_check))
            .route("/trades", web::get().to(handlers::get_trades_handler))
            .route("/trades", web::post().to(handlers::create_trade_handler))
            .route(
                "/trades/{id}/close",
                web::post().to(handlers::close_trade_handler),
            )
            .route(
                "/trades/{id}",
                web::delete().to(handlers::delete_trade_handler),
            )
            .route(
                "/performance",
                web::get().to(handlers::get_performance_handler),
            )
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
