mod cache;
mod config;
mod controllers;
mod database;
mod dto;
mod jobs;
mod middleware;
mod models;
mod repositories;
mod routes;
mod services;
mod state;
mod utils;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use dotenvy::dotenv;
use serde_json::json;
use std::net::SocketAddr;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use cache::redis_client::RedisClient;
use config::environment::EnvironmentConfig;
use database::DatabaseConnection;
use middleware::cors::cors_middleware;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("🚗 Carshare Booking Scheduler");
    info!("=============================");

    // Inicializar base de datos
    let db_connection = match DatabaseConnection::new_default().await {
        Ok(conn) => conn,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(anyhow::anyhow!("Error de base de datos: {}", e));
        }
    };

    let pool = db_connection.pool().clone();

    // Inicializar Redis y cache
    let redis_url = std::env::var("REDIS_URL")
        .unwrap_or_else(|_| "redis://localhost:6379".to_string());

    let redis_config = cache::CacheConfig {
        redis_url,
        ..cache::CacheConfig::default()
    };

    let redis_client = match RedisClient::new(redis_config).await {
        Ok(client) => client,
        Err(e) => {
            error!("❌ Error conectando a Redis: {}", e);
            return Err(anyhow::anyhow!("Error de Redis: {}", e));
        }
    };

    let config = EnvironmentConfig::default();
    let app_state = AppState::new(pool, config, redis_client);

    // Jobs periódicos: recordatorios, barrido de conflictos, warmup, retención
    jobs::spawn_background_jobs(app_state.clone());

    // Crear router de la API
    let app = Router::new()
        .route("/health", get(health_endpoint))
        .nest("/api/booking", routes::booking_routes::create_booking_router())
        .nest("/api/conflict", routes::conflict_routes::create_conflict_router())
        .nest("/api/vehicle", routes::vehicle_routes::create_vehicle_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors_middleware())
        .with_state(app_state.clone());

    // Puerto del servidor
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("📅 Endpoints - Booking:");
    info!("   POST /api/booking - Crear reserva");
    info!("   GET  /api/booking/:id - Obtener reserva");
    info!("   PUT  /api/booking/:id - Actualizar reserva");
    info!("   POST /api/booking/:id/cancel - Cancelar reserva");
    info!("   POST /api/booking/:id/extend - Extender reserva en curso");
    info!("   POST /api/booking/:id/confirm - Confirmar reserva (rol elevado)");
    info!("   POST /api/booking/:id/check-in - Registrar recogida");
    info!("   POST /api/booking/:id/check-out - Registrar devolución");
    info!("   GET  /api/booking/:id/logs - Registros de check");
    info!("   GET  /api/booking/user/:user_id - Reservas de un usuario");
    info!("   GET  /api/booking/availability - Consulta de disponibilidad");
    info!("   GET  /api/booking/calendar/vehicle/:id - Calendario de vehículo");
    info!("   GET  /api/booking/calendar/group/:id - Calendario de grupo");
    info!("⚠️ Endpoints - Conflict:");
    info!("   GET  /api/conflict - Conflictos sin resolver");
    info!("   POST /api/conflict/:id/resolve - Resolución manual");
    info!("🚙 Endpoints - Vehicle:");
    info!("   GET  /api/vehicle/:id - Obtener vehículo");
    info!("   GET  /api/vehicle/group/:group_id - Vehículos del grupo");
    info!("   PUT  /api/vehicle/:id/status - Cambiar estado del vehículo");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("❌ Error del servidor: {}", e);
            anyhow::anyhow!("Server error: {}", e)
        })?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Health check del servicio y sus dependencias
async fn health_endpoint(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Json<serde_json::Value> {
    let redis_ok = state.redis.is_connected().await;
    let db_ok = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();

    Json(json!({
        "service": "carshare-booking",
        "status": if redis_ok && db_ok { "healthy" } else { "degraded" },
        "redis": redis_ok,
        "database": db_ok,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
