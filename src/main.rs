use anyhow::Result;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info, warn};
use dotenvy::dotenv;

use autoaid_backend::cache::{redis_client::RedisClient, CacheConfig, StatsCache};
use autoaid_backend::config::database::DatabaseConfig;
use autoaid_backend::config::environment::EnvironmentConfig;
use autoaid_backend::database::DatabaseConnection;
use autoaid_backend::routes::create_app_router;
use autoaid_backend::state::{AppState, Stores};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();
    let config = EnvironmentConfig::from_env()?;

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(config.tracing_level())
        .init();

    info!("🔧 AutoAid - Booking Lifecycle API");
    info!("==================================");
    info!("🌍 Entorno: {}", config.environment);

    // Inicializar base de datos
    let db_connection = match &config.database_url {
        Some(url) => {
            let db_config = DatabaseConfig::new(url.clone(), config.storage_timeout());
            let connection = DatabaseConnection::new(&db_config).await.map_err(|e| {
                error!("❌ Error conectando a la base de datos: {}", e);
                e
            })?;
            if config.run_migrations {
                connection.run_migrations().await?;
            }
            Some(connection)
        }
        None if config.is_development() => {
            warn!("⚠️ DATABASE_URL no configurada: usando stores en memoria");
            None
        }
        None => anyhow::bail!("DATABASE_URL must be set outside development"),
    };

    let stores = match &db_connection {
        Some(connection) => Stores::postgres(connection.pool().clone()),
        None => Stores::in_memory(),
    };

    // Redis es opcional: sin él las estadísticas se calculan siempre
    let stats_cache = match CacheConfig::from_environment(&config) {
        Some(cache_config) => match RedisClient::new(cache_config).await {
            Ok(client) => Some(StatsCache::new(client)),
            Err(e) => {
                warn!("⚠️ Redis no disponible, cache desactivado: {}", e);
                None
            }
        },
        None => None,
    };

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let server_url = config.server_url();
    let app = create_app_router(AppState::new(config, stores, stats_cache));

    info!("🌐 Servidor iniciando en {}", server_url);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /api/health");
    info!("   POST /api/auth/signup | POST /api/auth/login | GET /api/auth/me");
    info!("   POST /api/bookings | GET /api/bookings | GET /api/bookings/pending");
    info!("   GET  /api/bookings/:id | PUT /api/bookings/:id");
    info!("   PUT  /api/bookings/:id/status | PUT /api/bookings/:id/cancel");
    info!("   POST /api/bookings/:id/notes | GET /api/bookings/admin/stats");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(connection) = db_connection {
        connection.close().await;
    }
    info!("👋 Servidor detenido");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ Error instalando el handler de Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ Error instalando el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Señal de apagado recibida");
}
