/// Thumbnail Service - HTTP Server
///
/// Serves thumbnails for files in the remote content store, generating
/// and caching them on first request.
use actix_web::{middleware as actix_middleware, web, App, HttpServer};
use std::io;
use thumbnail_service::config::LogFormat;
use thumbnail_service::{handlers, Config};
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("thumbnail_service=info,actix_web=info"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load configuration from environment
    let config = Config::from_env().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Failed to load configuration: {e}"),
        )
    })?;

    init_tracing(config.app.log_format);

    let manager = config.build_manager().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Failed to initialize thumbnail manager: {e}"),
        )
    })?;

    let bind_address = config.bind_address();
    tracing::info!(
        address = %bind_address,
        webdav = %config.webdav.base_url,
        resolutions = config.thumbnail.resolutions.as_slice().len(),
        "Thumbnail service starting HTTP server"
    );

    let manager = web::Data::new(manager);

    HttpServer::new(move || {
        App::new()
            .app_data(manager.clone())
            .wrap(actix_middleware::Logger::default())
            .configure(handlers::configure)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    tracing::info!("Thumbnail service shutting down");
    Ok(())
}
