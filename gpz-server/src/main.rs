use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use gpz_server::catalog::{Catalog, CatalogError, CsvCatalogSource};
use gpz_server::config::{AppConfig, GeocoderKind};
use gpz_server::geocode::{
    CachedGeocoder, GeocodeCacheConfig, GeocodeError, Geocoder, NominatimClient, StaticGeocoder,
};
use gpz_server::lookup::LookupService;
use gpz_server::quota::{QuotaError, SqliteQuotaStore};
use gpz_server::web::{AppState, create_router};

const DEFAULT_LOG_FILTER: &str = "gpz_server=info,tower_http=info";

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] Box<figment::Error>),

    #[error("catalog: {0}")]
    Catalog(#[from] CatalogError),

    #[error("geocoder: {0}")]
    Geocoder(#[from] GeocodeError),

    #[error("quota store: {0}")]
    Quota(#[from] QuotaError),

    #[error("server: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run().await {
        error!(error = %e, "gpz-server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = AppConfig::load().map_err(Box::new)?;

    let source = CsvCatalogSource::new(config.catalog_path.clone());
    let catalog = Catalog::load(Arc::new(source)).await?;
    info!(
        path = %config.catalog_path.display(),
        facilities = catalog.len().await,
        "catalog loaded"
    );

    let geocoder: Arc<dyn Geocoder> = match config.geocoder {
        GeocoderKind::Nominatim => {
            let client = NominatimClient::new(config.nominatim_config())?;
            Arc::new(CachedGeocoder::new(
                Arc::new(client),
                &GeocodeCacheConfig::default(),
            ))
        }
        GeocoderKind::Offline => {
            let offline = StaticGeocoder::from_facilities(&catalog.snapshot().await);
            info!(addresses = offline.len(), "using offline geocoder");
            Arc::new(offline)
        }
    };

    let quota_store = SqliteQuotaStore::connect(&config.database_url).await?;
    info!(url = %config.database_url, "quota store ready");

    let lookup = LookupService::new(
        catalog,
        geocoder,
        Arc::new(quota_store),
        config.lookup_config(),
    );
    let state = AppState::new(lookup, config.admin_token());
    if config.admin_token().is_none() {
        info!("no admin token configured; facility registration disabled");
    }

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str()).await?;
    info!(addr = %config.bind_addr, "GPZ finder listening");

    axum::serve(listener, app).await?;
    Ok(())
}
