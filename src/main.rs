use std::sync::Arc;

use cinema_booking_system::config::{Config, StorageBackend};
use cinema_booking_system::db::Database;
use cinema_booking_system::store::{BookingStore, MemoryStore, MySqlStore};
use rocket::{launch, Build, Rocket};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[launch]
async fn rocket() -> Rocket<Build> {
    let config = Config::from_env().expect("invalid configuration");

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store: Arc<dyn BookingStore> = match config.storage {
        StorageBackend::MySql => {
            let url = config
                .database
                .url
                .as_deref()
                .expect("DATABASE_URL must be set");

            let db = Database::new(url, &config.database)
                .await
                .expect("Failed to connect to database");
            db.run_migrations()
                .await
                .expect("Failed to run migrations");

            tracing::info!("database connected");
            Arc::new(MySqlStore::new(db.get_pool().clone()))
        }
        StorageBackend::Memory => {
            tracing::warn!("using the in-memory store, bookings are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    cinema_booking_system::build_rocket(store, config.jwt)
}
