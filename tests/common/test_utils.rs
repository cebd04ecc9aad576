#![allow(dead_code)]

use cinema_booking_system::{
    config::DatabaseConfig,
    db::Database,
    models::screen::CreateScreenRequest,
    models::showtime::{CreateMovieRequest, CreateShowtimeRequest},
    services::{
        booking_service::BookingService, screen_service::ScreenService,
        showtime_service::ShowtimeService,
    },
    store::{BookingStore, MemoryStore},
    utils::error::{AppError, AppResult},
};
use chrono::{NaiveDate, NaiveTime};
use dotenv::dotenv;
use once_cell::sync::OnceCell;
use rust_decimal::Decimal;
use sqlx::mysql::MySqlPool as Pool;
use sqlx::mysql::MySqlPoolOptions;
use std::env;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;

// Services wired to one store, plus helpers to seed screens and showtimes
pub struct Fixture {
    pub store: Arc<dyn BookingStore>,
    pub screens: ScreenService,
    pub showtimes: ShowtimeService,
    pub bookings: BookingService,
}

impl Fixture {
    pub fn in_memory() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()))
    }

    pub fn with_store(store: Arc<dyn BookingStore>) -> Self {
        Fixture {
            screens: ScreenService::new(store.clone()),
            showtimes: ShowtimeService::new(store.clone()),
            bookings: BookingService::new(store.clone()),
            store,
        }
    }

    pub async fn screen(&self, name: &str, total_seats: i32, seats_per_row: i32) -> AppResult<i32> {
        let response = self
            .screens
            .create_screen(CreateScreenRequest {
                name: name.to_string(),
                total_seats,
                seats_per_row,
            })
            .await?;
        Ok(response.screen_id)
    }

    pub async fn showtime_on(&self, screen_id: i32, show_date: NaiveDate) -> AppResult<i32> {
        let movie_id = self
            .showtimes
            .create_movie(CreateMovieRequest {
                title: "The Seat Map".to_string(),
                duration: Some(118),
                rating: Some("PG".to_string()),
                description: None,
                image_url: None,
            })
            .await?;

        self.showtimes
            .create_showtime(CreateShowtimeRequest {
                movie_id,
                screen_id,
                show_date,
                show_time: NaiveTime::from_hms_opt(19, 30, 0).unwrap(),
                price: Decimal::new(1250, 2),
            })
            .await
    }

    // Screen plus one showtime on it
    pub async fn hall(&self, total_seats: i32, seats_per_row: i32) -> AppResult<(i32, i32)> {
        let screen_id = self.screen("Hall 1", total_seats, seats_per_row).await?;
        let showtime_id = self.showtime_on(screen_id, future_date()).await?;
        Ok((screen_id, showtime_id))
    }

    // Resolve labels such as "A1" to seat ids
    pub async fn seat_ids(&self, screen_id: i32, labels: &[&str]) -> AppResult<Vec<i32>> {
        let seat_map = self.screens.build_seat_map(screen_id).await?;
        labels
            .iter()
            .map(|label| {
                seat_map
                    .find(label)
                    .map(|seat| seat.id)
                    .ok_or_else(|| AppError::NotFound(format!("seat {}", label)))
            })
            .collect()
    }
}

pub fn future_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2099, 12, 24).unwrap()
}

static TEST_DB: OnceCell<Mutex<Option<String>>> = OnceCell::new();
static DB_NAME: OnceCell<String> = OnceCell::new();

// MySQL tests only run when TEST_DATABASE_URL points at a server we may create databases on
fn admin_url() -> Option<String> {
    dotenv().ok();
    env::var("TEST_DATABASE_URL").ok()
}

fn base_url(db_url: &str) -> String {
    db_url.split('/').take(3).collect::<Vec<&str>>().join("/")
}

async fn create_connection_pool(url: &str) -> Result<Pool, sqlx::Error> {
    MySqlPoolOptions::new().max_connections(10).connect(url).await
}

pub struct TestDb;

impl TestDb {
    // One database per test binary, created on first use. Every caller gets its
    // own pool because each #[tokio::test] runs on its own runtime.
    pub async fn get_instance(test_file: &str) -> anyhow::Result<Option<Pool>> {
        let Some(url) = admin_url() else {
            return Ok(None);
        };
        let base_url = base_url(&url);

        let db_name = DB_NAME
            .get_or_init(|| {
                let stem = std::path::Path::new(test_file)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("test");
                let timestamp = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap()
                    .as_secs();
                format!("cinema_{}_{}", stem, timestamp)
            })
            .clone();

        let test_db = TEST_DB.get_or_init(|| Mutex::new(None));
        let mut guard = test_db.lock().await;

        if guard.is_none() {
            let admin_pool = create_connection_pool(&base_url).await?;
            sqlx::query(&format!("CREATE DATABASE {}", db_name))
                .execute(&admin_pool)
                .await?;

            let db = Database::new(&format!("{}/{}", base_url, db_name), &test_db_config()).await?;
            db.run_migrations().await?;
            *guard = Some(db_name.clone());
        }

        Ok(Some(
            create_connection_pool(&format!("{}/{}", base_url, db_name)).await?,
        ))
    }

    // Teardown function to drop the database after the test binary finishes
    pub fn cleanup_database_sync() -> anyhow::Result<()> {
        let (Some(url), Some(db_name)) = (admin_url(), DB_NAME.get()) else {
            return Ok(());
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(async {
            let admin_pool = create_connection_pool(&base_url(&url)).await?;
            sqlx::query(&format!("DROP DATABASE IF EXISTS {}", db_name))
                .execute(&admin_pool)
                .await?;
            Ok::<(), anyhow::Error>(())
        })
    }
}

fn test_db_config() -> DatabaseConfig {
    DatabaseConfig {
        url: None,
        max_connections: 5,
        acquire_timeout_secs: 5,
    }
}
