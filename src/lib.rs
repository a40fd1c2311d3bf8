pub mod assistant;
pub mod complaints;
pub mod directory;
pub mod error;
pub mod models;
pub mod notify;
pub mod openapi;
pub mod reports;
pub mod routes;
pub mod seed;
pub mod session;
pub mod settings;
pub mod storage;
pub mod views;
pub mod voice; // live voice support session

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
pub use settings::AppConfig;
