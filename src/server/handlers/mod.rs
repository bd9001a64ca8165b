pub mod health;
pub mod manifest;
pub mod metrics;
pub mod playlist;
