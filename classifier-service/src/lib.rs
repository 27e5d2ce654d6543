//! classifier-service: benign/malignant skin lesion classification over HTTP.
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod inference;
pub mod services;
pub mod startup;

pub use startup::AppState;
