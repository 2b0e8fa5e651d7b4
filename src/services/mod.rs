// src/services/mod.rs
pub mod arima;
pub mod cache;
pub mod forecast;
pub mod linalg;
pub mod pipeline;
pub mod prophet;
pub mod stationarity;
pub mod world_bank;
