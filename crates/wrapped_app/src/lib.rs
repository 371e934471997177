//! Terminal front end for the wallet report lifecycle.
pub mod app;
pub mod config;
pub mod effects;
pub mod logging;
pub mod render;
pub mod simulator;
