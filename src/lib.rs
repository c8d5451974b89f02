pub mod config;
pub mod keystore;
pub mod labels;
pub mod models;
pub mod naming;
pub mod reconciler;
pub mod storage;
