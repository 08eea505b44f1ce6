pub mod catalog;
pub mod config;
pub mod db;
pub mod environment;
pub mod errors;
pub mod normalization;
pub mod play;
pub mod routes;
pub mod song;
pub mod urls;
pub mod user;
