pub mod app;
pub mod auth;
pub mod clients;
pub mod config;
pub mod feed;
pub mod identity;
pub mod navigation;
pub mod store;
pub mod urgency;
pub mod utils;
pub mod workflow;

pub mod schema {
    pub mod api;
    pub mod db;
    pub mod detect;
}

pub mod api {
    pub mod ai;
    pub mod db;
    pub mod endpoints;
    pub mod session;
    pub mod stream;
    pub mod upload;
}
