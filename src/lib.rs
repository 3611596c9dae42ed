pub mod api; // HTTP surface: router, middleware, session registry
pub mod chat; // Domain core: conversations, messages, locks, fan-out
pub mod config;
pub mod db; // SQLite store + repositories
pub mod models;
pub mod realtime; // Room hub + WebSocket layer
