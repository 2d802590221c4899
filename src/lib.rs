// Toolchat - ask questions about uploaded files through a tool-calling LLM

pub mod chat;
pub mod config;
pub mod documents;
pub mod llm;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod tools;
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use documents::FileReader;
pub use models::AppState;

pub fn create_router(state: AppState) -> axum::Router {
    routes::create_router(state)
}
