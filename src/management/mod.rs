mod auth;

pub use auth::AuthManager;
