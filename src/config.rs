use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub notify_webhook_url: Option<String>,
}

impl AppConfig {
    pub fn new_from_env() -> Self {
        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://classplan.db?mode=rwc".to_string());
        let bind_addr =
            env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
        let notify_webhook_url = env::var("NOTIFY_WEBHOOK_URL").ok();

        Self {
            database_url,
            bind_addr,
            notify_webhook_url,
        }
    }
}
