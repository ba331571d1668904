use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Destination
    pub group_id: String,

    // HTTP server
    pub host: String,
    pub port: u16,
    pub debug: bool,

    // WhatsApp Web automation
    pub wait_time_secs: u64,
    pub close_tab: bool,
    pub close_time_secs: u64,

    // Chrome
    pub headless: bool,
    pub profile_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // Invite code of the target group (the part after /accept?code=)
            group_id: std::env::var("WHATSAPP_GROUP_ID")
                .context("WHATSAPP_GROUP_ID not set")?,

            // HTTP server
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            debug: std::env::var("DEBUG")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(true),

            // WhatsApp Web automation
            wait_time_secs: std::env::var("WHATSAPP_WAIT_TIME")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(15),
            close_tab: std::env::var("WHATSAPP_CLOSE_TAB")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(false),
            close_time_secs: std::env::var("WHATSAPP_CLOSE_TIME")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),

            // Chrome needs a visible window for the first QR login
            headless: std::env::var("CHROME_HEADLESS")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(false),
            profile_dir: std::env::var("CHROME_PROFILE_DIR")
                .unwrap_or_else(|_| ".chrome-profile".to_string()),
        })
    }

    /// Address the HTTP listener binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
