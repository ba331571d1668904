use anyhow::Result;
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::DeliveryError;
use crate::schedule::{seconds_until, Clock, ScheduledTime};

const WHATSAPP_WEB_URL: &str = "https://web.whatsapp.com";

/// Message input at the bottom of an open chat
const COMPOSE_BOX_SELECTOR: &str = r#"footer div[contenteditable="true"]"#;

/// How long to look for the compose box once the page had `wait_time` to load
const COMPOSE_BOX_TIMEOUT: Duration = Duration::from_secs(30);

/// A message addressed to a group, to be sent at a wall-clock time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub group_id: String,
    pub message: String,
    pub scheduled: ScheduledTime,
}

/// Delivers a message to a group. Returns once the message went out or fails.
#[async_trait]
pub trait GroupSender: Send + Sync {
    async fn send_to_group(&self, request: &OutboundMessage) -> Result<()>;
}

/// WhatsApp Web link that opens a group chat from its invite code
pub fn group_chat_url(group_id: &str) -> String {
    format!("{}/accept?code={}", WHATSAPP_WEB_URL, group_id)
}

#[derive(Debug, Clone)]
pub struct AutomationSettings {
    /// Time WhatsApp Web gets to load before typing
    pub wait_time: Duration,
    pub close_tab: bool,
    /// Delay between sending and closing the tab
    pub close_time: Duration,
    pub headless: bool,
    pub profile_dir: PathBuf,
}

impl AutomationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            wait_time: Duration::from_secs(config.wait_time_secs),
            close_tab: config.close_tab,
            close_time: Duration::from_secs(config.close_time_secs),
            headless: config.headless,
            profile_dir: PathBuf::from(&config.profile_dir),
        }
    }
}

/// Sends group messages by driving WhatsApp Web in Chrome.
///
/// The browser is launched on first use with a persistent profile so the
/// WhatsApp Web login survives restarts, and relaunched if its process died.
pub struct WhatsAppWebSender {
    settings: AutomationSettings,
    clock: Arc<dyn Clock>,
    browser: Arc<Mutex<Option<Arc<Browser>>>>,
}

impl WhatsAppWebSender {
    pub fn new(settings: AutomationSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            clock,
            browser: Arc::new(Mutex::new(None)),
        }
    }

    #[cfg(test)]
    fn browser_launched(&self) -> bool {
        self.browser.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }
}

#[async_trait]
impl GroupSender for WhatsAppWebSender {
    async fn send_to_group(&self, request: &OutboundMessage) -> Result<()> {
        let now = self.clock.now().time();
        let seconds_left = seconds_until(now, &request.scheduled)?;
        let wait_time = self.settings.wait_time.as_secs();

        if seconds_left < wait_time {
            return Err(DeliveryError::CallTimeTooSoon {
                seconds_left,
                wait_time,
            }
            .into());
        }

        let sleep_for = seconds_left - wait_time;
        info!(
            "Message to group {} scheduled for {:02}:{:02}, opening WhatsApp Web in {}s",
            request.group_id, request.scheduled.hour, request.scheduled.minute, sleep_for
        );
        tokio::time::sleep(Duration::from_secs(sleep_for)).await;

        let browser = Arc::clone(&self.browser);
        let settings = self.settings.clone();
        let url = group_chat_url(&request.group_id);
        let message = request.message.clone();

        tokio::task::spawn_blocking(move || deliver(&browser, &settings, &url, &message))
            .await
            .map_err(|e| DeliveryError::Task(e.to_string()))??;

        info!("✓ Message sent to group {}", request.group_id);
        Ok(())
    }
}

fn browser_error(e: impl std::fmt::Display) -> DeliveryError {
    DeliveryError::Browser(e.to_string())
}

/// Get the running browser or launch a new one with the configured profile
fn get_or_launch_browser(
    slot: &Mutex<Option<Arc<Browser>>>,
    settings: &AutomationSettings,
) -> Result<Arc<Browser>, DeliveryError> {
    let mut guard = slot
        .lock()
        .map_err(|e| DeliveryError::Browser(format!("Browser lock error: {}", e)))?;

    if let Some(browser) = guard.as_ref() {
        if browser.get_version().is_ok() {
            return Ok(Arc::clone(browser));
        }
        warn!("Browser process is gone, relaunching");
    }

    std::fs::create_dir_all(&settings.profile_dir).map_err(|e| {
        DeliveryError::Browser(format!("Failed to create browser profile dir: {}", e))
    })?;

    info!(
        "Launching Chrome with profile {} (headless: {})",
        settings.profile_dir.display(),
        settings.headless
    );

    let options = LaunchOptions::default_builder()
        .headless(settings.headless)
        .sandbox(false)
        .window_size(Some((1280, 900)))
        .idle_browser_timeout(Duration::from_secs(600))
        .user_data_dir(Some(settings.profile_dir.clone()))
        .build()
        .map_err(|e| DeliveryError::Browser(format!("Browser launch options error: {}", e)))?;

    let browser = Browser::new(options).map_err(|e| {
        DeliveryError::Browser(format!(
            "Failed to launch Chrome: {}. Ensure Chrome/Chromium is installed.",
            e
        ))
    })?;

    let browser = Arc::new(browser);
    *guard = Some(Arc::clone(&browser));
    Ok(browser)
}

/// Open the group chat in a new tab and send the message there
fn deliver(
    slot: &Mutex<Option<Arc<Browser>>>,
    settings: &AutomationSettings,
    url: &str,
    message: &str,
) -> Result<(), DeliveryError> {
    let browser = get_or_launch_browser(slot, settings)?;
    let tab = browser.new_tab().map_err(browser_error)?;

    let outcome = send_in_tab(&tab, settings, url, message);
    settle_tab(outcome, settings.close_tab, || {
        tab.close(true).map(|_| ()).map_err(browser_error)
    })
}

/// Navigate to the chat, type the message and press Enter
fn send_in_tab(
    tab: &Tab,
    settings: &AutomationSettings,
    url: &str,
    message: &str,
) -> Result<(), DeliveryError> {
    debug!("Navigating to {}", url);
    tab.navigate_to(url).map_err(browser_error)?;
    tab.wait_until_navigated().map_err(browser_error)?;
    std::thread::sleep(settings.wait_time);

    let compose_box = tab
        .wait_for_element_with_custom_timeout(COMPOSE_BOX_SELECTOR, COMPOSE_BOX_TIMEOUT)
        .map_err(|e| {
            DeliveryError::ElementNotFound(format!("message box '{}': {}", COMPOSE_BOX_SELECTOR, e))
        })?;
    compose_box.click().map_err(browser_error)?;

    tab.type_str(message).map_err(browser_error)?;
    tab.press_key("Enter").map_err(browser_error)?;
    debug!("Typed {} characters and pressed Enter", message.chars().count());

    if settings.close_tab {
        std::thread::sleep(settings.close_time);
    }

    Ok(())
}

/// A failed send always closes its tab; a successful one only when configured.
///
/// With `close_after_send` off, each delivered message leaves its chat tab open.
fn settle_tab<F>(
    outcome: Result<(), DeliveryError>,
    close_after_send: bool,
    close: F,
) -> Result<(), DeliveryError>
where
    F: FnOnce() -> Result<(), DeliveryError>,
{
    match outcome {
        Ok(()) if close_after_send => close(),
        Ok(()) => Ok(()),
        Err(e) => {
            if let Err(close_err) = close() {
                warn!("Failed to close tab after send error: {}", close_err);
            }
            Err(e)
        }
    }
}
