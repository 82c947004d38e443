//! Process-wide error banner.
//!
//! Every failure in a mic check is reported by mutating this banner, never
//! by handing an error back to the caller alone. The banner is cleared only
//! when a capture stream becomes ready.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::MessagesConfig;

/// Delay before a connectivity failure message is replaced by its retry hint.
pub const ESCALATION_DELAY: Duration = Duration::from_millis(2000);

pub trait ErrorPresenter: Send + Sync {
    /// Shows the banner with `message`.
    fn show(&self, message: &str);

    /// Replaces the banner text without changing its visibility.
    fn update(&self, message: &str);

    /// Hides the banner.
    fn clear(&self);
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BannerState {
    pub visible: bool,
    pub message: Option<String>,
}

/// Observable banner state shared by every collaborator.
#[derive(Clone)]
pub struct BannerHandle {
    tx: Arc<watch::Sender<BannerState>>,
}

impl Default for BannerHandle {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(BannerState::default());
        Self { tx: Arc::new(tx) }
    }
}

impl BannerHandle {
    pub fn get(&self) -> BannerState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BannerState> {
        self.tx.subscribe()
    }
}

impl ErrorPresenter for BannerHandle {
    fn show(&self, message: &str) {
        warn!("Banner: {}", message);
        self.tx.send_modify(|state| {
            state.visible = true;
            state.message = Some(message.to_string());
        });
    }

    fn update(&self, message: &str) {
        debug!("Banner text updated: {}", message);
        self.tx.send_modify(|state| {
            state.message = Some(message.to_string());
        });
    }

    fn clear(&self) {
        let was_visible = self.tx.borrow().visible;
        if was_visible {
            info!("Banner cleared");
        }
        self.tx.send_modify(|state| {
            state.visible = false;
        });
    }
}

/// Shows the connectivity failure message now and swaps in the retry hint
/// after [`ESCALATION_DELAY`]. Nothing is retried; the hint only changes
/// the wording.
pub fn present_connectivity_failure(
    presenter: Arc<dyn ErrorPresenter>,
    messages: &MessagesConfig,
) -> tokio::task::JoinHandle<()> {
    presenter.show(&messages.connectivity_failure);

    let hint = messages.connectivity_retry_hint.clone();
    tokio::spawn(async move {
        tokio::time::sleep(ESCALATION_DELAY).await;
        presenter.update(&hint);
    })
}

/// Shows a capture stream error with the configured prefix.
pub fn present_stream_error(presenter: &dyn ErrorPresenter, messages: &MessagesConfig, detail: &str) {
    presenter.show(&format!("{}{}", messages.stream_error_prefix, detail));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_and_clear() {
        let banner = BannerHandle::default();
        banner.show("boom");
        assert_eq!(
            banner.get(),
            BannerState {
                visible: true,
                message: Some("boom".to_string())
            }
        );

        banner.clear();
        assert!(!banner.get().visible);
    }

    #[test]
    fn test_update_keeps_visibility() {
        let banner = BannerHandle::default();
        banner.update("quiet");
        assert!(!banner.get().visible);
        assert_eq!(banner.get().message.as_deref(), Some("quiet"));
    }

    #[test]
    fn test_stream_error_is_prefixed() {
        let banner = BannerHandle::default();
        let messages = MessagesConfig::default();
        present_stream_error(&banner, &messages, "Permission denied");

        let message = banner.get().message.unwrap();
        assert!(message.starts_with(&messages.stream_error_prefix));
        assert!(message.ends_with("Permission denied"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connectivity_failure_escalates_after_delay() {
        let banner = BannerHandle::default();
        let messages = MessagesConfig::default();

        let escalation = present_connectivity_failure(Arc::new(banner.clone()), &messages);
        assert_eq!(
            banner.get().message.as_deref(),
            Some(messages.connectivity_failure.as_str())
        );

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(
            banner.get().message.as_deref(),
            Some(messages.connectivity_failure.as_str())
        );

        escalation.await.unwrap();
        let state = banner.get();
        assert!(state.visible);
        assert_eq!(
            state.message.as_deref(),
            Some(messages.connectivity_retry_hint.as_str())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_escalation_does_not_reopen_cleared_banner() {
        let banner = BannerHandle::default();
        let messages = MessagesConfig::default();

        let escalation = present_connectivity_failure(Arc::new(banner.clone()), &messages);
        banner.clear();
        escalation.await.unwrap();

        assert!(!banner.get().visible);
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let banner = BannerHandle::default();
        let mut rx = banner.subscribe();

        banner.show("visible now");
        rx.changed().await.unwrap();
        assert!(rx.borrow().visible);
    }
}
