//! Presentation state behind the three mic check triggers.

use tracing::info;

use crate::banner::ErrorPresenter;
use crate::config::MessagesConfig;
use crate::playback::PlaybackSource;
use crate::token::UploadToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    /// Nothing checked yet.
    Pretest,
    /// Recording instructions are shown.
    Explanation,
    /// The sample came back and is being played.
    Confirmed,
}

impl Panel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Panel::Pretest => "pretest",
            Panel::Explanation => "explanation",
            Panel::Confirmed => "confirmed",
        }
    }
}

pub struct MicCheckPage {
    panel: Panel,
    base_url: String,
}

impl MicCheckPage {
    pub fn new(base_url: &str) -> Self {
        Self {
            panel: Panel::Pretest,
            base_url: base_url.to_string(),
        }
    }

    pub fn panel(&self) -> Panel {
        self.panel
    }

    /// "Check mic": an attempt is ready (or known to be unsupported).
    pub fn on_check_mic(
        &mut self,
        supported: bool,
        presenter: &dyn ErrorPresenter,
        messages: &MessagesConfig,
    ) {
        self.panel = Panel::Explanation;
        if !supported {
            presenter.show(&messages.unsupported);
        }
    }

    /// "Recording done": the attempt's continuation fired with `token`.
    /// Returns what to play back, if anything came back.
    pub fn on_recording_done(&mut self, token: Option<&UploadToken>) -> Option<PlaybackSource> {
        let token = token?;
        info!("Mic check token: {}", token);
        self.panel = Panel::Confirmed;
        Some(PlaybackSource::for_token(&self.base_url, token))
    }

    /// "Check again": presentation only.
    pub fn on_check_again(&mut self) {
        if self.panel == Panel::Confirmed {
            self.panel = Panel::Explanation;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banner::BannerHandle;

    #[test]
    fn test_check_mic_moves_to_explanation() {
        let banner = BannerHandle::default();
        let mut page = MicCheckPage::new("http://localhost:3838");
        assert_eq!(page.panel(), Panel::Pretest);

        page.on_check_mic(true, &banner, &MessagesConfig::default());
        assert_eq!(page.panel(), Panel::Explanation);
        assert!(!banner.get().visible);
    }

    #[test]
    fn test_unsupported_shows_banner() {
        let banner = BannerHandle::default();
        let messages = MessagesConfig::default();
        let mut page = MicCheckPage::new("http://localhost:3838");

        page.on_check_mic(false, &banner, &messages);
        assert_eq!(banner.get().message.as_deref(), Some(messages.unsupported.as_str()));
    }

    #[test]
    fn test_recording_done_plays_transcoded_copy() {
        let mut page = MicCheckPage::new("http://localhost:3838/");
        let token = UploadToken::parse("31337").unwrap();

        let source = page.on_recording_done(Some(&token)).unwrap();
        assert_eq!(page.panel(), Panel::Confirmed);
        assert_eq!(source.urls, vec!["http://localhost:3838/api/mic_check.ogg?31337"]);
    }

    #[test]
    fn test_recording_done_without_token_stays_put() {
        let mut page = MicCheckPage::new("http://localhost:3838");
        page.on_check_mic(false, &BannerHandle::default(), &MessagesConfig::default());

        assert!(page.on_recording_done(None).is_none());
        assert_eq!(page.panel(), Panel::Explanation);
    }

    #[test]
    fn test_check_again_resets_only_presentation() {
        let mut page = MicCheckPage::new("http://localhost:3838");
        let token = UploadToken::parse("1").unwrap();
        page.on_recording_done(Some(&token));

        page.on_check_again();
        assert_eq!(page.panel(), Panel::Explanation);

        page.on_check_again();
        assert_eq!(page.panel(), Panel::Explanation);
    }

    #[test]
    fn test_panel_as_str() {
        assert_eq!(Panel::Pretest.as_str(), "pretest");
        assert_eq!(Panel::Explanation.as_str(), "explanation");
        assert_eq!(Panel::Confirmed.as_str(), "confirmed");
    }
}
