/// file: src/router.rs
/// description: flat section state machine; exactly one section is active at a time
use crate::error::{DashboardError, Result};
use async_trait::async_trait;
use std::{fmt, str::FromStr, sync::Arc};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Dashboard,
    Wallet,
    Mining,
    Charts,
    News,
    NodeInfo,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Dashboard,
        Section::Wallet,
        Section::Mining,
        Section::Charts,
        Section::News,
        Section::NodeInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Dashboard => "dashboard",
            Section::Wallet => "wallet",
            Section::Mining => "mining",
            Section::Charts => "charts",
            Section::News => "news",
            Section::NodeInfo => "node-info",
        }
    }

    /// Number-key shortcuts for the first five sections.
    pub fn from_shortcut(key: &str) -> Option<Section> {
        match key {
            "1" => Some(Section::Dashboard),
            "2" => Some(Section::Wallet),
            "3" => Some(Section::Mining),
            "4" => Some(Section::Charts),
            "5" => Some(Section::News),
            _ => None,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dashboard" => Ok(Section::Dashboard),
            "wallet" => Ok(Section::Wallet),
            "mining" => Ok(Section::Mining),
            "charts" => Ok(Section::Charts),
            "news" => Ok(Section::News),
            "node-info" | "kaspa-info" => Ok(Section::NodeInfo),
            other => Err(DashboardError::UnknownSection(other.to_string())),
        }
    }
}

/// Visual side of section switching.
pub trait SectionView: Send + Sync {
    fn hide(&self, section: Section);
    fn show(&self, section: Section);
    /// Marks `section` as the single highlighted navigation entry.
    fn highlight(&self, section: Section);
}

/// Per-section data load. Implementations decide what each section reloads.
#[async_trait]
pub trait SectionLoader: Send + Sync {
    async fn load(&self, section: Section) -> Result<()>;
}

pub struct SectionRouter {
    active: watch::Sender<Section>,
    view: Arc<dyn SectionView>,
    loader: Arc<dyn SectionLoader>,
}

impl SectionRouter {
    pub fn new(
        initial: Section,
        view: Arc<dyn SectionView>,
        loader: Arc<dyn SectionLoader>,
    ) -> Self {
        let (active, _) = watch::channel(initial);
        Self::from_sender(active, view, loader)
    }

    /// Router publishing through an existing channel, for components that
    /// must watch the active section before the router exists.
    pub fn from_sender(
        active: watch::Sender<Section>,
        view: Arc<dyn SectionView>,
        loader: Arc<dyn SectionLoader>,
    ) -> Self {
        Self {
            active,
            view,
            loader,
        }
    }

    pub fn active(&self) -> Section {
        *self.active.borrow()
    }

    /// Receiver that always holds the active section.
    pub fn watch(&self) -> watch::Receiver<Section> {
        self.active.subscribe()
    }

    /// Activates a section by name. Unknown names leave the active section
    /// untouched and return `None`.
    pub async fn activate(&self, name: &str) -> Option<Section> {
        match name.parse::<Section>() {
            Ok(section) => {
                self.activate_section(section).await;
                Some(section)
            }
            Err(e) => {
                warn!("Ignoring navigation: {}", e);
                None
            }
        }
    }

    pub async fn activate_section(&self, section: Section) {
        let previous = self.active();
        self.view.hide(previous);
        self.active.send_replace(section);
        self.view.highlight(section);
        self.view.show(section);
        info!(from = %previous, to = %section, "Section activated");

        self.dispatch(section).await;
    }

    /// Reloads the active section's data without touching visibility.
    pub async fn refresh_current(&self) {
        let section = self.active();
        debug!(%section, "Refreshing current section");
        self.dispatch(section).await;
    }

    async fn dispatch(&self, section: Section) {
        if let Err(e) = self.loader.load(section).await {
            error!(%section, "Error loading section data: {}", e);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    fn router(fail: bool) -> (SectionRouter, Arc<Journal>) {
        let journal = Arc::new(Journal::default());
        let router = SectionRouter::new(
            Section::Dashboard,
            Arc::new(RecordingView(journal.clone())),
            Arc::new(RecordingLoader {
                journal: journal.clone(),
                fail,
            }),
        );
        (router, journal)
    }

    #[test]
    fn parses_names_aliases_and_shortcuts() {
        assert_eq!("node-info".parse::<Section>().unwrap(), Section::NodeInfo);
        assert_eq!("kaspa-info".parse::<Section>().unwrap(), Section::NodeInfo);
        assert_eq!(" Wallet ".parse::<Section>().unwrap(), Section::Wallet);
        assert!("settings".parse::<Section>().is_err());
        assert_eq!(Section::from_shortcut("3"), Some(Section::Mining));
        assert_eq!(Section::from_shortcut("6"), None);
        for section in Section::ALL {
            assert_eq!(section.as_str().parse::<Section>().unwrap(), section);
        }
    }

    #[tokio::test]
    async fn previous_section_hidden_before_next_load() {
        let (router, journal) = router(false);
        router.activate("wallet").await;
        journal.take();

        assert_eq!(router.activate("mining").await, Some(Section::Mining));
        assert_eq!(router.active(), Section::Mining);
        assert_eq!(
            journal.take(),
            vec![
                "hide wallet",
                "highlight mining",
                "show mining",
                "load mining"
            ]
        );
    }

    #[tokio::test]
    async fn unknown_section_is_a_no_op() {
        let (router, journal) = router(false);
        router.activate("charts").await;
        journal.take();

        assert_eq!(router.activate("not-a-real-section").await, None);
        assert_eq!(router.active(), Section::Charts);
        assert!(journal.take().is_empty());
    }

    #[tokio::test]
    async fn watchers_see_the_active_section() {
        let (router, _journal) = router(false);
        let rx = router.watch();
        assert_eq!(*rx.borrow(), Section::Dashboard);
        router.activate_section(Section::News).await;
        assert_eq!(*rx.borrow(), Section::News);
    }

    #[tokio::test]
    async fn load_failure_keeps_the_new_section_active() {
        let (router, journal) = router(true);
        router.activate("charts").await;
        assert_eq!(router.active(), Section::Charts);

        journal.take();
        router.refresh_current().await;
        assert_eq!(journal.take(), vec!["load charts"]);
    }
}
