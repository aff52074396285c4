use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;

use birdia_capture::{ProcessInput, Recorder};
use birdia_client::{provider_from_config, Analyzer, ApiClient};
use birdia_common::config::Config;
use birdia_common::session::{FileSessionStore, SessionStore};

use crate::prompt::Prompter;
use crate::router::{self, Route};

/// Everything a command needs.
pub struct App {
    pub config: Config,
    pub store: Arc<dyn SessionStore>,
    pub api: ApiClient,
    pub prompter: Prompter,
    pub open_image: bool,
    /// Set by the shell; one-shot commands leave it off.
    pub interactive: bool,
    /// Created on first use; keeps a failed capture for resubmission.
    pub analyzer: Option<Analyzer>,
}

impl App {
    pub fn new(config: Config, open_image: bool) -> Result<Self> {
        let store: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(config.session_path.clone()));
        let api = ApiClient::from_config(&config, store.clone()).context("Cannot create HTTP client")?;
        Ok(Self {
            config,
            store,
            api,
            prompter: Prompter::new(),
            open_image,
            interactive: false,
            analyzer: None,
        })
    }

    pub fn route(&self) -> Result<Route> {
        router::resolve(self.store.as_ref(), self.config.idle_timeout(), Utc::now())
    }

    /// Mark the stored session as used now.
    pub fn touch_session(&self) -> Result<()> {
        if let Some(mut session) = self.store.load()? {
            session.touch();
            self.store.save(&session)?;
        }
        Ok(())
    }
}

pub fn build_analyzer(config: &Config) -> Analyzer {
    let input = ProcessInput::new(config.rec_card.clone(), config.recording_dir.clone());
    Analyzer::new(
        Recorder::new(Box::new(input)),
        provider_from_config(config),
        config.geolocation_timeout(),
    )
}
