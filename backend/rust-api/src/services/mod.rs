use std::sync::Arc;

use crate::config::Config;
use judge::{CodeRunner, Judge0Client};
use progress_service::ProgressService;
use session_store::SessionStore;
use session_timer::SessionTimers;
use strapi::StrapiClient;
use submission_service::SubmissionTracker;

pub struct AppState {
    pub config: Config,
    pub strapi: StrapiClient,
    pub judge: Arc<dyn CodeRunner>,
    pub sessions: SessionStore,
    pub timers: SessionTimers,
    pub progress: ProgressService,
    pub submissions: SubmissionTracker,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let runner = Judge0Client::new(config.judge.clone())?;
        Self::with_runner(config, Arc::new(runner)).await
    }

    /// Same as [`AppState::new`] with an explicit code runner.
    pub async fn with_runner(config: Config, runner: Arc<dyn CodeRunner>) -> anyhow::Result<Self> {
        let strapi = StrapiClient::new(&config.strapi)?;
        tracing::info!("Backend API at {}", strapi.base_url());

        let sessions = SessionStore::load(config.sessions.path.clone()).await?;
        let timers = SessionTimers::new(strapi.clone(), config.admin_timer.clone());
        let progress = ProgressService::new(strapi.clone(), config.progress.step);

        Ok(Self {
            config,
            strapi,
            judge: runner,
            sessions,
            timers,
            progress,
            submissions: SubmissionTracker::default(),
        })
    }
}

pub mod administrator_service;
pub mod auth_service;
pub mod dashboard_service;
pub mod exercise_service;
pub mod judge;
pub mod practicant_service;
pub mod progress_service;
pub mod session_store;
pub mod session_timer;
pub mod strapi;
pub mod submission_service;
pub mod topic_service;
