// src/state/mod.rs
use crossbeam_channel::{bounded, Receiver, TryRecvError};
use serde_json::Value;
use std::sync::Arc;
use tracing::error;

use crate::analysis::request::UNKNOWN_ERROR;
use crate::analysis::{AnalysisError, AnalysisFlow, TransportTargets};
use crate::auth::device_code::DeviceCodePrompt;
use crate::auth::{Account, AuthProvider};
use crate::config::AppConfig;
use crate::file::Document;

/// Results view tabs. Local view state, defaults to the summary, never
/// validated against the result's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultTab {
    Summary,
    Entities,
    Topics,
    Raw,
}

/// Terminal outcome of one analysis submission.
#[derive(Debug)]
pub enum AnalysisEvent {
    Completed(Value),
    Failed(String),
}

#[derive(Debug)]
pub enum LoginEvent {
    Completed(Account),
    Failed(String),
}

// Core application state
pub struct AppState {
    pub config: AppConfig,
    pub auth: Arc<dyn AuthProvider>,

    // Session data
    pub document: Option<Document>,
    pub result: Option<Value>,

    // Minimal UI state
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub result_tab: ResultTab,
    pub signing_in: bool,
    pub login_prompt: Option<DeviceCodePrompt>,

    // Worker channels, polled once per frame
    analysis_events: Option<Receiver<AnalysisEvent>>,
    login_events: Option<Receiver<LoginEvent>>,
    login_prompts: Option<Receiver<DeviceCodePrompt>>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        auth: Arc<dyn AuthProvider>,
        login_prompts: Option<Receiver<DeviceCodePrompt>>,
    ) -> Self {
        Self {
            config,
            auth,
            document: None,
            result: None,
            is_loading: false,
            error_message: None,
            result_tab: ResultTab::Summary,
            signing_in: false,
            login_prompt: None,
            analysis_events: None,
            login_events: None,
            login_prompts,
        }
    }

    /// Starts one submission. At most one is in flight; callers disable the
    /// submit control while `is_loading` is set.
    pub fn start_analysis(&mut self, ctx: &eframe::egui::Context) {
        let document = match &self.document {
            Some(doc) if !doc.content.is_empty() => doc.clone(),
            _ => {
                self.error_message = Some(AnalysisError::EmptyDocument.user_message());
                return;
            }
        };

        // Session state resets at the start of each submission.
        self.is_loading = true;
        self.error_message = None;
        self.result = None;
        self.result_tab = ResultTab::Summary;

        self.analysis_events = Some(spawn_analysis(
            ctx.clone(),
            TransportTargets::from_config(&self.config),
            self.auth.clone(),
            document,
        ));
    }

    pub fn start_login(&mut self, ctx: &eframe::egui::Context) {
        if self.signing_in {
            return;
        }
        self.signing_in = true;
        self.error_message = None;
        self.login_events = Some(spawn_login(ctx.clone(), self.auth.clone()));
    }

    pub fn logout(&mut self) {
        self.auth.logout();
        self.document = None;
        self.result = None;
        self.error_message = None;
        self.login_prompt = None;
    }

    /// Drains worker channels. Loading can never stick: a worker that dies
    /// without reporting counts as a generic failure.
    pub fn poll_workers(&mut self) {
        if let Some(events) = self.analysis_events.take() {
            match events.try_recv() {
                Ok(AnalysisEvent::Completed(body)) => {
                    self.result = Some(body);
                    self.error_message = None;
                    self.is_loading = false;
                }
                Ok(AnalysisEvent::Failed(message)) => {
                    self.error_message = Some(message);
                    self.is_loading = false;
                }
                Err(TryRecvError::Empty) => self.analysis_events = Some(events),
                Err(TryRecvError::Disconnected) => {
                    self.error_message = Some(UNKNOWN_ERROR.to_string());
                    self.is_loading = false;
                }
            }
        }

        if let Some(events) = self.login_events.take() {
            match events.try_recv() {
                Ok(LoginEvent::Completed(_)) => {
                    self.signing_in = false;
                    self.login_prompt = None;
                }
                Ok(LoginEvent::Failed(message)) => {
                    self.signing_in = false;
                    self.login_prompt = None;
                    self.error_message = Some(message);
                }
                Err(TryRecvError::Empty) => self.login_events = Some(events),
                Err(TryRecvError::Disconnected) => {
                    self.signing_in = false;
                    self.login_prompt = None;
                }
            }
        }

        if let Some(prompts) = &self.login_prompts {
            while let Ok(prompt) = prompts.try_recv() {
                self.login_prompt = Some(prompt);
            }
        }
    }
}

fn worker_runtime() -> std::io::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
}

/// Runs one analysis submission on its own thread and reports the terminal
/// outcome. Exactly one event is sent per submission.
fn spawn_analysis(
    ctx: eframe::egui::Context,
    targets: TransportTargets,
    auth: Arc<dyn AuthProvider>,
    document: Document,
) -> Receiver<AnalysisEvent> {
    let (tx, rx) = bounded(1);
    std::thread::spawn(move || {
        let event = match worker_runtime() {
            Ok(runtime) => {
                let flow = AnalysisFlow::new(targets);
                match runtime.block_on(flow.run(auth.as_ref(), &document)) {
                    Ok(body) => AnalysisEvent::Completed(body),
                    Err(err) => AnalysisEvent::Failed(err.user_message()),
                }
            }
            Err(err) => {
                error!("could not start analysis worker runtime: {err}");
                AnalysisEvent::Failed(UNKNOWN_ERROR.to_string())
            }
        };
        let _ = tx.send(event);
        ctx.request_repaint();
    });
    rx
}

fn spawn_login(ctx: eframe::egui::Context, auth: Arc<dyn AuthProvider>) -> Receiver<LoginEvent> {
    let (tx, rx) = bounded(1);
    std::thread::spawn(move || {
        let event = match worker_runtime() {
            Ok(runtime) => match runtime.block_on(auth.login()) {
                Ok(account) => LoginEvent::Completed(account),
                Err(err) => LoginEvent::Failed(err.to_string()),
            },
            Err(err) => {
                error!("could not start login worker runtime: {err}");
                LoginEvent::Failed(err.to_string())
            }
        };
        let _ = tx.send(event);
        ctx.request_repaint();
    });
    rx
}
