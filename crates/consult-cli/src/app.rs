//! Command implementations.

use anyhow::Context;
use consult_auth::{
    AdmissionState, ConsultBackend, CredentialStore, HttpBackend, LoginFlow, LoginOutcome,
    PageSession, UserProfile,
};
use consult_config_and_utils::{Config, Paths};
use consult_storage::{FileStorage, OriginStorage};
use consult_window::{WidgetSettings, WindowDocument};
use std::sync::Arc;
use tab_coordinator::{
    BroadcastChannel, BroadcastHub, ConsultationCoordinator, OpenOutcome, WindowHandle,
    WindowOpener, CONSULTATION_CHANNEL,
};
use tracing::info;

pub struct App {
    config: Config,
    store: CredentialStore,
    backend: Arc<dyn ConsultBackend>,
}

impl App {
    pub fn new(config: Config, paths: &Paths) -> anyhow::Result<Self> {
        let storage: Arc<dyn OriginStorage> = Arc::new(
            FileStorage::new(paths.storage_file()).context("Failed to open session storage")?,
        );
        let backend: Arc<dyn ConsultBackend> =
            Arc::new(HttpBackend::new(&config.api_url).context("Invalid API URL")?);
        Ok(Self {
            config,
            store: CredentialStore::new(storage),
            backend,
        })
    }

    pub async fn login(&self, code: &str) -> anyhow::Result<()> {
        let flow = LoginFlow::new(
            self.store.clone(),
            self.backend.clone(),
            self.config.default_token_ttl_secs,
        );
        let outcome = flow
            .authenticate_with_code(code)
            .await
            .context("Login failed")?;

        let credential = outcome.credential();
        println!("Logged in; session valid until {}", credential.expires_at.to_rfc3339());
        if let LoginOutcome::NeedsMoreInformation(_) = outcome {
            println!("Your profile needs more information before a consultation can start.");
        }
        Ok(())
    }

    pub fn status(&self) -> anyhow::Result<()> {
        let Some(credential) = self.store.load() else {
            println!("Not logged in");
            return Ok(());
        };

        let vault = self.store.vault();
        println!("Logged in");
        println!("  expires:  {}", credential.expires_at.to_rfc3339());
        println!(
            "  subject:  {}",
            credential.subject.as_deref().unwrap_or("(unreadable)")
        );
        if let Some(email) = vault.email()? {
            println!("  email:    {}", email);
        }
        if let Some(profile) = vault.profile::<UserProfile>()? {
            println!(
                "  document: {}",
                profile.document().unwrap_or("(missing)")
            );
        }
        if let Some(status) = vault.signup_status()? {
            if status.need_more_information {
                println!("  profile incomplete (recorded {})", status.recorded_at);
            }
        }
        Ok(())
    }

    pub async fn admission(&self, open: bool) -> anyhow::Result<()> {
        let session = PageSession::new(self.store.clone(), self.backend.clone());
        let state = session.check_admission().await;
        println!("{}", session.view().label);

        if let (true, AdmissionState::Granted(grant)) = (open, &state) {
            let hub = BroadcastHub::new();
            let channel: Arc<dyn BroadcastChannel> = Arc::new(hub.open(CONSULTATION_CHANNEL));
            let coordinator = ConsultationCoordinator::new(
                Some(channel),
                Arc::new(PrintingOpener),
                WidgetSettings::from_config(&self.config),
            );
            match coordinator.open_consultation(grant) {
                Ok(OpenOutcome::Spawned { tab_id }) | Ok(OpenOutcome::Focused { tab_id }) => {
                    info!(tab_id = %tab_id, "Consultation window described");
                }
                Err(err) => {
                    let message = err.user_message().map(str::to_string);
                    return Err(anyhow::Error::new(err)
                        .context(message.unwrap_or_else(|| "Could not open consultation".into())));
                }
            }
            coordinator.close();
        }

        session.teardown();
        Ok(())
    }

    pub fn logout(&self) -> anyhow::Result<()> {
        self.store.clear().context("Failed to clear session")?;
        println!("Logged out");
        Ok(())
    }
}

/// Renders the window document to stdout instead of creating a window.
struct PrintingOpener;

struct PrintedWindow;

impl WindowHandle for PrintedWindow {
    fn is_closed(&self) -> bool {
        true
    }

    fn focus(&self) {}
}

impl WindowOpener for PrintingOpener {
    fn open(&self, document: &WindowDocument) -> Option<Box<dyn WindowHandle>> {
        let rendered = serde_json::to_string_pretty(document).ok()?;
        println!("{}", rendered);
        Some(Box::new(PrintedWindow))
    }
}
