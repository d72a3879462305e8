use std::sync::Arc;

use handlebars::TemplateError;
use sqlx::SqlitePool;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::db::TicketRepository;
use crate::services::mailer::{Mailbox, Mailer};
use crate::services::{CodeRenderer, Dispatcher, IssuanceEngine, SignatureVerifier, ValidationEngine};
use crate::templates::Templates;

/// Shared by every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repo: TicketRepository,
    pub verifier: SignatureVerifier,
    pub issuance: IssuanceEngine,
    pub validation: ValidationEngine,
    pub templates: Arc<Templates>,
}

impl AppState {
    /// Wires the engines together and starts the delivery worker. The
    /// returned handle finishes once the state (and with it every queue
    /// sender) has been dropped and pending emails are flushed.
    pub fn new(
        config: Arc<Config>,
        pool: SqlitePool,
        mailer: Arc<dyn Mailer>,
    ) -> Result<(Self, JoinHandle<()>), TemplateError> {
        let templates = Arc::new(Templates::new()?);
        let repo = TicketRepository::new(pool);

        let sender = Mailbox {
            email: config.mail.sender_email.clone(),
            name: Some(config.mail.sender_name.clone()),
        };
        let (dispatcher, worker) = Dispatcher::spawn(
            mailer,
            templates.clone(),
            sender,
            config.dispatch_queue_capacity,
        );

        let issuance = IssuanceEngine::new(
            repo.clone(),
            CodeRenderer::new(config.qr_code_dir.clone()),
            dispatcher,
            config.clone(),
        );

        let state = Self {
            verifier: SignatureVerifier::new(config.paystack_secret_key.clone()),
            validation: ValidationEngine::new(repo.clone()),
            issuance,
            repo,
            templates,
            config,
        };

        Ok((state, worker))
    }
}
