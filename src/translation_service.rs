use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::credentials::Credential;
use crate::llm::Llm;
use crate::presenter::{Outcome, Presenter, ValidatedForm};

#[derive(Debug, Clone)]
pub struct TranslationJob {
    pub id: u64,
    pub form: ValidatedForm,
}

#[derive(Debug, Clone)]
pub struct TranslationResponse {
    pub id: u64,
    pub outcome: Outcome,
}

/// Runs model calls off the UI thread. Callers keep at most one job in
/// flight and wait for its response before sending another.
pub struct TranslationService {
    pub request_tx: mpsc::UnboundedSender<TranslationJob>,
    pub response_rx: mpsc::UnboundedReceiver<TranslationResponse>,
}

impl TranslationService {
    pub fn new<F, L>(presenter: Presenter<F>) -> Self
    where
        F: Fn(&Credential) -> Result<L> + Send + Sync + 'static,
        L: Llm + Send + Sync + 'static,
    {
        let (request_tx, request_rx) = mpsc::unbounded_channel::<TranslationJob>();
        let (response_tx, response_rx) = mpsc::unbounded_channel::<TranslationResponse>();

        // Spawn background translation worker
        tokio::spawn(translation_worker(presenter, request_rx, response_tx));

        Self {
            request_tx,
            response_rx,
        }
    }

    pub fn request_translation(&self, job: TranslationJob) -> Result<()> {
        self.request_tx
            .send(job)
            .map_err(|e| anyhow::anyhow!("Failed to send translation request: {}", e))?;

        Ok(())
    }

    pub fn try_recv_translation(&mut self) -> Option<TranslationResponse> {
        self.response_rx.try_recv().ok()
    }
}

async fn translation_worker<F, L>(
    presenter: Presenter<F>,
    mut request_rx: mpsc::UnboundedReceiver<TranslationJob>,
    response_tx: mpsc::UnboundedSender<TranslationResponse>,
) where
    F: Fn(&Credential) -> Result<L>,
    L: Llm,
{
    debug!("Translation worker started");

    while let Some(job) = request_rx.recv().await {
        debug!("Processing translation job {}", job.id);

        let outcome = presenter.invoke(job.form).await;
        let response = TranslationResponse {
            id: job.id,
            outcome,
        };

        if let Err(e) = response_tx.send(response) {
            error!("Failed to send translation response: {}", e);
        }
    }

    debug!("Translation worker stopped");
}
