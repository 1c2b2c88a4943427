//! The conversation turn handler.
//!
//! Orchestrates one user turn end to end: resolve the project, detect and
//! extract a shared site URL, persist the user message, invoke the model
//! over the assembled context, classify a level confirmation, and commit
//! the assistant reply together with the mutated project.
//!
//! Turns on the same project are serialized through [`ProjectLocks`];
//! turns on different projects run concurrently.

use futures::StreamExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::domain::conversation::ContextBuilder;
use crate::domain::foundation::{DomainError, ErrorCode, ProjectId, UserId};
use crate::domain::project::{BusinessLevel, Project, StoredMessage, WorkflowStage};
use crate::ports::{
    ChatMessage, CompletionRequest, ModelError, ModelProvider, ProjectStore, SiteExtractor,
    StoreError, TokenUsage,
};

/// One inbound user turn.
#[derive(Debug, Clone)]
pub struct TurnCommand {
    /// The user speaking.
    pub user_id: UserId,
    /// Target project; `None` falls back to the user's single active one.
    pub project_id: Option<ProjectId>,
    /// Raw message text.
    pub text: String,
}

/// Result of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Assistant reply text.
    pub reply: String,
    /// Side-channel note for the transport (site extraction confirmation).
    pub annotation: Option<String>,
    /// Token accounting for the model call.
    pub usage: TokenUsage,
    /// Project stage after the turn.
    pub stage: WorkflowStage,
    /// Confirmed business level after the turn, if any.
    pub level: Option<BusinessLevel>,
}

/// Events emitted by a streaming turn.
#[derive(Debug, Clone)]
pub enum TurnEvent {
    /// A reply fragment, in order.
    Chunk(String),
    /// The turn finished and was persisted; fragments concatenate to
    /// `outcome.reply`.
    Completed(TurnOutcome),
    /// The turn failed; nothing after the user message was persisted.
    Failed(DomainError),
}

/// Per-project turn serialization.
///
/// Each project gets its own async mutex, created on first use. The
/// process-wide map itself is only locked long enough to fetch or insert an
/// entry.
#[derive(Default)]
pub struct ProjectLocks {
    locks: Mutex<HashMap<ProjectId, Arc<tokio::sync::Mutex<()>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, project_id: ProjectId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(project_id).or_default())
    }

    /// Acquires the project's lock, waiting behind any in-flight turn.
    pub async fn acquire(&self, project_id: ProjectId) -> tokio::sync::OwnedMutexGuard<()> {
        self.entry(project_id).lock_owned().await
    }
}

/// Handles conversation turns.
pub struct TurnHandler<S, M, X> {
    store: Arc<S>,
    model: Arc<M>,
    extractor: Arc<X>,
    context: ContextBuilder,
    locks: Arc<ProjectLocks>,
    max_output_tokens: u32,
    history_limit: u32,
}

impl<S, M, X> TurnHandler<S, M, X>
where
    S: ProjectStore,
    M: ModelProvider,
    X: SiteExtractor,
{
    /// Creates a handler over the given collaborators.
    pub fn new(
        store: Arc<S>,
        model: Arc<M>,
        extractor: Arc<X>,
        history_limit: u32,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            store,
            model,
            extractor,
            context: ContextBuilder::new(history_limit as usize),
            locks: Arc::new(ProjectLocks::new()),
            max_output_tokens,
            history_limit,
        }
    }

    /// Handles one turn to completion.
    pub async fn handle(&self, command: TurnCommand) -> Result<TurnOutcome, DomainError> {
        let project_id = self.resolve_project_id(&command).await?;
        let _guard = self.locks.acquire(project_id).await;
        let mut project = self.load_project(command.user_id, project_id).await?;

        let annotation = self.ingest_site(&mut project, &command.text).await;
        self.record_user_message(&mut project, &command.text).await?;

        let request = self.build_request(&project).await?;
        let response = self.model.complete(request).await.map_err(|err| {
            error!(
                project_id = %project.id,
                stage = %project.stage,
                error = %err,
                "model invocation failed"
            );
            map_model_error(err)
        })?;

        self.finish_turn(project, &command.text, response.text, response.usage, annotation)
            .await
    }

    /// Handles one turn, delivering the reply progressively.
    ///
    /// The receiver yields [`TurnEvent::Chunk`] fragments as the model
    /// produces them, then exactly one `Completed` or `Failed`.
    pub fn handle_streaming(self: Arc<Self>, command: TurnCommand) -> mpsc::Receiver<TurnEvent>
    where
        S: 'static,
        M: 'static,
        X: 'static,
    {
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            match self.run_streaming(command, &tx).await {
                Ok(outcome) => {
                    let _ = tx.send(TurnEvent::Completed(outcome)).await;
                }
                Err(err) => {
                    let _ = tx.send(TurnEvent::Failed(err)).await;
                }
            }
        });

        rx
    }

    async fn run_streaming(
        &self,
        command: TurnCommand,
        tx: &mpsc::Sender<TurnEvent>,
    ) -> Result<TurnOutcome, DomainError> {
        let project_id = self.resolve_project_id(&command).await?;
        let _guard = self.locks.acquire(project_id).await;
        let mut project = self.load_project(command.user_id, project_id).await?;

        let annotation = self.ingest_site(&mut project, &command.text).await;
        self.record_user_message(&mut project, &command.text).await?;

        let request = self.build_request(&project).await?;
        let mut stream = self.model.stream(request).await.map_err(|err| {
            error!(
                project_id = %project.id,
                stage = %project.stage,
                error = %err,
                "model stream failed to start"
            );
            map_model_error(err)
        })?;

        let mut reply = String::new();
        let mut usage = TokenUsage::zero();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| {
                error!(
                    project_id = %project.id,
                    stage = %project.stage,
                    error = %err,
                    "model stream broke mid-reply"
                );
                map_model_error(err)
            })?;
            if !chunk.delta.is_empty() {
                let _ = tx.send(TurnEvent::Chunk(chunk.delta.clone())).await;
                reply.push_str(&chunk.delta);
            }
            if let Some(final_usage) = chunk.usage {
                usage = final_usage;
            }
        }

        self.finish_turn(project, &command.text, reply, usage, annotation)
            .await
    }

    /// Resolves the target project id: explicit, or the user's single
    /// active one.
    async fn resolve_project_id(&self, command: &TurnCommand) -> Result<ProjectId, DomainError> {
        if let Some(project_id) = command.project_id {
            return Ok(project_id);
        }

        let projects = self
            .store
            .list_active(command.user_id)
            .await
            .map_err(map_store_error)?;
        // Most recently updated first; ties go to the freshest work.
        projects.first().map(|p| p.id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::NoActiveProject,
                "create a project before sending messages",
            )
        })
    }

    /// Loads the project snapshot. Called under the project lock, after any
    /// in-flight turn has committed, so this turn never works from a copy
    /// that an earlier turn is about to overwrite.
    async fn load_project(
        &self,
        user_id: UserId,
        project_id: ProjectId,
    ) -> Result<Project, DomainError> {
        self.store
            .find_active(user_id, project_id)
            .await
            .map_err(map_store_error)?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::ProjectNotFound,
                    format!("no active project {project_id}"),
                )
            })
    }

    /// Detects a URL in the user text and attaches the extracted site text.
    ///
    /// Best-effort: extraction failure leaves the turn untouched. Only the
    /// first site ever attaches; later URLs are ignored.
    async fn ingest_site(&self, project: &mut Project, text: &str) -> Option<String> {
        if project.website_content.is_some() {
            return None;
        }
        let url = detect_url(text)?;

        let outcome = self.extractor.extract(url).await;
        let site_text = outcome.text()?.to_string();
        if project.attach_site_content(url, site_text) {
            info!(project_id = %project.id, url, "site content attached");
            Some("Изучил сайт — информация учтена в работе над проектом.".to_string())
        } else {
            None
        }
    }

    async fn record_user_message(
        &self,
        project: &mut Project,
        text: &str,
    ) -> Result<(), DomainError> {
        let message = StoredMessage::user(project.id, project.stage, text);
        self.store
            .record_user_turn(project, &message)
            .await
            .map_err(|err| {
                error!(
                    project_id = %project.id,
                    stage = %project.stage,
                    error = %err,
                    "failed to record user message"
                );
                map_store_error(err)
            })
    }

    async fn build_request(&self, project: &Project) -> Result<CompletionRequest, DomainError> {
        let history = self
            .store
            .recent_messages(project.id, self.history_limit)
            .await
            .map_err(map_store_error)?;
        let window = self.context.window(&history);

        Ok(CompletionRequest::new(
            self.context.instructions(project),
            self.max_output_tokens,
        )
        .with_history(
            window
                .iter()
                .map(|m| ChatMessage::new(m.role, m.content.clone())),
        ))
    }

    /// Applies post-reply state changes and commits the assistant turn.
    async fn finish_turn(
        &self,
        mut project: Project,
        user_text: &str,
        reply: String,
        usage: TokenUsage,
        annotation: Option<String>,
    ) -> Result<TurnOutcome, DomainError> {
        if project.stage == WorkflowStage::Onboarding {
            if let Some(level) = BusinessLevel::detect(user_text) {
                project.confirm_level(level)?;
                info!(project_id = %project.id, %level, "business level confirmed");
            }
        }

        let message = StoredMessage::assistant(
            project.id,
            project.stage,
            reply.clone(),
            usage.input_tokens,
            usage.output_tokens,
        );
        self.store
            .commit_assistant_turn(&project, &message)
            .await
            .map_err(|err| {
                error!(
                    project_id = %project.id,
                    stage = %project.stage,
                    error = %err,
                    "failed to commit assistant turn"
                );
                map_store_error(err)
            })?;

        Ok(TurnOutcome {
            reply,
            annotation,
            usage,
            stage: project.stage,
            level: project.level,
        })
    }
}

/// Finds the first URL-looking token in free text.
fn detect_url(text: &str) -> Option<&str> {
    text.split_whitespace()
        .map(|token| token.trim_end_matches([',', '.', ';', ')', '!', '?']))
        .find(|token| {
            token.starts_with("http://") || token.starts_with("https://") || token.starts_with("www.")
        })
        .filter(|token| token.len() > 4)
}

fn map_store_error(err: StoreError) -> DomainError {
    DomainError::new(ErrorCode::StorageError, err.to_string())
}

fn map_model_error(err: ModelError) -> DomainError {
    match err {
        ModelError::ContentFiltered { .. } | ModelError::InvalidRequest(_) => {
            DomainError::new(ErrorCode::ModelRejected, err.to_string())
        }
        ModelError::AuthenticationFailed | ModelError::Parse(_) => {
            DomainError::new(ErrorCode::InternalError, err.to_string())
        }
        _ => DomainError::new(ErrorCode::ServiceUnavailable, err.to_string()),
    }
}
