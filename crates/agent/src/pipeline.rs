//! The public pipeline: resolves per-execution state and runs the loop
//! through the middleware chain (buffered) or a supervised task (streaming).

use clawpipe_config::AppConfig;
use clawpipe_core::{
    AgentContext, AgentOptions, Error, Message, ProviderFactory, Result, SkillRegistry,
    SkillResult, SkillSettings,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::loop_runner;
use crate::middleware::{
    self, DEFAULT_TIMEOUT, ErrorHandlingMiddleware, LoggingMiddleware, Middleware, Next,
    SecretRedactionMiddleware, TimeoutMiddleware, describe_failure,
};
use crate::prompt::compose_system_prompt;
use crate::slash::{SlashCommand, normalize_arguments};
use crate::stream_event::{AgentStreamEvent, EventSender};

/// The agent execution pipeline.
///
/// Cheap to clone; clones share the skill registry, the enablement toggles
/// and the provider factory. Each execution resolves its provider and skill
/// snapshot once at start.
#[derive(Clone)]
pub struct AgentPipeline {
    providers: Arc<dyn ProviderFactory>,
    skills: Arc<SkillRegistry>,
    settings: Arc<SkillSettings>,
    options: AgentOptions,
    middlewares: Arc<[Arc<dyn Middleware>]>,
    stream_timeout: Duration,
}

impl AgentPipeline {
    pub fn builder(providers: Arc<dyn ProviderFactory>, skills: SkillRegistry) -> PipelineBuilder {
        PipelineBuilder::new(providers, skills)
    }

    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    /// Every registered skill, enabled or not.
    pub fn skills(&self) -> &SkillRegistry {
        &self.skills
    }

    /// Enablement toggles; changes apply from the next execution on.
    pub fn settings(&self) -> &Arc<SkillSettings> {
        &self.settings
    }

    /// Names of the middlewares, outermost first.
    pub fn middleware_names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    async fn prepare(
        &self,
        user_input: &str,
        history: Option<&[Message]>,
        language_hint: Option<&str>,
    ) -> Result<AgentContext> {
        let provider = self.providers.provider().await?;
        let skills = self.settings.snapshot(&self.skills).await;
        debug!(
            provider = provider.name(),
            skills = skills.len(),
            "Resolved execution state"
        );

        let mut ctx = AgentContext::new(user_input, provider, skills, self.options.clone());
        let system_prompt =
            compose_system_prompt(self.options.system_prompt.as_deref(), language_hint);
        ctx.seed(system_prompt, history.unwrap_or_default());
        Ok(ctx)
    }

    /// Run one buffered execution through the middleware chain.
    ///
    /// With error containment installed, ordinary failures (including a
    /// provider that cannot be resolved) come back as `Ok` text.
    pub async fn execute(
        &self,
        user_input: &str,
        history: Option<&[Message]>,
        language_hint: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let mut ctx = match self.prepare(user_input, history, language_hint).await {
            Ok(ctx) => ctx,
            Err(err) => return middleware::recover(&self.middlewares, err, cancel),
        };
        Next::new(&self.middlewares).run(&mut ctx, cancel).await
    }

    /// Run one streaming execution.
    ///
    /// Events arrive on the returned receiver; the sequence always ends with
    /// exactly one `Completed` or `Error`. Dropping the receiver stops the
    /// execution at its next emission.
    ///
    /// Streamed text is not passed through the middleware chain, so it is
    /// not redacted; hosts that need parity with [`Self::execute`] should run
    /// `ContentDelta` and `Completed` content through
    /// [`clawpipe_security::redact_secrets`].
    pub fn execute_stream(
        &self,
        user_input: &str,
        history: Option<&[Message]>,
        language_hint: Option<&str>,
        cancel: &CancellationToken,
    ) -> mpsc::Receiver<AgentStreamEvent> {
        let (events, rx) = EventSender::channel();
        let pipeline = self.clone();
        let user_input = user_input.to_string();
        let history = history.map(<[Message]>::to_vec);
        let language_hint = language_hint.map(str::to_string);
        let caller = cancel.clone();

        tokio::spawn(async move {
            let deadline = caller.child_token();
            let result = tokio::select! {
                result = pipeline.stream_turns(
                    &user_input,
                    history.as_deref(),
                    language_hint.as_deref(),
                    &deadline,
                    &events,
                ) => result,
                _ = tokio::time::sleep(pipeline.stream_timeout) => {
                    Err(Error::Timeout(pipeline.stream_timeout))
                }
            };
            deadline.cancel();
            finish_stream(result, &caller, &events).await;
        });

        rx
    }

    async fn stream_turns(
        &self,
        user_input: &str,
        history: Option<&[Message]>,
        language_hint: Option<&str>,
        cancel: &CancellationToken,
        events: &EventSender,
    ) -> Result<()> {
        let mut ctx = self.prepare(user_input, history, language_hint).await?;
        loop_runner::run_stream(&mut ctx, cancel, events).await
    }

    /// Invoke one skill directly, bypassing the reasoning loop.
    ///
    /// Success: `ToolExecuting`, `ToolCompleted`, `ContentDelta`, `Completed`.
    /// Failure, unknown or disabled skill: a single `Error` (after
    /// `ToolExecuting` when the skill ran).
    pub fn execute_skill_directly_stream(
        &self,
        skill_name: &str,
        raw_arguments: &str,
        cancel: &CancellationToken,
    ) -> mpsc::Receiver<AgentStreamEvent> {
        let (events, rx) = EventSender::channel();
        let pipeline = self.clone();
        let skill_name = skill_name.to_string();
        let raw_arguments = raw_arguments.to_string();
        let caller = cancel.clone();

        tokio::spawn(async move {
            let result = pipeline
                .run_skill_directly(&skill_name, &raw_arguments, &caller, &events)
                .await;
            finish_stream(result, &caller, &events).await;
        });

        rx
    }

    /// Route `/name args` input to [`Self::execute_skill_directly_stream`].
    ///
    /// Returns `None` when `input` is not a slash command.
    pub fn execute_command_stream(
        &self,
        input: &str,
        cancel: &CancellationToken,
    ) -> Option<mpsc::Receiver<AgentStreamEvent>> {
        let command = SlashCommand::parse(input)?;
        Some(self.execute_skill_directly_stream(&command.name, &command.arguments, cancel))
    }

    async fn run_skill_directly(
        &self,
        skill_name: &str,
        raw_arguments: &str,
        cancel: &CancellationToken,
        events: &EventSender,
    ) -> Result<()> {
        let Some(skill) = self.skills.get(skill_name) else {
            return events
                .emit(AgentStreamEvent::error(format!("Skill '{skill_name}' not found.")))
                .await;
        };
        if !self.settings.is_enabled(skill_name).await {
            return events
                .emit(AgentStreamEvent::error(format!("Skill '{skill_name}' is disabled.")))
                .await;
        }

        let arguments = normalize_arguments(raw_arguments, skill.as_ref());
        info!(skill = %skill_name, "Direct skill invocation");
        events
            .emit(AgentStreamEvent::ToolExecuting {
                tool_name: skill.name().to_string(),
            })
            .await?;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = skill.execute(&arguments, cancel) => result,
        };

        match result {
            SkillResult::Success(output) => {
                events
                    .emit(AgentStreamEvent::ToolCompleted {
                        tool_name: skill.name().to_string(),
                        content: output.clone(),
                    })
                    .await?;
                events
                    .emit(AgentStreamEvent::ContentDelta {
                        content: output.clone(),
                    })
                    .await?;
                events
                    .emit(AgentStreamEvent::Completed { content: output })
                    .await
            }
            SkillResult::Failure(error) => {
                events
                    .emit(AgentStreamEvent::error(format!("Error: {error}")))
                    .await
            }
        }
    }
}

/// Report a failed stream as its terminal `Error` event.
async fn finish_stream(result: Result<()>, caller: &CancellationToken, events: &EventSender) {
    match result {
        Ok(()) => {}
        Err(Error::StreamClosed) => debug!("Stream consumer went away"),
        Err(err) => {
            let message = describe_failure(&err, caller);
            if events.emit(AgentStreamEvent::error(message)).await.is_err() {
                debug!("Stream consumer went away before the error was delivered");
            }
        }
    }
}

/// Assembles an [`AgentPipeline`].
///
/// Middlewares run in the order they are added, outermost first.
pub struct PipelineBuilder {
    providers: Arc<dyn ProviderFactory>,
    skills: SkillRegistry,
    settings: Arc<SkillSettings>,
    options: AgentOptions,
    middlewares: Vec<Arc<dyn Middleware>>,
    timeout: Duration,
}

impl PipelineBuilder {
    pub fn new(providers: Arc<dyn ProviderFactory>, skills: SkillRegistry) -> Self {
        Self {
            providers,
            skills,
            settings: Arc::new(SkillSettings::new()),
            options: AgentOptions::default(),
            middlewares: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build from loaded configuration, with the standard middleware order
    /// minus whatever the config switches off. The timeout layer is always
    /// installed.
    pub fn from_config(
        providers: Arc<dyn ProviderFactory>,
        skills: SkillRegistry,
        config: &AppConfig,
    ) -> Self {
        let mut builder = Self::new(providers, skills)
            .with_options(config.agent.clone())
            .with_settings(Arc::new(SkillSettings::from_disabled(
                &config.skills.disabled,
            )))
            .with_timeout(config.timeout());

        if config.middleware.contain_errors {
            builder = builder.use_middleware(ErrorHandlingMiddleware);
        }
        if config.middleware.redact_secrets {
            builder = builder.use_middleware(SecretRedactionMiddleware);
        }
        if config.middleware.log_requests {
            builder = builder.use_middleware(LoggingMiddleware);
        }
        builder.use_middleware(TimeoutMiddleware::new(config.timeout()))
    }

    /// Append a middleware (it runs inside everything added before it).
    pub fn use_middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn with_options(mut self, options: AgentOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_settings(mut self, settings: Arc<SkillSettings>) -> Self {
        self.settings = settings;
        self
    }

    /// Deadline for streaming executions and for the timeout layer added by
    /// [`Self::with_standard_middleware`]. Set it before that call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Error containment, secret redaction, logging, timeout.
    pub fn with_standard_middleware(self) -> Self {
        let timeout = self.timeout;
        self.use_middleware(ErrorHandlingMiddleware)
            .use_middleware(SecretRedactionMiddleware)
            .use_middleware(LoggingMiddleware)
            .use_middleware(TimeoutMiddleware::new(timeout))
    }

    pub fn build(self) -> AgentPipeline {
        info!(
            skills = self.skills.len(),
            middlewares = self.middlewares.len(),
            max_iterations = self.options.max_iterations,
            "Agent pipeline built"
        );
        AgentPipeline {
            providers: self.providers,
            skills: Arc::new(self.skills),
            settings: self.settings,
            options: self.options,
            middlewares: self.middlewares.into(),
            stream_timeout: self.timeout,
        }
    }
}
