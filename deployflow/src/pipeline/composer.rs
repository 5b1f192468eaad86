//! The pipeline composer: fixed Source/Build/self-update topology plus
//! extension operations for environment stages.

use super::{ArtifactRegistry, PipelineGraph, PipelineSettings, Stage, StageBuilder, StageHandle};
use crate::config::{PipelineConfig, SourceRepository};
use crate::core::{
    Action, ActionKind, ArtifactHandle, BuildProjectConfig, EnvironmentVariable,
    GitHubSourceConfig, ParameterValue, ProducerRef, SecretRef, StackDeployConfig,
    DEFAULT_RUN_ORDER, MAX_RUN_ORDER,
};
use crate::errors::{ConfigurationError, Result, TopologyError};
use crate::events::{event_types, EventSink, NoOpEventSink};
use crate::stacks::{ServiceDescriptor, StackDescriptor};
use crate::utils::generate_uuid;
use crate::utils::validation::require_non_blank;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Well-known stage, action and artifact names of the fixed topology.
pub mod names {
    /// Source stage.
    pub const SOURCE_STAGE: &str = "Source";
    /// Build stage.
    pub const BUILD_STAGE: &str = "Build";
    /// Self-update stage.
    pub const SELF_UPDATE_STAGE: &str = "Pipeline_Update";

    /// Fetches the pipeline definition repository.
    pub const PIPELINE_SOURCE_ACTION: &str = "Pipeline_Source";
    /// Fetches the service repository.
    pub const SERVICE_SOURCE_ACTION: &str = "Service_Source";
    /// Builds the pipeline definition into templates.
    pub const PIPELINE_BUILD_ACTION: &str = "CDK_Build";
    /// Builds the service bundle.
    pub const SERVICE_BUILD_ACTION: &str = "Service_Build";
    /// Redeploys the pipeline's own stack.
    pub const SELF_UPDATE_ACTION: &str = "Pipeline_Update";
    /// Deploys a service stack.
    pub const SERVICE_UPDATE_ACTION: &str = "Service_Update";
    /// Deploys a billing stack.
    pub const BILLING_UPDATE_ACTION: &str = "Billing_Update";
    /// Runs service integration tests.
    pub const INTEGRATION_TEST_ACTION: &str = "Integration_Tests";

    /// Pipeline definition source bundle.
    pub const PIPELINE_SOURCE_OUTPUT: &str = "CDKSourceOutput";
    /// Service source bundle.
    pub const SERVICE_SOURCE_OUTPUT: &str = "ServiceSourceOutput";
    /// Synthesized templates.
    pub const PIPELINE_BUILD_OUTPUT: &str = "CdkBuildOutput";
    /// Built service bundle.
    pub const SERVICE_BUILD_OUTPUT: &str = "ServiceBuildOutput";

    /// Environment variable carrying the endpoint under test.
    pub const SERVICE_ENDPOINT_VARIABLE: &str = "SERVICE_ENDPOINT";
}

/// Owns one pipeline graph and exposes the operations that extend it.
///
/// Every composer has its own artifact registry and stage-name map, and the
/// [`StageHandle`]s it returns are rejected by every other composer.
pub struct PipelineComposer {
    id: Uuid,
    config: PipelineConfig,
    artifacts: ArtifactRegistry,
    stages: StageBuilder,
    service_source_output: ArtifactHandle,
    pipeline_build_output: ArtifactHandle,
    service_build_output: ArtifactHandle,
    events: Arc<dyn EventSink>,
}

impl fmt::Debug for PipelineComposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineComposer")
            .field("id", &self.id)
            .field("pipeline", &self.config.pipeline_name)
            .field("stages", &self.stages.stage_names())
            .finish_non_exhaustive()
    }
}

impl PipelineComposer {
    /// Builds the fixed Source → Build → self-update topology.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn construct(config: PipelineConfig) -> Result<Self> {
        Self::construct_with_sink(config, Arc::new(NoOpEventSink))
    }

    /// Like [`construct`](Self::construct), reporting mutations to `events`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn construct_with_sink(config: PipelineConfig, events: Arc<dyn EventSink>) -> Result<Self> {
        use names::*;

        config.validate()?;

        let id = generate_uuid();
        let mut artifacts = ArtifactRegistry::new(id);
        let pipeline_source_output = artifacts.declare(PIPELINE_SOURCE_OUTPUT)?;
        let service_source_output = artifacts.declare(SERVICE_SOURCE_OUTPUT)?;
        let pipeline_build_output = artifacts.declare(PIPELINE_BUILD_OUTPUT)?;
        let service_build_output = artifacts.declare(SERVICE_BUILD_OUTPUT)?;

        let mut composer = Self {
            id,
            config,
            artifacts,
            stages: StageBuilder::new(id),
            service_source_output: service_source_output.clone(),
            pipeline_build_output: pipeline_build_output.clone(),
            service_build_output: service_build_output.clone(),
            events,
        };

        let oauth_token = SecretRef::new(&composer.config.oauth_secret_name);
        let source_actions = vec![
            Action::github_source(
                PIPELINE_SOURCE_ACTION,
                source_config(&composer.config.pipeline_source, &oauth_token),
                pipeline_source_output.clone(),
            ),
            Action::github_source(
                SERVICE_SOURCE_ACTION,
                source_config(&composer.config.service_source, &oauth_token),
                service_source_output.clone(),
            ),
        ];
        composer.append_stage(SOURCE_STAGE, source_actions)?;

        let image = composer.config.build_image.clone();
        let specs = composer.config.build_specs.clone();
        let build_actions = vec![
            Action::build(
                PIPELINE_BUILD_ACTION,
                BuildProjectConfig::new("CdkBuildProject", &image, &specs.pipeline),
                pipeline_source_output,
            )
            .with_output(pipeline_build_output.clone()),
            Action::build(
                SERVICE_BUILD_ACTION,
                BuildProjectConfig::new("ServiceBuildProject", &image, &specs.service),
                service_source_output,
            )
            .with_output(service_build_output),
        ];
        composer.append_stage(BUILD_STAGE, build_actions)?;

        let pipeline_stack = composer.config.pipeline_stack_name.clone();
        let self_update = composer.deploy_action(SELF_UPDATE_ACTION, &pipeline_stack, BTreeMap::new());
        composer.append_stage(SELF_UPDATE_STAGE, vec![self_update])?;

        info!(
            pipeline = %composer.config.pipeline_name,
            pipeline_id = %composer.id,
            stages = composer.stages.stage_count(),
            "Constructed pipeline"
        );
        composer.events.try_emit(
            event_types::PIPELINE_CONSTRUCTED,
            Some(serde_json::json!({
                "pipeline": composer.config.pipeline_name,
                "pipeline_id": composer.id.to_string(),
            })),
        );
        Ok(composer)
    }

    /// Appends a stage deploying `service` with the service build output.
    ///
    /// # Errors
    ///
    /// Returns an error if `stage_name` is invalid or already used.
    pub fn add_service_stage<S>(&mut self, service: &S, stage_name: &str) -> Result<StageHandle>
    where
        S: ServiceDescriptor + ?Sized,
    {
        let location = self.artifacts.location(&self.service_build_output);
        let overrides = service.parameter_overrides(&location);
        let action = self
            .deploy_action(names::SERVICE_UPDATE_ACTION, service.stack_name(), overrides)
            .with_extra_input(self.service_build_output.clone());

        debug!(stage = %stage_name, stack = %service.stack_name(), "Adding service stage");
        self.append_stage(stage_name, vec![action])
    }

    /// Appends a deploy action for `billing` to an existing stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle belongs to another composer or the stage
    /// already deploys a billing stack.
    pub fn add_billing_stack_to_stage<B>(&mut self, billing: &B, stage: &StageHandle) -> Result<()>
    where
        B: StackDescriptor + ?Sized,
    {
        let action = self.deploy_action(names::BILLING_UPDATE_ACTION, billing.stack_name(), BTreeMap::new());
        debug!(stage = %stage.name(), stack = %billing.stack_name(), "Adding billing stack");
        self.append_action(stage, action)
    }

    /// Appends an integration test against `service_endpoint` to an existing
    /// stage, ordered after every deploy action already in that stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle belongs to another composer, the endpoint
    /// is blank, the stage already runs integration tests, or the stage already
    /// holds a deploy at the highest accepted run order.
    pub fn add_service_integration_test_to_stage(
        &mut self,
        stage: &StageHandle,
        service_endpoint: &str,
    ) -> Result<()> {
        require_non_blank("service_endpoint", service_endpoint)?;
        let latest_deploy = self
            .stages
            .stage(stage)?
            .max_run_order_of(ActionKind::Deploy)
            .unwrap_or(DEFAULT_RUN_ORDER);
        let run_order = latest_deploy
            .checked_add(1)
            .filter(|order| *order <= MAX_RUN_ORDER)
            .ok_or_else(|| {
                ConfigurationError::invalid_run_order(
                    stage.name(),
                    names::INTEGRATION_TEST_ACTION,
                    u64::from(latest_deploy) + 1,
                    MAX_RUN_ORDER,
                )
            })?;

        let project = BuildProjectConfig::new(
            format!("ServiceIntegrationTestsProject-{}", stage.name()),
            &self.config.build_image,
            &self.config.build_specs.integration_test,
        )
        .with_environment_variable(
            names::SERVICE_ENDPOINT_VARIABLE,
            EnvironmentVariable::plaintext(service_endpoint),
        );
        let action = Action::test(
            names::INTEGRATION_TEST_ACTION,
            project,
            self.service_source_output.clone(),
        )
        .with_run_order(run_order);

        debug!(stage = %stage.name(), run_order, "Adding integration tests");
        self.append_action(stage, action)
    }

    /// Appends an arbitrary stage.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid or duplicate names, unknown artifacts,
    /// artifacts consumed before they are produced, or produced twice.
    pub fn add_stage(&mut self, name: &str, actions: Vec<Action>) -> Result<StageHandle> {
        self.append_stage(name, actions)
    }

    /// Appends an arbitrary action to an existing stage.
    ///
    /// # Errors
    ///
    /// See [`add_stage`](Self::add_stage); additionally rejects foreign handles.
    pub fn add_action(&mut self, stage: &StageHandle, action: Action) -> Result<()> {
        self.append_action(stage, action)
    }

    /// Declares a new artifact for use by caller-built actions.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or already declared.
    pub fn declare_artifact(&mut self, name: &str) -> Result<ArtifactHandle> {
        Ok(self.artifacts.declare(name)?)
    }

    fn append_stage(&mut self, name: &str, actions: Vec<Action>) -> Result<StageHandle> {
        self.stages.check_stage(name, &actions)?;
        let mut new_outputs = HashSet::new();
        for action in &actions {
            self.check_artifacts(name, action, &mut new_outputs)?;
        }

        let producers = Self::producers(name, &actions);
        let action_count = actions.len();
        let handle = self.stages.add_stage(name, actions)?;
        for (artifact, producer) in producers {
            self.artifacts.record_producer(&artifact, producer)?;
        }

        self.events.try_emit(
            event_types::STAGE_ADDED,
            Some(serde_json::json!({
                "pipeline_id": self.id.to_string(),
                "stage": name,
                "position": handle.index(),
                "actions": action_count,
            })),
        );
        Ok(handle)
    }

    fn append_action(&mut self, stage: &StageHandle, action: Action) -> Result<()> {
        self.stages.check_action(stage, &action)?;
        self.check_artifacts(stage.name(), &action, &mut HashSet::new())?;

        let producers = Self::producers(stage.name(), std::slice::from_ref(&action));
        let action_name = action.name.clone();
        let run_order = action.run_order;
        self.stages.add_action(stage, action)?;
        for (artifact, producer) in producers {
            self.artifacts.record_producer(&artifact, producer)?;
        }

        self.events.try_emit(
            event_types::ACTION_ADDED,
            Some(serde_json::json!({
                "pipeline_id": self.id.to_string(),
                "stage": stage.name(),
                "action": action_name,
                "run_order": run_order,
            })),
        );
        Ok(())
    }

    /// Checks inputs are produced and outputs are fresh, without mutating.
    fn check_artifacts(
        &self,
        stage: &str,
        action: &Action,
        new_outputs: &mut HashSet<String>,
    ) -> Result<()> {
        let at = ProducerRef {
            stage: stage.to_string(),
            action: action.name.clone(),
        };
        for input in action.inputs() {
            self.artifacts.ensure_produced(input, &at)?;
        }
        for output in &action.outputs {
            let record = self.artifacts.record(output)?;
            if let Some(existing) = &record.producer {
                return Err(TopologyError::artifact_reproduced(output.name(), existing.to_string()).into());
            }
            if !new_outputs.insert(output.name().to_string()) {
                return Err(TopologyError::artifact_reproduced(output.name(), at.to_string()).into());
            }
        }
        Ok(())
    }

    fn producers(stage: &str, actions: &[Action]) -> Vec<(ArtifactHandle, ProducerRef)> {
        actions
            .iter()
            .flat_map(|action| {
                action.outputs.iter().map(move |output| {
                    (
                        output.clone(),
                        ProducerRef {
                            stage: stage.to_string(),
                            action: action.name.clone(),
                        },
                    )
                })
            })
            .collect()
    }

    fn deploy_action(
        &self,
        action_name: &str,
        stack_name: &str,
        parameter_overrides: BTreeMap<String, ParameterValue>,
    ) -> Action {
        let template_path = self
            .artifacts
            .resolve_path(&self.pipeline_build_output, format!("{stack_name}.template.json"));
        Action::deploy(
            action_name,
            StackDeployConfig {
                stack_name: stack_name.to_string(),
                template_path,
                admin_permissions: true,
                parameter_overrides,
            },
            self.pipeline_build_output.clone(),
        )
    }

    /// The id of this pipeline instance.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// The configuration the pipeline was built from.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The artifact registry.
    #[must_use]
    pub const fn artifacts(&self) -> &ArtifactRegistry {
        &self.artifacts
    }

    /// The templates built from the pipeline definition.
    #[must_use]
    pub const fn pipeline_build_output(&self) -> &ArtifactHandle {
        &self.pipeline_build_output
    }

    /// The built service bundle.
    #[must_use]
    pub const fn service_build_output(&self) -> &ArtifactHandle {
        &self.service_build_output
    }

    /// The service source bundle.
    #[must_use]
    pub const fn service_source_output(&self) -> &ArtifactHandle {
        &self.service_source_output
    }

    /// Resolves a handle issued by this composer.
    ///
    /// # Errors
    ///
    /// Returns an error if the handle belongs to another composer.
    pub fn stage(&self, handle: &StageHandle) -> Result<&Stage> {
        Ok(self.stages.stage(handle)?)
    }

    /// Looks up a stage by name.
    #[must_use]
    pub fn stage_by_name(&self, name: &str) -> Option<&Stage> {
        self.stages.stage_by_name(name)
    }

    /// Returns a handle for an existing stage.
    #[must_use]
    pub fn handle_for(&self, name: &str) -> Option<StageHandle> {
        self.stages.handle_for(name)
    }

    /// Stages in pipeline order.
    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        self.stages.stages()
    }

    /// Stage names in pipeline order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.stage_names()
    }

    /// Snapshot of the whole graph, ready for a synthesizer.
    #[must_use]
    pub fn graph(&self) -> PipelineGraph {
        PipelineGraph {
            settings: PipelineSettings {
                name: self.config.pipeline_name.clone(),
                cross_account_keys: self.config.cross_account_keys,
                restart_execution_on_update: self.config.restart_execution_on_update,
            },
            stages: self.stages.stages().to_vec(),
            artifacts: self.artifacts.records(),
        }
    }
}

fn source_config(repository: &SourceRepository, oauth_token: &SecretRef) -> GitHubSourceConfig {
    GitHubSourceConfig {
        owner: repository.owner.clone(),
        repo: repository.repo.clone(),
        branch: repository.branch.clone(),
        oauth_token: oauth_token.clone(),
    }
}
