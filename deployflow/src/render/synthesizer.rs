//! Graph synthesis.

use super::{RenderedTemplate, SecretStore};
use crate::core::{Action, ActionConfig, ArtifactHandle, BuildProjectConfig, ParameterValue};
use crate::errors::{codes, ConfigurationError, DeployflowError, Result, TopologyError};
use crate::events::{event_types, EventSink, NoOpEventSink};
use crate::observability::SpanTimer;
use crate::pipeline::PipelineGraph;
use crate::utils::iso_timestamp;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns a composed pipeline graph into a deployment template.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Renders the whole graph.
    async fn synthesize(&self, graph: &PipelineGraph) -> Result<RenderedTemplate>;
}

/// Checks the graph as a whole: unique stage and action names, every
/// artifact produced exactly once and only consumed in later stages.
///
/// # Errors
///
/// Returns the first violation found, in pipeline order.
pub fn validate_graph(graph: &PipelineGraph) -> Result<()> {
    let mut stage_names = HashSet::new();
    let mut produced: HashMap<&str, String> = HashMap::new();

    for stage in &graph.stages {
        if !stage_names.insert(stage.name()) {
            return Err(ConfigurationError::duplicate_stage(stage.name()).into());
        }

        let mut action_names = HashSet::new();
        for action in stage.actions() {
            if !action_names.insert(action.name.as_str()) {
                return Err(ConfigurationError::duplicate_action(stage.name(), &action.name).into());
            }
            let at = format!("{}/{}", stage.name(), action.name);
            for input in action.inputs() {
                if !produced.contains_key(input.name()) {
                    return Err(TopologyError::artifact_not_produced(input.name(), at).into());
                }
            }
        }

        // Outputs become visible to later stages only.
        for action in stage.actions() {
            let at = format!("{}/{}", stage.name(), action.name);
            for output in &action.outputs {
                if let Some(existing) = produced.get(output.name()) {
                    return Err(TopologyError::artifact_reproduced(output.name(), existing.clone()).into());
                }
                produced.insert(output.name(), at.clone());
            }
        }
    }
    Ok(())
}

/// Renders a pipeline resource document, plus one build project resource per
/// build or test action.
pub struct JsonSynthesizer {
    secrets: Option<Arc<dyn SecretStore + Send + Sync>>,
    events: Arc<dyn EventSink>,
}

impl fmt::Debug for JsonSynthesizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSynthesizer")
            .field("checks_secrets", &self.secrets.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for JsonSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonSynthesizer {
    /// Creates a synthesizer that does not check credentials.
    #[must_use]
    pub fn new() -> Self {
        Self {
            secrets: None,
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Verifies every referenced credential against `store` before rendering.
    #[must_use]
    pub fn with_secret_store(mut self, store: Arc<dyn SecretStore + Send + Sync>) -> Self {
        self.secrets = Some(store);
        self
    }

    /// Reports render outcomes to `events`.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    fn check_secrets(&self, graph: &PipelineGraph) -> Result<()> {
        let Some(store) = &self.secrets else {
            return Ok(());
        };
        let names: BTreeSet<&str> = graph
            .actions()
            .filter_map(|(_, action)| match &action.config {
                ActionConfig::GitHubSource(source) => Some(source.oauth_token.name.as_str()),
                _ => None,
            })
            .collect();
        for name in names {
            let found = store.contains(name).map_err(|reason| {
                DeployflowError::Collaborator(format!(
                    "Secret store lookup for '{name}' failed: {reason}"
                ))
            })?;
            if !found {
                return Err(ConfigurationError::new(
                    codes::MISSING_CREDENTIAL,
                    format!("Credential '{name}' was not found in the secret store"),
                )
                .into());
            }
        }
        Ok(())
    }

    /// Renders the graph without emitting events.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph is invalid, a credential is missing, the
    /// secret store cannot be queried, or two build projects clash.
    pub fn render(&self, graph: &PipelineGraph) -> Result<RenderedTemplate> {
        validate_graph(graph)?;
        self.check_secrets(graph)?;

        let mut resources = project_resources(graph)?;
        let stages: Vec<Value> = graph
            .stages
            .iter()
            .map(|stage| {
                let actions: Vec<Value> = stage.actions().iter().map(render_action).collect();
                json!({"Name": stage.name(), "Actions": actions})
            })
            .collect();

        resources.insert(
            PIPELINE_RESOURCE.to_string(),
            json!({
                "Type": "AWS::CodePipeline::Pipeline",
                "Properties": {
                    "Name": graph.settings.name,
                    "RestartExecutionOnUpdate": graph.settings.restart_execution_on_update,
                    "Stages": stages,
                },
            }),
        );

        let body = json!({
            "Metadata": {"CrossAccountKeys": graph.settings.cross_account_keys},
            "Resources": resources,
        });
        debug!(pipeline = %graph.settings.name, resources = resources_len(&body), "Rendered graph");
        Ok(RenderedTemplate {
            body,
            rendered_at: iso_timestamp(),
        })
    }
}

const PIPELINE_RESOURCE: &str = "Pipeline";

/// Resource ids are alphanumeric only.
fn logical_id(name: &str) -> String {
    name.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// First 8 hex digits of the SHA-256 of `name`.
fn short_hash(name: &str) -> String {
    hex::encode(&Sha256::digest(name.as_bytes())[..4])
}

/// One resource per distinct build project. Names that lose their
/// punctuation to the same id, or to the pipeline's id, get a hash suffix.
fn project_resources(graph: &PipelineGraph) -> Result<Map<String, Value>> {
    let mut resources = Map::new();
    let mut seen: HashMap<&str, &BuildProjectConfig> = HashMap::new();

    for (_, action) in graph.actions() {
        let ActionConfig::CodeBuild(project) = &action.config else {
            continue;
        };
        if let Some(existing) = seen.get(project.project_name.as_str()) {
            if *existing != project {
                return Err(ConfigurationError::duplicate_project(&project.project_name).into());
            }
            continue;
        }

        let mut id = logical_id(&project.project_name);
        if id.is_empty() || id == PIPELINE_RESOURCE || resources.contains_key(&id) {
            id.push_str(&short_hash(&project.project_name));
        }
        if resources.contains_key(&id) {
            return Err(ConfigurationError::duplicate_project(&project.project_name).into());
        }

        seen.insert(&project.project_name, project);
        resources.insert(
            id,
            json!({
                "Type": "AWS::CodeBuild::Project",
                "Properties": {
                    "Name": project.project_name,
                    "Environment": {"Image": project.build_image},
                    "Source": {"Type": "CODEPIPELINE", "BuildSpec": project.build_spec},
                },
            }),
        );
    }
    Ok(resources)
}

fn resources_len(body: &Value) -> usize {
    body["Resources"].as_object().map_or(0, Map::len)
}

#[async_trait]
impl Synthesizer for JsonSynthesizer {
    async fn synthesize(&self, graph: &PipelineGraph) -> Result<RenderedTemplate> {
        let timer = SpanTimer::start("render");
        let outcome = self.render(graph);
        let duration_ms = timer.finish();
        match outcome {
            Ok(template) => {
                info!(pipeline = %graph.settings.name, duration_ms, "Synthesized template");
                self.events
                    .emit(
                        event_types::TEMPLATE_RENDERED,
                        Some(json!({
                            "pipeline": graph.settings.name,
                            "fingerprint": template.fingerprint(),
                            "duration_ms": duration_ms,
                        })),
                    )
                    .await;
                Ok(template)
            }
            Err(err) => {
                warn!(pipeline = %graph.settings.name, error = %err, "Render failed");
                self.events
                    .emit(
                        event_types::TEMPLATE_FAILED,
                        Some(json!({
                            "pipeline": graph.settings.name,
                            "code": err.code(),
                            "error": err.to_string(),
                        })),
                    )
                    .await;
                Err(err)
            }
        }
    }
}

fn artifact_list<'a>(handles: impl Iterator<Item = &'a ArtifactHandle>) -> Vec<Value> {
    handles.map(|h| json!({"Name": h.name()})).collect()
}

fn render_parameter(value: &ParameterValue) -> Value {
    match value {
        ParameterValue::Literal { value } => json!(value),
        ParameterValue::ArtifactAttribute { artifact, attribute } => {
            json!({"Fn::GetArtifactAtt": [artifact, attribute.to_string()]})
        }
    }
}

fn render_action(action: &Action) -> Value {
    let (owner, provider, configuration) = match &action.config {
        ActionConfig::GitHubSource(source) => (
            "ThirdParty",
            "GitHub",
            json!({
                "Owner": source.owner,
                "Repo": source.repo,
                "Branch": source.branch,
                "OAuthToken": source.oauth_token.dynamic_reference(),
                "PollForSourceChanges": false,
            }),
        ),
        ActionConfig::CodeBuild(project) => {
            let mut configuration = json!({"ProjectName": project.project_name});
            if !project.environment_variables.is_empty() {
                let variables: Vec<Value> = project
                    .environment_variables
                    .iter()
                    .map(|(name, var)| {
                        json!({"name": name, "type": var.variable_type.to_string(), "value": var.value})
                    })
                    .collect();
                configuration["EnvironmentVariables"] = json!(Value::Array(variables).to_string());
            }
            ("AWS", "CodeBuild", configuration)
        }
        ActionConfig::StackDeploy(deploy) => {
            let mut configuration = json!({
                "ActionMode": "CREATE_UPDATE",
                "StackName": deploy.stack_name,
                "TemplatePath": deploy.template_path.to_string(),
            });
            if deploy.admin_permissions {
                configuration["Capabilities"] = json!("CAPABILITY_NAMED_IAM,CAPABILITY_AUTO_EXPAND");
            }
            if !deploy.parameter_overrides.is_empty() {
                let overrides: BTreeMap<&str, Value> = deploy
                    .parameter_overrides
                    .iter()
                    .map(|(name, value)| (name.as_str(), render_parameter(value)))
                    .collect();
                configuration["ParameterOverrides"] = json!(json!(overrides).to_string());
            }
            ("AWS", "CloudFormation", configuration)
        }
    };

    json!({
        "Name": action.name,
        "ActionTypeId": {
            "Category": action.kind.category(),
            "Owner": owner,
            "Provider": provider,
            "Version": "1",
        },
        "Configuration": configuration,
        "InputArtifacts": artifact_list(action.inputs()),
        "OutputArtifacts": artifact_list(action.outputs.iter()),
        "RunOrder": action.run_order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CollectingEventSink;
    use crate::render::{InMemorySecretStore, MockSecretStore};
    use crate::stacks::BillingStack;
    use crate::testing::{sample_composer, StaticService};
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    fn composed_graph() -> PipelineGraph {
        let mut composer = sample_composer();
        let handle = composer
            .add_service_stage(&StaticService::new("ServiceStackTest"), "Test")
            .unwrap();
        let billing = BillingStack::create(5.0, "a@b.com").unwrap();
        composer.add_billing_stack_to_stage(&billing, &handle).unwrap();
        composer
            .add_service_integration_test_to_stage(&handle, "https://api.example.com")
            .unwrap();
        composer.graph()
    }

    #[test]
    fn test_render_pipeline_stages() {
        let template = JsonSynthesizer::new().render(&composed_graph()).unwrap();
        let stages = template.body["Resources"]["Pipeline"]["Properties"]["Stages"]
            .as_array()
            .unwrap();

        let names: Vec<&str> = stages.iter().map(|s| s["Name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Source", "Build", "Pipeline_Update", "Test"]);

        let test_actions = stages[3]["Actions"].as_array().unwrap();
        assert_eq!(test_actions.len(), 3);
        assert_eq!(test_actions[1]["Name"], "Billing_Update");
        assert_eq!(test_actions[2]["RunOrder"], 2);
        assert_eq!(test_actions[2]["ActionTypeId"]["Category"], "Test");
    }

    #[test]
    fn test_render_source_uses_dynamic_reference() {
        let template = JsonSynthesizer::new().render(&composed_graph()).unwrap();
        let source = &template.body["Resources"]["Pipeline"]["Properties"]["Stages"][0]["Actions"][0];

        assert_eq!(
            source["Configuration"]["OAuthToken"],
            "{{resolve:secretsmanager:github-pipeline-pat:SecretString:::}}"
        );
        assert_eq!(source["OutputArtifacts"][0]["Name"], "CDKSourceOutput");
    }

    #[test]
    fn test_render_parameter_overrides() {
        let template = JsonSynthesizer::new().render(&composed_graph()).unwrap();
        let deploy = &template.body["Resources"]["Pipeline"]["Properties"]["Stages"][3]["Actions"][0];

        let overrides: Value =
            serde_json::from_str(deploy["Configuration"]["ParameterOverrides"].as_str().unwrap())
                .unwrap();
        assert_eq!(
            overrides["CodeLocation"],
            json!({"Fn::GetArtifactAtt": ["ServiceBuildOutput", "ObjectKey"]})
        );
        assert_eq!(deploy["InputArtifacts"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_render_build_projects() {
        let template = JsonSynthesizer::new().render(&composed_graph()).unwrap();
        let resources = template.body["Resources"].as_object().unwrap();

        assert!(resources.contains_key("CdkBuildProject"));
        assert!(resources.contains_key("ServiceBuildProject"));
        assert!(resources.contains_key("ServiceIntegrationTestsProjectTest"));
        assert_eq!(
            resources["CdkBuildProject"]["Properties"]["Environment"]["Image"],
            "aws/codebuild/standard:5.0"
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let graph = composed_graph();
        let synth = JsonSynthesizer::new();
        assert_eq!(
            synth.render(&graph).unwrap().fingerprint(),
            synth.render(&graph).unwrap().fingerprint()
        );
    }

    #[test]
    fn test_validate_rejects_duplicate_stage() {
        let mut graph = composed_graph();
        let copy = graph.stages[3].clone();
        graph.stages.push(copy);

        let err = validate_graph(&graph).unwrap_err();
        assert_eq!(err.code(), Some(codes::DUPLICATE_STAGE));
    }

    #[test]
    fn test_validate_rejects_consumption_before_production() {
        let mut graph = composed_graph();
        graph.stages.swap(0, 1);

        let err = validate_graph(&graph).unwrap_err();
        assert_eq!(err.code(), Some(codes::ARTIFACT_NOT_PRODUCED));
    }

    #[test]
    fn test_missing_credential() {
        let store = Arc::new(InMemorySecretStore::new(["something-else"]));
        let err = JsonSynthesizer::new()
            .with_secret_store(store)
            .render(&composed_graph())
            .unwrap_err();
        assert_eq!(err.code(), Some(codes::MISSING_CREDENTIAL));
    }

    #[test]
    fn test_secret_looked_up_once_per_name() {
        let mut store = MockSecretStore::new();
        store
            .expect_contains()
            .with(eq("github-pipeline-pat"))
            .times(1)
            .returning(|_| Ok(true));

        let template = JsonSynthesizer::new()
            .with_secret_store(Arc::new(store))
            .render(&composed_graph());
        assert!(template.is_ok());
    }

    #[test]
    fn test_secret_store_failure_is_collaborator_error() {
        let mut store = MockSecretStore::new();
        store
            .expect_contains()
            .returning(|_| Err("connection refused".to_string()));

        let err = JsonSynthesizer::new()
            .with_secret_store(Arc::new(store))
            .render(&composed_graph())
            .unwrap_err();
        assert!(matches!(err, DeployflowError::Collaborator(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    fn project_ids(template: &RenderedTemplate) -> Vec<(String, String)> {
        template.body["Resources"]
            .as_object()
            .unwrap()
            .iter()
            .filter(|(_, r)| r["Type"] == "AWS::CodeBuild::Project")
            .map(|(id, r)| (id.clone(), r["Properties"]["Name"].as_str().unwrap().to_string()))
            .collect()
    }

    #[test]
    fn test_similar_stage_names_keep_both_projects() {
        let mut composer = sample_composer();
        for (stage, stack) in [("Test-1", "ServiceStackA"), ("Test_1", "ServiceStackB")] {
            let handle = composer
                .add_service_stage(&StaticService::new(stack), stage)
                .unwrap();
            composer
                .add_service_integration_test_to_stage(&handle, "https://api.example.com")
                .unwrap();
        }

        let template = JsonSynthesizer::new().render(&composer.graph()).unwrap();
        let projects = project_ids(&template);
        assert_eq!(projects.len(), 4);

        let names: Vec<&str> = projects.iter().map(|(_, name)| name.as_str()).collect();
        assert!(names.contains(&"ServiceIntegrationTestsProject-Test-1"));
        assert!(names.contains(&"ServiceIntegrationTestsProject-Test_1"));

        let suffixed = format!(
            "ServiceIntegrationTestsProjectTest1{}",
            short_hash("ServiceIntegrationTestsProject-Test_1")
        );
        assert!(projects.iter().any(|(id, _)| *id == suffixed));
    }

    #[test]
    fn test_project_named_like_pipeline_resource() {
        let mut composer = sample_composer();
        let input = composer.service_source_output().clone();
        let project = BuildProjectConfig::new("Pipeline", "image", "lint.yml");
        composer
            .add_stage("Lint", vec![Action::build("Lint", project, input)])
            .unwrap();

        let template = JsonSynthesizer::new().render(&composer.graph()).unwrap();
        let resources = &template.body["Resources"];
        assert_eq!(resources["Pipeline"]["Type"], "AWS::CodePipeline::Pipeline");
        let id = format!("Pipeline{}", short_hash("Pipeline"));
        assert_eq!(resources[id.as_str()]["Properties"]["Name"], "Pipeline");
    }

    #[test]
    fn test_conflicting_project_definitions() {
        let mut composer = sample_composer();
        let input = composer.service_source_output().clone();
        let first = BuildProjectConfig::new("Lint", "image", "lint.yml");
        let second = BuildProjectConfig::new("Lint", "image", "other.yml");
        composer
            .add_stage("Lint", vec![Action::build("Lint", first, input.clone())])
            .unwrap();
        composer
            .add_stage("LintAgain", vec![Action::build("Lint", second, input)])
            .unwrap();

        let err = JsonSynthesizer::new().render(&composer.graph()).unwrap_err();
        assert_eq!(err.code(), Some(codes::DUPLICATE_PROJECT));
    }

    #[tokio::test]
    async fn test_synthesize_emits_events() {
        let sink = Arc::new(CollectingEventSink::new());
        let synth = JsonSynthesizer::new().with_event_sink(sink.clone());

        synth.synthesize(&composed_graph()).await.unwrap();
        let rendered = sink.events_of_type(event_types::TEMPLATE_RENDERED);
        assert_eq!(rendered.len(), 1);

        let mut broken = composed_graph();
        broken.stages.remove(0);
        assert!(synth.synthesize(&broken).await.is_err());
        let failed = sink.events_of_type(event_types::TEMPLATE_FAILED);
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].data["code"], codes::ARTIFACT_NOT_PRODUCED);
    }
}
