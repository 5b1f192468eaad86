//! YAML manifest describing a pipeline and the environments it deploys to.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use deployflow::config::PipelineConfig;
use deployflow::events::EventSink;
use deployflow::pipeline::PipelineComposer;
use deployflow::render::InMemorySecretStore;
use deployflow::stacks::{BillingStack, ServiceStack};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub services: Vec<ServiceEntry>,
    #[serde(default)]
    pub billing: Option<BillingEntry>,
    /// Secret names known to exist. When present, every credential the
    /// pipeline references is checked against this list before rendering.
    #[serde(default)]
    pub secrets: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceEntry {
    pub stack_name: String,
    pub stage: String,
    #[serde(default)]
    pub integration_endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BillingEntry {
    #[serde(default = "default_billing_stack_name")]
    pub stack_name: String,
    pub amount: f64,
    pub email: String,
    #[serde(default)]
    pub attach_to: Vec<String>,
}

fn default_billing_stack_name() -> String {
    "BillingStack".to_string()
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid manifest: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest =
            serde_yaml::from_str(content).context("Failed to parse manifest YAML")?;
        Ok(manifest)
    }

    pub fn secret_store(&self) -> Option<InMemorySecretStore> {
        self.secrets
            .as_ref()
            .map(|names| InMemorySecretStore::new(names.iter().cloned()))
    }

    /// Builds the pipeline: service stages in listed order, then billing
    /// attachments, then integration tests so they run after every deploy.
    pub fn assemble(&self, events: Arc<dyn EventSink>) -> Result<PipelineComposer> {
        let mut composer = PipelineComposer::construct_with_sink(self.pipeline.clone(), events)
            .context("Failed to construct pipeline")?;

        for service in &self.services {
            let stack = ServiceStack::new(&service.stack_name, &service.stage);
            composer
                .add_service_stage(&stack, &service.stage)
                .with_context(|| format!("Failed to add service stage '{}'", service.stage))?;
        }

        if let Some(billing) = &self.billing {
            let stack = BillingStack::create(billing.amount, &billing.email)
                .context("Invalid billing configuration")?
                .with_stack_name(&billing.stack_name);
            for stage in &billing.attach_to {
                let handle = composer
                    .handle_for(stage)
                    .ok_or_else(|| anyhow!("Billing is attached to unknown stage '{stage}'"))?;
                composer
                    .add_billing_stack_to_stage(&stack, &handle)
                    .with_context(|| format!("Failed to attach billing to '{stage}'"))?;
            }
        }

        for service in &self.services {
            let Some(endpoint) = &service.integration_endpoint else {
                continue;
            };
            let handle = composer
                .handle_for(&service.stage)
                .ok_or_else(|| anyhow!("Stage '{}' disappeared", service.stage))?;
            composer
                .add_service_integration_test_to_stage(&handle, endpoint)
                .with_context(|| format!("Failed to add integration tests to '{}'", service.stage))?;
        }

        info!(
            pipeline = %self.pipeline.pipeline_name,
            stages = composer.stages().len(),
            "Assembled pipeline"
        );
        Ok(composer)
    }
}
