//! Tests for the pipeline composer.

#[cfg(test)]
mod tests {
    use crate::core::{ActionKind, ArtifactAttribute, ParameterValue, MAX_RUN_ORDER};
    use crate::errors::codes;
    use crate::events::{event_types, CollectingEventSink};
    use crate::pipeline::{names, PipelineComposer};
    use crate::render::validate_graph;
    use crate::stacks::{BillingStack, ServiceStack};
    use crate::testing::{
        assert_action_names, assert_run_orders, assert_stage_order, sample_composer,
        sample_config, StaticService,
    };
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn test_construct_fixed_topology() {
        let composer = sample_composer();
        let graph = composer.graph();

        assert_stage_order(&graph, &["Source", "Build", "Pipeline_Update"]);
        assert_eq!(graph.settings.name, "Pipeline");
        assert!(!graph.settings.cross_account_keys);
        assert!(graph.settings.restart_execution_on_update);
    }

    #[test]
    fn test_source_stage_has_two_distinct_outputs() {
        let composer = sample_composer();
        let source = composer.stage_by_name(names::SOURCE_STAGE).unwrap();

        assert_action_names(source, &["Pipeline_Source", "Service_Source"]);
        let outputs: Vec<&str> = source
            .actions()
            .iter()
            .map(|a| {
                assert_eq!(a.kind, ActionKind::Source);
                assert_eq!(a.outputs.len(), 1);
                a.outputs[0].name()
            })
            .collect();
        assert_eq!(outputs, vec!["CDKSourceOutput", "ServiceSourceOutput"]);
    }

    #[test]
    fn test_build_stage_threads_source_artifacts() {
        let composer = sample_composer();
        let build = composer.stage_by_name(names::BUILD_STAGE).unwrap();

        assert_action_names(build, &["CDK_Build", "Service_Build"]);
        let cdk = build.action("CDK_Build").unwrap();
        assert_eq!(cdk.input.as_ref().unwrap().name(), "CDKSourceOutput");
        assert_eq!(cdk.outputs[0].name(), "CdkBuildOutput");
        assert_eq!(
            cdk.build_config().unwrap().build_spec,
            "build-specs/cdk-build-spec.yml"
        );

        let service = build.action("Service_Build").unwrap();
        assert_eq!(service.input.as_ref().unwrap().name(), "ServiceSourceOutput");
        assert_eq!(service.outputs[0].name(), "ServiceBuildOutput");
        assert_run_orders(build, &[1, 1]);
    }

    #[test]
    fn test_self_update_deploys_pipeline_stack() {
        let composer = sample_composer();
        let stage = composer.stage_by_name(names::SELF_UPDATE_STAGE).unwrap();

        assert_action_names(stage, &["Pipeline_Update"]);
        let deploy = stage.actions()[0].deploy_config().unwrap();
        assert_eq!(deploy.stack_name, "PipelineStack");
        assert_eq!(
            deploy.template_path.to_string(),
            "CdkBuildOutput::PipelineStack.template.json"
        );
        assert!(deploy.admin_permissions);
    }

    #[test]
    fn test_every_artifact_produced_once() {
        let composer = sample_composer();
        let records = composer.artifacts().records();

        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.producer.is_some()));
        let producer = records[3].producer.as_ref().unwrap();
        assert_eq!(producer.to_string(), "Build/Service_Build");
    }

    #[test]
    fn test_add_service_stage() {
        let mut composer = sample_composer();
        let service = ServiceStack::new("ServiceStackTest", "Test");

        let handle = composer.add_service_stage(&service, "Test").unwrap();
        assert_eq!(handle.name(), "Test");
        assert_eq!(handle.index(), 3);

        let stage = composer.stage(&handle).unwrap();
        assert_action_names(stage, &["Service_Update"]);
        let action = &stage.actions()[0];
        assert_eq!(action.kind, ActionKind::Deploy);
        assert!(action.consumes(composer.service_build_output()));

        let deploy = action.deploy_config().unwrap();
        assert_eq!(deploy.stack_name, "ServiceStackTest");
        assert_eq!(
            deploy.template_path.to_string(),
            "CdkBuildOutput::ServiceStackTest.template.json"
        );
        assert_eq!(
            deploy.parameter_overrides.get("ServiceCodeBucketName"),
            Some(&ParameterValue::ArtifactAttribute {
                artifact: "ServiceBuildOutput".to_string(),
                attribute: ArtifactAttribute::BucketName,
            })
        );
    }

    #[test]
    fn test_duplicate_service_stage_fails() {
        let mut composer = sample_composer();
        let service = StaticService::new("Svc");

        composer.add_service_stage(&service, "Test").unwrap();
        let err = composer.add_service_stage(&service, "Test").unwrap_err();

        assert_eq!(err.code(), Some(codes::DUPLICATE_STAGE));
        assert_eq!(composer.stages().len(), 4);
    }

    #[test]
    fn test_service_stage_cannot_reuse_fixed_names() {
        let mut composer = sample_composer();
        let err = composer
            .add_service_stage(&StaticService::new("Svc"), "Build")
            .unwrap_err();
        assert_eq!(err.code(), Some(codes::DUPLICATE_STAGE));
    }

    #[test]
    fn test_literal_overrides_are_threaded() {
        let mut composer = sample_composer();
        let service = StaticService::new("Svc").with_literal("Stage", "prod");
        let handle = composer.add_service_stage(&service, "Prod").unwrap();

        let deploy = composer.stage(&handle).unwrap().actions()[0]
            .deploy_config()
            .unwrap()
            .clone();
        assert_eq!(
            deploy.parameter_overrides.get("Stage"),
            Some(&ParameterValue::literal("prod"))
        );
        assert!(deploy.parameter_overrides.contains_key("CodeLocation"));
    }

    #[test]
    fn test_billing_attachment_only_touches_target_stage() {
        let mut composer = sample_composer();
        let test = composer.add_service_stage(&StaticService::new("SvcTest"), "Test").unwrap();
        let prod = composer.add_service_stage(&StaticService::new("SvcProd"), "Prod").unwrap();
        let before = composer.graph();

        let billing = BillingStack::create(5.0, "a@b.com").unwrap();
        composer.add_billing_stack_to_stage(&billing, &test).unwrap();
        let after = composer.graph();

        assert_action_names(composer.stage(&test).unwrap(), &["Service_Update", "Billing_Update"]);
        assert_eq!(composer.stage(&prod).unwrap(), before.stage("Prod").unwrap());
        assert_eq!(after.action_count(), before.action_count() + 1);
        for name in ["Source", "Build", "Pipeline_Update", "Prod"] {
            assert_eq!(after.stage(name), before.stage(name));
        }

        let deploy = composer.stage(&test).unwrap().actions()[1].deploy_config().unwrap().clone();
        assert_eq!(deploy.stack_name, "BillingStack");
        assert!(deploy.parameter_overrides.is_empty());
    }

    #[test]
    fn test_billing_twice_in_same_stage_fails() {
        let mut composer = sample_composer();
        let handle = composer.add_service_stage(&StaticService::new("Svc"), "Test").unwrap();
        let billing = BillingStack::create(5.0, "a@b.com").unwrap();

        composer.add_billing_stack_to_stage(&billing, &handle).unwrap();
        let err = composer.add_billing_stack_to_stage(&billing, &handle).unwrap_err();
        assert_eq!(err.code(), Some(codes::DUPLICATE_ACTION));
    }

    #[test]
    fn test_integration_test_runs_after_deploys() {
        let mut composer = sample_composer();
        let handle = composer.add_service_stage(&StaticService::new("Svc"), "Test").unwrap();

        composer
            .add_service_integration_test_to_stage(&handle, "https://api.example.com")
            .unwrap();

        let stage = composer.stage(&handle).unwrap();
        assert_action_names(stage, &["Service_Update", "Integration_Tests"]);
        assert_run_orders(stage, &[1, 2]);

        let test = stage.action("Integration_Tests").unwrap();
        assert_eq!(test.kind, ActionKind::Test);
        assert!(test.consumes(composer.service_source_output()));
        let project = test.build_config().unwrap();
        assert_eq!(project.build_spec, "build-specs/integ-test-build-spec.yml");
        assert_eq!(
            project.environment_variables.get("SERVICE_ENDPOINT").unwrap().value,
            "https://api.example.com"
        );
    }

    #[test]
    fn test_integration_test_order_tracks_latest_deploy() {
        let mut composer = sample_composer();
        let handle = composer.add_service_stage(&StaticService::new("Svc"), "Test").unwrap();
        let mut late_deploy = composer.stage(&handle).unwrap().actions()[0]
            .clone()
            .with_run_order(4);
        late_deploy.name = "Late_Update".to_string();
        composer.add_action(&handle, late_deploy).unwrap();

        composer
            .add_service_integration_test_to_stage(&handle, "https://api.example.com")
            .unwrap();

        let stage = composer.stage(&handle).unwrap();
        assert_run_orders(stage, &[1, 4, 5]);
        let waves = stage.execution_waves();
        assert_eq!(waves.last().unwrap().1[0].name, "Integration_Tests");
    }

    #[test]
    fn test_integration_test_rejects_blank_endpoint() {
        let mut composer = sample_composer();
        let handle = composer.add_service_stage(&StaticService::new("Svc"), "Test").unwrap();

        let err = composer
            .add_service_integration_test_to_stage(&handle, " ")
            .unwrap_err();
        assert_eq!(err.code(), Some(codes::MISSING_VALUE));
        assert_eq!(composer.stage(&handle).unwrap().actions().len(), 1);
    }

    #[test]
    fn test_foreign_handles_rejected() {
        let mut first = sample_composer();
        let mut second = sample_composer();
        let foreign = first.add_service_stage(&StaticService::new("Svc"), "Test").unwrap();
        second.add_service_stage(&StaticService::new("Svc"), "Test").unwrap();

        let billing = BillingStack::create(5.0, "a@b.com").unwrap();
        let err = second.add_billing_stack_to_stage(&billing, &foreign).unwrap_err();
        assert_eq!(err.code(), Some(codes::FOREIGN_HANDLE));

        let err = second
            .add_service_integration_test_to_stage(&foreign, "https://x")
            .unwrap_err();
        assert_eq!(err.code(), Some(codes::FOREIGN_HANDLE));

        assert_eq!(second.stage_by_name("Test").unwrap().actions().len(), 1);
    }

    #[test]
    fn test_handles_issued_for_fixed_stages() {
        let mut composer = sample_composer();
        let build = composer.handle_for("Build").unwrap();
        let billing = BillingStack::create(1.0, "ops@example.com").unwrap();

        composer.add_billing_stack_to_stage(&billing, &build).unwrap();
        assert_action_names(
            composer.stage(&build).unwrap(),
            &["CDK_Build", "Service_Build", "Billing_Update"],
        );
    }

    #[test]
    fn test_custom_stage_with_new_artifact() {
        let mut composer = sample_composer();
        let report = composer.declare_artifact("ReportOutput").unwrap();
        let input = composer.service_source_output().clone();
        let project = crate::core::BuildProjectConfig::new("Lint", "image", "lint.yml");
        let action = crate::core::Action::build("Lint", project, input).with_output(report.clone());

        composer.add_stage("Lint", vec![action.clone()]).unwrap();
        let record = composer.artifacts().record(&report).unwrap();
        assert_eq!(record.producer.as_ref().unwrap().to_string(), "Lint/Lint");

        let mut again = action;
        again.name = "LintAgain".to_string();
        let err = composer.add_stage("LintAgain", vec![again]).unwrap_err();
        assert_eq!(err.code(), Some(codes::ARTIFACT_REPRODUCED));
        assert!(composer.stage_by_name("LintAgain").is_none());
    }

    #[test]
    fn test_consuming_unproduced_artifact_fails() {
        let mut composer = sample_composer();
        let pending = composer.declare_artifact("Pending").unwrap();
        let project = crate::core::BuildProjectConfig::new("Use", "image", "use.yml");
        let action = crate::core::Action::build("Use", project, pending);

        let err = composer.add_stage("Use", vec![action]).unwrap_err();
        assert_eq!(err.code(), Some(codes::ARTIFACT_NOT_PRODUCED));
        assert_eq!(composer.stages().len(), 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = sample_config();
        config.pipeline_source.repo = String::new();
        let err = PipelineComposer::construct(config).unwrap_err();
        assert_eq!(err.code(), Some(codes::MISSING_VALUE));
    }

    #[test]
    fn test_events_emitted() {
        let sink = Arc::new(CollectingEventSink::new());
        let mut composer =
            PipelineComposer::construct_with_sink(sample_config(), sink.clone()).unwrap();
        let handle = composer.add_service_stage(&StaticService::new("Svc"), "Test").unwrap();
        composer
            .add_service_integration_test_to_stage(&handle, "https://x")
            .unwrap();

        assert_eq!(sink.events_of_type(event_types::STAGE_ADDED).len(), 4);
        assert_eq!(sink.events_of_type(event_types::PIPELINE_CONSTRUCTED).len(), 1);
        let added = sink.events_of_type(event_types::ACTION_ADDED);
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].field("run_order"), Some(&serde_json::json!(2)));
    }

    fn extra_deploy(composer: &PipelineComposer, name: &str, run_order: u32) -> crate::core::Action {
        let template = composer.pipeline_build_output().clone();
        let config = crate::core::StackDeployConfig {
            stack_name: format!("{name}Stack"),
            template_path: composer
                .artifacts()
                .resolve_path(&template, format!("{name}Stack.template.json")),
            admin_permissions: true,
            parameter_overrides: std::collections::BTreeMap::new(),
        };
        crate::core::Action::deploy(name, config, template).with_run_order(run_order)
    }

    #[test]
    fn test_run_order_out_of_range_rejected() {
        let mut composer = sample_composer();
        let handle = composer.add_service_stage(&StaticService::new("Svc"), "Test").unwrap();

        let overflow = extra_deploy(&composer, "Overflow", u32::MAX);
        let err = composer.add_action(&handle, overflow).unwrap_err();
        assert_eq!(err.code(), Some(codes::INVALID_RUN_ORDER));
        assert_eq!(composer.stage(&handle).unwrap().actions().len(), 1);
    }

    #[test]
    fn test_integration_test_after_last_run_order_fails() {
        let mut composer = sample_composer();
        let handle = composer.add_service_stage(&StaticService::new("Svc"), "Test").unwrap();
        let late = extra_deploy(&composer, "Late", MAX_RUN_ORDER);
        composer.add_action(&handle, late).unwrap();

        let err = composer
            .add_service_integration_test_to_stage(&handle, "https://x")
            .unwrap_err();
        assert_eq!(err.code(), Some(codes::INVALID_RUN_ORDER));
        assert_action_names(composer.stage(&handle).unwrap(), &["Service_Update", "Late"]);
    }

    #[test]
    fn test_consuming_artifact_in_producing_stage_fails() {
        let mut composer = sample_composer();
        let build = composer.handle_for(names::BUILD_STAGE).unwrap();
        let project = crate::core::BuildProjectConfig::new("Check", "image", "check.yml");
        let check = crate::core::Action::test("Check", project, composer.pipeline_build_output().clone())
            .with_run_order(2);

        let err = composer.add_action(&build, check.clone()).unwrap_err();
        assert_eq!(err.code(), Some(codes::ARTIFACT_NOT_PRODUCED));
        assert!(validate_graph(&composer.graph()).is_ok());

        composer.add_stage("Verify", vec![check]).unwrap();
        assert!(validate_graph(&composer.graph()).is_ok());
    }
}
