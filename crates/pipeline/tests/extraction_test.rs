use dataexport_core::{ExportError, RunConfig};
use dataexport_pipeline::test_utils::mocks::MockProcessRunner;
use dataexport_pipeline::ExtractionJobDriver;

fn test_config() -> RunConfig {
    RunConfig {
        identifier: "run-1".to_string(),
        job_flow_name: "acceptance-flow".to_string(),
        tasks_repo: "https://example.com/analytics-tasks.git".to_string(),
        tasks_branch: "release".to_string(),
        tasks_log_path: "/var/log/tasks".to_string(),
        connection_user: "hadoop".to_string(),
        tasks_output_url: "s3://task-output/exports".to_string(),
        credentials_file_url: "s3://secrets/credentials.json".to_string(),
        exporter_output_bucket: "acceptance-exports".to_string(),
        ..RunConfig::default()
    }
}

#[test]
fn test_command_arguments() {
    let config = test_config();
    let runner = MockProcessRunner::new();
    let driver = ExtractionJobDriver::new(&runner, &config);

    let command = driver.command();
    assert_eq!(command.program, "remote-task");
    assert_eq!(
        command.args,
        vec![
            "--job-flow-name",
            "acceptance-flow",
            "--branch",
            "release",
            "--repo",
            "https://example.com/analytics-tasks.git",
            "--remote-name",
            "run-1",
            "--wait",
            "--log-path",
            "/var/log/tasks",
            "--user",
            "hadoop",
            "StudentModulePerCourseAfterImportWorkflow",
            "--local-scheduler",
            "--credentials",
            "s3://secrets/credentials.json",
            "--dump-root",
            "s3://task-output/exports/run-1/intermediate",
            "--output-root",
            "s3://task-output/exports/run-1/acceptance",
            "--output-suffix",
            "acceptance",
            "--num-mappers",
            "4",
            "--n-reduce-tasks",
            "2",
        ]
    );
}

#[test]
fn test_intermediate_and_final_locations_are_separate() {
    let config = test_config();
    let runner = MockProcessRunner::new();
    let driver = ExtractionJobDriver::new(&runner, &config);

    let args = driver.command().args;
    let dump_root = &args[args.iter().position(|a| a == "--dump-root").unwrap() + 1];
    let output_root = &args[args.iter().position(|a| a == "--output-root").unwrap() + 1];
    assert_ne!(dump_root, output_root);
    assert!(dump_root.ends_with("/intermediate"));
    assert!(output_root.ends_with("/acceptance"));
}

#[tokio::test]
async fn test_submit_blocks_until_completion() {
    let config = test_config();
    let runner = MockProcessRunner::new();
    let driver = ExtractionJobDriver::new(&runner, &config);

    driver.submit().await.unwrap();
    assert_eq!(runner.invocations().len(), 1);
}

#[tokio::test]
async fn test_remote_failure_is_fatal() {
    let config = test_config();
    let runner = MockProcessRunner::new().failing("remote-task", 2);
    let driver = ExtractionJobDriver::new(&runner, &config);

    let err = driver.submit().await.unwrap_err();
    assert!(matches!(err, ExportError::ProcessFailed { code: Some(2), .. }));
}
