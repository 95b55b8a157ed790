use serde_json::json;
use url::Url;

use grabbit_cli::error::GrabbitError;
use grabbit_cli::monitor::{JobState, JobStatus};

fn uri() -> Url {
    Url::parse("http://localhost:4503").unwrap()
}

fn status_with(running: bool, exit_code: &str) -> JobStatus {
    let body = json!({
        "jobExecutionId": 1,
        "startTime": "2016-03-01T14:13:05-0500",
        "exitStatus": {
            "exitCode": exit_code,
            "running": running,
        },
    });
    JobStatus::from_json(uri(), &body.to_string()).unwrap()
}

#[test]
fn test_running_wins_over_exit_code() {
    assert_eq!(status_with(true, "FAILED").state(), JobState::Running);
    assert_eq!(status_with(true, "COMPLETED").state(), JobState::Running);
}

#[test]
fn test_exit_code_decides_when_not_running() {
    assert_eq!(status_with(false, "COMPLETED").state(), JobState::Completed);
    assert_eq!(status_with(false, "FAILED").state(), JobState::Failed);
    assert_eq!(status_with(false, "WEIRD").state(), JobState::Unknown);
}

#[test]
fn test_exit_code_comparison_is_case_insensitive() {
    assert_eq!(status_with(false, "completed").state(), JobState::Completed);
    assert_eq!(status_with(false, "Failed").state(), JobState::Failed);
}

#[test]
fn test_full_body_parses() {
    let body = json!({
        "transactionID": 99,
        "jobExecutionId": 123,
        "startTime": "2016-03-01T14:13:05-0500",
        "endTime": "2016-03-01T14:18:05-0500",
        "path": "/content/site",
        "timeTaken": 300000,
        "jcrNodesWritten": 12345,
        "exitStatus": {
            "exitDescription": "all done",
            "exitCode": "COMPLETED",
            "running": false,
        },
    });

    let status = JobStatus::from_json(uri(), &body.to_string()).unwrap();
    assert_eq!(status.transaction_id, 99);
    assert_eq!(status.job_execution_id, 123);
    assert_eq!(status.start_time.to_rfc3339(), "2016-03-01T14:13:05-05:00");
    assert_eq!(
        status.end_time.map(|t| t.to_rfc3339()),
        Some("2016-03-01T14:18:05-05:00".to_string())
    );
    assert_eq!(status.path, "/content/site");
    assert_eq!(status.time_taken, 300000);
    assert_eq!(status.jcr_nodes_written, 12345);
    assert_eq!(status.exit_description, "all done");
    assert_eq!(status.state(), JobState::Completed);
}

#[test]
fn test_missing_fields_use_defaults() {
    let status = JobStatus::from_json(uri(), "{}").unwrap();
    assert_eq!(status.transaction_id, -1);
    assert_eq!(status.job_execution_id, -1);
    assert!(status.end_time.is_none());
    assert_eq!(status.path, "/MISSING_PATH");
    assert_eq!(status.time_taken, -1);
    assert_eq!(status.jcr_nodes_written, -1);
    assert_eq!(status.exit_description, "");
    assert_eq!(status.exit_code, "UNKNOWN");
    assert!(!status.running);
    assert_eq!(status.state(), JobState::Unknown);
}

#[test]
fn test_empty_body_is_all_defaults() {
    let status = JobStatus::from_json(uri(), "  \n ").unwrap();
    assert_eq!(status.job_execution_id, -1);
    assert_eq!(status.state(), JobState::Unknown);
}

#[test]
fn test_numbers_as_strings_are_accepted() {
    let body = json!({
        "timeTaken": "300000",
        "jcrNodesWritten": " 42 ",
    });
    let status = JobStatus::from_json(uri(), &body.to_string()).unwrap();
    assert_eq!(status.time_taken, 300000);
    assert_eq!(status.jcr_nodes_written, 42);
}

#[test]
fn test_invalid_json_is_a_parse_error() {
    assert!(matches!(
        JobStatus::from_json(uri(), "<html>oops</html>").unwrap_err(),
        GrabbitError::StatusParse(_)
    ));
}

#[test]
fn test_non_object_body_is_a_parse_error() {
    assert!(matches!(
        JobStatus::from_json(uri(), "[1, 2]").unwrap_err(),
        GrabbitError::StatusParse(_)
    ));
}

#[test]
fn test_bad_timestamp_is_a_parse_error() {
    let body = json!({ "startTime": "March 1st, 2016" });
    assert!(matches!(
        JobStatus::from_json(uri(), &body.to_string()).unwrap_err(),
        GrabbitError::StatusParse(_)
    ));
}
