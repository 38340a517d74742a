mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use common::RecordingTransport;
use cronitor::{JobError, Scheduler, MAX_MESSAGE_CHARS};

#[tokio::test]
async fn test_successful_job_pings_run_then_complete() {
    let transport = RecordingTransport::new();
    let client = common::client(transport.clone());

    let result = client.run_job("nightly-backup", || async { Ok::<_, String>(42) }).await;
    assert_eq!(result.unwrap(), 42);

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].query_value("state"), Some("run"));
    assert_eq!(requests[1].query_value("state"), Some("complete"));

    let series = requests[0].query_value("series").unwrap();
    assert_eq!(series.len(), 8);
    assert_eq!(requests[1].query_value("series"), Some(series));
}

#[tokio::test]
async fn test_plain_job_completes_without_message() {
    let transport = RecordingTransport::new();
    let client = common::client(transport.clone());

    let result = client
        .run_job("nightly-backup", || async { Ok::<_, String>("backed up 12 files".to_string()) })
        .await;
    assert!(result.is_ok());

    let requests = transport.requests();
    assert_eq!(requests[1].query_value("state"), Some("complete"));
    assert_eq!(requests[1].query_value("message"), None);
}

#[tokio::test]
async fn test_job_output_is_sent_on_complete() {
    let transport = RecordingTransport::new();
    let client = common::client(transport.clone());

    let result = client
        .run_job_with_output("nightly-backup", || async {
            Ok::<_, String>("backed up 12 files".to_string())
        })
        .await;
    assert_eq!(result.unwrap(), "backed up 12 files");

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].query_value("state"), Some("complete"));
    assert_eq!(requests[1].query_value("message"), Some("backed up 12 files"));
    assert_eq!(requests[0].query_value("series"), requests[1].query_value("series"));
}

#[tokio::test]
async fn test_long_job_output_keeps_its_tail() {
    let transport = RecordingTransport::new();
    let client = common::client(transport.clone());
    let output = format!("{}{}", "a".repeat(50), "z".repeat(MAX_MESSAGE_CHARS));

    client
        .run_job_with_output("nightly-backup", move || async move { Ok::<_, String>(output) })
        .await
        .unwrap();

    let requests = transport.requests();
    let message = requests[1].query_value("message").unwrap();
    assert_eq!(message.chars().count(), MAX_MESSAGE_CHARS);
    assert!(message.chars().all(|c| c == 'z'));
}

#[tokio::test]
async fn test_failed_job_pings_fail_with_message() {
    let transport = RecordingTransport::new();
    let client = common::client(transport.clone());

    let result = client
        .run_job("nightly-backup", || async { Err::<(), _>("disk full".to_string()) })
        .await;

    assert!(matches!(result, Err(JobError::Job(ref e)) if e == "disk full"));

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].query_value("state"), Some("fail"));
    assert_eq!(requests[1].query_value("message"), Some("disk full"));
    assert_eq!(requests[0].query_value("series"), requests[1].query_value("series"));
}

#[tokio::test]
async fn test_job_runs_even_when_pings_fail() {
    let transport = RecordingTransport::new();
    transport.set_failing(true);
    let client = common::client(transport.clone());

    let result = client.run_job("nightly-backup", || async { Ok::<_, String>("done") }).await;
    assert_eq!(result.unwrap(), "done");
    assert_eq!(transport.requests().len(), 2);
}

#[tokio::test]
async fn test_job_with_empty_key_does_not_run() {
    let transport = RecordingTransport::new();
    let client = common::client(transport.clone());
    let mut ran = false;

    let result = client
        .run_job("", || {
            ran = true;
            async { Ok::<_, String>(()) }
        })
        .await;

    assert!(matches!(result, Err(JobError::Monitor(_))));
    assert!(!ran);
    assert!(transport.requests().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scheduled_job_sends_run_and_complete() {
    let transport = RecordingTransport::new();
    let client = common::client(transport.clone());

    let mut scheduler = Scheduler::new(client).await.unwrap();
    scheduler
        .schedule("nightly-backup", "* * * * * *", || async { Ok::<(), String>(()) })
        .await
        .unwrap();

    scheduler.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(3_500)).await;
    scheduler.shutdown().await.unwrap();
    // let a run that fired right at shutdown finish its pings
    tokio::time::sleep(Duration::from_millis(200)).await;

    let requests = transport.requests();
    let mut by_series: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for request in &requests {
        let series = request.query_value("series").unwrap().to_string();
        let state = request.query_value("state").unwrap().to_string();
        by_series.entry(series).or_default().push(state);
    }

    let completed = by_series
        .values()
        .filter(|states| states.as_slice() == ["run", "complete"])
        .count();
    assert!(completed >= 2, "expected at least two runs, got {:?}", by_series);
    assert!(by_series.values().all(|states| states[0] == "run"));
}
