use std::path::Path;
use std::time::Duration;

use httpmock::{Method::POST, MockServer};
use serde_json::json;
use sketch_illustrator::test_support::should_skip_httpmock;
use sketch_illustrator::{BatchDriver, BatchSettings, Config, FileOutcome, ResponsesImageClient};

const GENERATED: &[u8] = b"\x89PNG\r\n\x1a\nillustrated page";

fn sse_body() -> String {
    use base64::Engine as _;
    let result = base64::engine::general_purpose::STANDARD.encode(GENERATED);
    let completed = json!({
        "type": "response.completed",
        "response": {
            "id": "resp_1",
            "status": "completed",
            "output": [
                {"type": "reasoning", "id": "rs_1", "summary": []},
                {"type": "image_generation_call", "id": "ig_1", "status": "completed", "result": result},
            ],
        },
    });
    format!(
        concat!(
            ": ping\n\n",
            "event: response.created\n",
            "data: {{\"type\":\"response.created\",\"response\":{{\"id\":\"resp_1\"}}}}\n\n",
            "data: {{\"type\":\"response.output_item.added\"\n\n",
            "data: {}\n\n",
            "data: [DONE]\n\n",
        ),
        completed
    )
}

fn config(base_url: String, input: &Path, output: &Path) -> Config {
    let settings = BatchSettings::default();
    Config {
        api_base: base_url.trim_end_matches('/').to_string(),
        api_token: "tw-integration".to_string(),
        model: settings.model,
        prompt: settings.prompt,
        input_dir: input.to_path_buf(),
        output_dir: output.to_path_buf(),
        timeout: Duration::from_secs(30),
    }
}

#[tokio::test]
async fn resumes_partial_batch_against_streaming_api() {
    if should_skip_httpmock() {
        return;
    }
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/responses")
                .header("authorization", "Bearer tw-integration")
                .body_includes("\"tools\":[{\"type\":\"image_generation\"}]");
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(sse_body());
        })
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    std::fs::create_dir_all(&input).expect("mkdir input");
    std::fs::create_dir_all(&output).expect("mkdir output");
    for name in ["1.jpg", "2.jpeg", "3.PNG", "readme.txt"] {
        std::fs::write(input.join(name), name.as_bytes()).expect("write input");
    }
    std::fs::write(output.join("1.png"), b"done earlier").expect("write output");

    let config = config(server.url("/api/v1/"), &input, &output);
    let client = ResponsesImageClient::from_config(&config).expect("client");
    let report = BatchDriver::new(&config, &client)
        .run()
        .await
        .expect("batch run");

    mock.assert_calls_async(2).await;
    assert_eq!(report.files.len(), 3);
    assert_eq!(report.files[0].outcome, FileOutcome::Skipped);
    assert_eq!(
        report.files[1].outcome,
        FileOutcome::Succeeded {
            bytes: GENERATED.len()
        }
    );
    assert_eq!(report.files[2].output, "3.png");
    let names: Vec<&str> = report.outputs.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["1.png", "2.png", "3.png"]);
    assert_eq!(std::fs::read(output.join("3.png")).expect("read"), GENERATED);

    let rerun = BatchDriver::new(&config, &client)
        .run()
        .await
        .expect("second run");
    mock.assert_calls_async(2).await;
    assert_eq!(rerun.attempted(), 0);
    assert_eq!(rerun.skipped(), 3);
}

#[tokio::test]
async fn server_errors_fail_single_files_without_output() {
    if should_skip_httpmock() {
        return;
    }
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/responses");
            then.status(502).body("upstream unavailable");
        })
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let input = dir.path().join("input");
    let output = dir.path().join("output");
    std::fs::create_dir_all(&input).expect("mkdir input");
    std::fs::write(input.join("a.jpg"), b"a").expect("write input");
    std::fs::write(input.join("b.jpg"), b"b").expect("write input");

    let config = config(server.base_url(), &input, &output);
    let client = ResponsesImageClient::from_config(&config).expect("client");
    let report = BatchDriver::new(&config, &client)
        .run()
        .await
        .expect("batch run");

    mock.assert_calls_async(2).await;
    assert_eq!(report.failed(), 2);
    for file in &report.files {
        let FileOutcome::Failed { kind, message } = &file.outcome else {
            panic!("expected failure, got {:?}", file.outcome);
        };
        assert_eq!(*kind, "api");
        assert!(message.contains("upstream unavailable"));
    }
    assert!(report.outputs.is_empty());
}
