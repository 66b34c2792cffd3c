// crates.io
use httpmock::prelude::*;
use serde::Deserialize;
use time::Duration;
// self
use statline::{
	decode::FieldCatalog,
	error::Error,
	limit::LimitPolicy,
	obs::{GateOutcome, PipelineEvent},
	pipeline::{CancellationToken, RequestDescriptor},
};

#[allow(dead_code)] mod common;

#[derive(Debug, Deserialize)]
struct Ranking {
	rank: u32,
}
impl FieldCatalog for Ranking {
	const FIELDS: &'static [&'static str] = &["rank"];
}

const RANKING_BODY: &str = "{\"rank\":1}";

async fn mock_token(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/oauth/token");
			then.status(200).header("content-type", "application/json").body(common::TOKEN_BODY);
		})
		.await
}

#[tokio::test]
async fn exhausted_bucket_throws_preemptively_under_throw_policy() {
	let server = MockServer::start_async().await;
	let (pipeline, sink) = common::build_pipeline(common::build_descriptor(&server));
	let pipeline = pipeline.with_policy(LimitPolicy::Throw);
	let _token_mock = mock_token(&server).await;
	let ranking_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v2/rankings");
			then.status(200)
				.header("content-type", "application/json")
				.header("X-RateLimit-Limit", "60")
				.header("X-RateLimit-Remaining", "0")
				.body(RANKING_BODY);
		})
		.await;

	pipeline
		.execute::<Ranking>(RequestDescriptor::get("/rankings"))
		.await
		.expect("First execute should succeed and exhaust the bucket.");

	let err = pipeline
		.execute::<Ranking>(RequestDescriptor::get("/rankings"))
		.await
		.expect_err("Second execute must be refused pre-emptively.");
	let Error::PreemptiveRateLimit { wait } = err else {
		panic!("Expected Error::PreemptiveRateLimit, got {err:?}.");
	};

	assert!(wait > Duration::seconds(55), "wait should be close to the full window: {wait}");
	assert!(wait <= Duration::seconds(60), "wait cannot exceed the window: {wait}");

	// Denied calls never reach the wire.
	ranking_mock.assert_calls_async(1).await;

	assert!(sink.events().iter().any(|event| matches!(
		event,
		PipelineEvent::Gate { outcome: GateOutcome::Throw, wait: Some(w), .. } if *w == wait
	)));
}

#[tokio::test]
async fn exhausted_bucket_waits_out_the_window_under_wait_policy() {
	let server = MockServer::start_async().await;
	let descriptor = common::descriptor_builder(&server)
		.window(Duration::seconds(2))
		.build()
		.expect("Short-window descriptor should validate.");
	let (pipeline, sink) = common::build_pipeline(descriptor);
	let _token_mock = mock_token(&server).await;
	let ranking_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v2/rankings");
			then.status(200)
				.header("content-type", "application/json")
				.header("X-RateLimit-Remaining", "0")
				.body(RANKING_BODY);
		})
		.await;

	pipeline
		.execute::<Ranking>(RequestDescriptor::get("/rankings"))
		.await
		.expect("First execute should succeed and exhaust the bucket.");

	let started = std::time::Instant::now();

	pipeline
		.execute::<Ranking>(RequestDescriptor::get("/rankings"))
		.await
		.expect("Second execute should proceed after waiting out the window.");

	assert!(
		started.elapsed() >= std::time::Duration::from_secs(1),
		"the caller should have suspended for most of the window",
	);

	ranking_mock.assert_calls_async(2).await;

	assert!(sink
		.events()
		.iter()
		.any(|event| matches!(event, PipelineEvent::Gate { outcome: GateOutcome::Wait, .. })));
}

#[tokio::test]
async fn cancellation_interrupts_a_rate_limit_wait() {
	let server = MockServer::start_async().await;
	let (pipeline, _sink) = common::build_pipeline(common::build_descriptor(&server));
	let _token_mock = mock_token(&server).await;
	let _ranking_mock = server
		.mock_async(|when, then| {
			when.method(GET).path("/api/v2/rankings");
			then.status(200)
				.header("content-type", "application/json")
				.header("X-RateLimit-Remaining", "0")
				.body(RANKING_BODY);
		})
		.await;

	pipeline
		.execute::<Ranking>(RequestDescriptor::get("/rankings"))
		.await
		.expect("First execute should succeed and exhaust the bucket.");

	// Default window is 60 s, so without cancellation this would suspend for almost a minute.
	let cancel = CancellationToken::new();
	let canceller = cancel.clone();
	let started = std::time::Instant::now();
	let (result, ()) = tokio::join!(
		pipeline.execute_cancellable::<Ranking>(RequestDescriptor::get("/rankings"), cancel),
		async {
			tokio::time::sleep(std::time::Duration::from_millis(200)).await;
			canceller.cancel();
		},
	);
	let err = result.expect_err("Cancellation must interrupt the wait.");

	assert!(matches!(err, Error::Cancelled));
	assert!(started.elapsed() < std::time::Duration::from_secs(5));
}

#[tokio::test]
async fn closed_pipeline_rejects_every_operation() {
	let server = MockServer::start_async().await;
	let (pipeline, _sink) = common::build_pipeline(common::build_descriptor(&server));

	pipeline.close();

	assert!(pipeline.is_closed());

	let err = pipeline
		.execute::<Ranking>(RequestDescriptor::get("/rankings"))
		.await
		.expect_err("Execute after close must fail.");

	assert!(matches!(err, Error::ClosedResource));

	let err = pipeline.revoke_token().await.expect_err("Revocation after close must fail.");

	assert!(matches!(err, Error::ClosedResource));
}
