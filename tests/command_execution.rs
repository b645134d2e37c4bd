//! End-to-end behaviour of the command execution engine.

use breakwater::command::{ExecuteError, FailureKind};
use breakwater::config::BreakwaterConfig;
use breakwater::metrics::Outcome;
use breakwater::request::{RequestCache, RequestContext};

mod common;

use common::{Fallback, Harness, ScriptedCommand, Work};

fn runtime_error(err: ExecuteError) -> breakwater::command::CommandRuntimeError {
    match err {
        ExecuteError::Runtime(err) => err,
        ExecuteError::BadRequest(err) => panic!("unexpected bad request: {err}"),
    }
}

#[test]
fn test_success() {
    let harness = Harness::new(BreakwaterConfig::default());
    let mut handle = harness.factory.get_command(ScriptedCommand::succeeding("TestCommand"));

    assert_eq!(handle.execute().unwrap(), "result");
    assert_eq!(handle.execution_events(), vec![Outcome::Success]);
    assert_eq!(handle.execution_time(), Some(0));
    assert_eq!(handle.metrics().rolling_count(Outcome::Success), 1);
}

#[test]
fn test_failure_with_fallback() {
    let harness = Harness::new(BreakwaterConfig::default());
    let command = ScriptedCommand::failing("TestCommand")
        .with_fallback(Fallback::Value("fallback result".to_string()));
    let mut handle = harness.factory.get_command(command);

    assert_eq!(handle.execute().unwrap(), "fallback result");
    assert_eq!(handle.execution_events(), vec![Outcome::Failure, Outcome::FallbackSuccess]);
    assert_eq!(
        handle.execution_error().map(|e| e.to_string()).as_deref(),
        Some("boom")
    );

    let metrics = handle.metrics();
    assert_eq!(metrics.rolling_count(Outcome::Failure), 1);
    assert_eq!(metrics.rolling_count(Outcome::FallbackSuccess), 1);
    assert_eq!(metrics.rolling_count(Outcome::ExceptionThrown), 0);
}

#[test]
fn test_short_circuited_with_fallback() {
    let harness = Harness::new(BreakwaterConfig::default());
    harness.storage.open_circuit("TestCommand", 5_000);
    let command = ScriptedCommand::succeeding("TestCommand")
        .with_fallback(Fallback::Value("fallback result".to_string()));
    let runs = command.runs.clone();
    let mut handle = harness.factory.get_command(command);

    assert_eq!(handle.execute().unwrap(), "fallback result");
    assert_eq!(
        handle.execution_events(),
        vec![Outcome::ShortCircuited, Outcome::FallbackSuccess]
    );
    assert_eq!(handle.execution_time(), None);
    assert!(handle.execution_error().is_none());
    assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[test]
fn test_short_circuited_without_fallback() {
    let harness = Harness::new(BreakwaterConfig::default());
    harness.storage.open_circuit("TestCommand", 5_000);
    let mut handle = harness.factory.get_command(ScriptedCommand::succeeding("TestCommand"));

    let err = runtime_error(handle.execute().unwrap_err());
    assert_eq!(err.message(), "Short-circuited and no fallback available");
    assert_eq!(err.kind(), FailureKind::FallbackUnavailable);
    assert!(err.was_short_circuited());
    assert_eq!(
        handle.execution_events(),
        vec![Outcome::ShortCircuited, Outcome::ExceptionThrown]
    );
}

#[test]
fn test_fallback_disabled() {
    let mut config = BreakwaterConfig::default();
    config.default.fallback.enabled = false;
    let harness = Harness::new(config);
    let command = ScriptedCommand::failing("TestCommand")
        .with_fallback(Fallback::Value("never used".to_string()));
    let fallbacks = command.fallbacks.clone();
    let mut handle = harness.factory.get_command(command);

    let err = runtime_error(handle.execute().unwrap_err());
    assert!(err.message().ends_with("and fallback disabled"));
    assert_eq!(err.message(), "boom and fallback disabled");
    assert_eq!(err.kind(), FailureKind::FallbackDisabled);
    assert_eq!(err.command_key(), "TestCommand");
    assert_eq!(err.original().map(|e| e.to_string()).as_deref(), Some("boom"));
    assert!(err.fallback().is_none());
    assert_eq!(handle.execution_events(), vec![Outcome::Failure, Outcome::ExceptionThrown]);
    assert_eq!(fallbacks.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[test]
fn test_no_fallback_available() {
    let harness = Harness::new(BreakwaterConfig::default());
    let mut handle = harness.factory.get_command(ScriptedCommand::failing("TestCommand"));

    let err = runtime_error(handle.execute().unwrap_err());
    assert_eq!(err.message(), "boom and no fallback available");
    assert_eq!(handle.execution_events(), vec![Outcome::Failure, Outcome::ExceptionThrown]);
    assert_eq!(handle.metrics().rolling_count(Outcome::FallbackFailure), 0);
}

#[test]
fn test_fallback_failure() {
    let harness = Harness::new(BreakwaterConfig::default());
    let command = ScriptedCommand::failing("TestCommand")
        .with_fallback(Fallback::Fail("fallback boom".to_string()));
    let mut handle = harness.factory.get_command(command);

    let err = runtime_error(handle.execute().unwrap_err());
    assert_eq!(err.message(), "boom and failed retrieving fallback");
    assert_eq!(err.kind(), FailureKind::FallbackFailed);
    assert_eq!(err.original().map(|e| e.to_string()).as_deref(), Some("boom"));
    assert_eq!(
        err.fallback().map(|e| e.to_string()).as_deref(),
        Some("fallback boom")
    );
    assert_eq!(
        handle.execution_events(),
        vec![Outcome::Failure, Outcome::FallbackFailure, Outcome::ExceptionThrown]
    );

    let metrics = handle.metrics();
    assert_eq!(metrics.rolling_count(Outcome::FallbackFailure), 1);
    assert_eq!(metrics.rolling_count(Outcome::ExceptionThrown), 1);
}

#[test]
fn test_bad_request_bypasses_everything() {
    let harness = Harness::new(BreakwaterConfig::default());
    let command = ScriptedCommand::new("TestCommand", Work::BadRequest("invalid id".to_string()))
        .with_fallback(Fallback::Value("never used".to_string()))
        .with_latency(&harness.clock, 3);
    let fallbacks = command.fallbacks.clone();
    let mut handle = harness.factory.get_command(command);

    let err = handle.execute().unwrap_err();
    assert!(err.is_bad_request());
    assert_eq!(err.to_string(), "Bad request: invalid id");
    assert!(handle.execution_events().is_empty());
    assert_eq!(handle.execution_time(), Some(3));
    assert_eq!(fallbacks.load(std::sync::atomic::Ordering::SeqCst), 0);

    let metrics = handle.metrics();
    for outcome in Outcome::ALL {
        assert_eq!(metrics.rolling_count(outcome), 0, "{outcome} counted");
    }
}

#[test]
fn test_request_cache_round_trip() {
    let harness = Harness::new(BreakwaterConfig::default());
    let context = RequestContext::new();
    let factory = harness.factory.with_request_context(&context);

    let first = ScriptedCommand::succeeding("TestCommand").with_cache_key("user-1");
    let second = first.clone();
    let runs = first.runs.clone();

    let mut handle = factory.get_command(first);
    assert_eq!(handle.execute().unwrap(), "result");
    assert_eq!(handle.execution_events(), vec![Outcome::Success]);

    let mut handle = factory.get_command(second);
    assert_eq!(handle.execute().unwrap(), "result");
    assert_eq!(handle.execution_events(), vec![Outcome::ResponseFromCache]);
    assert_eq!(handle.execution_time(), None);

    assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(handle.metrics().rolling_count(Outcome::ResponseFromCache), 1);
}

#[test]
fn test_fallback_result_is_cached() {
    let harness = Harness::new(BreakwaterConfig::default());
    let cache = RequestCache::new();
    let factory = harness.factory.clone().with_request_cache(cache.clone());
    let command = ScriptedCommand::failing("TestCommand")
        .with_fallback(Fallback::Value("fallback result".to_string()))
        .with_cache_key("user-1");

    factory.get_command(command).execute().unwrap();

    assert_eq!(
        cache.get::<String>("TestCommand", "user-1").as_deref(),
        Some("fallback result")
    );
}

#[test]
fn test_short_circuited_fallback_is_not_cached() {
    let harness = Harness::new(BreakwaterConfig::default());
    harness.storage.open_circuit("TestCommand", 5_000);
    let cache = RequestCache::new();
    let factory = harness.factory.clone().with_request_cache(cache.clone());
    let command = ScriptedCommand::succeeding("TestCommand")
        .with_fallback(Fallback::Value("fallback result".to_string()))
        .with_cache_key("user-1");

    factory.get_command(command).execute().unwrap();

    assert!(!cache.exists("TestCommand", "user-1"));
}

#[test]
fn test_cache_key_without_injected_cache() {
    let harness = Harness::new(BreakwaterConfig::default());
    let command = ScriptedCommand::succeeding("TestCommand").with_cache_key("user-1");
    let runs = command.runs.clone();

    harness.factory.get_command(command.clone()).execute().unwrap();
    harness.factory.get_command(command).execute().unwrap();

    assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), 2);
}

#[test]
fn test_cache_disabled_by_config() {
    let mut config = BreakwaterConfig::default();
    config.default.request_cache.enabled = false;
    let harness = Harness::new(config);
    let context = RequestContext::new();
    let factory = harness.factory.with_request_context(&context);
    let command = ScriptedCommand::succeeding("TestCommand").with_cache_key("user-1");
    let runs = command.runs.clone();

    factory.get_command(command.clone()).execute().unwrap();
    factory.get_command(command).execute().unwrap();

    assert_eq!(runs.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert!(!context.cache().exists("TestCommand", "user-1"));
}

#[test]
fn test_request_log_enabled() {
    let mut config = BreakwaterConfig::default();
    config.default.request_log.enabled = true;
    let harness = Harness::new(config);
    let context = RequestContext::new();
    let factory = harness.factory.with_request_context(&context);
    let clock = harness.clock.clone();

    let failing = ScriptedCommand::failing("commandA")
        .with_fallback(Fallback::Value("fallback".to_string()))
        .with_latency(&clock, 100);
    factory.get_command(failing).execute().unwrap();
    for latency in [50, 15] {
        let command = ScriptedCommand::succeeding("commandA").with_latency(&clock, latency);
        factory.get_command(command).execute().unwrap();
    }
    let bad = ScriptedCommand::new("commandB", Work::BadRequest("nope".to_string()));
    factory.get_command(bad).execute().unwrap_err();

    assert_eq!(context.log().len(), 4);
    assert_eq!(
        context.log().executed_commands_as_string(),
        "commandA[FAILURE, FALLBACK_SUCCESS][100ms], commandA[SUCCESS][65ms]x2, commandB[Executed][0ms]"
    );
}

#[test]
fn test_request_log_records_cache_hits() {
    let mut config = BreakwaterConfig::default();
    config.default.request_log.enabled = true;
    let harness = Harness::new(config);
    let context = RequestContext::new();
    let factory = harness.factory.with_request_context(&context);
    let command = ScriptedCommand::succeeding("TestCommand").with_cache_key("k");

    factory.get_command(command.clone()).execute().unwrap();
    factory.get_command(command).execute().unwrap();

    let events: Vec<_> = context
        .log()
        .executed_commands()
        .iter()
        .map(|record| record.events())
        .collect();
    assert_eq!(events, vec![vec![Outcome::Success], vec![Outcome::ResponseFromCache]]);
}

#[test]
fn test_request_log_disabled_by_default() {
    let harness = Harness::new(BreakwaterConfig::default());
    let context = RequestContext::new();
    let factory = harness.factory.with_request_context(&context);

    factory
        .get_command(ScriptedCommand::succeeding("TestCommand"))
        .execute()
        .unwrap();

    assert!(context.log().is_empty());
    assert_eq!(context.log().executed_commands_as_string(), "");
}

#[test]
fn test_runtime_override_disables_fallback() {
    use breakwater::config::{CommandConfigPatch, TogglePatch};

    let harness = Harness::new(BreakwaterConfig::default());
    let command = ScriptedCommand::failing("TestCommand")
        .with_fallback(Fallback::Value("fallback".to_string()));
    let mut handle = harness.factory.get_command(command);
    handle.set_config(
        &CommandConfigPatch {
            fallback: TogglePatch { enabled: Some(false) },
            ..Default::default()
        },
        true,
    );

    let err = runtime_error(handle.execute().unwrap_err());
    assert_eq!(err.kind(), FailureKind::FallbackDisabled);
}

#[test]
fn test_metrics_shared_across_handles() {
    let harness = Harness::new(BreakwaterConfig::default());
    let a = harness.factory.get_command(ScriptedCommand::succeeding("TestCommand"));
    let b = harness.factory.get_command(ScriptedCommand::failing("TestCommand"));
    assert!(std::sync::Arc::ptr_eq(&a.metrics(), &b.metrics()));
}
