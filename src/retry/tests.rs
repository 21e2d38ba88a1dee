//! Engine tests for retry functionality.

use super::*;
use crate::dispatch::{ByValue, Call, Dispatch, DispatchError, MethodTable, ReturnValue};
use crate::testing::{Flaky, FlakyError};
use crate::{args, assert_exhausted, assert_fatal, assert_succeeded};
use std::time::{Duration, Instant};
use tracing_test::traced_test;

#[derive(Debug, Clone, Default)]
struct RetryObject {
    times_called: u32,
}

impl Dispatch for RetryObject {
    fn methods(table: &mut MethodTable<Self>) {
        table
            .register("MethodReturningNoValues", 0, |_: &mut RetryObject, _: &Call<'_>| {
                Ok(Vec::new())
            })
            .register("MethodReturningString", 1, |_: &mut RetryObject, call: &Call<'_>| {
                let arg: &String = call.arg(0)?;
                Ok(vec![ReturnValue::value(arg.clone())])
            })
            .register("MethodReturningError", 1, |obj: &mut RetryObject, _: &Call<'_>| {
                obj.times_called += 1;
                Ok(vec![ReturnValue::error("always")])
            })
            .register(
                "MethodReturningErrorInRandomPosition",
                0,
                |obj: &mut RetryObject, _: &Call<'_>| {
                    obj.times_called += 1;
                    Ok(vec![
                        ReturnValue::value(String::new()),
                        ReturnValue::error("middle"),
                        ReturnValue::value(String::new()),
                    ])
                },
            )
            .register(
                "MethodReturningMultipleErrors",
                0,
                |obj: &mut RetryObject, _: &Call<'_>| {
                    obj.times_called += 1;
                    Ok(vec![
                        ReturnValue::value(String::new()),
                        ReturnValue::error("first"),
                        ReturnValue::error("second"),
                    ])
                },
            )
            .register(
                "MethodSucceedingOnFifthCall",
                0,
                |obj: &mut RetryObject, _: &Call<'_>| {
                    obj.times_called += 1;
                    if obj.times_called < 5 {
                        Ok(vec![ReturnValue::value(String::new()), ReturnValue::error("ah crap")])
                    } else {
                        Ok(vec![ReturnValue::value("omg".to_string()), ReturnValue::nil_error()])
                    }
                },
            );
    }
}

#[test]
fn test_method_on_borrowed_object() {
    let mut object = RetryObject::default();
    let outcome = Retrier::new(Duration::ZERO, 1, 1).execute_method(
        &mut object,
        "MethodReturningString",
        args!["TestArg".to_string()],
    );

    let results = outcome.into_value().expect("should succeed");
    assert_eq!(
        results[0].downcast_ref::<String>().map(String::as_str),
        Some("TestArg")
    );
}

#[test]
fn test_method_on_value_object() {
    let outcome = Retrier::new(Duration::ZERO, 1, 1).execute_method(
        ByValue(RetryObject::default()),
        "MethodReturningString",
        args!["TestArg".to_string()],
    );

    assert_succeeded!(outcome);
    let results = outcome.into_value().unwrap();
    assert_eq!(
        results[0].downcast_ref::<String>().map(String::as_str),
        Some("TestArg")
    );
}

#[test]
fn test_unknown_method_is_fatal_and_not_retried() {
    let retrier = Retrier::new(Duration::from_secs(5), 5, 2);
    let start = Instant::now();

    let outcome = retrier.execute_method(
        ByValue(RetryObject::default()),
        "InvalidMethodName",
        args![],
    );

    assert!(start.elapsed() < Duration::from_secs(1), "no wait expected");
    assert_fatal!(outcome);
    assert!(outcome.value().is_none());
    assert_eq!(outcome.errors().len(), 1);
    assert!(outcome.fatal().unwrap().to_string().contains("InvalidMethodName"));
}

#[test]
fn test_argument_mismatch_is_fatal() {
    let retrier = Retrier::new(Duration::ZERO, 5, 1);

    let wrong_count = retrier.execute_method(
        ByValue(RetryObject::default()),
        "MethodReturningString",
        args![],
    );
    assert!(matches!(
        wrong_count.fatal(),
        Some(DispatchError::ArgumentCount { expected: 1, actual: 0, .. })
    ));

    let wrong_type = retrier.execute_method(
        ByValue(RetryObject::default()),
        "MethodReturningString",
        args![42u64],
    );
    assert!(matches!(
        wrong_type.fatal(),
        Some(DispatchError::ArgumentType { index: 0, .. })
    ));
    assert_eq!(wrong_type.errors().len(), 1);
}

#[test]
fn test_method_error_returns_no_results() {
    let outcome = Retrier::new(Duration::ZERO, 1, 1).execute_method(
        ByValue(RetryObject::default()),
        "MethodReturningError",
        args!["TestArg".to_string()],
    );

    assert!(outcome.value().is_none());
    assert!(outcome.errors()[0].is_attempt());
    // one attempt error plus the exhaustion marker
    assert_eq!(outcome.errors().len(), 2);
}

#[test]
fn test_method_with_no_return_values() {
    let outcome = Retrier::new(Duration::ZERO, 1, 1).execute_method(
        ByValue(RetryObject::default()),
        "MethodReturningNoValues",
        args![],
    );

    assert!(outcome.is_success());
    assert_eq!(outcome.value().map(Vec::len), Some(0));
    assert!(outcome.errors().is_empty());
}

#[test]
fn test_method_retries_correct_number_of_times() {
    let mut object = RetryObject::default();
    let outcome = Retrier::new(Duration::ZERO, 5, 1).execute_method(
        &mut object,
        "MethodReturningError",
        args![String::new()],
    );

    assert_eq!(object.times_called, 5);
    assert_eq!(outcome.errors().len(), 6);
    assert_exhausted!(outcome);
}

#[test]
fn test_by_value_receiver_never_carries_state() {
    let outcome = Retrier::new(Duration::ZERO, 6, 1).execute_method(
        ByValue(RetryObject::default()),
        "MethodSucceedingOnFifthCall",
        args![],
    );

    // every attempt sees a fresh copy, so the counter never reaches 5
    assert_exhausted!(outcome);
    assert_eq!(outcome.errors().len(), 7);
}

#[test]
fn test_error_in_middle_position_is_detected() {
    let mut object = RetryObject::default();
    let outcome = Retrier::new(Duration::from_nanos(1), 1, 1).execute_method(
        &mut object,
        "MethodReturningErrorInRandomPosition",
        args![],
    );

    assert!(!outcome.is_success());
    let first = outcome.errors()[0].as_attempt().expect("attempt error");
    assert_eq!(first.to_string(), "middle");
}

#[test]
fn test_multiple_error_positions_are_all_collected() {
    let mut object = RetryObject::default();
    let outcome = Retrier::new(Duration::ZERO, 5, 1).execute_method(
        &mut object,
        "MethodReturningMultipleErrors",
        args![],
    );

    assert_eq!(object.times_called, 5);
    // 2 errors per attempt, plus the exhaustion marker
    assert_eq!(outcome.errors().len(), 11);
}

#[test]
fn test_method_succeeding_on_fifth_call() {
    let mut object = RetryObject::default();
    let (results, errors, succeeded) = Retrier::new(Duration::ZERO, 5, 1)
        .execute_method(&mut object, "MethodSucceedingOnFifthCall", args![])
        .into_parts();

    assert!(succeeded);
    assert_eq!(object.times_called, 5);
    assert_eq!(errors.len(), 4);
    let results = results.expect("results on success");
    assert_eq!(results.len(), 2);
    assert_eq!(
        results[0].downcast_ref::<String>().map(String::as_str),
        Some("omg")
    );
}

#[test]
fn test_func_success_runs_once() {
    let mut num = 0;
    let outcome = Retrier::new(Duration::ZERO, 3, 1).execute_func(|| {
        num = 42;
        Ok::<_, FlakyError>(())
    });

    assert_eq!(num, 42);
    assert!(outcome.errors().is_empty());
    assert!(outcome.is_success());
}

#[test]
fn test_func_exhaustion_counts() {
    let mut flaky = Flaky::always_failing();
    let (value, errors, succeeded) = Retrier::new(Duration::ZERO, 5, 1)
        .execute_func(|| flaky.call())
        .into_parts();

    assert!(value.is_none());
    assert!(!succeeded);
    assert_eq!(flaky.calls(), 5);
    assert_eq!(errors.len(), 6);
    assert!(errors[..5].iter().all(RetryError::is_attempt));
    assert!(errors[5].is_exhausted());
}

#[test]
fn test_func_succeeds_after_failures() {
    let mut flaky = Flaky::new(4);
    let outcome = Retrier::new(Duration::ZERO, 5, 1).execute_func(|| flaky.call());

    assert_eq!(outcome.value(), Some(&5));
    assert_eq!(outcome.errors().len(), 4);
    assert_eq!(flaky.calls(), 5);
}

#[test]
fn test_zero_max_retries_still_attempts_once() {
    let mut flaky = Flaky::always_failing();
    let outcome = Retrier::new(Duration::ZERO, 0, 1).execute_func(|| flaky.call());

    assert_eq!(flaky.calls(), 1);
    assert_eq!(outcome.errors().len(), 2);
}

#[test]
fn test_exhaustion_marker_names_operation_and_grown_wait() {
    let outcome = Retrier::new(Duration::from_millis(1), 3, 2)
        .execute_func_named("fetch_manifest", || Err::<(), _>("timeout"));

    let marker = outcome.exhausted().expect("exhausted");
    assert_eq!(marker.operation(), "fetch_manifest");
    assert_eq!(marker.max_retries(), 3);
    // 1ms grown by 2 after each of the 3 failures
    assert_eq!(marker.wait(), Duration::from_millis(8));
}

#[test]
fn test_unnamed_func_uses_type_name() {
    let outcome = Retrier::new(Duration::ZERO, 1, 1).execute_func(|| Err::<(), _>("x"));
    let marker = outcome.exhausted().expect("exhausted");
    assert!(marker.operation().contains("test_unnamed_func_uses_type_name"));
}

#[test]
fn test_state_does_not_leak_between_calls() {
    let retrier = Retrier::new(Duration::from_millis(1), 3, 10);

    let first = retrier.execute_func(|| Err::<(), _>("first call"));
    assert_eq!(first.errors().len(), 4);

    let start = Instant::now();
    let second = retrier.execute_func(|| Ok::<_, &str>("second call"));
    assert!(second.errors().is_empty());
    assert_eq!(second.value(), Some(&"second call"));
    assert!(start.elapsed() < Duration::from_millis(500));

    let mut flaky = Flaky::new(1);
    let third = retrier.execute_func(|| flaky.call());
    assert_eq!(third.errors().len(), 1);
    assert_eq!(flaky.calls(), 2);
}

#[test]
fn test_retrier_reusable_after_operation_panics() {
    let retrier = Retrier::new(Duration::ZERO, 3, 1);

    let panicked = std::panic::catch_unwind(|| {
        retrier.execute_func(|| -> Result<(), &'static str> { panic!("operation blew up") })
    });
    assert!(panicked.is_err());

    let outcome = retrier.execute_func(|| Err::<(), _>("clean"));
    assert_eq!(outcome.errors().len(), 4);
}

#[test]
fn test_waits_grow_between_attempts() {
    let retrier = Retrier::new(Duration::from_millis(10), 3, 2);
    let start = Instant::now();

    let outcome = retrier.execute_func(|| Err::<(), _>("slow"));

    // pauses of at least 10ms, 20ms and 40ms follow the three failures
    assert!(start.elapsed() >= Duration::from_millis(70));
    assert_exhausted!(outcome);
}

#[test]
fn test_retry_trait_delegates() {
    fn run<R: Retry>(retrier: &R) -> usize {
        let mut flaky = Flaky::new(1);
        let failures = retrier.retry_func(|| flaky.call()).errors().len();
        failures
    }

    assert_eq!(run(&Retrier::new(Duration::ZERO, 2, 1)), 1);

    let retrier = Retrier::new(Duration::ZERO, 2, 1);
    let mut flaky = Flaky::new(1);
    let outcome = retrier.retry_method(&mut flaky, "Call", args![]);
    assert_succeeded!(outcome);
    assert_eq!(flaky.calls(), 2);
}

#[test]
#[traced_test]
fn test_logs_failed_attempts_and_exhaustion() {
    let _ = Retrier::new(Duration::ZERO, 2, 1).execute_func_named("probe", || Err::<(), _>("down"));

    assert!(logs_contain("attempt failed"));
    assert!(logs_contain("max retries reached for 'probe'"));
}

#[test]
#[traced_test]
fn test_logs_fatal_dispatch() {
    let _ = Retrier::new(Duration::ZERO, 2, 1).execute_method(
        ByValue(Flaky::new(0)),
        "Missing",
        args![],
    );

    assert!(logs_contain("not retrying"));
}

#[cfg(feature = "async")]
mod async_tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_async_func_succeeds_on_third_attempt() {
        let attempts = Arc::new(AtomicU32::new(0));

        let outcome = Retrier::new(Duration::from_millis(1), 5, 1)
            .execute_func_async(|| {
                let attempts = attempts.clone();
                async move {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err("transient failure")
                    } else {
                        Ok("success")
                    }
                }
            })
            .await;

        assert_eq!(outcome.value(), Some(&"success"));
        assert_eq!(outcome.errors().len(), 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_async_func_exhausts() {
        let outcome = Retrier::new(Duration::ZERO, 4, 1)
            .execute_func_named_async("always", || async { Err::<(), _>("nope") })
            .await;

        assert_exhausted!(outcome);
        assert_eq!(outcome.errors().len(), 5);
        assert_eq!(outcome.exhausted().map(|e| e.operation()), Some("always"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_async_wait_does_not_block_runtime() {
        let start = tokio::time::Instant::now();
        let outcome = Retrier::new(Duration::from_secs(10), 2, 3)
            .execute_func_async(|| async { Err::<(), _>("down") })
            .await;

        assert_exhausted!(outcome);
        // 10s then 30s, each with up to 50% jitter, on paused time
        assert!(start.elapsed() >= Duration::from_secs(40));
    }

    #[tokio::test]
    async fn test_async_method() {
        let mut object = RetryObject::default();
        let outcome = Retrier::new(Duration::ZERO, 5, 1)
            .execute_method_async(&mut object, "MethodSucceedingOnFifthCall", args![])
            .await;

        assert_succeeded!(outcome);
        assert_eq!(outcome.errors().len(), 4);
        assert_eq!(object.times_called, 5);
    }

    #[tokio::test]
    async fn test_async_unknown_method() {
        let outcome = Retrier::new(Duration::from_secs(60), 5, 1)
            .execute_method_async(ByValue(RetryObject::default()), "Nope", args![])
            .await;

        assert_fatal!(outcome);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_async_method_future_can_be_spawned() {
        let retrier = Arc::new(Retrier::new(Duration::from_millis(1), 3, 2));

        let pending = retrier.execute_method_async(ByValue(Flaky::new(1)), "Call", args![]);
        assert_send(&pending);
        drop(pending);

        let shared = Arc::clone(&retrier);
        let handle = tokio::spawn(async move {
            shared
                .execute_method_async(
                    ByValue(RetryObject::default()),
                    "MethodReturningString",
                    args!["TestArg".to_string()],
                )
                .await
        });

        let outcome = handle.await.expect("task should not panic");
        assert_succeeded!(outcome);
        let results = outcome.into_value().unwrap();
        assert_eq!(
            results[0].downcast_ref::<String>().map(String::as_str),
            Some("TestArg")
        );
    }
}
