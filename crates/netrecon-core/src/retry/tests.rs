use super::*;
use crate::testing::{FnConditional, ScriptedDevice};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn policy(retries: u32, match_policy: MatchPolicy) -> RetryPolicy {
    RetryPolicy::new(retries, Duration::ZERO, match_policy)
}

fn show_version() -> Vec<Command> {
    vec![Command::new("show version")]
}

fn contains(raw: &str, index: usize, needle: &'static str) -> Box<dyn Conditional> {
    FnConditional::new(raw, move |responses: &[String]| {
        responses.get(index).is_some_and(|r| r.contains(needle))
    })
    .boxed()
}

#[tokio::test]
async fn test_no_conditionals_succeeds_after_one_send() {
    let mut device = ScriptedDevice::new().respond_with(["Cisco IOS XE Software"]);
    let mut executor = RetryExecutor::new(policy(9, MatchPolicy::All));

    let outcome = executor.run(&mut device, &show_version(), vec![]).await.unwrap();

    assert_eq!(outcome.state, RetryState::Satisfied);
    assert_eq!(outcome.sends, 1);
    assert_eq!(device.send_count(), 1);
    assert_eq!(outcome.responses, vec!["Cisco IOS XE Software"]);
}

#[tokio::test]
async fn test_any_without_conditionals_matches_all() {
    let mut device = ScriptedDevice::new();
    let mut executor = RetryExecutor::new(policy(9, MatchPolicy::Any));

    let outcome = executor.run(&mut device, &show_version(), vec![]).await.unwrap();

    assert!(outcome.state.is_success());
    assert_eq!(outcome.sends, 1);
}

#[tokio::test]
async fn test_first_send_satisfies_condition() {
    let mut device = ScriptedDevice::new().respond_with(["Cisco IOS Software, Version 17.6.1a"]);
    let mut executor = RetryExecutor::new(policy(9, MatchPolicy::All));

    let outcome = executor
        .run(
            &mut device,
            &show_version(),
            vec![contains("result[0] contains IOS", 0, "IOS")],
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, RetryState::Satisfied);
    assert_eq!(device.send_count(), 1);
    assert!(outcome.pending.is_empty());
}

#[tokio::test]
async fn test_all_exhausts_with_only_unsatisfied_pending() {
    let commands = vec![Command::new("show version"), Command::new("show interfaces")];
    let mut device = ScriptedDevice::new().respond_with(["Cisco IOS XE", "GigabitEthernet1 is up"]);
    let mut executor = RetryExecutor::new(policy(3, MatchPolicy::All));

    let outcome = executor
        .run(
            &mut device,
            &commands,
            vec![
                contains("result[0] contains IOS", 0, "IOS"),
                contains("result[1] contains Loopback0", 1, "Loopback0"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, RetryState::Exhausted);
    assert_eq!(outcome.sends, 4, "retries + 1 sends");
    assert_eq!(device.send_count(), 4);
    assert_eq!(outcome.failed_conditions(), vec!["result[1] contains Loopback0"]);
    assert_eq!(outcome.responses[1], "GigabitEthernet1 is up");
}

#[tokio::test]
async fn test_all_satisfied_across_rounds() {
    // First round satisfies the first condition, third round the second one.
    let mut device = ScriptedDevice::new()
        .respond_with(["IOS", "down"])
        .respond_with(["booting", "down"])
        .respond_with(["booting", "up"]);
    let commands = vec![Command::new("show version"), Command::new("show interfaces")];
    let mut executor = RetryExecutor::new(policy(5, MatchPolicy::All));

    let outcome = executor
        .run(
            &mut device,
            &commands,
            vec![
                contains("result[0] contains IOS", 0, "IOS"),
                contains("result[1] contains up", 1, "up"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, RetryState::Satisfied);
    assert_eq!(outcome.sends, 3);
    assert_eq!(outcome.responses, vec!["booting", "up"]);
}

#[tokio::test]
async fn test_any_stops_on_first_round_with_a_match() {
    let mut device = ScriptedDevice::new()
        .respond_with(["nothing yet"])
        .respond_with(["Loopback0 up"]);
    let mut executor = RetryExecutor::new(policy(9, MatchPolicy::Any));

    let outcome = executor
        .run(
            &mut device,
            &show_version(),
            vec![
                contains("result[0] contains IOS", 0, "IOS"),
                contains("result[0] contains Loopback0", 0, "Loopback0"),
            ],
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, RetryState::Satisfied);
    assert_eq!(outcome.sends, 2);
    assert!(outcome.pending.is_empty());
}

#[tokio::test]
async fn test_any_evaluates_every_condition_in_matching_round() {
    let evaluations = Arc::new(AtomicUsize::new(0));
    let counted = |raw: &str, result: bool| {
        let evaluations = Arc::clone(&evaluations);
        FnConditional::new(raw, move |_: &[String]| {
            evaluations.fetch_add(1, Ordering::SeqCst);
            result
        })
        .boxed()
    };
    let mut device = ScriptedDevice::new();
    let mut executor = RetryExecutor::new(policy(9, MatchPolicy::Any));

    let outcome = executor
        .run(
            &mut device,
            &show_version(),
            vec![counted("first", true), counted("second", false), counted("third", false)],
        )
        .await
        .unwrap();

    assert!(outcome.state.is_success());
    assert_eq!(evaluations.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_any_never_sends_more_than_budget() {
    let mut device = ScriptedDevice::new().respond_with(["no match"]);
    let mut executor = RetryExecutor::new(policy(2, MatchPolicy::Any));

    let outcome = executor
        .run(
            &mut device,
            &show_version(),
            vec![contains("a", 0, "IOS"), contains("b", 0, "NX-OS")],
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, RetryState::Exhausted);
    assert_eq!(device.send_count(), 3);
    assert_eq!(outcome.failed_conditions(), vec!["a", "b"]);
}

#[tokio::test]
async fn test_zero_retries_sends_exactly_once() {
    let mut device = ScriptedDevice::new().respond_with(["no match"]);
    let mut executor = RetryExecutor::new(policy(0, MatchPolicy::All));

    let outcome = executor
        .run(&mut device, &show_version(), vec![contains("c", 0, "IOS")])
        .await
        .unwrap();

    assert_eq!(outcome.state, RetryState::Exhausted);
    assert_eq!(device.send_count(), 1);
}

#[tokio::test]
async fn test_conditions_see_latest_round_only() {
    // Round 1 has "IOS" in the first slot; round 2 does not. With ALL and a
    // second condition that only holds in round 2, the first condition was
    // already removed in round 1 and must not be re-evaluated.
    let mut device = ScriptedDevice::new()
        .respond_with(["IOS", "down"])
        .respond_with(["", "up"]);
    let commands = vec![Command::new("show version"), Command::new("show interfaces")];
    let seen: Arc<std::sync::Mutex<Vec<Vec<String>>>> = Arc::default();
    let recorder = {
        let seen = Arc::clone(&seen);
        FnConditional::new("result[1] contains up", move |responses: &[String]| {
            seen.lock().unwrap().push(responses.to_vec());
            responses[1].contains("up")
        })
        .boxed()
    };
    let mut executor = RetryExecutor::new(policy(3, MatchPolicy::All));

    let outcome = executor
        .run(
            &mut device,
            &commands,
            vec![contains("result[0] contains IOS", 0, "IOS"), recorder],
        )
        .await
        .unwrap();

    assert_eq!(outcome.state, RetryState::Satisfied);
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], vec!["IOS", "down"]);
    assert_eq!(seen[1], vec!["", "up"]);
}

#[tokio::test]
async fn test_transport_error_aborts_loop() {
    let mut device = ScriptedDevice::new().fail_on_round(
        2,
        TransportError::Connection("session closed".to_string()),
    );
    let mut executor = RetryExecutor::new(policy(9, MatchPolicy::All));

    let err = executor
        .run(&mut device, &show_version(), vec![contains("c", 0, "IOS")])
        .await
        .unwrap_err();

    assert_eq!(err, TransportError::Connection("session closed".to_string()));
    assert_eq!(device.send_count(), 2);
}

#[tokio::test]
async fn test_interrupt_forces_exhausted_without_sleeping() {
    let (tx, rx) = watch::channel(false);
    tx.send(true).unwrap();
    let mut device = ScriptedDevice::new().respond_with(["no match"]);
    let mut executor = RetryExecutor::new(RetryPolicy::new(
        5,
        Duration::from_secs(3600),
        MatchPolicy::All,
    ))
    .with_interrupt(rx);

    let outcome = executor
        .run(&mut device, &show_version(), vec![contains("c", 0, "IOS")])
        .await
        .unwrap();

    assert_eq!(outcome.state, RetryState::Exhausted);
    assert!(outcome.interrupted);
    assert_eq!(device.send_count(), 1);
}

#[tokio::test]
async fn test_interrupt_during_sleep() {
    let (tx, rx) = watch::channel(false);
    let mut device = ScriptedDevice::new().respond_with(["no match"]);
    let mut executor = RetryExecutor::new(RetryPolicy::new(
        5,
        Duration::from_secs(3600),
        MatchPolicy::All,
    ))
    .with_interrupt(rx);

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let _ = tx.send(true);
    });

    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        executor.run(&mut device, &show_version(), vec![contains("c", 0, "IOS")]),
    )
    .await
    .expect("interrupt should cut the sleep short")
    .unwrap();

    assert!(outcome.interrupted);
    assert_eq!(outcome.sends, 1);
}

#[tokio::test]
async fn test_dropped_interrupt_sender_keeps_retrying() {
    let (tx, rx) = watch::channel(false);
    drop(tx);
    let mut device = ScriptedDevice::new().respond_with(["no match"]);
    let mut executor = RetryExecutor::new(policy(2, MatchPolicy::All)).with_interrupt(rx);

    let outcome = executor
        .run(&mut device, &show_version(), vec![contains("c", 0, "IOS")])
        .await
        .unwrap();

    assert!(!outcome.interrupted);
    assert_eq!(outcome.sends, 3);
}

#[test]
fn test_retry_state_strings() {
    assert_eq!(RetryState::Satisfied.as_str(), "satisfied");
    assert_eq!(RetryState::Exhausted.as_str(), "exhausted");
    assert!(!RetryState::Exhausted.is_success());
    assert!(!RetryState::Running.is_success());
}

#[test]
fn test_executor_keeps_request_policy() {
    let (_tx, rx) = watch::channel(false);
    let executor =
        RetryExecutor::new(RetryPolicy::new(4, Duration::from_millis(250), MatchPolicy::Any))
            .with_interrupt(rx);

    assert_eq!(executor.policy().retries, 4);
    assert_eq!(executor.policy().interval, Duration::from_millis(250));
    assert_eq!(executor.policy().match_policy, MatchPolicy::Any);
}
