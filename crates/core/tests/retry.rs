use std::time::Duration;

use pretty_assertions::assert_eq;
use timeliner_core::retry::RetryPolicy;

#[test]
fn test_delay_clamps_to_last_entry() {
    let policy = RetryPolicy::escalating(vec![Duration::from_secs(1), Duration::from_secs(5)]);
    assert_eq!(policy.delay(0), Duration::from_secs(1));
    assert_eq!(policy.delay(1), Duration::from_secs(5));
    assert_eq!(policy.delay(7), Duration::from_secs(5));
    assert_eq!(RetryPolicy::new(Vec::new(), 3).delay(0), Duration::ZERO);
}

#[test]
fn test_run_exhausts_budget() {
    let policy = RetryPolicy::fixed(Duration::from_millis(10), 3);
    let mut log: Vec<String> = Vec::new();
    let result: Result<Option<()>, ()> = policy.run(
        &mut log,
        |log, n| {
            log.push(format!("check {n}"));
            Ok(None)
        },
        |log, n, delay| {
            log.push(format!("recover {n} {}", delay.as_millis()));
            Ok(())
        },
    );
    assert_eq!(result, Ok(None));
    assert_eq!(
        log,
        vec![
            "check 0",
            "recover 0 10",
            "check 1",
            "recover 1 10",
            "check 2",
            "recover 2 10",
            "check 3",
        ]
    );
}

#[test]
fn test_run_stops_when_settled() {
    let policy = RetryPolicy::fixed(Duration::ZERO, 10);
    let mut recoveries = 0usize;
    let result: Result<Option<usize>, ()> = policy.run(
        &mut recoveries,
        |recoveries, n| Ok((*recoveries == 2).then_some(n)),
        |recoveries, _, _| {
            *recoveries += 1;
            Ok(())
        },
    );
    assert_eq!(result, Ok(Some(2)));
    assert_eq!(recoveries, 2);
}

#[test]
fn test_run_propagates_recover_error() {
    let policy = RetryPolicy::fixed(Duration::ZERO, 4);
    let result: Result<Option<()>, &str> =
        policy.run(&mut (), |_, _| Ok(None), |_, _, _| Err("driver gone"));
    assert_eq!(result, Err("driver gone"));
}
