use super::*;

const LIMIT: u32 = 5;
const WINDOW: Duration = Duration::from_millis(1000);

fn limiter() -> RateLimiter {
    RateLimiter::new(LIMIT, WINDOW)
}

#[test]
fn allows_up_to_limit() {
    let rl = limiter();
    let client = Uuid::new_v4();
    let now = Instant::now();

    for i in 0..LIMIT {
        assert!(rl.check_and_record_at(client, now).is_ok(), "message {i} should pass");
    }
    assert!(matches!(
        rl.check_and_record_at(client, now),
        Err(RateLimitError::Exceeded { limit: LIMIT, .. })
    ));
}

#[test]
fn rejected_messages_do_not_extend_the_window() {
    let rl = limiter();
    let client = Uuid::new_v4();
    let start = Instant::now();

    for _ in 0..LIMIT {
        rl.check_and_record_at(client, start).unwrap();
    }
    for ms in [100, 500, 999] {
        assert!(rl.check_and_record_at(client, start + Duration::from_millis(ms)).is_err());
    }
    assert!(rl.check_and_record_at(client, start + WINDOW).is_ok());
}

#[test]
fn window_resets_counter() {
    let rl = limiter();
    let client = Uuid::new_v4();
    let start = Instant::now();

    for _ in 0..LIMIT {
        rl.check_and_record_at(client, start).unwrap();
    }
    let next = start + WINDOW + Duration::from_millis(1);
    for _ in 0..LIMIT {
        assert!(rl.check_and_record_at(client, next).is_ok());
    }
    assert!(rl.check_and_record_at(client, next).is_err());
}

#[test]
fn distinct_clients_do_not_interfere() {
    let rl = limiter();
    let client_a = Uuid::new_v4();
    let client_b = Uuid::new_v4();
    let now = Instant::now();

    for _ in 0..LIMIT {
        rl.check_and_record_at(client_a, now).unwrap();
    }
    assert!(rl.check_and_record_at(client_a, now).is_err());
    assert!(rl.check_and_record_at(client_b, now).is_ok());
}

#[test]
fn forget_releases_state() {
    let rl = limiter();
    let client = Uuid::new_v4();
    let now = Instant::now();
    for _ in 0..LIMIT {
        rl.check_and_record_at(client, now).unwrap();
    }
    rl.forget(client);
    assert_eq!(rl.tracked(), 0);
    assert!(rl.check_and_record_at(client, now).is_ok());
}
