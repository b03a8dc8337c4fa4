use std::time::Duration;

use skilltrack::rate_limit::LoginRateLimiter;

#[test]
fn allows_until_five_failures() {
    let limiter = LoginRateLimiter::new();

    for _ in 0..4 {
        limiter.record_failure("user@example.com");
        assert!(limiter.check("user@example.com").is_ok());
    }

    limiter.record_failure("user@example.com");
    let wait = limiter.check("user@example.com").unwrap_err();
    assert!(wait > 0 && wait <= 15 * 60);
}

#[test]
fn keys_ignore_case_and_whitespace() {
    let limiter = LoginRateLimiter::new();

    for _ in 0..5 {
        limiter.record_failure(" User@Example.com");
    }
    assert!(limiter.check("user@example.com").is_err());
    assert!(limiter.check("other@example.com").is_ok());
}

#[test]
fn reset_clears_failures() {
    let limiter = LoginRateLimiter::new();

    for _ in 0..5 {
        limiter.record_failure("user@example.com");
    }
    limiter.reset("user@example.com");

    assert!(limiter.check("user@example.com").is_ok());
    assert!(limiter.is_empty());
}

#[test]
fn cleanup_drops_old_windows() {
    let limiter = LoginRateLimiter::new();
    limiter.record_failure("a@example.com");
    limiter.record_failure("b@example.com");
    assert_eq!(limiter.len(), 2);

    limiter.cleanup(Duration::from_secs(3600));
    assert_eq!(limiter.len(), 2);

    limiter.cleanup(Duration::ZERO);
    assert!(limiter.is_empty());
}
