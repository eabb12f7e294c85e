// vim: tw=80
//! Call-count policies: eligibility during routing, validity at verification.
#![deny(warnings)]

use flexdouble::*;
use pretty_assertions::assert_eq;

fn call(d: &Double, method: &str) -> Value {
    d.invoke(method, args![], false).unwrap()
}

fn violations(d: &Double) -> Vec<CountViolation> {
    match d.verify() {
        Ok(()) => Vec::new(),
        Err(Error::CountViolation{violations, ..}) => violations,
        Err(e) => panic!("Unexpected error {e}"),
    }
}

#[test]
fn unconstrained() {
    let d = Double::new("d");
    let _ = d.should_receive("foo").unwrap();
    for _ in 0..10 {
        call(&d, "foo");
    }
    d.verify().unwrap();
}

#[test]
fn unconstrained_and_never_called() {
    let d = Double::new("d");
    let _ = d.should_receive("foo").unwrap();
    d.verify().unwrap();
}

mod exact {
    use super::*;
    use pretty_assertions::assert_eq;

    fn double(n: usize) -> Double {
        let d = Double::new("d");
        d.should_receive("foo").unwrap().times(n);
        d
    }

    #[test]
    fn satisfied() {
        let d = double(3);
        for _ in 0..3 {
            call(&d, "foo");
        }
        d.verify().unwrap();
    }

    #[test]
    fn too_few() {
        let d = double(3);
        call(&d, "foo");
        call(&d, "foo");
        assert_eq!(vec![CountViolation {
            expectation: "foo(...)".to_string(),
            policy: CountPolicy::Exact(3),
            actual: 2,
        }], violations(&d));
    }

    /// The excess call is still routed to the exhausted expectation, and
    /// reported at verification.
    #[test]
    fn too_many() {
        let d = Double::new("d");
        d.should_receive("foo").unwrap().once().and_return(5);
        assert_eq!(Value::from(5), call(&d, "foo"));
        assert_eq!(Value::from(5), call(&d, "foo"));
        assert_eq!(vec![CountViolation {
            expectation: "foo(...)".to_string(),
            policy: CountPolicy::Exact(1),
            actual: 2,
        }], violations(&d));
    }

    #[test]
    fn never() {
        let d = Double::new("d");
        d.should_receive("foo").unwrap().never();
        d.verify().unwrap();

        let d = Double::new("d");
        d.should_receive("foo").unwrap().never();
        call(&d, "foo");
        assert_eq!(1, violations(&d).len());
    }

    #[test]
    fn twice() {
        let d = Double::new("d");
        d.should_receive("foo").unwrap().twice();
        call(&d, "foo");
        call(&d, "foo");
        d.verify().unwrap();
    }
}

#[test]
fn at_least() {
    for n in 0..6 {
        let d = Double::new("d");
        d.should_receive("foo").unwrap().at_least().twice();
        for _ in 0..n {
            call(&d, "foo");
        }
        assert_eq!(n >= 2, d.verify().is_ok(), "{n} calls");
    }
}

#[test]
fn at_most() {
    for n in 0..5 {
        let d = Double::new("d");
        d.should_receive("foo").unwrap().at_most().twice();
        for _ in 0..n {
            call(&d, "foo");
        }
        assert_eq!(n <= 2, d.verify().is_ok(), "{n} calls");
    }
}

/// Once an AtMost expectation is exhausted, later matching expectations take
/// over.
#[test]
fn at_most_overflows_into_next_expectation() {
    let d = Double::new("d");
    d.should_receive("foo").unwrap().at_most().once().and_return(1);
    d.should_receive("foo").unwrap().and_return(2);
    assert_eq!(Value::from(1), call(&d, "foo"));
    assert_eq!(Value::from(2), call(&d, "foo"));
    assert_eq!(Value::from(2), call(&d, "foo"));
    d.verify().unwrap();
}

#[test]
fn exhausted_exact_overflows_into_next_expectation() {
    let d = Double::new("d");
    d.should_receive("foo").unwrap().with(params![1]).once().and_return("a");
    d.should_receive("foo").unwrap().with(params![1]).once().and_return("b");
    assert_eq!(Value::from("a"), d.invoke("foo", args![1], false).unwrap());
    assert_eq!(Value::from("b"), d.invoke("foo", args![1], false).unwrap());
    d.verify().unwrap();
}

#[test]
fn bounds_accumulate() {
    let declare = || {
        let d = Double::new("d");
        d.should_receive("foo").unwrap()
            .at_least().once()
            .at_most().times(3);
        d
    };

    let d = declare();
    assert_eq!(vec![CountViolation {
        expectation: "foo(...)".to_string(),
        policy: CountPolicy::AtLeast(1),
        actual: 0,
    }], violations(&d));

    for n in 1..=3 {
        let d = declare();
        for _ in 0..n {
            call(&d, "foo");
        }
        d.verify().unwrap();
    }

    let d = declare();
    for _ in 0..4 {
        call(&d, "foo");
    }
    assert_eq!(vec![CountViolation {
        expectation: "foo(...)".to_string(),
        policy: CountPolicy::AtMost(3),
        actual: 4,
    }], violations(&d));
}

#[test]
fn zero_or_more_times() {
    for n in 0..3 {
        let d = Double::new("d");
        d.should_receive("foo").unwrap().zero_or_more_times();
        for _ in 0..n {
            call(&d, "foo");
        }
        d.verify().unwrap();
    }
}

#[test]
fn times_range() {
    for n in 0..6 {
        let d = Double::new("d");
        d.should_receive("foo").unwrap().times_range(2..4);
        for _ in 0..n {
            call(&d, "foo");
        }
        assert_eq!((2..4).contains(&n), d.verify().is_ok(), "{n} calls");
    }
}

#[test]
#[should_panic(expected = "times_range(3..3) admits no call count")]
fn times_range_empty() {
    let d = Double::new("d");
    d.should_receive("foo").unwrap().times_range(3..3);
}

#[test]
#[should_panic(expected = "AtMost declared while AtLeast still awaits a count")]
fn stacked_modifiers() {
    let d = Double::new("d");
    d.should_receive("foo").unwrap().at_least().at_most();
}

/// Every violation of every expectation is reported at once.
#[test]
fn all_violations_reported() {
    let d = Double::new("d");
    d.should_receive("foo").unwrap().once();
    d.should_receive("bar").unwrap().twice();
    d.should_receive("baz").unwrap().once();
    call(&d, "baz");
    let v = violations(&d);
    assert_eq!(vec!["bar(...)", "foo(...)"],
               v.iter().map(|v| v.expectation.as_str()).collect::<Vec<_>>());
}

#[test]
fn verify_is_idempotent() {
    let d = Double::new("d");
    d.should_receive("foo").unwrap().once();
    assert!(d.verify().is_err());
    d.verify().unwrap();
    assert_eq!(Phase::Verifying, d.phase());
}

#[test]
fn count_tracked_per_expectation() {
    let d = Double::new("d");
    d.should_receive("foo").unwrap().with(params![1]).once();
    d.should_receive("foo").unwrap().with(params![2]).twice();
    d.invoke("foo", args![2], false).unwrap();
    d.invoke("foo", args![1], false).unwrap();
    d.invoke("foo", args![2], false).unwrap();
    d.verify().unwrap();
}

#[test]
fn by_default_is_not_verified() {
    let d = Double::new("d");
    d.should_receive("foo").unwrap().once().by_default();
    d.verify().unwrap();
}

#[test]
fn message() {
    let d = Double::new("db");
    d.should_receive("update").unwrap().with(params![5]).once();
    let _ = d.should_receive("query").unwrap();
    d.invoke("query", args![], false).unwrap();
    let msg = d.verify().unwrap_err().to_string();
    assert_eq!(
"in double 'db': verification failed
  method 'update(5)' called incorrect number of times
    expected: exactly once
    actual:   never
The following messages have been received by double 'db':
    query() matched by query(...)
", msg);
}
