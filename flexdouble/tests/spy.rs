// vim: tw=80
//! Spy queries over the call log.
#![deny(warnings)]

use flexdouble::*;

fn spy() -> Double {
    let d = Double::new("x");
    d.should_ignore_missing();
    d
}

#[test]
fn received() {
    let d = spy();
    d.invoke("foo", args![1], false).unwrap();
    assert!(d.received("foo", None, &Received::new()));
    assert!(d.received("foo", Some(&params![1][..]), &Received::new()));
    assert!(!d.received("foo", Some(&params![2][..]), &Received::new()));
    assert!(!d.received("bar", None, &Received::new()));
}

#[test]
fn times() {
    let d = spy();
    d.invoke("foo", args![1], false).unwrap();
    d.invoke("foo", args![2], false).unwrap();
    d.invoke("foo", args![1], false).unwrap();
    assert!(d.received("foo", None, &Received::new().times(3)));
    assert!(d.received("foo", Some(&params![1][..]), &Received::new().twice()));
    assert!(d.received("foo", Some(&params![2][..]), &Received::new().once()));
    assert!(d.received("bar", None, &Received::new().never()));
    assert!(!d.received("foo", None, &Received::new().twice()));
}

#[test]
fn with_block() {
    let d = spy();
    d.invoke("each", args![], true).unwrap();
    assert!(d.received("each", None, &Received::new().with_block(true)));
    assert!(!d.received("each", None, &Received::new().with_block(false)));
}

#[test]
fn and_validators() {
    let d = spy();
    d.invoke("log", args!["a", 1], false).unwrap();
    d.invoke("log", args!["b", 2], false).unwrap();
    let positive = |args: &[Value]| matches!(args[1], Value::Int(i) if i > 0);
    let is_a = |args: &[Value]| args[0] == Value::from("a");
    assert!(d.received("log", None, &Received::new().and(positive)));
    assert!(!d.received("log", None, &Received::new().and(is_a)));
    assert!(d.received("log", None, &Received::new().and(is_a).on_count(1)));
    assert!(!d.received("log", None, &Received::new().and(is_a).on_count(2)));
}

/// Spies see calls whether or not they matched an expectation.
#[test]
fn sees_unmatched_calls() {
    let d = Double::new("x");
    d.should_receive("foo").unwrap().with(params![1]);
    assert!(d.invoke("foo", args![2], false).is_err());
    assert!(d.received("foo", Some(&params![2][..]), &Received::new().once()));
}

/// Spy queries use the same matching rules as routing.
#[test]
fn patterns() {
    let d = spy();
    d.invoke("foo", args!["hello", 3], false).unwrap();
    assert!(d.received("foo",
                       Some(&params![matching("^h").unwrap(), kind(ValueKind::Int)][..]),
                       &Received::new()));
    assert!(!d.received("foo", Some(&params!["hello"][..]), &Received::new()));
}

#[test]
fn assert_received() {
    let d = spy();
    d.invoke("foo", args![2], false).unwrap();
    d.assert_received("foo", Some(&params![2][..]), &Received::new().once()).unwrap();
    let e = d.assert_received("foo", Some(&params![1][..]), &Received::new().once())
        .unwrap_err();
    assert!(matches!(e, Error::NotReceived(_)));
    assert_eq!(
"expected foo(1) to be called on double 'x' once.
The following messages have been received:
    foo(2)", e.to_string());
}

#[test]
fn assert_received_nothing_received() {
    let d = spy();
    let e = d.assert_received("foo", None, &Received::new().with_block(true))
        .unwrap_err();
    assert_eq!(
"expected foo(...) with a block to be called on double 'x'.
No messages have been received", e.to_string());
}

#[test]
fn assert_not_received() {
    let d = spy();
    d.invoke("foo", args![2], false).unwrap();
    d.assert_not_received("foo", Some(&params![1][..]), &Received::new()).unwrap();
    let e = d.assert_not_received("foo", None, &Received::new()).unwrap_err();
    assert_eq!(
"expected foo(...) not to be called on double 'x', but it was called once.
The following messages have been received:
    foo(2)", e.to_string());
}
