// vim: tw=80
//! Ordered expectations and ordering groups.
#![deny(warnings)]

use flexdouble::*;

/// a is ordered, b and c share a group, d is ordered again.
fn abcd() -> Double {
    let d = Double::new("d");
    d.should_receive("a").unwrap().ordered();
    d.should_receive("b").unwrap().ordered_in("g");
    d.should_receive("c").unwrap().ordered_in("g");
    d.should_receive("d").unwrap().ordered();
    d
}

fn call(d: &Double, method: &str) -> Result<Value> {
    d.invoke(method, args![], false)
}

#[test]
fn order_numbers() {
    let d = Double::new("d");
    let mut a = d.should_receive("a").unwrap();
    a.ordered();
    let mut b = d.should_receive("b").unwrap();
    b.ordered_in("g");
    let mut c = d.should_receive("c").unwrap();
    c.ordered_in("g");
    let mut e = d.should_receive("e").unwrap();
    e.ordered();
    let plain = d.should_receive("f").unwrap();
    assert_eq!(Some(1), a.order_number());
    assert_eq!(Some(2), b.order_number());
    assert_eq!(Some(2), c.order_number());
    assert_eq!(Some(3), e.order_number());
    assert_eq!(None, plain.order_number());
}

#[test]
fn in_order() {
    let d = abcd();
    for m in ["a", "b", "c", "d"] {
        call(&d, m).unwrap();
    }
    d.verify().unwrap();
}

#[test]
fn group_members_in_any_order() {
    let d = abcd();
    for m in ["a", "c", "b", "d"] {
        call(&d, m).unwrap();
    }
}

#[test]
fn group_members_interleave() {
    let d = abcd();
    for m in ["a", "c", "b", "c", "b", "d"] {
        call(&d, m).unwrap();
    }
}

#[test]
fn out_of_order() {
    let d = abcd();
    call(&d, "a").unwrap();
    call(&d, "d").unwrap();
    match call(&d, "b") {
        Err(Error::OrderViolation{call, expected, current, ..}) => {
            assert_eq!("b()", call);
            assert_eq!(2, expected);
            assert_eq!(3, current);
        },
        r => panic!("Unexpected result {r:?}"),
    }
}

#[test]
fn repeated_slot_is_allowed() {
    let d = abcd();
    for m in ["a", "a", "b", "d", "d"] {
        call(&d, m).unwrap();
    }
}

#[test]
fn skipped_slots_are_allowed() {
    let d = abcd();
    call(&d, "a").unwrap();
    call(&d, "d").unwrap();
}

#[test]
fn unordered_calls_are_unconstrained() {
    let d = abcd();
    let _ = d.should_receive("x").unwrap();
    for m in ["x", "a", "x", "d", "x"] {
        call(&d, m).unwrap();
    }
}

/// Expectations of the same method with different arguments are ordered too.
#[test]
fn same_method_different_arguments() {
    let d = Double::new("d");
    d.should_receive("send").unwrap().with(params![1]).ordered();
    d.should_receive("send").unwrap().with(params![2]).ordered();
    d.invoke("send", args![2], false).unwrap();
    assert!(matches!(d.invoke("send", args![1], false),
                     Err(Error::OrderViolation{..})));
}

/// A call rejected for its order is logged, but not counted.
#[test]
fn violation_is_logged_not_counted() {
    let d = Double::new("d");
    d.should_receive("a").unwrap().ordered().once();
    d.should_receive("b").unwrap().ordered();
    call(&d, "b").unwrap();
    assert!(call(&d, "a").is_err());
    assert_eq!(2, d.calls().len());
    assert_eq!(None, d.calls()[1].matched_by());
    assert!(matches!(d.verify(), Err(Error::CountViolation{..})));
}

#[test]
#[should_panic(expected = "is already ordered")]
fn ordered_twice() {
    let d = Double::new("d");
    d.should_receive("a").unwrap().ordered().ordered_in("g");
}

/// Each double keeps its own order.
#[test]
fn ordering_is_per_double() {
    let d1 = Double::new("d1");
    let d2 = Double::new("d2");
    d1.should_receive("a").unwrap().ordered();
    d1.should_receive("b").unwrap().ordered();
    d2.should_receive("a").unwrap().ordered();
    d2.should_receive("b").unwrap().ordered();
    call(&d1, "b").unwrap();
    call(&d2, "a").unwrap();
    call(&d2, "b").unwrap();
}
