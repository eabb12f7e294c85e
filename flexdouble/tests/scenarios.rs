// vim: tw=80
//! End-to-end usage of a double.
#![deny(warnings)]

use flexdouble::*;

#[test]
fn query_and_update() {
    let db = Double::new("db");
    db.should_receive("query").unwrap().and_return(vec![1, 2, 3]);
    db.should_receive("update").unwrap()
        .with(params![5])
        .and_return(())
        .once();

    for _ in 0..3 {
        assert_eq!(Value::from(vec![1, 2, 3]),
                   db.invoke("query", args![], false).unwrap());
    }
    assert_eq!(Value::Nil, db.invoke("update", args![5], false).unwrap());
    db.verify().unwrap();
}

#[test]
fn query_and_update_with_wrong_argument() {
    let db = Double::new("db");
    db.should_receive("query").unwrap().and_return(vec![1, 2, 3]);
    db.should_receive("update").unwrap()
        .with(params![5])
        .and_return(())
        .once();

    match db.invoke("update", args![6], false) {
        Err(Error::NoMatchingHandler{double, method, call, ..}) => {
            assert_eq!("db", double);
            assert_eq!("update", method);
            assert_eq!("update(6)", call);
        },
        r => panic!("Unexpected result {r:?}"),
    }
}

#[test]
fn gets() {
    let io = Double::new("io");
    io.should_receive("gets").unwrap()
        .with_no_args()
        .and_return_values(["line 1\n", "line 2\n"]);
    let gets = || io.invoke("gets", args![], false).unwrap();
    assert_eq!(Value::from("line 1\n"), gets());
    assert_eq!(Value::from("line 2\n"), gets());
    assert_eq!(Value::from("line 2\n"), gets());
}

#[test]
fn divide_by_zero() {
    let calc = Double::new("calc");
    calc.should_receive("divide_by").unwrap()
        .with(params![0])
        .and_return_undefined();
    let r = calc.invoke("divide_by", args![0], false).unwrap();
    assert!(r.is_undefined());
    assert!(r.invoke("round", args![]).unwrap().is_undefined());
    assert!(r.invoke("anything", args!["at", "all"]).unwrap().is_undefined());
}

#[test]
fn ignore_missing() {
    let d = Double::new("d");
    d.should_ignore_missing();
    assert!(d.invoke("foo", args![], false).unwrap().is_undefined());
    assert!(d.invoke("bar", args![1, 2], true).unwrap().is_undefined());
    d.verify().unwrap();
    assert_eq!(None, d.calls()[0].matched_by());
}

#[test]
fn missing_method() {
    let d = Double::new("d");
    match d.invoke("foo", args![1], false) {
        Err(Error::NoSuchMethod{double, method, call}) => {
            assert_eq!("d", double);
            assert_eq!("foo", method);
            assert_eq!("foo(1)", call);
        },
        r => panic!("Unexpected result {r:?}"),
    }
}

/// Failed calls remain in the log.
#[test]
fn calls_logged_before_routing() {
    let d = Double::new("d");
    d.should_receive("foo").unwrap().with(params![1]).and_return(1);
    d.invoke("foo", args![1], false).unwrap();
    assert!(d.invoke("foo", args![2], false).is_err());
    assert!(d.invoke("bar", args![], true).is_err());
    let calls = d.calls();
    assert_eq!(3, calls.len());
    assert_eq!(Some("foo(1)"), calls[0].matched_by());
    assert_eq!("foo(2)", calls[1].to_string());
    assert_eq!(None, calls[1].matched_by());
    assert_eq!("bar() with a block", calls[2].to_string());
}

#[test]
fn clones_share_state() {
    let d = Double::new("d");
    let d2 = d.clone();
    d.should_receive("foo").unwrap().once();
    d2.invoke("foo", args![], false).unwrap();
    d.verify().unwrap();
    assert!(d.ptr_eq(&d2));
}

#[test]
fn calls_from_another_thread() {
    let d = Double::new("d");
    d.should_receive("foo").unwrap().twice().and_return(1);
    let d2 = d.clone();
    std::thread::spawn(move || {
        d2.invoke("foo", args![], false).unwrap();
    }).join().unwrap();
    d.invoke("foo", args![], false).unwrap();
    d.verify().unwrap();
}

#[test]
fn ill_formed_name() {
    let d = Double::new("d");
    for name in ["", "foo bar", "3d", "a..b", "foo??"] {
        match d.should_receive(name) {
            Err(Error::Usage(msg)) =>
                assert!(msg.starts_with("Ill-formed method name"), "{msg}"),
            _ => panic!("{name:?} was accepted"),
        }
    }
}

#[test]
fn operator_and_suffixed_names() {
    let d = Double::new("d");
    for name in ["[]", "==", "<=>", "valid?", "save!", "name="] {
        d.should_receive(name).unwrap().and_return(name);
        assert_eq!(Value::from(name), d.invoke(name, args![], false).unwrap());
    }
}
