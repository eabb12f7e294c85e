// vim: tw=80
//! Return programs: constants, sequences, computed values, and the undefined
//! sentinel.
#![deny(warnings)]

use std::{cell::Cell, rc::Rc};

use flexdouble::*;

fn call(d: &Double, method: &str, args: Vec<Value>) -> Value {
    d.invoke(method, args, false).unwrap()
}

#[test]
fn constant() {
    let d = Double::new("d");
    d.should_receive("foo").unwrap().and_return(42);
    for _ in 0..3 {
        assert_eq!(Value::from(42), call(&d, "foo", args![]));
    }
}

#[test]
fn default_is_undefined() {
    let d = Double::new("d");
    let _ = d.should_receive("foo").unwrap();
    assert!(call(&d, "foo", args![]).is_undefined());
}

#[test]
fn sequence_last_value_is_sticky() {
    let d = Double::new("d");
    d.should_receive("foo").unwrap().and_return_values([1, 2, 3]);
    let values = (0..5)
        .map(|_| call(&d, "foo", args![]))
        .collect::<Vec<_>>();
    assert_eq!(args![1, 2, 3, 3, 3], values);
}

#[test]
fn empty_sequence() {
    let d = Double::new("d");
    d.should_receive("foo").unwrap()
        .and_return_values(Vec::<Value>::new());
    assert_eq!(Value::Nil, call(&d, "foo", args![]));
}

#[test]
fn last_declarator_wins() {
    let d = Double::new("d");
    d.should_receive("foo").unwrap()
        .and_return(1)
        .and_return("two");
    assert_eq!(Value::from("two"), call(&d, "foo", args![]));
}

#[test]
fn returning_uses_arguments() {
    let d = Double::new("d");
    d.should_receive("add").unwrap()
        .returning(|args| match (&args[0], &args[1]) {
            (Value::Int(a), Value::Int(b)) => Value::from(a + b),
            _ => Value::Nil,
        });
    assert_eq!(Value::from(5), call(&d, "add", args![2, 3]));
    assert_eq!(Value::from(9), call(&d, "add", args![4, 5]));
}

#[test]
fn returning_is_called_afresh() {
    let d = Double::new("d");
    let mut n = 0;
    d.should_receive("next").unwrap()
        .returning(move |_| {
            n += 1;
            Value::from(n)
        });
    assert_eq!(Value::from(1), call(&d, "next", args![]));
    assert_eq!(Value::from(2), call(&d, "next", args![]));
}

#[test]
fn returning_st() {
    let counter = Rc::new(Cell::new(0));
    let c2 = counter.clone();
    let d = Double::new("d");
    d.should_receive("tick").unwrap()
        .returning_st(move |_| {
            c2.set(c2.get() + 1);
            Value::from(c2.get())
        });
    call(&d, "tick", args![]);
    call(&d, "tick", args![]);
    assert_eq!(2, counter.get());
}

/// A return program may call back into its own double.
#[test]
fn reentrant_return_program() {
    let d = Double::new("d");
    let inner = d.clone();
    d.should_receive("inner").unwrap().and_return(7);
    d.should_receive("outer").unwrap()
        .returning(move |_| inner.invoke("inner", args![], false).unwrap());
    assert_eq!(Value::from(7), call(&d, "outer", args![]));
}

/// A `returning_fn` program may call its own expectation.
#[test]
fn recursive_return_program() {
    let d = Double::new("math");
    let inner = d.clone();
    d.should_receive("fact").unwrap()
        .returning_fn(move |args| match args[0] {
            Value::Int(n) if n > 1 => {
                match inner.invoke("fact", args![n - 1], false).unwrap() {
                    Value::Int(f) => Value::from(n * f),
                    other => other,
                }
            },
            _ => Value::from(1),
        })
        .times(3);
    assert_eq!(Value::from(6), call(&d, "fact", args![3]));
    d.verify().unwrap();
}

/// An `FnMut` program can't run inside itself; the inner call fails instead
/// of blocking.
#[test]
fn self_reentrant_returning() {
    let d = Double::new("d");
    let inner = d.clone();
    d.should_receive("foo").unwrap()
        .returning(move |_| match inner.invoke("foo", args![], false) {
            Err(Error::Usage(msg)) => Value::from(msg),
            r => panic!("Unexpected result {r:?}"),
        });
    match call(&d, "foo", args![]) {
        Value::Str(msg) => assert!(msg.contains("called itself"), "{msg}"),
        v => panic!("Unexpected value {v:?}"),
    }
}

#[test]
fn self_reentrant_returning_st() {
    let d = Double::new("d");
    let inner = d.clone();
    d.should_receive("foo").unwrap()
        .returning_st(move |_| match inner.invoke("foo", args![], false) {
            Err(Error::Usage(msg)) => Value::from(msg),
            r => panic!("Unexpected result {r:?}"),
        });
    match call(&d, "foo", args![]) {
        Value::Str(msg) => assert!(msg.contains("called itself"), "{msg}"),
        v => panic!("Unexpected value {v:?}"),
    }
}

#[test]
fn and_raise() {
    let d = Double::new("d");
    d.should_receive("fetch").unwrap().and_raise("connection refused");
    match d.invoke("fetch", args![], false) {
        Err(Error::Raised{double, method, message}) => {
            assert_eq!("d", double);
            assert_eq!("fetch", method);
            assert_eq!("connection refused", message);
        },
        r => panic!("Unexpected result {r:?}"),
    }
}

/// A raising call still counts.
#[test]
fn and_raise_is_counted() {
    let d = Double::new("d");
    d.should_receive("fetch").unwrap().and_raise("boom").once();
    assert!(d.invoke("fetch", args![], false).is_err());
    d.verify().unwrap();
}

#[test]
fn undefined_propagates() {
    let d = Double::new("d");
    d.should_receive("foo").unwrap().and_return_undefined();
    let v = call(&d, "foo", args![]);
    assert_eq!(Value::Undefined, v);
    let v = v.invoke("bar", args![1]).unwrap();
    assert_eq!(Value::Undefined, v.invoke("baz", args![]).unwrap());
}

#[test]
fn undefined_displays_as_bottom() {
    assert_eq!("BOTTOM", Value::Undefined.to_string());
}

#[test]
fn doubles_can_return_doubles() {
    let d = Double::new("d");
    let child = Double::new("child");
    child.should_receive("name").unwrap().and_return("child");
    d.should_receive("child").unwrap().and_return(Value::object(child.clone()));
    let v = call(&d, "child", args![]);
    assert_eq!(Some(&child).map(Double::name),
               v.downcast_ref::<Double>().map(Double::name));
    assert_eq!(Value::from("child"), v.invoke("name", args![]).unwrap());
}

#[test]
fn should_receive_map() {
    let d = Double::new("d");
    let _ = d.should_receive_map([("a", Value::from(1)), ("b", Value::from("x"))])
        .unwrap();
    assert_eq!(Value::from(1), call(&d, "a", args![]));
    assert_eq!(Value::from("x"), call(&d, "b", args![]));
}

#[test]
fn should_receive_all() {
    let d = Double::new("d");
    d.should_receive_all(["a", "b"]).unwrap()
        .and_return(true)
        .once();
    assert_eq!(Value::from(true), call(&d, "a", args![]));
    assert!(d.verify().is_err());
}
