// vim: tw=80
//! Configuring what a handler returns

use std::{cell::Cell, rc::Rc};

use rmock::*;

#[test]
fn no_response_is_unit() {
    let mock = Mock::new();
    mock.stub_call("reset", patterns![]);
    let v = mock.double().call("reset", args![]);
    assert!(v.is_none());
    v.get::<()>();
}

#[test]
fn returning() {
    let mock = Mock::new();
    let mut calls = 0u32;
    mock.stub_call("next", patterns![]).returning(move || {
        calls += 1;
        calls * 10
    });
    let double = mock.double();
    assert_eq!(10, double.call("next", args![]).get::<u32>());
    assert_eq!(20, double.call("next", args![]).get::<u32>());
}

#[test]
fn return_once_non_clone() {
    struct NonClone(u32);
    let mock = Mock::new();
    mock.stub_call("take", patterns![]).return_once(|| NonClone(5));
    let r = mock.double().call("take", args![]).get::<NonClone>();
    assert_eq!(5, r.0);
}

#[test]
#[should_panic(expected = "Called a method twice that was expected only once")]
fn return_once_twice() {
    let mock = Mock::new();
    mock.stub_call("take", patterns![]).return_once(|| 5u32);
    let double = mock.double();
    double.call("take", args![]);
    double.call("take", args![]);
}

#[test]
fn returning_st() {
    let counter = Rc::new(Cell::new(0));
    let c = counter.clone();
    let mock = Mock::new();
    mock.stub_call("bump", patterns![]).returning_st(move || {
        c.set(c.get() + 1);
        c.get()
    });
    let double = mock.double();
    double.call("bump", args![]);
    assert_eq!(2, double.call("bump", args![]).get::<i32>());
    assert_eq!(2, counter.get());
}

#[test]
fn return_once_st() {
    let rc = Rc::new(42u32);
    let mock = Mock::new();
    mock.stub_call("take", patterns![]).return_once_st(move || rc);
    let r = mock.double().call("take", args![]).get::<Rc<u32>>();
    assert_eq!(42, *r);
}

#[test]
fn explicit_no_value() {
    let mock = Mock::new();
    mock.stub_call("find", patterns![]).will(Value::none);
    assert!(mock.double().call("find", args![]).is_none());
}

#[test]
fn last_configuration_wins() {
    let mock = Mock::new();
    mock.stub_call("n", patterns![])
        .return_const(1u8)
        .returning(|| 2u8);
    assert_eq!(2, mock.double().call("n", args![]).get::<u8>());
}

#[test]
fn configure_after_registration() {
    let mock = Mock::new();
    let handle = mock.stub_call("n", patterns![]);
    let double = mock.double();
    assert!(double.call("n", args![]).is_none());
    handle.return_const(3u8);
    assert_eq!(3, double.call("n", args![]).get::<u8>());
}

#[test]
fn wrong_type() {
    let mock = Mock::new();
    mock.stub_call("n", patterns![]).return_const(1u8);
    let e = mock.double().call("n", args![]).downcast::<String>().unwrap_err();
    assert!(matches!(e, Error::ValueType{found: "u8", ..}));
}

/// A response may call back into the same double
#[test]
fn reentrant_response() {
    let mock = Mock::new();
    mock.stub_call("inner", patterns![]).return_const(5u32);
    let double = mock.double();
    let d = double.clone();
    mock.stub_call("outer", patterns![])
        .returning(move || d.call("inner", args![]).get::<u32>() + 1);
    assert_eq!(6, double.call("outer", args![]).get::<u32>());
}

/// A response that selects its own handler again fails instead of hanging
#[test]
fn recursive_response() {
    let mock = Mock::new();
    let double = mock.double();
    let d = double.clone();
    mock.stub_call("walk", patterns![anything()])
        .returning(move || d.try_call("walk", args![1u32]).map(|_| ()));
    let r = double.call("walk", args![0u32]).get::<Result<(), Error>>();
    assert!(matches!(r, Err(Error::RecursiveCall{ref method, ..}) if method == "walk"));
}

#[test]
#[should_panic(expected = "response of walk(anything) called walk recursively")]
fn recursive_response_panics() {
    let mock = Mock::new();
    let d = mock.double();
    mock.stub_call("walk", patterns![anything()])
        .returning(move || d.call("walk", args![1u32]).get::<u32>());
    mock.double().call("walk", args![0u32]);
}

/// A panicking response doesn't break later calls to its handler
#[test]
fn response_panics_once() {
    let mock = Mock::new();
    let mut first = true;
    mock.stub_call("flaky", patterns![]).returning(move || {
        if std::mem::take(&mut first) {
            panic!("flaky failed");
        }
        "ok"
    });
    let double = mock.double();
    let r = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        double.call("flaky", args![]);
    }));
    assert!(r.is_err());
    assert_eq!("ok", double.call("flaky", args![]).get::<&str>());
}

/// A response may register more handlers on its own mock
#[test]
fn response_registers_handlers() {
    let mock = Mock::new();
    let m = mock.clone();
    mock.stub_call("login", patterns![]).returning(move || {
        m.stub_call("whoami", patterns![]).return_const("root");
    });
    let double = mock.double();
    assert!(double.try_call("whoami", args![]).is_err());
    double.call("login", args![]);
    assert_eq!("root", double.call("whoami", args![]).get::<&str>());
}
