// vim: tw=80
//! Dynamic test doubles for Rust.
//!
//! Flexdouble creates stand-in objects for the collaborators of the code under
//! test.  A [`Double`] answers calls by name, according to the expectations
//! declared on it, records every call it receives, and checks at the end of
//! the test that each expectation was called as often as it should have been.
//!
//! # Usage
//!
//! * Create a [`Double`], usually through a [`Container`] that verifies and
//!   tears it down when the test ends.
//! * Declare expectations with [`Double::should_receive`].  Each expectation
//!   may constrain the arguments it accepts, how many times it may be called,
//!   and where it sits in the call order, and it says what to return.
//! * Hand the double to the code under test.  Calls reach it through
//!   [`Double::invoke`], or through a typed adapter generated by
//!   [`#[automock]`](automock).
//! * Verify.  Every count violation of every expectation is reported at once,
//!   along with the full call log.
//!
//! ```
//! use flexdouble::*;
//!
//! let mut c = Container::new();
//! let db = c.double("db");
//! db.should_receive("query").unwrap().and_return(vec![1, 2, 3]);
//! db.should_receive("update").unwrap()
//!     .with(params![5])
//!     .and_return(())
//!     .once();
//!
//! assert_eq!(Value::from(vec![1, 2, 3]),
//!            db.invoke("query", args![], false).unwrap());
//! db.invoke("update", args![5], false).unwrap();
//! c.close().unwrap();
//! ```
//!
//! # Matching arguments
//!
//! [`with`](ExpectationHandle::with) takes one [`ArgPattern`] per argument.
//! [`params!`] turns plain values into equality patterns, and the pattern
//! constructors ([`any`], [`kind`], [`ducktype`], [`matching`], [`hsh`],
//! [`on`], [`pred`], [`optional_proc`]) cover the rest.  Any
//! [`Predicate`] from the [`predicates`](predicate) crate can be used through
//! [`pred`].
//!
//! When several expectations of a method match a call, the first declared one
//! that can still accept calls handles it.  If they are all exhausted, the
//! first matching one handles it anyway, and verification reports the excess.
//!
//! # Call counts
//!
//! Without a count declarator an expectation accepts any number of calls.
//! [`times`](ExpectationHandle::times), [`once`](ExpectationHandle::once),
//! [`twice`](ExpectationHandle::twice) and [`never`](ExpectationHandle::never)
//! require an exact count; [`at_least`](ExpectationHandle::at_least) and
//! [`at_most`](ExpectationHandle::at_most) turn the next one into a bound.
//! Bounds accumulate:
//!
//! ```
//! # use flexdouble::*;
//! let d = Double::new("d");
//! d.should_receive("poll").unwrap()
//!     .at_least().once()
//!     .at_most().times(3);
//! d.invoke("poll", args![], false).unwrap();
//! d.verify().unwrap();
//! ```
//!
//! # Ordering
//!
//! [`ordered`](ExpectationHandle::ordered) expectations must be called in
//! declaration order.  Members of an [`ordered_in`](ExpectationHandle::ordered_in)
//! group share a position and may be called in any order among themselves.
//!
//! ```
//! # use flexdouble::*;
//! let d = Double::new("d");
//! d.should_receive("open").unwrap().ordered();
//! d.should_receive("read").unwrap().ordered_in("io");
//! d.should_receive("write").unwrap().ordered_in("io");
//! d.should_receive("close").unwrap().ordered();
//!
//! for m in ["open", "write", "read", "close"] {
//!     d.invoke(m, args![], false).unwrap();
//! }
//! assert!(matches!(d.invoke("read", args![], false),
//!                  Err(Error::OrderViolation{..})));
//! ```
//!
//! # The undefined sentinel
//!
//! Expectations without a return declarator, methods of a based double without
//! expectations, and undeclared methods of a double that
//! [ignores missing methods](Double::should_ignore_missing) all answer
//! [`Value::Undefined`].  Any call on it answers itself, so code that chains
//! calls on an unconfigured result stays inert.
//!
//! # Spies
//!
//! The call log can be queried after the fact with [`Double::received`],
//! [`Double::assert_received`] and [`Double::assert_not_received`].
//!
//! # Partial doubles
//!
//! A [`Partial`] intercepts some methods of a real [`Object`] and forwards the
//! rest.  `#[automock]` generates typed proxies that do the same for a real
//! implementation of a trait.
//!
//! # Logging
//!
//! Declarations, calls, verification and teardown emit [`tracing`] events.
//! The library installs no subscriber.

mod call_record;
mod container;
mod director;
mod double;
mod error;
mod expectation;
mod matcher;
mod ordering;
mod partial;
mod spy;
mod times;
mod value;

pub use crate::{
    call_record::{CallRecord, format_call},
    container::{Config, Container},
    double::{Dispatch, Double, Phase, Shape, Shaped},
    error::{CountViolation, Error, Result},
    expectation::{Expectation, ExpectationHandle},
    matcher::{
        ArgPattern,
        BlockRequirement,
        IntoPattern,
        all_match,
        any,
        ducktype,
        eq,
        hsh,
        kind,
        matching,
        on,
        optional_proc,
        pred,
    },
    ordering::Ordering,
    partial::Partial,
    spy::Received,
    times::{CountPolicy, times_in_words},
    value::{Callback, FromValue, Object, ToValue, Value, ValueKind},
};
pub use flexdouble_derive::automock;
pub use predicates::prelude::{Predicate, predicate};

/// Support code for `#[automock]`-generated adapters
#[doc(hidden)]
pub mod __private {
    use std::any::type_name;

    use crate::{Dispatch, Double, FromValue, Result, Value};

    fn convert<T: FromValue>(method: &str, v: Value) -> T {
        T::from_value(v).unwrap_or_else(|v| {
            panic!("{method}: cannot convert {v} into {}", type_name::<T>())
        })
    }

    /// Turn the outcome of a call into the method's return type.
    pub fn reply<T: FromValue>(method: &str, result: Result<Value>) -> T {
        match result {
            Ok(v) => convert(method, v),
            Err(e) => panic!("{e}"),
        }
    }

    /// Route a call through a proxy's double.  `None` means the call belongs
    /// to the real object.
    pub fn dispatch<T: FromValue>(double: &Double, method: &str, args: Vec<Value>)
        -> Option<T>
    {
        if !double.intercepts(method) {
            return None;
        }
        match double.dispatch(method, args, false) {
            Ok(Dispatch::Reply(v)) => Some(convert(method, v)),
            Ok(Dispatch::PassThru(_)) => None,
            Err(e) => panic!("{e}"),
        }
    }
}
