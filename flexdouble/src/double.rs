// vim: tw=80
//! The double itself: expectation bookkeeping, call routing and verification.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::{debug, trace, warn};

use crate::{
    call_record::{CallRecord, describe_calls, format_call},
    director::ExpectationDirector,
    error::{Error, Result},
    expectation::{self, Expectation, ExpectationHandle, Reply},
    ordering::Ordering,
    value::{Object, Value},
};

/// The set of methods a "based" double may answer without expectations.
#[derive(Clone)]
pub enum Shape {
    /// A fixed, named set of methods, e.g. the methods of a trait
    Methods {
        name: String,
        methods: BTreeSet<String>,
    },
    /// Whatever a live object responds to
    Object(Arc<dyn Object>),
}

impl Shape {
    pub fn new<I, S>(name: impl Into<String>, methods: I) -> Self
        where I: IntoIterator<Item = S>, S: Into<String>
    {
        Shape::Methods {
            name: name.into(),
            methods: methods.into_iter().map(Into::into).collect(),
        }
    }

    /// The shape of a live object
    pub fn of(obj: Arc<dyn Object>) -> Self {
        Shape::Object(obj)
    }

    pub fn name(&self) -> String {
        match self {
            Shape::Methods{name, ..} => name.clone(),
            Shape::Object(o) => o.class_name(),
        }
    }

    pub fn includes(&self, method: &str) -> bool {
        match self {
            Shape::Methods{methods, ..} => methods.contains(method),
            Shape::Object(o) => o.responds_to(method),
        }
    }
}

/// Types that can describe their own [`Shape`].  `#[automock]` implements this
/// for `dyn Trait`.
pub trait Shaped {
    fn shape() -> Shape;
}

/// Lifecycle of a double.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Expectations may be declared and calls routed
    Open,
    /// Verification has run
    Verifying,
    /// Torn down; the double no longer accepts calls
    Closed,
}

/// The result of routing a call without performing pass-through.
#[derive(Debug)]
pub enum Dispatch {
    /// The expectation's return program produced a value.
    Reply(Value),
    /// The expectation asked for the call to reach the real object.  The
    /// arguments are handed back for forwarding.
    PassThru(Vec<Value>),
}

struct DoubleState {
    name: String,
    directors: BTreeMap<String, ExpectationDirector>,
    calls: Vec<CallRecord>,
    ignore_missing: bool,
    base: Option<Shape>,
    ordering: Ordering,
    verified: bool,
    phase: Phase,
    /// Doubles created for demeter chains, by the method that returns them
    children: HashMap<String, Double>,
    /// The real object behind a partial double, while interception lasts
    real: Option<Arc<dyn Object>>,
}

/// A test double: a stand-in object that answers calls according to declared
/// expectations, records every call, and verifies call counts at the end of a
/// test.
///
/// `Double` is a cheap, cloneable handle; clones refer to the same double.
///
/// # Examples
/// ```
/// # use flexdouble::*;
/// let db = Double::new("db");
/// db.should_receive("query").unwrap().and_return(vec![1, 2, 3]);
/// db.should_receive("update").unwrap()
///     .with(params![5])
///     .and_return(())
///     .once();
///
/// db.invoke("query", args![], false).unwrap();
/// db.invoke("update", args![5], false).unwrap();
/// assert!(matches!(db.invoke("update", args![6], false),
///                  Err(Error::NoMatchingHandler{..})));
/// ```
#[derive(Clone)]
pub struct Double {
    inner: Arc<Mutex<DoubleState>>,
}

impl Double {
    pub fn new(name: impl Into<String>) -> Self {
        Double {
            inner: Arc::new(Mutex::new(DoubleState {
                name: name.into(),
                directors: BTreeMap::new(),
                calls: Vec::new(),
                ignore_missing: false,
                base: None,
                ordering: Ordering::new(),
                verified: false,
                phase: Phase::Open,
                children: HashMap::new(),
                real: None,
            }))
        }
    }

    /// Create a double shaped like `shape`.  Methods of the shape that have no
    /// expectations answer the undefined sentinel; expectations may only be
    /// declared for methods of the shape unless declared explicitly.
    pub fn based_on(name: impl Into<String>, shape: Shape) -> Self {
        let double = Double::new(name);
        double.state().base = Some(shape);
        double
    }

    /// Like [`based_on`](#method.based_on), with the shape of a type.
    pub fn based_on_type<S: Shaped + ?Sized>(name: impl Into<String>) -> Self {
        Self::based_on(name, S::shape())
    }

    // The state is only locked for bounded bookkeeping, never across user
    // code, so a poisoned lock still holds consistent state.
    fn state(&self) -> MutexGuard<'_, DoubleState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> String {
        self.state().name.clone()
    }

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    /// Answer calls to undeclared methods with the undefined sentinel instead
    /// of failing.
    pub fn should_ignore_missing(&self) -> &Self {
        self.state().ignore_missing = true;
        self
    }

    /// Do two handles refer to the same double?
    pub fn ptr_eq(&self, other: &Double) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Declare an expectation for `method`.
    ///
    /// A dotted name like `"a.b.c"` declares a demeter chain: `a` returns a
    /// child double whose `b` returns another, whose `c` gets the expectation.
    /// Chains sharing a prefix share the child doubles.
    pub fn should_receive(&self, method: &str) -> Result<ExpectationHandle> {
        self.declare(method, false)
    }

    /// Like [`should_receive`](#method.should_receive), but allow methods
    /// outside the double's base shape.
    pub fn should_receive_explicitly(&self, method: &str)
        -> Result<ExpectationHandle>
    {
        self.declare(method, true)
    }

    /// Declare expectations for several methods at once.  The returned handle
    /// applies each declarator to all of them.
    pub fn should_receive_all<I, S>(&self, methods: I)
        -> Result<ExpectationHandle>
        where I: IntoIterator<Item = S>, S: AsRef<str>
    {
        let mut handle = ExpectationHandle::new();
        for m in methods {
            handle.extend(self.declare(m.as_ref(), false)?);
        }
        Ok(handle)
    }

    /// Declare, for each pair, an expectation returning the given value.
    pub fn should_receive_map<I, K, V>(&self, defs: I)
        -> Result<ExpectationHandle>
        where I: IntoIterator<Item = (K, V)>, K: AsRef<str>, V: Into<Value>
    {
        let mut handle = ExpectationHandle::new();
        for (method, value) in defs {
            let mut h = self.declare(method.as_ref(), false)?;
            h.and_return(value);
            handle.extend(h);
        }
        Ok(handle)
    }

    fn declare(&self, method: &str, explicit: bool) -> Result<ExpectationHandle> {
        let names = method.split('.').collect::<Vec<_>>();
        if let Some(bad) = names.iter().find(|n| !is_method_name(n)) {
            return Err(Error::usage(format!("Ill-formed method name '{bad}'")));
        }
        let Some((last, chain)) = names.split_last() else {
            return Err(Error::usage("Empty list of names"));
        };
        let mut target = self.clone();
        for (i, segment) in chain.iter().enumerate() {
            target = target.child(segment, explicit || i > 0)?;
        }
        target.declare_one(last, explicit || !chain.is_empty())
    }

    fn declare_one(&self, method: &str, explicit: bool) -> Result<ExpectationHandle> {
        let index = {
            let mut state = self.state();
            if let Some(base) = &state.base {
                if !explicit && !base.includes(method) {
                    return Err(Error::usage(format!(
                        "Cannot stub methods not defined by the base class\n   \
                         Method:     {method}\n   \
                         Base Class: {}\n   \
                         (Use 'explicitly' to override)", base.name())));
                }
            }
            if state.phase != Phase::Open {
                warn!(double = %state.name, method,
                      "expectation declared after verification started");
            }
            trace!(double = %state.name, method, "declare expectation");
            state.directors
                .entry(method.to_string())
                .or_insert_with(|| ExpectationDirector::new(method))
                .expect()
        };
        let mut handle = ExpectationHandle::new();
        handle.push(self.clone(), method, index);
        Ok(handle)
    }

    /// Find or create the child double returned by `method` in a demeter
    /// chain.
    fn child(&self, method: &str, explicit: bool) -> Result<Double> {
        let conflict = || Error::usage(format!(
            "Conflicting mock declaration for '{method}' in demeter style mock"));
        let (known, returned, declared) = {
            let state = self.state();
            let director = state.directors.get(method);
            (state.children.get(method).cloned(),
             director.and_then(|d| d.get(0)).and_then(Expectation::constant),
             director.is_some())
        };
        match (known, returned) {
            (None, None) if !declared => {
                let child = Double::new(format!("demeter_{method}"));
                self.declare_one(method, explicit)?
                    .and_return(Value::object(child.clone()));
                self.state().children.insert(method.to_string(), child.clone());
                Ok(child)
            },
            (known, Some(value)) => {
                let Some(child) = value.downcast_ref::<Double>() else {
                    return Err(conflict());
                };
                match known {
                    Some(k) if !k.ptr_eq(child) => Err(conflict()),
                    Some(k) => Ok(k),
                    None => {
                        self.state().children
                            .insert(method.to_string(), child.clone());
                        Ok(child.clone())
                    }
                }
            },
            _ => Err(conflict()),
        }
    }

    pub(crate) fn with_expectation<F>(&self, method: &str, index: usize, f: F)
        where F: FnOnce(&mut Expectation, &mut Ordering)
    {
        let mut guard = self.state();
        let DoubleState { directors, ordering, .. } = &mut *guard;
        if let Some(e) = directors.get_mut(method)
            .and_then(|d| d.get_mut(index))
        {
            f(e, ordering);
        }
    }

    /// Would a call to `method` be routed to this double's expectations?
    pub fn intercepts(&self, method: &str) -> bool {
        let state = self.state();
        state.phase != Phase::Closed && state.directors.contains_key(method)
    }

    /// Record a call and route it, without performing pass-through.
    pub fn dispatch(&self, method: &str, args: Vec<Value>, had_block: bool)
        -> Result<Dispatch>
    {
        let (rfunc, double, description) = {
            let mut guard = self.state();
            let DoubleState {
                name, directors, calls, ordering, base, ignore_missing, phase,
                ..
            } = &mut *guard;
            let call = format_call(method, &args);
            if *phase == Phase::Closed {
                warn!(double = %name, %call, "call on a closed double");
                return Err(Error::usage(format!(
                    "double '{name}' was called after teardown: {call}")));
            }
            trace!(double = %name, %call, "invoke");
            calls.push(CallRecord::new(method, args.clone(), had_block));

            let Some(director) = directors.get_mut(method) else {
                let covered = base.as_ref().is_some_and(|b| b.includes(method));
                if covered || *ignore_missing {
                    return Ok(Dispatch::Reply(Value::Undefined));
                }
                return Err(Error::NoSuchMethod {
                    double: name.clone(),
                    method: method.to_string(),
                    call,
                });
            };
            let no_match = |director: &ExpectationDirector| {
                Error::NoMatchingHandler {
                    double: name.clone(),
                    method: method.to_string(),
                    call: call.clone(),
                    detail: director.describe_candidates(&args),
                    log: describe_calls(name.as_str(), calls.as_slice()),
                }
            };
            let Some(i) = director.find(&args, had_block) else {
                return Err(no_match(director));
            };
            let order = director.get(i).and_then(Expectation::order_number);
            if let Some(expected) = order {
                ordering.advance(expected).map_err(|current| {
                    Error::OrderViolation {
                        double: name.clone(),
                        call: call.clone(),
                        expected,
                        current,
                    }
                })?;
            }
            let Some(exp) = director.get_mut(i) else {
                return Err(no_match(director));
            };
            let rfunc = exp.call();
            let description = exp.describe();
            if let Some(record) = calls.last_mut() {
                record.set_matched_by(description.clone());
            }
            (rfunc, name.clone(), description)
        };
        match expectation::run(&rfunc, &args) {
            Reply::Value(v) => Ok(Dispatch::Reply(v)),
            Reply::Raise(message) => Err(Error::Raised {
                double,
                method: method.to_string(),
                message,
            }),
            Reply::PassThru => Ok(Dispatch::PassThru(args)),
            Reply::Reentered => Err(Error::usage(format!(
                "in double '{double}': the return program of {description} \
                 called itself; declare it with returning_fn to allow \
                 recursion"))),
        }
    }

    /// Record a call to `method` and answer it.
    ///
    /// Routing failures are returned as errors: [`Error::NoSuchMethod`] if
    /// nothing is declared for `method`, [`Error::NoMatchingHandler`] if no
    /// expectation accepts the arguments, and [`Error::OrderViolation`] if an
    /// ordered expectation fires too early.  Every call is logged, including
    /// the ones that fail.
    pub fn invoke(&self, method: &str, args: Vec<Value>, had_block: bool)
        -> Result<Value>
    {
        match self.dispatch(method, args, had_block)? {
            Dispatch::Reply(v) => Ok(v),
            Dispatch::PassThru(args) => {
                let real = self.state().real.clone();
                match real {
                    Some(real) => real.invoke(method, args, had_block),
                    None => Err(Error::usage(format!(
                        "pass_thru declared for '{method}' on double '{}', \
                         which wraps no real object", self.name()))),
                }
            }
        }
    }

    /// A copy of the call log
    pub fn calls(&self) -> Vec<CallRecord> {
        self.state().calls.clone()
    }

    /// Check the call counts of every expectation, reporting all violations
    /// at once.  Only the first verification does anything.
    pub fn verify(&self) -> Result<()> {
        let (own, children) = {
            let mut state = self.state();
            if state.verified {
                return Ok(());
            }
            state.verified = true;
            if state.phase == Phase::Open {
                state.phase = Phase::Verifying;
            }
            let violations = state.directors.values()
                .flat_map(ExpectationDirector::violations)
                .collect::<Vec<_>>();
            debug!(double = %state.name, violations = violations.len(),
                   "verify");
            let own = (!violations.is_empty()).then(|| Error::CountViolation {
                double: state.name.clone(),
                violations,
                log: describe_calls(&state.name, &state.calls),
            });
            (own, state.children.values().cloned().collect::<Vec<_>>())
        };
        let mut errors = own.into_iter().collect::<Vec<_>>();
        errors.extend(children.iter().filter_map(|c| c.verify().err()));
        Error::collect(errors)
    }

    /// Close the double, releasing the real object of a partial double.  Only
    /// the first teardown does anything.
    pub fn teardown(&self) {
        let (children, real) = {
            let mut state = self.state();
            if state.phase == Phase::Closed {
                return;
            }
            state.phase = Phase::Closed;
            debug!(double = %state.name, partial = state.real.is_some(),
                   "teardown");
            (state.children.values().cloned().collect::<Vec<_>>(),
             state.real.take())
        };
        drop(real);
        for child in children {
            child.teardown();
        }
    }

    /// Install interception over a real object.
    pub(crate) fn attach(&self, real: Arc<dyn Object>) {
        let mut state = self.state();
        debug_assert!(state.real.is_none());
        state.real = Some(real);
    }

    pub(crate) fn describe_calls(&self) -> String {
        let state = self.state();
        describe_calls(&state.name, &state.calls)
    }
}

impl fmt::Debug for Double {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("Double").field(&self.name()).finish()
    }
}

impl Object for Double {
    fn class_name(&self) -> String {
        self.state().base.as_ref().map_or_else(|| "Double".to_string(), Shape::name)
    }

    fn responds_to(&self, method: &str) -> bool {
        let state = self.state();
        state.directors.contains_key(method) ||
            state.ignore_missing ||
            state.base.as_ref().is_some_and(|b| b.includes(method))
    }

    fn invoke(&self, method: &str, args: Vec<Value>, had_block: bool)
        -> Result<Value>
    {
        Double::invoke(self, method, args, had_block)
    }

    fn inspect(&self) -> String {
        format!("#<Double:{}>", self.name())
    }
}

const OPERATORS: &[&str] = &[
    "[]", "[]=", "**", "<<", ">>", "<=>", "<=", ">=", "==", "!=", "=~", "!~",
    "===", "+@", "-@", "+", "-", "*", "/", "%", "&", "^", "|", "<", ">", "~",
    "`", "!",
];

/// Is `name` usable as a method name?  Identifiers may end in `?`, `!` or `=`.
fn is_method_name(name: &str) -> bool {
    if OPERATORS.contains(&name) {
        return true;
    }
    let body = name.strip_suffix(|c: char| matches!(c, '?' | '!' | '='))
        .unwrap_or(name);
    let mut chars = body.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_') &&
        chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
