// vim: tw=80
//! Expectations and the handle used to declare them.

use std::{
    cell::RefCell,
    collections::VecDeque,
    ops::Range,
    sync::{Arc, Mutex, PoisonError, TryLockError},
};

use fragile::Fragile;

use crate::{
    call_record::format_patterns,
    double::Double,
    error::{CountViolation, Result, usage_panic},
    matcher::{ArgPattern, BlockRequirement, all_match},
    ordering::Ordering,
    times::{CountPolicy, Times},
    value::Value,
};

/// What an expectation's return program produced for one call.
pub(crate) enum Reply {
    Value(Value),
    Raise(String),
    PassThru,
    /// A non-reentrant program was called from inside itself.
    Reentered,
}

type SharedFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;
type SharedMut = Arc<Mutex<Box<dyn FnMut(&[Value]) -> Value + Send>>>;
type SharedMutSt = Arc<Fragile<RefCell<Box<dyn FnMut(&[Value]) -> Value>>>>;

/// The return program of an expectation.
pub(crate) enum Rfunc {
    /// No return declarator was given: reply with the undefined sentinel.
    Default,
    Const(Value),
    /// Successive values; the last one repeats forever.
    Sequence(VecDeque<Value>),
    Fn(SharedFn),
    Mut(SharedMut),
    MutSt(SharedMutSt),
    Raise(String),
    PassThru,
}

/// A return program taken out of its expectation, so that it can run without
/// holding any lock of the double.
enum Step {
    Done(Reply),
    Fn(SharedFn),
    Mut(SharedMut),
    MutSt(SharedMutSt),
}

impl Rfunc {
    fn step(&mut self) -> Step {
        match self {
            Rfunc::Default => Step::Done(Reply::Value(Value::Undefined)),
            Rfunc::Const(v) => Step::Done(Reply::Value(v.clone())),
            Rfunc::Sequence(values) => {
                let v = if values.len() > 1 {
                    values.pop_front()
                } else {
                    values.front().cloned()
                };
                Step::Done(Reply::Value(v.unwrap_or(Value::Nil)))
            },
            Rfunc::Fn(f) => Step::Fn(f.clone()),
            Rfunc::Mut(f) => Step::Mut(f.clone()),
            Rfunc::MutSt(f) => Step::MutSt(f.clone()),
            Rfunc::Raise(message) => Step::Done(Reply::Raise(message.clone())),
            Rfunc::PassThru => Step::Done(Reply::PassThru),
        }
    }
}

/// Run a shared return program.  The program's own lock is released before
/// any user closure runs.
pub(crate) fn run(rfunc: &Mutex<Rfunc>, args: &[Value]) -> Reply {
    let step = rfunc.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .step();
    match step {
        Step::Done(reply) => reply,
        Step::Fn(f) => Reply::Value((*f)(args)),
        Step::Mut(f) => {
            let reply = match f.try_lock() {
                Ok(mut guard) => Reply::Value((&mut *guard)(args)),
                Err(TryLockError::Poisoned(e)) =>
                    Reply::Value((&mut *e.into_inner())(args)),
                Err(TryLockError::WouldBlock) => Reply::Reentered,
            };
            reply
        },
        Step::MutSt(f) => {
            let reply = match f.get().try_borrow_mut() {
                Ok(mut g) => Reply::Value((&mut *g)(args)),
                Err(_) => Reply::Reentered,
            };
            reply
        },
    }
}

/// One declared behavior of a double: which calls it handles, how often it
/// may be called, where it sits in the call order, and what it returns.
pub struct Expectation {
    method: String,
    /// `None` means "any arguments"
    args: Option<Vec<ArgPattern>>,
    block: BlockRequirement,
    rfunc: Arc<Mutex<Rfunc>>,
    times: Times,
    order: Option<usize>,
    by_default: bool,
}

impl Expectation {
    pub(crate) fn new(method: &str) -> Self {
        Expectation {
            method: method.to_string(),
            args: None,
            block: BlockRequirement::default(),
            rfunc: Arc::new(Mutex::new(Rfunc::Default)),
            times: Times::default(),
            order: None,
            by_default: false,
        }
    }

    /// Do this expectation's argument patterns and block requirement accept
    /// the call?
    pub fn matches(&self, args: &[Value], had_block: bool) -> bool {
        all_match(self.args.as_deref(), args) && self.block.admits(had_block)
    }

    /// May this expectation accept another matching call?
    pub fn is_eligible(&self) -> bool {
        self.times.is_eligible()
    }

    /// How many calls this expectation has handled
    pub fn actual_count(&self) -> usize {
        self.times.count()
    }

    pub fn order_number(&self) -> Option<usize> {
        self.order
    }

    pub fn is_default(&self) -> bool {
        self.by_default
    }

    pub fn policies(&self) -> &[CountPolicy] {
        self.times.policies()
    }

    pub(crate) fn patterns(&self) -> Option<&[ArgPattern]> {
        self.args.as_deref()
    }

    /// The call this expectation handles, e.g. `update(5)`
    pub fn signature(&self) -> String {
        let mut s = format_patterns(&self.method, self.args.as_deref());
        s.push_str(self.block.describe());
        s
    }

    /// The signature plus its count declarators, e.g. `update(5).once`
    pub fn describe(&self) -> String {
        let mut s = self.signature();
        s.push_str(&self.times.describe());
        s
    }

    /// Count one dispatched call and hand out the return program.
    pub(crate) fn call(&mut self) -> Arc<Mutex<Rfunc>> {
        self.times.call();
        self.rfunc.clone()
    }

    /// The constant this expectation returns, if its program is a constant.
    pub(crate) fn constant(&self) -> Option<Value> {
        match &*self.rfunc.lock().unwrap_or_else(PoisonError::into_inner) {
            Rfunc::Const(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub(crate) fn violations(&self) -> Vec<CountViolation> {
        self.times.violations()
            .map(|policy| CountViolation {
                expectation: self.signature(),
                policy,
                actual: self.times.count(),
            }).collect()
    }

    fn set_rfunc(&mut self, rfunc: Rfunc) {
        *self.rfunc.lock().unwrap_or_else(PoisonError::into_inner) = rfunc;
    }
}

/// Where one declared expectation lives.
#[derive(Clone)]
struct Target {
    double: Double,
    method: String,
    index: usize,
}

/// Handle for configuring one or more freshly declared expectations.
///
/// Returned by [`Double::should_receive`] and friends.  Every declarator is
/// applied to each expectation the handle refers to, so a handle created from
/// several method names configures them all alike.
///
/// # Examples
/// ```
/// # use flexdouble::*;
/// let db = Double::new("db");
/// db.should_receive("update").unwrap()
///     .with(params![5])
///     .and_return(true)
///     .once();
/// assert_eq!(Value::from(true), db.invoke("update", args![5], false).unwrap());
/// db.verify().unwrap();
/// ```
#[must_use = "expectations are configured through the returned handle"]
pub struct ExpectationHandle {
    targets: Vec<Target>,
}

impl ExpectationHandle {
    pub(crate) fn new() -> Self {
        ExpectationHandle { targets: Vec::new() }
    }

    pub(crate) fn push(&mut self, double: Double, method: &str, index: usize) {
        self.targets.push(Target {
            double,
            method: method.to_string(),
            index,
        });
    }

    pub(crate) fn extend(&mut self, other: ExpectationHandle) {
        self.targets.extend(other.targets);
    }

    fn each<F>(&mut self, mut f: F) -> &mut Self
        where F: FnMut(&mut Expectation, &mut Ordering)
    {
        for t in &self.targets {
            t.double.with_expectation(&t.method, t.index, &mut f);
        }
        self
    }

    fn first<T, F>(&self, f: F) -> Option<T>
        where F: FnOnce(&Expectation) -> T
    {
        let t = self.targets.first()?;
        let mut f = Some(f);
        let mut out = None;
        t.double.with_expectation(&t.method, t.index, |e, _| {
            out = f.take().map(|f| f(&*e));
        });
        out
    }

    /// Declare the argument patterns that calls must match.
    pub fn with(&mut self, patterns: Vec<ArgPattern>) -> &mut Self {
        self.each(|e, _| e.args = Some(patterns.clone()))
    }

    /// Declare that calls take no arguments.
    pub fn with_no_args(&mut self) -> &mut Self {
        self.with(Vec::new())
    }

    /// Accept any argument list.  This is the default.
    pub fn with_any_args(&mut self) -> &mut Self {
        self.each(|e, _| e.args = None)
    }

    /// Only match calls that supply a block.
    pub fn with_block(&mut self) -> &mut Self {
        self.each(|e, _| e.block = BlockRequirement::Required)
    }

    /// Only match calls that don't supply a block.
    pub fn with_no_block(&mut self) -> &mut Self {
        self.each(|e, _| e.block = BlockRequirement::Forbidden)
    }

    /// Return a constant value from every matching call.
    pub fn and_return(&mut self, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        self.each(|e, _| e.set_rfunc(Rfunc::Const(value.clone())))
    }

    /// Return each value in turn on successive matching calls.  Once they run
    /// out, the last one is returned forever.
    ///
    /// # Examples
    /// ```
    /// # use flexdouble::*;
    /// let io = Double::new("io");
    /// io.should_receive("gets").unwrap()
    ///     .with_no_args()
    ///     .and_return_values(["line 1\n", "line 2\n"]);
    /// let gets = || io.invoke("gets", args![], false).unwrap();
    /// assert_eq!(Value::from("line 1\n"), gets());
    /// assert_eq!(Value::from("line 2\n"), gets());
    /// assert_eq!(Value::from("line 2\n"), gets());
    /// ```
    pub fn and_return_values<I>(&mut self, values: I) -> &mut Self
        where I: IntoIterator, I::Item: Into<Value>
    {
        let values = values.into_iter()
            .map(Into::into)
            .collect::<VecDeque<Value>>();
        self.each(|e, _| e.set_rfunc(Rfunc::Sequence(values.clone())))
    }

    /// Return the undefined sentinel.
    pub fn and_return_undefined(&mut self) -> &mut Self {
        self.and_return(Value::Undefined)
    }

    /// Compute the return value from the call's arguments, afresh on every
    /// matching call.
    ///
    /// The closure may call other methods of the double, but not the
    /// expectation it belongs to: such a call fails with a usage error.  Use
    /// [`returning_fn`](#method.returning_fn) for recursive programs.
    pub fn returning<F>(&mut self, f: F) -> &mut Self
        where F: FnMut(&[Value]) -> Value + Send + 'static
    {
        let shared: SharedMut = Arc::new(Mutex::new(Box::new(f)));
        self.each(|e, _| e.set_rfunc(Rfunc::Mut(shared.clone())))
    }

    /// Like [`returning`](#method.returning), for closures that don't need
    /// `FnMut`.  These may call back into their own expectation.
    ///
    /// # Examples
    /// ```
    /// # use flexdouble::*;
    /// let m = Double::new("math");
    /// let inner = m.clone();
    /// m.should_receive("fact").unwrap()
    ///     .returning_fn(move |args| match args[0] {
    ///         Value::Int(n) if n > 1 => {
    ///             match inner.invoke("fact", args![n - 1], false).unwrap() {
    ///                 Value::Int(f) => Value::from(n * f),
    ///                 other => other,
    ///             }
    ///         },
    ///         _ => Value::from(1),
    ///     });
    /// assert_eq!(Value::from(24), m.invoke("fact", args![4], false).unwrap());
    /// ```
    pub fn returning_fn<F>(&mut self, f: F) -> &mut Self
        where F: Fn(&[Value]) -> Value + Send + Sync + 'static
    {
        let shared: SharedFn = Arc::new(f);
        self.each(|e, _| e.set_rfunc(Rfunc::Fn(shared.clone())))
    }

    /// Single-threaded version of [`returning`](#method.returning).  Can be
    /// used when the closure isn't `Send`.
    ///
    /// It is a runtime error to call the double from a different thread than
    /// the one that declared this expectation.
    pub fn returning_st<F>(&mut self, f: F) -> &mut Self
        where F: FnMut(&[Value]) -> Value + 'static
    {
        let shared: SharedMutSt =
            Arc::new(Fragile::new(RefCell::new(Box::new(f))));
        self.each(|e, _| e.set_rfunc(Rfunc::MutSt(shared.clone())))
    }

    /// Make every matching call fail with [`Error::Raised`](crate::Error).
    pub fn and_raise(&mut self, message: impl Into<String>) -> &mut Self {
        let message = message.into();
        self.each(|e, _| e.set_rfunc(Rfunc::Raise(message.clone())))
    }

    /// Forward matching calls to the real object behind a partial double.
    pub fn pass_thru(&mut self) -> &mut Self {
        self.each(|e, _| e.set_rfunc(Rfunc::PassThru))
    }

    /// Expect exactly `n` calls, or at least/at most `n` after
    /// [`at_least`](#method.at_least)/[`at_most`](#method.at_most).
    pub fn times(&mut self, n: usize) -> &mut Self {
        self.each(|e, _| e.times.n(n))
    }

    /// Shortcut for [`times(0)`](#method.times).
    pub fn never(&mut self) -> &mut Self {
        self.times(0)
    }

    /// Shortcut for [`times(1)`](#method.times).
    pub fn once(&mut self) -> &mut Self {
        self.times(1)
    }

    /// Shortcut for [`times(2)`](#method.times).
    pub fn twice(&mut self) -> &mut Self {
        self.times(2)
    }

    /// Make the next count declarator a lower bound.
    pub fn at_least(&mut self) -> &mut Self {
        self.each(|e, _| e.times.at_least())
    }

    /// Make the next count declarator an upper bound.
    pub fn at_most(&mut self) -> &mut Self {
        self.each(|e, _| e.times.at_most())
    }

    /// Allow any number of calls.
    pub fn zero_or_more_times(&mut self) -> &mut Self {
        self.at_least().never()
    }

    /// Allow any number of calls within `range`.
    pub fn times_range(&mut self, range: Range<usize>) -> &mut Self {
        self.each(|e, _| e.times.range(range.clone()))
    }

    /// Require this expectation to be called after every ordered expectation
    /// declared before it, and before every one declared after it.
    pub fn ordered(&mut self) -> &mut Self {
        self.each(|e, ordering| {
            check_unordered(e);
            e.order = Some(ordering.allocate());
        })
    }

    /// Like [`ordered`](#method.ordered), but expectations sharing a group
    /// name share one slot and may be called in any order among themselves.
    pub fn ordered_in(&mut self, group: &str) -> &mut Self {
        self.each(|e, ordering| {
            check_unordered(e);
            e.order = Some(ordering.group(group));
        })
    }

    /// Make this a fallback expectation: it handles calls only while the
    /// method has no other expectations, and its counts are never verified.
    pub fn by_default(&mut self) -> &mut Self {
        self.each(|e, _| e.by_default = true)
    }

    /// Declare another expectation on the same double.
    pub fn should_receive(&self, method: &str) -> Result<ExpectationHandle> {
        match self.targets.first() {
            Some(t) => t.double.should_receive(method),
            None => Err(crate::Error::usage(
                "should_receive on an empty expectation handle")),
        }
    }

    /// The double of the first expectation
    pub fn double(&self) -> Option<&Double> {
        self.targets.first().map(|t| &t.double)
    }

    /// The order slot of the first expectation
    pub fn order_number(&self) -> Option<usize> {
        self.first(Expectation::order_number).flatten()
    }

    /// Describe the expectations, e.g. `[a(...), b(...)]`
    pub fn describe(&self) -> String {
        let descriptions = self.targets.iter()
            .filter_map(|t| {
                let mut d = None;
                t.double.with_expectation(&t.method, t.index, |e, _| {
                    d = Some(e.describe());
                });
                d
            }).collect::<Vec<_>>();
        if descriptions.len() == 1 {
            descriptions.into_iter().collect()
        } else {
            format!("[{}]", descriptions.join(", "))
        }
    }
}

fn check_unordered(e: &Expectation) {
    if let Some(n) = e.order {
        usage_panic(format!("expectation {} is already ordered (order {n})",
                            e.signature()));
    }
}
