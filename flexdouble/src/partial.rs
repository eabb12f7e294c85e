// vim: tw=80
//! Partial doubles: a real object with some of its methods intercepted.

use std::{fmt, sync::Arc};

use tracing::trace;

use crate::{
    double::{Double, Shape},
    error::Result,
    expectation::ExpectationHandle,
    value::{Object, Value},
};

/// Decorates a real object.  Calls to methods with declared expectations are
/// routed to the partial's [`Double`]; everything else reaches the real
/// object.  After [`teardown`](#method.teardown), every call reaches the real
/// object.
///
/// # Examples
/// ```
/// # use flexdouble::*;
/// # use std::sync::Arc;
/// struct Dog;
/// impl Object for Dog {
///     fn class_name(&self) -> String { "Dog".into() }
///     fn responds_to(&self, m: &str) -> bool { m == "bark" || m == "wag" }
///     fn invoke(&self, m: &str, _: Vec<Value>, _: bool) -> Result<Value> {
///         Ok(Value::from(format!("real {m}")))
///     }
/// }
///
/// let dog = Partial::new("dog", Arc::new(Dog));
/// dog.should_receive("bark").unwrap().and_return("woof");
/// assert_eq!(Value::from("woof"), dog.invoke("bark", args![], false).unwrap());
/// assert_eq!(Value::from("real wag"), dog.invoke("wag", args![], false).unwrap());
///
/// dog.teardown();
/// assert_eq!(Value::from("real bark"), dog.invoke("bark", args![], false).unwrap());
/// ```
#[derive(Clone)]
pub struct Partial {
    double: Double,
    real: Arc<dyn Object>,
}

impl Partial {
    pub fn new(name: impl Into<String>, real: Arc<dyn Object>) -> Self {
        Self::with_double(Double::new(name), real)
    }

    /// A partial whose double only accepts expectations for methods the real
    /// object has.
    pub fn based(name: impl Into<String>, real: Arc<dyn Object>) -> Self {
        let shape = Shape::of(real.clone());
        Self::with_double(Double::based_on(name, shape), real)
    }

    fn with_double(double: Double, real: Arc<dyn Object>) -> Self {
        double.attach(real.clone());
        Partial { double, real }
    }

    pub fn should_receive(&self, method: &str) -> Result<ExpectationHandle> {
        self.double.should_receive(method)
    }

    pub fn should_receive_explicitly(&self, method: &str)
        -> Result<ExpectationHandle>
    {
        self.double.should_receive_explicitly(method)
    }

    pub fn double(&self) -> &Double {
        &self.double
    }

    pub fn real(&self) -> &Arc<dyn Object> {
        &self.real
    }

    pub fn invoke(&self, method: &str, args: Vec<Value>, had_block: bool)
        -> Result<Value>
    {
        if self.double.intercepts(method) {
            self.double.invoke(method, args, had_block)
        } else {
            trace!(double = %self.double.name(), method, "forward to real object");
            self.real.invoke(method, args, had_block)
        }
    }

    pub fn verify(&self) -> Result<()> {
        self.double.verify()
    }

    /// Remove the interception.
    pub fn teardown(&self) {
        self.double.teardown();
    }
}

impl fmt::Debug for Partial {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Partial")
            .field("double", &self.double)
            .field("real", &self.real.inspect())
            .finish()
    }
}

impl Object for Partial {
    fn class_name(&self) -> String {
        self.real.class_name()
    }

    fn responds_to(&self, method: &str) -> bool {
        self.double.intercepts(method) || self.real.responds_to(method)
    }

    fn invoke(&self, method: &str, args: Vec<Value>, had_block: bool)
        -> Result<Value>
    {
        Partial::invoke(self, method, args, had_block)
    }

    fn inspect(&self) -> String {
        self.real.inspect()
    }
}
