// vim: tw=80
//! Dynamically typed call arguments and return values.

use std::{
    collections::BTreeMap,
    fmt::{self, Debug, Display},
    ptr,
    sync::Arc,
};

use downcast::{downcast, Any};

use crate::error::{Error, Result};

/// Anything that can receive calls by name: a double, a partial double, or a
/// real collaborator adapted for use with [`Partial`](crate::Partial).
pub trait Object: Any + Send + Sync {
    /// Name of the object's class, used in diagnostics and base shapes.
    fn class_name(&self) -> String;

    /// Does the object answer calls named `method`?
    fn responds_to(&self, method: &str) -> bool;

    /// Send a call to the object.
    fn invoke(&self, method: &str, args: Vec<Value>, had_block: bool)
        -> Result<Value>;

    /// Inspected representation, as shown in diagnostics.
    fn inspect(&self) -> String {
        format!("#<{}>", self.class_name())
    }
}
downcast!(dyn Object);

/// A callable value.  This is what a block or callback argument looks like
/// to the engine.
#[derive(Clone)]
pub struct Callback(Arc<dyn Fn(&[Value]) -> Value + Send + Sync>);

impl Callback {
    pub fn new<F>(f: F) -> Self
        where F: Fn(&[Value]) -> Value + Send + Sync + 'static
    {
        Callback(Arc::new(f))
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }
}

/// The type of a [`Value`], used by [`kind`](crate::kind) patterns.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ValueKind {
    Nil,
    Undefined,
    Bool,
    Int,
    Float,
    Str,
    Sym,
    List,
    Map,
    Object,
    Proc,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ValueKind::Nil => "NilClass",
            ValueKind::Undefined => "Undefined",
            ValueKind::Bool => "Boolean",
            ValueKind::Int => "Integer",
            ValueKind::Float => "Float",
            ValueKind::Str => "String",
            ValueKind::Sym => "Symbol",
            ValueKind::List => "Array",
            ValueKind::Map => "Hash",
            ValueKind::Object => "Object",
            ValueKind::Proc => "Proc",
        };
        f.write_str(name)
    }
}

/// A dynamically typed value passed to or returned from a double.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    /// The undefined ("bottom") sentinel.  Any call sent to it returns it
    /// again, so chains of calls on an unconfigured result stay inert.
    Undefined,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Sym(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Object(Arc<dyn Object>),
    Proc(Callback),
}

impl Value {
    /// Build a symbol value.
    pub fn sym(name: impl Into<String>) -> Self {
        Value::Sym(name.into())
    }

    /// Wrap an object.
    pub fn object<O: Object>(obj: O) -> Self {
        Value::Object(Arc::new(obj))
    }

    /// Build a callable value.
    pub fn proc<F>(f: F) -> Self
        where F: Fn(&[Value]) -> Value + Send + Sync + 'static
    {
        Value::Proc(Callback::new(f))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Nil => ValueKind::Nil,
            Value::Undefined => ValueKind::Undefined,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Str(_) => ValueKind::Str,
            Value::Sym(_) => ValueKind::Sym,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Object(_) => ValueKind::Object,
            Value::Proc(_) => ValueKind::Proc,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// The string form of the value, as matched by regular expressions.
    pub fn to_s(&self) -> String {
        match self {
            Value::Str(s) | Value::Sym(s) => s.clone(),
            Value::Nil => String::new(),
            other => other.to_string(),
        }
    }

    /// Does this value answer calls named `method`?
    pub fn responds_to(&self, method: &str) -> bool {
        match self {
            Value::Undefined => true,
            Value::Object(o) => o.responds_to(method),
            Value::Proc(_) => method == "call",
            _ => matches!(method, "to_s" | "inspect"),
        }
    }

    /// If this value is an object of type `T`, borrow it.
    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        match self {
            Value::Object(o) => o.downcast_ref::<T>().ok(),
            _ => None,
        }
    }

    /// Send a call to this value.
    pub fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        match self {
            Value::Undefined => Ok(Value::Undefined),
            Value::Object(o) => o.invoke(method, args, false),
            Value::Proc(p) if method == "call" => Ok(p.call(&args)),
            Value::Str(_) | Value::Sym(_) if method == "to_s" =>
                Ok(Value::Str(self.to_s())),
            _ if method == "inspect" => Ok(Value::Str(self.to_string())),
            _ => Err(Error::NoSuchMethod {
                double: self.to_string(),
                method: method.to_string(),
                call: crate::call_record::format_call(method, &args),
            }),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Undefined, Value::Undefined) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) |
            (Value::Float(b), Value::Int(a)) => (*a as f64) == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Sym(a), Value::Sym(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) =>
                ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            (Value::Proc(a), Value::Proc(b)) =>
                ptr::addr_eq(Arc::as_ptr(&a.0), Arc::as_ptr(&b.0)),
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Undefined => f.write_str("BOTTOM"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Sym(s) => write!(f, ":{s}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            },
            Value::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k:?} => {v}")?;
                }
                f.write_str("}")
            },
            Value::Object(o) => f.write_str(&o.inspect()),
            Value::Proc(_) => f.write_str("#<Proc>"),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        Display::fmt(self, f)
    }
}

macro_rules! value_from_int {
    ($($t:ty)*) => {
        $(
            impl From<$t> for Value {
                /// Integers beyond the range of `i64` become floats.
                fn from(i: $t) -> Self {
                    i64::try_from(i).map_or(Value::Float(i as f64), Value::Int)
                }
            }

            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    Value::from(*self)
                }
            }

            impl FromValue for $t {
                fn from_value(value: Value) -> std::result::Result<Self, Value> {
                    match value {
                        Value::Int(i) => <$t>::try_from(i)
                            .map_err(|_| Value::Int(i)),
                        other => Err(other),
                    }
                }
            }
        )*
    }
}

value_from_int!{i8 i16 i32 i64 u8 u16 u32 u64 usize isize}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(f64::from(x))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Nil
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(o: Option<T>) -> Self {
        o.map_or(Value::Nil, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<Value>> From<BTreeMap<String, V>> for Value {
    fn from(m: BTreeMap<String, V>) -> Self {
        Value::Map(m.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl From<Callback> for Value {
    fn from(c: Callback) -> Self {
        Value::Proc(c)
    }
}

/// Convert a borrowed argument into a [`Value`].  Used by the code that
/// `#[automock]` generates.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Str(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Nil, ToValue::to_value)
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for &mut T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

/// Convert a returned [`Value`] back into a concrete type.  On failure the
/// original value is handed back for the error message.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> std::result::Result<Self, Value>;
}

impl FromValue for Value {
    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        Ok(value)
    }
}

impl FromValue for () {
    fn from_value(_: Value) -> std::result::Result<Self, Value> {
        Ok(())
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Float(x) => Ok(x),
            Value::Int(i) => Ok(i as f64),
            other => Err(other),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Str(s) | Value::Sym(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::Nil | Value::Undefined => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> std::result::Result<Self, Value> {
        match value {
            Value::List(items) => {
                let snapshot = items.clone();
                items.into_iter()
                    .map(T::from_value)
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|_| Value::List(snapshot))
            },
            other => Err(other),
        }
    }
}
