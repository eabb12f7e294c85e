// vim: tw=80
//! Test-scoped ownership of doubles.

use std::{sync::Arc, thread};

use tracing::{debug, warn};

use crate::{
    double::{Double, Shape},
    error::{Error, Result},
    partial::Partial,
    value::{Object, Value},
};

/// Settings for a [`Container`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Config {
    /// Partial doubles only accept expectations for methods of the real object.
    pub partials_are_based: bool,
    /// Panic with the verification report when a container is dropped
    /// without being torn down and an expectation was not met.
    pub verify_on_drop: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            partials_are_based: false,
            verify_on_drop: true,
        }
    }
}

/// Owns the doubles created during one test.  At the end of the test it
/// verifies them, unless the test already failed, and then tears every one of
/// them down.
///
/// Dropping a container that wasn't torn down explicitly tears it down, with
/// the failure state of the test taken from whether the thread is panicking.
///
/// # Examples
/// ```
/// # use flexdouble::*;
/// let mut c = Container::new();
/// let db = c.double("db");
/// db.should_receive("connect").unwrap().once();
/// db.invoke("connect", args![], false).unwrap();
/// c.close().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct Container {
    config: Config,
    doubles: Vec<Double>,
    torn_down: bool,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Container {
            config,
            doubles: Vec::new(),
            torn_down: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Track a double created elsewhere.
    pub fn track(&mut self, double: Double) -> Double {
        if self.torn_down {
            warn!(double = %double.name(), "tracked by a torn-down container");
        }
        self.doubles.push(double.clone());
        double
    }

    pub fn double(&mut self, name: impl Into<String>) -> Double {
        self.track(Double::new(name))
    }

    /// Create a double answering each named method with a fixed value.
    pub fn double_with<I, K, V>(&mut self, name: impl Into<String>, defs: I)
        -> Result<Double>
        where I: IntoIterator<Item = (K, V)>, K: AsRef<str>, V: Into<Value>
    {
        let double = Double::new(name);
        let _ = double.should_receive_map(defs)?;
        Ok(self.track(double))
    }

    pub fn based_double(&mut self, name: impl Into<String>, shape: Shape)
        -> Double
    {
        self.track(Double::based_on(name, shape))
    }

    /// Wrap a real object in a partial double.
    pub fn partial(&mut self, name: impl Into<String>, real: Arc<dyn Object>)
        -> Partial
    {
        let partial = if self.config.partials_are_based {
            Partial::based(name, real)
        } else {
            Partial::new(name, real)
        };
        self.track(partial.double().clone());
        partial
    }

    /// Verify every tracked double, reporting all failures together.
    pub fn verify(&self) -> Result<()> {
        let errors = self.doubles.iter()
            .filter_map(|d| d.verify().err())
            .collect::<Vec<_>>();
        Error::collect(errors)
    }

    /// End the test: verify, unless `test_failed`, then tear every double
    /// down whatever the outcome.  Only the first call does anything.
    pub fn teardown(&mut self, test_failed: bool) -> Result<()> {
        if self.torn_down {
            return Ok(());
        }
        self.torn_down = true;
        debug!(doubles = self.doubles.len(), test_failed, "container teardown");
        let result = if test_failed {
            Ok(())
        } else {
            self.verify()
        };
        for double in self.doubles.drain(..) {
            double.teardown();
        }
        result
    }

    /// End a test that hasn't failed.
    pub fn close(&mut self) -> Result<()> {
        self.teardown(false)
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        let panicking = thread::panicking();
        if let Err(e) = self.teardown(panicking) {
            if self.config.verify_on_drop {
                panic!("{e}");
            }
            warn!(error = %e, "expectations not met");
        }
    }
}
