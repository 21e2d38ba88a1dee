//! Invoking methods by name.
//!
//! Rust has no runtime reflection, so a type opts in by publishing a
//! [`MethodTable`] through the [`Dispatch`] trait: a map from method names to
//! closures taking the receiver and a [`Call`]. The retry engine then invokes
//! `object.method(args...)` knowing only the method's name.
//!
//! # Receivers
//!
//! - `&mut T` invokes on the caller's object. State the method mutates is
//!   visible to later attempts and to the caller afterwards.
//! - [`ByValue<T>`] invokes every attempt on a fresh clone, so nothing
//!   carries over between attempts.
//!
//! # Example
//!
//! ```rust
//! use retrier::dispatch::{Call, Dispatch, DispatchError, MethodTable, ReturnValue};
//! use retrier::{args, Retrier};
//! use std::time::Duration;
//!
//! #[derive(Default)]
//! struct Echo {
//!     calls: u32,
//! }
//!
//! impl Dispatch for Echo {
//!     fn methods(table: &mut MethodTable<Self>) {
//!         table.register("Echo", 1, |echo: &mut Echo, call: &Call<'_>| {
//!             echo.calls += 1;
//!             let text: &String = call.arg(0)?;
//!             Ok(vec![ReturnValue::value(text.clone())])
//!         });
//!     }
//! }
//!
//! let mut echo = Echo::default();
//! let outcome = Retrier::new(Duration::ZERO, 3, 1)
//!     .execute_method(&mut echo, "Echo", args!["hi".to_string()]);
//!
//! let results = outcome.into_value().expect("echo succeeds");
//! assert_eq!(results[0].downcast_ref::<String>().map(String::as_str), Some("hi"));
//! assert_eq!(echo.calls, 1);
//! ```

mod error;
mod value;

pub use error::DispatchError;
pub use value::{scan_errors, Args, BoxError, Call, ReturnValue};

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};

type MethodFn<T> =
    Box<dyn Fn(&mut T, &Call<'_>) -> Result<Vec<ReturnValue>, DispatchError> + Send + Sync>;

struct Method<T> {
    arity: usize,
    call: MethodFn<T>,
}

/// Name-based dispatch table for receivers of type `T`.
pub struct MethodTable<T> {
    methods: HashMap<&'static str, Method<T>>,
}

impl<T> MethodTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    /// Register `name` taking exactly `arity` arguments.
    ///
    /// Registering the same name twice replaces the earlier entry.
    pub fn register<F>(&mut self, name: &'static str, arity: usize, method: F) -> &mut Self
    where
        F: Fn(&mut T, &Call<'_>) -> Result<Vec<ReturnValue>, DispatchError>
            + Send
            + Sync
            + 'static,
    {
        self.methods.insert(
            name,
            Method {
                arity,
                call: Box::new(method),
            },
        );
        self
    }

    /// Returns true if a method with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Declared arity of a method.
    pub fn arity(&self, name: &str) -> Option<usize> {
        self.methods.get(name).map(|m| m.arity)
    }

    /// Registered method names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.methods.keys().copied()
    }

    /// Call `receiver.method(args...)` and return its raw return list.
    pub fn invoke(
        &self,
        receiver: &mut T,
        method: &str,
        args: &Args,
    ) -> Result<Vec<ReturnValue>, DispatchError> {
        let entry = self
            .methods
            .get(method)
            .ok_or_else(|| DispatchError::UnknownMethod {
                method: method.to_string(),
                type_name: type_name::<T>(),
            })?;

        if args.len() != entry.arity {
            return Err(DispatchError::ArgumentCount {
                method: method.to_string(),
                expected: entry.arity,
                actual: args.len(),
            });
        }

        (entry.call)(receiver, &Call::new(method, args))
    }
}

impl<T: Dispatch> MethodTable<T> {
    /// Build the table `T` publishes.
    pub fn of() -> Self {
        let mut table = Self::new();
        T::methods(&mut table);
        table
    }
}

impl<T> Default for MethodTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for MethodTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("MethodTable")
            .field("type", &type_name::<T>())
            .field("methods", &names)
            .finish()
    }
}

/// A type whose methods can be invoked by name.
pub trait Dispatch: Sized {
    /// Register every method callable by name.
    fn methods(table: &mut MethodTable<Self>);
}

/// Receiver resolved for a single attempt.
#[derive(Debug)]
pub enum Resolved<'a, T> {
    /// The caller's object.
    Borrowed(&'a mut T),
    /// A fresh copy owned by this attempt.
    Fresh(T),
}

impl<T> Deref for Resolved<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            Resolved::Borrowed(receiver) => &**receiver,
            Resolved::Fresh(receiver) => receiver,
        }
    }
}

impl<T> DerefMut for Resolved<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        match self {
            Resolved::Borrowed(receiver) => &mut **receiver,
            Resolved::Fresh(receiver) => receiver,
        }
    }
}

/// Something a method can be invoked on by name.
pub trait Target {
    /// Type whose [`MethodTable`] resolves the method.
    type Receiver: Dispatch;

    /// Resolve the receiver for the next attempt.
    fn resolve(&mut self) -> Resolved<'_, Self::Receiver>;
}

impl<T: Dispatch> Target for &mut T {
    type Receiver = T;

    fn resolve(&mut self) -> Resolved<'_, T> {
        Resolved::Borrowed(&mut **self)
    }
}

/// Invoke on a fresh clone of the wrapped value for every attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByValue<T>(pub T);

impl<T: Dispatch + Clone> Target for ByValue<T> {
    type Receiver = T;

    fn resolve(&mut self) -> Resolved<'_, T> {
        Resolved::Fresh(self.0.clone())
    }
}
