//! Boxed arguments and return values for calls made by name.

use std::any::{type_name, Any};
use std::fmt;

use crate::dispatch::error::DispatchError;

/// Boxed error carried in an error-typed return position.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Ordered, heterogeneous argument list.
///
/// The same list is offered to every attempt, so methods borrow their
/// arguments through [`Call::arg`] and clone what they need to keep.
#[derive(Default)]
pub struct Args(Vec<Box<dyn Any + Send + Sync>>);

impl Args {
    /// Create an empty argument list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append an argument, builder style.
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    /// Append an argument.
    pub fn push<T: Any + Send + Sync>(&mut self, value: T) {
        self.0.push(Box::new(value));
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn get<T: Any>(&self, index: usize) -> Option<&T> {
        self.0.get(index).and_then(|arg| arg.downcast_ref::<T>())
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args").field("len", &self.0.len()).finish()
    }
}

/// Build an [`Args`] list from a comma-separated sequence of values.
///
/// # Example
///
/// ```rust
/// use retrier::args;
///
/// let args = args!["TestArg".to_string(), 42u32];
/// assert_eq!(args.len(), 2);
/// assert!(args![].is_empty());
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::dispatch::Args::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::dispatch::Args::new()$(.with($value))+
    };
}

/// A single invocation handed to a registered method.
#[derive(Debug, Clone, Copy)]
pub struct Call<'a> {
    method: &'a str,
    args: &'a Args,
}

impl<'a> Call<'a> {
    pub(crate) fn new(method: &'a str, args: &'a Args) -> Self {
        Self { method, args }
    }

    /// Name the method was invoked by.
    pub fn method(&self) -> &'a str {
        self.method
    }

    /// All arguments.
    pub fn args(&self) -> &'a Args {
        self.args
    }

    /// Borrow argument `index` as a `T`.
    ///
    /// Fails with [`DispatchError::ArgumentType`] if the argument is missing
    /// or holds another type.
    pub fn arg<T: Any>(&self, index: usize) -> Result<&'a T, DispatchError> {
        self.args
            .get::<T>(index)
            .ok_or_else(|| DispatchError::ArgumentType {
                method: self.method.to_string(),
                index,
                expected: type_name::<T>(),
            })
    }
}

/// One position of a method's return list.
///
/// Error-typed positions are modelled explicitly: `Error(None)` is a nil
/// error, `Error(Some(_))` marks the attempt as failed. Any position may be
/// an error position, not only the last one.
pub enum ReturnValue {
    /// A plain value.
    Value(Box<dyn Any + Send>),
    /// An error-typed position, `None` when no error occurred.
    Error(Option<BoxError>),
}

impl ReturnValue {
    /// Wrap a plain value.
    pub fn value<T: Any + Send>(value: T) -> Self {
        Self::Value(Box::new(value))
    }

    /// A failed error position.
    pub fn error(error: impl Into<BoxError>) -> Self {
        Self::Error(Some(error.into()))
    }

    /// An error position holding no error.
    pub fn nil_error() -> Self {
        Self::Error(None)
    }

    /// Expand a `Result` into its conventional `(value, error)` pair of
    /// positions. On failure the value position holds `T::default()`.
    pub fn from_result<T, E>(result: Result<T, E>) -> [Self; 2]
    where
        T: Any + Send + Default,
        E: Into<BoxError>,
    {
        match result {
            Ok(value) => [Self::value(value), Self::nil_error()],
            Err(error) => [Self::value(T::default()), Self::error(error)],
        }
    }

    /// Returns true if this position carries an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(Some(_)))
    }

    /// Borrow a plain value as a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Value(value) => value.downcast_ref::<T>(),
            Self::Error(_) => None,
        }
    }

    /// Take a plain value as a `T`, handing the position back on mismatch.
    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        match self {
            Self::Value(value) => value.downcast::<T>().map(|v| *v).map_err(Self::Value),
            other => Err(other),
        }
    }
}

impl fmt::Debug for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(_) => f.write_str("Value(..)"),
            Self::Error(error) => f.debug_tuple("Error").field(error).finish(),
        }
    }
}

/// Split a return list into success or the errors it carries.
///
/// Every position is inspected. If none holds an error the list is handed
/// back untouched; otherwise all errors are returned in position order and
/// the plain values are dropped.
pub fn scan_errors(values: Vec<ReturnValue>) -> Result<Vec<ReturnValue>, Vec<BoxError>> {
    if !values.iter().any(ReturnValue::is_error) {
        return Ok(values);
    }

    let errors = values
        .into_iter()
        .filter_map(|value| match value {
            ReturnValue::Error(Some(error)) => Some(error),
            _ => None,
        })
        .collect();
    Err(errors)
}
