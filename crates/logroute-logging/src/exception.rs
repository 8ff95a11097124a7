//! Scoped exception logging
//!
//! [`ExceptionScope`] runs a fallible operation and, when it fails with an
//! error in the scope's [`Category`], emits exactly one ERROR record
//! `Exception in <operation>` carrying the full trace. The failure itself is
//! handed back to the caller untouched.

use crate::logger::Logger;
use crate::record::{trim_function_name, Caller, ExceptionTrace};
use std::error::Error;
use std::fmt;
use std::panic::{self, Location, UnwindSafe};
use std::sync::Arc;

type Predicate = Arc<dyn Fn(&(dyn Error + 'static)) -> bool + Send + Sync>;
type TypeCheck = fn(&(dyn Error + 'static)) -> bool;

/// Which failures a scope logs
#[derive(Clone, Default)]
pub enum Category {
    /// Every error, and panics in [`ExceptionScope::run_unwinding`]
    #[default]
    Any,
    /// Errors whose concrete type is the named one, boxed or not
    Type(TypeCheck, &'static str),
    /// Errors accepted by a predicate
    Matching(Predicate),
}

fn is_type<T: Error + 'static>(err: &(dyn Error + 'static)) -> bool {
    err.is::<T>()
}

impl Category {
    pub fn any() -> Self {
        Category::Any
    }

    pub fn of<T: Error + 'static>() -> Self {
        Category::Type(is_type::<T>, std::any::type_name::<T>())
    }

    pub fn matching<P>(predicate: P) -> Self
    where
        P: Fn(&(dyn Error + 'static)) -> bool + Send + Sync + 'static,
    {
        Category::Matching(Arc::new(predicate))
    }

    fn contains(&self, err: &(dyn Error + 'static)) -> bool {
        match self {
            Category::Any => true,
            Category::Type(check, _) => check(err),
            Category::Matching(predicate) => predicate(err),
        }
    }
}

/// Type-erased errors accepted by [`ExceptionScope::run_boxed`]
///
/// `Box<dyn Error>` does not implement [`Error`] itself, so boxed failures
/// go through this trait instead of the generic bound of [`ExceptionScope::run`].
pub trait BoxedError {
    fn as_dyn_error(&self) -> &(dyn Error + 'static);
}

impl BoxedError for Box<dyn Error> {
    fn as_dyn_error(&self) -> &(dyn Error + 'static) {
        &**self
    }
}

impl BoxedError for Box<dyn Error + Send> {
    fn as_dyn_error(&self) -> &(dyn Error + 'static) {
        &**self
    }
}

impl BoxedError for Box<dyn Error + Send + Sync> {
    fn as_dyn_error(&self) -> &(dyn Error + 'static) {
        &**self
    }
}

impl fmt::Debug for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Any => f.write_str("Any"),
            Category::Type(_, name) => f.debug_tuple("Type").field(name).finish(),
            Category::Matching(_) => f.write_str("Matching(..)"),
        }
    }
}

/// Logs failures of wrapped operations and returns them unchanged
#[derive(Debug, Clone)]
pub struct ExceptionScope {
    logger: Logger,
    category: Category,
}

impl ExceptionScope {
    pub fn new(logger: Logger, category: Category) -> Self {
        Self { logger, category }
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    /// Run `f`, naming the operation after the enclosing function
    #[track_caller]
    pub fn run<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: Error + 'static,
    {
        let caller = self.enclosing::<F>(Location::caller());
        let outcome = f();
        if let Err(err) = &outcome {
            self.observe(caller.function, caller, err, std::any::type_name::<E>());
        }
        outcome
    }

    /// Run `f` under an explicit operation name
    #[track_caller]
    pub fn run_named<F, T, E>(&self, operation: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: Error + 'static,
    {
        let caller = Caller::from_location(Location::caller());
        let outcome = f();
        if let Err(err) = &outcome {
            self.observe(operation, caller, err, std::any::type_name::<E>());
        }
        outcome
    }

    /// [`run`](Self::run) for operations failing with a boxed error
    #[track_caller]
    pub fn run_boxed<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: BoxedError,
    {
        let caller = self.enclosing::<F>(Location::caller());
        let outcome = f();
        if let Err(err) = &outcome {
            self.observe_dyn(caller.function, caller, err.as_dyn_error());
        }
        outcome
    }

    /// [`run_named`](Self::run_named) for operations failing with a boxed error
    #[track_caller]
    pub fn run_boxed_named<F, T, E>(&self, operation: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: BoxedError,
    {
        let caller = Caller::from_location(Location::caller());
        let outcome = f();
        if let Err(err) = &outcome {
            self.observe_dyn(operation, caller, err.as_dyn_error());
        }
        outcome
    }

    /// Run `f`, logging a panic before resuming it with the original payload
    ///
    /// Panics are only logged by scopes with [`Category::Any`].
    #[track_caller]
    pub fn run_unwinding<F, T>(&self, f: F) -> T
    where
        F: FnOnce() -> T + UnwindSafe,
    {
        let caller = self.enclosing::<F>(Location::caller());
        let operation = caller.function;
        match panic::catch_unwind(f) {
            Ok(value) => value,
            Err(payload) => {
                if matches!(self.category, Category::Any) {
                    self.logger.exception_at(
                        format!("Exception in {}", operation),
                        ExceptionTrace::from_panic(payload.as_ref()),
                        caller,
                    );
                }
                panic::resume_unwind(payload)
            }
        }
    }

    fn enclosing<F>(&self, location: &'static Location<'static>) -> Caller {
        Caller {
            function: trim_function_name(std::any::type_name::<F>()),
            ..Caller::from_location(location)
        }
    }

    fn observe(
        &self,
        operation: &str,
        caller: Caller,
        err: &(dyn Error + 'static),
        type_name: &str,
    ) {
        if self.category.contains(err) {
            let mut trace = ExceptionTrace::from_dyn(err);
            trace.type_name = type_name.to_string();
            self.emit(operation, caller, trace);
        }
    }

    fn observe_dyn(&self, operation: &str, caller: Caller, err: &(dyn Error + 'static)) {
        if self.category.contains(err) {
            self.emit(operation, caller, ExceptionTrace::from_dyn(err));
        }
    }

    fn emit(&self, operation: &str, caller: Caller, trace: ExceptionTrace) {
        self.logger
            .exception_at(format!("Exception in {}", operation), trace, caller);
    }
}
