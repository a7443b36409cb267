//! Convenience macros for returning results from command functions.

/// Returns an `Ok` [`TickleResult`](types/type.TickleResult.html).
///
/// With no arguments, the result is the empty value.  With one argument, the argument is
/// converted with `Value::from`.  With more than one, the arguments are passed to `format!`.
///
/// ```
/// use tickle::*;
///
/// fn cmd_hello() -> TickleResult {
///     tickle_ok!("Hello, {}!", "world")
/// }
/// assert_eq!(cmd_hello().unwrap().as_str(), "Hello, world!");
/// ```
#[macro_export]
macro_rules! tickle_ok {
    () => (
        Ok($crate::Value::empty())
    );
    ($arg:expr) => (
        Ok($crate::Value::from($arg))
    );
    ($($arg:tt)*) => (
        Ok($crate::Value::from(format!($($arg)*)))
    )
}

/// Returns an `Ok` [`TickleOptResult`](types/type.TickleOptResult.html), as produced by
/// command functions.  The arguments are as for [`tickle_ok!`].
#[macro_export]
macro_rules! tickle_opt_ok {
    () => (
        Ok(None)
    );
    ($arg:expr) => (
        Ok(Some($crate::Value::from($arg)))
    );
    ($($arg:tt)*) => (
        Ok(Some($crate::Value::from(format!($($arg)*))))
    )
}

/// Returns a generic error.  The arguments are as for [`tickle_ok!`].
///
/// ```
/// use tickle::*;
///
/// fn cmd_fail() -> TickleResult {
///     tickle_err!("no such thing: {}", "gizmo")
/// }
/// let exception = cmd_fail().unwrap_err();
/// assert!(exception.is_error());
/// assert_eq!(exception.value().as_str(), "no such thing: gizmo");
/// ```
#[macro_export]
macro_rules! tickle_err {
    ($arg:expr) => (
        Err($crate::Exception::tickle_err($crate::Value::from($arg)))
    );
    ($($arg:tt)*) => (
        Err($crate::Exception::tickle_err($crate::Value::from(format!($($arg)*))))
    )
}

/// Returns an error of a specific [`ErrorKind`](types/enum.ErrorKind.html); the remaining
/// arguments are passed to `format!`.
///
/// ```
/// use tickle::*;
///
/// fn cmd_divide() -> TickleResult {
///     tickle_throw!(ErrorKind::DivisionByZero, "divide by zero")
/// }
/// let exception = cmd_divide().unwrap_err();
/// assert_eq!(exception.error_kind(), Some(ErrorKind::DivisionByZero));
/// ```
#[macro_export]
macro_rules! tickle_throw {
    ($kind:expr, $($arg:tt)*) => (
        Err($crate::Exception::error($kind, format!($($arg)*)))
    )
}
