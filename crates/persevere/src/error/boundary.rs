/// Declares a conversion from a foreign error into one of this crate's errors.
///
/// Expands to a `From` implementation, so `?` converts at the boundary
/// without a `map_err()` at every call site. The configuration loaders use
/// it to fold I/O and parser failures into [`ConfigError`](crate::error::ConfigError).
///
/// # Syntax
///
/// ```ignore
/// error_boundary!(SourceError => TargetError, |err_var| {
///     // conversion logic returning TargetError
/// });
/// ```
///
/// # Example
///
/// ```
/// use persevere::error_boundary;
/// use std::io;
///
/// #[derive(Debug, thiserror::Error)]
/// enum LoadError {
///     #[error("IO: {0}")]
///     Io(String),
/// }
///
/// error_boundary!(io::Error => LoadError, |e| {
///     LoadError::Io(e.to_string())
/// });
///
/// fn read_policy() -> Result<String, LoadError> {
///     let raw = std::fs::read_to_string("retry.toml")?;
///     Ok(raw)
/// }
/// ```
#[macro_export]
macro_rules! error_boundary {
    ($inner:ty => $outer:ty, |$err:ident| $body:expr) => {
        impl ::std::convert::From<$inner> for $outer {
            fn from($err: $inner) -> $outer {
                $body
            }
        }
    };
}
