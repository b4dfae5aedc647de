/// Log an error with its whole source chain, at `error` level unless another
/// level is given. Trailing tokens are passed on to the `tracing` macro.
#[macro_export]
macro_rules! tracing_report {
    ($level:ident, $error:expr, $($rest:tt)+) => {
        tracing::$level!(err = %snafu::Report::from_error(&$error), $($rest)+)
    };
    ($level:ident, $error:expr) => {
        tracing::$level!(err = %snafu::Report::from_error(&$error))
    };
    ($error:expr) => {
        $crate::tracing_report!(error, $error)
    };
}
