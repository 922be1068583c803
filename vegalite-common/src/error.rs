use std::result;
use thiserror::Error;

pub type Result<T> = result::Result<T, VegaLiteError>;

#[derive(Clone, Debug, Default)]
pub struct ErrorContext {
    pub contexts: Vec<String>,
}

impl std::fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        for (i, context) in self.contexts.iter().enumerate() {
            writeln!(f, "    Context[{i}]: {context}")?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum VegaLiteError {
    #[error("Specification error: {0}\n{1}")]
    SpecificationError(String, ErrorContext),

    #[error("Compilation error: {0}\n{1}")]
    CompilationError(String, ErrorContext),

    #[error("Internal error: {0}\n{1}")]
    InternalError(String, ErrorContext),

    #[error("Serde JSON Error: {0}\n{1}")]
    SerdeJsonError(serde_json::Error, ErrorContext),
}

impl VegaLiteError {
    /// Append a new context level to the error
    pub fn with_context<S, F>(self, context_fn: F) -> Self
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        use VegaLiteError::*;
        match self {
            SpecificationError(msg, mut context) => {
                context.contexts.push(context_fn().into());
                VegaLiteError::SpecificationError(msg, context)
            }
            CompilationError(msg, mut context) => {
                context.contexts.push(context_fn().into());
                VegaLiteError::CompilationError(msg, context)
            }
            InternalError(msg, mut context) => {
                context.contexts.push(context_fn().into());
                VegaLiteError::InternalError(msg, context)
            }
            SerdeJsonError(err, mut context) => {
                context.contexts.push(context_fn().into());
                VegaLiteError::SerdeJsonError(err, context)
            }
        }
    }

    pub fn specification<S: Into<String>>(message: S) -> Self {
        Self::SpecificationError(message.into(), Default::default())
    }

    pub fn compilation<S: Into<String>>(message: S) -> Self {
        Self::CompilationError(message.into(), Default::default())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::InternalError(message.into(), Default::default())
    }

    /// The message without the context trail
    pub fn message(&self) -> String {
        use VegaLiteError::*;
        match self {
            SpecificationError(msg, _) | CompilationError(msg, _) | InternalError(msg, _) => {
                msg.clone()
            }
            SerdeJsonError(err, _) => err.to_string(),
        }
    }

    /// Whether the error stems from the user's input rather than the compiler itself
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            VegaLiteError::SpecificationError(..) | VegaLiteError::CompilationError(..)
        )
    }
}

pub trait ResultWithContext<R> {
    fn with_context<S, F>(self, context_fn: F) -> Result<R>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<R, E> ResultWithContext<R> for result::Result<R, E>
where
    E: Into<VegaLiteError>,
{
    fn with_context<S, F>(self, context_fn: F) -> Result<R>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        match self {
            Ok(val) => Ok(val),
            Err(err) => {
                let vega_lite_error: VegaLiteError = err.into();
                Err(vega_lite_error.with_context(context_fn))
            }
        }
    }
}

impl<R> ResultWithContext<R> for Option<R> {
    fn with_context<S, F>(self, context_fn: F) -> Result<R>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        match self {
            Some(val) => Ok(val),
            None => Err(VegaLiteError::internal(context_fn().into())),
        }
    }
}

impl From<serde_json::Error> for VegaLiteError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerdeJsonError(err, Default::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_is_appended() {
        let res: Result<()> = Err(VegaLiteError::compilation("bad scale"));
        let err = res
            .with_context(|| "while parsing scale x")
            .unwrap_err()
            .with_context(|| "in unit concat_0");
        let msg = err.to_string();
        assert!(msg.starts_with("Compilation error: bad scale"));
        assert!(msg.contains("Context[0]: while parsing scale x"));
        assert!(msg.contains("Context[1]: in unit concat_0"));
        assert_eq!(err.message(), "bad scale");
    }

    #[test]
    fn test_none_becomes_internal_error() {
        let missing: Option<u32> = None;
        let err = missing.with_context(|| "no scale component").unwrap_err();
        assert!(matches!(err, VegaLiteError::InternalError(..)));
        assert!(!err.is_user_error());
    }
}
