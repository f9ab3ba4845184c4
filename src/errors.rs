use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("unknown type annotation `{name}` at line {line}")]
    UnknownType { line: usize, name: String },

    #[error("internal invariant violated: {0}")]
    Invariant(String),

    #[error("{0}")]
    Msg(String),
}

impl From<&str> for EngineError {
    fn from(s: &str) -> Self {
        EngineError::Msg(s.to_owned())
    }
}

impl From<String> for EngineError {
    fn from(s: String) -> Self {
        EngineError::Msg(s)
    }
}

#[test]
fn io_conversion_retains_message() {
    let e = std::io::Error::new(std::io::ErrorKind::Other, "boom!");
    let n: EngineError = e.into();
    assert!(matches!(n, EngineError::Io(_)));
    assert!(n.to_string().contains("boom"));
}

#[test]
fn unknown_type_message_carries_annotation_and_line() {
    let e = EngineError::UnknownType { line: 3, name: "bytes".into() };
    assert_eq!(e.to_string(), "unknown type annotation `bytes` at line 3");
}
