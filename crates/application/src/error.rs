use std::fmt::{Display, Formatter};

use pagebook_domain::DomainError;

#[derive(Debug)]
pub enum ApplicationError {
    Domain(DomainError),
    InvalidInput(String),
    InvalidDestination(String),
    EmptyName,
    InvalidName(String),
    DuplicateName(String),
    NoSelection,
    LastPage,
    NotFound(String),
    MissingPage(String),
    CorruptMetadata(String),
    Io(String),
    Decode(String),
    Encode(String),
}

impl Display for ApplicationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Domain(error) => write!(f, "{error}"),
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::InvalidDestination(path) => {
                write!(f, "destination does not exist or is not a directory: {path}")
            }
            Self::EmptyName => write!(f, "name was left empty"),
            Self::InvalidName(name) => write!(f, "invalid name: {name:?}"),
            Self::DuplicateName(name) => {
                write!(f, "a page called {name:?} exists, page names must be unique")
            }
            Self::NoSelection => write!(f, "no page is selected"),
            Self::LastPage => write!(f, "a book must keep at least one page"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::MissingPage(page) => write!(f, "page file is missing: {page}"),
            Self::CorruptMetadata(msg) => write!(f, "corrupt book metadata: {msg}"),
            Self::Io(msg) => write!(f, "io error: {msg}"),
            Self::Decode(msg) => write!(f, "decode error: {msg}"),
            Self::Encode(msg) => write!(f, "encode error: {msg}"),
        }
    }
}

impl std::error::Error for ApplicationError {}

impl From<DomainError> for ApplicationError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::EmptyName => Self::EmptyName,
            DomainError::InvalidName(name) => Self::InvalidName(name),
            other => Self::Domain(other),
        }
    }
}
