use std::fmt::{self, Display, Formatter};
use thiserror::Error;

use wayfinder_router::TemplateError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error that occurred while building or evaluating a routing table.
///
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A route template could not be parsed.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A template references a constraint that was never registered.
    #[error("the constraint \"{constraint}\" on \"{template}\" is not registered")]
    UnknownConstraint { constraint: String, template: String },

    /// A constraint was registered but rejected its inline argument.
    #[error("invalid argument for the constraint \"{constraint}\": {reason}")]
    InvalidConstraintArgument { constraint: String, reason: String },

    /// An endpoint was registered with a tree dispatcher without a route
    /// pattern.
    #[error("the endpoint \"{0}\" does not have a route pattern")]
    MissingRoute(String),

    /// An endpoint declares a method that is not a valid http token.
    #[error("invalid http method in \"{0}\"")]
    InvalidMethod(String),

    /// The routing configuration could not be read.
    #[error("invalid routing configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// More than one endpoint survived endpoint selection.
    #[error("{0}")]
    AmbiguousMatch(Ambiguous),

    /// More than one address matched the same set of values.
    #[error("{0}")]
    AmbiguousAddress(Ambiguous),
}

/// The display names of every candidate that caused an ambiguity error.
///
#[derive(Debug)]
pub struct Ambiguous {
    subject: &'static str,
    names: Vec<String>,
}

impl Error {
    pub(crate) fn ambiguous_match<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::AmbiguousMatch(Ambiguous::new("request matched multiple endpoints", names))
    }

    pub(crate) fn ambiguous_address<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::AmbiguousAddress(Ambiguous::new("values matched multiple addresses", names))
    }

    /// Returns the display names of the ambiguous candidates if this is an
    /// ambiguity error.
    pub fn ambiguous_names(&self) -> Option<&[String]> {
        match self {
            Self::AmbiguousMatch(ambiguous) | Self::AmbiguousAddress(ambiguous) => {
                Some(&ambiguous.names)
            }
            _ => None,
        }
    }
}

impl Ambiguous {
    fn new<'a, I>(subject: &'static str, names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self {
            subject,
            names: names.into_iter().map(str::to_owned).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Display for Ambiguous {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        writeln!(f, "the {}. matches:", self.subject)?;

        for name in &self.names {
            write!(f, "\n{}", name)?;
        }

        Ok(())
    }
}
