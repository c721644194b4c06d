use thiserror::Error;

/// An error that occurs when a route template cannot be parsed.
///
#[derive(Clone, Debug, Error, PartialEq)]
#[error("invalid route template \"{template}\": {kind}")]
pub struct TemplateError {
    template: Box<str>,
    kind: TemplateErrorKind,
}

#[derive(Clone, Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum TemplateErrorKind {
    #[error("a path segment cannot be empty")]
    EmptySegment,

    #[error("unbalanced braces in segment \"{0}\"")]
    UnbalancedBrace(String),

    #[error("unbalanced parentheses in \"{0}\"")]
    UnbalancedParenthesis(String),

    #[error("a segment must be a literal or a single parameter. found \"{0}\"")]
    ComplexSegment(String),

    #[error("the literal \"{0}\" contains a reserved character")]
    InvalidLiteral(String),

    #[error("parameters must be named")]
    EmptyName,

    #[error("the parameter name \"{0}\" contains a reserved character")]
    InvalidName(String),

    #[error("the catch-all parameter \"{0}\" must be the last segment")]
    CatchAllNotLast(String),

    #[error("the parameter \"{0}\" is declared more than once")]
    DuplicateName(String),

    #[error("the optional parameter \"{0}\" cannot have a default value")]
    OptionalWithDefault(String),

    #[error("the catch-all parameter \"{0}\" cannot be optional")]
    OptionalCatchAll(String),

    #[error("invalid constraint \"{constraint}\" on parameter \"{parameter}\"")]
    InvalidConstraint {
        parameter: String,
        constraint: String,
    },
}

impl TemplateError {
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn kind(&self) -> &TemplateErrorKind {
        &self.kind
    }
}

impl TemplateError {
    pub(crate) fn new(template: &str, kind: TemplateErrorKind) -> Self {
        Self {
            template: template.into(),
            kind,
        }
    }
}
