#![forbid(unsafe_code)]

mod error;
mod path;
mod router;
mod template;
mod tree;

pub use error::{TemplateError, TemplateErrorKind};
pub use path::{Segments, Span, SplitPath};
pub use router::{Matches, Router, TreeBuilder};
pub use template::{
    Captures, InlineConstraint, Param, Parameter, Part, Precedence, RouteTemplate,
    TemplateMatcher,
};
pub use tree::{InboundRouteEntry, Node, Traversal, UrlMatchingTree};
