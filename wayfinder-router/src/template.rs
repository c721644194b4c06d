use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use crate::error::{TemplateError, TemplateErrorKind};
use crate::path::Segments;

/// An identifier for a named path segment.
///
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Param {
    ident: Arc<str>,
}

/// A constraint reference in a parameter segment. `{id:int}` produces a
/// constraint named `int` without an argument and `{id:min(1)}` produces a
/// constraint named `min` with the argument `1`.
///
#[derive(Clone, Debug, PartialEq)]
pub struct InlineConstraint {
    name: Box<str>,
    argument: Option<Box<str>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Parameter {
    name: Param,
    default: Option<Arc<str>>,
    optional: bool,
    catch_all: bool,
    constraints: Vec<InlineConstraint>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Part {
    Literal(Box<str>),
    Parameter(Parameter),
}

/// A parsed route template such as `{controller=Home}/{action=Index}/{id?}`.
///
#[derive(Clone, Debug, PartialEq)]
pub struct RouteTemplate {
    text: Box<str>,
    segments: Vec<Part>,
}

/// The specificity of a route template. Lower values are tried first.
///
/// Each segment contributes one digit in a decimal fraction so that the
/// first segment dominates. `a/{id}` (1.3) sorts before `{id}/a` (3.1).
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Precedence {
    digits: SmallVec<[u8; 8]>,
}

/// The values bound by a successful call to [`TemplateMatcher::try_match`].
///
#[derive(Clone, Debug, Default)]
pub struct Captures {
    entries: SmallVec<[(Param, String); 4]>,
}

/// Binds the segments of a request path to the parameters of a template.
///
#[derive(Clone, Debug)]
pub struct TemplateMatcher {
    template: Arc<RouteTemplate>,
}

const RESERVED: &[char] = &['{', '}', '/', '*', '?', '=', ':', '(', ')'];

impl Param {
    pub fn as_str(&self) -> &str {
        &self.ident
    }
}

impl Param {
    pub(crate) fn new(ident: &str) -> Self {
        Self {
            ident: ident.into(),
        }
    }
}

impl Display for Param {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(&self.ident, f)
    }
}

impl From<&str> for Param {
    fn from(ident: &str) -> Self {
        Self::new(ident)
    }
}

impl InlineConstraint {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }
}

impl Display for InlineConstraint {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.argument {
            Some(argument) => write!(f, "{}({})", self.name, argument),
            None => f.write_str(&self.name),
        }
    }
}

impl Parameter {
    pub fn name(&self) -> &Param {
        &self.name
    }

    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_catch_all(&self) -> bool {
        self.catch_all
    }

    pub fn constraints(&self) -> &[InlineConstraint] {
        &self.constraints
    }

    pub fn is_constrained(&self) -> bool {
        !self.constraints.is_empty()
    }

    /// Returns true if a request path may omit this segment.
    pub fn is_omittable(&self) -> bool {
        self.optional || self.catch_all || self.default.is_some()
    }
}

impl Part {
    pub fn as_parameter(&self) -> Option<&Parameter> {
        match self {
            Self::Parameter(parameter) => Some(parameter),
            Self::Literal(_) => None,
        }
    }

    pub fn is_omittable(&self) -> bool {
        self.as_parameter().is_some_and(Parameter::is_omittable)
    }
}

impl RouteTemplate {
    /// Parses a route template.
    ///
    /// A leading `/` or `~/` and a single trailing `/` are ignored. Each
    /// segment is either a literal or exactly one parameter:
    ///
    /// - `{name}` a required parameter
    /// - `{name=default}` a parameter with a default value
    /// - `{name?}` an optional parameter
    /// - `{*name}` a catch-all parameter, only valid as the last segment
    ///
    /// Parameters accept a list of constraints between the name and the
    /// optional marker or default value. `{id:int:min(1)?}`.
    ///
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        let error = |kind: TemplateErrorKind| TemplateError::new(text, kind);

        let trimmed = text
            .strip_prefix("~/")
            .or_else(|| text.strip_prefix('/'))
            .unwrap_or(text);
        let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

        let mut segments = Vec::new();

        if !trimmed.is_empty() {
            for raw in trimmed.split('/') {
                segments.push(parse_segment(raw).map_err(error)?);
            }
        }

        {
            let last = segments.len().saturating_sub(1);
            let mut names: SmallVec<[&Param; 8]> = SmallVec::new();

            for (index, parameter) in segments
                .iter()
                .enumerate()
                .filter_map(|(index, part)| Some((index, part.as_parameter()?)))
            {
                let name = parameter.name();

                if parameter.is_catch_all() && index != last {
                    return Err(error(TemplateErrorKind::CatchAllNotLast(name.to_string())));
                }

                if names
                    .iter()
                    .any(|other| other.as_str().eq_ignore_ascii_case(name.as_str()))
                {
                    return Err(error(TemplateErrorKind::DuplicateName(name.to_string())));
                }

                names.push(name);
            }
        }

        Ok(Self {
            text: text.into(),
            segments,
        })
    }

    /// Returns the template as it was written.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn segments(&self) -> &[Part] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.segments.iter().filter_map(Part::as_parameter)
    }

    /// Returns the name and default value of each parameter with a default.
    pub fn defaults(&self) -> impl Iterator<Item = (&Param, &str)> {
        self.parameters()
            .filter_map(|parameter| Some((parameter.name(), parameter.default()?)))
    }

    pub fn precedence(&self) -> Precedence {
        Precedence::inbound(self)
    }
}

impl Display for RouteTemplate {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Precedence {
    /// Computes the inbound precedence of `template`.
    ///
    /// | segment                   | digit |
    /// |---------------------------|-------|
    /// | literal                   | 1     |
    /// | constrained parameter     | 2     |
    /// | parameter                 | 3     |
    /// | constrained catch-all     | 4     |
    /// | catch-all                 | 5     |
    ///
    pub fn inbound(template: &RouteTemplate) -> Self {
        let digits = template
            .segments()
            .iter()
            .map(|part| match part {
                Part::Literal(_) => 1,
                Part::Parameter(parameter) => {
                    match (parameter.is_catch_all(), parameter.is_constrained()) {
                        (false, true) => 2,
                        (false, false) => 3,
                        (true, true) => 4,
                        (true, false) => 5,
                    }
                }
            })
            .collect();

        Self { digits }
    }

    pub fn digits(&self) -> &[u8] {
        &self.digits
    }
}

impl Ord for Precedence {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.digits.len().max(other.digits.len());

        (0..len)
            .map(|index| {
                let lhs = self.digits.get(index).copied().unwrap_or(0);
                let rhs = other.digits.get(index).copied().unwrap_or(0);
                lhs.cmp(&rhs)
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for Precedence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Precedence {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let Some((first, rest)) = self.digits.split_first() else {
            return f.write_str("0");
        };

        write!(f, "{}", first)?;

        if !rest.is_empty() {
            f.write_str(".")?;
            for digit in rest {
                write!(f, "{}", digit)?;
            }
        }

        Ok(())
    }
}

impl Captures {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the value bound to `name`. Names are compared ASCII
    /// case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(param, _)| param.as_str().eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Param, &str)> {
        self.entries
            .iter()
            .map(|(param, value)| (param, value.as_str()))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn push(&mut self, param: &Param, value: &str) {
        self.entries.push((param.clone(), value.to_owned()));
    }
}

impl IntoIterator for Captures {
    type Item = (Param, String);
    type IntoIter = smallvec::IntoIter<[(Param, String); 4]>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl TemplateMatcher {
    pub fn new(template: Arc<RouteTemplate>) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    /// Attempts to bind `segments` to the parameters of the template.
    ///
    /// Returns false when a literal does not match, a required parameter is
    /// missing, or the path has more segments than the template can absorb.
    /// Values appended to `captures` are removed again when the match fails.
    ///
    pub fn try_match(&self, segments: &Segments, captures: &mut Captures) -> bool {
        let checkpoint = captures.len();
        let matched = self.bind(segments, captures);

        if !matched {
            captures.entries.truncate(checkpoint);
        }

        matched
    }

    fn bind(&self, segments: &Segments, captures: &mut Captures) -> bool {
        for (index, part) in self.template.segments().iter().enumerate() {
            let parameter = match (part, segments.get(index)) {
                (Part::Literal(literal), Some(value)) => {
                    if literal.eq_ignore_ascii_case(value) {
                        continue;
                    }

                    return false;
                }
                (Part::Literal(_), None) => return false,
                (Part::Parameter(parameter), _) => parameter,
            };

            match segments.get(index) {
                // A catch-all is always the final segment and absorbs the
                // remainder of the path.
                Some(_) if parameter.is_catch_all() => {
                    if let Some(rest) = segments.rest(index) {
                        captures.push(parameter.name(), rest);
                    }

                    return true;
                }
                Some(value) => captures.push(parameter.name(), value),
                None => match parameter.default() {
                    Some(default) => captures.push(parameter.name(), default),
                    None if parameter.is_omittable() => {}
                    None => return false,
                },
            }
        }

        segments.len() <= self.template.len()
    }
}

fn parse_segment(raw: &str) -> Result<Part, TemplateErrorKind> {
    if raw.is_empty() {
        return Err(TemplateErrorKind::EmptySegment);
    }

    let opens = raw.matches('{').count();
    let closes = raw.matches('}').count();

    if opens == 0 && closes == 0 {
        if raw.contains('?') {
            return Err(TemplateErrorKind::InvalidLiteral(raw.to_owned()));
        }

        return Ok(Part::Literal(raw.into()));
    }

    if opens != closes {
        return Err(TemplateErrorKind::UnbalancedBrace(raw.to_owned()));
    }

    match raw
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(inner) if opens == 1 => parse_parameter(inner).map(Part::Parameter),
        _ => Err(TemplateErrorKind::ComplexSegment(raw.to_owned())),
    }
}

fn parse_parameter(inner: &str) -> Result<Parameter, TemplateErrorKind> {
    let (catch_all, rest) = match inner.strip_prefix('*') {
        Some(rest) => (true, rest),
        None => (false, inner),
    };

    let (rest, default) = match find_unnested(rest, '=') {
        Some(index) => (&rest[..index], Some(&rest[index + 1..])),
        None => (rest, None),
    };

    let (rest, optional) = match rest.strip_suffix('?') {
        Some(rest) => (rest, true),
        None => (rest, false),
    };

    let mut parts = split_unnested(rest, ':')?.into_iter();
    let name = parts.next().unwrap_or("");

    if name.trim().is_empty() {
        return Err(TemplateErrorKind::EmptyName);
    }

    if name.contains(RESERVED) {
        return Err(TemplateErrorKind::InvalidName(name.to_owned()));
    }

    if optional && default.is_some() {
        return Err(TemplateErrorKind::OptionalWithDefault(name.to_owned()));
    }

    if optional && catch_all {
        return Err(TemplateErrorKind::OptionalCatchAll(name.to_owned()));
    }

    let constraints = parts
        .map(|text| parse_constraint(name, text))
        .collect::<Result<_, _>>()?;

    Ok(Parameter {
        name: Param::new(name),
        default: default.map(Arc::from),
        optional,
        catch_all,
        constraints,
    })
}

fn parse_constraint(parameter: &str, text: &str) -> Result<InlineConstraint, TemplateErrorKind> {
    let invalid = || TemplateErrorKind::InvalidConstraint {
        parameter: parameter.to_owned(),
        constraint: text.to_owned(),
    };

    let (name, argument) = match text.find('(') {
        Some(open) => {
            let argument = text[open + 1..].strip_suffix(')').ok_or_else(invalid)?;
            (&text[..open], Some(argument))
        }
        None => (text, None),
    };

    if name.is_empty() || name.contains(RESERVED) {
        return Err(invalid());
    }

    Ok(InlineConstraint {
        name: name.into(),
        argument: argument.map(Box::from),
    })
}

/// Returns the byte offset of the first `needle` that is not enclosed in
/// parentheses.
fn find_unnested(value: &str, needle: char) -> Option<usize> {
    let mut depth = 0usize;

    value.char_indices().find_map(|(index, c)| {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if c == needle && depth == 0 => return Some(index),
            _ => {}
        }

        None
    })
}

fn split_unnested(value: &str, separator: char) -> Result<SmallVec<[&str; 4]>, TemplateErrorKind> {
    let mut parts = SmallVec::new();
    let mut depth = 0isize;
    let mut start = 0;

    for (index, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if c == separator && depth == 0 => {
                parts.push(&value[start..index]);
                start = index + c.len_utf8();
            }
            _ => {}
        }

        if depth < 0 {
            return Err(TemplateErrorKind::UnbalancedParenthesis(value.to_owned()));
        }
    }

    if depth != 0 {
        return Err(TemplateErrorKind::UnbalancedParenthesis(value.to_owned()));
    }

    parts.push(&value[start..]);
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Captures, Part, Precedence, RouteTemplate, TemplateMatcher};
    use crate::error::TemplateErrorKind;
    use crate::Segments;

    fn matcher(template: &str) -> TemplateMatcher {
        TemplateMatcher::new(Arc::new(RouteTemplate::parse(template).unwrap()))
    }

    fn kind(template: &str) -> TemplateErrorKind {
        RouteTemplate::parse(template).unwrap_err().kind().clone()
    }

    #[test]
    fn test_parse_segments() {
        let template = RouteTemplate::parse("/api/{version:int}/{*path}").unwrap();
        let segments = template.segments();

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], Part::Literal("api".into()));

        let version = segments[1].as_parameter().unwrap();
        assert_eq!(version.name().as_str(), "version");
        assert_eq!(version.constraints()[0].name(), "int");
        assert!(!version.is_catch_all());

        let path = segments[2].as_parameter().unwrap();
        assert!(path.is_catch_all());
        assert!(path.is_omittable());
    }

    #[test]
    fn test_parse_defaults_and_optionals() {
        let template = RouteTemplate::parse("{controller=Home}/{action=Index}/{id?}").unwrap();
        let defaults: Vec<_> = template
            .defaults()
            .map(|(name, value)| (name.as_str(), value))
            .collect();

        assert_eq!(defaults, [("controller", "Home"), ("action", "Index")]);
        assert!(template.segments()[2].as_parameter().unwrap().is_optional());
    }

    #[test]
    fn test_parse_constraint_arguments() {
        let template = RouteTemplate::parse("{page:range(1,10):int=1}").unwrap();
        let page = template.segments()[0].as_parameter().unwrap();
        let constraints = page.constraints();

        assert_eq!(constraints.len(), 2);
        assert_eq!(constraints[0].name(), "range");
        assert_eq!(constraints[0].argument(), Some("1,10"));
        assert_eq!(constraints[1].to_string(), "int");
        assert_eq!(page.default(), Some("1"));
    }

    #[test]
    fn test_parse_root() {
        for text in ["", "/", "~/"] {
            assert!(RouteTemplate::parse(text).unwrap().is_empty(), "{}", text);
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(kind("a/{id"), TemplateErrorKind::UnbalancedBrace(_)));
        assert!(matches!(kind("a/id}"), TemplateErrorKind::UnbalancedBrace(_)));
        assert!(matches!(kind("a//b"), TemplateErrorKind::EmptySegment));
        assert!(matches!(kind("{}"), TemplateErrorKind::EmptyName));
        assert!(matches!(kind("{a}-{b}"), TemplateErrorKind::ComplexSegment(_)));
        assert!(matches!(kind("{a/b"), TemplateErrorKind::UnbalancedBrace(_)));
        assert!(matches!(kind("a?"), TemplateErrorKind::InvalidLiteral(_)));
        assert!(matches!(kind("{id?=1}"), TemplateErrorKind::OptionalWithDefault(_)));
        assert!(matches!(kind("{*rest?}"), TemplateErrorKind::OptionalCatchAll(_)));
        assert!(matches!(kind("{id:min(1}"), TemplateErrorKind::UnbalancedParenthesis(_)));
        assert!(matches!(kind("{id:}"), TemplateErrorKind::InvalidConstraint { .. }));
        assert!(matches!(
            kind("{*rest}/tail"),
            TemplateErrorKind::CatchAllNotLast(name) if name == "rest"
        ));
        assert!(matches!(
            kind("{id}/{ID}"),
            TemplateErrorKind::DuplicateName(name) if name == "ID"
        ));
    }

    #[test]
    fn test_precedence_order() {
        let precedence = |text| RouteTemplate::parse(text).unwrap().precedence();

        assert!(precedence("a/b") < precedence("a/{id:int}"));
        assert!(precedence("a/{id:int}") < precedence("a/{id}"));
        assert!(precedence("a/{id}") < precedence("a/{*rest:int}"));
        assert!(precedence("a/{*rest:int}") < precedence("a/{*rest}"));
        assert!(precedence("a/{id}") < precedence("{id}/a"));
        assert!(precedence("a") < precedence("a/b"));
        assert_eq!(precedence("a/{id}"), precedence("b/{name}"));
        assert_eq!(precedence("a/{id}/{*rest}").to_string(), "1.35");
        assert_eq!(Precedence::inbound(&RouteTemplate::parse("").unwrap()).to_string(), "0");
    }

    #[test]
    fn test_match_literals_ignore_case() {
        let mut captures = Captures::new();

        assert!(matcher("api/Users").try_match(&Segments::new("/API/users"), &mut captures));
        assert!(!matcher("api/users").try_match(&Segments::new("/api/posts"), &mut captures));
        assert!(!matcher("api/users").try_match(&Segments::new("/api"), &mut captures));
        assert!(!matcher("api").try_match(&Segments::new("/api/users"), &mut captures));
        assert!(captures.is_empty());
    }

    #[test]
    fn test_match_catch_all() {
        let mut captures = Captures::new();

        assert!(matcher("a/{*rest}").try_match(&Segments::new("/a/b/c/d"), &mut captures));
        assert_eq!(captures.get("rest"), Some("b/c/d"));

        captures.clear();
        assert!(matcher("a/{*rest}").try_match(&Segments::new("/a"), &mut captures));
        assert_eq!(captures.get("rest"), None);

        captures.clear();
        assert!(matcher("a/{*rest=index}").try_match(&Segments::new("/a/"), &mut captures));
        assert_eq!(captures.get("REST"), Some("index"));
    }

    #[test]
    fn test_match_defaults() {
        let mut captures = Captures::new();
        let matcher = matcher("{controller=Home}/{action=Index}/{id?}");

        assert!(matcher.try_match(&Segments::new("/"), &mut captures));
        assert_eq!(captures.get("controller"), Some("Home"));
        assert_eq!(captures.get("action"), Some("Index"));
        assert_eq!(captures.get("id"), None);

        captures.clear();
        assert!(matcher.try_match(&Segments::new("/products/show/12"), &mut captures));
        assert_eq!(captures.get("controller"), Some("products"));
        assert_eq!(captures.get("action"), Some("show"));
        assert_eq!(captures.get("id"), Some("12"));

        captures.clear();
        assert!(!matcher.try_match(&Segments::new("/a/b/c/d"), &mut captures));
        assert!(captures.is_empty());
    }

    #[test]
    fn test_match_required_missing() {
        let mut captures = Captures::new();

        assert!(!matcher("users/{id}").try_match(&Segments::new("/users"), &mut captures));
        assert!(captures.is_empty());
    }
}
