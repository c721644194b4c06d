use std::fmt::Debug;
use std::str::FromStr;
use std::sync::Arc;

use wayfinder_router::{InlineConstraint, Param, RouteTemplate};

use crate::error::{Error, Result};
use crate::request::RouteValues;

/// A predicate over the route value bound to `key`.
///
pub trait RouteConstraint: Debug + Send + Sync {
    fn matches(&self, key: &str, values: &RouteValues) -> bool;
}

/// Creates a constraint from the optional inline argument of a template.
/// Returns a human readable reason when the argument is rejected.
///
pub type ConstraintFactory =
    Arc<dyn Fn(Option<&str>) -> Result<Arc<dyn RouteConstraint>, String> + Send + Sync>;

/// Maps inline constraint names to factories.
///
/// Names are compared ASCII case-insensitively. Registering a name that
/// already exists replaces the previous factory.
///
#[derive(Clone)]
pub struct ConstraintResolver {
    factories: Vec<(Box<str>, ConstraintFactory)>,
}

/// A constraint bound to the parameter it applies to.
///
#[derive(Clone, Debug)]
pub struct ResolvedConstraint {
    key: Param,
    constraint: Arc<dyn RouteConstraint>,
}

#[derive(Debug)]
enum Builtin {
    Int,
    Long,
    Bool,
    Alpha,
    Length { min: usize, max: usize },
    Min(i64),
    Max(i64),
    Range(i64, i64),
    Required,
}

/// Passes when the value is absent. Wraps the constraints of optional
/// parameters.
#[derive(Debug)]
struct Optional(Arc<dyn RouteConstraint>);

/// Returns true if every constraint accepts `values`. Evaluation stops at the
/// first constraint that rejects.
///
pub fn match_constraints(values: &RouteValues, constraints: &[ResolvedConstraint]) -> bool {
    for ResolvedConstraint { key, constraint } in constraints {
        if !constraint.matches(key.as_str(), values) {
            tracing::debug!(
                key = %key,
                value = values.get(key.as_str()),
                constraint = ?constraint,
                "route value rejected by constraint",
            );
            return false;
        }
    }

    true
}

fn argument<T: FromStr>(name: &str, argument: Option<&str>) -> Result<T, String> {
    let argument = argument.ok_or_else(|| format!("{} requires an argument", name))?;

    argument
        .trim()
        .parse()
        .map_err(|_| format!("\"{}\" is not a valid argument for {}", argument, name))
}

fn pair<T: FromStr>(name: &str, argument: Option<&str>) -> Result<(T, T), String> {
    let argument = argument.ok_or_else(|| format!("{} requires two arguments", name))?;
    let (a, b) = argument
        .split_once(',')
        .ok_or_else(|| format!("{} requires two arguments", name))?;

    Ok((self::argument(name, Some(a))?, self::argument(name, Some(b))?))
}

fn no_argument(name: &str, argument: Option<&str>) -> Result<(), String> {
    match argument {
        Some(_) => Err(format!("{} does not accept an argument", name)),
        None => Ok(()),
    }
}

impl ConstraintResolver {
    /// Returns a resolver without any registered constraints.
    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(Option<&str>) -> Result<Arc<dyn RouteConstraint>, String> + Send + Sync + 'static,
    {
        let factory: ConstraintFactory = Arc::new(factory);

        match self.find(name) {
            Some(index) => self.factories[index].1 = factory,
            None => self.factories.push((name.into(), factory)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Creates an instance of every inline constraint in `template`.
    ///
    /// # Errors
    ///
    /// Fails if a constraint name is not registered or its factory rejects
    /// the inline argument.
    ///
    pub fn resolve(&self, template: &RouteTemplate) -> Result<Vec<ResolvedConstraint>> {
        let mut resolved = Vec::new();

        for parameter in template.parameters() {
            for inline in parameter.constraints() {
                let constraint = self.create(template, inline)?;

                resolved.push(ResolvedConstraint {
                    key: parameter.name().clone(),
                    constraint: if parameter.is_optional() {
                        Arc::new(Optional(constraint))
                    } else {
                        constraint
                    },
                });
            }
        }

        Ok(resolved)
    }

    fn create(
        &self,
        template: &RouteTemplate,
        inline: &InlineConstraint,
    ) -> Result<Arc<dyn RouteConstraint>> {
        let index = self
            .find(inline.name())
            .ok_or_else(|| Error::UnknownConstraint {
                constraint: inline.name().to_owned(),
                template: template.text().to_owned(),
            })?;

        (self.factories[index].1)(inline.argument()).map_err(|reason| {
            Error::InvalidConstraintArgument {
                constraint: inline.to_string(),
                reason,
            }
        })
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.factories
            .iter()
            .position(|(other, _)| other.eq_ignore_ascii_case(name))
    }

    fn builtin<F>(&mut self, name: &'static str, factory: F)
    where
        F: Fn(Option<&str>) -> Result<Builtin, String> + Send + Sync + 'static,
    {
        self.register(name, move |argument| {
            let constraint: Arc<dyn RouteConstraint> = Arc::new(factory(argument)?);
            Ok(constraint)
        });
    }
}

impl Default for ConstraintResolver {
    /// Returns a resolver with the built-in constraints registered.
    fn default() -> Self {
        let mut resolver = Self::empty();

        resolver.builtin("int", |a| no_argument("int", a).map(|_| Builtin::Int));
        resolver.builtin("long", |a| no_argument("long", a).map(|_| Builtin::Long));
        resolver.builtin("bool", |a| no_argument("bool", a).map(|_| Builtin::Bool));
        resolver.builtin("alpha", |a| no_argument("alpha", a).map(|_| Builtin::Alpha));
        resolver.builtin("required", |a| {
            no_argument("required", a).map(|_| Builtin::Required)
        });

        resolver.builtin("minlength", |a| {
            let min = argument("minlength", a)?;
            Ok(Builtin::Length {
                min,
                max: usize::MAX,
            })
        });

        resolver.builtin("maxlength", |a| {
            let max = argument("maxlength", a)?;
            Ok(Builtin::Length { min: 0, max })
        });

        resolver.builtin("length", |a| match a {
            Some(range) if range.contains(',') => {
                let (min, max) = pair("length", Some(range))?;
                Ok(Builtin::Length { min, max })
            }
            _ => {
                let exact = argument("length", a)?;
                Ok(Builtin::Length {
                    min: exact,
                    max: exact,
                })
            }
        });

        resolver.builtin("min", |a| Ok(Builtin::Min(argument("min", a)?)));
        resolver.builtin("max", |a| Ok(Builtin::Max(argument("max", a)?)));
        resolver.builtin("range", |a| {
            let (min, max) = pair("range", a)?;
            Ok(Builtin::Range(min, max))
        });

        resolver
    }
}

impl Debug for ConstraintResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_list()
            .entries(self.factories.iter().map(|(name, _)| name))
            .finish()
    }
}

impl ResolvedConstraint {
    pub fn new(key: impl Into<Param>, constraint: Arc<dyn RouteConstraint>) -> Self {
        Self {
            key: key.into(),
            constraint,
        }
    }

    pub fn key(&self) -> &Param {
        &self.key
    }
}

impl RouteConstraint for Builtin {
    fn matches(&self, key: &str, values: &RouteValues) -> bool {
        let Some(value) = values.get(key) else {
            return false;
        };

        match *self {
            Self::Int => value.parse::<i32>().is_ok(),
            Self::Long => value.parse::<i64>().is_ok(),
            Self::Bool => {
                value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
            }
            Self::Alpha => !value.is_empty() && value.bytes().all(|b| b.is_ascii_alphabetic()),
            Self::Length { min, max } => (min..=max).contains(&value.chars().count()),
            Self::Min(min) => value.parse::<i64>().is_ok_and(|n| n >= min),
            Self::Max(max) => value.parse::<i64>().is_ok_and(|n| n <= max),
            Self::Range(min, max) => value.parse::<i64>().is_ok_and(|n| n >= min && n <= max),
            Self::Required => !value.is_empty(),
        }
    }
}

impl RouteConstraint for Optional {
    fn matches(&self, key: &str, values: &RouteValues) -> bool {
        match values.get(key) {
            None | Some("") => true,
            Some(_) => self.0.matches(key, values),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use tracing_test::traced_test;
    use wayfinder_router::RouteTemplate;

    use super::{ConstraintResolver, RouteConstraint, match_constraints};
    use crate::error::Error;
    use crate::request::RouteValues;

    fn check(template: &str, values: &[(&str, &str)]) -> bool {
        let template = RouteTemplate::parse(template).unwrap();
        let constraints = ConstraintResolver::default().resolve(&template).unwrap();
        let values: RouteValues = values.iter().copied().collect();

        match_constraints(&values, &constraints)
    }

    #[test]
    fn test_builtin_constraints() {
        assert!(check("{id:int}", &[("id", "42")]));
        assert!(!check("{id:int}", &[("id", "4294967296")]));
        assert!(check("{id:long}", &[("id", "4294967296")]));
        assert!(check("{flag:bool}", &[("flag", "TRUE")]));
        assert!(!check("{name:alpha}", &[("name", "abc1")]));
        assert!(check("{name:minlength(2):maxlength(4)}", &[("name", "abc")]));
        assert!(!check("{name:length(2)}", &[("name", "abc")]));
        assert!(check("{name:length(2,3)}", &[("name", "abc")]));
        assert!(check("{n:range(1,10)}", &[("n", "10")]));
        assert!(!check("{n:min(5)}", &[("n", "4")]));
        assert!(!check("{n:max(5)}", &[("n", "six")]));
        assert!(!check("{n:required}", &[("n", "")]));
    }

    #[test]
    fn test_optional_parameter_without_value() {
        assert!(check("{id:int?}", &[]));
        assert!(!check("{id:int?}", &[("id", "x")]));
        assert!(!check("{id:int}", &[]));
    }

    #[test]
    fn test_unknown_constraint() {
        let template = RouteTemplate::parse("{id:uuid}").unwrap();
        let error = ConstraintResolver::default()
            .resolve(&template)
            .unwrap_err();

        assert!(matches!(
            error,
            Error::UnknownConstraint { ref constraint, .. } if constraint == "uuid"
        ));
    }

    #[test]
    fn test_invalid_argument() {
        let template = RouteTemplate::parse("{id:min(abc)}").unwrap();
        let error = ConstraintResolver::default()
            .resolve(&template)
            .unwrap_err();

        assert!(matches!(error, Error::InvalidConstraintArgument { .. }));
    }

    #[derive(Debug)]
    struct Even;

    impl RouteConstraint for Even {
        fn matches(&self, key: &str, values: &RouteValues) -> bool {
            values
                .get(key)
                .and_then(|value| value.parse::<u32>().ok())
                .is_some_and(|n| n % 2 == 0)
        }
    }

    #[test]
    fn test_register_custom_constraint() {
        let mut resolver = ConstraintResolver::default();

        resolver.register("even", |_| Ok(Arc::new(Even)));

        let template = RouteTemplate::parse("{n:EVEN}").unwrap();
        let constraints = resolver.resolve(&template).unwrap();
        let accepted: RouteValues = [("n", "4")].into_iter().collect();
        let rejected: RouteValues = [("n", "5")].into_iter().collect();

        assert!(match_constraints(&accepted, &constraints));
        assert!(!match_constraints(&rejected, &constraints));
    }

    #[test]
    #[traced_test]
    fn test_rejection_is_logged_with_key() {
        assert!(!check("{slug:alpha}/{id:int}", &[("slug", "abc"), ("id", "x")]));
        assert!(logs_contain("route value rejected by constraint"));
        assert!(logs_contain("key=id"));
    }
}
