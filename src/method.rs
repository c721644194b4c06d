use bitflags::bitflags;
use http::Method;
use std::fmt::{self, Display, Formatter};

/// The set of http methods an endpoint accepts.
///
/// Methods are compared ASCII case-insensitively. Standard methods are kept
/// in a bit mask. Extension methods are kept by name.
///
#[derive(Clone, Debug, PartialEq)]
pub struct HttpMethods {
    mask: Mask,
    extensions: Vec<Method>,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    struct Mask: u16 {
        const CONNECT = 1 << 0;
        const DELETE  = 1 << 1;
        const GET     = 1 << 2;
        const HEAD    = 1 << 3;
        const OPTIONS = 1 << 4;
        const PATCH   = 1 << 5;
        const POST    = 1 << 6;
        const PUT     = 1 << 7;
        const TRACE   = 1 << 8;
    }
}

/// Returns the flag of a standard method, ignoring ASCII case, or an empty
/// mask for extension methods.
fn standard(name: &str) -> Mask {
    Mask::from_name(&name.to_ascii_uppercase()).unwrap_or(Mask::empty())
}

impl HttpMethods {
    pub fn new<I>(methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        let mut mask = Mask::empty();
        let mut extensions = Vec::new();

        for method in methods {
            let flag = standard(method.as_str());

            if !flag.is_empty() {
                mask |= flag;
            } else if !extensions
                .iter()
                .any(|other: &Method| other.as_str().eq_ignore_ascii_case(method.as_str()))
            {
                extensions.push(method);
            }
        }

        Self { mask, extensions }
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_empty() && self.extensions.is_empty()
    }

    /// Returns true if `method` is in the set.
    pub fn contains(&self, method: &Method) -> bool {
        let name = method.as_str();
        let flag = standard(name);

        if flag.is_empty() {
            self.extensions
                .iter()
                .any(|other| other.as_str().eq_ignore_ascii_case(name))
        } else {
            self.mask.contains(flag)
        }
    }

    /// Returns the names of the methods in the set. Standard methods are
    /// yielded first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.mask
            .iter_names()
            .map(|(name, _)| name)
            .chain(self.extensions.iter().map(Method::as_str))
    }
}

impl Display for HttpMethods {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        for (index, name) in self.names().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }

            f.write_str(name)?;
        }

        Ok(())
    }
}

impl FromIterator<Method> for HttpMethods {
    fn from_iter<I: IntoIterator<Item = Method>>(iter: I) -> Self {
        Self::new(iter)
    }
}
