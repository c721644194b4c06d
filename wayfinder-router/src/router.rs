use std::collections::HashMap;
use std::slice;
use std::sync::Arc;

use crate::error::TemplateError;
use crate::path::Segments;
use crate::template::{Captures, RouteTemplate};
use crate::tree::{InboundRouteEntry, Traversal, UrlMatchingTree};

/// Collects registrations and groups them by (order, template) before the
/// trees are built.
///
pub struct TreeBuilder<T> {
    groups: Vec<Group<T>>,

    /// Maps (order, lowercased template) to an index in `groups`.
    index: HashMap<(i32, String), usize>,
}

/// A set of url matching trees sorted by ascending order.
///
#[derive(Debug)]
pub struct Router<T> {
    trees: Vec<UrlMatchingTree<T>>,
}

/// A lazy iterator over the route entries that match a path along with the
/// values bound by each entry's template.
///
pub struct Matches<'a, 's, T> {
    pending: slice::Iter<'a, Arc<InboundRouteEntry<T>>>,
    segments: &'s Segments<'s>,
    traversal: Option<Traversal<'a, 's, T>>,
    trees: slice::Iter<'a, UrlMatchingTree<T>>,
}

struct Group<T> {
    order: i32,
    template: String,
    values: Vec<T>,
}

/// Returns `template` without a leading `/` or `~/` and a trailing `/`.
fn normalize(template: &str) -> &str {
    let trimmed = template
        .strip_prefix("~/")
        .or_else(|| template.strip_prefix('/'))
        .unwrap_or(template);

    trimmed.strip_suffix('/').unwrap_or(trimmed)
}

impl<T> TreeBuilder<T> {
    pub fn new() -> Self {
        Self {
            groups: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Adds `value` to the group identified by `order` and `template`.
    /// Templates are compared ASCII case-insensitively after leading and
    /// trailing separators are removed.
    ///
    pub fn push(&mut self, order: i32, template: &str, value: T) {
        let normalized = normalize(template);
        let key = (order, normalized.to_ascii_lowercase());

        match self.index.get(&key) {
            Some(&index) => self.groups[index].values.push(value),
            None => {
                self.index.insert(key, self.groups.len());
                self.groups.push(Group {
                    order,
                    template: normalized.to_owned(),
                    values: vec![value],
                });
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Parses each distinct template once and builds one tree per order.
    ///
    /// `tag` is called once per group with the parsed template and the values
    /// in that group in the order they were pushed. Its result is attached to
    /// the route entry for that group.
    ///
    pub fn build<U, E, F>(self, mut tag: F) -> Result<Router<U>, E>
    where
        E: From<TemplateError>,
        F: FnMut(&RouteTemplate, Vec<T>) -> Result<U, E>,
    {
        let mut trees: Vec<UrlMatchingTree<U>> = Vec::new();

        for Group {
            order,
            template,
            values,
        } in self.groups
        {
            let template = Arc::new(RouteTemplate::parse(&template)?);
            let entry = InboundRouteEntry::new(order, Arc::clone(&template), tag(&template, values)?);

            let index = match trees.binary_search_by_key(&order, UrlMatchingTree::order) {
                Ok(index) => index,
                Err(index) => {
                    trees.insert(index, UrlMatchingTree::new(order));
                    index
                }
            };

            trees[index].add_entry(entry);
        }

        Ok(Router { trees })
    }
}

impl<T> Default for TreeBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Router<T> {
    /// Returns the trees in the order they are searched.
    pub fn trees(&self) -> &[UrlMatchingTree<T>] {
        &self.trees
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Returns an iterator over the entries that match `segments`.
    ///
    /// Trees are searched in ascending order. Within a tree, nodes are
    /// visited literal first and entries on a node are tried by precedence.
    /// The iterator is lazy, so a caller that stops at the first acceptable
    /// entry never binds values for the entries that follow it.
    ///
    pub fn matches<'a, 's>(&'a self, segments: &'s Segments<'s>) -> Matches<'a, 's, T> {
        Matches {
            pending: [].iter(),
            segments,
            traversal: None,
            trees: self.trees.iter(),
        }
    }
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self { trees: Vec::new() }
    }
}

impl<'a, T> Iterator for Matches<'a, '_, T> {
    type Item = (&'a InboundRouteEntry<T>, Captures);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.pending.next() {
                let mut captures = Captures::new();

                if entry.matcher().try_match(self.segments, &mut captures) {
                    return Some((entry, captures));
                }

                continue;
            }

            if let Some(node) = self.traversal.as_mut().and_then(Iterator::next) {
                self.pending = node.matches().iter();
                continue;
            }

            let tree = self.trees.next()?;
            self.traversal = Some(tree.traverse(self.segments));
        }
    }
}
