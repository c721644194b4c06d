use smallvec::SmallVec;
use std::sync::Arc;

use crate::path::Segments;
use crate::template::{Param, Part, Precedence, RouteTemplate, TemplateMatcher};

/// A parsed route template paired with the value it resolves to.
///
/// Entries are built once per distinct (order, template) pair. `tag` is the
/// value shared by every registration in that group.
///
#[derive(Debug)]
pub struct InboundRouteEntry<T> {
    order: i32,
    precedence: Precedence,
    matcher: TemplateMatcher,
    tag: T,
}

/// A node in a url matching tree.
///
/// Each node has a dedicated slot for every kind of parameter segment so a
/// constrained parameter is never confused with an unconstrained one.
///
#[derive(Debug)]
pub struct Node<T> {
    /// The number of path segments between the root and this node.
    depth: usize,

    /// True when the node was reached through a catch-all segment.
    is_catch_all: bool,

    /// Children reached through a literal segment. Keys are compared ASCII
    /// case-insensitively.
    literals: Vec<(Box<str>, usize)>,

    parameter: Option<usize>,
    constrained_parameter: Option<usize>,
    catch_all: Option<usize>,
    constrained_catch_all: Option<usize>,

    /// Route entries that may match a path that ends at this node, sorted by
    /// precedence.
    matches: Vec<Arc<InboundRouteEntry<T>>>,
}

/// A tree of route entries that share the same order.
///
#[derive(Debug)]
pub struct UrlMatchingTree<T> {
    order: i32,
    nodes: Vec<Node<T>>,
}

/// A depth-first walk over the nodes of a tree that could match a path.
///
/// The walk uses an explicit stack rather than recursion. Literal children
/// are popped before parameters and parameters before catch-alls.
///
pub struct Traversal<'a, 's, T> {
    segments: &'s Segments<'s>,
    stack: SmallVec<[usize; 16]>,
    tree: &'a UrlMatchingTree<T>,
}

#[derive(Clone, Copy)]
enum Slot {
    Parameter,
    ConstrainedParameter,
    CatchAll,
    ConstrainedCatchAll,
}

macro_rules! lookup {
    ($nodes:expr, $key:expr) => {
        match $nodes.get($key) {
            Some(node) => node,
            None => {
                // A child key always points to a node in the same tree. Skip
                // the key rather than panic if that is ever not the case.
                continue;
            }
        }
    };
}

impl<T> InboundRouteEntry<T> {
    pub fn new(order: i32, template: Arc<RouteTemplate>, tag: T) -> Self {
        Self {
            order,
            precedence: template.precedence(),
            matcher: TemplateMatcher::new(template),
            tag,
        }
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn precedence(&self) -> &Precedence {
        &self.precedence
    }

    pub fn template(&self) -> &RouteTemplate {
        self.matcher.template()
    }

    pub fn matcher(&self) -> &TemplateMatcher {
        &self.matcher
    }

    pub fn tag(&self) -> &T {
        &self.tag
    }

    /// Returns the default value of each parameter in the template.
    pub fn defaults(&self) -> impl Iterator<Item = (&Param, &str)> {
        self.template().defaults()
    }
}

impl<T> Node<T> {
    fn new(depth: usize, is_catch_all: bool) -> Self {
        Self {
            depth,
            is_catch_all,
            literals: Vec::new(),
            parameter: None,
            constrained_parameter: None,
            catch_all: None,
            constrained_catch_all: None,
            matches: Vec::new(),
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_catch_all(&self) -> bool {
        self.is_catch_all
    }

    pub fn matches(&self) -> &[Arc<InboundRouteEntry<T>>] {
        &self.matches
    }

    /// Returns the key of the literal child that matches `segment`.
    fn literal(&self, segment: &str) -> Option<usize> {
        self.literals
            .iter()
            .find(|(literal, _)| literal.eq_ignore_ascii_case(segment))
            .map(|(_, key)| *key)
    }

    fn slot(&self, slot: Slot) -> Option<usize> {
        match slot {
            Slot::Parameter => self.parameter,
            Slot::ConstrainedParameter => self.constrained_parameter,
            Slot::CatchAll => self.catch_all,
            Slot::ConstrainedCatchAll => self.constrained_catch_all,
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<usize> {
        match slot {
            Slot::Parameter => &mut self.parameter,
            Slot::ConstrainedParameter => &mut self.constrained_parameter,
            Slot::CatchAll => &mut self.catch_all,
            Slot::ConstrainedCatchAll => &mut self.constrained_catch_all,
        }
    }

    /// Inserts `entry` after every entry with an equal or lower precedence.
    fn push_match(&mut self, entry: Arc<InboundRouteEntry<T>>) {
        let index = self
            .matches
            .partition_point(|other| other.precedence <= entry.precedence);

        self.matches.insert(index, entry);
    }
}

impl<T> UrlMatchingTree<T> {
    pub fn new(order: i32) -> Self {
        Self {
            order,
            nodes: vec![Node::new(0, false)],
        }
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn root(&self) -> &Node<T> {
        &self.nodes[0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Adds `entry` to the tree.
    ///
    /// The entry is attached to the node at the end of its template. It is
    /// also attached to every node where the remainder of the template may be
    /// omitted so `{controller=Home}/{action=Index}` is reachable from `/`.
    ///
    /// Callers are expected to group registrations by (order, template)
    /// before adding them. Adding the same template twice produces two
    /// entries on the same node.
    ///
    pub fn add_entry(&mut self, entry: InboundRouteEntry<T>) {
        let entry = Arc::new(entry);
        let mut key = 0;

        for part in entry.template().segments() {
            if part.is_omittable() {
                self.nodes[key].push_match(Arc::clone(&entry));
            }

            key = match part {
                Part::Literal(literal) => self.literal_child(key, literal),
                Part::Parameter(parameter) => {
                    let slot = match (parameter.is_catch_all(), parameter.is_constrained()) {
                        (true, true) => Slot::ConstrainedCatchAll,
                        (true, false) => Slot::CatchAll,
                        (false, true) => Slot::ConstrainedParameter,
                        (false, false) => Slot::Parameter,
                    };

                    self.slot_child(key, slot)
                }
            };
        }

        self.nodes[key].push_match(entry);
    }

    /// Returns an iterator over the nodes that could match `segments`.
    pub fn traverse<'a, 's>(&'a self, segments: &'s Segments<'s>) -> Traversal<'a, 's, T> {
        let mut stack = SmallVec::new();

        stack.push(0);

        Traversal {
            segments,
            stack,
            tree: self,
        }
    }
}

impl<T> UrlMatchingTree<T> {
    fn push(&mut self, node: Node<T>) -> usize {
        let key = self.nodes.len();

        self.nodes.push(node);
        key
    }

    fn literal_child(&mut self, parent: usize, literal: &str) -> usize {
        if let Some(existing) = self.nodes[parent].literal(literal) {
            return existing;
        }

        let depth = self.nodes[parent].depth + 1;
        let key = self.push(Node::new(depth, false));

        self.nodes[parent].literals.push((literal.into(), key));
        key
    }

    fn slot_child(&mut self, parent: usize, slot: Slot) -> usize {
        if let Some(existing) = self.nodes[parent].slot(slot) {
            return existing;
        }

        let depth = self.nodes[parent].depth + 1;
        let is_catch_all = matches!(slot, Slot::CatchAll | Slot::ConstrainedCatchAll);
        let key = self.push(Node::new(depth, is_catch_all));

        *self.nodes[parent].slot_mut(slot) = Some(key);
        key
    }
}

impl<'a, T> Iterator for Traversal<'a, '_, T> {
    type Item = &'a Node<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let nodes = &self.tree.nodes;
        let len = self.segments.len();

        while let Some(key) = self.stack.pop() {
            let node = lookup!(nodes, key);

            // Catch-all nodes absorb the remainder of the path.
            if node.is_catch_all && !node.matches.is_empty() {
                return Some(node);
            }

            if node.depth == len {
                if node.matches.is_empty() {
                    continue;
                }

                return Some(node);
            }

            // Pushed in reverse of the order in which they are visited.
            for slot in [
                Slot::CatchAll,
                Slot::ConstrainedCatchAll,
                Slot::Parameter,
                Slot::ConstrainedParameter,
            ] {
                if let Some(child) = node.slot(slot) {
                    self.stack.push(child);
                }
            }

            if let Some(child) = self
                .segments
                .get(node.depth)
                .and_then(|segment| node.literal(segment))
            {
                self.stack.push(child);
            }
        }

        None
    }
}
