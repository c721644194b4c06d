use core::iter::Enumerate;
use core::str::Bytes;
use smallvec::SmallVec;

/// The start and end offset of a single segment in a url path.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Span {
    start: usize,
    end: usize,
}

/// An iterator that yields the span of each non-empty segment in a url path.
///
pub struct SplitPath<'a> {
    bytes: Enumerate<Bytes<'a>>,
    value: &'a str,
}

/// A tokenized request path. Segments are stored as spans into the original
/// path so tokenizing a request does not allocate a string per segment.
///
#[derive(Debug)]
pub struct Segments<'a> {
    path: &'a str,
    spans: SmallVec<[Span; 8]>,
}

impl Span {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }
}

impl Span {
    pub(crate) fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl<'a> SplitPath<'a> {
    pub fn new(value: &'a str) -> Self {
        Self {
            bytes: value.bytes().enumerate(),
            value,
        }
    }
}

impl SplitPath<'_> {
    /// Advances `self.bytes` to the next byte that is not a `/` and returns
    /// its index.
    fn next_non_terminator(&mut self) -> Option<usize> {
        let value = self.value;

        self.bytes.find_map(|(index, byte)| {
            if byte != b'/' && value.is_char_boundary(index) {
                Some(index)
            } else {
                None
            }
        })
    }

    /// Advances `self.bytes` to the next `/` and returns its index.
    fn next_terminator(&mut self) -> Option<usize> {
        self.bytes
            .find_map(|(index, byte)| if byte == b'/' { Some(index) } else { None })
    }
}

impl Iterator for SplitPath<'_> {
    type Item = Span;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.next_non_terminator()?;
        let end = self.next_terminator().unwrap_or(self.value.len());

        Some(Span::new(start, end))
    }
}

impl<'a> Segments<'a> {
    pub fn new(path: &'a str) -> Self {
        Self {
            path,
            spans: SplitPath::new(path).collect(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Returns the path that was tokenized.
    pub fn path(&self) -> &'a str {
        self.path
    }

    /// Returns the value of the segment at `index`.
    ///
    pub fn get(&self, index: usize) -> Option<&'a str> {
        let span = self.spans.get(index)?;
        self.path.get(span.start..span.end)
    }

    pub fn span(&self, index: usize) -> Option<&Span> {
        self.spans.get(index)
    }

    /// Returns the remainder of the path starting at the segment at `index`
    /// through the end of the last segment. Separators between segments are
    /// preserved, leading and trailing separators are not.
    ///
    pub fn rest(&self, index: usize) -> Option<&'a str> {
        let first = self.spans.get(index)?;
        let last = self.spans.last()?;

        self.path.get(first.start..last.end)
    }
}
