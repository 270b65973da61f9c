//! Hierarchical tags and the query algebra built on them.
//!
//! A [`Tag`] is a colon-separated label such as `java:memory:HeapSpace`.
//! A [`TagPattern`] looks the same but any component wrapped in slashes
//! (`/me.*ory/`) is a case-insensitive, extended-mode regular expression.
//!
//! Patterns compose into a conjunctive [`TagExpression`] (every pattern must
//! match some tag of a [`TagSet`]) and expressions into a disjunctive
//! [`TagQuery`] (any expression may match).
//!
//! Pattern components match a contiguous run of tag components, starting
//! at any offset:
//!
//! ```
//! use dms_bus::{Tag, TagPattern};
//!
//! let tag = Tag::parse("java:memory:HeapSpace");
//! assert!(tag.matches(&TagPattern::parse("memory:HeapSpace").unwrap()));
//! assert!(!tag.matches(&TagPattern::parse("HeapSpace:memory").unwrap()));
//! assert!(tag.matches(&TagPattern::parse("/me.*ory/").unwrap()));
//! ```

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use regex::{Regex, RegexBuilder};

use crate::error::TagError;

const COMPONENT_SEPARATOR: char = ':';
const SET_SEPARATOR: char = ',';
const QUERY_SEPARATOR: char = '|';

/// Splits on `:` after trimming; trailing empty components are dropped.
fn split_components(value: &str) -> Vec<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let mut components: Vec<&str> = trimmed.split(COMPONENT_SEPARATOR).collect();
    while components.last().is_some_and(|c| c.is_empty()) {
        components.pop();
    }
    components
}

/// Returns the inner text of a `/.../` component.
pub(crate) fn regex_source(component: &str) -> Option<&str> {
    if component.len() >= 2 && component.starts_with('/') && component.ends_with('/') {
        Some(&component[1..component.len() - 1])
    } else {
        None
    }
}

/// Compiles `source` in case-insensitive, extended (whitespace-ignoring) mode.
pub(crate) fn compile_regex(source: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(source)
        .case_insensitive(true)
        .ignore_whitespace(true)
        .build()
}

/// A hierarchical, colon-separated label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Tag {
    components: Vec<String>,
}

impl Tag {
    /// Parses a tag; never fails on content.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        Self {
            components: split_components(value)
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    /// Components in order.
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True for the empty tag.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Slides `pattern` across this tag and reports the first full match.
    #[must_use]
    pub fn matches(&self, pattern: &TagPattern) -> bool {
        let window = pattern.components.len();
        if window > self.components.len() {
            return false;
        }

        (0..=self.components.len() - window).any(|offset| {
            pattern
                .components
                .iter()
                .zip(&self.components[offset..offset + window])
                .all(|(p, c)| p.is_match(c))
        })
    }

    /// True if any pattern of `expression` matches this single tag.
    #[must_use]
    pub fn matches_expression(&self, expression: &TagExpression) -> bool {
        expression.patterns.iter().any(|p| self.matches(p))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.components.join(":"))
    }
}

impl FromStr for Tag {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for Tag {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

/// One component of a [`TagPattern`].
#[derive(Debug, Clone)]
pub enum TagComponent {
    /// Compared case-insensitively.
    Literal(String),
    /// Searched anywhere in the tag component.
    Pattern {
        /// Text between the slashes.
        source: String,
        /// Compiled form of `source`.
        regex: Regex,
    },
}

impl TagComponent {
    /// Parses one component, compiling `/.../` forms.
    ///
    /// # Errors
    ///
    /// Returns `TagError::InvalidRegex` if the slashed text is not a valid
    /// regular expression.
    pub fn parse(component: &str) -> Result<Self, TagError> {
        match regex_source(component) {
            Some(source) => {
                let regex = compile_regex(source).map_err(|source| TagError::InvalidRegex {
                    component: component.to_string(),
                    source,
                })?;
                Ok(Self::Pattern {
                    source: source.to_string(),
                    regex,
                })
            }
            None => Ok(Self::Literal(component.to_string())),
        }
    }

    /// True if `component` matches, ignoring case for literals.
    #[must_use]
    pub fn is_match(&self, component: &str) -> bool {
        match self {
            Self::Literal(literal) => literal.to_lowercase() == component.to_lowercase(),
            Self::Pattern { regex, .. } => regex.is_match(component),
        }
    }

    /// True for a `/.../` component.
    #[must_use]
    pub const fn is_pattern(&self) -> bool {
        matches!(self, Self::Pattern { .. })
    }
}

impl PartialEq for TagComponent {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Pattern { source: a, .. }, Self::Pattern { source: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl Eq for TagComponent {}

impl fmt::Display for TagComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => f.write_str(literal),
            Self::Pattern { source, .. } => write!(f, "/{source}/"),
        }
    }
}

/// A tag whose components may be regular expressions.
///
/// Equality, ordering and hashing go by the rendered form.
#[derive(Debug, Clone)]
pub struct TagPattern {
    components: Vec<TagComponent>,
    rendered: String,
}

impl TagPattern {
    /// Parses a pattern.
    ///
    /// # Errors
    ///
    /// Returns `TagError::InvalidRegex` if a slashed component does not
    /// compile.
    pub fn parse(value: &str) -> Result<Self, TagError> {
        let components = split_components(value)
            .into_iter()
            .map(TagComponent::parse)
            .collect::<Result<Vec<_>, _>>()?;
        let rendered = components
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(":");
        Ok(Self {
            components,
            rendered,
        })
    }

    /// Components in order.
    #[must_use]
    pub fn components(&self) -> &[TagComponent] {
        &self.components
    }

    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// True for the empty pattern.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Source text as parsed.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.rendered
    }
}

impl PartialEq for TagPattern {
    fn eq(&self, other: &Self) -> bool {
        self.rendered == other.rendered
    }
}

impl Eq for TagPattern {}

impl PartialOrd for TagPattern {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TagPattern {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rendered.cmp(&other.rendered)
    }
}

impl Hash for TagPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rendered.hash(state);
    }
}

impl fmt::Display for TagPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

impl FromStr for TagPattern {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for TagPattern {
    type Error = TagError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

/// Joins rendered members in alphabetical order.
fn canonical_join<I: IntoIterator<Item = String>>(items: I, separator: &str) -> String {
    let mut rendered: Vec<String> = items.into_iter().collect();
    rendered.sort();
    rendered.join(separator)
}

/// Duplicate-free collection of tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TagSet {
    tags: BTreeSet<Tag>,
}

impl TagSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a comma-separated list of tags; blank entries are skipped.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        value
            .split(SET_SEPARATOR)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Tag::parse)
            .collect()
    }

    /// Returns true if the tag was not already present.
    pub fn insert(&mut self, tag: impl Into<Tag>) -> bool {
        self.tags.insert(tag.into())
    }

    /// True if `tag` is in the set.
    #[must_use]
    pub fn contains(&self, tag: &Tag) -> bool {
        self.tags.contains(tag)
    }

    /// Tags in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// True for the empty set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// True if some tag of the set matches `pattern`.
    #[must_use]
    pub fn matches_pattern(&self, pattern: &TagPattern) -> bool {
        self.tags.iter().any(|tag| tag.matches(pattern))
    }

    /// True if every pattern of `expression` matches some tag of the set.
    #[must_use]
    pub fn matches(&self, expression: &TagExpression) -> bool {
        expression
            .patterns
            .iter()
            .all(|pattern| self.matches_pattern(pattern))
    }

    /// True if any expression of `query` matches.
    #[must_use]
    pub fn matches_query(&self, query: &TagQuery) -> bool {
        query.expressions.iter().any(|e| self.matches(e))
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&canonical_join(
            self.tags.iter().map(ToString::to_string),
            ", ",
        ))
    }
}

impl FromStr for TagSet {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl<T: Into<Tag>> FromIterator<T> for TagSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Conjunction of tag patterns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TagExpression {
    patterns: BTreeSet<TagPattern>,
}

impl TagExpression {
    /// An empty expression.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a comma-separated list of patterns; blank entries are skipped.
    ///
    /// # Errors
    ///
    /// Returns `TagError::InvalidRegex` if any pattern fails to compile.
    pub fn parse(value: &str) -> Result<Self, TagError> {
        Self::from_strs(
            value
                .split(SET_SEPARATOR)
                .map(str::trim)
                .filter(|s| !s.is_empty()),
        )
    }

    /// Builds an expression from already-split pattern strings.
    ///
    /// # Errors
    ///
    /// Returns `TagError::InvalidRegex` if any pattern fails to compile.
    pub fn from_strs<I, S>(items: I) -> Result<Self, TagError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = items
            .into_iter()
            .map(|s| TagPattern::parse(s.as_ref()))
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Returns true if the pattern was not already present.
    pub fn insert(&mut self, pattern: TagPattern) -> bool {
        self.patterns.insert(pattern)
    }

    /// True if `pattern` is in the expression.
    #[must_use]
    pub fn contains(&self, pattern: &TagPattern) -> bool {
        self.patterns.contains(pattern)
    }

    /// Patterns in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &TagPattern> {
        self.patterns.iter()
    }

    /// Number of patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// True for the empty expression.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Same as [`TagSet::matches`], seen from the expression side.
    #[must_use]
    pub fn matches(&self, tags: &TagSet) -> bool {
        tags.matches(self)
    }
}

impl fmt::Display for TagExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&canonical_join(
            self.patterns.iter().map(ToString::to_string),
            ", ",
        ))
    }
}

impl FromStr for TagExpression {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl FromIterator<TagPattern> for TagExpression {
    fn from_iter<I: IntoIterator<Item = TagPattern>>(iter: I) -> Self {
        Self {
            patterns: iter.into_iter().collect(),
        }
    }
}

impl From<TagPattern> for TagExpression {
    fn from(pattern: TagPattern) -> Self {
        std::iter::once(pattern).collect()
    }
}

/// Disjunction of tag expressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TagQuery {
    expressions: BTreeSet<TagExpression>,
}

impl TagQuery {
    /// An empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `|`-separated expressions; blank alternatives are skipped.
    ///
    /// # Errors
    ///
    /// Returns `TagError::InvalidRegex` if any pattern fails to compile.
    pub fn parse(value: &str) -> Result<Self, TagError> {
        Self::from_strs(
            value
                .split(QUERY_SEPARATOR)
                .map(str::trim)
                .filter(|s| !s.is_empty()),
        )
    }

    /// Builds a query from one expression string per alternative.
    ///
    /// # Errors
    ///
    /// Returns `TagError::InvalidRegex` if any pattern fails to compile.
    pub fn from_strs<I, S>(items: I) -> Result<Self, TagError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let expressions = items
            .into_iter()
            .map(|s| TagExpression::parse(s.as_ref()))
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { expressions })
    }

    /// Returns true if the expression was not already present.
    pub fn insert(&mut self, expression: TagExpression) -> bool {
        self.expressions.insert(expression)
    }

    /// True if `expression` is in the query.
    #[must_use]
    pub fn contains(&self, expression: &TagExpression) -> bool {
        self.expressions.contains(expression)
    }

    /// Expressions in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = &TagExpression> {
        self.expressions.iter()
    }

    /// Number of expressions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    /// True for the empty query.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    /// True if any expression matches `tags`.
    #[must_use]
    pub fn matches(&self, tags: &TagSet) -> bool {
        tags.matches_query(self)
    }
}

impl fmt::Display for TagQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&canonical_join(
            self.expressions.iter().map(ToString::to_string),
            " | ",
        ))
    }
}

impl FromStr for TagQuery {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl FromIterator<TagExpression> for TagQuery {
    fn from_iter<I: IntoIterator<Item = TagExpression>>(iter: I) -> Self {
        Self {
            expressions: iter.into_iter().collect(),
        }
    }
}

impl From<TagExpression> for TagQuery {
    fn from(expression: TagExpression) -> Self {
        std::iter::once(expression).collect()
    }
}

impl From<TagPattern> for TagQuery {
    fn from(pattern: TagPattern) -> Self {
        TagExpression::from(pattern).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(s: &str) -> TagPattern {
        TagPattern::parse(s).unwrap()
    }

    fn subject() -> Tag {
        Tag::parse("java:memory:HeapSpace:PermGem")
    }

    #[test]
    fn test_tag_components_and_display() {
        let tag = subject();
        assert_eq!(tag.components()[0], "java");
        assert_eq!(tag.components()[3], "PermGem");
        assert_eq!(tag.to_string(), "java:memory:HeapSpace:PermGem");
        assert_eq!(Tag::parse(" test   ").to_string(), "test");
    }

    #[test]
    fn test_tag_matches_ordered_window() {
        let tag = subject();
        assert!(tag.matches(&pattern("java")));
        assert!(tag.matches(&pattern("memory")));
        assert!(tag.matches(&pattern("memory:HeapSpace")));
        assert!(tag.matches(&pattern("java:memory")));
        assert!(!tag.matches(&pattern("memory:java")));
        assert!(!tag.matches(&pattern("java:HeapSpace")));
    }

    #[test]
    fn test_tag_matches_regex_components() {
        let tag = subject();
        assert!(tag.matches(&pattern("/ja/")));
        assert!(tag.matches(&pattern("/me.*ory/")));
        assert!(tag.matches(&pattern("memory:/pace/")));
        assert!(tag.matches(&pattern("java://:HeapSpace")));
        assert!(!tag.matches(&pattern("memory:/j/")));
    }

    #[test]
    fn test_tag_matching_is_case_insensitive() {
        let tag = subject();
        assert!(tag.matches(&pattern("MEMORY:heapspace")));
        assert!(tag.matches(&pattern("memory:/SPA/")));
    }

    #[test]
    fn test_empty_regex_matches_anything() {
        assert!(subject().matches(&pattern("//")));
        assert!(Tag::parse("x").matches(&pattern("//")));
    }

    #[test]
    fn test_pattern_longer_than_tag_fails() {
        assert!(!Tag::parse("a:b").matches(&pattern("a:b:c")));
    }

    #[test]
    fn test_extended_mode_ignores_whitespace() {
        assert!(Tag::parse("memory").matches(&pattern("/mem ory/")));
    }

    #[test]
    fn test_pattern_components() {
        let p = pattern("java:/.*ry/:heap:/space/");
        assert!(!p.components()[0].is_pattern());
        assert!(p.components()[1].is_pattern());
        assert!(!p.components()[2].is_pattern());
        assert!(p.components()[3].is_pattern());
        assert_eq!(p.to_string(), "java:/.*ry/:heap:/space/");
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        let err = TagPattern::parse("a:/[/").unwrap_err();
        assert!(matches!(err, TagError::InvalidRegex { .. }));
    }

    #[test]
    fn test_tag_matches_expression_if_any_pattern_matches() {
        let tag = subject();
        let expr = TagExpression::parse("java://:HeapSpace, asfdasd, afsderw").unwrap();
        assert!(tag.matches_expression(&expr));
        let expr = TagExpression::parse("ewrad, ewrad, fda").unwrap();
        assert!(!tag.matches_expression(&expr));
    }

    #[test]
    fn test_tag_set_display_is_sorted() {
        let set: TagSet = ["java:memory:HeapSpace:PermGem", "abc"].into_iter().collect();
        assert_eq!(set.to_string(), "abc, java:memory:HeapSpace:PermGem");
        assert_eq!(TagSet::parse("b, a").to_string(), "a, b");
        assert_eq!(TagSet::parse("a, b").to_string(), "a, b");
    }

    #[test]
    fn test_tag_set_from_lazy_string() {
        let set = TagSet::parse("   xyz,memory, java:memory:HeapSpace:PermGem,   location:magi ");
        assert_eq!(
            set.to_string(),
            "java:memory:HeapSpace:PermGem, location:magi, memory, xyz"
        );
        assert!(set.contains(&Tag::parse("location:magi")));
        assert!(set.contains(&Tag::parse("xyz")));
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_tag_set_insert() {
        let mut set = TagSet::parse("abc, java:memory:HeapSpace:PermGem");
        assert!(set.insert("gear"));
        assert!(!set.insert("gear"));
        assert_eq!(set.to_string(), "abc, gear, java:memory:HeapSpace:PermGem");
    }

    #[test]
    fn test_tag_set_matches_expression_universally() {
        let set = TagSet::parse("java:memory:HeapSpace:PermGem, abc");
        assert!(set.matches(&TagExpression::parse("java://:HeapSpace, MEMORY, abc").unwrap()));
        assert!(set.matches(&TagExpression::parse("/me.*ory/").unwrap()));
        assert!(!set.matches(&TagExpression::parse("MEMORY, abc, fda").unwrap()));
        assert!(!set.matches(&TagExpression::parse("MEMORY:heapspace, memory:/SPA/, xyz").unwrap()));
    }

    #[test]
    fn test_expression_display_and_membership() {
        let mut expr: TagExpression = [pattern("java:memory://:/space/"), pattern("//")]
            .into_iter()
            .collect();
        assert_eq!(expr.to_string(), "//, java:memory://:/space/");
        assert!(expr.contains(&pattern("//")));
        assert!(!expr.contains(&pattern("/xyz/")));
        expr.insert(pattern("gear"));
        assert_eq!(expr.to_string(), "//, gear, java:memory://:/space/");
    }

    #[test]
    fn test_expression_from_lazy_string() {
        let expr = TagExpression::parse("   xyz,memory, java:memory://:PermGem,   /loc/:magi ").unwrap();
        assert_eq!(expr.to_string(), "/loc/:magi, java:memory://:PermGem, memory, xyz");
        assert!(expr.contains(&pattern("/loc/:magi")));
    }

    #[test]
    fn test_query_display_is_sorted() {
        let query: TagQuery = [
            TagExpression::parse("xyz, memory, java:memory://:PermGem, /loc/:magi").unwrap(),
            TagExpression::parse("virtual, CPU usage:CPU://, /loc/:nina").unwrap(),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            query.to_string(),
            "/loc/:magi, java:memory://:PermGem, memory, xyz | /loc/:nina, CPU usage:CPU://, virtual"
        );
    }

    #[test]
    fn test_query_from_lazy_string() {
        let query = TagQuery::parse(" abc, zz:yy:qq|  xyz,memory, java:memory://:PermGem|/loc/:magi ")
            .unwrap();
        assert_eq!(query.len(), 3);
        assert_eq!(
            query.to_string(),
            "/loc/:magi | abc, zz:yy:qq | java:memory://:PermGem, memory, xyz"
        );
        assert!(query.contains(&TagExpression::parse("abc, zz:yy:qq").unwrap()));
    }

    #[test]
    fn test_query_matches_any_expression() {
        let query = TagQuery::parse("location:nina | system:memory, location:magi").unwrap();
        assert!(TagSet::parse("location:magi, system:memory").matches_query(&query));
        assert!(query.matches(&TagSet::parse("location:nina")));
        assert!(!query.matches(&TagSet::parse("location:magi")));
    }

    #[test]
    fn test_conversions_into_query() {
        let query = TagQuery::from(pattern("/loc/:magi"));
        assert!(query.contains(&TagExpression::parse("/loc/:magi").unwrap()));
    }
}
