//! Evaluation context that formulas read variables from, and the resolver that substitutes them into a term sequence.

use std::{collections::BTreeMap, fmt};

use crate::{
	term::{Paren, Term, TermKind},
	value::Value,
};

/// Node of the context tree
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[allow(clippy::exhaustive_enums)]
pub enum Entry {
	/// Leaf value
	Scalar(Value),

	/// Nested table of further entries
	Table(BTreeMap<String, Entry>),
}

/// Read-only data a formula can reference with `@path.to.value` or a bare `name`.
///
/// # Examples
/// ```
/// use augury::{Context, Value};
///
/// let ctx = Context::new()
/// 	.with("abilities.str.mod", 3)
/// 	.with("level", 5)
/// 	.with("name", "Valeros");
/// assert_eq!(ctx.get("abilities.str.mod"), Some(&Value::Num(3.0)));
/// assert_eq!(ctx.get("abilities.str"), None);
/// assert!(ctx.lookup("abilities.dex.mod").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Context {
	/// Top-level entries
	root: BTreeMap<String, Entry>,
}

impl Context {
	/// Creates an empty context.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets a value at a dotted path, consuming and returning the context.
	#[must_use]
	pub fn with(mut self, path: &str, value: impl Into<Value>) -> Self {
		self.insert(path, value);
		self
	}

	/// Sets a value at a dotted path, creating intermediate tables as needed.
	/// A scalar standing where a table is needed is replaced by one.
	pub fn insert(&mut self, path: &str, value: impl Into<Value>) {
		let mut segments = path.split('.').peekable();
		let mut table = &mut self.root;

		while let Some(segment) = segments.next() {
			if segments.peek().is_none() {
				table.insert(segment.to_owned(), Entry::Scalar(value.into()));
				return;
			}

			let entry = table
				.entry(segment.to_owned())
				.or_insert_with(|| Entry::Table(BTreeMap::new()));
			if let Entry::Scalar(..) = entry {
				*entry = Entry::Table(BTreeMap::new());
			}
			table = match entry {
				Entry::Table(next) => next,
				Entry::Scalar(..) => return,
			};
		}
	}

	/// Gets the value at a dotted path, if there is one.
	#[must_use]
	pub fn get(&self, path: &str) -> Option<&Value> {
		self.lookup(path).ok()
	}

	/// Walks a dotted path to its value.
	///
	/// # Errors
	/// If a segment of the path is missing, or the path ends at a table rather than a value, an
	/// [`UnresolvedVariable`] describing which is returned.
	pub fn lookup(&self, path: &str) -> Result<&Value, UnresolvedVariable> {
		let unresolved = |reason| UnresolvedVariable {
			path: path.to_owned(),
			reason,
		};

		let mut table = &self.root;
		let mut segments = path.split('.').peekable();
		while let Some(segment) = segments.next() {
			let entry = table
				.get(segment)
				.ok_or_else(|| unresolved(Unresolved::MissingKey(segment.to_owned())))?;

			match (entry, segments.peek()) {
				(Entry::Scalar(value), None) => return Ok(value),
				(Entry::Table(next), Some(..)) => table = next,
				(Entry::Table(..), None) => return Err(unresolved(Unresolved::NotAValue)),
				(Entry::Scalar(..), Some(next)) => {
					return Err(unresolved(Unresolved::MissingKey((*next).to_owned())));
				}
			}
		}

		Err(unresolved(Unresolved::MissingKey(String::new())))
	}

	/// Checks whether the context has no entries at all.
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.root.is_empty()
	}
}

impl From<BTreeMap<String, Entry>> for Context {
	fn from(root: BTreeMap<String, Entry>) -> Self {
		Self { root }
	}
}

impl<P: AsRef<str>, V: Into<Value>> FromIterator<(P, V)> for Context {
	fn from_iter<T: IntoIterator<Item = (P, V)>>(iter: T) -> Self {
		let mut ctx = Self::new();
		for (path, value) in iter {
			ctx.insert(path.as_ref(), value);
		}
		ctx
	}
}

/// What to do with a `@` reference that isn't in the context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[allow(clippy::exhaustive_enums)]
pub enum Missing {
	/// Fail with [`UnresolvedVariable`]
	#[default]
	Error,

	/// Substitute 0
	Zero,
}

/// Why a variable couldn't be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Unresolved {
	/// Path segment that doesn't exist
	MissingKey(String),

	/// The path leads to a table of values rather than a single value
	NotAValue,
}

impl fmt::Display for Unresolved {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::MissingKey(key) if key.is_empty() => f.write_str("empty path"),
			Self::MissingKey(key) => write!(f, "no \"{key}\" entry"),
			Self::NotAValue => f.write_str("not a single value"),
		}
	}
}

/// Error for a variable reference that couldn't be resolved from the context
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unresolved variable @{path}: {reason}")]
#[non_exhaustive]
pub struct UnresolvedVariable {
	/// Full path that was referenced
	pub path: String,

	/// Why it couldn't be resolved
	pub reason: Unresolved,
}

/// Substitutes variable references in a term sequence with values from the context.
///
/// Numeric, boolean and null values become [`TermKind::Value`] terms. String values become [`TermKind::Nested`] terms,
/// since they may be formulas themselves; the resolver never evaluates them. Bare identifiers that aren't in the
/// context are left alone for the evaluator to treat as constants, as are bare identifiers used as function calls.
///
/// # Errors
/// If a `@` reference can't be resolved and `missing` is [`Missing::Error`], an [`UnresolvedVariable`] is returned.
///
/// # Examples
/// ```
/// use augury::{context::{resolve, Missing}, ops::OperatorTable, term::{tokenize, TermKind}, Context, Value};
///
/// let ctx = Context::new().with("level", 4);
/// let terms = tokenize("@level + @missing", &OperatorTable::standard())?;
///
/// assert!(resolve(terms.clone(), &ctx, Missing::Error).is_err());
///
/// let resolved = resolve(terms, &ctx, Missing::Zero)?;
/// assert_eq!(resolved[0].kind, TermKind::Value(Value::Num(4.0)));
/// assert_eq!(resolved[2].kind, TermKind::Value(Value::Num(0.0)));
/// # Ok::<(), augury::Error>(())
/// ```
pub fn resolve(terms: Vec<Term>, ctx: &Context, missing: Missing) -> Result<Vec<Term>, UnresolvedVariable> {
	let mut resolved = Vec::with_capacity(terms.len());
	let mut iter = terms.into_iter().peekable();

	while let Some(term) = iter.next() {
		let TermKind::Variable { path, prefixed } = &term.kind else {
			resolved.push(term);
			continue;
		};

		let is_call = !prefixed && iter.peek().is_some_and(|next| next.kind == TermKind::Paren(Paren::Open));
		if is_call {
			resolved.push(term);
			continue;
		}

		let kind = match ctx.lookup(path) {
			Ok(Value::Str(text)) => TermKind::Nested(text.clone()),
			Ok(value) => TermKind::Value(value.clone()),
			Err(err) if *prefixed => match missing {
				Missing::Error => return Err(err),
				Missing::Zero => {
					tracing::debug!(path = %path, "substituting 0 for missing variable");
					TermKind::Value(Value::Num(0.0))
				}
			},
			Err(..) => {
				resolved.push(term);
				continue;
			}
		};
		resolved.push(term.with_kind(kind));
	}

	Ok(resolved)
}
