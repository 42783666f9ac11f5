//! Tokenizer that splits a raw formula into a flat sequence of classified [`Term`]s.

use std::fmt;

use crate::{
	dice::{Dice, Rolled},
	expr::Describe,
	ops::OperatorTable,
	parse,
	value::Value,
};

/// Single classified unit of a formula
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub struct Term {
	/// What the term is
	pub kind: TermKind,

	/// Text of the formula the term was read from
	pub expression: String,

	/// Character offset of the term within its formula
	pub offset: usize,

	/// Label given to the term in brackets (e.g. `fire` in `1d6[fire]`)
	pub flavor: Option<String>,
}

impl Term {
	/// Creates a term without a flavor.
	#[must_use]
	pub fn new(kind: TermKind, expression: impl Into<String>, offset: usize) -> Self {
		Self {
			kind,
			expression: expression.into(),
			offset,
			flavor: None,
		}
	}

	/// Replaces the term's kind while keeping where it came from.
	#[must_use]
	pub fn with_kind(self, kind: TermKind) -> Self {
		Self { kind, ..self }
	}

	/// Indicates whether the term produces a value on its own.
	#[must_use]
	pub const fn is_operand(&self) -> bool {
		!matches!(
			self.kind,
			TermKind::Operator(..) | TermKind::Paren(..) | TermKind::Separator
		)
	}

	/// Gets the symbol if the term is an operator.
	#[must_use]
	pub fn operator(&self) -> Option<&str> {
		match &self.kind {
			TermKind::Operator(symbol) => Some(symbol),
			_ => None,
		}
	}
}

impl Describe for Term {
	/// Builds a string of the term as it appeared in the formula, replacing variables with their values, rolled dice
	/// with their individual rolls and expanded formulas with their own breakdown.
	fn describe(&self, list_limit: Option<usize>) -> String {
		let base = match &self.kind {
			TermKind::Rolled(rolled) => rolled.describe(list_limit),
			TermKind::Subformula(sub) => format!("({})", sub.tooltip),
			TermKind::Value(val) => val.to_string(),
			TermKind::Str(..) => format!("\"{}\"", self.expression.trim_matches(['"', '\''])),
			_ => self.expression.clone(),
		};

		match &self.flavor {
			Some(flavor) => format!("{base}[{flavor}]"),
			None => base,
		}
	}
}

impl fmt::Display for Term {
	/// Formats the value using the given formatter. [Read more][core::fmt::Debug::fmt()]
	///
	/// The output is equivalent to calling [`Self::describe(None)`].
	///
	/// [`Self::describe(None)`]: Self::describe()
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.describe(None))
	}
}

/// Kinds of [`Term`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub enum TermKind {
	/// Operator or ternary separator symbol from the [`OperatorTable`]
	Operator(String),

	/// Grouping parenthesis
	Paren(Paren),

	/// Comma between function arguments
	Separator,

	/// Numeric literal
	Number(f64),

	/// Dice literal, not yet rolled
	Dice(Dice),

	/// Reference to a value in the context
	Variable {
		/// Dotted path, without the `@`
		path: String,

		/// Whether the reference was written with a leading `@`
		prefixed: bool,
	},

	/// Quoted string literal
	Str(String),

	/// Value substituted for a variable
	Value(Value),

	/// String from the context that may itself be a formula, not yet expanded
	Nested(String),

	/// Formula from the context that has been evaluated in place
	Subformula(Box<Subformula>),

	/// Dice that have been rolled
	Rolled(Rolled<'static>),
}

/// Parenthesis direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(clippy::exhaustive_enums)]
pub enum Paren {
	/// `(`
	Open,

	/// `)`
	Close,
}

/// Result of evaluating a formula found in the context
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub struct Subformula {
	/// Formula text that was evaluated
	pub formula: String,

	/// Total it evaluated to
	pub total: Value,

	/// Breakdown of how the total was reached
	pub tooltip: String,
}

impl Subformula {
	/// Creates a record of an evaluated nested formula.
	#[must_use]
	pub fn new(formula: impl Into<String>, total: Value, tooltip: impl Into<String>) -> Self {
		Self {
			formula: formula.into(),
			total,
			tooltip: tooltip.into(),
		}
	}
}

/// Error for a formula that can't be split into terms
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed formula at {offset} (\"{fragment}\"): {reason}")]
#[non_exhaustive]
pub struct MalformedFormula {
	/// Piece of the formula that couldn't be understood
	pub fragment: String,

	/// Character offset of the fragment
	pub offset: usize,

	/// What was wrong with it
	pub reason: String,
}

/// Splits a formula into terms.
///
/// Whitespace only separates terms. Operators are matched against the symbols in `table`, longest first, so `<=` is
/// never read as `<` followed by `=`. Leading operators that can't be used as a prefix and trailing operators are
/// dropped, so an empty or operator-only formula yields no terms.
///
/// # Errors
/// If the formula contains an unterminated string or flavor, a flavor that doesn't follow a term, an invalid dice
/// literal, or text that is neither a number, dice, variable, identifier nor a known operator, a
/// [`MalformedFormula`] is returned.
///
/// # Examples
/// ```
/// use augury::{ops::OperatorTable, term::{tokenize, TermKind}};
///
/// let terms = tokenize("2d6 + @abilities.str.mod[strength] >= 10", &OperatorTable::standard())?;
/// let kinds: Vec<_> = terms.iter().map(|term| term.expression.as_str()).collect();
/// assert_eq!(kinds, ["2d6", "+", "@abilities.str.mod", ">=", "10"]);
/// assert_eq!(terms[2].flavor.as_deref(), Some("strength"));
/// assert!(matches!(terms[0].kind, TermKind::Dice(..)));
/// # Ok::<(), augury::term::MalformedFormula>(())
/// ```
pub fn tokenize(formula: &str, table: &OperatorTable) -> Result<Vec<Term>, MalformedFormula> {
	let mut scanner = Scanner {
		formula,
		chars: formula.char_indices().collect(),
		pos: 0,
		table,
		terms: Vec::new(),
	};
	scanner.run()?;

	let terms = trim_operators(scanner.terms, table);
	tracing::trace!(
		formula,
		terms = ?terms.iter().map(|term| term.expression.as_str()).collect::<Vec<_>>(),
		"tokenized"
	);
	Ok(terms)
}

/// Checks whether a character may appear in a number, dice literal, identifier or variable path.
#[must_use]
pub(crate) fn is_word_char(c: char) -> bool {
	c.is_alphanumeric() || matches!(c, '_' | '.' | '@')
}

/// Left-to-right scanning state
struct Scanner<'f, 't> {
	/// Formula being scanned
	formula: &'f str,

	/// Byte index and character of every character in the formula
	chars: Vec<(usize, char)>,

	/// Current character position
	pos: usize,

	/// Operators to split on
	table: &'t OperatorTable,

	/// Terms read so far
	terms: Vec<Term>,
}

impl Scanner<'_, '_> {
	/// Reads the whole formula.
	fn run(&mut self) -> Result<(), MalformedFormula> {
		while let Some(c) = self.peek() {
			let start = self.pos;
			match c {
				c if c.is_whitespace() => self.pos += 1,
				'(' => self.single(start, TermKind::Paren(Paren::Open)),
				')' => self.single(start, TermKind::Paren(Paren::Close)),
				',' => self.single(start, TermKind::Separator),
				'"' | '\'' => self.string(c)?,
				'[' => self.flavor()?,
				']' => return Err(self.malformed(start, start + 1, "closing bracket without an opening one")),
				c if is_word_char(c) => self.word()?,
				_ => self.operator()?,
			}
		}
		Ok(())
	}

	/// Gets the character at the current position.
	fn peek(&self) -> Option<char> {
		self.chars.get(self.pos).map(|&(_, c)| c)
	}

	/// Gets the character at some position.
	fn char_at(&self, pos: usize) -> Option<char> {
		self.chars.get(pos).map(|&(_, c)| c)
	}

	/// Converts a character position to a byte index into the formula.
	fn byte(&self, pos: usize) -> usize {
		self.chars.get(pos).map_or(self.formula.len(), |&(byte, _)| byte)
	}

	/// Gets the text between two character positions.
	fn slice(&self, start: usize, end: usize) -> &str {
		&self.formula[self.byte(start)..self.byte(end)]
	}

	/// Builds an error for the text between two character positions.
	fn malformed(&self, start: usize, end: usize, reason: impl Into<String>) -> MalformedFormula {
		MalformedFormula {
			fragment: self.slice(start, end).to_owned(),
			offset: start,
			reason: reason.into(),
		}
	}

	/// Pushes a term for the text from `start` to the current position.
	fn push(&mut self, start: usize, kind: TermKind) {
		let term = Term::new(kind, self.slice(start, self.pos), start);
		self.terms.push(term);
	}

	/// Consumes a single structural character.
	fn single(&mut self, start: usize, kind: TermKind) {
		self.pos += 1;
		self.push(start, kind);
	}

	/// Reads a quoted string literal.
	fn string(&mut self, quote: char) -> Result<(), MalformedFormula> {
		let start = self.pos;
		let Some(len) = self.chars[start + 1..].iter().position(|&(_, c)| c == quote) else {
			return Err(self.malformed(start, self.chars.len(), "unterminated string"));
		};

		let content = self.slice(start + 1, start + 1 + len).to_owned();
		self.pos = start + len + 2;
		self.push(start, TermKind::Str(content));
		Ok(())
	}

	/// Reads a bracketed flavor and attaches it to the preceding term.
	fn flavor(&mut self) -> Result<(), MalformedFormula> {
		let start = self.pos;
		let Some(len) = self.chars[start + 1..].iter().position(|&(_, c)| c == ']') else {
			return Err(self.malformed(start, self.chars.len(), "unterminated flavor"));
		};
		let end = start + len + 2;
		let flavor = self.slice(start + 1, end - 1).trim().to_owned();

		let attachable = self
			.terms
			.last()
			.is_some_and(|term| term.is_operand() || term.kind == TermKind::Paren(Paren::Close));
		if !attachable {
			return Err(self.malformed(start, end, "flavor must follow a term"));
		}
		if let Some(term) = self.terms.last_mut() {
			term.flavor = Some(flavor);
		}

		self.pos = end;
		Ok(())
	}

	/// Reads the longest operator symbol at the current position.
	fn operator(&mut self) -> Result<(), MalformedFormula> {
		let start = self.pos;
		let rest = &self.formula[self.byte(start)..];
		let Some(symbol) = self.table.longest_match(rest) else {
			return Err(self.malformed(start, start + 1, "unknown operator"));
		};

		let symbol = symbol.to_owned();
		self.pos += symbol.chars().count();
		self.push(start, TermKind::Operator(symbol));
		Ok(())
	}

	/// Reads a number, dice literal, variable or identifier.
	fn word(&mut self) -> Result<(), MalformedFormula> {
		let start = self.pos;

		if let Some(end) = self.dice_end(start) {
			self.pos = end;
			while self.peek().is_some_and(is_word_char) {
				self.pos += 1;
			}

			let literal = self.slice(start, self.pos);
			return match parse::parse_dice(literal) {
				Ok(dice) => {
					self.push(start, TermKind::Dice(dice));
					Ok(())
				}
				Err(err) => Err(self.malformed(start, self.pos, format!("invalid dice: {err}"))),
			};
		}

		while self.peek().is_some_and(is_word_char) {
			self.pos += 1;
		}
		let word = self.slice(start, self.pos);

		if let Some(num) = parse_number(word) {
			self.push(start, TermKind::Number(num));
			return Ok(());
		}

		if let Some(path) = word.strip_prefix('@') {
			if !is_path(path) {
				return Err(self.malformed(start, self.pos, "invalid variable path"));
			}
			let path = path.to_owned();
			self.push(start, TermKind::Variable { path, prefixed: true });
			return Ok(());
		}

		if word.starts_with(|c: char| c.is_alphabetic() || c == '_') && is_path(word) {
			let path = word.to_owned();
			self.push(start, TermKind::Variable { path, prefixed: false });
			return Ok(());
		}

		Err(self.malformed(start, self.pos, "not a number, dice, variable or identifier"))
	}

	/// Finds where a dice literal starting at `start` ends, if one starts there at all.
	/// A dice literal is an optional count, `d`, the sides and then any number of modifiers, each of which is some
	/// letters followed by a number. Only the modifiers that test faces (`r`, `rr`, `x`, `xo`, `cs`, `ms`) take a
	/// comparison, so `2d20kh>=15` ends before the `>=`.
	fn dice_end(&self, start: usize) -> Option<usize> {
		let digits = |mut pos: usize| {
			while self.char_at(pos).is_some_and(|c| c.is_ascii_digit()) {
				pos += 1;
			}
			pos
		};

		let mut pos = digits(start);
		if !matches!(self.char_at(pos), Some('d' | 'D')) {
			return None;
		}
		pos += 1;

		let sides_end = digits(pos);
		if sides_end == pos {
			return None;
		}
		pos = sides_end;

		while self.char_at(pos).is_some_and(|c| c.is_ascii_alphabetic()) {
			let letters = pos;
			while self.char_at(pos).is_some_and(|c| c.is_ascii_alphabetic()) {
				pos += 1;
			}
			if !takes_comparison(self.slice(letters, pos)) {
				pos = digits(pos);
				continue;
			}
			for comparison in [">=", "<=", ">", "<", "="] {
				let len = comparison.len();
				if pos + len <= self.chars.len() && self.slice(pos, pos + len) == comparison {
					pos += len;
					break;
				}
			}
			pos = digits(pos);
		}

		Some(pos)
	}
}

/// Whether a run of modifier letters ends in a modifier that tests faces against a comparison.
fn takes_comparison(letters: &str) -> bool {
	let letters = letters.to_ascii_lowercase();
	["r", "x", "xo", "cs", "ms"].iter().any(|suffix| letters.ends_with(suffix)) && !letters.ends_with("max")
}

/// Parses a numeric literal: digits with at most one decimal point.
fn parse_number(word: &str) -> Option<f64> {
	let valid = word.chars().all(|c| c.is_ascii_digit() || c == '.')
		&& word.chars().any(|c| c.is_ascii_digit())
		&& word.chars().filter(|&c| c == '.').count() <= 1;
	if valid {
		word.parse().ok()
	} else {
		None
	}
}

/// Checks that a dotted path has no empty segments and no stray `@`.
fn is_path(path: &str) -> bool {
	!path.is_empty()
		&& path
			.split('.')
			.all(|segment| !segment.is_empty() && segment.chars().all(|c| c.is_alphanumeric() || c == '_'))
}

/// Drops leading operators that have no prefix form and all trailing operators.
fn trim_operators(mut terms: Vec<Term>, table: &OperatorTable) -> Vec<Term> {
	let leading = terms
		.iter()
		.take_while(|term| term.operator().is_some_and(|symbol| table.prefix(symbol).is_none()))
		.count();
	if leading > 0 {
		tracing::trace!(count = leading, "dropping leading operators");
		terms.drain(..leading);
	}

	while terms.last().is_some_and(|term| term.operator().is_some()) {
		if let Some(term) = terms.pop() {
			tracing::trace!(symbol = %term.expression, "dropping trailing operator");
		}
	}

	terms
}
