//! The operator table: the single source of truth for which symbols are operators, how tightly they bind and what
//! they do. New operators are added by registering an [`OperatorSpec`]; neither the tokenizer nor the evaluator need
//! to change.

use std::{
	borrow::Cow,
	cmp::Ordering,
	collections::BTreeMap,
	fmt,
	sync::{Arc, LazyLock, PoisonError, RwLock},
};

use crate::{expr::EvalError, value::Value};

/// Implementation of a prefix operator
pub type UnaryFn = fn(Value) -> Result<Value, EvalError>;

/// Implementation of an infix operator
pub type BinaryFn = fn(Value, Value) -> Result<Value, EvalError>;

/// Given the left operand of an infix operator, decides whether the right operand is needed at all.
/// Returning `Some` finishes the operation with that value without evaluating the right operand.
pub type ShortCircuitFn = fn(&Value) -> Option<Value>;

/// Given the condition of a ternary operator, picks the first (`true`) or second (`false`) branch.
pub type SelectFn = fn(&Value) -> Result<bool, EvalError>;

/// Which side an operator groups towards when chained with operators of equal precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(clippy::exhaustive_enums)]
pub enum Associativity {
	/// `a - b - c` is `(a - b) - c`
	Left,

	/// `a ** b ** c` is `a ** (b ** c)`
	Right,
}

/// Number of operands an operator takes, along with its implementation
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Arity {
	/// Prefix operator such as negation
	Unary(UnaryFn),

	/// Infix operator such as addition
	Binary {
		/// Combines both operands
		apply: BinaryFn,

		/// Optional early exit that skips evaluating the right operand
		short_circuit: Option<ShortCircuitFn>,
	},

	/// Infix conditional such as `cond ? a : b`, whose branches are split by a separator symbol
	Ternary {
		/// Symbol between the two branches
		separator: Cow<'static, str>,

		/// Picks the branch to evaluate
		select: SelectFn,
	},
}

/// Definition of a single operator
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OperatorSpec {
	/// Symbol the operator is written with
	pub symbol: Cow<'static, str>,

	/// Binding strength; higher binds tighter
	pub precedence: u8,

	/// Grouping of chained operators with equal precedence
	pub associativity: Associativity,

	/// Operand count and implementation
	pub arity: Arity,
}

impl OperatorSpec {
	/// Creates a prefix operator. Prefix operators always group to the right.
	#[must_use]
	pub fn unary(symbol: impl Into<Cow<'static, str>>, precedence: u8, apply: UnaryFn) -> Self {
		Self {
			symbol: symbol.into(),
			precedence,
			associativity: Associativity::Right,
			arity: Arity::Unary(apply),
		}
	}

	/// Creates an infix operator.
	///
	/// # Examples
	/// ```
	/// use augury::{ops::{Associativity, OperatorSpec, OperatorTable}, Value};
	///
	/// // Integer division, binding as tightly as multiplication
	/// let spec = OperatorSpec::binary("//", 12, Associativity::Left, |a, b| {
	/// 	let (a, b) = (a.to_number()?, b.to_number()?);
	/// 	if b == 0.0 {
	/// 		return Err(augury::expr::EvalError::DivisionByZero);
	/// 	}
	/// 	Ok(Value::Num((a / b).floor()))
	/// });
	///
	/// let mut table = OperatorTable::standard();
	/// table.register(spec)?;
	/// assert!(table.lookup("//").is_some());
	/// # Ok::<(), augury::ops::RegisterError>(())
	/// ```
	#[must_use]
	pub fn binary(
		symbol: impl Into<Cow<'static, str>>,
		precedence: u8,
		associativity: Associativity,
		apply: BinaryFn,
	) -> Self {
		Self {
			symbol: symbol.into(),
			precedence,
			associativity,
			arity: Arity::Binary {
				apply,
				short_circuit: None,
			},
		}
	}

	/// Creates a ternary conditional operator. Ternaries always group to the right.
	#[must_use]
	pub fn ternary(
		symbol: impl Into<Cow<'static, str>>,
		separator: impl Into<Cow<'static, str>>,
		precedence: u8,
		select: SelectFn,
	) -> Self {
		Self {
			symbol: symbol.into(),
			precedence,
			associativity: Associativity::Right,
			arity: Arity::Ternary {
				separator: separator.into(),
				select,
			},
		}
	}

	/// Adds a short-circuit check to a binary operator. Has no effect on other arities.
	#[must_use]
	pub fn short_circuit(mut self, check: ShortCircuitFn) -> Self {
		if let Arity::Binary {
			ref mut short_circuit, ..
		} = self.arity
		{
			*short_circuit = Some(check);
		}
		self
	}

	/// Indicates whether the operator is written before its only operand.
	#[must_use]
	pub const fn is_prefix(&self) -> bool {
		matches!(self.arity, Arity::Unary(..))
	}

	/// Gets the separator of a ternary operator.
	#[must_use]
	pub fn separator(&self) -> Option<&str> {
		match &self.arity {
			Arity::Ternary { separator, .. } => Some(separator),
			Arity::Unary(..) | Arity::Binary { .. } => None,
		}
	}
}

/// Error that can occur when registering an operator
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RegisterError {
	/// An operator with the same symbol and position (prefix or infix) is already registered.
	#[error("operator \"{0}\" is already registered")]
	Duplicate(String),

	/// The symbol is empty or uses characters the tokenizer reserves for other terms.
	#[error("\"{0}\" cannot be used as an operator symbol")]
	InvalidSymbol(String),
}

/// Registry of all operators a formula may use
#[derive(Debug, Clone, Default)]
pub struct OperatorTable {
	/// Prefix operators by symbol
	prefix: BTreeMap<String, OperatorSpec>,

	/// Binary and ternary operators by symbol
	infix: BTreeMap<String, OperatorSpec>,

	/// Ternary separators, mapped to the symbol of the ternary that owns them
	separators: BTreeMap<String, String>,

	/// Every symbol the tokenizer should split on, longest first
	symbols: Vec<String>,
}

impl OperatorTable {
	/// Creates a table without any operators.
	#[must_use]
	pub fn empty() -> Self {
		Self::default()
	}

	/// Creates a table with the standard arithmetic, comparison, logical, nullish and conditional operators.
	///
	/// | Precedence | Operators | Associativity |
	/// |---|---|---|
	/// | 15 | `**` `^` | right |
	/// | 14 | prefix `-` `+` `!` | right |
	/// | 12 | `*` `/` `%` | left |
	/// | 11 | `+` `-` | left |
	/// | 9 | `<` `>` `<=` `>=` | left |
	/// | 8 | `==` `!=` | left |
	/// | 5 | `&&` | left |
	/// | 4 | <code>&#124;&#124;</code> | left |
	/// | 3 | `??` | left |
	/// | 2 | `? :` | right |
	#[must_use]
	pub fn standard() -> Self {
		use Associativity::{Left, Right};

		let specs = [
			OperatorSpec::ternary("?", ":", 2, |cond| Ok(cond.truthy())),
			OperatorSpec::binary("??", 3, Left, |_, b| Ok(b)).short_circuit(|a| (!a.is_null()).then(|| a.clone())),
			OperatorSpec::binary("||", 4, Left, |_, b| Ok(b)).short_circuit(|a| a.truthy().then(|| a.clone())),
			OperatorSpec::binary("&&", 5, Left, |_, b| Ok(b)).short_circuit(|a| (!a.truthy()).then(|| a.clone())),
			OperatorSpec::binary("==", 8, Left, |a, b| Ok(Value::Bool(loose_eq(&a, &b)))),
			OperatorSpec::binary("!=", 8, Left, |a, b| Ok(Value::Bool(!loose_eq(&a, &b)))),
			OperatorSpec::binary("<", 9, Left, |a, b| compare(&a, &b, Ordering::is_lt)),
			OperatorSpec::binary(">", 9, Left, |a, b| compare(&a, &b, Ordering::is_gt)),
			OperatorSpec::binary("<=", 9, Left, |a, b| compare(&a, &b, Ordering::is_le)),
			OperatorSpec::binary(">=", 9, Left, |a, b| compare(&a, &b, Ordering::is_ge)),
			OperatorSpec::binary("+", 11, Left, add),
			OperatorSpec::binary("-", 11, Left, |a, b| finite(a.to_number()? - b.to_number()?)),
			OperatorSpec::binary("*", 12, Left, |a, b| finite(a.to_number()? * b.to_number()?)),
			OperatorSpec::binary("/", 12, Left, |a, b| {
				let divisor = b.to_number()?;
				if divisor == 0.0 {
					return Err(EvalError::DivisionByZero);
				}
				finite(a.to_number()? / divisor)
			}),
			OperatorSpec::binary("%", 12, Left, |a, b| {
				let divisor = b.to_number()?;
				if divisor == 0.0 {
					return Err(EvalError::DivisionByZero);
				}
				finite(a.to_number()? % divisor)
			}),
			OperatorSpec::unary("-", 14, |a| finite(-a.to_number()?)),
			OperatorSpec::unary("+", 14, |a| finite(a.to_number()?)),
			OperatorSpec::unary("!", 14, |a| Ok(Value::Bool(!a.truthy()))),
			OperatorSpec::binary("**", 15, Right, |a, b| finite(a.to_number()?.powf(b.to_number()?))),
			OperatorSpec::binary("^", 15, Right, |a, b| finite(a.to_number()?.powf(b.to_number()?))),
		];

		let mut table = Self::empty();
		for spec in specs {
			// The standard specs are distinct and well-formed
			let _ = table.register(spec);
		}
		table
	}

	/// Adds an operator to the table.
	///
	/// # Errors
	/// If the symbol is already used by an operator in the same position, [`RegisterError::Duplicate`] is returned.
	/// If the symbol is empty or contains letters, digits, whitespace, quotes, brackets, parentheses, commas, `_`,
	/// `.` or `@`, [`RegisterError::InvalidSymbol`] is returned.
	///
	/// # Examples
	/// ```
	/// use augury::ops::{Associativity, OperatorSpec, OperatorTable, RegisterError};
	///
	/// let mut table = OperatorTable::standard();
	/// let plus = OperatorSpec::binary("+", 11, Associativity::Left, |_, b| Ok(b));
	/// assert_eq!(table.register(plus), Err(RegisterError::Duplicate("+".to_owned())));
	/// ```
	pub fn register(&mut self, spec: OperatorSpec) -> Result<(), RegisterError> {
		let symbol = spec.symbol.to_string();
		check_symbol(&symbol)?;

		if spec.is_prefix() {
			if self.prefix.contains_key(&symbol) {
				return Err(RegisterError::Duplicate(symbol));
			}
			self.prefix.insert(symbol.clone(), spec);
			self.add_symbol(symbol);
			return Ok(());
		}

		if self.infix.contains_key(&symbol) || self.separators.contains_key(&symbol) {
			return Err(RegisterError::Duplicate(symbol));
		}

		if let Some(separator) = spec.separator() {
			let separator = separator.to_owned();
			check_symbol(&separator)?;
			if separator == symbol || self.infix.contains_key(&separator) || self.separators.contains_key(&separator) {
				return Err(RegisterError::Duplicate(separator));
			}
			self.separators.insert(separator.clone(), symbol.clone());
			self.add_symbol(separator);
		}

		self.infix.insert(symbol.clone(), spec);
		self.add_symbol(symbol);
		Ok(())
	}

	/// Looks up an operator by symbol, preferring the infix operator when a symbol has both forms.
	#[must_use]
	pub fn lookup(&self, symbol: &str) -> Option<&OperatorSpec> {
		self.infix(symbol).or_else(|| self.prefix(symbol))
	}

	/// Looks up a prefix operator by symbol.
	#[must_use]
	pub fn prefix(&self, symbol: &str) -> Option<&OperatorSpec> {
		self.prefix.get(symbol)
	}

	/// Looks up a binary or ternary operator by symbol.
	#[must_use]
	pub fn infix(&self, symbol: &str) -> Option<&OperatorSpec> {
		self.infix.get(symbol)
	}

	/// Checks whether a symbol is the separator of a ternary operator.
	#[must_use]
	pub fn is_separator(&self, symbol: &str) -> bool {
		self.separators.contains_key(symbol)
	}

	/// Finds the longest symbol (operator or separator) that the input starts with.
	///
	/// # Examples
	/// ```
	/// use augury::ops::OperatorTable;
	///
	/// let table = OperatorTable::standard();
	/// assert_eq!(table.longest_match("<= 3"), Some("<="));
	/// assert_eq!(table.longest_match("**2"), Some("**"));
	/// assert_eq!(table.longest_match("#"), None);
	/// ```
	#[must_use]
	pub fn longest_match(&self, input: &str) -> Option<&str> {
		self.symbols
			.iter()
			.find(|symbol| input.starts_with(symbol.as_str()))
			.map(String::as_str)
	}

	/// Iterates over every symbol the table knows, longest first.
	pub fn symbols(&self) -> impl Iterator<Item = &str> {
		self.symbols.iter().map(String::as_str)
	}

	/// Records a symbol for tokenizing, keeping the list sorted longest first.
	fn add_symbol(&mut self, symbol: String) {
		if !self.symbols.contains(&symbol) {
			self.symbols.push(symbol);
			self.symbols.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
		}
	}
}

impl fmt::Display for OperatorTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.symbols.join(" "))
	}
}

/// Checks that a symbol can't be confused with any other kind of term.
fn check_symbol(symbol: &str) -> Result<(), RegisterError> {
	let reserved = |c: char| {
		c.is_alphanumeric() || c.is_whitespace() || matches!(c, '_' | '.' | '@' | '(' | ')' | '[' | ']' | ',' | '"' | '\'')
	};

	if symbol.is_empty() || symbol.chars().any(reserved) {
		return Err(RegisterError::InvalidSymbol(symbol.to_owned()));
	}
	Ok(())
}

/// Rejects infinite and `NaN` results so they never leak into a total.
fn finite(x: f64) -> Result<Value, EvalError> {
	if x.is_finite() {
		Ok(Value::Num(x))
	} else {
		Err(EvalError::NonFinite)
	}
}

/// Adds two numbers, or concatenates when either side is a non-numeric string.
fn add(a: Value, b: Value) -> Result<Value, EvalError> {
	match (&a, &b) {
		(Value::Str(..), _) | (_, Value::Str(..)) if a.as_number().is_none() || b.as_number().is_none() => {
			Ok(Value::Str(format!("{a}{b}")))
		}
		_ => finite(a.to_number()? + b.to_number()?),
	}
}

/// Equality that compares numbers numerically (so `true == 1`) and everything else structurally.
fn loose_eq(a: &Value, b: &Value) -> bool {
	match (a, b) {
		(Value::Str(x), Value::Str(y)) => x == y,
		(Value::Null, Value::Null) => true,
		(Value::Null, _) | (_, Value::Null) => false,
		_ => match (a.as_number(), b.as_number()) {
			(Some(x), Some(y)) => x == y,
			_ => false,
		},
	}
}

/// Orders two values, numerically unless both are strings.
fn compare(a: &Value, b: &Value, check: fn(Ordering) -> bool) -> Result<Value, EvalError> {
	let ordering = match (a, b) {
		(Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
		_ => a.to_number()?.partial_cmp(&b.to_number()?),
	};
	Ok(Value::Bool(ordering.is_some_and(check)))
}

/// Process-wide operator table, read by [`Engine::global()`](crate::engine::Engine::global)
static GLOBAL: LazyLock<RwLock<Arc<OperatorTable>>> = LazyLock::new(|| RwLock::new(Arc::new(OperatorTable::standard())));

/// Gets a snapshot of the process-wide operator table. Later registrations don't affect the snapshot.
#[must_use]
pub fn global() -> Arc<OperatorTable> {
	Arc::clone(&GLOBAL.read().unwrap_or_else(PoisonError::into_inner))
}

/// Registers an operator in the process-wide table. Registration should happen at startup, before formulas are
/// evaluated; evaluations already holding a snapshot keep using the table they started with.
///
/// # Errors
/// See [`OperatorTable::register()`].
pub fn register_operator(spec: OperatorSpec) -> Result<(), RegisterError> {
	let mut guard = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
	let mut table = OperatorTable::clone(&guard);
	table.register(spec)?;
	*guard = Arc::new(table);
	tracing::debug!(symbols = %guard, "registered operator");
	Ok(())
}
