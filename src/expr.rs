//! Sandboxed evaluation of a term sequence: a precedence-climbing parser that builds an [`Expr`] tree from the
//! [`OperatorTable`], and an interpreter that evaluates it while recording every operation as a [`Step`].
//!
//! Only the operators in the table, the [`MathFn`]s and the constants `pi` and `e` are reachable from a formula.

use std::{f64::consts, fmt};

use crate::{
	dice::Error as DiceError,
	ops::{Arity, Associativity, OperatorSpec, OperatorTable},
	term::{Paren, Term, TermKind},
	value::Value,
};

/// Maximum nesting depth of groups, prefix operators and right-associative chains
pub const MAX_DEPTH: usize = 128;

/// Node of a parsed formula
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum Expr<'t> {
	/// Formula without any terms, which evaluates to 0
	Empty,

	/// Term that produces a value on its own
	Leaf(&'t Term),

	/// Named constant
	Constant(&'static str, f64),

	/// Prefix operation
	Unary {
		/// Operator applied
		op: &'t OperatorSpec,

		/// Operand
		operand: Box<Self>,
	},

	/// One or more binary operations of equal precedence, applied left to right
	Chain {
		/// Leftmost operand
		first: Box<Self>,

		/// Each following operator with its right operand
		rest: Vec<(&'t OperatorSpec, Self)>,
	},

	/// Conditional
	Ternary {
		/// Operator applied
		op: &'t OperatorSpec,

		/// Condition deciding the branch
		cond: Box<Self>,

		/// Branch taken when the condition is selected
		then: Box<Self>,

		/// Branch taken otherwise
		otherwise: Box<Self>,
	},

	/// Call to a built-in function
	Call {
		/// Function called
		func: MathFn,

		/// Argument expressions
		args: Vec<Self>,
	},
}

impl<'t> Expr<'t> {
	/// Parses a term sequence into an expression tree.
	///
	/// # Errors
	/// If the terms aren't a well-formed expression, reference an identifier that isn't a constant or call a function
	/// that isn't built in, or nest deeper than [`MAX_DEPTH`], an error variant is returned.
	///
	/// # Examples
	/// ```
	/// use augury::{expr::Expr, ops::OperatorTable, term::tokenize, Value};
	///
	/// let table = OperatorTable::standard();
	/// let terms = tokenize("2 + 3 * 4", &table)?;
	/// let expr = Expr::parse(&terms, &table)?;
	/// assert_eq!(expr.to_string(), "2 + (3 * 4)");
	/// assert_eq!(expr.eval(&mut Vec::new())?, Value::Num(14.0));
	/// # Ok::<(), augury::Error>(())
	/// ```
	pub fn parse(terms: &'t [Term], table: &'t OperatorTable) -> Result<Self, EvalError> {
		if terms.is_empty() {
			return Ok(Self::Empty);
		}

		let mut parser = Parser {
			terms,
			table,
			pos: 0,
			depth: 0,
		};
		let expr = parser.expr(0)?;

		match parser.peek() {
			None => Ok(expr),
			Some(term) => Err(EvalError::Syntax(format!("unexpected \"{}\"", term.expression))),
		}
	}

	/// Evaluates the expression, appending every operator and function application to `steps` in the order they
	/// happen.
	///
	/// # Errors
	/// If an operator or function fails (division by zero, a non-numeric operand, a non-finite result, etc.) or a
	/// term can't be evaluated, an error variant is returned.
	pub fn eval(&self, steps: &mut Vec<Step>) -> Result<Value, EvalError> {
		match self {
			Self::Empty => Ok(Value::Num(0.0)),
			Self::Leaf(term) => leaf_value(term),
			Self::Constant(_, x) => Ok(Value::Num(*x)),

			Self::Unary { op, operand } => {
				let Arity::Unary(apply) = op.arity else {
					return Err(EvalError::Syntax(format!("\"{}\" isn't a prefix operator", op.symbol)));
				};
				let val = operand.eval(steps)?;
				let result = apply(val.clone())?;
				steps.push(Step::new(&*op.symbol, vec![val], result.clone()));
				Ok(result)
			}

			Self::Chain { first, rest } => {
				let mut acc = first.eval(steps)?;
				for (op, rhs) in rest {
					let Arity::Binary { apply, short_circuit } = op.arity else {
						return Err(EvalError::Syntax(format!("\"{}\" isn't a binary operator", op.symbol)));
					};

					if let Some(result) = short_circuit.and_then(|check| check(&acc)) {
						steps.push(Step::new(&*op.symbol, vec![acc], result.clone()));
						acc = result;
						continue;
					}

					let rhs = rhs.eval(steps)?;
					let result = apply(acc.clone(), rhs.clone())?;
					steps.push(Step::new(&*op.symbol, vec![acc, rhs], result.clone()));
					acc = result;
				}
				Ok(acc)
			}

			Self::Ternary {
				op,
				cond,
				then,
				otherwise,
			} => {
				let Arity::Ternary { ref separator, select } = op.arity else {
					return Err(EvalError::Syntax(format!("\"{}\" isn't a conditional operator", op.symbol)));
				};
				let cond = cond.eval(steps)?;
				let branch = if select(&cond)? { then } else { otherwise };
				let result = branch.eval(steps)?;
				steps.push(Step::new(
					format!("{}{separator}", op.symbol),
					vec![cond, result.clone()],
					result.clone(),
				));
				Ok(result)
			}

			Self::Call { func, args } => {
				let mut vals = Vec::with_capacity(args.len());
				for arg in args {
					vals.push(arg.eval(steps)?);
				}
				let nums = vals.iter().map(Value::to_number).collect::<Result<Vec<_>, _>>()?;
				let result = Value::Num(func.apply(&nums)?);
				steps.push(Step::new(func.name(), vals, result.clone()));
				Ok(result)
			}
		}
	}
}

impl Describe for Expr<'_> {
	/// Builds the expression with every operation other than the outermost wrapped in parentheses.
	fn describe(&self, list_limit: Option<usize>) -> String {
		let wrap = |expr: &Self| match expr {
			Self::Empty | Self::Leaf(..) | Self::Constant(..) | Self::Call { .. } => expr.describe(list_limit),
			Self::Unary { .. } | Self::Chain { .. } | Self::Ternary { .. } => paren_wrap(expr.describe(list_limit)),
		};

		match self {
			Self::Empty => String::new(),
			Self::Leaf(term) => term.describe(list_limit),
			Self::Constant(name, _) => (*name).to_owned(),
			Self::Unary { op, operand } => format!("{}{}", op.symbol, wrap(operand)),
			Self::Chain { first, rest } => rest.iter().fold(wrap(first), |acc, (op, rhs)| {
				format!("{acc} {} {}", op.symbol, wrap(rhs))
			}),
			Self::Ternary {
				op,
				cond,
				then,
				otherwise,
			} => format!(
				"{} {} {} {} {}",
				wrap(cond),
				op.symbol,
				wrap(then),
				op.separator().unwrap_or_default(),
				wrap(otherwise)
			),
			Self::Call { func, args } => format!(
				"{}({})",
				func.name(),
				args.iter().map(|arg| arg.describe(list_limit)).collect::<Vec<_>>().join(", ")
			),
		}
	}
}

impl fmt::Display for Expr<'_> {
	/// Formats the value using the given formatter. [Read more][core::fmt::Debug::fmt()]
	///
	/// The output of this implementation is equivalent to [`Self::describe(None)`].
	///
	/// [`Self::describe(None)`]: Self::describe()
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.describe(None))
	}
}

/// Single operator or function application made while evaluating a formula
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub struct Step {
	/// Operator symbol or function name
	pub operator: String,

	/// Values it was applied to
	pub operands: Vec<Value>,

	/// Value it produced
	pub result: Value,
}

impl Step {
	/// Records an application.
	#[must_use]
	pub fn new(operator: impl Into<String>, operands: Vec<Value>, result: Value) -> Self {
		Self {
			operator: operator.into(),
			operands,
			result,
		}
	}
}

impl fmt::Display for Step {
	/// Formats the step as `2 + 3 = 5`, `-3 = -3` or `max(2, 5) = 5`.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let operands = self.operands.iter().map(ToString::to_string).collect::<Vec<_>>();
		match operands.as_slice() {
			_ if self.operator.starts_with(char::is_alphabetic) => {
				write!(f, "{}({}) = {}", self.operator, operands.join(", "), self.result)
			}
			[operand] => write!(f, "{}{operand} = {}", self.operator, self.result),
			_ => write!(f, "{} = {}", operands.join(&format!(" {} ", self.operator)), self.result),
		}
	}
}

/// Functions a formula may call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(clippy::exhaustive_enums)]
pub enum MathFn {
	/// Absolute value
	Abs,
	/// Round up
	Ceil,
	/// Round down
	Floor,
	/// Round half up
	Round,
	/// Round toward zero
	Trunc,
	/// -1, 0 or 1
	Sign,
	/// Square root
	Sqrt,
	/// Cube root
	Cbrt,
	/// e raised to the argument
	Exp,
	/// Natural logarithm
	Log,
	/// Base 2 logarithm
	Log2,
	/// Base 10 logarithm
	Log10,
	/// Smallest argument
	Min,
	/// Largest argument
	Max,
	/// `clamp(x, lo, hi)`
	Clamp,
	/// `pow(x, y)`
	Pow,
}

impl MathFn {
	/// Every function, in name order.
	pub const ALL: [Self; 16] = [
		Self::Abs,
		Self::Cbrt,
		Self::Ceil,
		Self::Clamp,
		Self::Exp,
		Self::Floor,
		Self::Log,
		Self::Log10,
		Self::Log2,
		Self::Max,
		Self::Min,
		Self::Pow,
		Self::Round,
		Self::Sign,
		Self::Sqrt,
		Self::Trunc,
	];

	/// Looks up a function by the name used in formulas.
	///
	/// # Examples
	/// ```
	/// use augury::expr::MathFn;
	///
	/// assert_eq!(MathFn::from_name("floor"), Some(MathFn::Floor));
	/// assert_eq!(MathFn::from_name("eval"), None);
	/// ```
	#[must_use]
	pub fn from_name(name: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|func| func.name() == name)
	}

	/// Name used in formulas.
	#[must_use]
	pub const fn name(self) -> &'static str {
		match self {
			Self::Abs => "abs",
			Self::Ceil => "ceil",
			Self::Floor => "floor",
			Self::Round => "round",
			Self::Trunc => "trunc",
			Self::Sign => "sign",
			Self::Sqrt => "sqrt",
			Self::Cbrt => "cbrt",
			Self::Exp => "exp",
			Self::Log => "log",
			Self::Log2 => "log2",
			Self::Log10 => "log10",
			Self::Min => "min",
			Self::Max => "max",
			Self::Clamp => "clamp",
			Self::Pow => "pow",
		}
	}

	/// Description of how many arguments the function accepts.
	const fn expected_args(self) -> &'static str {
		match self {
			Self::Min | Self::Max => "at least 1",
			Self::Clamp => "3",
			Self::Pow => "2",
			_ => "1",
		}
	}

	/// Applies the function.
	///
	/// # Errors
	/// If the wrong number of arguments is given or the result isn't finite, an error variant is returned.
	pub fn apply(self, args: &[f64]) -> Result<f64, EvalError> {
		let arg_count = || EvalError::ArgumentCount {
			function: self.name(),
			expected: self.expected_args(),
			found: args.len(),
		};

		let result = match (self, args) {
			(Self::Abs, &[x]) => x.abs(),
			(Self::Ceil, &[x]) => x.ceil(),
			(Self::Floor, &[x]) => x.floor(),
			(Self::Round, &[x]) => (x + 0.5).floor(),
			(Self::Trunc, &[x]) => x.trunc(),
			(Self::Sign, &[x]) => {
				if x == 0.0 {
					0.0
				} else {
					x.signum()
				}
			}
			(Self::Sqrt, &[x]) => x.sqrt(),
			(Self::Cbrt, &[x]) => x.cbrt(),
			(Self::Exp, &[x]) => x.exp(),
			(Self::Log, &[x]) => x.ln(),
			(Self::Log2, &[x]) => x.log2(),
			(Self::Log10, &[x]) => x.log10(),
			(Self::Min, &[first, ref rest @ ..]) => rest.iter().copied().fold(first, f64::min),
			(Self::Max, &[first, ref rest @ ..]) => rest.iter().copied().fold(first, f64::max),
			(Self::Clamp, &[x, lo, hi]) => x.max(lo).min(hi),
			(Self::Pow, &[x, y]) => x.powf(y),
			_ => return Err(arg_count()),
		};

		if result.is_finite() {
			Ok(result)
		} else {
			Err(EvalError::NonFinite)
		}
	}
}

impl fmt::Display for MathFn {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

/// Looks up a named constant.
fn constant(name: &str) -> Option<(&'static str, f64)> {
	match name {
		"pi" => Some(("pi", consts::PI)),
		"e" => Some(("e", consts::E)),
		_ => None,
	}
}

/// Gets the value of a term that stands on its own.
fn leaf_value(term: &Term) -> Result<Value, EvalError> {
	Ok(match &term.kind {
		TermKind::Number(x) => Value::Num(*x),
		TermKind::Value(val) => val.clone(),
		TermKind::Str(text) | TermKind::Nested(text) => Value::Str(text.clone()),
		TermKind::Subformula(sub) => sub.total.clone(),
		TermKind::Rolled(rolled) => Value::Num(rolled.total()?.into()),
		TermKind::Dice(..) => {
			return Err(EvalError::Syntax(format!(
				"dice \"{}\" must be rolled before evaluation",
				term.expression
			)));
		}
		TermKind::Variable { path, .. } => return Err(EvalError::UnknownIdentifier(path.clone())),
		TermKind::Operator(..) | TermKind::Paren(..) | TermKind::Separator => {
			return Err(EvalError::Syntax(format!("\"{}\" isn't a value", term.expression)));
		}
	})
}

/// Precedence-climbing parser state
struct Parser<'t> {
	/// Terms being parsed
	terms: &'t [Term],

	/// Operators to parse with
	table: &'t OperatorTable,

	/// Index of the next term
	pos: usize,

	/// Current nesting depth
	depth: usize,
}

impl<'t> Parser<'t> {
	/// Gets the next term without consuming it.
	fn peek(&self) -> Option<&'t Term> {
		self.terms.get(self.pos)
	}

	/// Consumes the next term.
	fn next(&mut self) -> Option<&'t Term> {
		let term = self.terms.get(self.pos)?;
		self.pos += 1;
		Some(term)
	}

	/// Parses an expression made of operators binding at least as tightly as `min_prec`.
	fn expr(&mut self, min_prec: u16) -> Result<Expr<'t>, EvalError> {
		self.depth += 1;
		if self.depth > MAX_DEPTH {
			return Err(EvalError::TooDeep);
		}

		let mut lhs = self.prefix()?;

		while let Some(symbol) = self.peek().and_then(Term::operator) {
			let Some(op) = self.table.infix(symbol) else {
				if self.table.is_separator(symbol) {
					break;
				}
				return Err(EvalError::Syntax(format!("\"{symbol}\" needs a value before it")));
			};
			if u16::from(op.precedence) < min_prec {
				break;
			}
			self.pos += 1;

			lhs = match &op.arity {
				Arity::Binary { .. } => {
					let next_min = match op.associativity {
						Associativity::Left => u16::from(op.precedence) + 1,
						Associativity::Right => u16::from(op.precedence),
					};
					let rhs = self.expr(next_min)?;
					chain(lhs, op, rhs)
				}
				Arity::Ternary { separator, .. } => {
					let then = self.expr(0)?;
					match self.next() {
						Some(term) if term.operator() == Some(&**separator) => {}
						_ => return Err(EvalError::Syntax(format!("\"{}\" is missing its \"{separator}\"", op.symbol))),
					}
					let otherwise = self.expr(u16::from(op.precedence))?;
					Expr::Ternary {
						op,
						cond: Box::new(lhs),
						then: Box::new(then),
						otherwise: Box::new(otherwise),
					}
				}
				Arity::Unary(..) => {
					return Err(EvalError::Syntax(format!("\"{symbol}\" needs a value before it")));
				}
			};
		}

		self.depth -= 1;
		Ok(lhs)
	}

	/// Parses a single operand, along with any prefix operators applied to it.
	fn prefix(&mut self) -> Result<Expr<'t>, EvalError> {
		let term = self
			.next()
			.ok_or_else(|| EvalError::Syntax("formula ends where a value is expected".to_owned()))?;

		match &term.kind {
			TermKind::Operator(symbol) => {
				let op = self
					.table
					.prefix(symbol)
					.ok_or_else(|| EvalError::Syntax(format!("\"{symbol}\" needs a value before it")))?;
				let operand = self.expr(u16::from(op.precedence))?;
				Ok(Expr::Unary {
					op,
					operand: Box::new(operand),
				})
			}

			TermKind::Paren(Paren::Open) => {
				let inner = self.expr(0)?;
				match self.next() {
					Some(close) if close.kind == TermKind::Paren(Paren::Close) => Ok(inner),
					Some(other) => Err(EvalError::Syntax(format!("expected \")\", found \"{}\"", other.expression))),
					None => Err(EvalError::Syntax("unclosed \"(\"".to_owned())),
				}
			}
			TermKind::Paren(Paren::Close) => Err(EvalError::Syntax("unexpected \")\"".to_owned())),
			TermKind::Separator => Err(EvalError::Syntax("unexpected \",\"".to_owned())),

			TermKind::Variable { path, prefixed: false } => {
				if self.peek().is_some_and(|next| next.kind == TermKind::Paren(Paren::Open)) {
					let func = MathFn::from_name(path).ok_or_else(|| EvalError::DisallowedFunction(path.clone()))?;
					self.pos += 1;
					return self.call(func);
				}
				constant(path)
					.map(|(name, val)| Expr::Constant(name, val))
					.ok_or_else(|| EvalError::UnknownIdentifier(path.clone()))
			}

			_ => Ok(Expr::Leaf(term)),
		}
	}

	/// Parses the arguments of a function call, after its opening parenthesis.
	fn call(&mut self, func: MathFn) -> Result<Expr<'t>, EvalError> {
		let mut args = Vec::new();

		if self.peek().is_some_and(|next| next.kind == TermKind::Paren(Paren::Close)) {
			self.pos += 1;
		} else {
			loop {
				args.push(self.expr(0)?);
				match self.next().map(|term| &term.kind) {
					Some(TermKind::Separator) => {}
					Some(TermKind::Paren(Paren::Close)) => break,
					_ => return Err(EvalError::Syntax(format!("unclosed call to {func}"))),
				}
			}
		}

		let valid = match func {
			MathFn::Min | MathFn::Max => !args.is_empty(),
			MathFn::Clamp => args.len() == 3,
			MathFn::Pow => args.len() == 2,
			_ => args.len() == 1,
		};
		if !valid {
			return Err(EvalError::ArgumentCount {
				function: func.name(),
				expected: func.expected_args(),
				found: args.len(),
			});
		}

		Ok(Expr::Call { func, args })
	}
}

/// Appends a binary operation to a chain of left-associative operations with the same precedence, or starts a new
/// chain. Long sums stay flat instead of nesting once per operator.
fn chain<'t>(lhs: Expr<'t>, op: &'t OperatorSpec, rhs: Expr<'t>) -> Expr<'t> {
	match lhs {
		Expr::Chain { first, mut rest }
			if op.associativity == Associativity::Left
				&& rest.first().is_some_and(|(prev, _)| {
					prev.precedence == op.precedence && prev.associativity == Associativity::Left
				}) =>
		{
			rest.push((op, rhs));
			Expr::Chain { first, rest }
		}
		lhs => Expr::Chain {
			first: Box::new(lhs),
			rest: vec![(op, rhs)],
		},
	}
}

/// Error that can occur while parsing or evaluating an [`Expr`]
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum EvalError {
	/// An operand had the wrong type for the operation.
	#[error("expected a {expected}, found {} \"{found}\"", .found.kind())]
	Type {
		/// Kind of value that was needed
		expected: &'static str,

		/// Value that was found instead
		found: Value,
	},

	/// Division or modulo by zero
	#[error("division by zero")]
	DivisionByZero,

	/// Infinite or `NaN` result
	#[error("result is not a finite number")]
	NonFinite,

	/// Identifier that isn't a constant or a variable in the context
	#[error("unknown identifier \"{0}\"")]
	UnknownIdentifier(String),

	/// Call to a function that isn't built in
	#[error("function \"{0}\" is not allowed")]
	DisallowedFunction(String),

	/// Wrong number of arguments passed to a function
	#[error("{function} takes {expected} argument(s), found {found}")]
	ArgumentCount {
		/// Function called
		function: &'static str,

		/// Number of arguments accepted
		expected: &'static str,

		/// Number of arguments given
		found: usize,
	},

	/// Terms that don't form a valid expression
	#[error("syntax error: {0}")]
	Syntax(String),

	/// Groups or operators nested more than [`MAX_DEPTH`] levels deep
	#[error("formula is nested more than {} levels deep", MAX_DEPTH)]
	TooDeep,

	/// Formulas in the context referencing further formulas too many levels deep
	#[error("nested formulas exceed {} levels", crate::engine::MAX_NESTING)]
	NestingTooDeep,

	/// More formulas from the context were expanded in one evaluation than [`MAX_EXPANSIONS`] allows
	///
	/// [`MAX_EXPANSIONS`]: crate::engine::MAX_EXPANSIONS
	#[error("more than {} nested formulas expanded", crate::engine::MAX_EXPANSIONS)]
	TooManyExpansions,

	/// Dice-related error (likely while totalling)
	#[error("dice error: {0}")]
	Dice(#[from] DiceError),
}

/// Trait to allow creation of expanded descriptions with an optional max number of individual listed results where
/// applicable
pub trait Describe {
	/// Builds a detailed expression string with additional information about non-deterministic elements.
	/// Any elements of the expression that can have a different result between multiple evaluations or multiple results
	/// should list all of the specific individual results that occurred (ideally, up to `list_limit` of them).
	#[must_use]
	fn describe(&self, list_limit: Option<usize>) -> String;
}

/// Wraps a string in parentheses.
#[must_use]
fn paren_wrap(mut text: String) -> String {
	text.insert(0, '(');
	text.push(')');
	text
}
