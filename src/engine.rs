//! The evaluation pipeline: tokenizing, resolving variables, rolling dice, expanding nested formulas, evaluating and
//! classifying, all against one snapshot of an [`OperatorTable`].

use std::sync::Arc;

use crate::{
	context::{self, Context},
	dice::roller::{FastRand as FastRandRoller, Roller},
	expr::{EvalError, Expr},
	ops::{self, OperatorTable},
	outcome::{classify, Options, RollResult, TermOutcome},
	term::{self, MalformedFormula, Subformula, Term, TermKind},
	Error,
};

/// Maximum depth of formulas in the context referencing further formulas
pub const MAX_NESTING: usize = 8;

/// Maximum number of formulas from the context expanded while evaluating one formula, counting every occurrence
pub const MAX_EXPANSIONS: usize = 1000;

/// Evaluates formulas using a fixed operator table.
///
/// # Examples
/// ```
/// use augury::{Context, Engine, Options, Value};
///
/// let engine = Engine::new();
/// let ctx = Context::new().with("abilities.str.mod", 3).with("bab", "@level - 1").with("level", 6);
///
/// let result = engine.evaluate("@abilities.str.mod * 2 + @bab", &ctx, &Options::default())?;
/// assert_eq!(result.total, Value::Num(11.0));
/// assert_eq!(result.tooltip(), "3 * 2 + (6 - 1)");
/// # Ok::<(), augury::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
	/// Operators available to formulas
	table: Arc<OperatorTable>,
}

impl Engine {
	/// Creates an engine with the standard operators.
	#[must_use]
	pub fn new() -> Self {
		Self::with_table(OperatorTable::standard())
	}

	/// Creates an engine using a snapshot of the process-wide operator table, including any operators registered with
	/// [`register_operator()`](crate::register_operator).
	#[must_use]
	pub fn global() -> Self {
		Self { table: ops::global() }
	}

	/// Creates an engine with a custom operator table.
	#[must_use]
	pub fn with_table(table: OperatorTable) -> Self {
		Self { table: Arc::new(table) }
	}

	/// Gets the operator table the engine uses.
	#[must_use]
	pub fn table(&self) -> &OperatorTable {
		&self.table
	}

	/// Splits a formula into terms using the engine's operators.
	///
	/// # Errors
	/// See [`term::tokenize()`].
	pub fn tokenize(&self, formula: &str) -> Result<Vec<Term>, MalformedFormula> {
		term::tokenize(formula, &self.table)
	}

	/// Evaluates a formula, rolling dice with a [`FastRandRoller`] seeded from [`Options::seed`] when one is given.
	///
	/// # Errors
	/// If the formula is malformed, references a variable that can't be resolved, has dice that expand without bound,
	/// or fails to evaluate, an error variant is returned. No partial result is ever produced.
	pub fn evaluate(&self, formula: &str, ctx: &Context, opts: &Options) -> Result<RollResult, Error> {
		let mut roller = opts.seed.map_or_else(FastRandRoller::default, FastRandRoller::with_seed);
		self.evaluate_with(formula, ctx, opts, &mut roller)
	}

	/// Evaluates a formula, rolling dice with the given roller. [`Options::seed`] is ignored.
	///
	/// # Errors
	/// See [`Self::evaluate()`].
	pub fn evaluate_with(
		&self,
		formula: &str,
		ctx: &Context,
		opts: &Options,
		roller: &mut impl Roller,
	) -> Result<RollResult, Error> {
		Session {
			table: &self.table,
			ctx,
			opts,
			roller,
			expansions: 0,
		}
		.run(formula, 0)
	}

	/// Evaluates a formula, logging any error and returning a zero result in its place.
	///
	/// # Examples
	/// ```
	/// use augury::{Context, Engine, Options, Value};
	///
	/// let result = Engine::new().safe_evaluate("@missing + 1", &Context::new(), &Options::default());
	/// assert_eq!(result.total, Value::Num(0.0));
	/// assert!(result.terms.is_empty());
	/// ```
	#[must_use]
	pub fn safe_evaluate(&self, formula: &str, ctx: &Context, opts: &Options) -> RollResult {
		match self.evaluate(formula, ctx, opts) {
			Ok(result) => result,
			Err(err) => {
				tracing::warn!(formula, error = %err, "formula failed to evaluate, using 0");
				RollResult::zero(formula)
			}
		}
	}
}

impl Default for Engine {
	fn default() -> Self {
		Self::new()
	}
}

/// State for a single evaluation call, shared by any nested formulas it expands
struct Session<'a, R: Roller> {
	/// Operators to tokenize and parse with
	table: &'a OperatorTable,

	/// Variables to resolve
	ctx: &'a Context,

	/// Evaluation settings
	opts: &'a Options,

	/// Source of die rolls
	roller: &'a mut R,

	/// Nested formulas expanded so far, across every depth
	expansions: usize,
}

impl<R: Roller> Session<'_, R> {
	/// Runs a formula through the whole pipeline.
	fn run(&mut self, formula: &str, depth: usize) -> Result<RollResult, Error> {
		if depth > MAX_NESTING {
			return Err(EvalError::NestingTooDeep.into());
		}

		let terms = term::tokenize(formula, self.table)?;
		let terms = context::resolve(terms, self.ctx, self.opts.missing)?;
		let terms = self.expand(terms, depth)?;

		let mut steps = Vec::new();
		let total = Expr::parse(&terms, self.table)?.eval(&mut steps)?;
		let (critical, fumble) = classify(&terms, self.opts);
		tracing::debug!(formula, %total, depth, ?critical, ?fumble, "evaluated formula");

		Ok(RollResult {
			formula: formula.to_owned(),
			total,
			terms: terms.into_iter().map(TermOutcome::new).collect(),
			steps,
			critical,
			fumble,
		})
	}

	/// Rolls every dice term and evaluates every context string that is itself a formula.
	fn expand(&mut self, terms: Vec<Term>, depth: usize) -> Result<Vec<Term>, Error> {
		let mut expanded = Vec::with_capacity(terms.len());

		for term in terms {
			let kind = match &term.kind {
				TermKind::Dice(dice) => TermKind::Rolled(self.roller.roll(dice, true)?.into_owned()),
				TermKind::Nested(text) if is_formula(text, self.table) => {
					self.expansions = self.expansions.saturating_add(1);
					if self.expansions > MAX_EXPANSIONS {
						return Err(EvalError::TooManyExpansions.into());
					}
					let sub = self.run(text, depth.saturating_add(1))?;
					let tooltip = sub.tooltip();
					TermKind::Subformula(Box::new(Subformula::new(text.clone(), sub.total, tooltip)))
				}
				_ => {
					expanded.push(term);
					continue;
				}
			};
			expanded.push(term.with_kind(kind));
		}

		Ok(expanded)
	}
}

/// Decides whether a string from the context should be evaluated as a formula: it must tokenize, contain a number,
/// dice or `@` reference, and only use bare identifiers as function calls. Anything else is plain text.
fn is_formula(text: &str, table: &OperatorTable) -> bool {
	let Ok(terms) = term::tokenize(text, table) else {
		return false;
	};

	let has_operand = terms.iter().any(|term| {
		matches!(
			term.kind,
			TermKind::Number(..) | TermKind::Dice(..) | TermKind::Variable { prefixed: true, .. }
		)
	});

	let calls_only = terms.iter().enumerate().all(|(i, term)| match term.kind {
		TermKind::Variable { prefixed: false, .. } => terms
			.get(i.saturating_add(1))
			.is_some_and(|next| next.kind == TermKind::Paren(term::Paren::Open)),
		_ => true,
	});

	has_operand && calls_only
}
