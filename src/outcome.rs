//! Structured results of evaluating a formula, the options that shape them, and critical/fumble classification.

use std::fmt;

use crate::{
	context::Missing,
	dice::Rolled,
	expr::{Describe, Step},
	term::{Term, TermKind},
	value::Value,
};

/// Natural roll at or above which a lone d20 counts as a critical success by default
pub const DEFAULT_CRITICAL: u16 = 20;

/// Natural roll at or below which a lone d20 counts as a fumble by default
pub const DEFAULT_FUMBLE: u16 = 1;

/// Settings for a single evaluation
///
/// # Examples
/// ```
/// use augury::{context::Missing, Options};
///
/// let opts = Options::default().critical(19).missing(Missing::Zero).seed(42);
/// assert_eq!(opts.critical, 19);
/// assert_eq!(opts.fumble, 1);
/// assert_eq!(opts.seed, Some(42));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[non_exhaustive]
pub struct Options {
	/// Critical threshold for the first d20
	pub critical: u16,

	/// Fumble threshold for the first d20
	pub fumble: u16,

	/// Treatment of `@` references missing from the context
	pub missing: Missing,

	/// Seed for the roller, for reproducible results
	pub seed: Option<u64>,
}

impl Options {
	/// Sets the critical threshold.
	#[must_use]
	pub const fn critical(mut self, critical: u16) -> Self {
		self.critical = critical;
		self
	}

	/// Sets the fumble threshold.
	#[must_use]
	pub const fn fumble(mut self, fumble: u16) -> Self {
		self.fumble = fumble;
		self
	}

	/// Sets the treatment of missing variables.
	#[must_use]
	pub const fn missing(mut self, missing: Missing) -> Self {
		self.missing = missing;
		self
	}

	/// Sets the roller seed.
	#[must_use]
	pub const fn seed(mut self, seed: u64) -> Self {
		self.seed = Some(seed);
		self
	}
}

impl Default for Options {
	fn default() -> Self {
		Self {
			critical: DEFAULT_CRITICAL,
			fumble: DEFAULT_FUMBLE,
			missing: Missing::default(),
			seed: None,
		}
	}
}

/// One term of an evaluated formula along with what it contributed
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub struct TermOutcome {
	/// Term after variables were substituted and dice rolled
	pub term: Term,

	/// Value the term contributed, for terms that produce one
	pub value: Option<Value>,

	/// Human-readable rendering of the term, with individual rolls listed
	pub label: String,
}

impl TermOutcome {
	/// Builds the outcome for a term.
	#[must_use]
	pub fn new(term: Term) -> Self {
		let value = match &term.kind {
			TermKind::Number(x) => Some(Value::Num(*x)),
			TermKind::Value(val) => Some(val.clone()),
			TermKind::Str(text) | TermKind::Nested(text) => Some(Value::Str(text.clone())),
			TermKind::Subformula(sub) => Some(sub.total.clone()),
			TermKind::Rolled(rolled) => rolled.total().ok().map(Value::from),
			_ => None,
		};
		let label = term.describe(None);

		Self { term, value, label }
	}
}

/// Structured outcome of evaluating a formula once
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub struct RollResult {
	/// Formula that was evaluated
	pub formula: String,

	/// Final value
	pub total: Value,

	/// Every term, in formula order
	pub terms: Vec<TermOutcome>,

	/// Every operation applied, in evaluation order
	pub steps: Vec<Step>,

	/// Whether the first d20 was a critical success, when the formula starts with a lone d20
	pub critical: Option<bool>,

	/// Whether the first d20 was a fumble, when the formula starts with a lone d20
	pub fumble: Option<bool>,
}

impl RollResult {
	/// Creates a result with a total of 0 and nothing else, used in place of a failed evaluation.
	#[must_use]
	pub fn zero(formula: impl Into<String>) -> Self {
		Self {
			formula: formula.into(),
			total: Value::Num(0.0),
			terms: Vec::new(),
			steps: Vec::new(),
			critical: None,
			fumble: None,
		}
	}

	/// Gets the total as a number, if it is one.
	#[must_use]
	pub fn number(&self) -> Option<f64> {
		self.total.as_number()
	}

	/// Indicates whether the result was classified as a critical success.
	#[must_use]
	pub fn is_critical(&self) -> bool {
		self.critical == Some(true)
	}

	/// Indicates whether the result was classified as a fumble.
	#[must_use]
	pub fn is_fumble(&self) -> bool {
		self.fumble == Some(true)
	}

	/// Iterates over every set of dice that was rolled directly by the formula.
	pub fn dice(&self) -> impl Iterator<Item = &Rolled<'static>> {
		self.terms.iter().filter_map(|outcome| match &outcome.term.kind {
			TermKind::Rolled(rolled) => Some(rolled),
			_ => None,
		})
	}

	/// Builds the human-readable breakdown of the formula, with each rolled die listed.
	#[must_use]
	pub fn tooltip(&self) -> String {
		self.describe(None)
	}
}

impl Describe for RollResult {
	/// Builds the terms of the formula separated by spaces, listing up to `list_limit` rolls for each set of dice.
	///
	/// # Examples
	/// ```
	/// use augury::{dice::roller::Scripted as ScriptedRoller, expr::Describe, Context, Engine, Options};
	///
	/// let engine = Engine::new();
	/// let mut roller = ScriptedRoller::new([4, 6, 1]);
	/// let result = engine.evaluate_with("3d6 + 2[bonus]", &Context::new(), &Options::default(), &mut roller)?;
	/// assert_eq!(result.describe(None), "3d6[4, 6, 1] + 2[bonus]");
	/// assert_eq!(result.describe(Some(1)), "3d6[4, 2 more...] + 2[bonus]");
	/// assert_eq!(result.to_string(), "3d6[4, 6, 1] + 2[bonus] = 13");
	/// # Ok::<(), augury::Error>(())
	/// ```
	fn describe(&self, list_limit: Option<usize>) -> String {
		self.terms
			.iter()
			.map(|outcome| match list_limit {
				None => outcome.label.clone(),
				Some(..) => outcome.term.describe(list_limit),
			})
			.collect::<Vec<_>>()
			.join(" ")
	}
}

impl fmt::Display for RollResult {
	/// Formats the result as its tooltip followed by `= total`.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} = {}", self.describe(None), self.total)
	}
}

/// Classifies the first term of an evaluated formula as a critical success or fumble.
///
/// Only a formula whose first term is a single d20 without any success-counting or margin modifier is classified:
/// `critical` is whether the die's total reached `options.critical`, and `fumble` is whether it didn't and was at
/// most `options.fumble`. Any other formula gets `(None, None)`.
///
/// # Examples
/// ```
/// use augury::{dice::{roller::{Fixed as FixedRoller, Roller}, Dice}, outcome::classify, term::{Term, TermKind}, Options};
///
/// let d20 = Dice::new(1, 20);
/// let rolled = FixedRoller(20).roll(&d20, true)?.into_owned();
/// let terms = [Term::new(TermKind::Rolled(rolled), "1d20", 0)];
/// assert_eq!(classify(&terms, &Options::default()), (Some(true), Some(false)));
///
/// let rolled = FixedRoller(1).roll(&d20, true)?.into_owned();
/// let terms = [Term::new(TermKind::Rolled(rolled), "1d20", 0)];
/// assert_eq!(classify(&terms, &Options::default()), (Some(false), Some(true)));
/// # Ok::<(), augury::dice::Error>(())
/// ```
#[must_use]
pub fn classify(terms: &[Term], options: &Options) -> (Option<bool>, Option<bool>) {
	let Some(TermKind::Rolled(rolled)) = terms.first().map(|term| &term.kind) else {
		return (None, None);
	};
	if rolled.dice.sides != 20 || rolled.rolls.len() != 1 || rolled.has_success_annotation() {
		return (None, None);
	}
	let Ok(total) = rolled.total() else {
		return (None, None);
	};

	let critical = total >= i32::from(options.critical);
	let fumble = !critical && total <= i32::from(options.fumble);
	(Some(critical), Some(fumble))
}
