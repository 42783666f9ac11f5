//! Scalar values flowing through formula evaluation.

use std::fmt;

use crate::expr::EvalError;

/// A single scalar produced by evaluating (part of) a formula or stored in a [`Context`](crate::context::Context)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
#[allow(clippy::exhaustive_enums)]
pub enum Value {
	/// Number (all arithmetic is done in `f64`, like the hosts that author these formulas)
	Num(f64),

	/// Text, either quoted in the formula or taken from the context
	Str(String),

	/// Result of a comparison or logical operator
	Bool(bool),

	/// Explicit absence of a value, only ever supplied by the context
	Null,
}

impl Value {
	/// Gets the numeric value, if this is a number or boolean (booleans count as 1/0).
	///
	/// # Examples
	/// ```
	/// use augury::Value;
	///
	/// assert_eq!(Value::Num(4.5).as_number(), Some(4.5));
	/// assert_eq!(Value::Bool(true).as_number(), Some(1.0));
	/// assert_eq!(Value::Str("fire".into()).as_number(), None);
	/// ```
	#[must_use]
	pub fn as_number(&self) -> Option<f64> {
		match self {
			Self::Num(x) => Some(*x),
			Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
			Self::Str(s) => s.trim().parse().ok(),
			Self::Null => None,
		}
	}

	/// Coerces the value to a number for arithmetic.
	///
	/// # Errors
	/// If the value is null or a string that isn't numeric, an [`EvalError::Type`] is returned.
	pub fn to_number(&self) -> Result<f64, EvalError> {
		self.as_number().ok_or_else(|| EvalError::Type {
			expected: "number",
			found: self.clone(),
		})
	}

	/// Checks whether the value counts as true in a condition.
	/// Zero, `NaN`, the empty string, `false` and null are falsy.
	#[must_use]
	pub fn truthy(&self) -> bool {
		match self {
			Self::Num(x) => *x != 0.0 && !x.is_nan(),
			Self::Str(s) => !s.is_empty(),
			Self::Bool(b) => *b,
			Self::Null => false,
		}
	}

	/// Checks whether the value is [`Value::Null`].
	#[must_use]
	#[inline]
	pub const fn is_null(&self) -> bool {
		matches!(self, Self::Null)
	}

	/// Name of the kind of value, for diagnostics.
	#[must_use]
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Num(..) => "number",
			Self::Str(..) => "string",
			Self::Bool(..) => "boolean",
			Self::Null => "null",
		}
	}
}

impl Default for Value {
	#[inline]
	fn default() -> Self {
		Self::Num(0.0)
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Num(x) => write!(f, "{x}"),
			Self::Str(s) => write!(f, "{s}"),
			Self::Bool(b) => write!(f, "{b}"),
			Self::Null => f.write_str("null"),
		}
	}
}

impl From<f64> for Value {
	#[inline]
	fn from(value: f64) -> Self {
		Self::Num(value)
	}
}

impl From<i32> for Value {
	#[inline]
	fn from(value: i32) -> Self {
		Self::Num(value.into())
	}
}

impl From<u32> for Value {
	#[inline]
	fn from(value: u32) -> Self {
		Self::Num(value.into())
	}
}

impl From<bool> for Value {
	#[inline]
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<&str> for Value {
	#[inline]
	fn from(value: &str) -> Self {
		Self::Str(value.to_owned())
	}
}

impl From<String> for Value {
	#[inline]
	fn from(value: String) -> Self {
		Self::Str(value)
	}
}
