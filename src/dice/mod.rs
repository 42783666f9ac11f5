//! Dice literals and what rolling them produces.
//!
//! A formula's dice terms are turned into [`Dice`] by the tokenizer and rolled by the
//! [`Engine`](crate::engine::Engine) before the expression is evaluated. Everything here can also be used on its own:
//!
//! ```
//! use augury::dice::{roller::{Fixed as FixedRoller, Roller}, Dice};
//!
//! let dice: Dice = "4d6kh3".parse()?;
//! let rolled = FixedRoller(5).roll(&dice, true)?;
//! assert_eq!(rolled.total()?, 15);
//! assert_eq!(rolled.to_string(), "4d6kh3[5, 5, 5, 5 (d)]");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod modifier;
mod rolled;
pub mod roller;

use std::fmt;

use self::modifier::Condition;
pub use self::{
	modifier::Modifier,
	rolled::{Adjustment, DieRoll, Rolled},
	roller::Roller,
};

/// Upper bound on dice that recursive exploding or rerolling (`x`, `rr`) may add to a single roll
pub const MAX_ADDED_ROLLS: usize = 1000;

/// A dice literal: how many dice, how many sides each, and the modifiers applied once they're rolled
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(clippy::exhaustive_structs)]
pub struct Dice {
	/// Dice in the pool
	pub count: u16,

	/// Faces on every die
	pub sides: u16,

	/// Modifiers, run in this order after the initial roll
	pub modifiers: Vec<Modifier>,
}

impl Dice {
	/// Creates an unmodified pool of `count` dice with `sides` faces each.
	#[must_use]
	pub const fn new(count: u16, sides: u16) -> Self {
		Self {
			count,
			sides,
			modifiers: Vec::new(),
		}
	}

	/// The same pool with every modifier stripped.
	#[must_use]
	#[inline]
	pub const fn plain(&self) -> Self {
		Self::new(self.count, self.sides)
	}

	/// Starts building dice one modifier at a time.
	#[must_use]
	#[inline]
	pub fn builder() -> Builder {
		Builder::default()
	}
}

impl Default for Dice {
	/// A single d20.
	#[inline]
	fn default() -> Self {
		Self::new(1, 20)
	}
}

impl fmt::Display for Dice {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}d{}", self.count, self.sides)?;
		self.modifiers.iter().try_for_each(|modifier| write!(f, "{modifier}"))
	}
}

/// Everything that can go wrong while rolling or totalling dice
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// Summing the kept dice didn't fit in an `i32`.
	#[error("total of {0} is out of range")]
	Overflow(Rolled<'static>),

	/// Exploding or rerolling would never stop, or chained into more than [`MAX_ADDED_ROLLS`] dice.
	///
	/// # Examples
	/// ```
	/// use augury::dice::{roller::{FastRand as FastRandRoller, Roller}, Dice, Error};
	///
	/// // Every face of a d1 explodes
	/// let dice: Dice = "4d1x".parse()?;
	/// assert!(matches!(FastRandRoller::default().roll(&dice, true), Err(Error::RunawayExpansion(..))));
	/// # Ok::<(), augury::parse::Error>(())
	/// ```
	#[error("{0} would expand into an unbounded number of rolls")]
	RunawayExpansion(Dice),

	/// A comparison symbol that no [`Condition`] uses.
	///
	/// # Examples
	/// ```
	/// use augury::dice::{modifier::Condition, Error};
	///
	/// assert!(matches!(Condition::from_symbol("!", 4), Err(Error::UnknownCondition(..))));
	/// ```
	#[error("unknown condition symbol: {0}")]
	UnknownCondition(String),
}

/// Fluent construction of [`Dice`].
///
/// Modifiers are kept in the order they're added, which is the order they run in.
///
/// ```
/// use augury::dice::{modifier::{Condition, Modifier}, Dice};
///
/// let dice = Dice::builder().count(6).sides(8).reroll(Condition::Eq(1), false).keep_high(4).build();
/// assert_eq!(dice.to_string(), "6d8r=1kh4");
/// assert_eq!(dice.modifiers[1], Modifier::KeepHigh(4));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
	/// Dice in the pool
	count: u16,

	/// Faces on every die
	sides: u16,

	/// Modifiers added so far
	modifiers: Vec<Modifier>,
}

impl Builder {
	/// Sets how many dice are rolled.
	#[must_use]
	pub const fn count(mut self, count: u16) -> Self {
		self.count = count;
		self
	}

	/// Sets how many faces each die has.
	#[must_use]
	pub const fn sides(mut self, sides: u16) -> Self {
		self.sides = sides;
		self
	}

	/// Appends any modifier.
	#[must_use]
	pub fn modifier(mut self, modifier: Modifier) -> Self {
		self.modifiers.push(modifier);
		self
	}

	/// Rerolls dice matching `cond`, repeatedly if `recurse` is set.
	#[must_use]
	pub fn reroll(self, cond: Condition, recurse: bool) -> Self {
		self.modifier(Modifier::Reroll { cond, recurse })
	}

	/// Explodes dice matching `cond` (or showing their highest face when `None`), chaining if `recurse` is set.
	#[must_use]
	pub fn explode(self, cond: Option<Condition>, recurse: bool) -> Self {
		self.modifier(Modifier::Explode { cond, recurse })
	}

	/// Keeps the highest `count` dice.
	#[must_use]
	pub fn keep_high(self, count: u16) -> Self {
		self.modifier(Modifier::KeepHigh(count))
	}

	/// Keeps the lowest `count` dice.
	#[must_use]
	pub fn keep_low(self, count: u16) -> Self {
		self.modifier(Modifier::KeepLow(count))
	}

	/// Drops the highest `count` dice.
	#[must_use]
	pub fn drop_high(self, count: u16) -> Self {
		self.modifier(Modifier::DropHigh(count))
	}

	/// Drops the lowest `count` dice.
	#[must_use]
	pub fn drop_low(self, count: u16) -> Self {
		self.modifier(Modifier::DropLow(count))
	}

	/// Raises dice below `min` up to it.
	#[must_use]
	pub fn min(self, min: u16) -> Self {
		self.modifier(Modifier::Min(min))
	}

	/// Lowers dice above `max` down to it.
	#[must_use]
	pub fn max(self, max: u16) -> Self {
		self.modifier(Modifier::Max(max))
	}

	/// Totals the number of dice matching `cond` instead of their values.
	#[must_use]
	pub fn count_successes(self, cond: Condition) -> Self {
		self.modifier(Modifier::CountSuccesses(cond))
	}

	/// Turns the total into a margin against `target`.
	#[must_use]
	pub fn margin(self, target: Condition) -> Self {
		self.modifier(Modifier::Margin(target))
	}

	/// Finishes the dice.
	#[must_use]
	pub fn build(self) -> Dice {
		Dice {
			count: self.count,
			sides: self.sides,
			modifiers: self.modifiers,
		}
	}
}
