//! Modifiers that reshape a rolled pool, and the conditions they test faces with.

use std::{cmp::Reverse, fmt};

use super::{roller::Roller, Error, Rolled, MAX_ADDED_ROLLS};

/// A step run on a pool after its dice are rolled. A dice literal's modifiers run strictly left to right, and each
/// one only looks at dice that are still kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Modifier {
	/// Drops each die matching `cond` and rolls a replacement for it (`r`, or `rr` to keep going).
	///
	/// ```
	/// use augury::dice::{roller::{Roller, Scripted as ScriptedRoller}, Dice};
	///
	/// // The 1 is rerolled into another 1, which is rerolled into a 4
	/// let dice: Dice = "4d6rr1".parse()?;
	/// let rolled = ScriptedRoller::new([3, 6, 1, 2, 1, 4]).roll(&dice, true)?;
	/// assert_eq!(rolled.kept(), [3, 6, 2, 4]);
	/// assert_eq!(rolled.discarded(), [1, 1]);
	/// # Ok::<(), Box<dyn std::error::Error>>(())
	/// ```
	Reroll {
		/// Faces that get rerolled
		cond: Condition,

		/// Whether replacements matching `cond` are rerolled too
		recurse: bool,
	},

	/// Keeps each die matching `cond` and rolls an extra one alongside it (`x`, or `xo` to stop after one round).
	///
	/// ```
	/// use augury::dice::{roller::{Roller, Scripted as ScriptedRoller}, Dice};
	///
	/// // The 6 explodes into another 6, which explodes into a 4
	/// let dice: Dice = "4d6x".parse()?;
	/// let rolled = ScriptedRoller::new([3, 6, 1, 2, 6, 4]).roll(&dice, true)?;
	/// assert_eq!(rolled.rolls.iter().filter(|roll| roll.is_additional()).count(), 2);
	/// assert_eq!(rolled.total()?, 22);
	/// # Ok::<(), Box<dyn std::error::Error>>(())
	/// ```
	Explode {
		/// Faces that explode. `None` means the die's highest face.
		cond: Option<Condition>,

		/// Whether extra dice can explode in turn
		recurse: bool,
	},

	/// Keeps the highest n dice (`kh`, `k`).
	///
	/// ```
	/// use augury::dice::{roller::{Roller, Scripted as ScriptedRoller}, Dice};
	///
	/// let dice: Dice = "4d6kh3".parse()?;
	/// let rolled = ScriptedRoller::new([3, 6, 1, 2]).roll(&dice, true)?;
	/// assert_eq!(rolled.kept(), [3, 6, 2]);
	/// # Ok::<(), Box<dyn std::error::Error>>(())
	/// ```
	KeepHigh(u16),

	/// Keeps the lowest n dice (`kl`).
	KeepLow(u16),

	/// Drops the highest n dice (`dh`).
	DropHigh(u16),

	/// Drops the lowest n dice (`dl`).
	DropLow(u16),

	/// Raises faces below the minimum to it (`min`).
	Min(u16),

	/// Lowers faces above the maximum to it (`max`).
	Max(u16),

	/// Flags each die as a success or failure against a condition, making the total a count of successes (`cs`).
	///
	/// ```
	/// use augury::dice::{roller::{Roller, Scripted as ScriptedRoller}, Dice};
	///
	/// let dice: Dice = "5d10cs>=7".parse()?;
	/// let rolled = ScriptedRoller::new([7, 2, 10, 6, 9]).roll(&dice, true)?;
	/// assert_eq!(rolled.total()?, 3);
	/// # Ok::<(), Box<dyn std::error::Error>>(())
	/// ```
	CountSuccesses(Condition),

	/// Compares the total with a target, leaving the margin of success (`ms`). With `<` or `<=` the total is meant to
	/// stay under the target, so the margin is the target minus the total.
	///
	/// ```
	/// use augury::dice::{roller::{Fixed as FixedRoller, Roller}, Dice};
	///
	/// let over: Dice = "1d20ms15".parse()?;
	/// assert_eq!(FixedRoller(18).roll(&over, true)?.total()?, 3);
	///
	/// let under: Dice = "1d20ms<=15".parse()?;
	/// assert_eq!(FixedRoller(18).roll(&under, true)?.total()?, -3);
	/// # Ok::<(), Box<dyn std::error::Error>>(())
	/// ```
	Margin(Condition),
}

impl Modifier {
	/// Runs the modifier on `rolled`, rolling any extra dice it needs with `rng`.
	///
	/// # Errors
	/// Exploding or rerolling that could never finish, or that chains into more than [`MAX_ADDED_ROLLS`] dice, fails with
	/// [`Error::RunawayExpansion`].
	pub fn apply(self, rolled: &mut Rolled, rng: &mut impl Roller) -> Result<(), Error> {
		match self {
			Self::Reroll { cond, recurse } => self.reroll(rolled, rng, cond, recurse)?,
			Self::Explode { cond, recurse } => self.explode(rolled, rng, cond, recurse)?,
			Self::KeepHigh(n) => self.select(rolled, Reverse, Selection::Keep(n)),
			Self::KeepLow(n) => self.select(rolled, |val| val, Selection::Keep(n)),
			Self::DropHigh(n) => self.select(rolled, Reverse, Selection::Drop(n)),
			Self::DropLow(n) => self.select(rolled, |val| val, Selection::Drop(n)),
			Self::Min(min) => self.clamp(rolled, |val| val < min, min),
			Self::Max(max) => self.clamp(rolled, |val| val > max, max),
			Self::CountSuccesses(cond) => {
				for roll in rolled.rolls.iter_mut().filter(|roll| roll.is_kept()) {
					roll.success = Some(cond.check(roll.val));
				}
			}
			Self::Margin(target) => rolled.margin = Some(target),
		}

		Ok(())
	}

	/// Drops matching dice and rolls their replacements, round after round when recursing.
	fn reroll(
		self,
		rolled: &mut Rolled,
		rng: &mut impl Roller,
		cond: Condition,
		recurse: bool,
	) -> Result<(), Error> {
		let sides = rolled.dice.sides;
		if recurse && cond.matches_every_face(sides) {
			return Err(Error::RunawayExpansion(rolled.dice.clone().into_owned()));
		}

		let mut budget = Budget::new(recurse);
		let mut round = 0..rolled.rolls.len();
		loop {
			let start = rolled.rolls.len();
			for idx in round {
				let roll = &mut rolled.rolls[idx];
				if roll.is_kept() && cond.check(roll.val) {
					roll.mark_dropped(self);
					budget.spend(rolled)?;
					let mut replacement = rng.roll_die(sides);
					replacement.mark_added(self);
					rolled.rolls.push(replacement);
				}
			}

			round = start..rolled.rolls.len();
			if !recurse || round.is_empty() {
				return Ok(());
			}
		}
	}

	/// Rolls an extra die for every matching one, chaining through the extras when recursing.
	fn explode(
		self,
		rolled: &mut Rolled,
		rng: &mut impl Roller,
		cond: Option<Condition>,
		recurse: bool,
	) -> Result<(), Error> {
		let sides = rolled.dice.sides;
		let explodes = |val: u16| cond.map_or(val == sides, |cond| cond.check(val));
		let unbounded = match cond {
			Some(cond) => cond.matches_every_face(sides),
			None => sides <= 1,
		};
		if recurse && unbounded {
			return Err(Error::RunawayExpansion(rolled.dice.clone().into_owned()));
		}

		let mut budget = Budget::new(recurse);
		let mut pending = rolled
			.rolls
			.iter()
			.filter(|roll| roll.is_kept() && explodes(roll.val))
			.count();
		while pending > 0 {
			let mut chained = 0_usize;
			for _ in 0..pending {
				budget.spend(rolled)?;
				let mut extra = rng.roll_die(sides);
				extra.mark_added(self);
				if recurse && explodes(extra.val) {
					chained = chained.saturating_add(1);
				}
				rolled.rolls.push(extra);
			}
			pending = chained;
		}

		Ok(())
	}

	/// Orders the kept dice by `key` and keeps or drops a leading share of them. Ties stay in roll order.
	fn select<K: Ord>(self, rolled: &mut Rolled, key: impl Fn(u16) -> K, selection: Selection) {
		let mut order = (0..rolled.rolls.len())
			.filter(|&idx| rolled.rolls[idx].is_kept())
			.collect::<Vec<_>>();
		order.sort_by_key(|&idx| key(rolled.rolls[idx].val));

		let (n, drop_leading) = match selection {
			Selection::Keep(n) => (n, false),
			Selection::Drop(n) => (n, true),
		};
		let split = usize::from(n).min(order.len());
		let (leading, trailing) = order.split_at(split);
		let dropped = if drop_leading { leading } else { trailing };
		for &idx in dropped {
			rolled.rolls[idx].mark_dropped(self);
		}
	}

	/// Sets every kept face matching `out_of_bounds` to `bound`.
	fn clamp(self, rolled: &mut Rolled, out_of_bounds: impl Fn(u16) -> bool, bound: u16) {
		rolled
			.rolls
			.iter_mut()
			.filter(|roll| roll.is_kept() && out_of_bounds(roll.val))
			.for_each(|roll| roll.adjust(self, bound));
	}
}

impl fmt::Display for Modifier {
	/// Writes the modifier in dice notation. Counts of 1 are left implicit.
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let (prefix, n) = match *self {
			Self::Reroll { cond, recurse } => return write!(f, "{}{cond}", if recurse { "rr" } else { "r" }),
			Self::Explode { cond, recurse } => {
				f.write_str(if recurse { "x" } else { "xo" })?;
				return cond.map_or(Ok(()), |cond| write!(f, "{cond}"));
			}
			Self::CountSuccesses(cond) => return write!(f, "cs{cond}"),
			Self::Min(min) => return write!(f, "min{min}"),
			Self::Max(max) => return write!(f, "max{max}"),
			Self::Margin(target) => return write!(f, "ms{target}"),
			Self::KeepHigh(n) => ("kh", n),
			Self::KeepLow(n) => ("kl", n),
			Self::DropHigh(n) => ("dh", n),
			Self::DropLow(n) => ("dl", n),
		};

		f.write_str(prefix)?;
		if n == 1 {
			Ok(())
		} else {
			write!(f, "{n}")
		}
	}
}

/// Whether [`Modifier::select`] keeps or drops the leading dice
#[derive(Debug, Clone, Copy)]
enum Selection {
	/// Keep this many, drop the rest
	Keep(u16),

	/// Drop this many, keep the rest
	Drop(u16),
}

/// Counter enforcing [`MAX_ADDED_ROLLS`] for one recursing modifier. A single round adds at most one die per die in
/// the pool, so it isn't counted.
#[derive(Debug)]
struct Budget(Option<usize>);

impl Budget {
	/// Starts counting, or never runs out if the modifier isn't `recursing`.
	const fn new(recursing: bool) -> Self {
		Self(if recursing { Some(0) } else { None })
	}

	/// Accounts for one more added die.
	fn spend(&mut self, rolled: &Rolled) -> Result<(), Error> {
		let Some(spent) = self.0.as_mut() else {
			return Ok(());
		};
		*spent = spent.saturating_add(1);
		if *spent > MAX_ADDED_ROLLS {
			return Err(Error::RunawayExpansion(rolled.dice.clone().into_owned()));
		}
		Ok(())
	}
}

/// Comparison a die face is tested against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[expect(clippy::exhaustive_enums, reason = "These are all the comparisons dice notation has")]
pub enum Condition {
	/// Face equals the value (`=`, or no symbol at all)
	Eq(u16),

	/// Face is above the value (`>`)
	Gt(u16),

	/// Face is at least the value (`>=`)
	Gte(u16),

	/// Face is below the value (`<`)
	Lt(u16),

	/// Face is at most the value (`<=`)
	Lte(u16),
}

impl Condition {
	/// Builds the condition written as `symbol` followed by `val`.
	///
	/// # Errors
	/// Any symbol other than `=`, `>`, `>=`, `<` or `<=` is an [`Error::UnknownCondition`].
	pub fn from_symbol(symbol: &str, val: u16) -> Result<Self, Error> {
		let make: fn(u16) -> Self = match symbol {
			"=" => Self::Eq,
			">" => Self::Gt,
			">=" => Self::Gte,
			"<" => Self::Lt,
			"<=" => Self::Lte,
			_ => return Err(Error::UnknownCondition(symbol.to_owned())),
		};
		Ok(make(val))
	}

	/// Tests a face.
	#[must_use]
	pub const fn check(&self, face: u16) -> bool {
		match *self {
			Self::Eq(val) => face == val,
			Self::Gt(val) => face > val,
			Self::Gte(val) => face >= val,
			Self::Lt(val) => face < val,
			Self::Lte(val) => face <= val,
		}
	}

	/// Whether the condition is met by values below its own, which makes a margin count downwards.
	#[must_use]
	pub const fn is_below(&self) -> bool {
		matches!(self, Self::Lt(..) | Self::Lte(..))
	}

	/// Whether every face of a die with `sides` faces passes, so rerolling or exploding on it could never end.
	#[must_use]
	pub fn matches_every_face(&self, sides: u16) -> bool {
		(1..=sides).all(|face| self.check(face))
	}

	/// Value the condition compares against.
	#[must_use]
	pub const fn val(&self) -> u16 {
		let (Self::Eq(val) | Self::Gt(val) | Self::Gte(val) | Self::Lt(val) | Self::Lte(val)) = *self;
		val
	}

	/// Comparison symbol.
	#[must_use]
	pub const fn symbol(&self) -> &'static str {
		match self {
			Self::Eq(..) => "=",
			Self::Gt(..) => ">",
			Self::Gte(..) => ">=",
			Self::Lt(..) => "<",
			Self::Lte(..) => "<=",
		}
	}
}

impl fmt::Display for Condition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}{}", self.symbol(), self.val())
	}
}
