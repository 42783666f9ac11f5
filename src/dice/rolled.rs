//! Rolled pools and the individual dice inside them.

use std::{borrow::Cow, cmp, fmt};

use super::{modifier::Condition, Dice, Error, Modifier};
use crate::expr::Describe;

/// One die in a rolled pool, along with everything the pool's modifiers did to it
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub struct DieRoll {
	/// Face currently showing
	pub val: u16,

	/// Modifier that rolled this die into the pool (explosions and rerolls)
	pub added_by: Option<Modifier>,

	/// Modifier that took this die out of the total
	pub dropped_by: Option<Modifier>,

	/// Every time a modifier replaced the face, oldest first
	pub changes: Vec<Adjustment>,

	/// Success flag set by [`Modifier::CountSuccesses`]
	pub success: Option<bool>,
}

impl DieRoll {
	/// A fresh die showing `val`.
	#[must_use]
	pub const fn new(val: u16) -> Self {
		Self {
			val,
			added_by: None,
			dropped_by: None,
			changes: Vec::new(),
			success: None,
		}
	}

	/// Records that `modifier` added this die. A die added twice keeps the first attribution.
	pub fn mark_added(&mut self, modifier: Modifier) {
		self.added_by.get_or_insert(modifier);
	}

	/// Records that `modifier` dropped this die. A die dropped twice keeps the first attribution.
	pub fn mark_dropped(&mut self, modifier: Modifier) {
		self.dropped_by.get_or_insert(modifier);
	}

	/// Replaces the face with `val`, remembering what it was.
	pub fn adjust(&mut self, modifier: Modifier, val: u16) {
		self.changes.push(Adjustment {
			before: self.val,
			after: val,
			cause: modifier,
		});
		self.val = val;
	}

	/// Whether a modifier added the die after the initial roll.
	#[must_use]
	#[inline]
	pub const fn is_additional(&self) -> bool {
		self.added_by.is_some()
	}

	/// Whether a modifier dropped the die.
	#[must_use]
	#[inline]
	pub const fn is_dropped(&self) -> bool {
		self.dropped_by.is_some()
	}

	/// Whether the die still counts towards the total.
	#[must_use]
	#[inline]
	pub const fn is_kept(&self) -> bool {
		!self.is_dropped()
	}

	/// Whether a modifier replaced the face at least once.
	#[must_use]
	#[inline]
	pub fn is_changed(&self) -> bool {
		!self.changes.is_empty()
	}

	/// Whether a success-counting modifier accepted the die.
	#[must_use]
	#[inline]
	pub fn is_success(&self) -> bool {
		self.success == Some(true)
	}
}

impl PartialOrd for DieRoll {
	fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for DieRoll {
	/// Dice order by their current face only.
	fn cmp(&self, other: &Self) -> cmp::Ordering {
		self.val.cmp(&other.val)
	}
}

impl fmt::Display for DieRoll {
	/// Writes the face followed by a marker for each thing that happened to it: ` (m)` when a modifier changed it,
	/// ` (s)` for a success and ` (d)` when dropped.
	///
	/// ```
	/// use augury::dice::{DieRoll, Modifier};
	///
	/// let mut roll = DieRoll::new(16);
	/// assert_eq!(roll.to_string(), "16");
	///
	/// roll.mark_dropped(Modifier::KeepLow(1));
	/// assert_eq!(roll.to_string(), "16 (d)");
	/// ```
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.val)?;
		let markers = [(self.is_changed(), "m"), (self.is_success(), "s"), (self.is_dropped(), "d")];
		for (set, marker) in markers {
			if set {
				write!(f, " ({marker})")?;
			}
		}
		Ok(())
	}
}

/// A face replaced by a modifier such as [`Modifier::Min`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(clippy::exhaustive_structs)]
pub struct Adjustment {
	/// Face before the modifier ran
	pub before: u16,

	/// Face after
	pub after: u16,

	/// Modifier responsible
	pub cause: Modifier,
}

/// A rolled pool of [`Dice`] with its modifiers applied
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[allow(clippy::exhaustive_structs)]
pub struct Rolled<'a> {
	/// Every die that was rolled, in the order it was rolled, dropped ones included
	pub rolls: Vec<DieRoll>,

	/// Literal the pool was rolled from
	pub dice: Cow<'a, Dice>,

	/// Target the total is compared with by [`Modifier::Margin`]
	pub margin: Option<Condition>,
}

impl<'a> Rolled<'a> {
	/// Wraps already-known faces as an unmodified roll of `dice`.
	#[must_use]
	pub fn from_dice_and_rolls(dice: &'a Dice, rolls: impl IntoIterator<Item = u16>) -> Self {
		Self {
			rolls: rolls.into_iter().map(DieRoll::new).collect(),
			dice: Cow::Borrowed(dice),
			margin: None,
		}
	}

	/// Totals the pool.
	///
	/// Kept faces are summed, unless a success-counting modifier ran, in which case kept successes are counted.
	/// A margin target is applied last: subtracted from the total, or the total subtracted from it when the target is a
	/// `<`/`<=` condition.
	///
	/// # Errors
	/// If the total doesn't fit in an `i32`, [`Error::Overflow`] is returned.
	///
	/// # Examples
	/// ```
	/// use augury::dice::{modifier::Condition, Dice, Rolled};
	///
	/// let dice: Dice = "3d6ms10".parse()?;
	/// let rolled = Rolled { margin: Some(Condition::Eq(10)), ..Rolled::from_dice_and_rolls(&dice, [6, 2, 5]) };
	/// assert_eq!(rolled.total()?, 3);
	///
	/// let rolled = Rolled { margin: Some(Condition::Lte(10)), ..rolled };
	/// assert_eq!(rolled.total()?, -3);
	/// # Ok::<(), Box<dyn std::error::Error>>(())
	/// ```
	pub fn total(&self) -> Result<i32, Error> {
		let counting = self.counts_successes();
		let sum = self
			.rolls
			.iter()
			.filter(|roll| roll.is_kept())
			.map(|roll| if counting { i32::from(roll.is_success()) } else { i32::from(roll.val) })
			.try_fold(0_i32, i32::checked_add);

		let total = match (sum, self.margin) {
			(Some(sum), Some(target)) if target.is_below() => i32::from(target.val()).checked_sub(sum),
			(Some(sum), Some(target)) => sum.checked_sub(i32::from(target.val())),
			(sum, None) => sum,
			(None, Some(..)) => None,
		};
		total.ok_or_else(|| Error::Overflow(self.clone().into_owned()))
	}

	/// Whether [`Modifier::CountSuccesses`] looked at any of the dice.
	#[must_use]
	pub fn counts_successes(&self) -> bool {
		self.rolls.iter().any(|roll| roll.success.is_some())
	}

	/// Whether the total already means success or failure on its own (counted successes or a margin).
	#[must_use]
	pub fn has_success_annotation(&self) -> bool {
		self.margin.is_some() || self.counts_successes()
	}

	/// Faces still counting towards the total, in roll order.
	#[must_use]
	pub fn kept(&self) -> Vec<u16> {
		self.faces(DieRoll::is_kept)
	}

	/// Faces a modifier dropped, in roll order.
	#[must_use]
	pub fn discarded(&self) -> Vec<u16> {
		self.faces(DieRoll::is_dropped)
	}

	/// Collects the faces of dice matching `pred`.
	fn faces(&self, pred: impl Fn(&DieRoll) -> bool) -> Vec<u16> {
		self.rolls.iter().filter(|roll| pred(*roll)).map(|roll| roll.val).collect()
	}

	/// Detaches the roll from the borrowed dice literal.
	#[must_use]
	pub fn into_owned(self) -> Rolled<'static> {
		Rolled {
			rolls: self.rolls,
			dice: Cow::Owned(self.dice.into_owned()),
			margin: self.margin,
		}
	}
}

impl Describe for Rolled<'_> {
	/// Writes the dice literal followed by every die in brackets (see [`DieRoll`]'s `Display`).
	///
	/// With a `list_limit`, only that many dice are listed and the rest are summarized as "N more...".
	///
	/// ```
	/// use augury::{dice::{Dice, Modifier, Rolled}, expr::Describe};
	///
	/// let dice: Dice = "4d6kh2".parse()?;
	/// let mut rolled = Rolled::from_dice_and_rolls(&dice, [6, 2, 5, 3]);
	/// rolled.rolls[1].mark_dropped(Modifier::KeepHigh(2));
	/// rolled.rolls[3].mark_dropped(Modifier::KeepHigh(2));
	///
	/// assert_eq!(rolled.describe(None), "4d6kh2[6, 2 (d), 5, 3 (d)]");
	/// assert_eq!(rolled.describe(Some(2)), "4d6kh2[6, 2 (d), 2 more...]");
	/// # Ok::<(), augury::parse::Error>(())
	/// ```
	fn describe(&self, list_limit: Option<usize>) -> String {
		let shown = list_limit.map_or(self.rolls.len(), |limit| limit.min(self.rolls.len()));
		let mut list = self.rolls[..shown]
			.iter()
			.map(ToString::to_string)
			.collect::<Vec<_>>();

		let hidden = self.rolls.len().saturating_sub(shown);
		if hidden > 0 {
			list.push(format!("{hidden} more..."));
		}

		format!("{}[{}]", self.dice, list.join(", "))
	}
}

impl fmt::Display for Rolled<'_> {
	/// Same as [`Describe::describe`] without a limit.
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(&self.describe(None))
	}
}
