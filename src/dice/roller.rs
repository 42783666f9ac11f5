//! Sources of die faces.
//!
//! The engine rolls with [`FastRand`], seeded when a formula asks for reproducible results. The other rollers produce
//! predetermined faces for tests and for callers that already know what was rolled.

use std::{borrow::Cow, iter};

use fastrand::Rng;

use super::{Dice, DieRoll, Error, Rolled};

/// Something that can produce die faces.
///
/// Implementors only supply [`Roller::roll_die`]. Rolling whole pools and running their modifiers is shared.
pub trait Roller {
	/// Produces one die with `sides` faces.
	#[must_use]
	fn roll_die(&mut self, sides: u16) -> DieRoll;

	/// Rolls every die in `dice`, then runs its modifiers in order when `apply_mods` is set.
	///
	/// # Errors
	/// If a modifier would add dice without bound, [`Error::RunawayExpansion`] is returned.
	fn roll<'d>(&mut self, dice: &'d Dice, apply_mods: bool) -> Result<Rolled<'d>, Error>
	where
		Self: Sized,
	{
		let mut rolled = Rolled {
			rolls: iter::repeat_with(|| self.roll_die(dice.sides))
				.take(dice.count.into())
				.collect(),
			dice: Cow::Borrowed(dice),
			margin: None,
		};

		if apply_mods {
			for modifier in &dice.modifiers {
				modifier.apply(&mut rolled, self)?;
			}
		}

		Ok(rolled)
	}
}

/// Uniformly random faces from a [`fastrand::Rng`].
///
/// ```
/// use augury::dice::{roller::{FastRand as FastRandRoller, Roller}, Dice};
///
/// let dice = Dice::new(4, 6);
/// let rolled = FastRandRoller::default().roll(&dice, true)?;
/// assert!(rolled.kept().iter().all(|face| (1..=6).contains(face)));
///
/// // A seed fixes the whole sequence
/// let a = FastRandRoller::with_seed(0x5eed).roll(&dice, true)?;
/// let b = FastRandRoller::with_seed(0x5eed).roll(&dice, true)?;
/// assert_eq!(a, b);
/// # Ok::<(), augury::dice::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct FastRand(Rng);

impl FastRand {
	/// Rolls with an existing generator.
	#[must_use]
	#[inline]
	pub const fn new(rng: Rng) -> Self {
		Self(rng)
	}

	/// Rolls with a generator seeded from `seed`.
	#[must_use]
	#[inline]
	pub fn with_seed(seed: u64) -> Self {
		Self(Rng::with_seed(seed))
	}
}

impl Roller for FastRand {
	#[inline]
	fn roll_die(&mut self, sides: u16) -> DieRoll {
		// A zero-sided die has no faces to pick from
		let face = if sides == 0 { 0 } else { self.0.u16(1..=sides) };
		DieRoll::new(face)
	}
}

/// Every die shows the same face, whatever its size.
///
/// ```
/// use augury::dice::{roller::{Fixed as FixedRoller, Roller}, Dice};
///
/// let dice = Dice::new(4, 6);
/// let rolled = FixedRoller(3).roll(&dice, true)?;
/// assert_eq!(rolled.kept(), [3, 3, 3, 3]);
/// # Ok::<(), augury::dice::Error>(())
/// ```
#[derive(Debug, Default, Clone, Copy)]
#[expect(clippy::exhaustive_structs, reason = "A single face is all there is to it")]
pub struct Fixed(pub u16);

impl Roller for Fixed {
	#[inline]
	fn roll_die(&mut self, _sides: u16) -> DieRoll {
		DieRoll::new(self.0)
	}
}

/// Every die shows its highest face.
///
/// ```
/// use augury::dice::{roller::{Max as MaxRoller, Roller}, Dice};
///
/// let dice = Dice::new(2, 20);
/// let rolled = MaxRoller.roll(&dice, true)?;
/// assert_eq!(rolled.total()?, 40);
/// # Ok::<(), augury::dice::Error>(())
/// ```
#[derive(Debug, Default, Clone, Copy)]
#[expect(clippy::exhaustive_structs, reason = "Unit roller")]
pub struct Max;

impl Roller for Max {
	#[inline]
	fn roll_die(&mut self, sides: u16) -> DieRoll {
		DieRoll::new(sides)
	}
}

/// Plays back a fixed list of faces in order, starting over once it reaches the end.
///
/// An empty script rolls every die at its highest face, like [`Max`].
///
/// ```
/// use augury::dice::{roller::{Roller, Scripted as ScriptedRoller}, Dice};
///
/// let mut roller = ScriptedRoller::new([1, 2, 3]);
/// let dice = Dice::new(5, 6);
/// let rolled = roller.roll(&dice, true)?;
/// assert_eq!(rolled.kept(), [1, 2, 3, 1, 2]);
/// assert_eq!(roller.played(), 5);
/// # Ok::<(), augury::dice::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Scripted {
	/// Faces to play back
	script: Vec<u16>,

	/// Position of the next face in the script
	cursor: usize,

	/// Number of faces played so far
	played: usize,
}

impl Scripted {
	/// Plays back `faces`.
	#[must_use]
	pub fn new(faces: impl IntoIterator<Item = u16>) -> Self {
		Self {
			script: faces.into_iter().collect(),
			cursor: 0,
			played: 0,
		}
	}

	/// How many faces have been handed out.
	#[must_use]
	#[inline]
	pub const fn played(&self) -> usize {
		self.played
	}
}

impl Roller for Scripted {
	fn roll_die(&mut self, sides: u16) -> DieRoll {
		if self.cursor >= self.script.len() {
			self.cursor = 0;
		}
		let face = self.script.get(self.cursor).copied().unwrap_or(sides);

		self.cursor = self.cursor.saturating_add(1);
		self.played = self.played.saturating_add(1);
		DieRoll::new(face)
	}
}
