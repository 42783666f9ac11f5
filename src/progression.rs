//! Experience progression: how much experience each character level requires, either from a preset table or a custom
//! formula evaluated per level.

use std::{fmt, str::FromStr};

use crate::{context::Context, engine::Engine, outcome::Options, Error};

/// Experience needed to advance past each level on the slow track
pub const SLOW: [u64; 20] = [
	0, 3000, 7500, 14000, 23000, 35000, 53000, 77000, 115_000, 160_000, 235_000, 330_000, 475_000, 665_000, 955_000,
	1_350_000, 1_900_000, 2_700_000, 3_850_000, 5_350_000,
];

/// Experience needed to advance past each level on the medium track
pub const MEDIUM: [u64; 20] = [
	0, 2000, 5000, 9000, 15000, 23000, 35000, 51000, 75000, 105_000, 155_000, 220_000, 315_000, 445_000, 635_000,
	890_000, 1_300_000, 1_800_000, 2_550_000, 3_600_000,
];

/// Experience needed to advance past each level on the fast track
pub const FAST: [u64; 20] = [
	0, 1300, 3300, 6000, 10000, 15000, 23000, 34000, 50000, 71000, 105_000, 145_000, 210_000, 295_000, 425_000,
	600_000, 850_000, 1_200_000, 1_700_000, 2_400_000,
];

/// Built-in experience table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[allow(clippy::exhaustive_enums)]
pub enum Preset {
	/// Fast advancement
	Fast,

	/// Medium advancement
	#[default]
	Medium,

	/// Slow advancement
	Slow,
}

impl Preset {
	/// Gets the table of experience thresholds, indexed by level.
	#[must_use]
	pub const fn table(self) -> &'static [u64; 20] {
		match self {
			Self::Fast => &FAST,
			Self::Medium => &MEDIUM,
			Self::Slow => &SLOW,
		}
	}

	/// Looks up the threshold for a level, clamping the level to the table.
	#[must_use]
	pub fn threshold(self, level: u32) -> u64 {
		let table = self.table();
		let idx = usize::try_from(level).map_or(table.len() - 1, |level| level.min(table.len() - 1));
		table[idx]
	}
}

impl fmt::Display for Preset {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Fast => "fast",
			Self::Medium => "medium",
			Self::Slow => "slow",
		})
	}
}

/// Error for an unknown preset name
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown experience track \"{0}\"")]
pub struct UnknownPreset(pub String);

impl FromStr for Preset {
	type Err = UnknownPreset;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"fast" => Ok(Self::Fast),
			"medium" => Ok(Self::Medium),
			"slow" => Ok(Self::Slow),
			_ => Err(UnknownPreset(s.to_owned())),
		}
	}
}

/// Experience progression configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[non_exhaustive]
pub enum Track {
	/// One of the built-in tables
	Preset(Preset),

	/// Formula evaluated once per level with `@level` bound, whose totals are summed
	Custom {
		/// Per-level formula
		formula: String,
	},
}

impl Track {
	/// Creates a custom track.
	#[must_use]
	pub fn custom(formula: impl Into<String>) -> Self {
		Self::Custom {
			formula: formula.into(),
		}
	}

	/// Calculates the experience needed to advance past a level.
	///
	/// # Errors
	/// See [`compute_progression()`].
	pub fn threshold(&self, level: u32, ctx: &Context) -> Result<u64, Error> {
		compute_progression(self, level, ctx)
	}

	/// Calculates how full the experience bar is, in percent, for a character with `xp` experience at `level`: the
	/// position of `xp` between the thresholds of the previous and current level. When the two thresholds coincide
	/// the bar is empty.
	///
	/// # Errors
	/// See [`compute_progression()`].
	///
	/// # Examples
	/// ```
	/// use augury::{progression::{Preset, Track}, Context};
	///
	/// let track = Track::Preset(Preset::Medium);
	/// let ctx = Context::new();
	/// assert_eq!(track.progress_percent(3500, 2, &ctx)?, 50.0);
	/// assert_eq!(track.progress_percent(9000, 2, &ctx)?, 100.0);
	/// assert_eq!(track.progress_percent(100, 2, &ctx)?, 0.0);
	/// # Ok::<(), augury::Error>(())
	/// ```
	#[expect(clippy::cast_precision_loss, reason = "Experience totals are far below 2^52")]
	pub fn progress_percent(&self, xp: u64, level: u32, ctx: &Context) -> Result<f64, Error> {
		let prior = self.threshold(level.saturating_sub(1), ctx)?;
		let max = self.threshold(level.max(1), ctx)?;
		if max <= prior {
			return Ok(0.0);
		}

		let clamped = xp.clamp(prior, max);
		Ok((clamped - prior) as f64 / (max - prior) as f64 * 100.0)
	}
}

impl Default for Track {
	fn default() -> Self {
		Self::Preset(Preset::default())
	}
}

impl From<Preset> for Track {
	fn from(preset: Preset) -> Self {
		Self::Preset(preset)
	}
}

/// Calculates the experience needed to advance past a level.
///
/// Preset tracks clamp the level to their table, so level 0 needs no experience and levels past the end of the table
/// need as much as the last level. Custom tracks evaluate their formula once for each level from 1 to `level`, with
/// `@level` bound to that level in a copy of the context, and sum the totals; the result is never below 1.
///
/// # Errors
/// If a custom formula fails to evaluate or doesn't produce a number, an error variant is returned.
///
/// # Examples
/// ```
/// use augury::{compute_progression, progression::{Preset, Track}, Context};
///
/// let ctx = Context::new();
/// assert_eq!(compute_progression(&Track::Preset(Preset::Fast), 3, &ctx)?, 6000);
/// assert_eq!(compute_progression(&Track::Preset(Preset::Slow), 999, &ctx)?, 5_350_000);
/// assert_eq!(compute_progression(&Track::custom("@level * 1000"), 3, &ctx)?, 6000);
/// assert_eq!(compute_progression(&Track::custom(""), 3, &ctx)?, 1);
/// # Ok::<(), augury::Error>(())
/// ```
pub fn compute_progression(track: &Track, level: u32, ctx: &Context) -> Result<u64, Error> {
	let formula = match track {
		Track::Preset(preset) => return Ok(preset.threshold(level)),
		Track::Custom { formula } => formula,
	};

	let engine = Engine::global();
	let opts = Options::default();
	let mut ctx = ctx.clone();
	let mut total = 0.0;

	for lvl in 1..=level {
		ctx.insert("level", lvl);
		let result = engine.evaluate(formula, &ctx, &opts)?;
		total += result.total.to_number()?;
	}

	tracing::debug!(formula = %formula, level, total, "computed custom experience threshold");
	Ok(to_xp(total))
}

/// Converts a summed experience total to a whole threshold of at least 1.
#[expect(
	clippy::cast_possible_truncation,
	clippy::cast_sign_loss,
	reason = "The value is floored and at least 1, and float-to-int casts saturate"
)]
fn to_xp(total: f64) -> u64 {
	total.max(1.0).floor() as u64
}

/// Change to a character's experience as entered on a sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(clippy::exhaustive_enums)]
pub enum XpChange {
	/// `+N`: gain experience
	Add(u64),

	/// `-N`: lose experience
	Subtract(u64),

	/// `N`: set experience
	Set(u64),

	/// Empty input: reset to the threshold of the previous level
	Reset,

	/// Anything else: leave experience alone
	Keep,
}

impl XpChange {
	/// Interprets sheet input.
	///
	/// # Examples
	/// ```
	/// use augury::progression::XpChange;
	///
	/// assert_eq!(XpChange::parse("+250"), XpChange::Add(250));
	/// assert_eq!(XpChange::parse("-40"), XpChange::Subtract(40));
	/// assert_eq!(XpChange::parse("1200"), XpChange::Set(1200));
	/// assert_eq!(XpChange::parse(""), XpChange::Reset);
	/// assert_eq!(XpChange::parse("lots"), XpChange::Keep);
	/// ```
	#[must_use]
	pub fn parse(input: &str) -> Self {
		let digits = |s: &str| {
			if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
				s.parse().ok()
			} else {
				None
			}
		};

		if input.is_empty() {
			Self::Reset
		} else if let Some(n) = input.strip_prefix('+').and_then(digits) {
			Self::Add(n)
		} else if let Some(n) = input.strip_prefix('-').and_then(digits) {
			Self::Subtract(n)
		} else if let Some(n) = digits(input) {
			Self::Set(n)
		} else {
			Self::Keep
		}
	}

	/// Applies the change to a character's current experience. Experience never goes below 0.
	///
	/// # Errors
	/// If resetting requires evaluating a custom track that fails, an error variant is returned.
	///
	/// # Examples
	/// ```
	/// use augury::{progression::{Preset, Track, XpChange}, Context};
	///
	/// let track = Track::Preset(Preset::Medium);
	/// let ctx = Context::new();
	/// assert_eq!(XpChange::Add(500).apply(1000, 1, &track, &ctx)?, 1500);
	/// assert_eq!(XpChange::Subtract(5000).apply(1000, 1, &track, &ctx)?, 0);
	/// assert_eq!(XpChange::Reset.apply(4200, 3, &track, &ctx)?, 5000);
	/// # Ok::<(), augury::Error>(())
	/// ```
	pub fn apply(self, current: u64, level: u32, track: &Track, ctx: &Context) -> Result<u64, Error> {
		Ok(match self {
			Self::Add(n) => current.saturating_add(n),
			Self::Subtract(n) => current.saturating_sub(n),
			Self::Set(n) => n,
			Self::Reset if level > 0 => compute_progression(track, level - 1, ctx)?,
			Self::Reset => 0,
			Self::Keep => current,
		})
	}
}
