//! Parser generators for dice literals. The tokenizer hands every chunk that looks like a dice literal to these
//! parsers, so their grammar is the single definition of what a dice term may contain.

use chumsky::prelude::*;

use crate::dice::{modifier::Condition, Dice, Modifier};

/// Generates a parser that specifically handles dice terms like "d20", "2d20kh", "8d6x", "5d10cs>=7", etc.
#[must_use]
pub fn dice_part<'src>() -> impl Parser<'src, &'src str, Dice, extra::Err<Rich<'src, char>>> + Clone {
	// Parser for dice modifier conditions
	let condition = choice((
		just(">=").to(Condition::Gte as fn(u16) -> _),
		just("<=").to(Condition::Lte as fn(u16) -> _),
		just('>').to(Condition::Gt as fn(u16) -> _),
		just('<').to(Condition::Lt as fn(u16) -> _),
		just('=').to(Condition::Eq as fn(u16) -> _),
	))
	.or_not()
	.then(text::int::<&'src str, _, _>(10))
	.try_map(|(condfn, val), span| {
		let val = val
			.parse()
			.map_err(|err| Rich::custom(span, format!("Modifier condition: {err}")))?;
		Ok(match condfn {
			Some(condfn) => condfn(val),
			None => Condition::Eq(val),
		})
	});

	// Parser for an optional modifier count, defaulting to 1
	let count = |what: &'static str| {
		text::int::<&'src str, _, _>(10)
			.or_not()
			.try_map(move |count, span| {
				count
					.unwrap_or("1")
					.parse::<u16>()
					.map_err(|err| Rich::custom(span, format!("{what}: {err}")))
			})
	};

	let modifier = choice((
		// Reroll dice (e.g. r1, rr1, r<=2)
		just('r')
			.ignore_then(just('r').or_not().map(|r| r.is_some()))
			.then(condition.clone())
			.map(|(recurse, cond)| Modifier::Reroll { cond, recurse }),
		// Exploding dice (e.g. x, xo, x>4)
		just('x')
			.ignore_then(just('o').or_not().map(|o| o.is_none()))
			.then(condition.clone().or_not())
			.map(|(recurse, cond)| Modifier::Explode { cond, recurse }),
		// Count successes (e.g. cs>=5)
		just("cs").ignore_then(condition.clone()).map(Modifier::CountSuccesses),
		// Margin of success (e.g. ms15, ms>=15, ms<=10)
		just("ms").ignore_then(condition).map(Modifier::Margin),
		// Clamps (e.g. min3, max5)
		just("min")
			.ignore_then(text::int::<&'src str, _, _>(10))
			.try_map(|min, span| {
				min.parse()
					.map(Modifier::Min)
					.map_err(|err| Rich::custom(span, format!("Minimum: {err}")))
			}),
		just("max")
			.ignore_then(text::int::<&'src str, _, _>(10))
			.try_map(|max, span| {
				max.parse()
					.map(Modifier::Max)
					.map_err(|err| Rich::custom(span, format!("Maximum: {err}")))
			}),
		// Drop highest/lowest (e.g. dh, dl2)
		just("dh").ignore_then(count("Drop highest count")).map(Modifier::DropHigh),
		just("dl").ignore_then(count("Drop lowest count")).map(Modifier::DropLow),
		// Keep lowest (e.g. kl, kl2)
		just("kl").ignore_then(count("Keep lowest count")).map(Modifier::KeepLow),
		// Keep highest (e.g. k, kh, kh2)
		just('k')
			.ignore_then(just('h').or_not())
			.ignore_then(count("Keep highest count"))
			.map(Modifier::KeepHigh),
	));

	text::int::<&'src str, _, _>(10)
		.or_not()
		.then_ignore(just('d'))
		.then(text::int::<&'src str, _, _>(10))
		.then(modifier.repeated().collect::<Vec<_>>())
		.try_map(|((count, sides), modifiers), span| {
			let count: u16 = count
				.unwrap_or("1")
				.parse()
				.map_err(|err| Rich::custom(span, format!("Dice count: {err}")))?;
			let sides: u16 = sides
				.parse()
				.map_err(|err| Rich::custom(span, format!("Dice sides: {err}")))?;

			if count == 0 {
				return Err(Rich::custom(span, "Dice count must be at least 1"));
			}
			if sides == 0 {
				return Err(Rich::custom(span, "Dice must have at least 1 side"));
			}

			Ok(Dice {
				count,
				sides,
				modifiers,
			})
		})
}

/// Generates a parser that specifically handles dice terms like "d20", "2d20kh", "8d6x", etc.
/// and expects end of input
#[must_use]
pub fn dice<'src>() -> impl Parser<'src, &'src str, Dice, extra::Err<Rich<'src, char>>> + Clone {
	dice_part().then_ignore(end())
}

/// Error produced when a dice literal can't be parsed
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{details}")]
#[non_exhaustive]
pub struct Error {
	/// Description of everything that went wrong
	pub details: String,

	/// Character offset (within the parsed literal) of the first problem
	pub offset: usize,
}

/// Parses a complete dice literal, case-insensitively.
///
/// # Errors
/// If the literal isn't valid dice syntax or specifies zero dice or sides, an error describing the problem is returned.
pub fn parse_dice(literal: &str) -> Result<Dice, Error> {
	let lc = literal.to_lowercase();
	let result = dice().parse(&lc).into_result().map_err(|errs| Error {
		details: errs.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "),
		offset: errs.first().map_or(0, |err| err.span().start),
	});
	result
}

impl std::str::FromStr for Dice {
	type Err = Error;

	/// Parses a dice literal.
	///
	/// # Examples
	/// ```
	/// use augury::dice::{modifier::Condition, Dice};
	///
	/// let dice: Dice = "4d6kh3".parse()?;
	/// assert_eq!(dice, Dice::builder().count(4).sides(6).keep_high(3).build());
	///
	/// let dice: Dice = "d10cs>=7".parse()?;
	/// assert_eq!(dice, Dice::builder().count(1).sides(10).count_successes(Condition::Gte(7)).build());
	///
	/// assert!("0d6".parse::<Dice>().is_err());
	/// # Ok::<(), augury::parse::Error>(())
	/// ```
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		parse_dice(s)
	}
}
