//! Tiered currency conversion: collapsing surplus lower-tier coins into higher tiers.

use std::collections::BTreeMap;

/// Coin counts by denomination
pub type Purse = BTreeMap<String, u64>;

/// Exchange of one denomination into the next tier up
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub struct Exchange {
	/// Denomination being converted
	pub from: String,

	/// Denomination it converts into
	pub into: String,

	/// How many `from` coins make one `into` coin
	pub rate: u64,
}

impl Exchange {
	/// Creates an exchange.
	#[must_use]
	pub fn new(from: impl Into<String>, into: impl Into<String>, rate: u64) -> Self {
		Self {
			from: from.into(),
			into: into.into(),
			rate,
		}
	}
}

/// Gets the standard exchanges: copper to silver, silver to gold and gold to platinum, 10 each.
#[must_use]
pub fn standard() -> Vec<Exchange> {
	vec![
		Exchange::new("cp", "sp", 10),
		Exchange::new("sp", "gp", 10),
		Exchange::new("gp", "pp", 10),
	]
}

/// Converts as many coins as possible into higher tiers, applying the exchanges in order so that coins gained from one
/// exchange can be converted again by a later one. Only the remainder below each rate stays in the lower tier.
/// Exchanges with a rate of 0 are skipped, and missing denominations count as 0.
///
/// # Examples
/// ```
/// use augury::currency::{convert, standard, Purse};
///
/// let purse = Purse::from([("cp".to_owned(), 25)]);
/// let converted = convert(&purse, &standard());
/// assert_eq!(converted["cp"], 5);
/// assert_eq!(converted["sp"], 2);
/// assert_eq!(converted["gp"], 0);
///
/// let purse = Purse::from([("cp".to_owned(), 1234), ("gp".to_owned(), 3)]);
/// let converted = convert(&purse, &standard());
/// assert_eq!(
/// 	[converted["cp"], converted["sp"], converted["gp"], converted["pp"]],
/// 	[4, 3, 5, 1]
/// );
/// ```
#[must_use]
pub fn convert(purse: &Purse, exchanges: &[Exchange]) -> Purse {
	let mut converted = purse.clone();

	for exchange in exchanges {
		if exchange.rate == 0 {
			tracing::warn!(from = %exchange.from, into = %exchange.into, "skipping exchange with a rate of 0");
			continue;
		}

		let coins = converted.get(&exchange.from).copied().unwrap_or(0);
		let change = coins / exchange.rate;
		converted.insert(exchange.from.clone(), coins % exchange.rate);

		let target = converted.entry(exchange.into.clone()).or_insert(0);
		*target = target.saturating_add(change);
	}

	converted
}
