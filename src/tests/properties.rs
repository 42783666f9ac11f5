use proptest::prelude::*;

use crate::{
	dice::roller::{FastRand as FastRandRoller, Roller},
	ops::OperatorTable,
	term::tokenize,
	Context, Dice, Engine, Options, Value,
};

proptest! {
	#[test]
	fn rolls_stay_in_range(count in 1..=50u16, sides in 1..=100u16, seed: u64) {
		let dice = Dice::new(count, sides);
		let rolled = FastRandRoller::with_seed(seed).roll(&dice, true).unwrap();

		prop_assert_eq!(rolled.rolls.len(), usize::from(count));
		prop_assert!(rolled.rolls.iter().all(|roll| (1..=sides).contains(&roll.val)));

		let sum: i32 = rolled.rolls.iter().map(|roll| i32::from(roll.val)).sum();
		prop_assert_eq!(rolled.total().unwrap(), sum);
	}

	#[test]
	fn keep_high_keeps_the_largest(count in 1..=20u16, keep in 1..=25u16, seed: u64) {
		let dice = Dice::builder().count(count).sides(20).keep_high(keep).build();
		let rolled = FastRandRoller::with_seed(seed).roll(&dice, true).unwrap();

		let mut kept = rolled.kept();
		kept.sort_unstable();
		let mut all = rolled.rolls.iter().map(|roll| roll.val).collect::<Vec<_>>();
		all.sort_unstable();
		let expected = &all[all.len() - usize::from(keep.min(count))..];
		prop_assert_eq!(kept.as_slice(), expected);
	}

	#[test]
	fn arithmetic_matches_f64(a in -1000..1000i32, b in -1000..1000i32, c in -1000..1000i32) {
		let (x, y, z) = (f64::from(a), f64::from(b), f64::from(c));
		prop_assert_eq!(total(&format!("{a} + {b} * {c}")), Value::Num(x + y * z));
		prop_assert_eq!(total(&format!("{a} - {b} - {c}")), Value::Num(x - y - z));
		prop_assert_eq!(total(&format!("({a} - {b}) * {c}")), Value::Num((x - y) * z));
		if b != 0 {
			prop_assert_eq!(total(&format!("{a} / {b}")), Value::Num(x / y));
		}
	}

	#[test]
	fn seeded_rolls_repeat(seed: u64) {
		let engine = Engine::new();
		let opts = Options::default().seed(seed);
		let a = engine.evaluate("4d6kh3 + 2d8", &Context::new(), &opts).unwrap();
		let b = engine.evaluate("4d6kh3 + 2d8", &Context::new(), &opts).unwrap();

		let num = a.number().unwrap();
		prop_assert!((5.0..=34.0).contains(&num));
		prop_assert_eq!(a, b);
	}

	#[test]
	fn tokenizing_never_panics(formula in "\\PC{0,40}") {
		let _ = tokenize(&formula, &OperatorTable::standard());
	}

	#[test]
	fn evaluating_never_panics(formula in "[0-9+*/%()<>=!?:&|. -]{0,40}") {
		let _ = Engine::new().evaluate(&formula, &Context::new(), &Options::default());
	}
}

fn total(formula: &str) -> Value {
	Engine::new().evaluate(formula, &Context::new(), &Options::default()).unwrap().total
}
