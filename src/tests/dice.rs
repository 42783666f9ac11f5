use crate::dice::{
	modifier::Condition,
	roller::{FastRand as FastRandRoller, Fixed as FixedRoller, Max as MaxRoller, Roller, Scripted as ScriptedRoller},
	Dice, Error, Modifier, Rolled, MAX_ADDED_ROLLS,
};

#[test]
fn single_d20() {
	let dice = Dice::new(1, 20);
	let rolled = rolls_successfully_and_in_range(&dice);
	assert_eq!(rolled.rolls.len(), 1);
	assert_eq!(*rolled.dice, dice);
}

#[test]
fn hundred_d42s() {
	let dice = Dice::new(100, 42);
	let rolled = rolls_successfully_and_in_range(&dice);
	assert_eq!(rolled.rolls.len(), 100);
}

#[test]
fn total_is_sum_of_samples() {
	let dice = Dice::new(8, 6);
	let rolled = rolls_successfully_and_in_range(&dice);
	let sum: i32 = rolled.rolls.iter().map(|roll| i32::from(roll.val)).sum();
	assert_eq!(rolled.total().unwrap(), sum);
}

#[test]
fn all_dice_sides_occur() {
	let dice = Dice::new(500, 20);
	let mut roller = FastRandRoller::with_seed(0xd20);
	let mut seen = [false; 20];

	for _ in 0..4 {
		let rolled = roller.roll(&dice, true).unwrap();
		for roll in &rolled.rolls {
			seen[usize::from(roll.val) - 1] = true;
		}
	}

	assert!(seen.iter().all(|side| *side));
}

#[test]
fn same_seed_same_rolls() {
	let dice = Dice::builder().count(10).sides(6).explode(None, true).build();
	let a = FastRandRoller::with_seed(99).roll(&dice, true).unwrap();
	let b = FastRandRoller::with_seed(99).roll(&dice, true).unwrap();
	assert_eq!(a, b);
}

#[test]
fn keep_highest() {
	let dice = Dice::builder().count(4).sides(6).keep_high(3).build();
	let rolled = ScriptedRoller::new([3, 1, 6, 4]).roll(&dice, true).unwrap();
	assert_eq!(rolled.kept(), vec![3, 6, 4]);
	assert_eq!(rolled.discarded(), vec![1]);
	assert_eq!(rolled.total().unwrap(), 13);
}

#[test]
fn keep_lowest() {
	let dice = Dice::builder().count(2).sides(20).keep_low(1).build();
	let rolled = ScriptedRoller::new([17, 4]).roll(&dice, true).unwrap();
	assert_eq!(rolled.kept(), vec![4]);
	assert_eq!(rolled.total().unwrap(), 4);
}

#[test]
fn drop_highest_and_lowest() {
	let dice = Dice::builder().count(5).sides(10).drop_high(1).drop_low(2).build();
	let rolled = ScriptedRoller::new([5, 9, 1, 7, 2]).roll(&dice, true).unwrap();
	assert_eq!(rolled.kept(), vec![5, 7]);
	assert_eq!(rolled.discarded(), vec![9, 1, 2]);
	assert_eq!(rolled.total().unwrap(), 12);
}

#[test]
fn keep_more_than_rolled() {
	let dice = Dice::builder().count(2).sides(6).keep_high(5).build();
	let rolled = ScriptedRoller::new([2, 3]).roll(&dice, true).unwrap();
	assert_eq!(rolled.kept(), vec![2, 3]);
}

#[test]
fn exploding_adds_dice() {
	let dice = Dice::builder().count(2).sides(6).explode(None, true).build();
	let rolled = ScriptedRoller::new([6, 2, 6, 3]).roll(&dice, true).unwrap();
	assert_eq!(rolled.rolls.len(), 4);
	assert!(rolled.rolls[2].is_additional());
	assert!(rolled.rolls[3].is_additional());
	assert_eq!(rolled.total().unwrap(), 17);
}

#[test]
fn exploding_once_stops() {
	let dice = Dice::builder().count(1).sides(6).explode(None, false).build();
	let rolled = ScriptedRoller::new([6, 6]).roll(&dice, true).unwrap();
	assert_eq!(rolled.rolls.len(), 2);
	assert_eq!(rolled.total().unwrap(), 12);
}

#[test]
fn exploding_with_condition() {
	let dice = Dice::builder().count(1).sides(10).explode(Some(Condition::Gte(9)), true).build();
	let rolled = ScriptedRoller::new([9, 10, 3]).roll(&dice, true).unwrap();
	assert_eq!(rolled.kept(), vec![9, 10, 3]);
}

#[test]
fn reroll_once() {
	let dice = Dice::builder().count(2).sides(6).reroll(Condition::Eq(1), false).build();
	let rolled = ScriptedRoller::new([1, 4, 1]).roll(&dice, true).unwrap();
	assert_eq!(rolled.kept(), vec![4, 1]);
	assert_eq!(rolled.discarded(), vec![1]);
}

#[test]
fn runaway_explosion_is_rejected() {
	let dice = Dice::builder().count(1).sides(1).explode(None, true).build();
	let res = FastRandRoller::default().roll(&dice, true);
	assert!(matches!(res, Err(Error::RunawayExpansion(..))));

	let dice = Dice::builder().count(1).sides(6).explode(Some(Condition::Gte(1)), true).build();
	let res = FastRandRoller::default().roll(&dice, true);
	assert!(matches!(res, Err(Error::RunawayExpansion(..))));
}

#[test]
fn runaway_reroll_is_rejected() {
	let dice = Dice::builder().count(3).sides(4).reroll(Condition::Lte(4), true).build();
	let res = FastRandRoller::default().roll(&dice, true);
	assert!(matches!(res, Err(Error::RunawayExpansion(..))));
}

#[test]
fn explosion_cap() {
	// Always rolling the max value keeps the explosion going until the cap stops it
	let dice = Dice::builder().count(1).sides(6).explode(None, true).build();
	let res = MaxRoller.roll(&dice, true);
	assert!(matches!(res, Err(Error::RunawayExpansion(..))));

	// Non-recursive explosions are bounded by the dice count, not the cap
	let dice = Dice::builder().count(1500).sides(6).explode(None, false).build();
	let rolled = MaxRoller.roll(&dice, true).unwrap();
	assert_eq!(rolled.rolls.len(), 3000);
	assert!(rolled.rolls.len() - 1500 > MAX_ADDED_ROLLS);
}

#[test]
fn single_round_reroll_is_not_capped() {
	let dice: Dice = "1500d2r1".parse().unwrap();
	let rolled = FixedRoller(1).roll(&dice, true).unwrap();
	assert_eq!(rolled.rolls.len(), 3000);
	assert_eq!(rolled.discarded().len(), 1500);
	assert_eq!(rolled.total().unwrap(), 1500);

	// Recursing on the same dice still stops at the cap
	let dice: Dice = "1500d2rr1".parse().unwrap();
	let res = ScriptedRoller::new([1]).roll(&dice, true);
	assert!(matches!(res, Err(Error::RunawayExpansion(..))));
}

#[test]
fn count_successes() {
	let dice = Dice::builder().count(5).sides(10).count_successes(Condition::Gte(7)).build();
	let rolled = ScriptedRoller::new([7, 2, 10, 6, 8]).roll(&dice, true).unwrap();
	assert!(rolled.counts_successes());
	assert!(rolled.has_success_annotation());
	assert_eq!(rolled.total().unwrap(), 3);
}

#[test]
fn margin_of_success() {
	let dice = Dice::builder().count(1).sides(20).margin(Condition::Gte(15)).build();
	let rolled = FixedRoller(18).roll(&dice, true).unwrap();
	assert!(rolled.has_success_annotation());
	assert_eq!(rolled.total().unwrap(), 3);

	let rolled = FixedRoller(4).roll(&dice, true).unwrap();
	assert_eq!(rolled.total().unwrap(), -11);
}

#[test]
fn margin_under_a_target() {
	let dice: Dice = "1d20ms<=10".parse().unwrap();
	assert_eq!(dice.modifiers, [Modifier::Margin(Condition::Lte(10))]);

	let rolled = FixedRoller(4).roll(&dice, true).unwrap();
	assert_eq!(rolled.total().unwrap(), 6);

	let rolled = FixedRoller(13).roll(&dice, true).unwrap();
	assert_eq!(rolled.total().unwrap(), -3);

	// Upward targets keep subtracting the target
	let dice: Dice = "1d20ms>=10".parse().unwrap();
	assert_eq!(FixedRoller(4).roll(&dice, true).unwrap().total().unwrap(), -6);
}

#[test]
fn min_and_max_clamp() {
	let dice = Dice::builder().count(3).sides(6).min(3).max(5).build();
	let rolled = ScriptedRoller::new([1, 4, 6]).roll(&dice, true).unwrap();
	assert_eq!(rolled.kept(), vec![3, 4, 5]);
	assert!(rolled.rolls[0].is_changed());
	assert!(!rolled.rolls[1].is_changed());
	assert_eq!(rolled.to_string(), "3d6min3max5[3 (m), 4, 5 (m)]");
}

#[test]
fn modifiers_apply_in_order() {
	// Clamping before keeping sees the clamped values
	let dice = Dice::builder().count(2).sides(6).max(2).keep_high(1).build();
	let rolled = ScriptedRoller::new([6, 5]).roll(&dice, true).unwrap();
	assert_eq!(rolled.total().unwrap(), 2);
}

#[test]
fn unmodified_roll() {
	let dice = Dice::builder().count(4).sides(6).keep_high(3).build();
	let rolled = ScriptedRoller::new([1, 2, 3, 4]).roll(&dice, false).unwrap();
	assert_eq!(rolled.kept(), vec![1, 2, 3, 4]);
}

#[test]
fn dice_display() {
	let dice = Dice::builder()
		.count(4)
		.sides(6)
		.reroll(Condition::Eq(1), true)
		.explode(Some(Condition::Gte(5)), false)
		.keep_high(3)
		.build();
	assert_eq!(dice.to_string(), "4d6rr=1xo>=5kh3");
	assert_eq!(dice.plain(), Dice::new(4, 6));
}

#[test]
fn die_roll_markers() {
	let dice = Dice::new(2, 20);
	let mut rolled = Rolled::from_dice_and_rolls(&dice, [20, 3]);
	rolled.rolls[1].mark_dropped(Modifier::KeepHigh(1));
	assert_eq!(rolled.rolls[0].to_string(), "20");
	assert_eq!(rolled.rolls[1].to_string(), "3 (d)");
}

fn rolls_successfully_and_in_range(dice: &Dice) -> Rolled<'_> {
	let rolled = FastRandRoller::default().roll(dice, true).unwrap();
	assert!(rolled
		.rolls
		.iter()
		.all(|roll| roll.val >= 1 && roll.val <= dice.sides));
	rolled
}

#[test]
fn scripted_roller_cycles() {
	let mut roller = ScriptedRoller::new([2, 5]);
	let dice = Dice::new(5, 6);
	let rolled = roller.roll(&dice, true).unwrap();
	assert_eq!(rolled.kept(), vec![2, 5, 2, 5, 2]);
	assert_eq!(roller.played(), 5);

	let dice = Dice::new(3, 8);
	let rolled = ScriptedRoller::new([]).roll(&dice, true).unwrap();
	assert_eq!(rolled.kept(), vec![8, 8, 8]);
}

#[test]
fn first_attribution_wins() {
	let dice = Dice::new(1, 6);
	let mut rolled = Rolled::from_dice_and_rolls(&dice, [4]);
	rolled.rolls[0].mark_dropped(Modifier::KeepLow(1));
	rolled.rolls[0].mark_dropped(Modifier::DropHigh(1));
	assert_eq!(rolled.rolls[0].dropped_by, Some(Modifier::KeepLow(1)));
	assert_eq!(rolled.total().unwrap(), 0);
}

#[test]
fn dropped_dice_are_not_counted_as_successes() {
	let dice = Dice::builder().count(3).sides(10).keep_high(2).count_successes(Condition::Gte(2)).build();
	let rolled = ScriptedRoller::new([9, 1, 8]).roll(&dice, true).unwrap();
	assert_eq!(rolled.total().unwrap(), 2);
	assert_eq!(rolled.rolls[1].success, None);
}

#[test]
fn conditions() {
	assert_eq!(Condition::from_symbol(">=", 5).unwrap(), Condition::Gte(5));
	assert_eq!(Condition::from_symbol("<", 2).unwrap(), Condition::Lt(2));
	assert!(matches!(Condition::from_symbol("=>", 2), Err(Error::UnknownCondition(sym)) if sym == "=>"));

	assert!(Condition::Lte(6).matches_every_face(6));
	assert!(!Condition::Lte(5).matches_every_face(6));
	assert!(Condition::Gt(0).matches_every_face(20));
	assert_eq!(Condition::Gte(7).to_string(), ">=7");
}

#[test]
fn modifier_counts_of_one_are_implicit() {
	let dice = Dice::builder().count(4).sides(6).keep_high(1).drop_low(2).keep_low(0).build();
	assert_eq!(dice.to_string(), "4d6khdl2kl0");
	assert_eq!(dice.to_string().parse::<Dice>().unwrap(), dice);
}
