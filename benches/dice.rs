#![feature(test)]

extern crate test;

use test::Bencher;

use augury::{
	dice::{
		roller::{FastRand, Roller, Scripted},
		Dice, Rolled,
	},
	expr::Describe,
};

/// Rolls `literal` over and over with a fixed seed.
fn bench_literal(b: &mut Bencher, literal: &str) {
	let dice: Dice = literal.parse().unwrap();
	let mut rng = FastRand::with_seed(0xa5);
	b.iter(|| rng.roll(&dice, true).unwrap().total().unwrap());
}

#[bench]
fn ability_score_4d6kh3(b: &mut Bencher) {
	bench_literal(b, "4d6kh3");
}

#[bench]
fn advantage_2d20kh(b: &mut Bencher) {
	bench_literal(b, "2d20kh");
}

#[bench]
fn fireball_8d6(b: &mut Bencher) {
	bench_literal(b, "8d6");
}

#[bench]
fn exploding_10d6x(b: &mut Bencher) {
	bench_literal(b, "10d6x");
}

#[bench]
fn dice_pool_10d10cs(b: &mut Bencher) {
	bench_literal(b, "10d10cs>=7");
}

#[bench]
fn every_modifier(b: &mut Bencher) {
	bench_literal(b, "100d42min3max40rr<6x>37kh20kl10xo>29ms50");
}

#[bench]
fn capped_explosion(b: &mut Bencher) {
	let dice: Dice = "1d6x".parse().unwrap();
	b.iter(|| Scripted::new([6]).roll(&dice, true).is_err());
}

#[bench]
fn tooltip_for_large_pool(b: &mut Bencher) {
	let dice: Dice = "100d20kh10".parse().unwrap();
	let rolled = Scripted::new(1..=20).roll(&dice, true).unwrap();
	b.iter(|| (rolled.describe(None), rolled.describe(Some(10))));
}

#[bench]
fn tooltip_from_known_faces(b: &mut Bencher) {
	let dice = Dice::new(6, 8);
	let rolled = Rolled::from_dice_and_rolls(&dice, [8, 1, 4, 4, 7, 2]);
	b.iter(|| rolled.to_string());
}
