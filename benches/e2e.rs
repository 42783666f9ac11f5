#![feature(test)]

extern crate test;

use test::Bencher;

use augury::{Context, Engine, Options};

#[bench]
fn e2e_basic(b: &mut Bencher) {
	let engine = Engine::new();
	let (ctx, opts) = (Context::new(), Options::default());
	b.iter(|| engine.evaluate("4d8 + 4", &ctx, &opts).unwrap());
}

#[bench]
fn e2e_complex(b: &mut Bencher) {
	let engine = Engine::new();
	let ctx = Context::new().with("target", 15).with("bonus", 3);
	let opts = Options::default();
	b.iter(|| {
		engine
			.evaluate(
				"4d8x + 2d10 * (-3d6 - 6 / 2 % 4) >= @target ? max(1, @bonus) : 0",
				&ctx,
				&opts,
			)
			.unwrap()
	});
}

#[bench]
fn e2e_nested(b: &mut Bencher) {
	let engine = Engine::new();
	let ctx = Context::new()
		.with("abilities.str.mod", 4)
		.with("bab", "@level - 1")
		.with("attack", "1d20 + @abilities.str.mod + @bab")
		.with("level", 7);
	let opts = Options::default();
	b.iter(|| engine.evaluate("@attack[to hit]", &ctx, &opts).unwrap());
}
