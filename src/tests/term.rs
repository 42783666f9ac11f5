use crate::{
	dice::{modifier::Condition, Dice},
	ops::{Associativity, OperatorSpec, OperatorTable},
	term::{tokenize, Paren, Term, TermKind},
	value::Value,
};

#[test]
fn empty_formula() {
	assert!(lex("").is_empty());
	assert!(lex("   ").is_empty());
}

#[test]
fn numbers_and_operators() {
	let terms = lex("2 + 3.5*4");
	assert_eq!(
		kinds(&terms),
		vec![
			TermKind::Number(2.0),
			op("+"),
			TermKind::Number(3.5),
			op("*"),
			TermKind::Number(4.0),
		]
	);
	assert_eq!(offsets(&terms), vec![0, 2, 4, 7, 8]);
}

#[test]
fn longest_operator_wins() {
	let terms = lex("1<=2**3>=4!=5");
	assert_eq!(
		expressions(&terms),
		vec!["1", "<=", "2", "**", "3", ">=", "4", "!=", "5"]
	);
}

#[test]
fn dice_terms() {
	let terms = lex("2d6+1d4[fire] - d20kh");
	assert_eq!(terms[0].kind, TermKind::Dice(Dice::new(2, 6)));
	assert_eq!(terms[2].kind, TermKind::Dice(Dice::new(1, 4)));
	assert_eq!(terms[2].flavor.as_deref(), Some("fire"));
	assert_eq!(
		terms[4].kind,
		TermKind::Dice(Dice::builder().count(1).sides(20).keep_high(1).build())
	);
}

#[test]
fn dice_modifiers_keep_comparisons() {
	let terms = lex("5d10cs>=7 + 1d6x>5");
	assert_eq!(expressions(&terms), vec!["5d10cs>=7", "+", "1d6x>5"]);
	assert_eq!(
		terms[0].kind,
		TermKind::Dice(Dice::builder().count(5).sides(10).count_successes(Condition::Gte(7)).build())
	);
}

#[test]
fn dice_followed_by_comparison() {
	let terms = lex("1d20 >= 15");
	assert_eq!(expressions(&terms), vec!["1d20", ">=", "15"]);
	let terms = lex("1d20>=15");
	assert_eq!(expressions(&terms), vec!["1d20", ">=", "15"]);

	// Keep, drop and clamp modifiers never take a comparison
	let terms = lex("2d20kh>=15");
	assert_eq!(expressions(&terms), vec!["2d20kh", ">=", "15"]);
	assert_eq!(terms[0].kind, TermKind::Dice(Dice::builder().count(2).sides(20).keep_high(1).build()));
	let terms = lex("4d6dl1<10");
	assert_eq!(expressions(&terms), vec!["4d6dl1", "<", "10"]);
	let terms = lex("3d6max5>=12");
	assert_eq!(expressions(&terms), vec!["3d6max5", ">=", "12"]);

	// Face-testing modifiers still do
	let terms = lex("1d20ms<=10");
	assert_eq!(expressions(&terms), vec!["1d20ms<=10"]);
	assert_eq!(
		terms[0].kind,
		TermKind::Dice(Dice::builder().count(1).sides(20).margin(Condition::Lte(10)).build())
	);
	assert_eq!(expressions(&lex("4d6rr<2")), vec!["4d6rr<2"]);
	assert_eq!(expressions(&lex("4d6xo>=5")), vec!["4d6xo>=5"]);
}

#[test]
fn variables() {
	let terms = lex("@abilities.str.mod * level");
	assert_eq!(
		terms[0].kind,
		TermKind::Variable {
			path: "abilities.str.mod".to_owned(),
			prefixed: true
		}
	);
	assert_eq!(
		terms[2].kind,
		TermKind::Variable {
			path: "level".to_owned(),
			prefixed: false
		}
	);
}

#[test]
fn identifiers_that_start_like_dice() {
	let terms = lex("dex + d");
	assert!(matches!(terms[0].kind, TermKind::Variable { .. }));
	assert!(matches!(terms[2].kind, TermKind::Variable { .. }));
}

#[test]
fn function_calls() {
	let terms = lex("max(1, @x)");
	assert_eq!(
		kinds(&terms)[1..],
		[
			TermKind::Paren(Paren::Open),
			TermKind::Number(1.0),
			TermKind::Separator,
			TermKind::Variable {
				path: "x".to_owned(),
				prefixed: true
			},
			TermKind::Paren(Paren::Close),
		]
	);
}

#[test]
fn strings() {
	let terms = lex("\"fire\" + 'cold'");
	assert_eq!(terms[0].kind, TermKind::Str("fire".to_owned()));
	assert_eq!(terms[2].kind, TermKind::Str("cold".to_owned()));
}

#[test]
fn flavor_on_group() {
	let terms = lex("(2 + 3)[bonus]");
	assert_eq!(terms[4].flavor.as_deref(), Some("bonus"));
}

#[test]
fn leading_and_trailing_operators() {
	assert_eq!(expressions(&lex("* 2 + 3 -")), vec!["2", "+", "3"]);
	assert_eq!(expressions(&lex("-2")), vec!["-", "2"]);
	assert!(lex("+ - *").is_empty());
	assert!(lex("*").is_empty());
}

#[test]
fn malformed_formulas() {
	let table = OperatorTable::standard();
	for (formula, offset) in [
		("2 + \"open", 4),
		("[fire]", 0),
		("2 + [fire]", 4),
		("1d6[fire", 3),
		("2 ] 3", 2),
		("2 # 3", 2),
		("1.2.3", 0),
		("@", 0),
		("@a..b", 0),
		("2dogs", 0),
		("0d6", 0),
		("2d0", 0),
		("1d20q", 0),
		("a@b", 0),
	] {
		let err = tokenize(formula, &table).unwrap_err();
		assert_eq!(err.offset, offset, "{formula}");
	}
}

#[test]
fn registered_operators_are_tokenized() {
	let mut table = OperatorTable::standard();
	table
		.register(OperatorSpec::binary("<>", 9, Associativity::Left, |a, b| {
			Ok(Value::Bool(a != b))
		}))
		.unwrap();

	let terms = tokenize("1 <> 2", &table).unwrap();
	assert_eq!(expressions(&terms), vec!["1", "<>", "2"]);
}

#[test]
fn unicode_offsets() {
	let terms = lex("\"héllo\" + 1");
	assert_eq!(offsets(&terms), vec![0, 8, 10]);
}

fn lex(formula: &str) -> Vec<Term> {
	tokenize(formula, &OperatorTable::standard()).unwrap()
}

fn kinds(terms: &[Term]) -> Vec<TermKind> {
	terms.iter().map(|term| term.kind.clone()).collect()
}

fn expressions(terms: &[Term]) -> Vec<&str> {
	terms.iter().map(|term| term.expression.as_str()).collect()
}

fn offsets(terms: &[Term]) -> Vec<usize> {
	terms.iter().map(|term| term.offset).collect()
}

fn op(symbol: &str) -> TermKind {
	TermKind::Operator(symbol.to_owned())
}
