use std::collections::BTreeMap;

use crate::{
	context::{resolve, Entry, Missing, Unresolved, UnresolvedVariable},
	ops::OperatorTable,
	term::{tokenize, Term, TermKind},
	Context, Value,
};

#[test]
fn insert_and_lookup() {
	let mut ctx = Context::new();
	assert!(ctx.is_empty());

	ctx.insert("abilities.str.mod", 3);
	ctx.insert("abilities.dex.mod", -1);
	ctx.insert("name", "Seelah");
	ctx.insert("inspired", true);

	assert_eq!(ctx.get("abilities.str.mod"), Some(&Value::Num(3.0)));
	assert_eq!(ctx.get("abilities.dex.mod"), Some(&Value::Num(-1.0)));
	assert_eq!(ctx.get("name"), Some(&Value::Str("Seelah".to_owned())));
	assert_eq!(ctx.get("inspired"), Some(&Value::Bool(true)));
	assert!(!ctx.is_empty());
}

#[test]
fn lookup_errors() {
	let ctx = Context::new().with("abilities.str.mod", 3).with("level", 2);

	assert_eq!(
		ctx.lookup("abilities.wis.mod"),
		Err(UnresolvedVariable {
			path: "abilities.wis.mod".to_owned(),
			reason: Unresolved::MissingKey("wis".to_owned()),
		})
	);
	assert_eq!(ctx.lookup("abilities").map_err(|err| err.reason), Err(Unresolved::NotAValue));
	assert_eq!(
		ctx.lookup("level.bonus").map_err(|err| err.reason),
		Err(Unresolved::MissingKey("bonus".to_owned()))
	);
	assert_eq!(
		ctx.lookup("abilities.wis.mod").unwrap_err().to_string(),
		"unresolved variable @abilities.wis.mod: no \"wis\" entry"
	);
}

#[test]
fn overwriting_a_scalar_with_a_table() {
	let mut ctx = Context::new().with("hp", 10);
	ctx.insert("hp.max", 12);
	assert_eq!(ctx.get("hp.max"), Some(&Value::Num(12.0)));
	assert_eq!(ctx.get("hp"), None);
}

#[test]
fn from_iterator_and_map() {
	let ctx = [("a.b", 1), ("c", 2)].into_iter().collect::<Context>();
	assert_eq!(ctx.get("a.b"), Some(&Value::Num(1.0)));

	let mut root = BTreeMap::new();
	root.insert("c".to_owned(), Entry::Scalar(Value::Num(2.0)));
	root.insert(
		"a".to_owned(),
		Entry::Table(BTreeMap::from([("b".to_owned(), Entry::Scalar(Value::Num(1.0)))])),
	);
	assert_eq!(Context::from(root), ctx);
}

#[test]
fn resolves_prefixed_variables() {
	let ctx = Context::new().with("str", 4).with("flag", false).with("nothing", Value::Null);
	let terms = resolved("@str + @flag + @nothing", &ctx, Missing::Error).unwrap();

	assert_eq!(terms[0].kind, TermKind::Value(Value::Num(4.0)));
	assert_eq!(terms[2].kind, TermKind::Value(Value::Bool(false)));
	assert_eq!(terms[4].kind, TermKind::Value(Value::Null));

	// The original expression and offset are kept
	assert_eq!(terms[2].expression, "@flag");
	assert_eq!(terms[2].offset, 7);
}

#[test]
fn strings_become_nested() {
	let ctx = Context::new().with("bab", "@level - 1").with("name", "Seelah");
	let terms = resolved("@bab + @name", &ctx, Missing::Error).unwrap();
	assert_eq!(terms[0].kind, TermKind::Nested("@level - 1".to_owned()));
	assert_eq!(terms[2].kind, TermKind::Nested("Seelah".to_owned()));
}

#[test]
fn missing_prefixed_variables() {
	let ctx = Context::new();
	let err = resolved("1 + @gone", &ctx, Missing::Error).unwrap_err();
	assert_eq!(err.path, "gone");

	let terms = resolved("1 + @gone", &ctx, Missing::Zero).unwrap();
	assert_eq!(terms[2].kind, TermKind::Value(Value::Num(0.0)));
}

#[test]
fn bare_identifiers() {
	let ctx = Context::new().with("level", 3).with("max", 99);
	let terms = resolved("level + max(1, 2) + pi + nope", &ctx, Missing::Error).unwrap();

	assert_eq!(terms[0].kind, TermKind::Value(Value::Num(3.0)));
	assert!(matches!(&terms[2].kind, TermKind::Variable { path, .. } if path == "max"));
	assert!(matches!(&terms[9].kind, TermKind::Variable { path, .. } if path == "pi"));
	assert!(matches!(&terms[11].kind, TermKind::Variable { path, .. } if path == "nope"));
}

#[test]
fn other_terms_are_untouched() {
	let ctx = Context::new().with("x", 1);
	let terms = tokenize("2d6 + \"x\" * (3)", &OperatorTable::standard()).unwrap();
	assert_eq!(resolve(terms.clone(), &ctx, Missing::Error).unwrap(), terms);
}

fn resolved(formula: &str, ctx: &Context, missing: Missing) -> Result<Vec<Term>, UnresolvedVariable> {
	let terms = tokenize(formula, &OperatorTable::standard()).unwrap();
	resolve(terms, ctx, missing)
}
