use crate::{
	expr::EvalError,
	ops::{self, Associativity, OperatorSpec, OperatorTable, RegisterError},
	Context, Engine, Options, Value,
};

#[test]
fn standard_symbols() {
	let table = OperatorTable::standard();
	for symbol in ["+", "-", "*", "/", "%", "**", "^", "<", ">", "<=", ">=", "==", "!=", "&&", "||", "??", "?"] {
		assert!(table.infix(symbol).is_some(), "{symbol}");
	}
	for symbol in ["-", "+", "!"] {
		assert!(table.prefix(symbol).is_some(), "{symbol}");
	}
	assert!(table.is_separator(":"));
	assert!(table.lookup(":").is_none());
	assert_eq!(table.lookup("-").map(|op| op.precedence), Some(11));
}

#[test]
fn symbols_sorted_longest_first() {
	let table = OperatorTable::standard();
	let lens = table.symbols().map(str::len).collect::<Vec<_>>();
	assert!(lens.windows(2).all(|pair| pair[0] >= pair[1]));
}

#[test]
fn duplicate_symbols_are_rejected() {
	let mut table = OperatorTable::standard();
	assert_eq!(
		table.register(OperatorSpec::unary("-", 14, Ok)),
		Err(RegisterError::Duplicate("-".to_owned()))
	);
	assert_eq!(
		table.register(OperatorSpec::binary(":", 3, Associativity::Left, |_, b| Ok(b))),
		Err(RegisterError::Duplicate(":".to_owned()))
	);
	assert_eq!(
		table.register(OperatorSpec::ternary("~", "?", 2, |_| Ok(true))),
		Err(RegisterError::Duplicate("?".to_owned()))
	);

	// Infix and prefix forms of the same symbol may coexist
	table.register(OperatorSpec::unary("*", 14, Ok)).unwrap();
}

#[test]
fn invalid_symbols_are_rejected() {
	let mut table = OperatorTable::empty();
	for symbol in ["", "mod", "d", "1+", "a b", "@", ".", "(", "[", ",", "\"", "_"] {
		assert_eq!(
			table.register(OperatorSpec::binary(symbol, 10, Associativity::Left, |_, b| Ok(b))),
			Err(RegisterError::InvalidSymbol(symbol.to_owned())),
			"{symbol}"
		);
	}
	assert_eq!(table.symbols().count(), 0);
}

#[test]
fn custom_operator_evaluates() {
	let mut table = OperatorTable::standard();
	table
		.register(OperatorSpec::binary("//", 12, Associativity::Left, |a, b| {
			let divisor = b.to_number()?;
			if divisor == 0.0 {
				return Err(EvalError::DivisionByZero);
			}
			Ok(Value::Num((a.to_number()? / divisor).floor()))
		}))
		.unwrap();
	let engine = Engine::with_table(table);

	let result = engine.evaluate("7 // 2 + 1", &Context::new(), &Options::default()).unwrap();
	assert_eq!(result.total, Value::Num(4.0));
	assert_eq!(result.steps[0].operator, "//");

	// The standard engine doesn't know it
	assert!(Engine::new().evaluate("7 // 2", &Context::new(), &Options::default()).is_err());
}

#[test]
fn custom_prefix_and_ternary() {
	let mut table = OperatorTable::standard();
	table
		.register(OperatorSpec::unary("~", 14, |a| Ok(Value::Num(a.to_number()?.round()))))
		.unwrap();
	table
		.register(OperatorSpec::ternary("=>", "|", 1, |cond| Ok(cond.truthy())))
		.unwrap();
	let engine = Engine::with_table(table);

	let total = |formula| {
		engine
			.evaluate(formula, &Context::new(), &Options::default())
			.unwrap()
			.total
	};
	assert_eq!(total("~2.6 * 2"), Value::Num(6.0));
	assert_eq!(total("1 > 2 => 10 | 20"), Value::Num(20.0));
}

#[test]
fn right_associative_custom_operator() {
	let mut table = OperatorTable::standard();
	table
		.register(OperatorSpec::binary("<-", 10, Associativity::Right, |a, b| {
			Ok(Value::Num(a.to_number()? - b.to_number()?))
		}))
		.unwrap();
	let engine = Engine::with_table(table);

	let result = engine.evaluate("10 <- 4 <- 1", &Context::new(), &Options::default()).unwrap();
	assert_eq!(result.total, Value::Num(7.0));
}

#[test]
fn short_circuit_only_applies_to_binary() {
	let spec = OperatorSpec::unary("~", 14, Ok).short_circuit(|a| Some(a.clone()));
	assert!(spec.is_prefix());
	assert_eq!(spec.separator(), None);
}

#[test]
fn global_registration() {
	let spec = OperatorSpec::binary("<=>", 9, Associativity::Left, |a, b| {
		let (a, b) = (a.to_number()?, b.to_number()?);
		Ok(Value::Num(if a < b {
			-1.0
		} else if a > b {
			1.0
		} else {
			0.0
		}))
	});
	let before = Engine::global();
	ops::register_operator(spec.clone()).unwrap();
	assert_eq!(ops::register_operator(spec), Err(RegisterError::Duplicate("<=>".to_owned())));

	let result = crate::evaluate("3 <=> 5", &Context::new(), &Options::default()).unwrap();
	assert_eq!(result.total, Value::Num(-1.0));

	// Snapshots taken before registration are unaffected
	assert!(before.table().lookup("<=>").is_none());
}
