use std::{
	env,
	io::{self, Write},
	process::ExitCode,
};

use ariadne::{Color, Label, Report, ReportKind, Source};
use augury::{expr::Describe, Context, Engine, Error, Options, Value};

fn main() -> ExitCode {
	let mut args = env::args().skip(1);
	let mut ctx = Context::new();
	let mut opts = Options::default();
	let mut words = Vec::new();

	while let Some(arg) = args.next() {
		match arg.as_str() {
			"--seed" => match args.next().and_then(|seed| seed.parse().ok()) {
				Some(seed) => opts = opts.seed(seed),
				None => return usage("--seed needs an unsigned integer"),
			},
			"--var" => {
				let Some(def) = args.next() else {
					return usage("--var needs a path=value pair");
				};
				let Some((path, val)) = def.split_once('=') else {
					return usage("--var needs a path=value pair");
				};
				ctx.insert(path, parse_value(val));
			}
			_ => words.push(arg),
		}
	}

	let input = if words.is_empty() {
		match read_line() {
			Ok(line) => line,
			Err(err) => {
				eprintln!("Unable to read formula: {err}");
				return ExitCode::FAILURE;
			}
		}
	} else {
		// Combine all remaining args so the formula can be left unquoted even with spaces
		words.join(" ")
	};

	let engine = Engine::global();
	match engine.evaluate(&input, &ctx, &opts) {
		Ok(result) => {
			println!("Formula: {}", result.formula);
			println!("Rolled: {}", result.describe(Some(20)));
			println!("Total: {}", result.total);
			for step in &result.steps {
				println!("  {step}");
			}
			if let (Some(critical), Some(fumble)) = (result.critical, result.fumble) {
				println!("Critical: {critical}, fumble: {fumble}");
			}
			ExitCode::SUCCESS
		}
		Err(Error::MalformedFormula(err)) => {
			let len = err.fragment.chars().count().max(1);
			let report = Report::build(ReportKind::Error, err.offset..err.offset + len)
				.with_message("Malformed formula")
				.with_label(
					Label::new(err.offset..err.offset + len)
						.with_message(&err.reason)
						.with_color(Color::Red),
				)
				.finish();
			if report.eprint(Source::from(input.as_str())).is_err() {
				eprintln!("{err}");
			}
			ExitCode::FAILURE
		}
		Err(err) => {
			eprintln!("Error: {err}");
			ExitCode::FAILURE
		}
	}
}

/// Prompts for and reads a single formula from stdin.
fn read_line() -> io::Result<String> {
	let mut lines = io::stdin().lines();

	// If there isn't already input available in stdin, display a prompt for it
	if lines.size_hint().1.is_none() {
		print!("Enter formula: ");
		io::stdout().flush()?;
	}

	lines.next().unwrap_or_else(|| Ok(String::new()))
}

/// Interprets a `--var` value as a number, boolean, null or string.
fn parse_value(val: &str) -> Value {
	match val {
		"true" => Value::Bool(true),
		"false" => Value::Bool(false),
		"null" => Value::Null,
		_ => val.parse().map_or_else(|_| Value::from(val), Value::Num),
	}
}

/// Prints usage information along with a problem with the arguments.
fn usage(problem: &str) -> ExitCode {
	eprintln!("{problem}");
	eprintln!("Usage: augury [--seed N] [--var path=value]... <formula>");
	ExitCode::FAILURE
}
