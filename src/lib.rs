#![doc = pretty_readme::docify!("README.md", "https://docs.rs/augury/latest/augury/", "./")]
#![expect(
	clippy::tabs_in_doc_comments,
	reason = "Consistency with source, user-configurability & accessibility"
)]
#![deny(macro_use_extern_crate, meta_variable_misuse, unit_bindings)]
#![warn(
	explicit_outlives_requirements,
	missing_docs,
	missing_debug_implementations,
	unreachable_pub,
	unused_crate_dependencies,
	unused_qualifications,
	clippy::pedantic,
	clippy::absolute_paths,
	clippy::allow_attributes,
	clippy::allow_attributes_without_reason,
	clippy::arithmetic_side_effects,
	clippy::cfg_not_test,
	clippy::clone_on_ref_ptr,
	clippy::cognitive_complexity,
	clippy::dbg_macro,
	clippy::doc_include_without_cfg,
	clippy::empty_enum_variants_with_brackets,
	clippy::empty_structs_with_brackets,
	clippy::exhaustive_enums,
	clippy::exhaustive_structs,
	clippy::exit,
	clippy::expect_used,
	clippy::field_scoped_visibility_modifiers,
	clippy::filetype_is_file,
	clippy::fn_to_numeric_cast_any,
	clippy::get_unwrap,
	clippy::if_then_some_else_none,
	clippy::infinite_loop,
	clippy::lossy_float_literal,
	clippy::map_err_ignore,
	clippy::map_with_unused_argument_over_ranges,
	clippy::missing_const_for_fn,
	clippy::missing_docs_in_private_items,
	clippy::multiple_inherent_impl,
	clippy::mutex_atomic,
	clippy::needless_raw_strings,
	clippy::non_zero_suggestions,
	clippy::panic_in_result_fn,
	clippy::pathbuf_init_then_push,
	clippy::pointer_format,
	clippy::precedence_bits,
	clippy::print_stderr,
	clippy::print_stdout,
	clippy::pub_without_shorthand,
	clippy::rc_buffer,
	clippy::rc_mutex,
	clippy::redundant_test_prefix,
	clippy::redundant_type_annotations,
	clippy::ref_patterns,
	clippy::renamed_function_params,
	clippy::rest_pat_in_fully_bound_structs,
	clippy::return_and_then,
	clippy::same_name_method,
	clippy::self_named_module_files,
	clippy::semicolon_inside_block,
	clippy::str_to_string,
	clippy::string_lit_chars_any,
	clippy::suspicious_xor_used_as_pow,
	clippy::tests_outside_test_module,
	clippy::try_err,
	clippy::undocumented_unsafe_blocks,
	clippy::unnecessary_safety_comment,
	clippy::unnecessary_safety_doc,
	clippy::unnecessary_self_imports,
	clippy::unneeded_field_pattern,
	clippy::unused_result_ok,
	clippy::unwrap_in_result,
	clippy::unwrap_used,
	clippy::verbose_file_reads
)]

pub mod context;
pub mod currency;
pub mod dice;
pub mod engine;
pub mod expr;
pub mod ops;
pub mod outcome;
pub mod parse;
pub mod progression;
pub mod term;
pub mod value;

pub use context::Context;
pub use dice::Dice;
pub use engine::Engine;
pub use ops::{register_operator, OperatorSpec, RegisterError};
pub use outcome::{Options, RollResult};
pub use progression::{compute_progression, Track};
pub use value::Value;

/// Error that can occur while evaluating a formula
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// The formula couldn't be split into terms.
	#[error(transparent)]
	MalformedFormula(#[from] term::MalformedFormula),

	/// An operator couldn't be registered.
	#[error(transparent)]
	Register(#[from] RegisterError),

	/// A `@` reference isn't in the context.
	#[error(transparent)]
	UnresolvedVariable(#[from] context::UnresolvedVariable),

	/// Dice couldn't be rolled, most likely because they would expand without bound.
	#[error(transparent)]
	Dice(#[from] dice::Error),

	/// The terms couldn't be evaluated.
	#[error("evaluation error: {0}")]
	Evaluation(#[from] expr::EvalError),
}

/// Evaluates a formula against a context using the process-wide operator table.
///
/// # Errors
/// See [`Engine::evaluate()`].
///
/// # Examples
/// ```
/// use augury::{evaluate, Context, Options, Value};
///
/// let result = evaluate("2 + 3 * 4", &Context::new(), &Options::default())?;
/// assert_eq!(result.total, Value::Num(14.0));
///
/// let result = evaluate("1d20 + @mod", &Context::new().with("mod", 5), &Options::default().seed(7))?;
/// let again = evaluate("1d20 + @mod", &Context::new().with("mod", 5), &Options::default().seed(7))?;
/// assert_eq!(result, again);
/// # Ok::<(), augury::Error>(())
/// ```
pub fn evaluate(formula: &str, ctx: &Context, opts: &Options) -> Result<RollResult, Error> {
	Engine::global().evaluate(formula, ctx, opts)
}

#[cfg(test)]
mod tests;

#[cfg(feature = "build-binary")]
use ariadne as _;
