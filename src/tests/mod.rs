mod context;
mod dice;
mod ops;
mod properties;
mod term;

#[cfg(not(feature = "serde"))]
use serde_json as _;
