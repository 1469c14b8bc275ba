//! Rhai expression engine for the Expression node
//!
//! Expressions are plain Rhai over two numeric variables, `x` and `y`, and
//! must evaluate to a number (integers are widened to floats).
//!
//! ## Functions
//!
//! Besides Rhai's built-in arithmetic, scripts can call:
//!
//! - `abs`, `sqrt`, `pow`, `exp`, `ln`, `log10`, `log2`
//! - `sin`, `cos`, `tan`, `asin`, `acos`, `atan`, `atan2`
//! - `floor`, `ceil`, `round`, `trunc`, `fract`
//! - `clamp(v, lo, hi)`, `min(a, b)`, `max(a, b)`, `sign(v)`
//! - `lerp(a, b, t)`, `map_range(v, in_lo, in_hi, out_lo, out_hi)`
//! - `pi()`, `e()`
//!
//! ## Example
//!
//! ```rhai
//! // Distance from the origin
//! sqrt(x * x + y * y)
//! ```

mod engine;

pub use engine::ScriptEngine;

use crate::error::{PipeflowError, Result};
use rhai::{Engine, AST};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A compiled expression that can be evaluated repeatedly
#[derive(Clone)]
pub struct CompiledExpression {
    ast: Arc<AST>,
    source: String,
}

impl CompiledExpression {
    /// Get the source code of this expression
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn ast(&self) -> &AST {
        &self.ast
    }
}

impl std::fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("source", &self.source)
            .finish()
    }
}

/// Default number of compiled expressions kept per engine
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Cache of compiled expressions, keyed by source
///
/// Holds at most `capacity` entries; inserting into a full cache evicts an
/// arbitrary entry.
pub struct ExpressionCache {
    cache: HashMap<String, CompiledExpression>,
    capacity: usize,
}

impl ExpressionCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Get a cached expression or compile and cache it
    pub fn get_or_compile(&mut self, engine: &Engine, source: &str) -> Result<CompiledExpression> {
        if let Some(compiled) = self.cache.get(source) {
            return Ok(compiled.clone());
        }

        let ast = engine
            .compile_expression(source)
            .map_err(|e| PipeflowError::Script(format!("Compilation error: {}", e)))?;

        let compiled = CompiledExpression {
            ast: Arc::new(ast),
            source: source.to_string(),
        };
        if self.cache.len() >= self.capacity {
            if let Some(evicted) = self.cache.keys().next().cloned() {
                self.cache.remove(&evicted);
            }
        }
        self.cache.insert(source.to_string(), compiled.clone());
        Ok(compiled)
    }

    /// Drop a single expression from the cache
    pub fn remove(&mut self, source: &str) {
        self.cache.remove(source);
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe expression cache
pub type SharedExpressionCache = Arc<RwLock<ExpressionCache>>;

/// Ready-made expressions offered by the Expression node
pub mod builtins {
    pub const SUM: &str = "x + y";
    pub const DIFFERENCE: &str = "x - y";
    pub const HYPOTENUSE: &str = "sqrt(x * x + y * y)";
    pub const AVERAGE: &str = "(x + y) / 2.0";
    pub const POWER: &str = "pow(x, y)";

    /// All built-in expressions with display names
    pub fn all() -> Vec<(&'static str, &'static str)> {
        vec![
            ("Sum", SUM),
            ("Difference", DIFFERENCE),
            ("Hypotenuse", HYPOTENUSE),
            ("Average", AVERAGE),
            ("Power", POWER),
        ]
    }
}
