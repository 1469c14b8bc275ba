//! Rhai engine configured for numeric expressions over `x` and `y`.

use crate::config::ScriptingConfig;
use crate::error::{PipeflowError, Result};
use crate::scripting::{CompiledExpression, ExpressionCache, SharedExpressionCache};
use rhai::{Dynamic, Engine, Scope};
use std::sync::{Arc, RwLock};

/// The expression engine, shared by every Expression node from one factory
pub struct ScriptEngine {
    engine: Engine,
    cache: SharedExpressionCache,
}

impl ScriptEngine {
    pub fn new(config: &ScriptingConfig) -> Self {
        let mut engine = Engine::new();
        Self::configure_engine(&mut engine, config);

        Self {
            engine,
            cache: Arc::new(RwLock::new(ExpressionCache::with_capacity(
                config.max_cached_expressions,
            ))),
        }
    }

    /// Configure the Rhai engine with built-in functions and safety limits
    fn configure_engine(engine: &mut Engine, config: &ScriptingConfig) {
        engine.set_max_expr_depths(config.max_expr_depth, config.max_expr_depth);
        engine.set_max_call_levels(config.max_call_levels);
        engine.set_max_operations(config.max_operations);
        engine.set_max_string_size(config.max_string_size);
        engine.set_max_array_size(1_000);
        engine.set_max_map_size(1_000);

        engine.register_fn("abs", |x: f64| x.abs());
        engine.register_fn("sqrt", |x: f64| x.sqrt());
        engine.register_fn("pow", |x: f64, y: f64| x.powf(y));
        engine.register_fn("exp", |x: f64| x.exp());
        engine.register_fn("ln", |x: f64| x.ln());
        engine.register_fn("log10", |x: f64| x.log10());
        engine.register_fn("log2", |x: f64| x.log2());
        engine.register_fn("sin", |x: f64| x.sin());
        engine.register_fn("cos", |x: f64| x.cos());
        engine.register_fn("tan", |x: f64| x.tan());
        engine.register_fn("asin", |x: f64| x.asin());
        engine.register_fn("acos", |x: f64| x.acos());
        engine.register_fn("atan", |x: f64| x.atan());
        engine.register_fn("atan2", |y: f64, x: f64| y.atan2(x));

        // Rounding
        engine.register_fn("floor", |x: f64| x.floor());
        engine.register_fn("ceil", |x: f64| x.ceil());
        engine.register_fn("round", |x: f64| x.round());
        engine.register_fn("trunc", |x: f64| x.trunc());
        engine.register_fn("fract", |x: f64| x.fract());

        engine.register_fn("clamp", |x: f64, min: f64, max: f64| x.max(min).min(max));
        engine.register_fn("min", |a: f64, b: f64| a.min(b));
        engine.register_fn("max", |a: f64, b: f64| a.max(b));
        engine.register_fn("sign", |x: f64| {
            if x > 0.0 {
                1.0
            } else if x < 0.0 {
                -1.0
            } else {
                0.0
            }
        });

        engine.register_fn("pi", || std::f64::consts::PI);
        engine.register_fn("e", || std::f64::consts::E);

        engine.register_fn("lerp", |a: f64, b: f64, t: f64| a + (b - a) * t);
        engine.register_fn(
            "map_range",
            |x: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64| {
                (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
            },
        );
    }

    /// Compile an expression and cache it
    pub fn compile(&self, source: &str) -> Result<CompiledExpression> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| PipeflowError::Script(format!("Failed to acquire cache lock: {}", e)))?;

        cache.get_or_compile(&self.engine, source)
    }

    /// Evaluate a compiled expression with `x` and `y` bound
    pub fn evaluate(&self, expression: &CompiledExpression, x: f64, y: f64) -> Result<f64> {
        let mut scope = Scope::new();
        scope.push("x", x);
        scope.push("y", y);

        let value = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, expression.ast())
            .map_err(|e| PipeflowError::Script(format!("Execution error: {}", e)))?;

        if let Ok(f) = value.as_float() {
            Ok(f)
        } else if let Ok(i) = value.as_int() {
            Ok(i as f64)
        } else {
            Err(PipeflowError::Script(format!(
                "Expression must return a number, got {}",
                value.type_name()
            )))
        }
    }

    /// Compile and evaluate in one step
    pub fn eval(&self, source: &str, x: f64, y: f64) -> Result<f64> {
        let expression = self.compile(source)?;
        self.evaluate(&expression, x, y)
    }

    /// Check that an expression compiles, without caching it
    pub fn validate(&self, source: &str) -> Result<()> {
        self.engine
            .compile_expression(source)
            .map(|_| ())
            .map_err(|e| PipeflowError::Script(format!("Validation error: {}", e)))
    }

    /// Number of cached expressions
    pub fn cached(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Drop one expression from the cache, e.g. after a node's source changed
    pub fn forget(&self, source: &str) -> Result<()> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| PipeflowError::Script(format!("Failed to acquire cache lock: {}", e)))?;
        cache.remove(source);
        Ok(())
    }

    pub fn clear_cache(&self) -> Result<()> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| PipeflowError::Script(format!("Failed to acquire cache lock: {}", e)))?;
        cache.clear();
        Ok(())
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new(&ScriptingConfig::default())
    }
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine")
            .field("cache_size", &self.cached())
            .finish()
    }
}
