//! Sharding algorithms
//!
//! Algorithms are advisory: they name the targets they believe hold the
//! data, and the strategy layer keeps only names that really exist among
//! the available targets. An algorithm that cannot decide returns an empty
//! list, which the strategy treats as "no usable value".
//!
//! Custom algorithms implement one of the traits below and are registered
//! by name in an [`AlgorithmRegistry`] before configuration is loaded.

use crate::error::{ConfigurationError, Result};
use crate::targets;
use crate::value::{Literal, ShardingOperator, ShardingValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Resolves a single `EQUAL` value
pub trait PreciseShardingAlgorithm: fmt::Debug + Send + Sync {
    fn shard(&self, targets: &[String], column: &str, value: &Literal) -> Vec<String>;
}

/// Resolves `IN` and `BETWEEN` values
pub trait RangeShardingAlgorithm: fmt::Debug + Send + Sync {
    fn shard(&self, targets: &[String], value: &ShardingValue) -> Vec<String>;
}

/// Receives every value of a multi-column strategy at once
pub trait ComplexKeysShardingAlgorithm: fmt::Debug + Send + Sync {
    fn shard(&self, targets: &[String], values: &[&ShardingValue]) -> Vec<String>;
}

/// Resolves values supplied through a hint context
pub trait HintShardingAlgorithm: fmt::Debug + Send + Sync {
    fn shard(&self, targets: &[String], values: &[Literal]) -> Vec<String>;
}

/// Picks the target whose trailing index equals `value mod n`.
///
/// `n` is the configured modulus, or the number of available targets when
/// none is configured. `BETWEEN` spans shorter than `n` are enumerated;
/// longer spans hit every target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuloAlgorithm {
    modulus: Option<u64>,
}

impl ModuloAlgorithm {
    pub fn new() -> Self {
        Self { modulus: None }
    }

    pub fn with_modulus(modulus: u64) -> Self {
        Self {
            modulus: Some(modulus),
        }
    }

    fn modulus_for(&self, targets: &[String]) -> u64 {
        self.modulus.unwrap_or(targets.len() as u64)
    }

    fn pick(&self, targets: &[String], value: &Literal) -> Vec<String> {
        let n = self.modulus_for(targets);
        match value.as_i64() {
            Some(v) if n > 0 => select_index(targets, v.rem_euclid(n as i64) as u64),
            _ => Vec::new(),
        }
    }

    fn pick_range(&self, targets: &[String], value: &ShardingValue) -> Vec<String> {
        match value.operator {
            ShardingOperator::Equal | ShardingOperator::In => {
                let picked: Vec<Vec<String>> =
                    value.values.iter().map(|v| self.pick(targets, v)).collect();
                // one undecidable member makes the whole list undecidable
                if picked.iter().any(Vec::is_empty) {
                    return Vec::new();
                }
                targets::normalize(picked.into_iter().flatten())
            }
            ShardingOperator::Between => {
                let Some((lower, upper)) = value.bounds() else {
                    return Vec::new();
                };
                let (Some(lo), Some(hi)) = (lower.as_i64(), upper.as_i64()) else {
                    return Vec::new();
                };
                let n = self.modulus_for(targets);
                if hi < lo || n == 0 {
                    return Vec::new();
                }
                let span = (hi as i128) - (lo as i128) + 1;
                if span >= n as i128 {
                    return targets::normalize(targets.iter().cloned());
                }
                targets::normalize(
                    (lo..=hi).flat_map(|v| select_index(targets, v.rem_euclid(n as i64) as u64)),
                )
            }
        }
    }
}

impl PreciseShardingAlgorithm for ModuloAlgorithm {
    fn shard(&self, targets: &[String], _column: &str, value: &Literal) -> Vec<String> {
        self.pick(targets, value)
    }
}

impl RangeShardingAlgorithm for ModuloAlgorithm {
    fn shard(&self, targets: &[String], value: &ShardingValue) -> Vec<String> {
        self.pick_range(targets, value)
    }
}

impl HintShardingAlgorithm for ModuloAlgorithm {
    fn shard(&self, targets: &[String], values: &[Literal]) -> Vec<String> {
        let picked: Vec<Vec<String>> = values.iter().map(|v| self.pick(targets, v)).collect();
        if picked.is_empty() || picked.iter().any(Vec::is_empty) {
            return Vec::new();
        }
        targets::normalize(picked.into_iter().flatten())
    }
}

/// Multi-column variant: every column constrains the same index, so the
/// answer is the intersection of the per-column picks.
impl ComplexKeysShardingAlgorithm for ModuloAlgorithm {
    fn shard(&self, targets: &[String], values: &[&ShardingValue]) -> Vec<String> {
        let picks: Vec<Vec<String>> = values
            .iter()
            .map(|v| self.pick_range(targets, v))
            .filter(|p| !p.is_empty())
            .collect();
        targets::intersect(&picks)
    }
}

/// CRC32 of the literal's text, modulo `n`; usable with text keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HashModAlgorithm {
    modulus: Option<u64>,
}

impl HashModAlgorithm {
    pub fn new() -> Self {
        Self { modulus: None }
    }

    pub fn with_modulus(modulus: u64) -> Self {
        Self {
            modulus: Some(modulus),
        }
    }

    fn pick(&self, targets: &[String], value: &Literal) -> Vec<String> {
        let n = self.modulus.unwrap_or(targets.len() as u64);
        if n == 0 {
            return Vec::new();
        }
        let checksum = crc32fast::hash(value.to_string().as_bytes()) as u64;
        select_index(targets, checksum % n)
    }
}

impl PreciseShardingAlgorithm for HashModAlgorithm {
    fn shard(&self, targets: &[String], _column: &str, value: &Literal) -> Vec<String> {
        self.pick(targets, value)
    }
}

impl RangeShardingAlgorithm for HashModAlgorithm {
    /// Hashing destroys order, so only `IN` lists can be narrowed
    fn shard(&self, targets: &[String], value: &ShardingValue) -> Vec<String> {
        if value.operator == ShardingOperator::Between {
            return Vec::new();
        }
        let picked: Vec<Vec<String>> = value.values.iter().map(|v| self.pick(targets, v)).collect();
        if picked.iter().any(Vec::is_empty) {
            return Vec::new();
        }
        targets::normalize(picked.into_iter().flatten())
    }
}

impl HintShardingAlgorithm for HashModAlgorithm {
    fn shard(&self, targets: &[String], values: &[Literal]) -> Vec<String> {
        let picked: Vec<Vec<String>> = values.iter().map(|v| self.pick(targets, v)).collect();
        if picked.is_empty() || picked.iter().any(Vec::is_empty) {
            return Vec::new();
        }
        targets::normalize(picked.into_iter().flatten())
    }
}

/// Targets whose trailing index equals `index`
fn select_index(targets: &[String], index: u64) -> Vec<String> {
    targets
        .iter()
        .filter(|name| targets::suffix_index(name) == Some(index))
        .cloned()
        .collect()
}

/// Named algorithms available to configuration
#[derive(Debug, Clone, Default)]
pub struct AlgorithmRegistry {
    precise: HashMap<String, Arc<dyn PreciseShardingAlgorithm>>,
    range: HashMap<String, Arc<dyn RangeShardingAlgorithm>>,
    complex: HashMap<String, Arc<dyn ComplexKeysShardingAlgorithm>>,
    hint: HashMap<String, Arc<dyn HintShardingAlgorithm>>,
}

impl AlgorithmRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `modulo` and `hash_mod`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let modulo = Arc::new(ModuloAlgorithm::new());
        registry.register_precise("modulo", modulo.clone());
        registry.register_range("modulo", modulo.clone());
        registry.register_complex("modulo", modulo.clone());
        registry.register_hint("modulo", modulo);

        let hash_mod = Arc::new(HashModAlgorithm::new());
        registry.register_precise("hash_mod", hash_mod.clone());
        registry.register_range("hash_mod", hash_mod.clone());
        registry.register_hint("hash_mod", hash_mod);
        registry
    }

    pub fn register_precise(&mut self, name: &str, algorithm: Arc<dyn PreciseShardingAlgorithm>) {
        self.precise.insert(name.to_ascii_lowercase(), algorithm);
    }

    pub fn register_range(&mut self, name: &str, algorithm: Arc<dyn RangeShardingAlgorithm>) {
        self.range.insert(name.to_ascii_lowercase(), algorithm);
    }

    pub fn register_complex(&mut self, name: &str, algorithm: Arc<dyn ComplexKeysShardingAlgorithm>) {
        self.complex.insert(name.to_ascii_lowercase(), algorithm);
    }

    pub fn register_hint(&mut self, name: &str, algorithm: Arc<dyn HintShardingAlgorithm>) {
        self.hint.insert(name.to_ascii_lowercase(), algorithm);
    }

    pub fn precise(&self, name: &str) -> Result<Arc<dyn PreciseShardingAlgorithm>> {
        lookup(&self.precise, "precise", name)
    }

    pub fn range(&self, name: &str) -> Result<Arc<dyn RangeShardingAlgorithm>> {
        lookup(&self.range, "range", name)
    }

    pub fn complex(&self, name: &str) -> Result<Arc<dyn ComplexKeysShardingAlgorithm>> {
        lookup(&self.complex, "complex", name)
    }

    pub fn hint(&self, name: &str) -> Result<Arc<dyn HintShardingAlgorithm>> {
        lookup(&self.hint, "hint", name)
    }
}

fn lookup<T: ?Sized>(
    map: &HashMap<String, Arc<T>>,
    kind: &'static str,
    name: &str,
) -> Result<Arc<T>> {
    map.get(&name.to_ascii_lowercase())
        .cloned()
        .ok_or_else(|| ConfigurationError::UnknownAlgorithm {
            kind,
            name: name.to_string(),
        })
}
