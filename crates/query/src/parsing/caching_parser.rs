//! Caching wrapper around the syntactic parser.
//!
//! Parsing is schema-independent, so syntactic ASTs can be reused across
//! invocations; binding always re-runs because it depends on the schema and
//! the argument list. The cache is keyed by trimmed query text.

use super::ast::ParsedQuery;
use super::parser::Parser;
use crate::error::Result;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Default capacity for the parse cache
const DEFAULT_CACHE_CAPACITY: usize = 256;

pub struct CachingParser {
    cache: Mutex<LruCache<String, Arc<ParsedQuery>>>,
}

impl CachingParser {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or_else(|| NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap());
        CachingParser {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn parse(&self, query: &str) -> Result<Arc<ParsedQuery>> {
        let normalized = query.trim().to_string();
        if let Some(parsed) = self.cache.lock().get(&normalized) {
            return Ok(parsed.clone());
        }
        let parsed = Arc::new(Parser::parse(&normalized)?);
        self.cache.lock().put(normalized, parsed.clone());
        Ok(parsed)
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }
}

impl Default for CachingParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_returns_the_same_ast() {
        let parser = CachingParser::with_capacity(4);
        let first = parser.parse("age > 2").unwrap();
        let second = parser.parse("  age > 2  ").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(parser.parse("age >").is_err());
    }
}
