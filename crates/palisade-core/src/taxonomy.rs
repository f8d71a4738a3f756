//! Failure-category taxonomy.
//!
//! Retry, circuit-breaker, and fallback policies decide what to do with a
//! failure based on its *category*: an interned tag in a directed acyclic
//! hierarchy built once at setup. Category tests use "is-a" semantics: a
//! category matches a configured set if any of its ancestors (including
//! itself) is in the set. Ancestor sets are precomputed as bitsets, so
//! classification is a constant-time intersection rather than a hierarchy
//! walk per call.
//!
//! ```rust
//! use palisade_core::taxonomy::Taxonomy;
//!
//! let mut builder = Taxonomy::builder();
//! let io = builder.add("io-error", &[Taxonomy::FAULT]);
//! let conn_reset = builder.add("connection-reset", &[io]);
//! let taxonomy = builder.build();
//!
//! let transient = taxonomy.set(&[io]).unwrap();
//! assert!(taxonomy.matches(conn_reset, &transient)); // connection-reset is-a io-error
//! assert!(!taxonomy.matches(Taxonomy::TIMEOUT, &transient));
//! ```

use crate::error::DefinitionError;

const WORD_BITS: usize = u64::BITS as usize;

/// An interned failure-category tag.
///
/// Categories are only meaningful together with the [`Taxonomy`] that
/// created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Category(pub(crate) u32);

impl Category {
    /// The category's index within its taxonomy.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A set of categories, matched against an observed category's ancestors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySet {
    bits: Box<[u64]>,
}

impl CategorySet {
    /// Returns `true` if no category is in the set.
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|w| *w == 0)
    }
}

/// The closed set of failure categories for one process, with precomputed
/// ancestor masks.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    names: Vec<String>,
    // One bitset per category: the category itself plus all transitive parents.
    ancestors: Vec<Box<[u64]>>,
}

impl Taxonomy {
    /// Root of every engine-visible failure. A set containing `FAULT`
    /// matches all failures except [`Taxonomy::CANCELLED`].
    pub const FAULT: Category = Category(0);
    /// Deadline elapsed before the target produced an outcome.
    pub const TIMEOUT: Category = Category(1);
    /// The circuit breaker rejected the call.
    pub const CIRCUIT_OPEN: Category = Category(2);
    /// The bulkhead refused admission.
    pub const BULKHEAD_FULL: Category = Category(3);
    /// Caller-initiated cancellation. Deliberately a separate root, outside
    /// the `FAULT` hierarchy, so category-driven retry and fallback never
    /// fire for it.
    pub const CANCELLED: Category = Category(4);

    const BUILTIN_COUNT: usize = 5;

    /// Creates a builder pre-seeded with the built-in categories.
    pub fn builder() -> TaxonomyBuilder {
        TaxonomyBuilder::new()
    }

    /// A taxonomy containing only the built-in categories.
    pub fn builtin() -> Self {
        Self::builder().build()
    }

    /// The number of categories in this taxonomy.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns `true` if the taxonomy holds no categories. Never true in
    /// practice: the built-ins are always present.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// The name a category was registered under.
    pub fn name(&self, category: Category) -> Option<&str> {
        self.names.get(category.index()).map(String::as_str)
    }

    /// Builds a [`CategorySet`] from the given categories.
    ///
    /// Fails with [`DefinitionError::UnknownCategory`] if a category was
    /// created by a different taxonomy.
    pub fn set(&self, categories: &[Category]) -> Result<CategorySet, DefinitionError> {
        let words = self.len().div_ceil(WORD_BITS);
        let mut bits = vec![0u64; words].into_boxed_slice();
        for category in categories {
            let index = category.index();
            if index >= self.len() {
                return Err(DefinitionError::UnknownCategory { index });
            }
            bits[index / WORD_BITS] |= 1 << (index % WORD_BITS);
        }
        Ok(CategorySet { bits })
    }

    /// An empty set (matches nothing).
    pub fn empty_set(&self) -> CategorySet {
        let words = self.len().div_ceil(WORD_BITS);
        CategorySet {
            bits: vec![0u64; words].into_boxed_slice(),
        }
    }

    /// Is-a test: does `category` or any of its ancestors appear in `set`?
    pub fn matches(&self, category: Category, set: &CategorySet) -> bool {
        match self.ancestors.get(category.index()) {
            Some(mask) => mask
                .iter()
                .zip(set.bits.iter())
                .any(|(a, b)| a & b != 0),
            None => false,
        }
    }

    /// Direct is-a test between two categories.
    pub fn is_a(&self, category: Category, ancestor: Category) -> bool {
        let index = ancestor.index();
        if index >= self.len() {
            return false;
        }
        match self.ancestors.get(category.index()) {
            Some(mask) => mask[index / WORD_BITS] & (1 << (index % WORD_BITS)) != 0,
            None => false,
        }
    }
}

/// Builder for a [`Taxonomy`].
///
/// Parents must be added before their children, which makes the structure
/// acyclic by construction.
pub struct TaxonomyBuilder {
    names: Vec<String>,
    parents: Vec<Vec<u32>>,
}

impl TaxonomyBuilder {
    fn new() -> Self {
        let mut builder = Self {
            names: Vec::with_capacity(Taxonomy::BUILTIN_COUNT),
            parents: Vec::with_capacity(Taxonomy::BUILTIN_COUNT),
        };
        builder.push("fault", &[]);
        builder.push("timeout", &[Taxonomy::FAULT]);
        builder.push("circuit-open", &[Taxonomy::FAULT]);
        builder.push("bulkhead-full", &[Taxonomy::FAULT]);
        builder.push("cancelled", &[]);
        builder
    }

    fn push(&mut self, name: &str, parents: &[Category]) -> Category {
        let id = self.names.len() as u32;
        self.names.push(name.to_string());
        self.parents.push(parents.iter().map(|p| p.0).collect());
        Category(id)
    }

    /// Registers a new category under the given parents.
    ///
    /// # Panics
    ///
    /// Panics if a parent does not belong to this builder; parents can only
    /// come from earlier `add` calls or the built-in constants, so this
    /// indicates taxonomies being mixed up.
    pub fn add(&mut self, name: &str, parents: &[Category]) -> Category {
        for parent in parents {
            assert!(
                parent.index() < self.names.len(),
                "parent category {:?} is not part of this taxonomy",
                parent
            );
        }
        self.push(name, parents)
    }

    /// Finalizes the taxonomy, precomputing ancestor bitsets.
    pub fn build(self) -> Taxonomy {
        let n = self.names.len();
        let words = n.div_ceil(WORD_BITS);
        let mut ancestors: Vec<Box<[u64]>> = Vec::with_capacity(n);
        for (index, parents) in self.parents.iter().enumerate() {
            let mut mask = vec![0u64; words].into_boxed_slice();
            mask[index / WORD_BITS] |= 1 << (index % WORD_BITS);
            // Parents always precede children, so their masks are complete.
            for parent in parents {
                let parent_mask = &ancestors[*parent as usize];
                for (word, parent_word) in mask.iter_mut().zip(parent_mask.iter()) {
                    *word |= parent_word;
                }
            }
            ancestors.push(mask);
        }
        Taxonomy {
            names: self.names,
            ancestors,
        }
    }
}
