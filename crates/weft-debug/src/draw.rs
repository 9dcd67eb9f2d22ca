//! Debug-visualization collection.
//!
//! Solvers report dots, lines and vectors under a category and a hash.
//! An element with the same category and hash replaces the previous one,
//! so per-substep reports do not pile up.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use weft_math::Vec3;

/// RGB color in [0, 1].
pub type Color = [f32; 3];

/// A drawable debug primitive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DebugElement {
    Dot { position: Vec3, color: Color },
    Line { from: Vec3, to: Vec3, color: Color },
    Vector { origin: Vec3, direction: Vec3, color: Color },
}

/// Receiver of debug primitives.
pub trait DebugCollector {
    fn add(&mut self, category: &str, hash: u64, element: DebugElement);

    /// Removes every element of `category`.
    fn clear_category(&mut self, category: &str);

    fn add_dot(&mut self, category: &str, hash: u64, position: Vec3, color: Color) {
        self.add(category, hash, DebugElement::Dot { position, color });
    }

    fn add_line(&mut self, category: &str, hash: u64, from: Vec3, to: Vec3, color: Color) {
        self.add(category, hash, DebugElement::Line { from, to, color });
    }

    fn add_vector(&mut self, category: &str, hash: u64, origin: Vec3, direction: Vec3, color: Color) {
        self.add(
            category,
            hash,
            DebugElement::Vector {
                origin,
                direction,
                color,
            },
        );
    }
}

/// In-memory collector.
#[derive(Debug, Clone, Default)]
pub struct DebugRecorder {
    elements: BTreeMap<(String, u64), DebugElement>,
}

impl DebugRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements of one category in hash order.
    pub fn category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a DebugElement> + 'a {
        self.elements
            .iter()
            .filter(move |((c, _), _)| c == category)
            .map(|(_, e)| e)
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }
}

impl DebugCollector for DebugRecorder {
    fn add(&mut self, category: &str, hash: u64, element: DebugElement) {
        self.elements.insert((category.to_owned(), hash), element);
    }

    fn clear_category(&mut self, category: &str) {
        self.elements.retain(|(c, _), _| c != category);
    }
}

/// Combines integer keys into an element hash (FNV-1a).
pub fn debug_hash(parts: &[u32]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    parts
        .iter()
        .flat_map(|p| p.to_le_bytes())
        .fold(OFFSET, |h, b| (h ^ b as u64).wrapping_mul(PRIME))
}
