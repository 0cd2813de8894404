//! Label assignment and build context.

use std::collections::BTreeMap;

use tp_core::Sentinels;

use crate::traits::BlockKind;

/// Hands out sequential labels per block kind: `SS1`, `SS2`, `L1`, ...
///
/// Explicit labels that happen to follow the same pattern are observed so
/// generated labels never collide with them.
#[derive(Debug, Clone, Default)]
pub struct LabelFactory {
    counters: BTreeMap<BlockKind, u32>,
}

impl LabelFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next free label for `kind`.
    pub fn next(&mut self, kind: BlockKind) -> String {
        let n = self.counters.entry(kind).or_insert(0);
        *n += 1;
        format!("{}{}", kind.prefix(), n)
    }

    /// Register an externally chosen label.
    pub fn observe(&mut self, kind: BlockKind, label: &str) {
        let Some(rest) = label.strip_prefix(kind.prefix()) else {
            return;
        };
        if let Ok(n) = rest.parse::<u32>() {
            let counter = self.counters.entry(kind).or_insert(0);
            *counter = (*counter).max(n);
        }
    }
}

/// Everything block construction needs besides its own parameters.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    pub labels: LabelFactory,
    pub sentinels: Sentinels,
}

impl BuildContext {
    pub fn new(sentinels: Sentinels) -> Self {
        Self {
            labels: LabelFactory::new(),
            sentinels,
        }
    }

    /// Use the explicit label if given, otherwise generate one.
    pub fn label(&mut self, kind: BlockKind, explicit: Option<String>) -> String {
        match explicit {
            Some(label) => {
                self.labels.observe(kind, &label);
                label
            }
            None => self.labels.next(kind),
        }
    }
}
