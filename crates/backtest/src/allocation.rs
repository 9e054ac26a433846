//! Per-side position sizing.

/// How capital is split across the names selected on one side for one date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sizing {
    /// Every name gets `1 / count`; the side return is the mean.
    EqualWeight,
    /// Every name gets `min(cap, 1 / count)`; undeployed capital earns nothing.
    MaxAlloc(f64),
}

impl Sizing {
    #[must_use]
    pub fn from_max_alloc(max_alloc: Option<f64>) -> Self {
        max_alloc.map_or(Sizing::EqualWeight, Sizing::MaxAlloc)
    }

    /// Weight of each name when `count` names are selected.
    #[must_use]
    pub fn weight(&self, count: usize) -> f64 {
        if count == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let equal = 1.0 / count as f64;
        match self {
            Sizing::EqualWeight => equal,
            Sizing::MaxAlloc(cap) => cap.min(equal),
        }
    }

    /// Total weight deployed on the side.
    #[must_use]
    pub fn deployed(&self, count: usize) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let count_f = count as f64;
        self.weight(count) * count_f
    }

    /// Realized side return; `None` when nothing was selected.
    #[must_use]
    pub fn side_return(&self, returns: &[f64]) -> Option<f64> {
        if returns.is_empty() {
            return None;
        }
        match self {
            Sizing::EqualWeight => {
                #[allow(clippy::cast_precision_loss)]
                let count = returns.len() as f64;
                Some(returns.iter().sum::<f64>() / count)
            }
            Sizing::MaxAlloc(_) => {
                let weight = self.weight(returns.len());
                Some(returns.iter().map(|r| weight * r).sum())
            }
        }
    }
}
