pub mod deal;

pub use deal::DealEvaluator;

/// Outcome of a deal check. `reason` is empty when `is_deal` is false.
#[derive(Debug, Clone, PartialEq)]
pub struct DealVerdict {
    pub is_deal: bool,
    pub reason: String,
}

impl DealVerdict {
    pub fn deal(reason: String) -> Self {
        Self { is_deal: true, reason }
    }

    pub fn no_deal() -> Self {
        Self { is_deal: false, reason: String::new() }
    }
}
