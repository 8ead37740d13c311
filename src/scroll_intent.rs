use crate::{Alignment, ItemRange};

/// A pending "bring index X to alignment A" request.
///
/// The request is stored and re-resolved on every pass until the target's
/// position stops being an estimate, so a single call settles correctly even
/// though the first pass can only aim at an estimated position. The engine
/// cancels it when the host's own scroll state moves independently past a
/// threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollIntent {
    pub index: usize,
    pub alignment: Alignment,
}

impl ScrollIntent {
    pub fn new(index: usize, alignment: Alignment) -> Self {
        Self { index, alignment }
    }
}

impl Alignment {
    /// `Nearest` resolves to `End` when the index is past the midpoint of the
    /// current window, otherwise `Start`. Other alignments are fixed.
    pub(crate) fn resolve(self, index: usize, window: ItemRange) -> Alignment {
        match self {
            Alignment::Nearest => {
                if window.is_empty() {
                    Alignment::Start
                } else {
                    let midpoint = (window.first + window.last) as f64 / 2.0;
                    if index as f64 > midpoint {
                        Alignment::End
                    } else {
                        Alignment::Start
                    }
                }
            }
            fixed => fixed,
        }
    }

    /// Fraction of the item/viewport extents used to line the two up.
    /// Only meaningful for resolved alignments.
    pub(crate) fn fraction(self) -> f64 {
        match self {
            Alignment::Start => 0.0,
            Alignment::Center => 0.5,
            Alignment::End | Alignment::Nearest => 1.0,
        }
    }
}

/// Computes the scroll offset that satisfies
/// `scroll + viewport * fraction == position + extent * fraction`,
/// clamped to the scrollable range.
pub(crate) fn target_offset(
    position: f64,
    extent: f64,
    alignment: Alignment,
    viewport_main: f64,
    scroll_size: f64,
) -> f64 {
    let fraction = alignment.fraction();
    let target = position + extent * fraction - viewport_main * fraction;
    let max = (scroll_size - viewport_main).max(0.0);
    target.clamp(0.0, max)
}
