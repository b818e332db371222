use imageproc::distance_transform::Norm;
use imageproc::morphology::{close_mut, open_mut};

use super::types::Mask;

/// Morphological cleanup of a binary mask
///
/// Opening (erode then dilate) drops specks smaller than the kernel, then
/// closing (dilate then erode) fills small holes in what survived. The
/// kernel is a square of side `2 * radius + 1`.
#[derive(Debug, Clone, Copy)]
pub struct MaskRefiner {
    radius: u8,
}

impl MaskRefiner {
    pub fn new(radius: u8) -> Self {
        Self { radius }
    }

    pub fn refine(&self, mask: &mut Mask) {
        let _span = tracing::debug_span!("refine").entered();

        if self.radius == 0 {
            return;
        }
        open_mut(mask, Norm::LInf, self.radius);
        close_mut(mask, Norm::LInf, self.radius);
    }
}
