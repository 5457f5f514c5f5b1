//! Text-layer density test used to tell text-based PDFs from scans.

use biodata_core::PageLayout;

/// Fraction of the sampled page area covered by text blocks, in `0.0..=1.0`.
///
/// Pages are pooled: a text-heavy cover page followed by scanned pages scores
/// proportionally, not as the average of per-page ratios. No pages, or pages
/// with no area, score 0.
pub fn text_coverage(layouts: &[PageLayout]) -> f32 {
    let page_area: f32 = layouts.iter().map(|l| l.page_area.max(0.0)).sum();
    if page_area <= 0.0 {
        return 0.0;
    }
    let text_area: f32 = layouts
        .iter()
        .map(|l| l.text_area.clamp(0.0, l.page_area.max(0.0)))
        .sum();
    (text_area / page_area).clamp(0.0, 1.0)
}

/// Routing decision. The boundary is inclusive: coverage equal to the
/// threshold counts as text-based.
pub fn is_text_based(coverage: f32, threshold: f32) -> bool {
    coverage >= threshold
}
