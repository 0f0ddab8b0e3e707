//! Line reconstruction from positioned tokens.
//!
//! Tokens are grouped into lines by vertical proximity and ordered left to
//! right, so that a row of a visually columnar table comes back as one
//! coherent line even when the source emitted its cells out of reading order.

use crate::document::TextToken;
use crate::geometry::Rect;
use crate::utils::safe_float_cmp;

/// Horizontal gap, as a fraction of line height, above which a space is inserted.
const SPACE_GAP_RATIO: f32 = 0.15;
/// Vertical centre distance, as a fraction of token height, tolerated within a line.
const LINE_CENTER_TOLERANCE: f32 = 0.5;

/// A reconstructed line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    /// Line text in reading order
    pub text: String,
    /// Union of the token boxes
    pub bbox: Rect,
}

impl TextLine {
    /// Create a line.
    pub fn new(text: impl Into<String>, bbox: Rect) -> Self {
        Self {
            text: text.into(),
            bbox,
        }
    }
}

/// Group tokens into lines, top to bottom.
pub fn reconstruct_lines(tokens: &[TextToken]) -> Vec<TextLine> {
    let mut sorted: Vec<&TextToken> = tokens
        .iter()
        .filter(|t| !t.text.trim().is_empty())
        .collect();
    if sorted.is_empty() {
        return Vec::new();
    }

    sorted.sort_by(|a, b| {
        safe_float_cmp(a.bbox.center_y(), b.bbox.center_y()).then_with(|| safe_float_cmp(a.bbox.x, b.bbox.x))
    });

    let mut lines = Vec::new();
    let mut current: Vec<&TextToken> = vec![sorted[0]];

    for &token in sorted.iter().skip(1) {
        let anchor = current[0].bbox;
        let tolerance = LINE_CENTER_TOLERANCE * anchor.height.max(token.bbox.height);
        if (token.bbox.center_y() - anchor.center_y()).abs() <= tolerance {
            current.push(token);
        } else {
            lines.push(assemble_line(&mut current));
            current = vec![token];
        }
    }
    lines.push(assemble_line(&mut current));

    lines
}

fn assemble_line(tokens: &mut [&TextToken]) -> TextLine {
    tokens.sort_by(|a, b| safe_float_cmp(a.bbox.x, b.bbox.x));

    let mut text = String::new();
    let mut bbox = tokens[0].bbox;
    let mut prev: Option<Rect> = None;

    for token in tokens.iter() {
        if let Some(prev_box) = prev {
            let height = prev_box.height.max(token.bbox.height);
            if prev_box.horizontal_gap(&token.bbox) > SPACE_GAP_RATIO * height {
                text.push(' ');
            }
        }
        text.push_str(token.text.trim());
        bbox = bbox.union(&token.bbox);
        prev = Some(token.bbox);
    }

    TextLine { text, bbox }
}
