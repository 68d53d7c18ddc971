//! Lexical overlap scoring between token sets.

use crate::tokenizer::TokenSet;

/// Jaccard similarity `|A ∩ B| / |A ∪ B|`, in `[0, 1]`.
///
/// Two empty sets score 0. The computation only uses the sizes of the
/// intersection and union, so `jaccard(a, b) == jaccard(b, a)` exactly.
pub fn jaccard(a: &TokenSet, b: &TokenSet) -> f32 {
    let union = a.union_count(b);
    if union == 0 {
        return 0.0;
    }
    a.intersection_count(b) as f32 / union as f32
}
