//! Summing and gain primitives.

/*
Summing Junctions
=================

Whenever two connections meet at a node input, their signals are ADDED. The
audio graph does this for every node with more than one upstream connection,
which is how the dry and fx paths of a parallel recipe recombine.

Clipping Risk
-------------

Two paths that each peak at 1.0 can sum to 2.0:

    Dry:  [ 1.0,  0.5, -0.5, -1.0]
    Fx:   [ 1.0,  0.8,  0.2, -0.5]
    Sum:  [ 2.0,  1.3, -0.3, -1.5]  ← exceeds ±1.0

The parallel recipe keeps the two path gains complementary (dry + fx = 1.0)
and follows the junction with a limiter, so the merged signal stays bounded
even when the randomized fx chain adds level.
*/

/// Add signal B into signal A in-place.
///
/// Can exceed [-1.0, +1.0]. Apply gain before or limiting after.
#[inline]
pub fn sum_in_place(a: &mut [f32], b: &[f32]) {
    debug_assert_eq!(a.len(), b.len());

    for (sa, &sb) in a.iter_mut().zip(b.iter()) {
        *sa += sb;
    }
}

/// Multiply every sample by a constant gain.
#[inline]
pub fn apply_gain(buffer: &mut [f32], gain: f32) {
    if gain == 1.0 {
        return;
    }
    for sample in buffer.iter_mut() {
        *sample *= gain;
    }
}
