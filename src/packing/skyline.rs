// src/packing/skyline.rs
//! Skyline state for one base: an ordered, contiguous partition of the
//! usable X-range into segments, each recording the lowest Y at which a new
//! item may be placed with its left edge there. Segment Y values are
//! absolute post-commit coordinates; placements never bake margins into
//! their own geometry.

use crate::geom::{le, EPSILON_MM};
use log::trace;

/// One horizontal span of the skyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkylineSegment {
    pub x: f64,
    pub width: f64,
    /// Lowest Y available for a new item whose left edge sits at `x`.
    pub y: f64,
}

impl SkylineSegment {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

/// A candidate position returned by the lowest-placement search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub x: f64,
    pub y: f64,
}

/// The upper envelope of everything placed on a base so far.
#[derive(Debug, Clone)]
pub struct Skyline {
    segments: Vec<SkylineSegment>,
    /// Left boundary of the usable range (the side margin).
    left: f64,
    /// Right boundary of the usable range (`width - side margin`).
    right: f64,
}

impl Skyline {
    /// Fresh skyline for an empty base: a single segment covering
    /// `[side_margin, width - side_margin]` at `y = side_margin`.
    pub fn new(base_width_mm: f64, side_margin_mm: f64) -> Self {
        let left = side_margin_mm;
        let right = base_width_mm - side_margin_mm;
        Self {
            segments: vec![SkylineSegment { x: left, width: right - left, y: side_margin_mm }],
            left,
            right,
        }
    }

    pub fn segments(&self) -> &[SkylineSegment] {
        &self.segments
    }

    /// Width of the usable span.
    pub fn usable_width(&self) -> f64 {
        self.right - self.left
    }

    /// Find the lowest feasible position for a `width x height` item,
    /// breaking Y ties toward smaller X. `None` when nothing fits within
    /// `max_length_mm` (bottom side margin included).
    pub fn find_lowest(
        &self,
        width: f64,
        height: f64,
        max_length_mm: f64,
        side_margin_mm: f64,
    ) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;

        for start in 0..self.segments.len() {
            let x = self.segments[start].x;
            // Segments are ordered; once the item no longer fits against the
            // right boundary, no later start can either.
            if !le(x + width, self.right) {
                break;
            }

            let mut y = self.segments[start].y;
            let mut covered = 0.0;
            for seg in &self.segments[start..] {
                y = y.max(seg.y);
                covered += seg.width;
                if le(width, covered) {
                    break;
                }
            }
            if !le(width, covered) {
                continue;
            }

            if !le(y + height + side_margin_mm, max_length_mm) {
                continue;
            }

            let better = match best {
                None => true,
                Some(b) => y < b.y - EPSILON_MM || ((y - b.y).abs() <= EPSILON_MM && x < b.x),
            };
            if better {
                best = Some(Candidate { x, y });
            }
        }

        best
    }

    /// Raise the skyline over a committed item. The covered interval spans
    /// the item plus the trailing inter-item gap (clipped at the right
    /// boundary), and its new Y is the absolute next-placement level:
    /// `y + height + inter_item_margin`.
    pub fn commit(&mut self, x: f64, item_width: f64, new_y: f64, inter_item_margin_mm: f64) {
        let x_end = (x + item_width + inter_item_margin_mm).min(self.right);

        let mut rebuilt: Vec<SkylineSegment> = Vec::with_capacity(self.segments.len() + 2);
        let mut raised_pushed = false;
        let raised = SkylineSegment { x, width: x_end - x, y: new_y };

        for seg in &self.segments {
            if seg.right() <= x + EPSILON_MM {
                rebuilt.push(*seg);
                continue;
            }
            if seg.x >= x_end - EPSILON_MM {
                if !raised_pushed {
                    rebuilt.push(raised);
                    raised_pushed = true;
                }
                rebuilt.push(*seg);
                continue;
            }
            // Overlapping segment: keep the uncovered slivers on either side.
            if seg.x < x - EPSILON_MM {
                rebuilt.push(SkylineSegment { x: seg.x, width: x - seg.x, y: seg.y });
            }
            if !raised_pushed {
                rebuilt.push(raised);
                raised_pushed = true;
            }
            if seg.right() > x_end + EPSILON_MM {
                rebuilt.push(SkylineSegment {
                    x: x_end,
                    width: seg.right() - x_end,
                    y: seg.y,
                });
            }
        }
        if !raised_pushed {
            rebuilt.push(raised);
        }

        self.segments = merge_equal_neighbours(rebuilt);
        trace!("skyline now has {} segment(s)", self.segments.len());
        debug_assert!(self.is_contiguous());
    }

    /// Highest committed Y across the profile, for diagnostics.
    pub fn max_y(&self) -> f64 {
        self.segments.iter().fold(self.left, |acc, s| acc.max(s.y))
    }

    fn is_contiguous(&self) -> bool {
        let mut cursor = self.left;
        for seg in &self.segments {
            if (seg.x - cursor).abs() > 1e-3 {
                return false;
            }
            cursor = seg.right();
        }
        (cursor - self.right).abs() < 1e-3
    }
}

fn merge_equal_neighbours(segments: Vec<SkylineSegment>) -> Vec<SkylineSegment> {
    let mut merged: Vec<SkylineSegment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if seg.width <= EPSILON_MM {
            continue;
        }
        match merged.last_mut() {
            Some(last) if (last.y - seg.y).abs() <= EPSILON_MM => {
                last.width = seg.right() - last.x;
            }
            _ => merged.push(seg),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: f64 = 600.0;
    const SIDE: f64 = 20.0;
    const INTER: f64 = 10.0;
    const MAX_LEN: f64 = 2500.0;

    fn find(sky: &Skyline, w: f64, h: f64) -> Option<Candidate> {
        sky.find_lowest(w, h, MAX_LEN, SIDE)
    }

    #[test]
    fn fresh_skyline_is_one_segment_at_the_margin() {
        let sky = Skyline::new(WIDTH, SIDE);
        assert_eq!(sky.segments().len(), 1);
        let seg = sky.segments()[0];
        assert_eq!(seg.x, 20.0);
        assert_eq!(seg.width, 560.0);
        assert_eq!(seg.y, 20.0);
    }

    #[test]
    fn first_item_lands_in_the_corner() {
        let sky = Skyline::new(WIDTH, SIDE);
        let c = find(&sky, 100.0, 70.0).unwrap();
        assert_eq!((c.x, c.y), (20.0, 20.0));
    }

    #[test]
    fn commit_splits_and_reserves_the_cutting_gap() {
        let mut sky = Skyline::new(WIDTH, SIDE);
        sky.commit(20.0, 100.0, 20.0 + 70.0 + INTER, INTER);

        // [20, 130) raised, [130, 580) untouched.
        assert_eq!(sky.segments().len(), 2);
        assert_eq!(sky.segments()[0].y, 100.0);
        assert!((sky.segments()[0].width - 110.0).abs() < EPSILON_MM);
        assert!((sky.segments()[1].x - 130.0).abs() < EPSILON_MM);
        assert_eq!(sky.segments()[1].y, 20.0);

        // The next item starts one inter-item margin past the first.
        let c = find(&sky, 100.0, 70.0).unwrap();
        assert_eq!((c.x, c.y), (130.0, 20.0));
    }

    #[test]
    fn equal_neighbours_merge() {
        let mut sky = Skyline::new(WIDTH, SIDE);
        sky.commit(20.0, 100.0, 100.0, INTER);
        sky.commit(130.0, 100.0, 100.0, INTER);
        // Two committed runs at the same Y collapse into one segment.
        assert_eq!(sky.segments().len(), 2);
        assert!((sky.segments()[0].width - 220.0).abs() < EPSILON_MM);
    }

    #[test]
    fn lowest_position_prefers_the_valley() {
        let mut sky = Skyline::new(WIDTH, SIDE);
        // A tall column on the left, a low valley on the right.
        sky.commit(20.0, 300.0, 220.0, INTER);
        let c = find(&sky, 100.0, 50.0).unwrap();
        assert_eq!((c.x, c.y), (330.0, 20.0));
    }

    #[test]
    fn run_spanning_multiple_segments_uses_their_max_y() {
        let mut sky = Skyline::new(WIDTH, SIDE);
        sky.commit(20.0, 200.0, 120.0, INTER); // [20, 230) at y=120
        // 400 mm wide item cannot sit in the 350 mm remainder; the run from
        // x=20 covers both segments and must clear the taller one.
        let c = find(&sky, 400.0, 50.0).unwrap();
        assert_eq!((c.x, c.y), (20.0, 120.0));
    }

    #[test]
    fn full_width_item_fits_as_sole_occupant() {
        let sky = Skyline::new(WIDTH, SIDE);
        let c = find(&sky, 560.0, 100.0).unwrap();
        assert_eq!((c.x, c.y), (20.0, 20.0));
    }

    #[test]
    fn full_width_commit_clips_the_gap_at_the_boundary() {
        let mut sky = Skyline::new(WIDTH, SIDE);
        sky.commit(20.0, 560.0, 130.0, INTER);
        assert_eq!(sky.segments().len(), 1);
        assert_eq!(sky.segments()[0].y, 130.0);
        assert!((sky.segments()[0].right() - 580.0).abs() < EPSILON_MM);

        let c = find(&sky, 560.0, 100.0).unwrap();
        assert_eq!((c.x, c.y), (20.0, 130.0));
    }

    #[test]
    fn too_wide_for_the_machine_finds_nothing() {
        let sky = Skyline::new(WIDTH, SIDE);
        assert!(find(&sky, 560.1, 100.0).is_none());
    }

    #[test]
    fn length_cap_rejects_low_positions() {
        let sky = Skyline::new(WIDTH, SIDE);
        // 2460 mm tall fills the base exactly; one micrometer more cannot.
        assert!(find(&sky, 100.0, 2460.0).is_some());
        assert!(find(&sky, 100.0, 2460.001).is_none());
    }

    #[test]
    fn ties_break_toward_smaller_x() {
        let mut sky = Skyline::new(WIDTH, SIDE);
        // Two separate valleys at the same height.
        sky.commit(130.0, 100.0, 220.0, INTER);
        let c = find(&sky, 100.0, 50.0).unwrap();
        assert_eq!((c.x, c.y), (20.0, 20.0));
    }
}
