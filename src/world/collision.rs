//! Axis-aligned box geometry used for blocked movement.
//!
//! Boxes are half-open: `[min, max)` on both axes, so two boxes that only
//! share an edge do not overlap. Everything here is pure.

use bevy::math::{Rect, Vec2};

/// True when `a` and `b` share a region of positive area.
pub fn overlaps(a: Rect, b: Rect) -> bool {
    if is_degenerate(a) || is_degenerate(b) {
        return false;
    }
    a.min.x < b.max.x && b.min.x < a.max.x && a.min.y < b.max.y && b.min.y < a.max.y
}

/// Clamp `delta` so `moving` does not end up inside any obstacle.
///
/// Each axis is tested on its own: the box displaced only along X, then the
/// box displaced only along Y. A blocked axis is zeroed while the other keeps
/// its component, which lets the mover slide along walls.
pub fn resolve_move(delta: Vec2, moving: Rect, obstacles: &[Rect]) -> Vec2 {
    let shifted_x = translate(moving, Vec2::new(delta.x, 0.0));
    let shifted_y = translate(moving, Vec2::new(0.0, delta.y));

    let blocked_x = delta.x != 0.0 && obstacles.iter().any(|o| overlaps(shifted_x, *o));
    let blocked_y = delta.y != 0.0 && obstacles.iter().any(|o| overlaps(shifted_y, *o));

    Vec2::new(
        if blocked_x { 0.0 } else { delta.x },
        if blocked_y { 0.0 } else { delta.y },
    )
}

pub fn translate(rect: Rect, offset: Vec2) -> Rect {
    Rect {
        min: rect.min + offset,
        max: rect.max + offset,
    }
}

fn is_degenerate(rect: Rect) -> bool {
    rect.max.x <= rect.min.x || rect.max.y <= rect.min.y
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect::new(x, y, x + w, y + h)
    }

    #[test]
    fn test_edge_touching_boxes_do_not_overlap() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        assert!(!overlaps(a, rect(10.0, 0.0, 10.0, 10.0)));
        assert!(!overlaps(a, rect(0.0, 10.0, 10.0, 10.0)));
        assert!(!overlaps(a, rect(10.0, 10.0, 5.0, 5.0)));
    }

    #[test]
    fn test_positive_area_intersection_overlaps() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        assert!(overlaps(a, rect(9.5, 9.5, 4.0, 4.0)));
        assert!(overlaps(a, rect(2.0, 2.0, 2.0, 2.0)));
        assert!(overlaps(rect(2.0, 2.0, 2.0, 2.0), a));
    }

    #[test]
    fn test_degenerate_box_never_overlaps() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        assert!(!overlaps(a, rect(5.0, 5.0, 0.0, 0.0)));
        assert!(!overlaps(rect(5.0, 5.0, 0.0, 3.0), a));
        assert!(!overlaps(a, rect(5.0, 5.0, 3.0, 0.0)));
    }

    #[test]
    fn test_resolve_move_slides_along_wall_to_the_right() {
        let player = rect(0.0, 0.0, 10.0, 10.0);
        let wall = rect(10.0, -50.0, 10.0, 100.0);

        let allowed = resolve_move(Vec2::new(3.0, 4.0), player, &[wall]);
        assert_eq!(allowed, Vec2::new(0.0, 4.0));
    }

    #[test]
    fn test_resolve_move_blocks_only_the_axis_into_the_obstacle() {
        let player = rect(0.0, 0.0, 10.0, 10.0);
        let floor = rect(-50.0, 10.0, 100.0, 10.0);

        let allowed = resolve_move(Vec2::new(-2.0, 1.0), player, &[floor]);
        assert_eq!(allowed, Vec2::new(-2.0, 0.0));
    }

    #[test]
    fn test_resolve_move_free_space_keeps_delta() {
        let player = rect(0.0, 0.0, 10.0, 10.0);
        let far = rect(100.0, 100.0, 10.0, 10.0);

        let delta = Vec2::new(1.5, -2.5);
        assert_eq!(resolve_move(delta, player, &[far]), delta);
        assert_eq!(resolve_move(delta, player, &[]), delta);
    }

    #[test]
    fn test_resolve_move_can_leave_an_obstacle_it_already_touches() {
        let player = rect(0.0, 0.0, 10.0, 10.0);
        let wall = rect(10.0, 0.0, 10.0, 10.0);

        let allowed = resolve_move(Vec2::new(-1.0, 0.0), player, &[wall]);
        assert_eq!(allowed, Vec2::new(-1.0, 0.0));
    }
}
