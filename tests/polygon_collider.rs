use posectl::geometry::fit_polygon;
use posectl::{Point, PolygonCollider, Rect, Size, are_intersecting};

fn poly(pts: &[(f64, f64)]) -> Vec<Point> {
    pts.iter().copied().map(Point::from).collect()
}

#[test]
fn overlapping_corners() {
    let a = poly(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
    let b = poly(&[(5.0, 5.0), (15.0, 5.0), (15.0, 15.0), (5.0, 15.0)]);
    assert!(are_intersecting(&a, &b));
}

#[test]
fn disjoint_squares() {
    let a = poly(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
    let b = poly(&[(20.0, 20.0), (30.0, 20.0), (30.0, 30.0), (20.0, 30.0)]);
    assert!(!are_intersecting(&a, &b));
}

#[test]
fn symmetric_and_repeatable() {
    let shapes = [
        poly(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]),
        poly(&[(5.0, 5.0), (15.0, 5.0), (15.0, 15.0), (5.0, 15.0)]),
        poly(&[(20.0, 20.0), (30.0, 20.0), (25.0, 28.0)]),
        poly(&[(0.0, 20.0), (40.0, 20.0)]),
        poly(&[(3.0, 3.0)]),
    ];
    for a in &shapes {
        for b in &shapes {
            let ab = are_intersecting(a, b);
            assert_eq!(ab, are_intersecting(b, a));
            assert_eq!(ab, are_intersecting(a, b));
        }
    }
    assert_eq!(shapes[0].len(), 4);
}

#[test]
fn balloon_hits_building() {
    // template shapes drawn on their own canvases, then placed on screen
    let balloon_tpl = poly(&[(50.0, 0.0), (100.0, 50.0), (50.0, 100.0), (0.0, 50.0)]);
    let building_tpl = poly(&[(0.0, 0.0), (10.0, 0.0), (10.0, 40.0), (0.0, 40.0)]);

    let building = fit_polygon(&building_tpl, Size::new(10.0, 40.0), Rect::new(200.0, 100.0, 50.0, 200.0));
    let clear = fit_polygon(&balloon_tpl, Size::new(100.0, 100.0), Rect::new(100.0, 100.0, 40.0, 40.0));
    let hit = fit_polygon(&balloon_tpl, Size::new(100.0, 100.0), Rect::new(180.0, 120.0, 40.0, 40.0));

    let collider = PolygonCollider::new();
    assert!(!collider.are_intersecting(&clear, &building));
    assert!(collider.are_intersecting(&hit, &building));
}
