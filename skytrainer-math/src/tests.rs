use crate::{Speed, approach};

#[test]
fn approach_reaches_target_exactly() {
    let target = Speed::from_knots(250.);
    let step = Speed::from_knots(1.5);
    let mut speed = Speed::from_knots(245.);
    for _ in 0..4 {
        speed = approach(speed, target, step);
    }
    assert_eq!(speed, target);
    assert_eq!(approach(speed, target, step), target, "no change once reached");
}

#[test]
fn approach_downwards() {
    assert_eq!(approach(10., 4., 4.), 6.);
    assert_eq!(approach(6., 4., 4.), 4.);
}
