//! Integration tests for the annotation session: chained searches land in
//! click order, undo and redo keep clicks and history together, and
//! cancellation never blocks later searches.

#![allow(clippy::unwrap_used)]

use brightpath_core::{Coord, CoreError, Frame, Path, Session, SessionConfig, TracerKind};

fn black(size: u32) -> Frame {
    Frame::from_fn(size, size, |_, _| 0.0).unwrap()
}

fn session(size: u32, tracer: TracerKind) -> Session {
    let mut session = Session::new(SessionConfig { tracer });
    session.open(black(size));
    session
}

fn click_all(session: &mut Session, points: &[Coord]) {
    for &point in points {
        session.click(point).unwrap();
    }
}

fn assert_contiguous(path: &Path) {
    for pair in path.coords().windows(2) {
        assert_eq!(pair[0].manhattan(pair[1]), 1, "gap between {} and {}", pair[0], pair[1]);
    }
}

#[test]
fn chained_searches_land_in_click_order() {
    let points = [
        Coord::new(0, 0),
        Coord::new(12, 3),
        Coord::new(4, 15),
        Coord::new(15, 15),
        Coord::new(8, 1),
    ];
    let mut session = session(16, TracerKind::default());
    click_all(&mut session, &points);
    session.wait();
    assert!(!session.is_searching());

    let line = session.traced_line();
    assert_contiguous(&line);
    assert_eq!(line.first(), Some(&points[0]));
    assert_eq!(line.last(), Some(&points[4]));

    // On a black frame every segment is a shortest grid path.
    let expected_len: u32 = points.windows(2).map(|w| w[0].manhattan(w[1])).sum::<u32>() + 1;
    assert_eq!(line.len(), expected_len as usize);

    // Clicks appear in order along the line.
    let mut from = 0;
    for point in &points {
        let at = line.coords()[from..].iter().position(|c| c == point).unwrap();
        from += at;
    }
}

#[test]
fn many_quick_clicks_keep_order() {
    let points: Vec<Coord> = (0..20).map(|i| Coord::new((i * 7) % 30, (i * 11) % 30)).collect();
    let mut session = session(30, TracerKind::StraightLine);
    click_all(&mut session, &points);
    session.wait();

    let line = session.traced_line();
    assert_eq!(line.first(), Some(&points[0]));
    assert_eq!(line.last(), points.last());
    for pair in line.coords().windows(2) {
        assert!(pair[0].x.abs_diff(pair[1].x) <= 1 && pair[0].y.abs_diff(pair[1].y) <= 1);
    }
}

#[test]
fn undo_and_redo_move_clicks_with_history() {
    let (a, b, c) = (Coord::new(0, 0), Coord::new(5, 0), Coord::new(5, 5));
    let mut session = session(8, TracerKind::default());
    click_all(&mut session, &[a, b, c]);
    session.wait();

    let undone = session.undo().unwrap().unwrap();
    assert_eq!(undone.point, Some(b));
    assert_eq!(session.clicks(), vec![a, b]);
    assert_eq!(session.traced_line().last(), Some(&b));
    assert!(session.can_redo());

    let redone = session.redo().unwrap().unwrap();
    assert_eq!(redone.point, Some(c));
    assert_eq!(session.clicks(), vec![a, b, c]);
    assert_eq!(session.traced_line().last(), Some(&c));
    assert!(!session.can_redo());
    assert!(matches!(session.redo(), Err(CoreError::Underflow)));
}

#[test]
fn undo_during_a_long_search_keeps_the_segment() {
    let (a, b) = (Coord::new(0, 0), Coord::new(399, 399));
    let mut session = session(400, TracerKind::default());
    click_all(&mut session, &[a, b]);

    // Refused while the search runs; a completed search round-trips.
    if session.undo().is_ok() {
        session.redo().unwrap();
    }
    session.wait();

    assert_eq!(session.clicks(), vec![a, b]);
    let line = session.traced_line();
    assert_eq!(line.first(), Some(&a));
    assert_eq!(line.last(), Some(&b));
    assert_eq!(line.len(), 799);
    assert!(session.can_undo());
    assert!(!session.can_redo());
}

#[test]
fn click_after_undo_replaces_the_branch() {
    let (a, b, c, d) = (
        Coord::new(0, 0),
        Coord::new(6, 0),
        Coord::new(6, 9),
        Coord::new(0, 5),
    );
    let mut session = session(10, TracerKind::default());
    click_all(&mut session, &[a, b, c]);
    session.wait();

    session.undo().unwrap();
    session.click(d).unwrap();
    session.wait();

    assert_eq!(session.clicks(), vec![a, b, d]);
    assert!(!session.can_redo());
    let line = session.traced_line();
    assert_eq!(line.last(), Some(&d));
    assert!(!line.contains(c));
}

#[test]
fn undoing_the_first_segment_returns_to_the_untouched_frame() {
    let mut session = session(8, TracerKind::default());
    click_all(&mut session, &[Coord::new(0, 0), Coord::new(3, 3)]);
    session.wait();

    // The first segment and its starting click are undone together.
    session.undo().unwrap();
    assert!(session.clicks().is_empty());
    assert!(session.traced_line().is_empty());
    assert!(!session.can_undo());

    // Redo lands on the completed segment, not on the lone first click.
    session.redo().unwrap();
    assert_eq!(session.clicks().len(), 2);
    assert_eq!(session.traced_line().len(), 7);
}

#[test]
fn remembering_clear_is_undone_once() {
    let (a, b) = (Coord::new(1, 1), Coord::new(6, 2));
    let mut session = session(8, TracerKind::default());
    click_all(&mut session, &[a, b]);
    session.wait();

    session.clear(true);
    assert!(session.clicks().is_empty());
    assert!(session.traced_line().is_empty());
    assert!(session.can_undo());

    session.undo().unwrap();
    assert_eq!(session.clicks(), vec![a, b]);
    assert_eq!(session.traced_line().last(), Some(&b));
}

#[test]
fn forgetting_clear_cannot_be_undone() {
    let mut session = session(8, TracerKind::default());
    click_all(&mut session, &[Coord::new(1, 1), Coord::new(6, 2)]);
    session.wait();

    session.clear(false);
    assert!(matches!(session.undo(), Err(CoreError::Underflow)));
    assert!(session.can_redo());
}

#[test]
fn cancel_does_not_block_later_searches() {
    let (a, b, c) = (Coord::new(0, 0), Coord::new(199, 199), Coord::new(199, 0));
    let mut session = session(200, TracerKind::default());
    click_all(&mut session, &[a, b]);
    session.cancel();
    session.click(c).unwrap();
    session.wait();

    assert!(!session.is_searching());
    let line = session.traced_line();
    assert_eq!(line.last(), Some(&c));
    assert_contiguous(&line);
}

#[test]
fn reopening_discards_pending_results() {
    let mut session = session(120, TracerKind::default());
    click_all(&mut session, &[Coord::new(0, 0), Coord::new(119, 119)]);
    session.open(black(120));
    session.wait();

    assert!(session.clicks().is_empty());
    assert!(session.traced_line().is_empty());
    assert!(!session.can_redo());
}
