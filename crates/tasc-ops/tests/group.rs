use std::ops::Bound;

use tasc_model::{Collection, CollectionParts, Column, Kwargs, TascError};
use tasc_ops::{Args, Engine};

fn five_rows() -> Collection {
    let parts = CollectionParts::new(vec![0.0, 1.0, 2.0, 3.0, 4.0])
        .with_column(Column::from_values("Force", vec![1.0, 2.0, 3.0, 4.0, 5.0]))
        .with_column(Column::from_values("Disp", vec![0.1, 0.2, 0.3, 0.4, 0.5]))
        .with_metadata("specimen", "S1");
    Collection::from_parts(parts).unwrap()
}

#[test]
fn split_by_integers_partitions_rows() {
    let engine = Engine::builtin().unwrap();
    let group = engine
        .chain(five_rows())
        .split_by_integers(&[1, 1, 2, 2, 3])
        .unwrap();
    let sizes: Vec<usize> = group.iter().map(Collection::len).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
    assert_eq!(group.get(1).unwrap().index().as_slice(), &[2.0, 3.0]);
    assert!(group.iter().all(|c| c.metadata()["specimen"] == "S1"));
}

#[test]
fn split_with_wrong_marker_count_fails() {
    let engine = Engine::builtin().unwrap();
    let err = engine
        .chain(five_rows())
        .split_by_integers(&[1, 2])
        .err()
        .unwrap();
    assert!(matches!(
        err,
        TascError::InvalidArgument { ref parameter, .. } if parameter == "markers"
    ));
}

#[test]
fn map_applies_to_every_element() {
    let engine = Engine::builtin().unwrap();
    let group = engine
        .chain(five_rows())
        .split_by_integers(&[1, 1, 2, 2, 3])
        .unwrap()
        .map("add", &Args::new().arg("Force").arg(10).kwarg("result_column", "F10"))
        .unwrap();
    let firsts: Vec<Option<f64>> = group
        .iter()
        .map(|c| c.column("F10").unwrap().as_numbers().unwrap()[0])
        .collect();
    assert_eq!(firsts, vec![Some(11.0), Some(13.0), Some(15.0)]);
}

#[test]
fn filter_slice_and_nth() {
    let engine = Engine::builtin().unwrap();
    let group = engine
        .chain(five_rows())
        .split_by_integers(&[1, 1, 2, 2, 3])
        .unwrap();

    let sliced = group.slice(1..).unwrap();
    assert_eq!(sliced.len(), 2);
    assert!(group.slice(2..5).is_err());
    assert_eq!(group.slice(..=1).unwrap().len(), 2);
    assert!(matches!(
        group.slice(0..=usize::MAX),
        Err(TascError::IndexOutOfRange { position, len: 3 }) if position == usize::MAX
    ));
    assert!(
        group
            .slice((Bound::Excluded(usize::MAX), Bound::Unbounded))
            .is_err()
    );

    let long = group.filter(|c| c.len() > 1);
    assert_eq!(long.len(), 2);

    let last = long.nth(1).unwrap().end();
    assert_eq!(last.index().as_slice(), &[2.0, 3.0]);
}

#[test]
fn elements_keep_their_domain() {
    let engine = Engine::builtin().unwrap();
    let group = engine
        .chain(five_rows())
        .as_domain("load_displacement", Kwargs::new())
        .unwrap()
        .split_by_integers(&[1, 1, 1, 2, 2])
        .unwrap();
    assert!(group.iter().all(|c| c.domain() == "load_displacement"));

    let stiffness = group
        .nth(0)
        .unwrap()
        .value(
            "calculate_stiffness",
            &Args::new().kwarg("range_start", 0.0).kwarg("range_end", 1.0),
        )
        .unwrap();
    assert!((stiffness.as_f64().unwrap() - 10.0).abs() < 1e-9);
}

#[test]
fn concat_rejoins_the_rows() {
    let engine = Engine::builtin().unwrap();
    let joined = engine
        .chain(five_rows())
        .split_by_integers(&[1, 2, 1, 2, 3])
        .unwrap()
        .concat()
        .unwrap()
        .end();
    assert_eq!(joined.index().as_slice(), &[0.0, 2.0, 1.0, 3.0, 4.0]);
    assert_eq!(
        joined.column("Force").unwrap().as_numbers().unwrap(),
        &[Some(1.0), Some(3.0), Some(2.0), Some(4.0), Some(5.0)]
    );
    assert_eq!(joined.metadata()["specimen"], "S1");
}

#[test]
fn group_as_domain_converts_every_element() {
    let engine = Engine::builtin().unwrap();
    let group = engine
        .chain(five_rows())
        .split_by_integers(&[1, 1, 2, 2, 2])
        .unwrap()
        .as_domain("load_displacement", &Kwargs::new())
        .unwrap()
        .map("cycle_count", &Args::new())
        .unwrap();
    assert!(group.iter().all(|c| c.get_column("Force_cycle").is_some()));
}
