use proptest::prelude::*;
use tasc_model::{CellValue, Collection, CollectionParts, Column, StepIndex, TascError};

#[test]
fn construction_rejects_length_mismatch() {
    let result = Collection::new(
        vec![0.0, 1.0, 2.0],
        vec![
            Column::from_values("A", vec![1.0, 2.0, 3.0]),
            Column::from_values("B", vec![1.0, 2.0]),
        ],
    );
    match result {
        Err(TascError::Shape {
            column,
            expected,
            actual,
        }) => {
            assert_eq!(column, "B");
            assert_eq!(expected, 3);
            assert_eq!(actual, 2);
        }
        other => panic!("expected shape error, got {other:?}"),
    }
}

#[test]
fn construction_rejects_duplicate_names() {
    let result = Collection::new(
        vec![0.0],
        vec![
            Column::from_values("A", vec![1.0]),
            Column::from_values("A", vec![2.0]),
        ],
    );
    assert!(matches!(result, Err(TascError::DuplicateColumn { .. })));
}

#[test]
fn set_column_checks_shape_and_keeps_order() {
    let mut collection = Collection::new(
        vec![0.0, 1.0],
        vec![
            Column::from_values("A", vec![1.0, 2.0]),
            Column::from_values("B", vec![3.0, 4.0]),
        ],
    )
    .unwrap();

    collection
        .set_column(Column::from_values("A", vec![9.0, 9.0]))
        .unwrap();
    let names: Vec<_> = collection.column_names().collect();
    assert_eq!(names, vec!["A", "B"]);

    let err = collection
        .set_column(Column::from_values("C", vec![1.0]))
        .unwrap_err();
    assert!(matches!(err, TascError::Shape { .. }));
    assert!(!collection.contains_column("C"));
}

#[test]
fn add_and_remove_columns() {
    let mut collection =
        Collection::new(vec![0.0], vec![Column::from_values("A", vec![1.0])]).unwrap();
    assert!(matches!(
        collection.add_column(Column::from_values("A", vec![2.0])),
        Err(TascError::DuplicateColumn { .. })
    ));
    let removed = collection.remove_column("A").unwrap();
    assert_eq!(removed.name(), "A");
    assert!(matches!(
        collection.remove_column("A"),
        Err(TascError::ColumnNotFound { .. })
    ));
}

#[test]
fn row_access() {
    let collection = Collection::new(
        vec![5.0, 6.0],
        vec![
            Column::numeric("A", vec![Some(1.0), None]),
            Column::text("T", vec![Some("a".into()), Some("b".into())]),
        ],
    )
    .unwrap();
    let row = collection.row(1).unwrap();
    assert_eq!(row.step, 6.0);
    assert_eq!(row.values["A"], CellValue::Null);
    assert_eq!(row.values["T"], CellValue::Text("b".into()));
    assert!(matches!(
        collection.row(2),
        Err(TascError::IndexOutOfRange { position: 2, len: 2 })
    ));
}

#[test]
fn slicing_keeps_domain_and_metadata() {
    let parts = CollectionParts::new(StepIndex::sequential(4))
        .with_column(Column::from_values("A", vec![1.0, 2.0, 3.0, 4.0]))
        .with_metadata("title", "test");
    let collection = Collection::from_parts(parts).unwrap();

    let tail = collection.tail(2).unwrap();
    assert_eq!(tail.index().as_slice(), &[2.0, 3.0]);
    assert_eq!(tail.metadata()["title"], "test");
    assert_eq!(tail.domain(), "core");
    assert!(collection.slice(3..5).is_err());
}

#[test]
fn describe_skips_text_columns() {
    let collection = Collection::new(
        vec![0.0, 1.0],
        vec![
            Column::from_values("A", vec![1.0, 3.0]),
            Column::text("T", vec![None, None]),
        ],
    )
    .unwrap();
    let summary = collection.describe();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary["A"].mean, Some(2.0));
    assert_eq!(summary["A"].max, Some(3.0));
}

proptest! {
    #[test]
    fn retained_rows_match_source(
        values in prop::collection::vec(-1e6f64..1e6, 1..40),
        pick in prop::collection::vec(any::<prop::sample::Index>(), 0..20),
    ) {
        let collection = Collection::new(
            StepIndex::sequential(values.len()),
            vec![Column::from_values("A", values.clone())],
        ).unwrap();
        let positions: Vec<usize> = pick.iter().map(|i| i.index(values.len())).collect();
        let taken = collection.take_rows(&positions).unwrap();
        prop_assert_eq!(taken.len(), positions.len());
        for (row, &position) in positions.iter().enumerate() {
            prop_assert_eq!(
                taken.column("A").unwrap().get(row).unwrap(),
                CellValue::Number(values[position])
            );
        }
        prop_assert_eq!(collection.column("A").unwrap().len(), values.len());
    }
}
