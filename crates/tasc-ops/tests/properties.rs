use proptest::prelude::*;
use tasc_model::{Collection, Column};
use serde_json::json;
use tasc_ops::{Args, Engine, IN_PLACE, OutputKind};

fn collection_of(values: &[f64]) -> Collection {
    let steps: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
    Collection::new(steps, vec![Column::from_values("A", values.to_vec())]).unwrap()
}

/// Valid arguments for every core operation that returns a collection, run
/// against a collection with numeric columns `A`, `B` and `C`.
fn collection_calls(first: f64) -> Vec<(&'static str, Args)> {
    vec![
        ("add", Args::new().arg("A").arg("B")),
        ("subtract", Args::new().arg("A").arg(2.5)),
        ("multiply", Args::new().arg("A").arg("C")),
        ("divide", Args::new().arg("A").arg("B")),
        ("sin", Args::new().arg("A")),
        ("cos", Args::new().arg("A").kwarg("degrees", true)),
        ("tan", Args::new().arg("B")),
        ("exp", Args::new().arg("C")),
        ("log", Args::new().arg("A")),
        ("sqrt", Args::new().arg("A")),
        ("pow", Args::new().arg("A").arg(2.0)),
        ("abs_values", Args::new().arg("C")),
        ("round_values", Args::new().arg("A").arg(1)),
        ("normalize", Args::new().arg("A")),
        ("moving_average", Args::new().arg("A")),
        ("detect_outliers", Args::new().arg("A")),
        ("select", Args::new().kwarg("columns", json!(["A", "C"]))),
        ("select_step", Args::new().arg(json!([0.0, 2.0]))),
        ("filter_by_value", Args::new().arg("A").arg(first)),
        ("search_by_value", Args::new().arg("A").arg(">=").arg(first)),
        ("search_by_range", Args::new().arg("B").arg(0.0).arg(1e3)),
        ("search_by_step_range", Args::new().arg(0.0).arg(2.0)),
        ("search_missing_values", Args::new()),
        ("search_top_n", Args::new().arg("A").arg(2)),
        ("switch_by_step", Args::new().arg("A").arg("B").arg(1.0)),
        ("blend_by_step", Args::new().arg("A").arg("B").arg(0.0).arg(2.0)),
        ("conditional_select", Args::new().arg("A").arg("B").arg("C")),
        ("sum_columns", Args::new()),
        ("average_columns", Args::new().kwarg("columns", json!(["A", "B"]))),
        ("interpolate", Args::new().kwarg("point_count", 5)),
    ]
}

#[test]
fn every_core_collection_operation_is_covered() {
    let engine = Engine::builtin().unwrap();
    let mut registered: Vec<&str> = engine
        .operations()
        .iter()
        .filter(|op| op.domain() == "core" && op.output() == OutputKind::Collection)
        .map(|op| op.name())
        .collect();
    registered.sort_unstable();
    let mut covered: Vec<&str> = collection_calls(0.0).into_iter().map(|(name, _)| name).collect();
    covered.sort_unstable();
    assert_eq!(covered, registered);
}

proptest! {
    #[test]
    fn operations_never_mutate_their_input(
        rows in prop::collection::vec((0.5f64..1e3, 0.5f64..1e3, -1e3f64..1e3), 3..40),
    ) {
        let engine = Engine::builtin().unwrap();
        let steps: Vec<f64> = (0..rows.len()).map(|i| i as f64).collect();
        let a: Vec<f64> = rows.iter().map(|r| r.0).collect();
        let b: Vec<f64> = rows.iter().map(|r| r.1).collect();
        let c: Vec<f64> = rows.iter().map(|r| r.2).collect();
        let input = Collection::new(
            steps.clone(),
            vec![
                Column::from_values("A", a.clone()),
                Column::from_values("B", b.clone()),
                Column::from_values("C", c.clone()),
            ],
        )
        .unwrap();

        for (name, args) in collection_calls(a[0]) {
            let takes_in_place = engine
                .operations()
                .iter()
                .find(|op| op.domain() == "core" && op.name() == name)
                .is_some_and(|op| op.params().iter().any(|p| p.name == IN_PLACE));
            let mut variants = vec![args.clone()];
            if takes_in_place {
                variants.push(args.in_place());
            }
            for args in variants {
                let result = engine.operations().invoke_collection(input.clone(), name, &args);
                prop_assert!(result.is_ok(), "{name} failed: {:?}", result.err());

                prop_assert_eq!(
                    input.index().as_slice(),
                    steps.as_slice(),
                    "{} moved the index",
                    name
                );
                prop_assert_eq!(input.column_names().collect::<Vec<_>>(), vec!["A", "B", "C"]);
                for (column, expected) in [("A", &a), ("B", &b), ("C", &c)] {
                    let expected: Vec<Option<f64>> = expected.iter().copied().map(Some).collect();
                    prop_assert_eq!(
                        input.column(column).unwrap().numbers().unwrap(),
                        expected.as_slice(),
                        "{} wrote into column {}",
                        name,
                        column
                    );
                }
            }
        }
    }

    #[test]
    fn split_partitions_every_row_exactly_once(
        markers in prop::collection::vec(0i64..5, 1..60),
    ) {
        let engine = Engine::builtin().unwrap();
        let values: Vec<f64> = (0..markers.len()).map(|i| i as f64 * 10.0).collect();
        let group = engine
            .chain(collection_of(&values))
            .split_by_integers(&markers)
            .unwrap();

        let mut distinct = markers.clone();
        distinct.sort_unstable();
        distinct.dedup();
        prop_assert_eq!(group.len(), distinct.len());

        let mut steps: Vec<f64> = group.iter().flat_map(|c| c.index().iter()).collect();
        prop_assert_eq!(steps.len(), markers.len());
        steps.sort_by(f64::total_cmp);
        let expected: Vec<f64> = (0..markers.len()).map(|i| i as f64).collect();
        prop_assert_eq!(steps, expected);

        for member in group.iter() {
            let positions: Vec<usize> = member.index().iter().map(|s| s as usize).collect();
            let marker = markers[positions[0]];
            prop_assert!(positions.iter().all(|&p| markers[p] == marker));
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
