use serde_json::json;
use tasc_domain::LoadDisplacement;
use tasc_model::{Collection, Column, Kwargs, TascError};
use tasc_ops::{Args, Engine};

fn engine() -> Engine {
    Engine::builtin().unwrap()
}

fn force_disp() -> Collection {
    Collection::new(
        vec![0.0, 1.0, 2.0, 3.0, 4.0],
        vec![
            Column::from_values("Force", vec![0.0, 2.0, -1.0, 3.0, -2.0]).with_unit("kN"),
            Column::from_values("Disp", vec![0.0, 0.1, 0.2, 0.3, 0.4]).with_unit("mm"),
        ],
    )
    .unwrap()
}

#[test]
fn add_scalar_into_new_column_leaves_input_untouched() {
    let engine = engine();
    let input = Collection::new(
        vec![0.0, 1.0, 2.0],
        vec![Column::from_values("A", vec![1.0, 2.0, 3.0])],
    )
    .unwrap();

    let out = engine
        .chain(input.clone())
        .call("add", &Args::new().arg("A").arg(10).kwarg("result_column", "B"))
        .unwrap()
        .end();

    assert_eq!(
        out.column("B").unwrap().as_numbers().unwrap(),
        &[Some(11.0), Some(12.0), Some(13.0)]
    );
    assert_eq!(out.column_names().collect::<Vec<_>>(), vec!["A", "B"]);
    assert_eq!(
        input.column("A").unwrap().as_numbers().unwrap(),
        &[Some(1.0), Some(2.0), Some(3.0)]
    );
    assert!(input.get_column("B").is_none());
}

#[test]
fn as_domain_infers_load_and_displacement() {
    let engine = engine();
    let chain = engine
        .chain(force_disp())
        .call("as_domain", &Args::new().arg("load_displacement"))
        .unwrap();
    assert_eq!(chain.domain(), "load_displacement");

    let state = LoadDisplacement::of(chain.collection()).unwrap();
    assert_eq!(state.load_column(), "Force");
    assert_eq!(state.displacement_column(), "Disp");
    assert_eq!(
        chain.value("get_load_column", &Args::new()).unwrap(),
        json!("Force")
    );
}

#[test]
fn domain_operations_and_inherited_core_operations_mix() {
    let engine = engine();
    let out = engine
        .chain(force_disp())
        .as_domain("load_displacement", Kwargs::new())
        .unwrap()
        .call("cycle_count", &Args::new())
        .unwrap()
        .call("multiply", &Args::new().arg("Force").arg(2).kwarg("result_column", "F2"))
        .unwrap()
        .end();
    assert_eq!(out.domain(), "load_displacement");
    assert_eq!(
        out.column("Force_cycle").unwrap().as_numbers().unwrap(),
        &[Some(1.0), Some(1.0), Some(1.0), Some(2.0), Some(2.0)]
    );
    assert_eq!(
        out.column("F2").unwrap().as_numbers().unwrap()[3],
        Some(6.0)
    );
}

#[test]
fn unknown_operation_names_operation_and_domain() {
    let err = engine()
        .chain(force_disp())
        .call("nonexistent_op", &Args::new())
        .err()
        .unwrap();
    assert_eq!(
        err,
        TascError::UnknownOperation {
            operation: "nonexistent_op".into(),
            domain: "core".into()
        }
    );
    let message = err.to_string();
    assert!(message.contains("nonexistent_op"));
    assert!(message.contains("core"));
}

#[test]
fn domain_operation_from_core_is_a_mismatch() {
    let err = engine()
        .chain(force_disp())
        .call("cycle_count", &Args::new())
        .err()
        .unwrap();
    assert_eq!(
        err,
        TascError::DomainMismatch {
            operation: "cycle_count".into(),
            domain: "core".into(),
            available: vec!["load_displacement".into()],
        }
    );
}

#[test]
fn chain_leaves_after_a_value() {
    let engine = engine();
    let chain = engine.chain(force_disp());
    let summary = chain.value("describe", &Args::new().arg("Disp")).unwrap();
    assert_eq!(summary["Disp"]["count"], json!(5));
    // The chain still holds the same collection.
    assert_eq!(chain.collection().column_count(), 2);

    let err = engine
        .chain(force_disp())
        .call("describe", &Args::new())
        .err()
        .unwrap();
    assert!(matches!(err, TascError::UnexpectedOutput { .. }));
}

#[test]
fn in_place_returns_the_same_collection() {
    let engine = engine();
    let input = force_disp();
    let id = input.id();
    let out = engine
        .chain(input)
        .call(
            "add",
            &Args::new()
                .arg("Force")
                .arg(1)
                .kwarg("result_column", "F1")
                .in_place(),
        )
        .unwrap()
        .end();
    assert_eq!(out.id(), id);

    let copied = engine
        .chain(out)
        .call("add", &Args::new().arg("Force").arg(1))
        .unwrap()
        .end();
    assert_ne!(copied.id(), id);
}

#[test]
fn pipe_and_inspect_stay_in_the_chain() {
    let engine = engine();
    let mut seen = 0;
    let out = engine
        .chain(force_disp())
        .inspect(|c| seen = c.len())
        .pipe(|mut c| {
            c.remove_column("Disp")?;
            Ok(c)
        })
        .unwrap()
        .debug("after pipe")
        .end();
    assert_eq!(seen, 5);
    assert_eq!(out.column_count(), 1);
}

#[test]
fn dropping_a_primary_column_falls_back_to_core() {
    let engine = engine();
    let specialized = engine
        .chain(force_disp())
        .call("as_domain", &Args::new().arg("load_displacement"))
        .unwrap();

    let kept = engine
        .chain(specialized.collection().clone())
        .call("select", &Args::new().kwarg("columns", json!(["Disp", "Force"])))
        .unwrap();
    assert_eq!(kept.domain(), "load_displacement");
    assert_eq!(
        kept.value("get_load_column", &Args::new()).unwrap(),
        json!("Force")
    );

    let stepped = engine
        .chain(specialized.collection().clone())
        .call("select_step", &Args::new().arg(json!([1.0, 3.0])))
        .unwrap();
    assert_eq!(stepped.domain(), "load_displacement");
    assert_eq!(stepped.collection().len(), 2);

    let narrowed = specialized
        .call("select", &Args::new().kwarg("columns", json!(["Disp"])))
        .unwrap();
    assert_eq!(narrowed.domain(), "core");
    assert!(narrowed.collection().domain_state().is_none());
    assert_eq!(
        narrowed.collection().column_names().collect::<Vec<_>>(),
        vec!["Disp"]
    );
    assert!(matches!(
        narrowed.value("get_load_column", &Args::new()),
        Err(TascError::DomainMismatch { .. })
    ));
}

#[test]
fn revalidation_demotes_stale_fields_in_place() {
    let engine = engine();
    let specialized = engine
        .chain(force_disp())
        .call("as_domain", &Args::new().arg("load_displacement"))
        .unwrap()
        .end();
    let args = Args::new().kwarg("columns", json!(["Force"]));
    let dropped = engine
        .operations()
        .invoke_collection(specialized, "select", &args)
        .unwrap();
    assert_eq!(dropped.domain(), "load_displacement");

    let id = dropped.id();
    let demoted = engine.domains().revalidate(dropped);
    assert_eq!(demoted.domain(), "core");
    assert_eq!(demoted.id(), id);
    assert_eq!(demoted.column_names().collect::<Vec<_>>(), vec!["Force"]);
}

fn cyclic(cycle: Vec<f64>, disp: Vec<f64>, force: Vec<f64>) -> Collection {
    let steps: Vec<f64> = (0..cycle.len()).map(|i| i as f64).collect();
    let collection = Collection::new(
        steps,
        vec![
            Column::from_values("Force", force).with_unit("kN"),
            Column::from_values("Disp", disp).with_unit("mm"),
            Column::from_values("Cycle", cycle),
        ],
    )
    .unwrap();
    engine()
        .as_domain(collection, "load_displacement", Kwargs::new())
        .unwrap()
}

fn skeleton_sample() -> Collection {
    cyclic(
        vec![1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0],
        vec![0.0, 1.0, 2.0, 1.0, 0.0, 1.0, 5.0, 6.0, 0.0, 7.0, 8.0],
        vec![0.0, 10.0, 20.0, 5.0, 0.0, 15.0, 30.0, 35.0, 0.0, 20.0, 10.0],
    )
}

fn curve_points(collection: &Collection, load: &str, disp: &str) -> (Vec<f64>, Vec<f64>) {
    let values = |name: &str| -> Vec<f64> {
        collection
            .column(name)
            .unwrap()
            .as_numbers()
            .unwrap()
            .iter()
            .map(|value| value.unwrap())
            .collect()
    };
    (values(disp), values(load))
}

#[test]
fn skeleton_curve_follows_load_peaks_and_joins_cycles() {
    let engine = engine();
    let out = engine
        .chain(skeleton_sample())
        .call("create_skeleton_curve", &Args::new())
        .unwrap()
        .end();

    assert_eq!(out.domain(), "load_displacement");
    assert_eq!(
        out.column_names().collect::<Vec<_>>(),
        vec!["Force_skeleton", "Disp_skeleton"]
    );
    let (disp, load) = curve_points(&out, "Force_skeleton", "Disp_skeleton");
    assert_eq!(disp, vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(load, vec![10.0, 20.0, 30.0, 35.0]);
    assert_eq!(out.index().as_slice(), &[0.0, 1.0, 2.0, 3.0]);
    assert_eq!(out.column("Force_skeleton").unwrap().unit(), Some("kN"));

    let state = LoadDisplacement::of(&out).unwrap();
    assert_eq!(state.load_column(), "Force_skeleton");
    assert_eq!(state.displacement_column(), "Disp_skeleton");
    assert_eq!(out.metadata()["source_columns"], json!(["Force", "Disp"]));
}

#[test]
fn skeleton_curve_decrease_modes() {
    let engine = engine();
    let run = |decrease_type: &str| {
        let out = engine
            .chain(skeleton_sample())
            .call(
                "create_skeleton_curve",
                &Args::new()
                    .kwarg("has_decrease", true)
                    .kwarg("decrease_type", decrease_type)
                    .kwarg("result_load_column", "P")
                    .kwarg("result_disp_column", "D"),
            )
            .unwrap()
            .end();
        curve_points(&out, "P", "D")
    };

    assert_eq!(
        run("envelope"),
        (vec![1.0, 2.0, 3.0, 4.0, 6.0], vec![10.0, 20.0, 30.0, 35.0, 10.0])
    );
    assert_eq!(
        run("continuous_only"),
        (
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            vec![10.0, 20.0, 30.0, 35.0, 20.0, 10.0]
        )
    );

    let err = engine
        .chain(skeleton_sample())
        .call(
            "create_skeleton_curve",
            &Args::new().kwarg("decrease_type", "sideways"),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        TascError::InvalidArgument { ref parameter, .. } if parameter == "decrease_type"
    ));
}

#[test]
fn cumulative_curve_chains_cycles_end_to_end() {
    let engine = engine();
    let input = cyclic(
        vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0],
        vec![1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 4.0],
        vec![10.0, 20.0, 10.0, -5.0, 10.0, 20.0, 10.0],
    );
    let out = engine
        .chain(input)
        .call("create_cumulative_curve", &Args::new())
        .unwrap()
        .end();

    let (disp, load) = curve_points(&out, "Force_cumulative", "Disp_cumulative");
    assert_eq!(
        disp,
        vec![0.0, 1.0, 2.0, 3.0, 4.0, 4.0, 5.0, 6.0, 7.0, 8.0]
    );
    assert_eq!(
        load,
        vec![0.0, 10.0, 20.0, 10.0, 0.0, 0.0, 10.0, 20.0, 10.0, 0.0]
    );
    assert_eq!(
        LoadDisplacement::of(&out).unwrap().load_column(),
        "Force_cumulative"
    );
}
