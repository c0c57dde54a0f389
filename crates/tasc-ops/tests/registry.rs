use tasc_model::{Collection, Column, Result, TascError};
use tasc_ops::{
    Args, BoundArgs, OperationDef, OperationRegistry, Outcome, Param, ParamKind, AS_DOMAIN,
};

fn sample() -> Collection {
    Collection::new(
        vec![0.0, 1.0],
        vec![Column::from_values("A", vec![1.0, 2.0])],
    )
    .unwrap()
}

fn tag(mut collection: Collection, args: &BoundArgs) -> Result<Collection> {
    let label = args.str("label")?.to_string();
    collection.metadata_mut().insert("tag".into(), label.into());
    Ok(collection)
}

const TAG: &[Param] = &[Param::required("label", ParamKind::Text)];

#[test]
fn builtin_signatures_are_stable() {
    let registry = OperationRegistry::with_builtins().unwrap();
    let divide = registry.get("core", "divide").unwrap();
    insta::assert_snapshot!(
        divide.signature(),
        @r#"divide(column1: column, column2_or_value: column_or_number, result_column: column = null, in_place: bool = false, handle_zero_division: text = "error") -> collection"#
    );
    let stiffness = registry.get("load_displacement", "calculate_stiffness").unwrap();
    insta::assert_snapshot!(
        stiffness.signature(),
        @r#"calculate_stiffness(range_start: number = 0.2, range_end: number = 0.8, method: text = "linear_regression") -> value"#
    );
}

#[test]
fn domain_entry_shadows_core() {
    let mut registry = OperationRegistry::new();
    registry
        .register("tag", "core", OperationDef::collection(TAG, tag), false)
        .unwrap();
    registry
        .register(
            "tag",
            "special",
            OperationDef::collection(TAG, |c: Collection, _: &BoundArgs| Ok(c)),
            false,
        )
        .unwrap();

    assert_eq!(registry.resolve("special", "tag").unwrap().domain(), "special");
    assert_eq!(registry.resolve("other", "tag").unwrap().domain(), "core");

    let names: Vec<(&str, &str)> = registry
        .available("special")
        .into_iter()
        .map(|op| (op.domain(), op.name()))
        .collect();
    assert_eq!(names, vec![("special", "tag")]);
}

#[test]
fn fallback_is_a_single_hop() {
    let mut registry = OperationRegistry::new();
    registry
        .register("tag", "parent", OperationDef::collection(TAG, tag), false)
        .unwrap();
    let err = registry.resolve("child", "tag").err().unwrap();
    assert_eq!(
        err,
        TascError::DomainMismatch {
            operation: "tag".into(),
            domain: "child".into(),
            available: vec!["parent".into()],
        }
    );
}

#[test]
fn conflicts_and_reserved_names() {
    let mut registry = OperationRegistry::new();
    registry
        .register("tag", "core", OperationDef::collection(TAG, tag), false)
        .unwrap();
    let err = registry
        .register("tag", "core", OperationDef::collection(TAG, tag), false)
        .unwrap_err();
    assert_eq!(
        err,
        TascError::OperationConflict {
            domain: "core".into(),
            operation: "tag".into()
        }
    );
    registry
        .register("tag", "core", OperationDef::collection(TAG, tag), true)
        .unwrap();
    assert_eq!(registry.len(), 1);

    let err = registry
        .register(AS_DOMAIN, "core", OperationDef::collection(TAG, tag), false)
        .unwrap_err();
    assert!(matches!(err, TascError::ReservedOperation { .. }));
}

#[test]
fn binding_rejects_bad_arguments() {
    let mut registry = OperationRegistry::new();
    registry
        .register("tag", "core", OperationDef::collection(TAG, tag), false)
        .unwrap();

    let missing = registry.invoke(sample(), "tag", &Args::new()).unwrap_err();
    assert!(matches!(
        missing,
        TascError::InvalidArgument { ref parameter, .. } if parameter == "label"
    ));

    let wrong_kind = registry
        .invoke(sample(), "tag", &Args::new().arg(3))
        .unwrap_err();
    assert!(matches!(wrong_kind, TascError::InvalidArgument { .. }));

    let unknown = registry
        .invoke(sample(), "tag", &Args::new().kwarg("colour", "red"))
        .unwrap_err();
    assert!(matches!(
        unknown,
        TascError::InvalidArgument { ref parameter, .. } if parameter == "colour"
    ));

    match registry
        .invoke(sample(), "tag", &Args::new().arg("x"))
        .unwrap()
    {
        Outcome::Collection(c) => assert_eq!(c.metadata()["tag"], "x"),
        other => panic!("unexpected outcome {other:?}"),
    }
}
