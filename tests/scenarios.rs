use serde_json::json;
use vetted::{
    config, int, object, string, tuple, union, IssueCode, ParseContext, PathSegment, SchemaError,
};

fn codes(err: &vetted::ParseError) -> Vec<IssueCode> {
    err.issues().iter().map(|issue| issue.code).collect()
}

#[test]
fn strict_object_reports_fields_then_unknown_keys() {
    let schema = object(vec![("name", string().min(1)), ("age", int().gte(0))])
        .strict()
        .unwrap();
    let err = schema
        .parse(&json!({"name": "", "age": -1, "extra": 1}))
        .unwrap_err();

    assert_eq!(
        vec![
            IssueCode::TooSmall,
            IssueCode::TooSmall,
            IssueCode::UnrecognizedKeys
        ],
        codes(&err)
    );
    assert_eq!(vec![PathSegment::from("name")], err.issues()[0].path);
    assert_eq!(vec![PathSegment::from("age")], err.issues()[1].path);
    assert!(err.issues()[2].path.is_empty());
    assert_eq!(Some(&["extra".to_owned()][..]), err.issues()[2].keys());
}

#[test]
fn tuple_length_mismatch_is_the_only_issue() {
    let err = tuple(vec![string(), int()])
        .parse(&json!(["hi", 3, 7]))
        .unwrap_err();

    assert_eq!(vec![IssueCode::TooBig], codes(&err));
    assert!(err.issues()[0].path.is_empty());
    assert_eq!(Some(2.0), err.issues()[0].maximum());
    assert_eq!(Some(&json!(["hi", 3, 7])), err.issues()[0].input.as_ref());
}

#[test]
fn default_short_circuits_nil_only() {
    assert_eq!(json!("hi"), string().default("hi").parse(&json!(null)).unwrap());

    let err = string().default("hi").min(1).parse(&json!("")).unwrap_err();
    assert_eq!(vec![IssueCode::TooSmall], codes(&err));
    assert!(err.issues()[0].path.is_empty());
}

#[test]
fn prefault_retries_once_then_reports() {
    let schema = string().min(3).prefault("ok");
    let err = schema.parse(&json!("no")).unwrap_err();
    assert_eq!(vec![IssueCode::TooSmall], codes(&err));
    assert_eq!(Some(&json!("ok")), err.issues()[0].input.as_ref());

    let schema = string().min(2).prefault("ok");
    assert_eq!(json!("ok"), schema.parse(&json!(null)).unwrap());
    assert_eq!(json!("ok"), schema.parse(&json!("n")).unwrap());
    assert_eq!(json!("fine"), schema.parse(&json!("fine")).unwrap());
}

#[test]
fn prefault_is_held_to_the_schema_checks() {
    let schema = string().min(3).prefault("ok");
    let err = schema.parse(&json!(null)).unwrap_err();
    assert_eq!(vec![IssueCode::TooSmall], codes(&err));
    assert_eq!(Some(&json!("ok")), err.issues()[0].input.as_ref());
}

#[test]
fn union_failure_nests_every_option() {
    let err = union(vec![int(), string()]).parse(&json!(true)).unwrap_err();
    assert_eq!(vec![IssueCode::InvalidUnion], codes(&err));
    assert!(err.issues()[0].path.is_empty());

    let nested: Vec<_> = err.issues()[0]
        .errors
        .iter()
        .map(|option| (option[0].code, option[0].expected().map(str::to_owned)))
        .collect();
    assert_eq!(
        vec![
            (IssueCode::InvalidType, Some("int".to_owned())),
            (IssueCode::InvalidType, Some("string".to_owned())),
        ],
        nested
    );
}

#[test]
fn pick_refuses_refined_objects() {
    let schema = object(vec![("a", string())]);
    let picked = schema.pick(&["a"]).unwrap();
    assert_eq!(json!({"a": "x"}), picked.parse(&json!({"a": "x"})).unwrap());

    let refined = schema.refine(|value| value.get("a").is_some());
    assert_eq!(
        Err(SchemaError::RefinedPick),
        refined.pick(&["a"]).map(|_| ())
    );
}

#[test]
fn nested_paths_resolve_to_the_leaf() {
    let schema = object(vec![(
        "users",
        vetted::array(object(vec![("emails", vetted::array(string().email()))])),
    )]);
    let err = schema
        .parse(&json!({"users": [{"emails": ["a@b.co"]}, {"emails": ["ok@x.io", "nope"]}]}))
        .unwrap_err();

    assert_eq!(1, err.issues().len());
    assert_eq!(
        vec![
            PathSegment::from("users"),
            PathSegment::Index(1),
            PathSegment::from("emails"),
            PathSegment::Index(1),
        ],
        err.issues()[0].path
    );
    assert_eq!(vec!["users.1.emails.1"], err.by_path().keys().collect::<Vec<_>>());
}

#[test]
fn message_priority() {
    let schema = string()
        .error("schema says no")
        .check(vetted::Check::min_length(3).error("check says no"));

    let err = schema.parse(&json!(1)).unwrap_err();
    assert_eq!("schema says no", err.issues()[0].message);

    let err = schema.parse(&json!("a")).unwrap_err();
    assert_eq!("check says no", err.issues()[0].message);

    let ctx = ParseContext::new().with_error("call says no");
    let err = schema.parse_with(&json!("a"), &ctx).unwrap_err();
    assert_eq!("call says no", err.issues()[0].message);
}

#[test]
fn global_customizer_sits_below_schema_customizers() {
    config::configure(|c| {
        c.custom_error = Some(vetted::ErrorCustomizer::new(|issue| {
            issue
                .properties
                .params
                .as_ref()
                .and_then(|params| params.get("marker"))
                .map(|_| "global says no".to_owned())
        }));
    });

    let marked = string().check(
        vetted::Check::min_length(3).with_params(vetted::Params::new().param("marker", true)),
    );
    let err = marked.parse(&json!("a")).unwrap_err();
    assert_eq!("global says no", err.issues()[0].message);

    let err = marked.error("schema wins").parse(&json!("a")).unwrap_err();
    assert_eq!("schema wins", err.issues()[0].message);

    config::reset();
}

#[test]
fn input_reporting_can_be_disabled() {
    let ctx = ParseContext::new().with_report_input(false);
    let err = string().parse_with(&json!(5), &ctx).unwrap_err();
    assert_eq!(None, err.issues()[0].input);
}

#[test]
fn errors_serialize_as_json() {
    let err = object(vec![("name", string())])
        .parse(&json!({"name": 1}))
        .unwrap_err();
    assert_eq!(
        json!({
            "issues": [{
                "code": "invalid_type",
                "path": ["name"],
                "message": "Invalid input: expected string, received number",
                "input": 1,
                "expected": "string",
                "received": "number"
            }]
        }),
        serde_json::to_value(&err).unwrap()
    );
}

#[test]
fn flatten_groups_by_field() {
    let err = object(vec![("a", string()), ("b", int())])
        .refine(|_| false)
        .parse(&json!({"a": 1, "b": "x"}))
        .unwrap_err();
    let flat = err.flatten();
    assert_eq!(2, flat.field_errors.len());

    let err = object(vec![("a", string())])
        .refine(|_| false)
        .parse(&json!({"a": "x"}))
        .unwrap_err();
    assert_eq!(vec!["Invalid input".to_owned()], err.flatten().form_errors);
}
