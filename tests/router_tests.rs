use http::Method;
use serde_json::json;
use sluice::builder::RouterBuilder;
use sluice::error::BuildError;
use sluice::handler::Handler;
use sluice::router::{HandleSpec, Router};
use sluice::server::Request;
use sluice::Endpoint;

mod tracing_util;
use tracing_util::TestTracing;

fn ok(value: serde_json::Value) -> Handler {
    Handler::direct(move |_req, _res, _args| Ok(value.clone()))
}

#[test]
fn routes_by_verb_and_path() {
    let _tracing = TestTracing::init();
    let router = RouterBuilder::new()
        .get("/zoo/animals", |_req, _res, _args| Ok(json!("list")))
        .unwrap()
        .post("/zoo/animals", |_req, _res, _args| Ok(json!("create")))
        .unwrap()
        .get("/zoo/animals/<id:int>", |_req, _res, args| {
            Ok(json!({ "id": args.get_i64("id") }))
        })
        .unwrap()
        .build();

    let res = router.call(Request::new(Method::GET, "/zoo/animals"));
    assert_eq!(res.body_string(), r#""list""#);

    let res = router.call(Request::new(Method::POST, "/zoo/animals"));
    assert_eq!(res.body_string(), r#""create""#);

    let res = router.call(Request::new(Method::GET, "/zoo/animals/12"));
    assert_eq!(res.body_string(), r#"{"id":12}"#);

    let res = router.call(Request::new(Method::GET, "/zoo/animals/teddy"));
    assert_eq!(res.status, 404);
}

#[test]
fn endpoints_sharing_a_path_under_disjoint_verbs_are_both_reachable() {
    let router = RouterBuilder::new()
        .get("/thing", |_req, _res, _args| Ok(json!("got")))
        .unwrap()
        .put("/thing", |_req, _res, _args| Ok(json!("put")))
        .unwrap()
        .build();
    assert_eq!(
        router.call(Request::new(Method::GET, "/thing")).body_string(),
        r#""got""#
    );
    assert_eq!(
        router.call(Request::new(Method::PUT, "/thing")).body_string(),
        r#""put""#
    );
}

#[test]
fn verb_mismatch_yields_405_with_allow_header() {
    let router = RouterBuilder::new()
        .get("/thing", |_req, _res, _args| Ok(json!(null)))
        .unwrap()
        .put("/thing", |_req, _res, _args| Ok(json!(null)))
        .unwrap()
        .build();
    let res = router.call(Request::new(Method::POST, "/thing"));
    assert_eq!(res.status, 405);
    assert_eq!(res.header("allow"), Some("GET, PUT"));
}

#[test]
fn missing_route_yields_404_with_a_json_body() {
    let router = Router::new();
    let res = router.call(Request::new(Method::GET, "/nowhere"));
    assert_eq!(res.status, 404);
    assert!(res.body_string().contains("404"));
}

#[test]
fn tree_listing_shows_child_segments() {
    let router = RouterBuilder::new()
        .get("/a", |_req, _res, _args| Ok(json!(null)))
        .unwrap()
        .get("/a/b/c/f", |_req, _res, _args| Ok(json!(null)))
        .unwrap()
        .post("/a/b/c/f", |_req, _res, _args| Ok(json!(null)))
        .unwrap()
        .get("/i", |_req, _res, _args| Ok(json!(null)))
        .unwrap()
        .get("/t", |_req, _res, _args| Ok(json!(null)))
        .unwrap()
        .get("/u", |_req, _res, _args| Ok(json!(null)))
        .unwrap()
        .get("/v/b/c/a", |_req, _res, _args| Ok(json!(null)))
        .unwrap()
        .get("/v/b/c/b", |_req, _res, _args| Ok(json!(null)))
        .unwrap()
        .get("/v/b/c/f", |_req, _res, _args| Ok(json!(null)))
        .unwrap()
        .build();

    assert_eq!(router.segments_at("/"), vec!["a", "i", "t", "u", "v"]);
    assert_eq!(router.segments_at("/v/b/c"), vec!["a", "b", "f"]);
}

#[test]
fn literal_beats_dynamic_and_specific_type_beats_string() {
    let router = RouterBuilder::new()
        .get("/p/<x>", |_req, _res, _args| Ok(json!("string")))
        .unwrap()
        .get("/p/<n:int>", |_req, _res, _args| Ok(json!("int")))
        .unwrap()
        .get("/p/fixed", |_req, _res, _args| Ok(json!("literal")))
        .unwrap()
        .build();

    assert_eq!(
        router.call(Request::new(Method::GET, "/p/fixed")).body_string(),
        r#""literal""#
    );
    assert_eq!(
        router.call(Request::new(Method::GET, "/p/41")).body_string(),
        r#""int""#
    );
    assert_eq!(
        router.call(Request::new(Method::GET, "/p/word")).body_string(),
        r#""string""#
    );
}

#[test]
fn remove_handle_unregisters_and_is_silent_when_absent() {
    let mut router = Router::new();
    router
        .handle_fn([Method::GET], "/gone", |_req, _res, _args| Ok(json!(1)))
        .unwrap();
    assert_eq!(router.call(Request::new(Method::GET, "/gone")).status, 200);

    router.remove_handle(&Method::GET, "/gone");
    assert_eq!(router.call(Request::new(Method::GET, "/gone")).status, 404);

    // absent removal is not an error
    router.remove_handle(&Method::DELETE, "/never-was");
}

#[test]
fn prebuilt_endpoint_and_tuple_forms_conflict() {
    let mut router = Router::new();
    let endpoint = Endpoint::new([Method::GET], "/a", ok(json!(null))).unwrap();
    let mut spec = HandleSpec::of(endpoint);
    spec.path = Some("/b".into());
    assert!(matches!(
        router.handle(spec),
        Err(BuildError::ConflictingArgs)
    ));
}

#[test]
fn registration_without_a_path_is_rejected() {
    let mut router = Router::new();
    let mut spec = HandleSpec::default();
    spec.handler = Some(ok(json!(null)));
    let err = router.handle(spec).unwrap_err();
    assert_eq!(err.to_string(), "no path specified");
}

#[test]
fn forbidden_metadata_keys_are_rejected() {
    let mut router = Router::new();
    let mut spec = HandleSpec::new([Method::GET], "/x", ok(json!(null)));
    spec.metadata.insert("handler".into(), json!("sneaky"));
    assert!(matches!(
        router.handle(spec),
        Err(BuildError::ForbiddenArg(_))
    ));
}

#[test]
fn preempting_an_unregistered_filter_fails_at_registration() {
    let mut router = Router::new();
    let mut spec = HandleSpec::new([Method::GET], "/x", ok(json!(null)));
    spec.preempt = Some("ghost".into());
    assert!(matches!(
        router.handle(spec),
        Err(BuildError::UnknownPreempt(_))
    ));
}

#[test]
fn every_response_has_a_plausible_status() {
    let router = RouterBuilder::new()
        .get("/ok", |_req, _res, _args| Ok(json!(null)))
        .unwrap()
        .get("/fail", |_req, _res, _args| Err("boom".into()))
        .unwrap()
        .build();
    for (method, target) in [
        (Method::GET, "/ok"),
        (Method::GET, "/fail"),
        (Method::POST, "/ok"),
        (Method::GET, "/missing"),
    ] {
        let res = router.call(Request::new(method, target));
        assert!((100..=599).contains(&res.status), "status {}", res.status);
    }
}

#[test]
fn routes_listing_is_ordered_by_path() {
    let router = RouterBuilder::new()
        .get("/b", |_req, _res, _args| Ok(json!(null)))
        .unwrap()
        .get("/a", |_req, _res, _args| Ok(json!(null)))
        .unwrap()
        .build();
    let paths: Vec<String> = router.routes().into_iter().map(|(_, p)| p).collect();
    assert_eq!(paths, vec!["/a", "/b"]);
}
