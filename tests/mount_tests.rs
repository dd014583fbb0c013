use std::fs;
use std::io::Write;

use http::Method;
use serde_json::json;
use sluice::builder::RouterBuilder;
use sluice::server::Request;
use sluice::static_files::StaticFiles;
use sluice::Router;

fn child_returning(value: serde_json::Value) -> Router {
    RouterBuilder::new()
        .get("/", move |_req, _res, _args| Ok(value.clone()))
        .unwrap()
        .build()
}

#[test]
fn mounted_child_sees_the_rewritten_path() {
    let child = RouterBuilder::new()
        .get("/pets/<id:int>", |_req, _res, args| {
            Ok(json!({ "id": args.get_i64("id") }))
        })
        .unwrap()
        .build();
    let router = RouterBuilder::new().mount("/api", child).build();

    let res = router.call(Request::new(Method::GET, "/api/pets/5"));
    assert_eq!(res.status, 200);
    assert_eq!(res.body_string(), r#"{"id":5}"#);
}

#[test]
fn mount_prefix_with_nothing_left_becomes_root() {
    let router = RouterBuilder::new()
        .mount("/sub", child_returning(json!(1)))
        .build();
    let res = router.call(Request::new(Method::GET, "/sub/"));
    assert_eq!(res.body_string(), "1");
}

#[test]
fn later_parent_endpoint_shadows_an_earlier_mount() {
    let mut router = RouterBuilder::new()
        .mount("/subpath", child_returning(json!(1)))
        .build();
    router
        .handle_fn([Method::GET], "/subpath/", |_req, _res, _args| Ok(json!(2)))
        .unwrap();

    let res = router.call(Request::new(Method::GET, "/subpath/"));
    assert_eq!(res.body_string(), "2");
}

#[test]
fn later_mount_shadows_an_earlier_parent_endpoint() {
    let router = RouterBuilder::new()
        .get("/subpath/", |_req, _res, _args| Ok(json!(2)))
        .unwrap()
        .mount("/subpath", child_returning(json!(1)))
        .build();
    let res = router.call(Request::new(Method::GET, "/subpath/"));
    assert_eq!(res.body_string(), "1");
}

#[test]
fn a_childs_404_does_not_fall_through_to_siblings() {
    let mut hit_second = RouterBuilder::new()
        .get("/present", |_req, _res, _args| Ok(json!("second")))
        .unwrap()
        .build();
    hit_second.set_404_handler(|_req, res| {
        res.status = 404;
        json!("second child 404")
    });

    let router = RouterBuilder::new()
        .mount("/s", child_returning(json!("first")))
        .mount("/s", hit_second)
        .build();

    // the first mount wins the prefix and its 404 is final
    let res = router.call(Request::new(Method::GET, "/s/present"));
    assert_eq!(res.status, 404);
    assert_ne!(res.body_string(), r#""second""#);
}

#[test]
fn unmount_removes_by_normalized_prefix() {
    let mut router = RouterBuilder::new()
        .mount("/gone", child_returning(json!(1)))
        .build();
    assert_eq!(router.call(Request::new(Method::GET, "/gone/")).status, 200);

    // prefix spelled without the trailing slash still unmounts
    router.unmount("/gone");
    assert_eq!(router.call(Request::new(Method::GET, "/gone/")).status, 404);

    // absent unmount is silent
    router.unmount("/never-was");
}

#[test]
fn root_mount_catches_everything_unmatched() {
    let fallback = RouterBuilder::new()
        .get("/anything", |_req, _res, _args| Ok(json!("fallback")))
        .unwrap()
        .build();
    let router = RouterBuilder::new()
        .get("/own", |_req, _res, _args| Ok(json!("own")))
        .unwrap()
        .mount("/", fallback)
        .build();

    assert_eq!(
        router.call(Request::new(Method::GET, "/anything")).body_string(),
        r#""fallback""#
    );

    // the parent's own endpoint is not swallowed by the catch-all mount
    assert_eq!(
        router.call(Request::new(Method::GET, "/own")).body_string(),
        r#""own""#
    );
}

#[test]
fn nested_mounts_rewrite_progressively() {
    let inner = RouterBuilder::new()
        .get("/leaf", |_req, _res, _args| Ok(json!("deep")))
        .unwrap()
        .build();
    let middle = RouterBuilder::new().mount("/b", inner).build();
    let router = RouterBuilder::new().mount("/a", middle).build();

    let res = router.call(Request::new(Method::GET, "/a/b/leaf"));
    assert_eq!(res.body_string(), r#""deep""#);
}

#[test]
fn static_mount_serves_bytes_with_content_type() {
    let dir = tempfile::tempdir().unwrap();
    let mut f = fs::File::create(dir.path().join("app.css")).unwrap();
    write!(f, "body {{ margin: 0 }}").unwrap();

    let router = RouterBuilder::new()
        .mount_static("/assets", StaticFiles::new(dir.path()))
        .build();

    let res = router.call(Request::new(Method::GET, "/assets/app.css"));
    assert_eq!(res.status, 200);
    assert_eq!(res.header("content-type"), Some("text/css"));
    assert_eq!(res.body_string(), "body { margin: 0 }");

    let res = router.call(Request::new(Method::GET, "/assets/missing.css"));
    assert_eq!(res.status, 404);
}

#[test]
fn parent_filters_run_before_mount_delegation() {
    use sluice::filter::FilterOutcome;

    let child = RouterBuilder::new()
        .get("/", |_req, _res, args| Ok(json!({ "tag": args.get_str("tag") })))
        .unwrap()
        .build();
    let router = RouterBuilder::new()
        .filter("tagger", |req, _res| {
            req.scratch.insert("tag".into(), json!("from-parent"));
            FilterOutcome::Forward
        })
        .unwrap()
        .mount("/sub", child)
        .build();

    let res = router.call(Request::new(Method::GET, "/sub/"));
    assert_eq!(res.body_string(), r#"{"tag":"from-parent"}"#);
}
