use http::Method;
use serde_json::json;
use sluice::builder::RouterBuilder;
use sluice::options::{RouterOptions, TrailingSlash};
use sluice::server::Request;

fn options(mode: TrailingSlash) -> RouterOptions {
    let mut opts = RouterOptions::default();
    opts.trailing_slash = mode;
    opts
}

#[test]
fn off_mode_matches_paths_literally() {
    let router = RouterBuilder::new()
        .get("/trailslash", |_req, _res, _args| Ok(json!("hit")))
        .unwrap()
        .build();

    let res = router.call(Request::new(Method::GET, "/trailslash"));
    assert_eq!(res.status, 200);
    assert_eq!(res.body_string(), r#""hit""#);

    let res = router.call(Request::new(Method::GET, "/trailslash/"));
    assert_eq!(res.status, 404);

    let res = router.call(Request::new(Method::POST, "/trailslash"));
    assert_eq!(res.status, 405);
}

#[test]
fn strict_mode_is_still_a_404_on_mismatch() {
    let router = RouterBuilder::new()
        .options(options(TrailingSlash::Strict404))
        .unwrap()
        .get("/x/", |_req, _res, _args| Ok(json!("hit")))
        .unwrap()
        .build();
    assert_eq!(router.call(Request::new(Method::GET, "/x/")).status, 200);
    assert_eq!(router.call(Request::new(Method::GET, "/x")).status, 404);
}

#[test]
fn redirect_mode_points_at_the_canonical_path() {
    let router = RouterBuilder::new()
        .options(options(TrailingSlash::Redirect))
        .unwrap()
        .get("/get/", |_req, _res, _args| Ok(json!("canonical")))
        .unwrap()
        .build();

    let res = router.call(Request::new(Method::GET, "/get?a=1"));
    assert_eq!(res.status, 307);
    assert_eq!(res.header("location"), Some("/get/?a=1"));
}

#[test]
fn redirect_preserves_the_raw_query_string_exactly() {
    let router = RouterBuilder::new()
        .options(options(TrailingSlash::Redirect))
        .unwrap()
        .get("/get/", |_req, _res, _args| Ok(json!("canonical")))
        .unwrap()
        .build();

    let res = router.call(Request::new(Method::GET, "/get?a=1&b=%20x&b=2"));
    assert_eq!(res.header("location"), Some("/get/?a=1&b=%20x&b=2"));

    let res = router.call(Request::new(Method::GET, "/get"));
    assert_eq!(res.header("location"), Some("/get/"));
}

#[test]
fn redirect_also_strips_a_surplus_slash() {
    let router = RouterBuilder::new()
        .options(options(TrailingSlash::Redirect))
        .unwrap()
        .get("/get", |_req, _res, _args| Ok(json!("canonical")))
        .unwrap()
        .build();
    let res = router.call(Request::new(Method::GET, "/get/?q=z"));
    assert_eq!(res.status, 307);
    assert_eq!(res.header("location"), Some("/get?q=z"));
}

#[test]
fn redirect_mode_leaves_exact_matches_alone() {
    let router = RouterBuilder::new()
        .options(options(TrailingSlash::Redirect))
        .unwrap()
        .get("/get/", |_req, _res, _args| Ok(json!("canonical")))
        .unwrap()
        .build();
    let res = router.call(Request::new(Method::GET, "/get/?a=1"));
    assert_eq!(res.status, 200);
    assert_eq!(res.body_string(), r#""canonical""#);
}
