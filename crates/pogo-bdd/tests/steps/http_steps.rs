use cucumber::{then, when};

use pogo_bdd::verify::{http, json};

use crate::world::{OrFail, World};

/// Splits `/ocr/image?format=csv&language=de` into path and query pairs.
fn split_query(target: &str) -> (String, Vec<(String, String)>) {
    match target.split_once('?') {
        None => (target.to_string(), Vec::new()),
        Some((path, query)) => {
            let pairs = query
                .split('&')
                .filter(|p| !p.is_empty())
                .map(|p| match p.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (p.to_string(), String::new()),
                })
                .collect();
            (path.to_string(), pairs)
        }
    }
}

#[when(regex = r#"^I GET "([^"]+)"$"#)]
pub async fn i_get(world: &mut World, path: String) {
    world.ctx.http_get(&path).await.or_fail();
}

#[when(regex = r#"^I upload "([^"]+)" to "([^"]+)"$"#)]
pub async fn i_upload(world: &mut World, file: String, target: String) {
    let (path, query) = split_query(&target);
    world.ctx.http_upload(&path, &file, "image", &query).await.or_fail();
}

#[when(regex = r#"^I upload "([^"]+)" as field "([^"]+)" to "([^"]+)"$"#)]
pub async fn i_upload_as_field(world: &mut World, file: String, field: String, target: String) {
    let (path, query) = split_query(&target);
    world.ctx.http_upload(&path, &file, &field, &query).await.or_fail();
}

#[when(regex = r#"^I send a CORS preflight to "([^"]+)" from "([^"]+)"$"#)]
pub async fn i_send_preflight(world: &mut World, path: String, origin: String) {
    world.ctx.http_preflight(&path, &origin).await.or_fail();
}

#[then(regex = r"^the response status is (\d+)$")]
pub async fn the_response_status_is(world: &mut World, status: u16) {
    http::assert_status(world.ctx.last_http().or_fail(), status).or_fail();
}

#[then(regex = r#"^the response header "([^"]+)" is "([^"]*)"$"#)]
pub async fn the_response_header_is(world: &mut World, name: String, value: String) {
    http::assert_header(world.ctx.last_http().or_fail(), &name, &value).or_fail();
}

#[then(regex = r#"^the response header "([^"]+)" starts with "([^"]*)"$"#)]
pub async fn the_response_header_starts_with(world: &mut World, name: String, prefix: String) {
    let exchange = world.ctx.last_http().or_fail();
    let actual = exchange.header(&name).unwrap_or_default();
    assert!(
        actual.starts_with(&prefix),
        "header '{}' is '{}', expected prefix '{}'",
        name,
        actual,
        prefix
    );
}

#[then(regex = r#"^the response JSON field "([^"]+)" is "([^"]*)"$"#)]
pub async fn the_response_json_field_is(world: &mut World, path: String, expected: String) {
    let body = &world.ctx.last_http().or_fail().body;
    let value = json::extract(body).or_fail();
    json::assert_equals(&value, &path, &expected).or_fail();
}
