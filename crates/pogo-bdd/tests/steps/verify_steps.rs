use cucumber::then;

use pogo_bdd::verify::{self, files, json, table, text, CsvSchema};

use crate::world::{OrFail, World};

/// Text under test: the last command's output or the last response body.
fn subject(world: &World, which: &str) -> String {
    match which {
        "response" => world.ctx.last_http().or_fail().body.clone(),
        _ => world.ctx.output().or_fail().to_string(),
    }
}

fn schema(name: &str) -> CsvSchema {
    match name {
        "page" => CsvSchema::Paged,
        _ => CsvSchema::Plain,
    }
}

#[then(regex = r#"^the (output|response) contains "([^"]*)"$"#)]
pub async fn contains(world: &mut World, which: String, expected: String) {
    text::contains(&subject(world, &which), &expected).or_fail();
}

#[then(regex = r#"^the (output|response) contains "([^"]*)" ignoring case$"#)]
pub async fn contains_ignoring_case(world: &mut World, which: String, expected: String) {
    text::contains_ignore_case(&subject(world, &which), &expected).or_fail();
}

#[then(regex = r#"^the (output|response) does not contain "([^"]*)"$"#)]
pub async fn does_not_contain(world: &mut World, which: String, unexpected: String) {
    text::not_contains(&subject(world, &which), &unexpected).or_fail();
}

#[then(regex = r#"^the (output|response) matches the pattern "([^"]+)"$"#)]
pub async fn matches_pattern(world: &mut World, which: String, pattern: String) {
    text::matches_pattern(&subject(world, &which), &pattern).or_fail();
}

#[then(regex = r"^the (output|response) contains locale characters$")]
pub async fn contains_locale_characters(world: &mut World, which: String) {
    text::has_locale_characters(&subject(world, &which)).or_fail();
}

#[then(regex = r"^the (output|response) is valid JSON$")]
pub async fn is_valid_json(world: &mut World, which: String) {
    json::extract(&subject(world, &which)).or_fail();
}

#[then(regex = r#"^the (output|response) JSON field "([^"]+)" exists$"#)]
pub async fn json_field_exists(world: &mut World, which: String, path: String) {
    let output = subject(world, &which);
    // A second lookup must agree with the first.
    let first = json::assert_path(&output, &path).or_fail();
    let second = json::assert_path(&output, &path).or_fail();
    assert_eq!(first, second);
}

#[then(regex = r#"^the (output|response) JSON field "([^"]+)" has (\d+) items?$"#)]
pub async fn json_field_has_items(world: &mut World, which: String, path: String, count: usize) {
    let value = json::extract(&subject(world, &which)).or_fail();
    assert_eq!(json::array_len(&value, &path).or_fail(), count);
}

#[then(regex = r#"^every region has "([^"]+)" of at least ([0-9.]+)$"#)]
pub async fn every_region_at_least(world: &mut World, field: String, min: f64) {
    let output = match world.ctx.output() {
        Ok(output) => output.to_string(),
        Err(_) => world.ctx.last_http().or_fail().body.clone(),
    };
    let value = json::extract(&output).or_fail();
    json::all_at_least(&value, "ocr.regions", &field, min).or_fail();
}

#[then(regex = r"^the (output|response) is valid CSV with the (plain|page) result columns$")]
pub async fn is_csv_with_schema(world: &mut World, which: String, name: String) {
    table::assert_schema(&subject(world, &which), schema(&name)).or_fail();
}

#[then(regex = r#"^the (output|response) is valid CSV with columns "([^"]+)"$"#)]
pub async fn is_csv_with_columns(world: &mut World, which: String, columns: String) {
    let required: Vec<&str> = columns.split(',').map(str::trim).collect();
    table::assert_columns(&subject(world, &which), &required).or_fail();
}

#[then(regex = r#"^the (output|response) approximately matches "([^"]+)"$"#)]
pub async fn approximately_matches(world: &mut World, which: String, expected: String) {
    let threshold = world.ctx.config().similarity_threshold;
    verify::assert_approximate(&subject(world, &which), &expected, threshold).or_fail();
}

#[then(regex = r#"^the similarity of "([^"]*)" and "([^"]*)" is ([0-9.]+)$"#)]
pub async fn similarity_is(_world: &mut World, a: String, b: String, expected: f64) {
    let score = verify::similarity(&a, &b);
    assert!(
        (score - expected).abs() < 0.001,
        "similarity('{}', '{}') = {}, expected {}",
        a,
        b,
        score,
        expected
    );
    assert_eq!(score, verify::similarity(&b, &a));
}

#[then(regex = r"^the output file exists$")]
pub async fn the_output_file_exists(world: &mut World) {
    let path = world
        .ctx
        .last_output_file()
        .expect("the directive should have named an output file");
    files::assert_exists(path).or_fail();
}

#[then(regex = r#"^the output file contains "([^"]*)"$"#)]
pub async fn the_output_file_contains(world: &mut World, expected: String) {
    let path = world
        .ctx
        .last_output_file()
        .expect("the directive should have named an output file");
    files::assert_file_contains(path, &expected).or_fail();
}

#[then(regex = r"^the output file is valid JSON$")]
pub async fn the_output_file_is_json(world: &mut World) {
    let path = world
        .ctx
        .last_output_file()
        .expect("the directive should have named an output file");
    files::assert_file_json(path).or_fail();
}
