use cucumber::gherkin::Step;
use cucumber::given;

use pogo_bdd::{CommandOutcome, ExecutionMode, ModelKind};

use crate::world::{OrFail, World};

/// Stand-in image bytes; the synthetic tool only checks the file exists.
const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

#[given(regex = r#"^a test image "([^"]+)"$"#)]
pub async fn a_test_image(world: &mut World, name: String) {
    world.ctx.write_fixture(&name, PNG_SIGNATURE).or_fail();
}

#[given(regex = r#"^a test document "([^"]+)"$"#)]
pub async fn a_test_document(world: &mut World, name: String) {
    world.ctx.write_fixture(&name, b"%PDF-1.4\n%%EOF\n").or_fail();
}

#[given(regex = r#"^an empty file "([^"]+)"$"#)]
pub async fn an_empty_file(world: &mut World, name: String) {
    world.ctx.write_fixture(&name, b"").or_fail();
}

#[given(regex = r#"^a file "([^"]+)" of (\d+) bytes$"#)]
pub async fn a_file_of_size(world: &mut World, name: String, size: usize) {
    let mut bytes = PNG_SIGNATURE.to_vec();
    bytes.resize(size.max(PNG_SIGNATURE.len()), 0);
    world.ctx.write_fixture(&name, &bytes).or_fail();
}

#[given(regex = r"^a temporary models directory$")]
pub async fn a_temporary_models_directory(world: &mut World) {
    world.ctx.create_temp_models_dir().or_fail();
}

#[given(regex = r"^the models directory variable points to a temporary directory$")]
pub async fn models_env_points_to_temp(world: &mut World) {
    world.ctx.use_temp_models_dir().or_fail();
}

#[given(regex = r"^a custom (detection model|recognition model|dictionary)$")]
pub async fn a_custom_model(world: &mut World, kind: String) {
    let kind = match kind.as_str() {
        "detection model" => ModelKind::DetectionModel,
        "recognition model" => ModelKind::RecognitionModel,
        "dictionary" => ModelKind::Dictionary,
        _ => unreachable!(),
    };
    world.ctx.create_custom_model(kind).or_fail();
}

#[given(regex = r#"^the environment variable "([^"]+)" is "([^"]*)"$"#)]
pub async fn env_var(world: &mut World, name: String, value: String) {
    world.ctx.add_env(name, value);
}

#[given(regex = r#"^the working directory "([^"]+)"$"#)]
pub async fn working_directory(world: &mut World, dir: String) {
    let path = world.ctx.root_dir().or_fail().join(&dir);
    std::fs::create_dir_all(&path).expect("create working directory");
    world.ctx.track_dir(&path);
    world.ctx.set_working_dir(&path).or_fail();
}

/// Records the docstring as if a command had printed it.
#[given(regex = r"^the captured output:$")]
pub async fn the_captured_output(world: &mut World, step: &Step) {
    let text = step
        .docstring
        .as_ref()
        .expect("step needs a docstring")
        .trim_start_matches('\n');
    let mut outcome = CommandOutcome::started("<captured>", ExecutionMode::Subprocess);
    outcome.output = text.to_string();
    world.ctx.record(outcome);
}
