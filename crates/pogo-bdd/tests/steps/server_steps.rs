use cucumber::{given, then, when};

use pogo_bdd::ServerState;

use crate::world::{free_port, OrFail, World};

#[given(regex = r"^the mock service is running$")]
pub async fn the_mock_service_is_running(world: &mut World) {
    world.ctx.start_mock_server().await.or_fail();
}

#[given(regex = r"^another process is listening on a port$")]
pub async fn a_port_is_occupied(world: &mut World) {
    world.occupy_port();
}

#[when(regex = r#"^I start the server with "([^"]+)"$"#)]
pub async fn i_start_the_server(world: &mut World, directive: String) {
    world.ctx.start_server(&directive).await.or_fail();
}

#[when(regex = r#"^I try to start "([^"]+)" on the occupied port$"#)]
pub async fn try_start_on_occupied_port(world: &mut World, program: String) {
    let directive = format!("{} --port {}", program, world.occupied_port());
    world.last_error = world.ctx.start_server(&directive).await.err().map(|e| e.to_string());
}

#[when(regex = r#"^I try to start "([^"]+)" on a free port$"#)]
pub async fn try_start_on_free_port(world: &mut World, program: String) {
    let directive = format!("{} --port={}", program, free_port());
    world.last_error = world.ctx.start_server(&directive).await.err().map(|e| e.to_string());
}

#[when(regex = r"^I try to start the mock service again$")]
pub async fn try_start_mock_again(world: &mut World) {
    world.last_error = world.ctx.start_mock_server().await.err().map(|e| e.to_string());
}

#[when(regex = r"^I stop the server$")]
pub async fn i_stop_the_server(world: &mut World) {
    world.ctx.stop_server().await.or_fail();
}

#[then(regex = r"^no server is running$")]
pub async fn no_server_is_running(world: &mut World) {
    assert!(!world.ctx.server().is_active());
    assert_eq!(world.ctx.server().state(), ServerState::Idle);
    assert!(world.ctx.server_url().is_err());
}

#[then(regex = r"^the server is ready$")]
pub async fn the_server_is_ready(world: &mut World) {
    assert_eq!(world.ctx.server().state(), ServerState::Ready);
    assert!(world.ctx.server().is_healthy().await);
}

#[then(regex = r"^the server has served (\d+) requests?$")]
pub async fn served_requests(world: &mut World, count: usize) {
    assert_eq!(world.ctx.server().request_count(), Some(count));
}
