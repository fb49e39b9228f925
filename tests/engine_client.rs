//! Engine 客户端集成测试：mockito 模拟 Engine API

use dockwatch::engine::{ClientOptions, PortMapping};
use dockwatch::logs::encode_frame;
use dockwatch::utils::ContainerState;
use dockwatch::{ConnectionProfile, DockwatchError, EngineClient, StreamKind, Tail};
use mockito::{Matcher, Server, ServerGuard};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;

fn client_for(server: &ServerGuard) -> EngineClient {
    let profile = ConnectionProfile::new(&server.host_with_port(), "http").unwrap();
    EngineClient::new(&profile).unwrap()
}

fn containers_body() -> String {
    json!([
        {
            "Id": "a1b2c3d4e5f6",
            "Names": ["/web-server-prod"],
            "Image": "nginx:latest",
            "State": "running",
            "Status": "Up 2 hours",
            "Ports": [{"PrivatePort": 80, "PublicPort": 8080, "Type": "tcp"}]
        },
        {
            "Id": "c3d4e5f6a1b2",
            "Names": ["/old-web-server"],
            "Image": "nginx:1.20",
            "State": "exited",
            "Status": "Exited (0) 2 weeks ago",
            "Ports": []
        }
    ]).to_string()
}

#[test]
fn list_containers_all() {
    let mut server = Server::new();
    let mock = server.mock("GET", "/containers/json")
        .match_query(Matcher::UrlEncoded("all".into(), "true".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(containers_body())
        .create();

    let containers = client_for(&server).list_containers(true).unwrap();
    assert_eq!(containers.len(), 2);
    assert_eq!(containers[0].display_name(), "web-server-prod");
    assert_eq!(containers[0].state, ContainerState::Running);
    assert_eq!(containers[0].ports, vec![
        PortMapping { private_port: 80, public_port: Some(8080), protocol: "tcp".into() }
    ]);
    assert_eq!(containers[1].state, ContainerState::Exited);
    mock.assert();
}

#[test]
fn list_containers_running_only_sends_all_false() {
    let mut server = Server::new();
    let mock = server.mock("GET", "/containers/json")
        .match_query(Matcher::UrlEncoded("all".into(), "false".into()))
        .with_status(200)
        .with_body("[]")
        .create();

    assert!(client_for(&server).list_containers(false).unwrap().is_empty());
    mock.assert();
}

#[test]
fn repeated_calls_and_fresh_clients_agree() {
    let mut server = Server::new();
    let mock = server.mock("GET", "/containers/json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(containers_body())
        .expect(3)
        .create();

    let a = client_for(&server);
    let b = client_for(&server);
    let first = a.list_containers(true).unwrap();
    let second = a.list_containers(true).unwrap();
    let other = b.list_containers(true).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, other);
    mock.assert();
}

#[test]
fn empty_resource_lists() {
    let mut server = Server::new();
    server.mock("GET", "/images/json").with_status(200).with_body("[]").create();
    server.mock("GET", "/networks").with_status(200).with_body("[]").create();
    server.mock("GET", "/volumes")
        .with_status(200)
        .with_body(r#"{"Volumes": null, "Warnings": null}"#)
        .create();

    let client = client_for(&server);
    assert_eq!(client.list_images().unwrap(), vec![]);
    assert_eq!(client.list_networks().unwrap(), vec![]);
    assert_eq!(client.list_volumes().unwrap(), vec![]);
}

#[test]
fn images_networks_volumes() {
    let mut server = Server::new();
    server.mock("GET", "/images/json")
        .with_status(200)
        .with_body(json!([
            {"Id": "sha256:f6f397579981", "RepoTags": ["nginx:latest", "nginx:1.21"], "Created": 1678886400, "Size": 133000000}
        ]).to_string())
        .create();
    server.mock("GET", "/networks")
        .with_status(200)
        .with_body(json!([
            {"Id": "net1", "Name": "bridge", "Driver": "bridge", "Scope": "local"},
            {"Id": "net4", "Name": "my-app-net", "Driver": "bridge", "Scope": "local"}
        ]).to_string())
        .create();
    server.mock("GET", "/volumes")
        .with_status(200)
        .with_body(json!({"Volumes": [
            {"Name": "mongo-data", "Driver": "local", "Mountpoint": "/var/lib/docker/volumes/mongo-data/_data"}
        ]}).to_string())
        .create();

    let client = client_for(&server);
    let images = client.list_images().unwrap();
    assert_eq!(images[0].repo_tags, vec!["nginx:latest".to_string(), "nginx:1.21".to_string()]);

    let networks = client.list_networks().unwrap();
    assert!(networks[0].reserved);
    assert!(!networks[1].reserved);

    let volumes = client.list_volumes().unwrap();
    assert_eq!(volumes[0].mountpoint, "/var/lib/docker/volumes/mongo-data/_data");
}

#[test]
fn host_info_fields() {
    let mut server = Server::new();
    server.mock("GET", "/info")
        .with_status(200)
        .with_body(json!({
            "Name": "docker-host",
            "ServerVersion": "27.0.1",
            "NCPU": 4,
            "MemTotal": 17179869184u64,
            "ContainersRunning": 2,
            "Containers": 5,
            "Images": 4
        }).to_string())
        .create();

    let info = client_for(&server).host_info().unwrap();
    assert_eq!(info.ncpu, 4);
    assert_eq!(info.mem_total, 17179869184);
    assert_eq!(info.server_version, "27.0.1");
}

#[test]
fn non_success_status_is_engine_error() {
    let mut server = Server::new();
    server.mock("GET", "/images/json")
        .with_status(500)
        .with_body(r#"{"message":"internal failure"}"#)
        .create();

    match client_for(&server).list_images() {
        Err(DockwatchError::EngineError { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, r#"{"message":"internal failure"}"#);
        }
        other => panic!("expected EngineError, got {:?}", other),
    }
}

#[test]
fn invalid_json_is_malformed() {
    let mut server = Server::new();
    server.mock("GET", "/networks").with_status(200).with_body("<html>").create();
    assert!(matches!(client_for(&server).list_networks(), Err(DockwatchError::MalformedResponse(_))));
}

#[test]
fn missing_container_id_is_malformed() {
    let mut server = Server::new();
    server.mock("GET", "/containers/json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"Names": ["/x"], "State": "running"}]"#)
        .create();
    assert!(matches!(client_for(&server).list_containers(true), Err(DockwatchError::MalformedResponse(_))));
}

#[test]
fn refused_connection_is_unreachable() {
    // 端口 1 上不会有 Engine
    let profile = ConnectionProfile::new("127.0.0.1:1", "http").unwrap();
    let client = EngineClient::with_options(&profile, ClientOptions {
        connect_timeout: Duration::from_secs(2),
        timeout: Some(Duration::from_secs(2)),
    }).unwrap();
    let err = client.list_containers(true).unwrap_err();
    assert!(err.is_unreachable(), "got {:?}", err);
}

#[test]
fn log_stream_for_unknown_container_is_not_found() {
    let mut server = Server::new();
    server.mock("GET", "/containers/ghost/json")
        .with_status(404)
        .with_body(r#"{"message":"No such container: ghost"}"#)
        .create();

    let err = client_for(&server)
        .open_container_log_stream("ghost", Tail::Lines(10), false)
        .err()
        .unwrap();
    match err {
        DockwatchError::NotFound(msg) => assert_eq!(msg, "No such container: ghost"),
        other => panic!("expected NotFound, got {:?}", other),
    }
}

fn mock_inspect(server: &mut ServerGuard, id: &str, tty: bool) -> mockito::Mock {
    server.mock("GET", format!("/containers/{}/json", id).as_str())
        .with_status(200)
        .with_body(json!({
            "Id": id,
            "Name": "/web",
            "Config": {"Tty": tty},
            "State": {"Running": true}
        }).to_string())
        .create()
}

#[test]
fn framed_log_tail() {
    let mut server = Server::new();
    mock_inspect(&mut server, "abc", false);

    let mut body = encode_frame(StreamKind::Stdout, b"GET /index.html 200\nGET /sty");
    body.extend(encode_frame(StreamKind::Stderr, b"upstream slow\n"));
    body.extend(encode_frame(StreamKind::Stdout, b"les.css 200\n"));

    let logs = server.mock("GET", "/containers/abc/logs")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("stdout".into(), "1".into()),
            Matcher::UrlEncoded("stderr".into(), "1".into()),
            Matcher::UrlEncoded("tail".into(), "50".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/vnd.docker.multiplexed-stream")
        .with_body(body)
        .create();

    let stream = client_for(&server)
        .open_container_log_stream("abc", Tail::Lines(50), false)
        .unwrap();
    assert!(!stream.container().tty);

    let lines = stream.read_all().unwrap();
    let got: Vec<(StreamKind, String)> = lines.into_iter().map(|l| (l.stream, l.text)).collect();
    assert_eq!(got, vec![
        (StreamKind::Stdout, "GET /index.html 200".to_string()),
        (StreamKind::Stderr, "upstream slow".to_string()),
        (StreamKind::Stdout, "GET /styles.css 200".to_string()),
    ]);
    logs.assert();
}

#[test]
fn tty_log_tail_is_raw() {
    let mut server = Server::new();
    mock_inspect(&mut server, "tty1", true);
    server.mock("GET", "/containers/tty1/logs")
        .match_query(Matcher::UrlEncoded("tail".into(), "all".into()))
        .with_status(200)
        .with_body("root@tty1:/# ls\r\nbin  etc\r\n")
        .create();

    let lines = client_for(&server)
        .open_container_log_stream("tty1", Tail::All, false)
        .unwrap()
        .read_all()
        .unwrap();
    let texts: Vec<String> = lines.into_iter().map(|l| l.text).collect();
    assert_eq!(texts, vec!["root@tty1:/# ls".to_string(), "bin  etc".to_string()]);
}

#[test]
fn truncated_log_stream_surfaces() {
    let mut server = Server::new();
    mock_inspect(&mut server, "cut", false);
    let mut body = vec![1u8, 0, 0, 0, 0, 0, 0, 20];
    body.extend_from_slice(b"0123456789");
    server.mock("GET", "/containers/cut/logs")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(body)
        .create();

    let result = client_for(&server)
        .open_container_log_stream("cut", Tail::Lines(5), false)
        .unwrap()
        .read_all();
    assert!(matches!(result, Err(DockwatchError::TruncatedStream(_))));
}

#[test]
fn follow_subscription_delivers_lines() {
    let mut server = Server::new();
    mock_inspect(&mut server, "live", false);
    let mut body = encode_frame(StreamKind::Stdout, b"tick 1\n");
    body.extend(encode_frame(StreamKind::Stdout, b"tick 2\n"));
    let logs = server.mock("GET", "/containers/live/logs")
        .match_query(Matcher::UrlEncoded("follow".into(), "1".into()))
        .with_status(200)
        .with_body(body)
        .create();

    let sub = client_for(&server)
        .open_container_log_stream("live", Tail::Lines(0), true)
        .unwrap()
        .subscribe(4)
        .unwrap();
    let texts: Vec<String> = sub.map(|l| l.unwrap().text).collect();
    assert_eq!(texts, vec!["tick 1".to_string(), "tick 2".to_string()]);
    logs.assert();
}

#[test]
fn container_commands() {
    let mut server = Server::new();
    let start = server.mock("POST", "/containers/web/start").with_status(204).create();
    let stop = server.mock("POST", "/containers/web/stop").with_status(304).create();
    let rm = server.mock("DELETE", "/containers/web")
        .match_query(Matcher::UrlEncoded("force".into(), "true".into()))
        .with_status(204)
        .create();

    let client = client_for(&server);
    client.start_container("web").unwrap();
    client.stop_container("web").unwrap();
    client.remove_container("web", true).unwrap();
    start.assert();
    stop.assert();
    rm.assert();
}

#[test]
fn reserved_network_removal_never_reaches_engine() {
    let mut server = Server::new();
    let mock = server.mock("DELETE", Matcher::Any).expect(0).create();

    let err = client_for(&server).remove_network("bridge").unwrap_err();
    assert!(matches!(err, DockwatchError::Validation(_)));
    mock.assert();
}

#[test]
fn remove_missing_volume_is_not_found() {
    let mut server = Server::new();
    server.mock("DELETE", "/volumes/app-config")
        .with_status(404)
        .with_body(r#"{"message":"get app-config: no such volume"}"#)
        .create();
    assert!(matches!(
        client_for(&server).remove_volume("app-config"),
        Err(DockwatchError::NotFound(_))
    ));
}
