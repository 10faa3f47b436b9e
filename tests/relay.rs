use std::future::Future;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;

use network_anchors::clients::AnchorClient;
use network_anchors::config::Config;
use network_anchors::geometry::{Quat, Vec3};
use network_anchors::models::{Coordinate, ResultCode};
use network_anchors::providers::{CoordinateProvider, FixedCoordinateProvider};
use network_anchors::routes::{create_app, AppState};
use network_anchors::service::NetworkAnchorService;
use network_anchors::transport::WebSocketTransport;

async fn start_relay() -> (AppState, Config) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let config = Config {
        port,
        relay_url: Some(format!("ws://127.0.0.1:{}/ws", port)),
        ..Config::default()
    };
    let app_state = AppState::new(&config);
    let app = create_app(app_state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (app_state, config)
}

async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

fn tracker(x: f32) -> Rc<FixedCoordinateProvider> {
    Rc::new(FixedCoordinateProvider::new(vec![Coordinate::new("X", Vec3::new(x, 0.0, 0.0), Quat::IDENTITY)]))
}

#[tokio::test]
async fn peers_share_an_anchor_through_the_relay() {
    LocalSet::new()
        .run_until(async {
            let (app_state, config) = start_relay().await;
            let url = config.relay_endpoint();

            let host = NetworkAnchorService::default();
            let host_transport = WebSocketTransport::connect(&url, &host).await.unwrap();
            assert!(host_transport.is_master());
            assert_eq!(host.connect(host_transport.peer_id(), tracker(0.0)).await, ResultCode::Success);
            host.refresh_coordinates(true).await;

            let guest = NetworkAnchorService::default();
            let guest_transport = WebSocketTransport::connect(&url, &guest).await.unwrap();
            assert_eq!(guest_transport.master_id(), host_transport.peer_id());
            assert_eq!(guest.connect(guest_transport.peer_id(), tracker(3.0)).await, ResultCode::Success);
            assert_eq!(guest.peer_directory(), vec![host_transport.peer_id(), guest_transport.peer_id()]);

            let created = host.request_create_network_anchor("origin", Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY).await;
            assert_eq!(created.result_code, ResultCode::Failed, "guest has no snapshot yet");

            guest.refresh_coordinates(true).await;
            let created = host.request_create_network_anchor("origin", Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY).await;
            assert_eq!(created.result_code, ResultCode::Success);
            let adopted = guest.local_network_anchor().expect("guest adopted the anchor");
            assert!(adopted.world_position(None).approx_eq(Vec3::new(4.0, 0.0, 0.0), 1e-5));

            let diagnostics = app_state.relay.diagnostics().await;
            assert_eq!(diagnostics.n_peers, 2);
            assert_eq!(diagnostics.master_id, Some(host_transport.peer_id()));
            assert!(diagnostics.frames_routed > 0);

            // Dropping the socket is reported to the master.
            guest_transport.close();
            eventually(|| {
                let host = host.clone();
                async move { host.peer_directory().len() == 1 }
            })
            .await;
            assert_eq!(app_state.relay.diagnostics().await.n_peers, 1);
        })
        .await;
}

#[tokio::test]
async fn standalone_client_joins_through_anchor_client() {
    LocalSet::new()
        .run_until(async {
            let (_app_state, config) = start_relay().await;

            let host_tracker: Rc<dyn CoordinateProvider> = tracker(5.0);
            let host = AnchorClient::connect(&config, Some(host_tracker)).await.unwrap();
            host.service().refresh_coordinates(true).await;

            let desktop = AnchorClient::connect(&config, None).await.unwrap();
            let borrowed = desktop.service().refresh_coordinates(true).await;
            assert_eq!(borrowed, host.service().local_coordinates());

            let placed = Rc::new(std::cell::Cell::new(None));
            let sink = placed.clone();
            host.localizer().on_anchor_placed(move |_, pose| sink.set(Some(pose.position)));
            host.localizer().set_placement(network_anchors::geometry::Pose::new(Vec3::new(6.0, 0.0, 0.0), Quat::IDENTITY));

            let response = host.localizer().create_or_get_anchor().unwrap().await.unwrap();
            assert_eq!(response.result_code, ResultCode::Success);
            assert!(placed.get().is_some_and(|position| position.approx_eq(Vec3::new(6.0, 0.0, 0.0), 1e-5)));

            let found = desktop.localizer().locate_existing_anchor().unwrap().await.unwrap();
            assert_eq!(found.result_code, ResultCode::Success);
            let anchor = desktop.service().local_network_anchor().expect("desktop has the anchor");
            assert!(anchor.world_position(None).approx_eq(Vec3::new(6.0, 0.0, 0.0), 1e-5));

            desktop.disconnect();
            host.disconnect();
        })
        .await;
}
