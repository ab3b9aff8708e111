mod support;

use futures::SinkExt;
use serde_json::json;
use std::time::Duration;
use tokio_tungstenite::tungstenite::{Message, protocol::frame::coding::CloseCode};

async fn handshake(client: &mut support::Client) -> String {
    let identity = support::next_json(client).await;
    assert_eq!(identity["type"], "Identity");
    identity["data"]["craft_id"]
        .as_str()
        .expect("craft id should be a string")
        .to_string()
}

#[tokio::test]
async fn when_client_connects_then_it_gets_identity_then_arena_info() {
    let mut client = support::connect().await;

    let craft_id = handshake(&mut client).await;
    assert!(!craft_id.is_empty());

    let arena = support::next_json(&mut client).await;
    assert_eq!(
        arena,
        json!({
            "type": "ArenaInfo",
            "data": { "center": { "x": 500.0, "y": 500.0 }, "radius": 3000.0 }
        })
    );
}

#[tokio::test]
async fn when_client_joins_then_world_updates_include_its_craft_at_center() {
    let mut client = support::connect().await;
    let craft_id = handshake(&mut client).await;
    let _arena = support::next_json(&mut client).await;

    let update = support::wait_for(&mut client, "WorldUpdate", |data| {
        data["crafts"].get(&craft_id).is_some()
    })
    .await;

    let craft = &update["crafts"][&craft_id];
    assert_eq!(craft["x"], 500.0);
    assert_eq!(craft["y"], 500.0);
    assert_eq!(craft["vel"], 0.0);
    assert_eq!(craft["rot"], -90.0);
    assert!(update["projectiles"].is_array());
}

#[tokio::test]
async fn when_client_sends_accelerate_then_its_velocity_grows() {
    let mut client = support::connect().await;
    let craft_id = handshake(&mut client).await;
    let _arena = support::next_json(&mut client).await;

    client
        .send(Message::text(
            json!({ "type": "Input", "data": { "accelerate": true } }).to_string(),
        ))
        .await
        .expect("send input");

    support::wait_for(&mut client, "WorldUpdate", |data| {
        data["crafts"][&craft_id]["vel"]
            .as_f64()
            .is_some_and(|vel| vel >= 2.0)
    })
    .await;

    // Releasing every flag keeps the current speed.
    client
        .send(Message::text(json!({ "type": "Input", "data": {} }).to_string()))
        .await
        .expect("send release");
}

#[tokio::test]
async fn when_client_disconnects_then_its_craft_disappears_for_others() {
    let mut leaving = support::connect().await;
    let leaving_id = handshake(&mut leaving).await;

    let mut watcher = support::connect().await;
    let _watcher_id = handshake(&mut watcher).await;
    let _arena = support::next_json(&mut watcher).await;

    support::wait_for(&mut watcher, "WorldUpdate", |data| {
        data["crafts"].get(&leaving_id).is_some()
    })
    .await;

    leaving.close(None).await.expect("close");
    drop(leaving);

    support::wait_for(&mut watcher, "WorldUpdate", |data| {
        data["crafts"].get(&leaving_id).is_none()
    })
    .await;
}

#[tokio::test]
async fn when_client_sends_binary_then_server_closes_with_unsupported() {
    let mut client = support::connect().await;
    let _craft_id = handshake(&mut client).await;

    client
        .send(Message::binary(vec![1u8, 2, 3]))
        .await
        .expect("send binary");

    let frame = support::wait_for_close(&mut client)
        .await
        .expect("close frame should carry a code");
    assert_eq!(frame.code, CloseCode::Unsupported);
}

#[tokio::test]
async fn when_client_sends_more_than_ten_invalid_messages_then_server_closes_with_policy() {
    let mut client = support::connect().await;
    let _craft_id = handshake(&mut client).await;

    for _ in 0..11 {
        client
            .send(Message::text("not json"))
            .await
            .expect("send invalid message");
    }

    let frame = support::wait_for_close(&mut client)
        .await
        .expect("close frame should carry a code");
    assert_eq!(frame.code, CloseCode::Policy);
}

#[tokio::test]
async fn when_client_sends_ten_invalid_messages_then_connection_stays_open() {
    let mut client = support::connect().await;
    let craft_id = handshake(&mut client).await;

    for _ in 0..10 {
        client
            .send(Message::text(r#"{"type":"Fly"}"#))
            .await
            .expect("send invalid message");
    }
    client
        .send(Message::text(
            json!({ "type": "Input", "data": { "accelerate": true } }).to_string(),
        ))
        .await
        .expect("send input");

    support::wait_for(&mut client, "WorldUpdate", |data| {
        data["crafts"][&craft_id]["vel"]
            .as_f64()
            .is_some_and(|vel| vel >= 1.0)
    })
    .await;
}

#[tokio::test]
async fn when_craft_leaves_the_arena_then_only_its_owner_is_told_once() {
    let mut owner = support::connect().await;
    let owner_id = handshake(&mut owner).await;
    let _arena = support::next_json(&mut owner).await;

    let mut watcher = support::connect().await;
    let watcher_id = handshake(&mut watcher).await;
    let _arena = support::next_json(&mut watcher).await;

    // Flying straight out of a 3000 unit arena takes under 80 ticks.
    owner
        .send(Message::text(
            json!({ "type": "Input", "data": { "accelerate": true } }).to_string(),
        ))
        .await
        .expect("send input");

    let destroyed = tokio::time::timeout(
        Duration::from_secs(15),
        support::wait_for(&mut owner, "Destroyed", |_| true),
    )
    .await
    .expect("owner should be told about the destruction");
    assert_eq!(destroyed["craft_id"], owner_id.as_str());

    // Input for a destroyed craft is ignored and never brings it back.
    owner
        .send(Message::text(
            json!({ "type": "Input", "data": { "decelerate": true } }).to_string(),
        ))
        .await
        .expect("socket stays open after destruction");

    // Updates queued before the notice may still show the craft; once it is
    // gone it must stay gone, and no second notice may follow.
    let mut gone = false;
    let mut updates_after = 0;
    while updates_after < 10 {
        let msg = support::next_json(&mut owner).await;
        assert_ne!(msg["type"], "Destroyed", "notice must arrive only once");
        if msg["type"] != "WorldUpdate" {
            continue;
        }
        let present = msg["data"]["crafts"].get(&owner_id).is_some();
        if gone {
            assert!(!present, "destroyed craft came back");
            updates_after += 1;
        } else if !present {
            gone = true;
        }
    }

    // The watcher sees the craft vanish but never gets a notice itself.
    let mut seen_owner = false;
    loop {
        let msg = support::next_json(&mut watcher).await;
        assert_ne!(msg["type"], "Destroyed", "only the owner is notified");
        if msg["type"] != "WorldUpdate" {
            continue;
        }
        if msg["data"]["crafts"].get(&owner_id).is_some() {
            seen_owner = true;
        } else if seen_owner {
            break;
        }
    }
    assert_ne!(watcher_id, owner_id);
}
