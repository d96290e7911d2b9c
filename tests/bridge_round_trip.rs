mod support;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use support::ScriptedAgent;
use tether::{AgentStatus, Error, IncomingCallback, Publish, QoS, UserContext};

const OP_TIMEOUT: Duration = Duration::from_secs(2);

fn telemetry(payload: &[u8]) -> Publish {
    Publish::new("device/telemetry", payload.to_vec(), QoS::AtLeastOnce)
}

#[test]
fn publish_passes_scripted_status_through() {
    let agent = ScriptedAgent::new();
    let ctx = UserContext::new(0).unwrap();

    assert_eq!(ctx.publish(&agent, telemetry(b"ok"), OP_TIMEOUT), Ok(()));

    agent.set_status(AgentStatus::Refused);
    assert_eq!(
        ctx.publish(&agent, telemetry(b"refused"), OP_TIMEOUT),
        Err(Error::Agent(AgentStatus::Refused))
    );
}

#[test]
fn queued_subscription_round_trip() {
    let agent = ScriptedAgent::new();
    let ctx = UserContext::new(4).unwrap();

    ctx.subscribe_queued(&agent, "device/commands", QoS::AtLeastOnce, OP_TIMEOUT)
        .unwrap();
    assert!(agent.is_subscribed("device/commands"));

    assert!(agent.deliver("device/commands", b"a", QoS::AtLeastOnce));
    assert!(agent.deliver("device/commands", b"b", QoS::AtLeastOnce));

    let first = ctx.recv_incoming(OP_TIMEOUT).unwrap();
    assert_eq!(first.topic(), "device/commands");
    assert_eq!(first.payload(), b"a");
    let second = ctx.recv_incoming(OP_TIMEOUT).unwrap();
    assert_eq!(second.payload(), b"b");
    ctx.release(first, false);
    ctx.release(second, false);

    ctx.unsubscribe_queued(&agent, "device/commands", OP_TIMEOUT)
        .unwrap();
    assert!(!agent.is_subscribed("device/commands"));

    // Nothing left to route the publish: it is unsolicited now.
    assert!(!agent.deliver("device/commands", b"late", QoS::AtLeastOnce));
    assert!(ctx.recv_incoming(Duration::ZERO).is_none());
}

#[test]
fn failed_subscribe_leaves_registry_unchanged() {
    let agent = ScriptedAgent::new();
    let ctx = UserContext::new(2).unwrap();

    agent.set_status(AgentStatus::Refused);
    assert_eq!(
        ctx.subscribe_queued(&agent, "device/denied", QoS::AtLeastOnce, OP_TIMEOUT),
        Err(Error::Agent(AgentStatus::Refused))
    );
    assert!(!agent.is_subscribed("device/denied"));
}

#[test]
fn failed_unsubscribe_keeps_subscription() {
    let agent = ScriptedAgent::new();
    let ctx = UserContext::new(2).unwrap();

    ctx.subscribe_queued(&agent, "device/sticky", QoS::AtLeastOnce, OP_TIMEOUT)
        .unwrap();

    agent.set_status(AgentStatus::SendFailed);
    assert_eq!(
        ctx.unsubscribe_queued(&agent, "device/sticky", OP_TIMEOUT),
        Err(Error::Agent(AgentStatus::SendFailed))
    );
    assert!(agent.is_subscribed("device/sticky"));

    agent.set_status(AgentStatus::Success);
    ctx.unsubscribe_queued(&agent, "device/sticky", OP_TIMEOUT)
        .unwrap();
    assert!(!agent.is_subscribed("device/sticky"));
}

#[test]
fn exhausted_pool_sheds_newest_message() {
    let agent = ScriptedAgent::new();
    let ctx = UserContext::new(1).unwrap();

    ctx.subscribe_queued(&agent, "device/burst", QoS::AtMostOnce, OP_TIMEOUT)
        .unwrap();

    // Both deliveries are "handled" by the subscription; the second is shed
    // by the dispatcher because the one slot is still in the incoming queue.
    assert!(agent.deliver("device/burst", b"kept", QoS::AtMostOnce));
    assert!(agent.deliver("device/burst", b"shed", QoS::AtMostOnce));

    assert_eq!(ctx.pending_incoming(), 1);
    assert_eq!(ctx.dropped_messages(), 1);

    let slot = ctx.recv_incoming(OP_TIMEOUT).unwrap();
    assert_eq!(slot.payload(), b"kept");
    ctx.release(slot, false);
}

#[test]
fn caller_supplied_callback_subscription() {
    let agent = ScriptedAgent::new();
    let ctx = UserContext::new(0).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let on_message: IncomingCallback = Arc::new(move |publish| {
        sink.lock().unwrap().push(publish.payload.to_vec());
    });

    ctx.subscribe(&agent, "sensors/+", QoS::AtMostOnce, on_message, OP_TIMEOUT)
        .unwrap();

    assert!(agent.deliver("sensors/temp", b"21.5", QoS::AtMostOnce));
    assert!(agent.deliver("sensors/humidity", b"40", QoS::AtMostOnce));
    assert!(!agent.deliver("actuators/valve", b"open", QoS::AtMostOnce));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.as_slice(), &[b"21.5".to_vec(), b"40".to_vec()]);
}

#[test]
fn blocked_receiver_wakes_on_delivery() {
    let agent = ScriptedAgent::new();
    let ctx = UserContext::new(2).unwrap();

    ctx.subscribe_queued(&agent, "device/slow", QoS::AtLeastOnce, OP_TIMEOUT)
        .unwrap();

    let receiver_ctx = Arc::clone(&ctx);
    let handle = std::thread::spawn(move || receiver_ctx.recv_incoming(Duration::from_secs(5)));

    // Let the receiver block, then deliver.
    std::thread::sleep(Duration::from_millis(50));
    assert!(agent.deliver("device/slow", b"finally", QoS::AtLeastOnce));

    let slot = handle.join().unwrap().expect("receiver woke with a message");
    assert_eq!(slot.payload(), b"finally");
    ctx.release(slot, false);
}
