use crate::integration::{init_tracing, wait_until};
use crate::utils::{FlakyStore, start_session};
use pairline_call::{Phase, Role, SessionConfig};
use pairline_core::CallId;

/// Consecutive read failures past the threshold surface a non-fatal
/// "connection trouble" flag; a successful read clears it and the call
/// carries on.
#[tokio::test(start_paused = true)]
async fn store_outage_surfaces_trouble_then_recovers() {
    init_tracing();

    let flaky = FlakyStore::new();
    let call_id = CallId::from("c1");
    let caller = start_session(
        Role::Caller,
        "alice",
        "bob",
        &call_id,
        flaky.clone(),
        SessionConfig {
            answer_timeout: None,
        },
    )
    .await;

    // Run the real polling loop for this one; trouble counting lives there.
    let _poller = caller.channel.start(caller.session.clone());
    let trouble = caller.session.relay_trouble();

    flaky.set_fail_reads(true);
    wait_until(|| *trouble.borrow()).await.expect("condition not reached");

    // Outage is absorbed: the call is degraded, not ended.
    assert_ne!(caller.session.phase().await, Phase::Ended);

    flaky.set_fail_reads(false);
    wait_until(|| !*trouble.borrow()).await.expect("condition not reached");
    assert_ne!(caller.session.phase().await, Phase::Ended);

    caller.session.hangup().await;
}
