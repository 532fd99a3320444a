//! Auto-lock timer and lifecycle behaviour under paused time.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{locked_vault, ScriptedBiometrics};
use vaultgate_common::{Error, PinRules};
use vaultgate_crypto::KdfParams;
use vaultgate_vault::{
    AutoLockPolicy, CredentialStore, LifecycleEvent, LockEvent, LockReason, LockState,
};

const MINUTE: Duration = Duration::from_secs(60);

#[tokio::test(start_paused = true)]
async fn test_locks_after_five_minutes_not_before() {
    let (gate, _) = locked_vault("1234", ScriptedBiometrics::without_hardware()).await;
    gate.verify_pin("1234").await.unwrap();

    tokio::time::sleep(5 * MINUTE - Duration::from_secs(1)).await;
    assert_eq!(gate.state().await, LockState::Unlocked);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(gate.state().await, LockState::Locked { failed_attempts: 0 });
}

#[tokio::test(start_paused = true)]
async fn test_timeout_emits_locked_event() {
    let (gate, _) = locked_vault("1234", ScriptedBiometrics::without_hardware()).await;
    gate.set_auto_lock_policy(AutoLockPolicy::Minutes(1))
        .await
        .unwrap();
    gate.verify_pin("1234").await.unwrap();
    let mut events = gate.subscribe();

    tokio::time::sleep(MINUTE + Duration::from_secs(1)).await;

    assert_eq!(
        events.recv().await.unwrap(),
        LockEvent::Locked {
            reason: LockReason::Timeout
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_activity_postpones_lock() {
    let (gate, _) = locked_vault("1234", ScriptedBiometrics::without_hardware()).await;
    gate.set_auto_lock_policy(AutoLockPolicy::Minutes(1))
        .await
        .unwrap();
    gate.verify_pin("1234").await.unwrap();

    tokio::time::sleep(Duration::from_secs(50)).await;
    gate.record_activity().await;
    tokio::time::sleep(Duration::from_secs(50)).await;
    assert_eq!(gate.state().await, LockState::Unlocked);

    tokio::time::sleep(Duration::from_secs(11)).await;
    assert!(gate.state().await.is_locked());
}

#[tokio::test(start_paused = true)]
async fn test_relock_and_unlock_ignores_old_timer() {
    let (gate, _) = locked_vault("1234", ScriptedBiometrics::without_hardware()).await;
    gate.set_auto_lock_policy(AutoLockPolicy::Minutes(1))
        .await
        .unwrap();
    gate.verify_pin("1234").await.unwrap();

    tokio::time::sleep(Duration::from_secs(40)).await;
    gate.lock().await;
    gate.verify_pin("1234").await.unwrap();

    // The first timer would have fired at 60s
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(gate.state().await, LockState::Unlocked);

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(gate.state().await.is_locked());
}

#[tokio::test(start_paused = true)]
async fn test_never_policy_stays_unlocked() {
    let (gate, _) = locked_vault("1234", ScriptedBiometrics::without_hardware()).await;
    gate.set_auto_lock_policy(AutoLockPolicy::Never)
        .await
        .unwrap();
    gate.verify_pin("1234").await.unwrap();

    tokio::time::sleep(24 * 60 * MINUTE).await;
    assert!(!gate.on_lifecycle(LifecycleEvent::Background).await);
    assert_eq!(gate.state().await, LockState::Unlocked);
}

#[tokio::test(start_paused = true)]
async fn test_policy_change_rearms_unlocked_vault() {
    let (gate, _) = locked_vault("1234", ScriptedBiometrics::without_hardware()).await;
    gate.verify_pin("1234").await.unwrap();

    tokio::time::sleep(4 * MINUTE).await;
    gate.set_auto_lock_policy(AutoLockPolicy::Minutes(15))
        .await
        .unwrap();

    // The original five-minute deadline no longer applies
    tokio::time::sleep(2 * MINUTE).await;
    assert_eq!(gate.state().await, LockState::Unlocked);

    tokio::time::sleep(14 * MINUTE).await;
    assert!(gate.state().await.is_locked());
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_minutes_keep_current_timer() {
    let (gate, _) = locked_vault("1234", ScriptedBiometrics::without_hardware()).await;
    gate.verify_pin("1234").await.unwrap();

    for minutes in [0, 7] {
        let err = gate
            .set_auto_lock_policy(AutoLockPolicy::Minutes(minutes))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(gate.state().await, LockState::Unlocked);
    assert_eq!(
        gate.settings().await.unwrap().auto_lock_policy,
        AutoLockPolicy::Minutes(5)
    );

    tokio::time::sleep(5 * MINUTE).await;
    assert!(gate.state().await.is_locked());
}

#[tokio::test]
async fn test_lifecycle_reads_policy_written_elsewhere() {
    let (gate, store) = locked_vault("1234", ScriptedBiometrics::without_hardware()).await;
    gate.verify_pin("1234").await.unwrap();
    assert!(!gate.on_lifecycle(LifecycleEvent::Background).await);

    let settings_screen = CredentialStore::new(
        Arc::new(store.clone()),
        PinRules::default(),
        KdfParams::testing(),
    );
    settings_screen
        .set_auto_lock_policy(AutoLockPolicy::Immediate)
        .await
        .unwrap();

    assert!(gate.on_lifecycle(LifecycleEvent::Background).await);
    assert!(gate.state().await.is_locked());
}

#[tokio::test]
async fn test_immediate_locks_on_background() {
    let (gate, _) = locked_vault("1234", ScriptedBiometrics::without_hardware()).await;
    gate.set_auto_lock_policy(AutoLockPolicy::Immediate)
        .await
        .unwrap();
    gate.verify_pin("1234").await.unwrap();
    let mut events = gate.subscribe();

    assert!(!gate.on_lifecycle(LifecycleEvent::FocusGained).await);
    assert!(gate.on_lifecycle(LifecycleEvent::Background).await);
    assert_eq!(gate.state().await, LockState::Locked { failed_attempts: 0 });
    assert_eq!(
        events.recv().await.unwrap(),
        LockEvent::Locked {
            reason: LockReason::Background
        }
    );
}

#[tokio::test]
async fn test_immediate_locks_on_focus_lost() {
    let (gate, _) = locked_vault("1234", ScriptedBiometrics::without_hardware()).await;
    gate.set_auto_lock_policy(AutoLockPolicy::Immediate)
        .await
        .unwrap();
    gate.verify_pin("1234").await.unwrap();

    assert!(gate.on_lifecycle(LifecycleEvent::FocusLost).await);
    assert!(gate.state().await.is_locked());
}

#[tokio::test]
async fn test_timed_policy_ignores_background() {
    let (gate, _) = locked_vault("1234", ScriptedBiometrics::without_hardware()).await;
    gate.verify_pin("1234").await.unwrap();

    assert!(!gate.on_lifecycle(LifecycleEvent::Background).await);
    assert_eq!(gate.state().await, LockState::Unlocked);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_gate_timer_is_harmless() {
    let (gate, _) = locked_vault("1234", ScriptedBiometrics::without_hardware()).await;
    gate.verify_pin("1234").await.unwrap();
    drop(gate);

    tokio::time::sleep(10 * MINUTE).await;
}
