//! End-to-end lock flows through `VaultGate`.

mod common;

use common::{locked_vault, mount, ScriptedBiometrics};
use vaultgate_common::{Error, PreconditionError, ValidationError};
use vaultgate_storage::MemoryStore;
use vaultgate_vault::{
    ChallengeOutcome, LockEvent, LockReason, LockState, UnlockMethod, UnlockOutcome,
};

#[tokio::test]
async fn test_fresh_install_setup_unlocks() {
    let store = MemoryStore::new();
    let gate = mount(&store, ScriptedBiometrics::without_hardware()).await;
    assert_eq!(gate.state().await, LockState::Uninitialized);

    gate.setup_pin("1234", "1234").await.unwrap();

    assert_eq!(gate.state().await, LockState::Unlocked);
    assert!(gate.settings().await.unwrap().has_pin);
    assert!(gate.session().await.is_some());
}

#[tokio::test]
async fn test_short_pin_setup_rejected() {
    let store = MemoryStore::new();
    let gate = mount(&store, ScriptedBiometrics::without_hardware()).await;

    let err = gate.setup_pin("12", "12").await.unwrap_err();
    assert!(matches!(
        err,
        Error::Validation(ValidationError::TooShort { min: 4 })
    ));
    assert_eq!(gate.state().await, LockState::Uninitialized);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_setup_validation_never_writes() {
    let store = MemoryStore::new();
    let gate = mount(&store, ScriptedBiometrics::without_hardware()).await;

    for (pin, confirm) in [
        ("", ""),
        ("123", "123"),
        ("123456789", "123456789"),
        ("12ab", "12ab"),
        ("1234", "4321"),
        ("١٢٣٤", "١٢٣٤"),
    ] {
        assert!(gate.setup_pin(pin, confirm).await.is_err(), "{:?}", pin);
        assert!(store.is_empty());
    }
    gate.setup_pin("12345678", "12345678").await.unwrap();
}

#[tokio::test]
async fn test_three_wrong_pins_show_lockout() {
    let (gate, _) = locked_vault("1234", ScriptedBiometrics::without_hardware()).await;
    let mut events = gate.subscribe();

    assert_eq!(
        gate.verify_pin("0000").await.unwrap(),
        UnlockOutcome::Rejected {
            attempts_remaining: 2
        }
    );
    assert_eq!(gate.state().await, LockState::Locked { failed_attempts: 1 });
    gate.verify_pin("0000").await.unwrap();
    assert_eq!(gate.state().await, LockState::Locked { failed_attempts: 2 });

    match gate.verify_pin("0000").await.unwrap() {
        UnlockOutcome::LockedOut { message, .. } => {
            assert!(message.starts_with("Too many failed attempts"))
        }
        other => panic!("expected lockout, got {:?}", other),
    }
    assert_eq!(gate.state().await, LockState::Locked { failed_attempts: 0 });

    assert!(matches!(
        events.recv().await.unwrap(),
        LockEvent::AttemptRejected {
            attempts_remaining: 2
        }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        LockEvent::AttemptRejected {
            attempts_remaining: 1
        }
    ));
    assert!(matches!(
        events.recv().await.unwrap(),
        LockEvent::LockedOut { .. }
    ));
}

#[tokio::test]
async fn test_correct_pin_resets_attempts() {
    for wrong in 0..3 {
        let (gate, _) = locked_vault("5678", ScriptedBiometrics::without_hardware()).await;
        for _ in 0..wrong {
            gate.verify_pin("1111").await.unwrap();
        }
        assert_eq!(
            gate.verify_pin("5678").await.unwrap(),
            UnlockOutcome::Unlocked
        );
        assert_eq!(gate.failed_attempts().await, 0);
        gate.lock().await;
        assert_eq!(gate.state().await, LockState::Locked { failed_attempts: 0 });
    }
}

#[tokio::test]
async fn test_lock_while_locked_is_noop() {
    let (gate, _) = locked_vault("1234", ScriptedBiometrics::without_hardware()).await;
    gate.verify_pin("9999").await.unwrap();

    assert!(!gate.lock().await);
    assert_eq!(gate.state().await, LockState::Locked { failed_attempts: 1 });
}

#[tokio::test]
async fn test_cold_mount_biometric_unlocks() {
    let biometrics = ScriptedBiometrics::with_hardware();
    let (gate, store) = locked_vault("1234", biometrics.clone()).await;

    gate.verify_pin("1234").await.unwrap();
    biometrics.answer(true);
    gate.set_biometric_enabled(true).await.unwrap();
    drop(gate);

    biometrics.answer(true);
    let gate = mount(&store, biometrics.clone()).await;

    assert_eq!(gate.state().await, LockState::Unlocked);
    assert_eq!(biometrics.prompts(), 2);
    assert_eq!(
        biometrics.reasons(),
        vec![
            "Enable biometric unlock for Vault".to_string(),
            "Unlock Vault".to_string()
        ]
    );
}

#[tokio::test]
async fn test_auto_biometric_runs_once() {
    let biometrics = ScriptedBiometrics::with_hardware();
    let (gate, store) = locked_vault("1234", biometrics.clone()).await;
    gate.verify_pin("1234").await.unwrap();
    biometrics.answer(true);
    gate.set_biometric_enabled(true).await.unwrap();
    drop(gate);

    // Declined on mount: stay locked, no retry
    biometrics.answer(false);
    let gate = mount(&store, biometrics.clone()).await;
    assert_eq!(gate.state().await, LockState::Locked { failed_attempts: 0 });
    assert_eq!(biometrics.prompts(), 2);

    // Explicit retry
    biometrics.answer(true);
    assert_eq!(
        gate.unlock_with_biometric().await.unwrap(),
        UnlockOutcome::Unlocked
    );

    // Locking again does not trigger another automatic prompt
    gate.lock().await;
    assert_eq!(biometrics.prompts(), 3);
}

#[tokio::test]
async fn test_biometric_platform_error_falls_back_to_pin() {
    let biometrics = ScriptedBiometrics::with_hardware();
    let (gate, _) = locked_vault("1234", biometrics.clone()).await;
    gate.verify_pin("1234").await.unwrap();
    biometrics.answer(true);
    gate.set_biometric_enabled(true).await.unwrap();
    gate.lock().await;

    biometrics.fail_next();
    assert_eq!(
        gate.unlock_with_biometric().await.unwrap(),
        UnlockOutcome::BiometricDeclined(ChallengeOutcome::Unavailable)
    );
    assert_eq!(gate.state().await, LockState::Locked { failed_attempts: 0 });
    assert_eq!(
        gate.verify_pin("1234").await.unwrap(),
        UnlockOutcome::Unlocked
    );
}

#[tokio::test]
async fn test_biometric_requires_pin() {
    let store = MemoryStore::new();
    let gate = mount(&store, ScriptedBiometrics::with_hardware()).await;

    let err = gate.set_biometric_enabled(true).await.unwrap_err();
    assert!(matches!(err, Error::Precondition(PreconditionError::NoPinSet)));
    assert_eq!(err.reason_code(), "NoPinSet");
}

#[tokio::test]
async fn test_biometric_hardware_checked_first() {
    let store = MemoryStore::new();
    let gate = mount(&store, ScriptedBiometrics::without_hardware()).await;

    let err = gate.set_biometric_enabled(true).await.unwrap_err();
    assert_eq!(err.reason_code(), "HardwareUnavailable");
}

#[tokio::test]
async fn test_biometric_enable_needs_successful_challenge() {
    let biometrics = ScriptedBiometrics::with_hardware();
    let (gate, _) = locked_vault("1234", biometrics.clone()).await;
    gate.verify_pin("1234").await.unwrap();

    biometrics.answer(false);
    assert!(matches!(
        gate.set_biometric_enabled(true).await,
        Err(Error::AuthenticationFailure)
    ));
    assert!(!gate.settings().await.unwrap().biometric_enabled);
}

#[tokio::test]
async fn test_remove_pin_clears_biometric() {
    let biometrics = ScriptedBiometrics::with_hardware();
    let (gate, _) = locked_vault("1234", biometrics.clone()).await;
    gate.verify_pin("1234").await.unwrap();
    biometrics.answer(true);
    gate.set_biometric_enabled(true).await.unwrap();
    assert!(gate.settings().await.unwrap().biometric_enabled);

    gate.remove_pin().await.unwrap();

    let settings = gate.settings().await.unwrap();
    assert!(!settings.has_pin);
    assert!(!settings.biometric_enabled);
    assert_eq!(gate.state().await, LockState::Uninitialized);
}

#[tokio::test]
async fn test_remove_pin_write_failure_keeps_state() {
    let (gate, store) = locked_vault("1234", ScriptedBiometrics::without_hardware()).await;
    gate.verify_pin("1234").await.unwrap();

    store.set_fail_writes(true);
    assert_eq!(
        gate.remove_pin().await.unwrap_err().reason_code(),
        "StorageFailure"
    );
    assert_eq!(gate.state().await, LockState::Unlocked);
    store.set_fail_writes(false);
    assert!(gate.settings().await.unwrap().has_pin);
}

#[tokio::test]
async fn test_change_pin_flow() {
    let (gate, _) = locked_vault("1234", ScriptedBiometrics::without_hardware()).await;
    gate.verify_pin("1234").await.unwrap();
    let mut events = gate.subscribe();

    gate.begin_pin_change().await.unwrap();
    assert!(matches!(
        gate.verify_current_pin("0000").await,
        Err(Error::Precondition(PreconditionError::IncorrectCurrentPin))
    ));
    gate.verify_current_pin("1234").await.unwrap();
    assert!(matches!(
        gate.commit_pin_change("5678", "8765").await,
        Err(Error::Validation(ValidationError::Mismatch))
    ));
    gate.commit_pin_change("5678", "5678").await.unwrap();
    assert_eq!(events.recv().await.unwrap(), LockEvent::PinChanged);

    gate.lock().await;
    assert!(matches!(
        gate.verify_pin("1234").await.unwrap(),
        UnlockOutcome::Rejected { .. }
    ));
    assert_eq!(
        gate.verify_pin("5678").await.unwrap(),
        UnlockOutcome::Unlocked
    );
}

#[tokio::test]
async fn test_lock_during_change_returns_to_locked() {
    let (gate, _) = locked_vault("1234", ScriptedBiometrics::without_hardware()).await;
    gate.verify_pin("1234").await.unwrap();
    gate.begin_pin_change().await.unwrap();

    assert!(gate.lock().await);
    assert_eq!(gate.state().await, LockState::Locked { failed_attempts: 0 });
}

#[tokio::test]
async fn test_keypad_entry() {
    let (gate, _) = locked_vault("2580", ScriptedBiometrics::without_hardware()).await;

    for d in "2581".chars() {
        gate.enter_digit(d).await.unwrap();
    }
    assert!(matches!(
        gate.submit_entry().await.unwrap(),
        UnlockOutcome::Rejected { .. }
    ));

    for d in "2580".chars() {
        gate.enter_digit(d).await.unwrap();
    }
    assert_eq!(gate.submit_entry().await.unwrap(), UnlockOutcome::Unlocked);
}

#[tokio::test]
async fn test_unlock_event_carries_method() {
    let (gate, _) = locked_vault("1234", ScriptedBiometrics::without_hardware()).await;
    let mut events = gate.subscribe();

    gate.verify_pin("1234").await.unwrap();
    gate.lock().await;

    match events.recv().await.unwrap() {
        LockEvent::Unlocked { method, .. } => assert_eq!(method, UnlockMethod::Pin),
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(
        events.recv().await.unwrap(),
        LockEvent::Locked {
            reason: LockReason::Manual
        }
    );
}
