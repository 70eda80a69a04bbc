use slot_switch::switcher::{self, REBOOT_CMD};
use slot_switch::test_utils::{Fixture, ShellEvent};
use slot_switch::{Error, SlotLabel};

#[tokio::test]
async fn it_switches_from_a_to_b() {
    let fx = Fixture::builder().build();
    let mut channel = fx.open_channel().await;

    let target = switcher::switch_slot(&mut channel, "bootctl", 0).await.unwrap();

    assert_eq!(target, SlotLabel::B);
    assert_eq!(
        fx.log.events(),
        vec![
            ShellEvent::Exec("bootctl set-active-boot-slot 1".into()),
            ShellEvent::Submit(REBOOT_CMD.into()),
            ShellEvent::Close,
        ]
    );
    assert!(channel.is_closed());
}

#[tokio::test]
async fn it_switches_from_b_to_a() {
    let fx = Fixture::builder().current_slot("1").build();
    let mut channel = fx.open_channel().await;

    let target = switcher::switch_slot(&mut channel, "bootctl", 1).await.unwrap();

    assert_eq!(target, SlotLabel::A);
    assert_eq!(
        fx.log.commands(),
        vec!["bootctl set-active-boot-slot 0", REBOOT_CMD]
    );
}

#[test]
fn reboot_falls_back_to_a_forced_reboot_in_the_shell() {
    assert_eq!(REBOOT_CMD, "svc power reboot || reboot");
}

#[tokio::test]
async fn it_does_not_reboot_when_activation_fails() {
    let fx = Fixture::builder().set_active_succeeds(false).build();
    let mut channel = fx.open_channel().await;

    let err = switcher::switch_slot(&mut channel, "bootctl", 0)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Mutation { ref command, .. } if command == "bootctl set-active-boot-slot 1"));
    assert!(fx.log.submitted().is_empty());
}

#[tokio::test]
async fn it_reports_a_reboot_that_cannot_be_queued() {
    let fx = Fixture::builder().reboot_breaks(true).build();
    let mut channel = fx.open_channel().await;

    let err = switcher::switch_slot(&mut channel, "bootctl", 0)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Mutation { ref command, .. } if command == REBOOT_CMD));
}

#[tokio::test]
async fn it_refuses_indices_outside_a_and_b() {
    let fx = Fixture::builder().build();
    let mut channel = fx.open_channel().await;

    let err = switcher::switch_slot(&mut channel, "bootctl", 2)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnsupportedSlotCount { current: 2, .. }));
    assert!(fx.log.commands().is_empty());
}
