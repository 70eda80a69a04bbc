use slot_switch::test_utils::{Fixture, Grant, Reply};
use slot_switch::{Error, Gated, MIN_API_LEVEL, PartitionLayout, SupportVerdict, UnsupportedReason};

async fn check(fx: &Fixture, api_level: u32) -> Gated {
    fx.gate()
        .check_support(MIN_API_LEVEL, api_level)
        .await
        .unwrap()
}

#[test_log::test(tokio::test)]
async fn it_supports_a_rooted_ab_device() {
    for layout in [PartitionLayout::ConventionalAB, PartitionLayout::VirtualAB] {
        let fx = Fixture::builder().layout(layout).build();

        let gated = check(&fx, 30).await;

        assert_eq!(gated.verdict(), SupportVerdict::Supported);
        assert_eq!(fx.log.commands(), vec!["command -v bootctl"]);
        assert_eq!(fx.log.close_count(), 0);
    }
}

#[tokio::test]
async fn it_checks_api_level_before_anything_else() {
    for api_level in [0, 21, 24] {
        let fx = Fixture::builder()
            .layout(PartitionLayout::NonAB)
            .root_available(false)
            .grant(Grant::Denied)
            .bootctl_present(false)
            .build();

        let gated = check(&fx, api_level).await;

        assert_eq!(
            gated.verdict(),
            SupportVerdict::Unsupported(UnsupportedReason::MinApiNotMet)
        );
        assert_eq!(fx.log.open_count(), 0);
    }
}

#[tokio::test]
async fn it_accepts_the_minimum_api_level() {
    let fx = Fixture::builder().build();
    assert_eq!(check(&fx, MIN_API_LEVEL).await.verdict(), SupportVerdict::Supported);
}

#[tokio::test]
async fn it_never_asks_for_root_on_non_ab_devices() {
    let fx = Fixture::builder().layout(PartitionLayout::NonAB).build();

    let gated = check(&fx, 30).await;

    assert_eq!(
        gated.verdict(),
        SupportVerdict::Unsupported(UnsupportedReason::NoABPartitions)
    );
    assert_eq!(fx.log.open_count(), 0);
}

#[tokio::test]
async fn it_reports_missing_su_without_opening() {
    let fx = Fixture::builder().root_available(false).build();

    let gated = check(&fx, 30).await;

    assert_eq!(
        gated.verdict(),
        SupportVerdict::Unsupported(UnsupportedReason::RootUnavailable)
    );
    assert_eq!(fx.log.open_count(), 0);
}

#[tokio::test]
async fn it_tells_denied_from_unavailable() {
    let denied = Fixture::builder().grant(Grant::Denied).build();
    assert_eq!(
        check(&denied, 30).await.verdict(),
        SupportVerdict::Unsupported(UnsupportedReason::RootDenied)
    );
    assert_eq!(denied.log.open_count(), 1);
    assert!(denied.log.commands().is_empty());

    let vanished = Fixture::builder().grant(Grant::Unavailable).build();
    assert_eq!(
        check(&vanished, 30).await.verdict(),
        SupportVerdict::Unsupported(UnsupportedReason::RootUnavailable)
    );
}

#[tokio::test]
async fn it_closes_the_channel_when_bootctl_is_missing() {
    let fx = Fixture::builder().bootctl_present(false).build();

    let gated = check(&fx, 30).await;

    assert_eq!(
        gated.verdict(),
        SupportVerdict::Unsupported(UnsupportedReason::BootctlMissing)
    );
    assert_eq!(fx.log.commands(), vec!["command -v bootctl"]);
    assert_eq!(fx.log.close_count(), 1);
}

#[tokio::test]
async fn it_fails_on_root_timeout() {
    let fx = Fixture::builder().grant(Grant::Timeout).build();

    let err = fx.gate()
        .check_support(MIN_API_LEVEL, 30)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Channel(slot_switch::ChannelError::Timeout(_))));
}

#[tokio::test]
async fn it_fails_and_closes_when_the_probe_breaks() {
    let fx = Fixture::builder()
        .build()
        .with_reply("command -v bootctl", Reply::Broken);

    let err = fx.gate()
        .check_support(MIN_API_LEVEL, 30)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Channel(_)));
    assert_eq!(fx.log.close_count(), 1);
}
