mod support;

use std::{sync::Arc, time::Duration};

use xreg_core::{
    BackendConfig, RegistryConfig, StaticBucketMetadata, SweepConfig,
    SweepReport,
};
use xreg_model::{
    Bck, BucketMetadata, BucketProps, BucketRecord, MirrorConf, Namespace,
    Provider, XactId, XactKind,
};

use support::{ais, eventually, gated_registry};

fn mirrored(bck: Bck, copies: u32) -> BucketRecord {
    BucketRecord::new(
        bck,
        BucketProps {
            mirror: MirrorConf {
                enabled: true,
                copies,
            },
        },
    )
}

fn plain(bck: Bck) -> BucketRecord {
    BucketRecord::new(bck, BucketProps::default())
}

#[tokio::test]
async fn repeated_sweeps_keep_one_job_per_bucket() {
    let (registry, _gate) = gated_registry(RegistryConfig::default());
    let bmd = BucketMetadata::new(
        3,
        vec![plain(ais("b1")), mirrored(ais("b4"), 2), plain(ais("b5"))],
    );

    let first = registry.renew_make_n_copies(&bmd, None, "mirror-sweep");
    let second = registry.renew_make_n_copies(&bmd, None, "mirror-sweep");

    assert_eq!(
        first,
        SweepReport {
            admitted: 1,
            joined: 0,
            failed: 0
        }
    );
    assert_eq!(
        second,
        SweepReport {
            admitted: 0,
            joined: 1,
            failed: 0
        }
    );
    let live = registry.find_running(Some(XactKind::MakeNCopies), None);
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].bck(), &ais("b4"));
}

#[tokio::test]
async fn sweep_walks_local_namespaces_then_configured_backends() {
    let eu = Namespace::new("", "eu");
    let config = RegistryConfig {
        backends: BackendConfig::default().with_provider(Provider::Aws, eu.clone()),
        ..RegistryConfig::default()
    };
    let (registry, _gate) = gated_registry(config);

    let remote_ais = Bck::new("b2", Provider::Ais, Namespace::new("Cl9", "prod"));
    let aws_eu = Bck::new("b3", Provider::Aws, eu);
    let aws_global = Bck::new("b4", Provider::Aws, Namespace::global());
    let gcp = Bck::new("b5", Provider::Gcp, Namespace::global());
    let bmd = BucketMetadata::new(
        9,
        vec![
            mirrored(ais("b1"), 2),
            mirrored(remote_ais.clone(), 2),
            mirrored(aws_eu.clone(), 3),
            mirrored(aws_global.clone(), 2),
            mirrored(gcp.clone(), 2),
        ],
    );

    let report = registry.renew_make_n_copies(&bmd, None, "mirror-sweep");
    assert_eq!(report.admitted, 3);
    assert_eq!(report.visited(), 3);

    for bck in [ais("b1"), remote_ais, aws_eu] {
        assert!(registry.is_running(XactKind::MakeNCopies, &bck), "{bck}");
    }
    assert!(!registry.is_running(XactKind::MakeNCopies, &aws_global));
    assert!(!registry.is_running(XactKind::MakeNCopies, &gcp));
}

#[tokio::test]
async fn one_bad_bucket_does_not_stop_the_sweep() {
    let (registry, _gate) = gated_registry(RegistryConfig::default());
    let bmd = BucketMetadata::new(
        4,
        vec![
            mirrored(ais("b1"), 2),
            mirrored(ais("broken"), 0),
            mirrored(ais("b3"), 64),
            mirrored(ais("b4"), 4),
        ],
    );

    let report = registry.renew_make_n_copies(&bmd, None, "mirror-sweep");
    assert_eq!(report.admitted, 2);
    assert_eq!(report.failed, 2);
    assert!(registry.is_running(XactKind::MakeNCopies, &ais("b4")));
}

#[tokio::test]
async fn swept_jobs_may_share_one_id() {
    let (registry, _gate) = gated_registry(RegistryConfig::default());
    let bmd = BucketMetadata::new(
        5,
        vec![mirrored(ais("b1"), 2), mirrored(ais("b2"), 2)],
    );
    let sweep_id = XactId::parse("sweep-42").expect("valid id");

    let report =
        registry.renew_make_n_copies(&bmd, Some(&sweep_id), "mirror-sweep");
    assert_eq!(report.admitted, 2);
    assert!(
        registry
            .find_running(Some(XactKind::MakeNCopies), None)
            .iter()
            .all(|xact| xact.id() == &sweep_id)
    );

    // aborting by the shared id stops the whole sweep
    assert_eq!(registry.abort(&sweep_id, "sweep cancelled"), 2);
    assert!(!registry.is_running(XactKind::MakeNCopies, &ais("b1")));
    assert!(!registry.is_running(XactKind::MakeNCopies, &ais("b2")));
    assert_eq!(registry.abort(&sweep_id, "again"), 0);
}

#[tokio::test]
async fn periodic_sweeper_follows_metadata_until_shutdown() {
    let config = RegistryConfig {
        sweep: SweepConfig {
            interval_ms: 10,
            ..SweepConfig::default()
        },
        ..RegistryConfig::default()
    };
    let (registry, _gate) = gated_registry(config);
    let source = Arc::new(StaticBucketMetadata::new(BucketMetadata::new(
        1,
        vec![mirrored(ais("b1"), 2)],
    )));

    let sweeper = registry
        .spawn_sweeper(source.clone())
        .expect("sweeping enabled");
    eventually(|| registry.is_running(XactKind::MakeNCopies, &ais("b1"))).await;

    source.replace(BucketMetadata::new(
        2,
        vec![mirrored(ais("b1"), 2), mirrored(ais("b2"), 2)],
    ));
    eventually(|| registry.is_running(XactKind::MakeNCopies, &ais("b2"))).await;
    assert_eq!(
        registry.snapshot().count(XactKind::MakeNCopies),
        2,
        "later sweeps join instead of duplicating"
    );

    registry.shutdown();
    tokio::time::timeout(Duration::from_secs(5), sweeper)
        .await
        .expect("sweeper stopped")
        .expect("sweeper task");
}

#[tokio::test]
async fn disabled_sweeper_spawns_nothing() {
    let config = RegistryConfig {
        sweep: SweepConfig {
            enabled: false,
            ..SweepConfig::default()
        },
        ..RegistryConfig::default()
    };
    let (registry, _gate) = gated_registry(config);
    let source = Arc::new(StaticBucketMetadata::new(BucketMetadata::default()));

    assert!(registry.spawn_sweeper(source).is_none());
}
