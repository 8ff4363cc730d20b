/// Property-based tests for the resource allocator
///
/// These tests generate random used-sets and bound ports and verify:
/// - An allocated value is never already in use
/// - Ports never go below the base or below the highest recorded port
/// - Redis databases and subnet octets fill the lowest gap first
/// - A bundle allocated against a registry collides with no record in it
use proptest::prelude::*;
use std::collections::BTreeSet;
use turbine::allocator::{
    allocate, next_port, next_redis_db, next_subnet_octet, unique_database_name,
    FIRST_PROJECT_OCTET, LAST_PROJECT_OCTET,
};
use turbine::{ProjectKind, ProjectOptions, ProjectRecord, Registry, Settings, StaticProbe};

/// Strategy for a used-set of ports near a base
fn port_set_strategy(base: u16) -> impl Strategy<Value = BTreeSet<u16>> {
    prop::collection::btree_set(base - 20..base + 60, 0..30)
}

/// Strategy for registries built from arbitrary (possibly sparse) records
fn registry_strategy() -> impl Strategy<Value = Registry> {
    let record = (
        prop::option::of(8080u16..8120),
        prop::option::of(5555u16..5600),
        prop::option::of(0u32..40),
        prop::option::of(2u8..60),
        "[a-z]{1,4}",
    );
    prop::collection::vec(record, 0..20).prop_map(|records| {
        let mut registry = Registry::new();
        for (i, (web, flower, redis, octet, db)) in records.into_iter().enumerate() {
            let json = serde_json::json!({
                "kind": "oss",
                "webserver": web,
                "flower": flower,
                "redisdb": redis,
                "network": octet.map(|o| format!("172.27.{}", o)),
                "db_name": format!("{}db", db),
            });
            let record: ProjectRecord = serde_json::from_value(json).expect("valid record");
            registry.insert(format!("p{}-oss-airflow", i), record);
        }
        registry
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_next_port_is_fresh_and_above_used(
        used in port_set_strategy(8080),
        bound in prop::collection::btree_set(8060u16..8200, 0..20),
    ) {
        let probe = StaticProbe::new(bound.iter().copied());
        let port = next_port(8080, &used, &probe).unwrap();

        prop_assert!(!used.contains(&port));
        prop_assert!(!bound.contains(&port));
        prop_assert!(port >= 8080);
        if let Some(&max) = used.last() {
            prop_assert!(port > max);
        }
        // Nothing between the start point and the result was free.
        let start = used.last().map(|&m| m + 1).unwrap_or(0).max(8080);
        for skipped in start..port {
            prop_assert!(bound.contains(&skipped) || used.contains(&skipped));
        }
    }

    #[test]
    fn prop_next_redis_db_is_lowest_gap(used in prop::collection::btree_set(0u32..64, 0..30)) {
        let db = next_redis_db(&used);
        prop_assert!(!used.contains(&db));
        for lower in 0..db {
            prop_assert!(used.contains(&lower));
        }
    }

    #[test]
    fn prop_next_subnet_octet_is_lowest_gap(used in prop::collection::btree_set(0u8..=255, 0..100)) {
        match next_subnet_octet(&used) {
            Ok(octet) => {
                prop_assert!((FIRST_PROJECT_OCTET..=LAST_PROJECT_OCTET).contains(&octet));
                prop_assert!(!used.contains(&octet));
                for lower in FIRST_PROJECT_OCTET..octet {
                    prop_assert!(used.contains(&lower));
                }
            }
            Err(_) => {
                for octet in FIRST_PROJECT_OCTET..=LAST_PROJECT_OCTET {
                    prop_assert!(used.contains(&octet));
                }
            }
        }
    }

    #[test]
    fn prop_unique_database_name_avoids_used(
        used in prop::collection::btree_set("[a-c]{1,2}[2-4]?db", 0..12),
        derived in "[a-c]{1,2}db",
    ) {
        let used: BTreeSet<&str> = used.iter().map(String::as_str).collect();
        let name = unique_database_name(&derived, &used);
        prop_assert!(!used.contains(name.as_str()));
        prop_assert!(name.len() <= 63);
        prop_assert!(name.ends_with("db"));
    }

    #[test]
    fn prop_allocated_bundle_collides_with_nothing(registry in registry_strategy()) {
        let settings = Settings::default();
        let bundle = allocate(&registry, &settings, &StaticProbe::none(), "new-oss-airflow", false)
            .unwrap();

        for (_, record) in registry.iter() {
            prop_assert_ne!(record.webserver, Some(bundle.webserver_port));
            prop_assert_ne!(record.flower, Some(bundle.flower_port));
            prop_assert_ne!(record.redisdb, Some(bundle.redis_db));
            prop_assert_ne!(record.subnet_octet(), Some(bundle.subnet_octet));
            prop_assert_ne!(record.db_name.as_deref(), Some(bundle.database_name.as_str()));
        }
        prop_assert_eq!(bundle.code_port, None);
    }
}

#[test]
fn test_sparse_record_loads_with_defaults() {
    let mut registry = Registry::new();
    registry.insert(
        "x-oss-airflow",
        serde_json::from_str::<ProjectRecord>(r#"{"type": "oss"}"#).unwrap(),
    );
    assert_eq!(registry.get("x-oss-airflow").unwrap().kind, ProjectKind::Oss);
    assert_eq!(registry.get("x-oss-airflow").unwrap().options(), ProjectOptions::default());
}
