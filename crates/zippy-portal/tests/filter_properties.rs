use proptest::collection::{btree_set, vec};
use proptest::prelude::*;
use zippy_portal::applicants::{
    apply, metrics, summarize, ApplicantRecord, FilterCriteria, GroupKey, NOT_IN_ZONE,
};

fn record_strategy() -> impl Strategy<Value = ApplicantRecord> {
    (
        prop::sample::select(vec!["CA", "NY", "IL", "TX"]),
        prop::option::of(prop::sample::select(vec!["Springfield", "oakland", "New York", "Austin"])),
        prop::option::of("[0-9]{5}"),
        prop::sample::select(vec!["541511", "722511", "238220"]),
        prop::sample::select(vec![NOT_IN_ZONE, "EZ1", "EZ-Harlem"]),
    )
        .prop_map(|(state, city, zipcode, naics, zone)| ApplicantRecord {
            state: state.to_string(),
            city: city.map(str::to_string),
            zipcode,
            naics_code: naics.to_string(),
            zone_result: zone.to_string(),
            extra: Default::default(),
        })
}

fn criteria_strategy() -> impl Strategy<Value = FilterCriteria> {
    (
        btree_set(prop::sample::select(vec!["CA", "NY", "IL", "TX"]), 0..3),
        btree_set(prop::sample::select(vec!["541511", "722511", "238220"]), 0..2),
        prop::sample::select(vec!["", "spring", "OAK", "york", " "]),
        prop::sample::select(vec!["", "9", "10", "5"]),
        any::<bool>(),
    )
        .prop_map(|(states, naics, city, zipcode, ez_only)| FilterCriteria {
            states: states.into_iter().map(str::to_string).collect(),
            naics_codes: naics.into_iter().map(str::to_string).collect(),
            city: city.to_string(),
            zipcode: zipcode.to_string(),
            ez_only,
        })
}

fn group_key_strategy() -> impl Strategy<Value = GroupKey> {
    prop::sample::select(GroupKey::ordered().to_vec())
}

proptest! {
    #[test]
    fn unset_criteria_is_identity(records in vec(record_strategy(), 0..40)) {
        let filtered = apply(&records, &FilterCriteria::default());
        let expected: Vec<&ApplicantRecord> = records.iter().collect();
        prop_assert_eq!(filtered.records(), expected.as_slice());
    }

    #[test]
    fn apply_is_idempotent(
        records in vec(record_strategy(), 0..40),
        criteria in criteria_strategy(),
    ) {
        let once = apply(&records, &criteria);
        let twice = apply(once.iter(), &criteria);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn filter_order_does_not_matter(
        records in vec(record_strategy(), 0..40),
        criteria in criteria_strategy(),
    ) {
        let states_only = FilterCriteria {
            states: criteria.states.clone(),
            ..FilterCriteria::default()
        };
        let rest = FilterCriteria {
            states: Default::default(),
            ..criteria.clone()
        };
        let staged = apply(apply(&records, &rest).iter(), &states_only);
        let reversed = apply(apply(&records, &states_only).iter(), &rest);
        let combined = apply(&records, &criteria);
        prop_assert_eq!(&staged, &combined);
        prop_assert_eq!(&reversed, &combined);
    }

    #[test]
    fn summary_counts_cover_the_selection(
        records in vec(record_strategy(), 0..40),
        criteria in criteria_strategy(),
        key in group_key_strategy(),
    ) {
        let filtered = apply(&records, &criteria);
        let summary = summarize(&filtered, key);
        prop_assert_eq!(summary.total(), filtered.len());
        prop_assert!(summary.groups.iter().all(|group| group.count > 0));
    }

    #[test]
    fn metrics_are_consistent(
        records in vec(record_strategy(), 0..40),
        criteria in criteria_strategy(),
    ) {
        let filtered = apply(&records, &criteria);
        let metrics = metrics(&filtered);
        prop_assert_eq!(metrics.count, filtered.len());
        prop_assert!(metrics.eligible_count <= metrics.count);
        prop_assert!(metrics.distinct_naics_count <= metrics.count);
        if criteria.ez_only {
            prop_assert_eq!(metrics.eligible_count, metrics.count);
        }
    }
}
