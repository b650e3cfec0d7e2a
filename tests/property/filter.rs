use proptest::prelude::*;
use resmirror::filter::{is_admitted, is_excluded_namespace, Exclusions};
use resmirror_test_utils::{object, ObjectBuilder};

fn namespace() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9-]{0,15}"
}

fn name() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9.-]{0,20}"
}

proptest! {
    #[test]
    fn test_literal_namespace_pattern_excludes_only_that_namespace(
        ns in namespace(),
        other in namespace(),
        obj_name in name(),
    ) {
        let exclusions = Exclusions::builder()
            .namespace(regex::escape(&ns))
            .build()
            .unwrap();

        prop_assert!(!is_admitted(&exclusions, "pod", &object("Pod", &ns, &obj_name)));
        prop_assert_eq!(
            is_admitted(&exclusions, "pod", &object("Pod", &other, &obj_name)),
            other != ns
        );
    }

    #[test]
    fn test_cluster_scoped_objects_ignore_namespace_patterns(obj_name in name()) {
        let exclusions = Exclusions::builder().namespace(".*").build().unwrap();
        let node = ObjectBuilder::new("Node", &obj_name).build();

        prop_assert!(!is_excluded_namespace(exclusions.namespace_patterns(), node.namespace()));
        prop_assert!(is_admitted(&exclusions, "node", &node));
    }

    #[test]
    fn test_exact_key_excludes_exactly_one_object(
        ns in namespace(),
        obj_name in name(),
        other_name in name(),
    ) {
        let exclusions = Exclusions::builder()
            .object(format!("pod:{ns}/{obj_name}"))
            .build()
            .unwrap();

        prop_assert!(!is_admitted(&exclusions, "pod", &object("Anything", &ns, &obj_name)));
        prop_assert!(is_admitted(&exclusions, "configmap", &object("Anything", &ns, &obj_name)));
        prop_assert_eq!(
            is_admitted(&exclusions, "pod", &object("Anything", &ns, &other_name)),
            other_name != obj_name
        );
    }

    #[test]
    fn test_kind_exclusion_ignores_case(kind in "[a-z]{1,12}", upper in any::<bool>()) {
        let configured = if upper { kind.to_uppercase() } else { kind.clone() };
        let exclusions = Exclusions::builder().kind(configured).build().unwrap();

        prop_assert!(!is_admitted(&exclusions, &kind, &object("X", "ns", "n")));
        prop_assert!(!is_admitted(&exclusions, &kind.to_uppercase(), &object("X", "ns", "n")));
    }
}
