use proptest::prelude::*;
use resmirror::object::{to_payload, RemoteObject};
use resmirror_test_utils::ObjectBuilder;
use serde_json::json;

fn label_map() -> impl Strategy<Value = Vec<(String, String)>> {
    proptest::collection::vec(("l-[a-z]{1,8}", "[a-z0-9]{1,8}"), 0..5)
}

proptest! {
    #[test]
    fn test_payload_never_carries_volatile_fields(
        link in "[a-z/]{1,30}",
        uid in "[a-f0-9-]{1,36}",
        rv in 0u64..1_000_000,
        generation in any::<i64>(),
        labels in label_map(),
        unabridged in any::<bool>(),
    ) {
        let mut builder = ObjectBuilder::new("Pod", "p")
            .namespace("ns")
            .resource_version(&rv.to_string())
            .status(json!({ "phase": "Running" }));
        for (k, v) in &labels {
            builder = builder.label(k, v);
        }
        let mut obj = builder.build();
        obj.metadata.self_link = Some(link);
        obj.metadata.uid = Some(uid);
        obj.metadata.generation = Some(generation);

        let yaml = String::from_utf8(to_payload(&obj, unabridged).unwrap()).unwrap();

        for field in ["selfLink:", "uid:", "resourceVersion:", "generation:"] {
            prop_assert!(!yaml.contains(field), "{} in {}", field, yaml);
        }
        prop_assert_eq!(yaml.contains("status:"), unabridged);

        // What remains still describes the same object.
        let back: RemoteObject = serde_yaml::from_str(&yaml).unwrap();
        prop_assert_eq!(back.key().unwrap(), "ns/p");
        prop_assert_eq!(back.metadata.labels, obj.metadata.labels);
    }
}
