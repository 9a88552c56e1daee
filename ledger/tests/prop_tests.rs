use std::sync::Arc;

use proptest::prelude::*;
use starreg_ledger::{BlockCandidate, Ledger, Star};
use starreg_nullables::{NullClock, NullStore};
use starreg_types::WalletAddress;

fn build_chain(stories: &[String]) -> (Arc<NullStore>, Ledger) {
    let store = Arc::new(NullStore::new());
    let ledger = Ledger::new(store.clone(), Arc::new(NullClock::new(1_700_000_000_000)));
    for (i, story) in stories.iter().enumerate() {
        ledger
            .append(BlockCandidate {
                address: WalletAddress::new(format!("addr{}", i % 3)),
                star: Star::new("1h", "2d", story.clone()),
            })
            .unwrap();
    }
    (store, ledger)
}

proptest! {
    #[test]
    fn untouched_chain_is_always_valid(stories in prop::collection::vec("[ -~]{1,40}", 0..8)) {
        let (_, ledger) = build_chain(&stories);
        let report = ledger.validate_chain().unwrap();
        prop_assert!(report.is_valid());
        prop_assert_eq!(ledger.height().unwrap(), stories.len() as u64);
    }

    #[test]
    fn tampering_any_field_flags_that_height(
        stories in prop::collection::vec("[a-z]{1,20}", 1..6),
        pick in any::<prop::sample::Index>(),
        field in 0usize..5,
    ) {
        let (store, ledger) = build_chain(&stories);
        let target = pick.index(stories.len() + 1) as u64;
        let hash = ledger.snapshot().unwrap()[target as usize];
        let key = hash.to_hex();

        let mut json: serde_json::Value =
            serde_json::from_slice(&store.get_raw(&key).unwrap()).unwrap();
        match field {
            0 => json["star"]["ra"] = "tampered".into(),
            1 => json["star"]["story"] = hex::encode("tampered").into(),
            2 => json["address"] = "tampered".into(),
            3 => json["time"] = 1.into(),
            _ => json["star"]["mag"] = "99".into(),
        }
        store.put_raw(&key, &serde_json::to_vec(&json).unwrap());

        let report = ledger.validate_chain().unwrap();
        prop_assert!(report.defective_heights().contains(&target));
        prop_assert!(!ledger.validate_block(target).unwrap());
    }
}
