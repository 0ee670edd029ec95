// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wire codec round-trips and robustness over random input.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use ripple_feed::wire::{decode_all, decode_event, encode_event, HEADER_LEN};
use ripple_feed::{FeedEvent, ItemUpdate};

fn arb_update() -> impl Strategy<Value = FeedEvent> {
    (
        any::<u32>(),
        prop::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..6),
    )
        .prop_map(|(slot, fields)| {
            let mut up = ItemUpdate::new(slot);
            for (name, value) in fields {
                up = up.with(name, value);
            }
            FeedEvent::ItemUpdate(up)
        })
}

proptest! {
    #[test]
    fn decoding_garbage_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = decode_event(&bytes);
        let _ = decode_all(&bytes);
    }

    #[test]
    fn encoded_updates_decode_exactly(event in arb_update()) {
        let pkt = encode_event(&event).expect("encode");
        let (decoded, used) = decode_event(&pkt).expect("decode");
        prop_assert_eq!(used, pkt.len());
        prop_assert_eq!(decoded, event);
    }

    #[test]
    fn any_header_corruption_is_an_error(event in arb_update(), idx in 0usize..HEADER_LEN, flip in 1u8..=255) {
        let mut pkt = encode_event(&event).expect("encode");
        pkt[idx] ^= flip;
        prop_assert!(decode_event(&pkt).is_err());
    }
}
