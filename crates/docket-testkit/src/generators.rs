//! Proptest generators for property-based testing.

use docket_core::{Alphabet, Coder, Filter, Operator};
use proptest::prelude::*;
use serde_json::{json, Value};

/// A valid counter, serial or collection name.
pub fn name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,15}"
}

/// A shard count in a realistic range.
pub fn shard_count() -> impl Strategy<Value = u32> {
    1u32..=32
}

/// Counter deltas, positive and negative.
pub fn deltas(max_len: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(-1_000i64..=1_000, 0..=max_len)
}

pub fn alphabet() -> impl Strategy<Value = Alphabet> {
    prop_oneof![
        Just(Alphabet::Base36),
        Just(Alphabet::Base62),
        Just(Alphabet::Crockford32),
    ]
}

/// A coder, padded or not.
pub fn coder() -> impl Strategy<Value = Coder> {
    (alphabet(), prop::option::of(1usize..=13)).prop_map(|(alphabet, pad_width)| Coder {
        alphabet,
        pad_width,
    })
}

/// A serial value as issued: never zero.
pub fn serial_value() -> impl Strategy<Value = i64> {
    1i64..=i64::MAX
}

pub fn operator() -> impl Strategy<Value = Operator> {
    prop_oneof![
        Just(Operator::Eq),
        Just(Operator::Ne),
        Just(Operator::Lt),
        Just(Operator::Le),
        Just(Operator::Gt),
        Just(Operator::Ge),
    ]
}

/// A flat JSON body with an integer `score` and a string `tag`.
pub fn scored_body() -> impl Strategy<Value = Value> {
    (-100i64..=100, "[a-c]").prop_map(|(score, tag)| json!({ "score": score, "tag": tag }))
}

/// A filter over the `score` field of [`scored_body`].
pub fn score_filter() -> impl Strategy<Value = Filter> {
    (operator(), -100i64..=100).prop_map(|(op, v)| Filter::new("score", op, v))
}
