//! Fuzz testing for everything that parses client-controlled URL parts.
//!
//! Stremio clients put the resource type, the ID and the user data into the
//! URL, so these parsers see arbitrary input. They must never panic.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! # Install cargo-fuzz (requires nightly)
//! cargo +nightly install cargo-fuzz
//!
//! # Run the target
//! cargo +nightly fuzz run fuzz_request_parsing
//!
//! # Run with a time limit (e.g., 60 seconds)
//! cargo +nightly fuzz run fuzz_request_parsing -- -max_total_time=60
//! ```
//!
//! # What This Tests
//!
//! - `UserDataCodec::decode` for both encodings
//! - `ResourceRequest::parse` on arbitrary paths and queries
//! - `parse_episode_id` and `classify_endpoint`

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use stremio_addon::UserDataEncoding;
use stremio_addon::meta::parse_episode_id;
use stremio_addon::metrics::classify_endpoint;
use stremio_addon::middleware::ResourceRequest;
use stremio_addon::userdata::{UserDataCodec, UserDataSchema};

#[derive(Debug, Arbitrary)]
struct Input<'a> {
    user_data: &'a str,
    path: &'a str,
    query: &'a str,
    base64: bool,
}

fuzz_target!(|input: Input<'_>| {
    let encoding = if input.base64 {
        UserDataEncoding::Base64Url
    } else {
        UserDataEncoding::PercentEncodedJson
    };

    let codec: UserDataCodec<serde_json::Value> =
        UserDataCodec::new(UserDataSchema::registered(), encoding);
    let _ = codec.decode(input.user_data);

    let _ = parse_episode_id(input.user_data);
    let _ = classify_endpoint(input.path);

    // Only URIs the HTTP layer would accept reach the parser
    let raw = format!("/{}?{}", input.path.trim_start_matches('/'), input.query);
    if let Ok(uri) = raw.parse() {
        let _ = ResourceRequest::parse(&uri);
    }
});
