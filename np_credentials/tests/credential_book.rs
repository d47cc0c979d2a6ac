// Copyright 2023 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]
#![allow(missing_docs)]

use np_credentials::{
    AddCredentialError, CredentialBook, CredentialBookBuilder, CredentialContext, EmptyMetadata,
    CredentialsConfig, InvalidLengthError, V0BroadcastCredential, V0DiscoveryCredential,
    V1BroadcastCredential, V1DiscoveryCredential,
};
use rand::{Rng, SeedableRng};
use rstest::rstest;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn isolated_context() -> CredentialContext {
    let mut config = CredentialsConfig::new();
    let _ = config.set_num_shards(4);
    CredentialContext::new(&config)
}

fn random_v0_discovery_credential<R: Rng>(rng: &mut R) -> V0DiscoveryCredential {
    V0DiscoveryCredential::new(rng.gen(), rng.gen())
}

#[test]
fn alice_and_bob_are_found_by_id() {
    init_logging();
    let mut builder = CredentialBookBuilder::new().unwrap();
    let _ = builder
        .add_v0_discovery_credential(V0DiscoveryCredential::new([1; 32], [2; 32]), "alice")
        .unwrap()
        .add_v0_discovery_credential(V0DiscoveryCredential::new([3; 32], [4; 32]), "bob")
        .unwrap();
    let book = builder.build().unwrap();

    assert_eq!(Some(&"alice"), book.get_matched_metadata(0));
    assert_eq!(Some(&"bob"), book.get_matched_metadata(1));
    assert_eq!(None, book.get_matched_metadata(2));
}

#[test]
fn empty_book_matches_nothing() {
    init_logging();
    let book = CredentialBook::empty().unwrap();
    assert_eq!(0, book.len());
    assert_eq!(None, book.get_matched_metadata(0));
}

#[test]
fn short_key_seed_reports_expected_and_actual_lengths() {
    let err = V0BroadcastCredential::from_slices(&[0; 31], &[0; 14]).unwrap_err();
    assert_eq!(InvalidLengthError { expected: 32, actual: 31 }, err);
}

#[rstest]
#[case::one(1)]
#[case::a_few(7)]
#[case::many(200)]
fn metadata_follows_insertion_order(#[case] num_credentials: usize) {
    init_logging();
    let context = isolated_context();
    let mut rng = rand::rngs::StdRng::seed_from_u64(num_credentials as u64);
    let mut builder = CredentialBookBuilder::with_context(&context).unwrap();
    // Repeated metadata must not be collapsed.
    let expected: Vec<Vec<u8>> =
        (0..num_credentials).map(|i| vec![(i % 3) as u8; rng.gen_range(0..8)]).collect();
    for metadata in &expected {
        let _ = builder
            .add_v0_discovery_credential(random_v0_discovery_credential(&mut rng), metadata.clone())
            .unwrap();
    }
    let book = builder.build().unwrap();

    assert_eq!(expected.as_slice(), book.metadata());
    for (id, metadata) in expected.iter().enumerate() {
        assert_eq!(Some(metadata), book.get_matched_metadata(id as i64));
    }
    assert_eq!(None, book.get_matched_metadata(-1));
    assert_eq!(None, book.get_matched_metadata(num_credentials as i64));
}

#[test]
fn broadcast_key_pairs_with_discovery_credential() {
    init_logging();
    let context = isolated_context();
    let broadcast = V1BroadcastCredential::new([5; 32], [6; 16], [7; 32]);
    let discovery =
        V1DiscoveryCredential::new([5; 32], [8; 32], [9; 32], [10; 32], broadcast.public_key());

    let mut builder = CredentialBookBuilder::with_context(&context).unwrap();
    let _ = builder.add_v1_discovery_credential(discovery.clone(), b"meta".to_vec()).unwrap();
    let book = builder.build().unwrap();

    let v1 = book.native().v1_credentials().unwrap();
    assert_eq!(discovery, v1[0].discovery_credential);
    assert_eq!(Some(&b"meta".to_vec()), book.metadata_for(&v1[0].match_data));
}

#[test]
fn off_curve_public_key_fails_only_when_added() {
    init_logging();
    let context = isolated_context();
    let mut pub_key = [0u8; 32];
    pub_key[0] = 2;
    let discovery = V1DiscoveryCredential::new([1; 32], [1; 32], [1; 32], [1; 32], pub_key);

    let mut builder = CredentialBookBuilder::with_context(&context).unwrap();
    assert_eq!(
        AddCredentialError::InvalidPublicKey,
        builder.add_v1_discovery_credential(discovery, "x").unwrap_err()
    );
    assert!(builder.is_empty());
}

#[test]
fn books_and_slabs_are_released_exactly_once() {
    init_logging();
    let context = isolated_context();
    let mut builder = CredentialBookBuilder::with_context(&context).unwrap();
    let _ = builder
        .add_v0_discovery_credential(V0DiscoveryCredential::new([1; 32], [1; 32]), EmptyMetadata)
        .unwrap();
    assert_eq!(1, context.num_active_slabs());

    let mut book = builder.build().unwrap();
    assert_eq!(0, context.num_active_slabs());
    assert_eq!(1, context.num_active_books());

    book.release();
    book.release();
    drop(book);
    assert_eq!(0, context.num_active_slabs());
    assert_eq!(0, context.num_active_books());
}

#[test]
fn books_can_be_read_from_other_threads() {
    init_logging();
    let context = isolated_context();
    let mut builder = CredentialBookBuilder::with_context(&context).unwrap();
    for i in 0..16u8 {
        let _ = builder
            .add_v0_discovery_credential(V0DiscoveryCredential::new([i; 32], [i; 32]), vec![i])
            .unwrap();
    }
    let book = std::sync::Arc::new(builder.build().unwrap());

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let book = book.clone();
            std::thread::spawn(move || {
                for id in 0..16u8 {
                    assert_eq!(Some(&vec![id]), book.get_matched_metadata(i64::from(id)));
                    assert_eq!(16, book.native().num_credentials().unwrap());
                }
            })
        })
        .collect();
    for reader in readers {
        reader.join().unwrap();
    }
}
