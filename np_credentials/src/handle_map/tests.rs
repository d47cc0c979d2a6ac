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

use super::*;

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

// Chosen to be divisible by the number of active threads.
const MAX_ACTIVE_HANDLES: u32 = NUM_ACTIVE_THREADS * MAX_ACTIVE_HANDLES_PER_THREAD;

const MAX_ACTIVE_HANDLES_PER_THREAD: u32 = 1024;

// Deliberately low so that threads are likely to collide on shards.
const NUM_SHARDS: u8 = 4;

const NUM_ACTIVE_THREADS: u32 = 8;

const DEFAULT_DIMENSIONS: HandleMapDimensions =
    HandleMapDimensions { num_shards: NUM_SHARDS, max_active_handles: MAX_ACTIVE_HANDLES };

fn build_handle_map<T: Send + Sync>() -> HandleMap<T> {
    HandleMap::with_dimensions(DEFAULT_DIMENSIONS)
}

/// Performs the same testing function for each thread
fn test_for_each_thread<F>(test_function_ref: Arc<F>, num_repetitions_per_thread: usize)
where
    F: Fn() + Send + Sync + 'static,
{
    let join_handles: Vec<_> = (0..NUM_ACTIVE_THREADS)
        .map(|_| {
            let test_function_clone = test_function_ref.clone();
            thread::spawn(move || {
                for _ in 0..num_repetitions_per_thread {
                    test_function_clone();
                }
            })
        })
        .collect();
    for join_handle in join_handles {
        join_handle.join().unwrap()
    }
}

#[test]
fn read_after_allocate_sees_initial_value() {
    let handle_map = build_handle_map::<String>();
    let handle = handle_map.allocate(|| "hello".to_string()).unwrap();
    assert_eq!("hello", handle_map.get(handle).unwrap().as_str());
}

#[test]
fn write_through_guard_is_visible_to_later_reads() {
    let handle_map = build_handle_map::<Vec<u8>>();
    let handle = handle_map.allocate(Vec::new).unwrap();
    {
        let mut guard = handle_map.get_mut(handle).unwrap();
        guard.push(7);
        guard.push(9);
    }
    assert_eq!(&[7u8, 9], handle_map.get(handle).unwrap().as_slice());
}

#[test]
fn deallocate_returns_object_and_removes_entry() {
    let handle_map = build_handle_map::<u32>();
    let handle = handle_map.allocate(|| 42).unwrap();
    assert_eq!(1, handle_map.get_current_allocation_count());

    assert_eq!(42, handle_map.deallocate(handle).unwrap());
    assert_eq!(0, handle_map.get_current_allocation_count());
    assert!(handle_map.get(handle).is_err());
    assert!(handle_map.get_mut(handle).is_err());
    assert_eq!(Err(HandleNotPresentError), handle_map.deallocate(handle));
}

#[test]
fn zero_shards_is_treated_as_one() {
    let handle_map =
        HandleMap::<u8>::with_dimensions(HandleMapDimensions { num_shards: 0, max_active_handles: 2 });
    assert_eq!(1, handle_map.dimensions().num_shards);
    let handle = handle_map.allocate(|| 1).unwrap();
    assert_eq!(1, *handle_map.get(handle).unwrap());
}

#[test]
fn allocation_past_limit_fails_without_running_provider() {
    let handle_map =
        HandleMap::<u8>::with_dimensions(HandleMapDimensions { num_shards: 2, max_active_handles: 1 });
    let _ = handle_map.allocate(|| 1).unwrap();
    let result = handle_map.try_allocate::<()>(|| panic!("provider must not run when full"));
    assert_eq!(Err(HandleMapTryAllocateError::HandleMapFull), result);
    assert_eq!(1, handle_map.len());
}

#[test]
fn failed_provider_does_not_consume_a_slot() {
    let handle_map =
        HandleMap::<u8>::with_dimensions(HandleMapDimensions { num_shards: 2, max_active_handles: 1 });
    let result = handle_map.try_allocate(|| Err::<u8, _>("nope"));
    assert_eq!(Err(HandleMapTryAllocateError::ValueProviderFailed("nope")), result);
    assert_eq!(0, handle_map.get_current_allocation_count());

    // The single slot is still available.
    assert!(handle_map.allocate(|| 3).is_ok());
}

#[test]
fn wrapped_id_counter_skips_occupied_entries() {
    let mut handle_map = build_handle_map::<u8>();
    let first = handle_map.allocate(|| 1).unwrap();
    assert_eq!(0, first.get_id());
    handle_map.set_new_handle_id_counter(0);
    let second = handle_map.allocate(|| 2).unwrap();
    assert_ne!(first, second);
    assert_eq!(1, *handle_map.get(first).unwrap());
    assert_eq!(2, *handle_map.get(second).unwrap());
}

#[test]
fn concurrent_reads_of_same_handle_are_consistent() {
    let handle_map = Arc::new(build_handle_map::<String>());
    let handle = handle_map.allocate(|| "hello".to_string()).unwrap();
    let test_fn = Arc::new(move || {
        let value_ref = handle_map.get(handle).unwrap();
        assert_eq!("hello", value_ref.as_str());
    });
    test_for_each_thread(test_fn, 1000);
}

#[test]
fn overload_with_allocations_never_exceeds_limit() {
    let handle_map = Arc::new(build_handle_map::<u8>());
    let handle_map_post = handle_map.clone();

    let test_fn = Arc::new(move || {
        let _ = handle_map.allocate(|| 0xFF);
    });
    test_for_each_thread(test_fn, 2 * MAX_ACTIVE_HANDLES_PER_THREAD as usize);

    assert_eq!(MAX_ACTIVE_HANDLES as usize, handle_map_post.len());
    assert_eq!(MAX_ACTIVE_HANDLES, handle_map_post.get_current_allocation_count());
}

#[test]
fn allocations_and_deallocations_near_limit_stay_balanced() {
    let handle_map = build_handle_map::<u8>();
    for i in 0..(MAX_ACTIVE_HANDLES - 1) {
        let _ = handle_map.allocate(|| (i % 256) as u8).unwrap();
    }
    let handle_map = Arc::new(handle_map);
    let handle_map_post = handle_map.clone();

    let test_fn = Arc::new(move || {
        if let Ok(handle) = handle_map.allocate(|| 0xFF) {
            let _ = handle_map.deallocate(handle).unwrap();
        }
    });
    test_for_each_thread(test_fn, 1000);

    assert_eq!((MAX_ACTIVE_HANDLES - 1) as usize, handle_map_post.len());
}

#[test]
fn concurrently_allocated_handles_are_distinct() {
    let handle_map = Arc::new(build_handle_map::<u8>());
    let join_handles: Vec<_> = (0..NUM_ACTIVE_THREADS)
        .map(|_| {
            let handle_map = handle_map.clone();
            thread::spawn(move || {
                (0..64).map(|_| handle_map.allocate(|| 0).unwrap()).collect::<Vec<_>>()
            })
        })
        .collect();
    let mut seen = HashSet::new();
    for join_handle in join_handles {
        for handle in join_handle.join().unwrap() {
            assert!(seen.insert(handle), "duplicate handle {:?}", handle);
        }
    }
    assert_eq!(NUM_ACTIVE_THREADS as usize * 64, seen.len());
}
