//! Integration tests for InMemoryBookingStore using the storage test harness.
//!
//! This file invokes `workflow_tests!` to validate that the workflow behaves
//! correctly on top of the in-memory store.

#[macro_use]
mod storage_harness;

use booking::storage::InMemoryBookingStore;
use storage_harness::*;

workflow_tests!(InMemoryBookingStore::new());
