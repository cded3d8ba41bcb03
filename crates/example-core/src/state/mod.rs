// # Entry Store Implementations
//
// This module provides implementations of the EntryStore trait.

pub mod memory;

pub use memory::MemoryEntryStore;
