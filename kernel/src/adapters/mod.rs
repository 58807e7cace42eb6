// Source Adapters
//
// Concrete log sources backed by external storage.

pub mod jsonl;
