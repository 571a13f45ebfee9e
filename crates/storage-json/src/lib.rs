//! Pricevault JSON Storage - Document backend for the time-series store.
//!
//! The whole dataset lives in one JSON object mapping each instrument to its
//! `{"YYYY-MM-DD": price}` series. It is read fully into memory on open,
//! mutated in place, and written back wholesale by `persist`.

mod store;

pub use store::JsonFileStore;
