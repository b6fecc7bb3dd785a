//! Cross-crate integration tests for the emdcal workspace live under `tests/`.
