// tests/tempo/fixtures/mod.rs
