//! `veriflow-api` — HTTP surface for the validation pipeline.

pub mod app;
