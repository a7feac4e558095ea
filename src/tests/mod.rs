//! tests/mod.rs
//! Pruebas de los servicios de campañas y de la API.

mod attachment_tests;
mod support;
