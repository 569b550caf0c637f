//! Integration tests
//!
//! `api_tests` need no database. `library_tests` run against Postgres:
//! `DATABASE_URL=postgres://... cargo test -- --ignored`

mod api_tests;
mod library_tests;
