// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite history store for Omnidesk.
//!
//! WAL-mode SQLite with embedded refinery migrations and a single-writer
//! model through `tokio-rusqlite`. The routing engine treats this store as a
//! log: live state is authoritative, every mutation is mirrored here.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
