//! Database migration runner for Expensa.
//!
//! Usage:
//!   migrator up      - Apply the schema, enums and workflow triggers
//!   migrator down    - Roll the schema back
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop everything and re-apply
//!
//! Reads `DATABASE_URL` from the environment or a `.env` file.

use sea_orm_migration::prelude::*;
use expensa_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // The CLI sets up its own tracing
    cli::run_cli(Migrator).await;
}
