//! Example: Species Catalogue Migrations
//!
//! Declares a small migration history and prints what it compiles to on an
//! old and a recent SQLite.
//!
//! Run with: cargo run --example species_migrations -p oxide-migrate-compiler

use oxide_migrate_compiler::prelude::*;

fn declare(migrator: &mut Migrator) -> Result<()> {
    // 1: initial tables
    let mut m = migrator.migrate()?;
    m.table("species").create(vec![
        Column::identity("id"),
        Column::text("name").not_null().default("Unnamed species"),
        Column::text("origin"),
        Column::integer("population"),
    ])?;
    m.table("people").create(vec![
        Column::identity("id"),
        Column::text("name").not_null(),
        Column::foreign("species", "species"),
    ])?;

    // 2: seed data
    let mut m = m.migrate()?;
    m.sql(
        "INSERT INTO \"species\" (\"name\", \"origin\") VALUES (?, ?);",
        vec!["Human".into(), "Earth".into()],
    )?;

    // 3: reshape species
    let mut m = m.migrate()?;
    let mut species = m.table("species");
    species.column("origin").rename("place_of_origin")?;
    species
        .column("residence")
        .text()
        .fill_from("origin")
        .coalesce("New Earth")
        .create()?;
    species
        .column("population")
        .integer()
        .not_null()
        .default(0)
        .coalesce(0)
        .change()?;

    Ok(())
}

fn print_steps(version: &str) -> Result<()> {
    let mut migrator = Migrator::new(Config::default().with_dialect_version(version));
    declare(&mut migrator)?;

    println!("-- SQLite {version}");
    for step in migrator.steps(None)? {
        if let Some(query) = step.query() {
            println!("{query}");
        }
    }
    println!();
    Ok(())
}

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("{}", "=".repeat(70));
    println!(" OXIDE-MIGRATE-COMPILER: Species Example");
    println!("{}", "=".repeat(70));
    println!();

    print_steps("3.0.0")?;
    print_steps("3.35.0")?;

    let mut migrator = Migrator::new(Config::default());
    declare(&mut migrator)?;
    println!("{}", migrator.types_document()?);

    Ok(())
}
